use crate::application::appointments::NowProvider;
use crate::application::error::AgendaError;
use crate::domain::accounting::{aggregate, AccountsSummary, TrailingWindow};
use crate::infrastructure::store::{AppointmentStore, ServiceStore};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One-shot accounting summary from the current store contents.
pub async fn summarize<A, C>(
    appointments: &A,
    services: &C,
    professional_id: &str,
    window: TrailingWindow,
    time_zone: Tz,
    now_provider: &NowProvider,
) -> Result<AccountsSummary, AgendaError>
where
    A: AppointmentStore,
    C: ServiceStore,
{
    let appointment_list = appointments.list_appointments(professional_id).await?;
    let service_list = services.list_services(professional_id).await?;
    Ok(aggregate(
        &appointment_list,
        &service_list,
        window,
        now_provider(),
        time_zone,
    ))
}

/// Keeps an accounting summary current for one professional. Every feed
/// snapshot triggers a full recompute that is published on a watch channel.
pub struct AccountsMonitor {
    receiver: watch::Receiver<Option<Arc<AccountsSummary>>>,
    task: JoinHandle<()>,
}

impl AccountsMonitor {
    pub async fn start<A, C>(
        appointments: Arc<A>,
        services: Arc<C>,
        professional_id: &str,
        window: TrailingWindow,
        time_zone: Tz,
        now_provider: NowProvider,
    ) -> Result<Self, AgendaError>
    where
        A: AppointmentStore,
        C: ServiceStore,
    {
        // Services are read once; the feed only covers appointments.
        let service_list = services.list_services(professional_id).await?;
        let mut feed = appointments.subscribe_appointments(professional_id).await?;
        let (sender, receiver) = watch::channel(None);

        let task = tokio::spawn(async move {
            while let Some(snapshot) = feed.recv().await {
                let summary = aggregate(&snapshot, &service_list, window, now_provider(), time_zone);
                tracing::debug!(
                    professional_id = feed.professional_id(),
                    appointments = snapshot.len(),
                    balance = summary.totals.balance,
                    "accounts recomputed"
                );
                if sender.send(Some(Arc::new(summary))).is_err() {
                    break;
                }
            }
            feed.unsubscribe();
        });

        Ok(Self { receiver, task })
    }

    pub fn latest(&self) -> Option<Arc<AccountsSummary>> {
        self.receiver.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Arc<AccountsSummary>>> {
        self.receiver.clone()
    }

    /// Waits for the next recompute. `None` once the feed has ended.
    pub async fn changed(&mut self) -> Option<Arc<AccountsSummary>> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    /// Stops the recompute task and releases the feed subscription.
    pub async fn unsubscribe(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
