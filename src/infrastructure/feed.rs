use crate::domain::models::Appointment;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};

/// Full view of one professional's appointments at a point in time.
pub type AppointmentSnapshot = Arc<Vec<Appointment>>;

const FEED_CAPACITY: usize = 16;

/// Fan-out of appointment snapshots, one broadcast channel per professional.
#[derive(Debug, Default)]
pub struct SnapshotHub {
    channels: Mutex<HashMap<String, broadcast::Sender<AppointmentSnapshot>>>,
}

impl SnapshotHub {
    pub fn subscribe(
        &self,
        professional_id: &str,
        current: AppointmentSnapshot,
    ) -> Result<AppointmentFeed, InfraError> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|error| InfraError::poisoned("snapshot hub", error))?;
        let receiver = channels
            .entry(professional_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .subscribe();
        Ok(AppointmentFeed {
            professional_id: professional_id.to_string(),
            pending: Some(current),
            receiver,
        })
    }

    /// Pushes a snapshot to live subscribers. Channels nobody listens to are
    /// dropped so the map does not grow with every professional ever seen.
    pub fn publish(&self, professional_id: &str, snapshot: AppointmentSnapshot) -> Result<(), InfraError> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|error| InfraError::poisoned("snapshot hub", error))?;
        let Some(sender) = channels.get(professional_id) else {
            return Ok(());
        };
        if sender.send(snapshot).is_err() {
            channels.remove(professional_id);
        }
        Ok(())
    }

    pub fn has_subscribers(&self, professional_id: &str) -> bool {
        self.channels
            .lock()
            .map(|channels| {
                channels
                    .get(professional_id)
                    .map(|sender| sender.receiver_count() > 0)
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

/// Live appointment subscription. The first `recv` yields the snapshot taken
/// at subscribe time; every later one yields the state after a change.
#[derive(Debug)]
pub struct AppointmentFeed {
    professional_id: String,
    pending: Option<AppointmentSnapshot>,
    receiver: broadcast::Receiver<AppointmentSnapshot>,
}

impl AppointmentFeed {
    pub fn professional_id(&self) -> &str {
        &self.professional_id
    }

    /// `None` once the store side has gone away.
    pub async fn recv(&mut self) -> Option<AppointmentSnapshot> {
        if let Some(snapshot) = self.pending.take() {
            return Some(snapshot);
        }
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                // Every event is a full snapshot, so missed ones carry nothing
                // the next one does not.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        professional_id = %self.professional_id,
                        skipped,
                        "appointment feed lagged"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        tracing::debug!(professional_id = %self.professional_id, "appointment feed unsubscribed");
    }
}
