use crate::application::error::AgendaError;
use crate::domain::blocking::{plan_block, BlockDecision, BlockRequest};
use crate::domain::models::Appointment;
use crate::infrastructure::store::AppointmentStore;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BlockOutcome {
    Blocked {
        appointment: Appointment,
        overridden_ids: Vec<String>,
    },
    /// Nothing was written; the caller must confirm blocking over these.
    ConfirmationRequired { conflicts: Vec<Appointment> },
}

pub struct BlockingService<S>
where
    S: AppointmentStore,
{
    store: Arc<S>,
}

impl<S> BlockingService<S>
where
    S: AppointmentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn block(
        &self,
        professional_id: &str,
        request: &BlockRequest,
        time_zone: Tz,
        day_end: NaiveTime,
        confirmed: bool,
    ) -> Result<BlockOutcome, AgendaError> {
        let existing = self.store.list_appointments(professional_id).await?;
        let decision = plan_block(request, time_zone, day_end, &existing, confirmed)
            .map_err(AgendaError::Validation)?;

        match decision {
            BlockDecision::NeedsConfirmation { conflicts } => {
                tracing::info!(
                    professional_id,
                    date = %request.date,
                    conflicts = conflicts.len(),
                    "block needs confirmation"
                );
                Ok(BlockOutcome::ConfirmationRequired { conflicts })
            }
            BlockDecision::Proceed {
                appointment,
                overridden_ids,
            } => {
                let appointment = self
                    .store
                    .create_appointment(professional_id, &appointment)
                    .await?;
                if !overridden_ids.is_empty() {
                    tracing::warn!(
                        professional_id,
                        block_id = %appointment.id,
                        overridden = ?overridden_ids,
                        "blocked over confirmed bookings"
                    );
                }
                Ok(BlockOutcome::Blocked {
                    appointment,
                    overridden_ids,
                })
            }
        }
    }
}
