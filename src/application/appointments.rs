use crate::application::error::AgendaError;
use crate::domain::accounting::{filter_appointments, AppointmentView};
use crate::domain::models::{
    Appointment, AppointmentPatch, AppointmentStatus, ClientInfo, Money, NewAppointment, Service,
};
use crate::domain::slots::local_instant;
use crate::infrastructure::store::{AppointmentStore, ServiceStore};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Form input for a manually created or edited appointment. Without an end
/// time the selected service's duration decides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub service_id: Option<String>,
    pub client_info: Option<ClientInfo>,
    pub payment: Money,
}

impl AppointmentDraft {
    /// Contact data counts only when all three fields are filled in.
    fn complete_client(&self) -> Option<ClientInfo> {
        self.client_info
            .clone()
            .filter(ClientInfo::is_complete)
    }

    fn service_id(&self) -> Option<String> {
        crate::domain::models::normalize_optional(self.service_id.as_deref())
    }

    fn resolve_range(
        &self,
        services: &[Service],
        time_zone: Tz,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), AgendaError> {
        let start = local_instant(time_zone, self.date, self.start_time).ok_or_else(|| {
            AgendaError::Validation(format!(
                "start time {} does not exist on {}",
                self.start_time, self.date
            ))
        })?;

        let service = match self.service_id() {
            Some(service_id) => Some(
                services
                    .iter()
                    .find(|service| service.id == service_id)
                    .ok_or_else(|| AgendaError::Validation(format!("unknown service {service_id}")))?,
            ),
            None => None,
        };

        let end = match (self.end_time, service) {
            (Some(end_time), _) => local_instant(time_zone, self.date, end_time).ok_or_else(|| {
                AgendaError::Validation(format!("end time {end_time} does not exist on {}", self.date))
            })?,
            (None, Some(service)) => start + service.duration(),
            (None, None) => {
                return Err(AgendaError::Validation(
                    "end time is required when no service is selected".to_string(),
                ));
            }
        };

        if end <= start {
            return Err(AgendaError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        Ok((start, end))
    }
}

/// Calendar management on behalf of the professional.
pub struct AppointmentService<A, C>
where
    A: AppointmentStore,
    C: ServiceStore,
{
    appointments: Arc<A>,
    services: Arc<C>,
    now_provider: NowProvider,
}

impl<A, C> AppointmentService<A, C>
where
    A: AppointmentStore,
    C: ServiceStore,
{
    pub fn new(appointments: Arc<A>, services: Arc<C>) -> Self {
        Self {
            appointments,
            services,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Creates one appointment. Open slots under the new range are removed
    /// first; live client appointments under it reject the request.
    pub async fn create(
        &self,
        professional_id: &str,
        draft: &AppointmentDraft,
        time_zone: Tz,
    ) -> Result<Appointment, AgendaError> {
        let services = self.services.list_services(professional_id).await?;
        let (start, end) = draft.resolve_range(&services, time_zone)?;

        let client_info = draft.complete_client();
        let appointment = NewAppointment {
            start_time: start,
            end_time: end,
            status: if client_info.is_some() {
                AppointmentStatus::Booked
            } else {
                AppointmentStatus::Available
            },
            service_id: draft.service_id(),
            client_info,
            payment: draft.payment,
        };
        appointment.validate().map_err(AgendaError::Validation)?;

        let existing = self.appointments.list_appointments(professional_id).await?;
        self.clear_range(professional_id, &existing, start, end, None)
            .await?;

        let created = self
            .appointments
            .create_appointment(professional_id, &appointment)
            .await?;
        tracing::info!(professional_id, appointment_id = %created.id, status = created.status.as_str(), "appointment created");
        Ok(created)
    }

    /// Rewrites every editable field. `outcome` marks the appointment
    /// attended or no-show; without one a settled appointment keeps its
    /// status and anything else follows the client data. Blocked ranges stay
    /// blocked. The new range is cleared the same way `create` clears it.
    pub async fn edit(
        &self,
        professional_id: &str,
        appointment_id: &str,
        draft: &AppointmentDraft,
        outcome: Option<AppointmentStatus>,
        time_zone: Tz,
    ) -> Result<Appointment, AgendaError> {
        if let Some(outcome) = outcome {
            ensure_outcome(outcome)?;
        }
        let appointments = self.appointments.list_appointments(professional_id).await?;
        let existing = find_in(&appointments, appointment_id)?;
        let services = self.services.list_services(professional_id).await?;
        let (start, end) = draft.resolve_range(&services, time_zone)?;

        let client_info = draft.complete_client();
        let patch = if existing.status == AppointmentStatus::Blocked {
            AppointmentPatch {
                start_time: Some(start),
                end_time: Some(end),
                status: Some(AppointmentStatus::Blocked),
                service_id: Some(None),
                client_info: Some(None),
                payment: Some(0),
            }
        } else {
            let status = match outcome {
                Some(outcome) => outcome,
                None if existing.status.is_history() => existing.status,
                None if client_info.is_some() => AppointmentStatus::Booked,
                None => AppointmentStatus::Available,
            };
            AppointmentPatch {
                start_time: Some(start),
                end_time: Some(end),
                status: Some(status),
                service_id: Some(draft.service_id()),
                client_info: Some(client_info),
                payment: Some(draft.payment),
            }
        };

        existing
            .apply(&patch)
            .validate()
            .map_err(AgendaError::Validation)?;
        if existing.status != AppointmentStatus::Blocked {
            self.clear_range(professional_id, &appointments, start, end, Some(&existing.id))
                .await?;
        }

        Ok(self
            .appointments
            .update_appointment(professional_id, &existing.id, &patch)
            .await?)
    }

    /// Marks what happened after the fact. Only client appointments carry an
    /// outcome; open slots and blocked ranges do not.
    pub async fn record_outcome(
        &self,
        professional_id: &str,
        appointment_id: &str,
        outcome: AppointmentStatus,
        payment: Option<Money>,
    ) -> Result<Appointment, AgendaError> {
        ensure_outcome(outcome)?;
        let existing = self.find(professional_id, appointment_id).await?;
        if !matches!(
            existing.status,
            AppointmentStatus::Booked | AppointmentStatus::Attended | AppointmentStatus::NoShow
        ) {
            return Err(AgendaError::Conflict(format!(
                "{} appointment {} cannot record an outcome",
                existing.status.as_str(),
                existing.id
            )));
        }

        let patch = AppointmentPatch {
            status: Some(outcome),
            payment,
            ..AppointmentPatch::default()
        };
        let updated = self
            .appointments
            .update_appointment(professional_id, &existing.id, &patch)
            .await?;
        tracing::info!(
            professional_id,
            appointment_id = %updated.id,
            outcome = outcome.as_str(),
            payment = updated.payment,
            "outcome recorded"
        );
        Ok(updated)
    }

    pub async fn delete(&self, professional_id: &str, appointment_id: &str) -> Result<(), AgendaError> {
        self.appointments
            .delete_appointment(professional_id, appointment_id)
            .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        professional_id: &str,
        view: AppointmentView,
        time_zone: Tz,
    ) -> Result<Vec<Appointment>, AgendaError> {
        let appointments = self.appointments.list_appointments(professional_id).await?;
        let services = self.services.list_services(professional_id).await?;
        Ok(filter_appointments(
            view,
            &appointments,
            &services,
            (self.now_provider)(),
            time_zone,
        ))
    }

    async fn find(&self, professional_id: &str, appointment_id: &str) -> Result<Appointment, AgendaError> {
        let appointments = self.appointments.list_appointments(professional_id).await?;
        find_in(&appointments, appointment_id)
    }

    /// Rejects a range that overlaps a live client appointment, then deletes
    /// the open slots under it. `keep_id` is the record being moved.
    async fn clear_range(
        &self,
        professional_id: &str,
        appointments: &[Appointment],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        keep_id: Option<&str>,
    ) -> Result<(), AgendaError> {
        let overlapping = appointments
            .iter()
            .filter(|item| Some(item.id.as_str()) != keep_id)
            .filter(|item| item.overlaps(start, end))
            .collect::<Vec<_>>();
        if let Some(taken) = overlapping.iter().find(|item| {
            matches!(
                item.status,
                AppointmentStatus::Booked | AppointmentStatus::Attended | AppointmentStatus::NoShow
            )
        }) {
            return Err(AgendaError::Conflict(format!(
                "range overlaps {} appointment {}",
                taken.status.as_str(),
                taken.id
            )));
        }

        for stale in overlapping
            .iter()
            .filter(|item| item.status == AppointmentStatus::Available)
        {
            self.appointments
                .delete_appointment(professional_id, &stale.id)
                .await?;
            tracing::debug!(professional_id, stale_id = %stale.id, "open slot replaced by manual appointment");
        }
        Ok(())
    }
}

fn find_in(appointments: &[Appointment], appointment_id: &str) -> Result<Appointment, AgendaError> {
    let appointment_id = appointment_id.trim();
    appointments
        .iter()
        .find(|appointment| appointment.id == appointment_id)
        .cloned()
        .ok_or_else(|| AgendaError::NotFound(format!("appointment {appointment_id}")))
}

fn ensure_outcome(outcome: AppointmentStatus) -> Result<(), AgendaError> {
    if outcome.is_history() {
        return Ok(());
    }
    Err(AgendaError::Validation(format!(
        "outcome must be attended or no-show, got {}",
        outcome.as_str()
    )))
}
