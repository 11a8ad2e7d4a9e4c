use crate::application::appointments::NowProvider;
use crate::application::error::AgendaError;
use crate::domain::models::{Appointment, AppointmentPatch, AppointmentStatus, ClientInfo};
use crate::infrastructure::store::{AppointmentStore, ServiceStore};
use chrono::Utc;
use std::sync::Arc;

/// What a client may see and do on a professional's public calendar.
pub struct BookingService<A, C>
where
    A: AppointmentStore,
    C: ServiceStore,
{
    appointments: Arc<A>,
    services: Arc<C>,
    now_provider: NowProvider,
}

impl<A, C> BookingService<A, C>
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

    /// Open slots that have not started yet, earliest first.
    pub async fn open_slots(&self, professional_id: &str) -> Result<Vec<Appointment>, AgendaError> {
        let now = (self.now_provider)();
        let mut open = self
            .appointments
            .list_appointments(professional_id)
            .await?
            .into_iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Available)
            .filter(|appointment| appointment.start_time > now)
            .collect::<Vec<_>>();
        open.sort_by(|left, right| left.start_time.cmp(&right.start_time));
        Ok(open)
    }

    pub async fn reserve(
        &self,
        professional_id: &str,
        appointment_id: &str,
        service_id: &str,
        client: ClientInfo,
    ) -> Result<Appointment, AgendaError> {
        let client = ClientInfo::new(&client.name, &client.email, &client.phone);
        if !client.is_complete() {
            return Err(AgendaError::Validation(
                "name, email and phone are required to reserve".to_string(),
            ));
        }

        let service_id = service_id.trim();
        let service = self
            .services
            .list_services(professional_id)
            .await?
            .into_iter()
            .find(|service| service.id == service_id)
            .ok_or_else(|| AgendaError::Validation(format!("unknown service {service_id}")))?;
        if !service.available {
            return Err(AgendaError::Validation(format!(
                "service {} is not offered right now",
                service.name
            )));
        }

        let appointment_id = appointment_id.trim();
        let slot = self
            .appointments
            .list_appointments(professional_id)
            .await?
            .into_iter()
            .find(|appointment| appointment.id == appointment_id)
            .ok_or_else(|| AgendaError::NotFound(format!("appointment {appointment_id}")))?;
        if slot.status != AppointmentStatus::Available {
            return Err(AgendaError::Conflict(format!(
                "slot {appointment_id} is no longer available"
            )));
        }
        if slot.start_time <= (self.now_provider)() {
            return Err(AgendaError::Conflict(format!(
                "slot {appointment_id} has already started"
            )));
        }

        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Booked),
            service_id: Some(Some(service.id.clone())),
            client_info: Some(Some(client)),
            ..AppointmentPatch::default()
        };
        let booked = self
            .appointments
            .update_appointment(professional_id, appointment_id, &patch)
            .await?;
        tracing::info!(professional_id, appointment_id, service_id = %service.id, "slot reserved");
        Ok(booked)
    }

    /// Every appointment made under an email address, earliest first.
    pub async fn appointments_for_email(
        &self,
        professional_id: &str,
        email: &str,
    ) -> Result<Vec<Appointment>, AgendaError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AgendaError::Validation("email must not be empty".to_string()));
        }
        Ok(self
            .appointments
            .list_appointments(professional_id)
            .await?
            .into_iter()
            .filter(|appointment| {
                appointment
                    .client_email()
                    .map(|candidate| candidate.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .collect())
    }
}
