use crate::domain::models::{
    Appointment, AppointmentPatch, NewAppointment, NewService, Service,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed::AppointmentFeed;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const APPOINTMENTS: &str = "appointments";
pub const SERVICES: &str = "services";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Appointment collection of the document store, addressed per professional.
/// Each call is independent; nothing spans more than one record.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list_appointments(&self, professional_id: &str) -> Result<Vec<Appointment>, InfraError>;

    async fn create_appointment(
        &self,
        professional_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, InfraError>;

    async fn update_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, InfraError>;

    async fn delete_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
    ) -> Result<(), InfraError>;

    async fn subscribe_appointments(&self, professional_id: &str) -> Result<AppointmentFeed, InfraError>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn list_services(&self, professional_id: &str) -> Result<Vec<Service>, InfraError>;

    async fn create_service(
        &self,
        professional_id: &str,
        service: &NewService,
    ) -> Result<Service, InfraError>;

    async fn update_service(&self, professional_id: &str, service: &Service) -> Result<Service, InfraError>;

    async fn delete_service(&self, professional_id: &str, service_id: &str) -> Result<(), InfraError>;
}

pub(crate) fn prepare_new_appointment(appointment: &NewAppointment) -> Result<Appointment, InfraError> {
    appointment.validate().map_err(InfraError::InvalidRecord)?;
    Ok(appointment
        .clone()
        .into_appointment(next_id("apt"), Utc::now()))
}

pub(crate) fn prepare_patched_appointment(
    existing: &Appointment,
    patch: &AppointmentPatch,
) -> Result<Appointment, InfraError> {
    let updated = existing.apply(patch);
    updated.validate().map_err(InfraError::InvalidRecord)?;
    Ok(updated)
}

pub(crate) fn prepare_new_service(service: &NewService) -> Result<Service, InfraError> {
    service.validate().map_err(InfraError::InvalidRecord)?;
    Ok(service.clone().into_service(next_id("svc")))
}

pub(crate) fn ensure_professional(professional_id: &str) -> Result<&str, InfraError> {
    let professional_id = professional_id.trim();
    if professional_id.is_empty() {
        return Err(InfraError::InvalidRecord(
            "professional id must not be empty".to_string(),
        ));
    }
    Ok(professional_id)
}
