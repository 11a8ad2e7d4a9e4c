use crate::domain::models::{
    Appointment, AppointmentPatch, NewAppointment, NewService, Service,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed::{AppointmentFeed, SnapshotHub};
use crate::infrastructure::record_mapper::{
    decode_appointment, decode_appointment_snapshot, decode_service_snapshot, encode_appointment,
    encode_service, AppointmentDocument, ServiceDocument,
};
use crate::infrastructure::store::{
    ensure_professional, prepare_new_appointment, prepare_new_service,
    prepare_patched_appointment, AppointmentStore, ServiceStore,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ProfessionalRecords {
    appointments: BTreeMap<String, AppointmentDocument>,
    services: BTreeMap<String, ServiceDocument>,
}

impl ProfessionalRecords {
    fn appointment_snapshot(&self) -> Vec<Appointment> {
        decode_appointment_snapshot(
            self.appointments
                .iter()
                .map(|(id, document)| (id.as_str(), document)),
        )
    }
}

/// Document store kept in process memory. Records are held in their stored
/// document shape so the same decoding rules apply as for persisted data.
#[derive(Debug, Default)]
pub struct InMemoryAgendaStore {
    records: Mutex<HashMap<String, ProfessionalRecords>>,
    hub: SnapshotHub,
}

impl InMemoryAgendaStore {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ProfessionalRecords>>, InfraError> {
        self.records
            .lock()
            .map_err(|error| InfraError::poisoned("agenda store", error))
    }

    /// Stores a raw document as-is, bypassing validation. Used to load data
    /// written by other tools.
    pub fn insert_appointment_document(
        &self,
        professional_id: &str,
        appointment_id: &str,
        document: AppointmentDocument,
    ) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        self.mutate_appointments(professional_id, |appointments| {
            appointments.insert(appointment_id.trim().to_string(), document);
            Ok(())
        })
    }

    pub fn insert_service_document(
        &self,
        professional_id: &str,
        service_id: &str,
        document: ServiceDocument,
    ) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let mut records = self.lock()?;
        records
            .entry(professional_id.to_string())
            .or_default()
            .services
            .insert(service_id.trim().to_string(), document);
        Ok(())
    }

    fn mutate_appointments<T>(
        &self,
        professional_id: &str,
        change: impl FnOnce(&mut BTreeMap<String, AppointmentDocument>) -> Result<T, InfraError>,
    ) -> Result<T, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let mut records = self.lock()?;
        let professional = records.entry(professional_id.to_string()).or_default();
        let value = change(&mut professional.appointments)?;
        // Published under the record lock so subscribers see changes in order.
        self.hub
            .publish(professional_id, Arc::new(professional.appointment_snapshot()))?;
        Ok(value)
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAgendaStore {
    async fn list_appointments(&self, professional_id: &str) -> Result<Vec<Appointment>, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let records = self.lock()?;
        Ok(records
            .get(professional_id)
            .map(ProfessionalRecords::appointment_snapshot)
            .unwrap_or_default())
    }

    async fn create_appointment(
        &self,
        professional_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, InfraError> {
        let created = prepare_new_appointment(appointment)?;
        self.mutate_appointments(professional_id, |appointments| {
            appointments.insert(created.id.clone(), encode_appointment(&created));
            Ok(created)
        })
    }

    async fn update_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, InfraError> {
        let appointment_id = appointment_id.trim();
        self.mutate_appointments(professional_id, |appointments| {
            let document = appointments
                .get(appointment_id)
                .ok_or_else(|| InfraError::NotFound(format!("appointment {appointment_id}")))?;
            let existing = decode_appointment(appointment_id, document)?;
            let updated = prepare_patched_appointment(&existing, patch)?;
            appointments.insert(updated.id.clone(), encode_appointment(&updated));
            Ok(updated)
        })
    }

    async fn delete_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
    ) -> Result<(), InfraError> {
        let appointment_id = appointment_id.trim();
        self.mutate_appointments(professional_id, |appointments| {
            appointments
                .remove(appointment_id)
                .map(|_| ())
                .ok_or_else(|| InfraError::NotFound(format!("appointment {appointment_id}")))
        })
    }

    async fn subscribe_appointments(&self, professional_id: &str) -> Result<AppointmentFeed, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        // Hold the record lock while subscribing so no change slips between
        // the snapshot and the live channel.
        let records = self.lock()?;
        let current = records
            .get(professional_id)
            .map(ProfessionalRecords::appointment_snapshot)
            .unwrap_or_default();
        let feed = self.hub.subscribe(professional_id, Arc::new(current))?;
        drop(records);
        Ok(feed)
    }
}

#[async_trait]
impl ServiceStore for InMemoryAgendaStore {
    async fn list_services(&self, professional_id: &str) -> Result<Vec<Service>, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let records = self.lock()?;
        Ok(records
            .get(professional_id)
            .map(|professional| {
                decode_service_snapshot(
                    professional
                        .services
                        .iter()
                        .map(|(id, document)| (id.as_str(), document)),
                )
            })
            .unwrap_or_default())
    }

    async fn create_service(
        &self,
        professional_id: &str,
        service: &NewService,
    ) -> Result<Service, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let created = prepare_new_service(service)?;
        let mut records = self.lock()?;
        records
            .entry(professional_id.to_string())
            .or_default()
            .services
            .insert(created.id.clone(), encode_service(&created));
        Ok(created)
    }

    async fn update_service(&self, professional_id: &str, service: &Service) -> Result<Service, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        service.validate().map_err(InfraError::InvalidRecord)?;
        let mut records = self.lock()?;
        let services = &mut records.entry(professional_id.to_string()).or_default().services;
        let Some(document) = services.get_mut(service.id.trim()) else {
            return Err(InfraError::NotFound(format!("service {}", service.id)));
        };
        *document = encode_service(service);
        Ok(service.clone())
    }

    async fn delete_service(&self, professional_id: &str, service_id: &str) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let mut records = self.lock()?;
        records
            .get_mut(professional_id)
            .and_then(|professional| professional.services.remove(service_id.trim()))
            .map(|_| ())
            .ok_or_else(|| InfraError::NotFound(format!("service {service_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AppointmentStatus, ClientInfo, TimeSlot};
    use chrono::{DateTime, Utc};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn slot(start: &str, end: &str) -> NewAppointment {
        NewAppointment::available(&TimeSlot::new(fixed_time(start), fixed_time(end)))
    }

    #[tokio::test]
    async fn create_list_update_delete_roundtrip() {
        let store = InMemoryAgendaStore::default();
        let created = store
            .create_appointment("pro-1", &slot("2026-02-16T09:00:00Z", "2026-02-16T09:30:00Z"))
            .await
            .expect("create");

        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Booked),
            client_info: Some(Some(ClientInfo::new("Ana", "ana@example.com", "555-0101"))),
            ..AppointmentPatch::default()
        };
        let updated = store
            .update_appointment("pro-1", &created.id, &patch)
            .await
            .expect("update");
        assert_eq!(updated.status, AppointmentStatus::Booked);

        let listed = store.list_appointments("pro-1").await.expect("list");
        assert_eq!(listed, vec![updated.clone()]);

        store
            .delete_appointment("pro-1", &created.id)
            .await
            .expect("delete");
        assert!(store.list_appointments("pro-1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn writes_are_validated_and_missing_ids_reported() {
        let store = InMemoryAgendaStore::default();
        let mut inverted = slot("2026-02-16T09:30:00Z", "2026-02-16T09:00:00Z");
        inverted.status = AppointmentStatus::Available;
        assert!(matches!(
            store.create_appointment("pro-1", &inverted).await,
            Err(InfraError::InvalidRecord(_))
        ));

        let created = store
            .create_appointment("pro-1", &slot("2026-02-16T09:00:00Z", "2026-02-16T09:30:00Z"))
            .await
            .expect("create");
        let booked_without_name = AppointmentPatch {
            status: Some(AppointmentStatus::Booked),
            ..AppointmentPatch::default()
        };
        assert!(store
            .update_appointment("pro-1", &created.id, &booked_without_name)
            .await
            .is_err());

        assert!(matches!(
            store.delete_appointment("pro-1", "missing").await,
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn professionals_do_not_see_each_other() {
        let store = InMemoryAgendaStore::default();
        store
            .create_appointment("pro-1", &slot("2026-02-16T09:00:00Z", "2026-02-16T09:30:00Z"))
            .await
            .expect("create");
        assert!(store.list_appointments("pro-2").await.expect("list").is_empty());
        assert!(store.list_appointments(" ").await.is_err());
    }

    #[tokio::test]
    async fn subscription_receives_snapshot_after_each_mutation() {
        let store = InMemoryAgendaStore::default();
        let mut feed = store.subscribe_appointments("pro-1").await.expect("subscribe");
        assert!(feed.recv().await.expect("initial").is_empty());

        let created = store
            .create_appointment("pro-1", &slot("2026-02-16T09:00:00Z", "2026-02-16T09:30:00Z"))
            .await
            .expect("create");
        let after_create = feed.recv().await.expect("after create");
        assert_eq!(after_create[0].id, created.id);

        store
            .delete_appointment("pro-1", &created.id)
            .await
            .expect("delete");
        assert!(feed.recv().await.expect("after delete").is_empty());
    }

    #[tokio::test]
    async fn legacy_documents_are_normalized_or_skipped() {
        let store = InMemoryAgendaStore::default();
        let legacy: AppointmentDocument = serde_json::from_value(serde_json::json!({
            "startTime": "2026-02-16T09:00:00Z",
            "endTime": "2026-02-16T10:00:00Z",
            "status": "attended",
            "serviceId": "",
            "clientInfo": { "name": "Eva", "email": "", "phone": "" }
        }))
        .expect("document");
        store
            .insert_appointment_document("pro-1", "legacy-1", legacy)
            .expect("insert");
        store
            .insert_appointment_document("pro-1", "broken", AppointmentDocument::default())
            .expect("insert");

        let listed = store.list_appointments("pro-1").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].service_id, None);
        assert_eq!(listed[0].payment, 0);
    }

    #[tokio::test]
    async fn service_crud_validates_and_tracks_ids() {
        let store = InMemoryAgendaStore::default();
        let created = store
            .create_service(
                "pro-1",
                &NewService {
                    name: "Cut".to_string(),
                    description: String::new(),
                    price: 30,
                    duration_minutes: 45,
                    available: true,
                    photos: Vec::new(),
                },
            )
            .await
            .expect("create");

        let mut renamed = created.clone();
        renamed.name = "Cut & style".to_string();
        store.update_service("pro-1", &renamed).await.expect("update");
        assert_eq!(
            store.list_services("pro-1").await.expect("list")[0].name,
            "Cut & style"
        );

        let mut invalid = renamed.clone();
        invalid.duration_minutes = 0;
        assert!(store.update_service("pro-1", &invalid).await.is_err());

        store
            .delete_service("pro-1", &created.id)
            .await
            .expect("delete");
        assert!(matches!(
            store.delete_service("pro-1", &created.id).await,
            Err(InfraError::NotFound(_))
        ));
    }
}
