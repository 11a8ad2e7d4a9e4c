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
    prepare_patched_appointment, AppointmentStore, ServiceStore, APPOINTMENTS, SERVICES,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Document store backed by one SQLite table. Each record is a JSON body
/// keyed by professional, collection and id.
#[derive(Debug)]
pub struct SqliteAgendaStore {
    db_path: PathBuf,
    hub: SnapshotHub,
    write_guard: Mutex<()>,
}

impl SqliteAgendaStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            hub: SnapshotHub::default(),
            write_guard: Mutex::new(()),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn write_lock(&self) -> Result<MutexGuard<'_, ()>, InfraError> {
        self.write_guard
            .lock()
            .map_err(|error| InfraError::poisoned("sqlite writer", error))
    }

    fn load_documents<T: DeserializeOwned>(
        connection: &Connection,
        professional_id: &str,
        collection: &str,
    ) -> Result<Vec<(String, T)>, InfraError> {
        let mut statement = connection.prepare(
            "SELECT id, body FROM agenda_documents
             WHERE professional_id = ?1 AND collection = ?2
             ORDER BY id",
        )?;
        let rows = statement.query_map(params![professional_id, collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            match serde_json::from_str::<T>(&body) {
                Ok(document) => documents.push((id, document)),
                Err(error) => {
                    tracing::warn!(record_id = %id, collection, %error, "skipping unreadable document body");
                }
            }
        }
        Ok(documents)
    }

    fn load_document<T: DeserializeOwned>(
        connection: &Connection,
        professional_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, InfraError> {
        let body: Option<String> = connection
            .query_row(
                "SELECT body FROM agenda_documents
                 WHERE professional_id = ?1 AND collection = ?2 AND id = ?3",
                params![professional_id, collection, id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|body| serde_json::from_str(&body).map_err(InfraError::from))
            .transpose()
    }

    fn save_document<T: Serialize>(
        connection: &Connection,
        professional_id: &str,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), InfraError> {
        let body = serde_json::to_string(document)?;
        connection.execute(
            "INSERT INTO agenda_documents (professional_id, collection, id, body, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(professional_id, collection, id) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            params![professional_id, collection, id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_document(
        connection: &Connection,
        professional_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<bool, InfraError> {
        let removed = connection.execute(
            "DELETE FROM agenda_documents
             WHERE professional_id = ?1 AND collection = ?2 AND id = ?3",
            params![professional_id, collection, id],
        )?;
        Ok(removed > 0)
    }

    fn appointment_snapshot(
        connection: &Connection,
        professional_id: &str,
    ) -> Result<Vec<Appointment>, InfraError> {
        let documents =
            Self::load_documents::<AppointmentDocument>(connection, professional_id, APPOINTMENTS)?;
        Ok(decode_appointment_snapshot(
            documents.iter().map(|(id, document)| (id.as_str(), document)),
        ))
    }

    /// Runs after the write is committed, so a failed re-read only costs
    /// subscribers this one snapshot.
    fn publish_snapshot(&self, connection: &Connection, professional_id: &str) {
        if !self.hub.has_subscribers(professional_id) {
            return;
        }
        let published = Self::appointment_snapshot(connection, professional_id)
            .and_then(|snapshot| self.hub.publish(professional_id, Arc::new(snapshot)));
        if let Err(error) = published {
            tracing::warn!(professional_id, %error, "snapshot not published after write");
        }
    }

    /// Stores a raw appointment document without validation.
    pub fn insert_appointment_document(
        &self,
        professional_id: &str,
        appointment_id: &str,
        document: &AppointmentDocument,
    ) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        Self::save_document(
            &connection,
            professional_id,
            APPOINTMENTS,
            appointment_id.trim(),
            document,
        )?;
        self.publish_snapshot(&connection, professional_id);
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for SqliteAgendaStore {
    async fn list_appointments(&self, professional_id: &str) -> Result<Vec<Appointment>, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let connection = self.connect()?;
        Self::appointment_snapshot(&connection, professional_id)
    }

    async fn create_appointment(
        &self,
        professional_id: &str,
        appointment: &NewAppointment,
    ) -> Result<Appointment, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let created = prepare_new_appointment(appointment)?;
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        Self::save_document(
            &connection,
            professional_id,
            APPOINTMENTS,
            &created.id,
            &encode_appointment(&created),
        )?;
        self.publish_snapshot(&connection, professional_id);
        Ok(created)
    }

    async fn update_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let appointment_id = appointment_id.trim();
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        let document = Self::load_document::<AppointmentDocument>(
            &connection,
            professional_id,
            APPOINTMENTS,
            appointment_id,
        )?
        .ok_or_else(|| InfraError::NotFound(format!("appointment {appointment_id}")))?;

        let existing = decode_appointment(appointment_id, &document)?;
        let updated = prepare_patched_appointment(&existing, patch)?;
        Self::save_document(
            &connection,
            professional_id,
            APPOINTMENTS,
            &updated.id,
            &encode_appointment(&updated),
        )?;
        self.publish_snapshot(&connection, professional_id);
        Ok(updated)
    }

    async fn delete_appointment(
        &self,
        professional_id: &str,
        appointment_id: &str,
    ) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let appointment_id = appointment_id.trim();
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        if !Self::remove_document(&connection, professional_id, APPOINTMENTS, appointment_id)? {
            return Err(InfraError::NotFound(format!("appointment {appointment_id}")));
        }
        self.publish_snapshot(&connection, professional_id);
        Ok(())
    }

    async fn subscribe_appointments(&self, professional_id: &str) -> Result<AppointmentFeed, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        let current = Self::appointment_snapshot(&connection, professional_id)?;
        self.hub.subscribe(professional_id, Arc::new(current))
    }
}

#[async_trait]
impl ServiceStore for SqliteAgendaStore {
    async fn list_services(&self, professional_id: &str) -> Result<Vec<Service>, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let connection = self.connect()?;
        let documents = Self::load_documents::<ServiceDocument>(&connection, professional_id, SERVICES)?;
        Ok(decode_service_snapshot(
            documents.iter().map(|(id, document)| (id.as_str(), document)),
        ))
    }

    async fn create_service(
        &self,
        professional_id: &str,
        service: &NewService,
    ) -> Result<Service, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let created = prepare_new_service(service)?;
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        Self::save_document(
            &connection,
            professional_id,
            SERVICES,
            &created.id,
            &encode_service(&created),
        )?;
        Ok(created)
    }

    async fn update_service(&self, professional_id: &str, service: &Service) -> Result<Service, InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        service.validate().map_err(InfraError::InvalidRecord)?;
        let service_id = service.id.trim();
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        let existing = Self::load_document::<ServiceDocument>(
            &connection,
            professional_id,
            SERVICES,
            service_id,
        )?;
        if existing.is_none() {
            return Err(InfraError::NotFound(format!("service {service_id}")));
        }
        Self::save_document(
            &connection,
            professional_id,
            SERVICES,
            service_id,
            &encode_service(service),
        )?;
        Ok(service.clone())
    }

    async fn delete_service(&self, professional_id: &str, service_id: &str) -> Result<(), InfraError> {
        let professional_id = ensure_professional(professional_id)?;
        let service_id = service_id.trim();
        let _guard = self.write_lock()?;
        let connection = self.connect()?;
        if !Self::remove_document(&connection, professional_id, SERVICES, service_id)? {
            return Err(InfraError::NotFound(format!("service {service_id}")));
        }
        Ok(())
    }
}
