use crate::application::error::AgendaError;
use crate::domain::reconcile::{plan_schedule, ReconcileAction, SchedulePlan};
use crate::domain::slots::ScheduleRequest;
use crate::infrastructure::store::AppointmentStore;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScheduleReport {
    pub days_visited: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub replaced: usize,
}

impl From<&SchedulePlan> for ScheduleReport {
    fn from(plan: &SchedulePlan) -> Self {
        Self {
            days_visited: plan.days_visited,
            inserted: plan.inserted_count(),
            skipped: plan.skipped_count(),
            replaced: plan.replaced_count(),
        }
    }
}

/// Fills a date range with available slots and reconciles them against what
/// the professional already has.
pub struct ScheduleBuilder<S>
where
    S: AppointmentStore,
{
    store: Arc<S>,
}

impl<S> ScheduleBuilder<S>
where
    S: AppointmentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Computes the plan without writing anything.
    pub async fn preview(
        &self,
        professional_id: &str,
        request: &ScheduleRequest,
        time_zone: Tz,
    ) -> Result<SchedulePlan, AgendaError> {
        request.validate().map_err(AgendaError::Validation)?;
        let existing = self.store.list_appointments(professional_id).await?;
        let days = request.candidate_slots(time_zone);
        for day in &days {
            tracing::debug!(date = %day.date, slots = day.slots.len(), "candidate slots");
        }
        Ok(plan_schedule(&days, &existing))
    }

    /// Applies the plan as independent writes in chronological order. The
    /// first failed write stops the run; nothing already written is undone.
    pub async fn generate(
        &self,
        professional_id: &str,
        request: &ScheduleRequest,
        time_zone: Tz,
    ) -> Result<ScheduleReport, AgendaError> {
        let plan = self.preview(professional_id, request, time_zone).await?;
        let planned = plan.mutation_count();
        let mut applied = 0;

        for slot_plan in &plan.slots {
            if let ReconcileAction::Skip { booked_ids } = &slot_plan.action {
                tracing::info!(
                    professional_id,
                    start = %slot_plan.slot.start,
                    booked = ?booked_ids,
                    "slot skipped over confirmed booking"
                );
                continue;
            }

            for stale_id in slot_plan.stale_ids() {
                self.store
                    .delete_appointment(professional_id, stale_id)
                    .await
                    .map_err(|source| Self::stopped(applied, planned, source))?;
                applied += 1;
                tracing::debug!(professional_id, stale_id = %stale_id, "stale slot replaced");
            }

            if let Some(appointment) = slot_plan.new_appointment() {
                self.store
                    .create_appointment(professional_id, &appointment)
                    .await
                    .map_err(|source| Self::stopped(applied, planned, source))?;
                applied += 1;
            }
        }

        let report = ScheduleReport::from(&plan);
        tracing::info!(
            professional_id,
            days = report.days_visited,
            inserted = report.inserted,
            skipped = report.skipped,
            replaced = report.replaced,
            "schedule generated"
        );
        Ok(report)
    }

    fn stopped(
        applied: usize,
        planned: usize,
        source: crate::infrastructure::error::InfraError,
    ) -> AgendaError {
        tracing::warn!(applied, planned, error = %source, "schedule generation stopped");
        AgendaError::PartiallyApplied {
            applied,
            planned,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Appointment, AppointmentPatch, AppointmentStatus, ClientInfo, NewAppointment,
    };
    use crate::infrastructure::error::InfraError;
    use crate::infrastructure::feed::AppointmentFeed;
    use crate::infrastructure::memory_store::InMemoryAgendaStore;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to the in-memory store and starts failing after a number of
    /// successful writes.
    struct FlakyStore {
        inner: InMemoryAgendaStore,
        writes_before_failure: usize,
        writes: AtomicUsize,
    }

    impl FlakyStore {
        fn failing_after(writes_before_failure: usize) -> Self {
            Self {
                inner: InMemoryAgendaStore::default(),
                writes_before_failure,
                writes: AtomicUsize::new(0),
            }
        }

        fn check_write(&self) -> Result<(), InfraError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) >= self.writes_before_failure {
                return Err(InfraError::Unavailable("permission denied".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AppointmentStore for FlakyStore {
        async fn list_appointments(&self, professional_id: &str) -> Result<Vec<Appointment>, InfraError> {
            self.inner.list_appointments(professional_id).await
        }

        async fn create_appointment(
            &self,
            professional_id: &str,
            appointment: &NewAppointment,
        ) -> Result<Appointment, InfraError> {
            self.check_write()?;
            self.inner.create_appointment(professional_id, appointment).await
        }

        async fn update_appointment(
            &self,
            professional_id: &str,
            appointment_id: &str,
            patch: &AppointmentPatch,
        ) -> Result<Appointment, InfraError> {
            self.check_write()?;
            self.inner
                .update_appointment(professional_id, appointment_id, patch)
                .await
        }

        async fn delete_appointment(
            &self,
            professional_id: &str,
            appointment_id: &str,
        ) -> Result<(), InfraError> {
            self.check_write()?;
            self.inner.delete_appointment(professional_id, appointment_id).await
        }

        async fn subscribe_appointments(&self, professional_id: &str) -> Result<AppointmentFeed, InfraError> {
            self.inner.subscribe_appointments(professional_id).await
        }
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn hhmm(value: &str) -> NaiveTime {
        NaiveTime::parse_from_str(value, "%H:%M").expect("valid time")
    }

    fn week_request() -> ScheduleRequest {
        ScheduleRequest {
            start_date: date("2026-02-16"),
            end_date: date("2026-02-22"),
            weekdays: HashSet::from([Weekday::Mon, Weekday::Wed]),
            start_time: hhmm("09:00"),
            end_time: hhmm("11:00"),
            slot_minutes: 30,
        }
    }

    async fn book(store: &InMemoryAgendaStore, start: &str, end: &str) -> Appointment {
        store
            .create_appointment(
                "pro-1",
                &NewAppointment {
                    start_time: fixed_time(start),
                    end_time: fixed_time(end),
                    status: AppointmentStatus::Booked,
                    service_id: None,
                    client_info: Some(ClientInfo::new("Marta", "marta@example.com", "555-0142")),
                    payment: 0,
                },
            )
            .await
            .expect("book")
    }

    fn available_starts(appointments: &[Appointment]) -> Vec<DateTime<Utc>> {
        appointments
            .iter()
            .filter(|appointment| appointment.status == AppointmentStatus::Available)
            .map(|appointment| appointment.start_time)
            .collect()
    }

    #[tokio::test]
    async fn generation_skips_booked_slot_and_fills_the_rest() {
        let store = Arc::new(InMemoryAgendaStore::default());
        let booked = book(&store, "2026-02-16T09:30:00Z", "2026-02-16T10:00:00Z").await;
        let builder = ScheduleBuilder::new(Arc::clone(&store));

        let report = builder
            .generate("pro-1", &week_request(), Tz::UTC)
            .await
            .expect("generate");

        assert_eq!(
            report,
            ScheduleReport {
                days_visited: 2,
                inserted: 7,
                skipped: 1,
                replaced: 0
            }
        );
        let listed = store.list_appointments("pro-1").await.expect("list");
        assert_eq!(
            available_starts(&listed),
            vec![
                fixed_time("2026-02-16T09:00:00Z"),
                fixed_time("2026-02-16T10:00:00Z"),
                fixed_time("2026-02-16T10:30:00Z"),
                fixed_time("2026-02-18T09:00:00Z"),
                fixed_time("2026-02-18T09:30:00Z"),
                fixed_time("2026-02-18T10:00:00Z"),
                fixed_time("2026-02-18T10:30:00Z"),
            ]
        );
        assert!(listed.contains(&booked));
    }

    #[tokio::test]
    async fn regeneration_converges_instead_of_duplicating() {
        let store = Arc::new(InMemoryAgendaStore::default());
        let builder = ScheduleBuilder::new(Arc::clone(&store));

        builder
            .generate("pro-1", &week_request(), Tz::UTC)
            .await
            .expect("first run");
        let first = available_starts(&store.list_appointments("pro-1").await.expect("list"));

        let second_report = builder
            .generate("pro-1", &week_request(), Tz::UTC)
            .await
            .expect("second run");
        let second = available_starts(&store.list_appointments("pro-1").await.expect("list"));

        assert_eq!(first, second);
        assert_eq!(second_report.replaced, 8);
    }

    #[tokio::test]
    async fn changed_duration_replaces_stale_boundaries_once() {
        let store = Arc::new(InMemoryAgendaStore::default());
        let builder = ScheduleBuilder::new(Arc::clone(&store));
        let mut hourly = week_request();
        hourly.slot_minutes = 60;
        builder
            .generate("pro-1", &hourly, Tz::UTC)
            .await
            .expect("hourly");

        let report = builder
            .generate("pro-1", &week_request(), Tz::UTC)
            .await
            .expect("half-hourly");

        assert_eq!(report.replaced, 4);
        let listed = store.list_appointments("pro-1").await.expect("list");
        assert_eq!(available_starts(&listed).len(), 8);
    }

    #[tokio::test]
    async fn invalid_request_makes_no_store_calls() {
        let store = Arc::new(FlakyStore::failing_after(0));
        let builder = ScheduleBuilder::new(Arc::clone(&store));
        let mut request = week_request();
        request.weekdays.clear();

        let result = builder.generate("pro-1", &request, Tz::UTC).await;

        assert!(matches!(result, Err(AgendaError::Validation(_))));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_write_stops_batch_and_reports_progress() {
        let store = Arc::new(FlakyStore::failing_after(3));
        let builder = ScheduleBuilder::new(Arc::clone(&store));

        let result = builder.generate("pro-1", &week_request(), Tz::UTC).await;

        match result {
            Err(AgendaError::PartiallyApplied { applied, planned, .. }) => {
                assert_eq!(applied, 3);
                assert_eq!(planned, 8);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(store.inner.list_appointments("pro-1").await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn inverted_hours_produce_no_slots_without_error() {
        let store = Arc::new(InMemoryAgendaStore::default());
        let builder = ScheduleBuilder::new(Arc::clone(&store));
        let mut request = week_request();
        request.start_time = hhmm("11:00");
        request.end_time = hhmm("09:00");

        let report = builder
            .generate("pro-1", &request, Tz::UTC)
            .await
            .expect("generate");
        assert_eq!(report.days_visited, 2);
        assert_eq!(report.inserted, 0);
    }
}
