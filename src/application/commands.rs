use crate::application::accounts::{summarize, AccountsMonitor};
use crate::application::appointments::{AppointmentDraft, AppointmentService, NowProvider};
use crate::application::blocking::{BlockOutcome, BlockingService};
use crate::application::booking::BookingService;
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::catalog::CatalogService;
use crate::application::error::AgendaError;
use crate::application::schedule::{ScheduleBuilder, ScheduleReport};
use crate::domain::accounting::{AccountsSummary, AppointmentView, TrailingWindow};
use crate::domain::blocking::BlockRequest;
use crate::domain::models::{
    Appointment, AppointmentStatus, ClientInfo, Money, NewService, Service,
};
use crate::domain::reconcile::SchedulePlan;
use crate::domain::slots::{parse_weekday, ScheduleRequest};
use crate::infrastructure::config::{save_timezone, AgendaConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::sqlite_store::SqliteAgendaStore;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub struct AgendaState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    config: Mutex<AgendaConfig>,
    store: Arc<SqliteAgendaStore>,
    now_provider: NowProvider,
    log_guard: Mutex<()>,
}

impl AgendaState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let store = Arc::new(SqliteAgendaStore::new(&bootstrap.database_path));

        Ok(Self {
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path,
            logs_dir: bootstrap.logs_dir,
            config: Mutex::new(bootstrap.config),
            store,
            now_provider: Arc::new(Utc::now),
            log_guard: Mutex::new(()),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn store(&self) -> Arc<SqliteAgendaStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> Result<AgendaConfig, InfraError> {
        self.config
            .lock()
            .map(|config| config.clone())
            .map_err(|error| InfraError::poisoned("agenda config", error))
    }

    pub fn command_error(&self, command: &str, error: &AgendaError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn appointments(&self) -> AppointmentService<SqliteAgendaStore, SqliteAgendaStore> {
        AppointmentService::new(self.store(), self.store())
            .with_now_provider(Arc::clone(&self.now_provider))
    }

    fn booking(&self) -> BookingService<SqliteAgendaStore, SqliteAgendaStore> {
        BookingService::new(self.store(), self.store())
            .with_now_provider(Arc::clone(&self.now_provider))
    }

    fn catalog(&self) -> CatalogService<SqliteAgendaStore> {
        CatalogService::new(self.store())
    }
}

/// Manual appointment form. Times are local to the configured timezone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentForm {
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub payment: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub duration_minutes: u32,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateScheduleResponse {
    pub professional_id: String,
    pub timezone: String,
    pub report: ScheduleReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimezoneResponse {
    pub timezone: String,
}

#[allow(clippy::too_many_arguments)]
pub async fn generate_schedule_impl(
    state: &AgendaState,
    professional_id: String,
    start_date: String,
    end_date: String,
    weekdays: Vec<String>,
    start_time: String,
    end_time: String,
    slot_minutes: Option<u32>,
) -> Result<GenerateScheduleResponse, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let request = build_schedule_request(
        &config,
        &start_date,
        &end_date,
        &weekdays,
        &start_time,
        &end_time,
        slot_minutes,
    )?;

    let report = ScheduleBuilder::new(state.store())
        .generate(professional_id, &request, config.timezone)
        .await?;
    state.log_info(
        "generate_schedule",
        &format!(
            "professional_id={professional_id} inserted={} skipped={} replaced={}",
            report.inserted, report.skipped, report.replaced
        ),
    );
    Ok(GenerateScheduleResponse {
        professional_id: professional_id.to_string(),
        timezone: config.timezone.name().to_string(),
        report,
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn preview_schedule_impl(
    state: &AgendaState,
    professional_id: String,
    start_date: String,
    end_date: String,
    weekdays: Vec<String>,
    start_time: String,
    end_time: String,
    slot_minutes: Option<u32>,
) -> Result<SchedulePlan, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let request = build_schedule_request(
        &config,
        &start_date,
        &end_date,
        &weekdays,
        &start_time,
        &end_time,
        slot_minutes,
    )?;
    ScheduleBuilder::new(state.store())
        .preview(professional_id, &request, config.timezone)
        .await
}

pub async fn block_time_impl(
    state: &AgendaState,
    professional_id: String,
    date: String,
    start_time: Option<String>,
    end_time: Option<String>,
    confirmed: bool,
) -> Result<BlockOutcome, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let request = BlockRequest {
        date: parse_date(&date, "date")?,
        start_time: parse_optional_time(start_time.as_deref(), "start_time")?,
        end_time: parse_optional_time(end_time.as_deref(), "end_time")?,
    };

    let outcome = BlockingService::new(state.store())
        .block(
            professional_id,
            &request,
            config.timezone,
            config.block_day_end,
            confirmed,
        )
        .await?;
    if let BlockOutcome::Blocked {
        appointment,
        overridden_ids,
    } = &outcome
    {
        state.log_info(
            "block_time",
            &format!(
                "professional_id={professional_id} blocked={} overridden={}",
                appointment.id,
                overridden_ids.len()
            ),
        );
    }
    Ok(outcome)
}

pub async fn create_appointment_impl(
    state: &AgendaState,
    professional_id: String,
    form: AppointmentForm,
) -> Result<Appointment, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let draft = build_draft(&form)?;
    let created = state
        .appointments()
        .create(professional_id, &draft, config.timezone)
        .await?;
    state.log_info(
        "create_appointment",
        &format!(
            "professional_id={professional_id} appointment_id={} status={}",
            created.id,
            created.status.as_str()
        ),
    );
    Ok(created)
}

pub async fn edit_appointment_impl(
    state: &AgendaState,
    professional_id: String,
    appointment_id: String,
    form: AppointmentForm,
    outcome: Option<String>,
) -> Result<Appointment, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let appointment_id = required(&appointment_id, "appointment_id")?;
    let config = state.config()?;
    let draft = build_draft(&form)?;
    let outcome = match outcome.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_status(raw)?),
    };

    let updated = state
        .appointments()
        .edit(professional_id, appointment_id, &draft, outcome, config.timezone)
        .await?;
    state.log_info(
        "edit_appointment",
        &format!(
            "professional_id={professional_id} appointment_id={appointment_id} status={}",
            updated.status.as_str()
        ),
    );
    Ok(updated)
}

pub async fn record_outcome_impl(
    state: &AgendaState,
    professional_id: String,
    appointment_id: String,
    outcome: String,
    payment: Option<Money>,
) -> Result<Appointment, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let appointment_id = required(&appointment_id, "appointment_id")?;
    let outcome = parse_status(&outcome)?;
    let updated = state
        .appointments()
        .record_outcome(professional_id, appointment_id, outcome, payment)
        .await?;
    state.log_info(
        "record_outcome",
        &format!(
            "professional_id={professional_id} appointment_id={appointment_id} outcome={} payment={}",
            outcome.as_str(),
            updated.payment
        ),
    );
    Ok(updated)
}

pub async fn delete_appointment_impl(
    state: &AgendaState,
    professional_id: String,
    appointment_id: String,
) -> Result<bool, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let appointment_id = required(&appointment_id, "appointment_id")?;
    state
        .appointments()
        .delete(professional_id, appointment_id)
        .await?;
    state.log_info(
        "delete_appointment",
        &format!("professional_id={professional_id} appointment_id={appointment_id}"),
    );
    Ok(true)
}

pub async fn list_appointments_impl(
    state: &AgendaState,
    professional_id: String,
    view: Option<String>,
) -> Result<Vec<Appointment>, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let view = match view.as_deref().map(str::trim) {
        None | Some("") => AppointmentView::All,
        Some(raw) => AppointmentView::parse(raw).ok_or_else(|| {
            AgendaError::Validation("view must be pending, history, review or all".to_string())
        })?,
    };
    state
        .appointments()
        .list(professional_id, view, config.timezone)
        .await
}

pub async fn open_slots_impl(
    state: &AgendaState,
    professional_id: String,
) -> Result<Vec<Appointment>, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    state.booking().open_slots(professional_id).await
}

pub async fn reserve_slot_impl(
    state: &AgendaState,
    professional_id: String,
    appointment_id: String,
    service_id: String,
    name: String,
    email: String,
    phone: String,
) -> Result<Appointment, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let appointment_id = required(&appointment_id, "appointment_id")?;
    let service_id = required(&service_id, "service_id")?;
    let booked = state
        .booking()
        .reserve(
            professional_id,
            appointment_id,
            service_id,
            ClientInfo::new(&name, &email, &phone),
        )
        .await?;
    state.log_info(
        "reserve_slot",
        &format!("professional_id={professional_id} appointment_id={appointment_id} service_id={service_id}"),
    );
    Ok(booked)
}

pub async fn find_client_appointments_impl(
    state: &AgendaState,
    professional_id: String,
    email: String,
) -> Result<Vec<Appointment>, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    state
        .booking()
        .appointments_for_email(professional_id, &email)
        .await
}

pub async fn list_services_impl(
    state: &AgendaState,
    professional_id: String,
) -> Result<Vec<Service>, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    state.catalog().list(professional_id).await
}

pub async fn bookable_services_impl(
    state: &AgendaState,
    professional_id: String,
) -> Result<Vec<Service>, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    state.catalog().bookable(professional_id).await
}

pub async fn create_service_impl(
    state: &AgendaState,
    professional_id: String,
    form: ServiceForm,
) -> Result<Service, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let created = state
        .catalog()
        .create(professional_id, &new_service(form))
        .await?;
    state.log_info(
        "create_service",
        &format!("professional_id={professional_id} service_id={}", created.id),
    );
    Ok(created)
}

pub async fn update_service_impl(
    state: &AgendaState,
    professional_id: String,
    service_id: String,
    form: ServiceForm,
) -> Result<Service, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let service_id = required(&service_id, "service_id")?;
    let service = new_service(form).into_service(service_id.to_string());
    let updated = state.catalog().update(professional_id, &service).await?;
    state.log_info(
        "update_service",
        &format!("professional_id={professional_id} service_id={service_id}"),
    );
    Ok(updated)
}

pub async fn delete_service_impl(
    state: &AgendaState,
    professional_id: String,
    service_id: String,
) -> Result<bool, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let service_id = required(&service_id, "service_id")?;
    state.catalog().delete(professional_id, service_id).await?;
    state.log_info(
        "delete_service",
        &format!("professional_id={professional_id} service_id={service_id}"),
    );
    Ok(true)
}

pub async fn accounts_summary_impl(
    state: &AgendaState,
    professional_id: String,
    window: Option<String>,
) -> Result<AccountsSummary, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let window = resolve_window(&config, window.as_deref())?;
    let store = state.store();
    summarize(
        store.as_ref(),
        store.as_ref(),
        professional_id,
        window,
        config.timezone,
        &state.now_provider,
    )
    .await
}

pub async fn watch_accounts_impl(
    state: &AgendaState,
    professional_id: String,
    window: Option<String>,
) -> Result<AccountsMonitor, AgendaError> {
    let professional_id = required(&professional_id, "professional_id")?;
    let config = state.config()?;
    let window = resolve_window(&config, window.as_deref())?;
    AccountsMonitor::start(
        state.store(),
        state.store(),
        professional_id,
        window,
        config.timezone,
        Arc::clone(&state.now_provider),
    )
    .await
}

pub fn set_timezone_impl(state: &AgendaState, timezone: String) -> Result<TimezoneResponse, AgendaError> {
    let parsed = save_timezone(&state.config_dir, timezone.trim())?;
    let mut config = state
        .config
        .lock()
        .map_err(|error| InfraError::poisoned("agenda config", error))?;
    config.timezone = parsed;
    state.log_info("set_timezone", &format!("timezone={}", parsed.name()));
    Ok(TimezoneResponse {
        timezone: parsed.name().to_string(),
    })
}

impl AgendaState {
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_schedule(
        &self,
        professional_id: String,
        start_date: String,
        end_date: String,
        weekdays: Vec<String>,
        start_time: String,
        end_time: String,
        slot_minutes: Option<u32>,
    ) -> Result<GenerateScheduleResponse, String> {
        generate_schedule_impl(
            self,
            professional_id,
            start_date,
            end_date,
            weekdays,
            start_time,
            end_time,
            slot_minutes,
        )
        .await
        .map_err(|error| self.command_error("generate_schedule", &error))
    }

    pub async fn block_time(
        &self,
        professional_id: String,
        date: String,
        start_time: Option<String>,
        end_time: Option<String>,
        confirmed: bool,
    ) -> Result<BlockOutcome, String> {
        block_time_impl(self, professional_id, date, start_time, end_time, confirmed)
            .await
            .map_err(|error| self.command_error("block_time", &error))
    }

    pub async fn create_appointment(
        &self,
        professional_id: String,
        form: AppointmentForm,
    ) -> Result<Appointment, String> {
        create_appointment_impl(self, professional_id, form)
            .await
            .map_err(|error| self.command_error("create_appointment", &error))
    }

    pub async fn edit_appointment(
        &self,
        professional_id: String,
        appointment_id: String,
        form: AppointmentForm,
        outcome: Option<String>,
    ) -> Result<Appointment, String> {
        edit_appointment_impl(self, professional_id, appointment_id, form, outcome)
            .await
            .map_err(|error| self.command_error("edit_appointment", &error))
    }

    pub async fn record_outcome(
        &self,
        professional_id: String,
        appointment_id: String,
        outcome: String,
        payment: Option<Money>,
    ) -> Result<Appointment, String> {
        record_outcome_impl(self, professional_id, appointment_id, outcome, payment)
            .await
            .map_err(|error| self.command_error("record_outcome", &error))
    }

    pub async fn delete_appointment(
        &self,
        professional_id: String,
        appointment_id: String,
    ) -> Result<bool, String> {
        delete_appointment_impl(self, professional_id, appointment_id)
            .await
            .map_err(|error| self.command_error("delete_appointment", &error))
    }

    pub async fn reserve_slot(
        &self,
        professional_id: String,
        appointment_id: String,
        service_id: String,
        name: String,
        email: String,
        phone: String,
    ) -> Result<Appointment, String> {
        reserve_slot_impl(self, professional_id, appointment_id, service_id, name, email, phone)
            .await
            .map_err(|error| self.command_error("reserve_slot", &error))
    }

    pub async fn create_service(&self, professional_id: String, form: ServiceForm) -> Result<Service, String> {
        create_service_impl(self, professional_id, form)
            .await
            .map_err(|error| self.command_error("create_service", &error))
    }

    pub async fn update_service(
        &self,
        professional_id: String,
        service_id: String,
        form: ServiceForm,
    ) -> Result<Service, String> {
        update_service_impl(self, professional_id, service_id, form)
            .await
            .map_err(|error| self.command_error("update_service", &error))
    }

    pub async fn delete_service(&self, professional_id: String, service_id: String) -> Result<bool, String> {
        delete_service_impl(self, professional_id, service_id)
            .await
            .map_err(|error| self.command_error("delete_service", &error))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn preview_schedule(
        &self,
        professional_id: String,
        start_date: String,
        end_date: String,
        weekdays: Vec<String>,
        start_time: String,
        end_time: String,
        slot_minutes: Option<u32>,
    ) -> Result<SchedulePlan, String> {
        preview_schedule_impl(
            self,
            professional_id,
            start_date,
            end_date,
            weekdays,
            start_time,
            end_time,
            slot_minutes,
        )
        .await
        .map_err(|error| self.command_error("preview_schedule", &error))
    }

    pub async fn list_appointments(
        &self,
        professional_id: String,
        view: Option<String>,
    ) -> Result<Vec<Appointment>, String> {
        list_appointments_impl(self, professional_id, view)
            .await
            .map_err(|error| self.command_error("list_appointments", &error))
    }

    pub async fn open_slots(&self, professional_id: String) -> Result<Vec<Appointment>, String> {
        open_slots_impl(self, professional_id)
            .await
            .map_err(|error| self.command_error("open_slots", &error))
    }

    pub async fn find_client_appointments(
        &self,
        professional_id: String,
        email: String,
    ) -> Result<Vec<Appointment>, String> {
        find_client_appointments_impl(self, professional_id, email)
            .await
            .map_err(|error| self.command_error("find_client_appointments", &error))
    }

    pub async fn list_services(&self, professional_id: String) -> Result<Vec<Service>, String> {
        list_services_impl(self, professional_id)
            .await
            .map_err(|error| self.command_error("list_services", &error))
    }

    pub async fn bookable_services(&self, professional_id: String) -> Result<Vec<Service>, String> {
        bookable_services_impl(self, professional_id)
            .await
            .map_err(|error| self.command_error("bookable_services", &error))
    }

    pub async fn accounts_summary(
        &self,
        professional_id: String,
        window: Option<String>,
    ) -> Result<AccountsSummary, String> {
        accounts_summary_impl(self, professional_id, window)
            .await
            .map_err(|error| self.command_error("accounts_summary", &error))
    }

    pub async fn watch_accounts(
        &self,
        professional_id: String,
        window: Option<String>,
    ) -> Result<AccountsMonitor, String> {
        watch_accounts_impl(self, professional_id, window)
            .await
            .map_err(|error| self.command_error("watch_accounts", &error))
    }

    pub fn set_timezone(&self, timezone: String) -> Result<TimezoneResponse, String> {
        set_timezone_impl(self, timezone).map_err(|error| self.command_error("set_timezone", &error))
    }
}

fn build_schedule_request(
    config: &AgendaConfig,
    start_date: &str,
    end_date: &str,
    weekdays: &[String],
    start_time: &str,
    end_time: &str,
    slot_minutes: Option<u32>,
) -> Result<ScheduleRequest, AgendaError> {
    let request = ScheduleRequest {
        start_date: parse_date(start_date, "start_date")?,
        end_date: parse_date(end_date, "end_date")?,
        weekdays: parse_weekdays(weekdays)?,
        start_time: parse_time(start_time, "start_time")?,
        end_time: parse_time(end_time, "end_time")?,
        slot_minutes: slot_minutes.unwrap_or(config.default_slot_minutes),
    };
    request.validate().map_err(AgendaError::Validation)?;
    Ok(request)
}

fn build_draft(form: &AppointmentForm) -> Result<AppointmentDraft, AgendaError> {
    let client_info = ClientInfo::new(
        form.client_name.as_deref().unwrap_or_default(),
        form.client_email.as_deref().unwrap_or_default(),
        form.client_phone.as_deref().unwrap_or_default(),
    );
    let payment = form.payment.unwrap_or(0);
    if payment < 0 {
        return Err(AgendaError::Validation(
            "payment must not be negative".to_string(),
        ));
    }

    Ok(AppointmentDraft {
        date: parse_date(&form.date, "date")?,
        start_time: parse_time(&form.start_time, "start_time")?,
        end_time: parse_optional_time(form.end_time.as_deref(), "end_time")?,
        service_id: form.service_id.clone(),
        client_info: (!client_info.is_empty()).then_some(client_info),
        payment,
    })
}

fn new_service(form: ServiceForm) -> NewService {
    NewService {
        name: form.name.trim().to_string(),
        description: form.description.unwrap_or_default().trim().to_string(),
        price: form.price,
        duration_minutes: form.duration_minutes,
        available: form.available.unwrap_or(true),
        photos: form
            .photos
            .iter()
            .map(|photo| photo.trim())
            .filter(|photo| !photo.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    }
}

fn resolve_window(config: &AgendaConfig, raw: Option<&str>) -> Result<TrailingWindow, AgendaError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(config.default_window),
        Some(raw) => TrailingWindow::parse(raw)
            .filter(|window| TrailingWindow::PRESETS.contains(window))
            .ok_or_else(|| AgendaError::Validation("window must be 7, 15, 30, 90 or all".to_string())),
    }
}

fn required<'a>(value: &'a str, field_name: &str) -> Result<&'a str, AgendaError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AgendaError::Validation(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(value)
}

fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, AgendaError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AgendaError::Validation(format!("{field_name} must be YYYY-MM-DD")))
}

fn parse_time(value: &str, field_name: &str) -> Result<NaiveTime, AgendaError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AgendaError::Validation(format!("{field_name} must be HH:MM")))
}

fn parse_optional_time(value: Option<&str>, field_name: &str) -> Result<Option<NaiveTime>, AgendaError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_time(raw, field_name).map(Some),
    }
}

fn parse_weekdays(values: &[String]) -> Result<HashSet<chrono::Weekday>, AgendaError> {
    values
        .iter()
        .map(|value| {
            parse_weekday(value)
                .ok_or_else(|| AgendaError::Validation(format!("unknown weekday {}", value.trim())))
        })
        .collect()
}

fn parse_status(value: &str) -> Result<AppointmentStatus, AgendaError> {
    AppointmentStatus::parse(value)
        .ok_or_else(|| AgendaError::Validation(format!("unknown appointment status {}", value.trim())))
}
