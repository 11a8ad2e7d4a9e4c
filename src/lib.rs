//! Appointment slot scheduling, blocking and accounting for a single service
//! professional. Storage goes through [`AppointmentStore`] and
//! [`ServiceStore`]; [`AgendaState`] wraps everything behind string-typed
//! commands backed by a SQLite workspace.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::accounts::{summarize, AccountsMonitor};
pub use application::appointments::{AppointmentDraft, AppointmentService, NowProvider};
pub use application::blocking::{BlockOutcome, BlockingService};
pub use application::booking::BookingService;
pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::catalog::CatalogService;
pub use application::commands::{AgendaState, AppointmentForm, ServiceForm};
pub use application::error::AgendaError;
pub use application::schedule::{ScheduleBuilder, ScheduleReport};
pub use domain::accounting::{AccountsSummary, AppointmentView, TrailingWindow};
pub use domain::blocking::BlockRequest;
pub use domain::models::{
    Appointment, AppointmentStatus, ClientInfo, Money, NewAppointment, NewService, Service,
    TimeSlot,
};
pub use domain::slots::ScheduleRequest;
pub use infrastructure::config::AgendaConfig;
pub use infrastructure::error::InfraError;
pub use infrastructure::feed::AppointmentFeed;
pub use infrastructure::memory_store::InMemoryAgendaStore;
pub use infrastructure::sqlite_store::SqliteAgendaStore;
pub use infrastructure::store::{AppointmentStore, ServiceStore};
