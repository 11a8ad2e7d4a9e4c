use crate::domain::models::{Appointment, AppointmentStatus, Money, Service};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrailingWindow {
    Days(u32),
    All,
}

impl TrailingWindow {
    pub const PRESETS: [TrailingWindow; 5] = [
        TrailingWindow::Days(7),
        TrailingWindow::Days(15),
        TrailingWindow::Days(30),
        TrailingWindow::Days(90),
        TrailingWindow::All,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        value.parse::<u32>().ok().map(Self::Days)
    }

    /// `now - start <= days`; appointments in the future are always inside.
    pub fn includes(self, start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Days(days) => now - start_time <= Duration::days(i64::from(days)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentView {
    Pending,
    History,
    Review,
    All,
}

impl AppointmentView {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "history" => Some(Self::History),
            "review" => Some(Self::Review),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Price of the referenced service; unassigned or unknown services cost 0.
pub fn price_of(service_id: Option<&str>, services: &[Service]) -> Money {
    service_id
        .and_then(|id| services.iter().find(|service| service.id == id))
        .map(|service| service.price)
        .unwrap_or(0)
}

pub fn owed_amount(price: Money, payment: Money) -> Money {
    (price - payment).max(0)
}

/// Stale unconfirmed slots and attended appointments whose payment does not
/// match the service price, dated today or earlier in the professional's zone.
pub fn needs_review(
    appointment: &Appointment,
    services: &[Service],
    now: DateTime<Utc>,
    time_zone: Tz,
) -> bool {
    let day = appointment.start_time.with_timezone(&time_zone).date_naive();
    let today = now.with_timezone(&time_zone).date_naive();
    if day > today {
        return false;
    }
    match appointment.status {
        AppointmentStatus::Available | AppointmentStatus::Booked => true,
        AppointmentStatus::Attended => {
            appointment.payment != price_of(appointment.service_id.as_deref(), services)
        }
        _ => false,
    }
}

pub fn filter_appointments(
    view: AppointmentView,
    appointments: &[Appointment],
    services: &[Service],
    now: DateTime<Utc>,
    time_zone: Tz,
) -> Vec<Appointment> {
    let mut filtered = appointments
        .iter()
        .filter(|appointment| match view {
            AppointmentView::Pending => appointment.status.is_pending(),
            AppointmentView::History => appointment.status.is_history(),
            AppointmentView::Review => needs_review(appointment, services, now, time_zone),
            AppointmentView::All => true,
        })
        .cloned()
        .collect::<Vec<_>>();
    filtered.sort_by(|left, right| left.start_time.cmp(&right.start_time));
    filtered
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttendedLine {
    pub appointment: Appointment,
    pub service_name: Option<String>,
    pub price: Money,
    pub owed: Money,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttendedGroup {
    pub service_id: String,
    pub service_name: String,
    pub count: u32,
    pub earning_potential: Money,
    pub earned: Money,
    pub owed: Money,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NoShowGroup {
    pub service_id: String,
    pub service_name: String,
    pub count: u32,
    pub lost: Money,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AccountTotals {
    pub earning_potential: Money,
    pub earned: Money,
    pub owed: Money,
    pub lost: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AccountAlerts {
    pub has_review_pending: bool,
    pub has_missing_service: bool,
    pub has_owed_money: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccountsSummary {
    pub window: TrailingWindow,
    pub pending: Vec<Appointment>,
    pub needs_review: Vec<Appointment>,
    pub attended: Vec<AttendedLine>,
    pub no_show: Vec<Appointment>,
    pub totals: AccountTotals,
    pub attended_by_service: Vec<AttendedGroup>,
    pub no_show_by_service: Vec<NoShowGroup>,
    pub alerts: AccountAlerts,
}

/// Recomputes every derived view from one snapshot. Single pass per view;
/// nothing is carried over between snapshots.
pub fn aggregate(
    appointments: &[Appointment],
    services: &[Service],
    window: TrailingWindow,
    now: DateTime<Utc>,
    time_zone: Tz,
) -> AccountsSummary {
    let by_id = services
        .iter()
        .map(|service| (service.id.as_str(), service))
        .collect::<HashMap<_, _>>();
    let lookup = |appointment: &Appointment| {
        appointment
            .service_id
            .as_deref()
            .and_then(|id| by_id.get(id).copied())
    };

    let pending = filter_appointments(AppointmentView::Pending, appointments, services, now, time_zone);
    let needs_review =
        filter_appointments(AppointmentView::Review, appointments, services, now, time_zone);

    let history = filter_appointments(AppointmentView::History, appointments, services, now, time_zone)
        .into_iter()
        .filter(|appointment| window.includes(appointment.start_time, now))
        .collect::<Vec<_>>();

    let attended = history
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Attended)
        .map(|appointment| {
            let service = lookup(appointment);
            let price = service.map(|service| service.price).unwrap_or(0);
            AttendedLine {
                appointment: appointment.clone(),
                service_name: service.map(|service| service.name.clone()),
                price,
                owed: owed_amount(price, appointment.payment),
            }
        })
        .collect::<Vec<_>>();
    let no_show = history
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::NoShow)
        .cloned()
        .collect::<Vec<_>>();

    let mut totals = AccountTotals::default();
    for line in &attended {
        totals.earning_potential += line.price;
        totals.earned += line.appointment.payment;
        totals.owed += line.owed;
    }
    for appointment in &no_show {
        totals.lost += lookup(appointment).map(|service| service.price).unwrap_or(0);
    }
    totals.balance = totals.earned - totals.lost;

    let attended_by_service = services
        .iter()
        .filter_map(|service| {
            let lines = attended
                .iter()
                .filter(|line| line.appointment.service_id.as_deref() == Some(service.id.as_str()))
                .collect::<Vec<_>>();
            if lines.is_empty() {
                return None;
            }
            Some(AttendedGroup {
                service_id: service.id.clone(),
                service_name: service.name.clone(),
                count: lines.len() as u32,
                earning_potential: service.price * lines.len() as Money,
                earned: lines.iter().map(|line| line.appointment.payment).sum(),
                owed: lines.iter().map(|line| line.owed).sum(),
            })
        })
        .collect::<Vec<_>>();

    let no_show_by_service = services
        .iter()
        .filter_map(|service| {
            let count = no_show
                .iter()
                .filter(|appointment| appointment.service_id.as_deref() == Some(service.id.as_str()))
                .count();
            (count > 0).then(|| NoShowGroup {
                service_id: service.id.clone(),
                service_name: service.name.clone(),
                count: count as u32,
                lost: service.price * count as Money,
            })
        })
        .collect::<Vec<_>>();

    let alerts = AccountAlerts {
        has_review_pending: !needs_review.is_empty(),
        has_missing_service: appointments
            .iter()
            .any(|appointment| appointment.status.is_history() && appointment.service_id.is_none()),
        has_owed_money: appointments.iter().any(|appointment| {
            appointment.status == AppointmentStatus::Attended
                && lookup(appointment)
                    .map(|service| appointment.payment < service.price)
                    .unwrap_or(false)
        }),
    };

    AccountsSummary {
        window,
        pending,
        needs_review,
        attended,
        no_show,
        totals,
        attended_by_service,
        no_show_by_service,
        alerts,
    }
}
