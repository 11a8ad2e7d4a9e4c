use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Amounts in whole units of the professional's single currency.
pub type Money = i64;

pub const MAX_SERVICE_PHOTOS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Available,
    Booked,
    Attended,
    NoShow,
    Blocked,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Attended => "attended",
            Self::NoShow => "no-show",
            Self::Blocked => "blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "booked" => Some(Self::Booked),
            "attended" => Some(Self::Attended),
            "no-show" | "no_show" | "noshow" => Some(Self::NoShow),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Not yet resolved: an open slot or a confirmed booking.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Available | Self::Booked)
    }

    /// Resolved after the fact by the professional.
    pub fn is_history(self) -> bool {
        matches!(self, Self::Attended | Self::NoShow)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ClientInfo {
    pub fn new(name: &str, email: &str, phone: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.email.trim().is_empty() && self.phone.trim().is_empty()
    }

    /// A reservation needs every contact field.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.phone.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub service_id: Option<String>,
    pub client_info: Option<ClientInfo>,
    pub payment: Money,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "appointment.id")?;
        validate_appointment_fields(
            self.start_time,
            self.end_time,
            self.status,
            self.service_id.as_deref(),
            self.client_info.as_ref(),
            self.payment,
        )
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn client_email(&self) -> Option<&str> {
        self.client_info
            .as_ref()
            .map(|client| client.email.trim())
            .filter(|email| !email.is_empty())
    }

    pub fn apply(&self, patch: &AppointmentPatch) -> Appointment {
        let mut updated = self.clone();
        if let Some(start_time) = patch.start_time {
            updated.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            updated.end_time = end_time;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(service_id) = &patch.service_id {
            updated.service_id = normalize_optional(service_id.as_deref());
        }
        if let Some(client_info) = &patch.client_info {
            updated.client_info = client_info.clone().filter(|client| !client.is_empty());
        }
        if let Some(payment) = patch.payment {
            updated.payment = payment;
        }
        updated
    }
}

/// An appointment that has not been assigned an id by the store yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub service_id: Option<String>,
    pub client_info: Option<ClientInfo>,
    pub payment: Money,
}

impl NewAppointment {
    pub fn available(slot: &TimeSlot) -> Self {
        Self {
            start_time: slot.start,
            end_time: slot.end,
            status: AppointmentStatus::Available,
            service_id: None,
            client_info: None,
            payment: 0,
        }
    }

    pub fn blocked(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            status: AppointmentStatus::Blocked,
            service_id: None,
            client_info: None,
            payment: 0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_appointment_fields(
            self.start_time,
            self.end_time,
            self.status,
            self.service_id.as_deref(),
            self.client_info.as_ref(),
            self.payment,
        )
    }

    pub fn into_appointment(self, id: String, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            service_id: normalize_optional(self.service_id.as_deref()),
            client_info: self.client_info.filter(|client| !client.is_empty()),
            payment: self.payment,
            created_at,
        }
    }
}

/// Field-level update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub service_id: Option<Option<String>>,
    pub client_info: Option<Option<ClientInfo>>,
    pub payment: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub duration_minutes: u32,
    pub available: bool,
    pub photos: Vec<String>,
}

impl Service {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "service.id")?;
        validate_service_fields(&self.name, self.price, self.duration_minutes, &self.photos)
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub duration_minutes: u32,
    pub available: bool,
    pub photos: Vec<String>,
}

impl NewService {
    pub fn validate(&self) -> Result<(), String> {
        validate_service_fields(&self.name, self.price, self.duration_minutes, &self.photos)
    }

    pub fn into_service(self, id: String) -> Service {
        Service {
            id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            duration_minutes: self.duration_minutes,
            available: self.available,
            photos: self.photos,
        }
    }
}

fn validate_appointment_fields(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: AppointmentStatus,
    service_id: Option<&str>,
    client_info: Option<&ClientInfo>,
    payment: Money,
) -> Result<(), String> {
    if end_time <= start_time {
        return Err("appointment.end_time must be after appointment.start_time".to_string());
    }
    if payment < 0 {
        return Err("appointment.payment must be >= 0".to_string());
    }

    let has_client = client_info.map(|client| !client.is_empty()).unwrap_or(false);
    let has_service = service_id.map(|id| !id.trim().is_empty()).unwrap_or(false);
    match status {
        AppointmentStatus::Available if has_client => {
            Err("appointment.client_info must be empty for available slots".to_string())
        }
        AppointmentStatus::Booked
            if client_info
                .map(|client| client.name.trim().is_empty())
                .unwrap_or(true) =>
        {
            Err("appointment.client_info.name must not be empty for booked appointments".to_string())
        }
        AppointmentStatus::Blocked if has_service || has_client => Err(
            "appointment.service_id and client_info must be empty for blocked ranges".to_string(),
        ),
        _ => Ok(()),
    }
}

fn validate_service_fields(
    name: &str,
    price: Money,
    duration_minutes: u32,
    photos: &[String],
) -> Result<(), String> {
    validate_non_empty(name, "service.name")?;
    if price < 0 {
        return Err("service.price must be >= 0".to_string());
    }
    if duration_minutes == 0 {
        return Err("service.duration_minutes must be > 0".to_string());
    }
    if photos.len() > MAX_SERVICE_PHOTOS {
        return Err(format!(
            "service.photos must contain at most {MAX_SERVICE_PHOTOS} entries"
        ));
    }
    for photo in photos {
        validate_non_empty(photo, "service.photos[]")?;
    }
    Ok(())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_appointment() -> Appointment {
        Appointment {
            id: "apt-1".to_string(),
            start_time: fixed_time("2026-02-16T09:00:00Z"),
            end_time: fixed_time("2026-02-16T09:30:00Z"),
            status: AppointmentStatus::Booked,
            service_id: Some("svc-1".to_string()),
            client_info: Some(ClientInfo::new("Ana", "ana@example.com", "555-0101")),
            payment: 0,
            created_at: fixed_time("2026-02-10T08:00:00Z"),
        }
    }

    fn sample_service() -> Service {
        Service {
            id: "svc-1".to_string(),
            name: "Keratin treatment".to_string(),
            description: "Smoothing".to_string(),
            price: 100,
            duration_minutes: 90,
            available: true,
            photos: vec!["https://cdn.example.com/a.jpg".to_string()],
        }
    }

    #[test]
    fn appointment_validate_accepts_booked_with_client() {
        assert!(sample_appointment().validate().is_ok());
        assert_eq!(sample_appointment().duration_minutes(), 30);
    }

    #[test]
    fn appointment_validate_rejects_invalid_range() {
        let mut appointment = sample_appointment();
        appointment.end_time = appointment.start_time;
        assert!(appointment.validate().is_err());
    }

    #[test]
    fn appointment_validate_enforces_status_invariants() {
        let mut booked = sample_appointment();
        booked.client_info = None;
        assert!(booked.validate().is_err());

        let mut available = sample_appointment();
        available.status = AppointmentStatus::Available;
        assert!(available.validate().is_err());
        available.client_info = None;
        assert!(available.validate().is_ok());

        let mut blocked = sample_appointment();
        blocked.status = AppointmentStatus::Blocked;
        blocked.client_info = None;
        assert!(blocked.validate().is_err());
        blocked.service_id = None;
        assert!(blocked.validate().is_ok());
    }

    #[test]
    fn appointment_validate_rejects_negative_payment() {
        let mut appointment = sample_appointment();
        appointment.status = AppointmentStatus::Attended;
        appointment.payment = -1;
        assert!(appointment.validate().is_err());
    }

    #[test]
    fn overlap_is_half_open() {
        let appointment = sample_appointment();
        assert!(!appointment.overlaps(
            fixed_time("2026-02-16T09:30:00Z"),
            fixed_time("2026-02-16T10:00:00Z")
        ));
        assert!(!appointment.overlaps(
            fixed_time("2026-02-16T08:30:00Z"),
            fixed_time("2026-02-16T09:00:00Z")
        ));
        assert!(appointment.overlaps(
            fixed_time("2026-02-16T09:29:00Z"),
            fixed_time("2026-02-16T10:00:00Z")
        ));
    }

    #[test]
    fn patch_clears_empty_service_and_client() {
        let patched = sample_appointment().apply(&AppointmentPatch {
            status: Some(AppointmentStatus::Available),
            service_id: Some(Some("  ".to_string())),
            client_info: Some(Some(ClientInfo::default())),
            ..AppointmentPatch::default()
        });
        assert_eq!(patched.status, AppointmentStatus::Available);
        assert_eq!(patched.service_id, None);
        assert_eq!(patched.client_info, None);
        assert!(patched.validate().is_ok());
    }

    #[test]
    fn status_parse_accepts_legacy_spellings() {
        assert_eq!(AppointmentStatus::parse("no-show"), Some(AppointmentStatus::NoShow));
        assert_eq!(AppointmentStatus::parse("NO_SHOW"), Some(AppointmentStatus::NoShow));
        assert_eq!(AppointmentStatus::parse("cancelled"), None);
        assert_eq!(AppointmentStatus::NoShow.as_str(), "no-show");
    }

    #[test]
    fn service_validate_limits_photos() {
        let mut service = sample_service();
        assert!(service.validate().is_ok());
        service.photos = (0..6).map(|index| format!("https://cdn/{index}.jpg")).collect();
        assert!(service.validate().is_err());
    }

    #[test]
    fn service_validate_rejects_zero_duration_and_negative_price() {
        let mut service = sample_service();
        service.duration_minutes = 0;
        assert!(service.validate().is_err());

        let mut service = sample_service();
        service.price = -5;
        assert!(service.validate().is_err());
    }

    #[test]
    fn domain_models_support_serde_roundtrip() {
        let appointment = sample_appointment();
        let service = sample_service();

        let appointment_roundtrip: Appointment = serde_json::from_str(
            &serde_json::to_string(&appointment).expect("serialize appointment"),
        )
        .expect("deserialize appointment");
        let service_roundtrip: Service =
            serde_json::from_str(&serde_json::to_string(&service).expect("serialize service"))
                .expect("deserialize service");

        assert_eq!(appointment_roundtrip, appointment);
        assert_eq!(service_roundtrip, service);
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::NoShow).expect("serialize status"),
            "\"no-show\""
        );
    }
}
