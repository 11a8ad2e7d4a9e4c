use crate::domain::models::{
    normalize_optional, Appointment, AppointmentStatus, ClientInfo, Money, Service,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Appointment as it sits in the document store. Every field is optional
/// because older records were written by hand-rolled forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub client_info: Option<ClientInfoDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfoDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
}

pub fn encode_appointment(appointment: &Appointment) -> AppointmentDocument {
    AppointmentDocument {
        start_time: Some(appointment.start_time.to_rfc3339()),
        end_time: Some(appointment.end_time.to_rfc3339()),
        duration: Some(appointment.duration_minutes()),
        status: Some(appointment.status.as_str().to_string()),
        service_id: appointment.service_id.clone(),
        client_info: appointment.client_info.as_ref().map(|client| ClientInfoDocument {
            name: Some(client.name.clone()),
            email: Some(client.email.clone()),
            phone: Some(client.phone.clone()),
        }),
        payment: Some(Value::from(appointment.payment)),
        created_at: Some(appointment.created_at.to_rfc3339()),
    }
}

/// Strict view of a stored appointment. The stored `duration` is ignored and
/// recomputed from the instants.
pub fn decode_appointment(id: &str, document: &AppointmentDocument) -> Result<Appointment, InfraError> {
    let id = normalize_optional(Some(id))
        .ok_or_else(|| InfraError::InvalidRecord("appointment id must not be empty".to_string()))?;

    let start_time = parse_required_instant(document.start_time.as_deref(), &id, "startTime")?;
    let end_time = parse_required_instant(document.end_time.as_deref(), &id, "endTime")?;
    if end_time <= start_time {
        return Err(InfraError::InvalidRecord(format!(
            "appointment {id}: endTime is not after startTime"
        )));
    }

    let raw_status = document.status.as_deref().unwrap_or_default();
    let status = AppointmentStatus::parse(raw_status).ok_or_else(|| {
        InfraError::InvalidRecord(format!("appointment {id}: unknown status '{raw_status}'"))
    })?;

    let payment = parse_money(document.payment.as_ref(), &id, "payment")?.unwrap_or(0);
    let created_at = match document.created_at.as_deref() {
        Some(value) if !value.trim().is_empty() => parse_instant(value, &id, "createdAt")?,
        _ => start_time,
    };

    let client_info = document
        .client_info
        .as_ref()
        .map(|client| {
            ClientInfo::new(
                client.name.as_deref().unwrap_or_default(),
                client.email.as_deref().unwrap_or_default(),
                client.phone.as_deref().unwrap_or_default(),
            )
        })
        .filter(|client| !client.is_empty());

    Ok(Appointment {
        id,
        start_time,
        end_time,
        status,
        service_id: normalize_optional(document.service_id.as_deref()),
        client_info,
        payment,
        created_at,
    })
}

pub fn encode_service(service: &Service) -> ServiceDocument {
    ServiceDocument {
        name: Some(service.name.clone()),
        description: Some(service.description.clone()),
        price: Some(Value::from(service.price)),
        duration: Some(Value::from(service.duration_minutes)),
        available: Some(service.available),
        photos: Some(service.photos.clone()),
    }
}

pub fn decode_service(id: &str, document: &ServiceDocument) -> Result<Service, InfraError> {
    let id = normalize_optional(Some(id))
        .ok_or_else(|| InfraError::InvalidRecord("service id must not be empty".to_string()))?;

    let price = parse_money(document.price.as_ref(), &id, "price")?.unwrap_or(0);
    let duration = parse_money(document.duration.as_ref(), &id, "duration")?.unwrap_or(0);
    if duration <= 0 {
        return Err(InfraError::InvalidRecord(format!(
            "service {id}: duration must be a positive number of minutes"
        )));
    }
    let duration_minutes = u32::try_from(duration).map_err(|_| {
        InfraError::InvalidRecord(format!("service {id}: duration {duration} is out of range"))
    })?;

    Ok(Service {
        name: document.name.as_deref().unwrap_or_default().trim().to_string(),
        description: document
            .description
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        price,
        duration_minutes,
        available: document.available.unwrap_or(true),
        photos: document
            .photos
            .iter()
            .flatten()
            .filter_map(|photo| normalize_optional(Some(photo.as_str())))
            .collect(),
        id,
    })
}

/// Decodes a whole collection, dropping records that cannot be made strict.
/// One broken document must not hide the rest of the calendar.
pub fn decode_appointment_snapshot<'a, I>(documents: I) -> Vec<Appointment>
where
    I: IntoIterator<Item = (&'a str, &'a AppointmentDocument)>,
{
    let mut appointments = documents
        .into_iter()
        .filter_map(|(id, document)| match decode_appointment(id, document) {
            Ok(appointment) => Some(appointment),
            Err(error) => {
                tracing::warn!(appointment_id = id, %error, "skipping invalid appointment record");
                None
            }
        })
        .collect::<Vec<_>>();
    appointments.sort_by(|left, right| {
        left.start_time
            .cmp(&right.start_time)
            .then_with(|| left.id.cmp(&right.id))
    });
    appointments
}

pub fn decode_service_snapshot<'a, I>(documents: I) -> Vec<Service>
where
    I: IntoIterator<Item = (&'a str, &'a ServiceDocument)>,
{
    documents
        .into_iter()
        .filter_map(|(id, document)| match decode_service(id, document) {
            Ok(service) => Some(service),
            Err(error) => {
                tracing::warn!(service_id = id, %error, "skipping invalid service record");
                None
            }
        })
        .collect()
}

fn parse_required_instant(
    value: Option<&str>,
    id: &str,
    field_name: &str,
) -> Result<DateTime<Utc>, InfraError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| InfraError::InvalidRecord(format!("appointment {id}: {field_name} is missing")))?;
    parse_instant(value, id, field_name)
}

fn parse_instant(value: &str, id: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidRecord(format!("record {id}: invalid {field_name} '{value}': {error}"))
        })
}

/// Accepts numbers and numeric strings; blanks count as absent.
fn parse_money(value: Option<&Value>, id: &str, field_name: &str) -> Result<Option<Money>, InfraError> {
    let invalid = |raw: &dyn std::fmt::Display| {
        InfraError::InvalidRecord(format!("record {id}: invalid {field_name} '{raw}'"))
    };
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(whole) => whole,
            None => number
                .as_f64()
                .filter(|float| float.is_finite())
                .map(|float| float.round() as Money)
                .ok_or_else(|| invalid(number))?,
        },
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            match text.parse::<Money>() {
                Ok(whole) => whole,
                Err(_) => text
                    .parse::<f64>()
                    .ok()
                    .filter(|float| float.is_finite())
                    .map(|float| float.round() as Money)
                    .ok_or_else(|| invalid(&text))?,
            }
        }
        Some(other) => return Err(invalid(other)),
    };
    if parsed < 0 {
        return Err(InfraError::InvalidRecord(format!(
            "record {id}: {field_name} must not be negative"
        )));
    }
    Ok(Some(parsed))
}
