use crate::domain::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::domain::slots::local_instant;
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRequest {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDecision {
    /// Write exactly this record. `overridden_ids` lists confirmed bookings
    /// the caller agreed to block over.
    Proceed {
        appointment: NewAppointment,
        overridden_ids: Vec<String>,
    },
    /// Booked appointments fall inside the range and the caller has not
    /// confirmed; nothing may be written.
    NeedsConfirmation { conflicts: Vec<Appointment> },
}

/// Turns a date plus optional hours into a single blocked range. Without
/// hours the whole local day up to `day_end` is blocked. Existing records are
/// never touched; overlapping available slots stay in place.
pub fn plan_block(
    request: &BlockRequest,
    time_zone: Tz,
    day_end: NaiveTime,
    existing: &[Appointment],
    confirmed: bool,
) -> Result<BlockDecision, String> {
    let (start_time, end_time) = match (request.start_time, request.end_time) {
        (Some(start), Some(end)) => (start, end),
        (None, None) => (NaiveTime::MIN, day_end),
        _ => {
            return Err(
                "block.start_time and block.end_time must be given together".to_string(),
            );
        }
    };

    let start = local_instant(time_zone, request.date, start_time)
        .ok_or_else(|| format!("block.start_time {start_time} does not exist on {}", request.date))?;
    let end = local_instant(time_zone, request.date, end_time)
        .ok_or_else(|| format!("block.end_time {end_time} does not exist on {}", request.date))?;
    if end <= start {
        return Err("block.end_time must be after block.start_time".to_string());
    }

    let conflicts = existing
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Booked)
        .filter(|appointment| appointment.overlaps(start, end))
        .cloned()
        .collect::<Vec<_>>();

    if !conflicts.is_empty() && !confirmed {
        return Ok(BlockDecision::NeedsConfirmation { conflicts });
    }

    Ok(BlockDecision::Proceed {
        appointment: NewAppointment::blocked(start, end),
        overridden_ids: conflicts.into_iter().map(|appointment| appointment.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ClientInfo;
    use chrono::{DateTime, Utc};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn day_end() -> NaiveTime {
        NaiveTime::from_hms_opt(23, 59, 0).expect("valid time")
    }

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 17).expect("valid date")
    }

    fn booked_at_two() -> Appointment {
        Appointment {
            id: "booked-14".to_string(),
            start_time: fixed_time("2026-02-17T14:00:00Z"),
            end_time: fixed_time("2026-02-17T14:30:00Z"),
            status: AppointmentStatus::Booked,
            service_id: Some("svc-1".to_string()),
            client_info: Some(ClientInfo::new("Marta", "marta@example.com", "555-0142")),
            payment: 0,
            created_at: fixed_time("2026-02-01T00:00:00Z"),
        }
    }

    #[test]
    fn full_day_block_requires_confirmation_over_booking() {
        let request = BlockRequest {
            date: tuesday(),
            start_time: None,
            end_time: None,
        };
        let decision = plan_block(&request, Tz::UTC, day_end(), &[booked_at_two()], false)
            .expect("valid request");

        match decision {
            BlockDecision::NeedsConfirmation { conflicts } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, "booked-14");
            }
            other => panic!("expected confirmation gate, got {other:?}"),
        }
    }

    #[test]
    fn confirmed_full_day_block_spans_midnight_to_day_end() {
        let request = BlockRequest {
            date: tuesday(),
            start_time: None,
            end_time: None,
        };
        let decision = plan_block(&request, Tz::UTC, day_end(), &[booked_at_two()], true)
            .expect("valid request");

        let BlockDecision::Proceed {
            appointment,
            overridden_ids,
        } = decision
        else {
            panic!("expected block to proceed");
        };
        assert_eq!(appointment.status, AppointmentStatus::Blocked);
        assert_eq!(appointment.start_time, fixed_time("2026-02-17T00:00:00Z"));
        assert_eq!(appointment.end_time, fixed_time("2026-02-17T23:59:00Z"));
        assert_eq!(appointment.service_id, None);
        assert_eq!(appointment.client_info, None);
        assert_eq!(appointment.payment, 0);
        assert_eq!(overridden_ids, vec!["booked-14".to_string()]);
    }

    #[test]
    fn partial_block_outside_booking_needs_no_confirmation() {
        let request = BlockRequest {
            date: tuesday(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            end_time: NaiveTime::from_hms_opt(12, 0, 0),
        };
        let decision = plan_block(&request, Tz::UTC, day_end(), &[booked_at_two()], false)
            .expect("valid request");
        assert!(matches!(decision, BlockDecision::Proceed { ref overridden_ids, .. } if overridden_ids.is_empty()));
    }

    #[test]
    fn block_rejects_half_specified_or_inverted_range() {
        let half = BlockRequest {
            date: tuesday(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            end_time: None,
        };
        assert!(plan_block(&half, Tz::UTC, day_end(), &[], false).is_err());

        let inverted = BlockRequest {
            date: tuesday(),
            start_time: NaiveTime::from_hms_opt(12, 0, 0),
            end_time: NaiveTime::from_hms_opt(9, 0, 0),
        };
        assert!(plan_block(&inverted, Tz::UTC, day_end(), &[], false).is_err());
    }

    #[test]
    fn block_uses_local_day_of_professional() {
        let request = BlockRequest {
            date: tuesday(),
            start_time: None,
            end_time: None,
        };
        let time_zone: Tz = "America/Mexico_City".parse().expect("known zone");
        let decision =
            plan_block(&request, time_zone, day_end(), &[], false).expect("valid request");
        let BlockDecision::Proceed { appointment, .. } = decision else {
            panic!("expected block to proceed");
        };
        assert_eq!(appointment.start_time, fixed_time("2026-02-17T06:00:00Z"));
        assert_eq!(appointment.end_time, fixed_time("2026-02-18T05:59:00Z"));
    }
}
