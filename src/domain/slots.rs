use crate::domain::models::TimeSlot;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;

/// Walks forward from `day_start` in steps of `duration_minutes`, yielding only
/// slots that end at or before `day_end`. A trailing partial slot is dropped.
pub fn generate_time_slots(
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    duration_minutes: i64,
) -> TimeSlots {
    TimeSlots {
        current: day_start,
        end: day_end,
        step: (duration_minutes > 0).then(|| Duration::minutes(duration_minutes)),
    }
}

#[derive(Debug, Clone)]
pub struct TimeSlots {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Option<Duration>,
}

impl Iterator for TimeSlots {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.step?;
        let slot_end = self.current + step;
        if slot_end > self.end {
            self.step = None;
            return None;
        }
        let slot = TimeSlot::new(self.current, slot_end);
        self.current = slot_end;
        Some(slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: HashSet<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

impl ScheduleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err("schedule.end_date must not be before schedule.start_date".to_string());
        }
        if self.weekdays.is_empty() {
            return Err("schedule.weekdays must not be empty".to_string());
        }
        if self.slot_minutes == 0 {
            return Err("schedule.slot_minutes must be > 0".to_string());
        }
        Ok(())
    }

    /// Every date in the inclusive range whose weekday was selected.
    pub fn matching_days(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|date| *date <= self.end_date)
            .filter(|date| self.weekdays.contains(&date.weekday()))
            .collect()
    }

    /// Candidate slots per matching day, resolved in the professional's zone.
    /// Days whose window is empty or inverted yield no slots.
    pub fn candidate_slots(&self, time_zone: Tz) -> Vec<DaySlots> {
        self.matching_days()
            .into_iter()
            .map(|date| {
                let slots = match (
                    local_instant(time_zone, date, self.start_time),
                    local_instant(time_zone, date, self.end_time),
                ) {
                    (Some(day_start), Some(day_end)) if day_start < day_end => {
                        generate_time_slots(day_start, day_end, i64::from(self.slot_minutes))
                            .collect()
                    }
                    _ => Vec::new(),
                };
                DaySlots { date, slots }
            })
            .collect()
    }
}

/// Earliest instant for a local wall-clock time; `None` inside a DST gap.
pub fn local_instant(time_zone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    time_zone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|value| value.with_timezone(&Utc))
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_lowercase().as_str() {
        "monday" | "mon" | "lunes" => Some(Weekday::Mon),
        "tuesday" | "tue" | "martes" => Some(Weekday::Tue),
        "wednesday" | "wed" | "miercoles" | "miércoles" => Some(Weekday::Wed),
        "thursday" | "thu" | "jueves" => Some(Weekday::Thu),
        "friday" | "fri" | "viernes" => Some(Weekday::Fri),
        "saturday" | "sat" | "sabado" | "sábado" => Some(Weekday::Sat),
        "sunday" | "sun" | "domingo" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn hhmm(value: &str) -> NaiveTime {
        NaiveTime::parse_from_str(value, "%H:%M").expect("valid time")
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn sample_request() -> ScheduleRequest {
        ScheduleRequest {
            start_date: date("2026-02-16"),
            end_date: date("2026-02-22"),
            weekdays: HashSet::from([Weekday::Mon, Weekday::Wed]),
            start_time: hhmm("09:00"),
            end_time: hhmm("11:00"),
            slot_minutes: 30,
        }
    }

    #[test]
    fn generator_discards_partial_trailing_slot() {
        let slots = generate_time_slots(
            fixed_time("2026-02-16T09:00:00Z"),
            fixed_time("2026-02-16T10:10:00Z"),
            30,
        )
        .collect::<Vec<_>>();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end, fixed_time("2026-02-16T10:00:00Z"));
    }

    #[test]
    fn generator_is_empty_for_inverted_window_or_zero_duration() {
        let start = fixed_time("2026-02-16T11:00:00Z");
        let end = fixed_time("2026-02-16T09:00:00Z");
        assert_eq!(generate_time_slots(start, end, 30).count(), 0);
        assert_eq!(generate_time_slots(end, start, 0).count(), 0);
        assert_eq!(generate_time_slots(end, start, -15).count(), 0);
    }

    #[test]
    fn generator_is_restartable() {
        let slots = generate_time_slots(
            fixed_time("2026-02-16T09:00:00Z"),
            fixed_time("2026-02-16T11:00:00Z"),
            30,
        );
        let first = slots.clone().collect::<Vec<_>>();
        let second = slots.collect::<Vec<_>>();
        assert_eq!(first, second);
    }

    #[test]
    fn matching_days_include_both_range_ends() {
        let mut request = sample_request();
        request.end_date = date("2026-02-23");
        let days = request.matching_days();
        assert_eq!(
            days,
            vec![date("2026-02-16"), date("2026-02-18"), date("2026-02-23")]
        );
    }

    #[test]
    fn candidate_slots_use_professional_time_zone() {
        let request = sample_request();
        let time_zone: Tz = "America/Mexico_City".parse().expect("known zone");
        let days = request.candidate_slots(time_zone);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].slots.len(), 4);
        assert_eq!(days[0].slots[0].start, fixed_time("2026-02-16T15:00:00Z"));
    }

    #[test]
    fn inverted_daily_window_yields_empty_days() {
        let mut request = sample_request();
        request.start_time = hhmm("11:00");
        request.end_time = hhmm("09:00");
        let days = request.candidate_slots(Tz::UTC);
        assert_eq!(days.len(), 2);
        assert!(days.iter().all(|day| day.slots.is_empty()));
    }

    #[test]
    fn request_validation_rejects_missing_selection() {
        let mut request = sample_request();
        request.weekdays.clear();
        assert!(request.validate().is_err());

        let mut request = sample_request();
        request.slot_minutes = 0;
        assert!(request.validate().is_err());

        let mut request = sample_request();
        request.end_date = date("2026-02-01");
        assert!(request.validate().is_err());
    }

    #[test]
    fn weekday_names_accept_english_and_spanish() {
        assert_eq!(parse_weekday("Lunes"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Miércoles"), Some(Weekday::Wed));
        assert_eq!(parse_weekday(" sat "), Some(Weekday::Sat));
        assert_eq!(parse_weekday("someday"), None);
    }

    // Every slot has the requested length, stays inside the window and
    // follows the previous one without gap or overlap.
    proptest! {
        #[test]
        fn generated_slots_are_contiguous_and_bounded(
            start_offset in 0i64..1_440,
            window in 1i64..1_440,
            duration in 1i64..240
        ) {
            let day_start = fixed_time("2026-02-16T00:00:00Z") + Duration::minutes(start_offset);
            let day_end = day_start + Duration::minutes(window);
            let slots = generate_time_slots(day_start, day_end, duration).collect::<Vec<_>>();

            prop_assert_eq!(slots.len() as i64, window / duration);
            for slot in &slots {
                prop_assert_eq!(slot.duration_minutes(), duration);
                prop_assert!(slot.end <= day_end);
            }
            for pair in slots.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            if let Some(first) = slots.first() {
                prop_assert_eq!(first.start, day_start);
            }
        }
    }
}
