use crate::domain::models::{Appointment, AppointmentStatus, NewAppointment, TimeSlot};
use crate::domain::slots::DaySlots;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// A confirmed booking occupies the candidate; nothing is written.
    Skip { booked_ids: Vec<String> },
    Insert,
    /// Stale available slots are removed before the candidate is inserted.
    ReplaceThenInsert { stale_ids: Vec<String> },
}

pub fn overlapping<'a>(candidate: &TimeSlot, existing: &'a [Appointment]) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|appointment| appointment.overlaps(candidate.start, candidate.end))
        .collect()
}

/// Decides what happens to one candidate slot. Attended, no-show and blocked
/// appointments neither block the insert nor get removed.
pub fn reconcile(candidate: &TimeSlot, existing: &[Appointment]) -> ReconcileAction {
    let overlaps = overlapping(candidate, existing);

    let booked_ids = overlaps
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Booked)
        .map(|appointment| appointment.id.clone())
        .collect::<Vec<_>>();
    if !booked_ids.is_empty() {
        return ReconcileAction::Skip { booked_ids };
    }

    let stale_ids = overlaps
        .iter()
        .filter(|appointment| appointment.status == AppointmentStatus::Available)
        .map(|appointment| appointment.id.clone())
        .collect::<Vec<_>>();
    if stale_ids.is_empty() {
        ReconcileAction::Insert
    } else {
        ReconcileAction::ReplaceThenInsert { stale_ids }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotPlan {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    #[serde(flatten)]
    pub action: ReconcileAction,
}

impl SlotPlan {
    pub fn new_appointment(&self) -> Option<NewAppointment> {
        match self.action {
            ReconcileAction::Skip { .. } => None,
            ReconcileAction::Insert | ReconcileAction::ReplaceThenInsert { .. } => {
                Some(NewAppointment::available(&self.slot))
            }
        }
    }

    pub fn stale_ids(&self) -> &[String] {
        match &self.action {
            ReconcileAction::ReplaceThenInsert { stale_ids } => stale_ids,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulePlan {
    pub days_visited: usize,
    pub slots: Vec<SlotPlan>,
}

impl SchedulePlan {
    pub fn inserted_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|plan| plan.new_appointment().is_some())
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.slots.len() - self.inserted_count()
    }

    pub fn replaced_count(&self) -> usize {
        self.slots.iter().map(|plan| plan.stale_ids().len()).sum()
    }

    /// Number of store writes the plan needs (deletes plus inserts).
    pub fn mutation_count(&self) -> usize {
        self.inserted_count() + self.replaced_count()
    }
}

/// Reconciles every candidate in chronological order against a working copy
/// of the snapshot, so a stale slot removed for one candidate is not deleted
/// again for the next.
pub fn plan_schedule(days: &[DaySlots], existing: &[Appointment]) -> SchedulePlan {
    let mut removed = HashSet::new();
    let mut working = existing.to_vec();
    let mut plan = SchedulePlan {
        days_visited: days.len(),
        slots: Vec::new(),
    };

    let mut candidates = days
        .iter()
        .flat_map(|day| day.slots.iter().map(move |slot| (day.date, slot)))
        .collect::<Vec<_>>();
    candidates.sort_by(|left, right| left.1.start.cmp(&right.1.start));

    for (date, slot) in candidates {
        let action = reconcile(slot, &working);
        if let ReconcileAction::ReplaceThenInsert { stale_ids } = &action {
            removed.extend(stale_ids.iter().cloned());
            working.retain(|appointment| !removed.contains(&appointment.id));
        }
        plan.slots.push(SlotPlan {
            date,
            slot: slot.clone(),
            action,
        });
    }

    plan
}
