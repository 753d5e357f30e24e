//! Trigger condition evaluation.
//!
//! Pure functions: no state, no I/O. Evaluating the same input twice gives
//! the same answer; recording that a firing happened is the engine's job.

use chrono::{DateTime, Utc};

use super::schedule::CronSchedule;
use crate::errors::ConditionError;
use crate::types::{Event, EventCondition, Trigger, TriggerCondition};

/// Whether `event` satisfies the trigger's condition.
///
/// Timer conditions never match events; only clock ticks drive them (see
/// [`matches_tick`]). `now` is accepted so callers can evaluate every
/// condition kind through one entry point.
pub fn matches(
    trigger: &Trigger,
    event: &Event,
    _now: DateTime<Utc>,
) -> Result<bool, ConditionError> {
    match &trigger.condition {
        TriggerCondition::Event(cond) => Ok(matches_event(cond, event)),
        TriggerCondition::Timer(_) => Ok(false),
    }
}

/// Whether the clock tick `now` satisfies the trigger's schedule.
///
/// Event conditions never match ticks. A malformed cron expression is
/// reported as an error; the caller treats the trigger as never matching.
pub fn matches_tick(trigger: &Trigger, now: DateTime<Utc>) -> Result<bool, ConditionError> {
    match &trigger.condition {
        TriggerCondition::Event(_) => Ok(false),
        TriggerCondition::Timer(cond) => {
            let schedule = CronSchedule::parse(&cond.cron_expression)?;
            Ok(schedule.includes(now))
        }
    }
}

/// Field-by-field AND over the present predicates.
///
/// `title_contains` and `description_contains` are case-insensitive
/// substring tests; `contact_equals` is exact and fails when the event has
/// no contact.
pub fn matches_event(cond: &EventCondition, event: &Event) -> bool {
    if let Some(ty) = cond.event_type {
        if ty != event.event_type {
            return false;
        }
    }
    if let Some(ref needle) = cond.title_contains {
        if !contains_ignore_case(&event.title, needle) {
            return false;
        }
    }
    if let Some(ref needle) = cond.description_contains {
        if !contains_ignore_case(&event.description, needle) {
            return false;
        }
    }
    if let Some(ref contact) = cond.contact_equals {
        if event.metadata.contact.as_deref() != Some(contact.as_str()) {
            return false;
        }
    }
    true
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
