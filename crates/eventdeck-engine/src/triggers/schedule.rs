//! Cron schedules for timer triggers.
//!
//! Trigger documents use standard five-field cron (`min hour dom month dow`,
//! Sunday = 0 or 7). The `cron` crate wants seven fields with a seconds
//! column first and numbers weekdays 1-7 from Sunday, so expressions are
//! normalized before parsing.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike, Utc};
use cron::Schedule;

use crate::errors::ConditionError;

/// A parsed five-field cron schedule with minute granularity.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Parse a five-field cron expression.
    pub fn parse(expression: &str) -> Result<Self, ConditionError> {
        let normalized = normalize_cron_expression(expression).map_err(|message| {
            ConditionError::Cron {
                expression: expression.to_string(),
                message,
            }
        })?;
        let schedule = Schedule::from_str(&normalized).map_err(|e| ConditionError::Cron {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as written in the trigger.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether `at`, truncated to the minute, is a tick of this schedule.
    pub fn includes(&self, at: DateTime<Utc>) -> bool {
        let tick = truncate_to_minute(at);
        self.schedule
            .after(&(tick - Duration::seconds(1)))
            .next()
            .is_some_and(|next| next == tick)
    }

    /// First tick strictly after `at`.
    pub fn next_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&at).next()
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Convert a 5-field cron expression to the 7-field format the `cron` crate expects.
///
/// Standard cron: `min hour day month weekday`
/// Cron crate:    `sec min hour day month weekday year`
fn normalize_cron_expression(expr: &str) -> Result<String, String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    }
    let weekday = translate_weekday_field(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {weekday} *",
        fields[0], fields[1], fields[2], fields[3]
    ))
}

/// Rewrite numeric weekdays from 0-7 (Sunday = 0 and 7) to the crate's 1-7
/// (Sunday = 1). Numeric ranges and steps are expanded to an explicit list
/// so ranges through Sunday survive the renumbering. Names and `*` pass
/// through unchanged.
fn translate_weekday_field(field: &str) -> Result<String, String> {
    let mut days = BTreeSet::new();
    let mut passthrough = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(parse_step(step)?)),
            None => (item, None),
        };
        let (start, end) = match range.split_once('-') {
            Some((start, end)) if is_numeric(start) && is_numeric(end) => {
                (parse_weekday(start)?, parse_weekday(end)?)
            }
            // `1/2` means every other day from Monday through the end of the week.
            None if is_numeric(range) && step.is_some() => (parse_weekday(range)?, 7),
            None if is_numeric(range) => {
                let day = parse_weekday(range)?;
                (day, day)
            }
            _ => {
                passthrough.push(item.to_string());
                continue;
            }
        };
        if start > end {
            return Err(format!("invalid weekday range: {range}"));
        }
        days.extend(
            (start..=end)
                .step_by(step.unwrap_or(1))
                .map(|day| if day == 7 { 1 } else { day + 1 }),
        );
    }
    let items = days
        .into_iter()
        .map(|day| day.to_string())
        .chain(passthrough);
    Ok(items.collect::<Vec<_>>().join(","))
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn parse_weekday(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("weekday out of range: {value}")),
    }
}

fn parse_step(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(step) if step > 0 => Ok(step),
        _ => Err(format!("invalid weekday step: {value}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_normalize_5_field() {
        assert_eq!(
            normalize_cron_expression("*/5 * * * *").unwrap(),
            "0 */5 * * * * *"
        );
    }

    #[test]
    fn test_normalize_rejects_other_arities() {
        assert!(normalize_cron_expression("0 */5 * * * *").is_err());
        assert!(normalize_cron_expression("* * *").is_err());
        assert!(normalize_cron_expression("").is_err());
    }

    #[test]
    fn test_weekday_translation() {
        assert_eq!(translate_weekday_field("*").unwrap(), "*");
        assert_eq!(translate_weekday_field("0").unwrap(), "1");
        assert_eq!(translate_weekday_field("7").unwrap(), "1");
        assert_eq!(translate_weekday_field("1-5").unwrap(), "2,3,4,5,6");
        assert_eq!(translate_weekday_field("5-7").unwrap(), "1,6,7");
        assert_eq!(translate_weekday_field("0-7").unwrap(), "1,2,3,4,5,6,7");
        assert_eq!(translate_weekday_field("5-7/2").unwrap(), "1,6");
        assert_eq!(translate_weekday_field("4-7/2").unwrap(), "5,7");
        assert_eq!(translate_weekday_field("1/3").unwrap(), "1,2,5");
        assert_eq!(translate_weekday_field("0,6").unwrap(), "1,7");
        assert_eq!(translate_weekday_field("*/2").unwrap(), "*/2");
        assert_eq!(translate_weekday_field("MON-FRI").unwrap(), "MON-FRI");
        assert!(translate_weekday_field("9").is_err());
        assert!(translate_weekday_field("5-2").is_err());
        assert!(translate_weekday_field("1-5/0").is_err());
    }

    #[test]
    fn test_ranges_through_sunday() {
        // 2024-01-14 is a Sunday.
        let every_day = CronSchedule::parse("0 0 * * 0-7").unwrap();
        for day in 14..=20 {
            assert!(every_day.includes(at(2024, 1, day, 0, 0)), "day {day}");
        }

        let stepped = CronSchedule::parse("0 0 * * 5-7/2").unwrap();
        let hits: Vec<u32> = (14..=20)
            .filter(|d| stepped.includes(at(2024, 1, *d, 0, 0)))
            .collect();
        // Friday the 19th and Sunday the 14th.
        assert_eq!(hits, vec![14, 19]);
    }

    #[test]
    fn test_every_five_minutes_within_an_hour() {
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        let hits: Vec<u32> = (0..60)
            .filter(|m| schedule.includes(at(2024, 1, 15, 10, *m)))
            .collect();
        assert_eq!(hits, (0..60).step_by(5).collect::<Vec<u32>>());
    }

    #[test]
    fn test_includes_truncates_seconds() {
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 5, 42).unwrap();
        assert!(schedule.includes(t));
    }

    #[test]
    fn test_daily_at_nine() {
        let schedule = CronSchedule::parse("0 9 * * *").unwrap();
        assert!(schedule.includes(at(2024, 1, 15, 9, 0)));
        assert!(!schedule.includes(at(2024, 1, 15, 9, 1)));
        assert!(!schedule.includes(at(2024, 1, 15, 21, 0)));
    }

    #[test]
    fn test_weekly_monday_uses_standard_numbering() {
        // 2024-01-15 is a Monday, 2024-01-14 a Sunday.
        let monday = CronSchedule::parse("0 0 * * 1").unwrap();
        assert!(monday.includes(at(2024, 1, 15, 0, 0)));
        assert!(!monday.includes(at(2024, 1, 14, 0, 0)));

        let sunday = CronSchedule::parse("0 0 * * 0").unwrap();
        assert!(sunday.includes(at(2024, 1, 14, 0, 0)));
        let sunday7 = CronSchedule::parse("0 0 * * 7").unwrap();
        assert!(sunday7.includes(at(2024, 1, 14, 0, 0)));
    }

    #[test]
    fn test_monthly_first() {
        let schedule = CronSchedule::parse("0 0 1 * *").unwrap();
        assert!(schedule.includes(at(2024, 2, 1, 0, 0)));
        assert!(!schedule.includes(at(2024, 2, 2, 0, 0)));
    }

    #[test]
    fn test_invalid_expression() {
        let err = CronSchedule::parse("not-a-cron").unwrap_err();
        assert!(err.to_string().contains("invalid cron expression"));

        let err = CronSchedule::parse("61 * * * *").unwrap_err();
        assert!(matches!(err, ConditionError::Cron { .. }));
    }

    #[test]
    fn test_next_after() {
        let schedule = CronSchedule::parse("0 */6 * * *").unwrap();
        let next = schedule.next_after(at(2024, 1, 15, 7, 30)).unwrap();
        assert_eq!(next, at(2024, 1, 15, 12, 0));
    }
}
