//! Expansion of the RRULE subset used by recurring events.
//!
//! Supported parts: `FREQ` (DAILY, WEEKLY, MONTHLY), `INTERVAL`, `BYDAY`
//! (with optional ordinals for MONTHLY, e.g. `1SA` or `-1FR`), `COUNT` and
//! `UNTIL`. Weeks start on Monday.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, Utc, Weekday};
use std::fmt;

/// Upper bound on generated periods, so a rule that never matches terminates.
const MAX_PERIODS: u32 = 5000;
const MAX_INTERVAL: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceError(pub String);

impl fmt::Display for RecurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RecurrenceError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDay {
    pub weekday: Weekday,
    /// Position within the month; negative counts from the end.
    pub ordinal: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub by_day: Vec<ByDay>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_by_day(value: &str) -> Result<ByDay, RecurrenceError> {
    let value = value.trim();
    if value.len() < 2 {
        return Err(RecurrenceError(format!("invalid BYDAY value '{}'", value)));
    }
    let (prefix, code) = value.split_at(value.len() - 2);
    let weekday = parse_weekday(code)
        .ok_or_else(|| RecurrenceError(format!("invalid BYDAY value '{}'", value)))?;
    let ordinal = if prefix.is_empty() {
        None
    } else {
        let n: i32 = prefix
            .trim_start_matches('+')
            .parse()
            .map_err(|_| RecurrenceError(format!("invalid BYDAY value '{}'", value)))?;
        if n == 0 || n.abs() > 5 {
            return Err(RecurrenceError(format!("invalid BYDAY value '{}'", value)));
        }
        Some(n)
    };
    Ok(ByDay { weekday, ordinal })
}

fn parse_until(value: &str) -> Result<DateTime<Utc>, RecurrenceError> {
    let trimmed = value.trim_end_matches('Z');
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RecurrenceError(format!("invalid UNTIL value '{}'", value)))
}

impl RecurrenceRule {
    pub fn parse(rule: &str) -> Result<Self, RecurrenceError> {
        let body = rule.trim();
        let body = body.strip_prefix("RRULE:").unwrap_or(body);

        let mut freq = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut count = None;
        let mut until = None;

        for part in body.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceError(format!("malformed rule part '{}'", part)))?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match value.trim().to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        other => {
                            return Err(RecurrenceError(format!("unsupported FREQ '{}'", other)));
                        }
                    })
                }
                "INTERVAL" => {
                    interval = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|n| (1..=MAX_INTERVAL).contains(n))
                        .ok_or_else(|| RecurrenceError(format!("invalid INTERVAL '{}'", value)))?;
                }
                "BYDAY" => {
                    for item in value.split(',') {
                        by_day.push(parse_by_day(&item.to_ascii_uppercase())?);
                    }
                }
                "COUNT" => {
                    count = Some(
                        value
                            .trim()
                            .parse::<u32>()
                            .map_err(|_| RecurrenceError(format!("invalid COUNT '{}'", value)))?,
                    );
                }
                "UNTIL" => until = Some(parse_until(value.trim())?),
                "WKST" => {}
                other => {
                    return Err(RecurrenceError(format!("unsupported rule part '{}'", other)));
                }
            }
        }

        let freq = freq.ok_or_else(|| RecurrenceError("FREQ is required".to_string()))?;
        if freq != Frequency::Monthly && by_day.iter().any(|d| d.ordinal.is_some()) {
            return Err(RecurrenceError(
                "BYDAY ordinals are only valid with FREQ=MONTHLY".to_string(),
            ));
        }
        Ok(Self {
            freq,
            interval,
            by_day,
            count,
            until,
        })
    }

    /// Candidates in the `period`-th step from `start`; `None` once the step
    /// leaves the representable date range.
    fn candidates_for_period(
        &self,
        start: DateTime<Utc>,
        period: u32,
    ) -> Option<Vec<DateTime<Utc>>> {
        let time = start.time();
        let step = period.checked_mul(self.interval)?;
        let candidates = match self.freq {
            Frequency::Daily => {
                let day = start.checked_add_days(Days::new(u64::from(step)))?;
                if self.by_day.is_empty() || self.by_day.iter().any(|d| d.weekday == day.weekday())
                {
                    vec![day]
                } else {
                    Vec::new()
                }
            }
            Frequency::Weekly => {
                let week_start = start
                    .date_naive()
                    .checked_sub_days(Days::new(u64::from(
                        start.weekday().num_days_from_monday(),
                    )))?
                    .checked_add_days(Days::new(u64::from(step) * 7))?;
                let mut days: Vec<u32> = if self.by_day.is_empty() {
                    vec![start.weekday().num_days_from_monday()]
                } else {
                    self.by_day
                        .iter()
                        .map(|d| d.weekday.num_days_from_monday())
                        .collect()
                };
                days.sort_unstable();
                days.dedup();
                days.into_iter()
                    .map(|offset| {
                        (week_start + Duration::days(i64::from(offset)))
                            .and_time(time)
                            .and_utc()
                    })
                    .collect()
            }
            Frequency::Monthly => {
                let first = start
                    .date_naive()
                    .with_day(1)
                    .and_then(|d| d.checked_add_months(Months::new(step)))?;
                let mut dates: Vec<NaiveDate> = if self.by_day.is_empty() {
                    first.with_day(start.day()).into_iter().collect()
                } else {
                    self.by_day
                        .iter()
                        .flat_map(|d| month_weekdays(first, *d))
                        .collect()
                };
                dates.sort_unstable();
                dates.dedup();
                dates
                    .into_iter()
                    .map(|d| d.and_time(time).and_utc())
                    .collect()
            }
        };
        Some(candidates)
    }

    /// The next `limit` occurrences at or after `after`, counting from `start`.
    pub fn occurrences_after(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut produced: u32 = 0;

        for period in 0..MAX_PERIODS {
            let Some(candidates) = self.candidates_for_period(start, period) else {
                break;
            };
            for candidate in candidates {
                if candidate < start {
                    continue;
                }
                if let Some(until) = self.until {
                    if candidate > until {
                        return out;
                    }
                }
                if let Some(count) = self.count {
                    if produced >= count {
                        return out;
                    }
                }
                produced += 1;
                if candidate >= after {
                    out.push(candidate);
                    if out.len() >= limit {
                        return out;
                    }
                }
            }
        }
        out
    }
}

/// Days in `first`'s month matching a BYDAY entry.
fn month_weekdays(first: NaiveDate, by_day: ByDay) -> Vec<NaiveDate> {
    let mut matching = Vec::new();
    let mut day = first;
    while day.month() == first.month() {
        if day.weekday() == by_day.weekday {
            matching.push(day);
        }
        day += Duration::days(1);
    }
    match by_day.ordinal {
        None => matching,
        Some(n) if n > 0 => matching.get((n - 1) as usize).copied().into_iter().collect(),
        Some(n) => {
            let idx = matching.len() as i32 + n;
            if idx >= 0 {
                matching.get(idx as usize).copied().into_iter().collect()
            } else {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 18, 0, 0).unwrap()
    }

    fn dates(v: &[DateTime<Utc>]) -> Vec<String> {
        v.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
    }

    #[test]
    fn test_weekly_from_start() {
        // 2026-03-07 is a Saturday.
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=SA").unwrap();
        let out = rule.occurrences_after(dt(2026, 3, 7), dt(2026, 3, 1), 3);
        assert_eq!(dates(&out), ["2026-03-07", "2026-03-14", "2026-03-21"]);
    }

    #[test]
    fn test_after_is_inclusive() {
        let rule = RecurrenceRule::parse("RRULE:FREQ=DAILY;INTERVAL=2").unwrap();
        let start = dt(2026, 1, 1);
        let out = rule.occurrences_after(start, dt(2026, 1, 5), 2);
        assert_eq!(dates(&out), ["2026-01-05", "2026-01-07"]);
    }

    #[test]
    fn test_count_counts_from_start() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;COUNT=4").unwrap();
        let start = dt(2026, 3, 7);
        let out = rule.occurrences_after(start, dt(2026, 3, 20), 10);
        assert_eq!(dates(&out), ["2026-03-21", "2026-03-28"]);
    }

    #[test]
    fn test_until_bounds() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20260103").unwrap();
        let out = rule.occurrences_after(dt(2026, 1, 1), dt(2026, 1, 1), 10);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_weekly_multiple_days() {
        // 2026-03-06 is a Friday.
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=FR,SU").unwrap();
        let out = rule.occurrences_after(dt(2026, 3, 6), dt(2026, 3, 6), 4);
        assert_eq!(
            dates(&out),
            ["2026-03-06", "2026-03-08", "2026-03-13", "2026-03-15"]
        );
    }

    #[test]
    fn test_monthly_ordinal_weekday() {
        let rule = RecurrenceRule::parse("FREQ=MONTHLY;BYDAY=1SA").unwrap();
        let out = rule.occurrences_after(dt(2026, 3, 7), dt(2026, 3, 1), 3);
        assert_eq!(dates(&out), ["2026-03-07", "2026-04-04", "2026-05-02"]);
    }

    #[test]
    fn test_monthly_skips_short_months() {
        let rule = RecurrenceRule::parse("FREQ=MONTHLY").unwrap();
        let out = rule.occurrences_after(dt(2026, 1, 31), dt(2026, 1, 1), 3);
        assert_eq!(dates(&out), ["2026-01-31", "2026-03-31", "2026-05-31"]);
    }

    #[test]
    fn test_invalid_rules() {
        assert!(RecurrenceRule::parse("FREQ=YEARLY").is_err());
        assert!(RecurrenceRule::parse("INTERVAL=2").is_err());
        assert!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=XX").is_err());
        assert!(RecurrenceRule::parse("FREQ=WEEKLY;INTERVAL=0").is_err());
        assert!(RecurrenceRule::parse("not a rule").is_err());
        assert!(RecurrenceRule::parse("FREQ=DAILY;INTERVAL=100000000").is_err());
    }

    #[test]
    fn test_far_future_steps_stop_without_panicking() {
        let rule = RecurrenceRule {
            freq: Frequency::Daily,
            interval: 100_000_000,
            by_day: Vec::new(),
            count: None,
            until: None,
        };
        let start = dt(2026, 1, 1);
        let out = rule.occurrences_after(start, start, 5);
        assert_eq!(dates(&out), ["2026-01-01"]);

        let weekly = RecurrenceRule {
            freq: Frequency::Weekly,
            ..rule.clone()
        };
        assert_eq!(weekly.occurrences_after(start, start, 5).len(), 1);

        let monthly = RecurrenceRule {
            freq: Frequency::Monthly,
            ..rule
        };
        assert_eq!(monthly.occurrences_after(start, start, 5).len(), 1);
    }
}
