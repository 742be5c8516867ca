use chrono::{DateTime, Duration, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn clock_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:eta|arriving\s+(?:at|around|by)|(?:be|get)\s+there\s+(?:by|around|at|about))\s*:?\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b",
        )
        .expect("valid eta clock regex")
    })
}

fn minutes_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,3})\s*(?:min|mins|minute|minutes)\b")
            .expect("valid eta minutes regex")
    })
}

/// Estimated arrival from a free-text SMS.
///
/// Clock times resolve to today (UTC date of `now`); a bare hour from 1 to 7
/// is read as afternoon. "N min" style messages resolve relative to `now`.
pub fn parse_eta(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    // "ETA 20 min" is relative, not 20:00.
    if let Some(caps) = minutes_pattern().captures(text) {
        let minutes: i64 = caps.get(1)?.as_str().parse().ok()?;
        return Some(now + Duration::minutes(minutes));
    }

    if let Some(caps) = clock_pattern().captures(text) {
        let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(ref m) if m == "pm" && hour < 12 => hour += 12,
            Some(ref m) if m == "am" && hour == 12 => hour = 0,
            None if (1..=7).contains(&hour) => hour += 12,
            _ => {}
        }
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        return Some(now.date_naive().and_time(time).and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_clock_times() {
        let eta = parse_eta("ETA 3pm", at(10)).unwrap();
        assert_eq!((eta.hour(), eta.minute()), (15, 0));

        let eta = parse_eta("ETA 3:30pm", at(10)).unwrap();
        assert_eq!((eta.hour(), eta.minute()), (15, 30));

        let eta = parse_eta("ETA 10am", at(6)).unwrap();
        assert_eq!(eta.hour(), 10);
        assert_eq!(eta.date_naive(), at(6).date_naive());
    }

    #[test]
    fn test_phrases_with_bare_hours() {
        assert_eq!(parse_eta("arriving at 3pm", at(10)).unwrap().hour(), 15);

        let eta = parse_eta("arriving around 3:30", at(10)).unwrap();
        assert_eq!((eta.hour(), eta.minute()), (15, 30));

        assert_eq!(parse_eta("be there by 4", at(10)).unwrap().hour(), 16);
        assert_eq!(parse_eta("be there by 4pm", at(10)).unwrap().hour(), 16);
        assert_eq!(parse_eta("ill be there around 5", at(10)).unwrap().hour(), 17);
        assert_eq!(parse_eta("I'll be there around 5", at(10)).unwrap().hour(), 17);
    }

    #[test]
    fn test_relative_minutes() {
        let now = at(14);
        assert_eq!(
            parse_eta("on my way, about 30 min", now).unwrap(),
            now + Duration::minutes(30)
        );
        assert_eq!(
            parse_eta("on my way, 45 minutes", now).unwrap(),
            now + Duration::minutes(45)
        );
    }

    #[test]
    fn test_eta_prefix_with_minutes_is_relative() {
        let now = at(10);
        assert_eq!(parse_eta("ETA 20 min", now).unwrap(), now + Duration::minutes(20));
        assert_eq!(parse_eta("eta 5 mins", now).unwrap(), now + Duration::minutes(5));
    }

    #[test]
    fn test_no_eta() {
        assert!(parse_eta("Hey, looking forward to the event!", at(10)).is_none());
        assert!(parse_eta("I have 3 guests coming with me", at(10)).is_none());
    }
}
