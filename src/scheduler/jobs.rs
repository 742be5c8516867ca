use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::db::models::attendee::Attendee;
use crate::db::models::event::Event;
use crate::providers::{EmailMessage, emails};
use crate::utils::render_template;

/// Seconds after the configured send time during which the day-of job fires.
pub const DAY_OF_WINDOW_SECS: i64 = 1800;

const DEFAULT_MEETING_POINT: &str = "See event details";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    OneDay,
    SevenDays,
}

impl ReminderKind {
    pub fn template_id(self) -> &'static str {
        match self {
            ReminderKind::OneDay => "reminder_1d",
            ReminderKind::SevenDays => "reminder_7d",
        }
    }

    pub fn sms_template_id(self) -> &'static str {
        match self {
            ReminderKind::OneDay => "reminder_1d_sms",
            ReminderKind::SevenDays => "reminder_7d_sms",
        }
    }
}

/// Whether `now` falls inside the day-of SMS window of an event.
///
/// The event must take place today (UTC) and have a send time; the window is
/// that time on the event date plus thirty minutes.
pub fn day_of_window_open(event: &Event, now: DateTime<Utc>) -> bool {
    let Some(send_time) = event.day_of_sms_time else {
        return false;
    };
    let event_day = event.event_date.date_naive();
    if event_day != now.date_naive() {
        return false;
    }
    let send_at = event_day.and_time(send_time).and_utc();
    let elapsed = (now - send_at).num_seconds();
    (0..=DAY_OF_WINDOW_SECS).contains(&elapsed)
}

/// Reminder due for an event, counting whole UTC calendar days.
pub fn reminder_kind(event_date: DateTime<Utc>, today: NaiveDate) -> Option<ReminderKind> {
    match (event_date.date_naive() - today).num_days() {
        1 => Some(ReminderKind::OneDay),
        7 => Some(ReminderKind::SevenDays),
        _ => None,
    }
}

fn meeting_point(event: &Event) -> &str {
    event
        .meeting_point_a
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(DEFAULT_MEETING_POINT)
}

/// Custom `notification_templates.day_of_sms` when configured, else the stock text.
pub fn day_of_message(
    event: &Event,
    attendee: &Attendee,
    variables: &std::collections::HashMap<String, String>,
) -> String {
    match event.day_of_sms_template() {
        Some(template) if !template.trim().is_empty() => render_template(template, variables),
        _ => format!(
            "Hi {}! Today is {}. Meeting point: {}. See you soon!",
            attendee.first_name,
            event.name,
            meeting_point(event)
        ),
    }
}

pub fn reminder_sms(kind: ReminderKind, event: &Event, attendee: &Attendee) -> String {
    match kind {
        ReminderKind::OneDay => format!(
            "Hi {}, reminder: {} is tomorrow! Meeting point: {}. See you there!",
            attendee.first_name,
            event.name,
            meeting_point(event)
        ),
        ReminderKind::SevenDays => format!(
            "Hi {}, {} is coming up on {}! Looking forward to seeing you.",
            attendee.first_name,
            event.name,
            event.event_date.format("%B %d, %Y")
        ),
    }
}

pub fn reminder_email(kind: ReminderKind, event: &Event, attendee: &Attendee) -> EmailMessage {
    let when = match kind {
        ReminderKind::OneDay => "tomorrow".to_string(),
        ReminderKind::SevenDays => "in one week".to_string(),
    };
    let body = format!(
        "Hi {},\n\n{} is {} ({} at {}).\n\nMeeting point: {}",
        attendee.first_name,
        event.name,
        when,
        event.event_date.format("%B %d, %Y"),
        event.event_date.format("%I:%M %p"),
        meeting_point(event)
    );
    emails::plain_text(
        &attendee.email,
        &format!("Reminder: {} is {}", event.name, when),
        &body,
    )
}

/// Next run of a daily job at `hour` UTC, strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);
    if today > now { today } else { today + Duration::days(1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::PricingModel;
    use crate::services::pricing::tests::event;
    use chrono::{NaiveTime, TimeZone};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn attendee() -> Attendee {
        let now = Utc::now();
        Attendee {
            id: Uuid::new_v4(),
            first_name: "Maya".into(),
            last_name: "Lopez".into(),
            email: "maya@example.com".into(),
            phone: Some("+14045550100".into()),
            is_member: false,
            membership_id: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn day_of_event(date: DateTime<Utc>, time: Option<NaiveTime>) -> Event {
        let mut e = event(PricingModel::Donation);
        e.event_date = date;
        e.day_of_sms_time = time;
        e
    }

    #[test]
    fn test_day_of_window() {
        let date = Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap();
        let e = day_of_event(date, NaiveTime::from_hms_opt(8, 0, 0));

        let at = |h, m| Utc.with_ymd_and_hms(2026, 3, 15, h, m, 0).unwrap();
        assert!(!day_of_window_open(&e, at(7, 59)));
        assert!(day_of_window_open(&e, at(8, 0)));
        assert!(day_of_window_open(&e, at(8, 30)));
        assert!(!day_of_window_open(&e, at(8, 31)));

        let next_day = Utc.with_ymd_and_hms(2026, 3, 16, 8, 10, 0).unwrap();
        assert!(!day_of_window_open(&e, next_day));

        let no_time = day_of_event(date, None);
        assert!(!day_of_window_open(&no_time, at(8, 10)));
    }

    #[test]
    fn test_reminder_kind_by_calendar_day() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let at = |d, h| Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap();
        assert_eq!(reminder_kind(at(9, 23), today), Some(ReminderKind::OneDay));
        assert_eq!(reminder_kind(at(15, 0), today), Some(ReminderKind::SevenDays));
        assert_eq!(reminder_kind(at(8, 23), today), None);
        assert_eq!(reminder_kind(at(12, 10), today), None);
        assert_eq!(ReminderKind::OneDay.sms_template_id(), "reminder_1d_sms");
    }

    #[test]
    fn test_day_of_message_prefers_custom_template() {
        let mut e = event(PricingModel::Donation);
        e.meeting_point_a = Some("North gate".into());
        let a = attendee();
        let mut vars = HashMap::new();
        vars.insert("first_name".to_string(), "Maya".to_string());

        let stock = day_of_message(&e, &a, &vars);
        assert!(stock.contains("Forest Retreat"));
        assert!(stock.contains("North gate"));

        e.notification_templates = Some(serde_json::json!({ "day_of_sms": "Morning {{first_name}}!" }));
        assert_eq!(day_of_message(&e, &a, &vars), "Morning Maya!");
    }

    #[test]
    fn test_next_daily_run() {
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, 14),
            Utc.with_ymd_and_hms(2026, 3, 8, 14, 0, 0).unwrap()
        );
        assert_eq!(
            next_daily_run(now, 9),
            Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap()
        );
    }
}
