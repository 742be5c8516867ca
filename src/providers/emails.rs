//! Bodies of the transactional emails.

use crate::db::models::attendee::Attendee;
use crate::db::models::event::Event;
use crate::providers::resend::EmailMessage;

pub fn confirmation(attendee: &Attendee, event: &Event) -> EmailMessage {
    EmailMessage::new(
        &attendee.email,
        format!("You're confirmed for {}!", event.name),
        format!(
            "<h2>Welcome, {}!</h2>\
             <p>Your registration for <strong>{}</strong> is confirmed.</p>\
             <p>Date: {}</p>\
             <p>We look forward to seeing you!</p>",
            attendee.first_name,
            event.name,
            event.event_date.format("%B %d, %Y")
        ),
    )
}

pub fn magic_link(email: &str, name: &str, link: &str, expires_hours: i64) -> EmailMessage {
    EmailMessage::new(
        email,
        "Your co-creator portal login link",
        format!(
            "<h2>Hi {},</h2>\
             <p>Click below to access the co-creator portal:</p>\
             <p><a href=\"{}\">Open Portal</a></p>\
             <p>This link expires in {} hours.</p>",
            name, link, expires_hours
        ),
    )
}

pub fn cancel_request(
    admin_email: &str,
    attendee: &Attendee,
    event: &Event,
    reason: Option<&str>,
) -> EmailMessage {
    EmailMessage::new(
        admin_email,
        format!("Cancellation request: {} for {}", attendee.full_name(), event.name),
        format!(
            "<p><strong>{}</strong> ({}) asked to cancel their registration for \
             <strong>{}</strong>.</p><p>Reason: {}</p>",
            attendee.full_name(),
            attendee.email,
            event.name,
            reason.unwrap_or("(none given)")
        ),
    )
}

/// Plain-text bodies are wrapped as paragraphs for HTML email.
pub fn plain_text(to: &str, subject: &str, body: &str) -> EmailMessage {
    let html = body
        .split("\n\n")
        .map(|para| format!("<p>{}</p>", para.replace('\n', "<br>")))
        .collect::<String>();
    EmailMessage::new(to, subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_paragraphs() {
        let msg = plain_text("a@example.com", "Hi", "Line one\nline two\n\nSecond");
        assert_eq!(msg.html, "<p>Line one<br>line two</p><p>Second</p>");
        assert_eq!(msg.subject, "Hi");
    }
}
