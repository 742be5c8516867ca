//! Background jobs: the day-of SMS and the 1-day / 7-day reminders.
//!
//! Both jobs skip registrations that already have a successful
//! `notifications_log` entry for the template.

pub mod jobs;

use std::time::Duration;

use chrono::Utc;
use diesel::PgConnection;
use tokio::task::JoinHandle;

use crate::db::DbPool;
use crate::db::enums::{EventStatus, NotificationChannel, RegistrationStatus};
use crate::db::models::attendee::Attendee;
use crate::db::models::event::Event;
use crate::db::models::registration::Registration;
use crate::db::repositories::communications::NotificationLogRepo;
use crate::db::repositories::events::EventRepo;
use crate::db::repositories::registrations::RegistrationRepo;
use crate::error::AppError;
use crate::providers::Providers;
use crate::services::notifications_service::{
    DAY_OF_SMS_TEMPLATE, NotificationsService, attendee_variables,
};
use jobs::{ReminderKind, day_of_message, day_of_window_open, reminder_kind};

pub const DAY_OF_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// Reminders go out once a day at this UTC hour.
pub const REMINDER_HOUR_UTC: u32 = 14;

#[derive(Clone)]
pub struct Scheduler {
    db: DbPool,
    providers: Providers,
    app_base_url: String,
}

impl Scheduler {
    pub fn new(db: DbPool, providers: Providers, app_base_url: impl Into<String>) -> Self {
        Self {
            db,
            providers,
            app_base_url: app_base_url.into(),
        }
    }

    /// Starts both periodic jobs on the current runtime.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let day_of = self.clone();
        let day_of_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(DAY_OF_INTERVAL);
            loop {
                interval.tick().await;
                match day_of.send_day_of_sms().await {
                    Ok(sent) => tracing::info!(sent, "day-of sms job finished"),
                    Err(e) => tracing::error!(error = %e, "day-of sms job failed"),
                }
            }
        });

        let reminders = self;
        let reminder_handle = tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = jobs::next_daily_run(now, REMINDER_HOUR_UTC);
                let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
                tracing::debug!(next_run = %next, "reminder job scheduled");
                tokio::time::sleep(wait).await;
                match reminders.send_reminders().await {
                    Ok(sent) => tracing::info!(sent, "reminder job finished"),
                    Err(e) => tracing::error!(error = %e, "reminder job failed"),
                }
            }
        });

        tracing::info!("background scheduler started");
        vec![day_of_handle, reminder_handle]
    }

    /// Texts complete registrations of events whose day-of window is open.
    /// Returns the number of messages delivered.
    pub async fn send_day_of_sms(&self) -> Result<i64, AppError> {
        let now = Utc::now();
        let mut conn = self.db.get()?;
        let mut sent = 0;

        for event in EventRepo::list_by_status(&mut conn, EventStatus::Active)? {
            if !day_of_window_open(&event, now) {
                continue;
            }
            let rows = RegistrationRepo::list_with_attendees_by_statuses(
                &mut conn,
                event.id,
                &[RegistrationStatus::Complete],
            )?;
            let mut sent_for_event = 0;
            for (registration, attendee) in rows {
                let Some(phone) = attendee.phone.as_deref() else {
                    continue;
                };
                if NotificationLogRepo::was_sent(&mut conn, registration.id, DAY_OF_SMS_TEMPLATE)? {
                    continue;
                }
                let vars = attendee_variables(&registration, &attendee, &event, &self.app_base_url);
                let body = day_of_message(&event, &attendee, &vars);
                if NotificationsService::deliver_sms(
                    &mut conn,
                    &self.providers,
                    registration.id,
                    phone,
                    &body,
                    DAY_OF_SMS_TEMPLATE,
                    None,
                )
                .await?
                {
                    sent_for_event += 1;
                }
            }
            if sent_for_event > 0 {
                tracing::info!(
                    event_id = %event.id,
                    event = %event.name,
                    sent = sent_for_event,
                    "day-of sms sent"
                );
            }
            sent += sent_for_event;
        }
        Ok(sent)
    }

    /// Email and SMS reminders for events one and seven days out.
    pub async fn send_reminders(&self) -> Result<i64, AppError> {
        let today = Utc::now().date_naive();
        let mut conn = self.db.get()?;
        let mut sent = 0;

        for event in EventRepo::list_by_status(&mut conn, EventStatus::Active)? {
            let Some(kind) = reminder_kind(event.event_date, today) else {
                continue;
            };
            tracing::info!(event = %event.slug, kind = kind.template_id(), "sending reminders");

            let rows = RegistrationRepo::list_with_attendees_by_statuses(
                &mut conn,
                event.id,
                &RegistrationStatus::ATTENDING,
            )?;
            for (registration, attendee) in rows {
                sent += self
                    .remind(&mut conn, kind, &event, &registration, &attendee)
                    .await?;
            }
        }
        Ok(sent)
    }

    async fn remind(
        &self,
        conn: &mut PgConnection,
        kind: ReminderKind,
        event: &Event,
        registration: &Registration,
        attendee: &Attendee,
    ) -> Result<i64, AppError> {
        let mut sent = 0;

        if !NotificationLogRepo::was_sent(conn, registration.id, kind.template_id())? {
            let message = jobs::reminder_email(kind, event, attendee);
            let delivered = self.providers.try_email(&message).await;
            NotificationsService::log_delivery(
                conn,
                registration.id,
                NotificationChannel::Email,
                kind.template_id(),
                &message.html,
                delivered,
            )?;
            if delivered {
                sent += 1;
            }
        }

        if let Some(phone) = attendee.phone.as_deref() {
            if !NotificationLogRepo::was_sent(conn, registration.id, kind.sms_template_id())? {
                let body = jobs::reminder_sms(kind, event, attendee);
                if NotificationsService::deliver_sms(
                    conn,
                    &self.providers,
                    registration.id,
                    phone,
                    &body,
                    kind.sms_template_id(),
                    None,
                )
                .await?
                {
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }
}
