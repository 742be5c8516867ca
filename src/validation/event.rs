use chrono::NaiveTime;

use crate::db::enums::{PricingModel, SubEventPricingModel};
use crate::db::models::event::UpdateEventRequest;
use crate::error::AppError;
use crate::services::recurrence::RecurrenceRule;

/// Parses a day-of SMS time given as `HH:MM` or `HH:MM:SS`.
pub fn parse_sms_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::validation("day_of_sms_time must look like HH:MM"))
}

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::validation(
            "Slug may only contain lowercase letters, digits and hyphens",
        ));
    }
    Ok(())
}

/// Price fields must agree with the pricing model.
pub fn validate_event_pricing(
    model: PricingModel,
    fixed_price_cents: Option<i32>,
    stripe_price_id: Option<&str>,
) -> Result<(), AppError> {
    match model {
        PricingModel::Fixed => {
            if fixed_price_cents.is_none() && stripe_price_id.map_or(true, str::is_empty) {
                return Err(AppError::validation(
                    "Fixed pricing requires fixed_price_cents or stripe_price_id",
                ));
            }
        }
        PricingModel::Composite => {
            if fixed_price_cents.is_some() {
                return Err(AppError::validation(
                    "Composite events are priced by their sub-events; remove fixed_price_cents",
                ));
            }
        }
        PricingModel::Donation | PricingModel::Free => {}
    }
    Ok(())
}

pub fn validate_sub_event_pricing(
    model: SubEventPricingModel,
    fixed_price_cents: Option<i32>,
    stripe_price_id: Option<&str>,
) -> Result<(), AppError> {
    if model == SubEventPricingModel::Fixed
        && fixed_price_cents.is_none()
        && stripe_price_id.map_or(true, str::is_empty)
    {
        return Err(AppError::validation(
            "Fixed pricing requires fixed_price_cents or stripe_price_id",
        ));
    }
    Ok(())
}

pub fn validate_recurrence(rule: Option<&str>) -> Result<(), AppError> {
    if let Some(rule) = rule.filter(|r| !r.trim().is_empty()) {
        RecurrenceRule::parse(rule)
            .map_err(|e| AppError::validation(format!("Invalid recurrence rule: {}", e)))?;
    }
    Ok(())
}

pub fn validate_event_dates(
    start: chrono::DateTime<chrono::Utc>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(), AppError> {
    if let Some(end) = end {
        if end < start {
            return Err(AppError::validation("event_end_date must not be before event_date"));
        }
    }
    Ok(())
}

pub fn is_empty_update(req: &UpdateEventRequest) -> bool {
    req.name.is_none()
        && req.slug.is_none()
        && req.description.is_none()
        && req.event_date.is_none()
        && req.event_end_date.is_none()
        && req.event_type.is_none()
        && req.pricing_model.is_none()
        && req.fixed_price_cents.is_none()
        && req.min_donation_cents.is_none()
        && req.stripe_price_id.is_none()
        && req.capacity.is_none()
        && req.meeting_point_a.is_none()
        && req.meeting_point_b.is_none()
        && req.location_text.is_none()
        && req.zoom_link.is_none()
        && req.virtual_meeting_url.is_none()
        && req.allow_cash_payment.is_none()
        && req.max_member_discount_slots.is_none()
        && req.day_of_sms_time.is_none()
        && req.registration_fields.is_none()
        && req.notification_templates.is_none()
        && req.is_recurring.is_none()
        && req.recurrence_rule.is_none()
        && req.status.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_time_formats() {
        assert_eq!(
            parse_sms_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_sms_time("17:05:10").unwrap(),
            NaiveTime::from_hms_opt(17, 5, 10).unwrap()
        );
        assert!(parse_sms_time("9am").is_err());
    }

    #[test]
    fn test_pricing_rules() {
        assert!(validate_event_pricing(PricingModel::Fixed, Some(5000), None).is_ok());
        assert!(validate_event_pricing(PricingModel::Fixed, None, Some("price_123")).is_ok());
        assert!(validate_event_pricing(PricingModel::Fixed, None, None).is_err());
        assert!(validate_event_pricing(PricingModel::Fixed, None, Some("")).is_err());
        assert!(validate_event_pricing(PricingModel::Composite, Some(100), None).is_err());
        assert!(validate_event_pricing(PricingModel::Composite, None, None).is_ok());
        assert!(validate_event_pricing(PricingModel::Free, None, None).is_ok());
        assert!(validate_sub_event_pricing(SubEventPricingModel::Fixed, None, None).is_err());
        assert!(validate_sub_event_pricing(SubEventPricingModel::Donation, None, None).is_ok());
    }

    #[test]
    fn test_slug_and_recurrence() {
        assert!(validate_slug("full-moon-ceremony-2025").is_ok());
        assert!(validate_slug("Full Moon").is_err());
        assert!(validate_recurrence(Some("FREQ=WEEKLY;BYDAY=SA")).is_ok());
        assert!(validate_recurrence(None).is_ok());
        let err = validate_recurrence(Some("FREQ=HOURLY")).unwrap_err();
        assert!(err.to_string().contains("Invalid recurrence rule"));
    }

    #[test]
    fn test_empty_update() {
        assert!(is_empty_update(&UpdateEventRequest::default()));
        let req = UpdateEventRequest {
            capacity: Some(None),
            ..Default::default()
        };
        assert!(!is_empty_update(&req));
    }
}
