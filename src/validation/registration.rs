use std::collections::HashSet;

use uuid::Uuid;

use crate::db::enums::{AccommodationType, RegistrationStatus};
use crate::db::models::api::error_codes;
use crate::db::models::event::SubEvent;
use crate::db::models::registration::{GroupMember, Registration};
use crate::db::models::scholarship::ScholarshipLink;
use crate::error::AppError;

pub fn require_waiver(accepted: bool) -> Result<(), AppError> {
    if !accepted {
        return Err(AppError::validation("Waiver must be accepted"));
    }
    Ok(())
}

/// Blank means "not given".
pub fn parse_accommodation(raw: Option<&str>) -> Result<Option<AccommodationType>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<AccommodationType>()
            .map(Some)
            .map_err(|_| AppError::validation("Invalid accommodation type")),
    }
}

/// Remaining capacity must cover `seats`. Unlimited events always pass.
pub fn ensure_spots(capacity: Option<i32>, holders: i64, seats: i64) -> Result<(), AppError> {
    let Some(capacity) = capacity else {
        return Ok(());
    };
    let remaining = (capacity as i64 - holders).max(0);
    if remaining == 0 {
        return Err(AppError::forbidden(format!(
            "Event is at capacity, {} requested",
            seats
        )));
    }
    if remaining < seats {
        return Err(AppError::forbidden(format!(
            "Only {} spots remaining, {} requested",
            remaining, seats
        )));
    }
    Ok(())
}

/// A registration still holding its spot blocks a new one; lapsed rows are reused.
pub fn check_existing(
    existing: Option<Registration>,
    email: &str,
    own_message: bool,
) -> Result<Option<Registration>, AppError> {
    match existing {
        Some(r) if RegistrationStatus::HOLDS_SPOT.contains(&r.status) => {
            let message = if own_message {
                "You are already registered for this event. Check your email for confirmation."
                    .to_string()
            } else {
                format!("{} is already registered for this event", email)
            };
            Err(AppError::conflict_with_code(
                message,
                Some("email".to_string()),
                error_codes::REGISTRATION_DUPLICATE,
            ))
        }
        other => Ok(other),
    }
}

/// Resolves the chosen sub-events of a composite event, in the event's order.
pub fn select_sub_events(all: &[SubEvent], chosen: &[Uuid]) -> Result<Vec<SubEvent>, AppError> {
    let chosen: HashSet<Uuid> = chosen.iter().copied().collect();
    for id in &chosen {
        if !all.iter().any(|se| se.id == *id) {
            return Err(AppError::validation(format!("Unknown sub-event: {}", id)));
        }
    }
    if let Some(missing) = all
        .iter()
        .find(|se| se.is_required && !chosen.contains(&se.id))
    {
        return Err(AppError::validation(format!(
            "Sub-event '{}' is required",
            missing.name
        )));
    }
    Ok(all
        .iter()
        .filter(|se| chosen.contains(&se.id))
        .cloned()
        .collect())
}

pub fn ensure_sub_event_room(sub_event: &SubEvent, holders: i64, seats: i64) -> Result<(), AppError> {
    match sub_event.capacity {
        Some(capacity) if holders + seats > capacity as i64 => Err(AppError::conflict_with_code(
            format!("Sub-event '{}' is full", sub_event.name),
            Some("sub_event_ids".to_string()),
            error_codes::SUB_EVENT_FULL,
        )),
        _ => Ok(()),
    }
}

pub fn check_scholarship(link: &ScholarshipLink, event_id: Uuid, seats: i32) -> Result<(), AppError> {
    if link.event_id != event_id {
        return Err(AppError::conflict_with_code(
            "Scholarship code is not valid for this event",
            Some("scholarship_code".to_string()),
            error_codes::SCHOLARSHIP_EXHAUSTED,
        ));
    }
    if link.remaining_uses() < seats {
        return Err(AppError::conflict_with_code(
            "Scholarship code has no remaining uses",
            Some("scholarship_code".to_string()),
            error_codes::SCHOLARSHIP_EXHAUSTED,
        ));
    }
    Ok(())
}

/// Group-level checks: unique emails and a waiver from everyone.
pub fn check_group_members(members: &[&GroupMember]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for m in members {
        let email = m.email.trim().to_lowercase();
        if !seen.insert(email.clone()) {
            return Err(AppError::validation(format!(
                "Guest emails must be unique; duplicate: {}",
                email
            )));
        }
    }
    if let Some(m) = members.iter().find(|m| !m.waiver_accepted) {
        return Err(AppError::validation(format!(
            "Waiver must be accepted by every guest (missing for {})",
            m.email
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{PricingModel, SubEventPricingModel};
    use crate::services::pricing::tests::{event, sub_event};
    use axum::http::StatusCode;

    fn member(email: &str, waiver: bool) -> GroupMember {
        GroupMember {
            first_name: "Ada".into(),
            last_name: "Guest".into(),
            email: email.into(),
            phone: None,
            accommodation_type: None,
            dietary_restrictions: None,
            waiver_accepted: waiver,
            intake_data: None,
        }
    }

    #[test]
    fn test_accommodation_parsing() {
        assert_eq!(parse_accommodation(None).unwrap(), None);
        assert_eq!(parse_accommodation(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_accommodation(Some("bell_tent")).unwrap(),
            Some(AccommodationType::BellTent)
        );
        let err = parse_accommodation(Some("yurt")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(require_waiver(false).is_err());
    }

    #[test]
    fn test_capacity() {
        assert!(ensure_spots(None, 500, 3).is_ok());
        assert!(ensure_spots(Some(10), 9, 1).is_ok());
        let full = ensure_spots(Some(10), 10, 1).unwrap_err();
        assert_eq!(full.status_code(), StatusCode::FORBIDDEN);
        assert!(full.to_string().contains("Event is at capacity"));
        let full_group = ensure_spots(Some(10), 12, 3).unwrap_err();
        assert!(full_group.to_string().contains("3 requested"));
        let short = ensure_spots(Some(10), 8, 3).unwrap_err();
        assert!(short.to_string().contains("spots"));
    }

    #[test]
    fn test_sub_event_selection() {
        let parent = event(PricingModel::Composite);
        let mut ceremony = sub_event(&parent, "Ceremony", SubEventPricingModel::Fixed, Some(4000));
        ceremony.is_required = true;
        ceremony.sort_order = 0;
        let mut sound = sub_event(&parent, "Sound bath", SubEventPricingModel::Fixed, Some(2000));
        sound.sort_order = 1;
        let all = vec![ceremony.clone(), sound.clone()];

        let picked = select_sub_events(&all, &[sound.id, ceremony.id]).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].id, ceremony.id);

        let err = select_sub_events(&all, &[sound.id]).unwrap_err();
        assert!(err.to_string().contains("required"));

        let err = select_sub_events(&all, &[ceremony.id, Uuid::new_v4()]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let mut small = sound.clone();
        small.capacity = Some(2);
        assert!(ensure_sub_event_room(&small, 1, 1).is_ok());
        let err = ensure_sub_event_room(&small, 2, 1).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("full"));
    }

    #[test]
    fn test_group_members() {
        let a = member("a@example.com", true);
        let b = member("A@Example.com", true);
        let err = check_group_members(&[&a, &b]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let c = member("c@example.com", false);
        let err = check_group_members(&[&a, &c]).unwrap_err();
        assert!(err.to_string().contains("Waiver"));

        let d = member("d@example.com", true);
        assert!(check_group_members(&[&a, &d]).is_ok());
    }
}
