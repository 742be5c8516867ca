use retreat_backend::db::enums::{AccommodationType, PricingModel};
use retreat_backend::error::AppError;
use retreat_backend::validation::event::{
    parse_sms_time, validate_event_pricing, validate_recurrence, validate_slug,
};
use retreat_backend::validation::registration::{ensure_spots, parse_accommodation, require_waiver};
use tokio_test::{assert_err, assert_ok};

#[test]
fn event_inputs() {
    assert_ok!(validate_slug("full-moon-2026"));
    assert_err!(validate_slug("Full Moon"));
    assert_err!(validate_slug(""));

    assert_eq!(parse_sms_time("07:30").unwrap().to_string(), "07:30:00");
    assert!(parse_sms_time("7.30am").is_err());

    assert!(validate_event_pricing(PricingModel::Fixed, Some(5_000), None).is_ok());
    assert!(validate_event_pricing(PricingModel::Fixed, None, Some("price_123")).is_ok());
    assert!(validate_event_pricing(PricingModel::Fixed, None, None).is_err());
    assert!(validate_event_pricing(PricingModel::Composite, Some(5_000), None).is_err());

    assert!(validate_recurrence(Some("FREQ=WEEKLY;BYDAY=SU")).is_ok());
    assert!(validate_recurrence(Some("FREQ=HOURLY")).is_err());
    assert_err!(validate_recurrence(Some("FREQ=DAILY;INTERVAL=100000000")));
}

#[test]
fn registration_inputs() {
    assert!(matches!(require_waiver(false), Err(AppError::Validation { .. })));
    assert!(require_waiver(true).is_ok());

    assert_eq!(parse_accommodation(Some("  ")).unwrap(), None);
    assert_eq!(parse_accommodation(None).unwrap(), None);
    assert_eq!(
        parse_accommodation(Some("bell_tent")).unwrap(),
        Some(AccommodationType::BellTent)
    );
    assert!(parse_accommodation(Some("castle")).is_err());
}

#[test]
fn capacity_checks() {
    assert_ok!(ensure_spots(None, 1_000, 5));
    assert_ok!(ensure_spots(Some(10), 8, 2));
    assert!(matches!(
        ensure_spots(Some(10), 10, 1),
        Err(AppError::Forbidden { .. })
    ));
    assert!(matches!(
        ensure_spots(Some(10), 9, 2),
        Err(AppError::Forbidden { .. })
    ));
}
