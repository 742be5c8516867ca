use retreat_backend::providers::stripe::{
    SIGNATURE_TOLERANCE_SECS, SignatureError, compute_signature, verify_webhook_signature,
};
use retreat_backend::services::webhooks_service::{
    Refund, append_note, apportion_cents, classify_refund, session_registration_id,
};
use serde_json::json;
use uuid::Uuid;

const SECRET: &str = "whsec_unit";

#[test]
fn signature_header_variants() {
    let payload = br#"{"id":"evt_1"}"#;
    let now = 1_760_000_000;
    let good = compute_signature(SECRET, now, payload);

    // Rotated secrets send several v1 entries.
    let header = format!("t={},v1=deadbeef,v1={}", now, good);
    assert_eq!(verify_webhook_signature(payload, Some(&header), SECRET, now), Ok(()));

    assert_eq!(
        verify_webhook_signature(payload, None, SECRET, now),
        Err(SignatureError::Missing)
    );
    assert_eq!(
        verify_webhook_signature(payload, Some("v1=abc"), SECRET, now),
        Err(SignatureError::Malformed)
    );
    assert_eq!(
        verify_webhook_signature(
            payload,
            Some(&format!("t={},v1={}", now, good)),
            SECRET,
            now + SIGNATURE_TOLERANCE_SECS + 1
        ),
        Err(SignatureError::Expired)
    );
    assert_eq!(
        verify_webhook_signature(
            br#"{"id":"evt_2"}"#,
            Some(&format!("t={},v1={}", now, good)),
            SECRET,
            now
        ),
        Err(SignatureError::Mismatch)
    );
}

#[test]
fn checkout_session_lookup() {
    let id = Uuid::new_v4();
    assert_eq!(
        session_registration_id(&json!({ "client_reference_id": id.to_string() })),
        Some(id)
    );
    assert_eq!(
        session_registration_id(&json!({ "metadata": { "registration_id": id.to_string() } })),
        Some(id)
    );
    assert_eq!(session_registration_id(&json!({ "client_reference_id": "nope" })), None);
}

#[test]
fn refunds_and_notes() {
    assert_eq!(classify_refund(10_000, 10_000), Refund::Full);
    assert_eq!(
        classify_refund(10_000, 2_500),
        Refund::Partial {
            remaining_cents: 7_500,
            refunded_cents: 2_500
        }
    );

    let notes = append_note(None, "Partial refund of $25.00");
    assert_eq!(notes, "Partial refund of $25.00");
    assert_eq!(
        append_note(Some(&notes), "Refunded"),
        "Partial refund of $25.00\nRefunded"
    );
}

#[test]
fn group_partial_refund_keeps_member_shares() {
    // Three members at 5000 on one 15000 charge, 1000 refunded.
    let Refund::Partial { remaining_cents, .. } = classify_refund(15_000, 1_000) else {
        panic!("expected partial refund");
    };
    let remaining = apportion_cents(&[5_000, 5_000, 5_000], remaining_cents);
    assert_eq!(remaining, vec![4_667, 4_667, 4_666]);
    assert_eq!(remaining.iter().sum::<i64>(), 14_000);

    assert_eq!(apportion_cents(&[10_000, 5_000], 12_000), vec![8_000, 4_000]);
    assert_eq!(apportion_cents(&[20_000], 17_500), vec![17_500]);
    assert_eq!(apportion_cents(&[0, 0], 101), vec![51, 50]);
    assert!(apportion_cents(&[], 500).is_empty());
}
