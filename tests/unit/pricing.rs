// Pricing flows as the registration service drives them: quote, then route.

use chrono::Utc;
use retreat_backend::db::enums::{
    EventStatus, PaymentMethod, PricingModel, RegistrationStatus, SubEventPricingModel,
};
use retreat_backend::db::models::event::{Event, SubEvent};
use retreat_backend::services::pricing::{
    Discount, LineItem, PricingInput, Routing, quote, route,
};
use retreat_backend::validation::registration::select_sub_events;
use uuid::Uuid;

fn event(model: PricingModel) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        name: "Desert Sit".to_string(),
        slug: "desert-sit".to_string(),
        description: None,
        event_date: now,
        event_end_date: None,
        event_type: "retreat".to_string(),
        pricing_model: model,
        fixed_price_cents: None,
        min_donation_cents: None,
        stripe_price_id: None,
        capacity: Some(20),
        meeting_point_a: None,
        meeting_point_b: None,
        location_text: None,
        zoom_link: None,
        virtual_meeting_url: None,
        allow_cash_payment: true,
        max_member_discount_slots: 2,
        day_of_sms_time: None,
        registration_fields: None,
        notification_templates: None,
        is_recurring: false,
        recurrence_rule: None,
        status: EventStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn sub_event(parent: &Event, name: &str, price: i32, required: bool) -> SubEvent {
    let now = Utc::now();
    SubEvent {
        id: Uuid::new_v4(),
        parent_event_id: parent.id,
        name: name.to_string(),
        description: None,
        pricing_model: SubEventPricingModel::Fixed,
        fixed_price_cents: Some(price),
        min_donation_cents: None,
        stripe_price_id: None,
        capacity: None,
        sort_order: 0,
        is_required: required,
        created_at: now,
        updated_at: now,
    }
}

fn input<'a>(event: &'a Event, subs: &'a [SubEvent]) -> PricingInput<'a> {
    PricingInput {
        event,
        selected_sub_events: subs,
        donation_amount_cents: None,
        scholarship_price_cents: None,
        member_discount_cents: None,
    }
}

#[test]
fn composite_selection_is_priced_per_sub_event() {
    let ev = event(PricingModel::Composite);
    let all = vec![
        sub_event(&ev, "Friday night", 4_000, true),
        sub_event(&ev, "Saturday", 9_000, false),
        sub_event(&ev, "Sunday brunch", 2_500, false),
    ];

    assert!(select_sub_events(&all, &[all[1].id]).is_err());

    let chosen = select_sub_events(&all, &[all[0].id, all[2].id]).unwrap();
    let q = quote(&input(&ev, &chosen));
    assert_eq!(q.total_cents, 6_500);
    assert_eq!(q.sub_event_prices, vec![(all[0].id, 4_000), (all[2].id, 2_500)]);
    assert_eq!(q.line_items.len(), 2);
    assert_eq!(route(None, ev.allow_cash_payment, &q), Routing::Checkout);
}

#[test]
fn member_discount_then_cash() {
    let mut ev = event(PricingModel::Fixed);
    ev.fixed_price_cents = Some(20_000);

    let mut inp = input(&ev, &[]);
    inp.member_discount_cents = Some(5_000);
    let q = quote(&inp);
    assert_eq!(q.total_cents, 15_000);
    assert_eq!(q.discount, Discount::Member { discount_cents: 5_000 });
    assert_eq!(
        q.line_items,
        vec![LineItem::amount("Desert Sit (Member discount)", 15_000)]
    );

    let routing = route(Some(PaymentMethod::Cash), ev.allow_cash_payment, &q);
    assert_eq!(routing, Routing::Cash);
    assert_eq!(routing.status(), RegistrationStatus::CashPending);
    assert_eq!(routing.payment_method(&q), PaymentMethod::Cash);
}

#[test]
fn full_scholarship_completes_without_checkout() {
    let mut ev = event(PricingModel::Fixed);
    ev.fixed_price_cents = Some(20_000);

    let mut inp = input(&ev, &[]);
    inp.scholarship_price_cents = Some(0);
    inp.member_discount_cents = Some(5_000);
    let q = quote(&inp);
    assert_eq!(q.total_cents, 0);
    assert!(q.scholarship_applied());
    assert!(!q.needs_checkout());

    let routing = route(None, ev.allow_cash_payment, &q);
    assert_eq!(routing.status(), RegistrationStatus::Complete);
    assert_eq!(routing.payment_method(&q), PaymentMethod::Scholarship);
}
