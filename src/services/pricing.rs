//! Registration pricing and payment routing.
//!
//! Everything here is pure: callers load the event, the selected sub-events,
//! the scholarship link and the member discount, and get back a quote with the
//! total, the Stripe line items and the per-sub-event amounts to store.

use crate::db::enums::{PaymentMethod, PricingModel, RegistrationStatus, SubEventPricingModel};
use crate::db::models::event::{Event, SubEvent};
use uuid::Uuid;

/// Smallest donation charged when neither the attendee nor the event names one.
pub const DONATION_FLOOR_CENTS: i32 = 100;

/// One Stripe Checkout line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    /// A price object already configured in Stripe.
    Price { price_id: String, quantity: u32 },
    /// An ad-hoc amount in USD cents.
    Amount {
        name: String,
        unit_amount_cents: i32,
        quantity: u32,
    },
}

impl LineItem {
    pub fn amount(name: impl Into<String>, unit_amount_cents: i32) -> Self {
        LineItem::Amount {
            name: name.into(),
            unit_amount_cents,
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    None,
    /// Scholarship price replaced the computed total.
    Scholarship { price_cents: i32 },
    /// Flat member discount subtracted from the total.
    Member { discount_cents: i32 },
}

#[derive(Debug, Clone)]
pub struct PricingInput<'a> {
    pub event: &'a Event,
    pub selected_sub_events: &'a [SubEvent],
    pub donation_amount_cents: Option<i32>,
    pub scholarship_price_cents: Option<i32>,
    /// Discount of the attendee's current membership, if a member slot is still free.
    pub member_discount_cents: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    /// Price before any discount.
    pub base_cents: i32,
    /// Amount the attendee pays.
    pub total_cents: i32,
    pub discount: Discount,
    pub line_items: Vec<LineItem>,
    /// Price stored on each `registration_sub_events` row.
    pub sub_event_prices: Vec<(Uuid, i32)>,
}

impl PriceQuote {
    /// A Stripe price id stands in for an amount we may not know locally.
    pub fn needs_checkout(&self) -> bool {
        self.total_cents > 0
            || self
                .line_items
                .iter()
                .any(|item| matches!(item, LineItem::Price { .. }))
    }

    pub fn member_discount_applied(&self) -> bool {
        matches!(self.discount, Discount::Member { .. })
    }

    pub fn scholarship_applied(&self) -> bool {
        matches!(self.discount, Discount::Scholarship { .. })
    }
}

/// Donation amount honouring the event minimum and the absolute floor.
pub fn donation_amount(requested: Option<i32>, min_donation: Option<i32>) -> i32 {
    let amount = match (requested, min_donation) {
        (Some(r), _) if r > 0 => r,
        (_, Some(m)) if m > 0 => m,
        _ => DONATION_FLOOR_CENTS,
    };
    match min_donation {
        Some(m) if amount < m => m,
        _ => amount,
    }
}

pub fn sub_event_price(sub_event: &SubEvent) -> i32 {
    match sub_event.pricing_model {
        SubEventPricingModel::Fixed => sub_event.fixed_price_cents.unwrap_or(0),
        SubEventPricingModel::Donation => sub_event.min_donation_cents.unwrap_or(0),
        SubEventPricingModel::Free => 0,
    }
}

pub fn quote(input: &PricingInput<'_>) -> PriceQuote {
    let event = input.event;
    let mut sub_event_prices = Vec::new();

    let (base_cents, base_items) = match event.pricing_model {
        PricingModel::Fixed => {
            let price = event.fixed_price_cents.unwrap_or(0);
            let items = match (&event.stripe_price_id, event.fixed_price_cents) {
                (Some(price_id), _) => vec![LineItem::Price {
                    price_id: price_id.clone(),
                    quantity: 1,
                }],
                (None, Some(p)) if p > 0 => vec![LineItem::amount(&event.name, p)],
                _ => Vec::new(),
            };
            (price, items)
        }
        PricingModel::Donation => {
            let amount = donation_amount(input.donation_amount_cents, event.min_donation_cents);
            (amount, vec![LineItem::amount(&event.name, amount)])
        }
        PricingModel::Free => (0, Vec::new()),
        PricingModel::Composite => {
            let mut total = 0;
            let mut items = Vec::new();
            for se in input.selected_sub_events {
                let price = sub_event_price(se);
                sub_event_prices.push((se.id, price));
                total += price;
                if price > 0 {
                    items.push(LineItem::amount(format!("{} — {}", event.name, se.name), price));
                }
            }
            (total, items)
        }
    };

    if let Some(price_cents) = input.scholarship_price_cents {
        let total = price_cents.max(0);
        let items = if total > 0 {
            vec![LineItem::amount(format!("{} (Scholarship)", event.name), total)]
        } else {
            Vec::new()
        };
        return PriceQuote {
            base_cents,
            total_cents: total,
            discount: Discount::Scholarship { price_cents: total },
            line_items: items,
            sub_event_prices,
        };
    }

    // A configured Stripe price without a local amount cannot be discounted.
    let amount_known = !(event.pricing_model == PricingModel::Fixed
        && event.fixed_price_cents.is_none());
    if let Some(discount_cents) = input.member_discount_cents.filter(|d| *d > 0) {
        if amount_known && base_cents > 0 {
            let total = (base_cents - discount_cents).max(0);
            let items = if total > 0 {
                vec![LineItem::amount(format!("{} (Member discount)", event.name), total)]
            } else {
                Vec::new()
            };
            return PriceQuote {
                base_cents,
                total_cents: total,
                discount: Discount::Member {
                    discount_cents: base_cents - total,
                },
                line_items: items,
                sub_event_prices,
            };
        }
    }

    PriceQuote {
        base_cents,
        total_cents: base_cents,
        discount: Discount::None,
        line_items: base_items,
        sub_event_prices,
    }
}

/// Where a new registration goes once priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Pay at the door.
    Cash,
    /// Nothing to pay; confirmed immediately.
    Free,
    /// Send the attendee to Stripe Checkout.
    Checkout,
}

impl Routing {
    pub fn status(&self) -> RegistrationStatus {
        match self {
            Routing::Cash => RegistrationStatus::CashPending,
            Routing::Free => RegistrationStatus::Complete,
            Routing::Checkout => RegistrationStatus::PendingPayment,
        }
    }

    pub fn payment_method(&self, quote: &PriceQuote) -> PaymentMethod {
        match self {
            Routing::Cash => PaymentMethod::Cash,
            Routing::Free if quote.scholarship_applied() => PaymentMethod::Scholarship,
            Routing::Free => PaymentMethod::Free,
            Routing::Checkout => PaymentMethod::Stripe,
        }
    }
}

pub fn route(requested: Option<PaymentMethod>, allow_cash: bool, quote: &PriceQuote) -> Routing {
    if requested == Some(PaymentMethod::Cash) && allow_cash {
        Routing::Cash
    } else if !quote.needs_checkout() {
        Routing::Free
    } else {
        Routing::Checkout
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::enums::EventStatus;
    use chrono::Utc;

    pub(crate) fn event(model: PricingModel) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            name: "Forest Retreat".to_string(),
            slug: "forest-retreat".to_string(),
            description: None,
            event_date: now,
            event_end_date: None,
            event_type: "retreat".to_string(),
            pricing_model: model,
            fixed_price_cents: None,
            min_donation_cents: None,
            stripe_price_id: None,
            capacity: None,
            meeting_point_a: None,
            meeting_point_b: None,
            location_text: None,
            zoom_link: None,
            virtual_meeting_url: None,
            allow_cash_payment: false,
            max_member_discount_slots: 3,
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

    pub(crate) fn sub_event(
        parent: &Event,
        name: &str,
        model: SubEventPricingModel,
        price: Option<i32>,
    ) -> SubEvent {
        let now = Utc::now();
        SubEvent {
            id: Uuid::new_v4(),
            parent_event_id: parent.id,
            name: name.to_string(),
            description: None,
            pricing_model: model,
            fixed_price_cents: if model == SubEventPricingModel::Fixed { price } else { None },
            min_donation_cents: if model == SubEventPricingModel::Donation { price } else { None },
            stripe_price_id: None,
            capacity: None,
            sort_order: 0,
            is_required: false,
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
    fn test_fixed_price() {
        let mut e = event(PricingModel::Fixed);
        e.fixed_price_cents = Some(5000);
        let q = quote(&input(&e, &[]));
        assert_eq!(q.total_cents, 5000);
        assert_eq!(q.line_items, vec![LineItem::amount("Forest Retreat", 5000)]);
        assert_eq!(route(None, false, &q), Routing::Checkout);
    }

    #[test]
    fn test_fixed_with_stripe_price_id_needs_checkout() {
        let mut e = event(PricingModel::Fixed);
        e.stripe_price_id = Some("price_123".to_string());
        let q = quote(&input(&e, &[]));
        assert_eq!(q.total_cents, 0);
        assert!(q.needs_checkout());
        assert_eq!(route(Some(PaymentMethod::Stripe), false, &q), Routing::Checkout);
    }

    #[test]
    fn test_donation_amounts() {
        assert_eq!(donation_amount(Some(2500), Some(1000)), 2500);
        assert_eq!(donation_amount(Some(500), Some(1000)), 1000);
        assert_eq!(donation_amount(None, Some(1000)), 1000);
        assert_eq!(donation_amount(None, None), DONATION_FLOOR_CENTS);
        assert_eq!(donation_amount(Some(0), None), DONATION_FLOOR_CENTS);
    }

    #[test]
    fn test_free_event_routes_complete() {
        let e = event(PricingModel::Free);
        let q = quote(&input(&e, &[]));
        let r = route(None, false, &q);
        assert_eq!(r, Routing::Free);
        assert_eq!(r.status(), RegistrationStatus::Complete);
        assert_eq!(r.payment_method(&q), PaymentMethod::Free);
    }

    #[test]
    fn test_composite_sums_sub_events() {
        let e = event(PricingModel::Composite);
        let subs = vec![
            sub_event(&e, "Friday Night", SubEventPricingModel::Fixed, Some(3000)),
            sub_event(&e, "Saturday Ceremony", SubEventPricingModel::Donation, Some(1500)),
            sub_event(&e, "Sunday Walk", SubEventPricingModel::Free, None),
        ];
        let q = quote(&input(&e, &subs));
        assert_eq!(q.total_cents, 4500);
        assert_eq!(q.line_items.len(), 2);
        assert_eq!(
            q.line_items[0],
            LineItem::amount("Forest Retreat — Friday Night", 3000)
        );
        assert_eq!(q.sub_event_prices.len(), 3);
        assert_eq!(q.sub_event_prices[2].1, 0);
    }

    #[test]
    fn test_scholarship_overrides_member_discount() {
        let e = event(PricingModel::Composite);
        let subs = vec![sub_event(&e, "Weekend", SubEventPricingModel::Fixed, Some(20000))];
        let mut i = input(&e, &subs);
        i.scholarship_price_cents = Some(3000);
        i.member_discount_cents = Some(2500);
        let q = quote(&i);
        assert_eq!(q.total_cents, 3000);
        assert!(q.scholarship_applied());
        assert!(!q.member_discount_applied());
        assert_eq!(
            q.line_items,
            vec![LineItem::amount("Forest Retreat (Scholarship)", 3000)]
        );
    }

    #[test]
    fn test_member_discount_floors_at_zero() {
        let mut e = event(PricingModel::Fixed);
        e.fixed_price_cents = Some(2000);
        let mut i = input(&e, &[]);
        i.member_discount_cents = Some(2500);
        let q = quote(&i);
        assert_eq!(q.total_cents, 0);
        assert_eq!(q.discount, Discount::Member { discount_cents: 2000 });
        assert_eq!(route(None, false, &q), Routing::Free);
    }

    #[test]
    fn test_member_discount_reduces_total() {
        let mut e = event(PricingModel::Fixed);
        e.fixed_price_cents = Some(10000);
        let mut i = input(&e, &[]);
        i.member_discount_cents = Some(2500);
        let q = quote(&i);
        assert_eq!(q.total_cents, 7500);
        assert!(q.member_discount_applied());
    }

    #[test]
    fn test_cash_requires_event_permission() {
        let mut e = event(PricingModel::Fixed);
        e.fixed_price_cents = Some(4000);
        let q = quote(&input(&e, &[]));
        assert_eq!(route(Some(PaymentMethod::Cash), true, &q), Routing::Cash);
        assert_eq!(route(Some(PaymentMethod::Cash), false, &q), Routing::Checkout);
        assert_eq!(
            route(Some(PaymentMethod::Cash), true, &q).status(),
            RegistrationStatus::CashPending
        );
    }
}
