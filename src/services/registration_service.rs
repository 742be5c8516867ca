//! Public registration flow: pricing, capacity, scholarships and checkout.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{RegistrationSource, RegistrationStatus},
    db::models::attendee::{Attendee, AttendeeChangeset, NewAttendee},
    db::models::event::{Event, PublicEventInfo, RegistrationInfo, SubEvent},
    db::models::registration::{
        CancelRequest, GroupMember, GroupMemberRegistration, GroupRegisterRequest,
        GroupRegistrationCreated, NewRegistration, NewRegistrationSubEvent, RegisterRequest,
        Registration, RegistrationChangeset, RegistrationCreated,
    },
    db::models::scholarship::ScholarshipLink,
    db::repositories::attendees::{AttendeeRepo, MembershipRepo},
    db::repositories::events::{EventRepo, SubEventRepo},
    db::repositories::registrations::{RegistrationRepo, RegistrationSubEventRepo},
    db::repositories::scholarships::ScholarshipRepo,
    error::AppError,
    providers::{CheckoutRequest, Providers, emails},
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::pricing::{self, LineItem, PriceQuote, PricingInput, Routing},
    utils::intake::sanitize_intake_data,
    utils::phone::normalize_optional,
    validation::registration::{
        check_existing, check_group_members, check_scholarship, ensure_spots,
        ensure_sub_event_room, parse_accommodation, require_waiver, select_sub_events,
    },
};

/// Loads an attendee by email, creating one on first contact. A missing phone
/// is filled in from the new details.
pub fn find_or_create_attendee(
    conn: &mut PgConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
) -> Result<Attendee, AppError> {
    let email = email.trim().to_lowercase();
    let phone = normalize_optional(phone);

    match AttendeeRepo::find_by_email(conn, &email)? {
        Some(attendee) if attendee.phone.is_none() && phone.is_some() => {
            let changes = AttendeeChangeset {
                phone: Some(phone),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            Ok(AttendeeRepo::update(conn, attendee.id, &changes)?)
        }
        Some(attendee) => Ok(attendee),
        None => {
            let new_attendee = NewAttendee {
                email,
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
                phone,
            };
            Ok(AttendeeRepo::insert(conn, &new_attendee)?)
        }
    }
}

fn spots_remaining(conn: &mut PgConnection, event: &Event) -> Result<Option<i64>, AppError> {
    match event.capacity {
        Some(capacity) => {
            let holders = EventRepo::count_spot_holders(conn, event.id)?;
            Ok(Some((capacity as i64 - holders).max(0)))
        }
        None => Ok(None),
    }
}

fn lock_active_event(conn: &mut PgConnection, slug: &str) -> Result<Event, AppError> {
    EventRepo::find_active_by_slug_for_update(conn, slug)?
        .ok_or_else(|| AppError::not_found("Event"))
}

fn claim_sub_events(
    conn: &mut PgConnection,
    event: &Event,
    chosen: &[Uuid],
    seats: i64,
) -> Result<Vec<SubEvent>, AppError> {
    if !event.is_composite() {
        return Ok(Vec::new());
    }
    let all = SubEventRepo::list_by_event(conn, event.id)?;
    let selected = select_sub_events(&all, chosen)?;
    for sub_event in &selected {
        let holders = SubEventRepo::count_spot_holders(conn, sub_event.id)?;
        ensure_sub_event_room(sub_event, holders, seats)?;
    }
    Ok(selected)
}

/// Locks the link row and spends `seats` uses of it.
fn claim_scholarship(
    conn: &mut PgConnection,
    event: &Event,
    code: Option<&str>,
    seats: i32,
) -> Result<Option<ScholarshipLink>, AppError> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let link = ScholarshipRepo::find_by_code_for_update(conn, code)?
        .ok_or_else(|| AppError::not_found("Scholarship code"))?;
    check_scholarship(&link, event.id, seats)?;
    ScholarshipRepo::increment_uses(conn, link.id, seats)?;
    Ok(Some(link))
}

/// Discount of the attendee's current membership while the event still has member slots.
fn member_discount(
    conn: &mut PgConnection,
    event: &Event,
    attendee_id: Uuid,
    claimed_in_request: i64,
    now: DateTime<Utc>,
) -> Result<Option<i32>, AppError> {
    let Some(membership) = MembershipRepo::find_current_for_attendee(conn, attendee_id, now)? else {
        return Ok(None);
    };
    let used = RegistrationRepo::count_member_discounts(conn, event.id)? + claimed_in_request;
    if used >= event.max_member_discount_slots as i64 {
        return Ok(None);
    }
    Ok(Some(membership.discount_value_cents))
}

/// Inserts the registration, or reuses the lapsed row for the same pair.
fn store_registration(
    conn: &mut PgConnection,
    existing: Option<Registration>,
    fresh: &NewRegistration,
    quote: &PriceQuote,
) -> Result<Registration, AppError> {
    let registration = match existing {
        Some(lapsed) => {
            RegistrationSubEventRepo::delete_by_registration(conn, lapsed.id)?;
            RegistrationRepo::revive(conn, lapsed.id, fresh)?
        }
        None => RegistrationRepo::insert(conn, fresh)?,
    };

    let rows: Vec<NewRegistrationSubEvent> = quote
        .sub_event_prices
        .iter()
        .map(|(sub_event_id, price)| NewRegistrationSubEvent {
            registration_id: registration.id,
            sub_event_id: *sub_event_id,
            payment_amount_cents: Some(*price),
        })
        .collect();
    RegistrationSubEventRepo::insert_many(conn, &rows)?;
    Ok(registration)
}

/// Attendee-level details shared by single and group registrations.
struct Applicant {
    attendee: Attendee,
    existing: Option<Registration>,
    details: NewRegistration,
}

fn prepare_applicant(
    conn: &mut PgConnection,
    event: &Event,
    member: &GroupMember,
    source: RegistrationSource,
    own_message: bool,
    now: DateTime<Utc>,
) -> Result<Applicant, AppError> {
    let attendee = find_or_create_attendee(
        conn,
        &member.email,
        &member.first_name,
        &member.last_name,
        member.phone.as_deref(),
    )?;
    let existing = RegistrationRepo::find_for_attendee_and_event(conn, attendee.id, event.id)?;
    let existing = check_existing(existing, &attendee.email, own_message)?;

    require_waiver(member.waiver_accepted)?;
    let accommodation_type = parse_accommodation(member.accommodation_type.as_deref())?;
    let intake_data = sanitize_intake_data(member.intake_data.as_ref())?;

    let details = NewRegistration {
        attendee_id: attendee.id,
        event_id: event.id,
        status: RegistrationStatus::PendingPayment,
        payment_method: None,
        payment_amount_cents: None,
        group_id: None,
        accommodation_type,
        dietary_restrictions: member
            .dietary_restrictions
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        intake_data: Some(intake_data),
        waiver_accepted_at: Some(now),
        source,
        notes: None,
        member_discount_applied: false,
    };
    Ok(Applicant {
        attendee,
        existing,
        details,
    })
}

/// Line item for one group member: an amount, or the member's Stripe price items.
fn group_line_items(event: &Event, attendee: &Attendee, quote: &PriceQuote) -> Vec<LineItem> {
    if quote.total_cents > 0 {
        vec![LineItem::amount(
            format!("{} — {}", event.name, attendee.full_name()),
            quote.total_cents,
        )]
    } else {
        quote.line_items.clone()
    }
}

/// Combined routing for a group: all members share one payment path.
pub fn group_routing(routes: &[Routing]) -> Routing {
    if routes.iter().any(|r| *r == Routing::Cash) {
        Routing::Cash
    } else if routes.iter().any(|r| *r == Routing::Checkout) {
        Routing::Checkout
    } else {
        Routing::Free
    }
}

struct Booked {
    event: Event,
    registrations: Vec<(Registration, Attendee)>,
    routing: Routing,
    line_items: Vec<LineItem>,
    scholarship: Option<(Uuid, i32)>,
}

pub struct RegistrationService;

impl RegistrationService {
    pub fn info(conn: &mut PgConnection, slug: &str) -> Result<RegistrationInfo, AppError> {
        let event = EventRepo::find_by_slug(conn, slug)?
            .ok_or_else(|| AppError::not_found("Event"))?;
        let spots_remaining = spots_remaining(conn, &event)?;
        let sub_events = if event.is_composite() {
            SubEventRepo::list_by_event(conn, event.id)?
        } else {
            Vec::new()
        };

        Ok(RegistrationInfo {
            event: PublicEventInfo {
                name: event.name,
                slug: event.slug,
                description: event.description,
                event_date: event.event_date,
                event_end_date: event.event_end_date,
                event_type: event.event_type,
                pricing_model: event.pricing_model,
                fixed_price_cents: event.fixed_price_cents,
                min_donation_cents: event.min_donation_cents,
                capacity: event.capacity,
                spots_remaining,
                location_text: event.location_text,
                allow_cash_payment: event.allow_cash_payment,
                registration_fields: event.registration_fields,
                sub_events,
            },
        })
    }

    pub async fn register(
        conn: &mut PgConnection,
        providers: &Providers,
        slug: &str,
        req: &RegisterRequest,
    ) -> Result<RegistrationCreated, AppError> {
        let now = Utc::now();
        let applicant = GroupMember {
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            accommodation_type: req.accommodation_type.clone(),
            dietary_restrictions: req.dietary_restrictions.clone(),
            waiver_accepted: req.waiver_accepted,
            intake_data: req.intake_data.clone(),
        };

        let booked = conn.transaction::<_, AppError, _>(|conn| {
            let event = lock_active_event(conn, slug)?;
            let holders = EventRepo::count_spot_holders(conn, event.id)?;
            ensure_spots(event.capacity, holders, 1)?;

            let Applicant {
                attendee,
                existing,
                mut details,
            } = prepare_applicant(
                conn,
                &event,
                &applicant,
                RegistrationSource::RegistrationForm,
                true,
                now,
            )?;

            let selected = claim_sub_events(conn, &event, &req.sub_event_ids, 1)?;
            let scholarship = claim_scholarship(conn, &event, req.scholarship_code.as_deref(), 1)?;
            let member_discount_cents = match scholarship {
                Some(_) => None,
                None => member_discount(conn, &event, attendee.id, 0, now)?,
            };

            let quote = pricing::quote(&PricingInput {
                event: &event,
                selected_sub_events: &selected,
                donation_amount_cents: req.donation_amount_cents,
                scholarship_price_cents: scholarship.as_ref().map(|s| s.scholarship_price_cents),
                member_discount_cents,
            });
            let routing = pricing::route(req.payment_method, event.allow_cash_payment, &quote);

            details.status = routing.status();
            details.payment_method = Some(routing.payment_method(&quote));
            details.payment_amount_cents = Some(quote.total_cents);
            details.member_discount_applied = quote.member_discount_applied();
            let registration = store_registration(conn, existing, &details, &quote)?;

            tracing::info!(
                registration_id = %registration.id,
                event_id = %event.id,
                status = %registration.status,
                total_cents = quote.total_cents,
                "registration created"
            );

            Ok(Booked {
                scholarship: scholarship.map(|s| (s.id, 1)),
                line_items: quote.line_items.clone(),
                event,
                registrations: vec![(registration, attendee)],
                routing,
            })
        })?;

        let (registration_id, status) = match booked.registrations.first() {
            Some((r, _)) => (r.id, r.status),
            None => return Err(AppError::internal("registration was not stored")),
        };
        let checkout_url = Self::finish(conn, providers, &booked).await?;
        Ok(RegistrationCreated {
            registration_id,
            checkout_url,
            status,
        })
    }

    pub async fn register_group(
        conn: &mut PgConnection,
        providers: &Providers,
        slug: &str,
        req: &GroupRegisterRequest,
    ) -> Result<GroupRegistrationCreated, AppError> {
        let now = Utc::now();
        let members: Vec<&GroupMember> =
            std::iter::once(&req.payer).chain(req.guests.iter()).collect();
        let seats = members.len() as i64;
        let group_id = Uuid::new_v4();

        let booked = conn.transaction::<_, AppError, _>(|conn| {
            let event = lock_active_event(conn, slug)?;
            check_group_members(&members)?;
            let holders = EventRepo::count_spot_holders(conn, event.id)?;
            ensure_spots(event.capacity, holders, seats)?;

            let mut applicants = Vec::with_capacity(members.len());
            for member in &members {
                applicants.push(prepare_applicant(
                    conn,
                    &event,
                    member,
                    RegistrationSource::Group,
                    false,
                    now,
                )?);
            }

            let selected = claim_sub_events(conn, &event, &req.sub_event_ids, seats)?;
            let scholarship = claim_scholarship(
                conn,
                &event,
                req.scholarship_code.as_deref(),
                seats as i32,
            )?;

            let mut quotes = Vec::with_capacity(applicants.len());
            let mut member_slots_claimed = 0;
            for applicant in &applicants {
                let member_discount_cents = match scholarship {
                    Some(_) => None,
                    None => member_discount(
                        conn,
                        &event,
                        applicant.attendee.id,
                        member_slots_claimed,
                        now,
                    )?,
                };
                let quote = pricing::quote(&PricingInput {
                    event: &event,
                    selected_sub_events: &selected,
                    donation_amount_cents: req.donation_amount_cents,
                    scholarship_price_cents: scholarship
                        .as_ref()
                        .map(|s| s.scholarship_price_cents),
                    member_discount_cents,
                });
                if quote.member_discount_applied() {
                    member_slots_claimed += 1;
                }
                quotes.push(quote);
            }

            let routes: Vec<Routing> = quotes
                .iter()
                .map(|q| pricing::route(req.payment_method, event.allow_cash_payment, q))
                .collect();
            let routing = group_routing(&routes);

            let mut registrations = Vec::with_capacity(applicants.len());
            let mut line_items = Vec::new();
            for (applicant, quote) in applicants.into_iter().zip(quotes.iter()) {
                let Applicant {
                    attendee,
                    existing,
                    mut details,
                } = applicant;
                details.status = routing.status();
                details.payment_method = Some(routing.payment_method(quote));
                details.payment_amount_cents = Some(quote.total_cents);
                details.member_discount_applied = quote.member_discount_applied();
                details.group_id = Some(group_id);
                let registration = store_registration(conn, existing, &details, quote)?;
                line_items.extend(group_line_items(&event, &attendee, quote));
                registrations.push((registration, attendee));
            }

            tracing::info!(
                group_id = %group_id,
                event_id = %event.id,
                size = registrations.len(),
                status = %routing.status(),
                "group registration created"
            );

            Ok(Booked {
                scholarship: scholarship.map(|s| (s.id, seats as i32)),
                event,
                registrations,
                routing,
                line_items,
            })
        })?;

        let checkout_url = Self::finish(conn, providers, &booked).await?;
        Ok(GroupRegistrationCreated {
            group_id,
            registrations: booked
                .registrations
                .iter()
                .map(|(r, a)| GroupMemberRegistration {
                    registration_id: r.id,
                    email: a.email.clone(),
                    status: r.status,
                })
                .collect(),
            checkout_url,
            status: booked.routing.status(),
        })
    }

    /// After commit: opens checkout, or confirms free registrations by email.
    async fn finish(
        conn: &mut PgConnection,
        providers: &Providers,
        booked: &Booked,
    ) -> Result<Option<String>, AppError> {
        match booked.routing {
            Routing::Cash => Ok(None),
            Routing::Free => {
                for (_, attendee) in &booked.registrations {
                    providers
                        .try_email(&emails::confirmation(attendee, &booked.event))
                        .await;
                }
                Ok(None)
            }
            Routing::Checkout => {
                let Some((primary, payer)) = booked.registrations.first() else {
                    return Ok(None);
                };
                let request = CheckoutRequest {
                    registration_id: primary.id,
                    event_id: booked.event.id,
                    event_slug: booked.event.slug.clone(),
                    customer_email: payer.email.clone(),
                    line_items: booked.line_items.clone(),
                };

                match providers.payments.create_checkout_session(&request).await {
                    Ok(session) => {
                        let changes = RegistrationChangeset {
                            stripe_checkout_session_id: Some(Some(session.id.clone())),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        };
                        for (registration, _) in &booked.registrations {
                            RegistrationRepo::update(conn, registration.id, &changes)?;
                        }
                        Ok(session.url)
                    }
                    Err(err) => {
                        Self::release(conn, booked)?;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Frees the spots and scholarship uses of a booking whose checkout could not be opened.
    fn release(conn: &mut PgConnection, booked: &Booked) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            let changes = RegistrationChangeset {
                status: Some(RegistrationStatus::Expired),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            for (registration, _) in &booked.registrations {
                RegistrationRepo::update(conn, registration.id, &changes)?;
            }
            if let Some((link_id, seats)) = booked.scholarship {
                ScholarshipRepo::increment_uses(conn, link_id, -seats)?;
            }
            Ok(())
        })?;
        tracing::warn!(
            event_id = %booked.event.id,
            count = booked.registrations.len(),
            "checkout failed, registrations expired"
        );
        Ok(())
    }

    pub fn success(conn: &mut PgConnection, slug: &str) -> Result<Value, AppError> {
        let event = EventRepo::find_by_slug(conn, slug)?
            .ok_or_else(|| AppError::not_found("Event"))?;
        Ok(json!({
            "event_name": event.name,
            "event_date": event.event_date.to_rfc3339(),
            "message": "Your registration is confirmed! Check your email for details.",
        }))
    }

    pub fn cancelled(conn: &mut PgConnection, slug: &str) -> Result<Value, AppError> {
        let event = EventRepo::find_by_slug(conn, slug)?
            .ok_or_else(|| AppError::not_found("Event"))?;
        Ok(json!({
            "event_name": event.name,
            "message": "Your registration was not completed. You can try again anytime.",
        }))
    }

    /// Notes the request for staff; the registration status is left alone.
    pub async fn cancel_request(
        conn: &mut PgConnection,
        providers: &Providers,
        admin_email: Option<&str>,
        slug: &str,
        req: &CancelRequest,
    ) -> Result<Value, AppError> {
        let (registration, attendee) = RegistrationRepo::find_with_attendee(conn, req.registration_id)?
            .ok_or_else(|| AppError::not_found("Registration"))?;
        let event = EventRepo::find_by_id(conn, registration.event_id)?
            .filter(|e| e.slug == slug)
            .ok_or_else(|| AppError::not_found("Registration"))?;
        if !attendee.email.eq_ignore_ascii_case(req.email.trim()) {
            return Err(AppError::forbidden("Email does not match this registration"));
        }

        let reason = req.reason.trim();
        let line = format!("CANCEL REQUEST: {}", reason);
        let notes = match registration.notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        };
        let ctx = RequestContext::system(&format!("attendee/{}", attendee.email));

        conn.transaction::<_, AppError, _>(|conn| {
            let changes = RegistrationChangeset {
                notes: Some(Some(notes.clone())),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            RegistrationRepo::update(conn, registration.id, &changes)?;
            AuditService::record_change(
                conn,
                &ctx,
                "registration",
                registration.id,
                "cancel_requested",
                Some(&json!({ "notes": registration.notes })),
                Some(&json!({ "notes": notes, "reason": reason })),
            )?;
            Ok(())
        })?;

        match admin_email {
            Some(admin) if !admin.is_empty() => {
                providers
                    .try_email(&emails::cancel_request(admin, &attendee, &event, Some(reason)))
                    .await;
            }
            _ => tracing::warn!(
                registration_id = %registration.id,
                "ADMIN_NOTIFICATION_EMAIL not set, cancel request not forwarded"
            ),
        }

        Ok(json!({
            "registration_id": registration.id,
            "message": "Your cancellation request has been received. We will be in touch shortly.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::PricingModel;
    use crate::services::pricing::tests::event;
    use chrono::Utc;

    fn attendee() -> Attendee {
        let now = Utc::now();
        Attendee {
            id: Uuid::new_v4(),
            email: "river@example.com".into(),
            first_name: "River".into(),
            last_name: "Stone".into(),
            phone: None,
            is_member: false,
            membership_id: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_group_routing() {
        assert_eq!(group_routing(&[Routing::Free, Routing::Free]), Routing::Free);
        assert_eq!(
            group_routing(&[Routing::Free, Routing::Checkout]),
            Routing::Checkout
        );
        assert_eq!(group_routing(&[Routing::Cash, Routing::Cash]), Routing::Cash);
    }

    #[test]
    fn test_group_line_item_per_guest() {
        let mut e = event(PricingModel::Fixed);
        e.fixed_price_cents = Some(5000);
        let quote = pricing::quote(&PricingInput {
            event: &e,
            selected_sub_events: &[],
            donation_amount_cents: None,
            scholarship_price_cents: None,
            member_discount_cents: None,
        });
        let items = group_line_items(&e, &attendee(), &quote);
        assert_eq!(
            items,
            vec![LineItem::amount("Forest Retreat — River Stone", 5000)]
        );

        let free = event(PricingModel::Free);
        let quote = pricing::quote(&PricingInput {
            event: &free,
            selected_sub_events: &[],
            donation_amount_cents: None,
            scholarship_price_cents: None,
            member_discount_cents: None,
        });
        assert!(group_line_items(&free, &attendee(), &quote).is_empty());
    }
}
