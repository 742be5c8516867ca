use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Declares a lowercase text-backed enum column type.
///
/// Every variant maps to exactly one stored string; the same string is used
/// for JSON, `Display` and `FromStr`, so API payloads and rows agree.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Comma separated list of accepted values, for error messages.
            pub fn allowed_values() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!(
                        "Invalid value '{}'. Must be one of: {}",
                        other,
                        $name::allowed_values()
                    )),
                }
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                s.parse::<$name>().map_err(Into::into)
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }
    };
}

text_enum!(PricingModel {
    Fixed => "fixed",
    Donation => "donation",
    Free => "free",
    Composite => "composite",
});

text_enum!(EventStatus {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

text_enum!(
    /// Sub-events cannot themselves be composite.
    SubEventPricingModel {
        Fixed => "fixed",
        Donation => "donation",
        Free => "free",
    }
);

text_enum!(RegistrationStatus {
    PendingPayment => "pending_payment",
    CashPending => "cash_pending",
    Complete => "complete",
    Expired => "expired",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl RegistrationStatus {
    /// Statuses that hold a spot against event capacity.
    pub const HOLDS_SPOT: [RegistrationStatus; 3] = [
        RegistrationStatus::PendingPayment,
        RegistrationStatus::CashPending,
        RegistrationStatus::Complete,
    ];

    /// Statuses that receive attendee communications.
    pub const ATTENDING: [RegistrationStatus; 2] =
        [RegistrationStatus::Complete, RegistrationStatus::CashPending];
}

text_enum!(AccommodationType {
    BellTent => "bell_tent",
    TipiTwin => "tipi_twin",
    SelfCamping => "self_camping",
    DayOnly => "day_only",
    NoAccommodation => "none",
});

text_enum!(PaymentMethod {
    Stripe => "stripe",
    Cash => "cash",
    Scholarship => "scholarship",
    Free => "free",
});

text_enum!(RegistrationSource {
    RegistrationForm => "registration_form",
    Manual => "manual",
    WalkIn => "walk_in",
    Group => "group",
});

text_enum!(ExpenseCategory {
    Groceries => "groceries",
    Supplies => "supplies",
    Replenishables => "replenishables",
    Cacao => "cacao",
    Venue => "venue",
    Transportation => "transportation",
    Other => "other",
});

text_enum!(ActorType {
    Admin => "admin",
    CoCreator => "co_creator",
});

text_enum!(OperatingExpenseCategory {
    Propane => "propane",
    Water => "water",
    Maintenance => "maintenance",
    ForestFund => "forest_fund",
    Supplies => "supplies",
    Other => "other",
});

text_enum!(TemplateCategory {
    Reminder => "reminder",
    DayOf => "day_of",
    PostEvent => "post_event",
    Confirmation => "confirmation",
    Cancellation => "cancellation",
    Custom => "custom",
});

text_enum!(TemplateChannel {
    Sms => "sms",
    Email => "email",
    Both => "both",
});

impl TemplateChannel {
    pub fn includes_sms(&self) -> bool {
        matches!(self, TemplateChannel::Sms | TemplateChannel::Both)
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, TemplateChannel::Email | TemplateChannel::Both)
    }
}

text_enum!(SmsDirection {
    Inbound => "inbound",
    Outbound => "outbound",
});

text_enum!(NotificationChannel {
    Email => "email",
    Sms => "sms",
});

text_enum!(NotificationStatus {
    Sent => "sent",
    Failed => "failed",
    Bounced => "bounced",
});

impl NotificationStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        }
    }
}

text_enum!(UserRole {
    Admin => "admin",
    Operator => "operator",
});

text_enum!(FormType {
    Intake => "intake",
    Waiver => "waiver",
    Accommodation => "accommodation",
    Dietary => "dietary",
    Travel => "travel",
    Logistics => "logistics",
    Health => "health",
    Legal => "legal",
    Custom => "custom",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_strings() {
        assert_eq!(RegistrationStatus::CashPending.as_str(), "cash_pending");
        assert_eq!(
            "walk_in".parse::<RegistrationSource>().unwrap(),
            RegistrationSource::WalkIn
        );
        assert_eq!(AccommodationType::NoAccommodation.to_string(), "none");
    }

    #[test]
    fn test_invalid_value_lists_allowed() {
        let err = "yurt".parse::<AccommodationType>().unwrap_err();
        assert!(err.contains("bell_tent"));
        assert!(err.contains("yurt"));
    }

    #[test]
    fn test_serde_uses_stored_names() {
        let json = serde_json::to_string(&OperatingExpenseCategory::ForestFund).unwrap();
        assert_eq!(json, "\"forest_fund\"");
        let parsed: TemplateChannel = serde_json::from_str("\"both\"").unwrap();
        assert!(parsed.includes_sms() && parsed.includes_email());
    }
}
