//! Event lifecycle enums, writable attributes, and attribute validation.
//!
//! Enum discriminants match the SMALLINT values stored in the `events`
//! table and guarded there by CHECK constraints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Enum ID type matching SMALLINT in the database.
pub type EnumId = i16;

/// Entity type name written to ledger rows and polymorphic tables.
pub const EVENT_ENTITY_TYPE: &str = "Event";

/// Ledger kind for a user check-in at an event.
pub const CHECKIN_TYPE: &str = "checkin";
/// Ledger kind for points received by an event.
pub const RECEIVE_TYPE: &str = "receive";
/// Ledger kind for a point exchange redeemed against an event.
pub const EXCHANGE_TYPE: &str = "exchange";
/// Ledger kind recorded when an event becomes published.
pub const PUBLISH_TYPE: &str = "publish";

macro_rules! define_event_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database ID.
            pub fn id(self) -> EnumId {
                self as EnumId
            }

            /// Return the wire name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Look up a variant by its wire name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for EnumId {
            fn from(value: $name) -> Self {
                value as EnumId
            }
        }

        impl TryFrom<EnumId> for $name {
            type Error = CoreError;

            fn try_from(value: EnumId) -> Result<Self, Self::Error> {
                match value {
                    $($val => Ok($name::$variant),)+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {} id {other}",
                        $label
                    ))),
                }
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s).ok_or_else(|| {
                    CoreError::Validation(format!("Unknown {} '{s}'", $label))
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_event_enum! {
    /// Whether an event is switched on at all.
    EventStatus ("status") {
        Inactive = 0 => "inactive",
        #[default]
        Active = 1 => "active",
    }
}

define_event_enum! {
    /// Event category shown to residents.
    EventCategory ("category") {
        #[default]
        Education = 0 => "education",
        Festival = 1 => "festival",
        Sport = 2 => "sport",
        Culture = 3 => "culture",
        Health = 4 => "health",
        Consultation = 5 => "consultation",
        Other = 6 => "other",
    }
}

define_event_enum! {
    /// Publication stage of an event.
    EventProgress ("progress") {
        Draft = 0 => "draft",
        #[default]
        Published = 1 => "published",
        Closed = 2 => "closed",
    }
}

// ---------------------------------------------------------------------------
// Display window
// ---------------------------------------------------------------------------

/// The nullable instants that gate map display and QR check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventWindow {
    pub map_start_date: Option<Timestamp>,
    pub display_end_date: Option<Timestamp>,
    pub qr_start_datetime: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Writable attributes
// ---------------------------------------------------------------------------

/// Every column the write path may set on an event.
///
/// Validation only runs for non-draft progress, see
/// [`EventFields::validate_for_save`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_display_window"))]
pub struct EventFields {
    #[validate(
        required(message = "can't be blank"),
        length(min = 1, max = 255, message = "must be between 1 and 255 characters")
    )]
    pub name: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub town: Option<String>,
    #[validate(length(max = 255))]
    pub post_code: Option<String>,
    pub access: Option<String>,
    #[validate(length(max = 255))]
    pub application: Option<String>,
    #[validate(length(max = 255))]
    pub manager: Option<String>,
    pub sponsor: Option<String>,
    pub note: Option<String>,
    #[validate(length(max = 255))]
    pub period: Option<String>,
    #[validate(length(max = 255))]
    pub period_note: Option<String>,
    #[validate(url(message = "must be a valid URL"), length(max = 255))]
    pub url: Option<String>,
    #[validate(length(max = 255))]
    pub facebook: Option<String>,
    #[validate(length(max = 255))]
    pub instagram: Option<String>,
    #[validate(length(max = 255))]
    pub twitter: Option<String>,
    #[validate(length(max = 255))]
    pub line: Option<String>,
    #[validate(email(message = "must be a valid email address"), length(max = 255))]
    pub inquiry_email: Option<String>,
    #[validate(length(max = 255))]
    pub inquiry_phone_number: Option<String>,
    #[validate(length(max = 400))]
    pub sdgs_content: Option<String>,
    /// Storage key of the uploaded PDF flyer.
    pub pdf_info: Option<String>,
    pub event_tag: Option<i32>,
    pub water_station: bool,
    pub category: EventCategory,
    pub status: EventStatus,
    pub progress: EventProgress,
    pub calendar_start_date: Option<Timestamp>,
    pub map_start_date: Option<Timestamp>,
    pub display_end_date: Option<Timestamp>,
    pub qr_start_datetime: Option<Timestamp>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub point: i32,
    #[validate(required(message = "can't be blank"))]
    pub active_area_id: Option<DbId>,
    pub prefecture_id: Option<DbId>,
    pub city_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

fn validate_display_window(fields: &EventFields) -> Result<(), ValidationError> {
    match (fields.map_start_date, fields.display_end_date) {
        (Some(start), Some(end)) if end < start => {
            let mut err = ValidationError::new("display_window");
            err.message = Some("display_end_date must not be before map_start_date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl EventFields {
    /// Validate unless the event is a draft.
    ///
    /// Drafts may be saved half-filled, so they skip every rule.
    pub fn validate_for_save(&self) -> Result<(), CoreError> {
        if self.progress == EventProgress::Draft {
            return Ok(());
        }
        self.validate()
            .map_err(|errors| CoreError::Validation(describe_validation_errors(&errors)))
    }

    pub fn window(&self) -> EventWindow {
        EventWindow {
            map_start_date: self.map_start_date,
            display_end_date: self.display_end_date,
            qr_start_datetime: self.qr_start_datetime,
        }
    }

    /// Apply a partial change set. Absent keys keep their current value.
    pub fn merge(&mut self, changes: &EventChanges) {
        macro_rules! merge {
            (nullable: $($n:ident),+; plain: $($p:ident),+ $(,)?) => {
                $(if let Some(value) = &changes.$n {
                    self.$n = value.clone();
                })+
                $(if let Some(value) = &changes.$p {
                    self.$p = value.clone();
                })+
            };
        }

        merge!(
            nullable: name, content, address, town, post_code, access, application,
                manager, sponsor, note, period, period_note, url, facebook, instagram,
                twitter, line, inquiry_email, inquiry_phone_number, sdgs_content,
                pdf_info, event_tag, calendar_start_date, map_start_date,
                display_end_date, qr_start_datetime, lat, lng, active_area_id,
                prefecture_id, city_id;
            plain: water_station, category, status, progress, point,
        );
    }
}

/// Flatten validator output into one deterministic, human-readable line.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let detail = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", err.code));
                if field == "__all__" {
                    detail
                } else {
                    format!("{field} {detail}")
                }
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

// ---------------------------------------------------------------------------
// Partial change set
// ---------------------------------------------------------------------------

/// A partial attribute set as submitted by a client.
///
/// For nullable columns the outer `Option` says whether the key was present
/// and the inner one whether it was `null`, so `{"note": null}` clears the
/// note while omitting `note` leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventChanges {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub town: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub post_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub access: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub application: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub manager: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sponsor: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub period: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub period_note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub facebook: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub instagram: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub twitter: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub line: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub inquiry_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub inquiry_phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sdgs_content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub pdf_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub event_tag: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub calendar_start_date: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "double_option")]
    pub map_start_date: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_end_date: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "double_option")]
    pub qr_start_datetime: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lng: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub active_area_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub prefecture_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city_id: Option<Option<DbId>>,
    pub water_station: Option<bool>,
    pub category: Option<EventCategory>,
    pub status: Option<EventStatus>,
    pub progress: Option<EventProgress>,
    pub point: Option<i32>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
