//! Typed filter and sort expressions for event collections.
//!
//! Callers send ransack-style JSON such as
//! `{"name_cont": "clean", "category_in": ["sport", "health"], "m": "or"}`.
//! [`FilterExpr::parse`] turns it into an AST whose fields come from a
//! fixed allow-list and whose values are typed, so the SQL renderer only
//! ever emits known column names and bound parameters.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::CoreError;
use crate::event::{EventCategory, EventProgress, EventStatus};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Closed enum columns, whose values are accepted by name or id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Status,
    Category,
    Progress,
}

impl EnumKind {
    fn id_for_name(self, name: &str) -> Option<i16> {
        match self {
            EnumKind::Status => EventStatus::from_name(name).map(EventStatus::id),
            EnumKind::Category => EventCategory::from_name(name).map(EventCategory::id),
            EnumKind::Progress => EventProgress::from_name(name).map(EventProgress::id),
        }
    }

    fn is_valid_id(self, id: i64) -> bool {
        let Ok(id) = i16::try_from(id) else {
            return false;
        };
        match self {
            EnumKind::Status => EventStatus::try_from(id).is_ok(),
            EnumKind::Category => EventCategory::try_from(id).is_ok(),
            EnumKind::Progress => EventProgress::try_from(id).is_ok(),
        }
    }
}

/// Value type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Bool,
    Timestamp,
    Enum(EnumKind),
}

/// Fields that may appear in filters and sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Id,
    Name,
    Content,
    Address,
    Town,
    PostCode,
    Manager,
    Sponsor,
    Category,
    Status,
    Progress,
    Point,
    WaterStation,
    EventTag,
    ActiveAreaId,
    PrefectureId,
    CityId,
    UserId,
    CalendarStartDate,
    MapStartDate,
    DisplayEndDate,
    QrStartDatetime,
    Lat,
    Lng,
    CreatedAt,
    UpdatedAt,
    /// SDG linked through `event_sdgs`.
    SdgsId,
}

impl EventField {
    pub const ALL: &'static [EventField] = &[
        EventField::Id,
        EventField::Name,
        EventField::Content,
        EventField::Address,
        EventField::Town,
        EventField::PostCode,
        EventField::Manager,
        EventField::Sponsor,
        EventField::Category,
        EventField::Status,
        EventField::Progress,
        EventField::Point,
        EventField::WaterStation,
        EventField::EventTag,
        EventField::ActiveAreaId,
        EventField::PrefectureId,
        EventField::CityId,
        EventField::UserId,
        EventField::CalendarStartDate,
        EventField::MapStartDate,
        EventField::DisplayEndDate,
        EventField::QrStartDatetime,
        EventField::Lat,
        EventField::Lng,
        EventField::CreatedAt,
        EventField::UpdatedAt,
        EventField::SdgsId,
    ];

    /// Name used in filter keys and sort columns.
    pub fn name(self) -> &'static str {
        match self {
            EventField::Id => "id",
            EventField::Name => "name",
            EventField::Content => "content",
            EventField::Address => "address",
            EventField::Town => "town",
            EventField::PostCode => "post_code",
            EventField::Manager => "manager",
            EventField::Sponsor => "sponsor",
            EventField::Category => "category",
            EventField::Status => "status",
            EventField::Progress => "progress",
            EventField::Point => "point",
            EventField::WaterStation => "water_station",
            EventField::EventTag => "event_tag",
            EventField::ActiveAreaId => "active_area_id",
            EventField::PrefectureId => "prefecture_id",
            EventField::CityId => "city_id",
            EventField::UserId => "user_id",
            EventField::CalendarStartDate => "calendar_start_date",
            EventField::MapStartDate => "map_start_date",
            EventField::DisplayEndDate => "display_end_date",
            EventField::QrStartDatetime => "qr_start_datetime",
            EventField::Lat => "lat",
            EventField::Lng => "lng",
            EventField::CreatedAt => "created_at",
            EventField::UpdatedAt => "updated_at",
            EventField::SdgsId => "sdgs_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Column on the `events` table, or `None` for association fields.
    pub fn column(self) -> Option<&'static str> {
        match self {
            EventField::SdgsId => None,
            other => Some(other.name()),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            EventField::Id
            | EventField::Point
            | EventField::EventTag
            | EventField::ActiveAreaId
            | EventField::PrefectureId
            | EventField::CityId
            | EventField::UserId
            | EventField::SdgsId => FieldKind::Integer,
            EventField::Name
            | EventField::Content
            | EventField::Address
            | EventField::Town
            | EventField::PostCode
            | EventField::Manager
            | EventField::Sponsor => FieldKind::Text,
            EventField::Category => FieldKind::Enum(EnumKind::Category),
            EventField::Status => FieldKind::Enum(EnumKind::Status),
            EventField::Progress => FieldKind::Enum(EnumKind::Progress),
            EventField::WaterStation => FieldKind::Bool,
            EventField::CalendarStartDate
            | EventField::MapStartDate
            | EventField::DisplayEndDate
            | EventField::QrStartDatetime
            | EventField::CreatedAt
            | EventField::UpdatedAt => FieldKind::Timestamp,
            EventField::Lat | EventField::Lng => FieldKind::Float,
        }
    }

    pub fn is_sortable(self) -> bool {
        self.column().is_some()
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    NotEq,
    In,
    NotIn,
    Lt,
    Lteq,
    Gt,
    Gteq,
    /// Substring match.
    Cont,
    /// Prefix match.
    Start,
    /// Suffix match.
    End,
    Null,
    NotNull,
}

impl Predicate {
    /// Key suffixes, longest first so `not_eq` wins over `eq`.
    const SUFFIXES: &'static [(&'static str, Predicate)] = &[
        ("not_null", Predicate::NotNull),
        ("not_eq", Predicate::NotEq),
        ("not_in", Predicate::NotIn),
        ("start", Predicate::Start),
        ("lteq", Predicate::Lteq),
        ("gteq", Predicate::Gteq),
        ("null", Predicate::Null),
        ("cont", Predicate::Cont),
        ("end", Predicate::End),
        ("eq", Predicate::Eq),
        ("in", Predicate::In),
        ("lt", Predicate::Lt),
        ("gt", Predicate::Gt),
    ];

    fn takes_list(self) -> bool {
        matches!(self, Predicate::In | Predicate::NotIn)
    }

    fn takes_flag(self) -> bool {
        matches!(self, Predicate::Null | Predicate::NotNull)
    }

    fn allowed_for(self, field: EventField) -> bool {
        let kind = field.kind();
        match self {
            Predicate::Eq | Predicate::In => true,
            Predicate::NotEq | Predicate::NotIn => true,
            Predicate::Cont | Predicate::Start | Predicate::End => kind == FieldKind::Text,
            Predicate::Lt | Predicate::Lteq | Predicate::Gt | Predicate::Gteq => matches!(
                kind,
                FieldKind::Integer | FieldKind::Float | FieldKind::Timestamp | FieldKind::Text
            ) && field.column().is_some(),
            Predicate::Null | Predicate::NotNull => field.column().is_some(),
        }
    }
}

/// Split `name_not_eq` into its field and predicate.
fn split_key(key: &str) -> Option<(EventField, Predicate)> {
    Predicate::SUFFIXES.iter().find_map(|(suffix, predicate)| {
        let field = key.strip_suffix(suffix)?.strip_suffix('_')?;
        EventField::from_name(field).map(|f| (f, *predicate))
    })
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A typed, bindable filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(Timestamp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(FilterValue),
    List(Vec<FilterValue>),
    /// `true` for `*_null: true`, `false` for `*_null: false`.
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: EventField,
    pub predicate: Predicate,
    pub operand: Operand,
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        _ => false,
    }
}

fn type_error(field: EventField, value: &Value) -> CoreError {
    CoreError::InvalidQuery(format!(
        "Invalid value {value} for field '{}'",
        field.name()
    ))
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim() {
            "true" | "1" | "t" => Some(true),
            "false" | "0" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&chrono::Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_value(field: EventField, value: &Value) -> Result<FilterValue, CoreError> {
    let parsed = match field.kind() {
        FieldKind::Integer => match value {
            Value::Number(n) => n.as_i64().map(FilterValue::Int),
            Value::String(s) => s.trim().parse().ok().map(FilterValue::Int),
            _ => None,
        },
        FieldKind::Float => match value {
            Value::Number(n) => n.as_f64().map(FilterValue::Float),
            Value::String(s) => s.trim().parse().ok().map(FilterValue::Float),
            _ => None,
        },
        FieldKind::Text => match value {
            Value::String(s) => Some(FilterValue::Text(s.clone())),
            Value::Number(n) => Some(FilterValue::Text(n.to_string())),
            _ => None,
        },
        FieldKind::Bool => parse_bool(value).map(FilterValue::Bool),
        FieldKind::Timestamp => match value {
            Value::String(s) => parse_timestamp(s).map(FilterValue::Timestamp),
            _ => None,
        },
        FieldKind::Enum(kind) => match value {
            Value::String(s) => kind
                .id_for_name(s.trim())
                .map(|id| FilterValue::Int(i64::from(id)))
                .or_else(|| {
                    s.trim()
                        .parse::<i64>()
                        .ok()
                        .filter(|id| kind.is_valid_id(*id))
                        .map(FilterValue::Int)
                }),
            Value::Number(n) => n
                .as_i64()
                .filter(|id| kind.is_valid_id(*id))
                .map(FilterValue::Int),
            _ => None,
        },
    };
    parsed.ok_or_else(|| type_error(field, value))
}

impl Condition {
    /// Parse one `key: value` pair. Blank values yield `Ok(None)`.
    fn parse(key: &str, value: &Value) -> Result<Option<Self>, CoreError> {
        let (field, predicate) = split_key(key)
            .ok_or_else(|| CoreError::InvalidQuery(format!("Unknown filter '{key}'")))?;

        if !predicate.allowed_for(field) {
            return Err(CoreError::InvalidQuery(format!(
                "Predicate '{key}' is not supported for field '{}'",
                field.name()
            )));
        }
        if is_blank(value) {
            return Ok(None);
        }

        let operand = if predicate.takes_flag() {
            Operand::Flag(parse_bool(value).ok_or_else(|| type_error(field, value))?)
        } else if predicate.takes_list() {
            let items: Vec<&Value> = match value {
                Value::Array(items) => items.iter().filter(|v| !is_blank(v)).collect(),
                single => vec![single],
            };
            Operand::List(
                items
                    .into_iter()
                    .map(|v| parse_value(field, v))
                    .collect::<Result<_, _>>()?,
            )
        } else {
            if value.is_array() || value.is_object() {
                return Err(type_error(field, value));
            }
            Operand::Single(parse_value(field, value)?)
        };

        Ok(Some(Condition {
            field,
            predicate,
            operand,
        }))
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// A group of conditions and nested groups joined by one combinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpr {
    pub combinator: Combinator,
    pub conditions: Vec<Condition>,
    pub groups: Vec<FilterExpr>,
}

impl FilterExpr {
    /// Parse a caller-supplied filter. `null` means "no filter".
    pub fn parse(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                let mut expr = Self::default();
                for (key, value) in map {
                    match key.as_str() {
                        "m" => expr.combinator = parse_combinator(value)?,
                        "g" => expr.groups = parse_groups(value)?,
                        _ => {
                            if let Some(condition) = Condition::parse(key, value)? {
                                expr.conditions.push(condition);
                            }
                        }
                    }
                }
                Ok(expr)
            }
            other => Err(CoreError::InvalidQuery(format!(
                "Filter must be an object, got {other}"
            ))),
        }
    }

    /// A filter on a single field, used by callers that add scope constraints.
    pub fn field_eq(field: EventField, value: FilterValue) -> Self {
        Self {
            conditions: vec![Condition {
                field,
                predicate: Predicate::Eq,
                operand: Operand::Single(value),
            }],
            ..Default::default()
        }
    }

    /// AND this expression with `active_area_id = area`.
    ///
    /// `None` matches only events without an area, mirroring the single-record
    /// permission check.
    pub fn scoped_to_area(self, area: Option<DbId>) -> Self {
        let mut scoped = match area {
            Some(id) => Self::field_eq(EventField::ActiveAreaId, FilterValue::Int(id)),
            None => Self {
                conditions: vec![Condition {
                    field: EventField::ActiveAreaId,
                    predicate: Predicate::Null,
                    operand: Operand::Flag(true),
                }],
                ..Default::default()
            },
        };
        if !self.is_empty() {
            scoped.groups.push(self);
        }
        scoped
    }

    /// True when the expression constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.iter().all(FilterExpr::is_empty)
    }
}

fn parse_combinator(value: &Value) -> Result<Combinator, CoreError> {
    match value.as_str().map(str::to_ascii_lowercase).as_deref() {
        Some("and") => Ok(Combinator::And),
        Some("or") => Ok(Combinator::Or),
        _ => Err(CoreError::InvalidQuery(format!(
            "Combinator must be 'and' or 'or', got {value}"
        ))),
    }
}

fn parse_groups(value: &Value) -> Result<Vec<FilterExpr>, CoreError> {
    match value {
        Value::Array(items) => items.iter().map(FilterExpr::parse).collect(),
        // ransack also accepts {"0": {...}, "1": {...}}
        Value::Object(map) => map.values().map(FilterExpr::parse).collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(CoreError::InvalidQuery(format!(
            "Groups must be a list, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: EventField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: EventField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    /// Build from the optional `column` / `direction` request arguments.
    pub fn parse(column: Option<&str>, direction: Option<&str>) -> Result<Self, CoreError> {
        let default = Self::default();

        let field = match column.map(str::trim).filter(|c| !c.is_empty()) {
            None => default.field,
            Some(name) => EventField::from_name(name)
                .filter(|f| f.is_sortable())
                .ok_or_else(|| CoreError::InvalidQuery(format!("Cannot sort by '{name}'")))?,
        };

        let direction = match direction
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .as_deref()
        {
            None => default.direction,
            Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(CoreError::InvalidQuery(format!(
                    "Sort direction must be 'asc' or 'desc', got '{other}'"
                )))
            }
        };

        Ok(Self { field, direction })
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Default number of events per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum number of events per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Number of events returned by the engagement ranking.
pub const TOP_EVENT_LIMIT: i64 = 20;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn single(expr: &FilterExpr) -> &Condition {
        assert_eq!(expr.conditions.len(), 1, "{expr:?}");
        &expr.conditions[0]
    }

    // -- keys -----------------------------------------------------------------

    #[test]
    fn longest_suffix_wins() {
        assert_eq!(split_key("name_not_eq"), Some((EventField::Name, Predicate::NotEq)));
        assert_eq!(split_key("name_eq"), Some((EventField::Name, Predicate::Eq)));
        assert_eq!(split_key("id_not_in"), Some((EventField::Id, Predicate::NotIn)));
        assert_eq!(
            split_key("display_end_date_not_null"),
            Some((EventField::DisplayEndDate, Predicate::NotNull))
        );
        assert_eq!(
            split_key("map_start_date_lteq"),
            Some((EventField::MapStartDate, Predicate::Lteq))
        );
    }

    #[test]
    fn field_names_ending_in_predicate_words_still_split() {
        assert_eq!(
            split_key("calendar_start_date_start"),
            Some((EventField::CalendarStartDate, Predicate::Start))
        );
        assert!(FilterExpr::parse(&json!({ "calendar_start_date_start": "2024" })).is_err());
        assert_eq!(
            split_key("display_end_date_gt"),
            Some((EventField::DisplayEndDate, Predicate::Gt))
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = FilterExpr::parse(&json!({ "password_eq": "x" })).unwrap_err();
        assert_matches!(err, CoreError::InvalidQuery(msg) if msg.contains("password_eq"));
    }

    #[test]
    fn injection_attempt_in_key_is_rejected() {
        let err = FilterExpr::parse(&json!({ "name; DROP TABLE events_eq": "x" })).unwrap_err();
        assert_matches!(err, CoreError::InvalidQuery(_));
    }

    // -- values ---------------------------------------------------------------

    #[test]
    fn enum_values_accept_names_and_ids() {
        let expr = FilterExpr::parse(&json!({ "status_eq": "active" })).unwrap();
        assert_eq!(single(&expr).operand, Operand::Single(FilterValue::Int(1)));

        let expr = FilterExpr::parse(&json!({ "category_in": ["sport", 4] })).unwrap();
        assert_eq!(
            single(&expr).operand,
            Operand::List(vec![FilterValue::Int(2), FilterValue::Int(4)])
        );
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        assert!(FilterExpr::parse(&json!({ "progress_eq": "archived" })).is_err());
        assert!(FilterExpr::parse(&json!({ "progress_eq": 9 })).is_err());
    }

    #[test]
    fn integer_fields_accept_numeric_strings() {
        let expr = FilterExpr::parse(&json!({ "active_area_id_eq": "12" })).unwrap();
        assert_eq!(single(&expr).operand, Operand::Single(FilterValue::Int(12)));
        assert!(FilterExpr::parse(&json!({ "active_area_id_eq": "twelve" })).is_err());
    }

    #[test]
    fn timestamps_accept_rfc3339_and_dates() {
        let expr =
            FilterExpr::parse(&json!({ "created_at_gteq": "2024-01-10T00:00:00+09:00" })).unwrap();
        assert_eq!(
            single(&expr).operand,
            Operand::Single(FilterValue::Timestamp(
                chrono::Utc.with_ymd_and_hms(2024, 1, 9, 15, 0, 0).unwrap()
            ))
        );

        let expr = FilterExpr::parse(&json!({ "created_at_lt": "2024-02-01" })).unwrap();
        assert_eq!(
            single(&expr).operand,
            Operand::Single(FilterValue::Timestamp(
                chrono::Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let expr = FilterExpr::parse(&json!({
            "name_cont": "",
            "category_in": [],
            "town_eq": null,
            "point_gt": 3
        }))
        .unwrap();
        assert_eq!(single(&expr).field, EventField::Point);
    }

    #[test]
    fn null_predicates_take_flags() {
        let expr = FilterExpr::parse(&json!({ "display_end_date_null": true })).unwrap();
        assert_eq!(single(&expr).operand, Operand::Flag(true));

        let expr = FilterExpr::parse(&json!({ "lat_not_null": "1" })).unwrap();
        assert_eq!(single(&expr).operand, Operand::Flag(true));
    }

    #[test]
    fn text_predicates_only_on_text_fields() {
        assert!(FilterExpr::parse(&json!({ "name_cont": "park" })).is_ok());
        let err = FilterExpr::parse(&json!({ "point_cont": "1" })).unwrap_err();
        assert_matches!(err, CoreError::InvalidQuery(msg) if msg.contains("not supported"));
    }

    #[test]
    fn ordering_predicates_reject_enums_and_bools() {
        assert!(FilterExpr::parse(&json!({ "status_gt": "active" })).is_err());
        assert!(FilterExpr::parse(&json!({ "water_station_lt": true })).is_err());
    }

    #[test]
    fn association_field_supports_membership_only() {
        assert!(FilterExpr::parse(&json!({ "sdgs_id_in": [1, 2] })).is_ok());
        assert!(FilterExpr::parse(&json!({ "sdgs_id_eq": 3 })).is_ok());
        assert!(FilterExpr::parse(&json!({ "sdgs_id_null": true })).is_err());
        assert!(FilterExpr::parse(&json!({ "sdgs_id_gt": 3 })).is_err());
    }

    #[test]
    fn single_value_for_list_predicate_is_wrapped() {
        let expr = FilterExpr::parse(&json!({ "id_in": 5 })).unwrap();
        assert_eq!(
            single(&expr).operand,
            Operand::List(vec![FilterValue::Int(5)])
        );
    }

    #[test]
    fn list_for_scalar_predicate_is_rejected() {
        assert!(FilterExpr::parse(&json!({ "id_eq": [1, 2] })).is_err());
    }

    // -- structure ------------------------------------------------------------

    #[test]
    fn null_filter_is_empty() {
        let expr = FilterExpr::parse(&Value::Null).unwrap();
        assert!(expr.is_empty());
    }

    #[test]
    fn non_object_filter_is_rejected() {
        assert!(FilterExpr::parse(&json!("name = 'x'")).is_err());
        assert!(FilterExpr::parse(&json!([1, 2])).is_err());
    }

    #[test]
    fn combinator_and_groups_parse() {
        let expr = FilterExpr::parse(&json!({
            "m": "OR",
            "g": [
                { "name_cont": "park" },
                { "m": "and", "point_gt": 1, "town_eq": "Kita" }
            ]
        }))
        .unwrap();

        assert_eq!(expr.combinator, Combinator::Or);
        assert!(expr.conditions.is_empty());
        assert_eq!(expr.groups.len(), 2);
        assert_eq!(expr.groups[1].conditions.len(), 2);
        assert!(!expr.is_empty());
    }

    #[test]
    fn groups_accept_indexed_objects() {
        let expr = FilterExpr::parse(&json!({
            "g": { "0": { "name_eq": "a" }, "1": { "name_eq": "b" } }
        }))
        .unwrap();
        assert_eq!(expr.groups.len(), 2);
    }

    #[test]
    fn invalid_combinator_is_rejected() {
        assert!(FilterExpr::parse(&json!({ "m": "xor" })).is_err());
    }

    // -- sorting --------------------------------------------------------------

    #[test]
    fn sort_defaults_to_newest_first() {
        assert_eq!(SortSpec::parse(None, None).unwrap(), SortSpec::default());
        assert_eq!(
            SortSpec::parse(Some(""), Some("")).unwrap(),
            SortSpec {
                field: EventField::CreatedAt,
                direction: SortDirection::Desc,
            }
        );
    }

    #[test]
    fn sort_accepts_known_columns_case_insensitive_direction() {
        let spec = SortSpec::parse(Some("name"), Some("ASC")).unwrap();
        assert_eq!(spec.field, EventField::Name);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn sort_rejects_unknown_column_and_direction() {
        assert!(SortSpec::parse(Some("name desc; --"), None).is_err());
        assert!(SortSpec::parse(Some("sdgs_id"), None).is_err());
        assert!(SortSpec::parse(Some("name"), Some("sideways")).is_err());
    }

    // -- pagination -----------------------------------------------------------

    #[test]
    fn area_scope_wraps_caller_filter() {
        let caller = FilterExpr::parse(&json!({ "m": "or", "point_gt": 1, "town_eq": "x" })).unwrap();
        let scoped = caller.clone().scoped_to_area(Some(7));
        assert_eq!(scoped.combinator, Combinator::And);
        assert_eq!(
            scoped.conditions,
            vec![Condition {
                field: EventField::ActiveAreaId,
                predicate: Predicate::Eq,
                operand: Operand::Single(FilterValue::Int(7)),
            }]
        );
        assert_eq!(scoped.groups, vec![caller]);

        let unscoped = FilterExpr::default().scoped_to_area(None);
        assert_eq!(unscoped.conditions[0].predicate, Predicate::Null);
        assert!(unscoped.groups.is_empty());
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 20);
        assert_eq!(clamp_limit(Some(0), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 1);
        assert_eq!(clamp_limit(Some(500), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT), 100);
        assert_eq!(clamp_offset(Some(-4)), 0);
        assert_eq!(clamp_offset(None), 0);
    }
}
