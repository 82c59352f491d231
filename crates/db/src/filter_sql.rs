//! Render `civic_core` filter, sort, and window expressions into a
//! [`QueryBuilder`].
//!
//! Column names come only from [`EventField::column`]; every value is
//! pushed with `push_bind`.

use civic_core::filter::{
    Combinator, Condition, EventField, FilterExpr, FilterValue, Operand, Predicate, SortSpec,
};
use civic_core::time_window::{GeoPoint, WindowFilter, EARTH_RADIUS_KM};
use sqlx::{Postgres, QueryBuilder};

/// Append `expr` as a parenthesised boolean expression (`TRUE` when empty).
pub fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, expr: &FilterExpr) {
    if expr.is_empty() {
        qb.push("TRUE");
        return;
    }

    let joiner = match expr.combinator {
        Combinator::And => " AND ",
        Combinator::Or => " OR ",
    };

    qb.push("(");
    let mut first = true;
    for condition in &expr.conditions {
        if !first {
            qb.push(joiner);
        }
        first = false;
        push_condition(qb, condition);
    }
    for group in expr.groups.iter().filter(|g| !g.is_empty()) {
        if !first {
            qb.push(joiner);
        }
        first = false;
        push_filter(qb, group);
    }
    qb.push(")");
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => qb.push_bind(*v),
        FilterValue::Float(v) => qb.push_bind(*v),
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Bool(v) => qb.push_bind(*v),
        FilterValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_list(qb: &mut QueryBuilder<'_, Postgres>, values: &[FilterValue]) {
    qb.push("(");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, value);
    }
    qb.push(")");
}

/// Escape LIKE metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    let Some(column) = condition.field.column() else {
        push_association(qb, condition);
        return;
    };

    match (&condition.predicate, &condition.operand) {
        (Predicate::Null, Operand::Flag(true)) | (Predicate::NotNull, Operand::Flag(false)) => {
            qb.push(format!("events.{column} IS NULL"));
        }
        (Predicate::Null, Operand::Flag(false)) | (Predicate::NotNull, Operand::Flag(true)) => {
            qb.push(format!("events.{column} IS NOT NULL"));
        }
        (Predicate::In, Operand::List(values)) if values.is_empty() => {
            qb.push("FALSE");
        }
        (Predicate::NotIn, Operand::List(values)) if values.is_empty() => {
            qb.push("TRUE");
        }
        (Predicate::In, Operand::List(values)) => {
            qb.push(format!("events.{column} IN "));
            push_list(qb, values);
        }
        (Predicate::NotIn, Operand::List(values)) => {
            qb.push(format!("events.{column} NOT IN "));
            push_list(qb, values);
        }
        (Predicate::Cont | Predicate::Start | Predicate::End, Operand::Single(value)) => {
            let text = match value {
                FilterValue::Text(text) => escape_like(text),
                _ => String::new(),
            };
            let pattern = match condition.predicate {
                Predicate::Cont => format!("%{text}%"),
                Predicate::Start => format!("{text}%"),
                _ => format!("%{text}"),
            };
            qb.push(format!("events.{column} ILIKE "));
            qb.push_bind(pattern);
        }
        (predicate, Operand::Single(value)) => {
            let op = match predicate {
                Predicate::NotEq => "<>",
                Predicate::Lt => "<",
                Predicate::Lteq => "<=",
                Predicate::Gt => ">",
                Predicate::Gteq => ">=",
                _ => "=",
            };
            qb.push(format!("events.{column} {op} "));
            push_value(qb, value);
        }
        // The parser never pairs a predicate with a mismatched operand.
        _ => {
            qb.push("FALSE");
        }
    }
}

/// `sdgs_id` is matched through `event_sdgs`.
fn push_association(qb: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    debug_assert_eq!(condition.field, EventField::SdgsId);

    let negated = matches!(condition.predicate, Predicate::NotEq | Predicate::NotIn);
    if negated {
        qb.push("NOT ");
    }
    qb.push("EXISTS (SELECT 1 FROM event_sdgs WHERE event_sdgs.event_id = events.id AND ");
    match &condition.operand {
        Operand::Single(value) => {
            qb.push("event_sdgs.sdg_id = ");
            push_value(qb, value);
        }
        Operand::List(values) if !values.is_empty() => {
            qb.push("event_sdgs.sdg_id IN ");
            push_list(qb, values);
        }
        _ => {
            qb.push("FALSE");
        }
    }
    qb.push(")");
}

/// Append `ORDER BY <column> <dir>, events.id <dir>`.
pub fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &SortSpec) {
    // Association fields are not sortable; fall back to the default column.
    let column = sort.field.column().unwrap_or("created_at");
    let dir = sort.direction.as_sql();
    qb.push(format!(
        " ORDER BY events.{column} {dir}, events.id {dir}"
    ));
}

/// Append the visibility window predicate.
pub fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: &WindowFilter) {
    let start = window.start.column();
    qb.push(format!("(events.{start} IS NULL OR events.{start} <= "));
    qb.push_bind(window.start_cutoff);
    qb.push(") AND (events.display_end_date IS NULL OR events.display_end_date >= ");
    qb.push_bind(window.end_cutoff);
    qb.push(")");
}

/// Append the great-circle distance from `center` in kilometres.
pub fn push_distance(qb: &mut QueryBuilder<'_, Postgres>, center: GeoPoint) {
    qb.push(format!("(2 * {EARTH_RADIUS_KM} * ASIN(LEAST(1.0, SQRT("));
    qb.push("POWER(SIN(RADIANS(events.lat - ");
    qb.push_bind(center.lat);
    qb.push(") / 2), 2) + COS(RADIANS(");
    qb.push_bind(center.lat);
    qb.push(")) * COS(RADIANS(events.lat)) * POWER(SIN(RADIANS(events.lng - ");
    qb.push_bind(center.lng);
    qb.push(") / 2), 2)))))");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(filter: serde_json::Value) -> String {
        let expr = FilterExpr::parse(&filter).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_filter(&mut qb, &expr);
        qb.sql().to_string()
    }

    #[test]
    fn empty_filter_renders_true() {
        assert_eq!(render(json!({})), "TRUE");
        assert_eq!(render(json!({ "g": [{}] })), "TRUE");
    }

    #[test]
    fn values_are_bound_not_inlined() {
        let sql = render(json!({ "name_eq": "x'; DROP TABLE events; --" }));
        assert_eq!(sql, "(events.name = $1)");
    }

    #[test]
    fn combinator_and_groups_render() {
        let sql = render(json!({
            "m": "or",
            "status_eq": "active",
            "g": [{ "point_gt": 1, "town_cont": "ki" }]
        }));
        assert_eq!(
            sql,
            "(events.status = $1 OR (events.point > $2 AND events.town ILIKE $3))"
        );
    }

    #[test]
    fn list_and_null_predicates_render() {
        assert_eq!(
            render(json!({ "category_in": ["sport", "health"] })),
            "(events.category IN ($1, $2))"
        );
        assert_eq!(
            render(json!({ "display_end_date_null": true })),
            "(events.display_end_date IS NULL)"
        );
        assert_eq!(
            render(json!({ "display_end_date_null": false })),
            "(events.display_end_date IS NOT NULL)"
        );
    }

    #[test]
    fn sdg_filter_is_a_semi_join() {
        assert_eq!(
            render(json!({ "sdgs_id_in": [1, 2] })),
            "(EXISTS (SELECT 1 FROM event_sdgs WHERE event_sdgs.event_id = events.id \
             AND event_sdgs.sdg_id IN ($1, $2)))"
        );
        assert_eq!(
            render(json!({ "sdgs_id_not_eq": 3 })),
            "(NOT EXISTS (SELECT 1 FROM event_sdgs WHERE event_sdgs.event_id = events.id \
             AND event_sdgs.sdg_id = $1))"
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn order_breaks_ties_by_id() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM events");
        push_order(&mut qb, &SortSpec::parse(Some("name"), Some("asc")).unwrap());
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM events ORDER BY events.name ASC, events.id ASC"
        );
    }

    #[test]
    fn window_renders_both_sides() {
        let now = chrono::Utc::now();
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_window(&mut qb, &WindowFilter::displayable(now));
        assert_eq!(
            qb.sql(),
            "(events.map_start_date IS NULL OR events.map_start_date <= $1) AND \
             (events.display_end_date IS NULL OR events.display_end_date >= $2)"
        );
    }
}
