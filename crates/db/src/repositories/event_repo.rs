//! Repository for the `events` table.

use civic_core::event::{EventFields, EventProgress, EventStatus, EVENT_ENTITY_TYPE};
use civic_core::filter::{FilterExpr, SortSpec};
use civic_core::time_window::{MapSelection, WindowFilter};
use civic_core::types::DbId;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::filter_sql::{push_distance, push_filter, push_order, push_window};
use crate::models::aggregate::{EventPage, TopEvent};
use crate::models::event::{Event, MapEvent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, content, address, town, post_code, access, application, \
    manager, sponsor, note, period, period_note, url, facebook, instagram, twitter, line, \
    inquiry_email, inquiry_phone_number, sdgs_content, pdf_info, event_tag, water_station, \
    category, status, progress, calendar_start_date, map_start_date, display_end_date, \
    qr_start_datetime, lat, lng, point, active_area_id, prefecture_id, city_id, user_id, \
    created_at, updated_at";

/// Columns written on insert and update, in bind order.
const WRITABLE: [&str; 37] = [
    "name",
    "content",
    "address",
    "town",
    "post_code",
    "access",
    "application",
    "manager",
    "sponsor",
    "note",
    "period",
    "period_note",
    "url",
    "facebook",
    "instagram",
    "twitter",
    "line",
    "inquiry_email",
    "inquiry_phone_number",
    "sdgs_content",
    "pdf_info",
    "event_tag",
    "water_station",
    "category",
    "status",
    "progress",
    "calendar_start_date",
    "map_start_date",
    "display_end_date",
    "qr_start_datetime",
    "lat",
    "lng",
    "point",
    "active_area_id",
    "prefecture_id",
    "city_id",
    "user_id",
];

/// Polymorphic tables whose rows belong to an event: `(table, type column, id column)`.
const POLYMORPHIC_OWNED: [(&str, &str, &str); 3] = [
    ("activity_logs", "activitiable_type", "activitiable_id"),
    ("qr_codes", "qr_codeable_type", "qr_codeable_id"),
    ("sdg_experiences", "experienceable_type", "experienceable_id"),
];

fn insert_sql() -> String {
    let params: Vec<String> = (1..=WRITABLE.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO events ({}) VALUES ({}) RETURNING {COLUMNS}",
        WRITABLE.join(", "),
        params.join(", ")
    )
}

fn update_sql() -> String {
    let sets: Vec<String> = WRITABLE
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 2))
        .collect();
    format!(
        "UPDATE events SET {}, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}",
        sets.join(", ")
    )
}

/// Bind every [`WRITABLE`] column in order.
fn bind_fields<'q>(
    query: QueryAs<'q, Postgres, Event, PgArguments>,
    f: &'q EventFields,
) -> QueryAs<'q, Postgres, Event, PgArguments> {
    query
        .bind(&f.name)
        .bind(&f.content)
        .bind(&f.address)
        .bind(&f.town)
        .bind(&f.post_code)
        .bind(&f.access)
        .bind(&f.application)
        .bind(&f.manager)
        .bind(&f.sponsor)
        .bind(&f.note)
        .bind(&f.period)
        .bind(&f.period_note)
        .bind(&f.url)
        .bind(&f.facebook)
        .bind(&f.instagram)
        .bind(&f.twitter)
        .bind(&f.line)
        .bind(&f.inquiry_email)
        .bind(&f.inquiry_phone_number)
        .bind(&f.sdgs_content)
        .bind(&f.pdf_info)
        .bind(f.event_tag)
        .bind(f.water_station)
        .bind(f.category.id())
        .bind(f.status.id())
        .bind(f.progress.id())
        .bind(f.calendar_start_date)
        .bind(f.map_start_date)
        .bind(f.display_end_date)
        .bind(f.qr_start_datetime)
        .bind(f.lat)
        .bind(f.lng)
        .bind(f.point)
        .bind(f.active_area_id)
        .bind(f.prefecture_id)
        .bind(f.city_id)
        .bind(f.user_id)
}

/// Restrict to rows public clients may see.
fn push_client_visible(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push("events.status = ");
    qb.push_bind(EventStatus::Active.id());
    qb.push(" AND events.progress = ");
    qb.push_bind(EventProgress::Published.id());
}

/// Provides persistence and query operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event, returning the created row.
    pub async fn create(conn: &mut PgConnection, fields: &EventFields) -> Result<Event, sqlx::Error> {
        let query = insert_sql();
        bind_fields(sqlx::query_as::<_, Event>(&query), fields)
            .fetch_one(conn)
            .await
    }

    /// Overwrite every writable column. Returns `None` if no row with `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        fields: &EventFields,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = update_sql();
        bind_fields(sqlx::query_as::<_, Event>(&query).bind(id), fields)
            .fetch_optional(conn)
            .await
    }

    /// Find an event by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an event and lock its row until the surrounding transaction ends.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Delete an event and everything it owns. Returns `true` if the event existed.
    ///
    /// Polymorphic rows are removed explicitly; every other owned table
    /// cascades through its foreign key.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for (table, type_column, id_column) in POLYMORPHIC_OWNED {
            let query = format!("DELETE FROM {table} WHERE {type_column} = $1 AND {id_column} = $2");
            sqlx::query(&query)
                .bind(EVENT_ENTITY_TYPE)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Filter, sort, and paginate events.
    pub async fn search(
        pool: &PgPool,
        filter: &FilterExpr,
        sort: &SortSpec,
        limit: i64,
        offset: i64,
    ) -> Result<EventPage<Event>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE ");
        push_filter(&mut count, filter);
        let total_count = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM events WHERE "));
        push_filter(&mut qb, filter);
        push_order(&mut qb, sort);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        let items = qb.build_query_as::<Event>().fetch_all(pool).await?;

        Ok(EventPage { items, total_count })
    }

    /// Every event matching `filter`, sorted, without pagination.
    pub async fn list_all(
        pool: &PgPool,
        filter: &FilterExpr,
        sort: &SortSpec,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM events WHERE "));
        push_filter(&mut qb, filter);
        push_order(&mut qb, sort);
        qb.build_query_as::<Event>().fetch_all(pool).await
    }

    /// Client-visible events for a map request.
    ///
    /// Nearby selections are limited to the radius and ordered nearest
    /// first; the other modes are ordered newest first.
    pub async fn list_for_map(
        pool: &PgPool,
        selection: &MapSelection,
        filter: &FilterExpr,
    ) -> Result<Vec<MapEvent>, sqlx::Error> {
        fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, window: &WindowFilter, filter: &FilterExpr) {
            push_window(qb, window);
            qb.push(" AND ");
            push_client_visible(qb);
            qb.push(" AND ");
            push_filter(qb, filter);
        }

        let mut qb = QueryBuilder::<Postgres>::new("");
        match selection {
            MapSelection::Nearby {
                center,
                radius_km,
                window,
            } => {
                qb.push(format!("SELECT * FROM (SELECT {COLUMNS}, "));
                push_distance(&mut qb, *center);
                qb.push(
                    " AS distance_km FROM events \
                     WHERE events.lat IS NOT NULL AND events.lng IS NOT NULL AND ",
                );
                push_scope(&mut qb, window, filter);
                qb.push(") nearby WHERE distance_km <= ");
                qb.push_bind(*radius_km);
                qb.push(" ORDER BY distance_km ASC, id ASC");
            }
            MapSelection::Month(window) | MapSelection::Displayable(window) => {
                qb.push(format!(
                    "SELECT {COLUMNS}, NULL::DOUBLE PRECISION AS distance_km FROM events WHERE "
                ));
                push_scope(&mut qb, window, filter);
                qb.push(" ORDER BY events.created_at DESC, events.id DESC");
            }
        }
        qb.build_query_as::<MapEvent>().fetch_all(pool).await
    }

    /// Number of events in an active area.
    pub async fn count_in_area(pool: &PgPool, active_area_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE active_area_id = $1")
            .bind(active_area_id)
            .fetch_one(pool)
            .await
    }

    /// Events ranked by distinct check-ins, most first, ties by lowest id.
    pub async fn top_by_checkins(
        pool: &PgPool,
        filter: &FilterExpr,
        limit: i64,
    ) -> Result<Vec<TopEvent>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT events.id, events.name, events.town AS address, \
                    COUNT(DISTINCT event_checkins.id) AS check_in_count \
             FROM events \
             LEFT JOIN event_checkins ON event_checkins.event_id = events.id \
             WHERE ",
        );
        push_filter(&mut qb, filter);
        qb.push(" GROUP BY events.id ORDER BY check_in_count DESC, events.id ASC LIMIT ");
        qb.push_bind(limit);
        qb.build_query_as::<TopEvent>().fetch_all(pool).await
    }

    /// Add `amount` to an event's point total, returning the new total.
    pub async fn add_points(
        conn: &mut PgConnection,
        id: DbId,
        amount: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE events SET point = point + $2, updated_at = NOW() WHERE id = $1 RETURNING point",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(conn)
        .await
    }
}
