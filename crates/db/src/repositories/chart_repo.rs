//! Time-bucketed counts for the area dashboard.

use civic_core::chart::{normalize_series, ChartArgs, ChartPoint};
use civic_core::types::DbId;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Rows a chart counts. Every source is scoped through its event's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSource {
    Events,
    Checkins,
    PointExchanges,
}

impl ChartSource {
    /// `(FROM clause, created_at column)`.
    fn tables(self) -> (&'static str, &'static str) {
        match self {
            ChartSource::Events => ("events", "events.created_at"),
            ChartSource::Checkins => (
                "event_checkins JOIN events ON events.id = event_checkins.event_id",
                "event_checkins.created_at",
            ),
            ChartSource::PointExchanges => (
                "event_point_exchanges JOIN events ON events.id = event_point_exchanges.event_id",
                "event_point_exchanges.created_at",
            ),
        }
    }
}

pub struct ChartRepo;

impl ChartRepo {
    /// Count `source` rows created per period, ascending by period label.
    ///
    /// Timestamps are converted to `timezone` before bucketing.
    pub async fn series(
        pool: &PgPool,
        source: ChartSource,
        active_area_id: DbId,
        args: &ChartArgs,
        timezone: &str,
    ) -> Result<Vec<ChartPoint>, sqlx::Error> {
        let (from, created) = source.tables();

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT to_char({created} AT TIME ZONE "));
        qb.push_bind(timezone.to_string());
        qb.push(", ");
        qb.push_bind(args.period.pg_format());
        qb.push(format!(
            ") AS period_label, COUNT(*) AS count FROM {from} WHERE events.active_area_id = "
        ));
        qb.push_bind(active_area_id);
        if let Some(start) = args.from {
            qb.push(format!(" AND {created} >= "));
            qb.push_bind(start);
        }
        if let Some(end) = args.to {
            qb.push(format!(" AND {created} <= "));
            qb.push_bind(end);
        }
        qb.push(" GROUP BY 1 ORDER BY 1");

        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(pool).await?;
        Ok(normalize_series(
            rows.into_iter()
                .map(|(period_label, count)| ChartPoint {
                    period_label,
                    count,
                })
                .collect(),
        ))
    }
}
