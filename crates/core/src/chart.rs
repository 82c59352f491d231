//! Time-bucketed counts for the area dashboard.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Timezone chart buckets are computed in unless configured otherwise.
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "Asia/Tokyo";

/// Bucket width of a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPeriod {
    #[default]
    Month,
    Year,
}

impl ChartPeriod {
    /// PostgreSQL `to_char` pattern producing the bucket label.
    pub fn pg_format(self) -> &'static str {
        match self {
            ChartPeriod::Month => "YYYY/MM",
            ChartPeriod::Year => "YYYY",
        }
    }
}

/// Chart arguments accepted by the summary operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChartArgs {
    #[serde(default)]
    pub period: ChartPeriod,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl ChartArgs {
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if to < from => Err(CoreError::InvalidQuery(
                "Chart range 'to' must not be before 'from'".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// One bucket of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub period_label: String,
    pub count: i64,
}

/// Ensure buckets are ascending by label and each label is unique.
///
/// Labels are zero-padded so lexical order is chronological order.
pub fn normalize_series(mut points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    points.sort_by(|a, b| a.period_label.cmp(&b.period_label));
    points.dedup_by(|next, prev| {
        if next.period_label == prev.period_label {
            prev.count += next.count;
            true
        } else {
            false
        }
    });
    points
}

/// Dashboard numbers for one active area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub total_count: i64,
    pub period: ChartPeriod,
    pub event_chart: Vec<ChartPoint>,
    pub checkin_chart: Vec<ChartPoint>,
    pub exchange_chart: Vec<ChartPoint>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn point(label: &str, count: i64) -> ChartPoint {
        ChartPoint {
            period_label: label.to_string(),
            count,
        }
    }

    #[test]
    fn pg_formats_per_period() {
        assert_eq!(ChartPeriod::Month.pg_format(), "YYYY/MM");
        assert_eq!(ChartPeriod::Year.pg_format(), "YYYY");
    }

    #[test]
    fn period_defaults_to_month() {
        let args: ChartArgs = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(args.period, ChartPeriod::Month);

        let args: ChartArgs = serde_json::from_value(serde_json::json!({ "period": "year" })).unwrap();
        assert_eq!(args.period, ChartPeriod::Year);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let args = ChartArgs {
            period: ChartPeriod::Month,
            from: Some(chrono::Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            to: Some(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        assert!(args.validate().is_err());
        assert!(ChartArgs::default().validate().is_ok());
    }

    #[test]
    fn series_is_sorted_ascending_and_merged() {
        let series = normalize_series(vec![
            point("2024/02", 3),
            point("2023/12", 1),
            point("2024/02", 2),
            point("2024/01", 5),
        ]);
        assert_eq!(
            series,
            vec![point("2023/12", 1), point("2024/01", 5), point("2024/02", 5)]
        );
    }
}
