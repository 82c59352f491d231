//! Map/listing visibility windows.
//!
//! Every window is a pure function of one "now" and an event's nullable
//! window columns. Nothing here touches stored fields; the same filter
//! renders to SQL in the `db` crate and evaluates in memory via
//! [`WindowFilter::matches`].

use chrono::{Duration, TimeZone, Utc};

use crate::error::CoreError;
use crate::event::EventWindow;
use crate::types::Timestamp;

/// Radius of the "near me" map search.
pub const PROXIMITY_RADIUS_KM: f64 = 10.0;

/// Mean earth radius used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ---------------------------------------------------------------------------
// Window filter
// ---------------------------------------------------------------------------

/// Column compared against the start cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStart {
    /// `map_start_date`, used by the live map.
    MapStart,
    /// `qr_start_datetime`, used by the month calendar.
    QrStart,
}

impl WindowStart {
    pub fn column(self) -> &'static str {
        match self {
            WindowStart::MapStart => "map_start_date",
            WindowStart::QrStart => "qr_start_datetime",
        }
    }
}

/// `(start IS NULL OR start <= start_cutoff)
///  AND (display_end_date IS NULL OR display_end_date >= end_cutoff)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFilter {
    pub start: WindowStart,
    pub start_cutoff: Timestamp,
    pub end_cutoff: Timestamp,
}

impl WindowFilter {
    /// Events currently displayable on the map.
    pub fn displayable(now: Timestamp) -> Self {
        Self {
            start: WindowStart::MapStart,
            start_cutoff: now,
            end_cutoff: now,
        }
    }

    /// Events shown for a calendar month.
    ///
    /// For the month containing `now` the QR window is compared against
    /// `now`. For any other month the window must overlap the month, which
    /// compares the start side against the month's end and the end side
    /// against the month's start. Product has not confirmed the overlap
    /// rule; keep it as is.
    pub fn for_month(year: i32, month: u32, now: Timestamp) -> Result<Self, CoreError> {
        let (start_of_month, end_of_month) = month_bounds(year, month)?;

        if start_of_month <= now && now <= end_of_month {
            Ok(Self {
                start: WindowStart::QrStart,
                start_cutoff: now,
                end_cutoff: now,
            })
        } else {
            Ok(Self {
                start: WindowStart::QrStart,
                start_cutoff: end_of_month,
                end_cutoff: start_of_month,
            })
        }
    }

    pub fn matches(&self, window: &EventWindow) -> bool {
        let start = match self.start {
            WindowStart::MapStart => window.map_start_date,
            WindowStart::QrStart => window.qr_start_datetime,
        };
        let started = start.map_or(true, |s| s <= self.start_cutoff);
        let not_ended = window
            .display_end_date
            .map_or(true, |end| end >= self.end_cutoff);
        started && not_ended
    }
}

/// First and last instant (microsecond precision) of a UTC calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(Timestamp, Timestamp), CoreError> {
    let invalid = || CoreError::InvalidQuery(format!("Invalid month {year}-{month}"));

    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next_start = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(invalid)?;

    Ok((start, next_start - Duration::microseconds(1)))
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::InvalidQuery(format!(
                "Coordinates out of range: {lat}, {lng}"
            )));
        }
        Ok(Self { lat, lng })
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

// ---------------------------------------------------------------------------
// Map selection
// ---------------------------------------------------------------------------

/// Which visibility mode a map request resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapSelection {
    /// Displayable events within [`PROXIMITY_RADIUS_KM`] of `center`, nearest first.
    Nearby {
        center: GeoPoint,
        radius_km: f64,
        window: WindowFilter,
    },
    /// Events for a calendar month.
    Month(WindowFilter),
    /// Events currently displayable.
    Displayable(WindowFilter),
}

impl MapSelection {
    /// Coordinates win over year/month, which win over the plain map window.
    /// A half-specified pair (only `lat`, or only `month`) is ignored.
    pub fn resolve(
        lat: Option<f64>,
        lng: Option<f64>,
        year: Option<i32>,
        month: Option<u32>,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return Ok(MapSelection::Nearby {
                center: GeoPoint::new(lat, lng)?,
                radius_km: PROXIMITY_RADIUS_KM,
                window: WindowFilter::displayable(now),
            });
        }
        if let (Some(year), Some(month)) = (year, month) {
            return Ok(MapSelection::Month(WindowFilter::for_month(year, month, now)?));
        }
        Ok(MapSelection::Displayable(WindowFilter::displayable(now)))
    }

    pub fn window(&self) -> &WindowFilter {
        match self {
            MapSelection::Nearby { window, .. } => window,
            MapSelection::Month(window) | MapSelection::Displayable(window) => window,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Datelike;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn window(
        map_start: Option<Timestamp>,
        display_end: Option<Timestamp>,
        qr_start: Option<Timestamp>,
    ) -> EventWindow {
        EventWindow {
            map_start_date: map_start,
            display_end_date: display_end,
            qr_start_datetime: qr_start,
        }
    }

    // -- displayable ----------------------------------------------------------

    #[test]
    fn ended_event_is_hidden_after_display_end() {
        let event = window(None, Some(at(2024, 1, 10)), None);
        assert!(!WindowFilter::displayable(at(2024, 1, 15)).matches(&event));
        assert!(WindowFilter::displayable(at(2024, 1, 5)).matches(&event));
    }

    #[test]
    fn open_window_is_always_displayable() {
        let event = window(None, None, None);
        assert!(WindowFilter::displayable(at(1999, 1, 1)).matches(&event));
        assert!(WindowFilter::displayable(at(2099, 1, 1)).matches(&event));
    }

    #[test]
    fn boundaries_are_inclusive() {
        let now = at(2024, 3, 3);
        let event = window(Some(now), Some(now), None);
        assert!(WindowFilter::displayable(now).matches(&event));
    }

    #[test]
    fn future_map_start_hides_event() {
        let event = window(Some(at(2024, 6, 1)), None, None);
        assert!(!WindowFilter::displayable(at(2024, 5, 31)).matches(&event));
    }

    #[test]
    fn displayable_ignores_qr_start() {
        let event = window(None, None, Some(at(2030, 1, 1)));
        assert!(WindowFilter::displayable(at(2024, 1, 1)).matches(&event));
    }

    // -- month ----------------------------------------------------------------

    #[test]
    fn month_bounds_cover_whole_month() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() - Duration::microseconds(1)
        );
    }

    #[test]
    fn december_rolls_into_next_year() {
        let (_, end) = month_bounds(2023, 12).unwrap();
        assert_eq!(end.year(), 2023);
        assert_eq!(end.month(), 12);
        assert_eq!(end.day(), 31);
    }

    #[test]
    fn invalid_month_is_a_query_error() {
        assert_matches!(month_bounds(2024, 13), Err(CoreError::InvalidQuery(_)));
        assert_matches!(month_bounds(2024, 0), Err(CoreError::InvalidQuery(_)));
    }

    #[test]
    fn current_month_compares_against_now() {
        let now = at(2024, 5, 15);
        let filter = WindowFilter::for_month(2024, 5, now).unwrap();
        assert_eq!(
            filter,
            WindowFilter {
                start: WindowStart::QrStart,
                start_cutoff: now,
                end_cutoff: now,
            }
        );

        // QR opens later this month: hidden now even though it overlaps the month.
        let later = window(None, None, Some(at(2024, 5, 20)));
        assert!(!filter.matches(&later));

        // Display ended earlier this month: hidden.
        let ended = window(None, Some(at(2024, 5, 2)), None);
        assert!(!filter.matches(&ended));
    }

    #[test]
    fn other_month_compares_against_month_bounds() {
        let now = at(2024, 5, 15);
        let filter = WindowFilter::for_month(2024, 7, now).unwrap();
        let (start_of_july, end_of_july) = month_bounds(2024, 7).unwrap();

        assert_eq!(filter.start, WindowStart::QrStart);
        assert_eq!(filter.start_cutoff, end_of_july);
        assert_eq!(filter.end_cutoff, start_of_july);

        // QR opens mid-July: overlaps July.
        assert!(filter.matches(&window(None, None, Some(at(2024, 7, 20)))));
        // QR opens in August: no overlap.
        assert!(!filter.matches(&window(None, None, Some(at(2024, 8, 1)))));
        // Display ended in June: no overlap.
        assert!(!filter.matches(&window(None, Some(at(2024, 6, 30)), None)));
        // Display ends mid-July: overlaps.
        assert!(filter.matches(&window(None, Some(at(2024, 7, 3)), None)));
    }

    #[test]
    fn past_month_uses_bounds_not_now() {
        let now = at(2024, 5, 15);
        let filter = WindowFilter::for_month(2024, 1, now).unwrap();
        // Ended in January: still shown for January even though it ended before now.
        assert!(filter.matches(&window(None, Some(at(2024, 1, 20)), None)));
    }

    // -- geography ------------------------------------------------------------

    #[test]
    fn haversine_is_zero_for_same_point() {
        let p = GeoPoint::new(35.68, 139.76).unwrap();
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn haversine_tokyo_to_yokohama() {
        let tokyo = GeoPoint::new(35.6812, 139.7671).unwrap();
        let yokohama = GeoPoint::new(35.4437, 139.6380).unwrap();
        let d = haversine_km(tokyo, yokohama);
        assert!((d - 28.9).abs() < 1.0, "distance was {d}");
        assert!(d > PROXIMITY_RADIUS_KM);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert_matches!(GeoPoint::new(95.0, 0.0), Err(CoreError::InvalidQuery(_)));
        assert_matches!(GeoPoint::new(0.0, -181.0), Err(CoreError::InvalidQuery(_)));
    }

    // -- map selection --------------------------------------------------------

    #[test]
    fn coordinates_take_precedence_over_month() {
        let now = at(2024, 5, 15);
        let selection =
            MapSelection::resolve(Some(35.0), Some(139.0), Some(2024), Some(7), now).unwrap();
        assert_matches!(
            selection,
            MapSelection::Nearby { radius_km, .. } if radius_km == PROXIMITY_RADIUS_KM
        );
        assert_eq!(*selection.window(), WindowFilter::displayable(now));
    }

    #[test]
    fn month_used_when_no_coordinates() {
        let now = at(2024, 5, 15);
        let selection = MapSelection::resolve(None, None, Some(2024), Some(7), now).unwrap();
        assert_matches!(selection, MapSelection::Month(_));
    }

    #[test]
    fn half_specified_inputs_fall_back_to_displayable() {
        let now = at(2024, 5, 15);
        let selection = MapSelection::resolve(Some(35.0), None, None, Some(7), now).unwrap();
        assert_eq!(
            selection,
            MapSelection::Displayable(WindowFilter::displayable(now))
        );
    }
}
