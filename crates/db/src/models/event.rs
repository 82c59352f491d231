//! Event entity model.

use civic_core::event::{EventCategory, EventFields, EventProgress, EventStatus, EventWindow};
use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub name: Option<String>,
    pub content: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub post_code: Option<String>,
    pub access: Option<String>,
    pub application: Option<String>,
    pub manager: Option<String>,
    pub sponsor: Option<String>,
    pub note: Option<String>,
    pub period: Option<String>,
    pub period_note: Option<String>,
    pub url: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub line: Option<String>,
    pub inquiry_email: Option<String>,
    pub inquiry_phone_number: Option<String>,
    pub sdgs_content: Option<String>,
    pub pdf_info: Option<String>,
    pub event_tag: Option<i32>,
    pub water_station: bool,
    #[sqlx(try_from = "i16")]
    pub category: EventCategory,
    #[sqlx(try_from = "i16")]
    pub status: EventStatus,
    #[sqlx(try_from = "i16")]
    pub progress: EventProgress,
    pub calendar_start_date: Option<Timestamp>,
    pub map_start_date: Option<Timestamp>,
    pub display_end_date: Option<Timestamp>,
    pub qr_start_datetime: Option<Timestamp>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub point: i32,
    pub active_area_id: Option<DbId>,
    pub prefecture_id: Option<DbId>,
    pub city_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Event {
    /// The writable attributes of this row, for merging a change set onto.
    pub fn fields(&self) -> EventFields {
        EventFields {
            name: self.name.clone(),
            content: self.content.clone(),
            address: self.address.clone(),
            town: self.town.clone(),
            post_code: self.post_code.clone(),
            access: self.access.clone(),
            application: self.application.clone(),
            manager: self.manager.clone(),
            sponsor: self.sponsor.clone(),
            note: self.note.clone(),
            period: self.period.clone(),
            period_note: self.period_note.clone(),
            url: self.url.clone(),
            facebook: self.facebook.clone(),
            instagram: self.instagram.clone(),
            twitter: self.twitter.clone(),
            line: self.line.clone(),
            inquiry_email: self.inquiry_email.clone(),
            inquiry_phone_number: self.inquiry_phone_number.clone(),
            sdgs_content: self.sdgs_content.clone(),
            pdf_info: self.pdf_info.clone(),
            event_tag: self.event_tag,
            water_station: self.water_station,
            category: self.category,
            status: self.status,
            progress: self.progress,
            calendar_start_date: self.calendar_start_date,
            map_start_date: self.map_start_date,
            display_end_date: self.display_end_date,
            qr_start_datetime: self.qr_start_datetime,
            lat: self.lat,
            lng: self.lng,
            point: self.point,
            active_area_id: self.active_area_id,
            prefecture_id: self.prefecture_id,
            city_id: self.city_id,
            user_id: self.user_id,
        }
    }

    pub fn window(&self) -> EventWindow {
        EventWindow {
            map_start_date: self.map_start_date,
            display_end_date: self.display_end_date,
            qr_start_datetime: self.qr_start_datetime,
        }
    }
}

/// An event returned by a map query, with its distance from the search
/// centre when one was given.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MapEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub distance_km: Option<f64>,
}
