//! Response shapes for events, with the fields derived on read.

use std::collections::HashMap;

use civic_core::assets::AssetUrlResolver;
use civic_core::types::DbId;
use civic_db::models::event::{Event, MapEvent};
use civic_db::models::relation::{EventImage, EventPointExchange, EventSdg};
use civic_db::models::tag::ActiveAreaTag;
use civic_db::repositories::{EventRelationRepo, TagRepo};
use serde::Serialize;

use crate::state::AppState;

/// An event plus its resolved asset URL and tag.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub pdf_info_url: Option<String>,
    pub tag: Option<ActiveAreaTag>,
}

/// A single event with its nested relations, as returned by lookups and saves.
#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: EventResponse,
    pub event_sdgs: Vec<EventSdg>,
    pub event_images: Vec<EventImage>,
    pub event_point_exchanges: Vec<EventPointExchange>,
}

/// A map result: the event plus its distance from the search centre.
#[derive(Debug, Serialize)]
pub struct MapEventResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub distance_km: Option<f64>,
}

fn decorate(assets: &dyn AssetUrlResolver, event: Event, tag: Option<ActiveAreaTag>) -> EventResponse {
    let pdf_info_url = event.pdf_info.as_deref().and_then(|key| assets.resolve(key));
    EventResponse {
        event,
        pdf_info_url,
        tag,
    }
}

pub async fn present_event(state: &AppState, event: Event) -> Result<EventResponse, sqlx::Error> {
    let tag = match event.event_tag {
        Some(tag_id) => TagRepo::find_by_id(&state.pool, DbId::from(tag_id)).await?,
        None => None,
    };
    Ok(decorate(state.assets.as_ref(), event, tag))
}

/// Decorate a list, loading every referenced tag in one query.
pub async fn present_events(
    state: &AppState,
    events: Vec<Event>,
) -> Result<Vec<EventResponse>, sqlx::Error> {
    let mut tag_ids: Vec<DbId> = events
        .iter()
        .filter_map(|e| e.event_tag.map(DbId::from))
        .collect();
    tag_ids.sort_unstable();
    tag_ids.dedup();

    let tags: HashMap<DbId, ActiveAreaTag> = TagRepo::find_by_ids(&state.pool, &tag_ids)
        .await?
        .into_iter()
        .map(|tag| (tag.id, tag))
        .collect();

    Ok(events
        .into_iter()
        .map(|event| {
            let tag = event
                .event_tag
                .and_then(|id| tags.get(&DbId::from(id)).cloned());
            decorate(state.assets.as_ref(), event, tag)
        })
        .collect())
}

pub async fn present_map_events(
    state: &AppState,
    rows: Vec<MapEvent>,
) -> Result<Vec<MapEventResponse>, sqlx::Error> {
    let distances: Vec<Option<f64>> = rows.iter().map(|row| row.distance_km).collect();
    let events = present_events(state, rows.into_iter().map(|row| row.event).collect()).await?;
    Ok(events
        .into_iter()
        .zip(distances)
        .map(|(event, distance_km)| MapEventResponse { event, distance_km })
        .collect())
}

pub async fn present_detail(state: &AppState, event: Event) -> Result<EventDetail, sqlx::Error> {
    let pool = &state.pool;
    let id = event.id;
    let (event_sdgs, event_images, event_point_exchanges) = tokio::try_join!(
        EventRelationRepo::list_sdgs(pool, id),
        EventRelationRepo::list_images(pool, id),
        EventRelationRepo::list_point_exchanges(pool, id),
    )?;

    Ok(EventDetail {
        event: present_event(state, event).await?,
        event_sdgs,
        event_images,
        event_point_exchanges,
    })
}
