//! Nested-relation ownership check.
//!
//! Nested payloads may carry the id of an existing row to update or remove
//! it. Every such id must already belong to the event being written,
//! otherwise a client could edit another event's rows through this one.

use std::collections::HashSet;
use std::future::Future;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Owned relations that accept nested attribute payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventRelation {
    EventSdgs,
    EventImages,
    EventPointExchanges,
}

impl EventRelation {
    /// Relations in the order they are checked. The first failure wins.
    pub const CHECK_ORDER: [EventRelation; 3] = [
        EventRelation::EventSdgs,
        EventRelation::EventImages,
        EventRelation::EventPointExchanges,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventRelation::EventSdgs => "event_sdgs",
            EventRelation::EventImages => "event_images",
            EventRelation::EventPointExchanges => "event_point_exchanges",
        }
    }

    /// Table holding the relation's rows, keyed by `event_id`.
    pub fn table(self) -> &'static str {
        self.name()
    }

    fn invalid_message(self) -> &'static str {
        match self {
            EventRelation::EventSdgs => "Invalid SDG reference for this event",
            EventRelation::EventImages => "Invalid image reference for this event",
            EventRelation::EventPointExchanges => {
                "Invalid point exchange reference for this event"
            }
        }
    }

    pub fn invalid(self) -> CoreError {
        CoreError::InvalidRelation {
            relation: self.name(),
            message: self.invalid_message(),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Nested row for `event_sdgs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSdgAttributes {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<DbId>,
    pub sdg_id: Option<DbId>,
    #[serde(rename = "_destroy", default)]
    pub destroy: bool,
}

/// Nested row for `event_images`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventImageAttributes {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<DbId>,
    /// Storage key of the uploaded image.
    pub image: Option<String>,
    pub position: Option<i32>,
    #[serde(rename = "_destroy", default)]
    pub destroy: bool,
}

/// Nested row for `event_point_exchanges`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPointExchangeAttributes {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<DbId>,
    pub name: Option<String>,
    pub point: Option<i32>,
    #[serde(rename = "_destroy", default)]
    pub destroy: bool,
}

/// All nested payloads submitted with an event write.
///
/// `None` means the relation was not mentioned and is left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NestedAttributes {
    pub event_sdgs_attributes: Option<Vec<EventSdgAttributes>>,
    pub event_images_attributes: Option<Vec<EventImageAttributes>>,
    pub event_point_exchanges_attributes: Option<Vec<EventPointExchangeAttributes>>,
}

impl NestedAttributes {
    /// Row ids referenced for `relation`, or `None` when no payload was sent.
    pub fn referenced_ids(&self, relation: EventRelation) -> Option<Vec<DbId>> {
        match relation {
            EventRelation::EventSdgs => self
                .event_sdgs_attributes
                .as_ref()
                .map(|rows| rows.iter().filter_map(|r| r.id).collect()),
            EventRelation::EventImages => self
                .event_images_attributes
                .as_ref()
                .map(|rows| rows.iter().filter_map(|r| r.id).collect()),
            EventRelation::EventPointExchanges => self
                .event_point_exchanges_attributes
                .as_ref()
                .map(|rows| rows.iter().filter_map(|r| r.id).collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.event_sdgs_attributes.is_none()
            && self.event_images_attributes.is_none()
            && self.event_point_exchanges_attributes.is_none()
    }

    /// Rows that will be inserted must carry their required column.
    pub fn validate_new_rows(&self) -> Result<(), CoreError> {
        fn is_new(id: Option<DbId>, destroy: bool) -> bool {
            id.is_none() && !destroy
        }
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |s| s.trim().is_empty());

        for row in self.event_sdgs_attributes.iter().flatten() {
            if is_new(row.id, row.destroy) && row.sdg_id.is_none() {
                return Err(CoreError::Validation("event_sdgs sdg_id can't be blank".into()));
            }
        }
        for row in self.event_images_attributes.iter().flatten() {
            if is_new(row.id, row.destroy) && blank(&row.image) {
                return Err(CoreError::Validation("event_images image can't be blank".into()));
            }
        }
        for row in self.event_point_exchanges_attributes.iter().flatten() {
            if is_new(row.id, row.destroy) && blank(&row.name) {
                return Err(CoreError::Validation(
                    "event_point_exchanges name can't be blank".into(),
                ));
            }
            if row.point.is_some_and(|p| p < 0) {
                return Err(CoreError::Validation(
                    "event_point_exchanges point must be greater than or equal to 0".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Accept ids as JSON numbers or numeric strings; blank strings mean "no id".
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<DbId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(DbId),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid id '{text}'"))),
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Stateless ownership check over [`NestedAttributes`].
pub struct RelationValidator;

impl RelationValidator {
    /// First referenced id that is not in `owned`, if any.
    pub fn foreign_id(referenced: &[DbId], owned: &[DbId]) -> Option<DbId> {
        let owned: HashSet<DbId> = owned.iter().copied().collect();
        referenced.iter().copied().find(|id| !owned.contains(id))
    }

    /// Check every relation in [`EventRelation::CHECK_ORDER`].
    ///
    /// `owned_ids` loads the ids currently owned by the record for a
    /// relation; it is only called for relations whose payload references
    /// at least one existing row. Fails with the offending relation's
    /// [`CoreError::InvalidRelation`] on the first mismatch.
    pub async fn check<E, F, Fut>(payload: &NestedAttributes, mut owned_ids: F) -> Result<(), E>
    where
        E: From<CoreError>,
        F: FnMut(EventRelation) -> Fut,
        Fut: Future<Output = Result<Vec<DbId>, E>>,
    {
        for relation in EventRelation::CHECK_ORDER {
            let Some(referenced) = payload.referenced_ids(relation) else {
                continue;
            };
            if referenced.is_empty() {
                continue;
            }

            let owned = owned_ids(relation).await?;
            if Self::foreign_id(&referenced, &owned).is_some() {
                return Err(relation.invalid().into());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn owned(map: &[(EventRelation, Vec<DbId>)]) -> HashMap<EventRelation, Vec<DbId>> {
        map.iter().cloned().collect()
    }

    async fn run(
        payload: &NestedAttributes,
        owned: &HashMap<EventRelation, Vec<DbId>>,
    ) -> Result<(), CoreError> {
        RelationValidator::check(payload, |relation| {
            let ids = owned.get(&relation).cloned().unwrap_or_default();
            async move { Ok::<_, CoreError>(ids) }
        })
        .await
    }

    fn sdgs(ids: &[Option<DbId>]) -> Option<Vec<EventSdgAttributes>> {
        Some(
            ids.iter()
                .map(|id| EventSdgAttributes {
                    id: *id,
                    sdg_id: Some(1),
                    destroy: false,
                })
                .collect(),
        )
    }

    #[test]
    fn foreign_id_detects_missing_ids() {
        assert_eq!(RelationValidator::foreign_id(&[1, 2], &[1, 2, 3]), None);
        assert_eq!(RelationValidator::foreign_id(&[1, 9], &[1, 2, 3]), Some(9));
        assert_eq!(RelationValidator::foreign_id(&[], &[]), None);
        assert_eq!(RelationValidator::foreign_id(&[4], &[]), Some(4));
    }

    #[tokio::test]
    async fn empty_payload_never_fails() {
        let result = run(&NestedAttributes::default(), &HashMap::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn new_rows_without_ids_pass() {
        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[None, None]),
            ..Default::default()
        };
        assert!(run(&payload, &HashMap::new()).await.is_ok());
    }

    #[tokio::test]
    async fn owned_ids_pass() {
        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[Some(10), None, Some(11)]),
            ..Default::default()
        };
        let owned = owned(&[(EventRelation::EventSdgs, vec![10, 11, 12])]);
        assert!(run(&payload, &owned).await.is_ok());
    }

    #[tokio::test]
    async fn foreign_id_fails_with_relation_name() {
        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[Some(10), Some(99)]),
            ..Default::default()
        };
        let owned = owned(&[(EventRelation::EventSdgs, vec![10])]);
        let err = run(&payload, &owned).await.unwrap_err();
        assert_matches!(err, CoreError::InvalidRelation { relation: "event_sdgs", .. });
    }

    #[tokio::test]
    async fn first_invalid_relation_in_check_order_is_reported() {
        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[Some(5)]),
            event_images_attributes: Some(vec![EventImageAttributes {
                id: Some(6),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let err = run(&payload, &HashMap::new()).await.unwrap_err();
        assert_matches!(err, CoreError::InvalidRelation { relation: "event_sdgs", .. });

        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[Some(5)]),
            event_images_attributes: Some(vec![EventImageAttributes {
                id: Some(6),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let owned = owned(&[(EventRelation::EventSdgs, vec![5])]);
        let err = run(&payload, &owned).await.unwrap_err();
        assert_matches!(err, CoreError::InvalidRelation { relation: "event_images", .. });
    }

    #[tokio::test]
    async fn lookup_is_skipped_for_relations_without_ids() {
        let calls = RefCell::new(Vec::new());
        let payload = NestedAttributes {
            event_sdgs_attributes: sdgs(&[None]),
            event_point_exchanges_attributes: Some(vec![EventPointExchangeAttributes {
                id: Some(3),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let result: Result<(), CoreError> = RelationValidator::check(&payload, |relation| {
            calls.borrow_mut().push(relation);
            async move { Ok(vec![3]) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(*calls.borrow(), vec![EventRelation::EventPointExchanges]);
    }

    #[tokio::test]
    async fn lookup_errors_propagate() {
        let payload = NestedAttributes {
            event_images_attributes: Some(vec![EventImageAttributes {
                id: Some(1),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let result: Result<(), CoreError> = RelationValidator::check(&payload, |_| async {
            Err(CoreError::Internal("lookup failed".into()))
        })
        .await;
        assert_matches!(result, Err(CoreError::Internal(_)));
    }

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        let payload: NestedAttributes = serde_json::from_value(serde_json::json!({
            "event_sdgs_attributes": [
                { "id": 4, "sdg_id": 1 },
                { "id": "5", "sdg_id": 2, "_destroy": true },
                { "id": "", "sdg_id": 3 },
                { "sdg_id": 4 }
            ]
        }))
        .unwrap();

        assert_eq!(
            payload.referenced_ids(EventRelation::EventSdgs),
            Some(vec![4, 5])
        );
        let rows = payload.event_sdgs_attributes.unwrap();
        assert!(rows[1].destroy);
        assert!(!rows[0].destroy);
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let result: Result<NestedAttributes, _> = serde_json::from_value(serde_json::json!({
            "event_images_attributes": [{ "id": "abc" }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn new_rows_need_required_columns() {
        let payload = NestedAttributes {
            event_sdgs_attributes: Some(vec![EventSdgAttributes::default()]),
            ..Default::default()
        };
        assert_matches!(payload.validate_new_rows(), Err(CoreError::Validation(msg)) if msg.contains("sdg_id"));

        let payload = NestedAttributes {
            event_images_attributes: Some(vec![EventImageAttributes {
                image: Some(" ".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(payload.validate_new_rows().is_err());

        // Existing or destroyed rows may omit them.
        let payload = NestedAttributes {
            event_sdgs_attributes: Some(vec![EventSdgAttributes {
                id: Some(1),
                ..Default::default()
            }]),
            event_point_exchanges_attributes: Some(vec![EventPointExchangeAttributes {
                destroy: true,
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(payload.validate_new_rows().is_ok());
    }

    #[test]
    fn negative_exchange_point_is_invalid() {
        let payload = NestedAttributes {
            event_point_exchanges_attributes: Some(vec![EventPointExchangeAttributes {
                name: Some("Tote bag".into()),
                point: Some(-1),
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(payload.validate_new_rows().is_err());
    }

    #[test]
    fn absent_relation_has_no_referenced_ids() {
        let payload = NestedAttributes::default();
        assert!(payload.is_empty());
        assert_eq!(payload.referenced_ids(EventRelation::EventImages), None);
    }
}
