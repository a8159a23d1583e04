use crate::error::EngineError;
use crate::models::{Action, ActionMetadata, ActionType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Untyped ingest payload. Everything is optional so the boundary can
/// reject bad submissions instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAction {
    pub user_id: Option<String>,
    pub item_id: Option<i64>,
    pub action_type: Option<String>,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<ActionMetadata>,
}

fn parse_action_type(raw: &str) -> Option<ActionType> {
    match raw {
        "rate" => Some(ActionType::Rate),
        "watchTime" => Some(ActionType::WatchTime),
        "add_watchlist" => Some(ActionType::AddWatchlist),
        "view" => Some(ActionType::View),
        "click" => Some(ActionType::Click),
        _ => None,
    }
}

/// Validates a raw tracking submission into an immutable `Action`.
///
/// Rejects missing user/item/type/value, unknown action types, ratings
/// outside [0, 10] and negative watch times. Rejected actions never reach
/// the engine.
pub fn validate_action(raw: RawAction) -> Result<Action, EngineError> {
    let user_id = raw
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::InvalidAction("missing user_id".into()))?;
    let item_id = raw
        .item_id
        .ok_or_else(|| EngineError::InvalidAction("missing item_id".into()))?;
    let type_name = raw
        .action_type
        .ok_or_else(|| EngineError::InvalidAction("missing action_type".into()))?;
    let action_type = parse_action_type(&type_name)
        .ok_or_else(|| EngineError::InvalidAction(format!("unknown action type: {}", type_name)))?;
    let value = raw
        .value
        .ok_or_else(|| EngineError::InvalidAction("missing value".into()))?;

    match action_type {
        ActionType::Rate if !(0.0..=10.0).contains(&value) => {
            return Err(EngineError::InvalidAction(format!(
                "rating out of range: {}",
                value
            )));
        }
        ActionType::WatchTime if value < 0.0 => {
            return Err(EngineError::InvalidAction(format!(
                "negative watch time: {}",
                value
            )));
        }
        _ => {}
    }

    Ok(Action {
        id: Uuid::new_v4(),
        user_id,
        item_id,
        action_type,
        value,
        timestamp: raw.timestamp.unwrap_or_else(Utc::now),
        metadata: raw.metadata,
    })
}
