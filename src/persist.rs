//! 持久化：整份状态序列化为扁平 JSON，读档时逐字段容错。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::game::GameState;

/// 浏览器 localStorage 中使用的键。
pub const STORAGE_KEY: &str = "surpriseGameState";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {reason}")]
    Malformed { reason: String },
    #[error("snapshot must be a JSON object")]
    NotAnObject,
}

pub fn encode(state: &GameState) -> Result<String, SnapshotError> {
    serde_json::to_string(state).map_err(|err| SnapshotError::Malformed {
        reason: err.to_string(),
    })
}

/// 解析存档。整体无法解析时报错；单个字段损坏时回退到默认值。
pub fn decode_lenient(json: &str) -> Result<GameState, SnapshotError> {
    let value: Value = serde_json::from_str(json).map_err(|err| SnapshotError::Malformed {
        reason: err.to_string(),
    })?;
    let object = value.as_object().ok_or(SnapshotError::NotAnObject)?;
    Ok(from_fields(object))
}

pub fn from_fields(object: &Map<String, Value>) -> GameState {
    GameState {
        prizes: field(object, &["prizes"]),
        containers: field(object, &["containers", "briefcases"]),
        phase: field(object, &["gameState"]),
        current_round_index: field(object, &["currentRoundIndex"]),
        cases_opened_in_current_round: field(object, &["casesOpenedInCurrentRound"]),
        is_auto_win: field(object, &["isAutoWin"]),
        target_prize_id: field(object, &["targetPrizeId"]),
    }
}

fn field<T>(object: &Map<String, Value>, keys: &[&str]) -> T
where
    T: DeserializeOwned + Default,
{
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| object.get(*key).map(|value| (*key, value)))
    else {
        return T::default();
    };
    match T::deserialize(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("snapshot field `{key}` unreadable, using default: {err}");
            T::default()
        }
    }
}
