use serde::{Deserialize, Serialize};

use super::rounds::CONTAINER_COUNT;
use super::state::{Category, GameEvent, GamePhase, GameState, Prize, PrizeId};

/// 目录上限，与箱子数量一致。
pub const MAX_PRIZES: usize = CONTAINER_COUNT;

/// 管理端提交的新奖品，id 由这里生成。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPrize {
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub value: f64,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[serde(tag = "type")]
pub enum CatalogError {
    #[error("catalog already holds {limit} prizes")]
    CatalogFull { limit: usize },
    #[error("prize name must not be empty")]
    EmptyName,
    #[error("prize value must be positive, got {value}")]
    InvalidValue { value: f64 },
    #[error("prize {prize_id} not found")]
    PrizeNotFound { prize_id: PrizeId },
    #[error("catalog is locked while the game is in {phase:?}")]
    GameInProgress { phase: GamePhase },
}

fn ensure_editable(state: &GameState) -> Result<(), CatalogError> {
    if !state.phase.is_idle() {
        return Err(CatalogError::GameInProgress { phase: state.phase });
    }
    Ok(())
}

pub fn add_prize(state: &mut GameState, prize: NewPrize) -> Result<Vec<GameEvent>, CatalogError> {
    ensure_editable(state)?;
    if state.prizes.len() >= MAX_PRIZES {
        return Err(CatalogError::CatalogFull { limit: MAX_PRIZES });
    }
    let name = prize.name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    if !(prize.value.is_finite() && prize.value > 0.0) {
        return Err(CatalogError::InvalidValue { value: prize.value });
    }

    let prize_id = uuid::Uuid::new_v4().to_string();
    state.prizes.push(
        Prize::new(prize_id.clone(), name, prize.value, prize.category)
            .with_image_url(prize.image_url),
    );
    Ok(vec![GameEvent::PrizeAdded { prize_id }])
}

pub fn remove_prize(state: &mut GameState, prize_id: &str) -> Result<Vec<GameEvent>, CatalogError> {
    ensure_editable(state)?;
    let index = state
        .prizes
        .iter()
        .position(|prize| prize.id == prize_id)
        .ok_or_else(|| CatalogError::PrizeNotFound {
            prize_id: prize_id.to_owned(),
        })?;
    let removed = state.prizes.remove(index);
    if state.target_prize_id.as_deref() == Some(removed.id.as_str()) {
        log::warn!("removed prize {} was the rigging target", removed.id);
    }
    Ok(vec![GameEvent::PrizeRemoved {
        prize_id: removed.id,
    }])
}
