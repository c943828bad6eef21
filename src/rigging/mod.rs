//! 操控引擎：在选箱、开箱与最终交换时暗中调整奖品绑定。

pub mod pacing;
pub mod random;

use serde::{Deserialize, Serialize};

use crate::game::{Category, ContainerId, GameState, PrizeId, RoundPlan};

pub use pacing::{PacingAction, PacingRule, PacingTable, RoundTally};
pub use random::{RandomSource, ScriptedSource};

/// 运营方指定的结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RiggingDirective {
    None,
    Target { prize_id: PrizeId },
    AutoWin,
}

impl RiggingDirective {
    /// 同时设置时，指定奖品优先于自动获胜。
    pub fn from_config(target_prize_id: Option<&str>, auto_win: bool) -> Self {
        match target_prize_id {
            Some(prize_id) if !prize_id.is_empty() => RiggingDirective::Target {
                prize_id: prize_id.to_owned(),
            },
            _ if auto_win => RiggingDirective::AutoWin,
            _ => RiggingDirective::None,
        }
    }

    pub fn from_state(state: &GameState) -> Self {
        Self::from_config(state.target_prize_id.as_deref(), state.is_auto_win)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, RiggingDirective::None)
    }

    /// 受保护的奖品。自动获胜模式下即持有箱里的奖品。
    pub fn protected_prize_id(&self, state: &GameState) -> Option<PrizeId> {
        match self {
            RiggingDirective::None => None,
            RiggingDirective::Target { prize_id } => Some(prize_id.clone()),
            RiggingDirective::AutoWin => state
                .held_container()
                .map(|container| container.prize.id.clone()),
        }
    }
}

impl Default for RiggingDirective {
    fn default() -> Self {
        RiggingDirective::None
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiggingEngine {
    pacing: PacingTable,
    tally: RoundTally,
}

impl RiggingEngine {
    pub fn new(pacing: PacingTable) -> Self {
        Self {
            pacing,
            tally: RoundTally::default(),
        }
    }

    pub fn record_reveal(&mut self, category: Category) {
        self.tally.record(category);
    }

    pub fn reset_round(&mut self) {
        self.tally.clear();
    }

    /// 选箱时把受保护的奖品换进被选中的箱子。
    pub fn on_select<R: RandomSource>(
        &self,
        state: &mut GameState,
        chosen: ContainerId,
        rng: &mut R,
    ) {
        let source = match RiggingDirective::from_state(state) {
            RiggingDirective::None => return,
            RiggingDirective::Target { prize_id } => {
                match state.find_prize_container(&prize_id) {
                    Some(container) => container.id,
                    None => {
                        log::warn!("target prize {prize_id} is not in the pool; ignoring");
                        return;
                    }
                }
            }
            RiggingDirective::AutoWin => {
                let Some(top) = state
                    .containers
                    .iter()
                    .filter(|container| !container.is_open)
                    .map(|container| container.prize.category)
                    .max()
                else {
                    return;
                };
                let tied: Vec<ContainerId> = state
                    .containers
                    .iter()
                    .filter(|container| !container.is_open && container.prize.category == top)
                    .map(|container| container.id)
                    .collect();
                match rng.choose(&tied) {
                    Some(id) => *id,
                    None => return,
                }
            }
        };

        if source != chosen && state.swap_prizes(source, chosen) {
            log::debug!("selection swap: container {source} -> {chosen}");
        }
    }

    /// 开箱前按本轮节奏规则决定是否换奖。
    pub fn before_open<R: RandomSource>(
        &self,
        state: &mut GameState,
        opening: ContainerId,
        plan: &RoundPlan,
        rng: &mut R,
    ) {
        let round = state.current_round_index;
        let rule = self.pacing.rule_for(round);
        let Some(tracked) = rule.category() else {
            return;
        };
        let protected = RiggingDirective::from_state(state).protected_prize_id(state);
        let Some(container) = state.container(opening) else {
            return;
        };
        // Legendary 可以被换出正在打开的箱子，但受保护奖品不行。
        if protected.as_deref() == Some(container.prize.id.as_str()) {
            return;
        }

        let quota = plan.quota(round).unwrap_or(0) as usize;
        let last_opportunity = state.cases_opened_in_current_round as usize + 1 >= quota;
        let action = rule.decide(
            container.prize.category,
            self.tally.count(tracked),
            last_opportunity,
        );

        match action {
            PacingAction::Keep => {}
            PacingAction::SwapOut { category } => self.swap_with_candidate(
                state,
                opening,
                protected.as_deref(),
                |candidate| candidate != category,
                rng,
            ),
            PacingAction::SwapIn { category } => self.swap_with_candidate(
                state,
                opening,
                protected.as_deref(),
                |candidate| candidate == category,
                rng,
            ),
        }
    }

    /// 最终交换时，若有指令则奖品跟随持有标记一起移动。
    pub fn on_final_swap(&self, state: &mut GameState, previous: ContainerId, next: ContainerId) {
        if RiggingDirective::from_state(state).is_active() && state.swap_prizes(previous, next) {
            log::debug!("final swap keeps protected prize with the held container");
        }
    }

    fn swap_with_candidate<R, F>(
        &self,
        state: &mut GameState,
        opening: ContainerId,
        protected: Option<&str>,
        accept: F,
        rng: &mut R,
    ) where
        R: RandomSource,
        F: Fn(Category) -> bool,
    {
        let candidates: Vec<ContainerId> = state
            .in_play_containers()
            .filter(|container| container.id != opening)
            .filter(|container| {
                is_displaceable(container.prize.category, &container.prize.id, protected)
            })
            .filter(|container| accept(container.prize.category))
            .map(|container| container.id)
            .collect();

        match rng.choose(&candidates) {
            Some(&candidate) => {
                state.swap_prizes(opening, candidate);
                log::debug!(
                    "pacing swap in round {}: container {opening} <-> {candidate}",
                    state.current_round_index
                );
            }
            None => log::debug!("pacing swap skipped: no eligible candidate"),
        }
    }
}

/// Legendary 与受保护奖品永远不参与节奏换奖。
fn is_displaceable(category: Category, prize_id: &str, protected: Option<&str>) -> bool {
    category != Category::Legendary && protected != Some(prize_id)
}
