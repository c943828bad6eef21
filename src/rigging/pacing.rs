use serde::{Deserialize, Serialize};

use crate::game::Category;

/// 单轮的节奏规则：限制某个等级在本轮被揭晓的次数。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PacingRule {
    Unconstrained,
    /// 本轮完全不揭晓该等级。
    Withhold { category: Category },
    /// 本轮恰好揭晓一次该等级（有候选时）。
    ExactlyOne { category: Category },
}

impl Default for PacingRule {
    fn default() -> Self {
        PacingRule::Unconstrained
    }
}

/// 开箱前的换奖决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingAction {
    Keep,
    /// 把该等级换出去，候选为其他等级。
    SwapOut { category: Category },
    /// 把该等级换进来，候选为持有该等级的箱子。
    SwapIn { category: Category },
}

impl PacingRule {
    pub fn category(&self) -> Option<Category> {
        match self {
            PacingRule::Unconstrained => None,
            PacingRule::Withhold { category } | PacingRule::ExactlyOne { category } => {
                Some(*category)
            }
        }
    }

    pub fn decide(
        &self,
        about_to_open: Category,
        revealed_in_round: u32,
        last_opportunity: bool,
    ) -> PacingAction {
        match *self {
            PacingRule::Unconstrained => PacingAction::Keep,
            PacingRule::Withhold { category } if about_to_open == category => {
                PacingAction::SwapOut { category }
            }
            PacingRule::Withhold { .. } => PacingAction::Keep,
            PacingRule::ExactlyOne { category } => {
                if about_to_open == category {
                    if revealed_in_round >= 1 {
                        PacingAction::SwapOut { category }
                    } else {
                        PacingAction::Keep
                    }
                } else if revealed_in_round == 0 && last_opportunity {
                    PacingAction::SwapIn { category }
                } else {
                    PacingAction::Keep
                }
            }
        }
    }
}

/// 轮次下标到节奏规则的映射，未列出的轮次不受约束。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PacingTable {
    #[serde(default)]
    rounds: Vec<PacingRule>,
}

impl PacingTable {
    pub fn unconstrained() -> Self {
        Self { rounds: Vec::new() }
    }

    /// 第 0 轮不出 Prestige，第 1、2 轮各出一次 Prestige，之后不限。
    pub fn standard() -> Self {
        Self {
            rounds: vec![
                PacingRule::Withhold {
                    category: Category::Prestige,
                },
                PacingRule::ExactlyOne {
                    category: Category::Prestige,
                },
                PacingRule::ExactlyOne {
                    category: Category::Prestige,
                },
            ],
        }
    }

    pub fn rule_for(&self, round: usize) -> PacingRule {
        self.rounds.get(round).copied().unwrap_or_default()
    }

    pub fn with_rule(mut self, round: usize, rule: PacingRule) -> Self {
        if self.rounds.len() <= round {
            self.rounds.resize(round + 1, PacingRule::Unconstrained);
        }
        self.rounds[round] = rule;
        self
    }
}

impl Default for PacingTable {
    fn default() -> Self {
        PacingTable::standard()
    }
}

/// 本轮各等级已揭晓次数。每轮重置，不持久化。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundTally {
    counts: [u32; Category::ALL.len()],
}

impl RoundTally {
    pub fn record(&mut self, category: Category) {
        self.counts[category.rank() as usize] += 1;
    }

    pub fn count(&self, category: Category) -> u32 {
        self.counts[category.rank() as usize]
    }

    pub fn clear(&mut self) {
        self.counts = [0; Category::ALL.len()];
    }
}
