use serde::{Deserialize, Serialize};

use crate::game::RoundPlan;
use crate::rigging::PacingTable;

/// 节目配置：轮次安排与每轮节奏规则。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ShowConfig {
    pub round_plan: RoundPlan,
    pub pacing: PacingTable,
}

impl ShowConfig {
    pub fn with_round_plan(mut self, round_plan: RoundPlan) -> Self {
        self.round_plan = round_plan;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingTable) -> Self {
        self.pacing = pacing;
        self
    }
}
