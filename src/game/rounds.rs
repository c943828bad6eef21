use serde::{Deserialize, Serialize};

/// 场上箱子总数，也是开局所需的奖品数量。
pub const CONTAINER_COUNT: usize = 16;

/// 每轮需要开启的箱子数量。
///
/// 所有轮次之和加上持有箱与最后剩下的一箱，必须等于 [`CONTAINER_COUNT`]。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RoundPlan {
    quotas: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum RoundPlanError {
    #[error("round plan must contain at least one round")]
    Empty,
    #[error("round {round} has a zero quota")]
    ZeroQuota { round: usize },
    #[error("round plan opens {actual} containers, expected {expected}")]
    SumMismatch { expected: usize, actual: usize },
}

impl RoundPlan {
    pub fn new(quotas: Vec<u8>) -> Result<Self, RoundPlanError> {
        if quotas.is_empty() {
            return Err(RoundPlanError::Empty);
        }
        if let Some(round) = quotas.iter().position(|quota| *quota == 0) {
            return Err(RoundPlanError::ZeroQuota { round });
        }

        let expected = CONTAINER_COUNT - 2;
        let actual: usize = quotas.iter().map(|quota| *quota as usize).sum();
        if actual != expected {
            return Err(RoundPlanError::SumMismatch { expected, actual });
        }
        Ok(Self { quotas })
    }

    pub fn len(&self) -> usize {
        self.quotas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotas.is_empty()
    }

    pub fn quota(&self, round: usize) -> Option<u8> {
        self.quotas.get(round).copied()
    }

    pub fn is_last(&self, round: usize) -> bool {
        round + 1 >= self.quotas.len()
    }

    /// 在 `round` 之前的所有轮次共开启的箱子数。
    pub fn opened_before(&self, round: usize) -> usize {
        self.quotas
            .iter()
            .take(round)
            .map(|quota| *quota as usize)
            .sum()
    }

    pub fn total_openings(&self) -> usize {
        self.opened_before(self.quotas.len())
    }

    pub fn quotas(&self) -> &[u8] {
        &self.quotas
    }
}

impl Default for RoundPlan {
    fn default() -> Self {
        Self {
            quotas: vec![3, 3, 3, 3, 2],
        }
    }
}

impl TryFrom<Vec<u8>> for RoundPlan {
    type Error = RoundPlanError;

    fn try_from(quotas: Vec<u8>) -> Result<Self, Self::Error> {
        RoundPlan::new(quotas)
    }
}

impl From<RoundPlan> for Vec<u8> {
    fn from(plan: RoundPlan) -> Self {
        plan.quotas
    }
}
