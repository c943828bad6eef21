//! 游戏核心逻辑模块（数据模型、奖品目录、轮次与状态机）。

pub mod catalog;
pub mod rounds;
pub mod rules;
pub mod state;

pub use catalog::{add_prize, remove_prize, CatalogError, NewPrize, MAX_PRIZES};
pub use rounds::{RoundPlan, RoundPlanError, CONTAINER_COUNT};
pub use rules::RuleEngine;
pub use state::{
    Category,
    Container,
    ContainerId,
    GameEvent,
    GamePhase,
    GameState,
    IntegrityError,
    Prize,
    PrizeId,
};
