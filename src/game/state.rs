use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::rounds::{RoundPlan, CONTAINER_COUNT};

/// 奖品标识（作者端生成，通常为 UUID）。
pub type PrizeId = String;
/// 箱子编号，1..=16。
pub type ContainerId = u8;

/// 奖品等级，声明顺序即排名顺序。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Novice,
    #[serde(alias = "Avancé")]
    Intermediate,
    #[serde(alias = "Élite")]
    Elite,
    Prestige,
    #[serde(alias = "Légendaire")]
    Legendary,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Novice,
        Category::Intermediate,
        Category::Elite,
        Category::Prestige,
        Category::Legendary,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Novice
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: PrizeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    pub value: f64,
    #[serde(default)]
    pub category: Category,
    #[serde(default, rename = "isRevealed", alias = "revealed")]
    pub revealed: bool,
}

impl Prize {
    pub fn new(
        id: impl Into<PrizeId>,
        name: impl Into<String>,
        value: f64,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: String::new(),
            value,
            category,
            revealed: false,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }
}

/// 场上的一个箱子。`prize` 绑定只允许由操控引擎改写。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub prize: Prize,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub is_held: bool,
    #[serde(default)]
    pub is_removed: bool,
}

impl Container {
    pub fn new(id: ContainerId, prize: Prize) -> Self {
        Self {
            id,
            prize,
            is_open: false,
            is_held: false,
            is_removed: false,
        }
    }

    /// 未开启、未被持有，仍留在场上。
    pub fn is_in_play(&self) -> bool {
        !self.is_open && !self.is_held
    }
}

/// 游戏生命周期。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Setup,
    Rules,
    PickOwn,
    Playing,
    SwapRound,
    Finished,
}

impl Default for GamePhase {
    fn default() -> Self {
        Self::Setup
    }
}

impl GamePhase {
    /// 奖品目录与操控指令只能在没有对局进行时修改。
    pub fn is_idle(self) -> bool {
        matches!(self, GamePhase::Setup | GamePhase::Finished)
    }
}

/// 对外公开的事件流。暗中换奖永远不会出现在这里。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PrizeAdded {
        prize_id: PrizeId,
    },
    PrizeRemoved {
        prize_id: PrizeId,
    },
    DirectiveChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        target_prize_id: Option<PrizeId>,
        auto_win: bool,
    },
    GameStarted {
        container_count: usize,
    },
    RulesConfirmed,
    MainCaseSelected {
        container_id: ContainerId,
    },
    CaseOpened {
        container_id: ContainerId,
        round_index: usize,
        prize_id: PrizeId,
        category: Category,
    },
    RoundAdvanced {
        round_index: usize,
    },
    SwapRoundReached,
    CaseSwapped {
        from: ContainerId,
        to: ContainerId,
    },
    GameFinished {
        container_id: ContainerId,
        prize_id: PrizeId,
        category: Category,
    },
    SessionReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("prize id {prize_id} appears more than once in the catalog")]
    DuplicatePrizeId { prize_id: PrizeId },
    #[error("catalog holds {len} prizes, limit is {limit}")]
    CatalogOverflow { len: usize, limit: usize },
    #[error("expected {expected} containers, found {actual}")]
    ContainerCountMismatch { expected: usize, actual: usize },
    #[error("container id {container_id} is duplicated or out of range")]
    InvalidContainerId { container_id: ContainerId },
    #[error("{count} containers are held at once")]
    MultipleHeld { count: usize },
    #[error("phase {phase:?} requires a held container")]
    MissingHeld { phase: GamePhase },
    #[error("phase {phase:?} does not allow a held container")]
    UnexpectedHeld { phase: GamePhase },
    #[error("held container {container_id} was opened before the final decision")]
    HeldContainerOpened { container_id: ContainerId },
    #[error("round index {index} is outside a plan of {rounds} rounds")]
    RoundOutOfRange { index: usize, rounds: usize },
    #[error("{opened} cases opened in a round with quota {quota}")]
    QuotaExceeded { opened: u8, quota: u8 },
    #[error("expected {expected} opened containers, found {actual}")]
    OpenCountMismatch { expected: usize, actual: usize },
}

/// 整场节目的状态，也是持久化的那份扁平对象。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub prizes: Vec<Prize>,
    #[serde(default, alias = "briefcases")]
    pub containers: Vec<Container>,
    #[serde(default, rename = "gameState")]
    pub phase: GamePhase,
    #[serde(default)]
    pub current_round_index: usize,
    #[serde(default)]
    pub cases_opened_in_current_round: u8,
    #[serde(default)]
    pub is_auto_win: bool,
    #[serde(default)]
    pub target_prize_id: Option<PrizeId>,
}

impl GameState {
    pub fn new(prizes: Vec<Prize>) -> Self {
        Self {
            prizes,
            ..Self::default()
        }
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.iter().find(|container| container.id == id)
    }

    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.iter_mut().find(|container| container.id == id)
    }

    fn container_index(&self, id: ContainerId) -> Option<usize> {
        self.containers.iter().position(|container| container.id == id)
    }

    pub fn held_container(&self) -> Option<&Container> {
        self.containers.iter().find(|container| container.is_held)
    }

    /// 除持有箱外的所有箱子，按编号顺序。
    pub fn board_containers(&self) -> Vec<&Container> {
        self.containers
            .iter()
            .filter(|container| !container.is_held)
            .collect()
    }

    pub fn in_play_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().filter(|container| container.is_in_play())
    }

    pub fn find_prize_container(&self, prize_id: &str) -> Option<&Container> {
        self.containers
            .iter()
            .find(|container| container.prize.id == prize_id)
    }

    pub fn opened_count(&self) -> usize {
        self.containers
            .iter()
            .filter(|container| container.is_open)
            .count()
    }

    /// 奖品榜：按价值升序。
    pub fn sorted_prizes(&self) -> Vec<Prize> {
        let mut prizes = self.prizes.clone();
        prizes.sort_by(|a, b| a.value.total_cmp(&b.value));
        prizes
    }

    /// 交换两个未开启箱子的奖品绑定。
    pub fn swap_prizes(&mut self, first: ContainerId, second: ContainerId) -> bool {
        if first == second {
            return false;
        }
        let (Some(a), Some(b)) = (self.container_index(first), self.container_index(second))
        else {
            return false;
        };
        if self.containers[a].is_open || self.containers[b].is_open {
            return false;
        }

        let prize = self.containers[a].prize.clone();
        self.containers[a].prize = std::mem::replace(&mut self.containers[b].prize, prize);
        true
    }

    /// 开箱并同时把目录中对应奖品标记为已揭晓。
    pub fn open_container(&mut self, id: ContainerId) -> Option<Prize> {
        let container = self.container_mut(id)?;
        if container.is_open {
            return None;
        }
        container.is_open = true;
        container.prize.revealed = true;
        let prize = container.prize.clone();

        if let Some(entry) = self.prizes.iter_mut().find(|entry| entry.id == prize.id) {
            entry.revealed = true;
        }
        Some(prize)
    }

    pub fn integrity_check(&self, plan: &RoundPlan) -> Result<(), IntegrityError> {
        let mut seen_prizes = HashSet::new();
        for prize in &self.prizes {
            if !seen_prizes.insert(prize.id.as_str()) {
                return Err(IntegrityError::DuplicatePrizeId {
                    prize_id: prize.id.clone(),
                });
            }
        }
        if self.prizes.len() > CONTAINER_COUNT {
            return Err(IntegrityError::CatalogOverflow {
                len: self.prizes.len(),
                limit: CONTAINER_COUNT,
            });
        }

        if self.phase == GamePhase::Setup {
            return Ok(());
        }

        if self.containers.len() != CONTAINER_COUNT {
            return Err(IntegrityError::ContainerCountMismatch {
                expected: CONTAINER_COUNT,
                actual: self.containers.len(),
            });
        }

        let mut seen_ids = HashSet::new();
        for container in &self.containers {
            let in_range = (1..=CONTAINER_COUNT).contains(&(container.id as usize));
            if !in_range || !seen_ids.insert(container.id) {
                return Err(IntegrityError::InvalidContainerId {
                    container_id: container.id,
                });
            }
        }

        let held: Vec<&Container> = self.containers.iter().filter(|c| c.is_held).collect();
        if held.len() > 1 {
            return Err(IntegrityError::MultipleHeld { count: held.len() });
        }
        match self.phase {
            GamePhase::Rules | GamePhase::PickOwn if !held.is_empty() => {
                return Err(IntegrityError::UnexpectedHeld { phase: self.phase });
            }
            GamePhase::Playing | GamePhase::SwapRound | GamePhase::Finished
                if held.is_empty() =>
            {
                return Err(IntegrityError::MissingHeld { phase: self.phase });
            }
            _ => {}
        }
        if let Some(container) = held.first() {
            if container.is_open && self.phase != GamePhase::Finished {
                return Err(IntegrityError::HeldContainerOpened {
                    container_id: container.id,
                });
            }
        }

        if self.current_round_index >= plan.len() {
            return Err(IntegrityError::RoundOutOfRange {
                index: self.current_round_index,
                rounds: plan.len(),
            });
        }
        let quota = plan.quota(self.current_round_index).unwrap_or(0);
        if self.cases_opened_in_current_round > quota {
            return Err(IntegrityError::QuotaExceeded {
                opened: self.cases_opened_in_current_round,
                quota,
            });
        }

        let expected = match self.phase {
            GamePhase::Rules | GamePhase::PickOwn => Some(0),
            GamePhase::Playing => Some(
                plan.opened_before(self.current_round_index)
                    + self.cases_opened_in_current_round as usize,
            ),
            GamePhase::SwapRound => Some(plan.total_openings()),
            _ => None,
        };
        if let Some(expected) = expected {
            let actual = self.opened_count();
            if actual != expected {
                return Err(IntegrityError::OpenCountMismatch { expected, actual });
            }
        }

        Ok(())
    }

    /// 一份 16 件奖品的示例目录，方便前端调试或初始化。
    pub fn sample() -> Self {
        let entries: [(&str, f64, Category); CONTAINER_COUNT] = [
            ("Sticker Pack", 2.0, Category::Novice),
            ("Keychain", 5.0, Category::Novice),
            ("Coffee Mug", 8.0, Category::Novice),
            ("Tote Bag", 12.0, Category::Novice),
            ("Board Game", 35.0, Category::Intermediate),
            ("Bluetooth Speaker", 45.0, Category::Intermediate),
            ("Cookbook Set", 30.0, Category::Intermediate),
            ("Desk Lamp", 40.0, Category::Intermediate),
            ("Headphones", 150.0, Category::Elite),
            ("Smartwatch", 220.0, Category::Elite),
            ("Espresso Machine", 300.0, Category::Elite),
            ("Weekend Getaway", 600.0, Category::Prestige),
            ("Gaming Console", 500.0, Category::Prestige),
            ("Road Bike", 900.0, Category::Prestige),
            ("Laptop", 1200.0, Category::Prestige),
            ("Dream Vacation", 5000.0, Category::Legendary),
        ];

        let prizes = entries
            .iter()
            .enumerate()
            .map(|(index, (name, value, category))| {
                Prize::new(format!("prize-{:02}", index + 1), *name, *value, *category)
            })
            .collect();
        GameState::new(prizes)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            prizes: Vec::new(),
            containers: Vec::new(),
            phase: GamePhase::default(),
            current_round_index: 0,
            cases_opened_in_current_round: 0,
            is_auto_win: false,
            target_prize_id: None,
        }
    }
}
