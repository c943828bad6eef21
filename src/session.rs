//! 单场节目会话：持有状态、规则引擎、随机源与观察者。

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::ShowConfig;
use crate::game::{
    self, CatalogError, ContainerId, GameEvent, GamePhase, GameState, NewPrize, RuleEngine,
};
use crate::persist;
use crate::rigging::{RandomSource, RiggingDirective};

pub type Observer = Box<dyn FnMut(&GameState, &[GameEvent])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct GameSession<R: RandomSource = SmallRng> {
    state: GameState,
    engine: RuleEngine,
    config: ShowConfig,
    rng: R,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl GameSession<SmallRng> {
    pub fn new(config: ShowConfig) -> Self {
        Self::with_source(config, SmallRng::from_entropy())
    }

    pub fn with_seed(config: ShowConfig, seed: u64) -> Self {
        Self::with_source(config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> GameSession<R> {
    pub fn with_source(config: ShowConfig, rng: R) -> Self {
        let engine = RuleEngine::new(config.round_plan.clone(), config.pacing.clone());
        Self {
            state: GameState::default(),
            engine,
            config,
            rng,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    pub fn directive(&self) -> RiggingDirective {
        RiggingDirective::from_state(&self.state)
    }

    pub fn remaining_to_open(&self) -> u8 {
        self.engine.remaining_to_open(&self.state)
    }

    /// 每次产生事件的变更之后同步通知。
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&GameState, &[GameEvent]) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn commit(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        if !events.is_empty() {
            for (_, observer) in &mut self.observers {
                observer(&self.state, &events);
            }
        }
        events
    }

    pub fn set_directive(
        &mut self,
        target_prize_id: Option<String>,
        auto_win: bool,
    ) -> Vec<GameEvent> {
        if !self.state.phase.is_idle() {
            return Vec::new();
        }
        let target_prize_id = target_prize_id.filter(|id| !id.is_empty());
        self.state.target_prize_id = target_prize_id.clone();
        self.state.is_auto_win = auto_win;
        self.commit(vec![GameEvent::DirectiveChanged {
            target_prize_id,
            auto_win,
        }])
    }

    pub fn add_prize(&mut self, prize: NewPrize) -> Result<Vec<GameEvent>, CatalogError> {
        let events = game::add_prize(&mut self.state, prize)?;
        Ok(self.commit(events))
    }

    pub fn remove_prize(&mut self, prize_id: &str) -> Result<Vec<GameEvent>, CatalogError> {
        let events = game::remove_prize(&mut self.state, prize_id)?;
        Ok(self.commit(events))
    }

    pub fn start_game(&mut self) -> Vec<GameEvent> {
        let events = self.engine.start_game(&mut self.state, &mut self.rng);
        self.commit(events)
    }

    pub fn confirm_rules(&mut self) -> Vec<GameEvent> {
        let events = self.engine.confirm_rules(&mut self.state);
        self.commit(events)
    }

    pub fn select_main_case(&mut self, container_id: ContainerId) -> Vec<GameEvent> {
        let events = self
            .engine
            .select_main_case(&mut self.state, container_id, &mut self.rng);
        self.commit(events)
    }

    pub fn open_case(&mut self, container_id: ContainerId) -> Vec<GameEvent> {
        let events = self
            .engine
            .open_case(&mut self.state, container_id, &mut self.rng);
        self.commit(events)
    }

    pub fn advance_game(&mut self) -> Vec<GameEvent> {
        let events = self.engine.advance_game(&mut self.state);
        self.commit(events)
    }

    pub fn swap_case(&mut self) -> Vec<GameEvent> {
        let events = self.engine.swap_case(&mut self.state);
        self.commit(events)
    }

    pub fn keep_case(&mut self) -> Vec<GameEvent> {
        let events = self.engine.keep_case(&mut self.state);
        self.commit(events)
    }

    /// 整体替换为默认状态，包括奖品目录与操控指令。
    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.state = GameState::default();
        self.engine.reset_round();
        log::info!("session reset");
        self.commit(vec![GameEvent::SessionReset])
    }

    /// 读档。状态不一致时丢弃对局进度，保留目录与指令。
    pub fn restore(&mut self, mut state: GameState) {
        if let Err(error) = state.integrity_check(self.engine.plan()) {
            log::warn!("restored state rejected ({error}); falling back to setup");
            state.containers.clear();
            state.phase = GamePhase::Setup;
            state.current_round_index = 0;
            state.cases_opened_in_current_round = 0;
            state.prizes.truncate(game::MAX_PRIZES);
        }
        self.state = state;
        self.engine.reset_round();
    }

    /// 读取存档 JSON；无法解析时保持当前状态。
    pub fn restore_json(&mut self, json: &str) {
        match persist::decode_lenient(json) {
            Ok(state) => self.restore(state),
            Err(error) => log::warn!("saved state ignored: {error}"),
        }
    }

    pub fn snapshot_json(&self) -> Result<String, persist::SnapshotError> {
        persist::encode(&self.state)
    }
}

impl<R: RandomSource> std::fmt::Debug for GameSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish()
    }
}
