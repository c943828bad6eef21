pub mod config;
pub mod game;
pub mod persist;
pub mod rigging;
pub mod session;
mod storage;
pub mod utils;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use config::ShowConfig;
pub use game::{
    Category, CatalogError, Container, ContainerId, GameEvent, GamePhase, GameState,
    IntegrityError, NewPrize, Prize, PrizeId, RoundPlan, RoundPlanError, RuleEngine,
    CONTAINER_COUNT,
};
pub use persist::SnapshotError;
pub use rigging::{
    PacingRule, PacingTable, RandomSource, RiggingDirective, RiggingEngine, ScriptedSource,
};
pub use session::{GameSession, SubscriptionId};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging();
    log::info!("surprise game core loaded");
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// 每次调用后返回给前端的结果：完整快照加上本次事件。
#[derive(Serialize)]
struct Resolution<'a> {
    state: &'a GameState,
    events: Vec<GameEvent>,
    remaining_to_open: u8,
}

#[wasm_bindgen]
pub struct ShowEngine {
    session: GameSession,
}

impl ShowEngine {
    fn resolution_json(&self, events: Vec<GameEvent>) -> Result<String, JsValue> {
        let resolution = Resolution {
            state: self.session.state(),
            events,
            remaining_to_open: self.session.remaining_to_open(),
        };
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }
}

#[wasm_bindgen]
impl ShowEngine {
    /// 读取可选的配置 JSON，并从 localStorage 恢复上一次的状态。
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ShowEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => ShowConfig::default(),
        };
        let mut session = GameSession::new(config);
        if let Some(saved) = storage::load() {
            session.restore_json(&saved);
        }
        session.subscribe(|state, _| storage::save(state));
        Ok(ShowEngine { session })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        self.resolution_json(Vec::new())
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<String, JsValue> {
        let state = persist::decode_lenient(json).map_err(to_js_error)?;
        self.session.restore(state);
        storage::save(self.session.state());
        self.resolution_json(Vec::new())
    }

    pub fn sorted_prizes_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.state().sorted_prizes()).map_err(serde_to_js_error)
    }

    pub fn remaining_to_open(&self) -> u8 {
        self.session.remaining_to_open()
    }

    pub fn add_prize_json(&mut self, prize_json: &str) -> Result<String, JsValue> {
        let prize: NewPrize = serde_json::from_str(prize_json).map_err(serde_to_js_error)?;
        let events = self.session.add_prize(prize).map_err(to_js_error)?;
        self.resolution_json(events)
    }

    pub fn remove_prize(&mut self, prize_id: &str) -> Result<String, JsValue> {
        let events = self.session.remove_prize(prize_id).map_err(to_js_error)?;
        self.resolution_json(events)
    }

    pub fn set_directive(
        &mut self,
        target_prize_id: Option<String>,
        auto_win: bool,
    ) -> Result<String, JsValue> {
        let events = self.session.set_directive(target_prize_id, auto_win);
        self.resolution_json(events)
    }

    pub fn start_game(&mut self) -> Result<String, JsValue> {
        let events = self.session.start_game();
        self.resolution_json(events)
    }

    pub fn confirm_rules(&mut self) -> Result<String, JsValue> {
        let events = self.session.confirm_rules();
        self.resolution_json(events)
    }

    pub fn select_main_case(&mut self, container_id: u8) -> Result<String, JsValue> {
        let events = self.session.select_main_case(container_id);
        self.resolution_json(events)
    }

    pub fn open_case(&mut self, container_id: u8) -> Result<String, JsValue> {
        let events = self.session.open_case(container_id);
        self.resolution_json(events)
    }

    pub fn advance_game(&mut self) -> Result<String, JsValue> {
        let events = self.session.advance_game();
        self.resolution_json(events)
    }

    pub fn swap_case(&mut self) -> Result<String, JsValue> {
        let events = self.session.swap_case();
        self.resolution_json(events)
    }

    pub fn keep_case(&mut self) -> Result<String, JsValue> {
        let events = self.session.keep_case();
        self.resolution_json(events)
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let events = self.session.reset();
        storage::clear();
        self.resolution_json(events)
    }
}

/// 返回一份带示例目录的初始状态，方便前端调试或初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::sample()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check(&RoundPlan::default())
        .map_err(to_js_error)
}

#[wasm_bindgen(js_name = "validateRoundPlan")]
pub fn validate_round_plan(quotas: Vec<u8>) -> Result<(), JsValue> {
    RoundPlan::new(quotas).map(|_| ()).map_err(to_js_error)
}
