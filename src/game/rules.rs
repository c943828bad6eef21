use super::{
    rounds::{RoundPlan, CONTAINER_COUNT},
    state::{Container, ContainerId, GameEvent, GamePhase, GameState, Prize},
};
use crate::rigging::{PacingTable, RandomSource, RiggingEngine};

/// 状态机与轮次调度。
///
/// 所有操作在前置条件不满足时都是静默的空操作，返回空事件列表；
/// 界面本就会禁用非法操作，这里不把误用当成错误。
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    plan: RoundPlan,
    rigging: RiggingEngine,
}

impl RuleEngine {
    pub fn new(plan: RoundPlan, pacing: PacingTable) -> Self {
        Self {
            plan,
            rigging: RiggingEngine::new(pacing),
        }
    }

    pub fn plan(&self) -> &RoundPlan {
        &self.plan
    }

    /// 丢弃本轮的揭晓计数（读档或重置后调用）。
    pub fn reset_round(&mut self) {
        self.rigging.reset_round();
    }

    /// 本轮还需开启的箱子数。
    pub fn remaining_to_open(&self, state: &GameState) -> u8 {
        if state.phase != GamePhase::Playing {
            return 0;
        }
        self.plan
            .quota(state.current_round_index)
            .unwrap_or(0)
            .saturating_sub(state.cases_opened_in_current_round)
    }

    pub fn start_game<R: RandomSource>(
        &mut self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Vec<GameEvent> {
        if !state.phase.is_idle() {
            return Vec::new();
        }
        if state.prizes.len() != CONTAINER_COUNT {
            log::debug!(
                "start ignored: catalog holds {} prizes, need {CONTAINER_COUNT}",
                state.prizes.len()
            );
            return Vec::new();
        }

        for prize in &mut state.prizes {
            prize.revealed = false;
        }
        let mut shuffled: Vec<Prize> = state.prizes.clone();
        rng.shuffle(&mut shuffled);
        state.containers = shuffled
            .into_iter()
            .enumerate()
            .map(|(index, prize)| Container::new(index as ContainerId + 1, prize))
            .collect();

        state.phase = GamePhase::Rules;
        state.current_round_index = 0;
        state.cases_opened_in_current_round = 0;
        self.rigging.reset_round();

        if let Some(target) = state.target_prize_id.as_deref() {
            if state.find_prize_container(target).is_none() {
                log::warn!("target prize {target} is not in the catalog");
            }
        }
        log::info!("game started with {CONTAINER_COUNT} containers");

        vec![GameEvent::GameStarted {
            container_count: CONTAINER_COUNT,
        }]
    }

    pub fn confirm_rules(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        if state.phase != GamePhase::Rules {
            return Vec::new();
        }
        state.phase = GamePhase::PickOwn;
        vec![GameEvent::RulesConfirmed]
    }

    pub fn select_main_case<R: RandomSource>(
        &mut self,
        state: &mut GameState,
        container_id: ContainerId,
        rng: &mut R,
    ) -> Vec<GameEvent> {
        if state.phase != GamePhase::PickOwn {
            return Vec::new();
        }
        let selectable = state
            .container(container_id)
            .map(|container| !container.is_open && !container.is_removed)
            .unwrap_or(false);
        if !selectable {
            return Vec::new();
        }

        self.rigging.on_select(state, container_id, rng);

        if let Some(container) = state.container_mut(container_id) {
            container.is_held = true;
        }
        state.phase = GamePhase::Playing;
        log::info!("container {container_id} held, elimination begins");

        vec![GameEvent::MainCaseSelected { container_id }]
    }

    pub fn open_case<R: RandomSource>(
        &mut self,
        state: &mut GameState,
        container_id: ContainerId,
        rng: &mut R,
    ) -> Vec<GameEvent> {
        if state.phase != GamePhase::Playing {
            return Vec::new();
        }
        let openable = state
            .container(container_id)
            .map(Container::is_in_play)
            .unwrap_or(false);
        if !openable || self.remaining_to_open(state) == 0 {
            return Vec::new();
        }

        self.rigging.before_open(state, container_id, &self.plan, rng);

        let Some(prize) = state.open_container(container_id) else {
            return Vec::new();
        };
        state.cases_opened_in_current_round += 1;
        self.rigging.record_reveal(prize.category);

        vec![GameEvent::CaseOpened {
            container_id,
            round_index: state.current_round_index,
            prize_id: prize.id,
            category: prize.category,
        }]
    }

    /// 揭晓动画结束后由调用方触发；配额未满时为空操作。
    pub fn advance_game(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        if state.phase != GamePhase::Playing {
            return Vec::new();
        }
        let Some(quota) = self.plan.quota(state.current_round_index) else {
            return Vec::new();
        };
        if state.cases_opened_in_current_round < quota {
            return Vec::new();
        }

        self.rigging.reset_round();
        if !self.plan.is_last(state.current_round_index) {
            state.current_round_index += 1;
            state.cases_opened_in_current_round = 0;
            log::info!("round {} begins", state.current_round_index);
            vec![GameEvent::RoundAdvanced {
                round_index: state.current_round_index,
            }]
        } else {
            state.phase = GamePhase::SwapRound;
            log::info!("all rounds played, final decision");
            vec![GameEvent::SwapRoundReached]
        }
    }

    pub fn swap_case(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        if state.phase != GamePhase::SwapRound {
            return Vec::new();
        }
        let Some(previous) = state.held_container().map(|container| container.id) else {
            return Vec::new();
        };
        let remaining: Vec<ContainerId> = state
            .in_play_containers()
            .map(|container| container.id)
            .collect();
        let &[next] = remaining.as_slice() else {
            return Vec::new();
        };

        if let Some(container) = state.container_mut(previous) {
            container.is_held = false;
        }
        if let Some(container) = state.container_mut(next) {
            container.is_held = true;
        }
        self.rigging.on_final_swap(state, previous, next);

        let mut events = vec![GameEvent::CaseSwapped {
            from: previous,
            to: next,
        }];
        events.extend(Self::finish(state));
        events
    }

    pub fn keep_case(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        if state.phase != GamePhase::SwapRound {
            return Vec::new();
        }
        Self::finish(state)
    }

    fn finish(state: &mut GameState) -> Vec<GameEvent> {
        let Some(held) = state.held_container().map(|container| container.id) else {
            return Vec::new();
        };
        let Some(prize) = state.open_container(held) else {
            return Vec::new();
        };
        state.phase = GamePhase::Finished;
        log::info!("game finished");

        vec![GameEvent::GameFinished {
            container_id: held,
            prize_id: prize.id,
            category: prize.category,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Category;
    use crate::rigging::ScriptedSource;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const LEGENDARY_ID: &str = "prize-16";

    fn opened_category(events: &[GameEvent]) -> Option<Category> {
        events.iter().find_map(|event| match event {
            GameEvent::CaseOpened { category, .. } => Some(*category),
            _ => None,
        })
    }

    fn ready_to_pick(state: &mut GameState, engine: &mut RuleEngine, rng: &mut SmallRng) {
        assert!(!engine.start_game(state, rng).is_empty());
        assert!(!engine.confirm_rules(state).is_empty());
    }

    /// 按编号顺序开箱直到最终决定，返回每轮揭晓的等级。
    fn play_rounds(
        state: &mut GameState,
        engine: &mut RuleEngine,
        rng: &mut SmallRng,
    ) -> Vec<Vec<Category>> {
        let mut per_round = vec![Vec::new(); engine.plan().len()];
        while state.phase == GamePhase::Playing {
            if engine.remaining_to_open(state) == 0 {
                assert!(!engine.advance_game(state).is_empty());
                continue;
            }
            let next = state
                .in_play_containers()
                .map(|container| container.id)
                .next()
                .expect("a closed container should remain");
            let round = state.current_round_index;
            let events = engine.open_case(state, next, rng);
            let category = opened_category(&events).expect("open should emit CaseOpened");
            per_round[round].push(category);
        }
        per_round
    }

    #[test]
    fn start_requires_exactly_sixteen_prizes() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = GameState::sample();
        state.prizes.pop();

        assert!(engine.start_game(&mut state, &mut rng).is_empty());
        assert_eq!(state.phase, GamePhase::Setup);
        assert!(state.containers.is_empty());
    }

    #[test]
    fn start_deals_one_prize_per_container() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut state = GameState::sample();

        let events = engine.start_game(&mut state, &mut rng);
        assert_eq!(
            events,
            vec![GameEvent::GameStarted {
                container_count: CONTAINER_COUNT
            }]
        );
        assert_eq!(state.phase, GamePhase::Rules);
        assert_eq!(state.containers.len(), CONTAINER_COUNT);

        let mut prize_ids: Vec<&str> = state
            .containers
            .iter()
            .map(|container| container.prize.id.as_str())
            .collect();
        prize_ids.sort_unstable();
        prize_ids.dedup();
        assert_eq!(prize_ids.len(), CONTAINER_COUNT, "bindings are 1:1");
        assert!(state
            .containers
            .iter()
            .all(|container| !container.is_open && !container.is_held));
        let ids: Vec<ContainerId> = state.containers.iter().map(|c| c.id).collect();
        assert_eq!(ids, (1..=16).collect::<Vec<ContainerId>>());
    }

    #[test]
    fn operations_outside_their_phase_are_no_ops() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = GameState::sample();

        assert!(engine.confirm_rules(&mut state).is_empty());
        assert!(engine.select_main_case(&mut state, 1, &mut rng).is_empty());
        assert!(engine.open_case(&mut state, 1, &mut rng).is_empty());
        assert!(engine.advance_game(&mut state).is_empty());
        assert!(engine.swap_case(&mut state).is_empty());
        assert!(engine.keep_case(&mut state).is_empty());

        engine.start_game(&mut state, &mut rng);
        assert!(
            engine.select_main_case(&mut state, 1, &mut rng).is_empty(),
            "rules must be confirmed first"
        );
        assert!(
            engine.start_game(&mut state, &mut rng).is_empty(),
            "cannot restart mid-game"
        );
        assert_eq!(state.phase, GamePhase::Rules);
    }

    #[test]
    fn target_prize_lands_in_the_chosen_container() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut state = GameState::sample();
        state.target_prize_id = Some(LEGENDARY_ID.into());
        ready_to_pick(&mut state, &mut engine, &mut rng);

        let events = engine.select_main_case(&mut state, 7, &mut rng);
        assert_eq!(events, vec![GameEvent::MainCaseSelected { container_id: 7 }]);
        assert_eq!(state.phase, GamePhase::Playing);
        let held = state.held_container().expect("container should be held");
        assert_eq!(held.id, 7);
        assert_eq!(held.prize.id, LEGENDARY_ID);
        assert_eq!(held.prize.category, Category::Legendary);
    }

    #[test]
    fn target_prize_is_never_revealed_before_the_end() {
        for seed in 0..50 {
            let mut engine = RuleEngine::default();
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = GameState::sample();
            state.target_prize_id = Some("prize-11".into());
            ready_to_pick(&mut state, &mut engine, &mut rng);
            engine.select_main_case(&mut state, (seed % 16) as ContainerId + 1, &mut rng);

            play_rounds(&mut state, &mut engine, &mut rng);
            assert_eq!(state.phase, GamePhase::SwapRound);
            let target = state
                .prizes
                .iter()
                .find(|prize| prize.id == "prize-11")
                .expect("target in catalog");
            assert!(!target.revealed, "seed {seed}: target revealed early");
            assert_eq!(
                state.held_container().expect("held").prize.id,
                "prize-11"
            );
        }
    }

    #[test]
    fn auto_win_holds_the_top_rank() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut state = GameState::sample();
        state.is_auto_win = true;
        ready_to_pick(&mut state, &mut engine, &mut rng);

        engine.select_main_case(&mut state, 3, &mut rng);
        let held = state.held_container().expect("container should be held");
        assert_eq!(held.id, 3);
        assert_eq!(held.prize.category, Category::Legendary);
    }

    #[test]
    fn pacing_holds_across_many_games() {
        for seed in 0..200 {
            let mut engine = RuleEngine::default();
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = GameState::sample();
            match seed % 4 {
                0 => {}
                1 => state.is_auto_win = true,
                2 => state.target_prize_id = Some("prize-07".into()),
                _ => state.target_prize_id = Some("prize-13".into()),
            }
            ready_to_pick(&mut state, &mut engine, &mut rng);
            engine.select_main_case(&mut state, (seed % 16) as ContainerId + 1, &mut rng);

            let per_round = play_rounds(&mut state, &mut engine, &mut rng);
            let prestige = |round: usize| {
                per_round[round]
                    .iter()
                    .filter(|category| **category == Category::Prestige)
                    .count()
            };
            assert_eq!(prestige(0), 0, "seed {seed}: prestige in round 0");
            assert_eq!(prestige(1), 1, "seed {seed}: round 1");
            assert_eq!(prestige(2), 1, "seed {seed}: round 2");
            if state.is_auto_win {
                assert!(
                    per_round
                        .iter()
                        .flatten()
                        .all(|category| *category != Category::Legendary),
                    "seed {seed}: legendary eliminated"
                );
            }
        }
    }

    #[test]
    fn open_case_ignores_held_open_and_unknown_containers() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut state = GameState::sample();
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 1, &mut rng);

        assert!(engine.open_case(&mut state, 1, &mut rng).is_empty(), "held");
        assert!(engine.open_case(&mut state, 42, &mut rng).is_empty(), "unknown");
        assert!(!engine.open_case(&mut state, 2, &mut rng).is_empty());
        assert!(engine.open_case(&mut state, 2, &mut rng).is_empty(), "already open");
        assert_eq!(state.cases_opened_in_current_round, 1);
    }

    #[test]
    fn advance_waits_for_the_round_quota() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut state = GameState::sample();
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 16, &mut rng);

        for id in 1..=2 {
            engine.open_case(&mut state, id, &mut rng);
            let before = state.clone();
            assert!(engine.advance_game(&mut state).is_empty());
            assert!(engine.advance_game(&mut state).is_empty());
            assert_eq!(state, before, "advance before quota changes nothing");
        }

        let events = engine.open_case(&mut state, 3, &mut rng);
        assert_ne!(opened_category(&events), None);
        assert!(
            engine.open_case(&mut state, 4, &mut rng).is_empty(),
            "quota reached, must advance first"
        );
        assert_eq!(
            engine.advance_game(&mut state),
            vec![GameEvent::RoundAdvanced { round_index: 1 }]
        );
        assert_eq!(state.current_round_index, 1);
        assert_eq!(state.cases_opened_in_current_round, 0);
        assert_eq!(engine.remaining_to_open(&state), 3);
    }

    #[test]
    fn round_zero_openings_never_show_prestige() {
        let mut engine = RuleEngine::default();
        let mut rng = ScriptedSource::identity();
        let mut state = GameState::sample();
        state.target_prize_id = Some(LEGENDARY_ID.into());
        engine.start_game(&mut state, &mut rng);
        engine.confirm_rules(&mut state);
        engine.select_main_case(&mut state, 16, &mut rng);

        // 未洗牌：12..=15 号箱是 Prestige。
        for id in [12, 13, 14] {
            let events = engine.open_case(&mut state, id, &mut rng);
            assert_ne!(opened_category(&events), Some(Category::Prestige));
        }
        engine.advance_game(&mut state);
        assert_eq!(state.current_round_index, 1);
    }

    #[test]
    fn keep_opens_the_held_container() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(8);
        let mut state = GameState::sample();
        state.is_auto_win = true;
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 9, &mut rng);
        play_rounds(&mut state, &mut engine, &mut rng);

        assert_eq!(state.in_play_containers().count(), 1);
        let events = engine.keep_case(&mut state);
        assert!(matches!(
            events.as_slice(),
            [GameEvent::GameFinished {
                container_id: 9,
                category: Category::Legendary,
                ..
            }]
        ));
        assert_eq!(state.phase, GamePhase::Finished);
        assert!(state.container(9).expect("container 9").is_open);
        assert!(state.prizes.iter().any(|p| p.id == LEGENDARY_ID && p.revealed));
    }

    #[test]
    fn swap_under_auto_win_keeps_the_prize_with_the_participant() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = GameState::sample();
        state.is_auto_win = true;
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 5, &mut rng);
        play_rounds(&mut state, &mut engine, &mut rng);

        let before = state.held_container().expect("held").prize.id.clone();
        let remaining = state
            .in_play_containers()
            .map(|container| container.id)
            .next()
            .expect("one container remains");

        let events = engine.swap_case(&mut state);
        assert_eq!(
            events.first(),
            Some(&GameEvent::CaseSwapped {
                from: 5,
                to: remaining
            })
        );
        let held = state.held_container().expect("held");
        assert_eq!(held.id, remaining);
        assert_eq!(held.prize.id, before);
        assert!(held.is_open);
        assert_eq!(state.phase, GamePhase::Finished);
        assert!(!state.container(5).expect("container 5").is_held);
    }

    #[test]
    fn swap_without_directive_exchanges_contents() {
        let mut engine = RuleEngine::new(RoundPlan::default(), PacingTable::unconstrained());
        let mut rng = SmallRng::seed_from_u64(10);
        let mut state = GameState::sample();
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 1, &mut rng);
        let original = state.container(1).expect("container 1").prize.id.clone();
        play_rounds(&mut state, &mut engine, &mut rng);

        let remaining = state
            .in_play_containers()
            .next()
            .cloned()
            .expect("one container remains");
        engine.swap_case(&mut state);

        let held = state.held_container().expect("held");
        assert_eq!(held.id, remaining.id);
        assert_eq!(held.prize.id, remaining.prize.id);
        assert_eq!(
            state.container(1).expect("container 1").prize.id,
            original,
            "old container keeps its prize"
        );
    }

    #[test]
    fn finished_game_can_restart() {
        let mut engine = RuleEngine::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut state = GameState::sample();
        ready_to_pick(&mut state, &mut engine, &mut rng);
        engine.select_main_case(&mut state, 2, &mut rng);
        play_rounds(&mut state, &mut engine, &mut rng);
        engine.keep_case(&mut state);
        assert!(engine.swap_case(&mut state).is_empty());

        assert!(!engine.start_game(&mut state, &mut rng).is_empty());
        assert_eq!(state.phase, GamePhase::Rules);
        assert!(state.prizes.iter().all(|prize| !prize.revealed));
        assert_eq!(state.opened_count(), 0);
    }
}
