//! Given-When-Then harness for the synchronous half of a reducer.
//!
//! Effects are collected for inspection and never executed. Use
//! `rsvp_runtime::Store` when a test needs effects to actually run.

#![allow(clippy::module_name_repetitions)]

use rsvp_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Replays actions through a reducer and checks what came out.
///
/// Every action passed to [`when`](Self::when) is reduced in order against
/// the same state. Effect checks see only the effects of the *last* action,
/// so earlier actions act as setup (for example, loading a cache before a
/// result arrives).
///
/// # Example
///
/// ```ignore
/// let state = ReducerTest::new(BoardReducer, services)
///     .given(BoardState::default())
///     .when(BoardAction::PublicLoaded { events: vec![event] })
///     .then_state(|state| assert_eq!(state.public.len(), 1))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    environment: R::Environment,
    state: R::State,
    actions: Vec<R::Action>,
    state_checks: Vec<StateCheck<R::State>>,
    effect_checks: Vec<EffectCheck<R::Action>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
    R::State: Default,
{
    /// Starts from `R::State::default()`.
    #[must_use]
    pub fn new(reducer: R, environment: R::Environment) -> Self {
        Self {
            reducer,
            environment,
            state: R::State::default(),
            actions: Vec::new(),
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }
}

impl<R: Reducer> ReducerTest<R> {
    /// Replaces the starting state.
    #[must_use]
    pub fn given(mut self, state: R::State) -> Self {
        self.state = state;
        self
    }

    /// Queues an action; may be called repeatedly.
    #[must_use]
    pub fn when(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Checks the state after every queued action has been reduced.
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Checks the effects returned by the last action.
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Reduces the queued actions, runs the checks and hands back the
    /// final state for further assertions.
    ///
    /// # Panics
    ///
    /// Panics if no action was queued, or if a check fails.
    #[allow(clippy::panic)]
    pub fn run(self) -> R::State {
        let Self {
            reducer,
            environment,
            mut state,
            actions,
            state_checks,
            effect_checks,
        } = self;

        assert!(!actions.is_empty(), "queue at least one action with when()");

        let mut effects = Vec::new();
        for action in actions {
            effects = reducer.reduce(&mut state, action, &environment).into_vec();
        }

        for check in state_checks {
            check(&state);
        }
        for check in effect_checks {
            check(&effects);
        }

        state
    }
}

/// Effect checks for use with [`ReducerTest::then_effects`].
pub mod assertions {
    use rsvp_core::effect::Effect;

    /// Nothing to run: either empty or a lone `Effect::None`.
    ///
    /// # Panics
    ///
    /// Panics otherwise.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "expected no effects, got {effects:?}"
        );
    }

    /// Exactly `expected` effects, all of them `Effect::Future`.
    ///
    /// # Panics
    ///
    /// Panics if the count differs or any effect is not a future.
    #[allow(clippy::panic)]
    pub fn assert_only_futures<A: std::fmt::Debug>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "unexpected effect count: {effects:?}");
        assert!(
            effects.iter().all(|effect| matches!(effect, Effect::Future(_))),
            "expected only future effects, got {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_core::{SmallVec, smallvec};

    #[derive(Clone, Debug, Default)]
    struct Seat {
        taken: bool,
        refreshes: u32,
    }

    #[derive(Clone, Debug)]
    enum SeatAction {
        Flip,
        Refresh,
    }

    struct SeatReducer;

    impl Reducer for SeatReducer {
        type State = Seat;
        type Action = SeatAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Seat,
            action: SeatAction,
            _env: &(),
        ) -> SmallVec<[Effect<SeatAction>; 4]> {
            match action {
                SeatAction::Flip => {
                    state.taken = !state.taken;
                    smallvec![Effect::None]
                },
                SeatAction::Refresh => {
                    state.refreshes += 1;
                    smallvec![Effect::future(async { None })]
                },
            }
        }
    }

    #[test]
    fn actions_are_reduced_in_order() {
        let seat = ReducerTest::new(SeatReducer, ())
            .when(SeatAction::Flip)
            .when(SeatAction::Flip)
            .when(SeatAction::Flip)
            .then_state(|seat| assert!(seat.taken))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(seat.refreshes, 0);
    }

    #[test]
    fn effects_come_from_the_last_action() {
        ReducerTest::new(SeatReducer, ())
            .given(Seat { taken: true, refreshes: 2 })
            .when(SeatAction::Flip)
            .when(SeatAction::Refresh)
            .then_state(|seat| {
                assert!(!seat.taken);
                assert_eq!(seat.refreshes, 3);
            })
            .then_effects(|effects| assertions::assert_only_futures(effects, 1))
            .run();
    }

    #[test]
    #[should_panic(expected = "at least one action")]
    fn running_without_actions_panics() {
        ReducerTest::new(SeatReducer, ()).run();
    }
}
