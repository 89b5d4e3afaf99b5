//! # RSVP Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, runs the reducer and executes effects
//! - **Feedback loop**: Actions produced by effects are reduced in turn
//!
//! Unlike a fire-and-forget executor, [`Store::send`] resolves only after the
//! whole action → reducer → effects → action chain has finished. Callers that
//! need ordering between two operations simply await the first one.
//!
//! ## Example
//!
//! ```ignore
//! use rsvp_runtime::Store;
//!
//! let store = Store::new(BoardState::default(), BoardReducer, environment);
//!
//! // Send an action and wait for its effects
//! store.send(BoardAction::LoadPublic).await;
//!
//! // Read state
//! let count = store.state(|s| s.public.len()).await;
//! ```

use rsvp_core::{effect::Effect, reducer::Reducer};

/// Store module - The runtime for reducers
pub mod store {
    use super::{Effect, Reducer};
    use futures::future::join_all;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    type Step<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// The write lock is only held while the reducer runs, never across an
    /// effect, so reads stay available while backend calls are in flight.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
            }
        }

        /// Send an action to the store and run it to completion
        ///
        /// 1. Acquires the write lock and calls the reducer
        /// 2. Releases the lock and executes the returned effects
        /// 3. Reduces every action the effects produce, recursively
        ///
        /// Effects returned together from one reduction run concurrently.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) {
            self.dispatch(action).await;
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let attending = store.state(|s| s.attending.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        fn dispatch(&self, action: A) -> Step<'_> {
            Box::pin(async move {
                let effects = {
                    let mut state = self.state.write().await;
                    self.reducer.reduce(&mut state, action, &self.environment)
                };

                metrics::counter!("rsvp_store_actions_total").increment(1);

                join_all(effects.into_iter().map(|effect| self.run_effect(effect))).await;
            })
        }

        fn run_effect(&self, effect: Effect<A>) -> Step<'_> {
            Box::pin(async move {
                match effect {
                    Effect::None => {
                        tracing::trace!("Executing Effect::None (no-op)");
                    },
                    Effect::Parallel(effects) => {
                        tracing::trace!(count = effects.len(), "Executing Effect::Parallel");
                        join_all(effects.into_iter().map(|effect| self.run_effect(effect))).await;
                    },
                    Effect::Sequential(effects) => {
                        tracing::trace!(count = effects.len(), "Executing Effect::Sequential");
                        for effect in effects {
                            self.run_effect(effect).await;
                        }
                    },
                    Effect::Future(fut) => {
                        tracing::trace!("Executing Effect::Future");
                        if let Some(action) = fut.await {
                            self.dispatch(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    },
                }
            })
        }
    }
}

// Re-export for convenience
pub use store::Store;
