//! # Boxoffice Core
//!
//! Core traits and types for the boxoffice reducer architecture.
//!
//! The ticket server is built as a functional core driven by an imperative
//! shell: every datagram becomes an action, a reducer turns that action into
//! state changes plus effect descriptions, and the runtime executes the
//! effects (sending reply datagrams).
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by the store (catalog, reservations)
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (clock, randomness)
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_core::{effect::Effects, reducer::Reducer};
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         env: &CounterEnvironment,
//!     ) -> Effects {
//!         state.count += 1;
//!         Effects::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are deterministic: `(State, Action, Environment) → (State, Effects)`.
/// All I/O happens in the runtime, driven by the returned effects.
pub mod reducer {
    use super::effect::Effects;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned by reducers. The runtime executes them after
/// the reducer returns, so reducers stay free of I/O.
pub mod effect {
    use smallvec::SmallVec;
    use std::net::SocketAddr;

    /// Effect type - describes a side effect to be executed
    #[derive(Clone, PartialEq, Eq)]
    pub enum Effect {
        /// No-op effect
        None,

        /// Send one datagram back to a peer
        Reply {
            /// Destination address
            to: SocketAddr,
            /// Encoded datagram payload
            datagram: Vec<u8>,
        },
    }

    /// Effects returned by a single `reduce` call
    pub type Effects = SmallVec<[Effect; 4]>;

    // Payloads can be tens of kilobytes, print their length only
    impl std::fmt::Debug for Effect {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Reply { to, datagram } => f
                    .debug_struct("Effect::Reply")
                    .field("to", to)
                    .field("len", &datagram.len())
                    .finish(),
            }
        }
    }

    impl Effect {
        /// Build a reply effect
        #[must_use]
        pub const fn reply(to: SocketAddr, datagram: Vec<u8>) -> Self {
            Self::Reply { to, datagram }
        }

        /// The reply payload, if this is a reply effect
        #[must_use]
        pub fn as_reply(&self) -> Option<(SocketAddr, &[u8])> {
            match self {
                Self::Reply { to, datagram } => Some((*to, datagram.as_slice())),
                Self::None => None,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
