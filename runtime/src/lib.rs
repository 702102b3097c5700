//! # Boxoffice Runtime
//!
//! Runtime implementation for the boxoffice architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, plus the datagram transport the ticket server runs on.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, runs the reducer and executes effects
//! - **Transport**: Receive-one / send-one datagram abstraction ([`transport`])
//! - **Serve loop**: Strictly sequential receive → reduce → reply
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_runtime::{Store, transport::UdpTransport};
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//! let transport = UdpTransport::bind("0.0.0.0:2022".parse()?).await?;
//!
//! store
//!     .serve(&transport, |datagram| Action::Received(datagram), shutdown_signal())
//!     .await?;
//! ```

use boxoffice_core::{
    effect::{Effect, Effects},
    reducer::Reducer,
};
use std::future::Future;
use std::time::Instant;
use tokio::sync::Mutex;
use transport::{Datagram, RECV_BUFFER_SIZE, Transport, TransportError};

/// Prometheus metrics for observability
pub mod metrics;

/// Datagram transport abstraction and UDP implementation
pub mod transport;

/// Error types for the Store runtime
pub mod error {
    use super::TransportError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Every variant is fatal for the serve loop: the server never retries.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The transport failed while receiving or replying
        #[error(transparent)]
        Transport(#[from] TransportError),
    }
}

pub use error::StoreError;

/// The Store - runtime for a reducer
///
/// Holds the state behind an async mutex so that reduce calls are serialized
/// even if the store is shared. The serve loop processes one datagram at a
/// time: it is fully reduced and answered before the next one is received.
pub struct Store<R>
where
    R: Reducer,
{
    state: Mutex<R::State>,
    reducer: R,
    environment: R::Environment,
}

impl<R> Store<R>
where
    R: Reducer,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self {
            state: Mutex::new(initial_state),
            reducer,
            environment,
        }
    }

    /// Send an action through the reducer and return the effects it produced
    ///
    /// Effects are returned, not executed; see [`Store::execute`].
    pub async fn send(&self, action: R::Action) -> Effects {
        let mut state = self.state.lock().await;
        let started = Instant::now();
        let effects = self.reducer.reduce(&mut state, action, &self.environment);
        metrics::record_reduce_duration(started.elapsed());
        effects
    }

    /// Read a value out of the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Execute effects against a transport
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if a reply cannot be sent in full.
    pub async fn execute<T>(&self, effects: Effects, transport: &T) -> Result<(), StoreError>
    where
        T: Transport + ?Sized,
    {
        for effect in effects {
            match effect {
                Effect::None => {}
                Effect::Reply { to, datagram } => {
                    let sent = transport
                        .send_to(&datagram, to)
                        .await
                        .map_err(|source| TransportError::Send { to, source })?;
                    if sent != datagram.len() {
                        return Err(TransportError::ShortSend {
                            to,
                            sent,
                            expected: datagram.len(),
                        }
                        .into());
                    }
                    metrics::record_reply_sent(sent);
                }
            }
        }
        Ok(())
    }

    /// Run the receive → reduce → reply loop until `shutdown` resolves
    ///
    /// Empty datagrams are skipped without reaching the reducer. Every other
    /// datagram is converted into an action with `into_action`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] when receiving or replying fails.
    /// The loop does not retry.
    pub async fn serve<T, F, S>(
        &self,
        transport: &T,
        into_action: F,
        shutdown: S,
    ) -> Result<(), StoreError>
    where
        T: Transport + ?Sized,
        F: Fn(Datagram) -> R::Action,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutdown signal received, leaving serve loop");
                    return Ok(());
                }
                received = transport.recv_from(&mut buffer) => received,
            };

            let (len, from) = received.map_err(TransportError::Receive)?;
            metrics::record_datagram_received(len);

            if len == 0 {
                tracing::debug!(%from, "Ignoring empty datagram");
                continue;
            }

            let action = into_action(Datagram {
                from,
                payload: buffer[..len].to_vec(),
            });
            let effects = self.send(action).await;
            self.execute(effects, transport).await?;
        }
    }
}
