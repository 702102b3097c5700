//! Wiring between the box office reducer and the datagram runtime.

use crate::dispatcher::{BoxOfficeAction, BoxOfficeEnvironment, BoxOfficeReducer, BoxOfficeState};
use crate::ledger::Ledger;
use boxoffice_runtime::{Store, StoreError, transport::Transport};
use std::future::Future;

/// The store type the server runs
pub type BoxOfficeStore = Store<BoxOfficeReducer>;

/// Build a store over `ledger`
#[must_use]
pub fn new_store(ledger: Ledger, environment: BoxOfficeEnvironment) -> BoxOfficeStore {
    Store::new(BoxOfficeState::new(ledger), BoxOfficeReducer::new(), environment)
}

/// Serve requests from `transport` until `shutdown` resolves or the transport fails
///
/// # Errors
///
/// Returns [`StoreError`] when a receive or a reply fails.
pub async fn serve<T, S>(store: &BoxOfficeStore, transport: &T, shutdown: S) -> Result<(), StoreError>
where
    T: Transport + ?Sized,
    S: Future<Output = ()>,
{
    tracing::info!("Box office serving requests");
    let result = store.serve(transport, BoxOfficeAction::from, shutdown).await;
    match &result {
        Ok(()) => tracing::info!("Box office stopped"),
        Err(error) => tracing::error!(%error, "Box office stopped on transport failure"),
    }
    result
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        }
    }
}
