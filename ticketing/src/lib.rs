//! Box office - a UDP ticket sales server
//!
//! Clients discover events, reserve tickets against an event's inventory and
//! redeem the reservation for unique ticket codes, all over a compact binary
//! protocol carried in single UDP datagrams.
//!
//! # Architecture
//!
//! ```text
//!   datagram ──▶ Store::serve ──▶ BoxOfficeReducer ──▶ Effect::Reply ──▶ datagram
//!                                        │
//!                                        ▼
//!                                     Ledger
//!                              ┌─────────┴─────────┐
//!                           Catalog           TicketIssuer
//! ```
//!
//! - [`catalog`]: events and live inventory, loaded once from a file
//! - [`ledger`]: reservation state machine (pending, realized, expired)
//! - [`issuer`]: odometer-style ticket codes over `0-9A-Z`
//! - [`protocol`]: wire codec
//! - [`dispatcher`]: the reducer that routes requests to the ledger
//!
//! The server is strictly sequential: each datagram is decoded, handled and
//! answered before the next one is read. Expiry is lazy; a sweep runs before
//! every request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod cookie;
pub mod dispatcher;
pub mod issuer;
pub mod ledger;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod types;

pub use catalog::{Catalog, CatalogError, Event};
pub use config::{Args, Config};
pub use cookie::{CookieGenerator, RandomCookieGenerator, SequentialCookieGenerator};
pub use dispatcher::{BoxOfficeAction, BoxOfficeEnvironment, BoxOfficeReducer, BoxOfficeState};
pub use issuer::TicketIssuer;
pub use ledger::{
    Ledger, RedeemError, Reservation, ReservationReceipt, ReservationStatus, ReserveError,
};
pub use protocol::{DecodeError, EventEntry, Request, Response};
pub use server::{BoxOfficeStore, new_store, serve, shutdown_signal};
pub use types::*;
