//! Request dispatcher for the box office.
//!
//! Every received datagram becomes a [`BoxOfficeAction::DatagramReceived`].
//! The reducer expires stale reservations, decodes the request, routes it to
//! the ledger and answers with exactly one reply datagram. Datagrams that do
//! not decode are logged and dropped without a reply.

use crate::cookie::CookieGenerator;
use crate::ledger::Ledger;
use crate::metrics;
use crate::protocol::{EventEntry, Request, Response};
use crate::types::{Cookie, EventId, ReservationId};
use boxoffice_core::{
    SmallVec,
    effect::{Effect, Effects},
    environment::Clock,
    reducer::Reducer,
    smallvec,
};
use boxoffice_runtime::transport::Datagram;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;

// ============================================================================
// State, Actions, Environment
// ============================================================================

/// State owned by the store: the ledger, which owns the catalog
#[derive(Debug, Clone)]
pub struct BoxOfficeState {
    /// Reservation ledger
    pub ledger: Ledger,
}

impl BoxOfficeState {
    /// Wrap a ledger
    #[must_use]
    pub const fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

/// Inputs to the box office reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxOfficeAction {
    /// A non-empty datagram arrived
    DatagramReceived {
        /// Sender address; the reply goes here
        from: SocketAddr,
        /// Raw datagram bytes
        payload: Vec<u8>,
    },
}

impl From<Datagram> for BoxOfficeAction {
    fn from(datagram: Datagram) -> Self {
        Self::DatagramReceived {
            from: datagram.from,
            payload: datagram.payload,
        }
    }
}

/// Injected dependencies
#[derive(Clone)]
pub struct BoxOfficeEnvironment {
    /// Source of `now`
    pub clock: Arc<dyn Clock>,
    /// Source of reservation cookies
    pub cookies: Arc<dyn CookieGenerator>,
}

impl BoxOfficeEnvironment {
    /// Create an environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, cookies: Arc<dyn CookieGenerator>) -> Self {
        Self { clock, cookies }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Routes decoded requests to the ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxOfficeReducer;

impl BoxOfficeReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn handle(
        ledger: &mut Ledger,
        request: Request,
        now: DateTime<Utc>,
        cookies: &dyn CookieGenerator,
    ) -> Response {
        match request {
            Request::GetEvents => Self::list_events(ledger),
            Request::GetReservation {
                event_id,
                ticket_count,
            } => Self::reserve(ledger, event_id, ticket_count, now, cookies),
            Request::GetTickets {
                reservation_id,
                cookie,
            } => Self::redeem(ledger, reservation_id, &cookie, now),
        }
    }

    fn list_events(ledger: &Ledger) -> Response {
        Response::Events(
            ledger
                .catalog()
                .list()
                .map(|event| EventEntry {
                    event_id: event.id(),
                    tickets_remaining: event.tickets_remaining(),
                    description: event.description().to_vec(),
                })
                .collect(),
        )
    }

    fn reserve(
        ledger: &mut Ledger,
        event_id: EventId,
        ticket_count: u16,
        now: DateTime<Utc>,
        cookies: &dyn CookieGenerator,
    ) -> Response {
        match ledger.reserve(event_id, ticket_count, now, cookies) {
            Ok(receipt) => {
                metrics::record_reservation("granted");
                Response::Reservation {
                    reservation_id: receipt.reservation_id,
                    event_id: receipt.event_id,
                    ticket_count: receipt.ticket_count,
                    cookie: receipt.cookie,
                    expires_at: receipt.expires_at_unix(),
                }
            }
            Err(error) => {
                tracing::debug!(%error, "Reservation refused");
                metrics::record_reservation("refused");
                metrics::record_bad_request(error.reason());
                Response::BadRequest {
                    id: event_id.value(),
                }
            }
        }
    }

    fn redeem(
        ledger: &mut Ledger,
        reservation_id: ReservationId,
        cookie: &Cookie,
        now: DateTime<Utc>,
    ) -> Response {
        let issued_before = ledger.tickets_issued();
        match ledger.redeem(reservation_id, cookie, now) {
            Ok(tickets) => {
                let tickets = tickets.to_vec();
                let newly_issued = ledger.tickets_issued() - issued_before;
                if newly_issued > 0 {
                    metrics::record_reservation("realized");
                    metrics::record_tickets_issued(newly_issued);
                }
                Response::Tickets {
                    reservation_id,
                    tickets,
                }
            }
            Err(error) => {
                tracing::debug!(%error, "Redemption refused");
                metrics::record_bad_request(error.reason());
                Response::BadRequest {
                    id: reservation_id.value(),
                }
            }
        }
    }
}

impl Reducer for BoxOfficeReducer {
    type State = BoxOfficeState;
    type Action = BoxOfficeAction;
    type Environment = BoxOfficeEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            BoxOfficeAction::DatagramReceived { from, payload } => {
                let now = env.clock.now();
                let expired = state.ledger.sweep_expirations(now);
                if expired > 0 {
                    metrics::record_expired(expired);
                }

                let request = match Request::decode(&payload) {
                    Ok(request) => request,
                    Err(error) => {
                        tracing::warn!(%from, len = payload.len(), %error, "Dropping malformed datagram");
                        metrics::record_datagram("malformed");
                        return SmallVec::new();
                    }
                };
                tracing::debug!(%from, request = request.name(), "Received request");
                metrics::record_datagram(request.name());

                let response = Self::handle(&mut state.ledger, request, now, env.cookies.as_ref());
                tracing::debug!(%from, response = response.name(), "Sending response");

                smallvec![Effect::reply(from, response.encode())]
            }
        }
    }
}
