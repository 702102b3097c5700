//! Reservation ledger.
//!
//! Owns the catalog and the ticket issuer, and tracks every reservation ever
//! granted. A reservation moves through a small state machine:
//!
//! ```text
//!            redeem (cookie ok, in time)
//! Pending ──────────────────────────────▶ Realized
//!    │
//!    │ now ≥ expires_at
//!    ▼
//! Expired
//! ```
//!
//! `Realized` and `Expired` are terminal. Expired reservations keep their
//! tickets debited from the catalog; inventory is never returned.
//!
//! Time and cookie material come in as arguments so the ledger itself stays
//! deterministic.

use crate::catalog::{Catalog, CatalogError};
use crate::cookie::CookieGenerator;
use crate::issuer::TicketIssuer;
use crate::protocol::tickets_fit_in_datagram;
use crate::types::{Cookie, EventId, ReservationId, TicketCode};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Lifecycle of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Granted, waiting for redemption
    Pending,
    /// Redeemed; tickets issued
    Realized,
    /// Deadline passed before redemption
    Expired,
}

/// One granted reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    id: ReservationId,
    event_id: EventId,
    ticket_count: u16,
    cookie: Cookie,
    expires_at: DateTime<Utc>,
    status: ReservationStatus,
    tickets: Vec<TicketCode>,
}

impl Reservation {
    /// Reservation id
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.id
    }

    /// Event reserved against
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Tickets held
    #[must_use]
    pub const fn ticket_count(&self) -> u16 {
        self.ticket_count
    }

    /// Redemption deadline
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Issued codes; empty until realized
    #[must_use]
    pub fn tickets(&self) -> &[TicketCode] {
        &self.tickets
    }
}

/// What the client gets back from a successful reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationReceipt {
    /// New reservation id
    pub reservation_id: ReservationId,
    /// Event reserved against
    pub event_id: EventId,
    /// Tickets held
    pub ticket_count: u16,
    /// Redemption secret
    pub cookie: Cookie,
    /// Redemption deadline
    pub expires_at: DateTime<Utc>,
}

impl ReservationReceipt {
    /// Deadline as Unix seconds, the way the wire carries it
    #[must_use]
    pub fn expires_at_unix(&self) -> u64 {
        u64::try_from(self.expires_at.timestamp()).unwrap_or(0)
    }
}

/// Why a reservation was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReserveError {
    /// No such event
    #[error("Unknown event {0}")]
    UnknownEvent(EventId),

    /// Zero tickets, or more than one `TICKETS` datagram can carry
    #[error("Invalid ticket count {count} for event {event_id}")]
    InvalidCount {
        /// Event
        event_id: EventId,
        /// Requested count
        count: u16,
    },

    /// Fewer tickets left than requested
    #[error("Event {event_id} has {available} tickets left, {requested} requested")]
    InventoryExhausted {
        /// Event
        event_id: EventId,
        /// Requested count
        requested: u16,
        /// Tickets left
        available: u16,
    },

    /// Every reservation id has been handed out
    #[error("Reservation ids exhausted")]
    IdsExhausted,
}

impl ReserveError {
    /// Short label for metrics
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownEvent(_) => "unknown_event",
            Self::InvalidCount { .. } => "invalid_count",
            Self::InventoryExhausted { .. } => "inventory_exhausted",
            Self::IdsExhausted => "ids_exhausted",
        }
    }
}

/// Why a redemption was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedeemError {
    /// No reservation with this id
    #[error("Unknown reservation {0}")]
    UnknownReservation(ReservationId),

    /// The deadline passed before redemption
    #[error("Reservation {0} has expired")]
    Expired(ReservationId),

    /// Cookie does not match
    #[error("Cookie mismatch for reservation {0}")]
    CookieMismatch(ReservationId),
}

impl RedeemError {
    /// Short label for metrics
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownReservation(_) => "unknown_reservation",
            Self::Expired(_) => "expired",
            Self::CookieMismatch(_) => "cookie_mismatch",
        }
    }
}

/// The reservation ledger
#[derive(Debug, Clone)]
pub struct Ledger {
    catalog: Catalog,
    issuer: TicketIssuer,
    reservations: HashMap<ReservationId, Reservation>,
    // Next id to hand out; ids below it and at or above FIRST are all present
    next_id: Option<ReservationId>,
    // Every reservation below the cursor is resolved
    sweep_cursor: ReservationId,
    expiry: Duration,
}

impl Ledger {
    /// A ledger over `catalog` whose reservations live for `expiry`
    #[must_use]
    pub fn new(catalog: Catalog, expiry: Duration) -> Self {
        Self::with_issuer(catalog, TicketIssuer::new(), expiry)
    }

    /// A ledger with an explicit issuer
    #[must_use]
    pub fn with_issuer(catalog: Catalog, issuer: TicketIssuer, expiry: Duration) -> Self {
        Self {
            catalog,
            issuer,
            reservations: HashMap::new(),
            next_id: Some(ReservationId::FIRST),
            sweep_cursor: ReservationId::FIRST,
            expiry,
        }
    }

    /// Reserve `ticket_count` tickets for `event_id`
    ///
    /// On success the catalog is debited immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ReserveError`] if the event is unknown, the count is zero or
    /// too large for one reply, or inventory is short. Nothing changes on error.
    pub fn reserve(
        &mut self,
        event_id: EventId,
        ticket_count: u16,
        now: DateTime<Utc>,
        cookies: &dyn CookieGenerator,
    ) -> Result<ReservationReceipt, ReserveError> {
        let available = self
            .catalog
            .get(event_id)
            .map_err(|_| ReserveError::UnknownEvent(event_id))?
            .tickets_remaining();

        if ticket_count == 0 || !tickets_fit_in_datagram(ticket_count) {
            return Err(ReserveError::InvalidCount {
                event_id,
                count: ticket_count,
            });
        }
        if ticket_count > available {
            return Err(ReserveError::InventoryExhausted {
                event_id,
                requested: ticket_count,
                available,
            });
        }
        let reservation_id = self.next_id.ok_or(ReserveError::IdsExhausted)?;

        self.catalog
            .debit(event_id, ticket_count)
            .map_err(|err| match err {
                CatalogError::InsufficientInventory {
                    requested,
                    available,
                    ..
                } => ReserveError::InventoryExhausted {
                    event_id,
                    requested,
                    available,
                },
                _ => ReserveError::UnknownEvent(event_id),
            })?;

        let reservation = Reservation {
            id: reservation_id,
            event_id,
            ticket_count,
            cookie: cookies.generate(),
            // Whole seconds, so the enforced deadline is the advertised one
            expires_at: now.trunc_subsecs(0) + self.expiry,
            status: ReservationStatus::Pending,
            tickets: Vec::new(),
        };
        let receipt = ReservationReceipt {
            reservation_id,
            event_id,
            ticket_count,
            cookie: reservation.cookie,
            expires_at: reservation.expires_at,
        };
        self.reservations.insert(reservation_id, reservation);
        self.next_id = reservation_id.next();

        tracing::debug!(
            reservation_id = %reservation_id,
            event_id = %event_id,
            ticket_count,
            "Reservation granted"
        );
        Ok(receipt)
    }

    /// Redeem a reservation for its ticket codes
    ///
    /// The first successful redemption issues the codes; later ones return
    /// the same codes again. A wrong cookie never changes state.
    ///
    /// # Errors
    ///
    /// Returns [`RedeemError`] for an unknown id, an expired reservation
    /// (checked before the cookie) or a cookie mismatch.
    pub fn redeem(
        &mut self,
        reservation_id: ReservationId,
        cookie: &Cookie,
        now: DateTime<Utc>,
    ) -> Result<&[TicketCode], RedeemError> {
        let reservation = self
            .reservations
            .get_mut(&reservation_id)
            .ok_or(RedeemError::UnknownReservation(reservation_id))?;

        if reservation.status == ReservationStatus::Pending && now >= reservation.expires_at {
            reservation.status = ReservationStatus::Expired;
        }
        if reservation.status == ReservationStatus::Expired {
            return Err(RedeemError::Expired(reservation_id));
        }
        if reservation.cookie != *cookie {
            return Err(RedeemError::CookieMismatch(reservation_id));
        }

        if reservation.status == ReservationStatus::Pending {
            reservation.tickets = self.issuer.issue(reservation.ticket_count);
            reservation.status = ReservationStatus::Realized;
            tracing::debug!(
                reservation_id = %reservation_id,
                tickets = reservation.tickets.len(),
                "Reservation realized"
            );
        }
        Ok(&reservation.tickets)
    }

    /// Expire every pending reservation whose deadline is at or before `now`
    ///
    /// Returns how many reservations expired.
    pub fn sweep_expirations(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        while Some(self.sweep_cursor) != self.next_id {
            let Some(reservation) = self.reservations.get_mut(&self.sweep_cursor) else {
                break;
            };
            match reservation.status {
                ReservationStatus::Pending if now >= reservation.expires_at => {
                    reservation.status = ReservationStatus::Expired;
                    expired += 1;
                }
                // Later reservations were granted no earlier, so expire no earlier
                ReservationStatus::Pending => break,
                ReservationStatus::Realized | ReservationStatus::Expired => {}
            }
            match self.sweep_cursor.next() {
                Some(next) => self.sweep_cursor = next,
                None => break,
            }
        }
        if expired > 0 {
            tracing::debug!(expired, "Expired pending reservations");
        }
        expired
    }

    /// The catalog with live inventory
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Look up a reservation
    #[must_use]
    pub fn reservation(&self, reservation_id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&reservation_id)
    }

    /// Number of reservations ever granted
    #[must_use]
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// Whether no reservation has been granted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Ticket codes issued so far
    #[must_use]
    pub const fn tickets_issued(&self) -> u64 {
        self.issuer.issued()
    }

    /// Reservation lifetime
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expiry
    }
}
