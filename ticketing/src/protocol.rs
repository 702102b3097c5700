//! Binary wire protocol.
//!
//! Every message is one datagram whose first byte is the message tag. All
//! integers are big-endian; cookies and ticket codes are raw bytes.
//!
//! ```text
//! tag  name            dir  length   payload
//!   1  GET_EVENTS      in   1        -
//!   2  EVENTS          out  var      (event_id:u32 tickets:u16 len:u8 desc)*
//!   3  GET_RESERVATION in   7        event_id:u32 ticket_count:u16
//!   4  RESERVATION     out  67       reservation_id:u32 event_id:u32 ticket_count:u16 cookie:48 expires_at:u64
//!   5  GET_TICKETS     in   53       reservation_id:u32 cookie:48
//!   6  TICKETS         out  7+7n     reservation_id:u32 ticket_count:u16 code:7*n
//! 255  BAD_REQUEST     out  5        id:u32
//! ```

use crate::types::{COOKIE_LEN, Cookie, EventId, ReservationId, TICKET_CODE_LEN, TicketCode};
use thiserror::Error;

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM_LEN: usize = 65_507;

/// Message tags
pub mod tag {
    /// Request the event list
    pub const GET_EVENTS: u8 = 1;
    /// Event list
    pub const EVENTS: u8 = 2;
    /// Request a reservation
    pub const GET_RESERVATION: u8 = 3;
    /// Reservation granted
    pub const RESERVATION: u8 = 4;
    /// Redeem a reservation
    pub const GET_TICKETS: u8 = 5;
    /// Issued tickets
    pub const TICKETS: u8 = 6;
    /// Request refused
    pub const BAD_REQUEST: u8 = 255;
}

/// Length of a `GET_EVENTS` datagram
pub const GET_EVENTS_LEN: usize = 1;
/// Length of a `GET_RESERVATION` datagram
pub const GET_RESERVATION_LEN: usize = 1 + 4 + 2;
/// Length of a `GET_TICKETS` datagram
pub const GET_TICKETS_LEN: usize = 1 + 4 + COOKIE_LEN;
/// Length of a `RESERVATION` datagram
pub const RESERVATION_LEN: usize = 1 + 4 + 4 + 2 + COOKIE_LEN + 8;
/// Length of a `TICKETS` datagram before the codes
pub const TICKETS_HEADER_LEN: usize = 1 + 4 + 2;
/// Length of a `BAD_REQUEST` datagram
pub const BAD_REQUEST_LEN: usize = 1 + 4;
/// Fixed part of one entry in an `EVENTS` datagram
const EVENT_ENTRY_HEADER_LEN: usize = 4 + 2 + 1;

/// Whether a `TICKETS` reply with `count` codes fits in one datagram
#[must_use]
pub const fn tickets_fit_in_datagram(count: u16) -> bool {
    TICKETS_HEADER_LEN + count as usize * TICKET_CODE_LEN <= MAX_DATAGRAM_LEN
}

/// Why a datagram could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length datagram
    #[error("Empty datagram")]
    Empty,

    /// First byte is not a tag valid in this direction
    #[error("Unknown message tag {0}")]
    UnknownTag(u8),

    /// Length does not match the tag's layout
    #[error("Message tag {tag} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Message tag
        tag: u8,
        /// Required length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// An `EVENTS` entry runs past the end of the datagram
    #[error("Event entry at offset {offset} is truncated")]
    TruncatedEvent {
        /// Byte offset of the entry
        offset: usize,
    },
}

// ============================================================================
// Requests (client → server)
// ============================================================================

/// A request the server accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List events
    GetEvents,
    /// Reserve `ticket_count` tickets for `event_id`
    GetReservation {
        /// Event to reserve against
        event_id: EventId,
        /// Tickets requested
        ticket_count: u16,
    },
    /// Redeem a reservation
    GetTickets {
        /// Reservation to redeem
        reservation_id: ReservationId,
        /// Secret returned with the reservation
        cookie: Cookie,
    },
}

impl Request {
    /// Decode a request datagram
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for empty input, non-request tags or a length
    /// that does not exactly match the tag's layout.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(datagram);
        let tag = reader.u8().ok_or(DecodeError::Empty)?;

        let expected = match tag {
            tag::GET_EVENTS => GET_EVENTS_LEN,
            tag::GET_RESERVATION => GET_RESERVATION_LEN,
            tag::GET_TICKETS => GET_TICKETS_LEN,
            other => return Err(DecodeError::UnknownTag(other)),
        };
        if datagram.len() != expected {
            return Err(DecodeError::InvalidLength {
                tag,
                expected,
                actual: datagram.len(),
            });
        }

        // Length was checked above, the reads below cannot run short
        let invalid = DecodeError::InvalidLength {
            tag,
            expected,
            actual: datagram.len(),
        };
        match tag {
            tag::GET_RESERVATION => {
                let event_id = reader.u32().ok_or_else(|| invalid.clone())?;
                let ticket_count = reader.u16().ok_or(invalid)?;
                Ok(Self::GetReservation {
                    event_id: EventId::new(event_id),
                    ticket_count,
                })
            }
            tag::GET_TICKETS => {
                let reservation_id = reader.u32().ok_or_else(|| invalid.clone())?;
                let cookie = reader.array::<COOKIE_LEN>().ok_or(invalid)?;
                Ok(Self::GetTickets {
                    reservation_id: ReservationId::new(reservation_id),
                    cookie: Cookie::new(cookie),
                })
            }
            _ => Ok(Self::GetEvents),
        }
    }

    /// Encode the request as a datagram
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::GetEvents => vec![tag::GET_EVENTS],
            Self::GetReservation {
                event_id,
                ticket_count,
            } => {
                let mut out = Vec::with_capacity(GET_RESERVATION_LEN);
                out.push(tag::GET_RESERVATION);
                out.extend_from_slice(&event_id.value().to_be_bytes());
                out.extend_from_slice(&ticket_count.to_be_bytes());
                out
            }
            Self::GetTickets {
                reservation_id,
                cookie,
            } => {
                let mut out = Vec::with_capacity(GET_TICKETS_LEN);
                out.push(tag::GET_TICKETS);
                out.extend_from_slice(&reservation_id.value().to_be_bytes());
                out.extend_from_slice(cookie.as_bytes());
                out
            }
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetEvents => "GET_EVENTS",
            Self::GetReservation { .. } => "GET_RESERVATION",
            Self::GetTickets { .. } => "GET_TICKETS",
        }
    }
}

// ============================================================================
// Responses (server → client)
// ============================================================================

/// One entry of an `EVENTS` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    /// Event id
    pub event_id: EventId,
    /// Tickets left
    pub tickets_remaining: u16,
    /// Description, at most 255 bytes
    pub description: Vec<u8>,
}

/// A reply the server sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Event list
    Events(Vec<EventEntry>),
    /// Reservation granted
    Reservation {
        /// New reservation id
        reservation_id: ReservationId,
        /// Event reserved against
        event_id: EventId,
        /// Tickets held
        ticket_count: u16,
        /// Redemption secret
        cookie: Cookie,
        /// Deadline, Unix seconds
        expires_at: u64,
    },
    /// Issued tickets
    Tickets {
        /// Redeemed reservation
        reservation_id: ReservationId,
        /// Ticket codes in issuance order
        tickets: Vec<TicketCode>,
    },
    /// Request refused; echoes the event or reservation id from the request
    BadRequest {
        /// Echoed id
        id: u32,
    },
}

impl Response {
    /// Encode the response as a datagram
    ///
    /// `Events` is packed greedily: entries that would push the datagram past
    /// [`MAX_DATAGRAM_LEN`] are dropped, together with everything after them.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Events(entries) => encode_events(entries),
            Self::Reservation {
                reservation_id,
                event_id,
                ticket_count,
                cookie,
                expires_at,
            } => {
                let mut out = Vec::with_capacity(RESERVATION_LEN);
                out.push(tag::RESERVATION);
                out.extend_from_slice(&reservation_id.value().to_be_bytes());
                out.extend_from_slice(&event_id.value().to_be_bytes());
                out.extend_from_slice(&ticket_count.to_be_bytes());
                out.extend_from_slice(cookie.as_bytes());
                out.extend_from_slice(&expires_at.to_be_bytes());
                out
            }
            Self::Tickets {
                reservation_id,
                tickets,
            } => {
                // The ledger never grants more tickets than fit in one datagram
                #[allow(clippy::cast_possible_truncation)]
                let count = tickets.len() as u16;
                let mut out = Vec::with_capacity(TICKETS_HEADER_LEN + tickets.len() * TICKET_CODE_LEN);
                out.push(tag::TICKETS);
                out.extend_from_slice(&reservation_id.value().to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
                for code in tickets {
                    out.extend_from_slice(code.as_bytes());
                }
                out
            }
            Self::BadRequest { id } => {
                let mut out = Vec::with_capacity(BAD_REQUEST_LEN);
                out.push(tag::BAD_REQUEST);
                out.extend_from_slice(&id.to_be_bytes());
                out
            }
        }
    }

    /// Decode a response datagram (client side)
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] for empty input, non-response tags, wrong
    /// lengths or truncated event entries.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(datagram);
        let tag = reader.u8().ok_or(DecodeError::Empty)?;
        let invalid = |expected| DecodeError::InvalidLength {
            tag,
            expected,
            actual: datagram.len(),
        };

        match tag {
            tag::EVENTS => {
                let mut entries = Vec::new();
                while !reader.is_empty() {
                    let offset = datagram.len() - reader.remaining();
                    let truncated = DecodeError::TruncatedEvent { offset };
                    let event_id = reader.u32().ok_or_else(|| truncated.clone())?;
                    let tickets_remaining = reader.u16().ok_or_else(|| truncated.clone())?;
                    let len = reader.u8().ok_or_else(|| truncated.clone())?;
                    let description = reader.bytes(usize::from(len)).ok_or(truncated)?;
                    entries.push(EventEntry {
                        event_id: EventId::new(event_id),
                        tickets_remaining,
                        description: description.to_vec(),
                    });
                }
                Ok(Self::Events(entries))
            }
            tag::RESERVATION => {
                if datagram.len() != RESERVATION_LEN {
                    return Err(invalid(RESERVATION_LEN));
                }
                let reservation_id = reader.u32().ok_or_else(|| invalid(RESERVATION_LEN))?;
                let event_id = reader.u32().ok_or_else(|| invalid(RESERVATION_LEN))?;
                let ticket_count = reader.u16().ok_or_else(|| invalid(RESERVATION_LEN))?;
                let cookie = reader
                    .array::<COOKIE_LEN>()
                    .ok_or_else(|| invalid(RESERVATION_LEN))?;
                let expires_at = reader.u64().ok_or_else(|| invalid(RESERVATION_LEN))?;
                Ok(Self::Reservation {
                    reservation_id: ReservationId::new(reservation_id),
                    event_id: EventId::new(event_id),
                    ticket_count,
                    cookie: Cookie::new(cookie),
                    expires_at,
                })
            }
            tag::TICKETS => {
                let reservation_id = reader.u32().ok_or_else(|| invalid(TICKETS_HEADER_LEN))?;
                let count = reader.u16().ok_or_else(|| invalid(TICKETS_HEADER_LEN))?;
                let expected = TICKETS_HEADER_LEN + usize::from(count) * TICKET_CODE_LEN;
                if datagram.len() != expected {
                    return Err(invalid(expected));
                }
                let mut tickets = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    let code = reader
                        .array::<TICKET_CODE_LEN>()
                        .ok_or_else(|| invalid(expected))?;
                    tickets.push(TicketCode::new(code));
                }
                Ok(Self::Tickets {
                    reservation_id: ReservationId::new(reservation_id),
                    tickets,
                })
            }
            tag::BAD_REQUEST => {
                if datagram.len() != BAD_REQUEST_LEN {
                    return Err(invalid(BAD_REQUEST_LEN));
                }
                let id = reader.u32().ok_or_else(|| invalid(BAD_REQUEST_LEN))?;
                Ok(Self::BadRequest { id })
            }
            other => Err(DecodeError::UnknownTag(other)),
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Events(_) => "EVENTS",
            Self::Reservation { .. } => "RESERVATION",
            Self::Tickets { .. } => "TICKETS",
            Self::BadRequest { .. } => "BAD_REQUEST",
        }
    }
}

fn encode_events(entries: &[EventEntry]) -> Vec<u8> {
    let mut out = vec![tag::EVENTS];
    for entry in entries {
        let Ok(len) = u8::try_from(entry.description.len()) else {
            tracing::warn!(event_id = %entry.event_id, "Skipping event with oversized description");
            continue;
        };
        if out.len() + EVENT_ENTRY_HEADER_LEN + entry.description.len() > MAX_DATAGRAM_LEN {
            break;
        }
        out.extend_from_slice(&entry.event_id.value().to_be_bytes());
        out.extend_from_slice(&entry.tickets_remaining.to_be_bytes());
        out.push(len);
        out.extend_from_slice(&entry.description);
    }
    out
}

/// Panic-free big-endian reader over a byte slice
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    const fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let (head, rest) = self.buf.split_first_chunk::<N>()?;
        self.buf = rest;
        Some(*head)
    }

    fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[b]| b)
    }

    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_be_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_be_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_be_bytes)
    }
}
