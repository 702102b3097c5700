//! Domain types for the ticket server.
//!
//! Identifiers, secrets and ticket codes shared by the catalog, the ledger and
//! the wire protocol. All of them are fixed-width so they map one-to-one onto
//! the binary message layout.

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// First reservation id handed out by a fresh ledger
pub const FIRST_RESERVATION_ID: u32 = 1_000_000;

/// Cookie length in bytes
pub const COOKIE_LEN: usize = 48;

/// Lowest byte a cookie may contain (`!`)
pub const COOKIE_MIN_BYTE: u8 = 33;

/// Highest byte a cookie may contain (`~`)
pub const COOKIE_MAX_BYTE: u8 = 126;

/// Ticket code length in bytes
pub const TICKET_CODE_LEN: usize = 7;

/// Longest event description the protocol can carry (8-bit length prefix)
pub const MAX_DESCRIPTION_LEN: usize = u8::MAX as usize;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an event, assigned in catalog order starting at 0
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u32);

impl EventId {
    /// Wrap a raw event id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw wire value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a reservation, sequential from [`FIRST_RESERVATION_ID`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationId(u32);

impl ReservationId {
    /// The first id a ledger issues
    pub const FIRST: Self = Self(FIRST_RESERVATION_ID);

    /// Wrap a raw reservation id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw wire value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The id after this one, `None` once the id space is exhausted
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Secrets and codes
// ============================================================================

/// 48-byte redemption secret bound to one reservation
///
/// `Debug` is redacted so cookies never end up in logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cookie([u8; COOKIE_LEN]);

impl Cookie {
    /// Wrap raw cookie bytes
    #[must_use]
    pub const fn new(bytes: [u8; COOKIE_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw cookie bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; COOKIE_LEN] {
        &self.0
    }

    /// Whether every byte is printable ASCII in `33..=126`
    #[must_use]
    pub fn is_printable(&self) -> bool {
        self.0
            .iter()
            .all(|b| (COOKIE_MIN_BYTE..=COOKIE_MAX_BYTE).contains(b))
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cookie(<redacted>)")
    }
}

/// 7-character ticket code over `0-9A-Z`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketCode([u8; TICKET_CODE_LEN]);

impl TicketCode {
    /// Wrap raw code bytes
    #[must_use]
    pub const fn new(bytes: [u8; TICKET_CODE_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw code bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TICKET_CODE_LEN] {
        &self.0
    }

    /// The code as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Issued codes are ASCII; decoded ones that are not valid UTF-8 show a placeholder
        std::str::from_utf8(&self.0).unwrap_or("<non-ascii>")
    }
}

impl fmt::Debug for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketCode({})", self.as_str())
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_id_next_stops_at_the_end_of_the_range() {
        assert_eq!(
            ReservationId::FIRST.next(),
            Some(ReservationId::new(1_000_001))
        );
        assert_eq!(ReservationId::new(u32::MAX).next(), None);
    }

    #[test]
    fn cookie_debug_is_redacted() {
        let cookie = Cookie::new([b'A'; COOKIE_LEN]);
        assert_eq!(format!("{cookie:?}"), "Cookie(<redacted>)");
        assert!(cookie.is_printable());
        assert!(!Cookie::new([b' '; COOKIE_LEN]).is_printable());
    }

    #[test]
    fn ticket_codes_order_like_the_odometer() {
        let a = TicketCode::new(*b"0000009");
        let b = TicketCode::new(*b"000000A");
        let c = TicketCode::new(*b"0000010");
        assert!(a < b && b < c);
        assert_eq!(b.to_string(), "000000A");
    }

    #[test]
    fn invalid_utf8_codes_show_a_placeholder() {
        let code = TicketCode::new([0xff, b'0', b'0', b'0', b'0', b'0', b'1']);
        assert_eq!(code.as_str(), "<non-ascii>");
        assert_eq!(format!("{code:?}"), "TicketCode(<non-ascii>)");
    }
}
