//! Ticket code issuer.
//!
//! A single 7-column odometer over `0-9A-Z`, shared by every reservation for
//! the lifetime of the process. Each call to [`TicketIssuer::next_code`]
//! advances the rightmost column and returns the new reading, so codes come
//! out in strict issuance order and never repeat.

use crate::types::{TICKET_CODE_LEN, TicketCode};

/// Column symbols in ascending order
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Odometer-style ticket code generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketIssuer {
    // Index into ALPHABET for each column, leftmost first
    digits: [u8; TICKET_CODE_LEN],
    issued: u64,
}

impl TicketIssuer {
    /// A fresh issuer reading `"0000000"`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            digits: [0; TICKET_CODE_LEN],
            issued: 0,
        }
    }

    /// Advance the odometer and return the new code
    ///
    /// An overflowing column resets to `0` and carries one column left. A
    /// carry out of the leftmost column wraps the whole counter; at 36^7 codes
    /// that is unreachable in practice.
    pub fn next_code(&mut self) -> TicketCode {
        for digit in self.digits.iter_mut().rev() {
            if usize::from(*digit) + 1 < ALPHABET.len() {
                *digit += 1;
                break;
            }
            *digit = 0;
        }
        self.issued += 1;
        self.current()
    }

    /// Issue `count` consecutive codes
    pub fn issue(&mut self, count: u16) -> Vec<TicketCode> {
        (0..count).map(|_| self.next_code()).collect()
    }

    /// The code most recently issued (`"0000000"` before the first one)
    #[must_use]
    pub fn current(&self) -> TicketCode {
        TicketCode::new(self.digits.map(|d| ALPHABET[usize::from(d)]))
    }

    /// Total codes issued so far
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for TicketIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_at_zero_and_first_code_is_one() {
        let mut issuer = TicketIssuer::new();
        assert_eq!(issuer.current().as_str(), "0000000");
        assert_eq!(issuer.next_code().as_str(), "0000001");
        assert_eq!(issuer.issued(), 1);
    }

    #[test]
    fn digits_roll_into_letters() {
        let mut issuer = TicketIssuer::new();
        let codes: Vec<String> = issuer.issue(11).iter().map(ToString::to_string).collect();
        assert_eq!(codes[8], "0000009");
        assert_eq!(codes[9], "000000A");
        assert_eq!(codes[10], "000000B");
    }

    #[test]
    fn overflowed_column_resets_and_carries() {
        let mut issuer = TicketIssuer::new();
        // 35 steps reach "000000Z", the 36th carries
        for _ in 0..35 {
            issuer.next_code();
        }
        assert_eq!(issuer.current().as_str(), "000000Z");
        assert_eq!(issuer.next_code().as_str(), "0000010");
    }

    #[test]
    fn carry_ripples_through_several_columns() {
        let mut issuer = TicketIssuer::new();
        // 36^2 - 1 codes reach "00000ZZ"
        for _ in 0..(36 * 36 - 1) {
            issuer.next_code();
        }
        assert_eq!(issuer.current().as_str(), "00000ZZ");
        assert_eq!(issuer.next_code().as_str(), "0000100");
    }

    proptest! {
        #[test]
        fn codes_are_strictly_increasing(batches in proptest::collection::vec(1u16..50, 1..20)) {
            let mut issuer = TicketIssuer::new();
            let mut previous = issuer.current();
            for batch in batches {
                for code in issuer.issue(batch) {
                    prop_assert!(code > previous, "{code} should follow {previous}");
                    prop_assert!(code.as_bytes().iter().all(|b| ALPHABET.contains(b)));
                    previous = code;
                }
            }
        }
    }
}
