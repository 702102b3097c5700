//! Event catalog: the fixed list of sellable events and their live inventory.
//!
//! The set of events is decided once, when the catalog file is loaded. Only
//! the remaining-ticket counters change afterwards, and only downwards through
//! [`Catalog::debit`].

use crate::types::{EventId, MAX_DESCRIPTION_LEN};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// One sellable event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: EventId,
    description: Vec<u8>,
    tickets_remaining: u16,
}

impl Event {
    /// Event id
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Raw description bytes (at most 255)
    #[must_use]
    pub fn description(&self) -> &[u8] {
        &self.description
    }

    /// Tickets still available for reservation
    #[must_use]
    pub const fn tickets_remaining(&self) -> u16 {
        self.tickets_remaining
    }
}

/// Errors from catalog construction and inventory changes
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Reading the catalog file failed
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// A description line had no ticket count line after it
    #[error("Catalog line {line}: description has no ticket count line")]
    MissingTicketCount {
        /// 1-based line number of the description
        line: usize,
    },

    /// The ticket count line was not a number in `0..=65535`
    #[error("Catalog line {line}: invalid ticket count {value:?}")]
    InvalidTicketCount {
        /// 1-based line number of the count
        line: usize,
        /// Offending text
        value: String,
    },

    /// The description does not fit the 8-bit length prefix
    #[error("Catalog line {line}: description is {len} bytes, limit is 255")]
    DescriptionTooLong {
        /// 1-based line number of the description
        line: usize,
        /// Actual length
        len: usize,
    },

    /// More events than the 32-bit id space holds
    #[error("Catalog has more events than fit in a 32-bit id")]
    TooManyEvents,

    /// No event with this id
    #[error("Event {0} not found")]
    NotFound(EventId),

    /// Not enough tickets left to debit
    #[error("Insufficient inventory for event {event_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Event
        event_id: EventId,
        /// Tickets requested
        requested: u16,
        /// Tickets left
        available: u16,
    },
}

/// The event catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    events: Vec<Event>,
}

impl Catalog {
    /// Build a catalog from `(description, tickets)` pairs, ids assigned in order
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DescriptionTooLong`] if a description exceeds
    /// 255 bytes (`line` is then the 1-based entry index), or
    /// [`CatalogError::TooManyEvents`] past `u32::MAX` entries.
    pub fn from_entries<I, D>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (D, u16)>,
        D: Into<Vec<u8>>,
    {
        let mut events = Vec::new();
        for (index, (description, tickets)) in entries.into_iter().enumerate() {
            events.push(Self::make_event(index, description.into(), tickets, index + 1)?);
        }
        Ok(Self { events })
    }

    /// Load a catalog file
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse the catalog format: a description line, then a ticket count line,
    /// repeated until end of input
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on I/O failure, a dangling description, a bad
    /// count or an overlong description.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, CatalogError> {
        let mut events = Vec::new();
        let mut lines = reader.split(b'\n').enumerate();

        while let Some((index, description)) = lines.next() {
            let mut description = description?;
            strip_carriage_return(&mut description);
            let line = index + 1;

            let Some((_, count)) = lines.next() else {
                // A single trailing blank line is not an event
                if description.is_empty() {
                    break;
                }
                return Err(CatalogError::MissingTicketCount { line });
            };
            let count = count?;
            let count_text = String::from_utf8_lossy(&count);
            let tickets = count_text.trim().parse::<u16>().map_err(|_| {
                CatalogError::InvalidTicketCount {
                    line: line + 1,
                    value: count_text.trim().to_string(),
                }
            })?;

            events.push(Self::make_event(events.len(), description, tickets, line)?);
        }

        tracing::debug!(events = events.len(), "Catalog parsed");
        Ok(Self { events })
    }

    fn make_event(
        index: usize,
        description: Vec<u8>,
        tickets_remaining: u16,
        line: usize,
    ) -> Result<Event, CatalogError> {
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(CatalogError::DescriptionTooLong {
                line,
                len: description.len(),
            });
        }
        let id = u32::try_from(index).map_err(|_| CatalogError::TooManyEvents)?;
        Ok(Event {
            id: EventId::new(id),
            description,
            tickets_remaining,
        })
    }

    /// All events in ascending id order
    pub fn list(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Look up one event
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    pub fn get(&self, event_id: EventId) -> Result<&Event, CatalogError> {
        usize::try_from(event_id.value())
            .ok()
            .and_then(|index| self.events.get(index))
            .ok_or(CatalogError::NotFound(event_id))
    }

    /// Atomically check and decrement an event's remaining tickets
    ///
    /// Fails without touching the counter if fewer than `n` tickets remain.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] or [`CatalogError::InsufficientInventory`].
    pub fn debit(&mut self, event_id: EventId, n: u16) -> Result<u16, CatalogError> {
        let event = usize::try_from(event_id.value())
            .ok()
            .and_then(|index| self.events.get_mut(index))
            .ok_or(CatalogError::NotFound(event_id))?;

        let remaining = event.tickets_remaining.checked_sub(n).ok_or(
            CatalogError::InsufficientInventory {
                event_id,
                requested: n,
                available: event.tickets_remaining,
            },
        )?;
        event.tickets_remaining = remaining;
        Ok(remaining)
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog has no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn strip_carriage_return(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn concert_catalog() -> Catalog {
        Catalog::from_entries([("Concert", 10), ("Opera", 0)]).unwrap()
    }

    #[test]
    fn list_is_ordered_by_id() {
        let catalog = concert_catalog();
        let ids: Vec<u32> = catalog.list().map(|e| e.id().value()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(catalog.get(EventId::new(0)).unwrap().description(), b"Concert");
    }

    #[test]
    fn get_unknown_event_is_not_found() {
        let catalog = concert_catalog();
        assert!(matches!(
            catalog.get(EventId::new(2)),
            Err(CatalogError::NotFound(id)) if id == EventId::new(2)
        ));
    }

    #[test]
    fn debit_decrements_exactly() {
        let mut catalog = concert_catalog();
        assert_eq!(catalog.debit(EventId::new(0), 3).unwrap(), 7);
        assert_eq!(catalog.get(EventId::new(0)).unwrap().tickets_remaining(), 7);
        assert_eq!(catalog.debit(EventId::new(0), 7).unwrap(), 0);
    }

    #[test]
    fn failed_debit_has_no_side_effect() {
        let mut catalog = concert_catalog();
        let err = catalog.debit(EventId::new(0), 11).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InsufficientInventory { requested: 11, available: 10, .. }
        ));
        assert_eq!(catalog.get(EventId::new(0)).unwrap().tickets_remaining(), 10);

        assert!(catalog.debit(EventId::new(9), 1).is_err());
        assert_eq!(catalog, concert_catalog());
    }

    #[test]
    fn parses_alternating_lines() {
        let input = "Concert\n10\nOpera night\r\n 250 \r\n";
        let catalog = Catalog::from_reader(Cursor::new(input)).unwrap();

        assert_eq!(catalog.len(), 2);
        let opera = catalog.get(EventId::new(1)).unwrap();
        assert_eq!(opera.description(), b"Opera night");
        assert_eq!(opera.tickets_remaining(), 250);
    }

    #[test]
    fn empty_input_is_an_empty_catalog() {
        let catalog = Catalog::from_reader(Cursor::new("")).unwrap();
        assert!(catalog.is_empty());

        let catalog = Catalog::from_reader(Cursor::new("Concert\n10\n\n")).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn dangling_description_is_rejected() {
        let err = Catalog::from_reader(Cursor::new("Concert\n10\nOrphan\n")).unwrap_err();
        assert!(matches!(err, CatalogError::MissingTicketCount { line: 3 }));
    }

    #[test]
    fn bad_count_is_rejected() {
        let err = Catalog::from_reader(Cursor::new("Concert\n70000\n")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTicketCount { line: 2, .. }));

        let err = Catalog::from_reader(Cursor::new("Concert\nlots\n")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTicketCount { line: 2, .. }));
    }

    #[test]
    fn long_description_is_rejected() {
        let input = format!("{}\n1\n", "x".repeat(256));
        let err = Catalog::from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, CatalogError::DescriptionTooLong { line: 1, len: 256 }));

        let input = format!("{}\n1\n", "x".repeat(255));
        assert!(Catalog::from_reader(Cursor::new(input)).is_ok());
    }
}
