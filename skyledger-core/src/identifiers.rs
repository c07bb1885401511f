//! Seat and ticket-number generation.
//!
//! Both generators are pure functions of their inputs: seat allocation takes the seats
//! already held on the flight, ticket numbers take an explicit random source.
//! Uniqueness against storage is checked by the ledger, not here.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Number of random digits in a ticket number, after the prefix.
pub const TICKET_DIGITS: usize = 10;

/// Lowest free sequential seat slot (1, 2, 3, ...) given the seats held by active
/// tickets on the flight. Seats that are not plain slot numbers (e.g. "12A" assigned by
/// an agent) occupy no slot.
pub fn next_seat_slot<'a, I>(taken: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let slots: BTreeSet<u32> = taken
        .into_iter()
        .filter_map(|seat| seat.trim().parse::<u32>().ok())
        .collect();

    let mut candidate = 1;
    for slot in slots {
        if slot > candidate {
            break;
        }
        if slot == candidate {
            candidate += 1;
        }
    }
    candidate
}

/// Storage form of a requested seat label. Numeric labels ("01", "+1") collapse to the
/// slot number so they compare equal to allocated seats; anything else is kept as given.
pub fn canonical_seat(label: &str) -> String {
    let label = label.trim();
    match label.parse::<u32>() {
        Ok(slot) => slot.to_string(),
        Err(_) => label.to_string(),
    }
}

/// `prefix` followed by [`TICKET_DIGITS`] random digits.
pub fn ticket_number<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let upper = 10u64.pow(TICKET_DIGITS as u32);
    format!("{}{:0width$}", prefix, rng.gen_range(0..upper), width = TICKET_DIGITS)
}

/// Source of ticket-number candidates.
pub trait TicketIssuer: Send + Sync {
    fn candidate(&self) -> String;
}

/// Issues random ticket numbers from an owned RNG.
pub struct RandomTicketIssuer {
    prefix: String,
    rng: Mutex<StdRng>,
}

impl RandomTicketIssuer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence, for tests and replays.
    pub fn seeded(prefix: impl Into<String>, seed: u64) -> Self {
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TicketIssuer for RandomTicketIssuer {
    fn candidate(&self) -> String {
        let mut rng = self.rng.lock();
        ticket_number(&self.prefix, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seat_is_one() {
        assert_eq!(next_seat_slot(Vec::<&str>::new()), 1);
    }

    #[test]
    fn test_seats_fill_sequentially() {
        assert_eq!(next_seat_slot(["1"]), 2);
        assert_eq!(next_seat_slot(["2", "1", "3"]), 4);
    }

    #[test]
    fn test_freed_seat_is_reused_first() {
        assert_eq!(next_seat_slot(["2", "3"]), 1);
        assert_eq!(next_seat_slot(["1", "3", "4"]), 2);
    }

    #[test]
    fn test_agent_assigned_labels_take_no_slot() {
        assert_eq!(next_seat_slot(["12A", "1", "14C"]), 2);
    }

    #[test]
    fn test_numeric_seat_labels_are_canonical() {
        assert_eq!(canonical_seat("01"), "1");
        assert_eq!(canonical_seat("+1"), "1");
        assert_eq!(canonical_seat(" 7 "), "7");
        assert_eq!(canonical_seat("12A"), "12A");
        assert_eq!(next_seat_slot([canonical_seat("001").as_str()]), 2);
    }

    #[test]
    fn test_ticket_number_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let no = ticket_number("SL", &mut rng);
        assert_eq!(no.len(), 2 + TICKET_DIGITS);
        assert!(no.starts_with("SL"));
        assert!(no[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_seeded_issuer_is_reproducible() {
        let a = RandomTicketIssuer::seeded("T", 42);
        let b = RandomTicketIssuer::seeded("T", 42);
        let first: Vec<String> = (0..3).map(|_| a.candidate()).collect();
        let second: Vec<String> = (0..3).map(|_| b.candidate()).collect();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }
}
