pub mod access;
pub mod booking;
pub mod catalog;
pub mod error;
pub mod identifiers;
pub mod pii;
pub mod report;
pub mod repository;

pub use access::{authorize, Decision, Operation, Role};
pub use booking::{
    Booking, BookingPatch, BookingRecord, BookingStatus, Confirmation, Reservation,
    ReserveRequest, Ticket, TicketClass,
};
pub use error::{BookingError, BookingResult};
pub use identifiers::{RandomTicketIssuer, TicketIssuer};
pub use pii::Masked;
