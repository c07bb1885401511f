pub mod events;
pub mod reports;
pub mod service;

pub use events::BookingEvent;
pub use reports::ReportService;
pub use service::{BookingRequest, BookingService};
