use serde::{Deserialize, Serialize};

/// Route ranked by the number of active bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteVolume {
    pub origin: String,
    pub destination: String,
    pub bookings: i64,
}

/// Active-booking revenue for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightLoad {
    pub flight_code: String,
    pub active_tickets: i64,
    pub capacity: i64,
    /// `active_tickets / capacity`, between 0.0 and 1.0.
    pub load_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightRevenue {
    pub flight_code: String,
    pub revenue_cents: i64,
}
