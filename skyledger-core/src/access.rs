//! Role-based authorization gate.
//!
//! Every service call is checked exactly once against a static table that maps an
//! [`Operation`] to the set of roles allowed to perform it. The table is compiled in;
//! nothing about it can be changed at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BookingError;

/// Role of the calling principal. An unauthenticated caller has no role at all and is
/// represented as `None` wherever a role is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "STAFF" => Ok(Role::Staff),
            "CUSTOMER" => Ok(Role::Customer),
            other => Err(BookingError::validation(format!("unknown role '{}'", other))),
        }
    }
}

/// Symbolic name of every gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    // Catalog reads
    ViewCatalog,

    // Passengers
    AddPassenger,
    LookupPassenger,
    ListPassengers,
    UpdatePassenger,
    DeletePassenger,

    // Bookings
    Book,
    CancelBooking,
    ListPassengerBookings,
    ListBookings,
    UpdateBooking,
    DeleteBooking,

    // Catalog mutation
    AddAirport,
    UpdateAirport,
    DeleteAirport,
    AddAircraft,
    UpdateAircraft,
    DeleteAircraft,
    AddFlight,
    UpdateFlight,
    DeleteFlight,

    // Crew
    ViewCrew,
    AddCrew,
    UpdateCrew,
    DeleteCrew,
    AssignCrew,
    UpdateCrewAssignment,
    DeleteCrewAssignment,

    ViewReports,

    // User accounts
    AddUser,
    ListUsers,
    UpdateUser,
    DeleteUser,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ViewCatalog => "VIEW_CATALOG",
            Operation::AddPassenger => "ADD_PASSENGER",
            Operation::LookupPassenger => "LOOKUP_PASSENGER",
            Operation::ListPassengers => "LIST_PASSENGERS",
            Operation::UpdatePassenger => "UPDATE_PASSENGER",
            Operation::DeletePassenger => "DELETE_PASSENGER",
            Operation::Book => "BOOK",
            Operation::CancelBooking => "CANCEL_BOOKING",
            Operation::ListPassengerBookings => "LIST_PASSENGER_BOOKINGS",
            Operation::ListBookings => "LIST_BOOKINGS",
            Operation::UpdateBooking => "UPDATE_BOOKING",
            Operation::DeleteBooking => "DELETE_BOOKING",
            Operation::AddAirport => "ADD_AIRPORT",
            Operation::UpdateAirport => "UPDATE_AIRPORT",
            Operation::DeleteAirport => "DELETE_AIRPORT",
            Operation::AddAircraft => "ADD_AIRCRAFT",
            Operation::UpdateAircraft => "UPDATE_AIRCRAFT",
            Operation::DeleteAircraft => "DELETE_AIRCRAFT",
            Operation::AddFlight => "ADD_FLIGHT",
            Operation::UpdateFlight => "UPDATE_FLIGHT",
            Operation::DeleteFlight => "DELETE_FLIGHT",
            Operation::ViewCrew => "VIEW_CREW",
            Operation::AddCrew => "ADD_CREW",
            Operation::UpdateCrew => "UPDATE_CREW",
            Operation::DeleteCrew => "DELETE_CREW",
            Operation::AssignCrew => "ASSIGN_CREW",
            Operation::UpdateCrewAssignment => "UPDATE_CREW_ASSIGNMENT",
            Operation::DeleteCrewAssignment => "DELETE_CREW_ASSIGNMENT",
            Operation::ViewReports => "VIEW_REPORTS",
            Operation::AddUser => "ADD_USER",
            Operation::ListUsers => "LIST_USERS",
            Operation::UpdateUser => "UPDATE_USER",
            Operation::DeleteUser => "DELETE_USER",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, including unauthenticated callers.
    Public,
    /// Only callers holding one of the listed roles.
    Roles(&'static [Role]),
}

const ANY_ROLE: &[Role] = &[Role::Customer, Role::Staff, Role::Admin];
const STAFF_OR_ADMIN: &[Role] = &[Role::Staff, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// The policy table.
pub const fn policy(op: Operation) -> Access {
    use Operation::*;
    match op {
        ViewCatalog => Access::Public,

        AddPassenger | LookupPassenger | Book | CancelBooking | ListPassengerBookings => {
            Access::Roles(ANY_ROLE)
        }

        ListPassengers | UpdatePassenger | ListBookings | UpdateBooking | AddAirport
        | UpdateAirport | AddAircraft | UpdateAircraft | AddFlight | UpdateFlight | ViewCrew
        | AddCrew | UpdateCrew | AssignCrew | UpdateCrewAssignment | ViewReports => {
            Access::Roles(STAFF_OR_ADMIN)
        }

        DeletePassenger | DeleteBooking | DeleteAirport | DeleteAircraft | DeleteFlight
        | DeleteCrew | DeleteCrewAssignment | AddUser | ListUsers | UpdateUser | DeleteUser => {
            Access::Roles(ADMIN_ONLY)
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { operation: Operation, reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), BookingError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied { operation, reason } => {
                Err(BookingError::Forbidden { operation, reason })
            }
        }
    }
}

/// Pure decision: may `role` perform `op`?
pub fn authorize(role: Option<Role>, op: Operation) -> Decision {
    match (policy(op), role) {
        (Access::Public, _) => Decision::Allowed,
        (Access::Roles(allowed), Some(role)) if allowed.contains(&role) => Decision::Allowed,
        (Access::Roles(_), Some(role)) => Decision::Denied {
            operation: op,
            reason: format!("role {} may not perform {}", role, op),
        },
        (Access::Roles(_), None) => Decision::Denied {
            operation: op,
            reason: format!("authentication required for {}", op),
        },
    }
}

/// Shorthand used at the top of every service method.
pub fn require(role: Option<Role>, op: Operation) -> Result<(), BookingError> {
    let decision = authorize(role, op);
    if !decision.is_allowed() {
        tracing::warn!(operation = %op, role = ?role, "authorization denied");
    }
    decision.into_result()
}
