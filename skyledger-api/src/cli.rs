//! The `skyledger` command surface.
//!
//! Every command prints one JSON document on stdout. Failures are reported as an
//! [`ErrorReport`] on stderr by the binary, which exits with the error's status.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use skyledger_booking::BookingRequest;
use skyledger_catalog::NewUser;
use skyledger_core::catalog::{NewFlight, NewPassenger};
use skyledger_core::error::ErrorReport;
use skyledger_core::{BookingError, Masked, Role, TicketClass};
use skyledger_store::app_config::Config;
use skyledger_store::seed::seed_demo;
use skyledger_store::DbClient;

use crate::state::{AppState, AuthConfig};

#[derive(Debug, Parser)]
#[command(name = "skyledger", version, about = "Airline operations and booking ledger")]
pub struct Cli {
    /// Role of the caller. Commands that need none run anonymously.
    #[arg(long, env = "SKYLEDGER_ROLE", global = true)]
    pub role: Option<Role>,

    /// Overrides `database.url` from the configuration files.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply the schema migrations.
    InitDb,
    /// Insert demo airports, aircraft, passengers and one flight.
    Seed,
    AddPassenger {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    ListPassengers,
    ListFlights,
    AddFlight {
        #[arg(long)]
        code: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// RFC 3339, e.g. 2030-01-01T08:30:00Z
        #[arg(long)]
        departure: DateTime<Utc>,
        #[arg(long)]
        arrival: DateTime<Utc>,
        #[arg(long)]
        aircraft_id: i64,
        /// Base fare in major units, e.g. 199.50
        #[arg(long, value_parser = parse_money, allow_hyphen_values = true)]
        price: i64,
    },
    Book {
        #[arg(long, required_unless_present = "email", conflicts_with = "email")]
        passenger_id: Option<i64>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, required_unless_present = "flight_code", conflicts_with = "flight_code")]
        flight_id: Option<i64>,
        #[arg(long)]
        flight_code: Option<String>,
        #[arg(long, default_value = "ECONOMY")]
        class: TicketClass,
        /// Fare in major units; the flight's base price when omitted.
        #[arg(long, value_parser = parse_money, allow_hyphen_values = true)]
        price: Option<i64>,
        #[arg(long)]
        seat: Option<String>,
    },
    CancelBooking {
        #[arg(long)]
        booking_id: i64,
    },
    ListBookings {
        #[arg(long)]
        passenger_id: Option<i64>,
    },
    TopRoutes {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
    RevenueByMonth,
    LoadFactor,
    RevenueByFlight,
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Role granted to the new account.
        #[arg(long)]
        account_role: Role,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("{0:#}")]
    Startup(#[from] anyhow::Error),

    #[error("could not encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Booking(err) => err.exit_code(),
            CommandError::Startup(_) => 15,
            CommandError::Encode(_) => 16,
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            CommandError::Booking(err) => err.report(),
            CommandError::Startup(_) => ErrorReport {
                error: "STARTUP",
                message: self.to_string(),
            },
            CommandError::Encode(_) => ErrorReport {
                error: "ENCODE",
                message: self.to_string(),
            },
        }
    }
}

/// Parses an amount in major units ("199.50", "12", "0.5") into cents.
pub fn parse_money(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let invalid = || format!("'{}' is not an amount like 199.50", raw);
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > 2 {
        return Err(format!("'{}' has more than two decimal places", raw));
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let cents: i64 = format!("{:0<2}", fraction).parse().map_err(|_| invalid())?;
    let total = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(invalid)?;

    Ok(if negative { -total } else { total })
}

fn to_json<T: Serialize>(value: T) -> Result<Value, CommandError> {
    Ok(serde_json::to_value(value)?)
}

/// Loads configuration, connects and runs one command.
pub async fn run(cli: Cli) -> Result<Value, CommandError> {
    let mut config = Config::load().map_err(anyhow::Error::from)?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let db = DbClient::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("could not open {}: {}", config.database.url, e))?;

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let state = AppState::new(&db, &config.booking, auth);

    execute(&db, &state, cli.role, cli.command).await
}

pub async fn execute(
    db: &DbClient,
    state: &AppState,
    role: Option<Role>,
    command: Command,
) -> Result<Value, CommandError> {
    match command {
        Command::InitDb => {
            db.migrate().await.map_err(anyhow::Error::from)?;
            Ok(json!({ "migrated": true }))
        }
        Command::Seed => {
            let summary = seed_demo(&db.pool).await?;
            info!(?summary, "Seeded demo data");
            to_json(summary)
        }
        Command::AddPassenger { name, email } => {
            let passenger = state
                .catalog
                .add_passenger(role, NewPassenger { name, email })
                .await?;
            to_json(passenger)
        }
        Command::ListPassengers => to_json(state.catalog.list_passengers(role).await?),
        Command::ListFlights => to_json(state.catalog.list_flights(role).await?),
        Command::AddFlight {
            code,
            origin,
            destination,
            departure,
            arrival,
            aircraft_id,
            price,
        } => {
            let input = NewFlight {
                code,
                origin,
                destination,
                departure_time: departure,
                arrival_time: arrival,
                aircraft_id,
                base_price_cents: price,
            };
            to_json(state.catalog.add_flight(role, input).await?)
        }
        Command::Book {
            passenger_id,
            email,
            flight_id,
            flight_code,
            class,
            price,
            seat,
        } => {
            let passenger_id = match (passenger_id, email) {
                (Some(id), _) => id,
                (None, Some(email)) => state.catalog.find_passenger_by_email(role, &email).await?.id,
                (None, None) => return Err(BookingError::validation("a passenger is required").into()),
            };
            let flight_id = match (flight_id, flight_code) {
                (Some(id), _) => id,
                (None, Some(code)) => state.catalog.find_flight_by_code(role, &code).await?.id,
                (None, None) => return Err(BookingError::validation("a flight is required").into()),
            };

            let request = BookingRequest {
                passenger_id,
                flight_id,
                class,
                price_cents: price,
                seat_no: seat,
            };
            to_json(state.bookings.book(role, &request).await?)
        }
        Command::CancelBooking { booking_id } => to_json(state.bookings.cancel(role, booking_id).await?),
        Command::ListBookings { passenger_id } => match passenger_id {
            Some(id) => to_json(state.bookings.bookings_for_passenger(role, id).await?),
            None => to_json(state.bookings.list_bookings(role).await?),
        },
        Command::TopRoutes { limit } => to_json(state.reports.top_routes(role, Some(limit)).await?),
        Command::RevenueByMonth => to_json(state.reports.revenue_by_month(role).await?),
        Command::LoadFactor => to_json(state.reports.load_factor(role).await?),
        Command::RevenueByFlight => to_json(state.reports.revenue_by_flight(role).await?),
        Command::AddUser {
            username,
            password,
            account_role,
        } => {
            let input = NewUser {
                username,
                password: Masked(password),
                role: account_role,
            };
            to_json(state.accounts.add_user(role, input).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyledger_store::app_config::BookingRules;

    fn test_auth() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 60,
        }
    }

    async fn seeded() -> (DbClient, AppState) {
        let db = DbClient::in_memory().await.unwrap();
        let state = AppState::new(&db, &BookingRules::default(), test_auth());
        execute(&db, &state, None, Command::InitDb).await.unwrap();
        execute(&db, &state, None, Command::Seed).await.unwrap();
        (db, state)
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("199.50"), Ok(19950));
        assert_eq!(parse_money("12"), Ok(1200));
        assert_eq!(parse_money("0.5"), Ok(50));
        assert_eq!(parse_money(".05"), Ok(5));
        assert_eq!(parse_money("-3.00"), Ok(-300));
        assert!(parse_money("1.999").is_err());
        assert!(parse_money("12,50").is_err());
        assert!(parse_money("").is_err());
    }

    #[test]
    fn test_book_by_email_and_code() {
        let cli = Cli::try_parse_from([
            "skyledger",
            "--role",
            "staff",
            "book",
            "--email",
            "adnan@example.com",
            "--flight-code",
            "SL101",
            "--class",
            "business",
            "--price",
            "250",
        ])
        .unwrap();

        assert_eq!(cli.role, Some(Role::Staff));
        match cli.command {
            Command::Book {
                passenger_id,
                email,
                flight_code,
                class,
                price,
                ..
            } => {
                assert_eq!(passenger_id, None);
                assert_eq!(email.as_deref(), Some("adnan@example.com"));
                assert_eq!(flight_code.as_deref(), Some("SL101"));
                assert_eq!(class, TicketClass::Business);
                assert_eq!(price, Some(25000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_book_requires_passenger_and_flight() {
        assert!(Cli::try_parse_from(["skyledger", "book", "--flight-id", "1"]).is_err());
        assert!(Cli::try_parse_from(["skyledger", "book", "--passenger-id", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "skyledger",
            "book",
            "--passenger-id",
            "1",
            "--email",
            "a@b.c",
            "--flight-id",
            "1",
        ])
        .is_err());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(Cli::try_parse_from(["skyledger", "--role", "pilot", "list-flights"]).is_err());
    }

    #[tokio::test]
    async fn test_book_and_cancel_through_commands() {
        let (db, state) = seeded().await;
        let role = Some(Role::Staff);

        let booked = execute(
            &db,
            &state,
            role,
            Command::Book {
                passenger_id: None,
                email: Some("adnan@example.com".to_string()),
                flight_id: None,
                flight_code: Some("SL101".to_string()),
                class: TicketClass::Economy,
                price: None,
                seat: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(booked["price_cents"], json!(19950));
        let booking_id = booked["booking_id"].as_i64().unwrap();

        let cancelled = execute(&db, &state, role, Command::CancelBooking { booking_id })
            .await
            .unwrap();
        assert_eq!(cancelled["status"], json!("CANCELLED"));

        let listed = execute(&db, &state, role, Command::ListBookings { passenger_id: None })
            .await
            .unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_exit_codes_do_not_collide() {
        let startup = CommandError::Startup(anyhow::anyhow!("no config"));
        assert_eq!(startup.exit_code(), 15);
        assert_eq!(startup.report().error, "STARTUP");

        let booking_codes: Vec<u8> = [
            BookingError::validation("x"),
            BookingError::Unauthenticated("x".into()),
            BookingError::storage(std::io::Error::other("disk")),
        ]
        .iter()
        .map(BookingError::exit_code)
        .collect();
        // 2 is what clap exits with on a usage error.
        assert!(!booking_codes.contains(&2));
        assert!(!booking_codes.contains(&startup.exit_code()));
    }

    #[tokio::test]
    async fn test_customer_add_user_exits_forbidden() {
        let (db, state) = seeded().await;

        let err = execute(
            &db,
            &state,
            Some(Role::Customer),
            Command::AddUser {
                username: "mallory".to_string(),
                password: "pw".to_string(),
                account_role: Role::Admin,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.report().error, "FORBIDDEN");
    }
}
