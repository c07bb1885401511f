use std::sync::Arc;

use skyledger_booking::{BookingService, ReportService};
use skyledger_catalog::{AccountService, CatalogService};
use skyledger_core::RandomTicketIssuer;
use skyledger_store::app_config::BookingRules;
use skyledger_store::{DbClient, SqliteCatalog, SqliteLedger, SqliteReports, SqliteUsers};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// Services shared by the HTTP handlers and the command surface.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub reports: Arc<ReportService>,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(db: &DbClient, rules: &BookingRules, auth: AuthConfig) -> Self {
        let store = SqliteCatalog::new(db.pool.clone());
        let issuer = Arc::new(RandomTicketIssuer::new(rules.ticket_prefix.clone()));
        let ledger = SqliteLedger::new(db.pool.clone(), issuer, rules.ticket_number_attempts);

        let bookings = BookingService::new(Arc::new(store.clone()), Arc::new(ledger))
            .with_departure_check(rules.recheck_departure);

        Self {
            bookings: Arc::new(bookings),
            reports: Arc::new(ReportService::new(Arc::new(SqliteReports::new(db.pool.clone())))),
            catalog: CatalogService::new(store),
            accounts: AccountService::new(SqliteUsers::new(db.pool.clone())),
            auth,
        }
    }
}
