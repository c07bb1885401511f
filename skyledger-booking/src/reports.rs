use std::sync::Arc;

use skyledger_core::access::require;
use skyledger_core::report::{FlightLoad, FlightRevenue, MonthlyRevenue, RouteVolume};
use skyledger_core::repository::ReportRepository;
use skyledger_core::{BookingError, BookingResult, Operation, Role};

pub const DEFAULT_TOP_ROUTES: i64 = 5;

/// Staff-facing analytics over booking history.
pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
}

impl ReportService {
    pub fn new(repo: Arc<dyn ReportRepository>) -> Self {
        Self { repo }
    }

    pub async fn top_routes(&self, role: Option<Role>, limit: Option<i64>) -> BookingResult<Vec<RouteVolume>> {
        require(role, Operation::ViewReports)?;
        let limit = limit.unwrap_or(DEFAULT_TOP_ROUTES);
        if limit <= 0 {
            return Err(BookingError::validation(format!("limit must be positive (got {})", limit)));
        }
        self.repo.top_routes(limit).await
    }

    pub async fn revenue_by_month(&self, role: Option<Role>) -> BookingResult<Vec<MonthlyRevenue>> {
        require(role, Operation::ViewReports)?;
        self.repo.revenue_by_month().await
    }

    pub async fn load_factor(&self, role: Option<Role>) -> BookingResult<Vec<FlightLoad>> {
        require(role, Operation::ViewReports)?;
        self.repo.load_factor().await
    }

    pub async fn revenue_by_flight(&self, role: Option<Role>) -> BookingResult<Vec<FlightRevenue>> {
        require(role, Operation::ViewReports)?;
        self.repo.revenue_by_flight().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyledger_store::{DbClient, SqliteReports};

    async fn service() -> ReportService {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        ReportService::new(Arc::new(SqliteReports::new(db.pool)))
    }

    #[tokio::test]
    async fn test_reports_need_staff() {
        let reports = service().await;
        assert!(matches!(
            reports.load_factor(Some(Role::Customer)).await,
            Err(BookingError::Forbidden { .. })
        ));
        assert!(matches!(reports.revenue_by_month(None).await, Err(BookingError::Forbidden { .. })));
        assert!(reports.revenue_by_flight(Some(Role::Staff)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_must_be_positive() {
        let reports = service().await;
        assert!(matches!(
            reports.top_routes(Some(Role::Admin), Some(0)).await,
            Err(BookingError::Validation(_))
        ));
        assert!(reports.top_routes(Some(Role::Admin), None).await.unwrap().is_empty());
    }
}
