//! Reporting service for analytics and data export
//! Provides dashboard metrics, monthly yield trends, and renderer-ready
//! forecast reports

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use shared::models::{ForecastResult, ModelSummary};

use crate::error::{AppError, AppResult};

/// Months of per-farm history included in a forecast report
const REPORT_HISTORY_MONTHS: u32 = 24;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Monthly yield trend data point
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MonthlyTrendPoint {
    pub period: String,
    pub record_count: i64,
    pub total_yield_tonnes: Decimal,
    pub avg_yield_density: Option<Decimal>,
}

/// Aggregate history for one farm
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FarmHistorySummary {
    pub farm_id: String,
    pub record_count: i64,
    pub first_harvest: Option<NaiveDate>,
    pub latest_harvest: Option<NaiveDate>,
    pub total_yield_tonnes: Decimal,
    pub avg_yield_density: Option<Decimal>,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub total_farms: i64,
    pub total_records: i64,
    pub total_yield_tonnes: Decimal,
    pub avg_yield_density: Option<Decimal>,
    pub latest_harvest: Option<NaiveDate>,
    pub model_version: Option<u64>,
    pub model_holdout_mae: Option<f64>,
}

/// Renderer-ready forecast report for one farm
#[derive(Debug, Serialize)]
pub struct ForecastReport {
    pub farm_id: String,
    pub summary: FarmHistorySummary,
    pub history: Vec<MonthlyTrendPoint>,
    pub series: Vec<ForecastResult>,
    pub generated_at: DateTime<Utc>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics. The model summary comes from the shared slot
    /// rather than the store, so the caller supplies it.
    pub async fn get_dashboard_metrics(
        &self,
        model: Option<ModelSummary>,
    ) -> AppResult<DashboardMetrics> {
        let totals: (i64, i64, Decimal, Option<Decimal>, Option<NaiveDate>) = sqlx::query_as(
            r#"
            SELECT
                COUNT(DISTINCT farm_id) as total_farms,
                COUNT(*) as total_records,
                COALESCE(SUM(yield_quantity), 0) as total_yield_tonnes,
                CASE WHEN COALESCE(SUM(area_hectares), 0) > 0
                    THEN SUM(yield_quantity) / SUM(area_hectares)
                    ELSE NULL
                END as avg_yield_density,
                MAX(harvest_date) as latest_harvest
            FROM harvest_records
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            total_farms: totals.0,
            total_records: totals.1,
            total_yield_tonnes: totals.2,
            avg_yield_density: totals.3,
            latest_harvest: totals.4,
            model_version: model.as_ref().map(|m| m.version),
            model_holdout_mae: model.and_then(|m| m.holdout_mae),
        })
    }

    /// Get monthly yield trends across all farms for the last N months
    pub async fn get_monthly_trends(&self, months: u32) -> AppResult<Vec<MonthlyTrendPoint>> {
        let cutoff = months_back(Utc::now().date_naive(), months);

        let trends = sqlx::query_as::<_, MonthlyTrendPoint>(
            r#"
            SELECT
                TO_CHAR(DATE_TRUNC('month', harvest_date), 'YYYY-MM') as period,
                COUNT(*) as record_count,
                COALESCE(SUM(yield_quantity), 0) as total_yield_tonnes,
                CASE WHEN COALESCE(SUM(area_hectares), 0) > 0
                    THEN SUM(yield_quantity) / SUM(area_hectares)
                    ELSE NULL
                END as avg_yield_density
            FROM harvest_records
            WHERE harvest_date >= $1
            GROUP BY DATE_TRUNC('month', harvest_date)
            ORDER BY period ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        Ok(trends)
    }

    /// Get monthly yield trends for one farm
    pub async fn get_farm_trends(
        &self,
        farm_id: &str,
        months: u32,
    ) -> AppResult<Vec<MonthlyTrendPoint>> {
        let cutoff = months_back(Utc::now().date_naive(), months);

        let trends = sqlx::query_as::<_, MonthlyTrendPoint>(
            r#"
            SELECT
                TO_CHAR(DATE_TRUNC('month', harvest_date), 'YYYY-MM') as period,
                COUNT(*) as record_count,
                COALESCE(SUM(yield_quantity), 0) as total_yield_tonnes,
                CASE WHEN COALESCE(SUM(area_hectares), 0) > 0
                    THEN SUM(yield_quantity) / SUM(area_hectares)
                    ELSE NULL
                END as avg_yield_density
            FROM harvest_records
            WHERE farm_id = $1 AND harvest_date >= $2
            GROUP BY DATE_TRUNC('month', harvest_date)
            ORDER BY period ASC
            "#,
        )
        .bind(farm_id)
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        Ok(trends)
    }

    /// Get aggregate history for one farm
    pub async fn get_farm_summary(&self, farm_id: &str) -> AppResult<FarmHistorySummary> {
        let summary = sqlx::query_as::<_, FarmHistorySummary>(
            r#"
            SELECT
                $1 as farm_id,
                COUNT(*) as record_count,
                MIN(harvest_date) as first_harvest,
                MAX(harvest_date) as latest_harvest,
                COALESCE(SUM(yield_quantity), 0) as total_yield_tonnes,
                CASE WHEN COALESCE(SUM(area_hectares), 0) > 0
                    THEN SUM(yield_quantity) / SUM(area_hectares)
                    ELSE NULL
                END as avg_yield_density
            FROM harvest_records
            WHERE farm_id = $1
            "#,
        )
        .bind(farm_id)
        .fetch_one(&self.db)
        .await?;

        if summary.record_count == 0 {
            return Err(AppError::NoHistory(farm_id.to_string()));
        }

        Ok(summary)
    }

    /// Assemble the renderer-ready forecast report. The forecast series is
    /// produced by the forecast pipeline, so the caller supplies it.
    pub async fn get_forecast_report(
        &self,
        farm_id: &str,
        series: Vec<ForecastResult>,
    ) -> AppResult<ForecastReport> {
        let summary = self.get_farm_summary(farm_id).await?;
        let history = self.get_farm_trends(farm_id, REPORT_HISTORY_MONTHS).await?;

        Ok(ForecastReport {
            farm_id: farm_id.to_string(),
            summary,
            history,
            series,
            generated_at: Utc::now(),
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_point(horizon: u32) -> ForecastResult {
        ForecastResult {
            farm_id: "KGL-01".to_string(),
            horizon_months: horizon,
            predicted_yield: 3.8,
            lower_bound: 3.4,
            upper_bound: 4.2,
            model_version: 2,
            generated_at: "2025-08-10T06:30:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_csv_export_has_header_and_rows() {
        let series = vec![series_point(1), series_point(3)];
        let csv = ReportingService::export_to_csv(&series).unwrap();
        let lines: Vec<&str> = csv.trim_end().lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("farm_id"));
        assert!(lines[0].contains("predicted_yield"));
        assert!(lines[1].starts_with("KGL-01,1,"));
        assert!(lines[2].starts_with("KGL-01,3,"));
    }

    #[test]
    fn test_csv_export_of_nothing_is_empty() {
        let csv = ReportingService::export_to_csv::<ForecastResult>(&[]).unwrap();
        assert!(csv.is_empty());
    }

    #[test]
    fn test_months_back() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        assert_eq!(
            months_back(date, 24),
            NaiveDate::from_ymd_opt(2023, 8, 25).unwrap()
        );
    }
}
