//! Business logic services for the Ibali Farm Platform

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub mod prediction;
pub mod records;
pub mod reporting;
pub mod trainer;
pub mod weather;

pub use prediction::{ForecastCache, ForecastService};
pub use records::RecordService;
pub use reporting::ReportingService;
pub use trainer::{SharedTrainerStatus, TrainerStatus};
pub use weather::WeatherContextService;

/// Run an operation under a deadline. Elapsed deadlines become
/// [`AppError::Timeout`] naming the operation.
pub async fn bounded<F, T>(what: &str, limit: Duration, op: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(what.to_string())),
    }
}
