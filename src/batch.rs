//! Multi-plant orchestration: fetch and compute every plant independently,
//! then concatenate the results in the order the plants were requested.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use crate::analyzers::{AvailabilityReport, EngineConfig, EngineError, calculate_availability};
use crate::fetch::{FetchQuery, MeasurementSource, display_name};

/// Why a plant contributed no rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    Engine(EngineError),
    FetchFailed(String),
    TaskFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => f.write_str("no data"),
            SkipReason::Engine(e) => write!(f, "{e}"),
            SkipReason::FetchFailed(e) => write!(f, "fetch failed: {e}"),
            SkipReason::TaskFailed(e) => write!(f, "task failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPlant {
    pub plant: String,
    pub reason: SkipReason,
}

/// Combined result of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub report: AvailabilityReport,
    pub processed: Vec<String>,
    pub skipped: Vec<SkippedPlant>,
}

impl BatchOutcome {
    pub fn has_output(&self) -> bool {
        !self.processed.is_empty()
    }
}

/// Runs the engine for each plant, at most `concurrency` at a time.
///
/// A failing plant is logged and recorded in [`BatchOutcome::skipped`]; it
/// never aborts the others.
#[tracing::instrument(
    skip(source, plants, query),
    fields(plants = plants.len(), level = %config.level, formula = %config.formula)
)]
pub async fn run_batch(
    source: Arc<dyn MeasurementSource>,
    plants: &[String],
    query: &FetchQuery,
    config: EngineConfig,
    concurrency: usize,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(plants.len());

    for plant in plants {
        let source = source.clone();
        let semaphore = semaphore.clone();
        let query = query.clone();
        let plant_id = plant.clone();

        let span = tracing::info_span!("process_plant", plant = %display_name(plant));

        let task = tokio::spawn(
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return Err(SkipReason::TaskFailed("concurrency limiter closed".into()));
                };
                process_plant(source.as_ref(), &plant_id, &query, &config).await
            }
            .instrument(span),
        );
        tasks.push((plant.clone(), task));
    }

    let mut outcome = BatchOutcome {
        report: AvailabilityReport::empty(&config),
        processed: Vec::new(),
        skipped: Vec::new(),
    };

    for (plant, task) in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(plant = %plant, error = %e, "Plant task failed");
                Err(SkipReason::TaskFailed(e.to_string()))
            }
        };

        match result {
            Ok(report) => {
                outcome.report.append(report);
                outcome.processed.push(plant);
            }
            Err(reason) => outcome.skipped.push(SkippedPlant { plant, reason }),
        }
    }

    info!(
        processed = outcome.processed.len(),
        skipped = outcome.skipped.len(),
        rows = outcome.report.daily.len(),
        "Batch complete"
    );
    outcome
}

async fn process_plant(
    source: &dyn MeasurementSource,
    plant: &str,
    query: &FetchQuery,
    config: &EngineConfig,
) -> Result<AvailabilityReport, SkipReason> {
    let batch = source.fetch(plant, query).await.map_err(|e| {
        error!(error = %format!("{e:#}"), "Fetching plant data failed");
        SkipReason::FetchFailed(format!("{e:#}"))
    })?;

    if batch.is_empty() {
        warn!(level = %config.level, "No data for plant");
        return Err(SkipReason::NoData);
    }

    let mut report = calculate_availability(&batch, config).map_err(|e| {
        error!(error = %e, "Availability computation failed");
        SkipReason::Engine(e)
    })?;

    if report.is_empty() {
        warn!(level = %config.level, records = batch.len(), "No availability rows for plant");
        return Err(SkipReason::NoData);
    }

    let name = display_name(plant);
    for row in &mut report.daily {
        if row.key.plant.is_none() {
            row.key.plant = Some(name.clone());
        }
    }

    info!(rows = report.daily.len(), records = report.trace.len(), "Plant processed");
    Ok(report)
}
