use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::json::records_from_document;
use super::{FetchQuery, MeasurementSource, display_name};
use crate::analyzers::types::Level;
use crate::records::{MeasurementBatch, MeasurementRecord, PLANT_FIELD};

const PLANT_DIR_PREFIX: &str = "plant=";

/// Reads plant folders laid out as
///
/// ```text
/// <root>/plant=<Name>/<level>.csv
/// <root>/plant=<Name>/<level>.jsonl
/// ```
///
/// where `<level>` is `plant`, `inverter`, `mppt` or `string`. CSV wins when
/// both exist.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn plant_dir(&self, plant: &str) -> PathBuf {
        self.root.join(format!("{PLANT_DIR_PREFIX}{plant}"))
    }
}

#[async_trait::async_trait]
impl MeasurementSource for DirectorySource {
    async fn list_plants(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || load_plant_ids(&root)).await?
    }

    async fn fetch(&self, plant: &str, query: &FetchQuery) -> Result<MeasurementBatch> {
        let dir = self.plant_dir(plant);
        let plant_name = display_name(plant);
        let query = query.clone();

        tokio::task::spawn_blocking(move || -> Result<MeasurementBatch> {
            let batch = load_level(&dir, query.level)?;
            if batch.is_empty() {
                return Ok(batch);
            }
            let mut batch = batch.with_default_column(PLANT_FIELD, &plant_name);
            let before = batch.len();
            batch.retain(|record| query.keep(record));
            debug!(
                dir = %dir.display(),
                loaded = before,
                kept = batch.len(),
                "Plant data loaded"
            );
            Ok(batch)
        })
        .await?
    }
}

fn load_plant_ids(root: &Path) -> Result<Vec<String>> {
    let mut plants = Vec::new();

    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(dir_name) = entry.file_name().to_str() {
            if let Some(plant) = dir_name.strip_prefix(PLANT_DIR_PREFIX) {
                if !plant.is_empty() {
                    plants.push(plant.to_string());
                }
            }
        }
    }

    plants.sort();
    Ok(plants)
}

fn load_level(dir: &Path, level: Level) -> Result<MeasurementBatch> {
    let csv_path = dir.join(format!("{level}.csv"));
    if csv_path.exists() {
        return load_csv(&csv_path);
    }

    let jsonl_path = dir.join(format!("{level}.jsonl"));
    if jsonl_path.exists() {
        return load_jsonl(&jsonl_path, level);
    }

    debug!(dir = %dir.display(), %level, "No data file for level");
    Ok(MeasurementBatch::default())
}

fn load_csv(path: &Path) -> Result<MeasurementBatch> {
    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let fields: HashMap<String, String> =
            result.with_context(|| format!("reading {}", path.display()))?;
        records.push(MeasurementRecord::new(fields));
    }

    Ok(MeasurementBatch::new(columns, records))
}

fn load_jsonl(path: &Path, level: Level) -> Result<MeasurementBatch> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), i + 1))?;
        let rows = records_from_document(doc, level)
            .with_context(|| format!("{}:{}", path.display(), i + 1))?;
        records.extend(rows);
    }

    Ok(MeasurementBatch::from_records(records))
}
