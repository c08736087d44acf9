//! Output formatting and persistence for availability reports.
//!
//! Writes the daily table as CSV or as an Excel workbook with colored
//! Availability cells, the debug trace as CSV, and JSON or preview summaries
//! to the log.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use rust_xlsxwriter::{Color, Format, Workbook};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::AvailabilityReport;
use crate::analyzers::grade::Severity;
use crate::analyzers::trace::DebugTrace;
use crate::analyzers::types::{Availability, DailyAggregate, Formula, Level};
use crate::fetch::Selection;

const PREVIEW_ROWS: usize = 5;
const SHEET_NAME: &str = "Availability";

/// File name used when `--output` is not given, e.g.
/// `all_plants_string_A_availability.csv`.
pub fn default_output_name(plants: &Selection, level: Level, formula: Formula) -> String {
    let prefix = match plants {
        Selection::All => "all_plants".to_string(),
        Selection::Only(names) if names.len() == 1 => names[0].replace(' ', "_"),
        Selection::Only(_) => "multiple_plants".to_string(),
    };
    format!("{prefix}_{level}_{formula}_availability.csv")
}

fn daily_header(report: &AvailabilityReport) -> Vec<String> {
    let mut header = vec!["Plant".to_string(), "Date".to_string()];
    header.extend(report.trace.id_fields.iter().map(|f| f.to_string()));
    match report.formula {
        Formula::A => header.extend(["Num".to_string(), "Den".to_string()]),
        Formula::B => header.extend(["Act_Wt".to_string(), "Pot_Wt".to_string()]),
    }
    header.extend(["Availability", "Severity", "Color"].map(String::from));
    header
}

/// The two indicator columns the formula is computed from.
fn formula_inputs(formula: Formula, row: &DailyAggregate) -> [f64; 2] {
    match formula {
        Formula::A => [row.sums.num as f64, row.sums.den as f64],
        Formula::B => [row.sums.actual_weight, row.sums.potential_weight],
    }
}

fn daily_row(formula: Formula, row: &DailyAggregate) -> Vec<String> {
    let severity = Severity::of(&row.availability);
    let mut record = vec![
        row.plant().unwrap_or_default().to_string(),
        row.date().format("%Y-%m-%d").to_string(),
    ];
    record.extend(row.ids().iter().cloned());
    record.extend(formula_inputs(formula, row).map(|v| v.to_string()));
    record.push(row.availability.to_string());
    record.push(severity.to_string());
    record.push(severity.color().to_string());
    record
}

/// Writes the daily table, as a workbook when `path` ends in `.xlsx` and as
/// CSV otherwise.
pub fn write_daily(path: &Path, report: &AvailabilityReport) -> Result<()> {
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        write_daily_xlsx(path, report)
    } else {
        write_daily_csv(path, report)
    }
}

/// Writes the daily availability table, replacing any existing file.
pub fn write_daily_csv(path: &Path, report: &AvailabilityReport) -> Result<()> {
    create_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(daily_header(report))?;
    for row in &report.daily {
        writer.write_record(daily_row(report.formula, row))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = report.daily.len(), "Availability table written");
    Ok(())
}

/// Writes the daily table as a single-sheet workbook. Each Availability cell
/// is filled with the color of its severity bucket.
pub fn write_daily_xlsx(path: &Path, report: &AvailabilityReport) -> Result<()> {
    create_parent(path)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, title) in daily_header(report).iter().enumerate() {
        sheet.write_string_with_format(0, u16::try_from(col)?, title, &bold)?;
    }

    for (i, row) in report.daily.iter().enumerate() {
        let r = u32::try_from(i + 1)?;
        let severity = Severity::of(&row.availability);
        let mut col: u16 = 0;

        sheet.write_string(r, col, row.plant().unwrap_or_default())?;
        col += 1;
        sheet.write_string(r, col, row.date().format("%Y-%m-%d").to_string())?;
        col += 1;
        for id in row.ids() {
            sheet.write_string(r, col, id)?;
            col += 1;
        }
        for value in formula_inputs(report.formula, row) {
            sheet.write_number(r, col, value)?;
            col += 1;
        }

        let fill = Format::new().set_background_color(Color::RGB(severity.rgb()));
        match row.availability {
            Availability::Percent(v) => {
                sheet.write_number_with_format(r, col, v, &fill.set_num_format("0.00"))?;
            }
            Availability::Unavailable => {
                sheet.write_string_with_format(r, col, row.availability.to_string(), &fill)?;
            }
        }
        col += 1;
        sheet.write_string(r, col, severity.as_str())?;
        col += 1;
        sheet.write_string(r, col, severity.color())?;
    }

    workbook
        .save(path)
        .with_context(|| format!("saving {}", path.display()))?;

    info!(path = %path.display(), rows = report.daily.len(), "Availability workbook written");
    Ok(())
}

/// JSON shape of one daily row.
#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    plant: Option<&'a str>,
    date: NaiveDate,
    ids: BTreeMap<&'static str, &'a str>,
    num: u64,
    den: u64,
    actual_weight: f64,
    potential_weight: f64,
    availability: Availability,
    severity: Severity,
    color: &'static str,
}

/// Serializes the daily table as a pretty-printed JSON array.
pub fn report_json(report: &AvailabilityReport) -> Result<String> {
    let rows: Vec<JsonRow<'_>> = report
        .daily
        .iter()
        .map(|row| {
            let severity = Severity::of(&row.availability);
            JsonRow {
                plant: row.plant(),
                date: row.date(),
                ids: report
                    .trace
                    .id_fields
                    .iter()
                    .copied()
                    .zip(row.ids().iter().map(String::as_str))
                    .collect(),
                num: row.sums.num,
                den: row.sums.den,
                actual_weight: row.sums.actual_weight,
                potential_weight: row.sums.potential_weight,
                availability: row.availability,
                severity,
                color: severity.color(),
            }
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Logs the daily table as pretty-printed JSON.
pub fn print_json(report: &AvailabilityReport) -> Result<()> {
    info!("{}", report_json(report)?);
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_trace<W: Write>(writer: W, trace: &DebugTrace) -> Result<W> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Plant", "timestamp"];
    header.extend(trace.id_fields.iter().copied());
    header.extend([trace.power_field, trace.irradiance_field]);
    header.extend(["Num", "Den", "Act_Wt", "Pot_Wt"]);
    csv_writer.write_record(&header)?;

    for row in trace.rows() {
        let mut record = vec![
            row.plant.unwrap_or_default().to_string(),
            row.timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        ];
        record.extend(row.ids.iter().cloned());
        record.push(optional(row.power));
        record.push(optional(row.irradiance));
        record.push(row.num.to_string());
        record.push(row.den.to_string());
        record.push(row.actual_weight.to_string());
        record.push(row.potential_weight.to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing trace: {}", e.error()))
}

/// Writes the per-record debug trace. With `gzip`, the file is compressed
/// and `.gz` is appended to the name. Returns the path written.
pub fn write_trace_csv(path: &Path, trace: &DebugTrace, gzip: bool) -> Result<PathBuf> {
    create_parent(path)?;

    let target = if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };

    let file = File::create(&target).with_context(|| format!("creating {}", target.display()))?;
    if gzip {
        let encoder = write_trace(GzEncoder::new(file, Compression::default()), trace)?;
        encoder.finish()?;
    } else {
        write_trace(file, trace)?.flush()?;
    }

    info!(path = %target.display(), records = trace.len(), gzip, "Debug trace written");
    Ok(target)
}

/// Logs the first rows of the table.
pub fn log_preview(report: &AvailabilityReport) {
    let header = daily_header(report).join(" | ");
    info!("Preview: {header}");
    for row in report.daily.iter().take(PREVIEW_ROWS) {
        info!("Preview: {}", daily_row(report.formula, row).join(" | "));
    }
    if report.daily.len() > PREVIEW_ROWS {
        debug!(remaining = report.daily.len() - PREVIEW_ROWS, "Preview truncated");
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}
