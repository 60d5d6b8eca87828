//! Readers and writers for run artifacts.
//!
//! Feature tables go to CSV with `Date` and `Ticker` key columns and one
//! column per feature; missing values are empty fields, not `NaN` literals,
//! so the files load cleanly into spreadsheet and dataframe tools. Per-unit
//! train/test tables carry a trailing integer `label` column. Reports go to
//! pretty-printed JSON.
//!
//! `write_matrix` and `read_matrix` round-trip: reading a written file
//! reproduces the original table including the positions of missing values.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::frame::{FeatureMatrix, DATE_COLUMN, TICKER_COLUMN};
use crate::labeling::TrendClass;
use crate::pipeline::{Pipeline, PreparedData, UnitData, UnitId};

/// Write a feature table as CSV.
pub fn write_matrix(path: impl AsRef<Path>, matrix: &FeatureMatrix) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let mut header = vec![DATE_COLUMN.to_string(), TICKER_COLUMN.to_string()];
    header.extend(matrix.column_names().iter().cloned());
    writer.write_record(&header)?;

    let columns: Vec<&[f64]> = matrix.iter_columns().map(|(_, values)| values).collect();
    let mut record = Vec::with_capacity(header.len());
    for (row, (date, ticker)) in matrix.dates().iter().zip(matrix.tickers()).enumerate() {
        record.clear();
        record.push(date.to_string());
        record.push(ticker.clone());
        for column in &columns {
            let value = column[row];
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a feature table written by [`write_matrix`].
///
/// Empty fields become `NaN`. The first two columns must be the `Date` and
/// `Ticker` keys.
pub fn read_matrix(path: impl AsRef<Path>) -> Result<FeatureMatrix> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for (position, expected) in [DATE_COLUMN, TICKER_COLUMN].into_iter().enumerate() {
        if headers.get(position) != Some(expected) {
            return Err(PipelineError::MissingRequiredColumn {
                column: expected.to_string(),
                table: path.display().to_string(),
            });
        }
    }
    let names: Vec<String> = headers.iter().skip(2).map(String::from).collect();

    let mut dates = Vec::new();
    let mut tickers = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != names.len() + 2 {
            return Err(PipelineError::config(format!(
                "{}: row {} has {} fields, expected {}",
                path.display(),
                line + 2,
                record.len(),
                names.len() + 2
            )));
        }
        let date = record.get(0).unwrap_or_default();
        dates.push(NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            PipelineError::config(format!(
                "{}: row {}: bad date '{}': {}",
                path.display(),
                line + 2,
                date,
                e
            ))
        })?);
        tickers.push(record.get(1).unwrap_or_default().to_string());
        for (column, field) in columns.iter_mut().zip(record.iter().skip(2)) {
            column.push(if field.is_empty() {
                f64::NAN
            } else {
                field.parse().map_err(|e| {
                    PipelineError::config(format!(
                        "{}: row {}: bad number '{}': {}",
                        path.display(),
                        line + 2,
                        field,
                        e
                    ))
                })?
            });
        }
    }

    let mut matrix = FeatureMatrix::from_keys(dates, tickers)?;
    for (name, values) in names.into_iter().zip(columns) {
        matrix.push_column(name, values)?;
    }
    Ok(matrix)
}

/// Name of the class column appended to labeled unit tables.
pub const LABEL_COLUMN: &str = "label";

/// Filesystem-safe file stem for one unit's artifacts.
pub fn unit_stem(id: &UnitId) -> String {
    format!("{}_h{}_{}", id.ticker, id.horizon, id.representation)
}

/// Write one unit's train and test tables.
///
/// Each file carries the unit's scaled feature columns plus a trailing
/// integer `label` column in {0, 1, 2}. Returns the (train, test) paths.
pub fn write_labeled_tables(
    dir: impl AsRef<Path>,
    unit: &UnitData,
) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    let stem = unit_stem(&unit.id);
    let train_path = dir.join(format!("{stem}_train.csv"));
    let test_path = dir.join(format!("{stem}_test.csv"));
    write_labeled(&train_path, &unit.train_rows()?, unit.labels.train_classes())?;
    write_labeled(&test_path, &unit.test_rows()?, unit.labels.test_classes())?;
    Ok((train_path, test_path))
}

fn write_labeled(path: &Path, matrix: &FeatureMatrix, classes: &[TrendClass]) -> Result<()> {
    if matrix.n_rows() != classes.len() {
        return Err(PipelineError::config(format!(
            "{}: {} rows but {} labels",
            path.display(),
            matrix.n_rows(),
            classes.len()
        )));
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![DATE_COLUMN.to_string(), TICKER_COLUMN.to_string()];
    header.extend(matrix.column_names().iter().cloned());
    header.push(LABEL_COLUMN.to_string());
    writer.write_record(&header)?;

    let columns: Vec<&[f64]> = matrix.iter_columns().map(|(_, values)| values).collect();
    let mut record = Vec::with_capacity(header.len());
    for (row, (date, ticker)) in matrix.dates().iter().zip(matrix.tickers()).enumerate() {
        record.clear();
        record.push(date.to_string());
        record.push(ticker.clone());
        for column in &columns {
            let value = column[row];
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        record.push(classes[row].as_index().to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table written by [`write_labeled_tables`] back into its feature
/// columns and class labels.
pub fn read_labeled_table(path: impl AsRef<Path>) -> Result<(FeatureMatrix, Vec<TrendClass>)> {
    let path = path.as_ref();
    let full = read_matrix(path)?;
    let raw = full
        .column(LABEL_COLUMN)
        .ok_or_else(|| PipelineError::MissingRequiredColumn {
            column: LABEL_COLUMN.to_string(),
            table: path.display().to_string(),
        })?;

    let mut classes = Vec::with_capacity(raw.len());
    for (row, &value) in raw.iter().enumerate() {
        let class = (value.is_finite() && value.fract() == 0.0 && value >= 0.0)
            .then(|| TrendClass::from_index(value as usize))
            .flatten()
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "{}: row {}: bad label '{}'",
                    path.display(),
                    row + 2,
                    value
                ))
            })?;
        classes.push(class);
    }

    let names: Vec<String> = full
        .column_names()
        .iter()
        .filter(|n| *n != LABEL_COLUMN)
        .cloned()
        .collect();
    Ok((full.select(&names)?, classes))
}

/// Write any serializable report as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| PipelineError::config(format!("failed to serialize JSON: {e}")))?;
    Ok(())
}

/// Writes the standard artifact set of a run into one directory.
pub struct RunExporter {
    output_dir: PathBuf,
}

impl RunExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Export the feature tables (each with the close column appended for
    /// downstream labeling), the selection diagnostics, and the run summary.
    ///
    /// Returns the paths written, in write order.
    pub fn export_run<T: Serialize>(
        &self,
        prepared: &PreparedData,
        summary: &T,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();

        for (name, matrix) in [
            ("features_full.csv", &prepared.indicators),
            ("features_reduced.csv", &prepared.reduced),
            ("features_fuzzy.csv", &prepared.fuzzy),
        ] {
            if matrix.n_columns() == 0 {
                continue;
            }
            let path = self.output_dir.join(name);
            write_matrix(&path, &prepared.with_close_column(matrix)?)?;
            written.push(path);
        }

        let selection_path = self.output_dir.join("selection.json");
        write_json(&selection_path, &prepared.selection)?;
        written.push(selection_path);

        let summary_path = self.output_dir.join("run_summary.json");
        write_json(&summary_path, summary)?;
        written.push(summary_path);

        info!(
            files = written.len(),
            dir = %self.output_dir.display(),
            "run artifacts exported"
        );
        Ok(written)
    }

    /// Write the per-unit train/test tables under `units/`.
    ///
    /// Unit-scoped failures (short history, an unresolved representation)
    /// skip that unit's tables, matching the run itself; fatal errors
    /// propagate.
    pub fn export_unit_tables(
        &self,
        pipeline: &Pipeline,
        prepared: &PreparedData,
    ) -> Result<Vec<PathBuf>> {
        let dir = self.output_dir.join("units");
        fs::create_dir_all(&dir)?;

        let mut written = Vec::new();
        for id in prepared.unit_ids(&pipeline.config().labels) {
            match pipeline.prepare_unit(prepared, &id) {
                Ok(unit) => {
                    let (train, test) = write_labeled_tables(&dir, &unit)?;
                    written.push(train);
                    written.push(test);
                }
                Err(e) if !e.is_fatal() => {
                    warn!(unit = %id, error = %e, "unit tables not exported");
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            files = written.len(),
            dir = %dir.display(),
            "unit tables exported"
        );
        Ok(written)
    }
}

// ============================================================================
// Tests
// ============================================================================
