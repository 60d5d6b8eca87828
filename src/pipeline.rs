//! End-to-end orchestration from raw OHLCV series to per-unit model reports.
//!
//! A *unit* is one (ticker, horizon, representation) triple. Indicators,
//! feature selection, and fuzzy encoding are computed once per run and
//! shared by every unit; labels, the scaler, and the models are fit per
//! unit so no statistic crosses a ticker boundary or flows backward from
//! test rows into training.
//!
//! Unit-scoped failures (short history, an unresolvable feature group, a
//! degenerate column under a strict scaler) skip the affected unit and are
//! reported; anything else aborts the run.

use std::fmt;
use std::ops::Range;

use ahash::AHashMap;
use ndarray::s;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::features::IndicatorEngine;
use crate::frame::FeatureMatrix;
use crate::fuzzy::{encode, FamilyAssignment, MembershipSet};
use crate::labeling::{
    build_labels, past_return, LabelConfig, LabeledUnit, TertileCutoffs, TrendClass,
};
use crate::model::{
    evaluate_predictions, one_hot_probabilities, persistence_predictions, search_hyperparameters,
    sorted_importances, Classifier, EvaluationReport, MajorityClassifier, SearchOutcome,
    SoftmaxClassifier,
};
use crate::preprocessing::{forward_fill_columns, MinMaxScaler};
use crate::schema::{OhlcvSeries, SentimentSeries};
use crate::selection::{select_features, SelectionResult};

/// Which input table a unit trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// The correlation-reduced numeric feature table.
    Reduced,
    /// The fuzzy membership table.
    Fuzzy,
}

impl Representation {
    pub const ALL: [Representation; 2] = [Representation::Reduced, Representation::Fuzzy];
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Reduced => write!(f, "reduced"),
            Representation::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Identifies one training unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub ticker: String,
    pub horizon: usize,
    pub representation: Representation,
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/h{}/{}", self.ticker, self.horizon, self.representation)
    }
}

/// Run-level artifacts shared by every unit.
///
/// Everything here is derived once, before the first unit runs, and read
/// only afterwards.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// The full indicator matrix, every computed column for every ticker.
    pub indicators: FeatureMatrix,
    /// Outcome of correlation-based selection, with per-group diagnostics.
    pub selection: SelectionResult,
    /// The indicator matrix restricted to the selected columns.
    pub reduced: FeatureMatrix,
    /// Membership columns for every group whose representative resolved.
    pub fuzzy: FeatureMatrix,
    closes: AHashMap<String, Vec<f64>>,
}

impl PreparedData {
    /// The table a representation trains on.
    pub fn matrix_for(&self, representation: Representation) -> &FeatureMatrix {
        match representation {
            Representation::Reduced => &self.reduced,
            Representation::Fuzzy => &self.fuzzy,
        }
    }

    /// Close prices aligned row-for-row with the ticker's matrix span.
    pub fn close(&self, ticker: &str) -> Option<&[f64]> {
        self.closes.get(ticker).map(Vec::as_slice)
    }

    /// Every unit a run will attempt, in deterministic order: matrix ticker
    /// order, then configured horizon order, then reduced before fuzzy.
    pub fn unit_ids(&self, labels: &LabelConfig) -> Vec<UnitId> {
        let mut ids =
            Vec::with_capacity(self.indicators.ticker_spans().len() * labels.horizons.len() * 2);
        for (ticker, _) in self.indicators.ticker_spans() {
            for &horizon in &labels.horizons {
                for representation in Representation::ALL {
                    ids.push(UnitId {
                        ticker: ticker.to_string(),
                        horizon,
                        representation,
                    });
                }
            }
        }
        ids
    }

    /// Copy of `matrix` with the close column appended, for export.
    ///
    /// `matrix` must keep the full per-ticker row set; sliced tables no
    /// longer line up with the stored close series.
    pub fn with_close_column(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
        let mut close = vec![f64::NAN; matrix.n_rows()];
        for (ticker, span) in matrix.ticker_spans() {
            let series = self.closes.get(ticker).ok_or_else(|| {
                PipelineError::config(format!("no close series stored for ticker '{ticker}'"))
            })?;
            if series.len() != span.len() {
                return Err(PipelineError::config(format!(
                    "ticker '{}': close series has {} rows but the matrix span has {}",
                    ticker,
                    series.len(),
                    span.len()
                )));
            }
            close[span].copy_from_slice(series);
        }
        let mut out = matrix.clone();
        out.push_column("close", close)?;
        Ok(out)
    }
}

/// One unit's model-ready table.
///
/// `rows` holds the kept rows only (those with a defined forward return),
/// forward-filled and scaled with train-fit bounds. Rows `[0, split)` are
/// train; the labels in `labels` are aligned row for row.
#[derive(Debug, Clone)]
pub struct UnitData {
    pub id: UnitId,
    pub rows: FeatureMatrix,
    pub labels: LabeledUnit,
}

impl UnitData {
    /// The train rows as their own table.
    pub fn train_rows(&self) -> Result<FeatureMatrix> {
        self.rows.slice_rows(0..self.labels.split)
    }

    /// The test rows as their own table.
    pub fn test_rows(&self) -> Result<FeatureMatrix> {
        self.rows.slice_rows(self.labels.split..self.labels.n_rows())
    }
}

/// Everything measured for one training unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub id: UnitId,
    pub n_train: usize,
    pub n_test: usize,
    /// Tertile boundaries the classes were cut at, from the train rows.
    pub cutoffs: TertileCutoffs,
    /// Hyperparameter search outcome, including every candidate's score.
    pub search: SearchOutcome,
    /// Test-set evaluation of the refit model.
    pub model: EvaluationReport,
    /// Majority-class baseline on the same test rows.
    pub majority: EvaluationReport,
    /// Persistence baseline: classify the past return with the train cutoffs.
    pub persistence: EvaluationReport,
    /// Mean absolute weight per feature, descending.
    pub importances: Vec<(String, f64)>,
}

/// A unit the run could not train, with the reason it was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedUnit {
    pub id: UnitId,
    pub reason: String,
}

/// Output of a full sequential run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub selection: SelectionResult,
    pub reports: Vec<UnitReport>,
    pub skipped: Vec<SkippedUnit>,
}

/// Orchestrates a full run over loaded input series.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate the configuration and build a pipeline around it.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate().map_err(PipelineError::config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute the run-level artifacts: indicators, selection, and both
    /// model input tables.
    ///
    /// A group whose representative cannot be resolved or encoded loses its
    /// membership columns; the run continues with the groups that worked.
    pub fn prepare(
        &self,
        series: &[OhlcvSeries],
        sentiment: Option<&SentimentSeries>,
    ) -> Result<PreparedData> {
        let engine = IndicatorEngine::new(self.config.indicators.clone());
        let indicators = engine.compute_matrix(series, sentiment)?;
        info!(
            rows = indicators.n_rows(),
            columns = indicators.n_columns(),
            "indicator matrix computed"
        );

        let selection = select_features(&indicators, &self.config.selection)?;
        info!(selected = ?selection.selected, "feature selection complete");
        let reduced = indicators.select(&selection.selected)?;

        let mut fuzzy =
            FeatureMatrix::from_keys(indicators.dates().to_vec(), indicators.tickers().to_vec())?;
        for assignment in &self.config.fuzzy.assignments {
            match self.encode_group(&indicators, &selection, assignment) {
                Ok(set) => {
                    debug!(group = %assignment.group, feature = %set.source, "group fuzzified");
                    for (label, column) in set.columns {
                        fuzzy.push_column(label, column)?;
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!(group = %assignment.group, error = %e, "group left out of the fuzzy table");
                }
                Err(e) => return Err(e),
            }
        }

        let closes = close_by_ticker(&indicators, series)?;
        Ok(PreparedData {
            indicators,
            selection,
            reduced,
            fuzzy,
            closes,
        })
    }

    /// Fuzzify one group's representative over the full pooled column.
    fn encode_group(
        &self,
        indicators: &FeatureMatrix,
        selection: &SelectionResult,
        assignment: &FamilyAssignment,
    ) -> Result<MembershipSet> {
        let chosen = selection.chosen_for(&assignment.group).ok_or_else(|| {
            let ranking = selection
                .groups
                .iter()
                .find(|g| g.group == assignment.group)
                .map(|g| g.ranking.clone())
                .unwrap_or_default();
            PipelineError::UnresolvedGroup {
                group: assignment.group.clone(),
                ranking,
            }
        })?;
        let values =
            indicators
                .column(chosen)
                .ok_or_else(|| PipelineError::MissingRequiredColumn {
                    column: chosen.to_string(),
                    table: "indicators".to_string(),
                })?;
        encode(chosen, values, assignment.family)
    }

    /// Label, forward-fill, and scale one unit's rows without training.
    ///
    /// This is the table the trainer sees, and what the per-unit train/test
    /// artifacts are written from.
    pub fn prepare_unit(&self, prepared: &PreparedData, id: &UnitId) -> Result<UnitData> {
        let close = prepared
            .close(&id.ticker)
            .ok_or_else(|| PipelineError::config(format!("unknown ticker '{}'", id.ticker)))?;
        let matrix = prepared.matrix_for(id.representation);
        let columns = matrix.column_names().to_vec();
        if columns.is_empty() {
            return Err(PipelineError::InsufficientFeatures { available: 0 });
        }
        let span = ticker_span(matrix, &id.ticker)?;

        let labels = build_labels(close, id.horizon, self.config.labels.train_fraction)?;
        let mut unit_rows = matrix.slice_rows(span)?.take_rows(&labels.kept_rows)?;
        forward_fill_columns(&mut unit_rows, &columns)?;

        // Scaler bounds come from the train rows only.
        let scaler = MinMaxScaler::new(self.config.scaler.constant_columns);
        let state = scaler.fit(&unit_rows.slice_rows(0..labels.split)?, &columns)?;
        let rows = scaler.transform(&state, &unit_rows)?;

        Ok(UnitData {
            id: id.clone(),
            rows,
            labels,
        })
    }

    /// Label, scale, search, fit, and evaluate one training unit.
    pub fn run_unit(&self, prepared: &PreparedData, id: &UnitId) -> Result<UnitReport> {
        let unit = self.prepare_unit(prepared, id)?;
        let close = prepared
            .close(&id.ticker)
            .ok_or_else(|| PipelineError::config(format!("unknown ticker '{}'", id.ticker)))?;
        let columns = unit.rows.column_names().to_vec();
        let labels = &unit.labels;
        let split = labels.split;

        let x = unit.rows.to_design(&columns)?;
        let y = labels.class_indices();
        let x_train = x.slice(s![..split, ..]);
        let x_test = x.slice(s![split.., ..]);
        let y_train = &y[..split];
        let y_test = &y[split..];

        debug!(unit = %id, n_train = split, n_test = y_test.len(), "searching hyperparameters");
        let search = search_hyperparameters(
            x_train,
            y_train,
            TrendClass::COUNT,
            id.horizon,
            &self.config.search,
        )?;

        let model = SoftmaxClassifier::fit(&search.best, TrendClass::COUNT, x_train, y_train)?;
        let probabilities = model.predict_proba(x_test);
        let model_report = evaluate_predictions(
            y_test,
            &model.predict(x_test),
            &probabilities.view(),
            TrendClass::COUNT,
        );

        let majority = MajorityClassifier::fit(y_train, TrendClass::COUNT)?;
        let majority_predictions = vec![majority.majority_class(); y_test.len()];
        let majority_probabilities =
            one_hot_probabilities(&majority_predictions, TrendClass::COUNT);
        let majority_report = evaluate_predictions(
            y_test,
            &majority_predictions,
            &majority_probabilities.view(),
            TrendClass::COUNT,
        );

        let past = past_return(close, id.horizon);
        let past_kept: Vec<f64> = labels.kept_rows.iter().map(|&i| past[i]).collect();
        let fallback =
            TrendClass::from_index(majority.majority_class()).unwrap_or(TrendClass::Flat);
        let persistence = persistence_predictions(&past_kept[split..], &labels.cutoffs, fallback);
        let persistence_probabilities = one_hot_probabilities(&persistence, TrendClass::COUNT);
        let persistence_report = evaluate_predictions(
            y_test,
            &persistence,
            &persistence_probabilities.view(),
            TrendClass::COUNT,
        );

        info!(
            unit = %id,
            macro_f1 = model_report.macro_f1,
            majority_f1 = majority_report.macro_f1,
            persistence_f1 = persistence_report.macro_f1,
            "unit evaluated"
        );
        Ok(UnitReport {
            id: id.clone(),
            n_train: split,
            n_test: y_test.len(),
            cutoffs: labels.cutoffs,
            search,
            model: model_report,
            majority: majority_report,
            persistence: persistence_report,
            importances: sorted_importances(&columns, &model.feature_importance()),
        })
    }

    /// Run every unit sequentially.
    ///
    /// Unit-scoped errors skip the unit and are collected; fatal errors
    /// abort immediately.
    pub fn run(
        &self,
        series: &[OhlcvSeries],
        sentiment: Option<&SentimentSeries>,
    ) -> Result<RunOutput> {
        let prepared = self.prepare(series, sentiment)?;
        self.run_prepared(&prepared)
    }

    /// Run every unit sequentially over already-prepared data.
    pub fn run_prepared(&self, prepared: &PreparedData) -> Result<RunOutput> {
        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        for id in prepared.unit_ids(&self.config.labels) {
            match self.run_unit(prepared, &id) {
                Ok(report) => reports.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(unit = %id, error = %e, "unit skipped");
                    skipped.push(SkippedUnit {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            trained = reports.len(),
            skipped = skipped.len(),
            "run complete"
        );
        Ok(RunOutput {
            selection: prepared.selection.clone(),
            reports,
            skipped,
        })
    }
}

fn ticker_span(matrix: &FeatureMatrix, ticker: &str) -> Result<Range<usize>> {
    matrix
        .ticker_spans()
        .into_iter()
        .find(|(t, _)| *t == ticker)
        .map(|(_, span)| span)
        .ok_or_else(|| PipelineError::config(format!("ticker '{ticker}' not in the matrix")))
}

/// Close prices for each ticker, keyed off the matrix spans so a mismatch
/// between the matrix and the input series is caught here.
fn close_by_ticker(
    matrix: &FeatureMatrix,
    series: &[OhlcvSeries],
) -> Result<AHashMap<String, Vec<f64>>> {
    let mut closes = AHashMap::with_capacity(series.len());
    for (ticker, span) in matrix.ticker_spans() {
        let input = series.iter().find(|s| s.ticker == ticker).ok_or_else(|| {
            PipelineError::config(format!("matrix ticker '{ticker}' missing from the input"))
        })?;
        if input.close.len() != span.len() {
            return Err(PipelineError::config(format!(
                "ticker '{}': {} close rows but {} matrix rows",
                ticker,
                input.close.len(),
                span.len()
            )));
        }
        closes.insert(ticker.to_string(), input.close.clone());
    }
    Ok(closes)
}

// ============================================================================
// Tests
// ============================================================================
