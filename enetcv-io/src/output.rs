//! Result writers.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use enetcv_core::cv::outer::FoldSummary;
use enetcv_core::{PredictionOutcome, PredictionStats};

fn prediction_columns(prefix: &str, k: usize) -> Vec<String> {
    if k == 1 {
        vec![prefix.to_string()]
    } else {
        (0..k).map(|c| format!("{}_class{}", prefix, c + 1)).collect()
    }
}

/// Write held-out predictions as TSV, one row per sample (1-based).
///
/// Multi-class runs get one probability column per class and the
/// predicted label, mapped through `class_values` when given.
pub fn write_predictions(path: &Path, outcome: &PredictionOutcome, class_values: Option<&[f64]>) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create predictions file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let k = outcome.predictions.ncols();
    let mut header = vec!["sample".to_string()];
    header.extend(prediction_columns("prediction", k));
    if outcome.predictions_deconf.is_some() {
        header.extend(prediction_columns("prediction_deconf", k));
    }
    if outcome.predicted_labels.is_some() {
        header.push("predicted_label".to_string());
    }
    writeln!(writer, "{}", header.join("\t"))?;

    for i in 0..outcome.predictions.nrows() {
        let mut fields = vec![(i + 1).to_string()];
        fields.extend(outcome.predictions.row(i).iter().map(|v| format!("{:.6}", v)));
        if let Some(deconf) = &outcome.predictions_deconf {
            fields.extend(deconf.row(i).iter().map(|v| format!("{:.6}", v)));
        }
        if let Some(labels) = &outcome.predicted_labels {
            let label = labels[i];
            fields.push(match class_values.and_then(|v| v.get(label)) {
                Some(value) => value.to_string(),
                None => label.to_string(),
            });
        }
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Report<'a> {
    stats: &'a PredictionStats,
    folds: &'a [FoldSummary],
}

/// Write statistics and per-fold selections as pretty-printed JSON.
/// Non-finite values are written as null.
pub fn write_stats_json(path: &Path, outcome: &PredictionOutcome) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create stats file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let report = Report {
        stats: &outcome.stats,
        folds: &outcome.folds,
    };
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
