//! JSON export of benchmark summaries.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::runner::BenchmarkReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize benchmark results: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write benchmark results to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Summaries keyed by `"<model>:<strategy>"`, pretty-printed with a trailing newline.
pub fn export_json(report: &BenchmarkReport) -> Result<String, ExportError> {
    let mut root = Map::new();
    for result in &report.approaches {
        root.insert(result.summary.key(), serde_json::to_value(&result.summary)?);
    }
    let mut out = serde_json::to_string_pretty(&Value::Object(root))?;
    out.push('\n');
    Ok(out)
}

/// Write [`export_json`] output to `path`, creating parent directories.
pub fn write_export(path: impl AsRef<Path>, report: &BenchmarkReport) -> Result<(), ExportError> {
    let path = path.as_ref();
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = export_json(report)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)?;

    tracing::info!(
        target: "nova.ai.bench",
        path = %path.display(),
        approaches = report.approaches.len(),
        "exported benchmark results"
    );
    Ok(())
}
