use std::path::Path;

use crate::error::CaptureError;
use crate::import::native::NativeImporter;
use crate::import::swe_agent::SweAgentImporter;
use crate::trajectory::RawTrajectory;

/// A recognized trajectory file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Native,
    SweAgent,
}

impl ImportFormat {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Native => "Hindsight trajectory JSON",
            Self::SweAgent => "SWE-agent trajectory",
        }
    }
}

/// Choose an importer from the file extension, then from the JSON shape.
pub fn detect_format(path: &Path, contents: &str) -> Option<ImportFormat> {
    if path.extension().is_some_and(|e| e == "traj") {
        return Some(ImportFormat::SweAgent);
    }
    let value: serde_json::Value = serde_json::from_str(contents).ok()?;
    let first = match &value {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    if first.get("trajectory").is_some_and(|t| t.is_array()) {
        Some(ImportFormat::SweAgent)
    } else if first.get("steps").is_some_and(|s| s.is_array()) {
        Some(ImportFormat::Native)
    } else {
        None
    }
}

/// Detect the format of `path` and import every trajectory it holds.
pub fn import_path(path: &Path) -> Result<Vec<RawTrajectory>, CaptureError> {
    let contents = std::fs::read_to_string(path)?;
    let format = detect_format(path, &contents).ok_or_else(|| {
        CaptureError::Import(format!("unrecognized trajectory format: {}", path.display()))
    })?;
    tracing::debug!("Importing {} as {}", path.display(), format.description());
    match format {
        ImportFormat::Native => NativeImporter::import_file(path),
        ImportFormat::SweAgent => Ok(vec![SweAgentImporter::import_file(path)?]),
    }
}
