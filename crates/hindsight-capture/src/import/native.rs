use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::CaptureError;
use crate::trajectory::RawTrajectory;

/// Import trajectories stored in Hindsight's own JSON layout.
pub struct NativeImporter;

impl NativeImporter {
    /// Import a file holding either a single trajectory or an array of them.
    pub fn import_file(path: &Path) -> Result<Vec<RawTrajectory>, CaptureError> {
        let content = std::fs::read_to_string(path)?;
        let file_hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        let mut trajectories = parse_native(&content)?;

        if trajectories.len() == 1 {
            trajectories[0].source_hash = Some(file_hash);
        } else {
            // Each entry in a batch file gets its own hash from file + index.
            for (i, t) in trajectories.iter_mut().enumerate() {
                t.source_hash = Some(format!("{:x}", Sha256::digest(format!("{file_hash}:{i}"))));
            }
        }
        Ok(trajectories)
    }
}

pub(crate) fn parse_native(content: &str) -> Result<Vec<RawTrajectory>, CaptureError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let trajectories = if value.is_array() {
        serde_json::from_value::<Vec<RawTrajectory>>(value)?
    } else {
        vec![serde_json::from_value::<RawTrajectory>(value)?]
    };
    for t in &trajectories {
        t.validate()?;
    }
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_single() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"instance_id":"django-1","repo":"django/django","success":true,
                "steps":[{"action":"open","observation":"ok"},{"action":"submit"}]}"#,
        )
        .unwrap();

        let out = NativeImporter::import_file(&path).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].total_steps(), 2);
        assert_eq!(out[0].source_hash.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_import_batch_has_distinct_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");
        std::fs::write(
            &path,
            r#"[{"instance_id":"a","success":true,"steps":[]},
                {"instance_id":"b","success":false,"steps":[]}]"#,
        )
        .unwrap();

        let out = NativeImporter::import_file(&path).unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].source_hash, out[1].source_hash);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(parse_native("{not json"), Err(CaptureError::Json(_))));
        assert!(matches!(
            parse_native(r#"{"instance_id":"a","success":true,"steps":[{"action":" "}]}"#),
            Err(CaptureError::InvalidTrajectory(_))
        ));
    }
}
