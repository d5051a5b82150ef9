use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::CaptureError;
use crate::trajectory::{RawStep, RawTrajectory};

const UNKNOWN_REPO: &str = "unknown/unknown";

/// Import a SWE-agent `.traj` file.
pub struct SweAgentImporter;

impl SweAgentImporter {
    pub fn import_file(path: &Path) -> Result<RawTrajectory, CaptureError> {
        let content = std::fs::read_to_string(path)?;
        let instance_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CaptureError::Import(format!("no file name in {}", path.display())))?;
        let mut raw = parse_swe_agent(&instance_id, &content)?;
        raw.source_hash = Some(format!("{:x}", Sha256::digest(content.as_bytes())));
        Ok(raw)
    }
}

#[derive(Debug, Deserialize)]
struct TrajFile {
    #[serde(default)]
    trajectory: Vec<TrajStep>,
    #[serde(default)]
    info: TrajInfo,
}

#[derive(Debug, Deserialize)]
struct TrajStep {
    #[serde(default)]
    action: String,
    #[serde(default)]
    observation: String,
    #[serde(default)]
    thought: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrajInfo {
    #[serde(default)]
    exit_status: Option<String>,
}

pub(crate) fn parse_swe_agent(instance_id: &str, content: &str) -> Result<RawTrajectory, CaptureError> {
    let file: TrajFile = serde_json::from_str(content)?;
    let success = file.info.exit_status.as_deref() == Some("submitted");

    let mut raw = RawTrajectory::new(instance_id, repo_from_instance(instance_id), success);
    raw.steps = file
        .trajectory
        .into_iter()
        .filter_map(|step| {
            // The command verb is the action label; arguments are dropped.
            let label = step.action.split_whitespace().next()?.to_string();
            Some(RawStep {
                action: label,
                observation: step.observation,
                thought: step.thought,
            })
        })
        .collect();
    raw.validate()?;
    Ok(raw)
}

/// `owner__repo-123` → `owner/repo`.
pub fn repo_from_instance(instance_id: &str) -> String {
    let Some((owner, rest)) = instance_id.split_once("__") else {
        return UNKNOWN_REPO.to_string();
    };
    let repo = match rest.rsplit_once('-') {
        Some((name, num)) if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) => name,
        _ => rest,
    };
    if owner.is_empty() || repo.is_empty() {
        return UNKNOWN_REPO.to_string();
    }
    format!("{owner}/{repo}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAJ: &str = r#"{
        "trajectory": [
            {"action": "find_file parser.py", "observation": "Found 1 match", "thought": "look"},
            {"action": "python reproduce.py", "observation": "Traceback (most recent call last):\nValueError: bad date"},
            {"action": "", "observation": "ignored"},
            {"action": "edit 10:12", "observation": "File updated."},
            {"action": "submit", "observation": ""}
        ],
        "info": {"exit_status": "submitted"}
    }"#;

    #[test]
    fn test_parse_traj() {
        let raw = parse_swe_agent("pallets__flask-4992", TRAJ).unwrap();
        assert!(raw.success);
        assert_eq!(raw.repo, "pallets/flask");
        let actions: Vec<&str> = raw.steps.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["find_file", "python", "edit", "submit"]);
        assert_eq!(raw.steps[0].thought, "look");
    }

    #[test]
    fn test_unsubmitted_is_failure() {
        let raw = parse_swe_agent(
            "x",
            r#"{"trajectory":[{"action":"ls"}],"info":{"exit_status":"exit_cost"}}"#,
        )
        .unwrap();
        assert!(!raw.success);
        assert_eq!(raw.repo, UNKNOWN_REPO);
    }

    #[test]
    fn test_repo_from_instance() {
        assert_eq!(repo_from_instance("django__django-11099"), "django/django");
        assert_eq!(repo_from_instance("scikit-learn__scikit-learn-25570"), "scikit-learn/scikit-learn");
        assert_eq!(repo_from_instance("owner__repo"), "owner/repo");
        assert_eq!(repo_from_instance("plain-id"), UNKNOWN_REPO);
    }

    #[test]
    fn test_import_file_uses_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psf__requests-2317.traj");
        std::fs::write(&path, TRAJ).unwrap();
        let raw = SweAgentImporter::import_file(&path).unwrap();
        assert_eq!(raw.instance_id, "psf__requests-2317");
        assert_eq!(raw.repo, "psf/requests");
        assert!(raw.source_hash.is_some());
    }
}
