//! Workflow job loader
//!
//! Load jobs from JSON or YAML files, one job per file.

use std::path::Path;

use super::WorkflowJob;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("JSON parse error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },
}

pub struct JobLoader;

impl JobLoader {
    /// Load every `.json`, `.yaml` and `.yml` job in a directory, sorted by file name
    pub fn load_directory(dir: &Path) -> Result<Vec<WorkflowJob>, LoadError> {
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_job_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|p| Self::load_file(p)).collect()
    }

    pub fn load_file(path: &Path) -> Result<WorkflowJob, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let file = path.display().to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|error| LoadError::Json { file, error }),
            _ => serde_yaml::from_str(&content).map_err(|error| LoadError::Yaml { file, error }),
        }
    }
}

fn is_job_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}
