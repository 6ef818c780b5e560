//! Batch generation of FLIX templates from Cadence repositories
//!
//! Each configured repository is shallow-cloned, its interaction paths are
//! expanded to `.cdc` files, and every file is handed to
//! `flow-cli flix generate`. Outputs land in
//! `<out_dir>/<owner-repo>/<file-stem>.json`.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Errors that can occur while generating templates
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to read generator config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse generator config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("cannot derive a repository name from '{0}'")]
    RepositoryName(String),
    #[error("invalid interaction path '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },
}

/// One repository to generate templates from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub git_url: String,
    /// Glob patterns relative to the repository root
    pub interaction_paths: Vec<String>,
}

/// Repository list loaded from TOML (`[[repository]]` tables)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "repository", default)]
    pub repositories: Vec<Repository>,
}

impl GeneratorConfig {
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, GenerateError> {
        Ok(toml::from_str(content)?)
    }
}

/// Outcome of generating one repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub repository: String,
    pub generated: usize,
    pub failed: usize,
}

/// `owner-repo` from a git URL
pub fn repository_name(git_url: &str) -> Result<String, GenerateError> {
    let path = match git_url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(""),
        None => git_url.split_once(':').map(|(_, path)| path).unwrap_or(""),
    };
    let segments: Vec<&str> = path
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    match segments.as_slice() {
        [.., owner, repo] => Ok(format!("{}-{}", owner, repo)),
        _ => Err(GenerateError::RepositoryName(git_url.to_string())),
    }
}

/// Cadence files under `root` matching any of `patterns`, sorted
pub fn find_cadence_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, GenerateError> {
    let base = glob::Pattern::escape(&root.display().to_string());
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let full = format!("{}/{}", base, pattern.trim_start_matches('/'));
        let entries = glob::glob(&full).map_err(|source| GenerateError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() && path.extension().is_some_and(|e| e == "cdc") => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable path"),
            }
        }
    }
    Ok(files.into_iter().collect())
}

async fn run_command(program: &Path, args: &[&OsStr]) -> Result<(), GenerateError> {
    let program_name = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| GenerateError::Spawn {
            program: program_name.clone(),
            source,
        })?;
    if output.status.success() {
        return Ok(());
    }
    Err(GenerateError::Exited {
        program: program_name,
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

async fn remove_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(dir = %dir.display(), error = %err, "failed to clean up"),
    }
}

/// Drives git and flow-cli over a repository list
#[derive(Debug, Clone)]
pub struct Generator {
    flow_cli: PathBuf,
    git: PathBuf,
    work_dir: PathBuf,
    out_dir: PathBuf,
}

impl Generator {
    pub fn new(flow_cli: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            flow_cli: flow_cli.into(),
            git: PathBuf::from("git"),
            work_dir: std::env::temp_dir().join("flix-generate"),
            out_dir: out_dir.into(),
        }
    }

    /// Set the git executable
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    /// Set the directory repositories are cloned into
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Process every repository in order; one failing repository does not
    /// stop the rest
    pub async fn run(&self, config: &GeneratorConfig) -> Vec<Result<GenerationReport, GenerateError>> {
        let mut reports = Vec::with_capacity(config.repositories.len());
        for repository in &config.repositories {
            let result = self.generate_repository(repository).await;
            match &result {
                Ok(report) => info!(
                    repository = %report.repository,
                    generated = report.generated,
                    failed = report.failed,
                    "generated templates"
                ),
                Err(err) => error!(git_url = %repository.git_url, error = %err, "repository failed"),
            }
            reports.push(result);
        }
        reports
    }

    pub async fn generate_repository(
        &self,
        repository: &Repository,
    ) -> Result<GenerationReport, GenerateError> {
        let name = repository_name(&repository.git_url)?;
        let checkout = self.work_dir.join(&name);

        remove_dir(&checkout).await;
        let result = self.clone_and_generate(&name, &checkout, repository).await;
        remove_dir(&checkout).await;
        result
    }

    async fn clone_and_generate(
        &self,
        name: &str,
        checkout: &Path,
        repository: &Repository,
    ) -> Result<GenerationReport, GenerateError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        info!(git_url = %repository.git_url, dir = %checkout.display(), "cloning");
        run_command(
            &self.git,
            &[
                OsStr::new("clone"),
                OsStr::new("--depth"),
                OsStr::new("1"),
                OsStr::new(&repository.git_url),
                checkout.as_os_str(),
            ],
        )
        .await?;

        self.generate_checkout(name, checkout, &repository.interaction_paths)
            .await
    }

    /// Generate templates for an already checked out repository
    pub async fn generate_checkout(
        &self,
        name: &str,
        checkout: &Path,
        patterns: &[String],
    ) -> Result<GenerationReport, GenerateError> {
        let files = find_cadence_files(checkout, patterns)?;
        let out_dir = self.out_dir.join(name);
        tokio::fs::create_dir_all(&out_dir).await?;

        let mut seen = BTreeSet::new();
        let mut jobs = Vec::new();
        let mut failed = 0;
        for file in files {
            let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if !seen.insert(stem.clone()) {
                warn!(file = %file.display(), "output name already taken, skipping");
                failed += 1;
                continue;
            }
            let out = out_dir.join(format!("{}.json", stem));
            jobs.push(async move {
                let result = run_command(
                    &self.flow_cli,
                    &[
                        OsStr::new("flix"),
                        OsStr::new("generate"),
                        file.as_os_str(),
                        OsStr::new("--save"),
                        out.as_os_str(),
                    ],
                )
                .await;
                (file, result)
            });
        }

        let mut generated = 0;
        for (file, result) in join_all(jobs).await {
            match result {
                Ok(()) => generated += 1,
                Err(err) => {
                    failed += 1;
                    warn!(file = %file.display(), error = %err, "flix generate failed");
                }
            }
        }

        Ok(GenerationReport {
            repository: name.to_string(),
            generated,
            failed,
        })
    }
}
