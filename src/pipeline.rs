//! Per-document compilation: read, parse, resolve, generate, write.
//!
//! [`Pipeline::process_document`] is the boundary where every per-document
//! error is caught; callers always get a [`PipelineOutcome`] back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::CompilerConfig;
use crate::error::{CompilerError, Result};
use crate::llm_client::LlmClient;
use crate::parser::parse_document;
use crate::resolver::{resolve_output, ResolvedOutput};

/// A generated file waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub content: String,
}

impl OutputArtifact {
    /// Create parent directories and write, replacing any existing file.
    ///
    /// # Returns
    ///
    /// Ok once the file is on disk, otherwise a `Write` error naming the
    /// path that could not be created or written
    pub async fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CompilerError::Write { path: parent.to_path_buf(), source })?;
        }
        tokio::fs::write(&self.path, &self.content)
            .await
            .map_err(|source| CompilerError::Write { path: self.path.clone(), source })
    }
}

/// Result of compiling one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success { output_path: PathBuf, language: String },
    Failure { path: PathBuf, error: String },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn to_json(&self) -> Value {
        match self {
            PipelineOutcome::Success { output_path, language } => json!({
                "success": true,
                "outputPath": output_path.display().to_string(),
                "language": language,
            }),
            PipelineOutcome::Failure { path, error } => json!({
                "success": false,
                "path": path.display().to_string(),
                "error": error,
            }),
        }
    }
}

pub struct Pipeline {
    client: LlmClient,
    default_language: String,
}

impl Pipeline {
    /// Build a pipeline with its own client
    ///
    /// # Arguments
    ///
    /// * `config` - Credentials, endpoint and default language
    ///
    /// # Returns
    ///
    /// The pipeline, or an error if the HTTP client cannot be built
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        Ok(Self::with_client(LlmClient::new(config)?, config.default_language.clone()))
    }

    /// Build a pipeline around an existing client
    ///
    /// # Arguments
    ///
    /// * `client` - Client used for every compilation
    /// * `default_language` - Language for documents without `@language`
    pub fn with_client(client: LlmClient, default_language: impl Into<String>) -> Self {
        Self {
            client,
            default_language: default_language.into(),
        }
    }

    /// Compile one document. Never returns an error; failures are logged and
    /// folded into [`PipelineOutcome::Failure`].
    ///
    /// # Arguments
    ///
    /// * `path` - Document to read
    ///
    /// # Returns
    ///
    /// The output path and language on success, or the failing path and
    /// error message
    pub async fn process_document(&self, path: &Path) -> PipelineOutcome {
        info!(path = %path.display(), "Processing file");
        match self.run(path).await {
            Ok(resolved) => {
                info!(output = %resolved.output_path.display(), language = %resolved.language, "Code generated successfully");
                PipelineOutcome::Success {
                    output_path: resolved.output_path,
                    language: resolved.language,
                }
            }
            Err(e) => {
                error!(path = %path.display(), "Error processing file: {}", e);
                PipelineOutcome::Failure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run(&self, path: &Path) -> Result<ResolvedOutput> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CompilerError::Read { path: path.to_path_buf(), source })?;

        let document = parse_document(&raw);
        let resolved = resolve_output(&document, path, &self.default_language);

        let code = self.client.compile(&document.instructions, &resolved.language).await?;

        OutputArtifact {
            path: resolved.output_path.clone(),
            content: code,
        }
        .write()
        .await?;

        Ok(resolved)
    }

    /// Compile several documents concurrently.
    ///
    /// # Arguments
    ///
    /// * `paths` - Documents to compile
    ///
    /// # Returns
    ///
    /// One outcome per path, in the order the paths were given
    pub async fn process_many(self: &Arc<Self>, paths: &[PathBuf]) -> Vec<PipelineOutcome> {
        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().cloned().enumerate() {
            let pipeline = Arc::clone(self);
            tasks.spawn(async move { (index, pipeline.process_document(&path).await) });
        }

        let mut outcomes: Vec<Option<PipelineOutcome>> = vec![None; paths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!("Compilation task failed: {}", e),
            }
        }

        outcomes
            .into_iter()
            .zip(paths)
            .map(|(outcome, path)| {
                outcome.unwrap_or_else(|| PipelineOutcome::Failure {
                    path: path.clone(),
                    error: "compilation task aborted".to_string(),
                })
            })
            .collect()
    }
}
