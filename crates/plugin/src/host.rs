use crate::{BuildContext, BuildPlugin, EmittedArtifact};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

pub const MANIFEST_FILE: &str = "prerender-manifest.json";

/// Minimal build host driving an ordered list of plugins.
///
/// Artifacts are generated one at a time. A failing artifact is recorded
/// and skipped; it never produces a partial file.
#[derive(Default)]
pub struct BuildHost {
    plugins: Vec<Box<dyn BuildPlugin>>,
}

/// Content generated for one artifact
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub id: String,
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct BuildFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BuildOutput {
    pub files: Vec<GeneratedFile>,
    pub failures: Vec<BuildFailure>,
}

/// Written next to the generated files as `prerender-manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub file: String,
    pub bytes: usize,
    pub sha256: String,
}

impl BuildHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugin(mut self, plugin: impl BuildPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Run every plugin's `build_start`, then resolve and load each
    /// emitted artifact.
    pub async fn build(&self) -> Result<BuildOutput> {
        let mut ctx = BuildContext::default();
        for plugin in &self.plugins {
            plugin
                .build_start(&mut ctx)
                .await
                .with_context(|| format!("Plugin '{}' failed in build_start", plugin.name()))?;
        }

        let mut output = BuildOutput::default();
        for artifact in ctx.into_artifacts() {
            match self.generate(&artifact).await {
                Ok(content) => {
                    tracing::debug!(id = %artifact.id, bytes = content.len(), "generated artifact");
                    output.files.push(GeneratedFile {
                        id: artifact.id,
                        file_name: artifact.file_name,
                        content,
                    });
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::error!(id = %artifact.id, %error, "artifact failed");
                    output.failures.push(BuildFailure {
                        id: artifact.id,
                        error,
                    });
                }
            }
        }

        Ok(output)
    }

    async fn generate(&self, artifact: &EmittedArtifact) -> Result<String> {
        let resolved = self
            .resolve(&artifact.id)
            .await?
            .with_context(|| format!("No plugin claimed '{}'", artifact.id))?;

        for plugin in &self.plugins {
            if let Some(content) = plugin.load(&resolved).await? {
                return Ok(content);
            }
        }

        anyhow::bail!("No plugin supplied content for '{}'", resolved)
    }

    async fn resolve(&self, id: &str) -> Result<Option<String>> {
        for plugin in &self.plugins {
            if let Some(resolved) = plugin.resolve_id(id).await? {
                return Ok(Some(resolved));
            }
        }
        Ok(None)
    }
}

impl BuildOutput {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Write every generated file under `out_dir`, followed by the manifest.
    ///
    /// Files listed in a previous manifest that this build no longer
    /// produces are removed first.
    pub fn write_to(&self, out_dir: &Path) -> Result<BuildManifest> {
        fs::create_dir_all(out_dir).context("Failed to create output directory")?;
        for file in &self.files {
            if escapes(&file.file_name) {
                anyhow::bail!("Refusing to write outside output directory: {}", file.file_name);
            }
        }
        self.remove_stale(out_dir)?;

        let mut entries = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let dst = out_dir.join(&file.file_name);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&dst, &file.content)
                .with_context(|| format!("Failed to write {}", dst.display()))?;

            entries.push(ManifestEntry {
                id: file.id.clone(),
                file: file.file_name.clone(),
                bytes: file.content.len(),
                sha256: format!("{:x}", Sha256::digest(file.content.as_bytes())),
            });
        }

        let manifest = BuildManifest {
            generated_at: Utc::now(),
            files: entries,
        };
        let json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(out_dir.join(MANIFEST_FILE), json).context("Failed to write manifest")?;

        Ok(manifest)
    }

    fn remove_stale(&self, out_dir: &Path) -> Result<()> {
        let Ok(previous) = fs::read_to_string(out_dir.join(MANIFEST_FILE)) else {
            return Ok(());
        };
        let previous: BuildManifest = match serde_json::from_str(&previous) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable previous manifest");
                return Ok(());
            }
        };

        let current: HashSet<&str> = self.files.iter().map(|f| f.file_name.as_str()).collect();
        for entry in previous.files {
            if current.contains(entry.file.as_str()) || escapes(&entry.file) {
                continue;
            }
            let stale = out_dir.join(&entry.file);
            if stale.is_file() {
                tracing::debug!(file = %entry.file, "removing stale output");
                fs::remove_file(&stale)
                    .with_context(|| format!("Failed to remove {}", stale.display()))?;
            }
        }
        Ok(())
    }
}

fn escapes(file_name: &str) -> bool {
    let relative = Path::new(file_name);
    relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}
