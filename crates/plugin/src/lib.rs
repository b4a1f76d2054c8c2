// Build-step integration: the hooks a build host calls, the plugin that
// pre-renders routes through them, and a small in-process host.

pub mod host;
pub mod prerender;

pub use host::{BuildFailure, BuildHost, BuildManifest, BuildOutput, GeneratedFile};
pub use prerender::PrerenderPlugin;

use async_trait::async_trait;

/// An artifact a plugin asked the host to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedArtifact {
    /// Identifier later passed to `resolve_id` and `load`
    pub id: String,
    /// Output path relative to the output directory
    pub file_name: String,
}

/// Handed to plugins during `build_start`
#[derive(Debug, Default)]
pub struct BuildContext {
    artifacts: Vec<EmittedArtifact>,
}

impl BuildContext {
    /// Register an artifact to be generated in this build
    pub fn emit_artifact(&mut self, id: impl Into<String>, file_name: impl Into<String>) {
        self.artifacts.push(EmittedArtifact {
            id: id.into(),
            file_name: file_name.into(),
        });
    }

    pub fn artifacts(&self) -> &[EmittedArtifact] {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> Vec<EmittedArtifact> {
        self.artifacts
    }
}

/// Extension points of a build host.
///
/// Every hook declines by default, so a plugin implements only what it
/// needs. Returning `None` from `resolve_id` or `load` lets the next
/// plugin handle the identifier.
#[async_trait]
pub trait BuildPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn build_start(&self, _ctx: &mut BuildContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn resolve_id(&self, _id: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn load(&self, _id: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
