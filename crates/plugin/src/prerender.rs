use crate::{BuildContext, BuildPlugin};
use anyhow::Context;
use async_trait::async_trait;
use prerender_kit_generator::PageRenderer;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registers every concrete route as an artifact and renders it on load
pub struct PrerenderPlugin {
    renderer: PageRenderer,
    /// Registered artifact id (the target file) -> route path
    targets: RwLock<HashMap<String, String>>,
}

impl PrerenderPlugin {
    pub fn new(renderer: PageRenderer) -> Self {
        Self {
            renderer,
            targets: RwLock::new(HashMap::new()),
        }
    }

    async fn route_for(&self, id: &str) -> Option<String> {
        self.targets.read().await.get(id).cloned()
    }
}

#[async_trait]
impl BuildPlugin for PrerenderPlugin {
    fn name(&self) -> &str {
        "prerender"
    }

    async fn build_start(&self, ctx: &mut BuildContext) -> anyhow::Result<()> {
        let targets = self.renderer.routes().targets();
        let mut registered = self.targets.write().await;
        registered.clear();

        for target in targets {
            tracing::debug!(route = %target.route_path, file = %target.file, "registering target");
            ctx.emit_artifact(target.file.clone(), target.file.clone());
            registered.insert(target.file, target.route_path);
        }

        tracing::info!(count = registered.len(), "registered prerender targets");
        Ok(())
    }

    async fn resolve_id(&self, id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.targets.read().await.contains_key(id).then(|| id.to_string()))
    }

    async fn load(&self, id: &str) -> anyhow::Result<Option<String>> {
        let Some(route) = self.route_for(id).await else {
            return Ok(None);
        };

        let html = self
            .renderer
            .render(&route)
            .await
            .with_context(|| format!("Failed to render {}", route))?;
        Ok(Some(html))
    }
}
