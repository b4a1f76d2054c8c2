use anyhow::{Context, Result};
use prerender_kit_core::config::{MANIFEST_FILE, SiteManifest, parse_manifest};
use prerender_kit_generator::{PageRenderer, RouteTree, Shell, site::route_tree};
use std::path::Path;
use std::sync::Arc;

/// A site directory with its manifest parsed and route tree built
pub struct LoadedSite {
    pub manifest: SiteManifest,
    pub routes: Arc<RouteTree>,
}

impl LoadedSite {
    pub fn renderer(&self, live_reload: bool) -> PageRenderer {
        let shell = Shell::new(self.manifest.site.clone()).with_live_reload(live_reload);
        PageRenderer::new(self.routes.clone(), shell)
    }
}

/// Load prerender.toml from a site directory
pub fn load_site(path: &Path) -> Result<LoadedSite> {
    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let manifest_path = path.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        anyhow::bail!(
            "{} not found in {}\nRun 'prerender-kit init {}' first",
            MANIFEST_FILE,
            path.display(),
            path.display()
        );
    }

    let manifest = parse_manifest(&manifest_path)
        .with_context(|| format!("Failed to parse {}", MANIFEST_FILE))?;
    let routes = route_tree(&manifest, path).context("Invalid route tree")?;

    Ok(LoadedSite {
        manifest,
        routes: Arc::new(routes),
    })
}
