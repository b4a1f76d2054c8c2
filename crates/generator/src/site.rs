// Route tree built from a `prerender.toml` site manifest.

use crate::loader::{Loader, LoaderOutput};
use crate::markdown::{first_heading, render_markdown};
use crate::routes::{RouteNode, RouteTree};
use anyhow::Context;
use async_trait::async_trait;
use leptos::prelude::*;
use prerender_kit_core::config::{RouteEntry, SiteManifest};
use prerender_kit_core::{Params, Result};
use serde_json::json;
use std::path::{Component, Path, PathBuf};

/// Build the route tree described by `manifest`; content paths resolve
/// against `site_dir`.
pub fn route_tree(manifest: &SiteManifest, site_dir: &Path) -> Result<RouteTree> {
    let routes = manifest
        .routes
        .iter()
        .map(|entry| route_node(entry, site_dir))
        .collect();
    RouteTree::new(routes)
}

fn route_node(entry: &RouteEntry, site_dir: &Path) -> RouteNode {
    let mut node = RouteNode::new(entry.path.clone()).static_paths(entry.static_paths.clone());

    if let Some(content) = &entry.content {
        let route = entry.path.clone();
        node = node
            .loader(ContentLoader {
                site_dir: site_dir.to_path_buf(),
                template: content.to_string_lossy().into_owned(),
            })
            .view(move |ctx| {
                let html = ctx
                    .data
                    .as_ref()
                    .and_then(|d| d.get("html"))
                    .and_then(|h| h.as_str())
                    .unwrap_or_default()
                    .to_string();
                let route = route.clone();
                view! {
                    <section data-route=route>
                        <div class="content" inner_html=html></div>
                        {ctx.outlet}
                    </section>
                }
                .into_any()
            });
    }

    node.children(entry.children.iter().map(|c| route_node(c, site_dir)))
}

/// Reads a route's content file, rendering Markdown when the extension
/// says so and passing anything else through as HTML.
pub struct ContentLoader {
    site_dir: PathBuf,
    /// Relative path, may contain `{param}` placeholders
    template: String,
}

#[async_trait]
impl Loader for ContentLoader {
    async fn load(&self, params: &Params) -> anyhow::Result<LoaderOutput> {
        let relative = fill_placeholders(&self.template, params)?;
        let relative = Path::new(&relative);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            anyhow::bail!(
                "Content path '{}' escapes the site directory",
                relative.display()
            );
        }

        let path = self.site_dir.join(relative);
        let source = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_markdown = relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));

        let (html, title) = if is_markdown {
            (render_markdown(&source), first_heading(&source))
        } else {
            (source, None)
        };

        tracing::debug!(path = %path.display(), bytes = html.len(), "loaded content");
        Ok(LoaderOutput::Data(json!({ "html": html, "title": title })))
    }
}

/// Replace `{name}` placeholders with param values
fn fill_placeholders(template: &str, params: &Params) -> anyhow::Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed '{{' in content path '{}'", template))?;
        let name = &after[..end];
        let value = params.get(name).with_context(|| {
            format!(
                "Unknown placeholder '{{{}}}' in content path '{}'",
                name, template
            )
        })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
