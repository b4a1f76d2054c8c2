use crate::loader::LoaderOutput;
use crate::routes::{RouteContext, RouteMatch, RouteTree};
use crate::shell::{DOCTYPE, Shell};
use futures::StreamExt;
use futures::future::try_join_all;
use leptos::prelude::*;
use prerender_kit_core::{Error, Result};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Renders one route path into a complete HTML document
#[derive(Clone)]
pub struct PageRenderer {
    routes: Arc<RouteTree>,
    shell: Shell,
}

/// Loader results for one matched chain, aligned with `RouteMatch::chain`
enum Loaded {
    Data(Vec<Option<Value>>),
    Redirect(String),
}

impl PageRenderer {
    pub fn new(routes: Arc<RouteTree>, shell: Shell) -> Self {
        Self { routes, shell }
    }

    pub fn routes(&self) -> &RouteTree {
        &self.routes
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Render `path` to a document string.
    ///
    /// Loaders run first and must all succeed. The composed document is
    /// streamed chunk by chunk into a buffer, which is only returned once the
    /// stream has finished.
    pub async fn render(&self, path: &str) -> Result<String> {
        let matched = self
            .routes
            .match_path(path)
            .ok_or_else(|| Error::NoMatch(path.to_string()))?;

        tracing::debug!(
            path = %matched.path,
            depth = matched.chain.len(),
            "matched route"
        );

        let view = match load_all(&matched).await? {
            Loaded::Redirect(location) => {
                tracing::info!(path = %matched.path, %location, "loader redirected");
                self.shell.redirect(&location)
            }
            Loaded::Data(data) => self.compose(&matched, data)?,
        };

        serialize(view).await
    }

    fn compose(&self, matched: &RouteMatch<'_>, data: Vec<Option<Value>>) -> Result<AnyView> {
        let mut loader_data = Map::new();
        for (node, value) in matched.chain.iter().zip(&data) {
            if let Some(value) = value {
                loader_data.insert(node.id().to_string(), value.clone());
            }
        }

        // Deepest route with a string "title" in its data names the page
        let page_title = data
            .iter()
            .rev()
            .flatten()
            .find_map(|d| d.get("title").and_then(Value::as_str))
            .map(str::to_string);

        let mut outlet: Option<AnyView> = None;
        for (node, value) in matched.chain.iter().zip(data).rev() {
            if let Some(view) = node.view_fn() {
                let ctx = RouteContext {
                    path: matched.path.clone(),
                    params: matched.params.clone(),
                    data: value,
                    outlet: outlet.take(),
                };
                outlet = Some(view(ctx));
            }
        }

        let hydration = json!({
            "path": matched.path,
            "params": matched.params,
            "loaderData": loader_data,
        });

        let app = outlet.unwrap_or_else(|| ().into_any());
        self.shell.document(app, page_title.as_deref(), &hydration)
    }
}

async fn load_all(matched: &RouteMatch<'_>) -> Result<Loaded> {
    let pending = matched.chain.iter().map(|node| async move {
        let Some(loader) = node.loader_ref() else {
            return Ok(None);
        };
        loader
            .load(&matched.params)
            .await
            .map(Some)
            .map_err(|e| Error::Loader {
                route: matched.path.clone(),
                message: format!("{:#}", e),
            })
    });

    let outputs = try_join_all(pending).await?;

    let mut data = Vec::with_capacity(outputs.len());
    for output in outputs {
        match output {
            Some(LoaderOutput::Redirect(location)) => return Ok(Loaded::Redirect(location)),
            Some(LoaderOutput::Data(value)) => data.push(Some(value)),
            None => data.push(None),
        }
    }
    Ok(Loaded::Data(data))
}

async fn serialize(view: AnyView) -> Result<String> {
    let mut stream = Box::pin(view.to_html_stream_in_order());
    let mut buf = String::from(DOCTYPE);
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        buf.push_str(&chunk);
        chunks += 1;
    }

    if chunks == 0 {
        return Err(Error::Serialize("renderer produced no markup".into()));
    }

    tracing::trace!(chunks, bytes = buf.len(), "serialized document");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteNode;
    use prerender_kit_core::config::SiteConfig;

    fn text(ctx: &RouteContext, key: &str) -> String {
        ctx.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn renderer() -> PageRenderer {
        let tree = RouteTree::new(vec![
            RouteNode::new("/")
                .view(|ctx| view! { <main class="layout">{ctx.outlet}</main> }.into_any())
                .children([
                    RouteNode::index().view(|_| view! { <h1>"Home"</h1> }.into_any()),
                    RouteNode::new("post")
                        .view(|ctx| view! { <section class="posts">{ctx.outlet}</section> }.into_any())
                        .child(
                            RouteNode::new(":slug")
                                .static_paths(["a", "b"])
                                .loader_fn(|params| async move {
                                    Ok(LoaderOutput::Data(json!({
                                        "title": format!("Post {}", params["slug"]),
                                        "body": "<script>alert(1)</script>",
                                    })))
                                })
                                .view(|ctx| {
                                    let title = text(&ctx, "title");
                                    let body = text(&ctx, "body");
                                    view! { <article><h2>{title}</h2><p>{body}</p></article> }
                                        .into_any()
                                }),
                        ),
                    RouteNode::new("broken")
                        .loader_fn(|_| async { Err(anyhow::anyhow!("database offline")) })
                        .view(|_| view! { <p>"never"</p> }.into_any()),
                    RouteNode::new("old")
                        .loader_fn(|_| async { Ok(LoaderOutput::Redirect("/post/a/".into())) }),
                ]),
        ])
        .unwrap();

        PageRenderer::new(Arc::new(tree), Shell::new(SiteConfig::new("Blog")))
    }

    #[tokio::test]
    async fn test_render_index_nests_in_layout() {
        let html = renderer().render("/").await.unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Home</h1>"));
        assert!(html.find(r#"class="layout""#) < html.find("<h1>Home</h1>"));
        assert_eq!(html.matches(r#"id="app""#).count(), 1);
        assert_eq!(html.matches(r#"src="/assets/entry-client.js""#).count(), 1);
        assert!(html.contains("<title>Blog</title>"));
    }

    #[tokio::test]
    async fn test_render_dynamic_route_with_loader_data() {
        let html = renderer().render("/post/b").await.unwrap();

        assert!(html.contains("Post b"));
        assert!(html.contains("<title>Post b | Blog</title>"));
        assert!(html.contains(r#"class="posts""#));
        assert!(html.contains(r#""slug":"b""#));
        assert!(html.contains(r#""0-1-0":"#));
        // Loader strings are text, never markup
        assert!(!html.contains("<script>alert(1)</script>"));
        assert_eq!(html.matches(r#"id="app""#).count(), 1);
        assert_eq!(html.matches(r#"src="/assets/entry-client.js""#).count(), 1);
    }

    #[tokio::test]
    async fn test_render_propagates_loader_failure() {
        let err = renderer().render("/broken").await.unwrap_err();
        match err {
            Error::Loader { route, message } => {
                assert_eq!(route, "/broken");
                assert!(message.contains("database offline"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_render_redirect() {
        let html = renderer().render("/old").await.unwrap();
        assert!(html.contains(r#"content="0; url=/post/a/""#));
        assert!(!html.contains(r#"id="app""#));
    }

    #[tokio::test]
    async fn test_render_unmatched_path() {
        let err = renderer().render("/nowhere/at/all").await.unwrap_err();
        assert!(matches!(err, Error::NoMatch(p) if p == "/nowhere/at/all"));
    }

    #[tokio::test]
    async fn test_render_route_without_views() {
        let tree = RouteTree::new(vec![RouteNode::new("/")]).unwrap();
        let renderer = PageRenderer::new(Arc::new(tree), Shell::new(SiteConfig::new("Empty")));

        let html = renderer.render("/").await.unwrap();
        assert_eq!(html.matches(r#"id="app""#).count(), 1);
    }
}
