// Route tree: definition, enumeration of output targets, and path matching.

use crate::loader::{FnLoader, Loader, LoaderOutput};
use leptos::prelude::AnyView;
use prerender_kit_core::{
    CATCH_ALL_PARAM, Error, OutputTarget, Params, Result, Segment, join_path, parse_route_path,
    split_path, validate_static_path,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// Everything a view gets when it renders
pub struct RouteContext {
    /// Normalized path being rendered, e.g. `/post/a`
    pub path: String,
    pub params: Params,
    /// This route's loader data, if it has a loader
    pub data: Option<serde_json::Value>,
    /// The matched child route, already rendered
    pub outlet: Option<AnyView>,
}

pub type ViewFn = Arc<dyn Fn(RouteContext) -> AnyView + Send + Sync>;

/// One node of the route tree
pub struct RouteNode {
    path: String,
    view: Option<ViewFn>,
    loader: Option<Arc<dyn Loader>>,
    static_paths: Vec<String>,
    children: Vec<RouteNode>,
    // Filled in by RouteTree::new
    id: String,
    segments: Vec<Segment>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            view: None,
            loader: None,
            static_paths: Vec::new(),
            children: Vec::new(),
            id: String::new(),
            segments: Vec::new(),
        }
    }

    /// Pathless node: renders at its parent's path
    pub fn index() -> Self {
        Self::new("")
    }

    pub fn view<F>(mut self, view: F) -> Self
    where
        F: Fn(RouteContext) -> AnyView + Send + Sync + 'static,
    {
        self.view = Some(Arc::new(view));
        self
    }

    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn loader_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<LoaderOutput>> + Send + 'static,
    {
        self.loader(FnLoader(f))
    }

    /// Concrete values for a parametrized path, relative to the parent
    pub fn static_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Positional id, e.g. `0-1-0`; stable for a given tree shape
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn view_fn(&self) -> Option<&ViewFn> {
        self.view.as_ref()
    }

    pub(crate) fn loader_ref(&self) -> Option<&Arc<dyn Loader>> {
        self.loader.as_ref()
    }

    fn is_parametrized(&self) -> bool {
        self.segments.iter().any(|s| !s.is_static())
    }
}

/// A validated route tree
pub struct RouteTree {
    routes: Vec<RouteNode>,
}

/// Result of resolving a path against the tree
pub struct RouteMatch<'a> {
    pub path: String,
    pub params: Params,
    /// Matched nodes, outermost first
    pub chain: Vec<&'a RouteNode>,
}

// Segment ranks used to pick between overlapping matches
const RANK_STATIC: u8 = 3;
const RANK_DYNAMIC: u8 = 2;
const RANK_CATCH_ALL: u8 = 1;

struct Candidate<'a> {
    ranks: Vec<u8>,
    chain: Vec<&'a RouteNode>,
    params: Params,
}

impl RouteTree {
    /// Validate route paths and static paths, and assign route ids
    pub fn new(mut routes: Vec<RouteNode>) -> Result<Self> {
        if routes.is_empty() {
            return Err(Error::InvalidRoute("route tree is empty".into()));
        }
        for (i, node) in routes.iter_mut().enumerate() {
            prepare(node, i.to_string())?;
        }
        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[RouteNode] {
        &self.routes
    }

    /// Flatten the tree into output targets, depth-first, parents first.
    ///
    /// Parametrized routes contribute one target per static path; a
    /// target reached twice is kept at its first position.
    pub fn targets(&self) -> Vec<OutputTarget> {
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        for node in &self.routes {
            collect_targets(node, "/", &mut targets, &mut seen);
        }
        targets
    }

    /// Resolve a concrete path to the best matching chain of routes.
    ///
    /// Static segments beat dynamic ones, which beat catch-alls; on a tie
    /// the deeper chain wins so pathless index children render.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let pieces = split_path(path);
        let mut best: Option<Candidate<'_>> = None;
        let mut chain = Vec::new();
        let mut ranks = Vec::new();

        match_nodes(
            &self.routes,
            &pieces,
            &mut chain,
            &mut ranks,
            &Params::new(),
            &mut best,
        );

        best.map(|c| RouteMatch {
            path: join_path("/", path),
            params: c.params,
            chain: c.chain,
        })
    }
}

fn prepare(node: &mut RouteNode, id: String) -> Result<()> {
    node.segments = parse_route_path(&node.path)?;
    node.id = id;

    if node.is_parametrized() {
        for value in &node.static_paths {
            validate_static_path(value, &node.path)?;
            let pieces = split_path(value);
            let fits = match_segments(&node.segments, &pieces)
                .is_some_and(|(consumed, _, _)| consumed == pieces.len());
            if !fits {
                return Err(Error::InvalidRoute(format!(
                    "Static path '{}' does not fit route '{}'",
                    value, node.path
                )));
            }
        }
    } else if !node.static_paths.is_empty() {
        return Err(Error::InvalidRoute(format!(
            "Route '{}' has static paths but no dynamic segment",
            node.path
        )));
    }

    let parent_id = node.id.clone();
    for (i, child) in node.children.iter_mut().enumerate() {
        prepare(child, format!("{}-{}", parent_id, i))?;
    }
    Ok(())
}

fn collect_targets(
    node: &RouteNode,
    parent: &str,
    targets: &mut Vec<OutputTarget>,
    seen: &mut HashSet<String>,
) {
    let paths: Vec<String> = if node.is_parametrized() {
        if node.static_paths.is_empty() {
            tracing::warn!(
                route = %join_path(parent, &node.path),
                "parametrized route has no static paths, skipping"
            );
        }
        node.static_paths
            .iter()
            .map(|value| join_path(parent, value))
            .collect()
    } else {
        vec![join_path(parent, &node.path)]
    };

    for path in paths {
        let target = OutputTarget::from_route_path(&path);
        if seen.insert(target.file.clone()) {
            targets.push(target);
        }
        for child in &node.children {
            collect_targets(child, &path, targets, seen);
        }
    }
}

/// Match a node's segments against the front of `pieces`.
///
/// Returns how many pieces were consumed, the captured params and the
/// rank of each consumed segment.
fn match_segments(segments: &[Segment], pieces: &[&str]) -> Option<(usize, Params, Vec<u8>)> {
    let mut params = Params::new();
    let mut ranks = Vec::with_capacity(segments.len());
    let mut consumed = 0;

    for segment in segments {
        match segment {
            Segment::Static(s) => {
                if pieces.get(consumed) != Some(&s.as_str()) {
                    return None;
                }
                ranks.push(RANK_STATIC);
                consumed += 1;
            }
            Segment::Dynamic(name) => {
                let piece = pieces.get(consumed)?;
                params.insert(name.clone(), piece.to_string());
                ranks.push(RANK_DYNAMIC);
                consumed += 1;
            }
            Segment::CatchAll => {
                // Needs at least one piece; the parent renders the bare path
                if consumed >= pieces.len() {
                    return None;
                }
                params.insert(CATCH_ALL_PARAM.to_string(), pieces[consumed..].join("/"));
                ranks.push(RANK_CATCH_ALL);
                consumed = pieces.len();
            }
        }
    }

    Some((consumed, params, ranks))
}

fn match_nodes<'a>(
    nodes: &'a [RouteNode],
    pieces: &[&str],
    chain: &mut Vec<&'a RouteNode>,
    ranks: &mut Vec<u8>,
    params: &Params,
    best: &mut Option<Candidate<'a>>,
) {
    for node in nodes {
        let Some((consumed, captured, node_ranks)) = match_segments(&node.segments, pieces) else {
            continue;
        };

        let mut params = params.clone();
        params.extend(captured);
        chain.push(node);
        let rank_len = ranks.len();
        ranks.extend(node_ranks);

        let rest = &pieces[consumed..];
        if rest.is_empty() {
            let better = match best {
                None => true,
                Some(current) => {
                    (ranks.as_slice(), chain.len())
                        > (current.ranks.as_slice(), current.chain.len())
                }
            };
            if better {
                *best = Some(Candidate {
                    ranks: ranks.clone(),
                    chain: chain.clone(),
                    params: params.clone(),
                });
            }
        }

        match_nodes(&node.children, rest, chain, ranks, &params, best);

        ranks.truncate(rank_len);
        chain.pop();
    }
}
