use crate::error::{Error, Result};
use crate::types::{parse_route_path, validate_static_path};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "prerender.toml";

const DEFAULT_LANG: &str = "en";
const DEFAULT_ENTRY_CLIENT: &str = "/assets/entry-client.js";
const DEFAULT_MOUNT_ID: &str = "app";
const DEFAULT_OUT_DIR: &str = "dist";

/// A site described by `prerender.toml`
#[derive(Debug, Clone)]
pub struct SiteManifest {
    pub site: SiteConfig,
    pub build: BuildConfig,
    pub routes: Vec<RouteEntry>,
}

/// Document shell settings shared by every generated page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub title: String,
    pub lang: String,
    pub description: Option<String>,
    /// URL of the client hydration entry point
    pub entry_client: String,
    /// `id` of the element the client app mounts into
    pub mount_id: String,
}

impl SiteConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lang: DEFAULT_LANG.to_string(),
            description: None,
            entry_client: DEFAULT_ENTRY_CLIENT.to_string(),
            mount_id: DEFAULT_MOUNT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Output directory, relative to the manifest
    pub out_dir: PathBuf,
}

/// One declarative route; mirrors the nesting of the route tree
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub path: String,
    /// Markdown or HTML file, may contain `{param}` placeholders
    pub content: Option<PathBuf>,
    pub static_paths: Vec<String>,
    pub children: Vec<RouteEntry>,
}

/// Raw TOML configuration structure
#[derive(Debug, serde::Deserialize)]
struct RawManifest {
    site: RawSite,
    #[serde(default)]
    build: Option<RawBuild>,
    #[serde(default)]
    route: Vec<RawRoute>,
}

#[derive(Debug, serde::Deserialize)]
struct RawSite {
    title: String,
    lang: Option<String>,
    description: Option<String>,
    entry_client: Option<String>,
    mount_id: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RawBuild {
    out_dir: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RawRoute {
    path: String,
    content: Option<String>,
    #[serde(default)]
    static_paths: Vec<String>,
    #[serde(default)]
    children: Vec<RawRoute>,
}

/// Parse prerender.toml from a file path
pub fn parse_manifest<P: AsRef<Path>>(path: P) -> Result<SiteManifest> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

/// Parse prerender.toml from a string (useful for testing)
pub fn parse_manifest_str(content: &str) -> Result<SiteManifest> {
    let raw: RawManifest = toml::from_str(content)?;

    if raw.site.title.trim().is_empty() {
        return Err(Error::ConfigParse("site.title must not be empty".into()));
    }

    let mount_id = raw
        .site
        .mount_id
        .unwrap_or_else(|| DEFAULT_MOUNT_ID.to_string());
    if mount_id.is_empty() || mount_id.contains(char::is_whitespace) {
        return Err(Error::ConfigParse(format!(
            "Invalid site.mount_id '{}': must be a single non-empty token",
            mount_id
        )));
    }

    let site = SiteConfig {
        title: raw.site.title,
        lang: raw.site.lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
        description: raw.site.description,
        entry_client: raw
            .site
            .entry_client
            .unwrap_or_else(|| DEFAULT_ENTRY_CLIENT.to_string()),
        mount_id,
    };

    let out_dir = raw
        .build
        .and_then(|b| b.out_dir)
        .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());
    let build = BuildConfig {
        out_dir: validate_path(&out_dir, "build.out_dir")?,
    };

    if raw.route.is_empty() {
        return Err(Error::ConfigParse(
            "At least one [[route]] is required".into(),
        ));
    }

    let routes = raw
        .route
        .into_iter()
        .map(convert_route)
        .collect::<Result<Vec<_>>>()?;

    Ok(SiteManifest {
        site,
        build,
        routes,
    })
}

fn convert_route(raw: RawRoute) -> Result<RouteEntry> {
    let segments = parse_route_path(&raw.path)?;

    let parametrized = segments.iter().any(|s| !s.is_static());
    if !parametrized && !raw.static_paths.is_empty() {
        return Err(Error::ConfigParse(format!(
            "Route '{}' has static_paths but no dynamic segment",
            raw.path
        )));
    }
    for value in &raw.static_paths {
        validate_static_path(value, &raw.path)?;
    }

    let content = match raw.content {
        Some(c) => Some(validate_path(&c, "route.content")?),
        None => None,
    };

    let children = raw
        .children
        .into_iter()
        .map(convert_route)
        .collect::<Result<Vec<_>>>()?;

    Ok(RouteEntry {
        path: raw.path,
        content,
        static_paths: raw.static_paths,
        children,
    })
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths and parent directory references (`..`) so a
/// manifest cannot read or write outside the site directory.
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_valid_relative() {
        assert!(validate_path("pages/home.md", "route.content").is_ok());
        assert!(validate_path("posts/{slug}.md", "route.content").is_ok());
        assert!(validate_path("dist", "build.out_dir").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_absolute_unix() {
        let result = validate_path("/etc/passwd", "route.content");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Absolute paths not allowed")
        );
    }

    #[test]
    fn test_validate_path_rejects_parent_dir() {
        let result = validate_path("pages/../../secret.md", "route.content");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Parent directory references")
        );
    }

    #[test]
    fn test_validate_path_rejects_empty() {
        assert!(validate_path("", "route.content").is_err());
        assert!(validate_path("   ", "route.content").is_err());
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let toml = r#"
[site]
title = "Blog"

[[route]]
path = "/"
content = "pages/home.md"
        "#;

        let manifest = parse_manifest_str(toml).unwrap();
        assert_eq!(manifest.site.title, "Blog");
        assert_eq!(manifest.site.lang, "en");
        assert_eq!(manifest.site.mount_id, "app");
        assert_eq!(manifest.site.entry_client, "/assets/entry-client.js");
        assert_eq!(manifest.build.out_dir, PathBuf::from("dist"));
        assert_eq!(manifest.routes.len(), 1);
    }

    #[test]
    fn test_parse_nested_manifest() {
        let toml = r#"
[site]
title = "Blog"
lang = "de"
description = "Notes"
entry_client = "/static/client.js"
mount_id = "root"

[build]
out_dir = "public"

[[route]]
path = "/"

  [[route.children]]
  path = "post"
  content = "pages/posts.md"

    [[route.children.children]]
    path = ":slug"
    content = "posts/{slug}.md"
    static_paths = ["a", "b"]
        "#;

        let manifest = parse_manifest_str(toml).unwrap();
        assert_eq!(manifest.site.lang, "de");
        assert_eq!(manifest.site.description.as_deref(), Some("Notes"));
        assert_eq!(manifest.site.mount_id, "root");
        assert_eq!(manifest.build.out_dir, PathBuf::from("public"));

        let post = &manifest.routes[0].children[0];
        assert_eq!(post.path, "post");
        assert_eq!(post.children[0].static_paths, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_manifest_requires_routes() {
        let toml = r#"
[site]
title = "Empty"
        "#;
        let result = parse_manifest_str(toml);
        assert!(result.unwrap_err().to_string().contains("[[route]]"));
    }

    #[test]
    fn test_parse_manifest_rejects_static_paths_on_static_route() {
        let toml = r#"
[site]
title = "Blog"

[[route]]
path = "about"
static_paths = ["x"]
        "#;
        let result = parse_manifest_str(toml);
        assert!(result.unwrap_err().to_string().contains("no dynamic segment"));
    }

    #[test]
    fn test_parse_manifest_rejects_traversal_in_static_paths() {
        let toml = r#"
[site]
title = "Blog"

[[route]]
path = "post/*"
static_paths = ["../../etc"]
        "#;
        assert!(parse_manifest_str(toml).is_err());
    }

    #[test]
    fn test_parse_manifest_rejects_traversal_in_content() {
        let toml = r#"
[site]
title = "Blog"

[[route]]
path = "/"
content = "../outside.md"
        "#;
        let result = parse_manifest_str(toml);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Parent directory references")
        );
    }

    #[test]
    fn test_parse_manifest_rejects_bad_mount_id() {
        let toml = r#"
[site]
title = "Blog"
mount_id = "two words"

[[route]]
path = "/"
        "#;
        assert!(parse_manifest_str(toml).is_err());
    }
}
