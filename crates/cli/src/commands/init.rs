use anyhow::{Context, Result};
use prerender_kit_core::config::MANIFEST_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Escape a string for safe inclusion in a TOML basic string.
///
/// The manifest is written from a commented template rather than through
/// the toml serializer, so values are escaped by hand.
fn toml_escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\x08', "\\b")
        .replace('\x0C', "\\f")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Title from the directory name: `my-site` -> `My Site`
fn title_from_dir(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("My Site");

    let title: Vec<String> = name
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if title.is_empty() {
        "My Site".to_string()
    } else {
        title.join(" ")
    }
}

/// Scaffold a site directory with a manifest and sample pages
pub async fn run(path: PathBuf, title: Option<String>) -> Result<()> {
    println!("Initializing site directory: {}", path.display());

    let manifest_path = path.join(MANIFEST_FILE);
    if manifest_path.exists() {
        anyhow::bail!(
            "{} already exists at {}\nHint: Delete it first or use a different directory",
            MANIFEST_FILE,
            manifest_path.display()
        );
    }

    let title = title.unwrap_or_else(|| title_from_dir(&path));
    scaffold(&path, &title)?;

    println!("\n✓ Initialization complete!");
    println!("\nGenerated structure:");
    println!("  {}/", path.display());
    println!("  ├── {}       ← Route tree and site settings", MANIFEST_FILE);
    println!("  ├── pages/");
    println!("  │   ├── home.md");
    println!("  │   └── posts.md");
    println!("  └── posts/");
    println!("      └── hello.md");

    println!("\nNext steps:");
    println!("  1. Point site.entry_client at your client bundle");
    println!("  2. List your routes: prerender-kit routes {}", path.display());
    println!("  3. Preview: prerender-kit preview {}", path.display());

    Ok(())
}

fn scaffold(base: &Path, title: &str) -> Result<()> {
    fs::create_dir_all(base.join("pages")).context("Failed to create pages directory")?;
    fs::create_dir_all(base.join("posts")).context("Failed to create posts directory")?;

    fs::write(base.join(MANIFEST_FILE), manifest_template(title))
        .with_context(|| format!("Failed to write {}", MANIFEST_FILE))?;
    fs::write(
        base.join("pages/home.md"),
        format!("# {}\n\nWelcome! This page is pre-rendered at build time.\n", title),
    )?;
    fs::write(
        base.join("pages/posts.md"),
        "# Posts\n\nEverything published so far.\n",
    )?;
    fs::write(
        base.join("posts/hello.md"),
        "# Hello, world\n\nThe first post.\n",
    )?;

    Ok(())
}

fn manifest_template(title: &str) -> String {
    format!(
        r##"[site]
title = "{}"
lang = "en"
# Client bundle that hydrates the pre-rendered markup
entry_client = "/assets/entry-client.js"
# Element the client app mounts into
mount_id = "app"

[build]
out_dir = "dist"

[[route]]
path = "/"
content = "pages/home.md"

  [[route.children]]
  path = "posts"
  content = "pages/posts.md"

    # Dynamic routes need their concrete values listed
    [[route.children.children]]
    path = ":slug"
    content = "posts/{{slug}}.md"
    static_paths = ["hello"]
"##,
        toml_escape_string(title)
    )
}
