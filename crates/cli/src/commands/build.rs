use anyhow::{Context, Result};
use prerender_kit_plugin::{BuildFailure, BuildHost, BuildManifest, PrerenderPlugin};
use std::path::{Path, PathBuf};

use super::site::load_site;

/// Outcome of one build of a site directory
pub struct BuildSummary {
    pub out_dir: PathBuf,
    pub manifest: BuildManifest,
    pub failures: Vec<BuildFailure>,
}

/// Render every route of the site at `path` and write the results.
///
/// `output` overrides the manifest's `build.out_dir`. Failed targets are
/// reported in the summary; the other targets are still written.
pub async fn build_site(path: &Path, output: Option<&Path>, live_reload: bool) -> Result<BuildSummary> {
    let site = load_site(path)?;
    let out_dir = match output {
        Some(dir) => dir.to_path_buf(),
        None => path.join(&site.manifest.build.out_dir),
    };

    let host = BuildHost::new().plugin(PrerenderPlugin::new(site.renderer(live_reload)));
    let output = host.build().await.context("Build failed")?;
    let manifest = output
        .write_to(&out_dir)
        .with_context(|| format!("Failed to write output to {}", out_dir.display()))?;

    Ok(BuildSummary {
        out_dir,
        manifest,
        failures: output.failures,
    })
}

/// Build static site
pub async fn run(path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    println!("🔨 Pre-rendering site...");
    println!("   Source: {}", path.display());
    println!();

    let summary = build_site(&path, output.as_deref(), false).await?;

    for entry in &summary.manifest.files {
        println!("   ✓ {} ({} bytes)", entry.file, entry.bytes);
    }
    for failure in &summary.failures {
        eprintln!("   ✗ {}: {}", failure.id, failure.error);
    }

    println!();
    if !summary.failures.is_empty() {
        anyhow::bail!(
            "{} of {} pages failed to render",
            summary.failures.len(),
            summary.failures.len() + summary.manifest.files.len()
        );
    }

    println!("✅ Build complete!");
    println!("   Pages:  {}", summary.manifest.files.len());
    println!("   Output: {}", summary.out_dir.display());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_site(manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prerender.toml"), manifest).unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        fs::write(dir.path().join("pages/home.md"), "# Home\n").unwrap();
        fs::write(dir.path().join("posts/a.md"), "# A\n").unwrap();
        fs::write(dir.path().join("posts/b.md"), "# B\n").unwrap();
        dir
    }

    const BLOG: &str = r#"
[site]
title = "Blog"

[[route]]
path = "/"
content = "pages/home.md"

  [[route.children]]
  path = "post"

    [[route.children.children]]
    path = "*"
    content = "posts/{*}.md"
    static_paths = ["a", "b"]
    "#;

    #[tokio::test]
    async fn test_build_site_writes_every_target() {
        let dir = create_site(BLOG);
        let summary = build_site(dir.path(), None, false).await.unwrap();

        assert!(summary.failures.is_empty());
        assert_eq!(summary.out_dir, dir.path().join("dist"));

        let files: Vec<&str> = summary.manifest.files.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "index.html",
                "post/index.html",
                "post/a/index.html",
                "post/b/index.html",
            ]
        );

        let parent = fs::read_to_string(dir.path().join("dist/post/index.html")).unwrap();
        assert!(parent.contains("<h1>Home</h1>"));
        assert!(!parent.contains("<h1>A</h1>"));

        let page = fs::read_to_string(dir.path().join("dist/post/b/index.html")).unwrap();
        assert!(page.contains("<h1>B</h1>"));
        assert!(!page.contains("EventSource"));
        assert!(dir.path().join("dist/prerender-manifest.json").exists());
    }

    #[tokio::test]
    async fn test_build_site_output_override_and_live_reload() {
        let dir = create_site(BLOG);
        let out = TempDir::new().unwrap();
        build_site(dir.path(), Some(out.path()), true).await.unwrap();

        let index = fs::read_to_string(out.path().join("index.html")).unwrap();
        assert!(index.contains("EventSource('/_reload')"));
    }

    #[tokio::test]
    async fn test_build_site_reports_missing_content() {
        let dir = create_site(BLOG);
        fs::remove_file(dir.path().join("posts/b.md")).unwrap();

        let summary = build_site(dir.path(), None, false).await.unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].id, "post/b/index.html");
        assert!(!dir.path().join("dist/post/b/index.html").exists());
        assert!(dir.path().join("dist/post/a/index.html").exists());
    }

    #[tokio::test]
    async fn test_build_site_requires_manifest() {
        let dir = TempDir::new().unwrap();
        let result = build_site(dir.path(), None, false).await;
        assert!(result.is_err());
        assert!(
            result
                .err()
                .unwrap()
                .to_string()
                .contains("prerender.toml not found")
        );
    }
}
