use anyhow::Result;
use std::path::PathBuf;

use super::site::load_site;

pub async fn run(path: PathBuf) -> Result<()> {
    let site = load_site(&path)?;
    let targets = site.routes.targets();

    println!("{} ({} pages)", site.manifest.site.title, targets.len());
    for target in &targets {
        println!("  {:<30} {}", target.route_path, target.file);
    }

    Ok(())
}
