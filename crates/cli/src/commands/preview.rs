use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, mpsc};
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::build::build_site;

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<()>,
}

/// Start preview server with hot reload for local development.
///
/// This command:
/// - Renders the site into a temporary directory with live reload enabled
/// - Serves the rendered pages over HTTP
/// - Watches the site directory and re-renders on change
/// - Tells open pages to reload over server-sent events
pub async fn run(path: PathBuf, port: u16) -> Result<()> {
    println!("🌐 Starting preview server...");
    println!("   Site: {}", path.display());

    let out = tempfile::tempdir().context("Failed to create preview directory")?;
    rebuild(&path, out.path()).await?;

    let (reload_tx, _) = broadcast::channel::<()>(100);
    let state = AppState {
        reload_tx: reload_tx.clone(),
    };

    let app = Router::new()
        .route("/_reload", get(sse_handler))
        .fallback_service(ServeDir::new(out.path()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    watch_files(&path, out.path(), reload_tx).await?;

    server
        .await
        .context("Server task panicked")?
        .context("Server error")?;
    Ok(())
}

async fn rebuild(path: &Path, out: &Path) -> Result<()> {
    let summary = build_site(path, Some(out), true).await?;
    println!("   ✓ Rendered {} pages", summary.manifest.files.len());
    for failure in &summary.failures {
        eprintln!("   ✗ {}: {}", failure.id, failure.error);
    }
    tracing::info!(
        pages = summary.manifest.files.len(),
        failures = summary.failures.len(),
        "preview rebuilt"
    );
    Ok(())
}

/// Watch the site directory, re-render and trigger reload
async fn watch_files(path: &Path, out: &Path, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher =
        notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;

    watcher.watch(path, RecursiveMode::Recursive)?;

    while let Some(event) = rx.recv().await {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
                // Skip hidden and editor backup files, and our own output
                let relevant = event.paths.iter().any(|p| {
                    let filename = p.file_name().unwrap_or_default().to_string_lossy();
                    !filename.starts_with('.') && !filename.ends_with('~') && !p.starts_with(out)
                });
                if !relevant {
                    continue;
                }

                tracing::debug!(paths = ?event.paths, "site changed");
                println!("   📝 File changed, re-rendering...");
                match rebuild(path, out).await {
                    Ok(()) => {
                        let _ = reload_tx.send(());
                    }
                    Err(e) => {
                        let error = format!("{:#}", e);
                        tracing::error!(%error, "rebuild failed");
                        eprintln!("   ✗ Rebuild failed: {}", error);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// SSE endpoint for hot reload
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(()) => yield Ok(Event::default().data("reload")),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
