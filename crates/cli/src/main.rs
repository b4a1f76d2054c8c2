mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prerender-kit")]
#[command(version, about = "Pre-render every route of a client-routed app to static HTML", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Create a starter site directory with prerender.toml
    Init {
        /// Path to site directory
        path: PathBuf,

        /// Site title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Render every route to HTML
    Build {
        /// Path to site directory
        path: PathBuf,

        /// Output directory (defaults to build.out_dir from prerender.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the output targets the route tree produces
    Routes {
        /// Path to site directory
        path: PathBuf,
    },

    /// Preview the rendered site locally with hot reload
    Preview {
        /// Path to site directory
        path: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init { path, title } => commands::init::run(path, title).await,
        Command::Build { path, output } => commands::build::run(path, output).await,
        Command::Routes { path } => commands::routes::run(path).await,
        Command::Preview { path, port } => commands::preview::run(path, port).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "prerender-kit", &mut io::stdout());
            Ok(())
        }
    }
}
