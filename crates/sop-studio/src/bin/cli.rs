//! Command-line interface for SOP Studio
//!
//! `serve` runs the server, `submit` uploads a recording to a running
//! server and waits for the result.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sop_studio::{
    config::AppConfig, server::SopServer, Artifacts, MediaPayload, PollOutcome, StatusClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turn meeting recordings into SOPs
#[derive(Parser, Debug)]
#[command(name = "sop-studio", version, about = "Turn meeting recordings into SOPs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH", env = "SOP_STUDIO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// Upload a recording and wait for its documents
    Submit {
        /// Audio or video file
        file: PathBuf,

        /// Server URL (overrides client.server_url)
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// MIME type, guessed from the extension when omitted
        #[arg(long, value_name = "TYPE")]
        mime_type: Option<String>,

        /// Which document to print
        #[arg(long, value_enum, default_value_t = Output::Sop)]
        output: Output,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECONDS")]
        max_wait: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Transcript,
    Sop,
    Summary,
    ActionItems,
    KeyInfo,
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sop_studio=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = AppConfig::load(cli.config.as_deref())?;
            let server = SopServer::new(config)?;
            eprintln!("Listening on http://{}", server.address());
            server.start().await?;
        }
        Commands::Submit {
            file,
            server,
            mime_type,
            output,
            max_wait,
        } => {
            // Submitting needs no generation backend, so skip full validation
            let mut config = match cli.config.as_deref() {
                Some(path) => AppConfig::from_toml_str(
                    &std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?,
                )?,
                None => AppConfig::default(),
            };
            if let Some(server) = server {
                config.client.server_url = server;
            }
            if max_wait.is_some() {
                config.client.max_poll_secs = max_wait;
            }

            let media = read_media(&file, mime_type.as_deref())?;
            let artifacts = submit(&config, &media).await?;
            print_output(&artifacts, output)?;
        }
    }

    Ok(())
}

fn read_media(path: &Path, mime_type: Option<&str>) -> anyhow::Result<MediaPayload> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let guessed = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string());
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MediaPayload::new(
        file_name,
        mime_type.or(guessed.as_deref()),
        data,
    )?)
}

async fn submit(config: &AppConfig, media: &MediaPayload) -> anyhow::Result<Artifacts> {
    let client = StatusClient::new(&config.client)?;
    let id = client
        .start(media)
        .await
        .with_context(|| format!("starting a job on {}", config.client.server_url))?;

    let spinner = create_spinner()?;
    spinner.set_message(format!("Job {} queued", id));

    let outcome = client
        .wait_with_progress(id, |message| spinner.set_message(message.to_string()))
        .await;
    spinner.finish_and_clear();

    match outcome {
        PollOutcome::Completed(artifacts) => Ok(*artifacts),
        PollOutcome::Failed(message) => bail!("Job failed: {}", message),
        PollOutcome::ConnectionLost(reason) => {
            bail!("Lost connection to {}: {}", config.client.server_url, reason)
        }
        PollOutcome::TimedOut => bail!("Gave up waiting for job {}", id),
    }
}

fn create_spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn print_output(artifacts: &Artifacts, output: Output) -> anyhow::Result<()> {
    match output {
        Output::Transcript => println!("{}", artifacts.transcript),
        Output::Sop => println!("{}", artifacts.sop),
        Output::Summary => println!("{}", artifacts.summary),
        Output::ActionItems => println!("{}", artifacts.action_items),
        Output::KeyInfo => println!("{}", serde_json::to_string_pretty(&artifacts.key_info)?),
        Output::All => println!("{}", serde_json::to_string_pretty(artifacts)?),
    }
    Ok(())
}
