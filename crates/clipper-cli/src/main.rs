use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipper_cli::commands::{self, ClipArgs};
use clipper_cli::CliQuality;
use clipper_client::ClientConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Clip service base URL (overrides CLIPPER_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a clip and download it
    Clip {
        #[arg(short, long)]
        url: String,
        #[arg(short, long, help = "Clip start (HH:MM:SS or MM:SS), prompted if omitted")]
        start: Option<String>,
        #[arg(short, long, help = "Clip end (HH:MM:SS or MM:SS), prompted if omitted")]
        end: Option<String>,
        #[arg(short, long, value_enum, default_value_t = CliQuality::P720)]
        quality: CliQuality,
        #[arg(short, long, help = "Download directory (overrides CLIPPER_DOWNLOAD_DIR)")]
        output: Option<PathBuf>,
    },
    /// Show the credit cost of a clip
    Estimate {
        #[arg(short, long)]
        start: String,
        #[arg(short, long)]
        end: String,
        #[arg(short, long, value_enum, default_value_t = CliQuality::P720)]
        quality: CliQuality,
    },
    /// Show remaining credits
    Credits,
    /// Cancel a running job
    Cancel {
        process_id: String,
        #[arg(long, default_value = "manual")]
        reason: String,
    },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose { "clipper=debug" } else { "clipper=warn" };
    let env_filter = EnvFilter::from_default_env().add_directive(default_level.parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(verbose)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    info!("Using clip service at {}", config.base_url);

    match cli.command {
        Commands::Clip {
            url,
            start,
            end,
            quality,
            output,
        } => {
            let args = ClipArgs {
                url,
                start,
                end,
                quality: quality.into(),
                output,
            };
            commands::cmd_clip(config, args).await?;
        }
        Commands::Estimate {
            start,
            end,
            quality,
        } => {
            commands::cmd_estimate(&start, &end, quality.into())?;
        }
        Commands::Credits => commands::cmd_credits(config).await?,
        Commands::Cancel { process_id, reason } => {
            commands::cmd_cancel(config, process_id, reason).await?
        }
    }

    Ok(())
}
