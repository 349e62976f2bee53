use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weather_history::config::Config;
use weather_history::history_client::HistoryClient;
use weather_history::table_extractor::ExtractMode;
use weather_history::url_builder::Granularity;
use weather_history::utils::parse_date;

#[derive(Parser)]
#[command(name = "weather-history")]
#[command(about = "Download historical weather observations to CSV", long_about = None)]
struct Cli {
    /// Directory for output files
    #[arg(long, global = true, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Page layout to parse: auto, structured or legacy
    #[arg(long, global = true, env = "EXTRACT_MODE")]
    mode: Option<ExtractMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a single day (h), month (d) or custom range (c)
    Fetch {
        /// Postal code to find the nearest station for
        #[arg(long)]
        location: String,

        /// Granularity code: h (hourly, one day), d (daily, one month), c (custom range)
        #[arg(long, short)]
        granularity: String,

        /// Start date, M/D/YYYY
        #[arg(long)]
        start: String,

        /// End date, M/D/YYYY (required for custom ranges)
        #[arg(long)]
        end: Option<String>,

        /// Output file name (ignored with --bulk)
        #[arg(long, short)]
        output: Option<String>,

        /// Name the output file after the fetched date
        #[arg(long)]
        bulk: bool,
    },
    /// Fetch an arbitrary date range, one page per day or month as needed
    Bulk {
        /// Postal code to find the nearest station for
        #[arg(long)]
        location: String,

        /// Granularity code: h (one file per day) or d (daily summaries)
        #[arg(long, short)]
        granularity: String,

        /// Start date, M/D/YYYY
        #[arg(long)]
        start: String,

        /// End date, M/D/YYYY
        #[arg(long)]
        end: String,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,weather_history=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(mode) = cli.mode {
        config.extract_mode = mode;
    }
    info!(
        "Starting weather history fetch (history: {}, output: {}, mode: {})",
        config.history_url,
        config.output_dir.display(),
        config.extract_mode
    );

    let mut client = HistoryClient::new(&config);

    match cli.command {
        Command::Fetch {
            location,
            granularity,
            start,
            end,
            output,
            bulk,
        } => {
            let summary = client
                .fetch_one_str(
                    &location,
                    &granularity,
                    &start,
                    end.as_deref(),
                    output.as_deref(),
                    bulk,
                )
                .await?;
            println!(
                "{} rows from {} saved to `{}`",
                summary.outcome.rows_written,
                summary.station,
                summary.outcome.path.display()
            );
        }
        Command::Bulk {
            location,
            granularity,
            start,
            end,
            no_progress,
        } => {
            let granularity: Granularity = granularity.parse()?;
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;

            let progress = if no_progress {
                ProgressBar::hidden()
            } else {
                let pb = ProgressBar::new(0);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                        .progress_chars("##-"),
                );
                pb
            };

            let summary = client
                .fetch_range_with_progress(&location, granularity, start, end, &progress)
                .await?;
            println!(
                "{} pages ({} rows) from {} saved to `{}`",
                summary.fetches.len(),
                summary.total_rows(),
                summary.station,
                config.output_dir.display()
            );
        }
    }

    Ok(())
}
