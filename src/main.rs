use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::{info, warn};
use std::{
    io::{self, Write},
    process::ExitCode,
};

mod config;
use config::{Config, DEFAULT_COLUMN, DEFAULT_TABLE};

mod ops;
use ops::{
    count_providers,
    missing_providers::{self, MatchPolicy},
};

mod providers;
mod rest;
use rest::{PlanSource, RestClient};

#[derive(Parser, Debug)]
#[command(version, about = "Broadband plan label coverage reports.", long_about = None)]
struct Args {
    /// Service role or anon key for the REST API.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Project URL, derived from the key when omitted.
    #[arg(long, env = "SUPABASE_URL", global = true)]
    url: Option<String>,

    #[arg(long, help = "Table holding the plans.", default_value = DEFAULT_TABLE, global = true)]
    table: String,

    #[arg(long, help = "Column holding the provider name.", default_value = DEFAULT_COLUMN, global = true)]
    column: String,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Exact plan count for each known provider.
    CountProviders(CountProvidersArgs),

    /// Plan counts for every provider, then major ISPs with no plans.
    MissingProviders(MissingProvidersArgs),
}

#[derive(Debug, clap::Args)]
struct CountProvidersArgs {
    #[arg(
        short,
        long = "provider",
        help = "Provider to count, defaults to the built-in list.",
        value_delimiter = ','
    )]
    providers: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct MissingProvidersArgs {
    #[arg(short, long, help = "Maximum number of rows to fetch.", default_value_t = 100_000)]
    limit: usize,

    #[arg(
        short,
        long,
        help = "Whether any or all of a candidate's name parts must match.",
        value_enum,
        default_value_t = MatchPolicy::Any
    )]
    match_policy: MatchPolicy,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args).await {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(args: Args) -> Result<()> {
    let config = Config::resolve(args.api_key, args.url, args.table, args.column)?;
    info!("using {}", config.table_url()?);

    let client = RestClient::new(&config)?;
    let mut stdout = io::stdout().lock();

    match args.command {
        Commands::CountProviders(count_args) => {
            let counts = if count_args.providers.is_empty() {
                count_providers::count_providers(&client, &providers::KNOWN_PROVIDERS).await?
            } else {
                count_providers::count_providers(&client, &count_args.providers).await?
            };

            count_providers::print_exact_counts(&mut stdout, &counts)?;
        }

        Commands::MissingProviders(missing_args) => {
            let rows = client.fetch_column(missing_args.limit).await?;
            if rows.len() >= missing_args.limit {
                warn!(
                    "fetched {} rows, the limit; counts may be truncated",
                    rows.len()
                );
            }

            let tally = missing_providers::tally(rows);
            let candidates = providers::major_isps();
            let missing =
                missing_providers::find_missing(&tally, &candidates, missing_args.match_policy);

            missing_providers::print_report(&mut stdout, &tally, &missing)?;
        }
    }

    stdout.flush().context("Failed to write report")?;

    Ok(())
}
