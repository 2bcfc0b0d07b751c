use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpcode_usage::client::AkamaiClient;
use cpcode_usage::edgerc::EdgeGridCredentials;
use cpcode_usage::{logging, Config, Month, TrafficAnalyzer};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "cpcode-usage")]
#[command(about = "Monthly CP code traffic with account group and reporting group attribution")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write traffic_<MONTH>.csv and print reporting group totals
    Report {
        /// Month to report (YYYY-MM, default: last month)
        month: Option<String>,
        /// Billing product id (default from configuration)
        product_id: Option<String>,
        /// Skip CP codes without traffic entirely
        #[arg(long)]
        include_no_traffic: bool,
        /// Directory for the CSV file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Show account groups with their root contract and path
    Groups,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    let _log_guard = logging::init_logging(&config.logging, &config.paths.log_directory);
    config.log_loaded();

    let command = cli.command.unwrap_or(Commands::Report {
        month: None,
        product_id: None,
        include_no_traffic: false,
        output_dir: None,
    });

    // Validate arguments before touching credentials or the network.
    let report_args = match command {
        Commands::Report {
            month,
            product_id,
            include_no_traffic,
            output_dir,
        } => {
            let month = match month {
                Some(m) => m.parse::<Month>()?,
                None => Month::previous()?,
            };
            if let Some(dir) = output_dir {
                config.report.output_directory = dir;
            }
            let product_id = product_id.unwrap_or_else(|| config.report.product_id.clone());
            Some((month, product_id, include_no_traffic))
        }
        Commands::Groups => None,
    };

    let credentials = EdgeGridCredentials::from_file(&config.edgerc.path, &config.edgerc.section)
        .with_context(|| {
            format!(
                "Failed to load EdgeGrid credentials from {} [{}]",
                config.edgerc.path.display(),
                config.edgerc.section
            )
        })?;
    let client = AkamaiClient::new(credentials, config.account_switch_key())?;
    let analyzer = TrafficAnalyzer::new(&client, &config);

    match report_args {
        Some((month, product_id, include_no_traffic)) => {
            analyzer
                .run_report(month, &product_id, include_no_traffic, cli.json)
                .await
        }
        None => analyzer.run_groups(cli.json).await,
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
