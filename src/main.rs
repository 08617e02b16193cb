mod api_client;
mod auth;
mod campaign_source;
mod collector;
mod config;
mod error;
mod reconciler;
mod report;
mod runner;
mod sheets;
mod table;

use clap::{Parser, Subcommand};
use config::Config;
use error::Error;
use log::error;
use runner::ResultsTab;

#[derive(Parser)]
#[command(about = "Collects ad campaign metrics and reconciles them into a published spreadsheet")]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch status and insights for every campaign and write the CSV report
    Collect {
        /// Also write the report to the results worksheet
        #[arg(long)]
        publish_results: bool,

        /// Name the results worksheet after today's date
        #[arg(long, requires = "publish_results")]
        dated_results: bool,
    },
    /// Merge the CSV report into the published worksheet
    Reconcile,
    /// Collect, then merge the fresh report into the published worksheet
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match args.command {
        Command::Collect {
            publish_results,
            dated_results,
        } => {
            let tab = match (publish_results, dated_results) {
                (false, _) => ResultsTab::Skip,
                (true, true) => ResultsTab::Dated,
                (true, false) => ResultsTab::Named(args.config.results_sheet.clone()),
            };
            runner::collect_report(args.config, tab).await
        }
        Command::Reconcile => runner::reconcile_report(args.config).await,
        Command::Run => runner::collect_and_reconcile(args.config).await,
    };

    if let Err(err) = result {
        error!("run aborted: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
