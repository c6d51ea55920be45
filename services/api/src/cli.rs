use crate::demo::{run_demo, run_score, DemoArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use trial_match::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Trial Match",
    about = "Score patients against clinical trial catalogs and run the match workflow service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Rank a trial catalog CSV for one patient profile JSON
    Score(ScoreArgs),
    /// Run the match workflow end to end against bundled sample data
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Trial catalog CSV to serve; the bundled sample catalog is used otherwise
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Patient profile JSON to load into the directory (repeatable)
    #[arg(long = "patient")]
    pub(crate) patients: Vec<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
