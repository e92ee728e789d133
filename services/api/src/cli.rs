use crate::demo::{run_demo, run_scan, DemoArgs, ScanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use nutriscan::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "NutriScan",
    about = "Run the NutriScan screening service or screen a photo from the command line",
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
    /// Screen a single image file against the configured model backend
    Scan(ScanArgs),
    /// Walk through the screening workflow against an offline scripted backend
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
    /// Override the model backend base URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
