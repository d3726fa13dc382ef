use std::path::PathBuf;

use clap::Parser;
use ufetch_core::FetchOptions;

#[derive(Clone, Debug, Parser)]
#[command(name = "ufetch", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    #[arg(help = "URL to fetch")]
    pub url: String,

    #[arg(
        short = 'O',
        value_name = "FILE",
        help = "Redirect output to file (use \"-\" for stdout)"
    )]
    pub output: Option<String>,

    #[arg(short, long, help = "Turn off status messages")]
    pub quiet: bool,

    #[arg(long = "no-check-certificate", help = "Don't validate the server's certificate")]
    pub no_check_certificate: bool,

    #[arg(
        long = "ca-certificate",
        value_name = "FILE",
        help = "Load CA certificates from file (repeatable)"
    )]
    pub ca_certificates: Vec<PathBuf>,
}

impl App {
    /// Fetch options for this invocation, without an event callback.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::default().verify_certificates(!self.no_check_certificate)
    }
}
