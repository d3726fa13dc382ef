use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use tracing_subscriber::EnvFilter;
use ufetch_core::{FetchEvent, Fetcher, Outcome, ReqwestExchange, TlsProvider};

use crate::cli::app::App;
use crate::cli::output::OutputOpener;
use crate::cli::report::Reporter;

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let app = match App::try_parse() {
        Ok(app) => app,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    init_tracing(app.quiet);

    match run(&app).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            if !app.quiet {
                let _ = Term::stderr().write_line(&format!("ufetch: {e:#}"));
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(app: &App) -> Result<Outcome> {
    let mut options = app.fetch_options();
    if !app.quiet {
        let reporter = Reporter::stderr();
        options = options.on_event(Arc::new(move |event: &FetchEvent| reporter.report(event)));
    }

    let tls = load_tls(app)?;
    let exchange = ReqwestExchange::new(tls, &options).context("failed to set up HTTP client")?;
    let mut fetcher = Fetcher::new(exchange, options);

    let outcome = fetcher
        .fetch(&app.url, OutputOpener::new(app.output.clone()))
        .await?;
    Ok(outcome)
}

#[cfg(feature = "tls")]
fn load_tls(app: &App) -> Result<Option<TlsProvider>> {
    let mut provider = TlsProvider::new();
    for path in &app.ca_certificates {
        provider
            .add_ca_file(path)
            .with_context(|| format!("failed to load CA certificate {}", path.display()))?;
    }
    Ok(Some(provider))
}

#[cfg(not(feature = "tls"))]
fn load_tls(app: &App) -> Result<Option<TlsProvider>> {
    if !app.ca_certificates.is_empty() {
        tracing::debug!("built without TLS support, ignoring --ca-certificate");
    }
    Ok(None)
}
