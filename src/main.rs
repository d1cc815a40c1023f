use anyhow::{Context, Result};
use clap::Parser;
use dnsdbflex::backends::{create_backend, SelectedBackend};
use dnsdbflex::cli::Args;
use dnsdbflex::config::{self, ConfigResolver};
use dnsdbflex::engine::FetchEngine;
use dnsdbflex::launcher;
use dnsdbflex::output::PresentationSink;
use dnsdbflex::session::{Session, SessionConfig};
use dnsdbflex::types::FlexError;
use dnsdbflex::validate;
use dnsdbflex::{NAME, VERSION};
use log::debug;
use std::process;

/// Queries in flight at once while draining.
const MAX_CONCURRENCY: usize = 10;

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if args.version {
        println!(
            "{}: version {} ({} built {})",
            NAME,
            VERSION,
            env!("GIT_HASH"),
            env!("BUILD_TIME")
        );
        process::exit(0);
    }

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            1
        }
    };
    process::exit(code);
}

/// Everything the run owns, the selected backend included, is dropped
/// before this returns, so the backend is torn down on every path.
async fn run(args: Args) -> Result<i32> {
    let mut timeout = config::timeout_from_env()?.unwrap_or(0);
    if let Some(value) = &args.timeout {
        timeout = config::timeout_from_option(value)?;
    }

    let cli_backend = match &args.system {
        Some(name) => create_backend(name)
            .map(SelectedBackend::new)
            .map(Some)
            .ok_or_else(|| FlexError::usage("-u must refer to a pdns system"))?,
        None => None,
    };

    let validated = validate::validate(args.search_request())?;
    if !args.quiet {
        for warning in &validated.warnings {
            eprintln!("Warning: {}", warning);
        }
    }
    let qd = validated.descriptor;
    debug!("{}", qd);

    let backend = ConfigResolver::new(cli_backend).resolve()?;
    backend.ready()?;

    let session = Session::new(&SessionConfig {
        timeout,
        verify_tls: !args.no_verify,
        ip_family: args.ip_family(),
        ..SessionConfig::default()
    })
    .context("cannot set up the HTTP session")?;
    if timeout != 0 {
        debug!("request timeout is {}s", timeout);
    }

    let sink = PresentationSink::new(
        args.presentation(),
        qd.search_target,
        qd.output_limit,
        std::io::stdout(),
    );
    let mut engine = FetchEngine::new(session);
    launcher::launch(&qd, &*backend, Box::new(sink), &mut engine)?;

    let summary = engine.drain(MAX_CONCURRENCY).await;
    Ok(if summary.all_succeeded() { 0 } else { 1 })
}

fn report(e: &anyhow::Error) {
    match e.downcast_ref::<FlexError>() {
        Some(FlexError::UsageError(msg)) => {
            eprintln!("error: {}\n", msg);
            eprintln!("try   {} -h   for a short description of program usage.", NAME);
        }
        _ => eprintln!("{}: {:#}", NAME, e),
    }
}
