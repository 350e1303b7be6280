//! `netconv` command-line runner.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use netconv_client::{ControllerClient, HttpTransport};
use netconv_core::config::EngineConfig;
use netconv_core::types::SitePath;
use netconv_engine::{Driver, RunReport, SessionCipher, SiteResolver};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{ApplyArgs, Cli, Command, DevicesArgs};

mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURES: i32 = 1;
    pub const FATAL: i32 = 2;
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code::FATAL
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let config = config::load_config(&cli.global)?;
    let client = connect(&config).await?;
    debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        Command::Apply(args) => apply(&client, &config, args).await,
        Command::Devices(args) => devices(&client, &config, args).await,
    }
}

async fn connect(config: &EngineConfig) -> Result<ControllerClient<HttpTransport>> {
    let mut builder = HttpTransport::builder(&config.controller_url)?
        .with_http_config(config.client_config());
    if let Some(token) = &config.token {
        builder = builder.with_token(token.clone());
    } else if let Some(password) = &config.password {
        builder = builder.with_basic_auth(config.username.clone(), password.clone());
    } else {
        warn!("no token or password configured, requests will be unauthenticated");
    }

    let transport = builder.build()?;
    ControllerClient::connect(transport, config.retry.policy())
        .await
        .with_context(|| format!("connecting to {}", config.controller_url))
}

async fn apply(
    client: &ControllerClient<HttpTransport>,
    config: &EngineConfig,
    args: ApplyArgs,
) -> Result<i32> {
    let doc = config::load_document(&args.input)?;
    let secrets = SessionCipher::new();
    let cancel = CancellationToken::new();
    let driver = Driver::from_config(client, &secrets, config).with_cancellation(cancel.clone());

    if args.check {
        let planned = driver.plan(doc).await.context("planning failed")?;
        print_json(&planned)?;
        return Ok(exit_code::SUCCESS);
    }

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current resource");
            cancel.cancel();
        }
    });
    let report = driver.run(doc).await;
    interrupt.abort();

    print_json(&report.envelope())?;
    Ok(exit_status(&report))
}

async fn devices(
    client: &ControllerClient<HttpTransport>,
    config: &EngineConfig,
    args: DevicesArgs,
) -> Result<i32> {
    let path = SitePath::parse(&args.site)?;
    let resolver = SiteResolver::new(client, config.pagination.policy());
    let devices = resolver
        .devices_at(&path)
        .await
        .with_context(|| format!("listing devices at {path}"))?;
    print_json(&devices)?;
    Ok(exit_code::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{text}");
    Ok(())
}

fn exit_status(report: &RunReport) -> i32 {
    if report.fatal().is_some() {
        exit_code::FATAL
    } else if report.has_failures() {
        exit_code::FAILURES
    } else {
        exit_code::SUCCESS
    }
}
