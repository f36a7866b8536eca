use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::oneshot;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use workshop::cli::{Cli, Command};
use workshop::controller::{self, StartLatch};
use workshop::state_machine::{AdmissionCell, AdmissionSource};
use workshop::ui::ShopConsole;
use workshop::{Journal, Orchestrator, WorkshopConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = WorkshopConfig::load(cli.config.as_deref())?;
    config.override_capacity(cli.bays, cli.mechanics);

    match cli.command {
        Command::Run { addr } => {
            if let Some(addr) = addr {
                config.controller_addr = addr;
            }
            config.validate()?;
            run_with_controller(config, cli.json).await
        }
        Command::Simulate { state } => {
            config.validate()?;
            let console = Arc::new(ShopConsole::new(u64::from(config.total_jobs())));
            open_and_run(config, Arc::new(AdmissionCell::new(state)), console, cli.json).await
        }
    }
}

/// Connects to the controller and runs once its first order arrives.
///
/// A controller that hangs up before sending one ends the process normally.
async fn run_with_controller(config: WorkshopConfig, json: bool) -> Result<()> {
    let stream = controller::connect(&config.controller_addr).await?;
    let console = Arc::new(ShopConsole::new(u64::from(config.total_jobs())));
    console.waiting(&config.controller_addr);

    let cell = Arc::new(AdmissionCell::default());
    let (started, start) = oneshot::channel();
    tokio::spawn({
        let cell = Arc::clone(&cell);
        let console = Arc::clone(&console);
        async move {
            let latch = StartLatch::new();
            controller::listen(stream, &cell, console.as_ref(), &latch, move || {
                let _ = started.send(());
            })
            .await;
        }
    });

    if start.await.is_err() {
        tracing::warn!("controller closed the stream before sending an order");
        return Ok(());
    }
    open_and_run(config, cell, console, json).await
}

/// Runs the simulation and blocks until its shutdown signal fires.
async fn open_and_run(
    config: WorkshopConfig,
    admission: Arc<dyn AdmissionSource>,
    console: Arc<ShopConsole>,
    json: bool,
) -> Result<()> {
    console.opened(&config);
    let journal = Arc::new(Journal::new().with_observer(console.clone()));
    let orchestrator = Arc::new(Orchestrator::from_config(config, admission, journal));
    let shutdown = orchestrator.shutdown_token();

    let run = tokio::spawn(async move { orchestrator.run().await });
    shutdown.cancelled().await;
    let report = run.await?;

    console.finish(&report);
    if json {
        console.print_report(&report);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(format!("workshop={level}"))
    });

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");
    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}
