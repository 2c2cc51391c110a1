//! `cosci` command line
//!
//! Runs the hypothesis workflow against offline simulated capabilities and
//! checks configuration files.

mod report;
mod simulated;

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use cosci_core::WorkflowConfig;
use cosci_orchestrator::{
    event_channel, CancellationSignal, Orchestrator, RetryPolicy, DEFAULT_CAPACITY,
};
use report::Summary;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn cli() -> Command {
    Command::new("cosci")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Co-Scientist hypothesis workflow")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the workflow with simulated capabilities")
                .arg(
                    Arg::new("goal")
                        .long("goal")
                        .required(true)
                        .help("Research goal"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Workflow configuration (TOML or YAML)"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Seed for the simulated capabilities"),
                )
                .arg(
                    Arg::new("max-iterations")
                        .long("max-iterations")
                        .value_parser(value_parser!(u32))
                        .help("Override the configured iteration count"),
                )
                .arg(
                    Arg::new("top")
                        .long("top")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Number of ranked hypotheses to print"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the summary as JSON"),
                ),
        )
        .subcommand(
            Command::new("validate-config")
                .about("Validate a configuration file and print the effective settings")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration file"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WorkflowConfig> {
    match path {
        Some(path) => WorkflowConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(WorkflowConfig::default()),
    }
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(goal) = args.get_one::<String>("goal") else {
        bail!("--goal is required");
    };
    let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
    let top = args.get_one::<usize>("top").copied().unwrap_or(10);

    let mut config = load_config(args.get_one::<PathBuf>("config"))?;
    if let Some(max_iterations) = args.get_one::<u32>("max-iterations") {
        config = config.with_max_iterations(*max_iterations);
    }

    let capabilities = simulated::capabilities(seed)?
        .with_retry(RetryPolicy::from(&config.retry))
        .with_response_cache(DEFAULT_CAPACITY);

    let (handle, signal) = CancellationSignal::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            handle.cancel();
        }
    });

    let (sender, mut events) = event_channel(32);
    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                stage = %event.stage,
                iteration = event.iteration,
                active = event.snapshot.population().active_count(),
                matches = event.snapshot.match_history().len(),
                "stage snapshot"
            );
        }
    });

    let report = {
        let orchestrator = Orchestrator::new(config, capabilities)
            .context("invalid workflow configuration")?
            .with_events(sender)
            .with_cancellation(signal);
        orchestrator.run(goal).await.context("workflow run failed")?
    };
    listener.await.context("event listener panicked")?;

    let summary = Summary::from_report(&report, top);
    if args.get_flag("json") {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", summary.to_text());
    }
    Ok(())
}

fn validate_config(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args.get_one::<PathBuf>("path"))?;
    info!(max_iterations = config.max_iterations, "configuration is valid");
    println!("{}", toml::to_string_pretty(&config).context("failed to render config")?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args).await,
        Some(("validate-config", args)) => validate_config(args),
        _ => bail!("unknown command"),
    }
}
