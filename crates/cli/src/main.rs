use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

use tokenflow_engine::{Plan, RunOutcome, RunReport, Scenario, StepStatus, WorkflowRunner};
use tokenflow_ledger::{InMemoryLedger, MAX_CHUNK_BYTES};
use tokenflow_types::Hbar;

mod config;

/// Genesis funding for the sandbox operator account.
const SANDBOX_FUNDING: Hbar = Hbar::from_hbars(1_000);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => run_cmd(sub).await,
        Some(("plan", sub)) => plan_cmd(sub),
        Some(("keygen", _)) => keygen_cmd(),
        _ => anyhow::bail!("expected a subcommand; try --help"),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .try_init();
}

fn build_cli() -> Command {
    let scenario_arg = Arg::new("scenario")
        .long("scenario")
        .short('s')
        .action(ArgAction::Set)
        .help("Path to a scenario YAML; defaults to the built-in demo scenario");
    let bytecode_arg = Arg::new("bytecode")
        .long("bytecode")
        .action(ArgAction::Set)
        .help("Path to contract bytecode; defaults to a built-in placeholder blob");

    Command::new("tokenflow")
        .about("Run the ledger token demo workflow against an in-memory network")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Execute the workflow and print a step-by-step report")
                .arg(scenario_arg.clone())
                .arg(bytecode_arg.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit the full run report as JSON"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the derived step plan without executing anything")
                .arg(scenario_arg)
                .arg(bytecode_arg),
        )
        .subcommand(
            Command::new("keygen").about("Generate an ED25519 operator key in .env form"),
        )
}

async fn run_cmd(matches: &ArgMatches) -> Result<()> {
    let scenario = load_scenario(matches)?;
    let bytecode = load_bytecode(matches)?;
    let operator = config::load_operator()?;

    // The sandbox seeds the configured operator as its funded genesis account.
    let ledger = Arc::new(InMemoryLedger::with_account(
        operator.account_id,
        operator.public_key(),
        SANDBOX_FUNDING,
    ));
    let runner = WorkflowRunner::new(ledger, operator);
    let report = runner.run(&scenario, &bytecode).await?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    match report.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Halted { ref step } => anyhow::bail!("workflow halted at step '{}'", step),
    }
}

fn plan_cmd(matches: &ArgMatches) -> Result<()> {
    let scenario = load_scenario(matches)?;
    let bytecode = load_bytecode(matches)?;
    let plan = Plan::build(&scenario, bytecode.len())?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn keygen_cmd() -> Result<()> {
    let key = tokenflow_types::PrivateKey::generate();
    println!("{}={}", config::OPERATOR_KEY_VAR, key.to_hex());
    println!("# public key: {}", key.public_key());
    println!("# set {} to the account that holds this key", config::OPERATOR_ID_VAR);
    Ok(())
}

fn load_scenario(matches: &ArgMatches) -> Result<Scenario> {
    match matches.get_one::<String>("scenario") {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario file '{}'", path))?;
            Ok(Scenario::from_yaml(&text)?)
        }
        None => Ok(Scenario::default()),
    }
}

fn load_bytecode(matches: &ArgMatches) -> Result<Vec<u8>> {
    match matches.get_one::<String>("bytecode") {
        Some(path) => {
            fs::read(path).with_context(|| format!("failed to read bytecode file '{}'", path))
        }
        None => Ok(placeholder_bytecode()),
    }
}

/// Filler bytecode for sandbox runs without a compiled artifact. Sized to
/// exercise the chunked upload path.
fn placeholder_bytecode() -> Vec<u8> {
    vec![0x60; 2 * MAX_CHUNK_BYTES + 512]
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        match step.status {
            StepStatus::Succeeded => {
                let detail = serde_json::to_string(&step.detail).unwrap_or_default();
                println!("ok    {:<24} {} ({} ms)", step.id, detail, step.duration_ms);
            }
            StepStatus::Failed => {
                println!(
                    "FAIL  {:<24} {}",
                    step.id,
                    step.error.as_deref().unwrap_or("unknown error")
                );
            }
            StepStatus::Skipped => println!("skip  {}", step.id),
        }
    }
    let total_ms: u64 = report.steps.iter().map(|step| step.duration_ms).sum();
    match &report.outcome {
        RunOutcome::Completed => {
            println!("completed {} steps in {} ms", report.steps.len(), total_ms);
        }
        RunOutcome::Halted { step } => println!("halted at '{}'", step),
    }
}
