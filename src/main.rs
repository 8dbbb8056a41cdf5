//! Entry point for the `rusty-cmd` binary.
//!
//! Command output is passed through on stdout/stderr. Pipeline notes and
//! logs go to stderr so `--json` output on stdout stays parseable.

mod cli;

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rusty_cmd::render;
use rusty_cmd::utils::logger;
use rusty_cmd::{adapt, CommandResult, RunError, Runner};

use cli::{Cli, Commands};

/// Exit status when the pipeline refuses or abandons a command.
const EXIT_REFUSED: u8 = 2;
const EXIT_FAILURE: u8 = 1;

fn exit_code_for(result: &CommandResult) -> ExitCode {
    match u8::try_from(result.exit_code) {
        Ok(code) => ExitCode::from(code),
        // Signal-terminated or out of range
        Err(_) => ExitCode::from(EXIT_FAILURE),
    }
}

fn exit_code_for_error(err: &RunError) -> ExitCode {
    match err {
        RunError::Blocked { .. } | RunError::RiskExceeded { .. } | RunError::Timeout { .. } => {
            ExitCode::from(EXIT_REFUSED)
        }
        _ => ExitCode::from(EXIT_FAILURE),
    }
}

fn report_error(json: bool, err: &RunError) -> Result<ExitCode> {
    if json {
        println!("{}", render::error_json(err)?);
    } else {
        eprintln!("error: {}", err);
    }
    Ok(exit_code_for_error(err))
}

fn print_result(result: &CommandResult) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(result.stdout.as_bytes())?;
    stdout.flush()?;

    let mut stderr = std::io::stderr().lock();
    stderr.write_all(result.stderr.as_bytes())?;
    for note in render::result_notes(result) {
        writeln!(stderr, "{}", note)?;
    }
    Ok(())
}

async fn run(cli: &Cli, runner: &Runner, command: &str) -> Result<ExitCode> {
    match runner.run(command).await {
        Ok(result) => {
            if cli.json {
                println!("{}", result.to_json_pretty()?);
            } else {
                print_result(&result)?;
            }
            Ok(exit_code_for(&result))
        }
        Err(err) => report_error(cli.json, &err),
    }
}

async fn run_sequence(cli: &Cli, runner: &Runner, commands: &[String], keep_going: bool) -> Result<ExitCode> {
    let outcomes = runner.run_sequence(commands, !keep_going).await;

    if cli.json {
        println!("{}", render::sequence_json(&outcomes)?);
    } else {
        for outcome in &outcomes {
            match outcome {
                Ok(result) => print_result(result)?,
                Err(err) => eprintln!("error: {}", err),
            }
        }
    }

    // The last command that failed or was refused decides the status.
    Ok(outcomes
        .iter()
        .rev()
        .find_map(|outcome| match outcome {
            Ok(result) if result.succeeded() => None,
            Ok(result) => Some(exit_code_for(result)),
            Err(err) => Some(exit_code_for_error(err)),
        })
        .unwrap_or(ExitCode::SUCCESS))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = logger::init_logging("warn");

    let config = cli.runner_config();
    if !config.working_dir.is_dir() {
        anyhow::bail!("working directory {} does not exist", config.working_dir.display());
    }
    tracing::debug!(?config, "Resolved runner configuration");

    match &cli.command {
        Commands::Run { command } => {
            let runner = Runner::new(config);
            run(&cli, &runner, command).await
        }
        Commands::Seq { keep_going, commands } => {
            let runner = Runner::new(config);
            run_sequence(&cli, &runner, commands, *keep_going).await
        }
        Commands::Check { command } => {
            let plan = Runner::new(config).check(command);
            if cli.json {
                println!("{}", render::plan_json(&plan).context("failed to encode plan")?);
            } else {
                println!("{}", render::plan_text(&plan));
            }
            Ok(if plan.will_execute() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_REFUSED)
            })
        }
        Commands::Adapt { command } => {
            let adapted = adapt(command, config.dialect);
            if cli.json {
                println!("{}", render::adapted_json(&adapted)?);
            } else {
                println!("{}", render::adapted_text(&adapted));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
