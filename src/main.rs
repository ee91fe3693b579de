use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use strata::artifacts;
use strata::cli::{Cli, Commands, PrintTarget, demo_system, session_for_email};
use strata::config::StrataConfig;
use strata::context::System;
use strata::graphql::print_sdl;
use strata::relational::print_relational;
use strata::typegen::print_types;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    strata::logging::init(cli.verbose, cli.log_file.clone());

    let (config, project_root) = load_config()?;
    let system = demo_system(config.clone()).context("Failed to build the demo system")?;

    match cli.command {
        Commands::Generate => {
            let written = artifacts::generate(system.schema(), &config, &project_root)?;
            for path in &written {
                println!("{} {}", "Wrote".green(), path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let stale = artifacts::validate(system.schema(), &config, &project_root)?;
            if stale.is_empty() {
                println!("{} schema artifacts are up to date", "OK".green());
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!(
                    "{} schema artifacts are stale ({}); run `strata generate`",
                    "Error:".red(),
                    artifacts::describe_stale(&stale)
                );
                for kind in &stale {
                    eprintln!("  {} {}", "stale".yellow(), kind.path(&config, &project_root).display());
                }
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Print { target } => {
            let text = match target {
                PrintTarget::Graphql => print_sdl(system.schema()),
                PrintTarget::Relational => print_relational(system.schema()),
                PrintTarget::Types => print_types(system.schema()),
            };
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Query {
            query,
            variables,
            act_as,
            sudo,
        } => cmd_query(&system, &query, variables, act_as, sudo).await,
    }
}

fn load_config() -> Result<(StrataConfig, PathBuf)> {
    let cwd = std::env::current_dir()?;
    StrataConfig::load(&cwd).context("Failed to load strata configuration")
}

async fn cmd_query(
    system: &System,
    query: &str,
    variables: Option<String>,
    act_as: Option<String>,
    sudo: bool,
) -> Result<ExitCode> {
    let variables = variables
        .map(|v| serde_json::from_str(&v).context("Variables must be valid JSON"))
        .transpose()?;

    let mut ctx = system.context();
    if let Some(email) = act_as {
        let session = session_for_email(system, &email)
            .await?
            .with_context(|| format!("No seeded user with email '{}'", email))?;
        ctx = ctx.with_session(session);
    }
    if sudo {
        ctx = ctx.sudo();
    }

    let response = ctx.graphql().raw(query, variables).await;
    let exit = if response.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        for error in &response.errors {
            eprintln!("{} {}", "Error:".red(), error.message);
        }
        ExitCode::FAILURE
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&response.data.into_json()?)?
    );
    Ok(exit)
}
