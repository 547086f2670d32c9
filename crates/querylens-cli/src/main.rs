mod cli;
mod commands;
mod config;
mod input;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, ConfigCommands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let profile = &cli.profile;
    let cfg = config::load_profile(profile)?;
    let format = cli.format.unwrap_or_else(|| cfg.output_format());

    match &cli.command {
        Commands::Normalize(args) => {
            commands::normalize::normalize(&args.sql, format)?;
        }
        Commands::Extract(args) => {
            commands::extract::extract_statements(&args.file, format)?;
        }
        Commands::Stats(args) => {
            let threshold = cfg.repeat_threshold(args.repeat_threshold);
            commands::stats::stats(&args.file, threshold, args.top, format)?;
        }
        Commands::Compare(args) => {
            commands::compare::compare_files(&args.before, &args.after, args.top, format)?;
        }
        Commands::Explain(args) => {
            let run = commands::explain::ExplainRun {
                file: &args.file,
                database_url: cfg.resolve_database_url(&args.database_url)?,
                options: cfg.batch_options(args),
                plan_only: args.plan_only,
                advisor: cfg.advisor_config(),
                output: args.output.as_deref(),
            };
            commands::explain::explain(run, format).await?;
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => commands::config::show(profile, format)?,
            ConfigCommands::Set(set_args) => commands::config::set(profile, set_args)?,
        },
    }

    Ok(())
}
