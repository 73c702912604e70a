mod cli;
mod commands;
mod render;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, Verbosity};
use colored::Colorize;
use labelkit_core::config::DashboardConfig;
use labelkit_core::paths;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    let app_dir = match cli.app_dir {
        Some(ref dir) => dir.clone(),
        None => match paths::app_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("{} {}", "ERROR:".red().bold(), e);
                std::process::exit(1);
            }
        },
    };

    // `init` and `completion` don't require a parseable config; handle them early
    if let Commands::Init(args) = cli.command {
        return match commands::init::run(&app_dir, args) {
            Ok(()) => {
                if verbosity != Verbosity::Quiet {
                    println!("\n{}", "SUCCESS".green().bold());
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("\n{} {}", "FAILED".red().bold(), e);
                std::process::exit(1);
            }
        };
    }

    if let Commands::Completion(args) = cli.command {
        clap_complete::generate(
            args.shell,
            &mut <Cli as clap::CommandFactory>::command(),
            "labelkit",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let config = match DashboardConfig::load(&app_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Failed to load config: {}", "ERROR:".red().bold(), e);
            std::process::exit(1);
        }
    };

    for warning in config.validate() {
        eprintln!("{} {}", "WARNING:".yellow().bold(), warning);
    }

    if verbosity == Verbosity::Verbose {
        println!(
            "{} app dir {}, config from {}",
            "DEBUG".dimmed(),
            app_dir.display(),
            DashboardConfig::path_in(&app_dir).display()
        );
    }

    let result = match cli.command {
        Commands::Launch(args) => commands::launch::run(&config, &app_dir, args, verbosity).await,
        Commands::Split(args) => commands::split::run(&config, args, verbosity).await,
        Commands::Init(_) | Commands::Completion(_) => unreachable!("handled above"),
    };

    match result {
        Ok(()) => {
            if verbosity != Verbosity::Quiet {
                println!("\n{}", "SUCCESS".green().bold());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("\n{} {}", "FAILED".red().bold(), e);
            std::process::exit(1);
        }
    }
}
