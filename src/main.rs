use anyhow::Result;
use chrono::Local;
use clap::Parser;
use console::style;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use codemaster::api::{ProviderRegistry, ResponseEngine};
use codemaster::app::Session;
use codemaster::config::Config;
use codemaster::output::OutputHandler;
use codemaster::progress::Spinner;

#[derive(Parser)]
#[command(name = "codemaster")]
#[command(about = "Terminal AI chat assistant that extracts and saves code", long_about = None)]
struct Cli {
    /// Path to an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "codemaster=debug" } else { "codemaster=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_or_default(),
    };

    let registry = ProviderRegistry::from_config(&config);
    let engine = ResponseEngine::new(registry, &config);
    let mut session = Session::new(engine, std::env::current_dir()?);
    let output = OutputHandler::new();

    let today = Local::now().format("%A, %B %d, %Y").to_string();
    let providers: Vec<String> = session
        .engine()
        .registry()
        .credentialed()
        .iter()
        .map(|kind| kind.to_string())
        .collect();
    output.print_banner(&today, &providers);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(
            "{} {} ",
            style("CodeMaster").cyan().bold(),
            style(">").yellow()
        );
        std::io::stdout().flush()?;

        let input = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line.trim().to_string(),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "exit" | "quit" | "bye" | "goodbye" => break,
            "help" => {
                output.print_help();
                continue;
            }
            "status" => {
                for (kind, configured) in session.engine().registry().statuses() {
                    let mark = if configured {
                        style("configured").green()
                    } else {
                        style("not configured").red()
                    };
                    println!("  {:<12} {mark}", kind.to_string());
                }
                continue;
            }
            "history" => {
                output.print_history(session.history());
                continue;
            }
            _ => {}
        }

        let outcome = if session.is_save_followup(&input) {
            session.save_staged(&input)
        } else {
            let spinner = Spinner::start("Thinking...");
            let outcome = tokio::select! {
                outcome = session.handle_input(&input) => outcome,
                _ = tokio::signal::ctrl_c() => {
                    // User interrupt during the wait: abort the pending
                    // call and leave rather than resuming the loop.
                    drop(spinner);
                    output.print_system("Interrupted. See you next time!");
                    std::process::exit(0)
                }
            };
            drop(spinner);
            outcome
        };
        output.print_outcome(&outcome);
    }

    output.print_system("Goodbye! Come back anytime.");
    Ok(())
}
