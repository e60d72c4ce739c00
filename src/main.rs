use std::io;
use std::path::PathBuf;

use eyre::Result;
use log::{debug, info, warn};

mod cli;

use cli::Cli;
use ytsum::config::{Config, config_path};
use ytsum::gemini::{API_KEY_ENV, Gemini};
use ytsum::shell::Shell;
use ytsum::youtube::InnerTube;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("logs")
}

fn build_after_help() -> String {
    let key_line = if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
        format!("  \x1b[32m✅\x1b[0m {API_KEY_ENV}")
    } else {
        format!("  \x1b[31m❌\x1b[0m {API_KEY_ENV} (not set, needed for summaries)")
    };

    format!(
        "\nREQUIRED ENVIRONMENT:\n{key_line}\n\nConfig is read from: {}\nLogs are written to: {}",
        config_path().display(),
        log_dir().join("ytsum.log").display()
    )
}

/// Log the models visible to the configured key; failure is not fatal
async fn log_available_models(gemini: &Gemini, verbose: bool) {
    match gemini.list_models().await {
        Ok(models) => {
            info!("Available models: {}", models.join(", "));
            if verbose {
                eprintln!("Available models:");
                for model in &models {
                    eprintln!("- {model}");
                }
            }
        }
        Err(e) => {
            warn!("Error listing models: {e}");
            if verbose {
                eprintln!("Error listing models: {e}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file: {e}");
        Config::default()
    });

    // CLI flags take priority over config
    let timeout = config.timeout(cli.timeout);
    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let export = if cli.export.is_empty() {
        config.export.clone().unwrap_or_default()
    } else {
        cli.export.clone()
    };
    let candidates = config.model_candidates();

    if cli.verbose {
        let path = config_path();
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
        eprintln!("Timeout: {}s", timeout.as_secs());
        eprintln!("Model candidates: {}", candidates.join(", "));
    }
    debug!("timeout={timeout:?} output_dir={} export={export:?}", output_dir.display());

    let gemini = Gemini::new(config.api_key_from_env(), timeout)?;

    if cli.list_models {
        for model in gemini.list_models().await? {
            println!("{model}");
        }
        return Ok(());
    }

    log_available_models(&gemini, cli.verbose).await;

    let transcripts = InnerTube::new(timeout)?;
    let shell = Shell::new(&transcripts, &gemini, candidates)
        .output_dir(output_dir)
        .export(export)
        .spinners(true);

    let mut stdout = io::stdout();
    match cli.url {
        Some(ref url) => {
            if shell.run_once(url, &mut stdout).await?.is_none() {
                std::process::exit(1);
            }
        }
        None => {
            println!("YouTube AI Summarizer: generate concise summaries from YouTube video transcripts");
            println!("Type 'quit' to exit.\n");
            shell.run_interactive(io::stdin().lock(), &mut stdout).await?;
        }
    }

    Ok(())
}
