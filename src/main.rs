//! aniflix-player - multi-source episode playback engine
//!
//! # Usage
//!
//! ```bash
//! # Normalize subtitles
//! aniflix-player subs episode.vtt --at 00:01:02
//!
//! # Dry-run a session against the headless surface
//! aniflix-player play episode.json --source 2 --subtitle en --seconds 12 --no-report
//! ```

use clap::Parser;

use aniflix_player::cli::{Cli, Command, ExitCode, Output};
use aniflix_player::commands;
use aniflix_player::config::Config;
use aniflix_player::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let mut config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
        },
        None => Config::load(),
    };
    if let Some(url) = &cli.backend {
        config.backend_url = url.clone();
    }
    if let Some(level) = &cli.log {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::init(&config.logging) {
        output.info(format!("Logging disabled: {}", e));
    }
    tracing::debug!(backend = %config.backend_url, "configuration loaded");

    match cli.command {
        Command::Subs(cmd) => commands::subs_cmd(cmd, &config, &output).await,
        Command::Extract(cmd) => commands::extract_cmd(cmd, &config, &output).await,
        Command::Play(cmd) => commands::play_cmd(cmd, &config, &output).await,
        Command::Config(cmd) => commands::config_cmd(cmd, &config, &output).await,
    }
}
