//! sfx-runner: a command-line host for the pooled playback manager.
//!
//! The runner is the manager's frame-tick source. It plays TOML cue scripts
//! against a manager whose sink logs every voice it starts and stops, which
//! makes pool behaviour observable without an audio device.
//!
//! ## Modes
//! - `run`: play a cue script, optionally in real time.
//! - `demo`: a scripted two-voice walkthrough.
//! - `probe`: print the duration of audio files.
//! - `settings`: show or edit persisted mixer channel levels.

mod cli;
mod config;
mod runtime;
mod script;
mod sink;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,sfx_pool=info,sfx_runner=info")
        }))
        .init();

    let cfg = config::RunnerConfig::resolve(&args)?;
    tracing::debug!(?cfg, "runner config");

    match &args.cmd {
        cli::Command::Run {
            script,
            realtime,
            json,
        } => runtime::run_script(&cfg, script, *realtime, *json),
        cli::Command::Demo { json } => runtime::run_demo(&cfg, *json),
        cli::Command::Probe { paths } => runtime::probe(paths),
        cli::Command::Settings {
            set,
            disable,
            enable,
            reset,
            clear,
            json,
        } => {
            let edit = runtime::SettingsEdit {
                set: set.clone(),
                disable: disable.clone(),
                enable: enable.clone(),
                reset: *reset,
                clear: *clear,
            };
            runtime::settings(&cfg, &edit, *json)
        }
    }
}
