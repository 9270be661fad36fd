use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sfx_pool::config::ExhaustionPolicy;
use sfx_pool::mixer::Channel;

#[derive(Parser, Debug)]
#[command(name = "sfx-runner", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Runner config file (TOML). Defaults to `sfx.toml` next to the executable, if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of pooled voices
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Serve every request through ad hoc voices
    #[arg(long, global = true)]
    pub no_pooling: bool,

    /// What a pooled request does when every voice is busy
    #[arg(long, value_enum, global = true)]
    pub on_exhausted: Option<ExhaustedArg>,

    /// Manager tick length in milliseconds
    #[arg(long, global = true)]
    pub tick_ms: Option<u64>,

    /// Preferences file holding mixer settings
    #[arg(long, global = true)]
    pub prefs: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExhaustedArg {
    Reject,
    Unpooled,
    StealOldest,
}

impl From<ExhaustedArg> for ExhaustionPolicy {
    fn from(value: ExhaustedArg) -> Self {
        match value {
            ExhaustedArg::Reject => ExhaustionPolicy::Reject,
            ExhaustedArg::Unpooled => ExhaustionPolicy::Unpooled,
            ExhaustedArg::StealOldest => ExhaustionPolicy::StealOldest,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a cue script against the manager
    Run {
        /// Path to the cue script (TOML)
        script: PathBuf,

        /// Sleep for each tick instead of running as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk through a two-voice pool scenario step by step
    Demo {
        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the playback length of audio files
    Probe {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show or edit persisted mixer settings
    Settings {
        /// Set a channel level, e.g. `music=0.5`
        #[arg(long = "set", value_name = "CHANNEL=LEVEL", value_parser = parse_channel_level)]
        set: Vec<(Channel, f32)>,

        /// Mute a channel
        #[arg(long, value_parser = parse_channel)]
        disable: Vec<Channel>,

        /// Unmute a channel
        #[arg(long, value_parser = parse_channel)]
        enable: Vec<Channel>,

        /// Restore every channel to full volume, enabled
        #[arg(long)]
        reset: bool,

        /// Forget saved mixer settings before applying other edits
        #[arg(long)]
        clear: bool,

        /// Print settings as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_channel(s: &str) -> Result<Channel, String> {
    s.parse::<Channel>().map_err(|e| e.to_string())
}

fn parse_channel_level(s: &str) -> Result<(Channel, f32), String> {
    let (channel, level) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=LEVEL, got {s:?}"))?;
    let channel = parse_channel(channel)?;
    let level = level
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("bad level {level:?}: {e}"))?;
    Ok((channel, level))
}
