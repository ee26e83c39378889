//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Session rate when `--rate` is not given
pub const DEFAULT_RATE: u16 = 48000;

#[derive(Parser)]
#[command(name = "st2-player")]
#[command(about = "Play, render and inspect Scream Tracker 2 (.stm) modules")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a module through the default audio device
    Play {
        /// Path to the STM file
        file: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Render a module to an 8-bit mono WAV file
    Render {
        /// Path to the STM file
        file: PathBuf,

        /// Output WAV path
        output: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,

        /// Stop after this many seconds even if the song has not looped
        #[arg(long, default_value_t = 600)]
        max_seconds: u32,
    },

    /// Print the module header, order list and sample table
    Info {
        /// Path to the STM file
        file: PathBuf,
    },
}

/// Options shared by `play` and `render`
#[derive(Args, Clone, Copy, Debug)]
pub struct PlaybackArgs {
    /// Output sample rate in Hz (0 = 15909, the tracker's native rate)
    #[arg(long, default_value_t = DEFAULT_RATE)]
    pub rate: u16,

    /// Stop once the song has looped this many times
    #[arg(long, default_value_t = 1)]
    pub loops: u16,

    /// Order position to start from (also the loop target)
    #[arg(long, default_value_t = 0)]
    pub order: u16,
}

impl Default for PlaybackArgs {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            loops: 1,
            order: 0,
        }
    }
}
