//! Nether-ST2: Scream Tracker 2 replayer
//!
//! Sample-exact playback of STM modules parsed by `nether-stm`. The output
//! is a pull stream of unsigned 8-bit mono samples, one per
//! [`St2Player::render_sample`] call, reproducing Scream Tracker 2's integer
//! arithmetic bit for bit (including its truncation and wraparound).
//!
//! # Architecture
//!
//! - **tables** - Period, volume, tempo and vibrato lookup tables
//! - **St2Channel** - Per-voice oscillator, pitch, volume and effect memory
//! - **effects** - Row-level commands and per-tick effect dispatch
//! - **St2Player** - Sequencer (ticks, rows, order list) and mixer
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use nether_st2::St2Player;
//!
//! let module = nether_stm::parse_stm(&std::fs::read("song.stm")?)?;
//! let mut player = St2Player::new(Arc::new(module));
//! player.start(48000);
//!
//! let mut block = [0u8; 1024];
//! player.render(&mut block);
//! ```

mod channel;
mod effects;
mod player;
mod tables;

pub use channel::{St2Channel, step_for_period};
pub use effects::{Effect, RowCommand};
pub use player::St2Player;
pub use tables::{LFO_TABLE, TABLES, TEMPO_TABLE, Tables, tempo_timing};

pub use nether_stm::DEFAULT_TEMPO;

/// Number of voices
pub const CHANNELS: usize = nether_stm::NUM_CHANNELS;

/// Base clock divided by the period to get a playback frequency
pub const BASE_FREQUENCY: u32 = 35_468_950;

/// Period units per effect parameter step (portamento, vibrato depth)
pub const FX_MULT: u16 = 10;

/// Shortest period that still produces sound; anything lower stops the oscillator
pub const MIN_AUDIBLE_PERIOD: u16 = 551;

/// Output rate used when `start` is given 0
pub const DEFAULT_SAMPLE_RATE: u16 = 15909;
