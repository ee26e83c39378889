//! Playback session
//!
//! [`St2Player`] owns all mutable playback state: the four channels and the
//! song position. The module itself is shared read-only behind an `Arc`.

mod mixer;
mod sequencer;

use std::sync::Arc;

use nether_stm::{DEFAULT_TEMPO, NO_LOOP, StmModule};
use tracing::debug;

use crate::channel::St2Channel;
use crate::tables::tempo_timing;
use crate::{CHANNELS, DEFAULT_SAMPLE_RATE};

/// Scream Tracker 2 playback session
#[derive(Debug, Clone)]
pub struct St2Player {
    module: Arc<StmModule>,
    channels: [St2Channel; CHANNELS],

    sample_rate: u16,
    tempo: u8,
    global_volume: u8,
    ticks_per_row: u16,
    frames_per_tick: u16,
    current_tick: u16,
    current_frame: u16,

    pattern_current: u16,
    order_first: u16,
    order_next: u16,
    order_current: u16,
    loop_count: u16,
    /// Advance to the next order entry at the next row boundary
    pattern_change_pending: bool,
    /// Preview mode: ticks keep running but rows are never read
    single_row: bool,
}

impl St2Player {
    /// Create a stopped session for `module`
    ///
    /// Nothing is rendered until [`start`](Self::start) is called; until then
    /// every sample is silence and a tick runs on every call.
    pub fn new(module: Arc<StmModule>) -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            global_volume: module.global_volume,
            module,
            channels: Default::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            ticks_per_row: 0,
            frames_per_tick: 1,
            current_tick: 0,
            current_frame: 1,
            pattern_current: 0,
            order_first: 0,
            order_next: 0,
            order_current: 0,
            loop_count: 0,
            pattern_change_pending: false,
            single_row: false,
        }
    }

    /// Start playback at `sample_rate` (0 selects [`DEFAULT_SAMPLE_RATE`])
    ///
    /// Enables all channels, applies the module's initial tempo and loads the
    /// pattern at the current order position. The first row is read after
    /// one tick's worth of samples.
    pub fn start(&mut self, sample_rate: u16) {
        self.sample_rate = if sample_rate == 0 {
            DEFAULT_SAMPLE_RATE
        } else {
            sample_rate
        };

        for channel in &mut self.channels {
            channel.active = true;
            channel.loop_start = NO_LOOP;
        }

        self.set_tempo(self.module.tempo);
        self.current_frame = self.frames_per_tick;
        self.change_pattern();

        debug!(
            rate = self.sample_rate,
            tempo = self.tempo,
            order = self.order_current,
            pattern = self.pattern_current,
            "ST2 playback started"
        );
    }

    /// Jump to order position `order` and make it the loop target
    ///
    /// Safe to call between render calls; the new pattern starts at row 0.
    pub fn set_position(&mut self, order: u16) {
        self.order_next = order;
        self.order_first = order;
        self.change_pattern();
        debug!(order, pattern = self.pattern_current, "ST2 seek");
    }

    /// Packed position: loop count in the high byte, order index in the low byte
    #[inline]
    pub fn position(&self) -> u16 {
        (self.loop_count << 8) | (self.order_current & 0xFF)
    }

    /// Number of times the song wrapped at an end-of-song order entry
    #[inline]
    pub fn loop_count(&self) -> u16 {
        self.loop_count
    }

    /// Order position being played
    #[inline]
    pub fn order(&self) -> u16 {
        self.order_current
    }

    /// Pattern being played
    #[inline]
    pub fn pattern(&self) -> u16 {
        self.pattern_current
    }

    /// Rows read from the current pattern (taken from channel 0)
    #[inline]
    pub fn row(&self) -> u16 {
        self.channels[0].row
    }

    /// Current tempo byte
    #[inline]
    pub fn tempo(&self) -> u8 {
        self.tempo
    }

    /// Ticks per row derived from the tempo
    #[inline]
    pub fn ticks_per_row(&self) -> u16 {
        self.ticks_per_row
    }

    /// Output samples per tick derived from the tempo and sample rate
    #[inline]
    pub fn frames_per_tick(&self) -> u16 {
        self.frames_per_tick
    }

    /// Output sample rate
    #[inline]
    pub fn sample_rate(&self) -> u16 {
        self.sample_rate
    }

    /// The module being played
    #[inline]
    pub fn module(&self) -> &Arc<StmModule> {
        &self.module
    }

    /// Enable or disable single-row preview (row reads are suspended)
    pub fn set_single_row(&mut self, single_row: bool) {
        self.single_row = single_row;
    }

    /// Read-only view of channel `idx`
    ///
    /// # Panics
    ///
    /// Panics if `idx >= CHANNELS`.
    #[inline]
    pub fn channel(&self, idx: usize) -> &St2Channel {
        &self.channels[idx]
    }

    /// All channels
    #[inline]
    pub fn channels(&self) -> &[St2Channel; CHANNELS] {
        &self.channels
    }

    /// Apply a tempo byte: ticks per row from the high nibble, frames per
    /// tick from the sample rate and the fine low nibble
    pub(crate) fn set_tempo(&mut self, tempo: u8) {
        let (ticks_per_row, frames_per_tick) = tempo_timing(tempo, self.sample_rate);
        self.tempo = tempo;
        self.ticks_per_row = ticks_per_row;
        self.frames_per_tick = frames_per_tick;
        tracing::trace!(tempo, ticks_per_row, frames_per_tick, "ST2 tempo");
    }
}
