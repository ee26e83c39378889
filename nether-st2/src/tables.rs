//! Replayer lookup tables
//!
//! Tempo and vibrato tables are plain constants. The period and volume
//! tables are derived once per process behind [`TABLES`] and are read-only
//! afterwards.

use std::sync::LazyLock;

use nether_stm::DEFAULT_C2SPD;

/// Slots per octave in the period table (12 notes + 4 unused)
pub const OCTAVE_SLOTS: usize = 16;

/// Octaves covered by the period table
pub const OCTAVES: usize = 5;

/// Volume table rows (volume 0-64)
pub const VOLUME_LEVELS: usize = 65;

/// Frame-divisor adjustment per ticks-per-row value, indexed by `tempo >> 4`
pub const TEMPO_TABLE: [u16; 18] = [
    140, 50, 25, 15, 10, 7, 6, 4, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1,
];

/// Octave 0 periods, C through B
pub const BASE_PERIODS: [u16; 12] = [
    17120, 16160, 15240, 14400, 13560, 12800, 12080, 11400, 10760, 10160, 9600, 9070,
];

/// Vibrato oscillator: one full sine cycle over 64 steps, closing at 0
pub const LFO_TABLE: [i16; 65] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, //
    255, 253, 250, 244, 235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24, //
    0, -24, -49, -74, -97, -120, -141, -161, -180, -197, -212, -224, -235, -244, -250, -253, //
    -255, -253, -250, -244, -235, -224, -212, -197, -180, -161, -141, -120, -97, -74, -49, -24,
    0,
];

/// Derived lookup tables, built on first use
pub static TABLES: LazyLock<Tables> = LazyLock::new(Tables::new);

/// Period and volume tables
pub struct Tables {
    /// Period per `octave * 16 + note`; each octave is the previous one halved
    pub periods: [u16; OCTAVE_SLOTS * OCTAVES],
    /// `volume[v][s] = floor(v * (s as i8) / 256)`, stored as a two's complement byte
    pub volume: [[u8; 256]; VOLUME_LEVELS],
}

impl Tables {
    fn new() -> Self {
        let mut periods = [0u16; OCTAVE_SLOTS * OCTAVES];
        periods[..BASE_PERIODS.len()].copy_from_slice(&BASE_PERIODS);
        for i in OCTAVE_SLOTS..periods.len() {
            periods[i] = periods[i - OCTAVE_SLOTS] >> 1;
        }

        let mut volume = [[0u8; 256]; VOLUME_LEVELS];
        for (v, row) in volume.iter_mut().enumerate() {
            for (s, entry) in row.iter_mut().enumerate() {
                let scaled = (v as i32 * s as u8 as i8 as i32).div_euclid(256);
                *entry = scaled as i8 as u8;
            }
        }

        Self { periods, volume }
    }

    /// Raw table period for a note byte (`octave << 4 | semitone`); 0 outside the table
    #[inline]
    pub fn period(&self, note: u16) -> u16 {
        self.periods.get(note as usize).copied().unwrap_or(0)
    }

    /// Period for a note byte rescaled by the sample's C2SPD (0 means 8192)
    #[inline]
    pub fn note_period(&self, note: u16, c2spd: u16) -> u16 {
        let c2spd = if c2spd == 0 { DEFAULT_C2SPD } else { c2spd };
        (self.period(note) as u32 * DEFAULT_C2SPD as u32 / c2spd as u32) as u16
    }

    /// Scaled contribution of one waveform byte at mix volume `volume`
    #[inline]
    pub fn scale(&self, volume: u16, sample: u8) -> u8 {
        self.volume[volume as usize][sample as usize]
    }
}

/// Ticks per row and frames per tick for a tempo byte at `sample_rate`
///
/// `frames = rate / (50 - TEMPO_TABLE[tempo >> 4] * (tempo & 0xF) / 16)`. The
/// divisor is never zero but goes negative for very slow tempos; the result
/// then wraps into 16 bits.
pub fn tempo_timing(tempo: u8, sample_rate: u16) -> (u16, u16) {
    let ticks_per_row = (tempo >> 4) as u16;
    let fine = (TEMPO_TABLE[ticks_per_row as usize] as i32 * (tempo & 0x0F) as i32) >> 4;
    let divisor = 50 - fine;
    let frames_per_tick = (sample_rate as i32).checked_div(divisor).unwrap_or(0) as u16;
    (ticks_per_row, frames_per_tick)
}
