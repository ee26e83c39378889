//! Nether-STM: STM (Scream Tracker 2) module format parser for Nethercore
//!
//! This crate parses Scream Tracker 2.xx `.stm` files into an [`StmModule`]:
//! the order list, the packed pattern grid and the 31 sample slots with
//! their waveform bodies. The result is consumed as-is by the `nether-st2`
//! replayer, which never touches the file again.
//!
//! # STM Format Overview
//!
//! - 48-byte header (song name, tracker tag, type, version, tempo, pattern
//!   count, global volume)
//! - 31 sample headers of 32 bytes each
//! - Order list (64 entries for 2.00, 128 otherwise)
//! - Patterns: 64 rows x 4 channels, each cell run-length packed
//! - Sample bodies at paragraph (16-byte) aligned offsets, `Module` files only
//!
//! # Usage
//!
//! ```ignore
//! use nether_stm::parse_stm;
//!
//! let data = std::fs::read("song.stm")?;
//! let module = parse_stm(&data)?;
//! println!("{} ({} patterns)", module.name, module.patterns.len());
//! ```

mod error;
mod module;
mod parser;

pub use error::StmError;
pub use module::{StmKind, StmModule, StmNote, StmPattern, StmSample, StmVersion};
pub use parser::parse_stm;

// =============================================================================
// Layout Constants
// =============================================================================

/// Number of pattern channels (STM is always 4-voice)
pub const NUM_CHANNELS: usize = 4;

/// Rows per pattern
pub const PATTERN_ROWS: usize = 64;

/// Bytes per packed cell
pub const CELL_BYTES: usize = 4;

/// Bytes per row (4 channels x 4 bytes)
pub const ROW_BYTES: usize = NUM_CHANNELS * CELL_BYTES;

/// Bytes per pattern (64 rows x 16 bytes)
pub const PATTERN_BYTES: usize = PATTERN_ROWS * ROW_BYTES;

/// Sample slots including the reserved slot 0
pub const NUM_SAMPLE_SLOTS: usize = 32;

/// Order list length after loading (2.00 files are padded)
pub const ORDER_LIST_LEN: usize = 128;

/// Maximum number of patterns addressable by the order list
pub const MAX_PATTERNS: usize = 64;

/// Default tempo byte (6 ticks per row, no fine adjustment)
pub const DEFAULT_TEMPO: u8 = 0x60;

/// Default/maximum global volume
pub const DEFAULT_GLOBAL_VOLUME: u8 = 64;

/// Default sample reference frequency (C2SPD)
pub const DEFAULT_C2SPD: u16 = 8192;

// =============================================================================
// Note / Volume / Order Sentinels
// =============================================================================

/// Note value for "note cut"
pub const NOTE_CUT: u8 = 254;

/// Note value for "no note"
pub const NOTE_NONE: u8 = 255;

/// Volume value for "no volume override"
pub const VOLUME_NONE: u8 = 65;

/// Loop end value meaning "sample does not loop"
pub const NO_LOOP: u16 = 0xFFFF;

/// Order entry: end of song, restart from order 0
pub const ORDER_END_RESTART: u8 = 98;

/// Order entry: end of song, restart from the marked loop start
pub const ORDER_END_LOOP: u8 = 99;

// =============================================================================
// Effect Constants
// =============================================================================

/// STM effect commands (low nibble of the third cell byte)
///
/// Commands 0x0C-0x0E can be entered in the editor but do nothing.
pub mod effects {
    /// No effect
    pub const NONE: u8 = 0x00;
    /// Axx - Set speed (tempo byte)
    pub const SET_SPEED: u8 = 0x01;
    /// Bxx - Position jump
    pub const POSITION_JUMP: u8 = 0x02;
    /// Cxx - Pattern break
    pub const PATTERN_BREAK: u8 = 0x03;
    /// Dxy - Volume slide
    pub const VOLUME_SLIDE: u8 = 0x04;
    /// Exx - Portamento down
    pub const PORTA_DOWN: u8 = 0x05;
    /// Fxx - Portamento up
    pub const PORTA_UP: u8 = 0x06;
    /// Gxx - Tone portamento
    pub const TONE_PORTA: u8 = 0x07;
    /// Hxy - Vibrato
    pub const VIBRATO: u8 = 0x08;
    /// Ixy - Tremor
    pub const TREMOR: u8 = 0x09;
    /// Jxy - Arpeggio
    pub const ARPEGGIO: u8 = 0x0A;
    /// Kxy - Vibrato + volume slide
    pub const VIBRATO_VOL_SLIDE: u8 = 0x0B;
    /// Oxy - Tone portamento + volume slide
    pub const TONE_PORTA_VOL_SLIDE: u8 = 0x0F;
}
