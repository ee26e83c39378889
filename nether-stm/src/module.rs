//! STM module data structures

use crate::{
    CELL_BYTES, DEFAULT_C2SPD, DEFAULT_GLOBAL_VOLUME, DEFAULT_TEMPO, NO_LOOP, NOTE_CUT, NOTE_NONE,
    NUM_SAMPLE_SLOTS, ORDER_END_LOOP, ORDER_LIST_LEN, PATTERN_BYTES, PATTERN_ROWS, ROW_BYTES,
    VOLUME_NONE,
};

/// Parsed STM module
///
/// Everything the replayer needs, in the layout the replayer reads it:
/// patterns stay packed as 4-byte cells so row cursors are plain offsets.
#[derive(Debug, Clone)]
pub struct StmModule {
    /// Song name (max 20 chars)
    pub name: String,
    /// Tracker tag from the header (normally "!Scream!")
    pub tracker_name: String,
    /// Song (external samples) or module (embedded samples)
    pub kind: StmKind,
    /// Format version
    pub version: StmVersion,
    /// Initial tempo byte (high nibble = ticks per row, low nibble = fine)
    pub tempo: u8,
    /// Global volume (0-64)
    pub global_volume: u8,
    /// Sample slots; index 0 is reserved and always empty
    pub samples: Vec<StmSample>,
    /// Order list (always `ORDER_LIST_LEN` entries)
    pub orders: Vec<u8>,
    /// Pattern data
    pub patterns: Vec<StmPattern>,
}

impl StmModule {
    /// Create an empty module: no patterns, every order entry "end of song"
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracker_name: "!Scream!".to_string(),
            kind: StmKind::Module,
            version: StmVersion::V2_21,
            tempo: DEFAULT_TEMPO,
            global_volume: DEFAULT_GLOBAL_VOLUME,
            samples: vec![StmSample::default(); NUM_SAMPLE_SLOTS],
            orders: vec![ORDER_END_LOOP; ORDER_LIST_LEN],
            patterns: Vec::new(),
        }
    }

    /// Order list entry at `order`, or `None` past the end of the list
    #[inline]
    pub fn order(&self, order: u16) -> Option<u8> {
        self.orders.get(order as usize).copied()
    }

    /// Sample slot, or `None` if out of range
    #[inline]
    pub fn sample(&self, slot: u8) -> Option<&StmSample> {
        self.samples.get(slot as usize)
    }

    /// Number of order entries before the first end-of-song marker
    pub fn song_length(&self) -> usize {
        self.orders
            .iter()
            .position(|&o| o >= crate::ORDER_END_RESTART)
            .unwrap_or(self.orders.len())
    }
}

/// STM file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmKind {
    /// Type 1: pattern data only, samples live on disk elsewhere
    Song,
    /// Type 2: samples embedded in the file
    Module,
}

impl StmKind {
    /// Decode the header type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Song),
            2 => Some(Self::Module),
            _ => None,
        }
    }
}

/// STM format version (major.minor, e.g. 2.21)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StmVersion {
    pub major: u8,
    pub minor: u8,
}

impl StmVersion {
    pub const V2_00: Self = Self::new(2, 0);
    pub const V2_10: Self = Self::new(2, 10);
    pub const V2_20: Self = Self::new(2, 20);
    pub const V2_21: Self = Self::new(2, 21);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Version as the tracker writes it in its UI (2.21 -> 221)
    #[inline]
    pub fn as_number(&self) -> u16 {
        self.major as u16 * 100 + self.minor as u16
    }

    /// Versions before 2.21 store speed values in decimal
    #[inline]
    pub fn uses_decimal_speed(&self) -> bool {
        self.as_number() < 221
    }
}

/// Sample slot metadata and waveform
#[derive(Debug, Clone, PartialEq)]
pub struct StmSample {
    /// Sample name (max 12 chars)
    pub name: String,
    /// Disk number the sample was saved from
    pub disk: u8,
    /// Body offset in 16-byte paragraphs
    pub offset: u16,
    /// Length in bytes (= frames, samples are 8-bit)
    pub length: u16,
    /// Loop start frame
    pub loop_start: u16,
    /// Loop end frame, or `NO_LOOP`
    pub loop_end: u16,
    /// Default volume (0-64)
    pub volume: u8,
    /// Playback rate of middle C
    pub c2spd: u16,
    /// 8-bit signed PCM, `None` when the slot has no body
    pub data: Option<Vec<u8>>,
}

impl Default for StmSample {
    fn default() -> Self {
        Self {
            name: String::new(),
            disk: 0,
            offset: 0,
            length: 0,
            loop_start: 0,
            loop_end: NO_LOOP,
            volume: 0,
            c2spd: DEFAULT_C2SPD,
            data: None,
        }
    }
}

impl StmSample {
    /// Build a sample from raw PCM bytes (length taken from the data)
    pub fn from_pcm(name: &str, data: Vec<u8>, volume: u8) -> Self {
        Self {
            name: name.to_string(),
            length: data.len().min(u16::MAX as usize) as u16,
            volume,
            data: Some(data),
            ..Default::default()
        }
    }

    /// Whether the sample has a loop
    #[inline]
    pub fn has_loop(&self) -> bool {
        self.loop_end != NO_LOOP
    }
}

/// One 64-row x 4-channel pattern, kept in its packed cell form
#[derive(Debug, Clone, PartialEq)]
pub struct StmPattern {
    data: Vec<u8>,
}

impl Default for StmPattern {
    fn default() -> Self {
        Self::empty()
    }
}

impl StmPattern {
    /// Pattern where every cell is "no note, no sample, no volume, no effect"
    pub fn empty() -> Self {
        let mut data = Vec::with_capacity(PATTERN_BYTES);
        for _ in 0..PATTERN_ROWS * crate::NUM_CHANNELS {
            data.extend_from_slice(&StmNote::EMPTY.pack());
        }
        Self { data }
    }

    /// Wrap already packed pattern bytes (short input is zero-padded)
    pub fn from_bytes(mut data: Vec<u8>) -> Self {
        data.resize(PATTERN_BYTES, 0);
        Self { data }
    }

    /// Packed bytes (`PATTERN_BYTES` long)
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of a cell within the pattern
    #[inline]
    pub fn cell_offset(row: usize, channel: usize) -> usize {
        row * ROW_BYTES + channel * CELL_BYTES
    }

    /// Decode the cell at `row`/`channel`, or `None` out of range
    pub fn event(&self, row: usize, channel: usize) -> Option<StmNote> {
        if channel >= crate::NUM_CHANNELS {
            return None;
        }
        let offset = Self::cell_offset(row, channel);
        let cell: [u8; 4] = self.data.get(offset..offset + CELL_BYTES)?.try_into().ok()?;
        Some(StmNote::unpack(cell))
    }

    /// Overwrite the cell at `row`/`channel` (ignored out of range)
    pub fn set_event(&mut self, row: usize, channel: usize, note: StmNote) {
        if row >= PATTERN_ROWS || channel >= crate::NUM_CHANNELS {
            return;
        }
        let offset = Self::cell_offset(row, channel);
        self.data[offset..offset + CELL_BYTES].copy_from_slice(&note.pack());
    }
}

/// Single unpacked pattern cell
///
/// Packed layout:
/// - byte 0: note (`octave << 4 | semitone`, 254 = cut, 255 = none)
/// - byte 1: sample in bits 3-7, volume bits 0-2 in bits 0-2
/// - byte 2: volume bits 3-6 in bits 4-7, command in bits 0-3
/// - byte 3: command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmNote {
    pub note: u8,
    pub sample: u8,
    pub volume: u8,
    pub command: u8,
    pub param: u8,
}

impl Default for StmNote {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl StmNote {
    /// Cell that changes nothing
    pub const EMPTY: Self = Self {
        note: NOTE_NONE,
        sample: 0,
        volume: VOLUME_NONE,
        command: 0,
        param: 0,
    };

    /// Cell that silences the channel
    pub const CUT: Self = Self {
        note: NOTE_CUT,
        ..Self::EMPTY
    };

    /// Decode a packed 4-byte cell
    #[inline]
    pub fn unpack(cell: [u8; 4]) -> Self {
        Self {
            note: cell[0],
            sample: cell[1] >> 3,
            volume: (cell[1] & 0x07) | ((cell[2] >> 1) & 0x78),
            command: cell[2] & 0x0F,
            param: cell[3],
        }
    }

    /// Encode into a packed 4-byte cell
    #[inline]
    pub fn pack(&self) -> [u8; 4] {
        [
            self.note,
            (self.sample << 3) | (self.volume & 0x07),
            ((self.volume & 0x78) << 1) | (self.command & 0x0F),
            self.param,
        ]
    }

    /// Note from octave and semitone
    #[inline]
    pub fn note_value(octave: u8, semitone: u8) -> u8 {
        (octave << 4) | (semitone & 0x0F)
    }

    /// Check if this cell starts a note
    #[inline]
    pub fn has_note(&self) -> bool {
        self.note != NOTE_NONE && self.note != NOTE_CUT
    }

    /// Get the volume override, if any
    #[inline]
    pub fn volume_override(&self) -> Option<u8> {
        (self.volume != VOLUME_NONE).then_some(self.volume)
    }
}
