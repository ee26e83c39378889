//! STM file parser

use std::io::{Cursor, Read, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::error::StmError;
use crate::module::{StmKind, StmModule, StmPattern, StmSample, StmVersion};
use crate::{
    CELL_BYTES, DEFAULT_GLOBAL_VOLUME, MAX_PATTERNS, NO_LOOP, NUM_SAMPLE_SLOTS, ORDER_LIST_LEN,
    PATTERN_BYTES, StmNote, effects,
};

/// Header size in bytes
pub(crate) const HEADER_SIZE: usize = 48;

/// Sample header size in bytes
pub(crate) const SAMPLE_HEADER_SIZE: usize = 32;

/// Cell shorthand: all-zero cell
pub(crate) const PACK_ZERO: u8 = 0xFB;
/// Cell shorthand: "no note" cell
pub(crate) const PACK_EMPTY: u8 = 0xFC;
/// Cell shorthand: "note cut" cell
pub(crate) const PACK_CUT: u8 = 0xFD;

/// Parse an STM file into an StmModule
///
/// # Arguments
/// * `data` - Raw STM file bytes
///
/// # Returns
/// * `Ok(StmModule)` - Parsed module, sample bodies included for type 2 files
/// * `Err(StmError)` - Parse error
///
/// # Example
/// ```ignore
/// let data = std::fs::read("song.stm")?;
/// let module = parse_stm(&data)?;
/// println!("Loaded: {}", module.name);
/// ```
pub fn parse_stm(data: &[u8]) -> Result<StmModule, StmError> {
    if data.len() < HEADER_SIZE {
        return Err(StmError::TooSmall);
    }

    let mut cursor = Cursor::new(data);

    // Song name (20 bytes) and tracker tag (9 bytes)
    let mut name_bytes = [0u8; 20];
    read_bytes(&mut cursor, &mut name_bytes)?;
    let name = read_string(&name_bytes);

    let mut tag_bytes = [0u8; 9];
    read_bytes(&mut cursor, &mut tag_bytes)?;
    let tracker_name = read_string(&tag_bytes[..8]);

    let type_byte = read_u8(&mut cursor)?;
    let kind = StmKind::from_byte(type_byte).ok_or(StmError::UnknownType(type_byte))?;

    let version = StmVersion::new(read_u8(&mut cursor)?, read_u8(&mut cursor)?);
    if ![
        StmVersion::V2_00,
        StmVersion::V2_10,
        StmVersion::V2_20,
        StmVersion::V2_21,
    ]
    .contains(&version)
    {
        return Err(StmError::UnsupportedVersion {
            major: version.major,
            minor: version.minor,
        });
    }

    let mut tempo = read_u8(&mut cursor)?;
    if version.uses_decimal_speed() {
        tempo = decimal_to_speed(tempo);
    }

    let num_patterns = read_u8(&mut cursor)?;
    if num_patterns as usize > MAX_PATTERNS {
        return Err(StmError::TooManyPatterns(num_patterns));
    }

    // Global volume only exists from 2.20 on
    let gvol = read_u8(&mut cursor)?;
    let global_volume = if version > StmVersion::V2_10 {
        gvol
    } else {
        DEFAULT_GLOBAL_VOLUME
    };

    // Reserved (13 bytes)
    cursor
        .seek(SeekFrom::Start(HEADER_SIZE as u64))
        .map_err(|_| StmError::UnexpectedEof)?;

    let mut samples = Vec::with_capacity(NUM_SAMPLE_SLOTS);
    samples.push(StmSample::default());
    for slot in 1..NUM_SAMPLE_SLOTS {
        samples.push(parse_sample_header(&mut cursor, slot as u8)?);
    }

    // Order list: 64 entries in 2.00, 128 afterwards
    let order_count = if version == StmVersion::V2_00 {
        64
    } else {
        ORDER_LIST_LEN
    };
    let mut orders = vec![0u8; order_count];
    read_bytes(&mut cursor, &mut orders)?;
    orders.resize(ORDER_LIST_LEN, 0);

    let mut patterns = Vec::with_capacity(num_patterns as usize);
    for pattern_idx in 0..num_patterns {
        let pattern = parse_pattern(&mut cursor, version).map_err(|e| match e {
            StmError::UnexpectedEof => StmError::InvalidPattern(pattern_idx),
            other => other,
        })?;
        patterns.push(pattern);
    }

    if kind == StmKind::Module {
        for (slot, sample) in samples.iter_mut().enumerate().skip(1) {
            read_sample_body(data, slot as u8, sample)?;
        }
    }

    debug!(
        "Parsed STM '{}' v{}.{:02}: {} patterns, tempo {:#04x}, gvol {}",
        name,
        version.major,
        version.minor,
        patterns.len(),
        tempo,
        global_volume
    );

    Ok(StmModule {
        name,
        tracker_name,
        kind,
        version,
        tempo,
        global_volume,
        samples,
        orders,
        patterns,
    })
}

/// Parse one 32-byte sample header
fn parse_sample_header(cursor: &mut Cursor<&[u8]>, slot: u8) -> Result<StmSample, StmError> {
    let mut name_bytes = [0u8; 12];
    read_bytes(cursor, &mut name_bytes)?;

    let _id = read_u8(cursor)?;
    let disk = read_u8(cursor)?;
    let offset = read_u16(cursor)?;
    let length = read_u16(cursor)?;
    let loop_start = read_u16(cursor)?;
    let mut loop_end = read_u16(cursor)?;
    let volume = read_u8(cursor)?;
    let _reserved = read_u8(cursor)?;
    let c2spd = read_u16(cursor)?;
    let _reserved = read_u32(cursor)?;
    let _length_paragraphs = read_u16(cursor)?;

    if loop_end == 0 {
        loop_end = NO_LOOP;
    }

    // Some files carry loop points past the sample end
    if loop_end != NO_LOOP && loop_end > length {
        warn!(
            "Sample {}: loop end {} beyond length {}, clamping",
            slot, loop_end, length
        );
        loop_end = length;
    }

    Ok(StmSample {
        name: read_string(&name_bytes),
        disk,
        offset,
        length,
        loop_start,
        loop_end,
        volume,
        c2spd,
        data: None,
    })
}

/// Parse one packed pattern into its 1024-byte cell grid
fn parse_pattern(
    cursor: &mut Cursor<&[u8]>,
    version: StmVersion,
) -> Result<StmPattern, StmError> {
    let mut data = Vec::with_capacity(PATTERN_BYTES);

    while data.len() < PATTERN_BYTES {
        let code = read_u8(cursor)?;
        let cell = match code {
            PACK_ZERO => [0u8; CELL_BYTES],
            PACK_EMPTY => StmNote::EMPTY.pack(),
            PACK_CUT => StmNote::CUT.pack(),
            _ => {
                let sample_volume = read_u8(cursor)?;
                let volume_command = read_u8(cursor)?;
                let mut param = read_u8(cursor)?;
                if version.uses_decimal_speed() && volume_command & 0x0F == effects::SET_SPEED {
                    param = decimal_to_speed(param);
                }
                [code, sample_volume, volume_command, param]
            }
        };
        data.extend_from_slice(&cell);
    }

    Ok(StmPattern::from_bytes(data))
}

/// Load the waveform of a type-2 file's sample slot
fn read_sample_body(data: &[u8], slot: u8, sample: &mut StmSample) -> Result<(), StmError> {
    if sample.volume == 0 || sample.length == 0 {
        return Ok(());
    }

    let start = (sample.offset as usize) << 4;
    if start >= data.len() {
        return Err(StmError::InvalidSampleOffset {
            slot,
            offset: start,
        });
    }

    let end = start + sample.length as usize;
    let mut body = data[start..end.min(data.len())].to_vec();
    if body.len() < sample.length as usize {
        warn!(
            "Sample {}: body truncated ({} of {} bytes), padding with silence",
            slot,
            body.len(),
            sample.length
        );
        body.resize(sample.length as usize, 0);
    }

    sample.data = Some(body);
    Ok(())
}

/// Convert a decimal speed value (pre-2.21) to the tempo byte layout
#[inline]
pub(crate) fn decimal_to_speed(value: u8) -> u8 {
    ((value / 10) << 4).wrapping_add(value % 10)
}

fn read_bytes(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<(), StmError> {
    cursor.read_exact(buf).map_err(|_| StmError::UnexpectedEof)
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, StmError> {
    let mut buf = [0u8; 1];
    read_bytes(cursor, &mut buf)?;
    Ok(buf[0])
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, StmError> {
    let mut buf = [0u8; 2];
    read_bytes(cursor, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, StmError> {
    let mut buf = [0u8; 4];
    read_bytes(cursor, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_string(bytes: &[u8]) -> String {
    // Find null terminator or end of slice
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim_end().to_string()
}
