//! Offline rendering to WAV

use anyhow::{Context, Result};
use nether_st2::St2Player;
use std::path::Path;
use tracing::{debug, info};

use crate::cli::PlaybackArgs;
use crate::song::finished;

/// Samples rendered per block
const BLOCK_SIZE: usize = 4096;

/// Render until the song loops or `max_samples` is reached
///
/// Samples produced after the loop point inside the last block are dropped.
pub fn render_song(player: &mut St2Player, args: &PlaybackArgs, max_samples: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut block = [0u8; BLOCK_SIZE];

    while out.len() < max_samples && !finished(player, args) {
        let len = BLOCK_SIZE.min(max_samples - out.len());
        for (i, sample) in block[..len].iter_mut().enumerate() {
            if finished(player, args) {
                out.extend_from_slice(&block[..i]);
                return out;
            }
            *sample = player.render_sample();
        }
        out.extend_from_slice(&block[..len]);
    }

    debug!(samples = out.len(), loops = player.loop_count(), "Render finished");
    out
}

/// Write unsigned 8-bit mono samples to a WAV file
pub fn write_wav(path: &Path, samples: &[u8], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    // hound takes 8-bit samples as signed and stores them unsigned
    for &sample in samples {
        writer
            .write_sample((sample ^ 0x80) as i8)
            .context("Failed to write sample")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Render a session to `path`
pub fn render_to_file(
    player: &mut St2Player,
    args: &PlaybackArgs,
    path: &Path,
    max_seconds: u32,
) -> Result<()> {
    let rate = player.sample_rate() as u32;
    let max_samples = (rate as usize).saturating_mul(max_seconds as usize);
    let samples = render_song(player, args, max_samples);

    write_wav(path, &samples, rate)?;

    info!(
        path = %path.display(),
        seconds = samples.len() as f32 / rate as f32,
        "Rendered WAV"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::start_player;
    use nether_stm::{StmModule, StmNote, StmPattern, StmSample, effects};
    use std::sync::Arc;

    fn looping_module() -> Arc<StmModule> {
        let mut module = StmModule::empty("render");
        module.samples[1] = StmSample {
            loop_start: 0,
            loop_end: 32,
            ..StmSample::from_pcm("square", [[0x40u8; 16], [0xC0u8; 16]].concat(), 64)
        };
        let mut pattern = StmPattern::empty();
        pattern.set_event(
            0,
            0,
            StmNote {
                note: 0x20,
                sample: 1,
                ..StmNote::EMPTY
            },
        );
        pattern.set_event(
            1,
            0,
            StmNote {
                command: effects::PATTERN_BREAK,
                ..StmNote::EMPTY
            },
        );
        module.patterns.push(pattern);
        module.orders[0] = 0;
        Arc::new(module)
    }

    #[test]
    fn test_render_stops_at_loop() {
        let args = PlaybackArgs {
            rate: 8000,
            ..Default::default()
        };
        let mut player = start_player(looping_module(), &args);
        let samples = render_song(&mut player, &args, 1_000_000);

        // Two rows of 6 ticks, 160 samples each, plus the lead-in tick
        assert_eq!(samples.len(), 160 * 13);
        assert_eq!(player.loop_count(), 1);
        assert!(samples.iter().any(|&s| s != 128));
    }

    #[test]
    fn test_render_respects_sample_cap() {
        let args = PlaybackArgs {
            rate: 8000,
            loops: 5,
            order: 0,
        };
        let mut player = start_player(looping_module(), &args);
        let samples = render_song(&mut player, &args, 1000);
        assert_eq!(samples.len(), 1000);
    }

    #[test]
    fn test_write_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples = [128u8, 0, 255, 130, 1];

        write_wav(&path, &samples, 15909).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 15909);
        assert_eq!(spec.bits_per_sample, 8);

        let read: Vec<u8> = reader
            .samples::<i8>()
            .map(|s| (s.unwrap() as u8) ^ 0x80)
            .collect();
        assert_eq!(read, samples);
    }
}
