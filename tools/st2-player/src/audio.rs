//! Real-time playback through cpal
//!
//! The render loop on the main thread pushes samples into a ring buffer;
//! the device callback drains it. The replayer runs at its own session
//! rate and is stepped to the device rate by sample-and-hold.

use anyhow::{Context, Result, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use nether_st2::St2Player;
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::cli::PlaybackArgs;
use crate::song::finished;

/// Ring buffer size in device samples (~200ms of stereo at 48 kHz)
const RING_BUFFER_SIZE: usize = 19200;

/// How long the render loop sleeps when the ring is full
const FILL_INTERVAL: Duration = Duration::from_millis(5);

/// Audio output using cpal and ring buffer
pub struct AudioOutput {
    producer: ringbuf::HeapProd<f32>,
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: usize,
}

impl AudioOutput {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .context("No audio output device available")?;

        let config = device
            .default_output_config()
            .context("Failed to get default output config")?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let ring = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = ring.split();

        let stream_config = config.config();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, consumer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, consumer),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, consumer),
            format => bail!("Unsupported sample format: {:?}", format),
        }
        .with_context(|| format!("Failed to build {:?} audio stream", config.sample_format()))?;

        stream.play().context("Failed to start audio stream")?;

        debug!(sample_rate, channels, "Audio stream started");

        Ok(Self {
            producer,
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    /// Play `player` until it has looped `args.loops` times
    pub fn play(&mut self, player: &mut St2Player, args: &PlaybackArgs) {
        let mut resampler = Resampler::new(player.sample_rate() as u32, self.sample_rate);
        let mut frame = vec![0.0f32; self.channels];

        info!(
            device_rate = self.sample_rate,
            session_rate = player.sample_rate(),
            "Playing"
        );

        let mut last_order = player.order();
        while !finished(player, args) {
            while self.producer.vacant_len() >= self.channels && !finished(player, args) {
                let sample = resampler.next(|| player.render_sample());
                frame.fill(to_f32(sample));
                self.producer.push_slice(&frame);
            }

            if player.order() != last_order {
                last_order = player.order();
                info!(
                    order = last_order,
                    pattern = player.pattern(),
                    loops = player.loop_count(),
                    "Position"
                );
            }

            thread::sleep(FILL_INTERVAL);
        }

        // Let the device drain what is queued
        while self.producer.occupied_len() > 0 {
            thread::sleep(FILL_INTERVAL);
        }
    }
}

/// Output stream in the device's native sample type, draining `consumer`
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: ringbuf::HeapCons<f32>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut temp_buffer: Vec<f32> = vec![0.0; 4096];
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if temp_buffer.len() < data.len() {
                temp_buffer.resize(data.len(), 0.0);
            }
            let popped = consumer.pop_slice(&mut temp_buffer[..data.len()]);
            write_frames(data, &temp_buffer[..popped]);
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )
}

/// Convert `samples` into the head of `data`; the rest is silence
fn write_frames<T>(data: &mut [T], samples: &[f32])
where
    T: Sample + FromSample<f32>,
{
    for (out, &f) in data.iter_mut().zip(samples) {
        *out = T::from_sample(f);
    }
    let written = samples.len().min(data.len());
    data[written..].fill(T::EQUILIBRIUM);
}

/// Unsigned 8-bit sample to f32 in [-1, 1)
#[inline]
pub fn to_f32(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 128.0
}

/// Sample-and-hold rate converter from the session rate to the device rate
pub struct Resampler {
    source_rate: u32,
    target_rate: u32,
    /// Accumulated source time, in units of `1 / target_rate`
    phase: u32,
    held: u8,
}

impl Resampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate: target_rate.max(1),
            phase: target_rate.max(1),
            held: 128,
        }
    }

    /// Next device-rate sample, pulling source samples from `render` as needed
    pub fn next(&mut self, mut render: impl FnMut() -> u8) -> u8 {
        while self.phase >= self.target_rate {
            self.phase -= self.target_rate;
            self.held = render();
        }
        self.phase += self.source_rate;
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_f32() {
        assert_eq!(to_f32(128), 0.0);
        assert_eq!(to_f32(0), -1.0);
        assert!(to_f32(255) < 1.0);
    }

    #[test]
    fn test_write_frames_pads_with_silence() {
        let mut float = [1.0f32; 4];
        write_frames(&mut float, &[0.5, -0.5]);
        assert_eq!(float, [0.5, -0.5, 0.0, 0.0]);

        let mut signed = [7i16; 4];
        write_frames(&mut signed, &[0.0, -1.0]);
        assert_eq!(signed, [0, i16::MIN, 0, 0]);

        let mut unsigned = [7u16; 3];
        write_frames(&mut unsigned, &[0.0]);
        assert_eq!(unsigned, [32768, 32768, 32768]);
    }

    #[test]
    fn test_resampler_same_rate_is_identity() {
        let mut source = 0u8;
        let mut resampler = Resampler::new(48000, 48000);
        let out: Vec<u8> = (0..5)
            .map(|_| {
                resampler.next(|| {
                    source += 1;
                    source
                })
            })
            .collect();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_resampler_upsamples_by_holding() {
        let mut source = 0u8;
        let mut resampler = Resampler::new(24000, 48000);
        let out: Vec<u8> = (0..6)
            .map(|_| {
                resampler.next(|| {
                    source += 1;
                    source
                })
            })
            .collect();
        assert_eq!(out, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_resampler_downsamples_by_skipping() {
        let mut source = 0u8;
        let mut resampler = Resampler::new(48000, 24000);
        let out: Vec<u8> = (0..3)
            .map(|_| {
                resampler.next(|| {
                    source += 1;
                    source
                })
            })
            .collect();
        assert_eq!(out, vec![1, 3, 5]);
    }
}
