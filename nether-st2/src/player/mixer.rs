//! Sample mixer

use nether_stm::NO_LOOP;

use super::St2Player;
use crate::channel::St2Channel;
use crate::tables::{TABLES, VOLUME_LEVELS};

impl St2Player {
    /// Render one unsigned 8-bit output sample
    ///
    /// Channel contributions are summed with 8-bit wraparound and biased by
    /// 128. The frame countdown runs after mixing, so a tick boundary affects
    /// the following sample.
    pub fn render_sample(&mut self) -> u8 {
        let mut mix: u8 = 0;

        for channel in &mut self.channels {
            let waveform = channel
                .waveform
                .and_then(|slot| self.module.sample(slot))
                .and_then(|sample| sample.data.as_deref());
            mix = mix.wrapping_add(channel.mix(waveform));
        }

        if self.current_frame == 1 {
            self.current_frame = self.frames_per_tick;
            self.process_tick();
        } else {
            self.current_frame = self.current_frame.wrapping_sub(1);
        }

        mix.wrapping_add(128)
    }

    /// Fill `out` with consecutive output samples
    pub fn render(&mut self, out: &mut [u8]) {
        for sample in out {
            *sample = self.render_sample();
        }
    }
}

impl St2Channel {
    /// Step the oscillator once; returns the signed contribution as a byte
    ///
    /// Reaching `loop_end` wraps the integer position to `loop_start` (the
    /// fraction is kept) or, without a loop, parks the channel as silent.
    /// The waveform byte is read at the position before the step and only
    /// counts while the stepped position is still short of `loop_end`.
    pub(crate) fn mix(&mut self, waveform: Option<&[u8]>) -> u8 {
        if (self.position >> 16) >= self.loop_end as u32 {
            if self.loop_start == NO_LOOP {
                self.silent = true;
                return 0;
            }
            self.position = ((self.loop_start as u32) << 16) | (self.position & 0xFFFF);
        }
        self.silent = false;

        let frame = (self.position >> 16) as usize;
        self.position = self.position.wrapping_add(self.step);

        let Some(data) = waveform else {
            return 0;
        };
        if (self.position >> 16) >= self.loop_end as u32
            || self.volume_mix as usize >= VOLUME_LEVELS
        {
            return 0;
        }

        data.get(frame)
            .map(|&byte| TABLES.scale(self.volume_mix, byte))
            .unwrap_or(0)
    }
}
