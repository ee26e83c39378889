//! Per-voice replayer state
//!
//! One [`St2Channel`] per pattern channel: oscillator (16.16 fixed-point
//! position and step), pitch, volume, and the effect memory that carries
//! across rows.

use nether_stm::{NO_LOOP, NOTE_CUT, NOTE_NONE, StmModule, StmNote, StmSample};

use crate::effects::{Effect, RowCommand};
use crate::tables::TABLES;
use crate::{BASE_FREQUENCY, MIN_AUDIBLE_PERIOD};

/// Per-channel playback state
#[derive(Clone, Debug, Default)]
pub struct St2Channel {
    /// Channel reads pattern rows (set by `start`)
    pub active: bool,
    /// Oscillator ran past a non-looping end on the last rendered sample
    pub silent: bool,
    /// Rows read from the current pattern
    pub row: u16,

    // Active event
    /// Command of the event currently in effect
    pub effect: Effect,
    /// Its parameter byte (may be rewritten by effect memory)
    pub param: u8,

    // Pitch
    /// Last note played (arpeggio base)
    pub last_note: u8,
    /// Instantaneous period
    pub period_current: u16,
    /// Period the note was triggered at / tone portamento target
    pub period_target: u16,

    // Effect memory
    /// Last non-zero tone portamento parameter
    pub porta_memory: u8,
    /// Last non-zero vibrato parameter
    pub vibrato_memory: u8,
    /// Vibrato phase (0-0x7E, even)
    pub vibrato_phase: u8,
    /// Ticks left in the current tremor phase
    pub tremor_counter: u8,
    /// Tremor currently audible
    pub tremor_on: bool,

    // Sample binding
    /// Last sample slot selected by an event (for display)
    pub instrument: u8,
    /// Slot whose waveform is being played, `None` when there is none
    pub waveform: Option<u8>,
    /// Loop start frame, `NO_LOOP` when the sample stops at `loop_end`
    pub loop_start: u16,
    /// Loop end (or sample length) frame
    pub loop_end: u16,
    /// Reference frequency of the bound sample
    pub c2spd: u16,

    // Oscillator
    /// 16.16 fixed-point sample position
    pub position: u32,
    /// 16.16 fixed-point position increment per output sample
    pub step: u32,

    // Volume
    /// Volume restored by tremor
    pub volume_initial: u16,
    /// Current volume; slides cap it at 64, loaded values may start higher
    pub volume_current: u16,
    /// Half the volume at the last note start, for level meters
    pub volume_meter: u16,
    /// `volume_current * global_volume / 64`, refreshed every tick
    pub volume_mix: u16,
}

impl St2Channel {
    /// Recompute the oscillator step from `period_current`
    #[inline]
    pub fn update_frequency(&mut self, sample_rate: u16) {
        self.step = step_for_period(self.period_current, sample_rate);
    }

    /// Period of `note` for the bound sample
    #[inline]
    pub fn note_period(&self, note: u16) -> u16 {
        TABLES.note_period(note, self.c2spd)
    }

    /// Apply a freshly read pattern cell
    ///
    /// Returns the row-level command the event carries, for the sequencer to
    /// apply before the next channel is processed.
    pub fn trigger(
        &mut self,
        event: StmNote,
        module: &StmModule,
        sample_rate: u16,
    ) -> Option<RowCommand> {
        self.effect = Effect::from_command(event.command);
        self.param = event.param;

        if let Some(volume) = event.volume_override() {
            self.volume_current = volume as u16;
            self.volume_initial = volume as u16;
        }

        // Tone portamento only retargets; the oscillator keeps running
        if self.effect == Effect::TonePortamento {
            if event.note != NOTE_NONE {
                self.period_target = self.note_period(event.note as u16);
            }
            if let Some(sample) = module.sample(event.sample).filter(|_| event.sample != 0) {
                self.bind_sample(event.sample, sample, event.volume_override().is_none());
            }
            return None;
        }

        let mut note = event.note;
        if let Some(sample) = module.sample(event.sample).filter(|_| event.sample != 0) {
            let take_volume = event.volume_override().is_none();
            if !self.bind_sample(event.sample, sample, take_volume) {
                note = NOTE_CUT;
            }
        }

        if note == NOTE_CUT {
            self.cut();
        } else if note != NOTE_NONE {
            self.last_note = note;
            self.volume_meter = self.volume_current >> 1;
            self.period_current = self.note_period(note as u16);
            self.period_target = self.period_current;
            self.update_frequency(sample_rate);
            self.position = 0;
        }

        self.row_command()
    }

    /// Bind a sample slot; returns whether it has waveform data
    fn bind_sample(&mut self, slot: u8, sample: &StmSample, take_volume: bool) -> bool {
        self.instrument = slot;
        if take_volume {
            self.volume_current = sample.volume as u16;
            self.volume_initial = sample.volume as u16;
        }

        self.c2spd = sample.c2spd;
        self.waveform = sample.data.as_ref().map(|_| slot);

        if sample.has_loop() {
            self.loop_end = sample.loop_end;
            self.loop_start = sample.loop_start;
        } else {
            self.loop_end = sample.length;
            self.loop_start = NO_LOOP;
        }

        self.waveform.is_some()
    }

    /// Stop the oscillator: rewind and disable the loop
    #[inline]
    pub fn cut(&mut self) {
        self.position = 0;
        self.loop_end = 0;
        self.loop_start = NO_LOOP;
    }

    /// Whether the oscillator is inside a playable region
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.waveform.is_some() && (self.position >> 16) < self.loop_end as u32
    }
}

/// 16.16 fixed-point oscillator step for `period` at `sample_rate`
///
/// The base frequency is divided by the period first, then split into
/// integer and fractional parts against the output rate. Periods below
/// `MIN_AUDIBLE_PERIOD` give a zero step.
pub fn step_for_period(period: u16, sample_rate: u16) -> u32 {
    if period < MIN_AUDIBLE_PERIOD || sample_rate == 0 {
        return 0;
    }

    let rate = sample_rate as u32;
    let freq = BASE_FREQUENCY / period as u32;
    let whole = ((freq / rate) & 0xFFFF) << 16;
    let frac = (((freq % rate) << 16) / rate) & 0xFFFF;
    whole | frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_stm::{StmSample, VOLUME_NONE};

    fn module_with_sample(data: Option<Vec<u8>>) -> StmModule {
        let mut module = StmModule::empty("channel");
        module.samples[1] = StmSample {
            name: "lead".to_string(),
            length: 100,
            loop_start: 10,
            loop_end: 90,
            volume: 40,
            c2spd: 8192,
            data,
            ..Default::default()
        };
        module.samples[2] = StmSample::from_pcm("hit", vec![0; 50], 20);
        module
    }

    fn note(note: u8, sample: u8) -> StmNote {
        StmNote {
            note,
            sample,
            ..StmNote::EMPTY
        }
    }

    #[test]
    fn test_step_for_period() {
        assert_eq!(step_for_period(550, 15909), 0);
        assert_eq!(step_for_period(0, 15909), 0);

        // 35468950 / 8000 = 4433; 4433 / 4433 = exactly one frame per sample
        assert_eq!(step_for_period(8000, 4433), 0x10000);

        // Two-stage division: 35468950 / 1712 = 20717
        let freq = 35_468_950u32 / 1712;
        let expected = ((freq / 48000) << 16) | (((freq % 48000) << 16) / 48000);
        assert_eq!(step_for_period(1712, 48000), expected);
    }

    #[test]
    fn test_trigger_note_binds_sample() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();
        ch.position = 0x50000;

        let cmd = ch.trigger(note(0x20, 1), &module, 15909);
        assert_eq!(cmd, None);
        assert_eq!(ch.waveform, Some(1));
        assert_eq!(ch.instrument, 1);
        assert_eq!(ch.volume_current, 40);
        assert_eq!(ch.volume_initial, 40);
        assert_eq!(ch.volume_meter, 20);
        assert_eq!(ch.loop_start, 10);
        assert_eq!(ch.loop_end, 90);
        assert_eq!(ch.last_note, 0x20);
        assert_eq!(ch.period_current, 4280);
        assert_eq!(ch.period_target, 4280);
        assert_eq!(ch.step, step_for_period(4280, 15909));
        assert_eq!(ch.position, 0);
    }

    #[test]
    fn test_volume_override_beats_sample_volume() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();

        let event = StmNote {
            volume: 12,
            ..note(0x20, 1)
        };
        ch.trigger(event, &module, 15909);
        assert_eq!(ch.volume_current, 12);
        assert_eq!(ch.volume_initial, 12);
    }

    #[test]
    fn test_sample_without_loop_uses_length() {
        let module = module_with_sample(None);
        let mut ch = St2Channel::default();

        ch.trigger(note(0x10, 2), &module, 15909);
        assert_eq!(ch.loop_end, 50);
        assert_eq!(ch.loop_start, NO_LOOP);
        assert_eq!(ch.volume_current, 20);
    }

    #[test]
    fn test_sample_without_data_cuts_note() {
        let module = module_with_sample(None);
        let mut ch = St2Channel::default();
        ch.position = 0x30000;

        ch.trigger(note(0x20, 1), &module, 15909);
        assert_eq!(ch.waveform, None);
        assert_eq!(ch.position, 0);
        assert_eq!(ch.loop_end, 0);
        assert_eq!(ch.loop_start, NO_LOOP);
        // No pitch change on a forced cut
        assert_eq!(ch.period_current, 0);
        assert!(!ch.is_playing());
    }

    #[test]
    fn test_note_cut_keeps_sample_binding() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();
        ch.trigger(note(0x20, 1), &module, 15909);
        ch.position = 0x40000;

        ch.trigger(StmNote::CUT, &module, 15909);
        assert_eq!(ch.waveform, Some(1));
        assert_eq!(ch.position, 0);
        assert_eq!(ch.loop_end, 0);
        assert_eq!(ch.volume_current, 40);
    }

    #[test]
    fn test_tone_portamento_only_retargets() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();
        ch.trigger(note(0x20, 1), &module, 15909);
        ch.position = 0x12345;
        let step = ch.step;

        let porta = StmNote {
            command: nether_stm::effects::TONE_PORTA,
            param: 4,
            ..note(0x30, 0)
        };
        ch.trigger(porta, &module, 15909);
        assert_eq!(ch.period_target, 2140);
        assert_eq!(ch.period_current, 4280);
        assert_eq!(ch.step, step);
        assert_eq!(ch.position, 0x12345);
        assert_eq!(ch.last_note, 0x20);
    }

    #[test]
    fn test_tone_portamento_applies_sample_change() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();
        ch.trigger(note(0x20, 1), &module, 15909);
        ch.position = 0x20000;

        let porta = StmNote {
            command: nether_stm::effects::TONE_PORTA,
            volume: VOLUME_NONE,
            ..note(NOTE_NONE, 2)
        };
        ch.trigger(porta, &module, 15909);
        assert_eq!(ch.waveform, Some(2));
        assert_eq!(ch.loop_end, 50);
        assert_eq!(ch.volume_current, 20);
        assert_eq!(ch.position, 0x20000);
        assert_eq!(ch.period_target, 4280);
    }

    #[test]
    fn test_row_commands_returned() {
        let module = module_with_sample(Some(vec![0; 100]));
        let mut ch = St2Channel::default();

        let speed = StmNote {
            command: nether_stm::effects::SET_SPEED,
            param: 0x40,
            ..StmNote::EMPTY
        };
        assert_eq!(
            ch.trigger(speed, &module, 15909),
            Some(RowCommand::SetTempo(0x40))
        );

        let zero_speed = StmNote { param: 0, ..speed };
        assert_eq!(ch.trigger(zero_speed, &module, 15909), None);

        let jump = StmNote {
            command: nether_stm::effects::POSITION_JUMP,
            param: 3,
            ..StmNote::EMPTY
        };
        assert_eq!(
            ch.trigger(jump, &module, 15909),
            Some(RowCommand::PositionJump(3))
        );

        let brk = StmNote {
            command: nether_stm::effects::PATTERN_BREAK,
            param: 0x10,
            ..StmNote::EMPTY
        };
        assert_eq!(
            ch.trigger(brk, &module, 15909),
            Some(RowCommand::PatternBreak)
        );
    }
}
