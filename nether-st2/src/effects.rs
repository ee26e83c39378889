//! Effect processing
//!
//! Row-level commands (speed, jump, break) are returned to the sequencer
//! as [`RowCommand`]s. Everything else runs per tick on the channel.

use nether_stm::effects as fx;

use crate::FX_MULT;
use crate::channel::St2Channel;
use crate::tables::{LFO_TABLE, OCTAVE_SLOTS, TABLES};

/// Decoded effect command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,
    SetSpeed,
    PositionJump,
    PatternBreak,
    VolumeSlide,
    PortamentoDown,
    PortamentoUp,
    TonePortamento,
    Vibrato,
    Tremor,
    Arpeggio,
    VibratoVolumeSlide,
    TonePortamentoVolumeSlide,
    /// Commands the tracker accepts but never acts on (0x0C-0x0E)
    Unused(u8),
}

impl Effect {
    /// Decode a 4-bit command nibble
    pub fn from_command(command: u8) -> Self {
        match command & 0x0F {
            fx::NONE => Self::None,
            fx::SET_SPEED => Self::SetSpeed,
            fx::POSITION_JUMP => Self::PositionJump,
            fx::PATTERN_BREAK => Self::PatternBreak,
            fx::VOLUME_SLIDE => Self::VolumeSlide,
            fx::PORTA_DOWN => Self::PortamentoDown,
            fx::PORTA_UP => Self::PortamentoUp,
            fx::TONE_PORTA => Self::TonePortamento,
            fx::VIBRATO => Self::Vibrato,
            fx::TREMOR => Self::Tremor,
            fx::ARPEGGIO => Self::Arpeggio,
            fx::VIBRATO_VOL_SLIDE => Self::VibratoVolumeSlide,
            fx::TONE_PORTA_VOL_SLIDE => Self::TonePortamentoVolumeSlide,
            other => Self::Unused(other),
        }
    }

    /// Effects that keep the vibrato phase running between ticks
    #[inline]
    fn keeps_vibrato_phase(self) -> bool {
        matches!(
            self,
            Self::Tremor | Self::Arpeggio | Self::TonePortamento | Self::Vibrato
        )
    }

    /// Effects that keep the tremor counter running between ticks
    #[inline]
    fn keeps_tremor(self) -> bool {
        matches!(self, Self::Tremor | Self::Arpeggio)
    }
}

/// Song-level command raised by a pattern event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowCommand {
    /// Replace the tempo byte
    SetTempo(u8),
    /// Continue at this order position after the current pattern
    PositionJump(u8),
    /// End the current pattern after this row
    PatternBreak,
}

impl St2Channel {
    /// Row-level command for the active event, if any
    pub fn row_command(&self) -> Option<RowCommand> {
        match self.effect {
            Effect::SetSpeed if self.param != 0 => Some(RowCommand::SetTempo(self.param)),
            Effect::PositionJump => Some(RowCommand::PositionJump(self.param)),
            Effect::PatternBreak => Some(RowCommand::PatternBreak),
            _ => None,
        }
    }

    /// Run the active effect for one tick
    ///
    /// `tick` is the countdown value of the song tick counter, which only
    /// matters to arpeggio.
    pub fn process_tick(&mut self, tick: u16, sample_rate: u16) {
        if !self.effect.keeps_tremor() {
            self.tremor_counter = 0;
            self.tremor_on = true;
        }
        if !self.effect.keeps_vibrato_phase() {
            self.vibrato_phase = 0;
        }

        match self.effect {
            Effect::Arpeggio => self.arpeggio(tick, sample_rate),
            Effect::Tremor => self.tremor(),
            Effect::TonePortamento => self.tone_portamento(sample_rate),
            Effect::Vibrato => self.vibrato(sample_rate),
            Effect::PortamentoDown => {
                self.period_current = self
                    .period_current
                    .wrapping_add(FX_MULT * self.param as u16);
                self.update_frequency(sample_rate);
            }
            Effect::PortamentoUp => {
                self.period_current = self
                    .period_current
                    .wrapping_sub(FX_MULT * self.param as u16);
                self.update_frequency(sample_rate);
            }
            Effect::VibratoVolumeSlide => {
                self.volume_slide();
                self.param = self.vibrato_memory;
                self.vibrato(sample_rate);
            }
            Effect::TonePortamentoVolumeSlide => {
                self.volume_slide();
                self.param = self.porta_memory;
                self.tone_portamento(sample_rate);
            }
            Effect::VolumeSlide => {
                self.snap_to_target(sample_rate);
                self.volume_slide();
            }
            Effect::None
            | Effect::SetSpeed
            | Effect::PositionJump
            | Effect::PatternBreak
            | Effect::Unused(_) => self.snap_to_target(sample_rate),
        }
    }

    /// Cycle base note, +x and +y semitones over three ticks
    fn arpeggio(&mut self, tick: u16, sample_rate: u16) {
        let semitones = match tick % 3 {
            1 => 0,
            2 => self.param >> 4,
            _ => self.param & 0x0F,
        } as u16;

        let mut octave = (self.last_note & 0xF0) as u16;
        let mut note = (self.last_note & 0x0F) as u16 + semitones;
        if note >= 12 {
            note -= 12;
            octave += OCTAVE_SLOTS as u16;
        }

        self.period_current = TABLES.note_period(octave + note, self.c2spd);
        self.update_frequency(sample_rate);
    }

    /// Alternate between full and zero volume; on for x ticks, off for y
    fn tremor(&mut self) {
        if self.tremor_counter != 0 {
            self.tremor_counter -= 1;
            return;
        }

        if self.tremor_on {
            self.tremor_on = false;
            self.volume_current = 0;
            self.tremor_counter = self.param & 0x0F;
        } else {
            self.tremor_on = true;
            self.volume_current = self.volume_initial;
            self.tremor_counter = self.param >> 4;
        }
    }

    /// Slide towards the target period without overshooting
    fn tone_portamento(&mut self, sample_rate: u16) {
        if self.param == 0 {
            self.param = self.porta_memory;
        }
        self.porta_memory = self.param;

        if self.period_current == self.period_target {
            return;
        }

        let speed = FX_MULT * self.param as u16;
        let target = self.period_target as i16;
        if (self.period_current as i16) > target {
            self.period_current = self.period_current.wrapping_sub(speed);
            if (self.period_current as i16) < target {
                self.period_current = self.period_target;
            }
        } else {
            self.period_current = self.period_current.wrapping_add(speed);
            if (self.period_current as i16) > target {
                self.period_current = self.period_target;
            }
        }
        self.update_frequency(sample_rate);
    }

    /// Sine modulation around the target period
    fn vibrato(&mut self, sample_rate: u16) {
        if self.param == 0 {
            self.param = self.vibrato_memory;
        }
        self.vibrato_memory = self.param;

        let lfo = LFO_TABLE[(self.vibrato_phase >> 1) as usize] as i32;
        let depth = (self.param & 0x0F) as i32;
        let offset = FX_MULT as i32 * ((lfo * depth) >> 7);
        self.period_current = (offset + self.period_target as i32) as u16;
        self.update_frequency(sample_rate);

        let speed = (self.param >> 4) << 1;
        self.vibrato_phase = self.vibrato_phase.wrapping_add(speed) & 0x7E;
    }

    /// Low nibble slides down (wins when both are set), high nibble slides up
    fn volume_slide(&mut self) {
        let down = (self.param & 0x0F) as u16;
        if down != 0 {
            self.volume_current = self.volume_current.saturating_sub(down);
        } else {
            self.volume_current += (self.param >> 4) as u16;
            if self.volume_current >= 65 {
                self.volume_current = 64;
            }
        }
    }

    /// Undo any pitch modulation left by a previous effect
    fn snap_to_target(&mut self, sample_rate: u16) {
        if self.period_current != self.period_target {
            self.period_current = self.period_target;
            self.update_frequency(sample_rate);
        }
    }
}
