//! Tick, row and order-list sequencing

use nether_stm::{NUM_CHANNELS, ORDER_END_LOOP, ORDER_END_RESTART, PATTERN_ROWS, StmNote};
use tracing::debug;

use super::St2Player;
use crate::effects::{Effect, RowCommand};

/// Cell read from a pattern the module does not contain
const MISSING_CELL: StmNote = StmNote {
    note: 0,
    sample: 0,
    volume: 0,
    command: 0,
    param: 0,
};

impl St2Player {
    /// Advance one tick
    ///
    /// Non-zero countdown: run per-tick effects on every channel. Zero: read
    /// the next row (unless in single-row mode) and reload the countdown.
    /// Mix volumes are refreshed either way.
    pub(crate) fn process_tick(&mut self) {
        if self.current_tick != 0 {
            self.current_tick -= 1;
            for channel in &mut self.channels {
                channel.process_tick(self.current_tick, self.sample_rate);
            }
        } else if !self.single_row {
            if self.pattern_change_pending {
                self.pattern_change_pending = false;
                self.change_pattern();
            }

            for idx in 0..NUM_CHANNELS {
                self.process_row(idx);
            }

            self.current_tick = self.ticks_per_row.saturating_sub(1);
        }

        let global_volume = self.global_volume as u16;
        for channel in &mut self.channels {
            channel.volume_mix = (channel.volume_current * global_volume) >> 6;
        }
    }

    /// Read the next cell for channel `idx` and trigger it
    fn process_row(&mut self, idx: usize) {
        let channel = &mut self.channels[idx];
        channel.row += 1;
        if channel.row as usize >= PATTERN_ROWS {
            self.pattern_change_pending = true;
        }

        if !channel.active {
            return;
        }

        let row = (channel.row - 1) as usize;
        let event = self
            .module
            .patterns
            .get(self.pattern_current as usize)
            .and_then(|pattern| pattern.event(row, idx))
            .unwrap_or(MISSING_CELL);

        let command = channel.trigger(event, &self.module, self.sample_rate);
        if channel.effect == Effect::Tremor {
            channel.process_tick(self.current_tick, self.sample_rate);
        }

        if let Some(command) = command {
            self.apply_row_command(command);
        }
    }

    fn apply_row_command(&mut self, command: RowCommand) {
        match command {
            RowCommand::SetTempo(tempo) => self.set_tempo(tempo),
            RowCommand::PositionJump(order) => self.order_next = order as u16,
            RowCommand::PatternBreak => self.pattern_change_pending = true,
        }
    }

    /// Move to the pattern at `order_next`, wrapping at end-of-song markers
    ///
    /// Order positions past the end of the list read as "loop to mark".
    pub(crate) fn change_pattern(&mut self) {
        let entry = self.module.order(self.order_next).unwrap_or(ORDER_END_LOOP);
        if entry == ORDER_END_RESTART || entry == ORDER_END_LOOP {
            self.order_next = if entry == ORDER_END_LOOP {
                self.order_first
            } else {
                0
            };
            self.loop_count = self.loop_count.wrapping_add(1);
            debug!(
                loop_count = self.loop_count,
                order = self.order_next,
                "ST2 song wrapped"
            );
        }

        self.pattern_current = self.module.order(self.order_next).unwrap_or(ORDER_END_LOOP) as u16;
        self.order_current = self.order_next;
        self.order_next = self.order_next.wrapping_add(1);

        for channel in &mut self.channels {
            channel.row = 0;
        }

        debug!(
            order = self.order_current,
            pattern = self.pattern_current,
            "ST2 pattern change"
        );
    }
}
