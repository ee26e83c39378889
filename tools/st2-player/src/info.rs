//! Module summary for the `info` command

use nether_stm::{StmKind, StmModule};
use std::fmt::Write;

/// Human-readable header, order list and sample table
pub fn describe(module: &StmModule) -> String {
    let mut out = String::new();
    let kind = match module.kind {
        StmKind::Song => "song (no sample data)",
        StmKind::Module => "module",
    };

    let _ = writeln!(out, "Name:          {}", module.name);
    let _ = writeln!(out, "Tracker:       {}", module.tracker_name);
    let _ = writeln!(
        out,
        "Version:       {}.{:02} ({})",
        module.version.major, module.version.minor, kind
    );
    let _ = writeln!(
        out,
        "Tempo:         {:#04x} ({} ticks/row)",
        module.tempo,
        module.tempo >> 4
    );
    let _ = writeln!(out, "Global volume: {}", module.global_volume);
    let _ = writeln!(out, "Patterns:      {}", module.patterns.len());

    let song_length = module.song_length();
    let orders: Vec<String> = module.orders[..song_length]
        .iter()
        .map(|o| o.to_string())
        .collect();
    let _ = writeln!(out, "Orders ({}):    {}", song_length, orders.join(" "));

    let _ = writeln!(out);
    let _ = writeln!(out, " #  Name          Length  Loop         Vol  C2SPD");
    for (slot, sample) in module.samples.iter().enumerate().skip(1) {
        if sample.length == 0 && sample.name.is_empty() {
            continue;
        }
        let looping = if sample.has_loop() {
            format!("{:>5}-{:<5}", sample.loop_start, sample.loop_end)
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:>2}  {:<12}  {:>6}  {:<11}  {:>3}  {:>5}{}",
            slot,
            sample.name,
            sample.length,
            looping,
            sample.volume,
            sample.c2spd,
            if sample.data.is_some() { "" } else { "  (no data)" }
        );
    }

    out
}
