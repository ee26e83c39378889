//! Module loading and session setup

use anyhow::{Context, Result};
use nether_st2::St2Player;
use nether_stm::{StmModule, parse_stm};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::PlaybackArgs;

/// Read and parse an STM file
pub fn load_module(path: &Path) -> Result<Arc<StmModule>> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let module =
        parse_stm(&data).with_context(|| format!("Failed to parse {}", path.display()))?;

    info!(
        name = %module.name,
        version = module.version.as_number(),
        patterns = module.patterns.len(),
        "Loaded STM module"
    );

    Ok(Arc::new(module))
}

/// Start a session with the given options
pub fn start_player(module: Arc<StmModule>, args: &PlaybackArgs) -> St2Player {
    let mut player = St2Player::new(module);
    player.start(args.rate);
    player.set_position(args.order);
    player
}

/// Whether the session has looped as often as requested
#[inline]
pub fn finished(player: &St2Player, args: &PlaybackArgs) -> bool {
    player.loop_count() >= args.loops.max(1)
}
