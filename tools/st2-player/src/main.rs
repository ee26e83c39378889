//! ST2 Player
//!
//! Plays Scream Tracker 2 modules through the default audio device,
//! renders them to WAV, or prints their contents.

mod audio;
mod cli;
mod info;
mod render;
mod song;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { file, playback } => {
            let module = song::load_module(&file)?;
            let mut player = song::start_player(module, &playback);
            let mut output = audio::AudioOutput::new()?;
            output.play(&mut player, &playback);
        }
        Commands::Render {
            file,
            output,
            playback,
            max_seconds,
        } => {
            let module = song::load_module(&file)?;
            let mut player = song::start_player(module, &playback);
            render::render_to_file(&mut player, &playback, &output, max_seconds)?;
        }
        Commands::Info { file } => {
            let module = song::load_module(&file)?;
            print!("{}", info::describe(&module));
        }
    }

    Ok(())
}
