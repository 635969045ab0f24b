//! carta - a cartography tool for voxel worlds.

mod cli;
mod driver;
mod error;
mod font;
mod markers;
mod players;
mod progress;

use carta_blocks::{load_palette, write_palette};

use crate::cli::Command;
use crate::progress::{Progress, ProgressMode};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(run(args));
}

fn run(args: Vec<String>) -> i32 {
    let command = match cli::parse(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("carta: {}", e);
            return 1;
        }
    };

    let mut settings = match command {
        Command::Help => {
            print!("{}", cli::help());
            return 0;
        }
        Command::Version => {
            print!("{}", cli::version());
            return 0;
        }
        Command::ListColors => {
            let materials = carta_blocks::MaterialTable::new();
            for (id, m) in materials.iter() {
                println!(
                    "{}: {} = {},{},{},{}",
                    id, m.name, m.base.r, m.base.g, m.base.b, m.base.a
                );
            }
            return 0;
        }
        Command::Run(settings) => settings,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if settings.debug { "debug" } else { "warn" },
    ))
    .init();

    let progress = Progress::new(if settings.binary {
        ProgressMode::Binary
    } else if settings.silent {
        ProgressMode::Silent
    } else {
        ProgressMode::Text
    });

    match run_settings(&mut settings, &progress) {
        Ok(()) => {
            progress.end();
            0
        }
        Err(e) => {
            progress.error(&e.to_string());
            1
        }
    }
}

fn run_settings(
    settings: &mut cli::Settings,
    progress: &Progress,
) -> Result<(), crate::error::Error> {
    if let Some(path) = settings.palette_write.take() {
        write_palette(&settings.materials, &path)?;
        progress.note(&format!("Wrote palette to {}", path.display()));
    }
    if let Some(path) = settings.palette_read.take() {
        load_palette(&mut settings.materials, &path)?;
        progress.note(&format!("Read palette from {}", path.display()));
    }

    if settings.world_path.is_some() {
        driver::do_world(settings, progress)?;
    } else {
        progress.note("Type `-h' for help");
    }
    Ok(())
}
