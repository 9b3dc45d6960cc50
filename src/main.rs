// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use keysound::audio;
use keysound::code::{Code, Phase};
use keysound::config::Settings;
use keysound::engine::Outcome;
use keysound::pack;
use keysound::state::ConfigState;
use keysound::watch::PackWatcher;
use keysound::Keysound;
use tracing_subscriber::EnvFilter;

/// Keyboard packs installed by the user, relative to the home directory.
const CUSTOM_KEYBOARD_DIR: &str = "sounds/keysound_custom";
/// Mouse packs installed by the user, relative to the home directory.
const CUSTOM_MOUSE_DIR: &str = "sounds/keysound_mouse_custom";

/// How long `test` waits for the sound to finish.
const TEST_PLAYBACK_WAIT: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Mechanical keyboard and mouse sounds for your real keyboard and mouse."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads and decodes a sound pack and prints its definitions.
    Verify {
        /// The path to the pack directory.
        path: String,
    },
    /// Lists the sound packs in the custom pack folders.
    Packs {
        /// List this folder instead of the custom pack folders.
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Plays one sound from a pack through the audio device.
    Test {
        /// The path to the pack directory.
        path: String,
        /// The key or button code to play, for example KeyA or MouseLeft.
        code: String,
        /// Play the release sound instead of the press sound.
        #[arg(short, long)]
        up: bool,
        /// The device name to play through. The default output device when unset.
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Plays pack sounds for keyboard and mouse input until interrupted.
    Start {
        /// The path to the settings file.
        #[arg(short, long)]
        config: Option<String>,
        /// The pack to load. Overrides the settings file.
        #[arg(short, long)]
        pack: Option<String>,
        /// Reload the pack when its files change.
        #[arg(short, long)]
        watch: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { path } => {
            let sink = audio::open_sink(Some("mock"), audio::DEFAULT_MAX_VOICES)?;
            let keysound = Keysound::with_sink(Arc::new(ConfigState::default()), sink, true);
            let summary = keysound.reload_pack(Path::new(&path))?;
            println!("{}", summary);

            let Some(pack) = keysound.active_pack() else {
                return Err("pack was not activated".into());
            };
            for definition in pack.definitions() {
                let files: Vec<String> = definition
                    .variants
                    .iter()
                    .map(|clip| relative(pack.dir(), clip.path()))
                    .collect();
                println!(
                    "- {} {}: {}",
                    definition.code,
                    definition.phase,
                    files.join(", ")
                );
            }
            for phase in [Phase::Down, Phase::Up] {
                if let Some(variants) = pack.default_for(phase) {
                    let files: Vec<String> = variants
                        .iter()
                        .map(|clip| relative(pack.dir(), clip.path()))
                        .collect();
                    println!("- default {}: {}", phase, files.join(", "));
                }
            }
            println!(
                "Decoded {} clips ({} KB).",
                keysound.cache().len(),
                keysound.cache().memory_usage() / 1024
            );
        }
        Commands::Packs { dir } => {
            let roots = match dir {
                Some(dir) => vec![PathBuf::from(dir)],
                None => custom_dirs()?,
            };

            for root in roots {
                let packs = pack::discover(&root)?;
                if packs.is_empty() {
                    println!("No packs found in {}.", root.display());
                    continue;
                }

                println!("Packs in {} (count: {}):", root.display(), packs.len());
                for path in packs {
                    match pack::load(&path) {
                        Ok(pack) => println!("- {}", pack),
                        Err(e) => println!("- {} (invalid: {})", path.display(), e),
                    }
                }
            }
        }
        Commands::Test {
            path,
            code,
            up,
            device,
        } => {
            let code: Code = code.parse()?;
            let phase = if up { Phase::Up } else { Phase::Down };

            let sink = audio::open_sink(device.as_deref(), audio::DEFAULT_MAX_VOICES)?;
            let keysound = Keysound::with_sink(Arc::new(ConfigState::default()), sink, true);
            println!("{}", keysound.reload_pack(Path::new(&path))?);

            match keysound.trigger(code, phase) {
                Outcome::Played { source, .. } => {
                    println!("Playing {}", source.display());
                    thread::sleep(TEST_PLAYBACK_WAIT);
                }
                outcome => return Err(format!("{} {} did not play: {:?}", code, phase, outcome).into()),
            }
        }
        Commands::Start {
            config,
            pack,
            watch,
        } => {
            let mut settings = match config {
                Some(path) => Settings::deserialize(Path::new(&path))?,
                None => Settings::default(),
            };
            if let Some(pack) = pack {
                settings = settings.with_pack(PathBuf::from(pack));
            }
            if watch {
                settings = settings.with_watch(true);
            }
            custom_dirs()?;

            let pack = settings
                .pack()
                .ok_or("no pack given, use --pack or set pack in the settings file")?
                .to_path_buf();

            let sink = audio::open_sink(settings.device(), settings.max_voices())?;
            let state = Arc::new(ConfigState::new(settings.toggles()));
            let keysound = Arc::new(Keysound::with_sink(state, sink, settings.suppress_repeats()));
            println!("{}", keysound.reload_pack(&pack)?);

            let _watcher = if settings.watch() {
                Some(PackWatcher::start(
                    keysound.clone(),
                    &pack,
                    settings.watch_debounce()?,
                )?)
            } else {
                None
            };

            listen(keysound)?;
        }
    }

    Ok(())
}

/// Returns the custom pack folders, creating them if needed.
fn custom_dirs() -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let home = dirs::home_dir().ok_or("unable to find the home directory")?;
    let dirs = vec![home.join(CUSTOM_KEYBOARD_DIR), home.join(CUSTOM_MOUSE_DIR)];
    for dir in &dirs {
        fs::create_dir_all(dir)?;
    }
    Ok(dirs)
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(feature = "listen")]
fn listen(keysound: Arc<Keysound>) -> Result<(), Box<dyn Error>> {
    keysound::input::listen::listen(keysound)
}

#[cfg(not(feature = "listen"))]
fn listen(_: Arc<Keysound>) -> Result<(), Box<dyn Error>> {
    Err("input capture is not available, rebuild with --features listen".into())
}
