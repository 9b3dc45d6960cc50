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

//! Hot reload of a pack directory.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{error, info, warn};

use crate::keysound::Keysound;

/// Reloads a pack whenever files under its directory change. Dropping the
/// watcher stops it.
pub struct PackWatcher {
    dir: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl PackWatcher {
    /// Starts watching `dir`. Changes are batched until `debounce` passes
    /// without further changes, then the pack is reloaded once.
    pub fn start(
        keysound: Arc<Keysound>,
        dir: &Path,
        debounce: Duration,
    ) -> Result<PackWatcher, Box<dyn Error>> {
        let dir = dir.canonicalize()?;

        let reload_dir = dir.clone();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) if events.is_empty() => {}
                Ok(events) => {
                    info!(dir = ?reload_dir, changes = events.len(), "Pack changed, reloading");
                    if let Err(e) = keysound.reload_pack(&reload_dir) {
                        warn!(dir = ?reload_dir, err = %e, "Reload failed, keeping the active pack");
                    }
                }
                Err(e) => error!(dir = ?reload_dir, err = %e, "Pack watch error"),
            }
        })?;
        debouncer.watcher().watch(&dir, RecursiveMode::Recursive)?;

        info!(dir = ?dir, debounce = ?debounce, "Watching pack");
        Ok(PackWatcher {
            dir,
            _debouncer: debouncer,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::RecordingSink;
    use crate::state::ConfigState;
    use crate::code::{Code, Phase};
    use crate::testutil::{
        eventually, write_asset, write_test_asset, PackFixture, TEST_SAMPLE_RATE,
    };

    #[test]
    fn test_reloads_on_change() {
        let sink = Arc::new(RecordingSink::new(TEST_SAMPLE_RATE));
        let keysound = Arc::new(Keysound::with_sink(
            Arc::new(ConfigState::default()),
            sink,
            true,
        ));
        let fixture = PackFixture::new(
            r#"{ "name": "before", "keys": { "KeyA": { "down": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        keysound.reload_pack(fixture.path()).unwrap();

        let _watcher =
            PackWatcher::start(keysound.clone(), fixture.path(), Duration::from_millis(50)).unwrap();

        write_test_asset(&fixture.path().join("b.wav"));
        fixture.write_manifest(
            r#"{ "name": "after", "keys": { "KeyA": { "down": ["a.wav", "b.wav"] } } }"#,
        );

        eventually(
            || keysound.active_pack().is_some_and(|p| p.name() == "after"),
            "Pack was not reloaded",
        );
    }

    #[test]
    fn test_broken_edit_keeps_pack() {
        let sink = Arc::new(RecordingSink::new(TEST_SAMPLE_RATE));
        let keysound = Arc::new(Keysound::with_sink(
            Arc::new(ConfigState::default()),
            sink,
            true,
        ));
        let fixture = PackFixture::new(
            r#"{ "name": "good", "keys": { "KeyA": { "down": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        let good = keysound.reload_pack(fixture.path()).unwrap();

        let watcher =
            PackWatcher::start(keysound.clone(), fixture.path(), Duration::from_millis(50)).unwrap();
        assert_eq!(fixture.path().canonicalize().unwrap(), watcher.dir());

        fixture.write_manifest("{ not json");
        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(good.id, keysound.active_pack().unwrap().id());
    }

    #[test]
    fn test_reloads_on_asset_change() {
        let sink = Arc::new(RecordingSink::new(TEST_SAMPLE_RATE));
        let keysound = Arc::new(Keysound::with_sink(
            Arc::new(ConfigState::default()),
            sink.clone(),
            true,
        ));
        let fixture = PackFixture::new(
            r#"{ "name": "custom", "keys": { "KeyA": { "down": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        keysound.reload_pack(fixture.path()).unwrap();
        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
        assert_eq!(4410, sink.submissions()[0].clip.frames());

        let _watcher =
            PackWatcher::start(keysound.clone(), fixture.path(), Duration::from_millis(50)).unwrap();

        write_asset(&fixture.path().join("a.wav"), Duration::from_secs(1));

        eventually(
            || {
                keysound.trigger(Code::KeyA, Phase::Down);
                sink.submissions()
                    .last()
                    .is_some_and(|submission| submission.clip.frames() == 44100)
            },
            "Replaced asset was not picked up",
        );
    }
}
