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

//! The control surface the shell drives: pack switching, toggles and input.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, span, warn, Level};

use crate::audio::Sink;
use crate::clips::{ClipCache, SymphoniaDecoder};
use crate::code::{Code, Phase};
use crate::engine::{Outcome, PlaybackEngine};
use crate::input::{InputRouter, PlaybackRequest, RawEvent};
use crate::pack::{self, LoadError, PackId, SoundPack, MANIFEST_FILE};
use crate::state::{ConfigState, ToggleState};

/// What the shell is told about a freshly installed pack.
#[derive(Debug, Clone, PartialEq)]
pub struct PackSummary {
    pub id: PackId,
    pub name: String,
    pub dir: PathBuf,
    pub definitions: usize,
    pub assets: usize,
}

impl From<&SoundPack> for PackSummary {
    fn from(pack: &SoundPack) -> Self {
        PackSummary {
            id: pack.id(),
            name: pack.name().to_string(),
            dir: pack.dir().to_path_buf(),
            definitions: pack.definitions().len(),
            assets: pack.assets().len(),
        }
    }
}

impl fmt::Display for PackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Definitions={}, Assets={}) ({})",
            self.name,
            self.definitions,
            self.assets,
            self.dir.display()
        )
    }
}

/// Owns the active pack and everything needed to play it.
pub struct Keysound {
    state: Arc<ConfigState>,
    engine: PlaybackEngine,
    router: Mutex<InputRouter>,
    active: RwLock<Option<Arc<SoundPack>>>,
    /// Serializes pack switches.
    switching: Mutex<()>,
}

impl Keysound {
    pub fn new(state: Arc<ConfigState>, engine: PlaybackEngine, suppress_repeats: bool) -> Keysound {
        Keysound {
            state,
            engine,
            router: Mutex::new(InputRouter::new(suppress_repeats)),
            active: RwLock::new(None),
            switching: Mutex::new(()),
        }
    }

    /// Creates a keysound playing through `sink`, decoding clips with symphonia
    /// at the sink's sample rate.
    pub fn with_sink(state: Arc<ConfigState>, sink: Arc<dyn Sink>, suppress_repeats: bool) -> Keysound {
        let cache = Arc::new(ClipCache::new(Box::new(SymphoniaDecoder::new(
            sink.sample_rate(),
        ))));
        Keysound::new(state, PlaybackEngine::new(cache, sink), suppress_repeats)
    }

    /// Loads the pack in `dir`, decodes all of its clips and makes it the
    /// active pack. On failure the previously active pack stays active.
    pub fn reload_pack(&self, dir: &Path) -> Result<PackSummary, LoadError> {
        let span = span!(Level::INFO, "reload pack");
        let _enter = span.enter();
        let _switching = self.switching.lock();

        let pack = pack::load(dir)?;
        if let Err(e) = self.preload(&pack) {
            self.engine.cache().evict(pack.id());
            warn!(path = ?dir, err = %e, "Pack rejected, keeping the active pack");
            return Err(e);
        }

        let summary = PackSummary::from(&pack);
        let previous = self.active.write().replace(Arc::new(pack));
        if let Some(previous) = previous {
            self.engine.cache().evict(previous.id());
        }

        info!(
            pack = %summary,
            cached_clips = self.engine.cache().len(),
            memory_kb = self.engine.cache().memory_usage() / 1024,
            "Pack active"
        );
        Ok(summary)
    }

    /// Decodes every asset the pack uses from disk, even ones an earlier pack
    /// already cached, and checks segments against the decoded lengths.
    fn preload(&self, pack: &SoundPack) -> Result<(), LoadError> {
        for asset in pack.assets() {
            self.engine.cache().refresh(asset, pack.id())?;
        }
        for clip_ref in pack.clip_refs() {
            if let Some(segment) = clip_ref.segment() {
                let clip = self.engine.cache().get(clip_ref.path(), pack.id())?;
                if clip.segment(segment.start, segment.duration).is_none() {
                    return Err(LoadError::malformed(
                        pack.dir().join(MANIFEST_FILE),
                        format!(
                            "segment at {}ms is past the end of {} ({}ms)",
                            segment.start.as_millis(),
                            clip_ref.path().display(),
                            clip.duration().as_millis()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Clears the active pack and releases its clips.
    pub fn unload_pack(&self) -> Option<PackSummary> {
        let _switching = self.switching.lock();
        let previous = self.active.write().take()?;
        self.engine.cache().evict(previous.id());
        info!(pack = previous.name(), "Pack unloaded");
        Some(PackSummary::from(previous.as_ref()))
    }

    pub fn active_pack(&self) -> Option<Arc<SoundPack>> {
        self.active.read().clone()
    }

    /// Routes a raw input event and plays the resulting request.
    pub fn handle_raw(&self, event: &RawEvent) -> Outcome {
        let toggles = self.state.snapshot();
        let request = self.router.lock().handle(event, &toggles);
        match request {
            Some(request) => self.play(&request, &toggles),
            None => Outcome::Ignored,
        }
    }

    /// Plays the sound for (code, phase) without going through the router.
    pub fn trigger(&self, code: Code, phase: Phase) -> Outcome {
        self.play(&PlaybackRequest::new(code, phase), &self.state.snapshot())
    }

    fn play(&self, request: &PlaybackRequest, toggles: &ToggleState) -> Outcome {
        // Clone out so a concurrent reload never waits on playback.
        let Some(pack) = self.active_pack() else {
            return Outcome::NoPack;
        };
        self.engine.trigger(request, &pack, toggles)
    }

    pub fn set_muted(&self, muted: bool) {
        self.state.set_muted(muted);
    }

    pub fn set_keyup_enabled(&self, enabled: bool) {
        self.state.set_keyup_enabled(enabled);
    }

    pub fn set_mouse_sounds_enabled(&self, enabled: bool) {
        self.state.set_mouse_sounds_enabled(enabled);
    }

    pub fn set_random_sounds_enabled(&self, enabled: bool) {
        self.state.set_random_sounds_enabled(enabled);
    }

    pub fn set_volume(&self, volume: f32) {
        self.state.set_volume(volume);
    }

    pub fn toggles(&self) -> ToggleState {
        self.state.snapshot()
    }

    pub fn cache(&self) -> &Arc<ClipCache> {
        self.engine.cache()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::mock::RecordingSink;
    use crate::input::{RawButton, RawInput, RawKey};
    use crate::testutil::{write_asset, PackFixture, TEST_SAMPLE_RATE};

    const BLUE: &str = r#"{
        "name": "Blue",
        "default": { "down": ["generic.wav"] },
        "keys": {
            "KeyA": { "down": ["a1.wav", "a2.wav"], "up": ["shared.wav"] },
            "MouseLeft": { "down": ["click.wav"] }
        }
    }"#;

    const RED: &str = r#"{
        "name": "Red",
        "keys": {
            "KeyA": { "down": ["red.wav"], "up": ["shared.wav"] }
        }
    }"#;

    fn keysound() -> (Keysound, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new(TEST_SAMPLE_RATE));
        let keysound = Keysound::with_sink(Arc::new(ConfigState::default()), sink.clone(), true);
        (keysound, sink)
    }

    fn blue() -> PackFixture {
        PackFixture::new(BLUE, &["generic.wav", "a1.wav", "a2.wav", "shared.wav", "click.wav"])
    }

    #[test]
    fn test_reload_pack() {
        let (keysound, _) = keysound();
        let fixture = blue();

        let summary = keysound.reload_pack(fixture.path()).unwrap();
        assert_eq!("Blue", summary.name);
        assert_eq!(3, summary.definitions);
        assert_eq!(5, summary.assets);

        // Eagerly decoded.
        assert_eq!(5, keysound.cache().len());
        assert!(keysound.cache().contains(&fixture.asset("a1.wav")));
        assert_eq!(summary.id, keysound.active_pack().unwrap().id());
    }

    #[test]
    fn test_failed_reload_keeps_active_pack() {
        let (keysound, _) = keysound();
        let fixture = blue();
        let active = keysound.reload_pack(fixture.path()).unwrap();

        let broken = PackFixture::new(RED, &["shared.wav"]);
        assert!(matches!(
            keysound.reload_pack(broken.path()),
            Err(LoadError::MissingAsset { .. })
        ));
        assert_eq!(active.id, keysound.active_pack().unwrap().id());
        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
    }

    #[test]
    fn test_undecodable_asset_rejects_pack() {
        let (keysound, _) = keysound();
        let active = keysound.reload_pack(blue().path()).unwrap();
        let cached = keysound.cache().len();

        let broken = PackFixture::new(RED, &["shared.wav"]);
        std::fs::write(broken.path().join("red.wav"), b"not audio").unwrap();

        assert!(matches!(
            keysound.reload_pack(broken.path()),
            Err(LoadError::Decode(_))
        ));
        assert_eq!(active.id, keysound.active_pack().unwrap().id());
        // The broken pack's decoded clips were released.
        assert_eq!(cached, keysound.cache().len());
    }

    #[test]
    fn test_segment_past_end_rejects_pack() {
        let (keysound, _) = keysound();
        // Test assets are 100ms long.
        let fixture = PackFixture::new(
            r#"{ "sprite": "sprite.wav", "keys": { "KeyA": { "down": [{ "start": 500, "duration": 10 }] } } }"#,
            &["sprite.wav"],
        );

        assert!(matches!(
            keysound.reload_pack(fixture.path()),
            Err(LoadError::MalformedManifest { .. })
        ));
        assert!(keysound.active_pack().is_none());
        assert!(keysound.cache().is_empty());
    }

    #[test]
    fn test_switch_evicts_previous_pack() {
        let (keysound, _) = keysound();
        let blue = blue();
        keysound.reload_pack(blue.path()).unwrap();

        let red = PackFixture::new(RED, &["red.wav", "shared.wav"]);
        keysound.reload_pack(red.path()).unwrap();

        assert_eq!(2, keysound.cache().len());
        assert!(keysound.cache().contains(&red.asset("red.wav")));
        assert!(!keysound.cache().contains(&blue.asset("a1.wav")));
        assert_eq!("Red", keysound.active_pack().unwrap().name());
    }

    #[test]
    fn test_reloading_same_directory_picks_up_changes() {
        let (keysound, _) = keysound();
        let fixture = blue();
        let first = keysound.reload_pack(fixture.path()).unwrap();

        fixture.write_manifest(
            r#"{ "name": "Blue v2", "keys": { "KeyA": { "down": ["a1.wav"] } } }"#,
        );
        let second = keysound.reload_pack(fixture.path()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!("Blue v2", second.name);
        assert_eq!(1, keysound.cache().len());
    }

    #[test]
    fn test_unload_pack() {
        let (keysound, _) = keysound();
        keysound.reload_pack(blue().path()).unwrap();

        assert_eq!("Blue", keysound.unload_pack().unwrap().name);
        assert!(keysound.cache().is_empty());
        assert_eq!(Outcome::NoPack, keysound.trigger(Code::KeyA, Phase::Down));
        assert!(keysound.unload_pack().is_none());
    }

    #[test]
    fn test_handle_raw() {
        let (keysound, sink) = keysound();
        let fixture = blue();
        keysound.reload_pack(fixture.path()).unwrap();

        let press = RawEvent::now(RawInput::KeyPress(RawKey::Key(Code::KeyA)));
        let release = RawEvent::now(RawInput::KeyRelease(RawKey::Key(Code::KeyA)));

        assert!(keysound.handle_raw(&press).played());
        // Auto-repeat.
        assert_eq!(Outcome::Ignored, keysound.handle_raw(&press));
        assert!(keysound.handle_raw(&release).played());
        assert_eq!(
            Outcome::Ignored,
            keysound.handle_raw(&RawEvent::now(RawInput::MouseMove { x: 0.0, y: 0.0 }))
        );

        let sources: Vec<PathBuf> = sink.submissions().into_iter().map(|s| s.source).collect();
        assert_eq!(2, sources.len());
        assert_eq!(fixture.asset("shared.wav"), sources[1]);
    }

    #[test]
    fn test_toggles() {
        let (keysound, sink) = keysound();
        keysound.reload_pack(blue().path()).unwrap();

        keysound.set_keyup_enabled(false);
        assert_eq!(Outcome::KeyupDisabled, keysound.trigger(Code::KeyA, Phase::Up));

        keysound.set_mouse_sounds_enabled(false);
        assert_eq!(
            Outcome::Ignored,
            keysound.handle_raw(&RawEvent::now(RawInput::ButtonPress(RawButton::Left)))
        );

        keysound.set_muted(true);
        assert_eq!(Outcome::Muted, keysound.trigger(Code::KeyA, Phase::Down));
        keysound.set_muted(false);

        keysound.set_volume(0.5);
        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
        assert_eq!(0.5, sink.submissions().last().unwrap().gain);

        let toggles = keysound.toggles();
        assert!(!toggles.keyup_enabled);
        assert!(!toggles.mouse_sounds_enabled);
        assert!(toggles.random_sounds_enabled);
    }

    #[test]
    fn test_every_definition_plays_after_load() {
        let (keysound, sink) = keysound();
        let fixture = blue();
        keysound.reload_pack(fixture.path()).unwrap();
        let pack = keysound.active_pack().unwrap();

        for definition in pack.definitions() {
            assert!(keysound.trigger(definition.code, definition.phase).played());
        }
        let assets: Vec<PathBuf> = pack.assets().into_iter().map(Path::to_path_buf).collect();
        for submission in sink.submissions() {
            assert!(assets.contains(&submission.source));
        }
        // Every clip was decoded at load time.
        assert_eq!(5, keysound.cache().decode_count());
    }

    #[test]
    fn test_reload_rereads_replaced_asset() {
        let (keysound, sink) = keysound();
        let fixture = PackFixture::new(r#"{ "keys": { "KeyA": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        keysound.reload_pack(fixture.path()).unwrap();
        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
        assert_eq!(4410, sink.submissions()[0].clip.frames());

        write_asset(&fixture.path().join("a.wav"), Duration::from_secs(1));
        keysound.reload_pack(fixture.path()).unwrap();

        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
        assert_eq!(44100, sink.submissions()[1].clip.frames());
        assert_eq!(2, keysound.cache().decode_count());
        assert_eq!(1, keysound.cache().len());
    }

    #[test]
    fn test_reload_rejects_corrupted_asset() {
        let (keysound, sink) = keysound();
        let fixture = PackFixture::new(r#"{ "keys": { "KeyA": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        let active = keysound.reload_pack(fixture.path()).unwrap();

        std::fs::write(fixture.path().join("a.wav"), b"not audio").unwrap();
        assert!(matches!(
            keysound.reload_pack(fixture.path()),
            Err(LoadError::Decode(_))
        ));

        // The active pack keeps playing the clip it loaded.
        assert_eq!(active.id, keysound.active_pack().unwrap().id());
        assert!(keysound.trigger(Code::KeyA, Phase::Down).played());
        assert_eq!(4410, sink.submissions()[0].clip.frames());
        assert_eq!(1, keysound.cache().len());
    }

    #[test]
    fn test_stale_trigger_after_switch_does_not_claim() {
        let (keysound, sink) = keysound();
        let blue = blue();
        keysound.reload_pack(blue.path()).unwrap();
        let stale = keysound.active_pack().unwrap();

        let red = PackFixture::new(RED, &["red.wav", "shared.wav"]);
        keysound.reload_pack(red.path()).unwrap();
        let cached = keysound.cache().len();
        let decodes = keysound.cache().decode_count();

        // A trigger that picked up the old pack before the switch.
        let outcome = keysound.engine.trigger(
            &PlaybackRequest::new(Code::KeyA, Phase::Up),
            &stale,
            &keysound.toggles(),
        );
        assert_eq!(Outcome::Failed, outcome);
        assert_eq!(0, sink.count());
        assert_eq!(cached, keysound.cache().len());
        assert_eq!(decodes, keysound.cache().decode_count());
    }
}
