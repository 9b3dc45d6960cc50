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

//! Pack loading and validation.
//!
//! Loading is all-or-nothing: the first problem found aborts the load and no
//! `SoundPack` is produced. Only the filesystem is touched; decoding happens
//! when the pack is installed.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use super::error::LoadError;
use super::manifest::{Manifest, PhaseEntries, VariantSpec, MANIFEST_FILE};
use super::{ClipRef, KeyDefinition, Segment, SoundPack, Variants};
use crate::code::{Code, Phase};

/// Loads and validates the pack in `dir`.
pub fn load(dir: &Path) -> Result<SoundPack, LoadError> {
    let dir = dir.canonicalize().map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let manifest_path = dir.join(MANIFEST_FILE);

    info!(path = ?dir, "Loading sound pack");

    let contents = match fs::read_to_string(&manifest_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LoadError::malformed(
                &manifest_path,
                format!("no {} in pack directory", MANIFEST_FILE),
            ))
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: manifest_path,
                source,
            })
        }
    };

    let manifest: Manifest = serde_json::from_str(&contents)
        .map_err(|e| LoadError::malformed(&manifest_path, e.to_string()))?;

    let resolver = Resolver {
        dir: &dir,
        manifest_path: &manifest_path,
        sprite: manifest.sprite.as_deref(),
    };

    let volume = manifest.volume.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&volume) {
        return Err(LoadError::malformed(
            &manifest_path,
            format!("volume {} is outside 0.0 to 1.0", volume),
        ));
    }

    let name = match manifest.name {
        Some(name) => name,
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| dir.display().to_string()),
    };

    let mut definitions = Vec::new();
    let mut seen: HashSet<(Code, Phase)> = HashSet::new();
    for (names, entries) in &manifest.keys {
        let codes = names
            .split_whitespace()
            .map(|name| {
                name.parse::<Code>()
                    .map_err(|e| LoadError::malformed(&manifest_path, e.to_string()))
            })
            .collect::<Result<Vec<Code>, LoadError>>()?;
        if codes.is_empty() {
            return Err(LoadError::malformed(&manifest_path, "empty key name"));
        }

        let phases = resolver.phases(names, entries)?;
        if phases.is_empty() {
            return Err(LoadError::malformed(
                &manifest_path,
                format!("'{}' defines neither down nor up", names),
            ));
        }

        for code in codes {
            for (phase, variants) in &phases {
                if !seen.insert((code, *phase)) {
                    return Err(LoadError::malformed(
                        &manifest_path,
                        format!("{} {} is defined more than once", code, phase),
                    ));
                }
                definitions.push(KeyDefinition {
                    code,
                    phase: *phase,
                    variants: variants.clone(),
                });
            }
        }
    }

    let defaults: HashMap<Phase, Variants> = match &manifest.default {
        Some(entries) => resolver.phases("default", entries)?.into_iter().collect(),
        None => HashMap::new(),
    };

    if definitions.is_empty() && defaults.is_empty() {
        return Err(LoadError::EmptyPack(dir));
    }

    let pack = SoundPack::new(name, dir, volume, definitions, defaults);
    info!(
        name = pack.name(),
        id = %pack.id(),
        definitions = pack.definitions().len(),
        assets = pack.assets().len(),
        "Sound pack loaded"
    );
    Ok(pack)
}

/// Lists the packs directly inside `root`: sub-directories holding a manifest.
/// Nothing is loaded.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(root).map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut packs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: root.to_path_buf(),
                source,
            })?
            .path();
        if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
            packs.push(path);
        } else {
            debug!(path = ?path, "Skipping non-pack entry");
        }
    }

    packs.sort();
    Ok(packs)
}

/// Resolves manifest variant specs against the pack directory.
struct Resolver<'a> {
    dir: &'a Path,
    manifest_path: &'a Path,
    sprite: Option<&'a str>,
}

impl Resolver<'_> {
    fn phases(
        &self,
        name: &str,
        entries: &PhaseEntries,
    ) -> Result<Vec<(Phase, Variants)>, LoadError> {
        let mut phases = Vec::new();
        for (phase, specs) in [(Phase::Down, &entries.down), (Phase::Up, &entries.up)] {
            let Some(specs) = specs else {
                continue;
            };
            let clips = specs
                .iter()
                .map(|spec| self.clip_ref(spec))
                .collect::<Result<Vec<ClipRef>, LoadError>>()?;
            let variants = Variants::new(clips).ok_or_else(|| {
                LoadError::malformed(
                    self.manifest_path,
                    format!("'{}' {} has no variants", name, phase),
                )
            })?;
            phases.push((phase, variants));
        }
        Ok(phases)
    }

    fn clip_ref(&self, spec: &VariantSpec) -> Result<ClipRef, LoadError> {
        match spec {
            VariantSpec::File(file) => Ok(ClipRef::new(self.asset(file)?, None)),
            VariantSpec::Segment {
                file,
                start,
                duration,
            } => {
                let file = file.as_deref().or(self.sprite).ok_or_else(|| {
                    LoadError::malformed(
                        self.manifest_path,
                        "segment has no file and the pack has no sprite",
                    )
                })?;
                if *duration == 0 {
                    return Err(LoadError::malformed(
                        self.manifest_path,
                        format!("segment of {} has zero duration", file),
                    ));
                }
                Ok(ClipRef::new(
                    self.asset(file)?,
                    Some(Segment {
                        start: Duration::from_millis(*start),
                        duration: Duration::from_millis(*duration),
                    }),
                ))
            }
        }
    }

    /// Joins a manifest file name onto the pack directory. Names must stay
    /// inside the directory and must exist.
    fn asset(&self, file: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(file);
        let contained = !file.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(LoadError::malformed(
                self.manifest_path,
                format!("asset '{}' is outside the pack directory", file),
            ));
        }

        let path = self.dir.join(relative);
        if !path.is_file() {
            return Err(LoadError::MissingAsset {
                pack: self.dir.to_path_buf(),
                asset: path,
            });
        }
        // Symlinks may point anywhere.
        let target = path.canonicalize().map_err(|e| LoadError::Io {
            path: path.clone(),
            source: e,
        })?;
        if !target.starts_with(self.dir) {
            return Err(LoadError::malformed(
                self.manifest_path,
                format!("asset '{}' links outside the pack directory", file),
            ));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::PackFixture;

    #[test]
    fn test_load_pack() {
        let fixture = PackFixture::new(
            r#"{
                "name": "Blue",
                "volume": 0.5,
                "sprite": "sprite.wav",
                "default": { "down": ["generic.wav"] },
                "keys": {
                    "KeyA": { "down": ["a1.wav", "a2.wav"], "up": ["a-up.wav"] },
                    "KeyB KeyC": { "down": [{ "start": 10, "duration": 20 }] }
                }
            }"#,
            &["sprite.wav", "generic.wav", "a1.wav", "a2.wav", "a-up.wav"],
        );

        let pack = load(fixture.path()).unwrap();
        assert_eq!("Blue", pack.name());
        assert_eq!(0.5, pack.volume());
        assert_eq!(4, pack.definitions().len());
        assert_eq!(5, pack.assets().len());

        let key_a = pack.lookup(Code::KeyA, Phase::Down).unwrap();
        assert_eq!(2, key_a.variants.len());
        assert_eq!(fixture.asset("a1.wav"), key_a.variants.first().path());

        let key_c = pack.lookup(Code::KeyC, Phase::Down).unwrap();
        assert_eq!(fixture.asset("sprite.wav"), key_c.variants.first().path());
        assert_eq!(
            Some(Segment {
                start: Duration::from_millis(10),
                duration: Duration::from_millis(20),
            }),
            key_c.variants.first().segment()
        );

        assert!(pack.lookup(Code::KeyB, Phase::Up).is_none());
        assert!(pack.default_for(Phase::Down).is_some());
    }

    #[test]
    fn test_name_defaults_to_directory() {
        let fixture = PackFixture::new(r#"{ "keys": { "KeyA": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        let pack = load(fixture.path()).unwrap();
        assert_eq!(
            fixture.path().canonicalize().unwrap().file_name().unwrap().to_string_lossy(),
            pack.name()
        );
        assert_eq!(1.0, pack.volume());
    }

    #[test]
    fn test_missing_asset() {
        let fixture = PackFixture::new(
            r#"{ "keys": { "KeyA": { "down": ["a.wav", "gone.wav"] } } }"#,
            &["a.wav"],
        );
        match load(fixture.path()) {
            Err(LoadError::MissingAsset { asset, .. }) => {
                assert_eq!(fixture.asset("gone.wav"), asset)
            }
            other => panic!("expected MissingAsset, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_assets() {
        use crate::testutil::write_test_asset;

        let outside = tempfile::tempdir().unwrap();
        write_test_asset(&outside.path().join("secret.wav"));

        let fixture = PackFixture::new(
            r#"{ "keys": { "KeyA": { "down": ["escape.wav"] } } }"#,
            &[],
        );
        std::os::unix::fs::symlink(outside.path().join("secret.wav"), fixture.path().join("escape.wav"))
            .unwrap();
        assert!(matches!(
            load(fixture.path()),
            Err(LoadError::MalformedManifest { .. })
        ));

        // Links that stay inside the pack are fine.
        let fixture = PackFixture::new(
            r#"{ "keys": { "KeyA": { "down": ["alias.wav"] } } }"#,
            &["real.wav"],
        );
        std::os::unix::fs::symlink(fixture.path().join("real.wav"), fixture.path().join("alias.wav"))
            .unwrap();
        let pack = load(fixture.path()).unwrap();
        assert_eq!(
            fixture.asset("alias.wav"),
            pack.resolve(Code::KeyA, Phase::Down).unwrap().first().path()
        );
    }

    #[test]
    fn test_missing_sprite_asset() {
        let fixture = PackFixture::new(
            r#"{ "sprite": "sprite.ogg", "keys": { "KeyA": { "down": [{ "start": 0, "duration": 5 }] } } }"#,
            &[],
        );
        assert!(matches!(
            load(fixture.path()),
            Err(LoadError::MissingAsset { .. })
        ));
    }

    #[test]
    fn test_empty_pack() {
        let fixture = PackFixture::new(r#"{ "name": "nothing" }"#, &[]);
        assert!(matches!(load(fixture.path()), Err(LoadError::EmptyPack(_))));

        let fixture = PackFixture::new(r#"{ "keys": {} }"#, &[]);
        assert!(matches!(load(fixture.path()), Err(LoadError::EmptyPack(_))));
    }

    #[test]
    fn test_default_only_pack() {
        let fixture = PackFixture::new(r#"{ "default": { "down": ["g.wav"] } }"#, &["g.wav"]);
        let pack = load(fixture.path()).unwrap();
        assert!(pack.definitions().is_empty());
        assert!(pack.resolve(Code::KeyQ, Phase::Down).is_some());
    }

    fn assert_malformed(manifest: &str, assets: &[&str]) {
        let fixture = PackFixture::new(manifest, assets);
        match load(fixture.path()) {
            Err(LoadError::MalformedManifest { .. }) => {}
            other => panic!("expected MalformedManifest for {}, got {:?}", manifest, other),
        }
    }

    #[test]
    fn test_malformed_manifests() {
        // Not JSON.
        assert_malformed("{ keys", &[]);
        // Unknown code.
        assert_malformed(r#"{ "keys": { "KeyAA": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        // Empty name.
        assert_malformed(r#"{ "keys": { " ": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        // No phases.
        assert_malformed(r#"{ "keys": { "KeyA": {} } }"#, &[]);
        // Empty variant list.
        assert_malformed(r#"{ "keys": { "KeyA": { "down": [] } } }"#, &[]);
        // Volume out of range.
        assert_malformed(r#"{ "volume": 2.0, "keys": { "KeyA": { "down": ["a.wav"] } } }"#, &["a.wav"]);
        // Segment without file or sprite.
        assert_malformed(r#"{ "keys": { "KeyA": { "down": [{ "start": 0, "duration": 5 }] } } }"#, &[]);
        // Zero-length segment.
        assert_malformed(
            r#"{ "keys": { "KeyA": { "down": [{ "file": "a.wav", "start": 0, "duration": 0 }] } } }"#,
            &["a.wav"],
        );
        // Escaping the pack directory.
        assert_malformed(r#"{ "keys": { "KeyA": { "down": ["../a.wav"] } } }"#, &[]);
        assert_malformed(r#"{ "keys": { "KeyA": { "down": ["/etc/passwd"] } } }"#, &[]);
    }

    #[test]
    fn test_duplicate_definitions() {
        // Same JSON key twice.
        assert_malformed(
            r#"{ "keys": { "KeyA": { "down": ["a.wav"] }, "KeyA": { "down": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        // Same code in two entries.
        assert_malformed(
            r#"{ "keys": { "KeyA KeyB": { "down": ["a.wav"] }, "KeyB": { "down": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        // Same code, different phases is fine.
        let fixture = PackFixture::new(
            r#"{ "keys": { "KeyA": { "down": ["a.wav"] }, "KeyA KeyB": { "up": ["a.wav"] } } }"#,
            &["a.wav"],
        );
        assert_eq!(3, load(fixture.path()).unwrap().definitions().len());
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path()),
            Err(LoadError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("nope")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_discover() {
        let root = tempfile::tempdir().unwrap();
        for name in ["b-pack", "a-pack"] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join(MANIFEST_FILE), "{}").unwrap();
        }
        fs::create_dir(root.path().join("not-a-pack")).unwrap();
        fs::write(root.path().join("stray.wav"), b"").unwrap();

        let packs = discover(root.path()).unwrap();
        assert_eq!(
            vec![root.path().join("a-pack"), root.path().join("b-pack")],
            packs
        );
    }
}
