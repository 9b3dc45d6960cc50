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

//! Clip caching with single-flight decoding.
//!
//! Every entry records which packs claim it. A clip is released once the last
//! claiming pack is evicted. Decodes run outside the map lock; concurrent
//! requests for a path that is already being decoded wait for that decode
//! instead of starting their own. Evicted packs are retired: they can still
//! read what is cached but never claim or decode again.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::clip::Clip;
use super::decoder::Decoder;
use super::error::DecodeError;
use crate::pack::PackId;

/// A decode in progress. Waiters block on the condvar until the leader publishes.
struct Flight {
    result: Mutex<Option<Result<Clip, DecodeError>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Flight {
        Flight {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<Clip, DecodeError>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Clip, DecodeError> {
        let mut result = self.result.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut result);
        }
    }
}

enum Slot {
    Ready(Clip),
    Decoding(Arc<Flight>),
    /// Re-reading the file. The previous clip keeps being served until the
    /// new decode succeeds, and is kept if it fails.
    Refreshing(Clip, Arc<Flight>),
}

impl Slot {
    fn clip(&self) -> Option<&Clip> {
        match self {
            Slot::Ready(clip) | Slot::Refreshing(clip, _) => Some(clip),
            Slot::Decoding(_) => None,
        }
    }

    fn flight(&self) -> Option<&Arc<Flight>> {
        match self {
            Slot::Decoding(flight) | Slot::Refreshing(_, flight) => Some(flight),
            Slot::Ready(_) => None,
        }
    }
}

struct Entry {
    slot: Slot,
    owners: HashSet<PackId>,
}

#[derive(Default)]
struct Entries {
    clips: HashMap<PathBuf, Entry>,
    /// Packs that have been evicted.
    retired: HashSet<PackId>,
}

/// What a caller does after registering interest in a path.
enum Role {
    Leader(Arc<Flight>),
    Waiter(Arc<Flight>),
}

/// Publishes a failure if the decoder unwinds, so that waiters are released
/// and the path can be decoded again.
struct LeaderGuard<'a> {
    cache: &'a ClipCache,
    path: &'a Path,
    flight: Arc<Flight>,
    finished: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            error!(path = ?self.path, "Decoder panicked");
            self.cache.publish(
                self.path,
                &self.flight,
                Err(DecodeError::Panicked(self.path.to_path_buf())),
            );
        }
    }
}

/// Decodes and caches clips by file path.
pub struct ClipCache {
    decoder: Box<dyn Decoder>,
    entries: RwLock<Entries>,
    /// Number of decodes started, for diagnostics.
    decodes: AtomicU64,
}

impl ClipCache {
    pub fn new(decoder: Box<dyn Decoder>) -> ClipCache {
        ClipCache {
            decoder,
            entries: RwLock::new(Entries::default()),
            decodes: AtomicU64::new(0),
        }
    }

    /// Returns the clip for `path`, decoding it on first access, and records
    /// `owner` as a claimant. Failed decodes are not cached.
    ///
    /// A retired owner only gets clips that are already cached; anything else
    /// is `DecodeError::Retired`.
    pub fn get(&self, path: &Path, owner: PackId) -> Result<Clip, DecodeError> {
        // Hot path: already decoded and already claimed by this pack.
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.clips.get(path) {
                if let Some(clip) = entry.slot.clip() {
                    if entry.owners.contains(&owner) {
                        return Ok(clip.clone());
                    }
                }
            }
        }

        let role = {
            let mut entries = self.entries.write();
            if entries.retired.contains(&owner) {
                return match entries.clips.get(path).and_then(|e| e.slot.clip()) {
                    Some(clip) => Ok(clip.clone()),
                    None => Err(DecodeError::Retired(path.to_path_buf())),
                };
            }
            match entries.clips.get_mut(path) {
                Some(entry) => {
                    entry.owners.insert(owner);
                    match &entry.slot {
                        Slot::Ready(clip) | Slot::Refreshing(clip, _) => return Ok(clip.clone()),
                        Slot::Decoding(flight) => Role::Waiter(flight.clone()),
                    }
                }
                None => {
                    let flight = Arc::new(Flight::new());
                    entries.clips.insert(
                        path.to_path_buf(),
                        Entry {
                            slot: Slot::Decoding(flight.clone()),
                            owners: HashSet::from([owner]),
                        },
                    );
                    Role::Leader(flight)
                }
            }
        };

        self.run(path, role)
    }

    /// Decodes `path` again even if it is cached and records `owner` as a
    /// claimant. On success every later `get` sees the new clip. On failure the
    /// previous clip, if any, stays cached.
    pub fn refresh(&self, path: &Path, owner: PackId) -> Result<Clip, DecodeError> {
        let role = {
            let mut entries = self.entries.write();
            if entries.retired.contains(&owner) {
                return Err(DecodeError::Retired(path.to_path_buf()));
            }
            match entries.clips.get_mut(path) {
                Some(entry) => {
                    entry.owners.insert(owner);
                    match entry.slot.flight() {
                        // Already being read from disk.
                        Some(flight) => Role::Waiter(flight.clone()),
                        None => {
                            let flight = Arc::new(Flight::new());
                            if let Slot::Ready(clip) = &entry.slot {
                                let previous = clip.clone();
                                entry.slot = Slot::Refreshing(previous, flight.clone());
                            }
                            Role::Leader(flight)
                        }
                    }
                }
                None => {
                    let flight = Arc::new(Flight::new());
                    entries.clips.insert(
                        path.to_path_buf(),
                        Entry {
                            slot: Slot::Decoding(flight.clone()),
                            owners: HashSet::from([owner]),
                        },
                    );
                    Role::Leader(flight)
                }
            }
        };

        self.run(path, role)
    }

    fn run(&self, path: &Path, role: Role) -> Result<Clip, DecodeError> {
        match role {
            Role::Waiter(flight) => {
                debug!(path = ?path, "Waiting on in-flight decode");
                flight.wait()
            }
            Role::Leader(flight) => {
                self.decodes.fetch_add(1, Ordering::Relaxed);
                let mut guard = LeaderGuard {
                    cache: self,
                    path,
                    flight,
                    finished: false,
                };
                let result = self.decoder.decode(path);
                guard.finished = true;
                self.publish(path, &guard.flight, result)
            }
        }
    }

    /// Stores the outcome of the decode tracked by `flight` and wakes its waiters.
    fn publish(
        &self,
        path: &Path,
        flight: &Arc<Flight>,
        result: Result<Clip, DecodeError>,
    ) -> Result<Clip, DecodeError> {
        {
            let mut entries = self.entries.write();
            // The entry is ours until the flight completes: eviction leaves
            // in-flight entries in place.
            let ours = entries.clips.get_mut(path).filter(|entry| {
                entry
                    .slot
                    .flight()
                    .is_some_and(|f| Arc::ptr_eq(f, flight))
            });
            let release = match ours {
                Some(entry) => match (&result, entry.owners.is_empty()) {
                    (Ok(clip), false) => {
                        entry.slot = Slot::Ready(clip.clone());
                        false
                    }
                    (Err(_), false) => {
                        let previous = match &entry.slot {
                            Slot::Refreshing(previous, _) => Some(previous.clone()),
                            _ => None,
                        };
                        match previous {
                            Some(previous) => {
                                entry.slot = Slot::Ready(previous);
                                false
                            }
                            None => true,
                        }
                    }
                    (_, true) => true,
                },
                None => false,
            };
            if release {
                entries.clips.remove(path);
            }
        }

        if let Err(e) = &result {
            warn!(path = ?path, error = %e, "Clip failed to decode");
        }
        flight.complete(result.clone());
        result
    }

    /// Drops `owner`'s claim on every clip and retires it. Clips no longer
    /// claimed by any pack are released. Returns the number of clips released.
    pub fn evict(&self, owner: PackId) -> usize {
        let mut entries = self.entries.write();
        entries.retired.insert(owner);
        let before = entries.clips.len();
        entries.clips.retain(|_, entry| {
            entry.owners.remove(&owner);
            !entry.owners.is_empty() || entry.slot.flight().is_some()
        });
        let released = before - entries.clips.len();

        if released > 0 {
            info!(pack = %owner, released, "Released cached clips");
        }
        released
    }

    /// Returns true if a decoded clip for `path` is cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .read()
            .clips
            .get(path)
            .is_some_and(|entry| entry.slot.clip().is_some())
    }

    /// Returns the number of cached clips.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .clips
            .values()
            .filter(|entry| entry.slot.clip().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of decodes started since creation.
    pub fn decode_count(&self) -> u64 {
        self.decodes.load(Ordering::Relaxed)
    }

    /// Returns the total memory used by cached clips.
    pub fn memory_usage(&self) -> usize {
        self.entries
            .read()
            .clips
            .values()
            .filter_map(|entry| entry.slot.clip().map(Clip::memory_size))
            .sum()
    }
}

impl fmt::Debug for ClipCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipCache")
            .field("cached_clips", &self.len())
            .field("decodes", &self.decode_count())
            .field("total_memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
