//! Profile-scoped spot storage
//!
//! Spots are partitioned by display profile (see [`crate::profile`]), one CSV
//! file per profile under `<data_dir>/profiles/`. Only the profiles of the
//! currently connected displays are loaded and searched; files of
//! disconnected displays stay untouched on disk.

mod csv_file;
pub mod migration;

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::constants::paths::{PROFILES_DIR, PROFILE_EXTENSION};
use crate::pattern::Pattern;
use crate::profile::ProfileResolver;
use crate::types::Point;

pub use migration::MigrationReport;

/// A named screen coordinate, optionally restricted to matching windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spot {
    pub name: String,
    pub point: Point,
    pub pattern: Pattern,
}

/// Focused window the lookup is evaluated against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowContext {
    pub title: String,
    pub app_name: String,
}

impl WindowContext {
    pub fn new(title: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            app_name: app_name.into(),
        }
    }
}

/// Successful lookup: where to go and which profile supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub point: Point,
    pub profile: String,
}

pub type ProfileSpots = BTreeMap<String, Spot>;

pub struct SpotStore {
    data_dir: PathBuf,
    resolver: ProfileResolver,
    /// Keys of connected displays, in enumeration order (lookup order)
    active: Vec<String>,
    profiles: HashMap<String, ProfileSpots>,
}

impl SpotStore {
    /// Create an empty store; nothing is read until [`SpotStore::open`] or
    /// [`SpotStore::reload`]
    pub fn new(data_dir: impl Into<PathBuf>, resolver: ProfileResolver) -> Self {
        let active = resolver.active_profiles();
        Self {
            data_dir: data_dir.into(),
            resolver,
            active,
            profiles: HashMap::new(),
        }
    }

    /// Startup sequence: run pending schema migrations, then load every
    /// active profile. A failed migration leaves its legacy data in place and
    /// is retried on the next start.
    pub fn open(data_dir: impl Into<PathBuf>, resolver: ProfileResolver) -> (Self, MigrationReport) {
        let mut store = Self::new(data_dir, resolver);
        let report = migration::run(&mut store).unwrap_or_else(|err| {
            error!(error = ?err, "Migration failed, loading current profiles only");
            MigrationReport::default()
        });
        store.load_active();
        (store, report)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    pub fn active_profiles(&self) -> &[String] {
        &self.active
    }

    /// Spots currently held in memory for a profile
    pub fn spots(&self, profile: &str) -> Option<&ProfileSpots> {
        self.profiles.get(profile)
    }

    pub fn profile_path(&self, profile: &str) -> PathBuf {
        self.profiles_dir()
            .join(format!("{profile}.{PROFILE_EXTENSION}"))
    }

    fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join(PROFILES_DIR)
    }

    /// True once any per-profile file exists, connected or not
    pub fn has_profile_files(&self) -> bool {
        let Ok(entries) = fs::read_dir(self.profiles_dir()) else {
            return false;
        };
        entries.flatten().any(|entry| {
            let path = entry.path();
            path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(PROFILE_EXTENSION)
        })
    }

    /// Read a profile's backing file into memory, replacing what was held
    pub fn load(&mut self, profile: &str) -> Result<&ProfileSpots> {
        let spots = csv_file::read_spots(&self.profile_path(profile))
            .with_context(|| format!("Failed to load profile '{}'", profile))?;
        info!(profile = %profile, count = spots.len(), "Loaded spots");
        self.profiles.insert(profile.to_string(), spots);
        Ok(&self.profiles[profile])
    }

    /// Backing file of `profile`, written (header only if empty) when absent
    pub fn ensure_file(&self, profile: &str) -> Result<PathBuf> {
        let path = self.profile_path(profile);
        if !path.is_file() {
            self.save(profile)?;
            debug!(profile = %profile, path = %path.display(), "Created spot file");
        }
        Ok(path)
    }

    /// Persist one profile's in-memory mapping
    pub fn save(&self, profile: &str) -> Result<()> {
        let empty = ProfileSpots::new();
        let spots = self.profiles.get(profile).unwrap_or(&empty);
        csv_file::write_spots(&self.profile_path(profile), spots)
            .with_context(|| format!("Failed to save profile '{}'", profile))
    }

    /// Replace the display configuration and reload every active profile
    pub fn reload(&mut self, resolver: ProfileResolver) {
        self.resolver = resolver;
        self.active = self.resolver.active_profiles();
        self.profiles.clear();
        self.load_active();
    }

    /// A profile that fails to load stays empty; the others are unaffected
    fn load_active(&mut self) {
        for profile in self.active.clone() {
            if let Err(err) = self.load(&profile) {
                error!(profile = %profile, error = ?err, "Profile unavailable");
                self.profiles.entry(profile).or_default();
            }
        }
    }

    /// Insert or overwrite a spot in the profile owning `point` (or the given
    /// display), persist it, and return the profile written to
    pub fn put(
        &mut self,
        name: &str,
        point: Point,
        pattern: Pattern,
        screen_index: Option<usize>,
    ) -> Result<String> {
        if name.trim().is_empty() {
            bail!("Spot name must not be empty");
        }
        let profile = self.resolver.profile_for_point(point, screen_index)?;
        let previous = self.insert(&profile, name, point, pattern);
        if let Err(err) = self.save(&profile) {
            if let Some(spots) = self.profiles.get_mut(&profile) {
                match previous {
                    Some(spot) => spots.insert(name.to_string(), spot),
                    None => spots.remove(name),
                };
            }
            return Err(err);
        }
        info!(profile = %profile, name = %name, x = point.x, y = point.y, "Saved spot");
        Ok(profile)
    }

    /// In-memory upsert without persisting; returns the replaced spot
    pub(crate) fn insert(&mut self, profile: &str, name: &str, point: Point, pattern: Pattern) -> Option<Spot> {
        let spot = Spot {
            name: name.to_string(),
            point,
            pattern,
        };
        self.profiles
            .entry(profile.to_string())
            .or_default()
            .insert(name.to_string(), spot)
    }

    /// Delete `name` from the first active profile holding it. `Ok(None)` when
    /// no active profile has it.
    pub fn remove(&mut self, name: &str) -> Result<Option<String>> {
        let Some(profile) = self
            .active
            .iter()
            .find(|profile| {
                self.profiles
                    .get(*profile)
                    .is_some_and(|spots| spots.contains_key(name))
            })
            .cloned()
        else {
            return Ok(None);
        };

        let removed = self
            .profiles
            .get_mut(&profile)
            .and_then(|spots| spots.remove(name));
        if let Err(err) = self.save(&profile) {
            if let (Some(spots), Some(spot)) = (self.profiles.get_mut(&profile), removed) {
                spots.insert(name.to_string(), spot);
            }
            return Err(err);
        }
        info!(profile = %profile, name = %name, "Removed spot");
        Ok(Some(profile))
    }

    /// First active profile (in enumeration order) holding a matching spot.
    ///
    /// With `window_only`, global spots never count. Otherwise a global spot
    /// always counts and a scoped one must match the window.
    pub fn find(&self, name: &str, window_only: bool, window: &WindowContext) -> Option<Found> {
        self.active.iter().find_map(|profile| {
            let spot = self.profiles.get(profile)?.get(name)?;
            if window_only && spot.pattern.is_global() {
                return None;
            }
            if !spot.pattern.matches(&window.title, &window.app_name) {
                return None;
            }
            Some(Found {
                point: spot.point,
                profile: profile.clone(),
            })
        })
    }

    /// Every spot of every active profile, in lookup order
    pub fn iter_active(&self) -> impl Iterator<Item = (&str, &Spot)> {
        self.active.iter().flat_map(|profile| {
            self.profiles
                .get(profile)
                .into_iter()
                .flat_map(|spots| spots.values())
                .map(move |spot| (profile.as_str(), spot))
        })
    }

    /// Empty every active profile and persist each
    pub fn clear_all(&mut self) -> Result<()> {
        let active = self.active.clone();
        for profile in &active {
            self.profiles.entry(profile.clone()).or_default().clear();
        }
        info!(profiles = active.len(), "Cleared all active profiles");
        self.save_each(&active)
    }

    /// Remove scoped spots whose stored pattern text occurs in `title`.
    /// Plain case-insensitive containment whatever the pattern kind, so bulk
    /// deletion is predictable. Returns how many spots were removed.
    pub fn clear_matching_window(&mut self, title: &str) -> Result<usize> {
        let title = title.to_lowercase();
        let mut removed = 0;
        let mut affected = Vec::new();

        for profile in &self.active {
            let Some(spots) = self.profiles.get_mut(profile) else {
                continue;
            };
            let before = spots.len();
            spots.retain(|_, spot| {
                spot.pattern.is_global()
                    || !title.contains(&spot.pattern.to_storage().to_lowercase())
            });
            if spots.len() != before {
                removed += before - spots.len();
                affected.push(profile.clone());
            }
        }

        info!(removed = removed, profiles = affected.len(), "Cleared window-specific spots");
        self.save_each(&affected)?;
        Ok(removed)
    }

    /// Persist each profile independently; report every failure at the end
    fn save_each(&self, profiles: &[String]) -> Result<()> {
        let failed: Vec<&str> = profiles
            .iter()
            .filter(|profile| {
                self.save(profile)
                    .inspect_err(|err| error!(profile = %profile, error = ?err, "Failed to persist profile"))
                    .is_err()
            })
            .map(String::as_str)
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            warn!(failed = ?failed, "Some profiles were not persisted");
            bail!("Failed to persist profile(s): {}", failed.join(", "))
        }
    }
}
