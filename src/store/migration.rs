//! One-time upgrades from older storage generations
//!
//! 1. flat JSON key-value store (`screen-spots.json`) -> first display's profile,
//!    only while no single CSV (or its backup) exists: the CSV generation
//!    was written from the key-value store and supersedes it
//! 2. single CSV (`screen-spots.csv`) -> first display's profile, then the
//!    legacy file is renamed so the step never fires again
//!
//! Each step only runs while no per-profile file exists, so running the whole
//! sequence again (including after an interruption) is a no-op.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use tracing::{debug, info, warn};

use crate::constants::paths::{LEGACY_CSV, LEGACY_CSV_BACKUP, LEGACY_STORAGE};
use crate::pattern::Pattern;
use crate::types::Point;

use super::{csv_file, SpotStore};

/// What a startup migration pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Profile that received migrated spots
    pub profile: Option<String>,
    /// Spots converted from the key-value store
    pub from_storage: usize,
    /// Spots converted from the single CSV file
    pub from_csv: usize,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.from_storage == 0 && self.from_csv == 0
    }
}

/// Shapes a key-value entry has had: `[x, y]` or `{"coords": [x, y]}`.
/// Coordinates may have been written as floats.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
enum LegacyEntry {
    Pair([f64; 2]),
    Tagged { coords: [f64; 2] },
}

impl LegacyEntry {
    fn point(self) -> Point {
        let [x, y] = match self {
            LegacyEntry::Pair(coords) => coords,
            LegacyEntry::Tagged { coords } => coords,
        };
        Point::new(x as i32, y as i32)
    }
}

/// Run every pending step, in order
pub fn run(store: &mut SpotStore) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    if let Some((profile, count)) = migrate_storage(store)? {
        report.profile = Some(profile);
        report.from_storage = count;
    }
    if let Some((profile, count)) = migrate_single_csv(store)? {
        report.profile = Some(profile);
        report.from_csv = count;
    }

    Ok(report)
}

/// Step 1: key-value store -> per-profile CSV
fn migrate_storage(store: &mut SpotStore) -> Result<Option<(String, usize)>> {
    let path = store.data_dir().join(LEGACY_STORAGE);
    if [LEGACY_CSV, LEGACY_CSV_BACKUP]
        .iter()
        .any(|name| store.data_dir().join(name).exists())
    {
        debug!(path = %path.display(), "Single CSV generation present, key-value store superseded");
        return Ok(None);
    }
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read legacy storage {:?}", path));
        }
    };

    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse legacy storage {:?}", path))?;
    if raw.is_empty() || store.has_profile_files() {
        return Ok(None);
    }

    let Some(profile) = first_profile(store) else {
        return Ok(None);
    };

    let mut count = 0;
    for (name, value) in raw {
        match serde_json::from_value::<LegacyEntry>(value) {
            Ok(entry) => {
                store.insert(&profile, &name, entry.point(), Pattern::Global);
                count += 1;
            }
            Err(err) => warn!(name = %name, error = %err, "Skipping unrecognised legacy entry"),
        }
    }

    store.save(&profile)?;
    info!(profile = %profile, count = count, "Migrated spots from key-value storage");
    Ok(Some((profile, count)))
}

/// Step 2: single CSV -> per-profile CSV, then retire the legacy file
fn migrate_single_csv(store: &mut SpotStore) -> Result<Option<(String, usize)>> {
    let path = store.data_dir().join(LEGACY_CSV);
    if !path.is_file() || store.has_profile_files() {
        return Ok(None);
    }

    let Some(profile) = first_profile(store) else {
        return Ok(None);
    };

    let spots = csv_file::read_spots(&path)?;
    let count = spots.len();
    for spot in spots.into_values() {
        store.insert(&profile, &spot.name, spot.point, spot.pattern);
    }
    store.save(&profile)?;

    let backup = store.data_dir().join(LEGACY_CSV_BACKUP);
    fs::rename(&path, &backup)
        .with_context(|| format!("Failed to rename {:?} to {:?}", path, backup))?;

    info!(profile = %profile, count = count, backup = %backup.display(), "Migrated spots from single CSV");
    Ok(Some((profile, count)))
}

/// Legacy spots predate multi-display support and land on the first display
fn first_profile(store: &SpotStore) -> Option<String> {
    match store.resolver().profile_for_screen(0) {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(error = %err, "No display connected, postponing migration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileResolver;
    use crate::store::WindowContext;
    use crate::types::{Rect, Screen};
    use std::path::Path;
    use tempfile::TempDir;

    const PROFILE: &str = "desk-0-1920x1080";

    fn resolver() -> ProfileResolver {
        ProfileResolver::new(
            "desk.home.arpa",
            vec![
                Screen::from_bounds(Rect::new(0, 0, 1920, 1080)),
                Screen::from_bounds(Rect::new(1920, 0, 1920, 1080)),
            ],
        )
    }

    fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in fs::read_dir(current).unwrap().flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let rel = path.strip_prefix(dir).unwrap().display().to_string();
                    files.insert(rel, fs::read(&path).unwrap());
                }
            }
        }
        files
    }

    #[test]
    fn test_legacy_entry_shapes() {
        let pair: LegacyEntry = serde_json::from_str("[10, 20]").unwrap();
        assert_eq!(pair.point(), Point::new(10, 20));
        let tagged: LegacyEntry = serde_json::from_str(r#"{"coords": [30.7, 40.2], "app": "x"}"#).unwrap();
        assert_eq!(tagged.point(), Point::new(30, 40));
        assert!(serde_json::from_str::<LegacyEntry>(r#"{"x": 1}"#).is_err());
    }

    #[test]
    fn test_nothing_to_migrate() {
        let dir = TempDir::new().unwrap();
        let (_, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        assert_eq!(report.profile, None);
    }

    #[test]
    fn test_storage_migrates_into_first_profile() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(LEGACY_STORAGE),
            r#"{"send": [100, 200], "inbox": {"coords": [5, 6]}, "broken": "oops"}"#,
        )
        .unwrap();

        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert_eq!(report.from_storage, 2);
        assert_eq!(report.profile.as_deref(), Some(PROFILE));

        let spots = store.spots(PROFILE).unwrap();
        assert_eq!(spots["send"].point, Point::new(100, 200));
        assert_eq!(spots["inbox"].pattern, Pattern::Global);
        assert!(store.find("inbox", false, &WindowContext::default()).is_some());
    }

    #[test]
    fn test_single_csv_migrates_and_is_renamed() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(LEGACY_CSV),
            "Name,X,Y,WindowPattern\nsend,1,2,\nrun,3,4,Visual Studio Code\nbad,x,4,\n",
        )
        .unwrap();

        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert_eq!(report.from_csv, 2);
        assert!(!dir.path().join(LEGACY_CSV).exists());
        assert!(dir.path().join(LEGACY_CSV_BACKUP).is_file());

        let spots = store.spots(PROFILE).unwrap();
        assert_eq!(spots["run"].pattern, Pattern::Substring("Visual Studio Code".into()));
        assert_eq!(spots["send"].pattern, Pattern::Global);
    }

    #[test]
    fn test_csv_supersedes_storage() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEGACY_STORAGE), r#"{"old": [9, 9]}"#).unwrap();
        fs::write(dir.path().join(LEGACY_CSV), "Name,X,Y,WindowPattern\nold,1,1,\nnewer,2,2,\n").unwrap();

        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert_eq!(report.from_storage, 0);
        assert_eq!(report.from_csv, 2);
        assert!(!dir.path().join(LEGACY_CSV).exists());

        let spots = store.spots(PROFILE).unwrap();
        assert_eq!(spots["old"].point, Point::new(1, 1));
        assert_eq!(spots["newer"].point, Point::new(2, 2));

        // The backup keeps the key-value store retired on later starts
        let (reopened, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        assert_eq!(reopened.spots(PROFILE).unwrap().len(), 2);
    }

    #[test]
    fn test_storage_ignored_once_csv_was_migrated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEGACY_CSV_BACKUP), "Name,X,Y,WindowPattern\n").unwrap();
        fs::write(dir.path().join(LEGACY_STORAGE), r#"{"old": [1, 1]}"#).unwrap();

        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        assert!(store.spots(PROFILE).unwrap().is_empty());
    }

    #[test]
    fn test_existing_profiles_block_migration() {
        let dir = TempDir::new().unwrap();
        {
            let (mut store, _) = SpotStore::open(dir.path(), resolver());
            store.put("current", Point::new(1, 1), Pattern::Global, None).unwrap();
        }
        fs::write(dir.path().join(LEGACY_STORAGE), r#"{"old": [1, 1]}"#).unwrap();
        fs::write(dir.path().join(LEGACY_CSV), "Name,X,Y,WindowPattern\nolder,2,2,\n").unwrap();

        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        let names: Vec<_> = store.spots(PROFILE).unwrap().keys().cloned().collect();
        assert_eq!(names, ["current"]);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(LEGACY_CSV),
            "Name,X,Y,WindowPattern\nb,3,4,app:Slack\na,1,2,\n",
        )
        .unwrap();

        SpotStore::open(dir.path(), resolver());
        let first = snapshot(dir.path());
        let (_, report) = SpotStore::open(dir.path(), resolver());
        let second = snapshot(dir.path());

        assert!(report.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_interrupted_before_rename_does_not_duplicate() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEGACY_CSV), "Name,X,Y,WindowPattern\na,1,2,\n").unwrap();
        SpotStore::open(dir.path(), resolver());

        // Simulate a crash between writing the profile file and the rename
        fs::rename(dir.path().join(LEGACY_CSV_BACKUP), dir.path().join(LEGACY_CSV)).unwrap();
        let (store, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        assert_eq!(store.spots(PROFILE).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_storage_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEGACY_STORAGE), "{not json").unwrap();
        let (mut store, report) = SpotStore::open(dir.path(), resolver());
        assert!(report.is_empty());
        assert!(store.put("fresh", Point::new(1, 1), Pattern::Global, None).is_ok());
    }

    #[test]
    fn test_no_display_postpones_migration() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEGACY_STORAGE), r#"{"old": [1, 1]}"#).unwrap();

        let headless = ProfileResolver::new("desk", vec![]);
        let (_, report) = SpotStore::open(dir.path(), headless);
        assert!(report.is_empty());

        let (_, report) = SpotStore::open(dir.path(), resolver());
        assert_eq!(report.from_storage, 1);
    }
}
