//! CSV backing files: `Name,X,Y,WindowPattern`, one row per spot

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::csv::{HEADER_NAME, HEADER_WINDOW_PATTERN, HEADER_X, HEADER_Y};
use crate::pattern::Pattern;
use crate::types::Point;

use super::Spot;

const SPOT_HEADER: [&str; 4] = [HEADER_NAME, HEADER_X, HEADER_Y, HEADER_WINDOW_PATTERN];

/// Read every well-formed row. A missing file is an empty mapping. A row with
/// a blank name or an unparsable coordinate is skipped and the rest still
/// load; a missing `WindowPattern` cell means global.
pub fn read_spots(path: &Path) -> Result<BTreeMap<String, Spot>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No spot file yet, starting empty");
            return Ok(BTreeMap::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read spot file {:?}", path));
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut spots = BTreeMap::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping unreadable spot row");
                continue;
            }
        };
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();

        let name = record.get(0).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let coordinate = |index: usize| record.get(index).and_then(|cell| cell.parse::<i32>().ok());
        let (Some(x), Some(y)) = (coordinate(1), coordinate(2)) else {
            warn!(path = %path.display(), line = line, name = %name, "Skipping spot row with invalid coordinates");
            continue;
        };

        let spot = Spot {
            name: name.to_string(),
            point: Point::new(x, y),
            pattern: Pattern::from_storage(record.get(3).unwrap_or_default()),
        };
        spots.insert(spot.name.clone(), spot);
    }

    Ok(spots)
}

/// Rewrite the whole file (header included), creating parent directories
pub fn write_spots(path: &Path, spots: &BTreeMap<String, Spot>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create spot directory {:?}", parent))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open spot file {:?} for writing", path))?;
    writer
        .write_record(SPOT_HEADER)
        .with_context(|| format!("Failed to write header to {:?}", path))?;

    for spot in spots.values() {
        writer
            .write_record([
                spot.name.clone(),
                spot.point.x.to_string(),
                spot.point.y.to_string(),
                spot.pattern.to_storage(),
            ])
            .with_context(|| format!("Failed to write spot '{}' to {:?}", spot.name, path))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush spot file {:?}", path))?;
    Ok(())
}
