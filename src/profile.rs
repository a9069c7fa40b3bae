//! Display profiles: one stable key per physical display
//!
//! A profile key is `{hostname}-{screenIndex}-{width}x{height}`. Keys depend on
//! enumeration order, so a machine that reports its monitors in a different
//! order after a reconnect gets different keys and the old spots stay on disk,
//! unreachable until the original order returns. No attempt is made to guess a
//! more stable identity.

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::constants::profile::{ILLEGAL_FILENAME_CHARS, REPLACEMENT};
use crate::types::{Point, Screen};

/// Hostname without any domain suffix (`desk.example.org` -> `desk`)
pub fn short_hostname(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw)
}

/// Build the file-system safe profile key for one display
pub fn profile_key(hostname: &str, screen_index: usize, width: u32, height: u32) -> String {
    let key = format!("{}-{screen_index}-{width}x{height}", short_hostname(hostname));
    sanitize(&key)
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| {
            if ILLEGAL_FILENAME_CHARS.contains(&c) || c.is_control() {
                REPLACEMENT
            } else {
                c
            }
        })
        .collect()
}

/// Index of the first screen containing `point`. Falls back to 0 so a point a
/// pixel outside every screen (rounding, off-screen cursor) still resolves.
pub fn screen_containing(point: Point, screens: &[Screen]) -> usize {
    screens
        .iter()
        .position(|screen| screen.bounds.contains(point))
        .unwrap_or(0)
}

/// One key per connected display, in enumeration order
pub fn active_profiles(hostname: &str, screens: &[Screen]) -> Vec<String> {
    screens
        .iter()
        .enumerate()
        .map(|(index, screen)| {
            profile_key(hostname, index, screen.resolution.width, screen.resolution.height)
        })
        .collect()
}

/// Snapshot of the display configuration used to resolve profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileResolver {
    hostname: String,
    screens: Vec<Screen>,
}

impl ProfileResolver {
    pub fn new(hostname: impl Into<String>, screens: Vec<Screen>) -> Self {
        Self {
            hostname: hostname.into(),
            screens,
        }
    }

    pub fn active_profiles(&self) -> Vec<String> {
        active_profiles(&self.hostname, &self.screens)
    }

    /// Profile of a specific display
    pub fn profile_for_screen(&self, index: usize) -> Result<String> {
        let screen = self.screens.get(index).ok_or_else(|| {
            anyhow!(
                "Display {} is not connected ({} display(s) available)",
                index,
                self.screens.len()
            )
        })?;
        Ok(profile_key(
            &self.hostname,
            index,
            screen.resolution.width,
            screen.resolution.height,
        ))
    }

    /// Profile owning `point`, or of `screen_index` when the caller already knows it
    pub fn profile_for_point(&self, point: Point, screen_index: Option<usize>) -> Result<String> {
        let index = screen_index.unwrap_or_else(|| screen_containing(point, &self.screens));
        debug!(x = point.x, y = point.y, screen = index, "Resolved owning display");
        self.profile_for_screen(index)
    }
}
