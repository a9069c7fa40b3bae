//! Interfaces to the desktop the spots live on
//!
//! The resolution engine never talks to a window system directly; it asks a
//! [`Desktop`] what is focused and which displays exist, and drives a
//! [`Pointer`] to act. `x11_utils` provides the X11 implementation.

use anyhow::Result;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::types::{Point, Screen};

/// Read-only view of the desktop
pub trait Desktop {
    /// Title of the focused window, empty when unknown
    fn window_title(&self) -> String;

    /// Application name of the focused window, empty when unknown
    fn app_name(&self) -> String;

    /// Connected displays in enumeration order
    fn screens(&self) -> Result<Vec<Screen>>;

    fn hostname(&self) -> String;

    /// Hand a file to the user's default application
    fn open_file(&self, path: &Path) -> Result<()>;

    /// User-visible notification channel
    fn notify(&self, message: &str) {
        info!(message = %message, "notification");
    }
}

/// Cursor control. Shared with the slow-move thread, hence `Send + Sync`.
pub trait Pointer: Send + Sync {
    fn position(&self) -> Result<Point>;

    fn move_to(&self, point: Point) -> Result<()>;

    fn press(&self) -> Result<()>;

    fn release(&self) -> Result<()>;

    /// Press, hold for `hold`, release
    fn click(&self, hold: Duration) -> Result<()> {
        self.press()?;
        thread::sleep(hold);
        self.release()
    }
}
