//! Resolution facade: "where is spot X" and "save spot X here"
//!
//! Composes the profile resolver, the store and the title segmenter on top of
//! a [`Desktop`] and a [`Pointer`]. Results the user should see go through
//! [`Desktop::notify`]; not-found is a `false`, never an error.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::host::{Desktop, Pointer};
use crate::pattern::Pattern;
use crate::profile::ProfileResolver;
use crate::slow_mover::SlowMover;
use crate::store::{Spot, SpotStore, WindowContext};
use crate::title::{self, Suggestion, SuggestionKind};
use crate::types::Point;

/// A window-scoped save waiting for the user's pattern choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    name: String,
    point: Point,
    suggestions: Vec<Suggestion>,
}

impl PendingSelection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn point(&self) -> Point {
        self.point
    }

    /// Choices `1..=len`; choice 0 always means global
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSave {
    /// Nothing to choose from; saved as global right away
    Saved { profile: String },
    Pending(PendingSelection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Saved { profile: String, pattern: Pattern },
    /// Choice out of range; the session is handed back untouched
    Invalid(PendingSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    App { matches: bool },
    Window { matches: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotListing {
    pub profile: String,
    pub name: String,
    pub point: Point,
    pub pattern: Pattern,
    pub scope: Scope,
}

pub struct SpotService {
    desktop: Arc<dyn Desktop>,
    pointer: Arc<dyn Pointer>,
    mover: Option<SlowMover>,
    store: SpotStore,
    click_hold: Duration,
    drag_release_delay: Duration,
    min_segment_length: usize,
}

impl SpotService {
    /// Enumerate displays, migrate legacy data and load the active profiles
    pub fn new(desktop: Arc<dyn Desktop>, pointer: Arc<dyn Pointer>, settings: &Settings) -> Self {
        let resolver = current_resolver(desktop.as_ref());
        let (store, report) = SpotStore::open(settings.resolved_data_dir(), resolver);
        if let Some(profile) = &report.profile
            && !report.is_empty()
        {
            desktop.notify(&format!(
                "Migrated {} spot(s) to profile {}",
                report.from_storage + report.from_csv,
                profile
            ));
        }

        let mover = settings
            .slow_move_enabled
            .then(|| SlowMover::spawn(pointer.clone(), settings.mover_settings()));

        Self {
            desktop,
            pointer,
            mover,
            store,
            click_hold: settings.click_hold(),
            drag_release_delay: settings.drag_release_delay(),
            min_segment_length: settings.min_segment_length,
        }
    }

    pub fn active_profiles(&self) -> &[String] {
        self.store.active_profiles()
    }

    fn window(&self) -> WindowContext {
        WindowContext::new(self.desktop.window_title(), self.desktop.app_name())
    }

    /// Save the cursor position as a global spot
    pub fn save(&mut self, name: &str) -> Result<String> {
        let point = self.pointer.position()?;
        self.persist(name, point, Pattern::Global)
    }

    /// Start a window-scoped save at the cursor position. Suggestions are the
    /// focused app followed by the title's segments; with none at all the spot
    /// is saved as global immediately.
    pub fn save_window_scoped(&mut self, name: &str) -> Result<WindowSave> {
        let point = self.pointer.position()?;
        let window = self.window();

        let mut suggestions = Vec::new();
        if !window.app_name.trim().is_empty() {
            suggestions.push(Suggestion {
                pattern: Pattern::AppName(window.app_name.clone()),
                description: format!("Any {} window", window.app_name),
                kind: SuggestionKind::App,
            });
        }
        suggestions.extend(title::suggest(&window.title, self.min_segment_length));

        if suggestions.is_empty() {
            info!(name = %name, "No window information, saving as global");
            let profile = self.persist(name, point, Pattern::Global)?;
            return Ok(WindowSave::Saved { profile });
        }

        debug!(name = %name, count = suggestions.len(), "Awaiting pattern choice");
        Ok(WindowSave::Pending(PendingSelection {
            name: name.to_string(),
            point,
            suggestions,
        }))
    }

    /// Finish a pending save with suggestion `choice` (1-based, 0 = global)
    pub fn confirm_pattern(&mut self, session: PendingSelection, choice: usize) -> Result<Selection> {
        let pattern = match choice {
            0 => Pattern::Global,
            n => match session.suggestions.get(n - 1) {
                Some(suggestion) => suggestion.pattern.clone(),
                None => {
                    self.desktop.notify(&format!(
                        "Invalid choice {}: pick 0 to {}",
                        choice,
                        session.suggestions.len()
                    ));
                    return Ok(Selection::Invalid(session));
                }
            },
        };
        let profile = self.persist(&session.name, session.point, pattern.clone())?;
        Ok(Selection::Saved { profile, pattern })
    }

    /// Finish a pending save with free text; blank text means global
    pub fn confirm_custom_pattern(&mut self, session: PendingSelection, text: &str) -> Result<Selection> {
        let text = text.trim();
        let pattern = if text.is_empty() {
            self.desktop.notify("Empty pattern, saving as global");
            Pattern::Global
        } else {
            Pattern::Substring(text.to_string())
        };
        let profile = self.persist(&session.name, session.point, pattern.clone())?;
        Ok(Selection::Saved { profile, pattern })
    }

    pub fn cancel(&self, session: PendingSelection) {
        debug!(name = %session.name, "Pattern selection cancelled");
    }

    fn persist(&mut self, name: &str, point: Point, pattern: Pattern) -> Result<String> {
        match self.store.put(name, point, pattern.clone(), None) {
            Ok(profile) => {
                self.desktop
                    .notify(&format!("Saved spot: {} ({}) on {}", name, pattern, profile));
                Ok(profile)
            }
            Err(err) => {
                self.desktop.notify(&format!("Failed to save spot '{}': {:#}", name, err));
                Err(err)
            }
        }
    }

    fn locate(&self, name: &str, window_only: bool) -> Option<Point> {
        let window = self.window();
        match self.store.find(name, window_only, &window) {
            Some(found) => {
                debug!(name = %name, profile = %found.profile, point = %found.point, "Resolved spot");
                Some(found.point)
            }
            None => {
                debug!(name = %name, window_only = window_only, title = %window.title, "Spot not found");
                None
            }
        }
    }

    /// Move the cursor to a spot matching the focused window.
    /// Returns whether the cursor was moved.
    pub fn move_to(&self, name: &str) -> Result<bool> {
        self.move_to_matching(name, false)
    }

    /// Like [`SpotService::move_to`] but only window-scoped spots count
    pub fn move_to_window_only(&self, name: &str) -> Result<bool> {
        self.move_to_matching(name, true)
    }

    fn move_to_matching(&self, name: &str, window_only: bool) -> Result<bool> {
        let Some(point) = self.locate(name, window_only) else {
            return Ok(false);
        };
        self.go(point)?;
        Ok(true)
    }

    /// Click a spot and put the cursor back where it was
    pub fn click(&self, name: &str) -> Result<bool> {
        self.click_matching(name, false)
    }

    pub fn click_window_only(&self, name: &str) -> Result<bool> {
        self.click_matching(name, true)
    }

    fn click_matching(&self, name: &str, window_only: bool) -> Result<bool> {
        let origin = self.pointer.position()?;
        let Some(point) = self.locate(name, window_only) else {
            return Ok(false);
        };
        self.go(point)?;
        match &self.mover {
            Some(mover) => mover.click(),
            None => self.pointer.click(self.click_hold)?,
        }
        self.go(origin)?;
        Ok(true)
    }

    /// Press at the cursor, move to the spot, optionally release there
    pub fn drag(&self, name: &str, release: bool) -> Result<bool> {
        let Some(point) = self.locate(name, false) else {
            return Ok(false);
        };
        self.pointer.press()?;
        self.go(point)?;
        if release {
            match &self.mover {
                Some(mover) => mover.release_after(self.drag_release_delay),
                None => {
                    thread::sleep(self.drag_release_delay);
                    self.pointer.release()?;
                }
            }
        }
        Ok(true)
    }

    fn go(&self, point: Point) -> Result<()> {
        match &self.mover {
            Some(mover) => {
                mover.move_to(point);
                Ok(())
            }
            None => self.pointer.move_to(point),
        }
    }

    /// Remove a spot from the first active profile holding it
    pub fn clear(&mut self, name: &str) -> Result<bool> {
        match self.store.remove(name) {
            Ok(Some(profile)) => {
                self.desktop.notify(&format!("Removed spot: {} from {}", name, profile));
                Ok(true)
            }
            Ok(None) => {
                self.desktop.notify(&format!("No spot named '{}'", name));
                Ok(false)
            }
            Err(err) => {
                self.desktop.notify(&format!("Failed to remove spot '{}': {:#}", name, err));
                Err(err)
            }
        }
    }

    pub fn clear_all(&mut self) -> Result<()> {
        match self.store.clear_all() {
            Ok(()) => {
                self.desktop.notify("Cleared all spots on connected displays");
                Ok(())
            }
            Err(err) => {
                self.desktop.notify(&format!("{:#}", err));
                Err(err)
            }
        }
    }

    /// Remove window-scoped spots belonging to the focused window
    pub fn clear_window(&mut self) -> Result<usize> {
        let title = self.desktop.window_title();
        match self.store.clear_matching_window(&title) {
            Ok(removed) => {
                self.desktop
                    .notify(&format!("Removed {} spot(s) for this window", removed));
                Ok(removed)
            }
            Err(err) => {
                self.desktop.notify(&format!("{:#}", err));
                Err(err)
            }
        }
    }

    /// Every active spot with its scope relative to the focused window
    pub fn list_all(&self) -> Vec<SpotListing> {
        let window = self.window();
        self.store
            .iter_active()
            .map(|(profile, spot)| SpotListing {
                profile: profile.to_string(),
                name: spot.name.clone(),
                point: spot.point,
                pattern: spot.pattern.clone(),
                scope: scope_of(spot, &window),
            })
            .collect()
    }

    /// Spots that apply to the focused window, across every active profile
    pub fn visible_spots(&self) -> Vec<&Spot> {
        let window = self.window();
        self.store
            .iter_active()
            .map(|(_, spot)| spot)
            .filter(|spot| spot.pattern.matches(&window.title, &window.app_name))
            .collect()
    }

    /// Open the spot file of the display under the cursor, creating it with
    /// just the header when it does not exist yet
    pub fn edit(&self) -> Result<PathBuf> {
        let point = self.pointer.position()?;
        let opened = self
            .store
            .resolver()
            .profile_for_point(point, None)
            .and_then(|profile| self.store.ensure_file(&profile))
            .and_then(|path| self.desktop.open_file(&path).map(|()| path));
        match opened {
            Ok(path) => {
                self.desktop.notify(&format!("Opened {}", path.display()));
                Ok(path)
            }
            Err(err) => {
                self.desktop.notify(&format!("Failed to open spot file: {:#}", err));
                Err(err)
            }
        }
    }

    /// Re-enumerate displays and reload the profiles now active
    pub fn reload(&mut self) -> &[String] {
        let resolver = current_resolver(self.desktop.as_ref());
        self.store.reload(resolver);
        let active = self.store.active_profiles();
        self.desktop
            .notify(&format!("Reloaded {} profile(s)", active.len()));
        active
    }

    /// Wait for queued slow moves and clicks to finish
    pub fn finish(mut self) {
        if let Some(mover) = self.mover.take() {
            mover.finish();
        }
    }
}

fn scope_of(spot: &Spot, window: &WindowContext) -> Scope {
    let matches = spot.pattern.matches(&window.title, &window.app_name);
    match spot.pattern {
        Pattern::Global => Scope::Global,
        Pattern::AppName(_) => Scope::App { matches },
        Pattern::Substring(_) | Pattern::CombinedAll(_) | Pattern::Lookahead(_) => Scope::Window { matches },
    }
}

fn current_resolver(desktop: &dyn Desktop) -> ProfileResolver {
    let screens = desktop.screens().unwrap_or_else(|err| {
        error!(error = ?err, "Cannot enumerate displays");
        Vec::new()
    });
    ProfileResolver::new(desktop.hostname(), screens)
}
