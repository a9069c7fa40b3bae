use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as RandrExt;
use x11rb::protocol::xproto::*;
use x11rb::protocol::xtest::ConnectionExt as XTestExt;
use x11rb::rust_connection::RustConnection;

use crate::constants::mouse;
use crate::constants::paths::OPENER;
use crate::constants::profile::FALLBACK_HOSTNAME;
use crate::host::{Desktop, Pointer};
use crate::types::{Point, Rect, Screen};

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_active_window: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_active_window: intern(conn, b"_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern(conn, b"_NET_WM_NAME")?,
            utf8_string: intern(conn, b"UTF8_STRING")?,
        })
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    let label = String::from_utf8_lossy(name);
    Ok(conn
        .intern_atom(false, name)
        .with_context(|| format!("Failed to intern {} atom", label))?
        .reply()
        .with_context(|| format!("Failed to get reply for {} atom", label))?
        .atom)
}

/// Desktop and pointer access through one X11 connection
pub struct X11Host {
    conn: RustConnection,
    root: Window,
    atoms: CachedAtoms,
}

impl X11Host {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11 display")?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = CachedAtoms::new(&conn)?;
        debug!(screen = screen_num, root = root, "Connected to X11");
        Ok(Self { conn, root, atoms })
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let prop = self
            .conn
            .get_property(false, self.root, self.atoms.net_active_window, AtomEnum::WINDOW, 0, 1)
            .context("Failed to query _NET_ACTIVE_WINDOW property")?
            .reply()
            .context("Failed to get reply for _NET_ACTIVE_WINDOW query")?;
        Ok(prop
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&window| window != x11rb::NONE))
    }

    fn string_property(&self, window: Window, property: Atom, type_: Atom) -> Result<Vec<u8>> {
        Ok(self
            .conn
            .get_property(false, window, property, type_, 0, 1024)
            .with_context(|| format!("Failed to query property {} on window {}", property, window))?
            .reply()
            .with_context(|| format!("Failed to get property {} reply for window {}", property, window))?
            .value)
    }

    fn focused_title(&self) -> Result<String> {
        let Some(window) = self.active_window()? else {
            return Ok(String::new());
        };
        let utf8 = self.string_property(window, self.atoms.net_wm_name, self.atoms.utf8_string)?;
        if !utf8.is_empty() {
            return Ok(String::from_utf8_lossy(&utf8).into_owned());
        }
        let legacy = self.string_property(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())?;
        Ok(String::from_utf8_lossy(&legacy).into_owned())
    }

    fn focused_class(&self) -> Result<String> {
        let Some(window) = self.active_window()? else {
            return Ok(String::new());
        };
        let raw = self.string_property(window, AtomEnum::WM_CLASS.into(), AtomEnum::STRING.into())?;
        Ok(class_name(&raw))
    }

    fn button(&self, event_type: u8) -> Result<()> {
        self.conn
            .xtest_fake_input(event_type, mouse::BUTTON_LEFT, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("Failed to send XTEST button event")?;
        self.conn.flush().context("Failed to flush X11 connection")?;
        Ok(())
    }
}

/// `WM_CLASS` is `instance\0class\0`; the class is the human-facing app name
fn class_name(raw: &[u8]) -> String {
    let mut parts = raw.split(|&b| b == 0).filter(|part| !part.is_empty());
    let instance = parts.next();
    let class = parts.next().or(instance).unwrap_or_default();
    String::from_utf8_lossy(class).into_owned()
}

fn clamp_coordinate(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

impl Desktop for X11Host {
    fn window_title(&self) -> String {
        self.focused_title()
            .inspect_err(|err| warn!(error = ?err, "Cannot read focused window title"))
            .unwrap_or_default()
    }

    fn app_name(&self) -> String {
        self.focused_class()
            .inspect_err(|err| warn!(error = ?err, "Cannot read focused application name"))
            .unwrap_or_default()
    }

    fn screens(&self) -> Result<Vec<Screen>> {
        let monitors = self
            .conn
            .randr_get_monitors(self.root, true)
            .context("Failed to query RandR monitors")?
            .reply()
            .context("Failed to get reply for RandR monitors query")?
            .monitors;

        let screens: Vec<Screen> = monitors
            .iter()
            .map(|m| Screen::from_bounds(Rect::new(m.x.into(), m.y.into(), m.width.into(), m.height.into())))
            .collect();
        debug!(count = screens.len(), screens = ?screens, "Enumerated displays");
        Ok(screens)
    }

    fn hostname(&self) -> String {
        system_hostname()
    }

    fn open_file(&self, path: &Path) -> Result<()> {
        Command::new(OPENER)
            .arg(path)
            .spawn()
            .with_context(|| format!("Failed to spawn {} for {:?}", OPENER, path))?;
        info!(path = %path.display(), "Opened spot file");
        Ok(())
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

impl Pointer for X11Host {
    fn position(&self) -> Result<Point> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .context("Failed to query pointer")?
            .reply()
            .context("Failed to get reply for pointer query")?;
        Ok(Point::new(reply.root_x.into(), reply.root_y.into()))
    }

    fn move_to(&self, point: Point) -> Result<()> {
        self.conn
            .warp_pointer(
                x11rb::NONE,
                self.root,
                0,
                0,
                0,
                0,
                clamp_coordinate(point.x),
                clamp_coordinate(point.y),
            )
            .with_context(|| format!("Failed to warp pointer to {}", point))?;
        self.conn.flush().context("Failed to flush X11 connection")?;
        Ok(())
    }

    fn press(&self) -> Result<()> {
        self.button(BUTTON_PRESS_EVENT)
    }

    fn release(&self) -> Result<()> {
        self.button(BUTTON_RELEASE_EVENT)
    }
}

#[cfg(unix)]
pub fn system_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(err) => {
            warn!(error = %err, "Cannot read hostname, using fallback");
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

#[cfg(not(unix))]
pub fn system_hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| FALLBACK_HOSTNAME.to_string())
}
