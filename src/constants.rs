//! Named values for file layout, stored pattern syntax, title splitting and
//! settings limits

/// Configuration and data file locations
pub mod paths {
    /// Directory name under the platform config/data dirs
    pub const APP_DIR: &str = "screen-spots";

    /// Settings file name inside the config directory
    pub const SETTINGS_FILE: &str = "settings.json";

    /// Subdirectory of the data dir holding one CSV per display profile
    pub const PROFILES_DIR: &str = "profiles";

    /// Extension of per-profile spot files
    pub const PROFILE_EXTENSION: &str = "csv";

    /// Pre-profile single spot file (second schema generation)
    pub const LEGACY_CSV: &str = "screen-spots.csv";

    /// Name the legacy CSV is renamed to once migrated
    pub const LEGACY_CSV_BACKUP: &str = "screen-spots.csv.bak";

    /// Flat name -> coordinates store (first schema generation)
    pub const LEGACY_STORAGE: &str = "screen-spots.json";

    /// Desktop helper that opens a file in the user's preferred application
    pub const OPENER: &str = "xdg-open";
}

/// Spot file layout
pub mod csv {
    pub const HEADER_NAME: &str = "Name";
    pub const HEADER_X: &str = "X";
    pub const HEADER_Y: &str = "Y";
    pub const HEADER_WINDOW_PATTERN: &str = "WindowPattern";
}

/// Stored pattern syntax
pub mod pattern {
    /// Prefix marking an application-name pattern (`app:Firefox`)
    pub const APP_PREFIX: &str = "app:";

    /// Prefix of a lookahead conjunction (`(?=.*a)(?=.*b)`)
    pub const LOOKAHEAD_PREFIX: &str = "(?=";
}

/// Window title segmentation
pub mod title {
    /// Segments shorter than this (in characters) are discarded
    pub const DEFAULT_MIN_SEGMENT_LENGTH: usize = 3;

    /// Endings that mark a dotted segment as a file name rather than a domain
    pub const FILE_EXTENSIONS: &[&str] = &[
        ".md", ".py", ".js", ".ts", ".txt", ".json", ".csv", ".html", ".css", ".xml", ".yml",
        ".yaml", ".sh", ".bat", ".exe", ".app", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".png",
        ".jpg", ".jpeg", ".gif", ".svg",
    ];
}

/// Profile key construction
pub mod profile {
    /// Characters that may not appear in a file name on any supported platform
    pub const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    /// Replacement for illegal file name characters
    pub const REPLACEMENT: char = '_';

    /// Hostname used when the host refuses to report one
    pub const FALLBACK_HOSTNAME: &str = "localhost";
}

/// Mouse button constants
pub mod mouse {
    /// Left mouse button number (X11 core protocol)
    pub const BUTTON_LEFT: u8 = 1;
}

/// Validation limits applied to loaded settings
pub mod validation {
    pub const MIN_SLOW_MOVE_DISTANCE: u32 = 1;
    pub const MAX_SLOW_MOVE_DISTANCE: u32 = 10_000;
    pub const MIN_TICK_MS: u64 = 1;
    pub const MAX_TICK_MS: u64 = 1_000;
    pub const MAX_CLICK_HOLD_MS: u64 = 1_000;
    pub const MAX_DRAG_RELEASE_DELAY_MS: u64 = 5_000;
    pub const MIN_SEGMENT_LENGTH: usize = 1;
    pub const MAX_SEGMENT_LENGTH: usize = 64;
}
