//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Screen spots - bind names to screen positions per display and window
#[derive(Parser, Debug)]
#[command(name = "screen-spots")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save the cursor position as a global spot
    Save { name: String },

    /// Save the cursor position for the focused window only
    SaveWindow {
        name: String,

        /// Pick suggestion N without prompting (0 = global)
        #[arg(long, conflicts_with = "pattern")]
        choice: Option<usize>,

        /// Use this title text as the pattern without prompting
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Move the cursor to a spot
    Move {
        name: String,

        /// Ignore global spots
        #[arg(short, long)]
        window_only: bool,
    },

    /// Click a spot and return the cursor
    Click {
        name: String,

        /// Ignore global spots
        #[arg(short, long)]
        window_only: bool,
    },

    /// Drag from the cursor to a spot
    Drag {
        name: String,

        /// Release the button at the spot
        #[arg(short, long)]
        release: bool,
    },

    /// Remove a spot
    Clear { name: String },

    /// Remove every spot on the connected displays
    ClearAll,

    /// Remove the focused window's spots
    ClearWindow,

    /// List spots on the connected displays
    List,

    /// List spots that apply to the focused window
    Visible,

    /// Open the spot file of the display under the cursor
    Edit,

    /// Show pattern suggestions for a title (default: focused window)
    Suggest { title: Option<String> },

    /// Show the active display profiles
    Profiles,

    /// Re-enumerate displays and reload their spots
    Reload,
}
