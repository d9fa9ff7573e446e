use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new box
    Add {
        /// Location label (must be one of the known locations)
        #[clap(short, long)]
        location: Option<String>,

        /// Comma-separated item tags
        #[clap(short, long)]
        items: Option<String>,

        /// Path to the box photo
        #[clap(long)]
        image: Option<PathBuf>,

        /// Auto-tag the photo with the configured vision provider
        #[clap(long, default_value = "false")]
        auto_tag: bool,
    },

    /// Find a box by code, location or free-text description
    Search {
        /// Box code or item description
        query: Option<String>,

        /// Restrict to one location
        #[clap(short, long)]
        location: Option<String>,

        /// Override the similarity threshold for this search
        #[clap(short, long)]
        threshold: Option<f32>,
    },

    /// Look up a box by an externally-decoded QR/code string
    Scan {
        code: String,
    },

    /// Show a single box by id or code
    Show {
        /// Box id
        id: Option<String>,

        /// Box code
        #[clap(short, long)]
        code: Option<String>,
    },

    /// List every box, newest first
    List {},

    /// Update a box's location or items
    Update {
        /// Box id
        id: String,

        /// New location label
        #[clap(short, long)]
        location: Option<String>,

        /// Replacement comma-separated item tags
        #[clap(short, long)]
        items: Option<String>,
    },

    /// Delete a box and its photo
    Delete {
        /// Box id
        id: String,
    },

    /// Manage the location vocabulary
    Locations {
        #[clap(subcommand)]
        action: LocationsAction,
    },

    /// Ask the vision provider for item tags for a photo
    Analyze {
        /// Path to the photo
        image: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum LocationsAction {
    /// List known locations
    List {},
    /// Add a location label
    Add { name: String },
    /// Remove a location label
    Remove { name: String },
}
