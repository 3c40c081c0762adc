use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::Coordinate;
use crate::config::{Config, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_TILE_URL_BASE};
use crate::schema::GeometryKind;

#[derive(Parser, Debug)]
#[command(name = "geodata")]
#[command(version, about = "Ingest GeoJSON feature collections into SQLite and serve them back")]
pub struct Cli {
    /// SQLite database path (defaults to the per-user data directory)
    #[arg(long, global = true, env = "GEODATA_DB")]
    pub database: Option<PathBuf>,

    /// Milliseconds to wait on a locked database
    #[arg(long, global = true, env = "GEODATA_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,

    /// Base URL used in map layer tile templates
    #[arg(long, global = true, env = "GEODATA_TILE_URL_BASE", default_value = DEFAULT_TILE_URL_BASE)]
    pub tile_url_base: String,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log progress instead of drawing a progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a GeoJSON file as a new dataset
    Ingest {
        /// Dataset (table) name
        name: String,

        /// GeoJSON FeatureCollection file
        file: PathBuf,

        /// Geometry kind: POINT, LINESTRING or POLYGON
        #[arg(short, long)]
        kind: GeometryKind,

        /// Display color
        #[arg(short, long)]
        color: String,

        /// Anchor coordinate as lon,lat
        #[arg(long, allow_hyphen_values = true)]
        coordinate: Option<Coordinate>,

        /// Principal recorded in the audit columns
        #[arg(short, long, env = "USER", default_value = "anonymous")]
        user: String,
    },

    /// Rename a dataset, change its display attributes or replace its contents
    Edit {
        /// Current dataset name
        name: String,

        /// New dataset name
        #[arg(short, long)]
        rename: Option<String>,

        /// Replacement GeoJSON file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// New display color
        #[arg(short, long)]
        color: Option<String>,

        /// New anchor coordinate as lon,lat
        #[arg(long, allow_hyphen_values = true)]
        coordinate: Option<Coordinate>,

        /// Principal recorded in the audit columns
        #[arg(short, long, env = "USER", default_value = "anonymous")]
        user: String,
    },

    /// Delete a dataset and its table
    Delete {
        name: String,
    },

    /// List every dataset in the catalog
    List,

    /// Print map layer descriptors for every dataset
    Layers,

    /// Export a dataset as a GeoJSON document
    Document {
        name: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render one Mapbox Vector Tile
    Tile {
        name: String,
        z: i64,
        x: i64,
        y: i64,

        /// Output .mvt file
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Resolve the runtime configuration from flags, environment and defaults
    pub fn config(&self) -> Result<Config> {
        let config = match &self.database {
            Some(path) => Config::new(path),
            None => Config::from_project_dirs()?,
        };
        Ok(config
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .with_tile_url_base(self.tile_url_base.clone()))
    }
}
