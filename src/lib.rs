pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod parser;
pub mod progress;
pub mod reader;
pub mod schema;
pub mod writer;

pub use catalog::{Coordinate, DatasetEdit, DatasetEntry, MapLayer, NewDataset};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{DatasetError, DatasetResult, ErrorKind};
pub use geometry::mercator::TileCoord;
pub use progress::{BarProgress, LogProgress, Phase, ProgressSink, SilentProgress};
pub use schema::{ColumnType, GeometryKind};
pub use writer::DatasetStore;
