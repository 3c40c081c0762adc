//! Read-back services. Both re-derive everything from the stored table and
//! run inside a read transaction so the catalog lookup and the row scan see
//! the same committed state.

pub mod document;
pub mod tile;

pub use document::read_document;
pub use tile::read_tile;

use geojson::FeatureCollection;

use crate::error::DatasetResult;
use crate::geometry::mercator::TileCoord;
use crate::schema::{quote_ident, PropertyColumn};
use crate::writer::DatasetStore;

/// `SELECT id, geom, <properties> FROM <table> <filter> ORDER BY id`
fn select_rows(table: &str, columns: &[PropertyColumn], filter: &str) -> String {
    let mut select = String::from("id, geom");
    for column in columns {
        select.push_str(", ");
        select.push_str(&quote_ident(&column.name));
    }
    format!(
        "SELECT {} FROM {} {} ORDER BY id",
        select,
        quote_ident(table),
        filter
    )
}

impl DatasetStore {
    /// The whole dataset as a GeoJSON feature collection
    pub fn document(&self, name: &str) -> DatasetResult<FeatureCollection> {
        let tx = self.connection().unchecked_transaction()?;
        let collection = read_document(&tx, name)?;
        tx.finish()?;
        Ok(collection)
    }

    /// One Mapbox Vector Tile of a dataset
    pub fn tile(&self, name: &str, coord: TileCoord) -> DatasetResult<Vec<u8>> {
        let tx = self.connection().unchecked_transaction()?;
        let bytes = read_tile(&tx, name, coord)?;
        tx.finish()?;
        Ok(bytes)
    }
}
