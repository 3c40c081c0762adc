use chrono::{DateTime, Utc};
use rusqlite::{ffi, Connection, ErrorCode, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use super::schema_gen::{
    generate_create_table, generate_drop_table, generate_indexes, generate_insert,
    generate_rename, generate_truncate, INSERT_SYSTEM_COLUMNS,
};
use crate::catalog::{
    delete_entry, ensure_catalog, insert_entry, list_entries, name_taken, require_entry,
    update_entry, DatasetEdit, DatasetEntry, MapLayer, NewDataset,
};
use crate::config::{Config, DEFAULT_BUSY_TIMEOUT_MS};
use crate::error::{DatasetError, DatasetResult};
use crate::geometry;
use crate::parser::{coerce, parse_feature_collection, FeatureRecord};
use crate::progress::{Phase, ProgressSink};
use crate::schema::{bbox_index_name, infer_types, table_columns, PropertyColumn, TypeMap};

/// Owns one SQLite connection holding the catalog and every dataset table
pub struct DatasetStore {
    conn: Connection,
}

impl DatasetStore {
    pub fn open(db_path: &Path) -> DatasetResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    pub fn open_with_config(config: &Config) -> DatasetResult<Self> {
        let conn = Connection::open(&config.database)?;
        Self::init(conn, config.busy_timeout)
    }

    pub fn open_in_memory() -> DatasetResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    fn init(conn: Connection, busy_timeout: Duration) -> DatasetResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = mode.as_str(), "Opened dataset store");

        ensure_catalog(&conn)?;
        Ok(Self { conn })
    }

    /// The underlying connection, for read services and ad-hoc queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Ingest a feature collection as a new dataset.
    ///
    /// The catalog row, the physical table and every feature row are
    /// written in one transaction; any failure leaves none of them behind.
    /// Returns the number of features stored.
    #[instrument(
        name = "dataset.ingest",
        skip(self, dataset, upload, progress),
        fields(table = %dataset.table_name, kind = %dataset.kind, bytes = upload.len())
    )]
    pub fn ingest(
        &mut self,
        dataset: &NewDataset,
        upload: &[u8],
        user: &str,
        progress: &mut impl ProgressSink,
    ) -> DatasetResult<usize> {
        dataset.validate()?;
        let name = dataset.table_name.as_str();
        let now = Utc::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        progress.set_phase(Phase::Checking);
        ensure_available(&tx, name, None)?;
        insert_entry(&tx, dataset, user, now)?;

        let records = parse_feature_collection(upload)?;
        let types = infer_types(records.iter().map(|r| &r.properties))?;

        progress.set_phase(Phase::Provisioning);
        provision_table(&tx, name, &types)?;

        progress.set_phase(Phase::Loading);
        let columns: Vec<PropertyColumn> = types
            .into_iter()
            .map(|(name, col_type)| PropertyColumn { name, col_type })
            .collect();
        let count = load_features(&tx, name, &columns, &records, user, now, progress)?;

        progress.set_phase(Phase::Committing);
        tx.commit()?;
        progress.set_phase(Phase::Complete);

        info!(features = count, columns = columns.len(), "Dataset ingested");
        Ok(count)
    }

    /// Edit a dataset's catalog attributes, optionally renaming it and
    /// replacing its contents.
    ///
    /// A replacement upload is loaded against the table's existing columns:
    /// unknown properties are dropped and nothing is re-inferred. Returns the
    /// number of features loaded when a replacement was supplied.
    #[instrument(
        name = "dataset.edit",
        skip(self, edit, replacement, progress),
        fields(rename = ?edit.table_name, replace = replacement.is_some())
    )]
    pub fn edit(
        &mut self,
        name: &str,
        edit: &DatasetEdit,
        replacement: Option<&[u8]>,
        user: &str,
        progress: &mut impl ProgressSink,
    ) -> DatasetResult<Option<usize>> {
        edit.validate()?;
        let now = Utc::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        progress.set_phase(Phase::Checking);
        let entry = require_entry(&tx, name)?;
        let mut table = entry.table_name.clone();

        if let Some(new_name) = edit.table_name.as_deref().filter(|n| *n != entry.table_name) {
            ensure_available(&tx, new_name, Some(&entry.table_name))?;
            // Identifiers are case-insensitive, so a case-only rename is
            // purely a catalog change.
            if !new_name.eq_ignore_ascii_case(&entry.table_name) {
                progress.set_phase(Phase::Provisioning);
                for sql in generate_rename(&entry.table_name, new_name) {
                    tx.execute_batch(&sql)
                        .map_err(|e| provisioning_error(new_name, e))?;
                }
            }
            debug!(from = entry.table_name.as_str(), to = new_name, "Renamed dataset");
            table = new_name.to_string();
        }

        update_entry(&tx, entry.id, edit, user, now)?;

        let loaded = match replacement {
            Some(upload) => {
                let records = parse_feature_collection(upload)?;
                let columns = table_columns(&tx, &table)?;
                report_dropped_properties(&records, &columns, progress);

                progress.set_phase(Phase::Loading);
                let removed = tx.execute(&generate_truncate(&table), [])?;
                debug!(removed, "Truncated dataset table");
                Some(load_features(&tx, &table, &columns, &records, user, now, progress)?)
            }
            None => None,
        };

        progress.set_phase(Phase::Committing);
        tx.commit()?;
        progress.set_phase(Phase::Complete);

        info!(table = table.as_str(), features = ?loaded, "Dataset edited");
        Ok(loaded)
    }

    /// Drop a dataset's catalog row and physical table together
    #[instrument(name = "dataset.delete", skip(self))]
    pub fn delete_dataset(&mut self, name: &str) -> DatasetResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let entry = require_entry(&tx, name)?;
        delete_entry(&tx, &entry.table_name)?;
        tx.execute_batch(&generate_drop_table(&entry.table_name))?;
        tx.commit()?;

        info!(table = entry.table_name.as_str(), "Dataset deleted");
        Ok(())
    }

    pub fn list_datasets(&self) -> DatasetResult<Vec<DatasetEntry>> {
        list_entries(&self.conn)
    }

    pub fn get_dataset(&self, name: &str) -> DatasetResult<DatasetEntry> {
        require_entry(&self.conn, name)
    }

    /// Map-client layer descriptors for every dataset
    pub fn map_layers(&self, tile_url_base: &str) -> DatasetResult<Vec<MapLayer>> {
        Ok(list_entries(&self.conn)?
            .iter()
            .map(|entry| MapLayer::from_entry(entry, tile_url_base))
            .collect())
    }
}

/// Fail with `AlreadyExists` when `name` or its index name is in use.
///
/// `except` is the dataset being renamed; its own table and index never
/// count as collisions.
fn ensure_available(conn: &Connection, name: &str, except: Option<&str>) -> DatasetResult<()> {
    let own_index = except.map(bbox_index_name);
    if name_taken(conn, name, except)?
        || name_taken(conn, &bbox_index_name(name), own_index.as_deref())?
    {
        return Err(DatasetError::AlreadyExists(name.to_string()));
    }
    Ok(())
}

/// Whether a DDL failure means the object name is already in use.
///
/// SQLite reports "table/index already exists" as a plain `SQLITE_ERROR`,
/// so the primary code narrows the match before the message is consulted.
fn is_name_collision(err: &rusqlite::Error) -> bool {
    let (failure, message) = match err {
        rusqlite::Error::SqliteFailure(e, message) => (e, message.as_deref()),
        rusqlite::Error::SqlInputError { error, msg, .. } => (error, Some(msg.as_str())),
        _ => return false,
    };
    match failure.code {
        ErrorCode::ConstraintViolation => true,
        ErrorCode::Unknown if failure.extended_code == ffi::SQLITE_ERROR => message
            .is_some_and(|m| m.contains("already exists") || m.contains("there is already")),
        _ => false,
    }
}

fn provisioning_error(table: &str, err: rusqlite::Error) -> DatasetError {
    if is_name_collision(&err) {
        return DatasetError::AlreadyExists(table.to_string());
    }
    let message = err.to_string();
    error!(table, error = message.as_str(), "Table provisioning failed");
    DatasetError::Provisioning {
        table: table.to_string(),
        message,
    }
}

/// Create the physical table and its envelope index
fn provision_table(conn: &Connection, table: &str, types: &TypeMap) -> DatasetResult<()> {
    let create = generate_create_table(table, types);
    debug!(sql = create.as_str(), "Creating dataset table");
    conn.execute_batch(&create)
        .map_err(|e| provisioning_error(table, e))?;

    for index_sql in generate_indexes(table) {
        conn.execute_batch(&index_sql)
            .map_err(|e| provisioning_error(table, e))?;
    }
    Ok(())
}

/// Tell the caller which uploaded properties the table has no column for
fn report_dropped_properties(
    records: &[FeatureRecord],
    columns: &[PropertyColumn],
    progress: &mut impl ProgressSink,
) {
    let mut dropped: Vec<&str> = records
        .iter()
        .flat_map(|r| r.properties.keys())
        .filter(|key| !columns.iter().any(|c| &c.name == *key))
        .map(String::as_str)
        .collect();
    dropped.sort_unstable();
    dropped.dedup();
    if !dropped.is_empty() {
        debug!(properties = ?dropped, "Dropping properties absent from the table schema");
        progress.log(format!("Ignoring unknown properties: {}", dropped.join(", ")));
    }
}

/// Encode, coerce and insert every feature through the open transaction
fn load_features(
    conn: &Connection,
    table: &str,
    columns: &[PropertyColumn],
    records: &[FeatureRecord],
    user: &str,
    now: DateTime<Utc>,
    progress: &mut impl ProgressSink,
) -> DatasetResult<usize> {
    let sql = generate_insert(table, columns);
    let mut stmt = conn.prepare_cached(&sql)?;
    let total = records.len() as u64;

    for (index, record) in records.iter().enumerate() {
        let encoded = geometry::encode(&record.geometry).map_err(|e| match e {
            DatasetError::InvalidInput(message) => {
                DatasetError::invalid(format!("feature {}: {}", index, message))
            }
            other => other,
        })?;

        stmt.raw_bind_parameter(1, encoded.wkb.as_slice())?;
        stmt.raw_bind_parameter(2, encoded.envelope.min_x)?;
        stmt.raw_bind_parameter(3, encoded.envelope.min_y)?;
        stmt.raw_bind_parameter(4, encoded.envelope.max_x)?;
        stmt.raw_bind_parameter(5, encoded.envelope.max_y)?;
        stmt.raw_bind_parameter(6, now)?;
        stmt.raw_bind_parameter(7, now)?;
        stmt.raw_bind_parameter(8, user)?;
        stmt.raw_bind_parameter(9, user)?;

        for (offset, column) in columns.iter().enumerate() {
            let value = record.properties.get(&column.name).unwrap_or(&Value::Null);
            let converted = coerce(value, column.col_type).map_err(|failure| {
                error!(
                    table,
                    property = column.name.as_str(),
                    feature = index,
                    error = %failure,
                    "Property coercion failed"
                );
                DatasetError::Coercion {
                    property: column.name.clone(),
                    feature: index,
                    message: failure.to_string(),
                }
            })?;
            converted.bind_to(INSERT_SYSTEM_COLUMNS.len() + offset + 1, &mut stmt)?;
        }

        stmt.raw_execute()?;
        progress.set_progress(index as u64 + 1, total);
    }

    debug!(table, rows = records.len(), "Loaded features");
    Ok(records.len())
}
