pub mod coerce;
pub mod record;

pub use coerce::{coerce, CoercionFailure};
pub use record::{parse_feature_collection, FeatureRecord, SqlValue};
