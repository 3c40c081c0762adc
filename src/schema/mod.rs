pub mod identifier;
pub mod inference;
pub mod introspect;
pub mod types;

pub use identifier::*;
pub use inference::*;
pub use introspect::table_columns;
pub use types::*;
