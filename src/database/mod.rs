pub mod manager;
pub mod schema;

pub use manager::CalibrationStore;
pub use schema::{DatabaseSchema, TIME_COLUMN};
