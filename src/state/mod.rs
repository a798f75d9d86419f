// State management module
// SQLite prediction history and file system locations

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{init_db, init_db_at, init_db_in_memory, DbConnection, DbError};
pub use models::PredictionRecord;
pub use queries::{list_predictions, store_prediction};
pub use storage::{calculate_sha256, default_history_path, default_model_path};
