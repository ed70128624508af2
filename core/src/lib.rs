pub mod csv_store;
pub mod db;
pub mod error;
pub mod feed;
pub mod image;
pub mod models;
pub mod repository;
pub mod session;
pub mod store;

pub use error::{MealError, Result};
pub use repository::{MealRepository, Snapshot};
