pub mod db;
pub mod error;
pub mod models;
pub mod nutrition;
pub mod planner;
pub mod seed;
pub mod service;
pub mod store;
pub mod units;

pub use error::{Error, Result};
