//! All data types used by the API and database layers.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
