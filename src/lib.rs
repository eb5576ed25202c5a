//! Star-schema ETL for retail sales data.
//!
//! One run extracts the flat sales CSV from object storage, derives
//! surrogate-keyed dimension tables plus a dense calendar dimension,
//! joins them back into a normalized fact table, persists everything as
//! CSV, uploads the files, and bulk-loads the warehouse.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod process;
pub mod table;
