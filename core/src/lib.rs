pub mod backend;
pub mod batch;
pub mod catalog;
pub mod dataset;
pub mod db;
pub mod error;
pub mod failures;
pub mod images;
pub mod importer;
pub mod models;
pub mod reconcile;
pub mod reset;
pub mod resume;

#[cfg(test)]
mod testing;
