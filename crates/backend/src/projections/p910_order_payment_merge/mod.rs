pub mod csv_export;
pub mod csv_import;
pub mod merge_builder;
pub mod repository;
pub mod service;
