pub mod status_source;

pub use status_source::StatusSource;
