pub mod dto;
pub mod paging;
pub mod statistics;
pub mod status;

pub use dto::*;
pub use paging::PageWindow;
pub use status::{normalize_status, resolve_status, status_tone, NormalizedStatus, StatusResolution, StatusTone};
