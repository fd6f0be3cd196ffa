pub mod api_utils;
pub mod diagnostics;
pub mod request;
pub mod request_guard;
