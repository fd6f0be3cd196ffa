//! API base URL helpers.

/// Порт backend-сервера
pub const BACKEND_PORT: u16 = 3000;

/// Base URL of the backend, derived from the page location.
///
/// Returns an empty string outside a browser window, which turns every API
/// URL into a relative one.
pub fn api_base() -> String {
    let Some(window) = web_sys::window() else {
        return String::new();
    };
    let location = window.location();
    let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let hostname = location
        .hostname()
        .unwrap_or_else(|_| "127.0.0.1".to_string());
    format!("{}//{}:{}", protocol, hostname, BACKEND_PORT)
}

/// Full API URL for `path` ("/api/...")
///
/// ```rust,ignore
/// let url = api_url("/api/data-merge/statistics");
/// ```
pub fn api_url(path: &str) -> String {
    format!("{}{}", api_base(), path)
}
