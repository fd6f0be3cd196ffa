pub mod repository;

use contracts::shared::logger::SOURCE_SERVER;
use repository::log_event_internal;

/// Записать событие сервера в system_log (fire-and-forget)
///
/// ```ignore
/// logger::log("p910", "Merged table rebuilt: 120 rows");
/// ```
pub fn log(category: &str, message: &str) {
    log_event_internal(SOURCE_SERVER, category, message);
}
