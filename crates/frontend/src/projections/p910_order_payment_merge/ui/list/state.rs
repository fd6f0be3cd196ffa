use chrono::{Datelike, Utc};
use leptos::prelude::*;

/// Фильтры и пагинация страницы Data Merge
#[derive(Clone, Debug, PartialEq)]
pub struct MergeListState {
    pub page: u64,
    pub page_size: u64,
    pub search: String,
    pub status_filter: String,
    pub source_filter: String,
}

impl Default for MergeListState {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 50,
            search: String::new(),
            status_filter: String::new(),
            source_filter: String::new(),
        }
    }
}

impl MergeListState {
    pub fn has_filter(&self) -> bool {
        !self.status_filter.trim().is_empty() || !self.source_filter.trim().is_empty()
    }

    pub fn total_pages(&self, total_records: u64) -> u64 {
        total_records.div_ceil(self.page_size.max(1))
    }
}

/// Подпись пагинации по странице из ответа сервера (нумерация с 1)
pub fn page_label(current_page: u64, total_pages: u64) -> String {
    format!("Page {} of {}", current_page + 1, total_pages.max(1))
}

pub fn create_state() -> RwSignal<MergeListState> {
    RwSignal::new(MergeListState::default())
}

/// Период графика по умолчанию: с начала текущего года по сегодня
pub fn default_chart_period() -> (String, String) {
    let today = Utc::now().date_naive();
    let year_start = chrono::NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    (
        year_start.format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        let state = MergeListState::default();
        assert_eq!(state.total_pages(120), 3);
        assert_eq!(state.total_pages(0), 0);
        assert_eq!(state.total_pages(50), 1);
    }

    #[test]
    fn test_has_filter_ignores_blank() {
        let mut state = MergeListState::default();
        state.status_filter = "  ".to_string();
        assert!(!state.has_filter());
        state.source_filter = "ORDER_FILE".to_string();
        assert!(state.has_filter());
    }

    #[test]
    fn test_page_label_follows_server_page() {
        // requested page 7 of a table that shrank to 2 pages; server answered page 1
        assert_eq!(page_label(1, 2), "Page 2 of 2");
        assert_eq!(page_label(0, 0), "Page 1 of 1");
    }
}
