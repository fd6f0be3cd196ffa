use super::dto::{MergedOrderRecordDto, MergedPageResponse};

/// Окно страницы после нормализации page/size.
///
/// Отрицательная страница превращается в 0, страница за концом в последнюю,
/// поэтому непустой результат всегда даёт непустую страницу.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub size: u64,
    pub offset: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// `size` must be positive; returns `None` otherwise
    pub fn resolve(page: i64, size: i64, total_records: u64) -> Option<Self> {
        if size <= 0 {
            return None;
        }
        let size = size as u64;
        let total_pages = total_records.div_ceil(size);

        let mut page = page.max(0) as u64;
        if total_pages > 0 && page >= total_pages {
            page = total_pages - 1;
        }

        Some(Self {
            page,
            size,
            offset: page * size,
            total_pages,
        })
    }

    pub fn has_next(&self) -> bool {
        self.total_pages > 0 && self.page < self.total_pages - 1
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn into_response(self, data: Vec<MergedOrderRecordDto>, total_records: u64) -> MergedPageResponse {
        MergedPageResponse {
            data,
            total_records,
            page_size: self.size,
            current_page: self.page,
            total_pages: self.total_pages,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            status: None,
        }
    }
}

/// Normalised search term: trimmed and lower-cased, `None` when blank
pub fn search_term(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}
