//! Query client for the order/payment merge endpoints.
//!
//! Read calls never fail towards the view: every failure is typed as a
//! [`FetchError`], reported to the diagnostic channel and replaced by an
//! empty result.

use chrono::NaiveDate;
use contracts::projections::p910_order_payment_merge::{
    ImportResponse, MergeStatistics, MergedDataPayload, MergedOrderRecordDto, MergedPageRequest,
    RebuildResponse,
};
use contracts::shared::period::{Aggregation, ChartResponse, TimeSeriesRequest};
use gloo_net::http::Request;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::shared::api_utils::api_url;
use crate::shared::diagnostics::DiagnosticSink;
use crate::shared::request::{ApiRequest, DecoratorChain};
use crate::system::session::Session;

pub const DIAGNOSTIC_CATEGORY: &str = "p910";

const MERGE_API: &str = "/api/data-merge";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Ответ транспорта до разбора тела
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[allow(async_fn_in_trait)]
pub trait MergeTransport {
    async fn get(&self, request: &ApiRequest) -> Result<TransportResponse, FetchError>;
}

/// Browser transport over gloo-net
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

impl MergeTransport for GlooTransport {
    async fn get(&self, request: &ApiRequest) -> Result<TransportResponse, FetchError> {
        let mut builder = Request::get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

/// Что именно запрашиваем у сервера
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeQuery {
    Page {
        page: u64,
        size: u64,
        search: Option<String>,
    },
    /// Full set with this status; paging is bypassed
    Status(String),
    /// Full set with this source; paging is bypassed
    Source(String),
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl MergeQuery {
    /// A status filter wins over a source filter; either one bypasses paging
    pub fn from_filters(
        page: u64,
        page_size: u64,
        search: Option<&str>,
        status: Option<&str>,
        source: Option<&str>,
    ) -> Self {
        if let Some(status) = non_blank(status) {
            return MergeQuery::Status(status);
        }
        if let Some(source) = non_blank(source) {
            return MergeQuery::Source(source);
        }
        MergeQuery::Page {
            page,
            size: page_size.max(1),
            search: non_blank(search),
        }
    }

    pub fn bypasses_paging(&self) -> bool {
        !matches!(self, MergeQuery::Page { .. })
    }

    pub fn path(&self) -> Result<String, FetchError> {
        let path = match self {
            MergeQuery::Page { page, size, search } => {
                let query = MergedPageRequest {
                    page: to_wire_number("page", *page)?,
                    size: to_wire_number("size", *size)?,
                    q: search.clone(),
                };
                let qs = serde_qs::to_string(&query)
                    .map_err(|e| FetchError::Malformed(format!("query encoding: {}", e)))?;
                format!("{}/merged-data/paginated?{}", MERGE_API, qs)
            }
            MergeQuery::Status(status) => format!(
                "{}/merged-data/status/{}",
                MERGE_API,
                urlencoding::encode(status)
            ),
            MergeQuery::Source(source) => format!(
                "{}/merged-data/source/{}",
                MERGE_API,
                urlencoding::encode(source)
            ),
        };
        Ok(path)
    }
}

fn to_wire_number(name: &str, value: u64) -> Result<i64, FetchError> {
    i64::try_from(value).map_err(|_| FetchError::Malformed(format!("{} {} is out of range", name, value)))
}

/// Страница для отображения; всегда `records.len() <= page_size`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedPage {
    pub records: Vec<MergedOrderRecordDto>,
    pub total_records: u64,
    pub page_size: u64,
    /// Страница, которую фактически вернул сервер (после клампинга)
    pub current_page: u64,
}

impl MergedPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct MergeQueryClient<T, D> {
    base_url: String,
    transport: T,
    session: Session,
    decorators: DecoratorChain,
    diagnostics: D,
}

impl<T: MergeTransport, D: DiagnosticSink> MergeQueryClient<T, D> {
    pub fn new(base_url: impl Into<String>, transport: T, session: Session, diagnostics: D) -> Self {
        let decorators = DecoratorChain::standard(&session);
        Self {
            base_url: base_url.into(),
            transport,
            session,
            decorators,
            diagnostics,
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, FetchError> {
        let request = self
            .decorators
            .apply(ApiRequest::get(format!("{}{}", self.base_url, path)));
        let response = self.transport.get(&request).await?;

        if response.status == 401 {
            self.session.clear();
        }
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status(response.status));
        }

        serde_json::from_str(&response.body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    fn degrade(&self, operation: &str, error: &FetchError) {
        self.diagnostics.report(
            DIAGNOSTIC_CATEGORY,
            &format!("{} degraded to empty result: {}", operation, error),
        );
    }

    pub async fn try_fetch_page(&self, query: &MergeQuery) -> Result<MergedPage, FetchError> {
        let payload: MergedDataPayload = self.get_json(&query.path()?).await?;
        let page = payload.into_page();
        let mut records = page.data;

        let page_size = match query {
            MergeQuery::Page { size, .. } => {
                if records.len() as u64 > *size {
                    self.diagnostics.report(
                        DIAGNOSTIC_CATEGORY,
                        &format!(
                            "fetch_page: server returned {} records for page size {}, extra records dropped",
                            records.len(),
                            size
                        ),
                    );
                    records.truncate(*size as usize);
                }
                *size
            }
            _ => records.len() as u64,
        };

        Ok(MergedPage {
            records,
            total_records: page.total_records,
            page_size,
            current_page: page.current_page,
        })
    }

    pub async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
        search: Option<&str>,
        status: Option<&str>,
        source: Option<&str>,
    ) -> MergedPage {
        let query = MergeQuery::from_filters(page, page_size, search, status, source);
        match self.try_fetch_page(&query).await {
            Ok(page) => page,
            Err(e) => {
                self.degrade("fetch_page", &e);
                MergedPage::empty()
            }
        }
    }

    pub async fn fetch_statistics(&self) -> MergeStatistics {
        match self
            .get_json::<MergeStatistics>(&format!("{}/statistics", MERGE_API))
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                self.degrade("fetch_statistics", &e);
                MergeStatistics::default()
            }
        }
    }

    pub async fn fetch_orders_by_time(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        agg: Aggregation,
    ) -> ChartResponse {
        let request = TimeSeriesRequest {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
            agg,
        };
        let result = match serde_qs::to_string(&request) {
            Ok(qs) => {
                self.get_json::<ChartResponse>(&format!("{}/orders-by-time?{}", MERGE_API, qs))
                    .await
            }
            Err(e) => Err(FetchError::Malformed(format!("query encoding: {}", e))),
        };

        match result {
            Ok(chart) => chart,
            Err(e) => {
                self.degrade("fetch_orders_by_time", &e);
                ChartResponse::default()
            }
        }
    }
}

// Mutating calls surface their errors inline

async fn post_text<R: DeserializeOwned>(session: &Session, path: &str, body: String) -> Result<R, String> {
    let request = DecoratorChain::standard(session).apply(ApiRequest::get(api_url(path)));
    let mut builder = Request::post(&request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }

    let response = builder
        .header("Content-Type", "text/csv")
        .body(body)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Failed to send request: {}", e))?;

    if response.status() == 401 {
        session.clear();
    }
    if !response.ok() {
        let text = response.text().await.unwrap_or_default();
        return Err(format!("Server error {}: {}", response.status(), text));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

/// Загрузить CSV файла заказов
pub async fn import_orders(session: &Session, csv: String) -> Result<ImportResponse, String> {
    post_text(session, &format!("{}/import/orders", MERGE_API), csv).await
}

/// Загрузить CSV файла выплат
pub async fn import_payments(session: &Session, csv: String) -> Result<ImportResponse, String> {
    post_text(session, &format!("{}/import/payments", MERGE_API), csv).await
}

pub async fn rebuild(session: &Session) -> Result<RebuildResponse, String> {
    post_text(session, &format!("{}/rebuild", MERGE_API), String::new()).await
}

pub fn export_url() -> String {
    api_url(&format!("{}/merged-data/export", MERGE_API))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::enums::StatusSource;
    use futures::executor::block_on;
    use std::cell::RefCell;

    struct FakeTransport {
        response: Result<TransportResponse, FetchError>,
        requests: RefCell<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                response: Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn offline() -> Self {
            Self {
                response: Err(FetchError::Network("connection refused".to_string())),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl MergeTransport for &FakeTransport {
        async fn get(&self, request: &ApiRequest) -> Result<TransportResponse, FetchError> {
            self.requests.borrow_mut().push(request.clone());
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: RefCell<Vec<String>>,
    }

    impl DiagnosticSink for &RecordingSink {
        fn report(&self, category: &str, message: &str) {
            self.messages
                .borrow_mut()
                .push(format!("{}: {}", category, message));
        }
    }

    fn client<'a>(
        transport: &'a FakeTransport,
        sink: &'a RecordingSink,
        session: Session,
    ) -> MergeQueryClient<&'a FakeTransport, &'a RecordingSink> {
        MergeQueryClient::new("http://api", transport, session, sink)
    }

    fn page_body(n: usize, total: u64, size: u64) -> String {
        let data: Vec<MergedOrderRecordDto> = (0..n)
            .map(|i| MergedOrderRecordDto {
                order_id: format!("ORD-{}", i),
                final_status: Some("Delivered".to_string()),
                status_source: Some(StatusSource::PaymentFile),
                ..Default::default()
            })
            .collect();
        serde_json::json!({ "data": data, "totalRecords": total, "pageSize": size }).to_string()
    }

    #[test]
    fn test_fetch_first_page() {
        let transport = FakeTransport::ok(200, &page_body(50, 120, 50));
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(0, 50, None, None, None));

        assert_eq!(page.records.len(), 50);
        assert_eq!(page.total_records, 120);
        assert_eq!(page.page_size, 50);

        let requests = transport.requests.borrow();
        assert_eq!(
            requests[0].url,
            "http://api/api/data-merge/merged-data/paginated?page=0&size=50"
        );
        assert_eq!(requests[0].header("Accept"), Some("application/json"));
        assert!(sink.messages.borrow().is_empty());
    }

    #[test]
    fn test_oversized_page_is_truncated_to_requested_size() {
        let transport = FakeTransport::ok(200, &page_body(60, 120, 60));
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(0, 50, None, None, None));

        assert_eq!(page.page_size, 50);
        assert_eq!(page.records.len(), 50);
        assert_eq!(page.records[49].order_id, "ORD-49");
        assert_eq!(sink.messages.borrow().len(), 1);
    }

    #[test]
    fn test_server_clamped_page_is_reported() {
        let body = serde_json::json!({
            "data": [{ "orderId": "ORD-1" }],
            "totalRecords": 51,
            "pageSize": 50,
            "currentPage": 1
        })
        .to_string();
        let transport = FakeTransport::ok(200, &body);
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(7, 50, None, None, None));

        assert_eq!(page.current_page, 1);
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_page_out_of_wire_range_is_rejected() {
        let query = MergeQuery::from_filters(u64::MAX, 50, None, None, None);
        assert!(matches!(query.path(), Err(FetchError::Malformed(_))));

        let query = MergeQuery::from_filters(0, i64::MAX as u64 + 1, None, None, None);
        assert!(matches!(query.path(), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_search_term_is_encoded() {
        let query = MergeQuery::from_filters(1, 20, Some(" rto complete "), None, Some(""));
        assert_eq!(
            query.path().unwrap(),
            "/api/data-merge/merged-data/paginated?page=1&size=20&q=rto+complete"
        );
    }

    #[test]
    fn test_status_filter_bypasses_paging() {
        let transport = FakeTransport::ok(200, &page_body(7, 7, 7));
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(3, 50, Some("x"), Some("RTO Complete"), Some("ORDER_FILE")));

        assert_eq!(page.records.len(), 7);
        assert_eq!(page.page_size, 7);
        assert_eq!(
            transport.requests.borrow()[0].url,
            "http://api/api/data-merge/merged-data/status/RTO%20Complete"
        );
    }

    #[test]
    fn test_source_filter_accepts_plain_array() {
        let transport = FakeTransport::ok(200, r#"[{"orderId":"1"},{"orderId":"2"},{"orderId":"3"}]"#);
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(0, 2, None, None, Some("PAYMENT_FILE")));

        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_records, 3);
        assert!(page.records.len() as u64 <= page.page_size);
        assert!(transport.requests.borrow()[0].url.ends_with("/merged-data/source/PAYMENT_FILE"));
    }

    #[test]
    fn test_network_failure_degrades_to_empty() {
        let transport = FakeTransport::offline();
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let page = block_on(client.fetch_page(0, 50, None, None, None));
        let stats = block_on(client.fetch_statistics());

        assert_eq!(page, MergedPage::empty());
        assert_eq!(stats, MergeStatistics::default());
        let messages = sink.messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("p910: fetch_page degraded"));
    }

    #[test]
    fn test_server_error_and_malformed_body_degrade() {
        for transport in [FakeTransport::ok(500, "oops"), FakeTransport::ok(200, "<html>")] {
            let sink = RecordingSink::default();
            let client = client(&transport, &sink, Session::in_memory(None));

            let stats = block_on(client.fetch_statistics());

            assert_eq!(stats.total_merged_records, 0);
            assert!(stats.warning.is_none());
            assert_eq!(sink.messages.borrow().len(), 1);
        }
    }

    #[test]
    fn test_typed_errors() {
        let transport = FakeTransport::ok(503, "");
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));
        let query = MergeQuery::from_filters(0, 10, None, None, None);

        assert_eq!(block_on(client.try_fetch_page(&query)), Err(FetchError::Status(503)));

        let transport = FakeTransport::ok(200, "{\"data\": 5}");
        let client = MergeQueryClient::new("", &transport, Session::in_memory(None), &sink);
        assert!(matches!(block_on(client.try_fetch_page(&query)), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let transport = FakeTransport::ok(401, "");
        let sink = RecordingSink::default();
        let session = Session::in_memory(Some("expired".to_string()));
        let client = client(&transport, &sink, session.clone());

        let page = block_on(client.fetch_page(0, 50, None, None, None));

        assert!(page.is_empty());
        assert_eq!(
            transport.requests.borrow()[0].header("Authorization"),
            Some("Bearer expired")
        );
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_statistics_parsed() {
        let body = r#"{"totalMergedRecords":4,"statusSourceBreakdown":{"PAYMENT_FILE":3,"UNKNOWN":1},
            "finalStatusBreakdown":{"Delivered":3,"UNKNOWN":1},"uniqueOrders":3,
            "dataQuality":{"recordsWithSku":3,"recordsWithoutSku":1,"skuCoveragePercentage":75,
            "recordsWithProductName":4,"recordsWithQuantity":4},
            "warning":"WARNING: 1 records (25.0%) are missing SKU information. Consider re-uploading the complete order file."}"#;
        let transport = FakeTransport::ok(200, body);
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));

        let stats = block_on(client.fetch_statistics());

        assert_eq!(stats.total_merged_records, 4);
        assert_eq!(stats.source_count("PAYMENT_FILE"), 3);
        assert_eq!(stats.sku_fraction(), 0.75);
        assert!(stats.warning.is_some());
    }

    #[test]
    fn test_orders_by_time_query() {
        let transport = FakeTransport::ok(200, r#"{"points":[{"period":"2024-01-01","value":12.0}]}"#);
        let sink = RecordingSink::default();
        let client = client(&transport, &sink, Session::in_memory(None));
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        let chart = block_on(client.fetch_orders_by_time(start, end, Aggregation::Month));

        assert_eq!(chart.points.len(), 1);
        assert_eq!(
            transport.requests.borrow()[0].url,
            "http://api/api/data-merge/orders-by-time?start=2024-01-01&end=2024-03-31&agg=MONTH"
        );
    }
}
