use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use contracts::projections::p910_order_payment_merge::paging::search_term;
use contracts::projections::p910_order_payment_merge::{
    ImportResponse, MergeStatistics, MergedOrderRecordDto, MergedPageResponse, RebuildResponse,
};
use contracts::shared::period::{Aggregation, ChartResponse, TimeSeriesPoint};
use tokio::sync::Mutex;

use super::{csv_export, csv_import, merge_builder, repository};
use crate::domain::{a030_order_line, a031_settlement_payment};
use crate::shared::logger;

// Чтение входов, merge и замена таблицы выполняются под одним замком
static REBUILD_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Пересобрать merged-таблицу из текущих заказов и выплат
pub async fn rebuild() -> Result<RebuildResponse> {
    let _rebuild = REBUILD_LOCK.lock().await;

    let orders = a030_order_line::repository::list_all().await?;
    let payments = a031_settlement_payment::repository::list_all().await?;
    tracing::info!(
        "Rebuilding merged table from {} orders and {} payments",
        orders.len(),
        payments.len()
    );

    let records = merge_builder::merge(&orders, &payments);
    let merged_records = repository::replace_all(&records).await?;

    let message = format!("Rebuilt merged table with {} records", merged_records);
    tracing::info!("{}", message);
    logger::log("p910", &message);

    Ok(RebuildResponse {
        merged_records,
        message,
    })
}

/// `None` when `size` is not positive
pub async fn get_page(page: i64, size: i64, q: Option<&str>) -> Result<Option<MergedPageResponse>> {
    let search = search_term(q);
    let Some((data, total, window)) = repository::list_page(page, size, search.as_deref()).await?
    else {
        return Ok(None);
    };
    Ok(Some(window.into_response(data, total)))
}

/// Все записи со статусом `status`, одной страницей
pub async fn by_status(status: &str) -> Result<MergedPageResponse> {
    let data = repository::list_by_status(status).await?;
    Ok(MergedPageResponse::single_page(
        data,
        Some(status.trim().to_string()),
    ))
}

pub async fn by_source(source: &str) -> Result<Vec<MergedOrderRecordDto>> {
    repository::list_by_source(source).await
}

pub async fn list_all() -> Result<Vec<MergedOrderRecordDto>> {
    repository::list_all().await
}

pub async fn statistics() -> Result<MergeStatistics> {
    let records = repository::list_all().await?;
    Ok(MergeStatistics::from_records(&records))
}

/// Количество заказов по периодам в [start, end]
pub async fn orders_by_time(start: NaiveDate, end: NaiveDate, agg: Aggregation) -> Result<ChartResponse> {
    let date_from = start.format("%Y-%m-%d").to_string();
    let date_to = end.format("%Y-%m-%d").to_string();
    let records = repository::list_by_order_date_range(&date_from, &date_to).await?;

    Ok(ChartResponse {
        points: bucket_orders(&records, start, end, agg),
    })
}

/// Count records per bucket start; records outside [start, end] or without
/// a parseable order date are ignored
pub fn bucket_orders(
    records: &[MergedOrderRecordDto],
    start: NaiveDate,
    end: NaiveDate,
    agg: Aggregation,
) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        let Some(date) = record
            .order_date()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        *buckets.entry(agg.bucket_start(date)).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|(period, count)| TimeSeriesPoint {
            period: period.format("%Y-%m-%d").to_string(),
            value: count as f64,
        })
        .collect()
}

/// Выгрузка всех merged-записей в CSV
pub async fn export_csv() -> Result<String> {
    let records = repository::list_all().await?;
    csv_export::to_csv(&records)
}

/// Импорт файла заказов и пересборка
pub async fn import_orders(body: &str) -> Result<ImportResponse> {
    let parsed = csv_import::parse_orders_csv(body)?;
    let skipped = parsed.skipped;
    let imported = a030_order_line::repository::upsert_entries(parsed.rows).await?;
    tracing::info!("Imported {} order rows ({} skipped)", imported, skipped);

    let rebuilt = rebuild().await?;
    Ok(ImportResponse {
        imported,
        skipped,
        merged_records: rebuilt.merged_records,
    })
}

/// Импорт файла выплат и пересборка
pub async fn import_payments(body: &str) -> Result<ImportResponse> {
    let parsed = csv_import::parse_payments_csv(body)?;
    let skipped = parsed.skipped;
    let imported = a031_settlement_payment::repository::upsert_entries(parsed.rows).await?;
    tracing::info!("Imported {} payment rows ({} skipped)", imported, skipped);

    let rebuilt = rebuild().await?;
    Ok(ImportResponse {
        imported,
        skipped,
        merged_records: rebuilt.merged_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::test_support::lock_empty_database;

    const SHARED_TRANSFER: &str = "Sub Order No,Transaction ID,Live Order Status,Payment Date,Final Settlement Amount
A_1,UTR123,Delivered,2024-03-25,100
B_1,UTR123,Delivered,2024-03-25,200
C_1,UTR123,Delivered,2024-03-25,300
";

    #[tokio::test]
    async fn test_shared_transaction_id_keeps_every_order() {
        let _db = lock_empty_database().await;

        let response = import_payments(SHARED_TRANSFER).await.unwrap();

        assert_eq!(response.imported, 3);
        assert_eq!(response.merged_records, 3);
        let rows: Vec<(String, Option<f64>)> = list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.order_id, r.amount))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("A_1".to_string(), Some(100.0)),
                ("B_1".to_string(), Some(200.0)),
                ("C_1".to_string(), Some(300.0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_reimport_counts_distinct_rows() {
        let _db = lock_empty_database().await;
        let csv = "Sub Order No,Transaction ID,Payment Date,Final Settlement Amount
A_1,,2024-03-25,100
A_1,,2024-03-26,-20
A_1,,2024-03-26,-20
";
        // одинаковые строки без Transaction ID различаются номером строки
        let first = import_payments(csv).await.unwrap();
        assert_eq!(first.imported, 3);

        let again = import_payments(csv).await.unwrap();
        assert_eq!(again.merged_records, 3);
        assert_eq!(list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_imports_leave_a_complete_table() {
        let _db = lock_empty_database().await;
        let orders = "Sub Order No,SKU,Reason for Credit Entry
A_1,SKU-A,SHIPPED
D_1,SKU-D,SHIPPED
";

        let (orders_result, payments_result) =
            tokio::join!(import_orders(orders), import_payments(SHARED_TRANSFER));
        orders_result.unwrap();
        payments_result.unwrap();

        let records = list_all().await.unwrap();
        let order_ids: Vec<&str> = records.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(order_ids, vec!["A_1", "B_1", "C_1", "D_1"]);
        let joined = &records[0];
        assert_eq!(joined.sku.as_deref(), Some("SKU-A"));
        assert_eq!(joined.final_status.as_deref(), Some("Delivered"));
    }

    fn record(order_id: &str, date: Option<&str>) -> MergedOrderRecordDto {
        MergedOrderRecordDto {
            order_id: order_id.to_string(),
            order_date_time: date.map(str::to_string),
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_bucket_orders_by_month() {
        let records = vec![
            record("1", Some("2024-01-05T10:00:00")),
            record("2", Some("2024-01-31T23:59:59")),
            record("3", Some("2024-02-01T00:00:00")),
            record("4", None),
            record("5", Some("2023-12-31T12:00:00")),
        ];

        let points = bucket_orders(&records, date("2024-01-01"), date("2024-12-31"), Aggregation::Month);

        assert_eq!(
            points,
            vec![
                TimeSeriesPoint { period: "2024-01-01".to_string(), value: 2.0 },
                TimeSeriesPoint { period: "2024-02-01".to_string(), value: 1.0 },
            ]
        );
    }

    #[test]
    fn test_bucket_orders_by_day_is_ascending() {
        let records = vec![
            record("1", Some("2024-03-02 08:00:00")),
            record("2", Some("2024-03-01T08:00:00")),
            record("3", Some("2024-03-02T09:00:00")),
        ];

        let points = bucket_orders(&records, date("2024-03-01"), date("2024-03-02"), Aggregation::Day);

        let periods: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-03-01", "2024-03-02"]);
        assert_eq!(points[1].value, 2.0);
    }

    #[test]
    fn test_bucket_orders_empty() {
        assert!(bucket_orders(&[], date("2024-01-01"), date("2024-01-31"), Aggregation::Year).is_empty());
    }
}
