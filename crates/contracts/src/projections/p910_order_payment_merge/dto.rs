use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enums::StatusSource;

/// Блок удержаний и начислений из файла выплат.
///
/// Flattened into [`MergedOrderRecordDto`] on the wire, so the JSON keeps the
/// flat `fixedFee`, `tcs`, ... layout the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettlementCharges {
    pub fixed_fee: Option<f64>,
    pub warehousing_fee: Option<f64>,
    pub return_premium: Option<f64>,
    pub meesho_commission_percentage: Option<f64>,
    pub meesho_commission: Option<f64>,
    pub meesho_gold_platform_fee: Option<f64>,
    pub meesho_mall_platform_fee: Option<f64>,
    pub return_shipping_charge: Option<f64>,
    pub gst_compensation: Option<f64>,
    pub shipping_charge: Option<f64>,
    pub other_support_service_charges: Option<f64>,
    pub waivers: Option<f64>,
    pub net_other_support_service_charges: Option<f64>,
    pub gst_on_net_other_support_service_charges: Option<f64>,
    pub tcs: Option<f64>,
    pub tds_rate_percentage: Option<f64>,
    pub tds: Option<f64>,
    pub compensation: Option<f64>,
    pub compensation_reason: Option<String>,
    pub claims: Option<f64>,
    pub claims_reason: Option<String>,
    pub recovery: Option<f64>,
    pub recovery_reason: Option<String>,
    pub product_gst_percentage: Option<f64>,
    pub listing_price_incl_taxes: Option<f64>,
}

/// Merged-запись: строка заказа, опционально склеенная с выплатой
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedOrderRecordDto {
    pub order_id: String,

    // Order file
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub selling_price: Option<f64>,
    #[serde(default)]
    pub order_date_time: Option<String>,
    #[serde(default)]
    pub customer_state: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub supplier_listed_price: Option<f64>,
    #[serde(default)]
    pub supplier_discounted_price: Option<f64>,
    #[serde(default)]
    pub packet_id: Option<String>,
    #[serde(default)]
    pub reason_for_credit_entry: Option<String>,

    // Payment file
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_date_time: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub final_settlement_amount: Option<f64>,
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub total_sale_amount: Option<f64>,
    #[serde(default)]
    pub total_sale_return_amount: Option<f64>,
    #[serde(default)]
    pub dispatch_date: Option<String>,
    #[serde(flatten)]
    pub charges: SettlementCharges,

    // Resolved
    #[serde(default)]
    pub final_status: Option<String>,
    #[serde(default)]
    pub status_source: Option<StatusSource>,
}

impl MergedOrderRecordDto {
    /// Дата заказа "YYYY-MM-DD", если известна
    pub fn order_date(&self) -> Option<&str> {
        self.order_date_time
            .as_deref()
            .map(|dt| dt.split(['T', ' ']).next().unwrap_or(dt))
            .filter(|d| !d.is_empty())
    }

    pub fn has_sku(&self) -> bool {
        self.sku.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Query для постраничного списка (`/merged-data/paginated`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedPageRequest {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

fn default_page_size() -> i64 {
    50
}

/// Ответ постраничного списка.
///
/// Эндпоинт по статусу отдаёт тот же конверт: одна страница со всеми совпадениями.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPageResponse {
    pub data: Vec<MergedOrderRecordDto>,
    pub total_records: u64,
    pub page_size: u64,
    #[serde(default)]
    pub current_page: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_previous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl MergedPageResponse {
    /// Envelope for an unpaged filtered set (status endpoint)
    pub fn single_page(data: Vec<MergedOrderRecordDto>, status: Option<String>) -> Self {
        let len = data.len() as u64;
        Self {
            data,
            total_records: len,
            page_size: len,
            current_page: 0,
            total_pages: 1,
            has_next: false,
            has_previous: false,
            status,
        }
    }
}

/// Тело ответа со списком merged-записей: конверт страницы или
/// просто массив (эндпоинт по источнику отдаёт массив).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergedDataPayload {
    Paged(MergedPageResponse),
    Plain(Vec<MergedOrderRecordDto>),
}

impl MergedDataPayload {
    /// Привести к конверту страницы; массив становится одной страницей
    pub fn into_page(self) -> MergedPageResponse {
        match self {
            MergedDataPayload::Paged(page) => page,
            MergedDataPayload::Plain(records) => MergedPageResponse::single_page(records, None),
        }
    }
}

/// Показатели качества данных
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataQuality {
    pub records_with_sku: u64,
    pub records_without_sku: u64,
    /// 0..=100, rounded
    pub sku_coverage_percentage: u32,
    pub records_with_product_name: u64,
    pub records_with_quantity: u64,
}

/// Статистика по merged-таблице
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeStatistics {
    pub total_merged_records: u64,
    pub status_source_breakdown: BTreeMap<String, u64>,
    pub final_status_breakdown: BTreeMap<String, u64>,
    pub unique_orders: u64,
    pub data_quality: DataQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Ответ на пересборку merged-таблицы
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildResponse {
    pub merged_records: u64,
    pub message: String,
}

/// Ответ на импорт CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: u64,
    pub skipped: u64,
    pub merged_records: u64,
}
