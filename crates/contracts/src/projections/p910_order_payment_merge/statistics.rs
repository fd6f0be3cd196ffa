use std::collections::{BTreeMap, HashSet};

use super::dto::{DataQuality, MergeStatistics, MergedOrderRecordDto};

/// Ключ для записей без статуса/источника
pub const UNKNOWN_KEY: &str = "UNKNOWN";

impl MergeStatistics {
    /// Build statistics over a full merged set.
    ///
    /// Records without a status or source are counted under [`UNKNOWN_KEY`],
    /// so every breakdown sums to `total_merged_records`.
    pub fn from_records(records: &[MergedOrderRecordDto]) -> Self {
        let total = records.len() as u64;

        let mut status_source_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut final_status_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut order_ids: HashSet<&str> = HashSet::new();

        let mut with_sku = 0u64;
        let mut with_product_name = 0u64;
        let mut with_quantity = 0u64;

        for record in records {
            let source = record
                .status_source
                .as_ref()
                .map(|s| s.code().to_string())
                .unwrap_or_else(|| UNKNOWN_KEY.to_string());
            *status_source_breakdown.entry(source).or_insert(0) += 1;

            let status = record
                .final_status
                .clone()
                .unwrap_or_else(|| UNKNOWN_KEY.to_string());
            *final_status_breakdown.entry(status).or_insert(0) += 1;

            order_ids.insert(record.order_id.as_str());

            if record.has_sku() {
                with_sku += 1;
            }
            if record.product_name.is_some() {
                with_product_name += 1;
            }
            if record.quantity.is_some() {
                with_quantity += 1;
            }
        }

        let without_sku = total - with_sku;
        let sku_coverage_percentage = if total == 0 {
            0
        } else {
            ((with_sku as f64 / total as f64) * 100.0).round() as u32
        };

        let warning = (without_sku > 0).then(|| {
            format!(
                "WARNING: {} records ({:.1}%) are missing SKU information. Consider re-uploading the complete order file.",
                without_sku,
                without_sku as f64 / total as f64 * 100.0
            )
        });

        Self {
            total_merged_records: total,
            status_source_breakdown,
            final_status_breakdown,
            unique_orders: order_ids.len() as u64,
            data_quality: DataQuality {
                records_with_sku: with_sku,
                records_without_sku: without_sku,
                sku_coverage_percentage,
                records_with_product_name: with_product_name,
                records_with_quantity: with_quantity,
            },
            warning,
        }
    }

    pub fn sku_fraction(&self) -> f64 {
        self.fraction(self.data_quality.records_with_sku)
    }

    pub fn quantity_fraction(&self) -> f64 {
        self.fraction(self.data_quality.records_with_quantity)
    }

    pub fn product_name_fraction(&self) -> f64 {
        self.fraction(self.data_quality.records_with_product_name)
    }

    fn fraction(&self, count: u64) -> f64 {
        if self.total_merged_records == 0 {
            0.0
        } else {
            count as f64 / self.total_merged_records as f64
        }
    }

    /// Число записей по коду источника (0, если нет)
    pub fn source_count(&self, code: &str) -> u64 {
        self.status_source_breakdown.get(code).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::StatusSource;

    fn record(order_id: &str, sku: Option<&str>, status: Option<&str>, source: Option<StatusSource>) -> MergedOrderRecordDto {
        MergedOrderRecordDto {
            order_id: order_id.to_string(),
            sku: sku.map(str::to_string),
            final_status: status.map(str::to_string),
            status_source: source,
            ..Default::default()
        }
    }

    #[test]
    fn test_breakdowns_sum_to_total() {
        let records = vec![
            record("1", Some("A"), Some("Delivered"), Some(StatusSource::PaymentFile)),
            record("1", Some("A"), Some("Return"), Some(StatusSource::PaymentFile)),
            record("2", None, Some("Shipped"), Some(StatusSource::OrderFile)),
            record("3", Some("C"), None, None),
        ];

        let stats = MergeStatistics::from_records(&records);

        assert_eq!(stats.total_merged_records, 4);
        assert_eq!(stats.unique_orders, 3);
        assert_eq!(stats.status_source_breakdown.values().sum::<u64>(), 4);
        assert_eq!(stats.final_status_breakdown.values().sum::<u64>(), 4);
        assert_eq!(stats.source_count("PAYMENT_FILE"), 2);
        assert_eq!(stats.source_count(UNKNOWN_KEY), 1);
        assert_eq!(stats.final_status_breakdown.get(UNKNOWN_KEY), Some(&1));
    }

    #[test]
    fn test_data_quality_and_warning() {
        let records = vec![
            record("1", Some("A"), Some("Delivered"), Some(StatusSource::PaymentFile)),
            record("2", None, Some("Delivered"), Some(StatusSource::PaymentFile)),
            record("3", Some(" "), Some("Delivered"), Some(StatusSource::PaymentFile)),
            record("4", Some("D"), Some("Delivered"), Some(StatusSource::PaymentFile)),
        ];

        let stats = MergeStatistics::from_records(&records);

        assert_eq!(stats.data_quality.records_with_sku, 2);
        assert_eq!(stats.data_quality.records_without_sku, 2);
        assert_eq!(stats.data_quality.sku_coverage_percentage, 50);
        assert_eq!(stats.sku_fraction(), 0.5);
        assert_eq!(
            stats.warning.as_deref(),
            Some("WARNING: 2 records (50.0%) are missing SKU information. Consider re-uploading the complete order file.")
        );
    }

    #[test]
    fn test_full_coverage_has_no_warning() {
        let records = vec![record("1", Some("A"), Some("Delivered"), Some(StatusSource::OrderFile))];
        let stats = MergeStatistics::from_records(&records);
        assert!(stats.warning.is_none());
        assert_eq!(stats.data_quality.sku_coverage_percentage, 100);
    }

    #[test]
    fn test_empty_set() {
        let stats = MergeStatistics::from_records(&[]);
        assert_eq!(stats, MergeStatistics::default());
        assert_eq!(stats.quantity_fraction(), 0.0);
    }
}
