use anyhow::Result;
use contracts::projections::p910_order_payment_merge::MergedOrderRecordDto;

pub const EXPORT_HEADERS: [&str; 16] = [
    "Order ID",
    "SKU",
    "Product Name",
    "Quantity",
    "Selling Price",
    "Customer State",
    "Size",
    "Final Status",
    "Status Source",
    "Amount",
    "Order Date",
    "Payment Date",
    "Dispatch Date",
    "Transaction ID",
    "Total Sale Amount",
    "Final Settlement Amount",
];

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_num<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Merged-записи в CSV (с заголовком)
pub fn to_csv(records: &[MergedOrderRecordDto]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for r in records {
        writer.write_record([
            r.order_id.clone(),
            opt_text(&r.sku),
            opt_text(&r.product_name),
            opt_num(r.quantity),
            opt_num(r.selling_price),
            opt_text(&r.customer_state),
            opt_text(&r.size),
            opt_text(&r.final_status),
            r.status_source.as_ref().map(|s| s.code().to_string()).unwrap_or_default(),
            opt_num(r.amount),
            opt_text(&r.order_date_time),
            opt_text(&r.payment_date_time),
            opt_text(&r.dispatch_date),
            opt_text(&r.transaction_id),
            opt_num(r.total_sale_amount),
            opt_num(r.final_settlement_amount),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

/// Имя файла выгрузки на дату
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("merged-data-{}.csv", date.format("%Y-%m-%d"))
}
