use chrono::{NaiveDate, NaiveDateTime};
use contracts::projections::p910_order_payment_merge::SettlementCharges;
use csv::StringRecord;
use thiserror::Error;

use crate::domain::a030_order_line::repository::OrderLineEntry;
use crate::domain::a031_settlement_payment::repository::PaymentEntry;

const ORDER_ID: &[&str] = &["Sub Order No", "Order Id", "Order ID", "Sub Order"];
const SKU: &[&str] = &["SKU", "Supplier SKU", "Product SKU"];
const QUANTITY: &[&str] = &["Quantity", "Qty"];
const SELLING_PRICE: &[&str] = &[
    "Supplier Discounted Price (Incl GST and Commision)",
    "Supplier Discounted Price (Incl GST and Commission)",
    "Supplier Listed Price (Incl. GST + Commission)",
    "Listing Price",
    "Unit Price",
    "Price",
];
const ORDER_DATE: &[&str] = &["Order Date", "Date", "OrderDate"];
const PRODUCT_NAME: &[&str] = &["Product Name", "Product"];
const CUSTOMER_STATE: &[&str] = &["Customer State", "State"];
const SUPPLIER_LISTED_PRICE: &[&str] = &["Supplier Listed Price (Incl. GST + Commission)"];
const SUPPLIER_DISCOUNTED_PRICE: &[&str] = &[
    "Supplier Discounted Price (Incl GST and Commision)",
    "Supplier Discounted Price (Incl GST and Commission)",
];
const PACKET_ID: &[&str] = &["Packet Id", "Packet ID"];
const REASON_FOR_CREDIT_ENTRY: &[&str] = &["Reason for Credit Entry", "Credit Entry Reason"];

const PAYMENT_ID: &[&str] = &["Transaction ID", "Payment Id", "Payment ID", "Transaction"];
const AMOUNT: &[&str] = &["Final Settlement Amount", "Net Settlement Amount", "Amount"];
const FINAL_SETTLEMENT_AMOUNT: &[&str] = &["Final Settlement Amount", "Net Settlement Amount"];
const PAYMENT_DATE: &[&str] = &["Payment Date", "Settlement Date", "Date"];
const PAYMENT_STATUS: &[&str] = &["Live Order Status", "Order Status", "Status"];
const TRANSACTION_ID: &[&str] = &["Transaction ID", "Transaction Id"];

/// Header rows may sit below a title block
const HEADER_SCAN_ROWS: usize = 15;

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV is empty")]
    Empty,

    #[error("no header row with an order id column ({0}) in the first 15 rows")]
    MissingOrderIdColumn(String),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),
}

/// Разобранный файл: строки и число пропущенных
#[derive(Debug)]
pub struct ParsedCsv<T> {
    pub rows: Vec<T>,
    pub skipped: u64,
}

/// Таблица с найденной строкой заголовков
struct Sheet {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Sheet {
    fn read(text: &str) -> Result<Self, CsvImportError> {
        // Strip UTF-8 BOM if present
        let text = text.trim_start_matches('\u{FEFF}');

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = Vec::new();
        for result in reader.records() {
            records.push(result?);
        }
        if records.is_empty() {
            return Err(CsvImportError::Empty);
        }

        let header_idx = records
            .iter()
            .take(HEADER_SCAN_ROWS)
            .position(|r| r.iter().any(|cell| is_alias(cell, ORDER_ID)))
            .ok_or_else(|| CsvImportError::MissingOrderIdColumn(ORDER_ID.join(" | ")))?;

        let headers = records[header_idx]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = records.split_off(header_idx + 1);

        Ok(Self { headers, rows })
    }

    /// First alias present in the header row wins
    fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h.eq_ignore_ascii_case(alias)))
    }
}

fn is_alias(cell: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| a.eq_ignore_ascii_case(cell.trim()))
}

/// Доступ к ячейкам строки по имени колонки
struct Row<'a> {
    sheet: &'a Sheet,
    record: &'a StringRecord,
}

impl Row<'_> {
    /// Trimmed cell value, `None` if the column is absent or the cell is blank
    fn text(&self, aliases: &[&str]) -> Option<String> {
        self.sheet
            .column(aliases)
            .and_then(|i| self.record.get(i))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn number(&self, aliases: &[&str]) -> Option<f64> {
        self.text(aliases).and_then(|v| parse_number(&v))
    }

    fn date_time(&self, aliases: &[&str]) -> Option<NaiveDateTime> {
        self.text(aliases).and_then(|v| parse_date_time(&v))
    }

    fn is_blank(&self) -> bool {
        self.record.iter().all(|cell| cell.trim().is_empty())
    }
}

/// Разобрать файл заказов
pub fn parse_orders_csv(text: &str) -> Result<ParsedCsv<OrderLineEntry>, CsvImportError> {
    let sheet = Sheet::read(text)?;
    tracing::info!("Order CSV headers: {:?}", sheet.headers);

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for (idx, record) in sheet.rows.iter().enumerate() {
        let row = Row { sheet: &sheet, record };
        if row.is_blank() {
            continue;
        }
        let Some(order_id) = row.text(ORDER_ID) else {
            tracing::warn!("Order CSV row {}: no order id, skipped", idx + 1);
            skipped += 1;
            continue;
        };

        let sku = row.text(SKU);
        if sku.is_none() {
            tracing::warn!("Order CSV row {} ({}): missing SKU", idx + 1, order_id);
        }

        rows.push(OrderLineEntry {
            order_id,
            sku,
            quantity: row.number(QUANTITY).map(|q| q as i32),
            selling_price: row.number(SELLING_PRICE),
            order_date_time: row.date_time(ORDER_DATE),
            product_name: row.text(PRODUCT_NAME),
            customer_state: row.text(CUSTOMER_STATE),
            size: row.text(&["Size"]),
            supplier_listed_price: row.number(SUPPLIER_LISTED_PRICE),
            supplier_discounted_price: row.number(SUPPLIER_DISCOUNTED_PRICE),
            packet_id: row.text(PACKET_ID),
            reason_for_credit_entry: row.text(REASON_FOR_CREDIT_ENTRY),
        });
    }

    tracing::info!("Order CSV parsed: {} rows, {} skipped", rows.len(), skipped);
    Ok(ParsedCsv { rows, skipped })
}

/// Разобрать файл выплат
pub fn parse_payments_csv(text: &str) -> Result<ParsedCsv<PaymentEntry>, CsvImportError> {
    let sheet = Sheet::read(text)?;
    tracing::info!("Payment CSV headers: {:?}", sheet.headers);

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for (idx, record) in sheet.rows.iter().enumerate() {
        let row = Row { sheet: &sheet, record };
        if row.is_blank() {
            continue;
        }
        let Some(order_id) = row.text(ORDER_ID) else {
            tracing::warn!("Payment CSV row {}: no order id, skipped", idx + 1);
            skipped += 1;
            continue;
        };

        let amount = row.number(AMOUNT);
        let payment_date_time = row.date_time(PAYMENT_DATE);
        if amount.is_none() && payment_date_time.is_none() {
            tracing::debug!("Payment CSV row {}: blank amount and date, skipped", idx + 1);
            skipped += 1;
            continue;
        }

        // без Transaction ID строка идентифицируется своим номером в файле
        let payment_id = row
            .text(PAYMENT_ID)
            .unwrap_or_else(|| format!("{}:{}", order_id, idx + 1));

        rows.push(PaymentEntry {
            payment_id,
            order_id,
            amount,
            final_settlement_amount: row.number(FINAL_SETTLEMENT_AMOUNT),
            payment_date_time,
            order_date_time: row.date_time(ORDER_DATE),
            order_status: row.text(PAYMENT_STATUS),
            transaction_id: row.text(TRANSACTION_ID),
            price_type: row.text(&["Price Type"]),
            total_sale_amount: row.number(&["Total Sale Amount (Incl. Shipping & GST)"]),
            total_sale_return_amount: row
                .number(&["Total Sale Return Amount (Incl. Shipping & GST)"]),
            dispatch_date: row.date_time(&["Dispatch Date"]).map(|dt| dt.date()),
            charges: parse_charges(&row),
        });
    }

    tracing::info!("Payment CSV parsed: {} rows, {} skipped", rows.len(), skipped);
    Ok(ParsedCsv { rows, skipped })
}

fn parse_charges(row: &Row<'_>) -> SettlementCharges {
    SettlementCharges {
        fixed_fee: row.number(&["Fixed Fee (Incl. GST)"]),
        warehousing_fee: row.number(&["Warehousing fee (Incl. GST)"]),
        return_premium: row.number(&[
            "Return premium (Incl. GST)",
            "Return premium (Incl. GST) of Return",
        ]),
        meesho_commission_percentage: row.number(&["Meesho Commission Percentage"]),
        meesho_commission: row.number(&["Meesho Commission (Incl. GST)"]),
        meesho_gold_platform_fee: row.number(&["Meesho gold platform fee (Incl. GST)"]),
        meesho_mall_platform_fee: row.number(&["Meesho mall platform fee (Incl. GST)"]),
        return_shipping_charge: row.number(&["Return Shipping Charge (Incl. GST)"]),
        gst_compensation: row.number(&["GST Compensation (PRP Shipping)"]),
        shipping_charge: row.number(&["Shipping Charge (Incl. GST)"]),
        other_support_service_charges: row.number(&["Other Support Service Charges (Excl. GST)"]),
        waivers: row.number(&["Waivers (Excl. GST)"]),
        net_other_support_service_charges: row
            .number(&["Net Other Support Service Charges (Excl. GST)"]),
        gst_on_net_other_support_service_charges: row
            .number(&["GST on Net Other Support Service Charges"]),
        tcs: row.number(&["TCS"]),
        tds_rate_percentage: row.number(&["TDS Rate %"]),
        tds: row.number(&["TDS"]),
        compensation: row.number(&["Compensation"]),
        compensation_reason: row.text(&["Compensation Reason"]),
        claims: row.number(&["Claims"]),
        claims_reason: row.text(&["Claims Reason"]),
        recovery: row.number(&["Recovery"]),
        recovery_reason: row.text(&["Recovery Reason"]),
        product_gst_percentage: row.number(&["Product GST %"]),
        listing_price_incl_taxes: row.number(&["Listing Price (Incl. taxes)"]),
    }
}

/// Number with optional currency symbol and thousands separators
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Date or date-time; date-only values start at midnight
pub fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "\u{FEFF}Reason for Credit Entry,Sub Order No,Order Date,Customer State,Product Name,SKU,Size,Quantity,Supplier Listed Price (Incl. GST + Commission),Supplier Discounted Price (Incl GST and Commision),Packet Id
DELIVERED,101_1,2024-03-15,Kerala,Cotton Kurta,KRT-M,M,1,\"1,099.00\",899,PK1
RTO_COMPLETE,102_1,15/03/2024,Goa,Silk Saree,,Free,2,₹1500,1299,PK2
,,2024-03-16,Goa,Ghost,GH-1,M,1,10,10,PK3
";

    const PAYMENTS: &str = "Payments to Date,,,,
Sub Order No,Order Date,Dispatch Date,Product Name,Live Order Status,Transaction ID,Payment Date,Final Settlement Amount,Fixed Fee (Incl. GST),TCS,Claims Reason
101_1,2024-03-15,2024-03-16,Cotton Kurta,Delivered,TX1,2024-03-25,812.40,-11.8,-7.6,
102_1,2024-03-15,2024-03-16,Silk Saree,RTO,,2024-03-26,-120,,,Damaged
103_1,2024-03-15,,Other,Delivered,TX3,,,,,
";

    #[test]
    fn test_parse_orders() {
        let parsed = parse_orders_csv(ORDERS).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 1);

        let first = &parsed.rows[0];
        assert_eq!(first.order_id, "101_1");
        assert_eq!(first.sku.as_deref(), Some("KRT-M"));
        assert_eq!(first.quantity, Some(1));
        assert_eq!(first.supplier_listed_price, Some(1099.0));
        assert_eq!(first.selling_price, Some(899.0));
        assert_eq!(first.reason_for_credit_entry.as_deref(), Some("DELIVERED"));

        let second = &parsed.rows[1];
        assert!(second.sku.is_none());
        assert_eq!(second.supplier_listed_price, Some(1500.0));
        assert_eq!(
            second.order_date_time.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_parse_payments_with_title_row() {
        let parsed = parse_payments_csv(PAYMENTS).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 1);

        let first = &parsed.rows[0];
        assert_eq!(first.payment_id, "TX1");
        assert_eq!(first.amount, Some(812.4));
        assert_eq!(first.final_settlement_amount, Some(812.4));
        assert_eq!(first.order_status.as_deref(), Some("Delivered"));
        assert_eq!(first.charges.fixed_fee, Some(-11.8));
        assert_eq!(first.charges.tcs, Some(-7.6));

        let second = &parsed.rows[1];
        assert_eq!(second.payment_id, "102_1:2");
        assert_eq!(second.charges.claims_reason.as_deref(), Some("Damaged"));
        assert!(second.dispatch_date.is_some());
    }

    #[test]
    fn test_payment_ids_without_transaction_stay_distinct() {
        let csv = "Sub Order No,Transaction ID,Payment Date,Final Settlement Amount
A_1,UTR123,2024-03-25,100
B_1,UTR123,2024-03-25,200
C_1,,2024-03-25,300
C_1,,2024-03-26,-40
";
        let parsed = parse_payments_csv(csv).unwrap();

        let ids: Vec<(&str, &str)> = parsed
            .rows
            .iter()
            .map(|r| (r.order_id.as_str(), r.payment_id.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![("A_1", "UTR123"), ("B_1", "UTR123"), ("C_1", "C_1:3"), ("C_1", "C_1:4")]
        );
    }

    #[test]
    fn test_missing_order_id_column() {
        let err = parse_orders_csv("SKU,Quantity\nA,1\n").unwrap_err();
        assert!(matches!(err, CsvImportError::MissingOrderIdColumn(_)));
        assert!(matches!(parse_orders_csv("").unwrap_err(), CsvImportError::Empty));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("₹1,299.50"), Some(1299.5));
        assert_eq!(parse_number("-12"), Some(-12.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_date_time_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        for value in ["2024-03-15", "15-03-2024", "15/03/2024", "2024-03-15 10:20:30", "2024-03-15T10:20:30"] {
            assert_eq!(parse_date_time(value).map(|d| d.date()), Some(expected), "{}", value);
        }
        assert!(parse_date_time("March 15").is_none());
    }
}
