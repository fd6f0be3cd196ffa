use std::collections::{BTreeMap, BTreeSet};

use contracts::projections::p910_order_payment_merge::{resolve_status, MergedOrderRecordDto};

use crate::domain::a030_order_line::repository::Model as OrderLine;
use crate::domain::a031_settlement_payment::repository::Model as Payment;

/// Склеить строки заказов с выплатами.
///
/// One record per (order, payment) pair; an order without payments gives a
/// single order-only record. Keys are processed in ascending order and the
/// payments of one order by payment date, then payment id.
pub fn merge(orders: &[OrderLine], payments: &[Payment]) -> Vec<MergedOrderRecordDto> {
    let order_map: BTreeMap<&str, &OrderLine> =
        orders.iter().map(|o| (o.order_id.as_str(), o)).collect();

    let mut payment_map: BTreeMap<&str, Vec<&Payment>> = BTreeMap::new();
    for payment in payments {
        payment_map
            .entry(payment.order_id.as_str())
            .or_default()
            .push(payment);
    }

    if payments.len() > orders.len() {
        tracing::warn!(
            "More payment rows ({}) than order rows ({}), order file may be incomplete",
            payments.len(),
            orders.len()
        );
    }
    let orphan_keys = payment_map
        .keys()
        .filter(|id| !order_map.contains_key(*id))
        .count();
    if orphan_keys > 0 {
        tracing::warn!("{} order ids have payments but no order row", orphan_keys);
    }

    let keys: BTreeSet<&str> = order_map
        .keys()
        .chain(payment_map.keys())
        .copied()
        .collect();

    let mut merged = Vec::with_capacity(keys.len().max(payments.len()));
    for key in keys {
        let order = order_map.get(key).copied();
        match payment_map.get_mut(key) {
            Some(order_payments) => {
                order_payments.sort_by(|a, b| {
                    a.payment_date_time
                        .cmp(&b.payment_date_time)
                        .then_with(|| a.payment_id.cmp(&b.payment_id))
                });
                for payment in order_payments.iter() {
                    merged.push(merge_pair(key, order, Some(payment)));
                }
            }
            None => merged.push(merge_pair(key, order, None)),
        }
    }

    let without_sku = merged.iter().filter(|r| !r.has_sku()).count();
    for record in merged.iter().filter(|r| !r.has_sku()) {
        tracing::warn!(
            "Merged record without SKU: order {} payment {:?}",
            record.order_id,
            record.payment_id
        );
    }
    tracing::info!(
        "Merge summary: {} records, {} with SKU, {} without SKU",
        merged.len(),
        merged.len() - without_sku,
        without_sku
    );

    merged
}

fn merge_pair(order_id: &str, order: Option<&OrderLine>, payment: Option<&Payment>) -> MergedOrderRecordDto {
    let mut record = MergedOrderRecordDto {
        order_id: order_id.to_string(),
        ..Default::default()
    };

    if let Some(order) = order {
        record.sku = order.sku.clone();
        record.product_name = order.product_name.clone();
        record.quantity = order.quantity;
        record.selling_price = order.selling_price;
        record.order_date_time = order.order_date_time.clone();
        record.customer_state = order.customer_state.clone();
        record.size = order.size.clone();
        record.supplier_listed_price = order.supplier_listed_price;
        record.supplier_discounted_price = order.supplier_discounted_price;
        record.packet_id = order.packet_id.clone();
        record.reason_for_credit_entry = order.reason_for_credit_entry.clone();
    }

    if let Some(payment) = payment {
        record.payment_id = Some(payment.payment_id.clone());
        record.amount = payment.amount;
        record.payment_date_time = payment.payment_date_time.clone();
        record.order_status = payment.order_status.clone();
        record.transaction_id = payment.transaction_id.clone();
        record.final_settlement_amount = payment.final_settlement_amount.or(payment.amount);
        record.price_type = payment.price_type.clone();
        record.total_sale_amount = payment.total_sale_amount;
        record.total_sale_return_amount = payment.total_sale_return_amount;
        record.dispatch_date = payment.dispatch_date.clone();
        record.charges = payment.charges();
        if record.order_date_time.is_none() {
            record.order_date_time = payment.order_date_time.clone();
        }
    }

    let resolution = resolve_status(
        payment.and_then(|p| p.order_status.as_deref()),
        order.and_then(|o| o.reason_for_credit_entry.as_deref()),
    );
    if resolution.final_status.is_none() {
        tracing::debug!("No usable status for order {}", order_id);
    }
    record.final_status = resolution.final_status;
    record.status_source = resolution.status_source;

    record
}
