use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use contracts::projections::p910_order_payment_merge::SettlementCharges;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::shared::data::db::get_connection;

/// Строка файла выплат (settlement)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a031_settlement_payment")]
pub struct Model {
    /// "{order_id}#{payment_id}"; one transfer id covers many sub-orders
    #[sea_orm(primary_key, auto_increment = false)]
    pub payment_key: String,
    pub payment_id: String,
    pub order_id: String,
    #[sea_orm(nullable)]
    pub amount: Option<f64>,
    #[sea_orm(nullable)]
    pub final_settlement_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub payment_date_time: Option<String>,
    #[sea_orm(nullable)]
    pub order_date_time: Option<String>,
    /// Payment-side status ("Live Order Status")
    #[sea_orm(nullable)]
    pub order_status: Option<String>,
    #[sea_orm(nullable)]
    pub transaction_id: Option<String>,
    #[sea_orm(nullable)]
    pub price_type: Option<String>,
    #[sea_orm(nullable)]
    pub total_sale_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub total_sale_return_amount: Option<f64>,
    #[sea_orm(nullable)]
    pub dispatch_date: Option<String>,
    #[sea_orm(nullable)]
    pub charges_json: Option<String>,
    pub loaded_at_utc: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Удержания; битый или пустой JSON читается как пустой набор
    pub fn charges(&self) -> SettlementCharges {
        self.charges_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }
}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub fn payment_key(order_id: &str, payment_id: &str) -> String {
    format!("{}#{}", order_id, payment_id)
}

/// Данные строки выплаты для upsert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentEntry {
    pub payment_id: String,
    pub order_id: String,
    pub amount: Option<f64>,
    pub final_settlement_amount: Option<f64>,
    pub payment_date_time: Option<chrono::NaiveDateTime>,
    pub order_date_time: Option<chrono::NaiveDateTime>,
    pub order_status: Option<String>,
    pub transaction_id: Option<String>,
    pub price_type: Option<String>,
    pub total_sale_amount: Option<f64>,
    pub total_sale_return_amount: Option<f64>,
    pub dispatch_date: Option<chrono::NaiveDate>,
    pub charges: SettlementCharges,
}

fn format_date_time(value: Option<chrono::NaiveDateTime>) -> Option<String> {
    value.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

impl PaymentEntry {
    fn into_active(self, loaded_at: &str) -> Result<ActiveModel> {
        let charges_json = if self.charges == SettlementCharges::default() {
            None
        } else {
            Some(serde_json::to_string(&self.charges)?)
        };

        Ok(ActiveModel {
            payment_key: Set(payment_key(&self.order_id, &self.payment_id)),
            payment_id: Set(self.payment_id),
            order_id: Set(self.order_id),
            amount: Set(self.amount),
            final_settlement_amount: Set(self.final_settlement_amount),
            payment_date_time: Set(format_date_time(self.payment_date_time)),
            order_date_time: Set(format_date_time(self.order_date_time)),
            order_status: Set(self.order_status),
            transaction_id: Set(self.transaction_id),
            price_type: Set(self.price_type),
            total_sale_amount: Set(self.total_sale_amount),
            total_sale_return_amount: Set(self.total_sale_return_amount),
            dispatch_date: Set(self.dispatch_date.map(|d| d.format("%Y-%m-%d").to_string())),
            charges_json: Set(charges_json),
            loaded_at_utc: Set(loaded_at.to_string()),
        })
    }
}

/// Оставить по одной строке на (order_id, payment_id); побеждает последняя
fn dedupe(entries: Vec<PaymentEntry>) -> Vec<PaymentEntry> {
    let mut by_key: BTreeMap<String, PaymentEntry> = BTreeMap::new();
    for entry in entries {
        by_key.insert(payment_key(&entry.order_id, &entry.payment_id), entry);
    }
    by_key.into_values().collect()
}

/// Upsert выплат по (order_id, payment_id); returns the number of distinct rows written
pub async fn upsert_entries(entries: Vec<PaymentEntry>) -> Result<u64> {
    let entries = dedupe(entries);
    if entries.is_empty() {
        return Ok(0);
    }
    let loaded_at = Utc::now().to_rfc3339();
    let count = entries.len() as u64;

    let txn = conn().begin().await?;
    for entry in entries {
        Entity::insert(entry.into_active(&loaded_at)?)
            .on_conflict(
                OnConflict::column(Column::PaymentKey)
                    .update_columns([
                        Column::Amount,
                        Column::FinalSettlementAmount,
                        Column::PaymentDateTime,
                        Column::OrderDateTime,
                        Column::OrderStatus,
                        Column::TransactionId,
                        Column::PriceType,
                        Column::TotalSaleAmount,
                        Column::TotalSaleReturnAmount,
                        Column::DispatchDate,
                        Column::ChargesJson,
                        Column::LoadedAtUtc,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    Ok(count)
}

pub async fn list_all() -> Result<Vec<Model>> {
    let items = Entity::find()
        .order_by_asc(Column::OrderId)
        .order_by_asc(Column::PaymentId)
        .all(conn())
        .await?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::test_support::lock_empty_database;

    fn model(charges_json: Option<&str>) -> Model {
        Model {
            payment_key: "O1#P1".to_string(),
            payment_id: "P1".to_string(),
            order_id: "O1".to_string(),
            amount: None,
            final_settlement_amount: None,
            payment_date_time: None,
            order_date_time: None,
            order_status: None,
            transaction_id: None,
            price_type: None,
            total_sale_amount: None,
            total_sale_return_amount: None,
            dispatch_date: None,
            charges_json: charges_json.map(str::to_string),
            loaded_at_utc: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_charges_from_json() {
        let charges = model(Some(r#"{"fixedFee":-12.0,"tds":1.5}"#)).charges();
        assert_eq!(charges.fixed_fee, Some(-12.0));
        assert_eq!(charges.tds, Some(1.5));
        assert!(charges.claims.is_none());
    }

    #[test]
    fn test_broken_charges_read_as_empty() {
        assert_eq!(model(Some("not json")).charges(), SettlementCharges::default());
        assert_eq!(model(None).charges(), SettlementCharges::default());
    }

    fn entry(order_id: &str, payment_id: &str, amount: f64) -> PaymentEntry {
        PaymentEntry {
            payment_id: payment_id.to_string(),
            order_id: order_id.to_string(),
            amount: Some(amount),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_same_transaction_for_several_orders() {
        let _db = lock_empty_database().await;

        let written = upsert_entries(vec![
            entry("A_1", "UTR123", 100.0),
            entry("B_1", "UTR123", 200.0),
            entry("C_1", "UTR123", 300.0),
        ])
        .await
        .unwrap();

        assert_eq!(written, 3);
        let rows = list_all().await.unwrap();
        let orders: Vec<&str> = rows.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(orders, vec!["A_1", "B_1", "C_1"]);
        assert!(rows.iter().all(|r| r.payment_id == "UTR123"));
    }

    #[tokio::test]
    async fn test_repeated_key_in_batch_counts_once() {
        let _db = lock_empty_database().await;

        let written = upsert_entries(vec![
            entry("A_1", "UTR1", 100.0),
            entry("A_1", "UTR1", 150.0),
            entry("A_1", "UTR2", 10.0),
        ])
        .await
        .unwrap();

        assert_eq!(written, 2);
        let rows = list_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].payment_key, "A_1#UTR1");
        assert_eq!(rows[0].amount, Some(150.0));
    }

    #[tokio::test]
    async fn test_reimport_updates_in_place() {
        let _db = lock_empty_database().await;

        upsert_entries(vec![entry("A_1", "UTR1", 100.0)]).await.unwrap();
        upsert_entries(vec![entry("A_1", "UTR1", 90.0)]).await.unwrap();

        let rows = list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Some(90.0));
    }
}
