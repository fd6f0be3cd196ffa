use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::shared::data::db::get_connection;

/// Строка файла заказов
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a030_order_line")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    #[sea_orm(nullable)]
    pub quantity: Option<i32>,
    #[sea_orm(nullable)]
    pub selling_price: Option<f64>,
    #[sea_orm(nullable)]
    pub order_date_time: Option<String>,
    #[sea_orm(nullable)]
    pub product_name: Option<String>,
    #[sea_orm(nullable)]
    pub customer_state: Option<String>,
    #[sea_orm(nullable)]
    pub size: Option<String>,
    #[sea_orm(nullable)]
    pub supplier_listed_price: Option<f64>,
    #[sea_orm(nullable)]
    pub supplier_discounted_price: Option<f64>,
    #[sea_orm(nullable)]
    pub packet_id: Option<String>,
    /// Order-side status
    #[sea_orm(nullable)]
    pub reason_for_credit_entry: Option<String>,
    pub loaded_at_utc: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

/// Данные строки заказа для upsert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderLineEntry {
    pub order_id: String,
    pub sku: Option<String>,
    pub quantity: Option<i32>,
    pub selling_price: Option<f64>,
    pub order_date_time: Option<chrono::NaiveDateTime>,
    pub product_name: Option<String>,
    pub customer_state: Option<String>,
    pub size: Option<String>,
    pub supplier_listed_price: Option<f64>,
    pub supplier_discounted_price: Option<f64>,
    pub packet_id: Option<String>,
    pub reason_for_credit_entry: Option<String>,
}

impl OrderLineEntry {
    fn into_active(self, loaded_at: &str) -> ActiveModel {
        ActiveModel {
            order_id: Set(self.order_id),
            sku: Set(self.sku),
            quantity: Set(self.quantity),
            selling_price: Set(self.selling_price),
            order_date_time: Set(self
                .order_date_time
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
            product_name: Set(self.product_name),
            customer_state: Set(self.customer_state),
            size: Set(self.size),
            supplier_listed_price: Set(self.supplier_listed_price),
            supplier_discounted_price: Set(self.supplier_discounted_price),
            packet_id: Set(self.packet_id),
            reason_for_credit_entry: Set(self.reason_for_credit_entry),
            loaded_at_utc: Set(loaded_at.to_string()),
        }
    }
}

/// Upsert строк заказов по order_id; при повторе в пакете побеждает последняя строка
pub async fn upsert_entries(entries: Vec<OrderLineEntry>) -> Result<u64> {
    if entries.is_empty() {
        return Ok(0);
    }
    let loaded_at = Utc::now().to_rfc3339();
    let count = entries
        .iter()
        .map(|e| e.order_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let txn = conn().begin().await?;
    for entry in entries {
        Entity::insert(entry.into_active(&loaded_at))
            .on_conflict(
                OnConflict::column(Column::OrderId)
                    .update_columns([
                        Column::Sku,
                        Column::Quantity,
                        Column::SellingPrice,
                        Column::OrderDateTime,
                        Column::ProductName,
                        Column::CustomerState,
                        Column::Size,
                        Column::SupplierListedPrice,
                        Column::SupplierDiscountedPrice,
                        Column::PacketId,
                        Column::ReasonForCreditEntry,
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

/// Все строки заказов
pub async fn list_all() -> Result<Vec<Model>> {
    let items = Entity::find()
        .order_by_asc(Column::OrderId)
        .all(conn())
        .await?;
    Ok(items)
}
