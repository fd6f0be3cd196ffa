use anyhow::Result;
use chrono::Utc;
use contracts::projections::p910_order_payment_merge::{MergedOrderRecordDto, PageWindow};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::shared::data::db::get_connection;

/// Строка merged-таблицы; полная запись хранится в `payload` (JSON)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "p910_merged_order_payment")]
pub struct Model {
    // NK: (order_id, payment_id)
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_key: String,
    pub position: i64,
    pub order_id: String,
    #[sea_orm(nullable)]
    pub payment_id: Option<String>,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    #[sea_orm(nullable)]
    pub final_status: Option<String>,
    /// trimmed, lower-cased final_status
    #[sea_orm(nullable)]
    pub final_status_key: Option<String>,
    #[sea_orm(nullable)]
    pub status_source: Option<String>,
    /// "YYYY-MM-DD"
    #[sea_orm(nullable)]
    pub order_date: Option<String>,
    pub payload: String,
    pub built_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn conn() -> &'static DatabaseConnection {
    get_connection()
}

pub fn record_key(record: &MergedOrderRecordDto) -> String {
    format!("{}#{}", record.order_id, record.payment_id.as_deref().unwrap_or(""))
}

pub fn status_key(status: &str) -> String {
    status.trim().to_lowercase()
}

impl Model {
    pub fn to_dto(&self) -> Result<MergedOrderRecordDto> {
        let dto = serde_json::from_str(&self.payload)?;
        Ok(dto)
    }
}

fn to_dtos(items: Vec<Model>) -> Result<Vec<MergedOrderRecordDto>> {
    items.iter().map(Model::to_dto).collect()
}

/// Escape LIKE wildcards; the queries use `ESCAPE '\'`
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            _ => out.push(ch),
        }
    }
    out
}

/// Подстрока в order_id, sku или final_status без учёта регистра
fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(term));
    let like = |col: Column| {
        Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern.clone()).escape('\\'))
    };
    Condition::any()
        .add(like(Column::OrderId))
        .add(like(Column::Sku))
        .add(like(Column::FinalStatus))
}

/// Полная замена merged-таблицы в одной транзакции
pub async fn replace_all(records: &[MergedOrderRecordDto]) -> Result<u64> {
    let built_at = Utc::now().to_rfc3339();
    let txn = conn().begin().await?;

    Entity::delete_many().exec(&txn).await?;

    for (position, record) in records.iter().enumerate() {
        let active = ActiveModel {
            record_key: Set(record_key(record)),
            position: Set(position as i64),
            order_id: Set(record.order_id.clone()),
            payment_id: Set(record.payment_id.clone()),
            sku: Set(record.sku.clone()),
            final_status: Set(record.final_status.clone()),
            final_status_key: Set(record.final_status.as_deref().map(status_key)),
            status_source: Set(record.status_source.as_ref().map(|s| s.code().to_string())),
            order_date: Set(record.order_date().map(str::to_string)),
            payload: Set(serde_json::to_string(record)?),
            built_at: Set(built_at.clone()),
        };
        active.insert(&txn).await?;
    }

    txn.commit().await?;
    Ok(records.len() as u64)
}

/// Страница merged-записей; `None` when `size` is not positive
pub async fn list_page(
    page: i64,
    size: i64,
    search: Option<&str>,
) -> Result<Option<(Vec<MergedOrderRecordDto>, u64, PageWindow)>> {
    let mut query = Entity::find();
    if let Some(term) = search {
        query = query.filter(search_condition(term));
    }

    let total = query.clone().count(conn()).await?;
    let Some(window) = PageWindow::resolve(page, size, total) else {
        return Ok(None);
    };

    let items = query
        .order_by_asc(Column::Position)
        .offset(window.offset)
        .limit(window.size)
        .all(conn())
        .await?;

    Ok(Some((to_dtos(items)?, total, window)))
}

pub async fn list_by_status(status: &str) -> Result<Vec<MergedOrderRecordDto>> {
    let items = Entity::find()
        .filter(Column::FinalStatusKey.eq(status_key(status)))
        .order_by_asc(Column::Position)
        .all(conn())
        .await?;
    to_dtos(items)
}

pub async fn list_by_source(source: &str) -> Result<Vec<MergedOrderRecordDto>> {
    let items = Entity::find()
        .filter(Column::StatusSource.eq(source.trim().to_ascii_uppercase()))
        .order_by_asc(Column::Position)
        .all(conn())
        .await?;
    to_dtos(items)
}

pub async fn list_all() -> Result<Vec<MergedOrderRecordDto>> {
    let items = Entity::find()
        .order_by_asc(Column::Position)
        .all(conn())
        .await?;
    to_dtos(items)
}

/// Записи с датой заказа в [date_from, date_to]
pub async fn list_by_order_date_range(
    date_from: &str,
    date_to: &str,
) -> Result<Vec<MergedOrderRecordDto>> {
    let items = Entity::find()
        .filter(Column::OrderDate.gte(date_from.to_string()))
        .filter(Column::OrderDate.lte(date_to.to_string()))
        .order_by_asc(Column::OrderDate)
        .all(conn())
        .await?;
    to_dtos(items)
}
