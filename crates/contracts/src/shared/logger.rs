use serde::{Deserialize, Serialize};

/// Источник записи диагностического лога
pub const SOURCE_CLIENT: &str = "client";
pub const SOURCE_SERVER: &str = "server";

/// Запись диагностического лога
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    pub source: String, // "client" или "server"
    pub category: String,
    pub message: String,
}

/// DTO для создания новой записи лога
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLogRequest {
    pub source: String,
    pub category: String,
    pub message: String,
}

impl CreateLogRequest {
    pub fn client(category: &str, message: impl Into<String>) -> Self {
        Self {
            source: SOURCE_CLIENT.to_string(),
            category: category.to_string(),
            message: message.into(),
        }
    }
}
