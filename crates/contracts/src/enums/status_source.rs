use serde::{Deserialize, Serialize};

/// Какой входной файл определил итоговый статус merged-записи
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusSource {
    OrderFile,
    PaymentFile,
    Merged,
    /// Неизвестный код от сервера, хранится как есть
    Other(String),
}

impl StatusSource {
    /// Код источника на проводе
    pub fn code(&self) -> &str {
        match self {
            StatusSource::OrderFile => "ORDER_FILE",
            StatusSource::PaymentFile => "PAYMENT_FILE",
            StatusSource::Merged => "MERGED",
            StatusSource::Other(code) => code.as_str(),
        }
    }

    /// Человекочитаемое название
    pub fn display_name(&self) -> &str {
        match self {
            StatusSource::OrderFile => "Order file",
            StatusSource::PaymentFile => "Payment file",
            StatusSource::Merged => "Merged",
            StatusSource::Other(code) => code.as_str(),
        }
    }

    /// Источники, которые выставляет резолвер статуса (для выпадающего фильтра)
    pub fn all() -> Vec<StatusSource> {
        vec![StatusSource::PaymentFile, StatusSource::OrderFile]
    }

    /// Парсинг из строки, регистр не важен
    pub fn from_code(code: &str) -> Self {
        let trimmed = code.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "ORDER_FILE" => StatusSource::OrderFile,
            "PAYMENT_FILE" => StatusSource::PaymentFile,
            "MERGED" => StatusSource::Merged,
            _ => StatusSource::Other(trimmed.to_string()),
        }
    }

}

impl From<String> for StatusSource {
    fn from(value: String) -> Self {
        StatusSource::from_code(&value)
    }
}

impl From<StatusSource> for String {
    fn from(value: StatusSource) -> Self {
        value.code().to_string()
    }
}

impl std::fmt::Display for StatusSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(StatusSource::from_code("payment_file"), StatusSource::PaymentFile);
        assert_eq!(StatusSource::from_code(" ORDER_FILE "), StatusSource::OrderFile);
        assert_eq!(
            StatusSource::from_code("MERGED_TABLE"),
            StatusSource::Other("MERGED_TABLE".to_string())
        );
    }

    #[test]
    fn test_filter_options_match_resolver_output() {
        let all = StatusSource::all();
        assert_eq!(all, vec![StatusSource::PaymentFile, StatusSource::OrderFile]);
        assert!(!all.contains(&StatusSource::Merged));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&StatusSource::PaymentFile).unwrap();
        assert_eq!(json, "\"PAYMENT_FILE\"");

        let parsed: StatusSource = serde_json::from_str("\"LEGACY\"").unwrap();
        assert_eq!(parsed.code(), "LEGACY");
    }
}
