//! Status resolution and normalisation for merged order/payment rows.
//!
//! A payment row reflects realised settlement and therefore outranks the
//! order row whenever it carries a usable status.

use serde::{Deserialize, Serialize};

use crate::enums::StatusSource;

/// Result of resolving one (order, payment) correlation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusResolution {
    pub final_status: Option<String>,
    pub status_source: Option<StatusSource>,
}

/// Payment status is usable when it is non-blank and not "unknown".
pub fn is_recognized_payment_status(status: &str) -> bool {
    let trimmed = status.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("unknown")
}

/// Resolve the final status of a merged row.
///
/// 1. recognised payment status -> `PAYMENT_FILE`
/// 2. non-blank order status -> `ORDER_FILE`
/// 3. otherwise both fields stay `None`
pub fn resolve_status(payment_status: Option<&str>, order_status: Option<&str>) -> StatusResolution {
    if let Some(status) = payment_status.filter(|s| is_recognized_payment_status(s)) {
        return StatusResolution {
            final_status: Some(status.trim().to_string()),
            status_source: Some(StatusSource::PaymentFile),
        };
    }

    if let Some(status) = order_status.filter(|s| !s.trim().is_empty()) {
        return StatusResolution {
            final_status: Some(status.trim().to_string()),
            status_source: Some(StatusSource::OrderFile),
        };
    }

    StatusResolution::default()
}

/// Стандартизованные статусы заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
    RtoComplete,
    Returned,
    Refunded,
    Exchange,
    Unknown,
}

impl NormalizedStatus {
    pub fn code(&self) -> &'static str {
        match self {
            NormalizedStatus::Pending => "PENDING",
            NormalizedStatus::Shipped => "SHIPPED",
            NormalizedStatus::Delivered => "DELIVERED",
            NormalizedStatus::Cancelled => "CANCELLED",
            NormalizedStatus::RtoComplete => "RTO_COMPLETE",
            NormalizedStatus::Returned => "RETURNED",
            NormalizedStatus::Refunded => "REFUNDED",
            NormalizedStatus::Exchange => "EXCHANGE",
            NormalizedStatus::Unknown => "UNKNOWN",
        }
    }
}

// Exact aliases, compared case-insensitively
const STATUS_ALIASES: &[(&str, NormalizedStatus)] = &[
    ("delivered", NormalizedStatus::Delivered),
    ("shipped", NormalizedStatus::Shipped),
    ("in_transit", NormalizedStatus::Shipped),
    ("in transit", NormalizedStatus::Shipped),
    ("out_for_delivery", NormalizedStatus::Shipped),
    ("out for delivery", NormalizedStatus::Shipped),
    ("pending", NormalizedStatus::Pending),
    ("processing", NormalizedStatus::Pending),
    ("confirmed", NormalizedStatus::Pending),
    ("cancelled", NormalizedStatus::Cancelled),
    ("cancel", NormalizedStatus::Cancelled),
    ("rto_complete", NormalizedStatus::RtoComplete),
    ("rto complete", NormalizedStatus::RtoComplete),
    ("rto", NormalizedStatus::RtoComplete),
    ("returned", NormalizedStatus::Returned),
    ("return", NormalizedStatus::Returned),
    ("refunded", NormalizedStatus::Refunded),
    ("refund", NormalizedStatus::Refunded),
    ("exchange", NormalizedStatus::Exchange),
];

// Substring rules, first match wins
const STATUS_FRAGMENTS: &[(&[&str], NormalizedStatus)] = &[
    (&["DELIVER"], NormalizedStatus::Delivered),
    (&["SHIP", "TRANSIT"], NormalizedStatus::Shipped),
    (&["PEND", "PROCESS", "CONFIRM"], NormalizedStatus::Pending),
    (&["CANCEL"], NormalizedStatus::Cancelled),
    (&["RTO"], NormalizedStatus::RtoComplete),
    (&["RETURN"], NormalizedStatus::Returned),
    (&["REFUND"], NormalizedStatus::Refunded),
    (&["EXCHANGE"], NormalizedStatus::Exchange),
];

/// Map raw status text from either input file to a standard code
pub fn normalize_status(raw: &str) -> NormalizedStatus {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedStatus::Unknown;
    }

    if let Some((_, status)) = STATUS_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
    {
        return *status;
    }

    let upper = trimmed.to_ascii_uppercase();
    STATUS_FRAGMENTS
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| upper.contains(f)))
        .map(|(_, status)| *status)
        .unwrap_or(NormalizedStatus::Unknown)
}

/// Цвет бейджа статуса в таблице
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Info,
    Warning,
    Danger,
    Neutral,
}

impl StatusTone {
    pub fn badge_class(&self) -> &'static str {
        match self {
            StatusTone::Success => "status-badge status-badge--success",
            StatusTone::Info => "status-badge status-badge--info",
            StatusTone::Warning => "status-badge status-badge--warning",
            StatusTone::Danger => "status-badge status-badge--danger",
            StatusTone::Neutral => "status-badge status-badge--neutral",
        }
    }
}

pub fn status_tone(final_status: Option<&str>) -> StatusTone {
    match final_status.map(normalize_status) {
        Some(NormalizedStatus::Delivered) => StatusTone::Success,
        Some(NormalizedStatus::Shipped) => StatusTone::Info,
        Some(NormalizedStatus::Pending) => StatusTone::Warning,
        Some(NormalizedStatus::Cancelled) | Some(NormalizedStatus::RtoComplete) => {
            StatusTone::Danger
        }
        _ => StatusTone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wins_over_order_status() {
        let resolved = resolve_status(Some("Delivered"), Some("Return"));
        assert_eq!(resolved.final_status.as_deref(), Some("Delivered"));
        assert_eq!(resolved.status_source, Some(StatusSource::PaymentFile));
    }

    #[test]
    fn test_unknown_payment_status_falls_back_to_order() {
        for payment in [Some("UNKNOWN"), Some("  "), None] {
            let resolved = resolve_status(payment, Some("RTO"));
            assert_eq!(resolved.final_status.as_deref(), Some("RTO"));
            assert_eq!(resolved.status_source, Some(StatusSource::OrderFile));
        }
    }

    #[test]
    fn test_payment_only_side() {
        let resolved = resolve_status(Some("shipped"), None);
        assert_eq!(resolved.status_source, Some(StatusSource::PaymentFile));
    }

    #[test]
    fn test_no_usable_status() {
        let resolved = resolve_status(Some("unknown"), Some(""));
        assert_eq!(resolved, StatusResolution::default());
    }

    #[test]
    fn test_normalize_exact_aliases() {
        assert_eq!(normalize_status("Out For Delivery"), NormalizedStatus::Shipped);
        assert_eq!(normalize_status("CONFIRMED"), NormalizedStatus::Pending);
        assert_eq!(normalize_status("rto"), NormalizedStatus::RtoComplete);
        assert_eq!(normalize_status("Delivered"), NormalizedStatus::Delivered);
    }

    #[test]
    fn test_normalize_fragments() {
        assert_eq!(normalize_status("Partially Delivered"), NormalizedStatus::Delivered);
        assert_eq!(normalize_status("Customer Return Received"), NormalizedStatus::Returned);
        assert_eq!(normalize_status("RTO Initiated"), NormalizedStatus::RtoComplete);
        assert_eq!(normalize_status("Lost"), NormalizedStatus::Unknown);
        assert_eq!(normalize_status(""), NormalizedStatus::Unknown);
    }

    #[test]
    fn test_status_tone() {
        assert_eq!(status_tone(Some("delivered")), StatusTone::Success);
        assert_eq!(status_tone(Some("Shipped")), StatusTone::Info);
        assert_eq!(status_tone(Some("processing")), StatusTone::Warning);
        assert_eq!(status_tone(Some("RTO")), StatusTone::Danger);
        assert_eq!(status_tone(Some("Returned")), StatusTone::Neutral);
        assert_eq!(status_tone(None), StatusTone::Neutral);
    }
}
