//! Status enums for backend entities.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the commerce backend.
///
/// Unrecognized values are kept verbatim in [`OrderStatus::Other`] so a new
/// backend status never breaks the order history page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Placed,
    Pending,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// Wire value, e.g. `PLACED`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Placed => "PLACED",
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }

    /// CSS modifier used to color the status badge.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Placed => "badge-info",
            Self::Pending => "badge-warning",
            Self::Delivered => "badge-success",
            Self::Cancelled => "badge-danger",
            Self::Other(_) => "badge-neutral",
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PLACED" => Self::Placed,
            "PENDING" => Self::Pending,
            "DELIVERED" => Self::Delivered,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
