//! Payment domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::{OrderId, UserId};

/// Unique identifier for a Payment. Store-generated, always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(i64);

impl PaymentId {
    /// Wraps a raw id, e.g. one read back from the store.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a payment.
///
/// Legal transitions: `pending → processing → completed` or
/// `processing → failed`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created but not yet picked up by a processor
    Pending,
    /// A processor owns it and its settlement is in flight
    Processing,
    /// Settled successfully
    Completed,
    /// Settlement failed definitively
    Failed,
}

impl PaymentStatus {
    /// Whether the status is an end state.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Canonical lowercase name, as stored and as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settlement attempt for one order.
///
/// Created when a consumer begins processing an order event, owned
/// exclusively by that processor until it reaches a terminal status,
/// and never deleted by the pipeline. `order_id` is deliberately not
/// unique: redelivered order events create additional rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Order being settled
    pub order_id: OrderId,
    /// Owning user, copied from the order event
    pub user_id: UserId,
    /// Amount charged
    pub amount: Decimal,
    /// Current lifecycle state
    pub status: PaymentStatus,
    /// Set only when the payment reaches `completed`
    pub processed_at: Option<DateTime<Utc>>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Reconstructs a payment from database fields.
    pub fn from_parts(
        id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
        status: PaymentStatus,
        processed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            user_id,
            amount,
            status,
            processed_at,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Processing.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_names_are_lowercase() {
        assert_eq!(PaymentStatus::Processing.as_str(), "processing");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
