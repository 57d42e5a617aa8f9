//! Payment gateway port.

use rust_decimal::Decimal;

use crate::domain::{OrderId, UserId};
use crate::error::GatewayError;

/// The outbound charge action, pluggable behind the settlement unit.
///
/// A real implementation talks to an external processor and supplies
/// its own timeout/retry policy; the pipeline ships a deterministic
/// stand-in. Calls must be safe to repeat for distinct orders running
/// concurrently.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Attempts to charge the user for one order.
    async fn charge(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<(), GatewayError>;
}
