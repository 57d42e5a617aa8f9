//! Payment gateway adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use orderflow_types::{GatewayError, OrderId, PaymentGateway, UserId};

/// Gateway that approves every charge.
///
/// Stands in for a real acquirer integration; the settlement path treats
/// it like any other [`PaymentGateway`], so swapping in a real one changes
/// nothing but the wiring in `main`.
pub struct AutoApproveGateway;

#[async_trait]
impl PaymentGateway for AutoApproveGateway {
    async fn charge(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<(), GatewayError> {
        debug!(%order_id, %user_id, %amount, "Charge approved");
        Ok(())
    }
}
