//! Retired API versions

use crate::error::GatewayError;

/// Every route of a retired version answers 410
pub async fn deprecated() -> GatewayError {
    GatewayError::Deprecated
}
