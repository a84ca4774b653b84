//! Normalizes gateway answers into the single authoring error path.

use trek_gateway::{Envelope, GatewayError, GatewayResult};

use crate::error::AuthoringError;

/// Unwrap a gateway answer that must carry data.
pub(crate) fn expect_data<T>(result: GatewayResult<T>, operation: &str) -> Result<T, AuthoringError> {
    let envelope = accept(result, operation)?;
    envelope.data.ok_or_else(|| {
        tracing::error!(operation, "Backend reported success without data");
        AuthoringError::Transport(format!("{operation}: server returned no data"))
    })
}

/// Unwrap a gateway answer whose data is irrelevant.
pub(crate) fn expect_success<T>(
    result: GatewayResult<T>,
    operation: &str,
) -> Result<(), AuthoringError> {
    accept(result, operation).map(|_| ())
}

fn accept<T>(result: GatewayResult<T>, operation: &str) -> Result<Envelope<T>, AuthoringError> {
    match result {
        Ok(envelope) if envelope.success => Ok(envelope),
        Ok(envelope) => {
            let message = envelope.message_or(operation);
            tracing::warn!(operation, message = %message, "Backend rejected operation");
            Err(AuthoringError::Rejected(message))
        }
        Err(e) => Err(transport(e, operation)),
    }
}

fn transport(err: GatewayError, operation: &str) -> AuthoringError {
    tracing::error!(operation, error = %err, "Transport failure");
    AuthoringError::Transport(err.to_string())
}
