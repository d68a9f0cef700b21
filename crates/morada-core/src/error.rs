/// Errors produced by the remote data gateway.
///
/// Every gateway failure is non-fatal to the consuming context: reads degrade
/// to empty or placeholder results, writes roll back or report failure.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("policy denied: {0}")]
    PolicyDenied(String),
}

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("authentication required")]
    AuthRequired,
    #[error("validation failed: {0}")]
    Validation(String),
}
