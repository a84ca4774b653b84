use std::path::PathBuf;

use trek_authoring::AuthoringError;
use trek_core::error::CoreError;
use trek_core::upload::StagingRejection;
use trek_gateway::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Cannot tell the image type of {0} from its extension")]
    UnknownImageType(PathBuf),

    #[error("Image {file} was not accepted: {reason}")]
    Staging {
        file: String,
        reason: StagingRejection,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("HTTP client error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Authoring(#[from] AuthoringError),
}
