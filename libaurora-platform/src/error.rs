use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not open {path}")]
    Open { path: PathBuf, #[source] source: std::io::Error },

    #[error("{resource} not found in archive")]
    ResourceNotFound { resource: String },

    #[error("audio channel {0} is not available")]
    ChannelUnavailable(u8),
}
