/// Why an asset could not be produced.
///
/// Cloneable so a single failed fetch can be delivered to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to parse asset: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AssetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AssetError::Parse(err.to_string())
        } else {
            AssetError::Transport(err.to_string())
        }
    }
}

impl From<gltf::Error> for AssetError {
    fn from(err: gltf::Error) -> Self {
        match err {
            gltf::Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AssetError::NotFound(io.to_string())
            }
            gltf::Error::Io(io) => AssetError::Transport(io.to_string()),
            other => AssetError::Parse(other.to_string()),
        }
    }
}
