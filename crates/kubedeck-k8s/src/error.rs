//! Error type for cluster access

/// Errors surfaced by the cluster access layer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A named resource does not exist
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// The API call failed (network, auth, server error)
    #[error("Kubernetes API request failed: {0}")]
    Transport(#[source] kube::Error),

    /// Reading a log stream failed mid-way
    #[error("failed to read log stream: {0}")]
    Io(#[from] std::io::Error),

    /// An optional subsystem is not installed in the cluster
    #[error("{0} is not available in this cluster")]
    Unavailable(String),

    /// The requested action does not apply to this kind
    #[error("{0}")]
    Unsupported(String),

    /// Kubeconfig or in-cluster configuration could not be loaded
    #[error("failed to load cluster configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Self::Transport(err)
    }
}

impl Error {
    pub fn not_found(kind: &str, name: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Map a kube error for a named object, turning HTTP 404 into `NotFound`
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::not_found(kind, name),
            _ => Self::Transport(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// HTTP 409 from a create call
pub(crate) fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}
