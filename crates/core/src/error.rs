use thiserror::Error;

/// Coarse classification shared by every failure a sync operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The item does not exist (any longer) on the remote side.
    NotFound,
    /// Connection failure or a non-2xx status other than 404.
    TransientNetwork,
    /// The response had an unexpected shape.
    DataCorruption,
    /// The cloud backend failed.
    CloudFailure,
    /// The local database failed.
    Storage,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TransientNetwork => "transient_network",
            Self::DataCorruption => "data_corruption",
            Self::CloudFailure => "cloud_failure",
            Self::Storage => "storage",
        }
    }

    /// Only plain network trouble is worth another attempt by the caller.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetwork)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a stored string does not name a known variant.
#[derive(Debug, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
