use crate::report::ValidationReport;

/// Error type for redirect ingestion, validation and lookup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more violation categories are non-empty. The report carries every category.
    #[error("{0}")]
    InvalidRedirects(Box<ValidationReport>),

    /// A lookup was attempted before a successful `validate`.
    #[error("redirects must be validated before lookups. Did you run Redirects::validate()?")]
    NotValidated,

    #[error("redirect record for '{identifier}' has no locations")]
    EmptyRecord { identifier: String },

    #[error("malformed location '{location}' for '{identifier}': {reason}")]
    MalformedLocation {
        identifier: String,
        location: String,
        reason: String,
    },

    #[error("current output path '{path}' of '{identifier}' must not carry an anchor")]
    AnchoredCurrentPath { identifier: String, path: String },

    #[error("script template does not contain placeholder '{placeholder}'")]
    MissingPlaceholder { placeholder: String },

    #[error("failed to serialize client redirects: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::InvalidRedirects(report) => Some(report.as_ref()),
            _ => None,
        }
    }
}
