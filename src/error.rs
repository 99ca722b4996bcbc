use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Where a configuration or validation error came from.
///
/// Every part is optional. Displayed as a parenthesized suffix, e.g.
/// ` (field: root.children[1].sizes, source: tree_validation)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Dotted path to the offending value (`params.prompt`, `pages[0].root`).
    pub field_path: Option<String>,
    pub details: Option<String>,
    /// Component that raised the error (`registry`, `replicate`, `tree_validation`).
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(self, path: impl Into<String>) -> Self {
        Self {
            field_path: Some(path.into()),
            ..self
        }
    }

    pub fn with_details(self, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..self
        }
    }

    pub fn with_source(self, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_path.is_none() && self.details.is_none() && self.source.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let labelled = [
            ("field", &self.field_path),
            ("details", &self.details),
            ("source", &self.source),
        ];
        f.write_str(" (")?;
        let mut first = true;
        for (label, value) in labelled {
            let Some(value) = value else { continue };
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", label, value)?;
            first = false;
        }
        f.write_str(")")
    }
}

/// Unified error type for panelkit.
///
/// Tree lookups never produce one of these: absence is reported as `None`.
/// Everything here comes from persisted-data validation or the generation stack.
#[derive(Debug, Error)]
pub enum Error {
    /// User-actionable setup problem (no provider, missing credential). Raised before any network call.
    #[error("Configuration error: {message}{context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{context}")]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// Non-2xx response from a provider API.
    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// The remote job reached `failed` or `canceled`.
    #[error("Generation failed: {message}")]
    Generation {
        message: String,
        job_id: Option<String>,
    },

    #[error("Generation timed out after {attempts} status checks ({waited:?})")]
    Timeout { attempts: u32, waited: Duration },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Preset format error: {0}")]
    PresetFormat(#[from] serde_yaml::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True for errors that originate on the provider side (status, job failure, timeout).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Remote { .. } | Error::Generation { .. } | Error::Timeout { .. }
        )
    }
}
