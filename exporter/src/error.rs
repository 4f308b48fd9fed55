//! Error types and result definitions for export operations.
//!
//! Only failures are modelled here. Expected absences (identifier gaps, empty
//! pages, a search that finds no row on the requested side) are plain data in
//! the respective result types and never reach [`ExportError`].

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Specific categories of errors that can occur while locating or exporting.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The store could not be reached or the session broke mid-flight.
    StoreUnavailable,
    /// The store rejected or failed a query.
    StoreQueryFailed,
    /// A value cannot be cast to its declared column type.
    ConversionError,
    InvalidData,
    ConfigError,
    IoError,
    SinkError,
    InvalidState,
    /// A located range is missing an id on one side and cannot bound an export.
    RangeUnresolved,
    Unknown,
}

/// Main error type for export operations.
#[derive(Debug, Clone)]
pub struct ExportError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

impl ExportError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the dynamic detail attached to this error, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating error, exposed through [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns true when the error means the store session can no longer be trusted.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StoreUnavailable | ErrorKind::StoreQueryFailed
        )
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        ExportError {
            kind,
            description,
            detail,
            source: None,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for ExportError {
    fn eq(&self, other: &ExportError) -> bool {
        self.kind == other.kind && self.description == other.description
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            for line in detail.lines() {
                write!(f, "\n  {line}")?;
            }
        }

        if let Some(source) = &self.source {
            write!(f, "\n  caused by: {source}")?;
        }

        Ok(())
    }
}

impl error::Error for ExportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<(ErrorKind, &'static str)> for ExportError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> Self {
        ExportError::from_components(kind, Cow::Borrowed(desc), None)
    }
}

impl From<(ErrorKind, &'static str, String)> for ExportError {
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> Self {
        ExportError::from_components(kind, Cow::Borrowed(desc), Some(Cow::Owned(detail)))
    }
}

impl From<sqlx::Error> for ExportError {
    #[track_caller]
    fn from(err: sqlx::Error) -> Self {
        let (kind, description) = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => (ErrorKind::StoreUnavailable, "Store connection failed"),
            sqlx::Error::Configuration(_) => (ErrorKind::ConfigError, "Store configuration invalid"),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                (ErrorKind::ConversionError, "Store value could not be decoded")
            }
            _ => (ErrorKind::StoreQueryFailed, "Store query failed"),
        };

        ExportError::from_components(kind, Cow::Borrowed(description), Some(Cow::Owned(err.to_string())))
            .with_source(err)
    }
}

impl From<std::io::Error> for ExportError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        ExportError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O error occurred"),
            Some(Cow::Owned(err.to_string())),
        )
        .with_source(err)
    }
}

impl From<arrow::error::ArrowError> for ExportError {
    #[track_caller]
    fn from(err: arrow::error::ArrowError) -> Self {
        let kind = match &err {
            arrow::error::ArrowError::IoError(_, _) | arrow::error::ArrowError::CsvError(_) => {
                ErrorKind::SinkError
            }
            arrow::error::ArrowError::CastError(_) | arrow::error::ArrowError::ParseError(_) => {
                ErrorKind::ConversionError
            }
            _ => ErrorKind::InvalidData,
        };

        ExportError::from_components(
            kind,
            Cow::Borrowed("Record batch operation failed"),
            Some(Cow::Owned(err.to_string())),
        )
        .with_source(err)
    }
}

impl From<tokio::task::JoinError> for ExportError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        ExportError::from_components(
            ErrorKind::InvalidState,
            Cow::Borrowed("Blocking task failed"),
            Some(Cow::Owned(err.to_string())),
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::{bail, export_error};

    fn fails() -> ExportResult<()> {
        bail!(ErrorKind::RangeUnresolved, "Range has no end id", "2025-01-18");
    }

    #[test]
    fn macro_builds_error_with_detail() {
        let err = export_error!(ErrorKind::InvalidData, "Bad row", "row 7");

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("row 7"));
        assert!(err.to_string().contains("Bad row"));
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn bail_returns_early() {
        let err = fails().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RangeUnresolved);
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: ExportError = std::io::Error::other("disk full").into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn store_failures_are_classified() {
        let err: ExportError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(err.is_store_failure());

        let err: ExportError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::StoreQueryFailed);
    }
}
