//! Shorthands for building and returning [`crate::error::ExportError`]s.

/// Builds an [`crate::error::ExportError`] from a kind, a static description and,
/// optionally, a detail message and a source error.
///
/// ```ignore
/// export_error!(ErrorKind::InvalidData, "Page size must be positive");
/// export_error!(ErrorKind::SinkError, "Failed to write CSV", path.display(), source: err);
/// ```
#[macro_export]
macro_rules! export_error {
    ($kind:expr, $desc:expr $(,)?) => {
        $crate::error::ExportError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr $(,)?) => {
        $crate::error::ExportError::from(($kind, $desc, ::std::string::ToString::to_string(&$detail)))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr $(,)?) => {
        $crate::export_error!($kind, $desc, $detail).with_source($source)
    };
}

/// Returns early with an [`crate::error::ExportError`]. Takes the same arguments
/// as [`export_error!`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)+) => {
        return ::core::result::Result::Err($crate::export_error!($($arg)+))
    };
}
