use crate::codec::Encoding;
use crate::record::{Attr, Level, Record};

/// Error returned by [`Handler::handle`].
///
/// None of these are fatal; the caller decides whether to retry, drop the
/// record, or report it elsewhere.
#[derive(thiserror::Error, Debug)]
pub enum HandleError {
    /// The inner encoder rejected the record.
    #[error("error when calling inner encoder: {0}")]
    Encode(#[source] serde_json::Error),

    /// The inner encoder's output did not parse back. This is an internal
    /// invariant violation, reported instead of panicking.
    #[error("error when decoding inner encoder output: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("error when serializing attributes as {encoding}: {source}")]
    Serialize {
        encoding: Encoding,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("error when writing log output: {0}")]
    Write(#[from] std::io::Error),
}

/// Destination for [`Record`]s.
///
/// A handler forms a tree through derivation: [`with_attrs`](Handler::with_attrs)
/// and [`with_group`](Handler::with_group) return new handlers and never
/// change the one they are called on. Handlers in one tree may be used from
/// many threads at once.
pub trait Handler: Send + Sync {
    /// Whether records at `level` would be handled at all.
    ///
    /// Callers use this to skip building records nobody will see.
    fn enabled(&self, level: Level) -> bool;

    /// Format and write a single record.
    ///
    /// **Returns**
    /// - `Ok(())` once the record was written.
    /// - `Err(..)` if encoding, decoding, serializing or writing failed.
    fn handle(&self, record: &Record) -> Result<(), HandleError>;

    /// New handler whose output also carries `attrs`.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Self
    where
        Self: Sized;

    /// New handler that nests subsequently bound attributes, and every
    /// record's attributes, under `name`.
    fn with_group(&self, name: &str) -> Self
    where
        Self: Sized;
}
