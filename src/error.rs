//! Crate-wide error type and the [`err_at!`] construction macro.
//!
//! Error variants mirror the abstract error taxonomy of the revision-file
//! and index subsystem: each read-side failure is surfaced to the caller
//! unchanged, write-side failures carry enough context to log and recover.

use std::{ffi, fmt, io, num, result, str};

/// Crate-wide result alias.
pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Revision requested that has not been committed.
    NoSuchRevision(String),
    /// (revision, item-number) not present in the L2P index.
    NoSuchItem(String),
    /// VLQ decode failure, size mismatch, or bad footer checksum byte.
    MalformedIndex(String),
    /// FNV-1a mismatch or item-header parse failure.
    CorruptRevFile(String),
    /// Commit's base revision is older than the current youngest revision.
    TxnOutOfDate(String),
    /// Repository format number exceeds what this build understands.
    FormatUnsupported(String),
    /// Failed to acquire the write lock within the configured timeout.
    LockTimeout(String),
    /// Observed an odd revprop generation older than the recovery timeout;
    /// recovered internally, surfaced only for logging.
    RevpropWriteStale(String),
    /// Generic I/O failure wrapping [std::io::Error].
    IOError(String),
    /// Parsed file name or path does not match the expected scheme.
    InvalidFile(String),
    /// Caller supplied an argument outside the accepted domain.
    InvalidInput(String),
    /// Invariant violated internally; always a bug, never caller error.
    Fatal(String),
    /// Type conversion (int width, utf8, ...) failed.
    FailConvert(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            NoSuchRevision(s) => write!(f, "no-such-revision: {}", s),
            NoSuchItem(s) => write!(f, "no-such-item: {}", s),
            MalformedIndex(s) => write!(f, "malformed-index: {}", s),
            CorruptRevFile(s) => write!(f, "corrupt-rev-file: {}", s),
            TxnOutOfDate(s) => write!(f, "txn-out-of-date: {}", s),
            FormatUnsupported(s) => write!(f, "format-unsupported: {}", s),
            LockTimeout(s) => write!(f, "lock-timeout: {}", s),
            RevpropWriteStale(s) => write!(f, "revprop-write-stale: {}", s),
            IOError(s) => write!(f, "io-error: {}", s),
            InvalidFile(s) => write!(f, "invalid-file: {}", s),
            InvalidInput(s) => write!(f, "invalid-input: {}", s),
            Fatal(s) => write!(f, "fatal: {}", s),
            FailConvert(s) => write!(f, "fail-convert: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IOError(err.to_string())
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Error {
        Error::FailConvert(err.to_string())
    }
}

impl From<str::Utf8Error> for Error {
    fn from(err: str::Utf8Error) -> Error {
        Error::FailConvert(err.to_string())
    }
}

impl From<ffi::OsString> for Error {
    fn from(val: ffi::OsString) -> Error {
        Error::InvalidFile(format!("{:?}", val))
    }
}

/// Build an [Error] value, attaching call-site file/line for diagnosis.
///
/// Three call shapes, matching how the rest of the crate uses it:
///
/// * `err_at!(Variant, msg: "fmt {}", arg)` — construct directly from a
///   formatted message.
/// * `err_at!(Variant, fallible_expr)` — wrap the `Err` side of a
///   `Result`, passing `Ok` through unchanged.
/// * `err_at!(Variant, fallible_expr, "context {}", arg)` — same, with an
///   extra context message prepended to the wrapped error.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let msg = format!($($arg),+);
        Err($crate::Error::$v(format!("{}:{} {}", file!(), line!(), msg)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                Err($crate::Error::$v(format!("{}:{} err:{}", file!(), line!(), err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let msg = format!($($arg),+);
                Err($crate::Error::$v(format!(
                    "{}:{} {} err:{}",
                    file!(),
                    line!(),
                    msg,
                    err
                )))
            }
        }
    }};
}
