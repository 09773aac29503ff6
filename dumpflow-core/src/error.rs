/*!
Specialized `Error` and `Result` types for dumpflow.
*/

use crate::types::Address;

use std::{convert, error, fmt, result, str};

/// Specialized `Error` type for dumpflow errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// Generic error type containing a string
    Other(&'static str),
    /// Format mismatch.
    ///
    /// The probed driver does not recognize the input.
    /// Dispatch continues with the next candidate driver.
    FormatMismatch(&'static str),
    /// Malformed dump.
    ///
    /// The format was recognized but is internally inconsistent
    /// (truncated read, register note without an owning CPU, bad
    /// checksum after acceptance). Fatal to the whole session.
    MalformedDump(&'static str),
    /// Address not mapped.
    ///
    /// A memory read was requested outside all registered chunks.
    AddressNotMapped(Address),
    /// Unsupported architecture.
    ///
    /// Wrong bit width or machine type. Treated like a format
    /// mismatch for dispatch purposes.
    UnsupportedArchitecture,
    /// IO error
    ///
    /// Catch-all for io related errors.
    Io(&'static str),
    /// No valid dump format.
    ///
    /// Every candidate driver declined the input.
    NoValidFormat,
    /// Encoding error.
    ///
    /// Catch-all for string related errors such as invalid utf8.
    Encoding,
}

/// Convert from &str to error
impl convert::From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Other(error)
    }
}

/// Convert from str::Utf8Error
impl From<str::Utf8Error> for Error {
    fn from(_err: str::Utf8Error) -> Self {
        Error::Encoding
    }
}

impl Error {
    /// Returns true if dispatch should keep probing further drivers
    /// after this error.
    pub fn is_format_mismatch(self) -> bool {
        matches!(
            self,
            Error::FormatMismatch(_) | Error::UnsupportedArchitecture
        )
    }

    /// Returns a tuple representing the error description and its string value.
    pub fn to_str_pair(self) -> (&'static str, Option<&'static str>) {
        match self {
            Error::Other(e) => ("other error", Some(e)),
            Error::FormatMismatch(e) => ("format mismatch", Some(e)),
            Error::MalformedDump(e) => ("malformed dump", Some(e)),
            Error::AddressNotMapped(_) => ("address not mapped", None),
            Error::UnsupportedArchitecture => ("unsupported architecture", None),
            Error::Io(e) => ("io error", Some(e)),
            Error::NoValidFormat => ("no valid dump format found", None),
            Error::Encoding => ("encoding error", None),
        }
    }

    /// Returns a simple string representation of the error.
    pub fn to_str(self) -> &'static str {
        self.to_str_pair().0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AddressNotMapped(addr) => write!(f, "address not mapped: {:x}", addr),
            _ => {
                let (desc, value) = self.to_str_pair();
                if let Some(value) = value {
                    write!(f, "{}: {}", desc, value)
                } else {
                    f.write_str(desc)
                }
            }
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        self.to_str()
    }
}

/// Specialized `Result` type for dumpflow results.
pub type Result<T> = result::Result<T, Error>;
