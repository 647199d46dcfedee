use core::fmt;

/// Failure modes for every fallible entry point.
///
/// This is the idiomatic-Rust rendition of the C source's `mempool_status`
/// enum: the `ok` member becomes `Result::Ok` and everything else becomes a
/// variant here. Every failure is local; nothing here is retried, logged,
/// or thrown by the crate itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A required pointer argument was null.
    NullPointer,
    /// The buffer size is not a power of two, or a zero-length claim was requested.
    SizeError,
    /// `init` was given a buffer too small to hold a single partition, or `claim`
    /// could not find a free partition large enough.
    OutOfMemory,
    /// `release` was called with a pointer that fails the sanity-check magic
    /// (when the `sanity-check` feature is enabled) or whose partition is not
    /// currently occupied (e.g. a double release).
    InvalidMemory,
    /// The intrusive list primitive reported a failure that the allocator
    /// could not have anticipated given valid inputs (e.g. a split tried to
    /// splice a node whose links were not zeroed).
    Generic,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::NullPointer => "null pointer argument",
            Error::SizeError => "buffer size is not a power of two, or claim length was zero",
            Error::OutOfMemory => "no free partition large enough to satisfy the request",
            Error::InvalidMemory => "pointer does not refer to a currently occupied partition",
            Error::Generic => "internal list primitive failed unexpectedly",
        };
        f.write_str(msg)
    }
}
