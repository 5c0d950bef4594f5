use std::{fmt, io};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Occurs when a value's exact type has no handler in the registry, and the catch-all entry
    /// is either missing or refuses the value. Holds the name of the type.
    UnregisteredType(String),
    /// Occurs when the output sink fails a write or a flush.
    Io(io::Error),
    /// Occurs when a handler produces a tag/representation pair that can't be written: a
    /// representation of the wrong shape for its tag, a composite used as a map key, or a
    /// scalar extension with no string form where one is required.
    MalformedHandlerOutput(String),
    /// Value nesting went past the configured depth limit.
    DepthLimit(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnregisteredType(ref name) => {
                write!(f, "No handler registered for type {}", name)
            }
            Error::Io(ref err) => write!(f, "Output sink failure: {}", err),
            Error::MalformedHandlerOutput(ref err) => {
                write!(f, "Handler output can't be encoded: {}", err)
            }
            Error::DepthLimit(max) => {
                write!(f, "Value nesting exceeded the depth limit of {}", max)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// The single failure returned by [`Writer::write`][crate::Writer::write].
///
/// Whatever went wrong inside the write is kept as the cause, but callers only need one handling
/// path: the value was not (completely) written. Bytes that reached the sink before the failure
/// are not rolled back.
#[derive(Debug)]
pub struct WriteError {
    cause: Error,
}

impl WriteError {
    /// The underlying failure.
    pub fn cause(&self) -> &Error {
        &self.cause
    }

    pub fn into_cause(self) -> Error {
        self.cause
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Write failed: {}", self.cause)
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl std::convert::From<Error> for WriteError {
    fn from(cause: Error) -> Self {
        Self { cause }
    }
}
