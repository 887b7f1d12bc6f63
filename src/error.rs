use std::fmt::Display;

/// Error produced while decoding descriptors or building an identifier database.
///
/// Decoding never returns this as a hard failure: it is attached to the
/// partially decoded record it applies to (see [`crate::Decoded`] and
/// [`crate::InterfaceGroup::error`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) message: &'static str,
    pub(crate) offset: Option<usize>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            offset: None,
        }
    }

    pub(crate) fn at(kind: ErrorKind, message: &'static str, offset: usize) -> Self {
        Self {
            kind,
            message,
            offset: Some(offset),
        }
    }

    /// Error for a [`Transport`][crate::Transport] implementation to return when it
    /// can't poll an endpoint.
    pub fn transport(message: &'static str) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    #[track_caller]
    pub(crate) fn log_warn(self) -> Self {
        log::warn!("{}", self);
        self
    }

    #[track_caller]
    pub(crate) fn log_debug(self) -> Self {
        log::debug!("{}", self);
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Position the error refers to.
    ///
    /// * For descriptor errors this is the byte offset into the configuration descriptor.
    /// * For `usb.ids` parse errors this is the 1-based line number.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        match (self.kind, self.offset) {
            (ErrorKind::InvalidDatabase, Some(line)) => write!(f, " (line {line})"),
            (_, Some(offset)) => write!(f, " (at byte {offset})"),
            (_, None) => Ok(()),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind {
            ErrorKind::OutOfBuffers => std::io::ErrorKind::OutOfMemory,
            ErrorKind::Transport => std::io::ErrorKind::Other,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}

/// General category of error as part of an [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A length is inconsistent with the minimum structure size, or a required
    /// descriptor is missing. Stops the walk of the configuration.
    CorruptedDescriptor,

    /// An interface is shorter than its class-specific layout requires.
    LengthOverflow,

    /// The class-specific descriptor after an interface has the wrong type.
    BadDescriptorType,

    /// A descriptor expected to be an endpoint is something else.
    BadEndpointType,

    /// A class-specific descriptor subtype is not recognized.
    UnsupportedSubtype,

    /// No receive buffer is left in the [`BufferPool`][crate::BufferPool].
    OutOfBuffers,

    /// The transport refused to register an endpoint for polling.
    Transport,

    /// Identifier tables are malformed.
    InvalidDatabase,

    /// A string descriptor is malformed.
    InvalidString,
}

#[test]
fn test_display() {
    let e = Error::at(ErrorKind::CorruptedDescriptor, "expected interface descriptor", 18);
    assert_eq!(e.to_string(), "expected interface descriptor (at byte 18)");

    let e = Error::at(ErrorKind::InvalidDatabase, "invalid vendor id", 3);
    assert_eq!(e.to_string(), "invalid vendor id (line 3)");

    let e = Error::new(ErrorKind::OutOfBuffers, "no free receive buffer");
    assert_eq!(e.to_string(), "no free receive buffer");
    assert_eq!(e.offset(), None);

    let io: std::io::Error = e.into();
    assert_eq!(io.kind(), std::io::ErrorKind::OutOfMemory);
}
