//! IMAP error types.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
#[cfg(feature = "native-tls")]
use std::net::TcpStream;
use std::result;
use std::str::Utf8Error;
use std::string::FromUtf8Error;

use bufstream::IntoInnerError as BufError;
#[cfg(feature = "native-tls")]
use native_tls::Error as TlsError;
#[cfg(feature = "native-tls")]
use native_tls::HandshakeError as TlsHandshakeError;
use lazy_static::lazy_static;
use regex::RegexSet;

use crate::types::{ResponseCode, Status, Uid};

/// A convenience wrapper around `Result` for `imap_store::Error`.
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur in the IMAP client and the storage layer above it.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred outside an established session, e.g. while dialing.
    Io(IoError),
    /// An error from the `native_tls` library during the TLS handshake.
    #[cfg(feature = "native-tls")]
    TlsHandshake(TlsHandshakeError<TcpStream>),
    /// An error from the `native_tls` library while managing the socket.
    #[cfg(feature = "native-tls")]
    Tls(TlsError),
    /// The connection was terminated: the server sent `BYE`, the transport failed, or the
    /// connection was closed from another thread. The connection must not be used again.
    ConnectionLost,
    /// The server completed a command with `NO` or `BAD`.
    CommandFailed {
        /// `No` or `Bad`.
        status: Status,
        /// The refined failure kind, derived from the server's text.
        kind: CommandFailureKind,
        /// The human-readable text sent by the server.
        text: String,
    },
    /// A pre-flight ACL check failed. No command was sent.
    PermissionDenied {
        /// The folder the right was checked on.
        folder: String,
        /// The right that was missing.
        right: char,
    },
    /// The named folder or message does not exist.
    NotFound(String),
    /// A folder with the given full name already exists.
    DuplicateFolder(String),
    /// Standard folders can neither be moved nor renamed.
    DefaultFolder(String),
    /// A permission update would leave the folder without any administrator.
    NoAdministrator(String),
    /// Source and destination of a move are the same folder.
    SameFolder(String),
    /// The server lacks a capability the operation cannot do without.
    Unsupported(&'static str),
    /// A multi-step operation failed part-way through. Earlier phases took effect.
    PartiallyCompleted {
        /// The phase that failed.
        phase: Phase,
        /// The message UIDs affected, if the operation was message based.
        uids: Vec<Uid>,
        /// The failure of the phase.
        source: Box<Error>,
    },
    /// Error parsing a server response.
    Parse(ParseError),
    /// Command inputs were not valid [IMAP
    /// strings](https://tools.ietf.org/html/rfc3501#section-4.3) or folder names.
    Validate(ValidateError),
}

impl Error {
    /// Build a [`Error::CommandFailed`] from the response code, or by sniffing the server text
    /// for known conditions if the code says nothing.
    pub(crate) fn command_failed(
        status: Status,
        code: Option<&ResponseCode>,
        text: String,
    ) -> Error {
        let kind = code
            .and_then(CommandFailureKind::from_code)
            .unwrap_or_else(|| CommandFailureKind::classify(&text));
        Error::CommandFailed { status, kind, text }
    }

    /// Wrap this error as the failure of `phase` of a multi-step operation.
    pub(crate) fn in_phase(self, phase: Phase, uids: &[Uid]) -> Error {
        match self {
            // keep the innermost phase, it is the one the caller has to resume from
            e @ Error::PartiallyCompleted { .. } => e,
            e => Error::PartiallyCompleted {
                phase,
                uids: uids.to_vec(),
                source: Box::new(e),
            },
        }
    }

    /// Returns true if the connection this error came from is no longer usable.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Error::ConnectionLost => true,
            Error::PartiallyCompleted { source, .. } => source.is_connection_lost(),
            _ => false,
        }
    }

    /// The refined failure kind, if this is a [`Error::CommandFailed`].
    pub fn failure_kind(&self) -> Option<CommandFailureKind> {
        match self {
            Error::CommandFailed { kind, .. } => Some(*kind),
            Error::PartiallyCompleted { source, .. } => source.failure_kind(),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl<T> From<BufError<T>> for Error {
    fn from(err: BufError<T>) -> Error {
        Error::Io(err.into())
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsHandshakeError<TcpStream>> for Error {
    fn from(err: TlsHandshakeError<TcpStream>) -> Error {
        Error::TlsHandshake(err)
    }
}

#[cfg(feature = "native-tls")]
impl From<TlsError> for Error {
    fn from(err: TlsError) -> Error {
        Error::Tls(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => fmt::Display::fmt(e, f),
            Error::ConnectionLost => f.write_str("Connection lost"),
            Error::CommandFailed {
                status,
                kind,
                ref text,
            } => write!(f, "{} response ({}): {}", status, kind, text),
            Error::PermissionDenied { ref folder, right } => {
                write!(f, "Missing right '{}' on folder {}", right, folder)
            }
            Error::NotFound(ref what) => write!(f, "Not found: {}", what),
            Error::DuplicateFolder(ref name) => write!(f, "Folder already exists: {}", name),
            Error::DefaultFolder(ref name) => {
                write!(f, "Standard folder cannot be moved or renamed: {}", name)
            }
            Error::NoAdministrator(ref name) => {
                write!(f, "Permissions leave folder {} without administrator", name)
            }
            Error::SameFolder(ref name) => {
                write!(f, "Source and destination are the same folder: {}", name)
            }
            Error::Unsupported(cap) => write!(f, "Server lacks capability {}", cap),
            Error::PartiallyCompleted {
                phase,
                ref uids,
                ref source,
            } => {
                write!(f, "Operation failed in phase {}", phase)?;
                if !uids.is_empty() {
                    write!(f, " (uids {:?})", uids)?;
                }
                write!(f, ": {}", source)
            }
            Error::Parse(ref e) => fmt::Display::fmt(e, f),
            Error::Validate(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl StdError for Error {
    #[allow(deprecated)]
    fn description(&self) -> &str {
        match *self {
            Error::Io(ref e) => e.description(),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => e.description(),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => e.description(),
            Error::Parse(ref e) => e.description(),
            Error::Validate(ref e) => e.description(),
            Error::ConnectionLost => "Connection lost",
            Error::CommandFailed { .. } => "Command failed",
            Error::PermissionDenied { .. } => "Permission denied",
            Error::NotFound(_) => "Not found",
            Error::DuplicateFolder(_) => "Duplicate folder",
            Error::DefaultFolder(_) => "Standard folder",
            Error::NoAdministrator(_) => "No administrator",
            Error::SameFolder(_) => "Same folder",
            Error::Unsupported(_) => "Unsupported",
            Error::PartiallyCompleted { .. } => "Partially completed",
        }
    }

    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::Tls(ref e) => Some(e),
            #[cfg(feature = "native-tls")]
            Error::TlsHandshake(ref e) => Some(e),
            Error::Parse(ParseError::DataNotUtf8(_, ref e)) => Some(e),
            Error::PartiallyCompleted { ref source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// What a `NO` or `BAD` completion most likely means.
///
/// IMAP has no structured error codes for these conditions, so they are recognized by
/// the text servers commonly send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandFailureKind {
    /// The mailbox or account is over quota.
    QuotaExceeded,
    /// The server refused a flag it considers an invalid system flag.
    InvalidSystemFlag,
    /// The server does not know or does not allow the command.
    UnsupportedCommand,
    /// The mailbox to create already exists.
    AlreadyExists,
    /// Anything else.
    Generic,
}

lazy_static! {
    static ref FAILURE_PATTERNS: RegexSet = RegexSet::new([
        r"(?i)over\s*quota|quota\s+exceeded|\[overquota\]",
        r"(?i)invalid\s+system\s+flag",
        r"(?i)unknown\s+command|unsupported\s+command|command\s+unrecognized|not\s+supported|\bunknown\s+.*\bcommand",
    ])
    .unwrap();
}

impl CommandFailureKind {
    /// The kind an [RFC 5530](https://tools.ietf.org/html/rfc5530) response code stands for.
    pub fn from_code(code: &ResponseCode) -> Option<Self> {
        match code {
            ResponseCode::OverQuota => Some(CommandFailureKind::QuotaExceeded),
            ResponseCode::AlreadyExists => Some(CommandFailureKind::AlreadyExists),
            _ => None,
        }
    }

    /// Classify the text of a `NO` or `BAD` response.
    pub fn classify(text: &str) -> Self {
        let matches = FAILURE_PATTERNS.matches(text);
        if matches.matched(0) {
            CommandFailureKind::QuotaExceeded
        } else if matches.matched(1) {
            CommandFailureKind::InvalidSystemFlag
        } else if matches.matched(2) {
            CommandFailureKind::UnsupportedCommand
        } else {
            CommandFailureKind::Generic
        }
    }
}

impl fmt::Display for CommandFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandFailureKind::QuotaExceeded => "quota exceeded",
            CommandFailureKind::InvalidSystemFlag => "invalid system flag",
            CommandFailureKind::UnsupportedCommand => "unsupported command",
            CommandFailureKind::AlreadyExists => "already exists",
            CommandFailureKind::Generic => "failed",
        })
    }
}

/// The step of a multi-step operation, reported by [`Error::PartiallyCompleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Creating the destination folder of a folder move.
    CreateDestination,
    /// Copying the ACL of a moved folder.
    CopyAcl,
    /// Copying messages into a destination.
    CopyMessages,
    /// Moving the subfolders of a moved folder.
    MoveSubfolders,
    /// Deleting the source of a folder move.
    DeleteSource,
    /// Marking moved or deleted messages `\Deleted`.
    FlagDeleted,
    /// Expunging, including the fallback for servers without `UID EXPUNGE`.
    Expunge,
    /// Re-applying subscriptions after a rename.
    RestoreSubscriptions,
    /// Applying requested permissions.
    ApplyPermissions,
    /// Discovering destination UIDs after `COPY` or `APPEND`.
    DiscoverUids,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::CreateDestination => "create-destination",
            Phase::CopyAcl => "copy-acl",
            Phase::CopyMessages => "copy-messages",
            Phase::MoveSubfolders => "move-subfolders",
            Phase::DeleteSource => "delete-source",
            Phase::FlagDeleted => "flag-deleted",
            Phase::Expunge => "expunge",
            Phase::RestoreSubscriptions => "restore-subscriptions",
            Phase::ApplyPermissions => "apply-permissions",
            Phase::DiscoverUids => "discover-uids",
        })
    }
}

/// An error occured while trying to parse a server response.
#[derive(Debug)]
pub enum ParseError {
    /// Indicates an error parsing the status response. Such as OK, NO, and BAD.
    Invalid(Vec<u8>),
    /// A `SORT` response contained something other than message numbers.
    SortResult(String),
    /// The tagged completion carried an unexpected tag.
    Tag(String),
    /// The client could not find or decode the server's authentication challenge.
    Authentication(String),
    /// The client received data that was not UTF-8 encoded.
    DataNotUtf8(Vec<u8>, Utf8Error),
}

impl ParseError {
    pub(crate) fn not_utf8(data: &[u8], err: Utf8Error) -> Self {
        ParseError::DataNotUtf8(data.to_vec(), err)
    }
}

impl From<FromUtf8Error> for ParseError {
    fn from(err: FromUtf8Error) -> Self {
        let e = err.utf8_error();
        ParseError::DataNotUtf8(err.into_bytes(), e)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::Invalid(ref data) => write!(
                f,
                "Unable to parse response: {:?}",
                String::from_utf8_lossy(data)
            ),
            ParseError::SortResult(ref token) => {
                write!(f, "Unable to parse SORT result token {:?}", token)
            }
            ParseError::Tag(ref tag) => write!(f, "Unexpected completion tag {}", tag),
            ParseError::Authentication(ref line) => {
                write!(f, "Unable to parse authentication response: {}", line)
            }
            ParseError::DataNotUtf8(_, ref e) => write!(f, "Data is not UTF-8: {}", e),
        }
    }
}

impl StdError for ParseError {
    #[allow(deprecated)]
    fn description(&self) -> &str {
        match *self {
            ParseError::Invalid(_) => "Unable to parse status response",
            ParseError::SortResult(_) => "Unable to parse SORT response",
            ParseError::Tag(_) => "Unexpected completion tag",
            ParseError::Authentication(_) => "Unable to parse authentication response",
            ParseError::DataNotUtf8(..) => "Unable to parse data as UTF-8 text",
        }
    }

    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ParseError::DataNotUtf8(_, ref e) => Some(e),
            _ => None,
        }
    }
}

/// An [invalid character](https://tools.ietf.org/html/rfc3501#section-4.3) was found in an input
/// string, or a folder name contained its hierarchy separator.
#[derive(Debug)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print character in debug form because invalid ones are often whitespaces
        write!(f, "Invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {
    #[allow(deprecated)]
    fn description(&self) -> &str {
        "Invalid character in input"
    }
}
