use std::fmt;

use super::Uid;

/// The status word of a status response, see [section 7.1 of RFC
/// 3501](https://tools.ietf.org/html/rfc3501#section-7.1).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Status {
    /// The command completed successfully, or an informational message.
    Ok,
    /// The command failed, for an operational reason.
    No,
    /// The command was not understood or not allowed in the current state.
    Bad,
    /// The connection starts authenticated.
    PreAuth,
    /// The server is about to close the connection.
    Bye,
}

impl Status {
    pub(crate) fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("OK") {
            Some(Status::Ok)
        } else if word.eq_ignore_ascii_case("NO") {
            Some(Status::No)
        } else if word.eq_ignore_ascii_case("BAD") {
            Some(Status::Bad)
        } else if word.eq_ignore_ascii_case("PREAUTH") {
            Some(Status::PreAuth)
        } else if word.eq_ignore_ascii_case("BYE") {
            Some(Status::Bye)
        } else {
            None
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::No => "NO",
            Status::Bad => "BAD",
            Status::PreAuth => "PREAUTH",
            Status::Bye => "BYE",
        })
    }
}

/// A bracketed response code carried by a status response, see [section 7.1 of RFC
/// 3501](https://tools.ietf.org/html/rfc3501#section-7.1) and [RFC
/// 4315](https://tools.ietf.org/html/rfc4315#section-3).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseCode {
    /// The text is an alert that must be presented to the user.
    Alert,
    /// The server failed to parse the headers of a message.
    Parse,
    /// The mailbox is selected read-only.
    ReadOnly,
    /// The mailbox is selected read-write.
    ReadWrite,
    /// The target mailbox of an `APPEND` or `COPY` does not exist but could be created.
    TryCreate,
    /// Flags the client can change permanently.
    PermanentFlags(Vec<String>),
    /// The unique identifier validity value.
    UidValidity(u32),
    /// The predicted next unique identifier value.
    UidNext(u32),
    /// The first message without `\Seen`.
    Unseen(u32),
    /// `UIDPLUS` result of an `APPEND`.
    AppendUid {
        /// Validity of the destination mailbox.
        uid_validity: u32,
        /// UIDs assigned to the appended messages.
        uids: Vec<Uid>,
    },
    /// `UIDPLUS` result of a `COPY`.
    CopyUid {
        /// Validity of the destination mailbox.
        uid_validity: u32,
        /// Source UIDs, in the order the server assigned destination UIDs.
        source: Vec<Uid>,
        /// Destination UIDs, position by position matching `source`.
        destination: Vec<Uid>,
    },
    /// Capabilities sent along with a greeting or login completion.
    Capability(Vec<String>),
    /// [RFC 5530](https://tools.ietf.org/html/rfc5530): the operation exceeded a quota.
    OverQuota,
    /// [RFC 5530](https://tools.ietf.org/html/rfc5530): the target already exists.
    AlreadyExists,
    /// [RFC 5530](https://tools.ietf.org/html/rfc5530): the target does not exist.
    NonExistent,
    /// Any other response code, with its raw argument text.
    Other(String, Option<String>),
}

/// An untagged line of data, such as `* 3 EXISTS`, `* SEARCH 2 4` or `* LIST () "/" INBOX`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Data {
    /// The leading number of message data (`EXISTS`, `EXPUNGE`, `FETCH`, ...).
    pub number: Option<u32>,
    /// The upper-cased keyword that identifies the kind of data.
    pub keyword: String,
    /// Everything after the keyword and its separating space, including literals.
    pub(crate) args: Vec<u8>,
    /// The entire line as received.
    pub(crate) raw: Vec<u8>,
}

impl Data {
    /// Everything after the keyword, as UTF-8 if possible.
    pub fn args(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.args)
    }

    /// The entire line as received, including trailing CRLF.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// A single response received while a command was running, other than its tagged completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// An untagged status response (`* OK [UIDNEXT 4] ...`).
    Status {
        /// The status word.
        status: Status,
        /// The response code, if any.
        code: Option<ResponseCode>,
        /// The human-readable text.
        text: String,
    },
    /// Untagged data.
    Data(Data),
    /// A command continuation request (`+ ...`).
    Continue(String),
}

/// The tagged line that terminates the response to a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The tag, which matches the command.
    pub tag: String,
    /// `OK`, `NO` or `BAD`.
    pub status: Status,
    /// The response code, if any.
    pub code: Option<ResponseCode>,
    /// The human-readable text.
    pub text: String,
}

/// Everything the server sent in answer to one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Responses {
    /// Untagged and continuation responses, in the order they arrived.
    pub responses: Vec<Response>,
    /// The tagged completion.
    pub completion: Completion,
}

impl Responses {
    /// An empty, successful result. Used where a server's `NO` is known to mean "nothing
    /// matched".
    pub(crate) fn empty(tag: String) -> Self {
        Responses {
            responses: Vec::new(),
            completion: Completion {
                tag,
                status: Status::Ok,
                code: None,
                text: String::new(),
            },
        }
    }

    /// Iterate over untagged data with the given keyword.
    pub fn data<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Data> + 'a {
        self.responses.iter().filter_map(move |r| match r {
            Response::Data(d) if d.keyword == keyword => Some(d),
            _ => None,
        })
    }

    /// Iterate over all response codes, untagged ones first, then the completion's.
    pub fn codes(&self) -> impl Iterator<Item = &ResponseCode> {
        self.responses
            .iter()
            .filter_map(|r| match r {
                Response::Status { code, .. } => code.as_ref(),
                _ => None,
            })
            .chain(self.completion.code.as_ref())
    }
}
