use std::fmt;

use super::{ResponseCode, Responses, Uid};

/// Meta-information about messages, as returned by
/// [`APPEND`](https://tools.ietf.org/html/rfc3501#section-6.3.11).
/// Note that `APPEND` only returns any data if the
/// [`UIDPLUS`](https://tools.ietf.org/html/rfc4315) extension is enabled.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Appended {
    /// The unique identifier validity value of the mailbox that the message was appended to.
    pub uid_validity: Option<u32>,

    /// The unique identifier values of the messages that were appended.
    pub uids: Option<Vec<Uid>>,
}

impl Appended {
    pub(crate) fn from_responses(responses: &Responses) -> Self {
        responses
            .codes()
            .find_map(|code| match code {
                ResponseCode::AppendUid { uid_validity, uids } => Some(Appended {
                    uid_validity: Some(*uid_validity),
                    uids: Some(uids.clone()),
                }),
                _ => None,
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for Appended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uid_validity: {:?}, uids: {:?}",
            self.uid_validity, self.uids,
        )
    }
}

/// The `COPYUID` result of a `COPY`, if the server sent one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Copied {
    /// The unique identifier validity value of the destination mailbox.
    pub uid_validity: Option<u32>,

    /// Pairs of `(source, destination)` UIDs.
    pub mapping: Option<Vec<(Uid, Uid)>>,
}

impl Copied {
    pub(crate) fn from_responses(responses: &Responses) -> Self {
        responses
            .codes()
            .find_map(|code| match code {
                ResponseCode::CopyUid {
                    uid_validity,
                    source,
                    destination,
                } if source.len() == destination.len() => Some(Copied {
                    uid_validity: Some(*uid_validity),
                    mapping: Some(source.iter().copied().zip(destination.iter().copied()).collect()),
                }),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// The destination UID of `source`, if the mapping is known.
    pub fn destination_of(&self, source: Uid) -> Option<Uid> {
        self.mapping
            .as_ref()?
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, d)| *d)
    }
}
