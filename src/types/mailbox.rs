use std::fmt;

/// Meta-information about a mailbox, as returned by
/// [`SELECT`](https://tools.ietf.org/html/rfc3501#section-6.3.1) and friends.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Mailbox {
    /// Defined flags in the mailbox.
    pub flags: Vec<String>,
    /// The number of messages in the mailbox.
    pub exists: u32,
    /// The number of messages with the \Recent flag set.
    pub recent: u32,
    /// Message sequence number of the first unseen message in the mailbox.
    pub unseen: Option<u32>,
    /// The flags the client can change permanently. `None` if the server sent no
    /// `PERMANENTFLAGS` code, which means all of `flags` are permanent.
    pub permanent_flags: Option<Vec<String>>,
    /// The next unique identifier value.
    pub uid_next: Option<u32>,
    /// The unique identifier validity value.
    pub uid_validity: Option<u32>,
    /// The mailbox was selected read-only.
    pub read_only: bool,
}

impl Mailbox {
    /// Whether user-defined keywords can be stored in this mailbox.
    ///
    /// True if `PERMANENTFLAGS` contains `\*` or any flag that is not a system flag.
    pub fn supports_user_flags(&self) -> bool {
        match self.permanent_flags {
            Some(ref flags) => supports_user_flags(flags),
            None => false,
        }
    }
}

/// Scan a `PERMANENTFLAGS` list for evidence of keyword support.
pub(crate) fn supports_user_flags<S: AsRef<str>>(flags: &[S]) -> bool {
    flags.iter().map(AsRef::as_ref).any(|f| f == "\\*" || !f.starts_with('\\'))
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flags: {:?}, exists: {}, recent: {}, unseen: {:?}, permanent_flags: {:?}, \
             uid_next: {:?}, uid_validity: {:?}, read_only: {}",
            self.flags,
            self.exists,
            self.recent,
            self.unseen,
            self.permanent_flags,
            self.uid_next,
            self.uid_validity,
            self.read_only,
        )
    }
}
