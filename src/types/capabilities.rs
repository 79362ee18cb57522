use std::collections::hash_set::Iter;
use std::collections::HashSet;

/// The raw `CAPABILITY` response ([RFC 3501 7.2.1](https://tools.ietf.org/html/rfc3501#section-7.2.1)).
///
/// Names are stored upper-cased and looked up case-insensitively. Unknown names are kept but
/// never acted on; see [`CapabilitySet`] for what the storage layer uses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities(pub(crate) HashSet<String>);

impl Capabilities {
    pub(crate) fn from_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        Capabilities(
            names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_uppercase())
                .collect(),
        )
    }

    /// Whether the server announced `s`, e.g. `UIDPLUS` or `THREAD=REFERENCES`.
    pub fn has(&self, s: &str) -> bool {
        self.0.contains(&s.to_ascii_uppercase())
    }

    /// All announced names, upper-cased.
    pub fn iter(&self) -> Iter<'_, String> {
        self.0.iter()
    }

    /// Number of announced names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was announced.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The capabilities the storage layer acts on, computed once after login.
///
/// `acl` already reflects configuration: it may be switched off even if the server
/// advertises `ACL`, or forced on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapabilitySet {
    /// `IMAP4rev1`
    pub imap4rev1: bool,
    /// `ACL` ([RFC 4314](https://tools.ietf.org/html/rfc4314)), subject to configuration.
    pub acl: bool,
    /// `UIDPLUS` ([RFC 4315](https://tools.ietf.org/html/rfc4315)).
    pub uidplus: bool,
    /// `SORT` ([RFC 5256](https://tools.ietf.org/html/rfc5256)).
    pub sort: bool,
    /// `THREAD=REFERENCES`
    pub thread_references: bool,
    /// `THREAD=ORDEREDSUBJECT`
    pub thread_ordered_subject: bool,
    /// `QUOTA` ([RFC 2087](https://tools.ietf.org/html/rfc2087)).
    pub quota: bool,
    /// `NAMESPACE` ([RFC 2342](https://tools.ietf.org/html/rfc2342)).
    pub namespace: bool,
    /// `UNSELECT` ([RFC 3691](https://tools.ietf.org/html/rfc3691)).
    pub unselect: bool,
    /// Whether subscriptions are honoured. Off when configuration says to ignore them.
    pub subscription: bool,
}

impl CapabilitySet {
    /// Derive the typed set from the raw capability list. `acl` is taken from the server as is,
    /// subscriptions are assumed to be supported.
    pub fn from_capabilities(caps: &Capabilities) -> Self {
        CapabilitySet {
            imap4rev1: caps.has("IMAP4rev1"),
            acl: caps.has("ACL"),
            uidplus: caps.has("UIDPLUS"),
            sort: caps.has("SORT"),
            thread_references: caps.has("THREAD=REFERENCES"),
            thread_ordered_subject: caps.has("THREAD=ORDEREDSUBJECT"),
            quota: caps.has("QUOTA"),
            namespace: caps.has("NAMESPACE"),
            unselect: caps.has("UNSELECT"),
            subscription: true,
        }
    }
}
