/// One namespace entry of a [`NAMESPACE`](https://tools.ietf.org/html/rfc2342#section-5)
/// response: a prefix and the hierarchy delimiter used below it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Namespace {
    /// The prefix, for example `INBOX.` or `Other Users/`. Empty for an alternative namespace.
    pub prefix: String,
    /// The hierarchy delimiter, `None` for a flat namespace.
    pub delimiter: Option<char>,
}

impl Namespace {
    /// The prefix without its trailing delimiter, i.e. the full name of the folder the
    /// namespace is rooted at.
    pub fn root_name(&self) -> &str {
        match self.delimiter {
            Some(d) => self.prefix.strip_suffix(d).unwrap_or(&self.prefix),
            None => &self.prefix,
        }
    }
}

/// The three classes of namespaces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NamespaceKind {
    /// The user's own mailboxes.
    Personal,
    /// Mailboxes of other users shared with this user.
    OtherUsers,
    /// Mailboxes shared among users.
    Shared,
}

/// The parsed answer to `NAMESPACE`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Namespaces {
    /// Personal namespaces.
    pub personal: Vec<Namespace>,
    /// Other users' namespaces.
    pub other_users: Vec<Namespace>,
    /// Shared namespaces.
    pub shared: Vec<Namespace>,
}

impl Namespaces {
    /// All namespaces with their kind, personal first.
    pub fn iter(&self) -> impl Iterator<Item = (NamespaceKind, &Namespace)> {
        self.personal
            .iter()
            .map(|n| (NamespaceKind::Personal, n))
            .chain(self.other_users.iter().map(|n| (NamespaceKind::OtherUsers, n)))
            .chain(self.shared.iter().map(|n| (NamespaceKind::Shared, n)))
    }

    /// The server uses the "alternative namespace": the personal namespace has an empty prefix,
    /// so user folders are siblings of `INBOX` instead of its children.
    pub fn is_alt_namespace(&self) -> bool {
        self.personal.iter().any(|n| n.prefix.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_name_strips_delimiter() {
        let ns = Namespace {
            prefix: "Other Users/".into(),
            delimiter: Some('/'),
        };
        assert_eq!(ns.root_name(), "Other Users");
        let ns = Namespace {
            prefix: "".into(),
            delimiter: Some('.'),
        };
        assert_eq!(ns.root_name(), "");
    }

    #[test]
    fn alt_namespace() {
        let mut ns = Namespaces {
            personal: vec![Namespace {
                prefix: "INBOX/".into(),
                delimiter: Some('/'),
            }],
            ..Namespaces::default()
        };
        assert!(!ns.is_alt_namespace());
        ns.personal[0].prefix.clear();
        assert!(ns.is_alt_namespace());
        assert_eq!(ns.iter().count(), 1);
    }
}
