use std::collections::HashSet;
use std::fmt;
use std::iter::FromIterator;

pub use imap_proto::types::AclRight;

/// How `SETACL` combines the given rights with the ones an identifier already has.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AclModifyMode {
    /// The identifier ends up with exactly the given rights.
    Replace,
    /// The given rights are granted in addition.
    Add,
    /// The given rights are revoked.
    Remove,
}

impl AclModifyMode {
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            AclModifyMode::Replace => "",
            AclModifyMode::Add => "+",
            AclModifyMode::Remove => "-",
        }
    }
}

/// A set of [RFC 4314](https://datatracker.ietf.org/doc/html/rfc4314#section-2.1) rights.
///
/// Renders as the sorted right letters, e.g. `lrsw`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AclRightList {
    rights: HashSet<AclRight>,
}

impl AclRightList {
    /// Whether `right`, given as a letter or an [`AclRight`], is in the set.
    pub fn has_right<T: Into<AclRight>>(&self, right: T) -> bool {
        self.rights.contains(&right.into())
    }

    /// Whether no right is granted.
    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }

    /// The rights, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = AclRight> + '_ {
        self.rights.iter().copied()
    }
}

impl fmt::Display for AclRightList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters: Vec<char> = self.rights.iter().map(|r| char::from(*r)).collect();
        letters.sort_unstable();
        f.write_str(&letters.into_iter().collect::<String>())
    }
}

impl FromIterator<AclRight> for AclRightList {
    fn from_iter<I: IntoIterator<Item = AclRight>>(iter: I) -> Self {
        AclRightList {
            rights: iter.into_iter().collect(),
        }
    }
}

impl From<&str> for AclRightList {
    fn from(letters: &str) -> Self {
        letters.chars().map(AclRight::from).collect()
    }
}

/// The `ACL` response to `GETACL`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Acl {
    /// Wire name of the mailbox.
    pub mailbox: String,
    /// One entry per identifier, in server order.
    pub acls: Vec<AclEntry>,
}

impl Acl {
    /// The rights of `identifier`, if it has an entry.
    pub fn rights_of(&self, identifier: &str) -> Option<&AclRightList> {
        self.acls
            .iter()
            .find(|e| e.identifier == identifier)
            .map(|e| &e.rights)
    }
}

/// One identifier of an [`Acl`] and its rights.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AclEntry {
    /// A user or group name as the server knows it, e.g. `anyone`.
    pub identifier: String,
    /// What the identifier may do.
    pub rights: AclRightList,
}

/// The `MYRIGHTS` response: what the logged-in user may do on a mailbox.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MyRights {
    /// Wire name of the mailbox.
    pub mailbox: String,
    /// The user's rights.
    pub rights: AclRightList,
}
