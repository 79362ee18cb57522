//! Folder and message operations on top of a logged-in [`Client`].
//!
//! Folder names in this module are *logical* names: levels are joined with `/` and the text is
//! plain UTF-8, whatever separator and encoding the server uses. [`FolderStorage`] and
//! [`MessageStorage`] are short-lived views over the [`Session`] of a
//! [`Connection`](crate::connection::Connection); every operation selects the folders it
//! works on itself.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::acl::{AclCache, IdentityResolver, NoIdentities};
use crate::client::Client;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{AclRightList, CapabilitySet, Mailbox, Namespace, Namespaces, Uid};
use crate::utf7;

pub mod defaults;
mod folder;
mod message;
pub mod search;

pub use self::defaults::DefaultFolders;
pub use self::folder::{FolderDescriptor, FolderState, FolderStorage, FolderUpdate};
pub use self::message::{
    ListRequest, Message, MessageFields, MessageStorage, SortField, SortOrder,
};
pub use self::search::SearchTerm;

/// Spam handling, invoked instead of storing the spam pseudo-flag.
pub trait SpamHandler<T: Read + Write>: Send + Sync {
    /// `uids` in `folder` were marked as spam. `move_messages` asks for them to be moved to the
    /// spam folder.
    fn handle_spam(
        &self,
        messages: &mut MessageStorage<'_, T>,
        folder: &str,
        uids: &[Uid],
        move_messages: bool,
    ) -> Result<()>;

    /// `uids` in `folder` were marked as not spam. `move_messages` asks for them to be moved
    /// back to the inbox.
    fn handle_ham(
        &self,
        messages: &mut MessageStorage<'_, T>,
        folder: &str,
        uids: &[Uid],
        move_messages: bool,
    ) -> Result<()>;
}

/// Spam handling by the `$Junk` and `$NotJunk` keywords most clients and filters understand.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordSpamHandler;

/// Keyword for spam.
pub const JUNK: &str = "$Junk";
/// Keyword for messages confirmed not to be spam.
pub const NOT_JUNK: &str = "$NotJunk";

impl<T: Read + Write> SpamHandler<T> for KeywordSpamHandler {
    fn handle_spam(
        &self,
        messages: &mut MessageStorage<'_, T>,
        folder: &str,
        uids: &[Uid],
        move_messages: bool,
    ) -> Result<()> {
        messages.store_keywords(folder, uids, &[JUNK], &[NOT_JUNK])?;
        if move_messages {
            let spam = messages.default_folders()?.spam;
            if spam != folder {
                messages.move_messages(folder, &spam, uids, false)?;
            }
        }
        Ok(())
    }

    fn handle_ham(
        &self,
        messages: &mut MessageStorage<'_, T>,
        folder: &str,
        uids: &[Uid],
        move_messages: bool,
    ) -> Result<()> {
        messages.store_keywords(folder, uids, &[NOT_JUNK], &[JUNK])?;
        if move_messages && !folder.eq_ignore_ascii_case(INBOX) {
            messages.move_messages(folder, INBOX, uids, false)?;
        }
        Ok(())
    }
}

/// A read-through cache above the storage layer. It is told what became stale and never
/// consulted.
pub trait MessageCache: Send + Sync {
    /// The given messages changed or are gone.
    fn invalidate_messages(&self, folder: &str, uids: &[Uid]);

    /// Everything about `folder` is stale.
    fn invalidate_folder(&self, folder: &str);
}

/// A 1-based, inclusive window into a result list.
///
/// Applying it never fails: a start past the end gives an empty result and an end past the
/// end is clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexRange {
    /// First position, starting at 1.
    pub start: usize,
    /// Last position, inclusive.
    pub end: usize,
}

impl IndexRange {
    /// Positions `start..=end`. A start of 0 is treated as 1.
    pub fn new(start: usize, end: usize) -> Self {
        IndexRange {
            start: start.max(1),
            end,
        }
    }

    /// The part of `items` inside the window.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let len = items.len();
        let start = self.start.max(1);
        if start > len || self.end < start {
            return Vec::new();
        }
        let end = self.end.min(len);
        items.into_iter().skip(start - 1).take(end + 1 - start).collect()
    }
}

/// The name of the inbox, in every namespace layout.
pub const INBOX: &str = "INBOX";

/// The ACL rights storage operations check before sending anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Right {
    Lookup,
    Read,
    KeepSeen,
    Write,
    Insert,
    Create,
    Delete,
    DeleteFolder,
    Administer,
}

impl Right {
    /// The rights letters that grant this, RFC 4314 first, then the RFC 2086 ones.
    fn letters(self) -> &'static [char] {
        match self {
            Right::Lookup => &['l'],
            Right::Read => &['r'],
            Right::KeepSeen => &['s'],
            Right::Write => &['w'],
            Right::Insert => &['i'],
            Right::Create => &['k', 'c'],
            Right::Delete => &['t', 'd'],
            Right::DeleteFolder => &['x', 'c'],
            Right::Administer => &['a'],
        }
    }

    pub(crate) fn letter(self) -> char {
        self.letters()[0]
    }

    pub(crate) fn granted_by(self, rights: &AclRightList) -> bool {
        self.letters().iter().any(|&c| rights.has_right(c))
    }
}

#[derive(Debug, Default)]
struct SessionCache {
    namespaces: Option<Namespaces>,
    rights: HashMap<String, AclRightList>,
    defaults: Option<DefaultFolders>,
}

/// The logged-in state the storage operations share: client, negotiated capabilities,
/// collaborators and per-session caches.
pub struct Session<T: Read + Write> {
    pub(crate) client: Client<T>,
    pub(crate) config: Arc<Config>,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) separator: char,
    pub(crate) login: String,
    pub(crate) identities: Arc<dyn IdentityResolver>,
    pub(crate) spam: Arc<dyn SpamHandler<T>>,
    pub(crate) message_cache: Option<Arc<dyn MessageCache>>,
    pub(crate) acl_cache: AclCache,
    cache: SessionCache,
}

impl<T: Read + Write> Session<T> {
    /// A session over a logged-in client.
    ///
    /// `capabilities` must already reflect configuration, see
    /// [`Session::effective_capabilities`].
    pub fn new(
        client: Client<T>,
        config: Arc<Config>,
        capabilities: CapabilitySet,
        separator: char,
        login: impl Into<String>,
    ) -> Self {
        Session {
            client,
            config,
            capabilities,
            separator,
            login: login.into(),
            identities: Arc::new(NoIdentities),
            spam: Arc::new(KeywordSpamHandler),
            message_cache: None,
            acl_cache: AclCache::new(),
            cache: SessionCache::default(),
        }
    }

    /// Apply configuration to what the server announced.
    pub fn effective_capabilities(server: CapabilitySet, config: &Config) -> CapabilitySet {
        CapabilitySet {
            acl: config.acl_support.resolve(server.acl),
            subscription: server.subscription && !config.ignore_subscription,
            ..server
        }
    }

    /// Use `resolver` to map ACL identifiers to users and groups.
    pub fn with_identities(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identities = resolver;
        self
    }

    /// Use `handler` for the spam pseudo-flag.
    pub fn with_spam_handler(mut self, handler: Arc<dyn SpamHandler<T>>) -> Self {
        self.spam = handler;
        self
    }

    /// Notify `cache` about changes.
    pub fn with_message_cache(mut self, cache: Arc<dyn MessageCache>) -> Self {
        self.message_cache = Some(cache);
        self
    }

    /// The capabilities in effect.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// The underlying client.
    pub fn client(&mut self) -> &mut Client<T> {
        &mut self.client
    }

    /// The wire form of a logical folder name.
    pub(crate) fn wire(&self, logical: &str) -> String {
        let name = if self.separator == '/' {
            logical.to_string()
        } else {
            logical.replace('/', &self.separator.to_string())
        };
        utf7::encode(&name).into_owned()
    }

    /// The logical form of a wire folder name.
    pub(crate) fn logical(&self, wire: &str) -> String {
        let name = utf7::decode(wire);
        if self.separator == '/' {
            name.into_owned()
        } else {
            name.replace(self.separator, "/")
        }
    }

    /// The server's namespaces. Without `NAMESPACE`, one personal namespace at the root.
    pub(crate) fn namespaces(&mut self) -> Result<Namespaces> {
        if let Some(ref namespaces) = self.cache.namespaces {
            return Ok(namespaces.clone());
        }
        let namespaces = if self.capabilities.namespace {
            self.client.namespace()?
        } else {
            Namespaces {
                personal: vec![Namespace {
                    prefix: String::new(),
                    delimiter: Some(self.separator),
                }],
                ..Namespaces::default()
            }
        };
        self.cache.namespaces = Some(namespaces.clone());
        Ok(namespaces)
    }

    /// Our own rights on a folder, `None` if ACLs are not in use.
    pub(crate) fn my_rights(&mut self, wire: &str) -> Result<Option<AclRightList>> {
        if !self.capabilities.acl {
            return Ok(None);
        }
        if let Some(rights) = self.cache.rights.get(wire) {
            return Ok(Some(rights.clone()));
        }
        let rights = self.client.my_rights(wire)?.rights;
        self.cache.rights.insert(wire.to_string(), rights.clone());
        Ok(Some(rights))
    }

    /// Whether we hold `right` on a folder. Always true without ACLs.
    pub(crate) fn has_right(&mut self, wire: &str, right: Right) -> Result<bool> {
        Ok(self
            .my_rights(wire)?
            .map_or(true, |rights| right.granted_by(&rights)))
    }

    /// Fail with [`Error::PermissionDenied`] unless we hold `right` on a folder.
    pub(crate) fn require(&mut self, wire: &str, right: Right) -> Result<()> {
        if self.has_right(wire, right)? {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                folder: self.logical(wire),
                right: right.letter(),
            })
        }
    }

    /// Select a folder. A refused `SELECT` is reported as [`Error::NotFound`].
    pub(crate) fn open(&mut self, wire: &str) -> Result<Mailbox> {
        match self.client.select(wire) {
            Ok(mailbox) => Ok(mailbox),
            Err(Error::CommandFailed { text, .. }) => {
                log::debug!("cannot select {}: {}", wire, text);
                Err(Error::NotFound(self.logical(wire)))
            }
            Err(e) => Err(e),
        }
    }

    /// Leave a folder without expunging it, if it is the selected one.
    pub(crate) fn leave(&mut self, wire: &str) -> Result<()> {
        let selected = self.client.selected().map_or(false, |s| s.name == wire);
        if !selected {
            return Ok(());
        }
        if self.capabilities.unselect {
            self.client.unselect()
        } else {
            // CLOSE on a read-only selection never expunges
            self.client.examine(wire)?;
            self.client.close()
        }
    }

    /// Forget cached rights of a folder and everything below it.
    pub(crate) fn invalidate(&mut self, wire: &str) {
        let below = format!("{}{}", wire, self.separator);
        self.cache
            .rights
            .retain(|name, _| name != wire && !name.starts_with(&below));
    }

    /// The standard folders, created on first use.
    pub(crate) fn default_folders(&mut self) -> Result<DefaultFolders> {
        if let Some(ref defaults) = self.cache.defaults {
            return Ok(defaults.clone());
        }
        let defaults = defaults::bootstrap(self)?;
        self.cache.defaults = Some(defaults.clone());
        Ok(defaults)
    }

    /// The standard folders as far as they are known without creating anything.
    pub(crate) fn default_folder_names(&mut self) -> Result<DefaultFolders> {
        match self.cache.defaults {
            Some(ref defaults) => Ok(defaults.clone()),
            None => defaults::expected(self),
        }
    }

    /// Whether `logical` is the inbox or one of the standard folders.
    pub(crate) fn is_default_folder(&mut self, logical: &str) -> Result<bool> {
        if logical.eq_ignore_ascii_case(INBOX) {
            return Ok(true);
        }
        Ok(self.default_folder_names()?.contains(logical))
    }

    pub(crate) fn invalidate_messages(&self, logical: &str, uids: &[Uid]) {
        if let Some(ref cache) = self.message_cache {
            cache.invalidate_messages(logical, uids);
        }
    }

    pub(crate) fn invalidate_folder(&self, logical: &str) {
        if let Some(ref cache) = self.message_cache {
            cache.invalidate_folder(logical);
        }
    }
}

/// The parent of a logical folder name, `""` for top-level folders.
pub(crate) fn parent_of(logical: &str) -> &str {
    logical.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// The last level of a logical folder name.
pub(crate) fn base_name(logical: &str) -> &str {
    logical.rsplit_once('/').map_or(logical, |(_, name)| name)
}

/// Join a logical parent and a child name.
pub(crate) fn child_of(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Whether `logical` is `ancestor` or lies below it.
pub(crate) fn is_within(logical: &str, ancestor: &str) -> bool {
    logical == ancestor
        || logical
            .strip_prefix(ancestor)
            .map_or(false, |rest| rest.starts_with('/'))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn index_range_clamps() {
        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(IndexRange::new(2, 3).apply(items.clone()), vec![2, 3]);
        assert_eq!(IndexRange::new(4, 10).apply(items.clone()), vec![4, 5]);
        assert_eq!(IndexRange::new(5, 5).apply(items.clone()), vec![5]);
        assert!(IndexRange::new(6, 8).apply(items.clone()).is_empty());
        assert!(IndexRange::new(3, 2).apply(items.clone()).is_empty());
        assert_eq!(IndexRange::new(0, 1).apply(items), vec![1]);
    }

    #[test]
    fn folder_name_helpers() {
        assert_eq!(parent_of("INBOX/Old/Sub"), "INBOX/Old");
        assert_eq!(parent_of("INBOX"), "");
        assert_eq!(base_name("INBOX/Old"), "Old");
        assert_eq!(child_of("", "Trash"), "Trash");
        assert_eq!(child_of("INBOX", "Trash"), "INBOX/Trash");
        assert!(is_within("INBOX/Trash/x", "INBOX/Trash"));
        assert!(is_within("INBOX/Trash", "INBOX/Trash"));
        assert!(!is_within("INBOX/Trashy", "INBOX/Trash"));
    }

    #[test]
    fn wire_names_use_separator_and_utf7() {
        let mut session = session(plain(), Config::default(), &[]);
        session.separator = '.';
        assert_eq!(session.wire("INBOX/Entw\u{fc}rfe"), "INBOX.Entw&APw-rfe");
        assert_eq!(session.logical("INBOX.Entw&APw-rfe"), "INBOX/Entw\u{fc}rfe");
    }

    #[test]
    fn rights_are_cached() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &["* MYRIGHTS \"INBOX\" lrs\r\n{tag} OK done\r\n"],
        );
        assert!(session.has_right("INBOX", Right::Read).unwrap());
        assert!(!session.has_right("INBOX", Right::Write).unwrap());
        assert!(matches!(
            session.require("INBOX", Right::Delete),
            Err(Error::PermissionDenied { right: 't', .. })
        ));
        assert_eq!(commands(&mut session), vec!["MYRIGHTS \"INBOX\""]);
    }

    #[test]
    fn without_acl_everything_is_granted() {
        let mut session = session(plain(), Config::default(), &[]);
        assert!(session.has_right("INBOX", Right::Administer).unwrap());
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn configuration_overrides_capabilities() {
        let server = CapabilitySet {
            acl: true,
            ..plain()
        };
        let config = Config::default()
            .acl_support(crate::config::AclSupport::Disabled)
            .ignore_subscription(true);
        let caps = Session::<crate::mock_stream::MockStream>::effective_capabilities(server, &config);
        assert!(!caps.acl);
        assert!(!caps.subscription);
    }
}
