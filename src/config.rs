//! Settings that shape how the storage layer talks to a server.

use std::fmt;
use std::time::Duration;

/// Whether ACL checks and ACL commands are used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AclSupport {
    /// Use ACLs if the server announces the `ACL` capability.
    #[default]
    Auto,
    /// Always use ACLs.
    Enabled,
    /// Never use ACLs, every right is assumed to be granted.
    Disabled,
}

impl AclSupport {
    /// Resolve against what the server announced.
    pub fn resolve(self, server_has_acl: bool) -> bool {
        match self {
            AclSupport::Auto => server_has_acl,
            AclSupport::Enabled => true,
            AclSupport::Disabled => false,
        }
    }
}

/// Settings of the idle-connection watchdog.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatcherConfig {
    /// Whether connections are watched at all.
    pub enabled: bool,
    /// Time between two scans.
    pub interval: Duration,
    /// How long a connection may be used by one caller before it is reported.
    pub threshold: Duration,
    /// Whether reported connections are also closed.
    pub force_close: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            enabled: true,
            interval: Duration::from_secs(10),
            threshold: Duration::from_secs(30),
            force_close: false,
        }
    }
}

/// Names of the six standard folders, relative to the default folder prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultFolderNames {
    /// Drafts
    pub drafts: String,
    /// Sent messages
    pub sent: String,
    /// Spam
    pub spam: String,
    /// Messages confirmed as spam
    pub confirmed_spam: String,
    /// Messages confirmed as ham
    pub confirmed_ham: String,
    /// Trash
    pub trash: String,
}

impl Default for DefaultFolderNames {
    fn default() -> Self {
        DefaultFolderNames {
            drafts: "Drafts".into(),
            sent: "Sent".into(),
            spam: "Spam".into(),
            confirmed_spam: "Confirmed Spam".into(),
            confirmed_ham: "Confirmed Ham".into(),
            trash: "Trash".into(),
        }
    }
}

impl DefaultFolderNames {
    /// The names in their fixed order: drafts, sent, spam, confirmed spam, confirmed ham, trash.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.drafts.as_str(),
            self.sent.as_str(),
            self.spam.as_str(),
            self.confirmed_spam.as_str(),
            self.confirmed_ham.as_str(),
            self.trash.as_str(),
        ]
        .into_iter()
    }
}

/// Storage layer settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Whether ACLs are used.
    pub acl_support: AclSupport,
    /// Whether user-defined flags (color labels, keywords) are stored at all.
    pub user_flags_enabled: bool,
    /// Treat every folder as subscribed and never filter by `LSUB`.
    pub ignore_subscription: bool,
    /// Whether the spam pseudo-flag is handed to spam handling.
    pub spam_enabled: bool,
    /// Watchdog settings.
    pub watcher: WatcherConfig,
    /// Allow the standard folders below `INBOX` even if the server uses the alternative
    /// namespace.
    pub allow_nested_default_folders_on_alt_namespace: bool,
    /// Maximum number of UIDs in one `UID FETCH`.
    pub fetch_limit: usize,
    /// Read timeout of the transport, `None` for blocking forever.
    pub read_timeout: Option<Duration>,
    /// Names of the standard folders.
    pub default_folders: DefaultFolderNames,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            acl_support: AclSupport::Auto,
            user_flags_enabled: true,
            ignore_subscription: false,
            spam_enabled: false,
            watcher: WatcherConfig::default(),
            allow_nested_default_folders_on_alt_namespace: false,
            fetch_limit: 1000,
            read_timeout: Some(Duration::from_secs(60)),
            default_folders: DefaultFolderNames::default(),
        }
    }
}

impl Config {
    /// Set how ACLs are used.
    pub fn acl_support(mut self, acl_support: AclSupport) -> Self {
        self.acl_support = acl_support;
        self
    }

    /// Enable or disable user-defined flags.
    pub fn user_flags_enabled(mut self, enabled: bool) -> Self {
        self.user_flags_enabled = enabled;
        self
    }

    /// Ignore subscriptions.
    pub fn ignore_subscription(mut self, ignore: bool) -> Self {
        self.ignore_subscription = ignore;
        self
    }

    /// Enable or disable spam handling.
    pub fn spam_enabled(mut self, enabled: bool) -> Self {
        self.spam_enabled = enabled;
        self
    }

    /// Replace the watchdog settings.
    pub fn watcher(mut self, watcher: WatcherConfig) -> Self {
        self.watcher = watcher;
        self
    }

    /// Allow nested standard folders on an alternative namespace.
    pub fn allow_nested_default_folders_on_alt_namespace(mut self, allow: bool) -> Self {
        self.allow_nested_default_folders_on_alt_namespace = allow;
        self
    }

    /// Set the `UID FETCH` batch size. Zero is treated as one.
    pub fn fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Set the transport read timeout.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Replace the standard folder names.
    pub fn default_folders(mut self, names: DefaultFolderNames) -> Self {
        self.default_folders = names;
        self
    }
}

/// Address and credentials of one mail account.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub login: String,
    /// Password.
    pub password: String,
}

impl Account {
    /// An account on `host:port`.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Account {
            host: host.into(),
            port,
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_resolution() {
        assert!(AclSupport::Auto.resolve(true));
        assert!(!AclSupport::Auto.resolve(false));
        assert!(AclSupport::Enabled.resolve(false));
        assert!(!AclSupport::Disabled.resolve(true));
    }

    #[test]
    fn builder() {
        let config = Config::default().fetch_limit(0).spam_enabled(true);
        assert_eq!(config.fetch_limit, 1);
        assert!(config.spam_enabled);
        assert_eq!(config.default_folders.iter().count(), 6);
    }

    #[test]
    fn password_not_in_debug() {
        let account = Account::new("imap.example.com", 993, "joe", "secret");
        assert!(!format!("{:?}", account).contains("secret"));
    }
}
