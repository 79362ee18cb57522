//! One account's connection: dial, greet, log in, hand out storage views, close.

use std::fmt;
use std::sync::Arc;

use crate::acl::{IdentityResolver, NoIdentities};
use crate::client::Client;
use crate::config::{Account, Config};
use crate::conn::Dialer;
use crate::error::{Error, Result};
use crate::storage::{FolderStorage, MessageCache, MessageStorage, Session, SpamHandler};
use crate::types::CapabilitySet;
use crate::watchdog::{ConnectionMonitor, Registration, Watchdog};

/// Where a [`Connection`] is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Never connected, or the transport was found to be gone.
    Disconnected,
    /// Dialing and logging in.
    Connecting,
    /// Logged in.
    Connected,
    /// Closed by its owner.
    Closed,
}

/// A logged-in IMAP session for one account.
///
/// A connection belongs to one thread at a time. Transport loss is noticed lazily: the command
/// that runs into it fails with [`Error::ConnectionLost`], and the next request for a storage
/// view moves the connection to [`State::Disconnected`]. [`Connection::connect`] then logs in
/// again.
pub struct Connection<D: Dialer> {
    dialer: D,
    account: Account,
    config: Arc<Config>,
    state: State,
    session: Option<Session<D::Stream>>,
    monitor: Arc<ConnectionMonitor>,
    registration: Option<Registration>,
    identities: Arc<dyn IdentityResolver>,
    spam: Option<Arc<dyn SpamHandler<D::Stream>>>,
    message_cache: Option<Arc<dyn MessageCache>>,
}

impl<D: Dialer> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("account", &self.account)
            .field("state", &self.state)
            .finish()
    }
}

impl<D: Dialer> Connection<D> {
    /// A disconnected connection to `account`, dialed by `dialer`.
    pub fn new(dialer: D, account: Account, config: Arc<Config>) -> Self {
        let label = format!("{}@{}:{}", account.login, account.host, account.port);
        Connection {
            dialer,
            account,
            config,
            state: State::Disconnected,
            session: None,
            monitor: Arc::new(ConnectionMonitor::new(label)),
            registration: None,
            identities: Arc::new(NoIdentities),
            spam: None,
            message_cache: None,
        }
    }

    /// Map ACL identifiers with `resolver`.
    pub fn with_identities(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identities = resolver;
        self
    }

    /// Hand the spam pseudo-flag to `handler` instead of the keyword handler.
    pub fn with_spam_handler(mut self, handler: Arc<dyn SpamHandler<D::Stream>>) -> Self {
        self.spam = Some(handler);
        self
    }

    /// Tell `cache` what became stale.
    pub fn with_message_cache(mut self, cache: Arc<dyn MessageCache>) -> Self {
        self.message_cache = Some(cache);
        self
    }

    /// The account.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// What the watchdog sees of this connection.
    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    /// Have `watchdog` watch this connection for as long as it exists.
    pub fn register_with(&mut self, watchdog: &Watchdog) {
        self.registration = Some(watchdog.register(&self.monitor));
    }

    /// Connect and log in. Does nothing but mark the connection as used if it is connected.
    ///
    /// A closed connection stays closed: connecting it fails with [`Error::ConnectionLost`].
    pub fn connect(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Err(Error::ConnectionLost);
        }
        if self.state == State::Connected {
            if self.session.as_ref().map_or(false, |s| !s.client.is_broken()) {
                self.monitor.activate();
                return Ok(());
            }
            self.lose();
        }

        self.state = State::Connecting;
        match self.open() {
            Ok(session) => {
                self.session = Some(session);
                self.state = State::Connected;
                self.monitor.activate();
                Ok(())
            }
            Err(e) => {
                log::debug!("connecting {:?} failed: {}", self.account, e);
                self.monitor.mark_closed();
                self.state = State::Disconnected;
                Err(e)
            }
        }
    }

    fn open(&mut self) -> Result<Session<D::Stream>> {
        let (stream, transport) = self.dialer.dial(&self.account, self.config.read_timeout)?;
        self.monitor.set_transport(transport);

        let mut client = Client::new(stream);
        client.read_greeting()?;
        client.login(&self.account.login, &self.account.password)?;
        let server = CapabilitySet::from_capabilities(&client.capabilities()?);
        let separator = client
            .list("", "")?
            .first()
            .and_then(|name| name.delimiter())
            .unwrap_or('/');
        log::debug!(
            "logged in to {} as {}, separator {:?}",
            self.account.host,
            self.account.login,
            separator
        );

        let capabilities = Session::<D::Stream>::effective_capabilities(server, &self.config);
        let mut session = Session::new(
            client,
            Arc::clone(&self.config),
            capabilities,
            separator,
            self.account.login.clone(),
        )
        .with_identities(Arc::clone(&self.identities));
        if let Some(ref spam) = self.spam {
            session = session.with_spam_handler(Arc::clone(spam));
        }
        if let Some(ref cache) = self.message_cache {
            session = session.with_message_cache(Arc::clone(cache));
        }
        Ok(session)
    }

    /// Log out and release the session. Local state is released even if the logout fails.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if !session.client.is_broken() {
                if let Err(e) = session.client.logout() {
                    log::warn!("logout from {} failed: {}", self.account.host, e);
                }
            }
        }
        self.monitor.mark_closed();
        self.state = State::Closed;
    }

    fn lose(&mut self) {
        log::debug!("connection to {} lost", self.account.host);
        self.session = None;
        self.monitor.mark_closed();
        self.state = State::Disconnected;
    }

    /// The logged-in session. Fails with [`Error::ConnectionLost`] if there is none or its
    /// transport is gone.
    pub fn session(&mut self) -> Result<&mut Session<D::Stream>> {
        let broken = match self.session {
            Some(ref session) => session.client.is_broken(),
            None => return Err(Error::ConnectionLost),
        };
        if broken {
            self.lose();
            return Err(Error::ConnectionLost);
        }
        self.monitor.activate();
        self.session.as_mut().ok_or(Error::ConnectionLost)
    }

    /// Folder operations.
    pub fn folders(&mut self) -> Result<FolderStorage<'_, D::Stream>> {
        self.session().map(FolderStorage::new)
    }

    /// Message operations.
    pub fn messages(&mut self) -> Result<MessageStorage<'_, D::Stream>> {
        self.session().map(MessageStorage::new)
    }
}

impl<D: Dialer> Drop for Connection<D> {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.close();
        }
    }
}
