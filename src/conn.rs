//! Transports a [`Client`](crate::client::Client) can run over, and how to open them.

use std::fmt::{self, Debug, Formatter};
use std::io::{Read, Write};
use std::net::{Shutdown as NetShutdown, TcpStream};
use std::time::Duration;

#[cfg(feature = "native-tls")]
use native_tls::{TlsConnector, TlsStream};

use crate::config::Account;
use crate::error::Result;

/// Must be implemented for a transport in order for a connection using that transport to
/// honour a read timeout.
pub trait SetReadTimeout {
    /// Set the timeout for subsequent reads to the given one.
    ///
    /// If `timeout` is `None`, the read timeout should be removed.
    ///
    /// See also `std::net::TcpStream::set_read_timeout`.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

impl SetReadTimeout for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        TcpStream::set_read_timeout(self, timeout).map_err(Into::into)
    }
}

/// A one-shot handle that closes a transport from another thread.
///
/// Any read blocked on the transport fails once the handle has been used, which is what turns
/// a forced close into [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) for the
/// thread that owns the connection.
pub struct ShutdownHandle(Box<dyn FnOnce() + Send>);

impl ShutdownHandle {
    /// Wrap a closure that shuts the transport down.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        ShutdownHandle(Box::new(f))
    }

    /// A handle for transports that cannot be closed from outside.
    pub fn noop() -> Self {
        ShutdownHandle::new(|| {})
    }

    /// Close the transport.
    pub fn shutdown(self) {
        (self.0)()
    }
}

impl Debug for ShutdownHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ShutdownHandle")
    }
}

/// Transports that can hand out a [`ShutdownHandle`].
pub trait Shutdown {
    /// A handle that closes this transport.
    fn shutdown_handle(&self) -> Result<ShutdownHandle>;
}

impl Shutdown for TcpStream {
    fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let socket = self.try_clone()?;
        Ok(ShutdownHandle::new(move || {
            // the socket may already be gone
            let _ = socket.shutdown(NetShutdown::Both);
        }))
    }
}

#[cfg(feature = "native-tls")]
impl Shutdown for TlsStream<TcpStream> {
    fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        self.get_ref().shutdown_handle()
    }
}

/// Opens the transport to an account's server.
///
/// Dialing only establishes the byte stream. The IMAP greeting and login are handled by the
/// [`Connection`](crate::connection::Connection).
pub trait Dialer: Send + Sync {
    /// The transport produced.
    type Stream: Read + Write + Send;

    /// Connect to the server of `account`, applying `read_timeout` to the transport.
    fn dial(
        &self,
        account: &Account,
        read_timeout: Option<Duration>,
    ) -> Result<(Self::Stream, ShutdownHandle)>;
}

/// Plain TCP.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    fn dial(
        &self,
        account: &Account,
        read_timeout: Option<Duration>,
    ) -> Result<(TcpStream, ShutdownHandle)> {
        let mut stream = TcpStream::connect((account.host.as_str(), account.port))?;
        SetReadTimeout::set_read_timeout(&mut stream, read_timeout)?;
        let handle = stream.shutdown_handle()?;
        Ok((stream, handle))
    }
}

/// TCP wrapped in TLS by `native-tls`.
#[cfg(feature = "native-tls")]
#[derive(Clone, Debug)]
pub struct TlsDialer {
    connector: TlsConnector,
}

#[cfg(feature = "native-tls")]
impl TlsDialer {
    /// A dialer using the given connector.
    pub fn new(connector: TlsConnector) -> Self {
        TlsDialer { connector }
    }

    /// A dialer with the platform's default TLS settings.
    pub fn with_defaults() -> Result<Self> {
        Ok(TlsDialer::new(TlsConnector::new()?))
    }
}

#[cfg(feature = "native-tls")]
impl Dialer for TlsDialer {
    type Stream = TlsStream<TcpStream>;

    fn dial(
        &self,
        account: &Account,
        read_timeout: Option<Duration>,
    ) -> Result<(TlsStream<TcpStream>, ShutdownHandle)> {
        let (tcp, _) = TcpDialer.dial(account, read_timeout)?;
        let stream = self.connector.connect(&account.host, tcp)?;
        let handle = stream.shutdown_handle()?;
        Ok((stream, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn shutdown_handle_runs_once() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&flag);
        let handle = ShutdownHandle::new(move || f.store(true, Ordering::SeqCst));
        assert!(!flag.load(Ordering::SeqCst));
        handle.shutdown();
        assert!(flag.load(Ordering::SeqCst));
        ShutdownHandle::noop().shutdown();
    }
}
