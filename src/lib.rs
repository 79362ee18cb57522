//! A blocking IMAP client with a folder and message storage layer on top.
//!
//! The crate has two levels. [`client::Client`] speaks the protocol: it sends one command at a
//! time over any `Read + Write` stream, reads everything up to the tagged completion and hands
//! back typed responses. `NO` and `BAD` completions become [`error::Error::CommandFailed`], while
//! `BYE` and transport failures become [`error::Error::ConnectionLost`].
//!
//! [`connection::Connection`] owns one logged-in client per account and lends out
//! [`storage::FolderStorage`] and [`storage::MessageStorage`]. Those implement the operations a
//! mail application needs but IMAP does not offer directly: moving folder trees, ACL edits that
//! never lock out the last administrator, message moves that keep track of the new UIDs, and
//! fallbacks for servers without `UIDPLUS`, `SORT` or `THREAD`.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use imap_store::config::{Account, Config};
//! use imap_store::conn::TlsDialer;
//! use imap_store::connection::Connection;
//! use imap_store::storage::MessageFields;
//! use imap_store::watchdog::Watchdog;
//!
//! # fn main() -> imap_store::error::Result<()> {
//! let config = Arc::new(Config::default());
//! let watchdog = Watchdog::start(config.watcher.clone())?;
//! let account = Account::new("imap.example.com", 993, "joe", "secret");
//!
//! let mut connection = Connection::new(TlsDialer::with_defaults()?, account, config);
//! connection.register_with(&watchdog);
//! connection.connect()?;
//!
//! for folder in connection.folders()?.list("INBOX", false)? {
//!     println!("{}", folder.full_name);
//! }
//! let unread = connection.messages()?.unread_uids("INBOX")?;
//! let messages = connection
//!     .messages()?
//!     .get_messages("INBOX", &unread, MessageFields::default())?;
//! println!("{} unread", messages.len());
//!
//! connection.close();
//! # Ok(())
//! # }
//! ```

mod parse;
mod types;
mod utils;

pub mod acl;
pub mod client;
pub mod config;
pub mod conn;
pub mod connection;
pub mod error;
pub mod extensions;
pub mod storage;
pub mod utf7;
pub mod watchdog;

pub use types::*;

#[cfg(test)]
mod mock_stream;
