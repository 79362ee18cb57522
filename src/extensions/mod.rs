//! Implementations of various IMAP extensions.
pub mod sort;
pub mod thread;
