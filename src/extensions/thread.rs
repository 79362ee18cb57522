//! Adds support for the IMAP THREAD extension specified in [RFC
//! 5256](https://tools.ietf.org/html/rfc5256#section-4).
//!
//! The THREAD command takes a threading algorithm, a charset and search criteria, and answers
//! with one `THREAD` response holding the parenthesized forest of matching messages.

use std::fmt;

/// The threading algorithm to ask the server for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadAlgorithm {
    /// `ORDEREDSUBJECT`: "poor man's threading" by base subject, then sent date.
    OrderedSubject,

    /// `REFERENCES`: threading by the `References` and `In-Reply-To` headers.
    References,
}

impl ThreadAlgorithm {
    /// The capability a server announces when it implements this algorithm.
    pub fn capability(self) -> &'static str {
        match self {
            ThreadAlgorithm::OrderedSubject => "THREAD=ORDEREDSUBJECT",
            ThreadAlgorithm::References => "THREAD=REFERENCES",
        }
    }
}

impl fmt::Display for ThreadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadAlgorithm::OrderedSubject => write!(f, "ORDEREDSUBJECT"),
            ThreadAlgorithm::References => write!(f, "REFERENCES"),
        }
    }
}
