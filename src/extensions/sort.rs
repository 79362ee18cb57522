//! Arguments of the `SORT` and `THREAD` commands of [RFC 5256](https://tools.ietf.org/html/rfc5256).
//!
//! Listings use `UID SORT` when the server announces `SORT`; fields the server cannot sort by
//! are ordered on the client instead.

use std::{borrow::Cow, fmt};

use crate::utils::iter_join;

/// The parenthesized criteria list of a `SORT` command. Renders as nothing when empty.
pub(crate) struct SortCriteria<'c>(pub(crate) &'c [SortCriterion]);

impl<'c> fmt::Display for SortCriteria<'c> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => Ok(()),
            criteria => write!(f, "({})", iter_join(criteria, " ")),
        }
    }
}

/// A key the server sorts by. Missing header fields sort as the empty string, before
/// everything else.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SortCriterion {
    /// `INTERNALDATE`, including the time.
    Arrival,
    /// Mailbox part of the first `Cc` address.
    Cc,
    /// The `Date` header, falling back to the internal date.
    Date,
    /// Mailbox part of the first `From` address.
    From,
    /// The wrapped criterion, descending.
    Reverse(Box<SortCriterion>),
    /// `RFC822.SIZE`.
    Size,
    /// Subject without `Re:`/`Fwd:` prefixes.
    Subject,
    /// Mailbox part of the first `To` address.
    To,
}

impl SortCriterion {
    /// This criterion in descending order.
    pub fn reversed(self) -> Self {
        SortCriterion::Reverse(Box::new(self))
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortCriterion::Arrival => "ARRIVAL",
            SortCriterion::Cc => "CC",
            SortCriterion::Date => "DATE",
            SortCriterion::From => "FROM",
            SortCriterion::Reverse(_) => "REVERSE",
            SortCriterion::Size => "SIZE",
            SortCriterion::Subject => "SUBJECT",
            SortCriterion::To => "TO",
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortCriterion::Reverse(inner) => write!(f, "REVERSE {}", inner),
            other => f.write_str(other.keyword()),
        }
    }
}

/// Charset of the search strings. Unlike `SEARCH`, `SORT` and `THREAD` always name one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortCharset<'c> {
    /// `UTF-8`, which every server supports.
    Utf8,
    /// `US-ASCII`, which every server supports.
    UsAscii,
    /// Anything else the server announced.
    Custom(Cow<'c, str>),
}

impl<'c> fmt::Display for SortCharset<'c> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortCharset::Utf8 => f.write_str("UTF-8"),
            SortCharset::UsAscii => f.write_str("US-ASCII"),
            SortCharset::Custom(c) => f.write_str(c),
        }
    }
}
