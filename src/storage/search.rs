//! Search criteria, rendered to IMAP [search
//! keys](https://tools.ietf.org/html/rfc3501#section-6.4.4).

use chrono::NaiveDate;

use crate::client::validate_str;
use crate::error::Result;
use crate::types::{SystemFlag, Uid};
use crate::utils::uid_set;

/// A search over the messages of one folder.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchTerm {
    /// Every message.
    All,
    /// All terms match. Empty matches everything.
    And(Vec<SearchTerm>),
    /// Any term matches. Empty matches nothing.
    Or(Vec<SearchTerm>),
    /// The term does not match.
    Not(Box<SearchTerm>),
    /// A header field contains a string.
    Header(String, String),
    /// `From` contains a string.
    From(String),
    /// `To` contains a string.
    To(String),
    /// `Cc` contains a string.
    Cc(String),
    /// `Bcc` contains a string.
    Bcc(String),
    /// `Subject` contains a string.
    Subject(String),
    /// The body contains a string.
    Body(String),
    /// A system flag is set (`true`) or not set (`false`).
    Flag(SystemFlag, bool),
    /// A keyword is set or not set.
    Keyword(String, bool),
    /// Larger than this many octets.
    Larger(u32),
    /// Smaller than this many octets.
    Smaller(u32),
    /// Received before the day.
    ReceivedBefore(NaiveDate),
    /// Received on or after the day.
    ReceivedSince(NaiveDate),
    /// `Date` header before the day.
    SentBefore(NaiveDate),
    /// `Date` header on or after the day.
    SentSince(NaiveDate),
    /// One of these messages.
    Uids(Vec<Uid>),
}

fn date(day: &NaiveDate) -> String {
    day.format("%d-%b-%Y").to_string()
}

impl SearchTerm {
    /// The IMAP search keys for this term.
    pub fn to_query(&self) -> Result<String> {
        use SearchTerm::*;

        Ok(match self {
            All => "ALL".to_string(),
            And(terms) => match terms.as_slice() {
                [] => "ALL".to_string(),
                [only] => only.to_query()?,
                terms => {
                    let keys = terms
                        .iter()
                        .map(SearchTerm::to_query)
                        .collect::<Result<Vec<_>>>()?;
                    format!("({})", keys.join(" "))
                }
            },
            Or(terms) => match terms.as_slice() {
                [] => "NOT ALL".to_string(),
                [only] => only.to_query()?,
                [first, rest @ ..] => format!(
                    "OR {} {}",
                    first.to_query()?,
                    Or(rest.to_vec()).to_query()?
                ),
            },
            Not(term) => format!("NOT {}", term.to_query()?),
            Header(name, value) => format!("HEADER {} {}", validate_str(name)?, validate_str(value)?),
            From(s) => format!("FROM {}", validate_str(s)?),
            To(s) => format!("TO {}", validate_str(s)?),
            Cc(s) => format!("CC {}", validate_str(s)?),
            Bcc(s) => format!("BCC {}", validate_str(s)?),
            Subject(s) => format!("SUBJECT {}", validate_str(s)?),
            Body(s) => format!("BODY {}", validate_str(s)?),
            Flag(flag, set) => flag_query(*flag, *set),
            Keyword(keyword, true) => format!("KEYWORD {}", keyword),
            Keyword(keyword, false) => format!("UNKEYWORD {}", keyword),
            Larger(n) => format!("LARGER {}", n),
            Smaller(n) => format!("SMALLER {}", n),
            ReceivedBefore(day) => format!("BEFORE {}", date(day)),
            ReceivedSince(day) => format!("SINCE {}", date(day)),
            SentBefore(day) => format!("SENTBEFORE {}", date(day)),
            SentSince(day) => format!("SENTSINCE {}", date(day)),
            Uids(uids) if uids.is_empty() => "NOT ALL".to_string(),
            Uids(uids) => format!("UID {}", uid_set(uids)),
        })
    }
}

fn flag_query(flag: SystemFlag, set: bool) -> String {
    let (yes, no) = match flag {
        SystemFlag::Seen => ("SEEN", "UNSEEN"),
        SystemFlag::Answered => ("ANSWERED", "UNANSWERED"),
        SystemFlag::Flagged => ("FLAGGED", "UNFLAGGED"),
        SystemFlag::Deleted => ("DELETED", "UNDELETED"),
        SystemFlag::Draft => ("DRAFT", "UNDRAFT"),
        SystemFlag::Recent => ("RECENT", "NOT RECENT"),
        // the keyword pseudo-flags have no search key of their own
        SystemFlag::User | SystemFlag::Spam => {
            return if set { "ALL" } else { "NOT ALL" }.to_string()
        }
    };
    if set { yes } else { no }.to_string()
}
