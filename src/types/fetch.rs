use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use imap_proto::types::{AttributeValue, BodyStructure, MessageSection, SectionPath};

use super::{Flag, FlagSet, Seq, Uid};

/// An IMAP [`FETCH` response](https://tools.ietf.org/html/rfc3501#section-7.4.2) that contains
/// data about a particular message. This response occurs as the result of a `FETCH` or `STORE`
/// command, as well as by unilateral server decision (e.g., flag updates).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fetch {
    /// The ordinal number of this message in its containing mailbox.
    pub message: Seq,

    /// A number expressing the unique identifier of the message.
    pub uid: Option<Uid>,

    /// The size of the message in octets, if `RFC822.SIZE` was fetched.
    pub size: Option<u32>,

    /// The date the server received the message, if `INTERNALDATE` was fetched.
    pub internal_date: Option<DateTime<FixedOffset>>,

    /// The envelope, if `ENVELOPE` was fetched.
    pub envelope: Option<Envelope>,

    /// `type/subtype` of the top-level body part, if `BODYSTRUCTURE` was fetched.
    pub content_type: Option<String>,

    pub(crate) flags: Option<Vec<Flag<'static>>>,
    pub(crate) header: Option<Vec<u8>>,
    pub(crate) body: Option<Vec<u8>>,
}

/// The envelope structure of a message, see [section 7.4.2 of RFC
/// 3501](https://tools.ietf.org/html/rfc3501#section-7.4.2).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Envelope {
    /// The `Date` header.
    pub date: Option<String>,
    /// The `Subject` header.
    pub subject: Option<String>,
    /// `From` addresses.
    pub from: Vec<Address>,
    /// `Sender` addresses.
    pub sender: Vec<Address>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// `To` addresses.
    pub to: Vec<Address>,
    /// `Cc` addresses.
    pub cc: Vec<Address>,
    /// `Bcc` addresses.
    pub bcc: Vec<Address>,
    /// The `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// The `Message-ID` header.
    pub message_id: Option<String>,
}

/// A single address of an [`Envelope`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Address {
    /// The personal name.
    pub name: Option<String>,
    /// The local part.
    pub mailbox: Option<String>,
    /// The domain.
    pub host: Option<String>,
}

impl Address {
    /// `mailbox@host`, or whichever of the two is present.
    pub fn addr_spec(&self) -> String {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => format!("{}@{}", m, h),
            (Some(m), None) => m.clone(),
            (None, Some(h)) => h.clone(),
            (None, None) => String::new(),
        }
    }
}

fn text(v: &Option<Cow<'_, [u8]>>) -> Option<String> {
    v.as_ref().map(|b| String::from_utf8_lossy(b).into_owned())
}

fn addresses(v: &Option<Vec<imap_proto::types::Address<'_>>>) -> Vec<Address> {
    v.iter()
        .flatten()
        .map(|a| Address {
            name: text(&a.name),
            mailbox: text(&a.mailbox),
            host: text(&a.host),
        })
        .collect()
}

impl<'a> From<&imap_proto::types::Envelope<'a>> for Envelope {
    fn from(e: &imap_proto::types::Envelope<'a>) -> Self {
        Envelope {
            date: text(&e.date),
            subject: text(&e.subject),
            from: addresses(&e.from),
            sender: addresses(&e.sender),
            reply_to: addresses(&e.reply_to),
            to: addresses(&e.to),
            cc: addresses(&e.cc),
            bcc: addresses(&e.bcc),
            in_reply_to: text(&e.in_reply_to),
            message_id: text(&e.message_id),
        }
    }
}

fn content_type(body: &BodyStructure<'_>) -> String {
    let common = match body {
        BodyStructure::Basic { common, .. }
        | BodyStructure::Text { common, .. }
        | BodyStructure::Message { common, .. }
        | BodyStructure::Multipart { common, .. } => common,
    };
    format!("{}/{}", common.ty.ty, common.ty.subtype).to_ascii_lowercase()
}

fn is_header_section(section: &SectionPath) -> bool {
    matches!(
        section,
        SectionPath::Full(MessageSection::Header)
            | SectionPath::Part(_, Some(MessageSection::Header))
    )
}

/// Parse an INTERNALDATE such as ` 7-Feb-1994 21:52:25 -0800`.
pub(crate) fn parse_internal_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}

impl Fetch {
    /// Build a `Fetch` from the attributes of one `FETCH` response, in whatever order the
    /// server sent them. Attributes this type does not model are skipped.
    pub(crate) fn from_attributes(message: Seq, attrs: &[AttributeValue<'_>]) -> Self {
        let mut fetch = Fetch {
            message,
            ..Fetch::default()
        };
        for attr in attrs {
            match attr {
                AttributeValue::Flags(flags) => {
                    fetch.flags = Some(Flag::from_strs(flags.iter()).collect());
                }
                AttributeValue::Uid(uid) => fetch.uid = Some(*uid),
                AttributeValue::Rfc822Size(sz) => fetch.size = Some(*sz),
                AttributeValue::InternalDate(date) => {
                    fetch.internal_date = parse_internal_date(date);
                }
                AttributeValue::Envelope(envelope) => {
                    fetch.envelope = Some(Envelope::from(envelope.as_ref()));
                }
                AttributeValue::BodyStructure(body) => {
                    fetch.content_type = Some(content_type(body));
                }
                AttributeValue::Rfc822Header(Some(header)) => {
                    fetch.header = Some(header.to_vec());
                }
                AttributeValue::BodySection {
                    section: Some(section),
                    data: Some(data),
                    ..
                } if is_header_section(section) => {
                    fetch.header = Some(data.to_vec());
                }
                AttributeValue::Rfc822(Some(body)) => fetch.body = Some(body.to_vec()),
                AttributeValue::BodySection {
                    section: None,
                    data: Some(data),
                    ..
                } => {
                    fetch.body = Some(data.to_vec());
                }
                _ => {}
            }
        }
        fetch
    }

    /// A list of flags that are set for this message, empty if `FLAGS` was not fetched.
    pub fn flags(&self) -> &[Flag<'static>] {
        self.flags.as_deref().unwrap_or(&[])
    }

    /// The flags of this message as a [`FlagSet`], `None` if `FLAGS` was not fetched.
    pub fn flag_set(&self) -> Option<FlagSet> {
        self.flags.as_ref().map(|flags| FlagSet::from_flags(flags))
    }

    /// The raw header block, if `RFC822.HEADER` or a `BODY[HEADER...]` section was fetched.
    pub fn header(&self) -> Option<&[u8]> {
        self.header.as_deref()
    }

    /// The entire message, if `RFC822` or `BODY[]` was fetched.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The individual header fields of the fetched header block, unfolded, in order.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.header.as_deref().map(parse_headers).unwrap_or_default()
    }

    /// The value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Split a raw header block into unfolded `(name, value)` pairs.
pub(crate) fn parse_headers(block: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(block);
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            // end of the header block
            if !headers.is_empty() {
                break;
            }
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}
