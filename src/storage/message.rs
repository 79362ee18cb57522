use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use enumset::EnumSet;

use super::{is_within, DefaultFolders, IndexRange, Right, SearchTerm, Session};
use crate::error::{Error, Phase, Result};
use crate::extensions::sort::{SortCharset, SortCriterion};
use crate::extensions::thread::ThreadAlgorithm;
use crate::types::{ColorLabel, Envelope, Fetch, Flag, FlagSet, Seq, SystemFlag, Uid};
use crate::utils::{iter_join, uid_set};

/// Header stamped on the first appended message when the server does not report
/// `APPENDUID`.
const APPEND_MARKER: &str = "X-Append-Marker";

/// What to fetch for each message. The UID is always fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageFields {
    /// `FLAGS`
    pub flags: bool,
    /// `ENVELOPE`
    pub envelope: bool,
    /// `RFC822.SIZE`
    pub size: bool,
    /// `INTERNALDATE`
    pub received: bool,
    /// The header block, split into fields.
    pub headers: bool,
    /// `BODYSTRUCTURE`, reduced to the top-level content type.
    pub content_type: bool,
    /// The entire message.
    pub body: bool,
}

impl Default for MessageFields {
    /// Flags, envelope, size and received date: enough for a message listing.
    fn default() -> Self {
        MessageFields {
            flags: true,
            envelope: true,
            size: true,
            received: true,
            headers: false,
            content_type: false,
            body: false,
        }
    }
}

impl MessageFields {
    /// Just the UID.
    pub fn uid_only() -> Self {
        MessageFields {
            flags: false,
            envelope: false,
            size: false,
            received: false,
            headers: false,
            content_type: false,
            body: false,
        }
    }

    /// Everything.
    pub fn all() -> Self {
        MessageFields {
            flags: true,
            envelope: true,
            size: true,
            received: true,
            headers: true,
            content_type: true,
            body: true,
        }
    }

    fn union(self, other: MessageFields) -> Self {
        MessageFields {
            flags: self.flags || other.flags,
            envelope: self.envelope || other.envelope,
            size: self.size || other.size,
            received: self.received || other.received,
            headers: self.headers || other.headers,
            content_type: self.content_type || other.content_type,
            body: self.body || other.body,
        }
    }

    fn fetch_items(&self) -> String {
        let mut items = vec!["UID"];
        if self.flags {
            items.push("FLAGS");
        }
        if self.envelope {
            items.push("ENVELOPE");
        }
        if self.size {
            items.push("RFC822.SIZE");
        }
        if self.received {
            items.push("INTERNALDATE");
        }
        if self.content_type {
            items.push("BODYSTRUCTURE");
        }
        if self.headers {
            items.push("BODY.PEEK[HEADER]");
        }
        if self.body {
            items.push("BODY.PEEK[]");
        }
        format!("({})", items.join(" "))
    }
}

/// A message as listed or fetched. Fields that were not requested are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Logical full name of the folder.
    pub folder: String,
    /// UID in that folder.
    pub uid: Uid,
    /// Sequence number at the time of the fetch. Meaningless after the folder is left.
    pub seq: Seq,
    /// System flags, color label and keywords.
    pub flags: FlagSet,
    /// Envelope.
    pub envelope: Option<Envelope>,
    /// Size in octets.
    pub size: Option<u32>,
    /// When the server received the message.
    pub received: Option<DateTime<FixedOffset>>,
    /// Header fields in order, unfolded.
    pub headers: Vec<(String, String)>,
    /// `type/subtype` of the message.
    pub content_type: Option<String>,
    /// The entire message.
    pub body: Option<Vec<u8>>,
    /// Depth in its thread, 0 for thread roots and for unthreaded listings.
    pub thread_level: usize,
}

impl Message {
    fn from_fetch(folder: &str, fetch: Fetch) -> Option<Message> {
        let uid = fetch.uid?;
        Some(Message {
            folder: folder.to_string(),
            uid,
            seq: fetch.message,
            flags: fetch.flag_set().unwrap_or_default(),
            headers: fetch.headers(),
            envelope: fetch.envelope,
            size: fetch.size,
            received: fetch.internal_date,
            content_type: fetch.content_type,
            body: fetch.body,
            thread_level: 0,
        })
    }

    /// The color label, if any.
    pub fn color_label(&self) -> Option<ColorLabel> {
        self.flags.color_label
    }

    /// The `Date` header of the envelope, parsed.
    pub fn sent(&self) -> Option<DateTime<FixedOffset>> {
        let date = self.envelope.as_ref()?.date.as_deref()?;
        DateTime::parse_from_rfc2822(date.trim()).ok()
    }

    fn subject_key(&self) -> String {
        self.envelope
            .as_ref()
            .and_then(|e| e.subject.as_deref())
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default()
    }

    fn address_key(&self, field: SortField) -> String {
        let envelope = match self.envelope {
            Some(ref envelope) => envelope,
            None => return String::new(),
        };
        let addresses = match field {
            SortField::From => &envelope.from,
            SortField::To => &envelope.to,
            _ => &envelope.cc,
        };
        addresses
            .first()
            .map(|a| a.addr_spec().to_lowercase())
            .unwrap_or_default()
    }
}

/// What to order a listing by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortField {
    /// Date of receipt.
    Received,
    /// `Date` header.
    Sent,
    /// Subject.
    Subject,
    /// First `From` address.
    From,
    /// First `To` address.
    To,
    /// First `Cc` address.
    Cc,
    /// Size.
    Size,
    /// System flags.
    Flags,
    /// Color label.
    ColorLabel,
    /// UID, i.e. order of arrival in the folder.
    Uid,
}

impl SortField {
    /// The server-side criterion, if the server can sort by this field.
    fn criterion(self) -> Option<SortCriterion> {
        Some(match self {
            SortField::Received => SortCriterion::Arrival,
            SortField::Sent => SortCriterion::Date,
            SortField::Subject => SortCriterion::Subject,
            SortField::From => SortCriterion::From,
            SortField::To => SortCriterion::To,
            SortField::Cc => SortCriterion::Cc,
            SortField::Size => SortCriterion::Size,
            SortField::Flags | SortField::ColorLabel | SortField::Uid => return None,
        })
    }

    /// What has to be fetched to sort by this field on the client.
    fn needs(self) -> MessageFields {
        let mut fields = MessageFields::uid_only();
        match self {
            SortField::Received => fields.received = true,
            SortField::Sent
            | SortField::Subject
            | SortField::From
            | SortField::To
            | SortField::Cc => fields.envelope = true,
            SortField::Size => fields.size = true,
            SortField::Flags | SortField::ColorLabel => fields.flags = true,
            SortField::Uid => {}
        }
        fields
    }

    fn compare(self, a: &Message, b: &Message) -> Ordering {
        let ordering = match self {
            SortField::Received => a.received.cmp(&b.received),
            SortField::Sent => a.sent().cmp(&b.sent()),
            SortField::Subject => a.subject_key().cmp(&b.subject_key()),
            SortField::From | SortField::To | SortField::Cc => {
                a.address_key(self).cmp(&b.address_key(self))
            }
            SortField::Size => a.size.cmp(&b.size),
            SortField::Flags => flag_bits(a.flags.flags).cmp(&flag_bits(b.flags.flags)),
            SortField::ColorLabel => a.flags.color_label.cmp(&b.flags.color_label),
            SortField::Uid => Ordering::Equal,
        };
        ordering.then(a.uid.cmp(&b.uid))
    }
}

fn flag_bits(flags: EnumSet<SystemFlag>) -> u32 {
    flags.iter().map(|f| 1 << f as u32).sum()
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Parameters of [`MessageStorage::list`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only messages matching this.
    pub search: Option<SearchTerm>,
    /// Order of the result. UID order if `None`.
    pub sort: Option<(SortField, SortOrder)>,
    /// Window into the sorted result.
    pub range: Option<IndexRange>,
    /// What to fetch.
    pub fields: MessageFields,
}

static MARKER_SEQ: AtomicU64 = AtomicU64::new(0);

fn unique_marker() -> String {
    format!(
        "{}.{}.{}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        MARKER_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
    )
}

fn flag_list<S: AsRef<str>>(flags: impl IntoIterator<Item = S>) -> String {
    let flags: Vec<String> = flags.into_iter().map(|f| f.as_ref().to_string()).collect();
    format!("({})", flags.join(" "))
}

/// Message operations of one session.
pub struct MessageStorage<'s, T: Read + Write> {
    session: &'s mut Session<T>,
}

impl<'s, T: Read + Write> MessageStorage<'s, T> {
    /// Message operations over `session`.
    pub fn new(session: &'s mut Session<T>) -> Self {
        MessageStorage { session }
    }

    /// The standard folders, created on first use in this session.
    pub fn default_folders(&mut self) -> Result<DefaultFolders> {
        self.session.default_folders()
    }

    /// Fetch `uids` from the selected folder, `fetch_limit` at a time, in the order given.
    fn fetch_uids(&mut self, folder: &str, uids: &[Uid], fields: MessageFields) -> Result<Vec<Message>> {
        let items = fields.fetch_items();
        let mut fetched: HashMap<Uid, Message> = HashMap::with_capacity(uids.len());
        for chunk in uids.chunks(self.session.config.fetch_limit.max(1)) {
            for fetch in self.session.client.uid_fetch(&uid_set(chunk), &items)? {
                if let Some(message) = Message::from_fetch(folder, fetch) {
                    fetched.insert(message.uid, message);
                }
            }
        }
        Ok(uids.iter().filter_map(|uid| fetched.remove(uid)).collect())
    }

    /// Messages of a folder, optionally searched, sorted and windowed.
    ///
    /// The server sorts if it supports `SORT` and the field is one it knows; otherwise the
    /// candidates are fetched and sorted here, ties broken by UID. The range is applied to the
    /// sorted result.
    pub fn list(&mut self, folder: &str, request: &ListRequest) -> Result<Vec<Message>> {
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Read)?;
        if self.session.open(&wire)?.exists == 0 {
            return Ok(Vec::new());
        }
        let query = match request.search {
            Some(ref term) => term.to_query()?,
            None => "ALL".to_string(),
        };

        let (field, order) = match request.sort {
            Some(sort) => sort,
            None => {
                let uids = self.session.client.uid_search(&query)?;
                let uids = apply_range(request.range, uids);
                return self.fetch_uids(folder, &uids, request.fields);
            }
        };

        if let Some(criterion) = field.criterion().filter(|_| self.session.capabilities.sort) {
            let criterion = match order {
                SortOrder::Ascending => criterion,
                SortOrder::Descending => criterion.reversed(),
            };
            let uids = self
                .session
                .client
                .uid_sort(&[criterion], SortCharset::Utf8, &query)?;
            let uids = apply_range(request.range, uids);
            return self.fetch_uids(folder, &uids, request.fields);
        }

        log::debug!("sorting {} by {:?} locally", folder, field);
        let uids = self.session.client.uid_search(&query)?;
        let mut messages = self.fetch_uids(folder, &uids, request.fields.union(field.needs()))?;
        messages.sort_by(|a, b| match order {
            SortOrder::Ascending => field.compare(a, b),
            SortOrder::Descending => field.compare(b, a),
        });
        Ok(apply_range(request.range, messages))
    }

    /// Messages of a folder in thread order, each with its depth in the thread.
    ///
    /// Needs `THREAD=REFERENCES`. With a search, only the matching messages are threaded.
    pub fn thread_sorted_list(
        &mut self,
        folder: &str,
        search: Option<&SearchTerm>,
        range: Option<IndexRange>,
        fields: MessageFields,
    ) -> Result<Vec<Message>> {
        if !self.session.capabilities.thread_references {
            return Err(Error::Unsupported("THREAD=REFERENCES"));
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Read)?;
        if self.session.open(&wire)?.exists == 0 {
            return Ok(Vec::new());
        }

        let candidates = match search {
            Some(term) => {
                let seqs = self.session.client.search(&term.to_query()?)?;
                if seqs.is_empty() {
                    return Ok(Vec::new());
                }
                iter_join(seqs, ",")
            }
            None => "ALL".to_string(),
        };
        let threads =
            self.session
                .client
                .thread(ThreadAlgorithm::References, SortCharset::Utf8, &candidates)?;
        let order = apply_range(range, threads.flatten());
        if order.is_empty() {
            return Ok(Vec::new());
        }

        let items = fields.fetch_items();
        let seqs: Vec<Seq> = order.iter().map(|&(seq, _)| seq).collect();
        let mut fetched: HashMap<Seq, Message> = HashMap::with_capacity(seqs.len());
        for chunk in seqs.chunks(self.session.config.fetch_limit.max(1)) {
            for fetch in self.session.client.fetch(&iter_join(chunk, ","), &items)? {
                if let Some(message) = Message::from_fetch(folder, fetch) {
                    fetched.insert(message.seq, message);
                }
            }
        }
        Ok(order
            .into_iter()
            .filter_map(|(seq, level)| {
                fetched.remove(&seq).map(|mut message| {
                    message.thread_level = level;
                    message
                })
            })
            .collect())
    }

    /// Fetch messages by UID. The result follows `uids`, with `None` for messages that do
    /// not exist.
    pub fn get_messages(
        &mut self,
        folder: &str,
        uids: &[Uid],
        fields: MessageFields,
    ) -> Result<Vec<Option<Message>>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Read)?;
        self.session.open(&wire)?;
        let mut fetched: HashMap<Uid, Message> = self
            .fetch_uids(folder, uids, fields)?
            .into_iter()
            .map(|m| (m.uid, m))
            .collect();
        Ok(uids.iter().map(|uid| fetched.remove(uid)).collect())
    }

    /// UIDs of the unseen, undeleted messages of a folder.
    pub fn unread_uids(&mut self, folder: &str) -> Result<Vec<Uid>> {
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Read)?;
        self.session.open(&wire)?;
        self.session.client.uid_search("UNSEEN UNDELETED")
    }

    /// Number of messages in a folder.
    pub fn message_count(&mut self, folder: &str) -> Result<u32> {
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Read)?;
        Ok(self.session.open(&wire)?.exists)
    }

    /// Set or clear system flags.
    ///
    /// `Recent` and `User` are ignored. Every right the change needs is checked before
    /// anything is stored. The `Spam` pseudo-flag is not stored but handed to spam handling.
    pub fn update_flags(
        &mut self,
        folder: &str,
        uids: &[Uid],
        flags: EnumSet<SystemFlag>,
        set: bool,
    ) -> Result<()> {
        let mut flags = flags - SystemFlag::unsettable();
        let spam = flags.remove(SystemFlag::Spam);
        if uids.is_empty() || (flags.is_empty() && !spam) {
            return Ok(());
        }

        let wire = self.session.wire(folder);
        for flag in flags {
            let right = match flag {
                SystemFlag::Seen => Right::KeepSeen,
                SystemFlag::Deleted => Right::Delete,
                _ => Right::Write,
            };
            self.session.require(&wire, right)?;
        }

        if !flags.is_empty() {
            self.session.open(&wire)?;
            let names = flags.iter().filter_map(SystemFlag::wire_name);
            let query = format!(
                "{}FLAGS.SILENT {}",
                if set { '+' } else { '-' },
                flag_list(names)
            );
            self.session.client.uid_store(&uid_set(uids), &query)?;
            self.session.invalidate_messages(folder, uids);
        }

        if spam {
            if !self.session.config.spam_enabled {
                log::warn!("spam handling is disabled, ignoring spam flag in {}", folder);
                return Ok(());
            }
            let handler = Arc::clone(&self.session.spam);
            if set {
                handler.handle_spam(self, folder, uids, true)?;
            } else {
                handler.handle_ham(self, folder, uids, true)?;
            }
        }
        Ok(())
    }

    /// Give messages a color label, replacing any other.
    ///
    /// Does nothing, with a warning, if keywords are disabled or the folder cannot store
    /// them.
    pub fn update_color_label(&mut self, folder: &str, uids: &[Uid], label: ColorLabel) -> Result<()> {
        if !self.session.config.user_flags_enabled {
            log::warn!("user flags are disabled, not labelling messages in {}", folder);
            return Ok(());
        }
        if uids.is_empty() {
            return Ok(());
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Write)?;
        if !self.session.open(&wire)?.supports_user_flags() {
            log::warn!("{} does not support user flags, not labelling messages", folder);
            return Ok(());
        }

        let set = uid_set(uids);
        let all = flag_list(ColorLabel::all().map(ColorLabel::keyword));
        self.session
            .client
            .uid_store(&set, &format!("-FLAGS.SILENT {}", all))?;
        self.session
            .client
            .uid_store(&set, &format!("+FLAGS.SILENT ({})", label.keyword()))?;
        self.session.invalidate_messages(folder, uids);
        Ok(())
    }

    /// Add and remove keywords. Does nothing if keywords are disabled or unsupported.
    pub fn store_keywords(
        &mut self,
        folder: &str,
        uids: &[Uid],
        add: &[&str],
        remove: &[&str],
    ) -> Result<()> {
        if !self.session.config.user_flags_enabled || uids.is_empty() {
            return Ok(());
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Write)?;
        if !self.session.open(&wire)?.supports_user_flags() {
            log::warn!("{} does not support user flags, not storing keywords", folder);
            return Ok(());
        }

        let set = uid_set(uids);
        if !remove.is_empty() {
            self.session
                .client
                .uid_store(&set, &format!("-FLAGS.SILENT {}", flag_list(remove)))?;
        }
        if !add.is_empty() {
            self.session
                .client
                .uid_store(&set, &format!("+FLAGS.SILENT {}", flag_list(add)))?;
        }
        self.session.invalidate_messages(folder, uids);
        Ok(())
    }

    /// Copy messages. Returns the UID of each copy, `None` where it could not be determined.
    pub fn copy_messages(
        &mut self,
        source: &str,
        destination: &str,
        uids: &[Uid],
    ) -> Result<Vec<Option<Uid>>> {
        self.transfer(source, destination, uids, false, true)
    }

    /// Move messages. If `need_uids` is set, the new UIDs are determined even when the server
    /// does not report them.
    ///
    /// A failure after the copy is reported as [`Error::PartiallyCompleted`]; the messages are
    /// then in both folders.
    pub fn move_messages(
        &mut self,
        source: &str,
        destination: &str,
        uids: &[Uid],
        need_uids: bool,
    ) -> Result<Vec<Option<Uid>>> {
        self.transfer(source, destination, uids, true, need_uids)
    }

    fn transfer(
        &mut self,
        source: &str,
        destination: &str,
        uids: &[Uid],
        remove: bool,
        need_uids: bool,
    ) -> Result<Vec<Option<Uid>>> {
        if remove && source == destination {
            return Err(Error::SameFolder(source.to_string()));
        }
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let source_wire = self.session.wire(source);
        let destination_wire = self.session.wire(destination);
        self.session.require(&source_wire, Right::Read)?;
        self.session.require(&source_wire, Right::Create)?;
        if remove {
            self.session.require(&source_wire, Right::Delete)?;
        }
        self.session.require(&destination_wire, Right::Insert)?;

        let mut sorted = uids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let set = uid_set(&sorted);

        self.session.open(&source_wire)?;
        let copied = self.session.client.uid_copy(&set, &destination_wire)?;
        let mapping: Option<HashMap<Uid, Uid>> = copied.mapping.map(|m| m.into_iter().collect());
        // the anchor must be read before the originals can be expunged
        let anchor = match mapping {
            None if need_uids => self
                .message_id(sorted[0])
                .map_err(|e| e.in_phase(Phase::DiscoverUids, &sorted))?,
            _ => None,
        };

        if remove {
            self.session
                .client
                .uid_store(&set, "+FLAGS.SILENT (\\Deleted)")
                .map_err(|e| e.in_phase(Phase::FlagDeleted, &sorted))?;
            self.expunge_uids(&sorted)
                .map_err(|e| e.in_phase(Phase::Expunge, &sorted))?;
            self.session.invalidate_messages(source, &sorted);
        }

        let destinations = match mapping {
            Some(mapping) => mapping,
            None if need_uids => self
                .discover_copies(&destination_wire, anchor, &sorted)
                .map_err(|e| e.in_phase(Phase::DiscoverUids, &sorted))?,
            None => HashMap::new(),
        };
        Ok(uids.iter().map(|uid| destinations.get(uid).copied()).collect())
    }

    /// The `Message-ID` of a message in the selected folder.
    fn message_id(&mut self, uid: Uid) -> Result<Option<String>> {
        let fetches = self
            .session
            .client
            .uid_fetch(&uid.to_string(), "(UID BODY.PEEK[HEADER.FIELDS (MESSAGE-ID)])")?;
        Ok(fetches.iter().find_map(|f| f.header_value("Message-ID")))
    }

    /// Find the copies of `sorted` in `destination_wire` by the `Message-ID` of the first
    /// one, assuming the copies got consecutive UIDs.
    fn discover_copies(
        &mut self,
        destination_wire: &str,
        anchor: Option<String>,
        sorted: &[Uid],
    ) -> Result<HashMap<Uid, Uid>> {
        let anchor = match anchor {
            Some(anchor) => anchor,
            None => {
                log::debug!("no Message-ID to find copies in {} by", destination_wire);
                return Ok(HashMap::new());
            }
        };
        self.session.open(destination_wire)?;
        let query = SearchTerm::Header("Message-ID".into(), anchor).to_query()?;
        let first = match self.session.client.uid_search(&query)?.into_iter().max() {
            Some(first) => first,
            None => return Ok(HashMap::new()),
        };
        Ok(sorted
            .iter()
            .zip(contiguous_uids(first, sorted.len()))
            .filter_map(|(&source, copy)| copy.map(|copy| (source, copy)))
            .collect())
    }

    /// Expunge exactly `uids` from the selected folder, which are flagged `\Deleted`.
    ///
    /// Without `UID EXPUNGE`, other messages flagged `\Deleted` are unflagged around a plain
    /// `EXPUNGE` and flagged again afterwards.
    fn expunge_uids(&mut self, uids: &[Uid]) -> Result<()> {
        if self.session.capabilities.uidplus {
            match self.session.client.uid_expunge(&uid_set(uids)) {
                Ok(_) => return Ok(()),
                Err(e) if e.is_connection_lost() => return Err(e),
                Err(e) => log::debug!("UID EXPUNGE failed, expunging around others: {}", e),
            }
        }

        let others: Vec<Uid> = self
            .session
            .client
            .uid_search("DELETED")?
            .into_iter()
            .filter(|uid| !uids.contains(uid))
            .collect();
        if others.is_empty() {
            return self.session.client.expunge().map(|_| ());
        }

        let others = uid_set(&others);
        self.session
            .client
            .uid_store(&others, "-FLAGS.SILENT (\\Deleted)")?;
        let expunged = self.session.client.expunge();
        if let Err(ref e) = expunged {
            if e.is_connection_lost() {
                return expunged.map(|_| ());
            }
        }
        self.session
            .client
            .uid_store(&others, "+FLAGS.SILENT (\\Deleted)")?;
        expunged.map(|_| ())
    }

    /// Delete messages. Unless `hard` is set or the folder is in the trash, they are copied to
    /// the trash first.
    pub fn delete_messages(&mut self, folder: &str, uids: &[Uid], hard: bool) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Delete)?;
        let trash = if hard {
            None
        } else {
            let trash = self.session.default_folders()?.trash;
            Some(trash).filter(|t| !is_within(folder, t))
        };

        let mut sorted = uids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let set = uid_set(&sorted);

        self.session.open(&wire)?;
        if let Some(trash) = trash {
            self.session.require(&wire, Right::Read)?;
            let trash_wire = self.session.wire(&trash);
            self.session.client.uid_copy(&set, &trash_wire)?;
        }
        self.session
            .client
            .uid_store(&set, "+FLAGS.SILENT (\\Deleted)")
            .map_err(|e| e.in_phase(Phase::FlagDeleted, &sorted))?;
        self.expunge_uids(&sorted)
            .map_err(|e| e.in_phase(Phase::Expunge, &sorted))?;
        self.session.invalidate_messages(folder, &sorted);
        Ok(())
    }

    /// Append messages to a folder. Returns the UID of each, `None` where it could not be
    /// determined.
    pub fn append(
        &mut self,
        folder: &str,
        messages: &[&[u8]],
        flags: &[Flag<'_>],
    ) -> Result<Vec<Option<Uid>>> {
        self.append_marked(folder, messages, flags, &unique_marker())
    }

    fn append_marked(
        &mut self,
        folder: &str,
        messages: &[&[u8]],
        flags: &[Flag<'_>],
        marker: &str,
    ) -> Result<Vec<Option<Uid>>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        let wire = self.session.wire(folder);
        self.session.require(&wire, Right::Insert)?;

        let mut reported: Vec<Option<Uid>> = Vec::with_capacity(messages.len());
        for (i, content) in messages.iter().enumerate() {
            let appended = if i == 0 {
                let mut stamped = format!("{}: {}\r\n", APPEND_MARKER, marker).into_bytes();
                stamped.extend_from_slice(content);
                self.session.client.append(&wire, &stamped, flags, None)?
            } else {
                self.session.client.append(&wire, content, flags, None)?
            };
            reported.push(appended.uids.and_then(|uids| uids.first().copied()));
        }
        self.session.invalidate_folder(folder);
        if reported.iter().all(Option::is_some) {
            return Ok(reported);
        }

        log::debug!("no APPENDUID from {}, looking for the append marker", folder);
        let first = self
            .find_marker(&wire, marker)
            .map_err(|e| e.in_phase(Phase::DiscoverUids, &[]))?;
        Ok(match first {
            Some(first) => contiguous_uids(first, messages.len()).collect(),
            None => vec![None; messages.len()],
        })
    }

    fn find_marker(&mut self, wire: &str, marker: &str) -> Result<Option<Uid>> {
        self.session.open(wire)?;
        let query = format!("(UID BODY.PEEK[HEADER.FIELDS ({})])", APPEND_MARKER.to_uppercase());
        let fetches = self.session.client.uid_fetch("1:*", &query)?;
        Ok(fetches
            .iter()
            .filter(|f| f.header_value(APPEND_MARKER).as_deref() == Some(marker))
            .filter_map(|f| f.uid)
            .min())
    }
}

/// `count` UIDs counting up from `first`. UIDs past `u32::MAX` cannot exist and are `None`.
fn contiguous_uids(first: Uid, count: usize) -> impl Iterator<Item = Option<Uid>> {
    (0..count).map(move |i| Uid::try_from(i).ok().and_then(|i| first.checked_add(i)))
}

fn apply_range<T>(range: Option<IndexRange>, items: Vec<T>) -> Vec<T> {
    match range {
        Some(range) => range.apply(items),
        None => items,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::super::testing::*;
    use super::super::{KeywordSpamHandler, SpamHandler};
    use super::*;
    use crate::config::Config;
    use crate::mock_stream::MockStream;
    use crate::types::CapabilitySet;

    const SELECTED: &str = "* 3 EXISTS\r\n\
                            * FLAGS (\\Seen \\Deleted)\r\n\
                            * OK [PERMANENTFLAGS (\\Seen \\Deleted \\*)] Limited\r\n\
                            {tag} OK [READ-WRITE] Select completed\r\n";

    const SELECTED_NO_KEYWORDS: &str = "* 3 EXISTS\r\n\
                                        * OK [PERMANENTFLAGS (\\Seen \\Deleted)] Limited\r\n\
                                        {tag} OK [READ-WRITE] Select completed\r\n";

    fn with(caps: CapabilitySet, responses: &[&str]) -> Session<MockStream> {
        session(caps, Config::default(), responses)
    }

    fn uids(messages: &[Message]) -> Vec<Uid> {
        messages.iter().map(|m| m.uid).collect()
    }

    #[test]
    fn unsettable_flags_are_never_stored() {
        let mut session = with(plain(), &[SELECTED, "{tag} OK Store completed\r\n"]);
        let flags = SystemFlag::Seen | SystemFlag::Recent | SystemFlag::User | SystemFlag::Flagged;
        MessageStorage::new(&mut session)
            .update_flags("INBOX", &[5, 4], flags, true)
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID STORE 4:5 +FLAGS.SILENT (\\Seen \\Flagged)",
            ]
        );
    }

    #[test]
    fn only_unsettable_flags_send_nothing() {
        let mut session = with(plain(), &[]);
        MessageStorage::new(&mut session)
            .update_flags("INBOX", &[1], SystemFlag::Recent | SystemFlag::User, false)
            .unwrap();
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn flag_update_checks_every_right_first() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = with(
            caps,
            &["* MYRIGHTS \"INBOX\" lrsw\r\n{tag} OK Myrights completed\r\n"],
        );
        let result = MessageStorage::new(&mut session).update_flags(
            "INBOX",
            &[1],
            SystemFlag::Seen | SystemFlag::Deleted,
            true,
        );
        assert!(matches!(
            result,
            Err(Error::PermissionDenied { right: 't', .. })
        ));
        assert_eq!(commands(&mut session), vec!["MYRIGHTS \"INBOX\""]);
    }

    #[derive(Default)]
    struct RecordingSpamHandler {
        calls: Mutex<Vec<(String, Vec<Uid>, bool)>>,
    }

    impl SpamHandler<MockStream> for RecordingSpamHandler {
        fn handle_spam(
            &self,
            _: &mut MessageStorage<'_, MockStream>,
            folder: &str,
            uids: &[Uid],
            _: bool,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((folder.to_string(), uids.to_vec(), true));
            Ok(())
        }

        fn handle_ham(
            &self,
            _: &mut MessageStorage<'_, MockStream>,
            folder: &str,
            uids: &[Uid],
            _: bool,
        ) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((folder.to_string(), uids.to_vec(), false));
            Ok(())
        }
    }

    #[test]
    fn spam_flag_goes_to_spam_handling() {
        let handler = Arc::new(RecordingSpamHandler::default());
        let mut session = session(plain(), Config::default().spam_enabled(true), &[])
            .with_spam_handler(handler.clone());
        MessageStorage::new(&mut session)
            .update_flags("INBOX", &[8], EnumSet::only(SystemFlag::Spam), true)
            .unwrap();
        assert!(commands(&mut session).is_empty());
        assert_eq!(
            *handler.calls.lock().unwrap(),
            vec![("INBOX".to_string(), vec![8], true)]
        );
    }

    #[test]
    fn spam_flag_is_dropped_when_spam_handling_is_off() {
        let handler = Arc::new(RecordingSpamHandler::default());
        let mut session = session(plain(), Config::default(), &[]).with_spam_handler(handler.clone());
        MessageStorage::new(&mut session)
            .update_flags("INBOX", &[8], EnumSet::only(SystemFlag::Spam), false)
            .unwrap();
        assert!(handler.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn keyword_spam_handling() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "{tag} OK Store completed\r\n",
                "{tag} OK Store completed\r\n",
                SELECTED,
                "{tag} OK Store completed\r\n",
                "{tag} OK Store completed\r\n",
            ],
        );
        let mut messages = MessageStorage::new(&mut session);
        KeywordSpamHandler
            .handle_spam(&mut messages, "INBOX", &[8], false)
            .unwrap();
        // already in the inbox, nothing to move
        KeywordSpamHandler
            .handle_ham(&mut messages, "INBOX", &[8], true)
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID STORE 8 -FLAGS.SILENT ($NotJunk)",
                "UID STORE 8 +FLAGS.SILENT ($Junk)",
                "SELECT \"INBOX\"",
                "UID STORE 8 -FLAGS.SILENT ($Junk)",
                "UID STORE 8 +FLAGS.SILENT ($NotJunk)",
            ]
        );
    }

    #[test]
    fn color_label_clears_then_sets() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "{tag} OK Store completed\r\n",
                "{tag} OK Store completed\r\n",
            ],
        );
        MessageStorage::new(&mut session)
            .update_color_label("INBOX", &[3], ColorLabel::new(4).unwrap())
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID STORE 3 -FLAGS.SILENT (cl_0 cl_1 cl_2 cl_3 cl_4 cl_5 cl_6 cl_7 cl_8 cl_9 cl_10)",
                "UID STORE 3 +FLAGS.SILENT (cl_4)",
            ]
        );
    }

    #[test]
    fn color_label_needs_keyword_support() {
        let mut session = with(plain(), &[SELECTED_NO_KEYWORDS]);
        MessageStorage::new(&mut session)
            .update_color_label("INBOX", &[3], ColorLabel::new(4).unwrap())
            .unwrap();
        assert_eq!(commands(&mut session), vec!["SELECT \"INBOX\""]);

        let mut disabled = super::super::testing::session(
            plain(),
            Config::default().user_flags_enabled(false),
            &[],
        );
        MessageStorage::new(&mut disabled)
            .update_color_label("INBOX", &[3], ColorLabel::new(4).unwrap())
            .unwrap();
        assert!(commands(&mut disabled).is_empty());
    }

    #[test]
    fn expunge_spares_other_deleted_messages() {
        let caps = CapabilitySet {
            uidplus: true,
            ..plain()
        };
        let mut session = with(
            caps,
            &[
                SELECTED,
                "{tag} OK Store completed\r\n",
                "{tag} BAD Unknown command\r\n",
                "* SEARCH 5 7 9\r\n{tag} OK Search completed\r\n",
                "{tag} OK Store completed\r\n",
                "* 2 EXPUNGE\r\n* 2 EXPUNGE\r\n{tag} OK Expunge completed\r\n",
                "{tag} OK Store completed\r\n",
            ],
        );
        MessageStorage::new(&mut session)
            .delete_messages("INBOX", &[7, 5], true)
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID STORE 5,7 +FLAGS.SILENT (\\Deleted)",
                "UID EXPUNGE 5,7",
                "UID SEARCH DELETED",
                "UID STORE 9 -FLAGS.SILENT (\\Deleted)",
                "EXPUNGE",
                "UID STORE 9 +FLAGS.SILENT (\\Deleted)",
            ]
        );
    }

    #[test]
    fn soft_delete_copies_to_trash() {
        let mut session = with(
            plain(),
            &[
                "* LIST () \"/\" \"Drafts\"\r\n\
                 * LIST () \"/\" \"Sent\"\r\n\
                 * LIST () \"/\" \"Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Ham\"\r\n\
                 * LIST () \"/\" \"Trash\"\r\n\
                 {tag} OK List completed\r\n",
                SELECTED,
                "{tag} OK Copy completed\r\n",
                "{tag} OK Store completed\r\n",
                "* SEARCH 3\r\n{tag} OK Search completed\r\n",
                "* 3 EXPUNGE\r\n{tag} OK Expunge completed\r\n",
            ],
        );
        MessageStorage::new(&mut session)
            .delete_messages("INBOX", &[3], false)
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "LIST \"\" \"%\"",
                "SELECT \"INBOX\"",
                "UID COPY 3 \"Trash\"",
                "UID STORE 3 +FLAGS.SILENT (\\Deleted)",
                "UID SEARCH DELETED",
                "EXPUNGE",
            ]
        );
    }

    #[test]
    fn move_uses_copyuid() {
        let caps = CapabilitySet {
            uidplus: true,
            ..plain()
        };
        let mut session = with(
            caps,
            &[
                SELECTED,
                "{tag} OK [COPYUID 9 10:11 20:21] Copy completed\r\n",
                "{tag} OK Store completed\r\n",
                "* 1 EXPUNGE\r\n* 1 EXPUNGE\r\n{tag} OK Expunge completed\r\n",
            ],
        );
        let copies = MessageStorage::new(&mut session)
            .move_messages("INBOX", "Archive", &[11, 10], true)
            .unwrap();
        assert_eq!(copies, vec![Some(21), Some(20)]);
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID COPY 10:11 \"Archive\"",
                "UID STORE 10:11 +FLAGS.SILENT (\\Deleted)",
                "UID EXPUNGE 10:11",
            ]
        );
    }

    #[test]
    fn move_discovers_uids_by_message_id() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "{tag} OK Copy completed\r\n",
                "* 1 FETCH (UID 10 BODY[HEADER.FIELDS (MESSAGE-ID)] {21}\r\n\
                 Message-ID: <a@b>\r\n\r\n)\r\n\
                 {tag} OK Fetch completed\r\n",
                "{tag} OK Store completed\r\n",
                "* SEARCH 10 11 12\r\n{tag} OK Search completed\r\n",
                "* 1 EXPUNGE\r\n* 1 EXPUNGE\r\n* 1 EXPUNGE\r\n{tag} OK Expunge completed\r\n",
                "* 5 EXISTS\r\n{tag} OK [READ-WRITE] Select completed\r\n",
                "* SEARCH 40\r\n{tag} OK Search completed\r\n",
            ],
        );
        let copies = MessageStorage::new(&mut session)
            .move_messages("INBOX", "Archive", &[12, 10, 11], true)
            .unwrap();
        assert_eq!(copies, vec![Some(42), Some(40), Some(41)]);
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID COPY 10:12 \"Archive\"",
                "UID FETCH 10 (UID BODY.PEEK[HEADER.FIELDS (MESSAGE-ID)])",
                "UID STORE 10:12 +FLAGS.SILENT (\\Deleted)",
                "UID SEARCH DELETED",
                "EXPUNGE",
                "SELECT \"Archive\"",
                "UID SEARCH HEADER \"Message-ID\" \"<a@b>\"",
            ]
        );
    }

    #[test]
    fn failed_expunge_is_partial() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "{tag} OK Copy completed\r\n",
                "{tag} OK Store completed\r\n",
                "* SEARCH 4\r\n{tag} OK Search completed\r\n",
                "{tag} NO Expunge failed\r\n",
            ],
        );
        let result = MessageStorage::new(&mut session).move_messages("INBOX", "Archive", &[4], false);
        match result {
            Err(Error::PartiallyCompleted { phase, uids, .. }) => {
                assert_eq!(phase, Phase::Expunge);
                assert_eq!(uids, vec![4]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn move_to_same_folder_is_refused() {
        let mut session = with(plain(), &[]);
        assert!(matches!(
            MessageStorage::new(&mut session).move_messages("INBOX", "INBOX", &[1], false),
            Err(Error::SameFolder(_))
        ));
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn list_sorts_locally_without_sort() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "* SEARCH 1 2 3\r\n{tag} OK Search completed\r\n",
                "* 1 FETCH (UID 1 RFC822.SIZE 300)\r\n\
                 * 2 FETCH (UID 2 RFC822.SIZE 100)\r\n\
                 * 3 FETCH (UID 3 RFC822.SIZE 200)\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let request = ListRequest {
            sort: Some((SortField::Size, SortOrder::Descending)),
            range: Some(IndexRange::new(1, 2)),
            fields: MessageFields::uid_only(),
            ..ListRequest::default()
        };
        let messages = MessageStorage::new(&mut session).list("INBOX", &request).unwrap();
        assert_eq!(uids(&messages), vec![1, 3]);
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID SEARCH ALL",
                "UID FETCH 1:3 (UID RFC822.SIZE)",
            ]
        );
    }

    #[test]
    fn list_sorts_on_server() {
        let caps = CapabilitySet {
            sort: true,
            ..plain()
        };
        let mut session = with(
            caps,
            &[
                SELECTED,
                "* SORT 3 1 2\r\n{tag} OK Sort completed\r\n",
                "* 1 FETCH (UID 1 FLAGS (\\Seen))\r\n\
                 * 2 FETCH (UID 2 FLAGS ())\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let request = ListRequest {
            search: Some(SearchTerm::Flag(SystemFlag::Deleted, false)),
            sort: Some((SortField::Received, SortOrder::Descending)),
            range: Some(IndexRange::new(2, 10)),
            fields: MessageFields {
                flags: true,
                ..MessageFields::uid_only()
            },
        };
        let messages = MessageStorage::new(&mut session).list("INBOX", &request).unwrap();
        assert_eq!(uids(&messages), vec![1, 2]);
        assert!(messages[0].flags.contains(SystemFlag::Seen));
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "UID SORT (REVERSE ARRIVAL) UTF-8 UNDELETED",
                "UID FETCH 1:2 (UID FLAGS)",
            ]
        );
    }

    #[test]
    fn range_past_the_end_is_empty() {
        let mut session = with(
            plain(),
            &[SELECTED, "* SEARCH 1 2 3\r\n{tag} OK Search completed\r\n"],
        );
        let request = ListRequest {
            range: Some(IndexRange::new(4, 9)),
            ..ListRequest::default()
        };
        let messages = MessageStorage::new(&mut session).list("INBOX", &request).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn empty_folder_lists_nothing() {
        let mut session = with(
            plain(),
            &["* 0 EXISTS\r\n{tag} OK [READ-WRITE] Select completed\r\n"],
        );
        let messages = MessageStorage::new(&mut session)
            .list("INBOX", &ListRequest::default())
            .unwrap();
        assert!(messages.is_empty());
        assert_eq!(commands(&mut session), vec!["SELECT \"INBOX\""]);
    }

    #[test]
    fn thread_listing_assigns_levels() {
        let caps = CapabilitySet {
            thread_references: true,
            ..plain()
        };
        let mut session = with(
            caps,
            &[
                SELECTED,
                "* SEARCH 1 2 4\r\n{tag} OK Search completed\r\n",
                "* THREAD (1 2)(4)\r\n{tag} OK Thread completed\r\n",
                "* 1 FETCH (UID 11)\r\n\
                 * 2 FETCH (UID 12)\r\n\
                 * 4 FETCH (UID 14)\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let search = SearchTerm::From("joe".into());
        let messages = MessageStorage::new(&mut session)
            .thread_sorted_list("INBOX", Some(&search), None, MessageFields::uid_only())
            .unwrap();
        let levels: Vec<(Uid, usize)> = messages.iter().map(|m| (m.uid, m.thread_level)).collect();
        assert_eq!(levels, vec![(11, 0), (12, 1), (14, 0)]);
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"INBOX\"",
                "SEARCH FROM \"joe\"",
                "THREAD REFERENCES UTF-8 1,2,4",
                "FETCH 1,2,4 (UID)",
            ]
        );
    }

    #[test]
    fn threading_needs_references() {
        let mut session = with(plain(), &[]);
        assert!(matches!(
            MessageStorage::new(&mut session).thread_sorted_list(
                "INBOX",
                None,
                None,
                MessageFields::default()
            ),
            Err(Error::Unsupported("THREAD=REFERENCES"))
        ));
    }

    #[test]
    fn get_messages_keeps_input_order() {
        let mut session = with(
            plain(),
            &[
                SELECTED,
                "* 2 FETCH (UID 7 RFC822.SIZE 10)\r\n\
                 * 1 FETCH (UID 3 RFC822.SIZE 20)\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let fields = MessageFields {
            size: true,
            ..MessageFields::uid_only()
        };
        let messages = MessageStorage::new(&mut session)
            .get_messages("INBOX", &[7, 5, 3], fields)
            .unwrap();
        let sizes: Vec<Option<u32>> = messages
            .iter()
            .map(|m| m.as_ref().and_then(|m| m.size))
            .collect();
        assert_eq!(sizes, vec![Some(10), None, Some(20)]);
    }

    #[test]
    fn unread_uids_of_empty_folder() {
        let mut session = with(
            plain(),
            &[
                "* 0 EXISTS\r\n{tag} OK [READ-WRITE] Select completed\r\n",
                "{tag} NO No matching messages\r\n",
            ],
        );
        let unread = MessageStorage::new(&mut session).unread_uids("INBOX").unwrap();
        assert!(unread.is_empty());
    }

    #[test]
    fn append_reports_appenduid() {
        let mut session = with(
            plain(),
            &["+ go ahead\r\n{tag} OK [APPENDUID 38505 3955] Append completed\r\n"],
        );
        let uids = MessageStorage::new(&mut session)
            .append("Drafts", &[b"Subject: hi\r\n\r\nbody"], &[Flag::Draft])
            .unwrap();
        assert_eq!(uids, vec![Some(3955)]);
    }

    #[test]
    fn append_finds_marker() {
        let mut session = with(
            plain(),
            &[
                "+ go ahead\r\n{tag} OK Append completed\r\n",
                "+ go ahead\r\n{tag} OK Append completed\r\n",
                SELECTED,
                "* 1 FETCH (UID 7 BODY[HEADER.FIELDS (X-APPEND-MARKER)] {2}\r\n\r\n)\r\n\
                 * 2 FETCH (UID 8 BODY[HEADER.FIELDS (X-APPEND-MARKER)] {23}\r\n\
                 X-Append-Marker: m1\r\n\r\n)\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let uids = MessageStorage::new(&mut session)
            .append_marked(
                "Drafts",
                &[b"Subject: a\r\n\r\nx", b"Subject: b\r\n\r\ny"],
                &[],
                "m1",
            )
            .unwrap();
        assert_eq!(uids, vec![Some(8), Some(9)]);
        let sent = commands(&mut session);
        assert_eq!(sent[0], "APPEND \"Drafts\" {36}");
        assert_eq!(sent[1], "X-Append-Marker: m1");
        assert!(sent.contains(&"UID FETCH 1:* (UID BODY.PEEK[HEADER.FIELDS (X-APPEND-MARKER)])".to_string()));
    }

    #[test]
    fn append_without_marker_match_is_unknown() {
        let mut session = with(
            plain(),
            &[
                "+ go ahead\r\n{tag} OK Append completed\r\n",
                SELECTED,
                "{tag} OK Fetch completed\r\n",
            ],
        );
        let uids = MessageStorage::new(&mut session)
            .append_marked("Drafts", &[b"Subject: a\r\n\r\nx"], &[], "m2")
            .unwrap();
        assert_eq!(uids, vec![None]);
    }

    #[test]
    fn marker_at_the_last_uid() {
        let mut session = with(
            plain(),
            &[
                "+ go ahead\r\n{tag} OK Append completed\r\n",
                "+ go ahead\r\n{tag} OK Append completed\r\n",
                SELECTED,
                "* 1 FETCH (UID 4294967295 BODY[HEADER.FIELDS (X-APPEND-MARKER)] {23}\r\n\
                 X-Append-Marker: m3\r\n\r\n)\r\n\
                 {tag} OK Fetch completed\r\n",
            ],
        );
        let uids = MessageStorage::new(&mut session)
            .append_marked(
                "Drafts",
                &[b"Subject: a\r\n\r\nx", b"Subject: b\r\n\r\ny"],
                &[],
                "m3",
            )
            .unwrap();
        assert_eq!(uids, vec![Some(u32::MAX), None]);
    }

    #[test]
    fn contiguous_uids_stop_at_the_last_uid() {
        assert_eq!(
            contiguous_uids(41, 3).collect::<Vec<_>>(),
            vec![Some(41), Some(42), Some(43)]
        );
        assert_eq!(
            contiguous_uids(u32::MAX - 1, 3).collect::<Vec<_>>(),
            vec![Some(u32::MAX - 1), Some(u32::MAX), None]
        );
        assert_eq!(contiguous_uids(7, 0).count(), 0);
    }

    #[test]
    fn fetch_items() {
        assert_eq!(
            MessageFields::default().fetch_items(),
            "(UID FLAGS ENVELOPE RFC822.SIZE INTERNALDATE)"
        );
        assert_eq!(
            MessageFields::all().fetch_items(),
            "(UID FLAGS ENVELOPE RFC822.SIZE INTERNALDATE BODYSTRUCTURE BODY.PEEK[HEADER] BODY.PEEK[])"
        );
    }
}
