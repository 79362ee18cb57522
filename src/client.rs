use std::io::{BufRead, Read, Write};
use std::str;

use bufstream::BufStream;
use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;

use super::error::{Error, ParseError, Result, ValidateError};
use super::extensions::sort::{SortCharset, SortCriteria, SortCriterion};
use super::extensions::thread::ThreadAlgorithm;
use super::parse::{
    parse_acl, parse_capabilities, parse_expunge, parse_fetches, parse_ids, parse_line,
    parse_mailbox, parse_my_rights, parse_names, parse_namespaces, parse_sorted_ids,
    parse_thread_response, Line,
};
use super::types::*;
use super::utils::iter_join;

static TAG_PREFIX: &str = "a";
const INITIAL_TAG: u32 = 0;
const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

macro_rules! quote {
    ($x:expr) => {
        format!("\"{}\"", $x.replace(r"\", r"\\").replace("\"", "\\\""))
    };
}

pub(crate) fn validate_str(value: &str) -> Result<String> {
    let quoted = quote!(value);
    if quoted.find('\n').is_some() {
        return Err(Error::Validate(ValidateError('\n')));
    }
    if quoted.find('\r').is_some() {
        return Err(Error::Validate(ValidateError('\r')));
    }
    Ok(quoted)
}

lazy_static! {
    /// What servers say when a message set matched nothing, typically over an empty folder.
    static ref NO_MATCH: Regex =
        Regex::new(r"(?i)no\s+matching\s+messages|no\s+messages?\s+(?:found|matched)|invalid\s+messageset")
            .unwrap();
}

/// The mailbox currently selected on a [`Client`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selected {
    /// Wire name of the mailbox.
    pub name: String,
    /// Status reported while selecting.
    pub mailbox: Mailbox,
}

/// Stream to interface with the IMAP server. This interface is only for the command stream.
///
/// Every command blocks until its tagged completion has been read. `NO` and `BAD` completions
/// become [`Error::CommandFailed`]; `BYE` and transport failures become
/// [`Error::ConnectionLost`], after which every further command fails the same way.
#[derive(Debug)]
pub struct Client<T: Read + Write> {
    stream: BufStream<T>,
    tag: u32,
    selected: Option<Selected>,
    broken: bool,
    logging_out: bool,
}

impl<T: Read + Write> Client<T> {
    /// Creates a new client with the underlying stream.
    pub fn new(stream: T) -> Client<T> {
        Client {
            stream: BufStream::new(stream),
            tag: INITIAL_TAG,
            selected: None,
            broken: false,
            logging_out: false,
        }
    }

    /// Read the server greeting. Fails with [`Error::ConnectionLost`] if the server says `BYE`.
    pub fn read_greeting(&mut self) -> Result<Response> {
        let line = self.read_logical_line()?;
        match parse_line(&line)? {
            Line::Untagged(Response::Status {
                status: Status::Bye,
                text,
                ..
            }) => {
                log::warn!("server refused connection: {}", text);
                Err(self.lost())
            }
            Line::Untagged(response) => Ok(response),
            Line::Tagged(_) => Err(Error::Parse(ParseError::Invalid(line))),
        }
    }

    /// Whether the transport has failed or the server has said goodbye.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// The currently selected mailbox, if any.
    pub fn selected(&self) -> Option<&Selected> {
        self.selected.as_ref()
    }

    /// Log in to the IMAP server.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Responses> {
        self.run_command_and_read_response(&format!(
            "LOGIN {} {}",
            validate_str(username)?,
            validate_str(password)?
        ))
    }

    /// Capability requests a listing of capabilities that the server supports.
    pub fn capabilities(&mut self) -> Result<Capabilities> {
        self.execute("CAPABILITY", |r| Ok(parse_capabilities(&r)))
    }

    /// Selects a mailbox
    pub fn select(&mut self, mailbox_name: &str) -> Result<Mailbox> {
        self.select_or_examine("SELECT", mailbox_name)
    }

    /// Examine is identical to Select, but the selected mailbox is identified as read-only
    pub fn examine(&mut self, mailbox_name: &str) -> Result<Mailbox> {
        self.select_or_examine("EXAMINE", mailbox_name)
    }

    fn select_or_examine(&mut self, command: &str, mailbox_name: &str) -> Result<Mailbox> {
        // a failed SELECT leaves no mailbox selected
        self.selected = None;
        let mut mailbox = self.execute(
            &format!("{} {}", command, validate_str(mailbox_name)?),
            |r| Ok(parse_mailbox(&r)),
        )?;
        mailbox.read_only |= command == "EXAMINE";
        self.selected = Some(Selected {
            name: mailbox_name.to_string(),
            mailbox: mailbox.clone(),
        });
        Ok(mailbox)
    }

    /// Close permanently removes all messages that have the \Deleted flag set from the currently
    /// selected mailbox, and returns to the authenticated state from the selected state.
    pub fn close(&mut self) -> Result<()> {
        self.run_command_and_check_ok("CLOSE")?;
        self.selected = None;
        Ok(())
    }

    /// Leave the selected state without expunging, see [RFC
    /// 3691](https://tools.ietf.org/html/rfc3691).
    pub fn unselect(&mut self) -> Result<()> {
        self.run_command_and_check_ok("UNSELECT")?;
        self.selected = None;
        Ok(())
    }

    /// Noop always succeeds, and it does nothing.
    pub fn noop(&mut self) -> Result<()> {
        self.run_command_and_check_ok("NOOP")
    }

    /// Logout informs the server that the client is done with the connection.
    pub fn logout(&mut self) -> Result<()> {
        self.logging_out = true;
        let result = self.run_command_and_check_ok("LOGOUT");
        self.selected = None;
        self.broken = true;
        result
    }

    /// Create creates a mailbox with the given name.
    pub fn create(&mut self, mailbox_name: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!("CREATE {}", validate_str(mailbox_name)?))
    }

    /// Delete permanently removes the mailbox with the given name.
    pub fn delete(&mut self, mailbox_name: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!("DELETE {}", validate_str(mailbox_name)?))
    }

    /// Rename changes the name of a mailbox.
    pub fn rename(&mut self, current_mailbox_name: &str, new_mailbox_name: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!(
            "RENAME {} {}",
            validate_str(current_mailbox_name)?,
            validate_str(new_mailbox_name)?
        ))
    }

    /// Subscribe adds the specified mailbox name to the server's set of "active" or "subscribed"
    /// mailboxes as returned by the LSUB command.
    pub fn subscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!("SUBSCRIBE {}", validate_str(mailbox)?))
    }

    /// Unsubscribe removes the specified mailbox name from the server's set of
    /// "active" or "subscribed mailboxes as returned by the LSUB command.
    pub fn unsubscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!("UNSUBSCRIBE {}", validate_str(mailbox)?))
    }

    /// The LIST command returns a subset of names from the complete set
    /// of all names available to the client.
    pub fn list(&mut self, reference_name: &str, mailbox_pattern: &str) -> Result<Vec<Name>> {
        self.execute(
            &format!(
                "LIST {} {}",
                validate_str(reference_name)?,
                validate_str(mailbox_pattern)?
            ),
            |r| parse_names(&r, "LIST"),
        )
    }

    /// The LSUB command returns a subset of names from the set of names
    /// that the user has declared as being "active" or "subscribed".
    pub fn lsub(&mut self, reference_name: &str, mailbox_pattern: &str) -> Result<Vec<Name>> {
        self.execute(
            &format!(
                "LSUB {} {}",
                validate_str(reference_name)?,
                validate_str(mailbox_pattern)?
            ),
            |r| parse_names(&r, "LSUB"),
        )
    }

    /// The [`NAMESPACE` command](https://tools.ietf.org/html/rfc2342#section-5) reports the
    /// prefixes of personal, other users' and shared mailboxes.
    pub fn namespace(&mut self) -> Result<Namespaces> {
        self.execute("NAMESPACE", |r| parse_namespaces(&r))
    }

    /// The [`GETACL` command](https://datatracker.ietf.org/doc/html/rfc4314#section-3.3)
    /// returns the access control list of a mailbox.
    pub fn get_acl(&mut self, mailbox_name: &str) -> Result<Acl> {
        self.execute(&format!("GETACL {}", validate_str(mailbox_name)?), |r| {
            parse_acl(&r)
        })
    }

    /// The [`SETACL` command](https://datatracker.ietf.org/doc/html/rfc4314#section-3.1)
    /// changes the rights of `identifier` on a mailbox.
    pub fn set_acl(
        &mut self,
        mailbox_name: &str,
        identifier: &str,
        rights: &AclRightList,
        modification: AclModifyMode,
    ) -> Result<()> {
        let rights = format!("{}{}", modification.prefix(), rights);
        self.run_command_and_check_ok(&format!(
            "SETACL {} {} {}",
            validate_str(mailbox_name)?,
            validate_str(identifier)?,
            validate_str(&rights)?
        ))
    }

    /// The [`DELETEACL` command](https://datatracker.ietf.org/doc/html/rfc4314#section-3.2)
    /// removes `identifier` from the access control list of a mailbox.
    pub fn delete_acl(&mut self, mailbox_name: &str, identifier: &str) -> Result<()> {
        self.run_command_and_check_ok(&format!(
            "DELETEACL {} {}",
            validate_str(mailbox_name)?,
            validate_str(identifier)?
        ))
    }

    /// The [`MYRIGHTS` command](https://datatracker.ietf.org/doc/html/rfc4314#section-3.5)
    /// returns the rights the logged in user has on a mailbox.
    pub fn my_rights(&mut self, mailbox_name: &str) -> Result<MyRights> {
        self.execute(&format!("MYRIGHTS {}", validate_str(mailbox_name)?), |r| {
            parse_my_rights(&r)
        })
    }

    /// Searches the selected mailbox, returning matching message sequence numbers.
    pub fn search(&mut self, query: &str) -> Result<Vec<Seq>> {
        self.execute_tolerant(&format!("SEARCH {}", query), |r| Ok(parse_ids(&r)))
    }

    /// Like [`Client::search`], but returns unique identifiers.
    pub fn uid_search(&mut self, query: &str) -> Result<Vec<Uid>> {
        self.execute_tolerant(&format!("UID SEARCH {}", query), |r| Ok(parse_ids(&r)))
    }

    /// Searches and sorts on the server, see [RFC 5256](https://tools.ietf.org/html/rfc5256).
    /// Returns message sequence numbers in sorted order.
    pub fn sort(
        &mut self,
        criteria: &[SortCriterion],
        charset: SortCharset<'_>,
        query: &str,
    ) -> Result<Vec<Seq>> {
        self.execute_tolerant(
            &format!("SORT {} {} {}", SortCriteria(criteria), charset, query),
            |r| parse_sorted_ids(&r),
        )
    }

    /// Like [`Client::sort`], but returns unique identifiers.
    pub fn uid_sort(
        &mut self,
        criteria: &[SortCriterion],
        charset: SortCharset<'_>,
        query: &str,
    ) -> Result<Vec<Uid>> {
        self.execute_tolerant(
            &format!("UID SORT {} {} {}", SortCriteria(criteria), charset, query),
            |r| parse_sorted_ids(&r),
        )
    }

    /// Threads the messages matching `query`, see [RFC
    /// 5256](https://tools.ietf.org/html/rfc5256#section-4). Nodes carry sequence numbers.
    pub fn thread(
        &mut self,
        algorithm: ThreadAlgorithm,
        charset: SortCharset<'_>,
        query: &str,
    ) -> Result<Threads> {
        self.execute_tolerant(
            &format!("THREAD {} {} {}", algorithm, charset, query),
            |r| parse_thread_response(&r),
        )
    }

    /// Fetch retrieves data associated with a set of messages in the mailbox.
    pub fn fetch(&mut self, sequence_set: &str, query: &str) -> Result<Vec<Fetch>> {
        self.execute_tolerant(&format!("FETCH {} {}", sequence_set, query), |r| {
            Ok(parse_fetches(&r))
        })
    }

    /// Equivalent to [`Client::fetch`], except that all identifiers in `uid_set` are
    /// [`Uid`]s.
    pub fn uid_fetch(&mut self, uid_set: &str, query: &str) -> Result<Vec<Fetch>> {
        self.execute_tolerant(&format!("UID FETCH {} {}", uid_set, query), |r| {
            Ok(parse_fetches(&r))
        })
    }

    /// Store alters data associated with a message in the mailbox.
    pub fn store(&mut self, sequence_set: &str, query: &str) -> Result<Vec<Fetch>> {
        self.execute_tolerant(&format!("STORE {} {}", sequence_set, query), |r| {
            Ok(parse_fetches(&r))
        })
    }

    /// Equivalent to [`Client::store`], except that all identifiers in `uid_set` are
    /// [`Uid`]s.
    pub fn uid_store(&mut self, uid_set: &str, query: &str) -> Result<Vec<Fetch>> {
        self.execute_tolerant(&format!("UID STORE {} {}", uid_set, query), |r| {
            Ok(parse_fetches(&r))
        })
    }

    /// Copy copies the specified messages to the end of the specified destination mailbox.
    pub fn copy(&mut self, sequence_set: &str, mailbox_name: &str) -> Result<Copied> {
        self.execute_tolerant(
            &format!("COPY {} {}", sequence_set, validate_str(mailbox_name)?),
            |r| Ok(Copied::from_responses(&r)),
        )
    }

    /// Equivalent to [`Client::copy`], except that all identifiers in `uid_set` are
    /// [`Uid`]s. The `COPYUID` mapping is returned if the server sent one.
    pub fn uid_copy(&mut self, uid_set: &str, mailbox_name: &str) -> Result<Copied> {
        self.execute_tolerant(
            &format!("UID COPY {} {}", uid_set, validate_str(mailbox_name)?),
            |r| Ok(Copied::from_responses(&r)),
        )
    }

    /// Expunge permanently removes all messages that have the \Deleted flag set from the currently
    /// selected mailbox. The sequence numbers of the removed messages are returned.
    pub fn expunge(&mut self) -> Result<Vec<Seq>> {
        self.execute("EXPUNGE", |r| Ok(parse_expunge(&r)))
    }

    /// Permanently removes only the given messages, and only if they have the \Deleted flag
    /// set. Requires [`UIDPLUS`](https://tools.ietf.org/html/rfc4315#section-2.1).
    pub fn uid_expunge(&mut self, uid_set: &str) -> Result<Vec<Seq>> {
        self.execute(&format!("UID EXPUNGE {}", uid_set), |r| Ok(parse_expunge(&r)))
    }

    /// The APPEND command adds a mail to a mailbox, with the given flags and internal date.
    pub fn append(
        &mut self,
        mailbox_name: &str,
        content: &[u8],
        flags: &[Flag<'_>],
        date: Option<DateTime<FixedOffset>>,
    ) -> Result<Appended> {
        let mut command = format!("APPEND {}", validate_str(mailbox_name)?);
        if !flags.is_empty() {
            command.push_str(&format!(" ({})", iter_join(flags, " ")));
        }
        if let Some(date) = date {
            command.push_str(&format!(" \"{}\"", date.format("%d-%b-%Y %H:%M:%S %z")));
        }
        command.push_str(&format!(" {{{}}}", content.len()));

        let tag = self.run_command(&command)?;
        let mut early = Vec::new();
        loop {
            let line = self.read_logical_line()?;
            match parse_line(&line)? {
                Line::Untagged(Response::Continue(_)) => break,
                Line::Untagged(Response::Status {
                    status: Status::Bye,
                    ..
                }) => return Err(self.lost()),
                Line::Untagged(response) => early.push(response),
                Line::Tagged(completion) => {
                    // the server refused the literal
                    let responses = check(self.complete(&tag, early, completion)?)?;
                    return Ok(Appended::from_responses(&responses));
                }
            }
        }

        self.write_raw(content)?;
        self.write_line(b"")?;
        let mut responses = self.read_response(&tag)?;
        early.append(&mut responses.responses);
        responses.responses = early;
        Ok(Appended::from_responses(&check(responses)?))
    }

    /// Run a command and check that it completed with `OK`.
    pub fn run_command_and_check_ok(&mut self, command: &str) -> Result<()> {
        self.run_command_and_read_response(command).map(|_| ())
    }

    /// Run a command and collect everything the server sent for it. `NO` and `BAD` become
    /// errors.
    pub fn run_command_and_read_response(&mut self, command: &str) -> Result<Responses> {
        let tag = self.run_command(command)?;
        let responses = self.read_response(&tag)?;
        check(responses)
    }

    /// Run a command and hand its responses to `parse`.
    pub fn execute<R>(
        &mut self,
        command: &str,
        parse: impl FnOnce(Responses) -> Result<R>,
    ) -> Result<R> {
        self.run_command_and_read_response(command).and_then(parse)
    }

    /// Like [`Client::execute`], but a `NO` saying that no message matched is an empty result.
    fn execute_tolerant<R>(
        &mut self,
        command: &str,
        parse: impl FnOnce(Responses) -> Result<R>,
    ) -> Result<R> {
        let tag = self.run_command(command)?;
        let responses = self.read_response(&tag)?;
        match responses.completion.status {
            Status::No if NO_MATCH.is_match(&responses.completion.text) => {
                log::debug!(
                    "treating \"{}\" as empty result of {}",
                    responses.completion.text,
                    command
                );
                parse(Responses::empty(tag))
            }
            _ => check(responses).and_then(parse),
        }
    }

    /// Runs any command passed to it. Returns the tag used.
    fn run_command(&mut self, untagged_command: &str) -> Result<String> {
        if self.broken {
            return Err(Error::ConnectionLost);
        }
        let (tag, command) = self.create_command(untagged_command);
        if untagged_command.starts_with("LOGIN ") {
            log::trace!("C: {} LOGIN <redacted>", tag);
        } else {
            log::trace!("C: {}", command);
        }
        self.write_line(command.as_bytes())?;
        Ok(tag)
    }

    fn read_response(&mut self, tag: &str) -> Result<Responses> {
        let mut responses = Vec::new();
        loop {
            let line = self.read_logical_line()?;
            match parse_line(&line)? {
                Line::Tagged(completion) => return self.complete(tag, responses, completion),
                Line::Untagged(Response::Status {
                    status: Status::Bye,
                    text,
                    ..
                }) => {
                    // expected in answer to LOGOUT, fatal for anything else
                    if self.logging_out {
                        responses.push(Response::Status {
                            status: Status::Bye,
                            code: None,
                            text,
                        });
                        continue;
                    }
                    log::debug!("server closed the connection: {}", text);
                    return Err(self.lost());
                }
                Line::Untagged(response) => responses.push(response),
            }
        }
    }

    fn complete(
        &self,
        tag: &str,
        responses: Vec<Response>,
        completion: Completion,
    ) -> Result<Responses> {
        if completion.tag != tag {
            return Err(ParseError::Tag(completion.tag).into());
        }
        Ok(Responses {
            responses,
            completion,
        })
    }

    /// Read one line, plus any literal it announces and the rest of the line after it.
    fn read_logical_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let start = line.len();
            self.readline(&mut line)?;
            match literal_len(&line[start..]) {
                Some(len) => {
                    let at = line.len();
                    line.resize(at + len, 0);
                    if let Err(e) = self.stream.read_exact(&mut line[at..]) {
                        log::debug!("transport failed reading literal: {}", e);
                        return Err(self.lost());
                    }
                }
                None => return Ok(line),
            }
        }
    }

    fn readline(&mut self, into: &mut Vec<u8>) -> Result<usize> {
        let read = match self.stream.read_until(LF, into) {
            Ok(0) => return Err(self.lost()),
            Ok(read) => read,
            Err(e) => {
                log::debug!("transport failed: {}", e);
                return Err(self.lost());
            }
        };

        if log::log_enabled!(log::Level::Trace) {
            let line = &into[into.len() - read..];
            log::trace!("S: {}", String::from_utf8_lossy(line).trim_end());
        }

        Ok(read)
    }

    fn create_command(&mut self, command: &str) -> (String, String) {
        self.tag += 1;
        let tag = format!("{}{}", TAG_PREFIX, self.tag);
        let command = format!("{} {}", tag, command);
        (tag, command)
    }

    fn write_line(&mut self, buf: &[u8]) -> Result<()> {
        self.write_raw(buf)?;
        self.write_raw(&[CR, LF])?;
        if let Err(e) = self.stream.flush() {
            log::debug!("transport failed: {}", e);
            return Err(self.lost());
        }
        Ok(())
    }

    fn write_raw(&mut self, buf: &[u8]) -> Result<()> {
        if let Err(e) = self.stream.write_all(buf) {
            log::debug!("transport failed: {}", e);
            return Err(self.lost());
        }
        Ok(())
    }

    /// Mark the connection unusable.
    fn lost(&mut self) -> Error {
        self.broken = true;
        self.selected = None;
        Error::ConnectionLost
    }

    #[cfg(test)]
    pub(crate) fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }
}

/// Turn a `NO` or `BAD` completion into an error.
fn check(responses: Responses) -> Result<Responses> {
    match responses.completion.status {
        Status::Ok => Ok(responses),
        status => Err(Error::command_failed(
            status,
            responses.completion.code.as_ref(),
            responses.completion.text.clone(),
        )),
    }
}

/// The length of the literal a line ends with, e.g. 42 for `... {42}\r\n`.
fn literal_len(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"}\r\n")?;
    let open = body.iter().rposition(|&c| c == b'{')?;
    str::from_utf8(&body[open + 1..]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::super::error::CommandFailureKind;
    use super::super::mock_stream::MockStream;
    use super::*;

    fn client(responses: &[&str]) -> Client<MockStream> {
        Client::new(MockStream::scripted(None, responses))
    }

    fn written(client: &Client<MockStream>) -> String {
        String::from_utf8(client.get_ref().written_buf.clone()).unwrap()
    }

    #[test]
    fn read_greeting() {
        let greeting = "* OK [CAPABILITY IMAP4rev1 ACL] Dovecot ready.\r\n";
        let mut client = Client::new(MockStream::new(greeting.as_bytes().to_vec()));
        match client.read_greeting().unwrap() {
            Response::Status { status, code, .. } => {
                assert_eq!(status, Status::Ok);
                assert!(matches!(code, Some(ResponseCode::Capability(_))));
            }
            other => panic!("unexpected greeting {:?}", other),
        }
    }

    #[test]
    fn greeting_bye() {
        let mut client = Client::new(MockStream::new(b"* BYE Too many connections\r\n".to_vec()));
        assert!(matches!(client.read_greeting(), Err(Error::ConnectionLost)));
        assert!(client.is_broken());
    }

    #[test]
    fn readline_delay_read() {
        let greeting = "* OK Dovecot ready.\r\n";
        let mock_stream = MockStream::default()
            .with_buf(greeting.as_bytes().to_vec())
            .with_delay();
        let mut client = Client::new(mock_stream);
        let mut v = Vec::new();
        client.readline(&mut v).unwrap();
        assert_eq!(greeting, String::from_utf8(v).unwrap());
    }

    #[test]
    fn readline_eof() {
        let mock_stream = MockStream::default().with_eof();
        let mut client = Client::new(mock_stream);
        let mut v = Vec::new();
        if let Err(Error::ConnectionLost) = client.readline(&mut v) {
        } else {
            unreachable!("EOF read did not return connection lost");
        }
    }

    #[test]
    fn transport_error_breaks_client() {
        let mut client = Client::new(MockStream::default().with_err());
        assert!(matches!(client.noop(), Err(Error::ConnectionLost)));
        // nothing is written once broken
        let before = client.get_ref().written_buf.len();
        assert!(matches!(client.noop(), Err(Error::ConnectionLost)));
        assert_eq!(client.get_ref().written_buf.len(), before);
    }

    #[test]
    fn create_command() {
        let mut imap_stream = Client::new(MockStream::default());
        assert_eq!(
            imap_stream.create_command("CHECK"),
            ("a1".to_string(), "a1 CHECK".to_string())
        );
        assert_eq!(
            imap_stream.create_command("CHECK"),
            ("a2".to_string(), "a2 CHECK".to_string())
        );
    }

    #[test]
    fn login() {
        let mut client = client(&["{tag} OK Logged in\r\n"]);
        client.login("username", "pass\"word").unwrap();
        assert_eq!(written(&client), "a1 LOGIN \"username\" \"pass\\\"word\"\r\n");
    }

    #[test]
    fn logout_accepts_bye() {
        let mut client = client(&["* BYE Logging out\r\n{tag} OK Logout completed.\r\n"]);
        client.logout().unwrap();
        assert_eq!(written(&client), "a1 LOGOUT\r\n");
        assert!(client.is_broken());
    }

    #[test]
    fn unexpected_bye_is_connection_lost() {
        let mut client = client(&["* BYE Server shutting down\r\n"]);
        assert!(matches!(client.noop(), Err(Error::ConnectionLost)));
        assert!(client.is_broken());
    }

    #[test]
    fn no_response_is_classified() {
        let mut client = client(&["{tag} NO [OVERQUOTA] Quota exceeded\r\n"]);
        match client.create("Archive") {
            Err(Error::CommandFailed { status, kind, .. }) => {
                assert_eq!(status, Status::No);
                assert_eq!(kind, CommandFailureKind::QuotaExceeded);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!client.is_broken());
    }

    #[test]
    fn wrong_tag() {
        let mut client = client(&["a9 OK done\r\n"]);
        assert!(matches!(
            client.noop(),
            Err(Error::Parse(ParseError::Tag(ref tag))) if tag == "a9"
        ));
    }

    #[test]
    fn rename() {
        let mut client = client(&["{tag} OK RENAME completed\r\n"]);
        client.rename("INBOX/Old", "INBOX/New").unwrap();
        assert_eq!(written(&client), "a1 RENAME \"INBOX/Old\" \"INBOX/New\"\r\n");
    }

    #[test]
    fn subscribe_and_unsubscribe() {
        let mut client = client(&["{tag} OK done\r\n", "{tag} OK done\r\n"]);
        client.subscribe("Drafts").unwrap();
        client.unsubscribe("Drafts").unwrap();
        assert_eq!(
            client.get_ref().commands(),
            vec!["SUBSCRIBE \"Drafts\"", "UNSUBSCRIBE \"Drafts\""]
        );
    }

    #[test]
    fn select_and_close() {
        let mut client = client(&[
            "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
             * OK [PERMANENTFLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)] Flags permitted.\r\n\
             * 3 EXISTS\r\n\
             * 0 RECENT\r\n\
             * OK [UIDVALIDITY 1257842737] UIDs valid\r\n\
             * OK [UIDNEXT 4] Predicted next UID\r\n\
             {tag} OK [READ-WRITE] Select completed.\r\n",
            "{tag} OK Close completed.\r\n",
        ]);
        let mailbox = client.select("INBOX").unwrap();
        assert_eq!(mailbox.exists, 3);
        assert_eq!(mailbox.uid_next, Some(4));
        assert!(!mailbox.supports_user_flags());
        assert_eq!(client.selected().map(|s| s.name.as_str()), Some("INBOX"));
        client.close().unwrap();
        assert!(client.selected().is_none());
    }

    #[test]
    fn failed_select_clears_selection() {
        let mut client = client(&[
            "* 1 EXISTS\r\n{tag} OK [READ-ONLY] Examine completed.\r\n",
            "{tag} NO Mailbox doesn't exist\r\n",
        ]);
        assert!(client.examine("INBOX").unwrap().read_only);
        assert!(client.select("Nope").is_err());
        assert!(client.selected().is_none());
    }

    #[test]
    fn capability() {
        let mut client = client(&["* CAPABILITY IMAP4rev1 STARTTLS AUTH=GSSAPI LOGINDISABLED\r\n{tag} OK CAPABILITY completed\r\n"]);
        let capabilities = client.capabilities().unwrap();
        assert_eq!(written(&client), "a1 CAPABILITY\r\n");
        assert_eq!(capabilities.len(), 4);
        for e in ["IMAP4rev1", "STARTTLS", "AUTH=GSSAPI", "LOGINDISABLED"] {
            assert!(capabilities.has(e));
        }
    }

    #[test]
    fn list_with_literal_name() {
        let mut client = client(&[
            "* LIST (\\HasChildren) \"/\" INBOX\r\n\
             * LIST () \"/\" {11}\r\nINBOX/Notes\r\n\
             {tag} OK List completed.\r\n",
        ]);
        let names = client.list("", "INBOX/%").unwrap();
        assert_eq!(written(&client), "a1 LIST \"\" \"INBOX/%\"\r\n");
        assert_eq!(names.len(), 2);
        assert_eq!(names[1].name(), "INBOX/Notes");
    }

    #[test]
    fn fetch_body() {
        let mut client = client(&[
            "* 2 FETCH (UID 8 BODY[] {3}\r\nfoo)\r\n{tag} OK FETCH completed\r\n",
        ]);
        let fetches = client.uid_fetch("8", "(UID BODY.PEEK[])").unwrap();
        assert_eq!(written(&client), "a1 UID FETCH 8 (UID BODY.PEEK[])\r\n");
        assert_eq!(fetches[0].body(), Some(&b"foo"[..]));
        assert_eq!(fetches[0].uid, Some(8));
    }

    #[test]
    fn no_matching_messages_is_empty() {
        let mut client = client(&[
            "{tag} NO No matching messages\r\n",
            "{tag} NO Invalid messageset\r\n",
            "{tag} NO Some other failure\r\n",
        ]);
        assert!(client.uid_search("ALL").unwrap().is_empty());
        assert!(client.uid_fetch("1:*", "(FLAGS)").unwrap().is_empty());
        assert!(client.uid_store("1:*", "+FLAGS (\\Seen)").is_err());
    }

    #[test]
    fn uid_copy_returns_mapping() {
        let mut client = client(&["{tag} OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n"]);
        let copied = client.uid_copy("304,319:320", "Trash").unwrap();
        assert_eq!(written(&client), "a1 UID COPY 304,319:320 \"Trash\"\r\n");
        assert_eq!(copied.destination_of(320), Some(3958));
    }

    #[test]
    fn store_flags() {
        let mut client = client(&["* 3 FETCH (UID 9 FLAGS (\\Seen))\r\n{tag} OK Store completed\r\n"]);
        let fetches = client.uid_store("9", "+FLAGS (\\Seen)").unwrap();
        assert_eq!(written(&client), "a1 UID STORE 9 +FLAGS (\\Seen)\r\n");
        assert_eq!(fetches[0].flags(), &[Flag::Seen]);
    }

    #[test]
    fn expunge_reports_sequence_numbers() {
        let mut client = client(&["* 3 EXPUNGE\r\n* 3 EXPUNGE\r\n{tag} OK Expunge completed\r\n"]);
        assert_eq!(client.uid_expunge("5,7").unwrap(), vec![3, 3]);
        assert_eq!(written(&client), "a1 UID EXPUNGE 5,7\r\n");
    }

    #[test]
    fn sort_and_thread() {
        let mut client = client(&[
            "* SORT 5 3 4\r\n{tag} OK Sort completed\r\n",
            "* THREAD (2)(3 6 (4 23)(44 7 96))\r\n{tag} OK Thread completed\r\n",
        ]);
        let sorted = client
            .uid_sort(&[SortCriterion::Arrival.reversed()], SortCharset::Utf8, "ALL")
            .unwrap();
        assert_eq!(sorted, vec![5, 3, 4]);
        let threads = client
            .thread(ThreadAlgorithm::References, SortCharset::Utf8, "ALL")
            .unwrap();
        assert_eq!(threads.render(), "(2)(3 6 (4 23)(44 7 96))");
        assert_eq!(
            client.get_ref().commands(),
            vec![
                "UID SORT (REVERSE ARRIVAL) UTF-8 ALL",
                "THREAD REFERENCES UTF-8 ALL"
            ]
        );
    }

    #[test]
    fn acl_commands() {
        let mut client = client(&[
            "* ACL INBOX joe lrswipkxtecda\r\n{tag} OK Getacl completed\r\n",
            "{tag} OK Setacl completed\r\n",
            "{tag} OK Deleteacl completed\r\n",
            "* MYRIGHTS INBOX lr\r\n{tag} OK Myrights completed\r\n",
        ]);
        let acl = client.get_acl("INBOX").unwrap();
        assert_eq!(acl.acls[0].identifier, "joe");
        client
            .set_acl("INBOX", "anyone", &"lr".into(), AclModifyMode::Add)
            .unwrap();
        client.delete_acl("INBOX", "anyone").unwrap();
        assert!(client.my_rights("INBOX").unwrap().rights.has_right('r'));
        assert_eq!(
            client.get_ref().commands(),
            vec![
                "GETACL \"INBOX\"",
                "SETACL \"INBOX\" \"anyone\" \"+lr\"",
                "DELETEACL \"INBOX\" \"anyone\"",
                "MYRIGHTS \"INBOX\"",
            ]
        );
    }

    #[test]
    fn append_with_flags() {
        let mut client = client(&[
            "+ Ready for literal data\r\n{tag} OK [APPENDUID 38505 3955] APPEND completed\r\n",
        ]);
        let appended = client
            .append("Drafts", b"Subject: hi\r\n\r\nbody", &[Flag::Draft, Flag::Seen], None)
            .unwrap();
        assert_eq!(appended.uids, Some(vec![3955]));
        assert_eq!(
            written(&client),
            "a1 APPEND \"Drafts\" (\\Draft \\Seen) {19}\r\nSubject: hi\r\n\r\nbody\r\n"
        );
    }

    #[test]
    fn append_refused() {
        let mut client = client(&["{tag} NO [TRYCREATE] Mailbox doesn't exist\r\n"]);
        assert!(matches!(
            client.append("Nope", b"x", &[], None),
            Err(Error::CommandFailed { .. })
        ));
        assert_eq!(written(&client), "a1 APPEND \"Nope\" {1}\r\n");
    }

    #[test]
    fn namespace() {
        let mut client = client(&[
            "* NAMESPACE ((\"INBOX/\" \"/\")) NIL ((\"Shared/\" \"/\"))\r\n{tag} OK done\r\n",
        ]);
        let ns = client.namespace().unwrap();
        assert_eq!(ns.personal[0].prefix, "INBOX/");
        assert_eq!(ns.shared[0].root_name(), "Shared");
    }

    #[test]
    fn literal_length() {
        assert_eq!(literal_len(b"* 1 FETCH (BODY[] {42}\r\n"), Some(42));
        assert_eq!(literal_len(b"* OK done\r\n"), None);
        assert_eq!(literal_len(b"* OK {x}\r\n"), None);
    }

    #[test]
    fn quote_backslash() {
        assert_eq!("\"test\\\\text\"", quote!(r"test\text"));
    }

    #[test]
    fn quote_dquote() {
        assert_eq!("\"test\\\"text\"", quote!("test\"text"));
    }

    #[test]
    fn validate_newline() {
        if let Err(ref e) = validate_str("test\nstring") {
            if let Error::Validate(ref ve) = e {
                if ve.0 == '\n' {
                    return;
                }
            }
            panic!("Wrong error: {:?}", e);
        }
        panic!("No error");
    }

    #[test]
    fn validate_carriage_return() {
        assert!(matches!(
            validate_str("test\rstring"),
            Err(Error::Validate(ValidateError('\r')))
        ));
    }
}
