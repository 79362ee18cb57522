use std::str;

use imap_proto::Response as ProtoResponse;
use lazy_static::lazy_static;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use regex::Regex;

use super::error::{Error, ParseError, Result};
use super::types::*;

/// One logical line read from the server, literals included.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Line {
    /// The tagged completion of a command.
    Tagged(Completion),
    /// An untagged response or a continuation request.
    Untagged(Response),
}

fn invalid(line: &[u8]) -> Error {
    Error::Parse(ParseError::Invalid(line.to_vec()))
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_atom_char(c: u8) -> bool {
    c > b' ' && c < 0x7f && !matches!(c, b'(' | b')' | b'{' | b'"' | b'\\' | b'%' | b'*' | b']')
}

fn number(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(map_res(digit1, str::from_utf8), str::parse::<u32>)(input)
}

fn quoted(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = Vec::new();
    loop {
        match rest {
            [b'"', tail @ ..] => return Ok((tail, out)),
            [b'\\', c, tail @ ..] => {
                out.push(*c);
                rest = tail;
            }
            [c, tail @ ..] if *c != b'\r' && *c != b'\n' => {
                out.push(*c);
                rest = tail;
            }
            _ => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }
}

fn literal(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, len) = delimited(char('{'), number, char('}'))(input)?;
    let (input, _) = tag("\r\n")(input)?;
    map(take(len as usize), |data: &[u8]| data.to_vec())(input)
}

fn string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    alt((quoted, literal))(input)
}

fn astring(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    alt((
        string,
        map(
            take_while1(|c: u8| is_atom_char(c) || matches!(c, b']' | b'%' | b'*')),
            |a: &[u8]| a.to_vec(),
        ),
    ))(input)
}

fn nil(input: &[u8]) -> IResult<&[u8], ()> {
    map(tag_no_case("NIL"), |_| ())(input)
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Split `[CODE args] text` into its response code and text.
fn resp_text(input: &[u8]) -> (Option<ResponseCode>, String) {
    if let Some(inner) = input.strip_prefix(b"[") {
        if let Some(end) = inner.iter().position(|&c| c == b']') {
            let code = String::from_utf8_lossy(&inner[..end]).into_owned();
            let rest = &inner[end + 1..];
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            return (
                Some(response_code(&code)),
                String::from_utf8_lossy(rest).into_owned(),
            );
        }
    }
    (None, String::from_utf8_lossy(input).into_owned())
}

fn paren_words(args: &str) -> Vec<String> {
    args.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split_whitespace()
        .map(String::from)
        .collect()
}

fn response_code(code: &str) -> ResponseCode {
    let (name, args) = match code.split_once(' ') {
        Some((name, args)) => (name, Some(args.trim())),
        None => (code, None),
    };
    let num = |s: Option<&str>| s.and_then(|s| s.parse::<u32>().ok());
    let other = || ResponseCode::Other(name.to_string(), args.map(String::from));
    match (name.to_ascii_uppercase().as_str(), args) {
        ("ALERT", _) => ResponseCode::Alert,
        ("PARSE", _) => ResponseCode::Parse,
        ("READ-ONLY", _) => ResponseCode::ReadOnly,
        ("READ-WRITE", _) => ResponseCode::ReadWrite,
        ("TRYCREATE", _) => ResponseCode::TryCreate,
        ("OVERQUOTA", _) => ResponseCode::OverQuota,
        ("ALREADYEXISTS", _) => ResponseCode::AlreadyExists,
        ("NONEXISTENT", _) => ResponseCode::NonExistent,
        ("PERMANENTFLAGS", Some(args)) => ResponseCode::PermanentFlags(paren_words(args)),
        ("CAPABILITY", Some(args)) => {
            ResponseCode::Capability(args.split_whitespace().map(String::from).collect())
        }
        ("UIDVALIDITY", a) => num(a).map(ResponseCode::UidValidity).unwrap_or_else(other),
        ("UIDNEXT", a) => num(a).map(ResponseCode::UidNext).unwrap_or_else(other),
        ("UNSEEN", a) => num(a).map(ResponseCode::Unseen).unwrap_or_else(other),
        ("APPENDUID", Some(args)) => {
            let mut parts = args.split_whitespace();
            match (num(parts.next()), parts.next().and_then(|s| parse_uid_set(s).ok())) {
                (Some(uid_validity), Some(uids)) => ResponseCode::AppendUid { uid_validity, uids },
                _ => other(),
            }
        }
        ("COPYUID", Some(args)) => {
            let mut parts = args.split_whitespace();
            match (
                num(parts.next()),
                parts.next().and_then(|s| parse_uid_set(s).ok()),
                parts.next().and_then(|s| parse_uid_set(s).ok()),
            ) {
                (Some(uid_validity), Some(source), Some(destination)) => ResponseCode::CopyUid {
                    uid_validity,
                    source,
                    destination,
                },
                _ => other(),
            }
        }
        _ => other(),
    }
}

/// Expand a UID set such as `304,319:320` into its members, in the order given.
pub(crate) fn parse_uid_set(set: &str) -> Result<Vec<Uid>> {
    let mut uids = Vec::new();
    for part in set.split(',') {
        let bad = || invalid(set.as_bytes());
        match part.split_once(':') {
            Some((a, b)) => {
                let a: Uid = a.parse().map_err(|_| bad())?;
                let b: Uid = b.parse().map_err(|_| bad())?;
                if a <= b {
                    uids.extend(a..=b);
                } else {
                    uids.extend((b..=a).rev());
                }
            }
            None => uids.push(part.parse().map_err(|_| bad())?),
        }
    }
    Ok(uids)
}

/// Classify one logical line, which must include its trailing CRLF.
pub(crate) fn parse_line(line: &[u8]) -> Result<Line> {
    let body = trim_crlf(line);
    if let Some(rest) = body.strip_prefix(b"+") {
        let rest = rest.strip_prefix(b" ").unwrap_or(rest);
        return Ok(Line::Untagged(Response::Continue(
            String::from_utf8_lossy(rest).into_owned(),
        )));
    }
    if let Some(rest) = body.strip_prefix(b"* ") {
        return untagged(rest, line).map(Line::Untagged);
    }

    let (tagged, rest) = split_word(body).ok_or_else(|| invalid(line))?;
    let (word, rest) = split_word(rest).unwrap_or((rest, &[]));
    let status = str::from_utf8(word)
        .ok()
        .and_then(Status::from_word)
        .filter(|s| matches!(s, Status::Ok | Status::No | Status::Bad))
        .ok_or_else(|| invalid(line))?;
    let (code, text) = resp_text(rest);
    Ok(Line::Tagged(Completion {
        tag: String::from_utf8_lossy(tagged).into_owned(),
        status,
        code,
        text,
    }))
}

fn split_word(input: &[u8]) -> Option<(&[u8], &[u8])> {
    if input.is_empty() {
        return None;
    }
    match input.iter().position(|&c| c == b' ') {
        Some(i) => Some((&input[..i], &input[i + 1..])),
        None => Some((input, &[])),
    }
}

fn untagged(body: &[u8], raw: &[u8]) -> Result<Response> {
    let (first, rest) = split_word(body).ok_or_else(|| invalid(raw))?;
    let (number, keyword, args) = match str::from_utf8(first).ok().and_then(|s| s.parse().ok()) {
        Some(n) => {
            let (keyword, args) = split_word(rest).ok_or_else(|| invalid(raw))?;
            (Some(n), keyword, args)
        }
        None => (None, first, rest),
    };
    let keyword = String::from_utf8_lossy(keyword).to_ascii_uppercase();

    if number.is_none() {
        if let Some(status) = Status::from_word(&keyword) {
            let (code, text) = resp_text(args);
            return Ok(Response::Status { status, code, text });
        }
    }

    Ok(Response::Data(Data {
        number,
        keyword,
        args: args.to_vec(),
        raw: raw.to_vec(),
    }))
}

lazy_static! {
    static ref FETCH_UID: Regex = Regex::new(r"(?i)\bUID\s+(\d+)").unwrap();
    static ref FETCH_SIZE: Regex = Regex::new(r"(?i)\bRFC822\.SIZE\s+(\d+)").unwrap();
    static ref FETCH_FLAGS: Regex = Regex::new(r"(?i)\bFLAGS\s+\(([^)]*)\)").unwrap();
    static ref FETCH_DATE: Regex = Regex::new(r#"(?i)\bINTERNALDATE\s+"([^"]*)""#).unwrap();
}

/// Salvage what can be read from a `FETCH` line the grammar rejected.
fn fetch_fallback(data: &Data) -> Fetch {
    let args = data.args();
    let capture = |re: &Regex| {
        re.captures(&args)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    Fetch {
        message: data.number.unwrap_or_default(),
        uid: capture(&FETCH_UID).and_then(|s| s.parse().ok()),
        size: capture(&FETCH_SIZE).and_then(|s| s.parse().ok()),
        internal_date: capture(&FETCH_DATE)
            .as_deref()
            .and_then(crate::types::parse_internal_date),
        flags: capture(&FETCH_FLAGS)
            .map(|f| Flag::from_strs(f.split_whitespace()).collect()),
        ..Fetch::default()
    }
}

/// Every `FETCH` response, in the order received.
pub(crate) fn parse_fetches(responses: &Responses) -> Vec<Fetch> {
    responses
        .data("FETCH")
        .map(|data| match imap_proto::parser::parse_response(data.raw()) {
            Ok((_, ProtoResponse::Fetch(seq, attrs))) => Fetch::from_attributes(seq, &attrs),
            _ => {
                log::warn!(
                    "falling back to partial parse of FETCH response: {}",
                    String::from_utf8_lossy(data.raw()).trim_end()
                );
                fetch_fallback(data)
            }
        })
        .collect()
}

/// Message numbers of all `SEARCH` responses. Tokens that are not numbers are skipped.
pub(crate) fn parse_ids(responses: &Responses) -> Vec<u32> {
    let mut ids = Vec::new();
    for data in responses.data("SEARCH") {
        for token in data.args().split_whitespace() {
            match token.parse() {
                Ok(id) => ids.push(id),
                Err(_) => log::debug!("skipping SEARCH token {:?}", token),
            }
        }
    }
    ids
}

/// Message numbers of all `SORT` responses, in server order.
pub(crate) fn parse_sorted_ids(responses: &Responses) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for data in responses.data("SORT") {
        for token in data.args().split_whitespace() {
            let id = token
                .parse()
                .map_err(|_| ParseError::SortResult(token.to_string()))?;
            ids.push(id);
        }
    }
    Ok(ids)
}

/// The message numbers reported by `EXPUNGE` responses.
pub(crate) fn parse_expunge(responses: &Responses) -> Vec<Seq> {
    responses.data("EXPUNGE").filter_map(|d| d.number).collect()
}

fn thread_list(input: &[u8]) -> IResult<&[u8], Vec<ThreadNode>> {
    delimited(char('('), thread_members, char(')'))(input)
}

fn thread_members(input: &[u8]) -> IResult<&[u8], Vec<ThreadNode>> {
    let (input, chain) = separated_list0(space1, number)(input)?;
    let (input, _) = space0(input)?;
    let (input, nested) = many0(terminated(thread_list, space0))(input)?;
    let mut children: Vec<ThreadNode> = nested.into_iter().flatten().collect();

    // a group without a leading number holds siblings
    if chain.is_empty() {
        return Ok((input, children));
    }

    let mut node: Option<ThreadNode> = None;
    for message in chain.into_iter().rev() {
        let children = match node.take() {
            Some(child) => vec![child],
            None => std::mem::take(&mut children),
        };
        node = Some(ThreadNode { message, children });
    }
    Ok((input, node.into_iter().collect()))
}

/// Parse a forest of `THREAD` groups.
pub(crate) fn parse_threads(input: &[u8]) -> Result<Threads> {
    let input = trim_crlf(input);
    let forest = all_consuming(preceded(space0, many0(terminated(thread_list, space0))))(input);
    match forest {
        Ok((_, groups)) => Ok(Threads(groups.into_iter().flatten().collect())),
        Err(_) => Err(invalid(input)),
    }
}

/// The forest of the first `THREAD` response, empty if there is none.
pub(crate) fn parse_thread_response(responses: &Responses) -> Result<Threads> {
    match responses.data("THREAD").next() {
        Some(data) => parse_threads(data.args.as_slice()),
        None => Ok(Threads::default()),
    }
}

fn name_attributes(input: &[u8]) -> IResult<&[u8], Vec<NameAttribute>> {
    delimited(
        char('('),
        separated_list0(
            space1,
            map(
                take_while1(|c: u8| c > b' ' && c < 0x7f && c != b'(' && c != b')'),
                |a: &[u8]| NameAttribute::from(String::from_utf8_lossy(a).into_owned()),
            ),
        ),
        char(')'),
    )(input)
}

fn delimiter(input: &[u8]) -> IResult<&[u8], Option<char>> {
    alt((
        map(nil, |_| None),
        map(quoted, |q| q.first().map(|&c| c as char)),
    ))(input)
}

fn list_args(input: &[u8]) -> IResult<&[u8], Name> {
    let (input, (attributes, _, delimiter, _, name)) =
        tuple((name_attributes, space1, delimiter, space1, astring))(input)?;
    Ok((input, Name::new(attributes, delimiter, text(name))))
}

/// Every `LIST` (or `LSUB`, per `keyword`) response.
pub(crate) fn parse_names(responses: &Responses, keyword: &str) -> Result<Vec<Name>> {
    responses
        .data(keyword)
        .map(|data| {
            all_consuming(terminated(list_args, space0))(data.args.as_slice())
                .map(|(_, name)| name)
                .map_err(|_| invalid(data.raw()))
        })
        .collect()
}

fn namespace_extension(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = tuple((
        space1,
        string,
        space1,
        delimited(char('('), separated_list1(space1, string), char(')')),
    ))(input)?;
    Ok((input, ()))
}

fn namespace_entry(input: &[u8]) -> IResult<&[u8], Namespace> {
    let (input, (_, prefix, _, delimiter, _, _)) = tuple((
        char('('),
        string,
        space1,
        delimiter,
        many0(namespace_extension),
        char(')'),
    ))(input)?;
    Ok((
        input,
        Namespace {
            prefix: text(prefix),
            delimiter,
        },
    ))
}

fn namespace_list(input: &[u8]) -> IResult<&[u8], Vec<Namespace>> {
    alt((
        map(nil, |_| Vec::new()),
        delimited(
            char('('),
            many0(terminated(namespace_entry, space0)),
            char(')'),
        ),
    ))(input)
}

/// The namespaces of the first `NAMESPACE` response, empty if there is none.
pub(crate) fn parse_namespaces(responses: &Responses) -> Result<Namespaces> {
    let data = match responses.data("NAMESPACE").next() {
        Some(data) => data,
        None => return Ok(Namespaces::default()),
    };
    let parsed = all_consuming(terminated(
        tuple((
            namespace_list,
            preceded(space1, namespace_list),
            preceded(space1, namespace_list),
        )),
        space0,
    ))(data.args.as_slice());
    match parsed {
        Ok((_, (personal, other_users, shared))) => Ok(Namespaces {
            personal,
            other_users,
            shared,
        }),
        Err(_) => Err(invalid(data.raw())),
    }
}

fn acl_args(input: &[u8]) -> IResult<&[u8], Acl> {
    let (input, mailbox) = astring(input)?;
    let (input, acls) = many0(map(
        tuple((space1, astring, space1, astring)),
        |(_, identifier, _, rights)| AclEntry {
            identifier: text(identifier),
            rights: AclRightList::from(text(rights).as_str()),
        },
    ))(input)?;
    Ok((
        input,
        Acl {
            mailbox: text(mailbox),
            acls,
        },
    ))
}

/// The first `ACL` response.
pub(crate) fn parse_acl(responses: &Responses) -> Result<Acl> {
    let data = responses
        .data("ACL")
        .next()
        .ok_or_else(|| invalid(b"missing ACL response"))?;
    all_consuming(terminated(acl_args, space0))(data.args.as_slice())
        .map(|(_, acl)| acl)
        .map_err(|_| invalid(data.raw()))
}

/// The first `MYRIGHTS` response.
pub(crate) fn parse_my_rights(responses: &Responses) -> Result<MyRights> {
    let data = responses
        .data("MYRIGHTS")
        .next()
        .ok_or_else(|| invalid(b"missing MYRIGHTS response"))?;
    let parsed = all_consuming(terminated(
        tuple((astring, preceded(space1, opt(astring)))),
        space0,
    ))(data.args.as_slice());
    match parsed {
        Ok((_, (mailbox, rights))) => Ok(MyRights {
            mailbox: text(mailbox),
            rights: AclRightList::from(text(rights.unwrap_or_default()).as_str()),
        }),
        Err(_) => Err(invalid(data.raw())),
    }
}

/// Capabilities from `CAPABILITY` data, or failing that from a `[CAPABILITY ...]` code.
pub(crate) fn parse_capabilities(responses: &Responses) -> Capabilities {
    let mut names: Vec<String> = responses
        .data("CAPABILITY")
        .flat_map(|d| {
            d.args()
                .split_whitespace()
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect();
    if names.is_empty() {
        if let Some(ResponseCode::Capability(caps)) = responses
            .codes()
            .find(|c| matches!(c, ResponseCode::Capability(_)))
        {
            names = caps.clone();
        }
    }
    Capabilities::from_names(names)
}

/// The mailbox status reported while selecting.
pub(crate) fn parse_mailbox(responses: &Responses) -> Mailbox {
    let mut mailbox = Mailbox::default();
    for response in &responses.responses {
        match response {
            Response::Data(data) => match (data.number, data.keyword.as_str()) {
                (Some(n), "EXISTS") => mailbox.exists = n,
                (Some(n), "RECENT") => mailbox.recent = n,
                (None, "FLAGS") => mailbox.flags = paren_words(&data.args()),
                _ => {}
            },
            Response::Status {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => mailbox.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => mailbox.uid_next = Some(*v),
                ResponseCode::Unseen(v) => mailbox.unseen = Some(*v),
                ResponseCode::PermanentFlags(flags) => {
                    mailbox.permanent_flags = Some(flags.clone())
                }
                _ => {}
            },
            _ => {}
        }
    }
    mailbox.read_only = matches!(responses.completion.code, Some(ResponseCode::ReadOnly));
    mailbox
}
