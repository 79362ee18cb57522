use std::fmt::Write;

use crate::types::Uid;

/// Joins an iterator of [std::fmt::Display]'ables to a new [std::string::String].
pub(crate) fn iter_join<I, T>(iter: I, delim: &str) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let mut s = String::new();
    let mut it = iter.into_iter().peekable();
    while let Some(n) = it.next() {
        let _ = write!(s, "{}", n);
        if it.peek().is_some() {
            s.push_str(delim);
        }
    }
    s
}

/// Render UIDs as a compact sequence set: sorted, deduplicated, runs collapsed to `a:b`.
pub(crate) fn uid_set(uids: &[Uid]) -> String {
    let mut sorted = uids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<(Uid, Uid)> = Vec::new();
    for uid in sorted {
        match ranges.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(uid) => *end = uid,
            _ => ranges.push((uid, uid)),
        }
    }
    iter_join(
        ranges.into_iter().map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}:{}", start, end)
            }
        }),
        ",",
    )
}
