//! The six standard folders every account gets: drafts, sent, spam, confirmed spam, confirmed
//! ham and trash.
//!
//! Where they live depends on the namespace layout. Most servers keep personal folders below
//! `INBOX` (the personal namespace is `INBOX.` or `INBOX/`), and there the standard folders are
//! created next to the other subfolders of the inbox. A server using the *alternative
//! namespace* has a personal namespace with an empty prefix; the standard folders then sit at
//! the top level unless configuration explicitly allows nesting them below `INBOX`.

use std::collections::HashSet;
use std::io::{Read, Write};

use super::{child_of, Session, INBOX};
use crate::error::{CommandFailureKind, Result};

/// Logical full names of the standard folders.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultFolders {
    /// The parent of all standard folders, `""` for the top level.
    pub parent: String,
    /// Drafts.
    pub drafts: String,
    /// Sent messages.
    pub sent: String,
    /// Spam.
    pub spam: String,
    /// Confirmed spam.
    pub confirmed_spam: String,
    /// Confirmed ham.
    pub confirmed_ham: String,
    /// Trash.
    pub trash: String,
}

impl DefaultFolders {
    /// The full names in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.drafts.as_str(),
            self.sent.as_str(),
            self.spam.as_str(),
            self.confirmed_spam.as_str(),
            self.confirmed_ham.as_str(),
            self.trash.as_str(),
        ]
        .into_iter()
    }

    /// Whether `logical` is one of the standard folders.
    pub fn contains(&self, logical: &str) -> bool {
        self.iter().any(|f| f == logical)
    }
}

/// Where the standard folders go.
pub(crate) fn expected<T: Read + Write>(session: &mut Session<T>) -> Result<DefaultFolders> {
    let namespaces = session.namespaces()?;
    let parent = if namespaces.is_alt_namespace()
        && !session.config.allow_nested_default_folders_on_alt_namespace
    {
        String::new()
    } else {
        INBOX.to_string()
    };

    let names = &session.config.default_folders;
    Ok(DefaultFolders {
        drafts: child_of(&parent, &names.drafts),
        sent: child_of(&parent, &names.sent),
        spam: child_of(&parent, &names.spam),
        confirmed_spam: child_of(&parent, &names.confirmed_spam),
        confirmed_ham: child_of(&parent, &names.confirmed_ham),
        trash: child_of(&parent, &names.trash),
        parent,
    })
}

/// Resolve the standard folders and create those that are missing.
pub(crate) fn bootstrap<T: Read + Write>(session: &mut Session<T>) -> Result<DefaultFolders> {
    let defaults = expected(session)?;

    let pattern = if defaults.parent.is_empty() {
        "%".to_string()
    } else {
        format!("{}{}%", session.wire(&defaults.parent), session.separator)
    };
    let present: HashSet<String> = session
        .client
        .list("", &pattern)?
        .iter()
        .map(|n| session.logical(n.name()))
        .collect();

    for folder in defaults.iter() {
        if present.contains(folder) {
            continue;
        }
        let wire = session.wire(folder);
        log::debug!("creating standard folder {}", folder);
        match session.client.create(&wire) {
            Err(e) if e.failure_kind() == Some(CommandFailureKind::AlreadyExists) => {
                log::debug!("standard folder {} appeared meanwhile", folder);
            }
            other => other?,
        }
        if session.capabilities.subscription {
            session.client.subscribe(&wire)?;
        }
    }
    Ok(defaults)
}
