use std::collections::HashSet;
use std::io::{Read, Write};

use super::{base_name, child_of, is_within, parent_of, DefaultFolders, Right, Session};
use crate::acl::{self, Permission};
use crate::error::{Error, Phase, Result, ValidateError};
use crate::types::{AclModifyMode, Name, NamespaceKind};

/// `LIST` wildcards. No folder name contains them.
const WILDCARDS: [char; 2] = ['%', '*'];

/// A folder as the storage layer reports it.
///
/// Descriptors are snapshots: operations that change a folder return a new descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FolderDescriptor {
    /// Logical full name, levels joined with `/`. Empty for the root.
    pub full_name: String,
    /// The last level of the full name.
    pub name: String,
    /// The server's hierarchy separator below this folder.
    pub separator: char,
    /// The folder can be selected and hold messages.
    pub holds_messages: bool,
    /// The folder can have subfolders.
    pub holds_folders: bool,
    /// The folder is subscribed.
    pub subscribed: bool,
    /// Permissions, filled in by [`FolderStorage::get_folder`].
    pub permissions: Vec<Permission>,
    /// The folder exists as a mailbox on the server. False for namespace roots that are only
    /// reported by `NAMESPACE`.
    pub exists: bool,
    /// The namespace this folder is the root of, if any.
    pub namespace: Option<NamespaceKind>,
    /// The folder is the inbox or one of the standard folders.
    pub default_folder: bool,
}

/// What is known about a folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderState {
    /// Not looked up yet.
    NotChecked,
    /// The folder exists.
    Exists(FolderDescriptor),
    /// The folder is a namespace root the server reports but does not list as a mailbox.
    NamespaceVirtual(FolderDescriptor),
    /// There is no such folder.
    NotFound,
}

/// Changes to apply to a folder with [`FolderStorage::update`]. `None` leaves an aspect as
/// it is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderUpdate {
    /// New last level of the name.
    pub name: Option<String>,
    /// New parent, by logical full name.
    pub parent: Option<String>,
    /// New permissions.
    pub permissions: Option<Vec<Permission>>,
    /// New subscription state.
    pub subscribed: Option<bool>,
}

/// Folder operations of one session.
pub struct FolderStorage<'s, T: Read + Write> {
    session: &'s mut Session<T>,
}

impl<'s, T: Read + Write> FolderStorage<'s, T> {
    /// Folder operations over `session`.
    pub fn new(session: &'s mut Session<T>) -> Self {
        FolderStorage { session }
    }

    /// The invisible root every top-level folder hangs off.
    pub fn root_folder(&self) -> FolderDescriptor {
        FolderDescriptor {
            full_name: String::new(),
            name: String::new(),
            separator: self.session.separator,
            holds_messages: false,
            holds_folders: true,
            subscribed: true,
            permissions: Vec::new(),
            exists: true,
            namespace: None,
            default_folder: false,
        }
    }

    /// The standard folders, created on first use in this session.
    pub fn default_folders(&mut self) -> Result<DefaultFolders> {
        self.session.default_folders()
    }

    fn descriptor(&self, name: &Name) -> FolderDescriptor {
        let full_name = self.session.logical(name.name());
        FolderDescriptor {
            name: base_name(&full_name).to_string(),
            separator: name.delimiter().unwrap_or(self.session.separator),
            holds_messages: name.is_selectable(),
            holds_folders: name.may_have_children(),
            subscribed: false,
            permissions: Vec::new(),
            exists: true,
            namespace: None,
            default_folder: false,
            full_name,
        }
    }

    fn virtual_descriptor(
        &self,
        full_name: String,
        kind: NamespaceKind,
        separator: Option<char>,
    ) -> FolderDescriptor {
        FolderDescriptor {
            name: base_name(&full_name).to_string(),
            separator: separator.unwrap_or(self.session.separator),
            holds_messages: false,
            holds_folders: true,
            subscribed: false,
            permissions: Vec::new(),
            exists: false,
            namespace: Some(kind),
            default_folder: false,
            full_name,
        }
    }

    /// Look a folder up.
    pub fn state(&mut self, full_name: &str) -> Result<FolderState> {
        if full_name.is_empty() {
            return Ok(FolderState::Exists(self.root_folder()));
        }
        if full_name.contains(&WILDCARDS[..]) {
            return Ok(FolderState::NotFound);
        }
        let wire = self.session.wire(full_name);
        let names = self.session.client.list("", &wire)?;
        if let Some(name) = names.iter().find(|n| n.name() == wire) {
            return Ok(FolderState::Exists(self.descriptor(name)));
        }

        let namespaces = self.session.namespaces()?;
        for (kind, namespace) in namespaces.iter() {
            let root = namespace.root_name();
            if !root.is_empty() && self.session.logical(root) == full_name {
                return Ok(FolderState::NamespaceVirtual(self.virtual_descriptor(
                    full_name.to_string(),
                    kind,
                    namespace.delimiter,
                )));
            }
        }
        Ok(FolderState::NotFound)
    }

    /// Whether a folder exists, counting namespace roots.
    pub fn exists(&mut self, full_name: &str) -> Result<bool> {
        Ok(matches!(
            self.state(full_name)?,
            FolderState::Exists(_) | FolderState::NamespaceVirtual(_)
        ))
    }

    /// A folder with its subscription state and permissions.
    pub fn get_folder(&mut self, full_name: &str) -> Result<FolderDescriptor> {
        let mut folder = match self.state(full_name)? {
            FolderState::Exists(folder) | FolderState::NamespaceVirtual(folder) => folder,
            FolderState::NotFound | FolderState::NotChecked => {
                return Err(Error::NotFound(full_name.to_string()))
            }
        };
        if full_name.is_empty() {
            return Ok(folder);
        }

        let wire = self.session.wire(full_name);
        folder.subscribed = if self.session.capabilities.subscription {
            !self.session.client.lsub("", &wire)?.is_empty()
        } else {
            true
        };
        if folder.exists && self.session.capabilities.acl {
            folder.permissions = self.load_permissions(&wire)?;
        }
        folder.default_folder = self.session.is_default_folder(full_name)?;
        Ok(folder)
    }

    /// The full ACL if we may read it, otherwise just our own rights.
    fn load_permissions(&mut self, wire: &str) -> Result<Vec<Permission>> {
        if self.session.has_right(wire, Right::Administer)? {
            let acl = self.session.client.get_acl(wire)?;
            return Ok(acl::permissions_of(&*self.session.identities, &acl));
        }
        let own = acl::entity_of(&*self.session.identities, &self.session.login);
        match (own, self.session.my_rights(wire)?) {
            (Some(entity), Some(rights)) => Ok(vec![Permission::from_rights(entity, &rights)]),
            _ => Ok(Vec::new()),
        }
    }

    /// The subfolders of `parent` (`""` for the top level).
    ///
    /// Namespace roots below `parent` are included even if the server does not list them.
    /// Unless `include_unsubscribed` is set, only subscribed folders are returned.
    pub fn list(
        &mut self,
        parent: &str,
        include_unsubscribed: bool,
    ) -> Result<Vec<FolderDescriptor>> {
        let parent_wire = self.session.wire(parent);
        let pattern = if parent.is_empty() {
            "%".to_string()
        } else {
            self.session.require(&parent_wire, Right::Lookup)?;
            format!("{}{}%", parent_wire, self.session.separator)
        };

        let names = self.session.client.list("", &pattern)?;
        let mut folders: Vec<FolderDescriptor> = names
            .iter()
            .filter(|n| n.name() != parent_wire)
            .map(|n| self.descriptor(n))
            .collect();

        let namespaces = self.session.namespaces()?;
        for (kind, namespace) in namespaces.iter() {
            let root = namespace.root_name();
            if root.is_empty() {
                continue;
            }
            let root = self.session.logical(root);
            if root == parent || parent_of(&root) != parent {
                continue;
            }
            match folders.iter_mut().find(|f| f.full_name == root) {
                Some(listed) => listed.namespace = Some(kind),
                None => {
                    let folder = self.virtual_descriptor(root, kind, namespace.delimiter);
                    folders.push(folder);
                }
            }
        }

        let defaults = self.session.default_folder_names()?;
        for folder in &mut folders {
            folder.default_folder =
                folder.full_name.eq_ignore_ascii_case(super::INBOX)
                    || defaults.contains(&folder.full_name);
        }

        if self.session.capabilities.subscription {
            let subscribed: HashSet<String> = self
                .session
                .client
                .lsub("", &pattern)?
                .iter()
                .map(|n| self.session.logical(n.name()))
                .collect();
            for folder in &mut folders {
                folder.subscribed = subscribed.contains(&folder.full_name);
            }
            if !include_unsubscribed {
                folders.retain(|f| f.subscribed);
            }
        } else {
            for folder in &mut folders {
                folder.subscribed = true;
            }
        }
        Ok(folders)
    }

    /// A folder level must not contain a separator or a `LIST` wildcard.
    fn validate_name(&self, name: &str) -> Result<()> {
        for c in ['/', self.session.separator].into_iter().chain(WILDCARDS) {
            if name.contains(c) {
                return Err(Error::Validate(ValidateError(c)));
            }
        }
        Ok(())
    }

    /// Create `name` below `parent` and subscribe it.
    ///
    /// If `permissions` are given and differ from what the server set up, they are applied.
    /// They must name at least one administrator.
    pub fn create(
        &mut self,
        parent: &str,
        name: &str,
        permissions: Option<&[Permission]>,
    ) -> Result<FolderDescriptor> {
        self.validate_name(name)?;
        let full_name = child_of(parent, name);
        let apply = permissions.filter(|_| self.session.capabilities.acl);
        if let Some(permissions) = apply {
            if !permissions.iter().any(|p| p.folder_admin) {
                return Err(Error::NoAdministrator(full_name));
            }
        }

        if !parent.is_empty() {
            let parent_wire = self.session.wire(parent);
            self.session.require(&parent_wire, Right::Create)?;
        }
        let wire = self.session.wire(&full_name);
        if !self.session.client.list("", &wire)?.is_empty() {
            return Err(Error::DuplicateFolder(full_name));
        }

        self.session.client.create(&wire)?;
        self.subscribe_forced(&wire)?;
        if let Some(permissions) = apply {
            self.apply_permissions(&wire, permissions)
                .map_err(|e| e.in_phase(Phase::ApplyPermissions, &[]))?;
        }

        Ok(FolderDescriptor {
            name: name.to_string(),
            separator: self.session.separator,
            holds_messages: true,
            holds_folders: true,
            subscribed: true,
            permissions: apply.map(<[Permission]>::to_vec).unwrap_or_default(),
            exists: true,
            namespace: None,
            default_folder: false,
            full_name,
        })
    }

    /// Subscribe, even if the server thinks the subscription already exists.
    fn subscribe_forced(&mut self, wire: &str) -> Result<()> {
        if !self.session.capabilities.subscription {
            return Ok(());
        }
        match self.session.client.subscribe(wire) {
            Err(Error::CommandFailed { text, .. }) => {
                log::debug!("re-subscribing {} after: {}", wire, text);
                self.unsubscribe_quietly(wire)?;
                self.session.client.subscribe(wire)
            }
            other => other,
        }
    }

    /// Unsubscribe, ignoring refusals.
    fn unsubscribe_quietly(&mut self, wire: &str) -> Result<()> {
        match self.session.client.unsubscribe(wire) {
            Err(Error::CommandFailed { text, .. }) => {
                log::debug!("cannot unsubscribe {}: {}", wire, text);
                Ok(())
            }
            other => other,
        }
    }

    /// Write `permissions` as the ACL of a folder, touching only entries that change.
    ///
    /// Entries for identifiers the resolver does not know are left alone.
    fn apply_permissions(&mut self, wire: &str, permissions: &[Permission]) -> Result<()> {
        let current = self.session.client.get_acl(wire)?;
        let wanted = acl::acl_entries(
            &*self.session.identities,
            &mut self.session.acl_cache,
            permissions,
        )?;

        for (identifier, rights) in &wanted {
            if current.rights_of(identifier) != Some(rights) {
                self.session
                    .client
                    .set_acl(wire, identifier, rights, AclModifyMode::Replace)?;
            }
        }
        for entry in &current.acls {
            if wanted.iter().any(|(i, _)| *i == entry.identifier) {
                continue;
            }
            if acl::entity_of(&*self.session.identities, &entry.identifier).is_some() {
                self.session.client.delete_acl(wire, &entry.identifier)?;
            } else {
                log::debug!("keeping ACL entry of unknown {} on {}", entry.identifier, wire);
            }
        }
        Ok(())
    }

    /// Replace the permissions of a folder. The new set must keep an administrator.
    pub fn update_permissions(&mut self, full_name: &str, permissions: &[Permission]) -> Result<()> {
        if !self.session.capabilities.acl {
            return Err(Error::Unsupported("ACL"));
        }
        if !permissions.iter().any(|p| p.folder_admin) {
            return Err(Error::NoAdministrator(full_name.to_string()));
        }
        let wire = self.session.wire(full_name);
        self.session.require(&wire, Right::Administer)?;
        let result = self
            .apply_permissions(&wire, permissions)
            .map_err(|e| e.in_phase(Phase::ApplyPermissions, &[]));
        // our own rights may have changed, even after a partial update
        self.session.invalidate(&wire);
        result
    }

    /// Subscribe or unsubscribe a folder. Does nothing if subscriptions are ignored.
    pub fn set_subscribed(&mut self, full_name: &str, subscribed: bool) -> Result<()> {
        if !self.session.capabilities.subscription {
            return Ok(());
        }
        let wire = self.session.wire(full_name);
        if subscribed {
            self.subscribe_forced(&wire)
        } else {
            self.session.client.unsubscribe(&wire)
        }
    }

    /// Apply `update`: first a move to a new parent, then a rename, then permissions and
    /// subscription. Returns the folder as it is afterwards.
    pub fn update(&mut self, full_name: &str, update: FolderUpdate) -> Result<FolderDescriptor> {
        let new_parent = update
            .parent
            .filter(|p| p.as_str() != parent_of(full_name));
        let new_name = update.name.filter(|n| n.as_str() != base_name(full_name));
        if (new_parent.is_some() || new_name.is_some())
            && self.session.is_default_folder(full_name)?
        {
            return Err(Error::DefaultFolder(full_name.to_string()));
        }
        if !self.exists(full_name)? {
            return Err(Error::NotFound(full_name.to_string()));
        }

        let mut full_name = full_name.to_string();
        if let Some(parent) = new_parent {
            let name = base_name(&full_name).to_string();
            full_name = self.relocate(&full_name, &parent, &name)?;
        }
        if let Some(name) = new_name {
            full_name = self.rename(&full_name, &name)?;
        }
        if let Some(permissions) = update.permissions {
            self.update_permissions(&full_name, &permissions)?;
        }
        if let Some(subscribed) = update.subscribed {
            self.set_subscribed(&full_name, subscribed)?;
        }
        self.get_folder(&full_name)
    }

    /// Move a folder with everything in and below it under `new_parent`. Returns the new full
    /// name.
    pub fn move_folder(&mut self, full_name: &str, new_parent: &str) -> Result<String> {
        if self.session.is_default_folder(full_name)? {
            return Err(Error::DefaultFolder(full_name.to_string()));
        }
        let name = base_name(full_name).to_string();
        self.relocate(full_name, new_parent, &name)
    }

    /// Create the destination, copy the ACL, copy the messages, move the subfolders, delete
    /// the source.
    fn relocate(&mut self, source: &str, new_parent: &str, new_name: &str) -> Result<String> {
        self.validate_name(new_name)?;
        let destination = child_of(new_parent, new_name);
        if destination == source || is_within(new_parent, source) {
            return Err(Error::SameFolder(source.to_string()));
        }

        let source_wire = self.session.wire(source);
        let destination_wire = self.session.wire(&destination);
        if !new_parent.is_empty() {
            let parent_wire = self.session.wire(new_parent);
            self.session.require(&parent_wire, Right::Create)?;
        }
        if !self.session.client.list("", &destination_wire)?.is_empty() {
            return Err(Error::DuplicateFolder(destination));
        }
        let selectable = match self.session.client.list("", &source_wire)?.first() {
            Some(name) => name.is_selectable(),
            None => return Err(Error::NotFound(source.to_string())),
        };
        let subscribed = self.session.capabilities.subscription
            && !self.session.client.lsub("", &source_wire)?.is_empty();
        self.session.leave(&source_wire)?;

        log::debug!("moving folder {} to {}", source, destination);
        self.session
            .client
            .create(&destination_wire)
            .and_then(|_| {
                if subscribed {
                    self.subscribe_forced(&destination_wire)
                } else {
                    Ok(())
                }
            })
            .map_err(|e| e.in_phase(Phase::CreateDestination, &[]))?;

        self.copy_acl(&source_wire, &destination_wire)
            .map_err(|e| e.in_phase(Phase::CopyAcl, &[]))?;

        if selectable {
            self.copy_all_messages(&source_wire, &destination_wire)
                .map_err(|e| e.in_phase(Phase::CopyMessages, &[]))?;
        }

        let pattern = format!("{}{}%", source_wire, self.session.separator);
        let children = self
            .session
            .client
            .list("", &pattern)
            .map_err(|e| e.in_phase(Phase::MoveSubfolders, &[]))?;
        for child in children.iter().filter(|n| n.name() != source_wire) {
            let child = self.session.logical(child.name());
            let child_name = base_name(&child).to_string();
            self.relocate(&child, &destination, &child_name)
                .map_err(|e| e.in_phase(Phase::MoveSubfolders, &[]))?;
        }

        let deleted = if subscribed {
            self.unsubscribe_quietly(&source_wire)
        } else {
            Ok(())
        };
        deleted
            .and_then(|_| self.session.client.delete(&source_wire))
            .map_err(|e| e.in_phase(Phase::DeleteSource, &[]))?;

        self.session.invalidate(&source_wire);
        self.session.invalidate_folder(source);
        Ok(destination)
    }

    fn copy_acl(&mut self, source_wire: &str, destination_wire: &str) -> Result<()> {
        if !self.session.capabilities.acl
            || !self.session.has_right(source_wire, Right::Administer)?
        {
            return Ok(());
        }
        let acl = self.session.client.get_acl(source_wire)?;
        for entry in &acl.acls {
            self.session.client.set_acl(
                destination_wire,
                &entry.identifier,
                &entry.rights,
                AclModifyMode::Replace,
            )?;
        }
        Ok(())
    }

    fn copy_all_messages(&mut self, source_wire: &str, destination_wire: &str) -> Result<()> {
        let mailbox = self.session.open(source_wire)?;
        if mailbox.exists > 0 {
            self.session.client.copy("1:*", destination_wire)?;
        }
        self.session.leave(source_wire)
    }

    /// Give a folder a new last level, keeping its parent. Returns the new full name.
    ///
    /// Subscriptions of the folder and everything below it carry over to the new names.
    pub fn rename(&mut self, full_name: &str, new_name: &str) -> Result<String> {
        self.validate_name(new_name)?;
        if self.session.is_default_folder(full_name)? {
            return Err(Error::DefaultFolder(full_name.to_string()));
        }
        let destination = child_of(parent_of(full_name), new_name);
        if destination == full_name {
            return Ok(destination);
        }

        let source_wire = self.session.wire(full_name);
        let destination_wire = self.session.wire(&destination);
        if self.session.client.list("", &source_wire)?.is_empty() {
            return Err(Error::NotFound(full_name.to_string()));
        }
        if !self.session.client.list("", &destination_wire)?.is_empty() {
            return Err(Error::DuplicateFolder(destination));
        }
        self.session.leave(&source_wire)?;

        let snapshot = if self.session.capabilities.subscription {
            match self.subscriptions_below(&source_wire) {
                Ok(snapshot) => Some(snapshot),
                Err(e) if e.is_connection_lost() => return Err(e),
                Err(e) => {
                    log::debug!("no subscription snapshot of {}: {}", full_name, e);
                    None
                }
            }
        } else {
            None
        };

        self.session.client.rename(&source_wire, &destination_wire)?;
        self.session.invalidate(&source_wire);
        self.session.invalidate_folder(full_name);

        if self.session.capabilities.subscription {
            self.restore_subscriptions(&source_wire, &destination_wire, snapshot)
                .map_err(|e| e.in_phase(Phase::RestoreSubscriptions, &[]))?;
        }
        Ok(destination)
    }

    /// Wire names of the subscribed folders at and below `wire`.
    fn subscriptions_below(&mut self, wire: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .session
            .client
            .lsub("", wire)?
            .into_iter()
            .map(|n| n.name().to_string())
            .collect();
        let below = format!("{}{}*", wire, self.session.separator);
        names.extend(
            self.session
                .client
                .lsub("", &below)?
                .into_iter()
                .map(|n| n.name().to_string()),
        );
        Ok(names)
    }

    fn restore_subscriptions(
        &mut self,
        source_wire: &str,
        destination_wire: &str,
        snapshot: Option<Vec<String>>,
    ) -> Result<()> {
        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => return self.subscribe_forced(destination_wire),
        };
        for old in snapshot {
            let new = match old.strip_prefix(source_wire) {
                Some(rest) => format!("{}{}", destination_wire, rest),
                None => continue,
            };
            self.unsubscribe_quietly(&old)?;
            self.subscribe_forced(&new)?;
        }
        Ok(())
    }

    /// Delete a folder.
    ///
    /// Folders outside the trash are moved into it, with a number appended to the name if the
    /// trash already has a folder of that name. Folders in the trash are deleted for good,
    /// together with their subfolders.
    pub fn delete(&mut self, full_name: &str) -> Result<()> {
        if full_name.is_empty() || self.session.is_default_folder(full_name)? {
            return Err(Error::DefaultFolder(full_name.to_string()));
        }
        let trash = self.session.default_folders()?.trash;
        if is_within(full_name, &trash) {
            return self.hard_delete(full_name);
        }

        let wire = self.session.wire(full_name);
        if self.session.client.list("", &wire)?.is_empty() {
            return Err(Error::NotFound(full_name.to_string()));
        }
        self.session.require(&wire, Right::DeleteFolder)?;

        let pattern = format!("{}{}%", self.session.wire(&trash), self.session.separator);
        let taken: HashSet<String> = self
            .session
            .client
            .list("", &pattern)?
            .iter()
            .map(|n| base_name(&self.session.logical(n.name())).to_string())
            .collect();
        let base = base_name(full_name);
        let mut name = base.to_string();
        let mut suffix = 1;
        while taken.contains(&name) {
            name = format!("{} {}", base, suffix);
            suffix += 1;
        }
        self.relocate(full_name, &trash, &name).map(|_| ())
    }

    /// Delete a folder and its subfolders for good, deepest first.
    fn hard_delete(&mut self, full_name: &str) -> Result<()> {
        let wire = self.session.wire(full_name);
        self.session.require(&wire, Right::DeleteFolder)?;
        let below = format!("{}{}*", wire, self.session.separator);
        let mut doomed: Vec<String> = self
            .session
            .client
            .list("", &below)?
            .into_iter()
            .map(|n| n.name().to_string())
            .filter(|n| *n != wire)
            .collect();
        doomed.sort_by_key(|n| std::cmp::Reverse(n.matches(self.session.separator).count()));
        doomed.push(wire);

        for folder in doomed {
            self.session.leave(&folder)?;
            if self.session.capabilities.subscription {
                self.unsubscribe_quietly(&folder)?;
            }
            self.session.client.delete(&folder)?;
            self.session.invalidate(&folder);
            let logical = self.session.logical(&folder);
            self.session.invalidate_folder(&logical);
        }
        Ok(())
    }

    /// Remove all messages of a folder. Unless `hard` is set, they are copied to the trash
    /// first.
    pub fn clear(&mut self, full_name: &str, hard: bool) -> Result<()> {
        let wire = self.session.wire(full_name);
        self.session.require(&wire, Right::Read)?;
        self.session.require(&wire, Right::Delete)?;

        let trash = if hard {
            None
        } else {
            Some(self.session.default_folders()?.trash).filter(|t| !is_within(full_name, t))
        };

        let mailbox = self.session.open(&wire)?;
        if mailbox.exists == 0 {
            return Ok(());
        }
        if let Some(trash) = trash {
            let trash_wire = self.session.wire(&trash);
            self.session.client.copy("1:*", &trash_wire)?;
        }
        self.session
            .client
            .store("1:*", "+FLAGS.SILENT (\\Deleted)")?;
        self.session.client.expunge()?;
        self.session.invalidate_folder(full_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::acl::{Entity, FolderPermission, IdentityResolver};
    use crate::config::Config;
    use crate::types::CapabilitySet;

    struct Directory;

    impl IdentityResolver for Directory {
        fn acl_name(&self, entity: Entity) -> Option<String> {
            match entity {
                Entity::User(1) => Some("joe".into()),
                Entity::Group(7) => Some("staff".into()),
                _ => None,
            }
        }

        fn entity(&self, acl_name: &str) -> Option<Entity> {
            match acl_name {
                "joe" => Some(Entity::User(1)),
                "staff" => Some(Entity::Group(7)),
                _ => None,
            }
        }
    }

    #[test]
    fn subscribed_listing_drops_unsubscribed_namespace_folders() {
        let caps = CapabilitySet {
            namespace: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &[
                "* LIST (\\HasNoChildren) \"/\" \"INBOX/Archive\"\r\n{tag} OK List completed\r\n",
                "* NAMESPACE ((\"INBOX/\" \"/\")(\"INBOX/Team/\" \"/\")) NIL NIL\r\n\
                 {tag} OK Namespace completed\r\n",
                "* LSUB () \"/\" \"INBOX/Archive\"\r\n{tag} OK Lsub completed\r\n",
            ],
        );
        let folders = FolderStorage::new(&mut session).list("INBOX", false).unwrap();
        let names: Vec<&str> = folders.iter().map(|f| f.full_name.as_str()).collect();
        assert_eq!(names, vec!["INBOX/Archive"]);
        assert!(folders[0].subscribed);
        assert_eq!(
            commands(&mut session),
            vec!["LIST \"\" \"INBOX/%\"", "NAMESPACE", "LSUB \"\" \"INBOX/%\""]
        );
    }

    #[test]
    fn full_listing_includes_namespace_folders() {
        let caps = CapabilitySet {
            namespace: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &[
                "* LIST (\\HasNoChildren) \"/\" \"INBOX/Archive\"\r\n{tag} OK List completed\r\n",
                "* NAMESPACE ((\"INBOX/\" \"/\")(\"INBOX/Team/\" \"/\")) NIL NIL\r\n\
                 {tag} OK Namespace completed\r\n",
                "{tag} OK Lsub completed\r\n",
            ],
        );
        let folders = FolderStorage::new(&mut session).list("INBOX", true).unwrap();
        assert_eq!(folders.len(), 2);
        let team = &folders[1];
        assert_eq!(team.full_name, "INBOX/Team");
        assert!(!team.exists);
        assert!(!team.subscribed);
        assert_eq!(team.namespace, Some(NamespaceKind::Personal));
    }

    #[test]
    fn rename_carries_subscriptions() {
        let mut session = session(
            plain(),
            Config::default(),
            &[
                "* LIST (\\HasChildren) \"/\" \"INBOX/Old\"\r\n{tag} OK List completed\r\n",
                "{tag} OK List completed\r\n",
                "* LSUB () \"/\" \"INBOX/Old\"\r\n{tag} OK Lsub completed\r\n",
                "* LSUB () \"/\" \"INBOX/Old/Sub\"\r\n{tag} OK Lsub completed\r\n",
                "{tag} OK Rename completed\r\n",
                "{tag} OK Unsubscribe completed\r\n",
                "{tag} OK Subscribe completed\r\n",
                "{tag} NO Not subscribed\r\n",
                "{tag} OK Subscribe completed\r\n",
            ],
        );
        let renamed = FolderStorage::new(&mut session)
            .rename("INBOX/Old", "New")
            .unwrap();
        assert_eq!(renamed, "INBOX/New");
        assert_eq!(
            commands(&mut session),
            vec![
                "LIST \"\" \"INBOX/Old\"",
                "LIST \"\" \"INBOX/New\"",
                "LSUB \"\" \"INBOX/Old\"",
                "LSUB \"\" \"INBOX/Old/*\"",
                "RENAME \"INBOX/Old\" \"INBOX/New\"",
                "UNSUBSCRIBE \"INBOX/Old\"",
                "SUBSCRIBE \"INBOX/New\"",
                "UNSUBSCRIBE \"INBOX/Old/Sub\"",
                "SUBSCRIBE \"INBOX/New/Sub\"",
            ]
        );
    }

    #[test]
    fn default_folders_cannot_be_renamed_or_moved() {
        let mut session = session(plain(), Config::default(), &[]);
        let mut folders = FolderStorage::new(&mut session);
        assert!(matches!(
            folders.rename("INBOX", "Mail"),
            Err(Error::DefaultFolder(_))
        ));
        assert!(matches!(
            folders.move_folder("Trash", "Archive"),
            Err(Error::DefaultFolder(_))
        ));
        let update = FolderUpdate {
            parent: Some("Archive".into()),
            ..FolderUpdate::default()
        };
        assert!(matches!(
            folders.update("Sent", update),
            Err(Error::DefaultFolder(_))
        ));
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn create_rejects_separator_and_duplicates() {
        let mut session = session(
            plain(),
            Config::default(),
            &["* LIST () \"/\" \"Projects\"\r\n{tag} OK List completed\r\n"],
        );
        let mut folders = FolderStorage::new(&mut session);
        assert!(matches!(
            folders.create("", "a/b", None),
            Err(Error::Validate(ValidateError('/')))
        ));
        assert!(matches!(
            folders.create("", "Projects", None),
            Err(Error::DuplicateFolder(ref name)) if name == "Projects"
        ));
    }

    #[test]
    fn wildcards_are_not_folder_names() {
        let mut session = session(plain(), Config::default(), &[]);
        let mut folders = FolderStorage::new(&mut session);
        assert!(matches!(
            folders.create("", "Pro%", None),
            Err(Error::Validate(ValidateError('%')))
        ));
        assert!(matches!(
            folders.rename("Projects", "*"),
            Err(Error::Validate(ValidateError('*')))
        ));
        assert_eq!(folders.state("Pro*").unwrap(), FolderState::NotFound);
        assert!(!folders.exists("INBOX/%").unwrap());
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn create_subscribes() {
        let mut session = session(
            plain(),
            Config::default(),
            &[
                "{tag} OK List completed\r\n",
                "{tag} OK Create completed\r\n",
                "{tag} NO Already subscribed\r\n",
                "{tag} OK Unsubscribe completed\r\n",
                "{tag} OK Subscribe completed\r\n",
            ],
        );
        let folder = FolderStorage::new(&mut session)
            .create("INBOX", "Projects", None)
            .unwrap();
        assert_eq!(folder.full_name, "INBOX/Projects");
        assert!(folder.subscribed);
        assert_eq!(
            commands(&mut session),
            vec![
                "LIST \"\" \"INBOX/Projects\"",
                "CREATE \"INBOX/Projects\"",
                "SUBSCRIBE \"INBOX/Projects\"",
                "UNSUBSCRIBE \"INBOX/Projects\"",
                "SUBSCRIBE \"INBOX/Projects\"",
            ]
        );
    }

    #[test]
    fn create_requires_an_administrator() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = session(caps, Config::default(), &[]);
        let mut visible = Permission::none(Entity::Everyone);
        visible.folder = FolderPermission::Visible;
        assert!(matches!(
            FolderStorage::new(&mut session).create("", "Shared", Some(&[visible])),
            Err(Error::NoAdministrator(_))
        ));
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn permission_update_keeps_unknown_entries() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &[
                "* MYRIGHTS \"Shared\" lrswipkxtea\r\n{tag} OK Myrights completed\r\n",
                "* ACL \"Shared\" joe lrswipkxtea mallory lr staff lr\r\n{tag} OK Getacl completed\r\n",
                "{tag} OK Setacl completed\r\n",
                "{tag} OK Setacl completed\r\n",
                "{tag} OK Deleteacl completed\r\n",
            ],
        )
        .with_identities(Arc::new(Directory));
        let mut everyone = Permission::none(Entity::Everyone);
        everyone.folder = FolderPermission::Visible;
        FolderStorage::new(&mut session)
            .update_permissions("Shared", &[Permission::admin(Entity::User(1)), everyone])
            .unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "MYRIGHTS \"Shared\"",
                "GETACL \"Shared\"",
                "SETACL \"Shared\" \"joe\" \"acdilprsw\"",
                "SETACL \"Shared\" \"anyone\" \"l\"",
                "DELETEACL \"Shared\" \"staff\"",
            ]
        );
    }

    #[test]
    fn permission_update_never_drops_last_admin() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = session(caps, Config::default(), &[]);
        let mut reader = Permission::none(Entity::User(1));
        reader.folder = FolderPermission::Visible;
        assert!(matches!(
            FolderStorage::new(&mut session).update_permissions("Shared", &[reader]),
            Err(Error::NoAdministrator(_))
        ));
        assert!(commands(&mut session).is_empty());
    }

    #[test]
    fn delete_moves_into_trash_with_suffix() {
        let caps = CapabilitySet {
            unselect: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &[
                "* LIST () \"/\" \"Drafts\"\r\n\
                 * LIST () \"/\" \"Sent\"\r\n\
                 * LIST () \"/\" \"Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Ham\"\r\n\
                 * LIST (\\HasChildren) \"/\" \"Trash\"\r\n\
                 * LIST () \"/\" \"Projects\"\r\n\
                 {tag} OK List completed\r\n",
                "* LIST () \"/\" \"Projects\"\r\n{tag} OK List completed\r\n",
                "* LIST () \"/\" \"Trash/Projects\"\r\n{tag} OK List completed\r\n",
                "{tag} OK List completed\r\n",
                "* LIST () \"/\" \"Projects\"\r\n{tag} OK List completed\r\n",
                "* LSUB () \"/\" \"Projects\"\r\n{tag} OK Lsub completed\r\n",
                "{tag} OK Create completed\r\n",
                "{tag} OK Subscribe completed\r\n",
                "* 2 EXISTS\r\n* 0 RECENT\r\n{tag} OK [READ-WRITE] Select completed\r\n",
                "{tag} OK [COPYUID 9 1:2 5:6] Copy completed\r\n",
                "{tag} OK Unselect completed\r\n",
                "{tag} OK List completed\r\n",
                "{tag} OK Unsubscribe completed\r\n",
                "{tag} OK Delete completed\r\n",
            ],
        );
        FolderStorage::new(&mut session).delete("Projects").unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "LIST \"\" \"%\"",
                "LIST \"\" \"Projects\"",
                "LIST \"\" \"Trash/%\"",
                "LIST \"\" \"Trash/Projects 1\"",
                "LIST \"\" \"Projects\"",
                "LSUB \"\" \"Projects\"",
                "CREATE \"Trash/Projects 1\"",
                "SUBSCRIBE \"Trash/Projects 1\"",
                "SELECT \"Projects\"",
                "COPY 1:* \"Trash/Projects 1\"",
                "UNSELECT",
                "LIST \"\" \"Projects/%\"",
                "UNSUBSCRIBE \"Projects\"",
                "DELETE \"Projects\"",
            ]
        );
    }

    #[test]
    fn folders_in_trash_are_deleted_for_good() {
        let mut session = session(
            plain(),
            Config::default(),
            &[
                "* LIST () \"/\" \"Drafts\"\r\n\
                 * LIST () \"/\" \"Sent\"\r\n\
                 * LIST () \"/\" \"Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Spam\"\r\n\
                 * LIST () \"/\" \"Confirmed Ham\"\r\n\
                 * LIST (\\HasChildren) \"/\" \"Trash\"\r\n\
                 {tag} OK List completed\r\n",
                "* LIST () \"/\" \"Trash/Old/Deep\"\r\n{tag} OK List completed\r\n",
                "{tag} OK Unsubscribe completed\r\n",
                "{tag} OK Delete completed\r\n",
                "{tag} OK Unsubscribe completed\r\n",
                "{tag} OK Delete completed\r\n",
            ],
        );
        FolderStorage::new(&mut session).delete("Trash/Old").unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "LIST \"\" \"%\"",
                "LIST \"\" \"Trash/Old/*\"",
                "UNSUBSCRIBE \"Trash/Old/Deep\"",
                "DELETE \"Trash/Old/Deep\"",
                "UNSUBSCRIBE \"Trash/Old\"",
                "DELETE \"Trash/Old\"",
            ]
        );
    }

    #[test]
    fn hard_clear_skips_trash() {
        let mut session = session(
            plain(),
            Config::default(),
            &[
                "* 3 EXISTS\r\n{tag} OK [READ-WRITE] Select completed\r\n",
                "{tag} OK Store completed\r\n",
                "* 1 EXPUNGE\r\n* 1 EXPUNGE\r\n* 1 EXPUNGE\r\n{tag} OK Expunge completed\r\n",
            ],
        );
        FolderStorage::new(&mut session).clear("Projects", true).unwrap();
        assert_eq!(
            commands(&mut session),
            vec![
                "SELECT \"Projects\"",
                "STORE 1:* +FLAGS.SILENT (\\Deleted)",
                "EXPUNGE",
            ]
        );
    }

    #[test]
    fn listing_needs_lookup_right() {
        let caps = CapabilitySet {
            acl: true,
            ..plain()
        };
        let mut session = session(
            caps,
            Config::default(),
            &["* MYRIGHTS \"Private\" r\r\n{tag} OK Myrights completed\r\n"],
        );
        assert!(matches!(
            FolderStorage::new(&mut session).list("Private", true),
            Err(Error::PermissionDenied { right: 'l', .. })
        ));
    }
}
