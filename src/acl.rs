//! Mapping between the groupware permission model and IMAP ACL rights, see [RFC
//! 4314](https://datatracker.ietf.org/doc/html/rfc4314).
//!
//! A [`Permission`] says what one user or group may do with a folder and the messages in it.
//! On the wire that becomes a rights string:
//!
//! | permission                  | rights |
//! |-----------------------------|--------|
//! | folder admin                | `a`    |
//! | create subfolders           | `cil`  |
//! | create objects              | `il`   |
//! | folder visible              | `l`    |
//! | read all                    | `rs`   |
//! | write all                   | `w`    |
//! | delete all                  | `d`    |
//!
//! IMAP cannot say "only your own messages", so the `Own` object levels are written as nothing
//! and read back as [`ObjectPermission::None`]. To keep an entity with such reduced rights on the
//! server, and to keep an entity with no rights at all, `p` is added as a marker.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::types::{Acl, AclRightList};

/// The identifier every server understands as "all users".
pub const ANYONE: &str = "anyone";

const UNMAPPABLE: char = 'p';

/// Who a [`Permission`] is granted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Entity {
    /// A single user.
    User(u32),
    /// A group of users.
    Group(u32),
    /// All users and groups.
    Everyone,
}

impl Entity {
    /// Whether this entity is a group, including the everyone sentinel.
    pub fn is_group(self) -> bool {
        !matches!(self, Entity::User(_))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User(id) => write!(f, "user {}", id),
            Entity::Group(id) => write!(f, "group {}", id),
            Entity::Everyone => write!(f, "everyone"),
        }
    }
}

/// What an entity may do with the folder itself. Each level includes the ones before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FolderPermission {
    /// The folder is hidden.
    #[default]
    None,
    /// The folder is listed.
    Visible,
    /// Messages may be added.
    CreateObjects,
    /// Subfolders may be created.
    CreateSubfolders,
}

/// How far reading, writing or deleting messages is allowed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectPermission {
    /// Not at all.
    #[default]
    None,
    /// Only on messages the entity created.
    Own,
    /// On every message.
    All,
}

/// The rights of one entity on one folder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permission {
    /// Who the rights are granted to.
    pub entity: Entity,
    /// May change the folder's ACL.
    pub folder_admin: bool,
    /// Folder level.
    pub folder: FolderPermission,
    /// Read level.
    pub read: ObjectPermission,
    /// Write level.
    pub write: ObjectPermission,
    /// Delete level.
    pub delete: ObjectPermission,
}

impl Permission {
    /// A permission granting nothing.
    pub fn none(entity: Entity) -> Self {
        Permission {
            entity,
            folder_admin: false,
            folder: FolderPermission::None,
            read: ObjectPermission::None,
            write: ObjectPermission::None,
            delete: ObjectPermission::None,
        }
    }

    /// A permission granting everything.
    pub fn admin(entity: Entity) -> Self {
        Permission {
            entity,
            folder_admin: true,
            folder: FolderPermission::CreateSubfolders,
            read: ObjectPermission::All,
            write: ObjectPermission::All,
            delete: ObjectPermission::All,
        }
    }

    /// The IMAP rights this permission maps to.
    pub fn to_rights(&self) -> AclRightList {
        let mut rights = String::new();
        if self.folder_admin {
            rights.push('a');
        }
        rights.push_str(match self.folder {
            FolderPermission::CreateSubfolders => "cil",
            FolderPermission::CreateObjects => "il",
            FolderPermission::Visible => "l",
            FolderPermission::None => "",
        });

        let folder_rights = rights.len();
        if self.read == ObjectPermission::All {
            rights.push_str("rs");
        }
        if self.write == ObjectPermission::All {
            rights.push('w');
        }
        if self.delete == ObjectPermission::All {
            rights.push('d');
        }
        if rights.len() > folder_rights || rights.is_empty() {
            rights.push(UNMAPPABLE);
        }
        AclRightList::from(rights.as_str())
    }

    /// The permission of `entity` described by `rights`.
    ///
    /// `Own` levels cannot be expressed in IMAP and come back as `None`.
    pub fn from_rights(entity: Entity, rights: &AclRightList) -> Self {
        let folder = if rights.has_right('c') || rights.has_right('k') {
            FolderPermission::CreateSubfolders
        } else if rights.has_right('i') {
            FolderPermission::CreateObjects
        } else if rights.has_right('l') {
            FolderPermission::Visible
        } else {
            FolderPermission::None
        };
        let all_if = |granted: bool| {
            if granted {
                ObjectPermission::All
            } else {
                ObjectPermission::None
            }
        };
        Permission {
            entity,
            folder_admin: rights.has_right('a'),
            folder,
            read: all_if(rights.has_right('r')),
            write: all_if(rights.has_right('w')),
            delete: all_if(rights.has_right('d') || rights.has_right('t')),
        }
    }

    /// Whether anything at all is granted.
    pub fn grants_anything(&self) -> bool {
        self.folder_admin
            || self.folder != FolderPermission::None
            || self.read != ObjectPermission::None
            || self.write != ObjectPermission::None
            || self.delete != ObjectPermission::None
    }
}

/// Resolves between users or groups and the identifiers a server uses in its ACLs.
///
/// [`Entity::Everyone`] never reaches the resolver, it is always [`ANYONE`].
pub trait IdentityResolver: Send + Sync {
    /// The ACL identifier of a user or group.
    fn acl_name(&self, entity: Entity) -> Option<String>;

    /// The user or group behind an ACL identifier.
    fn entity(&self, acl_name: &str) -> Option<Entity>;
}

/// A resolver that knows no users or groups, only [`Entity::Everyone`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIdentities;

impl IdentityResolver for NoIdentities {
    fn acl_name(&self, _entity: Entity) -> Option<String> {
        None
    }

    fn entity(&self, _acl_name: &str) -> Option<Entity> {
        None
    }
}

/// The ACL identifier of `entity`.
pub fn acl_name(resolver: &dyn IdentityResolver, entity: Entity) -> Option<String> {
    match entity {
        Entity::Everyone => Some(ANYONE.to_string()),
        other => resolver.acl_name(other),
    }
}

/// The entity behind an ACL identifier.
pub fn entity_of(resolver: &dyn IdentityResolver, acl_name: &str) -> Option<Entity> {
    if acl_name.eq_ignore_ascii_case(ANYONE) {
        Some(Entity::Everyone)
    } else {
        resolver.entity(acl_name)
    }
}

/// The permissions an ACL describes. Identifiers the resolver does not know are skipped.
pub fn permissions_of(resolver: &dyn IdentityResolver, acl: &Acl) -> Vec<Permission> {
    acl.acls
        .iter()
        .filter_map(|entry| match entity_of(resolver, &entry.identifier) {
            Some(entity) => Some(Permission::from_rights(entity, &entry.rights)),
            None => {
                log::debug!(
                    "skipping unknown ACL identifier {} on {}",
                    entry.identifier,
                    acl.mailbox
                );
                None
            }
        })
        .collect()
}

/// Memoized [`Permission::to_rights`].
///
/// Entries are keyed by a hash of the permission and only used if the stored permission is
/// equal to the requested one.
#[derive(Debug, Default)]
pub struct AclCache {
    entries: HashMap<u64, (Permission, AclRightList)>,
}

impl AclCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rights of `permission`.
    pub fn rights(&mut self, permission: &Permission) -> AclRightList {
        let mut hasher = DefaultHasher::new();
        permission.hash(&mut hasher);
        let key = hasher.finish();

        if let Some((cached, rights)) = self.entries.get(&key) {
            if cached == permission {
                return rights.clone();
            }
        }
        let rights = permission.to_rights();
        self.entries.insert(key, (permission.clone(), rights.clone()));
        rights
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The `(identifier, rights)` pairs to write for `permissions`.
///
/// Fails with [`Error::NotFound`] if an entity has no ACL identifier.
pub fn acl_entries(
    resolver: &dyn IdentityResolver,
    cache: &mut AclCache,
    permissions: &[Permission],
) -> Result<Vec<(String, AclRightList)>> {
    permissions
        .iter()
        .map(|p| {
            let name = acl_name(resolver, p.entity)
                .ok_or_else(|| Error::NotFound(format!("ACL identifier of {}", p.entity)))?;
            Ok((name, cache.rights(p)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AclEntry;

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
    fn admin_rights() {
        assert_eq!(
            Permission::admin(Entity::User(1)).to_rights().to_string(),
            "acdilprsw"
        );
    }

    #[test]
    fn folder_levels_are_exclusive() {
        let mut p = Permission::none(Entity::User(1));
        p.folder = FolderPermission::CreateObjects;
        assert_eq!(p.to_rights().to_string(), "il");
        p.folder = FolderPermission::Visible;
        assert_eq!(p.to_rights().to_string(), "l");
    }

    #[test]
    fn object_rights_add_marker() {
        let mut p = Permission::none(Entity::User(1));
        p.folder = FolderPermission::Visible;
        p.read = ObjectPermission::All;
        assert_eq!(p.to_rights().to_string(), "lprs");
    }

    #[test]
    fn empty_permission_keeps_entity() {
        let p = Permission::none(Entity::Group(7));
        assert_eq!(p.to_rights().to_string(), "p");
        assert!(!p.grants_anything());
    }

    #[test]
    fn own_levels_are_lossy() {
        let mut p = Permission::none(Entity::User(1));
        p.folder = FolderPermission::CreateObjects;
        p.read = ObjectPermission::Own;
        p.delete = ObjectPermission::Own;
        let back = Permission::from_rights(p.entity, &p.to_rights());
        assert_eq!(back.folder, FolderPermission::CreateObjects);
        assert_eq!(back.read, ObjectPermission::None);
        assert_eq!(back.delete, ObjectPermission::None);
    }

    #[test]
    fn rfc4314_rights_are_understood() {
        let p = Permission::from_rights(Entity::User(1), &"lrswipkxtea".into());
        assert_eq!(p, Permission::admin(Entity::User(1)));
    }

    #[test]
    fn resolve_entities() {
        assert_eq!(acl_name(&Directory, Entity::Everyone).as_deref(), Some("anyone"));
        assert_eq!(entity_of(&NoIdentities, "Anyone"), Some(Entity::Everyone));
        assert_eq!(entity_of(&Directory, "staff"), Some(Entity::Group(7)));
        assert_eq!(entity_of(&Directory, "mallory"), None);
    }

    #[test]
    fn permissions_skip_unknown_identifiers() {
        let acl = Acl {
            mailbox: "INBOX".into(),
            acls: vec![
                AclEntry {
                    identifier: "joe".into(),
                    rights: "lrswipkxtea".into(),
                },
                AclEntry {
                    identifier: "mallory".into(),
                    rights: "lr".into(),
                },
            ],
        };
        let permissions = permissions_of(&Directory, &acl);
        assert_eq!(permissions.len(), 1);
        assert!(permissions[0].folder_admin);
    }

    #[test]
    fn cache_checks_equality() {
        let mut cache = AclCache::new();
        let mut p = Permission::none(Entity::User(1));
        p.folder = FolderPermission::Visible;
        assert_eq!(cache.rights(&p).to_string(), "l");
        assert_eq!(cache.rights(&p).to_string(), "l");
        assert_eq!(cache.len(), 1);
        p.write = ObjectPermission::All;
        assert_eq!(cache.rights(&p).to_string(), "lpw");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entries_need_identifiers() {
        let mut cache = AclCache::new();
        let ok = acl_entries(
            &Directory,
            &mut cache,
            &[Permission::admin(Entity::User(1)), Permission::none(Entity::Everyone)],
        )
        .unwrap();
        assert_eq!(ok[0].0, "joe");
        assert_eq!(ok[1].0, "anyone");
        assert!(matches!(
            acl_entries(&Directory, &mut cache, &[Permission::none(Entity::User(99))]),
            Err(Error::NotFound(_))
        ));
    }
}
