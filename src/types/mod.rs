//! This module contains the value types exchanged with the server and handed to callers of the
//! storage layer.

/// From section [2.3.1.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.1).
///
/// A 32-bit value assigned to each message. Unique identifiers are assigned in a strictly
/// ascending fashion in the mailbox; as each message is added to the mailbox it is assigned a
/// higher UID than the message(s) which were added previously. Unlike message sequence numbers,
/// unique identifiers are not necessarily contiguous, and they stay valid until the message is
/// expunged.
pub type Uid = u32;

/// From section [2.3.1.2 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-2.3.1.2).
///
/// A relative position from 1 to the number of messages in the currently selected mailbox.
///
/// Message sequence numbers are reassigned by every `EXPUNGE`, and only mean something while the
/// mailbox they were obtained in stays selected. They are never cached across a close.
pub type Seq = u32;

mod response;
pub use self::response::{Completion, Data, Response, ResponseCode, Responses, Status};

mod flag;
pub use self::flag::{ColorLabel, Flag, FlagSet, SystemFlag};

mod mailbox;
pub use self::mailbox::Mailbox;

mod fetch;
pub use self::fetch::{Address, Envelope, Fetch};

mod name;
pub use self::name::{Name, NameAttribute};

mod capabilities;
pub use self::capabilities::{CapabilitySet, Capabilities};

mod acls;
pub use self::acls::{Acl, AclEntry, AclModifyMode, AclRight, AclRightList, MyRights};

mod namespace;
pub use self::namespace::{Namespace, NamespaceKind, Namespaces};

mod thread;
pub use self::thread::{ThreadNode, Threads};

mod appended;
pub use self::appended::{Appended, Copied};

pub(crate) use self::fetch::parse_internal_date;
