/// One mailbox of a `LIST` or `LSUB` response, with its wire name.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Name {
    pub(crate) attributes: Vec<NameAttribute>,
    pub(crate) delimiter: Option<char>,
    pub(crate) name: String,
}

/// A flag on a listed mailbox, as in `(\HasNoChildren)`.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameAttribute {
    /// `\Noinferiors`: the mailbox cannot have children.
    NoInferiors,

    /// `\Noselect`: a hierarchy level only, holding no messages.
    NoSelect,

    /// `\Marked`: probably new messages since the last `SELECT`.
    Marked,

    /// `\Unmarked`: no new messages since the last `SELECT`.
    Unmarked,

    /// [RFC 3348](https://tools.ietf.org/html/rfc3348): the mailbox has child mailboxes.
    HasChildren,

    /// [RFC 3348](https://tools.ietf.org/html/rfc3348): the mailbox has no child mailboxes.
    HasNoChildren,

    /// [RFC 5258](https://tools.ietf.org/html/rfc5258): the name does not refer to an
    /// existing mailbox, it is only listed because it has children.
    NonExistent,

    /// Anything else, including special-use attributes such as `\Sent`.
    Custom(String),
}

impl NameAttribute {
    fn system(s: &str) -> Option<Self> {
        let attr = match s.to_ascii_lowercase().as_str() {
            "\\noinferiors" => NameAttribute::NoInferiors,
            "\\noselect" => NameAttribute::NoSelect,
            "\\marked" => NameAttribute::Marked,
            "\\unmarked" => NameAttribute::Unmarked,
            "\\haschildren" => NameAttribute::HasChildren,
            "\\hasnochildren" => NameAttribute::HasNoChildren,
            "\\nonexistent" => NameAttribute::NonExistent,
            _ => return None,
        };
        Some(attr)
    }
}

impl From<String> for NameAttribute {
    fn from(s: String) -> Self {
        NameAttribute::system(&s).unwrap_or(NameAttribute::Custom(s))
    }
}

impl From<&str> for NameAttribute {
    fn from(s: &str) -> Self {
        NameAttribute::system(s).unwrap_or_else(|| NameAttribute::Custom(s.to_string()))
    }
}

impl Name {
    pub(crate) fn new(attributes: Vec<NameAttribute>, delimiter: Option<char>, name: String) -> Self {
        Name {
            attributes,
            delimiter,
            name,
        }
    }

    /// The attributes, in server order.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes[..]
    }

    /// The hierarchy separator, `None` for a flat name.
    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    /// The wire name: server separator and modified UTF-7, as sent back in commands.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the name can be selected and so hold messages.
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| matches!(a, NameAttribute::NoSelect | NameAttribute::NonExistent))
    }

    /// Whether child mailboxes can exist below this name.
    pub fn may_have_children(&self) -> bool {
        !self.attributes.contains(&NameAttribute::NoInferiors)
    }
}
