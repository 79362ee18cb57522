use std::borrow::Cow;
use std::fmt;

use enumset::{EnumSet, EnumSetType};

/// A flag as it appears on the wire: one of the system flags of
/// [RFC 3501 2.3.2](https://tools.ietf.org/html/rfc3501#section-2.3.2) or a keyword.
///
/// Storage code works on [`FlagSet`] instead.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Flag<'a> {
    /// `\Seen`
    Seen,

    /// `\Answered`
    Answered,

    /// `\Flagged`
    Flagged,

    /// `\Deleted`, removed by the next expunge.
    Deleted,

    /// `\Draft`
    Draft,

    /// `\Recent`, set by the server only.
    Recent,

    /// `\*` in a `PERMANENTFLAGS` list: new keywords can be created by storing them.
    MayCreate,

    /// A keyword, e.g. `$Forwarded` or a color label.
    Custom(Cow<'a, str>),
}

impl Flag<'static> {
    fn system(s: &str) -> Option<Self> {
        let flag = match s.to_ascii_lowercase().as_str() {
            "\\seen" => Flag::Seen,
            "\\answered" => Flag::Answered,
            "\\flagged" => Flag::Flagged,
            "\\deleted" => Flag::Deleted,
            "\\draft" => Flag::Draft,
            "\\recent" => Flag::Recent,
            "\\*" => Flag::MayCreate,
            _ => return None,
        };
        Some(flag)
    }

    /// Flags from their wire names.
    pub fn from_strs<S: ToString>(
        v: impl IntoIterator<Item = S>,
    ) -> impl Iterator<Item = Flag<'static>> {
        v.into_iter().map(|s| Flag::from(s.to_string()))
    }
}

impl<'a> Flag<'a> {
    /// The bit of a [`FlagSet`] this flag maps onto. Keywords map onto [`SystemFlag::User`].
    pub fn system_flag(&self) -> Option<SystemFlag> {
        match self {
            Flag::Seen => Some(SystemFlag::Seen),
            Flag::Answered => Some(SystemFlag::Answered),
            Flag::Flagged => Some(SystemFlag::Flagged),
            Flag::Deleted => Some(SystemFlag::Deleted),
            Flag::Draft => Some(SystemFlag::Draft),
            Flag::Recent => Some(SystemFlag::Recent),
            Flag::Custom(_) => Some(SystemFlag::User),
            Flag::MayCreate => None,
        }
    }
}

impl<'a> fmt::Display for Flag<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Recent => write!(f, "\\Recent"),
            Flag::MayCreate => write!(f, "\\*"),
            Flag::Custom(ref s) => write!(f, "{}", s),
        }
    }
}

impl<'a> From<String> for Flag<'a> {
    fn from(s: String) -> Self {
        Flag::system(&s).unwrap_or(Flag::Custom(Cow::Owned(s)))
    }
}

impl<'a> From<&'a str> for Flag<'a> {
    fn from(s: &'a str) -> Self {
        Flag::system(s).unwrap_or(Flag::Custom(Cow::Borrowed(s)))
    }
}

/// The bits of a message's flag mask.
///
/// `Recent` and `User` describe state the client can observe but never set directly: `Recent`
/// is owned by the server, and `User` only says that some keyword is present. `Spam` is a
/// pseudo-flag that is handed to spam handling instead of being stored.
#[derive(Debug, Hash, EnumSetType)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SystemFlag {
    /// `\Seen`
    Seen,
    /// `\Answered`
    Answered,
    /// `\Flagged`
    Flagged,
    /// `\Deleted`
    Deleted,
    /// `\Draft`
    Draft,
    /// `\Recent`
    Recent,
    /// At least one keyword is set.
    User,
    /// The message is spam.
    Spam,
}

impl SystemFlag {
    /// The wire form of a storable flag, `None` for `Recent`, `User` and `Spam`.
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            SystemFlag::Seen => Some("\\Seen"),
            SystemFlag::Answered => Some("\\Answered"),
            SystemFlag::Flagged => Some("\\Flagged"),
            SystemFlag::Deleted => Some("\\Deleted"),
            SystemFlag::Draft => Some("\\Draft"),
            SystemFlag::Recent | SystemFlag::User | SystemFlag::Spam => None,
        }
    }

    /// Flags a client can never store itself.
    pub fn unsettable() -> EnumSet<SystemFlag> {
        SystemFlag::Recent | SystemFlag::User
    }
}

/// One of the eleven color labels, stored as the keyword `cl_0` .. `cl_10`.
///
/// `cl_0` means "no color". A message carries at most one color label.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColorLabel(u8);

impl ColorLabel {
    /// The highest label value.
    pub const MAX: u8 = 10;

    const PREFIX: &'static str = "cl_";

    /// A label, if `value` is in range.
    pub fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(ColorLabel(value))
        } else {
            None
        }
    }

    /// The numeric label value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// The keyword this label is stored as.
    pub fn keyword(self) -> String {
        format!("{}{}", Self::PREFIX, self.0)
    }

    /// The label a keyword denotes, if it is one of the color label keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        keyword
            .strip_prefix(Self::PREFIX)
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(ColorLabel::new)
    }

    /// All labels, in ascending order.
    pub fn all() -> impl Iterator<Item = ColorLabel> {
        (0..=Self::MAX).map(ColorLabel)
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// The flags of one message: the system flag mask, its color label and any other keywords.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// System flags. `User` is set whenever `keywords` is non-empty.
    pub flags: EnumSet<SystemFlag>,
    /// The color label, if one is set.
    pub color_label: Option<ColorLabel>,
    /// Keywords other than the color label.
    pub keywords: Vec<String>,
}

impl FlagSet {
    /// Collect the flags a `FETCH` reported.
    pub fn from_flags<'a, 'f: 'a>(flags: impl IntoIterator<Item = &'a Flag<'f>>) -> Self {
        let mut set = FlagSet::default();
        for flag in flags {
            match flag {
                Flag::Custom(keyword) => {
                    if let Some(label) = ColorLabel::from_keyword(keyword) {
                        // several labels can only come from another client; keep the highest
                        if set.color_label.map_or(true, |l| l < label) {
                            set.color_label = Some(label);
                        }
                    } else {
                        set.keywords.push(keyword.to_string());
                    }
                    set.flags |= SystemFlag::User;
                }
                other => {
                    if let Some(bit) = other.system_flag() {
                        set.flags |= bit;
                    }
                }
            }
        }
        set
    }

    /// Whether `flag` is set.
    pub fn contains(&self, flag: SystemFlag) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_flags_are_case_insensitive() {
        assert_eq!(Flag::from("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::from("\\deleted"), Flag::Deleted);
        assert_eq!(Flag::from("$Junk"), Flag::Custom("$Junk".into()));
    }

    #[test]
    fn color_label_keywords() {
        assert_eq!(ColorLabel::new(3).unwrap().keyword(), "cl_3");
        assert_eq!(ColorLabel::from_keyword("cl_10"), ColorLabel::new(10));
        assert_eq!(ColorLabel::from_keyword("cl_11"), None);
        assert_eq!(ColorLabel::from_keyword("cl_x"), None);
        assert_eq!(ColorLabel::all().count(), 11);
    }

    #[test]
    fn flag_set_from_fetch_flags() {
        let flags = vec![
            Flag::Seen,
            Flag::Recent,
            Flag::Custom("cl_4".into()),
            Flag::Custom("$Forwarded".into()),
        ];
        let set = FlagSet::from_flags(&flags);
        assert!(set.contains(SystemFlag::Seen));
        assert!(set.contains(SystemFlag::Recent));
        assert!(set.contains(SystemFlag::User));
        assert!(!set.contains(SystemFlag::Deleted));
        assert_eq!(set.color_label, ColorLabel::new(4));
        assert_eq!(set.keywords, vec!["$Forwarded".to_string()]);
    }

    #[test]
    fn unsettable_flags_have_no_wire_name() {
        for flag in SystemFlag::unsettable() {
            assert_eq!(flag.wire_name(), None);
        }
        assert_eq!(SystemFlag::Draft.wire_name(), Some("\\Draft"));
    }
}
