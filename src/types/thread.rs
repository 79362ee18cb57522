use std::fmt;
use std::str::FromStr;

use super::Seq;
use crate::error::Error;

/// One message of a [`THREAD`](https://tools.ietf.org/html/rfc5256#section-4) response and the
/// messages that reply to it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ThreadNode {
    /// Sequence number of the message.
    pub message: Seq,
    /// Direct replies, in server order.
    pub children: Vec<ThreadNode>,
}

impl ThreadNode {
    /// A node without children.
    pub fn leaf(message: Seq) -> Self {
        ThreadNode {
            message,
            children: Vec::new(),
        }
    }

    fn render(&self, out: &mut String) {
        out.push_str(&self.message.to_string());
        match self.children.as_slice() {
            [] => {}
            [only] => {
                out.push(' ');
                only.render(out);
            }
            children => {
                out.push(' ');
                for child in children {
                    out.push('(');
                    child.render(out);
                    out.push(')');
                }
            }
        }
    }

    fn flatten_into(&self, level: usize, out: &mut Vec<(Seq, usize)>) {
        out.push((self.message, level));
        for child in &self.children {
            child.flatten_into(level + 1, out);
        }
    }
}

/// The forest of threads a `THREAD` command returns. Roots are in server order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Threads(pub Vec<ThreadNode>);

impl Threads {
    /// Parse the arguments of an untagged `THREAD` response, e.g. `(2)(3 6 (4 23)(44 7 96))`.
    ///
    /// Input without any parenthesized group is an empty forest.
    pub fn parse(input: &str) -> Result<Threads, Error> {
        crate::parse::parse_threads(input.as_bytes())
    }

    /// The canonical wire form: one parenthesized group per root, chains written inline and
    /// branches as adjacent groups.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for root in &self.0 {
            out.push('(');
            root.render(&mut out);
            out.push(')');
        }
        out
    }

    /// Depth-first walk yielding each message with its depth, roots at level 0.
    pub fn flatten(&self) -> Vec<(Seq, usize)> {
        let mut out = Vec::new();
        for root in &self.0 {
            root.flatten_into(0, &mut out);
        }
        out
    }

    /// Returns true if there are no threads.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of root messages.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Threads {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Threads::parse(s)
    }
}
