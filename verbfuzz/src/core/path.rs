//! Path expressions over verb nodes.
//!
//! Syntax: `.` separates field accesses, a `[*]` suffix iterates every element
//! of a list-valued field, and a bare `**` segment matches the current node and
//! every node reachable below it (links of a chain, list elements, embedded
//! sub-objects) in pre-order.
//!
//! Resolution never fails: a missing field, a null link, or a wildcard applied
//! to a value of the wrong shape contributes nothing. Syntax errors are caught
//! by [`PathExpr::parse`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::error::PathSyntaxError;
use crate::core::node::{Field, Node, ResourceLeaf};

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("static field-name regex"));

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Each,
    Descend,
}

/// Parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    raw: String,
    segments: Vec<Segment>,
}

impl PathExpr {
    pub fn parse(raw: &str) -> Result<Self, PathSyntaxError> {
        if raw.is_empty() {
            return Err(PathSyntaxError::Empty);
        }

        let mut segments = Vec::new();
        for (position, part) in raw.split('.').enumerate() {
            if part.is_empty() {
                return Err(PathSyntaxError::EmptySegment {
                    path: raw.to_string(),
                    position,
                });
            }
            if part == "**" {
                segments.push(Segment::Descend);
                continue;
            }
            parse_field_segment(raw, part, &mut segments)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True if the path can match more than one value.
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Each | Segment::Descend))
    }

    /// Resource leaves reachable from `root`, in traversal order, repeats kept.
    pub fn resolve<'a>(&self, root: &'a dyn Node) -> Vec<ResourceLeaf<'a>> {
        let mut frontier = vec![Field::Node(root)];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in frontier {
                step(segment, value, &mut next);
            }
            frontier = next;
        }
        frontier
            .into_iter()
            .filter_map(|value| match value {
                Field::Resource(leaf) => Some(leaf),
                _ => None,
            })
            .collect()
    }

    /// Like [`PathExpr::resolve`], keeping only the first occurrence of each leaf.
    pub fn resolve_unique<'a>(&self, root: &'a dyn Node) -> Vec<ResourceLeaf<'a>> {
        let mut unique: Vec<ResourceLeaf<'a>> = Vec::new();
        for leaf in self.resolve(root) {
            if !unique.contains(&leaf) {
                unique.push(leaf);
            }
        }
        unique
    }
}

impl FromStr for PathExpr {
    type Err = PathSyntaxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        PathExpr::parse(raw)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Every resource leaf anywhere under `root`, in pre-order.
pub fn all_leaves(root: &dyn Node) -> Vec<(String, ResourceLeaf<'_>)> {
    let mut leaves = Vec::new();
    collect_leaves(Field::Node(root), root.type_name().to_string(), &mut leaves);
    leaves
}

fn collect_leaves<'a>(value: Field<'a>, at: String, out: &mut Vec<(String, ResourceLeaf<'a>)>) {
    match value {
        Field::Resource(leaf) => out.push((at, leaf)),
        Field::Node(node) => {
            for (name, field) in node.fields() {
                collect_leaves(field, format!("{at}.{name}"), out);
            }
        }
        Field::List(items) => {
            for (index, item) in items.into_iter().enumerate() {
                collect_leaves(item, format!("{at}[{index}]"), out);
            }
        }
        Field::Scalar | Field::Null => {}
    }
}

fn parse_field_segment(
    raw: &str,
    part: &str,
    segments: &mut Vec<Segment>,
) -> Result<(), PathSyntaxError> {
    let Some(name) = FIELD_NAME.find(part) else {
        return Err(bad_token(raw, part, part));
    };
    segments.push(Segment::Field(name.as_str().to_string()));

    let mut rest = &part[name.end()..];
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("[*]") {
            segments.push(Segment::Each);
            rest = after;
            continue;
        }
        return Err(bad_token(raw, part, rest));
    }
    Ok(())
}

fn bad_token(raw: &str, part: &str, token: &str) -> PathSyntaxError {
    let opens = part.matches('[').count();
    let closes = part.matches(']').count();
    if opens != closes {
        return PathSyntaxError::UnbalancedBracket {
            path: raw.to_string(),
            segment: part.to_string(),
        };
    }
    PathSyntaxError::UnexpectedToken {
        path: raw.to_string(),
        token: token.to_string(),
    }
}

fn step<'a>(segment: &Segment, value: Field<'a>, out: &mut Vec<Field<'a>>) {
    match segment {
        Segment::Field(name) => {
            if let Field::Node(node) = value {
                if let Some(field) = node.field(name) {
                    out.push(field);
                }
            }
        }
        Segment::Each => {
            if let Field::List(items) = value {
                out.extend(items);
            }
        }
        Segment::Descend => descend(value, out),
    }
}

fn descend<'a>(value: Field<'a>, out: &mut Vec<Field<'a>>) {
    match value {
        Field::Node(node) => {
            out.push(Field::Node(node));
            for (_, field) in node.fields() {
                descend(field, out);
            }
        }
        Field::List(items) => {
            for item in items {
                descend(item, out);
            }
        }
        Field::Scalar | Field::Null | Field::Resource(_) => {}
    }
}
