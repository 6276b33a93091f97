//! Simple selectors
//!
//! Compound selectors made of tag, `#id`, `.class` and `[attr]` parts, and
//! comma-separated lists of them. Enough for ignore rules; combinators are
//! not supported.

use crate::ElementData;

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Tag(String),
    Class(String),
    Id(String),
    Attribute(String),
    Universal,
}

impl SimpleSelector {
    fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => element.tag_name.eq_ignore_ascii_case(tag),
            Self::Id(id) => element.get_attr("id") == Some(id.as_str()),
            Self::Class(class) => element.classes().any(|c| c == class),
            Self::Attribute(name) => element.get_attr(name).is_some(),
        }
    }
}

/// Selector list; matches when any compound matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Vec<SimpleSelector>>,
}

impl Selector {
    /// Parse a selector list such as `div.ad, #banner, [data-private]`
    pub fn parse(source: &str) -> Option<Self> {
        let compounds = source
            .split(',')
            .map(parse_compound)
            .collect::<Option<Vec<_>>>()?;
        (!compounds.is_empty()).then_some(Self { compounds })
    }

    /// Check if an element matches
    pub fn matches(&self, element: &ElementData) -> bool {
        self.compounds
            .iter()
            .any(|compound| compound.iter().all(|s| s.matches(element)))
    }
}

fn parse_compound(source: &str) -> Option<Vec<SimpleSelector>> {
    let source = source.trim();
    if source.is_empty() || source.contains(char::is_whitespace) {
        return None;
    }

    let mut parts = Vec::new();
    let mut rest = source;

    let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    match tag {
        "" => {}
        "*" => parts.push(SimpleSelector::Universal),
        _ => parts.push(SimpleSelector::Tag(tag.to_ascii_lowercase())),
    }
    rest = &rest[tag_end..];

    while let Some(marker) = rest.chars().next() {
        rest = &rest[1..];
        if marker == '[' {
            let end = rest.find(']')?;
            let name = rest[..end].trim();
            if name.is_empty() {
                return None;
            }
            parts.push(SimpleSelector::Attribute(name.to_string()));
            rest = &rest[end + 1..];
            continue;
        }
        let end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            return None;
        }
        parts.push(match marker {
            '#' => SimpleSelector::Id(name.to_string()),
            '.' => SimpleSelector::Class(name.to_string()),
            _ => return None,
        });
        rest = &rest[end..];
    }

    Some(parts)
}
