//! Selectors as declared in a flow file, plus the normalized shape the
//! script engine and skeleton builder actually operate on.
//!
//! A `Selector` is a recursive tree: every relative-selector field
//! (`child_of`, `below`, `above`, `left_of`, `right_of`, `contains_child`)
//! points at another `Selector`, and `contains_descendants` holds a list
//! of them. Each node is uniquely owned by its parent — there is no
//! aliasing, so expansion and normalization are plain post-order walks.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    Id,
    Text,
    Css,
}

/// The normalized `{type, value, optional}` shape used once a selector has
/// been resolved to a single matchable value. Chosen by precedence
/// id > text > css among the non-empty fields of the source `Selector`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSelector {
    #[serde(rename = "type")]
    pub kind: SelectorType,
    pub value: String,
    pub optional: bool,
}

/// The rich, possibly-recursive selector as authored in a flow file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_of: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_of: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_of: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_child: Option<Box<Selector>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains_descendants: Vec<Selector>,
}

impl Selector {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Default::default() }
    }

    pub fn by_text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    /// Normalizes to `{type, value, optional}`, preferring id > text > css.
    pub fn normalize(&self) -> Result<NormalizedSelector, DomainError> {
        if let Some(id) = self.id.as_deref().filter(|s| !s.is_empty()) {
            return Ok(NormalizedSelector { kind: SelectorType::Id, value: id.to_string(), optional: self.optional });
        }
        if let Some(text) = self.text.as_deref().filter(|s| !s.is_empty()) {
            return Ok(NormalizedSelector { kind: SelectorType::Text, value: text.to_string(), optional: self.optional });
        }
        if let Some(css) = self.css.as_deref().filter(|s| !s.is_empty()) {
            return Ok(NormalizedSelector { kind: SelectorType::Css, value: css.to_string(), optional: self.optional });
        }
        Err(DomainError::EmptySelector)
    }

    /// Every relative-selector child, in the fixed order the script engine
    /// walks them when expanding variables. `contains_descendants` entries
    /// are appended last, each owning the rest of its own subtree.
    pub fn relative_children_mut(&mut self) -> Vec<&mut Selector> {
        let mut out = Vec::new();
        for slot in [&mut self.child_of, &mut self.below, &mut self.above, &mut self.left_of, &mut self.right_of, &mut self.contains_child] {
            if let Some(sel) = slot {
                out.push(sel.as_mut());
            }
        }
        for sel in self.contains_descendants.iter_mut() {
            out.push(sel);
        }
        out
    }
}
