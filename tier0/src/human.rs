//! Declared UI for human-tier tasks.
//!
//! These types live in the protocol crate so the [`crate::TierHandler`]
//! enum can carry them; the coordinator that renders and resolves them
//! lives in its own crate.

use serde::{Deserialize, Serialize};

/// What a human sees and how they may answer.
///
/// A task may declare quick actions (one-tap answers with fixed
/// values), a form (free-form fields with per-field validation), or
/// both. The coordinator validates every response against this
/// declaration before it reaches the cascade.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUi {
    /// Short title shown in the delivery channel.
    pub title: String,
    /// Longer prompt, if the title is not enough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One-tap answers.
    #[serde(default)]
    pub quick_actions: Vec<QuickAction>,
    /// Free-form fields.
    #[serde(default)]
    pub form: Vec<FormField>,
}

impl TaskUi {
    /// A UI with just a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Look up a quick action by id.
    pub fn action(&self, id: &str) -> Option<&QuickAction> {
        self.quick_actions.iter().find(|a| a.id == id)
    }
}

/// A one-tap answer with a declared output value.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAction {
    /// Stable id the delivery fabric echoes back.
    pub id: String,
    /// Button label.
    pub label: String,
    /// The output value a tap of this action maps to.
    pub value: serde_json::Value,
}

impl QuickAction {
    /// Create a quick action.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
        }
    }
}

/// One declared form field.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    /// Key in the submitted field map.
    pub name: String,
    /// Label shown next to the field.
    pub label: String,
    /// What values the field accepts.
    pub kind: FieldKind,
    /// Whether a submission without this field is rejected.
    #[serde(default)]
    pub required: bool,
}

impl FormField {
    /// A required field.
    pub fn required(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: true,
        }
    }

    /// An optional field.
    pub fn optional(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
        }
    }
}

/// Accepted value shapes for a form field.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any JSON string.
    Text,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A string drawn from a fixed option list.
    Select(Vec<String>),
}
