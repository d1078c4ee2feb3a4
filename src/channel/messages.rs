//! Channel Message Types
//!
//! JSON-serializable messages exchanged between page/popup contexts and the
//! coordinator.

use serde::{Deserialize, Serialize};

use crate::dispatch::{HowToOpen, KeyState};

/// Stable identity of a connected context: the hosting surface (tab) and the
/// frame within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortIdentity {
    pub surface_id: u32,
    pub frame_id: u32,
}

/// Selection state as reported by a page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// Filtered selection text (bounded length or the too-long marker).
    pub text: String,
    /// The selection lives in an editable field.
    pub editable: bool,
    /// The selection lives in a recognized search-engine input.
    pub searchable: bool,
    /// The reporting surface just lost focus/selection.
    pub blur: bool,
}

/// Why a selection update was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateReason {
    #[serde(rename = "window.focus")]
    WindowFocus,
    #[serde(rename = "window.blur")]
    WindowBlur,
    #[serde(rename = "document.selectionchange")]
    SelectionChange,
    #[serde(rename = "editable.initial")]
    EditableInitial,
    #[serde(rename = "editable.focus")]
    EditableFocus,
    #[serde(rename = "editable.blur")]
    EditableBlur,
    #[serde(rename = "editable.select")]
    EditableSelect,
    #[serde(rename = "identity.assigned")]
    IdentityAssigned,
}

impl UpdateReason {
    /// Blur reasons report loss of focus; the registry guards them with the
    /// owner-identity check.
    pub fn is_blur(&self) -> bool {
        matches!(self, UpdateReason::WindowBlur | UpdateReason::EditableBlur)
    }
}

/// Messages exchanged over a channel.
///
/// An unknown `type` tag fails deserialization at the receiving boundary;
/// inside the crate the match over this enum is exhaustive, so a missing
/// handler is a compile error rather than a runtime lookup failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Page context announces presence; the coordinator replies with
    /// [`Message::Welcome`].
    Hello,

    /// Coordinator assigns a stable identity to the requester.
    Welcome { identity: PortIdentity },

    /// Page context pushes a local selection change.
    NotifySelectionUpdated {
        reason: UpdateReason,
        selection: SelectionSnapshot,
    },

    /// Page or popup context triggers a quoted search.
    DoQuotedSearch {
        selection_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        key_state: Option<KeyState>,
    },

    /// Page or popup context triggers navigation to the options page.
    OpenOptionsPage {
        #[serde(skip_serializing_if = "Option::is_none")]
        key_state: Option<KeyState>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default_how_to_open: Option<HowToOpen>,
    },

    /// Popup context pulls the current selection for a given tab.
    GetSelection { tab: u32 },

    /// Response to [`Message::GetSelection`]; `selection` is absent when the
    /// requesting tab is not the current owner.
    NotifySelection {
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<SelectionSnapshot>,
    },

    /// Coordinator tells the owning page context to put quotes around the
    /// current selection (from a shortcut or menu click).
    PutQuotes,
}
