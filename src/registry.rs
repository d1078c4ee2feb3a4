//! Selection Registry
//!
//! The coordinator's single authoritative store of the current selection and
//! its owner identity. Because message arrival order across different
//! senders is not guaranteed, ownership is resolved by explicit identity
//! comparison rather than last-message-wins sequencing.

use tracing::{debug, info};

use crate::channel::{PortIdentity, SelectionSnapshot};

/// The singleton selection state. Created unowned and blurred; mutated only
/// through [`SelectionRegistry::on_selection_notify`]; never destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSelection {
    pub owner: Option<PortIdentity>,
    pub text: String,
    pub editable: bool,
    pub searchable: bool,
    pub blur: bool,
}

impl Default for CurrentSelection {
    fn default() -> Self {
        Self {
            owner: None,
            text: String::new(),
            editable: false,
            searchable: false,
            blur: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionRegistry {
    current: CurrentSelection,
}

impl SelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &CurrentSelection {
        &self.current
    }

    /// Applies a selection update from `sender`.
    ///
    /// A non-blur update unconditionally makes the sender the owner. A blur
    /// update is applied only when the sender still owns the selection: a
    /// late blur from a surface that has already lost ownership must not
    /// corrupt the newer owner's state. Returns whether the update was
    /// applied.
    pub fn on_selection_notify(
        &mut self,
        selection: &SelectionSnapshot,
        sender: PortIdentity,
    ) -> bool {
        if selection.blur && !self.is_owner(sender.surface_id, Some(sender.frame_id)) {
            info!(
                ?sender,
                "Ignore blur from a context whose selection has already been \
                 superseded by a newly focused one"
            );
            return false;
        }

        self.current.owner = Some(sender);
        self.current.text = selection.text.clone();
        self.current.editable = selection.editable;
        self.current.searchable = selection.searchable;
        self.current.blur = selection.blur;
        debug!(current = ?self.current, "Update current selection");
        true
    }

    /// True iff an owner exists, `surface_id` matches, and `frame_id` is
    /// absent or matches.
    pub fn is_owner(&self, surface_id: u32, frame_id: Option<u32>) -> bool {
        match &self.current.owner {
            Some(owner) => {
                owner.surface_id == surface_id
                    && frame_id.map_or(true, |frame_id| owner.frame_id == frame_id)
            }
            None => false,
        }
    }

    /// Returns a copy of the selection only when `surface_id` is the current
    /// owner; an unrelated surface must not see another surface's selection.
    pub fn read(&self, surface_id: u32) -> Option<SelectionSnapshot> {
        if !self.is_owner(surface_id, None) {
            return None;
        }
        Some(SelectionSnapshot {
            text: self.current.text.clone(),
            editable: self.current.editable,
            searchable: self.current.searchable,
            blur: self.current.blur,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, blur: bool) -> SelectionSnapshot {
        SelectionSnapshot {
            text: text.to_string(),
            editable: false,
            searchable: false,
            blur,
        }
    }

    fn identity(surface_id: u32, frame_id: u32) -> PortIdentity {
        PortIdentity {
            surface_id,
            frame_id,
        }
    }

    #[test]
    fn test_initial_state_is_unowned_and_blurred() {
        let registry = SelectionRegistry::new();
        assert!(registry.current().owner.is_none());
        assert!(registry.current().blur);
    }

    #[test]
    fn test_non_blur_update_takes_ownership() {
        let mut registry = SelectionRegistry::new();
        assert!(registry.on_selection_notify(&snapshot("foo", false), identity(1, 0)));
        assert_eq!(registry.current().owner, Some(identity(1, 0)));
        assert_eq!(registry.current().text, "foo");
        assert!(!registry.current().blur);

        // Another context taking the selection wins unconditionally.
        assert!(registry.on_selection_notify(&snapshot("bar", false), identity(2, 0)));
        assert_eq!(registry.current().owner, Some(identity(2, 0)));
        assert_eq!(registry.current().text, "bar");
    }

    #[test]
    fn test_blur_from_non_owner_frame_is_discarded() {
        let mut registry = SelectionRegistry::new();
        registry.on_selection_notify(&snapshot("foo", false), identity(1, 0));

        // Late blur from a different frame of the same tab: discarded.
        assert!(!registry.on_selection_notify(&snapshot("", true), identity(1, 1)));
        assert_eq!(registry.current().owner, Some(identity(1, 0)));
        assert_eq!(registry.current().text, "foo");
        assert!(!registry.current().blur);

        // Blur from the actual owner: applied, owner unchanged.
        assert!(registry.on_selection_notify(&snapshot("foo", true), identity(1, 0)));
        assert!(registry.current().blur);
        assert_eq!(registry.current().owner, Some(identity(1, 0)));
    }

    #[test]
    fn test_blur_before_any_owner_is_discarded() {
        let mut registry = SelectionRegistry::new();
        assert!(!registry.on_selection_notify(&snapshot("", true), identity(1, 0)));
        assert!(registry.current().owner.is_none());
    }

    #[test]
    fn test_is_owner_frame_matching() {
        let mut registry = SelectionRegistry::new();
        registry.on_selection_notify(&snapshot("foo", false), identity(1, 2));

        assert!(registry.is_owner(1, None));
        assert!(registry.is_owner(1, Some(2)));
        assert!(!registry.is_owner(1, Some(0)));
        assert!(!registry.is_owner(2, None));
    }

    #[test]
    fn test_read_is_owner_guarded() {
        let mut registry = SelectionRegistry::new();
        assert!(registry.read(1).is_none());

        registry.on_selection_notify(&snapshot("foo", false), identity(1, 0));
        let view = registry.read(1).expect("owner can read");
        assert_eq!(view.text, "foo");
        assert!(registry.read(2).is_none());
    }
}
