//! Interceptable properties
//!
//! Form-control property setters and CSSOM rule methods can be wrapped by
//! an observer. The native behavior always runs first; hooks are notified
//! afterwards. Restoring an interception removes the hook and leaves the
//! native behavior exactly as it was.

use std::fmt;
use std::rc::Rc;

use crate::NodeId;

/// A property setter or method that can be intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptPoint {
    /// `HTMLInputElement.value`
    InputValue,
    /// `HTMLInputElement.checked`
    InputChecked,
    /// `HTMLSelectElement.value`
    SelectValue,
    /// `HTMLSelectElement.selectedIndex`
    SelectSelectedIndex,
    /// `HTMLTextAreaElement.value`
    TextAreaValue,
    /// `CSSStyleSheet.insertRule`
    InsertRule,
    /// `CSSStyleSheet.deleteRule`
    DeleteRule,
}

impl InterceptPoint {
    /// Every form-control property setter
    pub const CONTROL_PROPERTIES: [InterceptPoint; 5] = [
        InterceptPoint::InputValue,
        InterceptPoint::InputChecked,
        InterceptPoint::SelectValue,
        InterceptPoint::TextAreaValue,
        InterceptPoint::SelectSelectedIndex,
    ];
}

/// What an intercepted call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercepted {
    /// A control property was assigned
    Property { target: NodeId, point: InterceptPoint },
    /// A rule was inserted into the sheet owned by `owner`
    RuleInserted { owner: NodeId, rule: String, index: usize },
    /// A rule was deleted from the sheet owned by `owner`
    RuleDeleted { owner: NodeId, index: usize },
}

/// Hook invoked after the native behavior
pub type InterceptHook = Rc<dyn Fn(&Intercepted)>;

/// Handle used to restore an interception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptionId(pub(crate) u64);

/// Installed interceptions of one document
#[derive(Default)]
pub(crate) struct Interceptors {
    entries: Vec<(InterceptionId, InterceptPoint, InterceptHook)>,
    next_id: u64,
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("installed", &self.entries.iter().map(|(id, p, _)| (id.0, *p)).collect::<Vec<_>>())
            .finish()
    }
}

impl Interceptors {
    pub fn install(&mut self, point: InterceptPoint, hook: InterceptHook) -> InterceptionId {
        self.next_id += 1;
        let id = InterceptionId(self.next_id);
        self.entries.push((id, point, hook));
        id
    }

    /// Returns false when `id` was already restored
    pub fn restore(&mut self, id: InterceptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        before != self.entries.len()
    }

    pub fn is_intercepted(&self, point: InterceptPoint) -> bool {
        self.entries.iter().any(|(_, p, _)| *p == point)
    }

    /// Hooks for a point, cloned so they can run without borrowing the table
    pub fn hooks_for(&self, point: InterceptPoint) -> Vec<InterceptHook> {
        self.entries.iter()
            .filter(|(_, p, _)| *p == point)
            .map(|(_, _, hook)| Rc::clone(hook))
            .collect()
    }
}
