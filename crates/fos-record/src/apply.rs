//! Consolidated-state applier
//!
//! The only place where patch and interaction semantics are defined. Used
//! for the live trailing state, for folding evicted events into the leading
//! snapshot, and for seeking inside a finished recording.

use crate::vdom::{
    EventData, Interaction, InteractionSnapshot, Patch, PointerState, Snapshot, SourceEvent, VNode,
    VNodeId, VTree,
};

/// Apply one event to `state` in place
pub fn apply<'a>(state: &'a mut Snapshot, event: &SourceEvent) -> &'a mut Snapshot {
    match &event.data {
        EventData::Snapshot(snapshot) => {
            state.tree = snapshot.tree.clone();
            state.interaction = snapshot.interaction.clone();
        }
        EventData::DomPatch(patch) => match state.tree.as_mut() {
            Some(tree) => apply_patch(tree, patch),
            None => tracing::trace!("Patch at {} dropped: no tree", event.time),
        },
        EventData::Interaction(interaction) => {
            if let Some(snapshot) = state.interaction.as_mut() {
                apply_interaction(snapshot, interaction);
            }
        }
        EventData::CloseRecording => {}
    }
    state
}

/// Apply a structural or content patch to a tree
pub fn apply_patch(tree: &mut VTree, patch: &Patch) {
    match patch {
        Patch::Attribute { target_id, name, value, .. } => {
            if let Some(VNode::Element { attributes, .. }) = tree.nodes.get_mut(target_id) {
                match value {
                    Some(value) => {
                        attributes.insert(name.clone(), Some(value.clone()));
                    }
                    None => {
                        attributes.remove(name);
                    }
                }
            } else {
                tracing::trace!("Attribute patch for unknown element {}", target_id);
            }
        }
        Patch::Text { target_id, value, .. } => {
            if let Some(VNode::Text { value: current, .. }) = tree.nodes.get_mut(target_id) {
                *current = value.clone();
            } else {
                tracing::trace!("Text patch for unknown text node {}", target_id);
            }
        }
        Patch::AddNodes { parent_id, previous_sibling_id, next_sibling_id, nodes } => {
            add_nodes(tree, parent_id, previous_sibling_id.as_ref(), next_sibling_id.as_ref(), nodes);
        }
        Patch::RemoveNodes { parent_id, nodes, .. } => remove_nodes(tree, parent_id, nodes),
        // Control state does not live in the tree
        Patch::TextProperty { .. } | Patch::BooleanProperty { .. } | Patch::NumberProperty { .. } => {}
    }
}

fn add_nodes(
    tree: &mut VTree,
    parent_id: &VNodeId,
    previous: Option<&VNodeId>,
    next: Option<&VNodeId>,
    fragments: &[VTree],
) {
    let Some(children) = tree.nodes.get(parent_id).and_then(|p| match p {
        VNode::Document { children, .. } | VNode::Element { children, .. } => Some(children),
        _ => None,
    }) else {
        tracing::trace!("AddNodes for unknown parent {}", parent_id);
        return;
    };

    let mut index = previous
        .and_then(|p| children.iter().position(|c| c == p).map(|i| i + 1))
        .or_else(|| next.and_then(|n| children.iter().position(|c| c == n)))
        .unwrap_or(children.len());

    let fresh: Vec<&VTree> = fragments
        .iter()
        .filter(|f| !children.contains(&f.root_id))
        .collect();

    for fragment in fresh {
        for (id, node) in &fragment.nodes {
            tree.nodes.insert(id.clone(), node.clone());
        }
        if let Some(children) = tree.nodes.get_mut(parent_id).and_then(VNode::children_mut) {
            children.insert(index, fragment.root_id.clone());
            index += 1;
        }
    }
}

fn remove_nodes(tree: &mut VTree, parent_id: &VNodeId, fragments: &[VTree]) {
    for fragment in fragments {
        match tree.nodes.get_mut(parent_id).and_then(VNode::children_mut) {
            Some(children) => children.retain(|c| c != &fragment.root_id),
            None => {
                tracing::trace!("RemoveNodes for unknown parent {}", parent_id);
                return;
            }
        }
        for id in tree.subtree_ids(&fragment.root_id) {
            tree.nodes.remove(&id);
        }
        for id in fragment.nodes.keys() {
            tree.nodes.remove(id);
        }
    }
}

/// Apply an interaction to the interaction state
pub fn apply_interaction(snapshot: &mut InteractionSnapshot, interaction: &Interaction) {
    match interaction {
        Interaction::PointerMove { to, .. } => snapshot.pointer = to.value,
        Interaction::PointerDown { at, .. } => {
            snapshot.pointer = *at;
            snapshot.pointer_state = PointerState::Down;
        }
        Interaction::PointerUp { at, .. } => {
            snapshot.pointer = *at;
            snapshot.pointer_state = PointerState::Up;
        }
        Interaction::Scroll { target, to, .. } => {
            // [0, 0] is already implied for targets never seen scrolled
            if to.value == [0.0, 0.0] && !snapshot.scroll.contains_key(target) {
                return;
            }
            snapshot.scroll.insert(target.clone(), to.value);
        }
        Interaction::ViewportResize { to, .. } => snapshot.viewport = to.value,
        Interaction::KeyDown { .. } | Interaction::KeyUp { .. } => {}
    }
}
