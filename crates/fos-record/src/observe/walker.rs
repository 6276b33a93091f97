//! Document walker
//!
//! Builds a [`VTree`] from a live subtree, assigning ids to nodes that do
//! not have one yet. Comments and ignored subtrees are left out.

use std::collections::BTreeMap;

use fos_dom::{Document, NodeData, NodeId};

use super::{clamp_value, IdRegistry, IgnoreRules};
use crate::vdom::{Point, VNode, VNodeId, VTree};

#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    rules: IgnoreRules,
}

impl TreeWalker {
    pub fn new(rules: IgnoreRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Whole document
    pub fn walk_document(&self, doc: &Document, ids: &mut IdRegistry) -> Option<VTree> {
        self.walk(doc, doc.root(), ids)
    }

    /// Subtree rooted at `node`; `None` for comments and ignored nodes
    pub fn walk(&self, doc: &Document, node: NodeId, ids: &mut IdRegistry) -> Option<VTree> {
        if !self.is_recorded(doc, node) || self.rules.is_ignored(doc, node) {
            return None;
        }

        let root_id = ids.id_for(node);
        let mut nodes = BTreeMap::new();
        let mut stack = vec![(node, root_id.clone())];

        while let Some((current, id)) = stack.pop() {
            let Some(live) = doc.tree().get(current) else {
                continue;
            };

            let children: Vec<(NodeId, VNodeId)> = doc.tree().children(current)
                .map(|(child, _)| child)
                .filter(|&child| self.is_recorded(doc, child) && !self.rules.matches(doc, child))
                .map(|child| (child, ids.id_for(child)))
                .collect();
            let child_ids = children.iter().map(|(_, id)| id.clone()).collect();

            let vnode = match &live.data {
                NodeData::Document => VNode::Document { id: id.clone(), children: child_ids },
                NodeData::Doctype(doctype) => VNode::DocType {
                    id: id.clone(),
                    name: doctype.name.clone(),
                    public_id: doctype.public_id.clone(),
                    system_id: doctype.system_id.clone(),
                },
                NodeData::Element(el) => VNode::Element {
                    id: id.clone(),
                    tag_name: el.tag_name.clone(),
                    children: child_ids,
                    attributes: el.attrs.iter()
                        .map(|a| (a.name.clone(), Some(clamp_value(&a.value))))
                        .collect(),
                },
                NodeData::Text(text) => VNode::Text { id: id.clone(), value: text.content.clone() },
                NodeData::Comment(_) => continue,
            };
            nodes.insert(id, vnode);
            stack.extend(children.into_iter().rev());
        }

        Some(VTree { root_id, nodes })
    }

    fn is_recorded(&self, doc: &Document, node: NodeId) -> bool {
        doc.tree().get(node).is_some_and(|n| !matches!(n.data, NodeData::Comment(_)))
    }

    /// Non-zero scroll offsets of connected, recorded nodes
    pub fn scroll_offsets(&self, doc: &Document, ids: &mut IdRegistry) -> BTreeMap<VNodeId, Point> {
        doc.tree().descendants(doc.root())
            .into_iter()
            .filter_map(|node| {
                let scroll = doc.tree().get(node)?.scroll;
                if scroll == [0.0, 0.0] || self.rules.is_ignored(doc, node) {
                    return None;
                }
                Some((ids.id_for(node), scroll))
            })
            .collect()
    }
}
