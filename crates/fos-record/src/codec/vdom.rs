//! Node, tree and patch encoding

use std::collections::BTreeMap;

use super::{ByteReader, ByteWriter, CodecResult};
use crate::error::CodecError;
use crate::vdom::{Patch, VNode, VNodeId, VTree};

const NODE_DOCTYPE: u8 = 0;
const NODE_DOCUMENT: u8 = 1;
const NODE_ELEMENT: u8 = 2;
const NODE_TEXT: u8 = 3;

const PATCH_ATTRIBUTE: u8 = 0;
const PATCH_TEXT: u8 = 1;
const PATCH_ADD_NODES: u8 = 2;
const PATCH_REMOVE_NODES: u8 = 3;
const PATCH_TEXT_PROPERTY: u8 = 4;
const PATCH_BOOLEAN_PROPERTY: u8 = 5;
const PATCH_NUMBER_PROPERTY: u8 = 6;

/// Encode a single node
pub fn encode_node(node: &VNode) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    write_node(&mut w, node)?;
    Ok(w.into_bytes())
}

/// Decode a single node
pub fn decode_node(bytes: &[u8]) -> CodecResult<VNode> {
    read_node(&mut ByteReader::new(bytes))
}

pub fn encode_tree(tree: &VTree) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    write_tree(&mut w, tree)?;
    Ok(w.into_bytes())
}

pub fn decode_tree(bytes: &[u8]) -> CodecResult<VTree> {
    read_tree(&mut ByteReader::new(bytes))
}

pub fn encode_patch(patch: &Patch) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    write_patch(&mut w, patch)?;
    Ok(w.into_bytes())
}

pub fn decode_patch(bytes: &[u8]) -> CodecResult<Patch> {
    read_patch(&mut ByteReader::new(bytes))
}

fn write_children(w: &mut ByteWriter, children: &[VNodeId]) -> CodecResult<()> {
    w.len16("child list", children.len())?;
    for child in children {
        w.id(child)?;
    }
    Ok(())
}

fn read_children(r: &mut ByteReader<'_>) -> CodecResult<Vec<VNodeId>> {
    let len = r.u16()? as usize;
    (0..len).map(|_| r.id()).collect()
}

pub(crate) fn write_node(w: &mut ByteWriter, node: &VNode) -> CodecResult<()> {
    match node {
        VNode::DocType { id, name, public_id, system_id } => {
            w.u8(NODE_DOCTYPE);
            w.id(id)?;
            w.str8("doctype name", name)?;
            w.str8("doctype public id", public_id)?;
            w.str8("doctype system id", system_id)?;
        }
        VNode::Document { id, children } => {
            w.u8(NODE_DOCUMENT);
            w.id(id)?;
            write_children(w, children)?;
        }
        VNode::Element { id, tag_name, children, attributes } => {
            w.u8(NODE_ELEMENT);
            w.id(id)?;
            w.str8("tag name", tag_name)?;
            write_children(w, children)?;
            w.len16("attribute list", attributes.len())?;
            for (name, value) in attributes {
                w.str8("attribute name", name)?;
                w.opt_str16("attribute value", value.as_deref())?;
            }
        }
        VNode::Text { id, value } => {
            w.u8(NODE_TEXT);
            w.id(id)?;
            w.str32("text value", value)?;
        }
    }
    Ok(())
}

pub(crate) fn read_node(r: &mut ByteReader<'_>) -> CodecResult<VNode> {
    let tag = r.u8()?;
    let id = r.id()?;
    let node = match tag {
        NODE_DOCTYPE => VNode::DocType {
            id,
            name: r.str8()?,
            public_id: r.str8()?,
            system_id: r.str8()?,
        },
        NODE_DOCUMENT => VNode::Document { id, children: read_children(r)? },
        NODE_ELEMENT => {
            let tag_name = r.str8()?;
            let children = read_children(r)?;
            let len = r.u16()? as usize;
            let mut attributes = BTreeMap::new();
            for _ in 0..len {
                let name = r.str8()?;
                attributes.insert(name, r.opt_str16()?);
            }
            VNode::Element { id, tag_name, children, attributes }
        }
        NODE_TEXT => VNode::Text { id, value: r.str32()? },
        tag => return Err(CodecError::UnknownTag { kind: "node", tag }),
    };
    Ok(node)
}

pub(crate) fn write_tree(w: &mut ByteWriter, tree: &VTree) -> CodecResult<()> {
    w.id(&tree.root_id)?;
    w.len32("node list", tree.nodes.len())?;
    for node in tree.nodes.values() {
        write_node(w, node)?;
    }
    Ok(())
}

pub(crate) fn read_tree(r: &mut ByteReader<'_>) -> CodecResult<VTree> {
    let root_id = r.id()?;
    let len = r.u32()? as usize;
    let mut nodes = BTreeMap::new();
    for _ in 0..len {
        let node = read_node(r)?;
        nodes.insert(node.id().clone(), node);
    }
    Ok(VTree { root_id, nodes })
}

fn write_fragments(
    w: &mut ByteWriter,
    parent_id: &VNodeId,
    previous_sibling_id: Option<&VNodeId>,
    next_sibling_id: Option<&VNodeId>,
    nodes: &[VTree],
) -> CodecResult<()> {
    w.id(parent_id)?;
    w.opt_id(previous_sibling_id)?;
    w.opt_id(next_sibling_id)?;
    w.len16("fragment list", nodes.len())?;
    for tree in nodes {
        write_tree(w, tree)?;
    }
    Ok(())
}

type Fragments = (VNodeId, Option<VNodeId>, Option<VNodeId>, Vec<VTree>);

fn read_fragments(r: &mut ByteReader<'_>) -> CodecResult<Fragments> {
    let parent_id = r.id()?;
    let previous_sibling_id = r.opt_id()?;
    let next_sibling_id = r.opt_id()?;
    let len = r.u16()? as usize;
    let nodes = (0..len).map(|_| read_tree(r)).collect::<CodecResult<Vec<_>>>()?;
    Ok((parent_id, previous_sibling_id, next_sibling_id, nodes))
}

pub(crate) fn write_patch(w: &mut ByteWriter, patch: &Patch) -> CodecResult<()> {
    match patch {
        Patch::Attribute { target_id, name, value, old_value } => {
            w.u8(PATCH_ATTRIBUTE);
            w.id(target_id)?;
            w.str8("attribute name", name)?;
            w.opt_str16("attribute value", value.as_deref())?;
            w.opt_str16("attribute old value", old_value.as_deref())?;
        }
        Patch::Text { target_id, value, old_value } => {
            w.u8(PATCH_TEXT);
            w.id(target_id)?;
            w.str32("text value", value)?;
            w.str32("text old value", old_value)?;
        }
        Patch::AddNodes { parent_id, previous_sibling_id, next_sibling_id, nodes } => {
            w.u8(PATCH_ADD_NODES);
            write_fragments(w, parent_id, previous_sibling_id.as_ref(), next_sibling_id.as_ref(), nodes)?;
        }
        Patch::RemoveNodes { parent_id, previous_sibling_id, next_sibling_id, nodes } => {
            w.u8(PATCH_REMOVE_NODES);
            write_fragments(w, parent_id, previous_sibling_id.as_ref(), next_sibling_id.as_ref(), nodes)?;
        }
        Patch::TextProperty { target_id, name, value, old_value } => {
            w.u8(PATCH_TEXT_PROPERTY);
            w.id(target_id)?;
            w.str8("property name", name)?;
            w.str16("property value", value)?;
            w.str16("property old value", old_value)?;
        }
        Patch::BooleanProperty { target_id, name, value, old_value } => {
            w.u8(PATCH_BOOLEAN_PROPERTY);
            w.id(target_id)?;
            w.str8("property name", name)?;
            w.bool(*value);
            w.bool(*old_value);
        }
        Patch::NumberProperty { target_id, name, value, old_value } => {
            w.u8(PATCH_NUMBER_PROPERTY);
            w.id(target_id)?;
            w.str8("property name", name)?;
            w.f64(*value);
            w.f64(*old_value);
        }
    }
    Ok(())
}

pub(crate) fn read_patch(r: &mut ByteReader<'_>) -> CodecResult<Patch> {
    let patch = match r.u8()? {
        PATCH_ATTRIBUTE => Patch::Attribute {
            target_id: r.id()?,
            name: r.str8()?,
            value: r.opt_str16()?,
            old_value: r.opt_str16()?,
        },
        PATCH_TEXT => Patch::Text {
            target_id: r.id()?,
            value: r.str32()?,
            old_value: r.str32()?,
        },
        PATCH_ADD_NODES => {
            let (parent_id, previous_sibling_id, next_sibling_id, nodes) = read_fragments(r)?;
            Patch::AddNodes { parent_id, previous_sibling_id, next_sibling_id, nodes }
        }
        PATCH_REMOVE_NODES => {
            let (parent_id, previous_sibling_id, next_sibling_id, nodes) = read_fragments(r)?;
            Patch::RemoveNodes { parent_id, previous_sibling_id, next_sibling_id, nodes }
        }
        PATCH_TEXT_PROPERTY => Patch::TextProperty {
            target_id: r.id()?,
            name: r.str8()?,
            value: r.str16()?,
            old_value: r.str16()?,
        },
        PATCH_BOOLEAN_PROPERTY => Patch::BooleanProperty {
            target_id: r.id()?,
            name: r.str8()?,
            value: r.bool()?,
            old_value: r.bool()?,
        },
        PATCH_NUMBER_PROPERTY => Patch::NumberProperty {
            target_id: r.id()?,
            name: r.str8()?,
            value: r.f64()?,
            old_value: r.f64()?,
        },
        tag => return Err(CodecError::UnknownTag { kind: "patch", tag }),
    };
    Ok(patch)
}
