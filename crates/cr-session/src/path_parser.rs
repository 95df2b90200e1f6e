//! Path resolution against the session's node tree.
//!
//! Absolute paths start at the workspace root, relative paths at a given
//! node. Segments are walked in a loop: `.` stays put, `..` moves to the
//! parent and `name[n]` picks the n-th child called `name`. When the last
//! segment names no child node, the current node's properties are tried if
//! the mode allows it.

use cr_types::{parse_segment, NodeId, PathSegment};

use crate::error::{SessionError, SessionResult};
use crate::property::PropertyKey;
use crate::session::Session;

/// Which kinds of item a resolution may end on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveMode {
    Nodes,
    Properties,
    /// Nodes first, then properties.
    Items,
}

impl ResolveMode {
    fn allows_nodes(self) -> bool {
        matches!(self, Self::Nodes | Self::Items)
    }

    fn allows_properties(self) -> bool {
        matches!(self, Self::Properties | Self::Items)
    }
}

/// A resolved item: a node or a property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    Node(NodeId),
    Property(PropertyKey),
}

impl Item {
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

/// Resolve `path` starting from `start`.
pub(crate) fn resolve(
    session: &mut Session,
    path: &str,
    start: NodeId,
    mode: ResolveMode,
) -> SessionResult<Item> {
    let (mut current, rest) = match path.strip_prefix('/') {
        Some(rest) => (session.root_id()?, rest),
        None => {
            session.ensure_loaded(&start)?;
            (start, path)
        }
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.len().checked_sub(1) else {
        return node_item(current, mode, path);
    };

    for (i, raw) in segments.iter().enumerate() {
        let segment = parse_segment(raw)
            .map_err(|e| SessionError::PathNotFound(format!("{path}: {e}")))?;
        match segment {
            PathSegment::Current => {}
            PathSegment::Parent => {
                current = session
                    .loaded_node(&current)?
                    .parent_id()
                    .ok_or_else(|| {
                        SessionError::PathNotFound(format!("{path}: the root node has no parent"))
                    })?;
                session.ensure_loaded(&current)?;
            }
            PathSegment::Name { name, index } => {
                let child = find_child(session, &current, &name, index)?;
                if i < last {
                    current = child.ok_or_else(|| SessionError::PathNotFound(path.to_string()))?;
                    continue;
                }
                if let Some(child) = child {
                    if mode.allows_nodes() {
                        return Ok(Item::Node(child));
                    }
                }
                let bare = !raw.contains('[');
                if bare
                    && mode.allows_properties()
                    && session.loaded_node(&current)?.property(&name).is_some()
                {
                    return Ok(Item::Property(PropertyKey::new(current, name)));
                }
                return Err(SessionError::PathNotFound(path.to_string()));
            }
        }
    }

    // The path ended on `.` or `..`.
    node_item(current, mode, path)
}

fn node_item(id: NodeId, mode: ResolveMode, path: &str) -> SessionResult<Item> {
    if mode.allows_nodes() {
        Ok(Item::Node(id))
    } else {
        Err(SessionError::PathNotFound(path.to_string()))
    }
}

/// The `index`-th child of `parent` called `name`, counting from 1.
fn find_child(
    session: &mut Session,
    parent: &NodeId,
    name: &str,
    index: usize,
) -> SessionResult<Option<NodeId>> {
    let children = session.loaded_node(parent)?.child_ids().to_vec();
    let mut seen = 0;
    for child in children {
        session.ensure_loaded(&child)?;
        if session.loaded_node(&child)?.name() == name {
            seen += 1;
            if seen == index {
                return Ok(Some(child));
            }
        }
    }
    Ok(None)
}
