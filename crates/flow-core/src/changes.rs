//! Change records and the pure reducers that apply them.
//!
//! Controllers never mutate the embedder's arrays; they describe what
//! should happen as `NodeChange`/`EdgeChange` values. The embedder (or
//! the store in uncontrolled mode) folds them in with
//! [`apply_node_changes`] / [`apply_edge_changes`].

use crate::geometry::{Dimensions, Point};
use crate::id::{EdgeId, NodeId};
use crate::model::{Edge, Node};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Which attributes a dimensions change also writes besides `measured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetAttributes {
    All,
    Width,
    Height,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeChange {
    Position {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dragging: Option<bool>,
    },
    Dimensions {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimensions: Option<Dimensions>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resizing: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        set_attributes: Option<SetAttributes>,
    },
    Select {
        id: NodeId,
        selected: bool,
    },
    Add {
        item: Node,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: NodeId,
    },
    Replace {
        id: NodeId,
        item: Node,
    },
}

impl NodeChange {
    pub fn position(id: NodeId, position: Point, dragging: bool) -> Self {
        NodeChange::Position {
            id,
            position: Some(position),
            dragging: Some(dragging),
        }
    }

    pub fn select(id: NodeId, selected: bool) -> Self {
        NodeChange::Select { id, selected }
    }

    pub fn remove(id: NodeId) -> Self {
        NodeChange::Remove { id }
    }

    /// Target id, `None` for adds.
    pub fn id(&self) -> Option<NodeId> {
        match self {
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Remove { id }
            | NodeChange::Replace { id, .. } => Some(*id),
            NodeChange::Add { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EdgeChange {
    Select {
        id: EdgeId,
        selected: bool,
    },
    Add {
        item: Edge,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    Remove {
        id: EdgeId,
    },
    Replace {
        id: EdgeId,
        item: Edge,
    },
}

impl EdgeChange {
    pub fn select(id: EdgeId, selected: bool) -> Self {
        EdgeChange::Select { id, selected }
    }

    pub fn remove(id: EdgeId) -> Self {
        EdgeChange::Remove { id }
    }

    pub fn id(&self) -> Option<EdgeId> {
        match self {
            EdgeChange::Select { id, .. }
            | EdgeChange::Remove { id }
            | EdgeChange::Replace { id, .. } => Some(*id),
            EdgeChange::Add { .. } => None,
        }
    }
}

// ─── Reducers ────────────────────────────────────────────────────────────

enum Kind<'a, T, I> {
    Add { item: &'a T, index: Option<usize> },
    Remove(I),
    Replace(I, &'a T),
    Update(I),
}

trait ElementChange {
    type Item: Clone;
    type Id: Copy + Eq + Hash;

    fn kind(&self) -> Kind<'_, Self::Item, Self::Id>;
    fn item_id(item: &Self::Item) -> Self::Id;
    fn apply(&self, item: &mut Self::Item);
}

impl ElementChange for NodeChange {
    type Item = Node;
    type Id = NodeId;

    fn kind(&self) -> Kind<'_, Node, NodeId> {
        match self {
            NodeChange::Add { item, index } => Kind::Add {
                item,
                index: *index,
            },
            NodeChange::Remove { id } => Kind::Remove(*id),
            NodeChange::Replace { id, item } => Kind::Replace(*id, item),
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. } => Kind::Update(*id),
        }
    }

    fn item_id(item: &Node) -> NodeId {
        item.id
    }

    fn apply(&self, node: &mut Node) {
        match self {
            NodeChange::Select { selected, .. } => node.selected = *selected,
            NodeChange::Position {
                position, dragging, ..
            } => {
                if let Some(p) = position {
                    node.position = *p;
                }
                if let Some(d) = dragging {
                    node.dragging = *d;
                }
            }
            NodeChange::Dimensions {
                dimensions,
                resizing,
                set_attributes,
                ..
            } => {
                if let Some(dims) = dimensions {
                    node.measured = Some(*dims);
                    match set_attributes {
                        Some(SetAttributes::All) => {
                            node.width = Some(dims.width);
                            node.height = Some(dims.height);
                        }
                        Some(SetAttributes::Width) => node.width = Some(dims.width),
                        Some(SetAttributes::Height) => node.height = Some(dims.height),
                        None => {}
                    }
                }
                if let Some(r) = resizing {
                    node.resizing = *r;
                }
            }
            NodeChange::Add { .. } | NodeChange::Remove { .. } | NodeChange::Replace { .. } => {}
        }
    }
}

impl ElementChange for EdgeChange {
    type Item = Edge;
    type Id = EdgeId;

    fn kind(&self) -> Kind<'_, Edge, EdgeId> {
        match self {
            EdgeChange::Add { item, index } => Kind::Add {
                item,
                index: *index,
            },
            EdgeChange::Remove { id } => Kind::Remove(*id),
            EdgeChange::Replace { id, item } => Kind::Replace(*id, item),
            EdgeChange::Select { id, .. } => Kind::Update(*id),
        }
    }

    fn item_id(item: &Edge) -> EdgeId {
        item.id
    }

    fn apply(&self, edge: &mut Edge) {
        if let EdgeChange::Select { selected, .. } = self {
            edge.selected = *selected;
        }
    }
}

fn apply_changes<C: ElementChange>(changes: &[C], elements: &[C::Item]) -> Vec<C::Item> {
    let mut by_id: IndexMap<C::Id, Vec<&C>> = IndexMap::new();
    let mut adds = Vec::new();

    for change in changes {
        match change.kind() {
            Kind::Add { item, index } => adds.push((item, index)),
            // Remove and replace drop everything queued before them.
            Kind::Remove(id) | Kind::Replace(id, _) => {
                by_id.insert(id, vec![change]);
            }
            Kind::Update(id) => by_id.entry(id).or_default().push(change),
        }
    }

    let mut out = Vec::with_capacity(elements.len() + adds.len());
    for element in elements {
        let Some(queued) = by_id.get(&C::item_id(element)) else {
            out.push(element.clone());
            continue;
        };
        match queued.first().map(|c| c.kind()) {
            Some(Kind::Remove(_)) => continue,
            Some(Kind::Replace(_, item)) => {
                out.push(item.clone());
                continue;
            }
            _ => {}
        }
        let mut updated = element.clone();
        for change in queued {
            change.apply(&mut updated);
        }
        out.push(updated);
    }

    for (item, index) in adds {
        match index {
            Some(i) => out.insert(i.min(out.len()), item.clone()),
            None => out.push(item.clone()),
        }
    }

    out
}

/// Fold node changes into a new node array.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &[Node]) -> Vec<Node> {
    apply_changes(changes, nodes)
}

/// Fold edge changes into a new edge array.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &[Edge]) -> Vec<Edge> {
    apply_changes(changes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("a", Point::new(0.0, 0.0)),
            Node::new("b", Point::new(10.0, 0.0)),
            Node::new("c", Point::new(20.0, 0.0)),
        ]
    }

    #[test]
    fn updates_apply_in_order() {
        let a = NodeId::intern("a");
        let out = apply_node_changes(
            &[
                NodeChange::position(a, Point::new(5.0, 5.0), true),
                NodeChange::select(a, true),
                NodeChange::position(a, Point::new(6.0, 6.0), false),
            ],
            &nodes(),
        );
        assert_eq!(out[0].position, Point::new(6.0, 6.0));
        assert!(out[0].selected);
        assert!(!out[0].dragging);
    }

    #[test]
    fn remove_supersedes_earlier_changes() {
        let b = NodeId::intern("b");
        let out = apply_node_changes(
            &[
                NodeChange::select(b, true),
                NodeChange::remove(b),
                NodeChange::select(b, false),
            ],
            &nodes(),
        );
        let ids: Vec<_> = out.iter().map(|n| n.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn replace_swaps_the_record() {
        let c = NodeId::intern("c");
        let replacement = Node::new("c", Point::new(99.0, 99.0)).with_type("group");
        let out = apply_node_changes(
            &[
                NodeChange::select(c, true),
                NodeChange::Replace {
                    id: c,
                    item: replacement.clone(),
                },
            ],
            &nodes(),
        );
        assert_eq!(out[2], replacement);
    }

    #[test]
    fn adds_land_last_at_index() {
        let out = apply_node_changes(
            &[
                NodeChange::Add {
                    item: Node::new("z", Point::ZERO),
                    index: None,
                },
                NodeChange::remove(NodeId::intern("a")),
                NodeChange::Add {
                    item: Node::new("first", Point::ZERO),
                    index: Some(0),
                },
                NodeChange::Add {
                    item: Node::new("far", Point::ZERO),
                    index: Some(100),
                },
            ],
            &nodes(),
        );
        let ids: Vec<_> = out.iter().map(|n| n.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["first", "b", "c", "z", "far"]);
    }

    #[test]
    fn dimensions_honour_set_attributes() {
        let a = NodeId::intern("a");
        let out = apply_node_changes(
            &[NodeChange::Dimensions {
                id: a,
                dimensions: Some(Dimensions::new(40.0, 30.0)),
                resizing: Some(true),
                set_attributes: Some(SetAttributes::Width),
            }],
            &nodes(),
        );
        assert_eq!(out[0].measured, Some(Dimensions::new(40.0, 30.0)));
        assert_eq!(out[0].width, Some(40.0));
        assert_eq!(out[0].height, None);
        assert!(out[0].resizing);
    }

    #[test]
    fn edge_changes() {
        let edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "c")];
        let out = apply_edge_changes(
            &[
                EdgeChange::select(EdgeId::intern("e2"), true),
                EdgeChange::remove(EdgeId::intern("e1")),
            ],
            &edges,
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].selected);
    }

    #[test]
    fn wire_shape_is_tagged_camel_case() {
        let change = NodeChange::Dimensions {
            id: NodeId::intern("n1"),
            dimensions: Some(Dimensions::new(1.0, 2.0)),
            resizing: None,
            set_attributes: Some(SetAttributes::All),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "dimensions",
                "id": "n1",
                "dimensions": { "width": 1.0, "height": 2.0 },
                "setAttributes": "all"
            })
        );

        let back: EdgeChange =
            serde_json::from_str(r#"{"type":"select","id":"e9","selected":true}"#).unwrap();
        assert_eq!(back, EdgeChange::select(EdgeId::intern("e9"), true));
    }
}
