//! Type-tag → handler registry with an explicit fallback.
//!
//! Nodes and edges carry an optional `type` tag. The renderer for a tag is
//! looked up here; unknown tags fall back to the default handler and are
//! reported once per tag.

use crate::error::FlowError;
use crate::paths::{DEFAULT_CURVATURE, EdgePath, Endpoints, SmoothStepOptions};
use indexmap::{IndexMap, IndexSet};

/// What the registry resolves, which selects the error code for unknown tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

pub const DEFAULT_TYPE: &str = "default";

pub struct TypeRegistry<H> {
    kind: ElementKind,
    default: H,
    handlers: IndexMap<String, H>,
    reported: IndexSet<String>,
}

impl<H> TypeRegistry<H> {
    pub fn new(kind: ElementKind, default: H) -> Self {
        Self {
            kind,
            default,
            handlers: IndexMap::new(),
            reported: IndexSet::new(),
        }
    }

    /// Register `handler` for `tag`, returning the one it replaces.
    pub fn register(&mut self, tag: &str, handler: H) -> Option<H> {
        self.handlers.insert(tag.to_string(), handler)
    }

    pub fn contains(&self, tag: &str) -> bool {
        tag == DEFAULT_TYPE || self.handlers.contains_key(tag)
    }

    /// Handler for `tag`. Missing tags and `"default"` give the default
    /// handler; unknown tags do too, after reporting through `on_error`
    /// the first time they are seen.
    pub fn resolve(&mut self, tag: Option<&str>, on_error: &mut dyn FnMut(&FlowError)) -> &H {
        let Some(tag) = tag.filter(|t| *t != DEFAULT_TYPE) else {
            return &self.default;
        };
        if let Some(h) = self.handlers.get(tag) {
            return h;
        }
        if self.reported.insert(tag.to_string()) {
            let err = match self.kind {
                ElementKind::Node => FlowError::UnknownNodeType {
                    node_type: tag.to_string(),
                },
                ElementKind::Edge => FlowError::UnknownEdgeType {
                    edge_type: tag.to_string(),
                },
            };
            on_error(&err);
        }
        &self.default
    }
}

// ─── Built-in edge shapes ────────────────────────────────────────────────

/// The path generators available as edge types out of the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeShape {
    Bezier { curvature: f64 },
    SimpleBezier,
    Straight,
    Step(SmoothStepOptions),
    SmoothStep(SmoothStepOptions),
}

impl EdgeShape {
    pub fn path(&self, e: &Endpoints) -> EdgePath {
        match self {
            EdgeShape::Bezier { curvature } => crate::paths::bezier_path(e, *curvature),
            EdgeShape::SimpleBezier => crate::paths::simple_bezier_path(e),
            EdgeShape::Straight => crate::paths::straight_path(e),
            EdgeShape::Step(opts) => crate::paths::step_path(e, opts),
            EdgeShape::SmoothStep(opts) => crate::paths::smooth_step_path(e, opts),
        }
    }
}

impl TypeRegistry<EdgeShape> {
    /// Registry with `default` (bezier), `simplebezier`, `straight`,
    /// `step` and `smoothstep`.
    pub fn builtin_edges() -> Self {
        let mut r = TypeRegistry::new(
            ElementKind::Edge,
            EdgeShape::Bezier {
                curvature: DEFAULT_CURVATURE,
            },
        );
        r.register("simplebezier", EdgeShape::SimpleBezier);
        r.register("straight", EdgeShape::Straight);
        r.register("step", EdgeShape::Step(SmoothStepOptions::default()));
        r.register("smoothstep", EdgeShape::SmoothStep(SmoothStepOptions::default()));
        r
    }
}
