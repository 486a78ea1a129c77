//! Tree builder: recursive decomposition of a value into labeled nodes.
//!
//! Shared objects and shared sequences are tracked by identity along the
//! current path; re-entering an ancestor produces a truncated node instead
//! of recursing, so every traversal terminates.

use tracing::debug;

use crate::classify::EnumTypeClass;
use crate::guard::SpecCycleGuard;
use crate::schema::{ReflectCache, SpecMember};
use crate::spec::{EnumMemberRole, EnumTypeDesc, ExportError, Result, SpecTreeOptions};
use crate::util::validate_datetime_format;
use crate::value::{
    EnumLeafValue, EnumValue, Fingerprint, SpecObjectRef, SpecSequenceValue, ToExportValue,
};

////////////////////////////////////////////////////////////////////////////////
// #region OutputModel

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumNodeKind {
    /// Outermost node.
    Root,
    /// Member of a composite.
    Member,
    /// Scalar sequence element.
    Leaf,
    /// Sequence.
    Container,
    /// Composite object.
    Composite,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumNodeContent {
    /// Unset value.
    Empty,
    /// Rendered scalar. `if_verbatim` marks string values that renderers
    /// should keep byte-exact (e.g. CDATA).
    Scalar { text: String, if_verbatim: bool },
    /// Cycle-truncated: the identity is already on the path.
    Recursive { fingerprint: Fingerprint },
    Children(Vec<SpecOutputNode>),
}

/// One node of the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutputNode {
    /// Logical name (member name, type name or root label).
    pub name: String,
    /// Type label; empty when the node has none.
    pub type_label: String,
    /// `Property`/`Field` tag of member nodes.
    pub role: Option<EnumMemberRole>,
    pub kind: EnumNodeKind,
    pub content: EnumNodeContent,
}

impl SpecOutputNode {
    pub fn children(&self) -> &[SpecOutputNode] {
        match &self.content {
            EnumNodeContent::Children(l_children) => l_children,
            _ => &[],
        }
    }

    /// First child named `name`.
    pub fn child(&self, name: &str) -> Option<&SpecOutputNode> {
        self.children().iter().find(|node| node.name == name)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            EnumNodeContent::Scalar { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self.content, EnumNodeContent::Recursive { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, EnumNodeContent::Empty)
    }

    /// Height of the subtree; a single node has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(SpecOutputNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the subtree, this one included.
    pub fn n_nodes(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(SpecOutputNode::n_nodes)
            .sum::<usize>()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Builder

/// Build the tree of `value` with a fresh per-run cache.
pub fn build_tree<V: ToExportValue + ?Sized>(
    value: &V,
    options: &SpecTreeOptions,
) -> Result<SpecOutputNode> {
    let mut cache = ReflectCache::new();
    build_tree_from_value(&value.to_export_value(), options, &mut cache)
}

/// Build the tree of an already lowered value, reusing `cache`.
pub fn build_tree_from_value(
    value: &EnumValue,
    options: &SpecTreeOptions,
    cache: &mut ReflectCache,
) -> Result<SpecOutputNode> {
    if options.root_label.trim().is_empty() {
        return Err(ExportError::invalid("Root label must not be empty."));
    }
    validate_datetime_format(&options.datetime_format)?;

    let mut builder = TreeBuilder {
        datetime_format: &options.datetime_format,
        cache,
        n_truncated: 0,
    };
    let guard = SpecCycleGuard::root();

    let root = match value {
        EnumValue::Null => {
            return Err(ExportError::invalid(
                "Cannot build a tree from an unset root value.",
            ));
        }
        EnumValue::Leaf(leaf) => SpecOutputNode {
            name: options.root_label.clone(),
            type_label: leaf.type_name().to_string(),
            role: None,
            kind: EnumNodeKind::Root,
            content: builder.render_scalar(leaf),
        },
        EnumValue::Object(obj) => SpecOutputNode {
            name: options.root_label.clone(),
            type_label: String::new(),
            role: None,
            kind: EnumNodeKind::Root,
            content: EnumNodeContent::Children(vec![builder.build_object(obj, &guard)]),
        },
        EnumValue::Sequence(seq) => SpecOutputNode {
            name: options.root_label.clone(),
            type_label: String::new(),
            role: None,
            kind: EnumNodeKind::Root,
            content: EnumNodeContent::Children(vec![builder.build_sequence(seq, &guard)]),
        },
    };

    debug!(
        n_nodes = root.n_nodes(),
        n_truncated = builder.n_truncated,
        n_types = builder.cache.n_described(),
        "built export tree"
    );
    Ok(root)
}

struct TreeBuilder<'r> {
    datetime_format: &'r str,
    cache: &'r mut ReflectCache,
    n_truncated: usize,
}

impl TreeBuilder<'_> {
    fn render_scalar(&self, leaf: &EnumLeafValue) -> EnumNodeContent {
        EnumNodeContent::Scalar {
            text: leaf.render(self.datetime_format),
            if_verbatim: matches!(leaf, EnumLeafValue::String(_)),
        }
    }

    fn truncated(&mut self, fingerprint: Fingerprint) -> EnumNodeContent {
        self.n_truncated += 1;
        EnumNodeContent::Recursive { fingerprint }
    }

    /// Element of a sequence, or the single child of a member node.
    fn build_value(
        &mut self,
        value: &EnumValue,
        declared: &EnumTypeDesc,
        guard: &SpecCycleGuard<'_>,
    ) -> SpecOutputNode {
        match value {
            EnumValue::Object(obj) => self.build_object(obj, guard),
            EnumValue::Sequence(seq) => self.build_sequence(seq, guard),
            EnumValue::Leaf(leaf) => SpecOutputNode {
                name: declared.name(),
                type_label: declared.full_name(),
                role: None,
                kind: EnumNodeKind::Leaf,
                content: self.render_scalar(leaf),
            },
            EnumValue::Null => {
                let kind = match self.cache.classify(declared) {
                    EnumTypeClass::Leaf { .. } => EnumNodeKind::Leaf,
                    EnumTypeClass::Composite(_) => EnumNodeKind::Composite,
                    EnumTypeClass::Sequence => EnumNodeKind::Container,
                };
                SpecOutputNode {
                    name: declared.name(),
                    type_label: declared.full_name(),
                    role: None,
                    kind,
                    content: EnumNodeContent::Empty,
                }
            }
        }
    }

    fn build_sequence(
        &mut self,
        seq: &SpecSequenceValue,
        guard: &SpecCycleGuard<'_>,
    ) -> SpecOutputNode {
        let desc = EnumTypeDesc::Sequence(Box::new(seq.element.clone()));
        let frame = guard.child(seq.fingerprint);

        let content = match seq.fingerprint {
            Some(fp) if frame.contains(fp) => self.truncated(fp),
            _ => EnumNodeContent::Children(
                seq.items
                    .iter()
                    .map(|item| self.build_value(item, &seq.element, &frame))
                    .collect(),
            ),
        };

        SpecOutputNode {
            name: desc.name(),
            type_label: desc.full_name(),
            role: None,
            kind: EnumNodeKind::Container,
            content,
        }
    }

    fn build_object(&mut self, obj: &SpecObjectRef, guard: &SpecCycleGuard<'_>) -> SpecOutputNode {
        let composite = *obj.composite();
        let fp = obj.fingerprint();
        let frame = guard.child(Some(fp));

        let content = if frame.contains(fp) {
            self.truncated(fp)
        } else {
            let schema = self.cache.members_of(&composite);
            EnumNodeContent::Children(
                schema
                    .members
                    .iter()
                    .map(|member| self.build_member(member, obj, &frame))
                    .collect(),
            )
        };

        SpecOutputNode {
            name: composite.name.to_string(),
            type_label: composite.full_name.to_string(),
            role: None,
            kind: EnumNodeKind::Composite,
            content,
        }
    }

    fn build_member(
        &mut self,
        member: &SpecMember,
        owner: &SpecObjectRef,
        guard: &SpecCycleGuard<'_>,
    ) -> SpecOutputNode {
        let class = self.cache.classify(&member.declared);
        let type_label = match class {
            EnumTypeClass::Leaf {
                if_optional: true, ..
            } => format!("{}?", member.declared.full_name()),
            _ => member.declared.full_name(),
        };

        let value = member.get(owner.instance());
        let content = match &value {
            EnumValue::Null => EnumNodeContent::Empty,
            EnumValue::Leaf(leaf) => self.render_scalar(leaf),
            EnumValue::Object(_) | EnumValue::Sequence(_) => EnumNodeContent::Children(vec![
                self.build_value(&value, member.declared.unwrap_optional(), guard),
            ]),
        };

        SpecOutputNode {
            name: member.name.clone(),
            type_label,
            role: Some(member.role),
            kind: EnumNodeKind::Member,
            content,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
