//! Structural reflection over verb nodes.
//!
//! A verb (or any sub-object it embeds) exposes its fields as a closed set of
//! [`Field`] shapes. Path resolution and contract instantiation are written
//! once against this trait instead of per verb kind.

use crate::core::spec::Contract;
use crate::core::state::ResourceKind;

/// Resource-valued leaf reached through a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLeaf<'a> {
    pub kind: ResourceKind,
    pub name: &'a str,
}

/// Shape of one field value.
#[derive(Clone)]
pub enum Field<'a> {
    /// Plain data that paths never descend into.
    Scalar,
    /// An absent optional value or link.
    Null,
    /// A reference to a tracked resource.
    Resource(ResourceLeaf<'a>),
    /// An embedded sub-object, including one link of a chain.
    Node(&'a dyn Node),
    /// A sequence of values, iterated by `[*]`.
    List(Vec<Field<'a>>),
}

impl<'a> Field<'a> {
    pub fn resource(kind: ResourceKind, name: &'a str) -> Self {
        Field::Resource(ResourceLeaf { kind, name })
    }

    pub fn optional_resource(kind: ResourceKind, name: Option<&'a String>) -> Self {
        match name {
            Some(name) => Field::resource(kind, name),
            None => Field::Null,
        }
    }

    pub fn node<N: Node>(node: &'a N) -> Self {
        Field::Node(node)
    }

    pub fn optional_node<N: Node>(node: Option<&'a N>) -> Self {
        match node {
            Some(node) => Field::Node(node),
            None => Field::Null,
        }
    }

    pub fn nodes<N: Node>(nodes: &'a [N]) -> Self {
        Field::List(nodes.iter().map(|node| Field::Node(node as &dyn Node)).collect())
    }
}

/// Verb-node contract consumed by the path resolver and the instantiator.
pub trait Node {
    /// Name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// All fields in declaration order.
    fn fields(&self) -> Vec<(&'static str, Field<'_>)>;

    fn field(&self, name: &str) -> Option<Field<'_>> {
        self.fields()
            .into_iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, value)| value)
    }

    /// Contract computed from the current field values.
    fn contract(&self) -> Contract {
        Contract::default()
    }

    /// Fields holding sub-objects whose own contracts merge into this one.
    fn contract_fields(&self) -> &'static [&'static str] {
        &[]
    }
}
