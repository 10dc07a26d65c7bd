//! Sort keys for providers

use crate::snapshot::{EdgeRef, NodeRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const PROTO_EDGE_NAME: &str = "__proto__";

/// A field to sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "distance")]
    Distance,
    #[serde(rename = "selfSize")]
    SelfSize,
    #[serde(rename = "retainedSize")]
    RetainedSize,
    #[serde(rename = "type")]
    Type,
    /// Edge name, with `__proto__` always last
    #[serde(rename = "!edgeName")]
    EdgeName,
}

/// Primary and secondary sort key, each with its own direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparatorConfig {
    pub field_name1: SortField,
    pub ascending1: bool,
    pub field_name2: SortField,
    pub ascending2: bool,
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

impl ComparatorConfig {
    pub fn new(field_name1: SortField, ascending1: bool, field_name2: SortField, ascending2: bool) -> Self {
        Self {
            field_name1,
            ascending1,
            field_name2,
            ascending2,
        }
    }

    /// Compare two nodes by both keys. An edge-name key compares equal.
    pub fn compare_nodes(&self, a: &NodeRef<'_>, b: &NodeRef<'_>) -> Ordering {
        compare_node_field(self.field_name1, self.ascending1, a, b)
            .then_with(|| compare_node_field(self.field_name2, self.ascending2, a, b))
    }

    /// Compare two edges; node keys apply to the nodes at their far ends.
    pub fn compare_edges(
        &self,
        edge_a: &EdgeRef<'_>,
        edge_b: &EdgeRef<'_>,
        node_a: &NodeRef<'_>,
        node_b: &NodeRef<'_>,
    ) -> Ordering {
        let key = |field: SortField, ascending: bool| match field {
            SortField::EdgeName => compare_edge_names(edge_a, edge_b, ascending),
            _ => compare_node_field(field, ascending, node_a, node_b),
        };
        key(self.field_name1, self.ascending1).then_with(|| key(self.field_name2, self.ascending2))
    }
}

fn compare_node_field(field: SortField, ascending: bool, a: &NodeRef<'_>, b: &NodeRef<'_>) -> Ordering {
    let ordering = match field {
        SortField::Id => a.id().cmp(&b.id()),
        SortField::Name => a.name().cmp(&b.name()),
        SortField::Distance => a.distance().cmp(&b.distance()),
        SortField::SelfSize => a.self_size().cmp(&b.self_size()),
        SortField::RetainedSize => a.retained_size().cmp(&b.retained_size()),
        SortField::Type => a.node_type().cmp(b.node_type()),
        SortField::EdgeName => Ordering::Equal,
    };
    directed(ordering, ascending)
}

/// `__proto__` sorts last in either direction. String names sort before
/// numeric ones; numeric names compare by value.
fn compare_edge_names(a: &EdgeRef<'_>, b: &EdgeRef<'_>, ascending: bool) -> Ordering {
    let (name_a, name_b) = (a.name(), b.name());
    match (name_a == PROTO_EDGE_NAME, name_b == PROTO_EDGE_NAME) {
        (true, true) => return Ordering::Equal,
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (false, false) => {}
    }

    let ordering = match (a.has_string_name(), b.has_string_name()) {
        (true, true) => name_a.cmp(&name_b),
        (false, false) => match (name_a.parse::<i64>(), name_b.parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => name_a.cmp(&name_b),
        },
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    };
    directed(ordering, ascending)
}
