//! # Query Translator
//!
//! Compiles declarative query descriptions (category filters, attribute
//! filters, nested relation traversal) into the element index's native query
//! representation, and maintains the named-query registry for one session.
//!
//! A relation's `query` field is itself a full `QueryNode`, which is what
//! allows querying "elements whose defining property set has a property
//! named X with value Y" an arbitrary number of hops deep
//! (element → IsDefinedBy → property set → HasProperties → property).

use crate::error::FraglinkError;
use crate::index::ElementIndex;
use crate::pattern::{self, Matcher, Pattern};
use crate::types::ModelIdMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// WIRE QUERY NODES
// =============================================================================

/// One node of a query tree, in wire form (patterns as encoded strings).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryNode {
    /// Category patterns; an element matches when ANY pattern matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    /// Attribute criteria; an element matches when ALL queries are satisfied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AttributeBlock>,
    /// Relation hop carrying a full nested query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationQuery>,
}

/// The attribute criteria block, shaped as the index expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeBlock {
    pub queries: Vec<AttributeQuery>,
}

/// One attribute criterion: a name pattern and an optional value.
///
/// The value is a pattern string when textual, or a raw scalar otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeQuery {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// A named relation hop with its nested query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationQuery {
    pub name: String,
    pub query: Box<QueryNode>,
}

// =============================================================================
// QUERY BUILDING (caller spec -> wire form)
// =============================================================================

/// Caller-facing query description, before pattern encoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySpec {
    pub categories: Option<Vec<String>>,
    pub attributes: Option<Vec<AttributeSpec>>,
    pub relation: Option<RelationSpec>,
}

/// One attribute criterion as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// One relation hop as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationSpec {
    pub name: String,
    pub query: Box<QuerySpec>,
}

/// Build the index's query representation from a caller spec.
///
/// Returns a single-element array containing one root node. Categories and
/// attribute names are pattern-encoded case-insensitively; textual attribute
/// values are pattern-encoded, other scalars are carried raw; relations are
/// built recursively by the same rule.
#[must_use]
pub fn build_query(spec: &QuerySpec) -> Vec<QueryNode> {
    vec![build_node(spec)]
}

fn build_node(spec: &QuerySpec) -> QueryNode {
    let categories = spec.categories.as_ref().filter(|c| !c.is_empty()).map(|cats| {
        cats.iter().map(|c| pattern::encode_ci(c)).collect()
    });

    let attributes = spec.attributes.as_ref().filter(|a| !a.is_empty()).map(|attrs| {
        AttributeBlock {
            queries: attrs
                .iter()
                .map(|attr| AttributeQuery {
                    name: pattern::encode_ci(&attr.name),
                    value: attr.value.as_ref().map(|v| match v {
                        serde_json::Value::String(s) => {
                            serde_json::Value::String(pattern::encode_ci(s))
                        }
                        other => other.clone(),
                    }),
                })
                .collect(),
        }
    });

    let relation = spec.relation.as_ref().map(|rel| RelationQuery {
        name: rel.name.clone(),
        query: Box::new(build_node(&rel.query)),
    });

    QueryNode {
        categories,
        attributes,
        relation,
    }
}

// =============================================================================
// PATTERN DECODING (wire form -> live matchers)
// =============================================================================

/// A query node with every textual pattern compiled to a live matcher.
#[derive(Debug, Clone)]
pub struct DecodedQuery {
    pub categories: Vec<Matcher>,
    pub attributes: Vec<DecodedAttribute>,
    pub relation: Option<DecodedRelation>,
}

/// A decoded attribute criterion.
#[derive(Debug, Clone)]
pub struct DecodedAttribute {
    pub name: Matcher,
    pub value: Option<ValueMatcher>,
}

/// A decoded relation hop.
#[derive(Debug, Clone)]
pub struct DecodedRelation {
    pub name: String,
    pub query: Box<DecodedQuery>,
}

/// Value comparison: pattern match for textual values, scalar equality otherwise.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Pattern(Matcher),
    Scalar(serde_json::Value),
}

impl ValueMatcher {
    /// Test against a candidate value rendered from the index.
    #[must_use]
    pub fn matches(&self, candidate: &serde_json::Value) -> bool {
        match self {
            Self::Pattern(m) => match candidate {
                serde_json::Value::String(s) => m.is_match(s),
                serde_json::Value::Number(n) => m.is_match(&n.to_string()),
                serde_json::Value::Bool(b) => m.is_match(&b.to_string()),
                _ => false,
            },
            Self::Scalar(expected) => expected == candidate,
        }
    }
}

/// Decode every pattern in a query node, recursing through all nesting levels.
///
/// Applied to query nodes received as input (e.g. from import) to turn
/// textual pattern forms back into live matchers before evaluation. A tree
/// of depth N gets decoded at all N levels.
pub fn decode_patterns(node: &QueryNode) -> Result<DecodedQuery, FraglinkError> {
    let categories = node
        .categories
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|raw| pattern::compile(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let attributes = node
        .attributes
        .as_ref()
        .map(|block| {
            block
                .queries
                .iter()
                .map(|query| {
                    let name = pattern::compile(&query.name)?;
                    let value = query
                        .value
                        .as_ref()
                        .map(|v| decode_value(v))
                        .transpose()?;
                    Ok(DecodedAttribute { name, value })
                })
                .collect::<Result<Vec<_>, FraglinkError>>()
        })
        .transpose()?
        .unwrap_or_default();

    let relation = node
        .relation
        .as_ref()
        .map(|rel| {
            Ok::<_, FraglinkError>(DecodedRelation {
                name: rel.name.clone(),
                query: Box::new(decode_patterns(&rel.query)?),
            })
        })
        .transpose()?;

    Ok(DecodedQuery {
        categories,
        attributes,
        relation,
    })
}

/// Decode an attribute value: textual values go through the pattern codec,
/// non-textual scalars compare by equality.
fn decode_value(value: &serde_json::Value) -> Result<ValueMatcher, FraglinkError> {
    match value {
        serde_json::Value::String(s) => match Pattern::parse(s) {
            p @ Pattern::Encoded { .. } => Ok(ValueMatcher::Pattern(p.compile()?)),
            Pattern::Literal(lit) => Ok(ValueMatcher::Pattern(Matcher::Literal(lit))),
        },
        other => Ok(ValueMatcher::Scalar(other.clone())),
    }
}

// =============================================================================
// NAMED-QUERY REGISTRY
// =============================================================================

/// Outcome of executing a named query against the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub query_name: String,
    /// Total matched elements, summed across all models.
    pub total_elements: usize,
    pub results: ModelIdMap,
}

/// Registry of named queries for one controller/viewer session.
///
/// Names are unique; creating an existing name overwrites it in place
/// (the entry keeps its original position in the listing order).
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    entries: Vec<(String, Vec<QueryNode>)>,
}

impl QueryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store nodes under a name, silently overwriting an existing entry.
    pub fn create(&mut self, name: impl Into<String>, nodes: Vec<QueryNode>) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = nodes;
        } else {
            self.entries.push((name, nodes));
        }
    }

    /// Look up a named query.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[QueryNode]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, nodes)| nodes.as_slice())
    }

    /// Names currently registered, in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Number of registered queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove a named query. Returns false (never fails) when absent.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() < before
    }

    /// Execute a named query against the live index.
    ///
    /// Fails with `NotFound` when the name is absent. Multiple root nodes
    /// union their matches; ids are deduplicated per model.
    pub fn execute(
        &self,
        name: &str,
        index: &dyn ElementIndex,
    ) -> Result<ExecutionOutcome, FraglinkError> {
        let nodes = self
            .get(name)
            .ok_or_else(|| FraglinkError::NotFound(format!("query '{name}'")))?;

        let mut results = ModelIdMap::new();
        for node in nodes {
            let decoded = decode_patterns(node)?;
            for (model, ids) in index.find(&decoded) {
                let entry = results.entry(model).or_default();
                entry.extend(ids);
            }
        }
        for ids in results.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        results.retain(|_, ids| !ids.is_empty());

        let total_elements = crate::types::total_ids(&results);
        Ok(ExecutionOutcome {
            query_name: name.to_string(),
            total_elements,
            results,
        })
    }

    /// Bulk dump of the registry, preserving insertion order.
    #[must_use]
    pub fn export(&self) -> serde_json::Value {
        let items: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|(name, nodes)| {
                serde_json::json!({
                    "name": name,
                    "queries": nodes,
                })
            })
            .collect();
        serde_json::Value::Array(items)
    }

    /// Bulk restore. Colliding names are overwritten; returns the number of
    /// queries imported. Fails with `Malformed` when the shape is wrong.
    pub fn import(&mut self, data: &serde_json::Value) -> Result<usize, FraglinkError> {
        let items = data
            .as_array()
            .ok_or_else(|| FraglinkError::Malformed("query export must be an array".into()))?;

        let mut imported = 0;
        for item in items {
            let name = item
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FraglinkError::Malformed("query entry missing 'name'".into()))?;
            let nodes: Vec<QueryNode> = item
                .get("queries")
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?
                .ok_or_else(|| FraglinkError::Malformed("query entry missing 'queries'".into()))?;
            self.create(name, nodes);
            imported += 1;
        }
        Ok(imported)
    }
}

// =============================================================================
// TESTS
// =============================================================================
