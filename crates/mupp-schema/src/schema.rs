use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::AttributeKind;
use crate::entity::{AttributeContext, EntityKind};
use crate::error::StructuralError;

/// One placed field inside a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityInstance {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl EntityInstance {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            parent_id: None,
        }
    }

    pub fn with_attributes(kind: EntityKind, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            kind,
            attributes,
            parent_id: None,
        }
    }

    pub fn context(&self) -> AttributeContext<'_> {
        AttributeContext::new(&self.attributes)
    }

    pub fn attribute(&self, attribute: AttributeKind) -> Option<&Value> {
        self.context().get(attribute)
    }

    /// The instance's label attribute, when set to a string.
    pub fn label(&self) -> Option<&str> {
        self.attribute(AttributeKind::Label).and_then(Value::as_str)
    }
}

/// An ordered tree of entity instances.
///
/// `entities` is keyed by instance id (insertion order is irrelevant);
/// `root` is the canonical display order of the top-level instances. The
/// parent relation must stay a forest: every `parentId` resolves inside the
/// same schema and no chain loops back on itself.
///
/// The serde shape of this type is the wire contract with the backend:
/// `{"entities": {"<id>": {"type", "attributes", "parentId"?}}, "root": [..]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityInstance>,
    #[serde(default)]
    pub root: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&EntityInstance> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks the reference and forest invariants plus attribute-name
    /// hygiene. Schemas arriving from the wire go through this before any
    /// store will accept them.
    pub fn ensure_well_formed(&self) -> Result<(), StructuralError> {
        let mut seen_roots = BTreeSet::new();
        for id in &self.root {
            if !self.contains(id) {
                return Err(StructuralError::DanglingRoot(id.clone()));
            }
            if !seen_roots.insert(id.as_str()) {
                return Err(StructuralError::DuplicateRoot(id.clone()));
            }
        }

        for (id, instance) in &self.entities {
            if let Some(parent) = &instance.parent_id
                && !self.contains(parent)
            {
                return Err(StructuralError::DanglingParent {
                    entity: id.clone(),
                    parent: parent.clone(),
                });
            }

            for name in instance.attributes.keys() {
                let known = AttributeKind::from_name(name)
                    .is_some_and(|attribute| instance.kind.accepts(attribute));
                if !known {
                    return Err(StructuralError::UnknownAttribute {
                        kind: instance.kind.tag().to_string(),
                        attribute: name.clone(),
                    });
                }
            }

            self.ensure_acyclic_from(id)?;
        }

        Ok(())
    }

    fn ensure_acyclic_from(&self, start: &str) -> Result<(), StructuralError> {
        let mut visited = BTreeSet::new();
        let mut current = start;
        while let Some(instance) = self.get(current) {
            if !visited.insert(current.to_string()) {
                return Err(StructuralError::ParentCycle(start.to_string()));
            }
            match &instance.parent_id {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(())
    }

    /// All ids whose parent chain reaches `id`, in display order.
    pub fn descendants_of(&self, id: &str) -> Vec<String> {
        let index = self.children_index();
        let mut out = Vec::new();
        collect_subtree(&index, id, &mut out);
        out
    }

    /// Ids in presentation order: `root` order, each top-level instance
    /// immediately followed by its subtree.
    pub fn display_order(&self) -> Vec<String> {
        let index = self.children_index();
        let mut out = Vec::new();
        for id in &self.root {
            if self.contains(id) {
                out.push(id.clone());
                collect_subtree(&index, id, &mut out);
            }
        }
        out
    }

    fn children_index(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut index: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, instance) in &self.entities {
            if let Some(parent) = &instance.parent_id {
                index.entry(parent.as_str()).or_default().push(id.as_str());
            }
        }
        index
    }
}

fn collect_subtree(index: &BTreeMap<&str, Vec<&str>>, id: &str, out: &mut Vec<String>) {
    if let Some(children) = index.get(id) {
        for child in children {
            out.push((*child).to_string());
            collect_subtree(index, child, out);
        }
    }
}
