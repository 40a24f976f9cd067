//! Node type catalog
//!
//! The catalog maps subtypes to their [`NodeTypeDescriptor`] and fixes the
//! palette grouping once, at construction. It is read-only afterwards; the
//! editor only lists, looks up and instantiates from it.
//!
//! # Usage
//!
//! ```ignore
//! use flow_graph::NodeTypeCatalog;
//!
//! let catalog = NodeTypeCatalog::builtin();
//! for group in catalog.list_categories() {
//!     println!("{}: {} items", group.name, group.items.len());
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node_config::{subtypes, NodeConfig};
use crate::types::NodeCategory;

/// Palette color tag of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Orange,
    Green,
    Purple,
    Gray,
    Yellow,
}

impl ColorTag {
    /// Default color of a category
    pub fn for_category(category: NodeCategory) -> Self {
        match category {
            NodeCategory::Trigger => ColorTag::Blue,
            NodeCategory::Logic => ColorTag::Orange,
            NodeCategory::Data => ColorTag::Green,
            NodeCategory::Communication => ColorTag::Purple,
            NodeCategory::Tooling => ColorTag::Gray,
            NodeCategory::Cloud | NodeCategory::Unknown => ColorTag::Yellow,
        }
    }
}

/// Catalog entry describing one placeable node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDescriptor {
    pub category: NodeCategory,
    pub subtype: String,
    /// Display name
    pub label: String,
    /// Icon reference, resolved by the presentation layer
    pub icon: String,
    pub color: ColorTag,
    #[serde(default)]
    pub description: String,
    /// Configuration template for new instances
    #[serde(default)]
    pub default_config: serde_json::Value,
}

impl NodeTypeDescriptor {
    pub fn new(
        category: NodeCategory,
        subtype: impl Into<String>,
        label: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            category,
            subtype: subtype.into(),
            label: label.into(),
            icon: icon.into(),
            color: ColorTag::for_category(category),
            description: String::new(),
            default_config: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Fresh configuration for a new node of this type
    pub fn instantiate_config(&self) -> NodeConfig {
        NodeConfig::from_value(&self.subtype, self.default_config.clone())
    }

    /// Payload carried by a palette drag
    pub fn drag_payload(&self) -> DragPayload {
        DragPayload {
            name: self.label.clone(),
            category: self.category,
            subtype: self.subtype.clone(),
            icon: self.icon.clone(),
            color: self.color,
        }
    }
}

/// Serialized form of a dragged catalog item: `{name, type, subtype, icon, color}`
///
/// Carries no id or position; the drop handler assigns both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub category: NodeCategory,
    pub subtype: String,
    pub icon: String,
    pub color: ColorTag,
}

impl DragPayload {
    /// Parse the data transfer string of a drop event
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A palette group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCategory {
    pub category: NodeCategory,
    /// Heading shown for the group
    pub name: String,
    pub items: Vec<NodeTypeDescriptor>,
}

/// Registry of placeable node types, grouped by category
#[derive(Debug, Clone, Default)]
pub struct NodeTypeCatalog {
    categories: Vec<CatalogCategory>,
    index: HashMap<String, (usize, usize)>,
}

impl NodeTypeCatalog {
    /// A catalog with nothing to place
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from descriptors
    ///
    /// Groups follow [`NodeCategory::ALL`] order with unknown categories last.
    /// A repeated subtype replaces the earlier descriptor.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = NodeTypeDescriptor>) -> Self {
        let mut unique: Vec<NodeTypeDescriptor> = Vec::new();
        for descriptor in descriptors {
            match unique.iter_mut().find(|d| d.subtype == descriptor.subtype) {
                Some(existing) => {
                    log::warn!("Duplicate catalog subtype '{}', keeping the last one", descriptor.subtype);
                    *existing = descriptor;
                }
                None => unique.push(descriptor),
            }
        }

        let order = NodeCategory::ALL.iter().copied().chain([NodeCategory::Unknown]);
        let categories: Vec<CatalogCategory> = order
            .map(|category| CatalogCategory {
                category,
                name: category.display_name().to_string(),
                items: unique
                    .iter()
                    .filter(|d| d.category == category)
                    .cloned()
                    .collect(),
            })
            .filter(|group| !group.items.is_empty())
            .collect();

        let mut index = HashMap::new();
        for (ci, group) in categories.iter().enumerate() {
            for (ii, item) in group.items.iter().enumerate() {
                index.insert(item.subtype.clone(), (ci, ii));
            }
        }

        Self { categories, index }
    }

    /// Load descriptors from a JSON array
    pub fn from_json(raw: &str) -> Result<Self> {
        let descriptors: Vec<NodeTypeDescriptor> = serde_json::from_str(raw)?;
        log::info!("Loaded {} node types from catalog document", descriptors.len());
        Ok(Self::from_descriptors(descriptors))
    }

    /// The node types shipped with the editor
    pub fn builtin() -> Self {
        use NodeCategory::*;
        Self::from_descriptors([
            NodeTypeDescriptor::new(Trigger, subtypes::WEBHOOK, "Webhook", "webhook")
                .with_description("Start the workflow when an HTTP request arrives"),
            NodeTypeDescriptor::new(Trigger, subtypes::SCHEDULE, "Schedule", "clock")
                .with_description("Start the workflow on a cron schedule"),
            NodeTypeDescriptor::new(Trigger, subtypes::MANUAL, "Manual Trigger", "play")
                .with_description("Start the workflow by hand"),
            NodeTypeDescriptor::new(Logic, subtypes::CONDITION, "Condition", "git-branch")
                .with_description("Continue only when an expression holds"),
            NodeTypeDescriptor::new(Logic, subtypes::DELAY, "Delay", "timer")
                .with_description("Wait before continuing"),
            NodeTypeDescriptor::new(Data, subtypes::HTTP_REQUEST, "HTTP Request", "globe")
                .with_description("Call an external API"),
            NodeTypeDescriptor::new(Data, subtypes::DATABASE_QUERY, "Database Query", "database")
                .with_description("Run a query against a database"),
            NodeTypeDescriptor::new(Data, subtypes::TRANSFORM, "Transform", "shuffle")
                .with_description("Reshape the payload"),
            NodeTypeDescriptor::new(Communication, subtypes::EMAIL, "Send Email", "mail"),
            NodeTypeDescriptor::new(Communication, subtypes::SLACK, "Slack Message", "message-square"),
            NodeTypeDescriptor::new(Tooling, subtypes::GITHUB_ISSUE, "GitHub Issue", "github"),
            NodeTypeDescriptor::new(Cloud, subtypes::STORAGE_UPLOAD, "Storage Upload", "cloud-upload"),
        ])
    }

    /// Palette groups in display order
    pub fn list_categories(&self) -> &[CatalogCategory] {
        &self.categories
    }

    /// Resolve a subtype to its descriptor
    pub fn find(&self, subtype: &str) -> Option<&NodeTypeDescriptor> {
        self.index
            .get(subtype)
            .map(|&(ci, ii)| &self.categories[ci].items[ii])
    }

    pub fn contains(&self, subtype: &str) -> bool {
        self.index.contains_key(subtype)
    }

    /// Descriptors offered when inserting a node on an edge
    ///
    /// Triggers are excluded since they cannot receive an incoming edge.
    pub fn insertion_candidates(&self) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.categories
            .iter()
            .filter(|group| group.category.accepts_incoming())
            .flat_map(|group| group.items.iter())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
