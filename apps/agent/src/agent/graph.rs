//! Interest graph shown by `show_user_graph`: the user at the centre, one node
//! per stored profile item, plus entities pulled from remembered facts.
//! Labels are deduplicated case-insensitively, stored items first.

use serde::Serialize;
use serde_json::Value;

use crate::memory::entities::{extract_entities, EntityKind};
use crate::models::profile::ProfileItemRow;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub title: String,
}

const USER_NODE: &str = "user";

fn node_type_for(item_type: &str) -> &'static str {
    match item_type {
        "location" => "location",
        "role_preference" => "role",
        "company" => "interest",
        "skill" => "skill",
        _ => "fact",
    }
}

fn edge_label_for(item_type: &str) -> &'static str {
    match item_type {
        "location" => "Located In",
        "role_preference" => "Interested In",
        "company" => "Worked At",
        "skill" => "Has Skill",
        _ => "Related",
    }
}

fn entity_edge_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Location => "Located In",
        EntityKind::Role | EntityKind::Interest => "Interested In",
        EntityKind::Skill => "Has Skill",
    }
}

pub fn guest_graph() -> UserGraph {
    UserGraph {
        nodes: vec![GraphNode {
            id: "guest".to_string(),
            node_type: "user",
            label: "Guest".to_string(),
            data: None,
        }],
        edges: Vec::new(),
        title: "Sign in to see your personalized graph".to_string(),
    }
}

struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    fn has_label(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.nodes.iter().any(|n| n.label.to_lowercase() == label)
    }

    fn link(
        &mut self,
        prefix: &str,
        node_type: &'static str,
        label: String,
        data: Option<Value>,
        edge_type: String,
        edge_label: &'static str,
    ) {
        if self.has_label(&label) {
            return;
        }
        let id = format!("{prefix}_{}", self.nodes.len());
        self.edges.push(GraphEdge {
            source: USER_NODE.to_string(),
            target: id.clone(),
            edge_type,
            label: edge_label,
        });
        self.nodes.push(GraphNode {
            id,
            node_type,
            label,
            data,
        });
    }
}

pub fn build_user_graph(user_name: &str, items: &[ProfileItemRow], facts: &[String]) -> UserGraph {
    let mut graph = GraphBuilder {
        nodes: vec![GraphNode {
            id: USER_NODE.to_string(),
            node_type: "user",
            label: user_name.to_string(),
            data: None,
        }],
        edges: Vec::new(),
    };

    for item in items {
        graph.link(
            "item",
            node_type_for(&item.item_type),
            item.value.clone(),
            Some(item.metadata.clone().unwrap_or_else(|| Value::Object(Default::default()))),
            item.item_type.to_uppercase(),
            edge_label_for(&item.item_type),
        );
    }

    for entity in facts.iter().flat_map(|f| extract_entities(f)) {
        graph.link(
            "fact",
            entity.kind.node_type(),
            entity.label,
            None,
            "MENTIONED".to_string(),
            entity_edge_label(entity.kind),
        );
    }

    if graph.nodes.len() == 1 {
        let placeholders = [
            ("Your Location", "location"),
            ("Your Target Role", "role"),
            ("Your Skills", "skill"),
        ];
        for (i, (label, node_type)) in placeholders.into_iter().enumerate() {
            let id = format!("default_{i}");
            graph.edges.push(GraphEdge {
                source: USER_NODE.to_string(),
                target: id.clone(),
                edge_type: "EXAMPLE".to_string(),
                label: "Add via chat",
            });
            graph.nodes.push(GraphNode {
                id,
                node_type,
                label: label.to_string(),
                data: None,
            });
        }
    }

    UserGraph {
        nodes: graph.nodes,
        edges: graph.edges,
        title: format!("{user_name}'s Interest Graph"),
    }
}
