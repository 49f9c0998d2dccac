use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A character record supplied by the host. The engine only reads it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub traits: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit display color as `#rrggbb`; falls back to the name palette.
    #[serde(default)]
    pub color: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A typed, directed, strength-weighted connection between two entities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Nominally 0..=100. Out-of-range values load and are clamped when the
    /// graph is derived.
    pub strength: i64,
    #[serde(default)]
    pub description: Option<String>,
}

impl Relation {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: impl Into<String>,
        strength: i64,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
            strength,
            description: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NodeSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl NodeSize {
    pub fn base_radius(self) -> f32 {
        match self {
            Self::Small => 8.0,
            Self::Medium => 12.0,
            Self::Large => 16.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkDistance {
    Short,
    #[default]
    Medium,
    Long,
}

impl LinkDistance {
    pub fn base_distance(self) -> f32 {
        match self {
            Self::Short => 80.0,
            Self::Medium => 120.0,
            Self::Long => 150.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "Short",
            Self::Medium => "Medium",
            Self::Long => "Long",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsStrength {
    Weak,
    #[default]
    Medium,
    Strong,
}

impl PhysicsStrength {
    pub fn coefficient(self) -> f32 {
        match self {
            Self::Weak => 0.3,
            Self::Medium => 0.5,
            Self::Strong => 0.8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Weak => "Weak",
            Self::Medium => "Medium",
            Self::Strong => "Strong",
        }
    }
}

/// Rendering and physics options supplied by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphOptions {
    pub show_labels: bool,
    pub show_relationship_types: bool,
    pub node_size: NodeSize,
    pub link_strength: LinkDistance,
    pub physics: PhysicsStrength,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_relationship_types: false,
            node_size: NodeSize::Medium,
            link_strength: LinkDistance::Medium,
            physics: PhysicsStrength::Medium,
        }
    }
}

impl GraphOptions {
    /// Whether switching from `self` to `other` changes derived geometry
    /// and therefore requires a rebuild of the node/link sets.
    pub fn affects_geometry(&self, other: &Self) -> bool {
        self.node_size != other.node_size
            || self.link_strength != other.link_strength
            || self.physics != other.physics
    }
}
