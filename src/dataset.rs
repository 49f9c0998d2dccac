use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::model::{Entity, GraphOptions, Relation};

/// On-disk form of a cast: characters, their relationships and optional
/// display options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub characters: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relation>,
    #[serde(default)]
    pub options: Option<GraphOptions>,
}

pub fn parse_dataset(raw: &str) -> Result<Dataset> {
    let value: serde_json::Value = serde_json::from_str(raw).context("invalid dataset JSON")?;
    if !value.is_object() {
        return Err(anyhow!("dataset must be a JSON object with `characters`"));
    }
    Dataset::deserialize(value).context("dataset does not match the expected shape")
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let dataset = parse_dataset(&raw)
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        characters = dataset.characters.len(),
        relationships = dataset.relationships.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Small built-in cast used when no dataset file is given.
pub fn demo_dataset() -> Dataset {
    let characters = vec![
        Entity::new("aria", "Aria Valen").with_description("Exiled captain of the Gull"),
        Entity::new("bram", "Bram Holt").with_description("Quartermaster, loyal to a fault"),
        Entity::new("cass", "Cassia Rook").with_description("Smuggler with a price on her head"),
        Entity::new("dorn", "Dorn Ashby").with_description("Harbor magistrate"),
        Entity::new("elin", "Elin Marsh").with_description("Cartographer and Aria's sister"),
        Entity::new("fenn", "Fenn Doyle").with_description("Aria's old sailing master"),
        Entity::new("gret", "Greta Stoll").with_color("#e11d48"),
        Entity::new("hale", "Hale Wynn"),
    ];
    let relationships = vec![
        Relation::new("r1", "aria", "bram", "ally", 90),
        Relation::new("r2", "aria", "elin", "family", 85),
        Relation::new("r3", "aria", "dorn", "enemy", 70),
        Relation::new("r4", "cass", "aria", "rival", 55),
        Relation::new("r5", "cass", "bram", "romantic", 65),
        Relation::new("r6", "fenn", "aria", "mentor", 80),
        Relation::new("r7", "dorn", "gret", "ally", 40),
        Relation::new("r8", "gret", "cass", "enemy", 95),
        Relation::new("r9", "hale", "elin", "friend", 50),
        Relation::new("r10", "hale", "dorn", "acquaintance", 20),
    ];
    Dataset {
        characters,
        relationships,
        options: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeSize;

    #[test]
    fn test_parse_dataset_with_options() {
        let raw = r##"{
            "characters": [
                {"id": "a", "name": "Alice", "traits": {"age": 31}},
                {"id": "b", "name": "Bob", "color": "#ff0000"}
            ],
            "relationships": [
                {"id": "ab", "from": "a", "to": "b", "type": "Enemy", "strength": 40}
            ],
            "options": {"nodeSize": "large", "showRelationshipTypes": true}
        }"##;
        let dataset = parse_dataset(raw).unwrap();
        assert_eq!(dataset.characters.len(), 2);
        assert_eq!(dataset.characters[0].traits["age"], 31);
        assert_eq!(dataset.relationships[0].kind, "Enemy");
        let options = dataset.options.unwrap();
        assert_eq!(options.node_size, NodeSize::Large);
        assert!(options.show_relationship_types);
        assert!(options.show_labels);
    }

    #[test]
    fn test_parse_dataset_rejects_non_object() {
        assert!(parse_dataset("[1, 2]").is_err());
        assert!(parse_dataset("{not json").is_err());
    }

    #[test]
    fn test_out_of_range_strength_still_loads() {
        let raw = r#"{
            "characters": [{"id": "a", "name": "Alice"}, {"id": "b", "name": "Bob"}],
            "relationships": [
                {"id": "hi", "from": "a", "to": "b", "type": "ally", "strength": 300},
                {"id": "lo", "from": "b", "to": "a", "type": "rival", "strength": -5}
            ]
        }"#;
        let dataset = parse_dataset(raw).unwrap();
        assert_eq!(dataset.relationships[0].strength, 300);
        assert_eq!(dataset.relationships[1].strength, -5);

        let graph = crate::graph::build_graph(
            &dataset.characters,
            &dataset.relationships,
            &crate::GraphOptions::default(),
            None,
            eframe::egui::Vec2::ZERO,
        );
        assert_eq!(graph.links[0].strength, 100);
        assert_eq!(graph.links[1].strength, 0);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let dataset = parse_dataset("{}").unwrap();
        assert!(dataset.characters.is_empty());
        assert!(dataset.relationships.is_empty());
        assert!(dataset.options.is_none());
    }

    #[test]
    fn test_load_dataset_reports_path() {
        let err = load_dataset(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_demo_dataset_is_consistent() {
        let demo = demo_dataset();
        for relation in &demo.relationships {
            assert!(demo.characters.iter().any(|c| c.id == relation.from));
            assert!(demo.characters.iter().any(|c| c.id == relation.to));
        }
    }
}
