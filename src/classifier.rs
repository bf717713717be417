//! Pre-trained three-class risk classifier over (avg attendance, avg marks, fees paid).
//!
//! The artifact is a decision-tree ensemble exported to JSON by the offline training
//! pipeline. It is loaded once at startup, validated structurally, and shared
//! read-only across requests; only `predict` is consumed here.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

pub const FEATURE_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
pub struct RiskModel {
    trees: Vec<Tree>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: u8,
    },
}

impl RiskModel {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let model: RiskModel = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.trees.is_empty() {
            bail!("model artifact contains no trees");
        }
        for (index, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                bail!("tree {index} has no nodes");
            }
            for node in &tree.nodes {
                match node {
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= FEATURE_COUNT {
                            bail!("tree {index} splits on unknown feature {feature}");
                        }
                        if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            bail!("tree {index} has a child index out of bounds");
                        }
                    }
                    Node::Leaf { class } => {
                        if *class > 2 {
                            bail!("tree {index} has a leaf class outside 0-2");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Predict the risk class in {0, 1, 2} by majority vote across trees. Ties
    /// resolve to the lowest class.
    pub fn predict(&self, avg_attendance: f64, avg_marks: f64, fees_paid: bool) -> anyhow::Result<u8> {
        let features = [avg_attendance, avg_marks, if fees_paid { 1.0 } else { 0.0 }];

        let mut votes = [0usize; 3];
        for tree in &self.trees {
            let class = tree.decide(&features)?;
            votes[usize::from(class.min(2))] += 1;
        }

        let mut winner = 0usize;
        for (class, count) in votes.iter().enumerate() {
            if *count > votes[winner] {
                winner = class;
            }
        }
        Ok(winner as u8)
    }
}

impl Tree {
    fn decide(&self, features: &[f64; FEATURE_COUNT]) -> anyhow::Result<u8> {
        let mut index = 0usize;
        // A well-formed tree reaches a leaf within nodes.len() steps.
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(index)
                .context("tree walk left the node table")?;
            match node {
                Node::Leaf { class } => return Ok(*class),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = *features
                        .get(*feature)
                        .context("split feature out of range")?;
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
        bail!("tree walk did not reach a leaf");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_from(value: serde_json::Value) -> RiskModel {
        let model: RiskModel = serde_json::from_value(value).unwrap();
        model.validate().unwrap();
        model
    }

    // One stump per labeling rule from the training pipeline: attendance < 75,
    // marks < 60, fees unpaid.
    fn stump_ensemble() -> RiskModel {
        model_from(json!({
            "trees": [
                { "nodes": [
                    { "kind": "split", "feature": 0, "threshold": 74.999, "left": 1, "right": 2 },
                    { "kind": "leaf", "class": 2 },
                    { "kind": "leaf", "class": 0 }
                ]},
                { "nodes": [
                    { "kind": "split", "feature": 1, "threshold": 59.999, "left": 1, "right": 2 },
                    { "kind": "leaf", "class": 2 },
                    { "kind": "leaf", "class": 0 }
                ]},
                { "nodes": [
                    { "kind": "split", "feature": 2, "threshold": 0.5, "left": 1, "right": 2 },
                    { "kind": "leaf", "class": 1 },
                    { "kind": "leaf", "class": 0 }
                ]}
            ]
        }))
    }

    #[test]
    fn splits_route_on_threshold() {
        let model = stump_ensemble();
        // All three stumps vote 0 for a strong student with paid fees.
        assert_eq!(model.predict(90.0, 85.0, true).unwrap(), 0);
        // Low attendance and low marks outvote the fee stump.
        assert_eq!(model.predict(50.0, 40.0, true).unwrap(), 2);
    }

    #[test]
    fn ties_resolve_to_the_lowest_class() {
        let model = stump_ensemble();
        // Votes: attendance stump 2, marks stump 0, fee stump 1 -- one vote each.
        assert_eq!(model.predict(50.0, 85.0, false).unwrap(), 0);
    }

    #[test]
    fn single_leaf_tree_is_a_constant_model() {
        let model = model_from(json!({
            "trees": [{ "nodes": [{ "kind": "leaf", "class": 1 }] }]
        }));
        assert_eq!(model.predict(0.0, 0.0, true).unwrap(), 1);
        assert_eq!(model.tree_count(), 1);
    }

    #[test]
    fn validation_rejects_malformed_artifacts() {
        let empty: RiskModel = serde_json::from_value(json!({ "trees": [] })).unwrap();
        assert!(empty.validate().is_err());

        let bad_feature: RiskModel = serde_json::from_value(json!({
            "trees": [{ "nodes": [
                { "kind": "split", "feature": 5, "threshold": 1.0, "left": 1, "right": 1 },
                { "kind": "leaf", "class": 0 }
            ]}]
        }))
        .unwrap();
        assert!(bad_feature.validate().is_err());

        let bad_child: RiskModel = serde_json::from_value(json!({
            "trees": [{ "nodes": [
                { "kind": "split", "feature": 0, "threshold": 1.0, "left": 9, "right": 1 },
                { "kind": "leaf", "class": 0 }
            ]}]
        }))
        .unwrap();
        assert!(bad_child.validate().is_err());

        let bad_class: RiskModel = serde_json::from_value(json!({
            "trees": [{ "nodes": [{ "kind": "leaf", "class": 7 }] }]
        }))
        .unwrap();
        assert!(bad_class.validate().is_err());
    }

    #[test]
    fn cyclic_tree_fails_instead_of_spinning() {
        let cyclic: RiskModel = serde_json::from_value(json!({
            "trees": [{ "nodes": [
                { "kind": "split", "feature": 0, "threshold": 50.0, "left": 0, "right": 0 }
            ]}]
        }))
        .unwrap();
        assert!(cyclic.predict(10.0, 10.0, true).is_err());
    }
}
