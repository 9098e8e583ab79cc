//! Gradient-boosted tree ensembles in LightGBM's text model format.
//!
//! Only what inference needs is read: the header (class count, objective,
//! feature names) and each tree's numerical splits and leaf values.
//! Categorical splits and linear trees are rejected at load time.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;
const ZERO_THRESHOLD: f64 = 1e-35;

/// How a split routes missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

impl MissingType {
    fn from_decision_type(decision_type: u8) -> Self {
        match (decision_type >> 2) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        }
    }
}

/// One regression tree. Child indices below zero address leaves (`!child`).
#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
}

impl Tree {
    fn parse(index: usize, fields: &HashMap<&str, &str>) -> Result<Self> {
        let num_leaves: usize = parse_scalar(fields, "num_leaves", index)?;
        if num_leaves == 0 {
            return Err(tree_error(index, "num_leaves must be positive"));
        }
        if fields.get("is_linear").is_some_and(|v| v.trim() != "0") {
            return Err(tree_error(index, "linear trees are not supported"));
        }
        if fields.get("num_cat").is_some_and(|v| v.trim() != "0") {
            return Err(tree_error(index, "categorical splits are not supported"));
        }

        let leaf_value: Vec<f64> = parse_list(fields, "leaf_value", index)?;
        if leaf_value.len() != num_leaves {
            return Err(tree_error(index, "leaf_value length differs from num_leaves"));
        }

        if num_leaves == 1 {
            return Ok(Self {
                split_feature: Vec::new(),
                threshold: Vec::new(),
                decision_type: Vec::new(),
                left_child: Vec::new(),
                right_child: Vec::new(),
                leaf_value,
            });
        }

        let tree = Self {
            split_feature: parse_list(fields, "split_feature", index)?,
            threshold: parse_list(fields, "threshold", index)?,
            decision_type: parse_list(fields, "decision_type", index)?,
            left_child: parse_list(fields, "left_child", index)?,
            right_child: parse_list(fields, "right_child", index)?,
            leaf_value,
        };

        let internal = num_leaves - 1;
        let lengths = [
            tree.split_feature.len(),
            tree.threshold.len(),
            tree.decision_type.len(),
            tree.left_child.len(),
            tree.right_child.len(),
        ];
        if lengths.iter().any(|&len| len != internal) {
            return Err(tree_error(index, "split arrays do not match num_leaves"));
        }
        if tree.decision_type.iter().any(|d| d & CATEGORICAL_MASK != 0) {
            return Err(tree_error(index, "categorical splits are not supported"));
        }

        // Internal children are numbered after their parent, so descent terminates.
        let valid_child = |parent: usize, c: i32| {
            if c >= 0 {
                (c as usize) > parent && (c as usize) < internal
            } else {
                ((!c) as usize) < num_leaves
            }
        };
        let children = tree.left_child.iter().zip(&tree.right_child).enumerate();
        for (parent, (&left, &right)) in children {
            if !valid_child(parent, left) || !valid_child(parent, right) {
                return Err(tree_error(index, "child index out of range or not after its parent"));
            }
        }

        Ok(tree)
    }

    fn max_feature(&self) -> Option<usize> {
        self.split_feature.iter().copied().max()
    }

    fn predict(&self, row: &[f64]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }

        let mut node: i32 = 0;
        while node >= 0 {
            let n = node as usize;
            let value = row.get(self.split_feature[n]).copied().unwrap_or(0.0);
            node = if self.goes_left(n, value) {
                self.left_child[n]
            } else {
                self.right_child[n]
            };
        }
        self.leaf_value[(!node) as usize]
    }

    fn goes_left(&self, node: usize, value: f64) -> bool {
        let decision = self.decision_type[node];
        let missing = MissingType::from_decision_type(decision);

        let value = if value.is_nan() && missing != MissingType::NaN {
            0.0
        } else {
            value
        };

        let is_missing = match missing {
            MissingType::Zero => (-ZERO_THRESHOLD..=ZERO_THRESHOLD).contains(&value),
            MissingType::NaN => value.is_nan(),
            MissingType::None => false,
        };
        if is_missing {
            return decision & DEFAULT_LEFT_MASK != 0;
        }

        value <= self.threshold[node]
    }
}

/// A boosted tree ensemble for binary or multiclass classification.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    num_class: usize,
    num_tree_per_iteration: usize,
    objective: String,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

impl GbdtModel {
    /// Load a model from a LightGBM text file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Model(format!("cannot read {}: {}", path.display(), e)))?;
        text.parse()
    }

    /// Number of predicted classes (2 for a binary objective).
    pub fn class_count(&self) -> usize {
        if self.is_binary() {
            2
        } else {
            self.num_class
        }
    }

    pub fn is_binary(&self) -> bool {
        self.objective.starts_with("binary")
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Feature names recorded at training time, in input order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Summed raw score per tree group (one for binary, one per class otherwise).
    pub fn raw_scores(&self, row: &[f64]) -> Vec<f64> {
        let mut scores = vec![0.0; self.num_tree_per_iteration];
        for (i, tree) in self.trees.iter().enumerate() {
            scores[i % self.num_tree_per_iteration] += tree.predict(row);
        }
        scores
    }

    /// Index of the predicted class. Ties go to the lowest index.
    pub fn predict_class(&self, row: &[f64]) -> usize {
        let scores = self.raw_scores(row);
        if self.is_binary() {
            return usize::from(scores[0] > 0.0);
        }

        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }
        best
    }
}

impl FromStr for GbdtModel {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut tree_fields: Vec<HashMap<&str, &str>> = Vec::new();
        let mut saw_header = false;

        for line in text.lines() {
            let line = line.trim();
            if line == "end of trees" {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if !saw_header {
                if line != "tree" {
                    return Err(Error::Model("missing 'tree' header line".into()));
                }
                saw_header = true;
                continue;
            }
            if line.starts_with("Tree=") {
                tree_fields.push(HashMap::new());
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match tree_fields.last_mut() {
                Some(fields) => fields.insert(key, value),
                None => header.insert(key, value),
            };
        }

        if !saw_header {
            return Err(Error::Model("empty model file".into()));
        }

        let num_class: usize = header_scalar(&header, "num_class")?;
        let num_tree_per_iteration: usize = match header.get("num_tree_per_iteration") {
            Some(_) => header_scalar(&header, "num_tree_per_iteration")?,
            None => num_class,
        };
        let objective = header
            .get("objective")
            .map(|o| o.split_whitespace().next().unwrap_or_default().to_string())
            .ok_or_else(|| Error::Model("missing objective".into()))?;
        let feature_names: Vec<String> = header
            .get("feature_names")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .ok_or_else(|| Error::Model("missing feature_names".into()))?;

        if !(objective.starts_with("binary") || objective.starts_with("multiclass")) {
            return Err(Error::Model(format!(
                "unsupported objective '{}', expected binary or multiclass",
                objective
            )));
        }
        if num_tree_per_iteration == 0 {
            return Err(Error::Model("num_tree_per_iteration must be positive".into()));
        }
        if objective.starts_with("binary") && num_tree_per_iteration != 1 {
            return Err(Error::Model("binary model must have one tree per iteration".into()));
        }
        if objective.starts_with("multiclass") && num_tree_per_iteration != num_class {
            return Err(Error::Model(format!(
                "num_tree_per_iteration {} differs from num_class {}",
                num_tree_per_iteration, num_class
            )));
        }

        let trees = tree_fields
            .iter()
            .enumerate()
            .map(|(i, fields)| Tree::parse(i, fields))
            .collect::<Result<Vec<_>>>()?;
        if trees.is_empty() {
            return Err(Error::Model("model contains no trees".into()));
        }

        if let Some(max) = trees.iter().filter_map(Tree::max_feature).max() {
            if max >= feature_names.len() {
                return Err(Error::Model(format!(
                    "split on feature {} but only {} features are named",
                    max,
                    feature_names.len()
                )));
            }
        }

        log::debug!(
            "Loaded {} model: {} trees, {} classes, {} features",
            objective,
            trees.len(),
            num_class,
            feature_names.len()
        );

        Ok(Self {
            num_class,
            num_tree_per_iteration,
            objective,
            feature_names,
            trees,
        })
    }
}

fn header_scalar<T: FromStr>(header: &HashMap<&str, &str>, key: &str) -> Result<T> {
    header
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| Error::Model(format!("missing or invalid '{}'", key)))
}

fn parse_scalar<T: FromStr>(fields: &HashMap<&str, &str>, key: &str, tree: usize) -> Result<T> {
    fields
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| tree_error(tree, &format!("missing or invalid '{}'", key)))
}

fn parse_list<T: FromStr>(fields: &HashMap<&str, &str>, key: &str, tree: usize) -> Result<Vec<T>> {
    let raw = fields
        .get(key)
        .ok_or_else(|| tree_error(tree, &format!("missing '{}'", key)))?;
    raw.split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| tree_error(tree, &format!("invalid value '{}' in '{}'", v, key)))
        })
        .collect()
}

fn tree_error(tree: usize, msg: &str) -> Error {
    Error::Model(format!("tree {}: {}", tree, msg))
}
