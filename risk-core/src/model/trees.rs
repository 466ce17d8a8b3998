//! Tree Ensemble Backend - XGBoost JSON models
//!
//! Evaluates a gradient-boosted tree model saved with XGBoost's
//! `save_model("model.json")`. Only the parts needed for binary prediction
//! are read:
//!
//! ```text
//! learner.feature_names                    -> checked against FEATURE_LAYOUT
//! learner.learner_model_param.base_score   -> "5E-1" or "[5E-1]"
//! learner.objective.name                   -> binary:logistic
//! learner.gradient_booster.model.trees[*]  -> flat node arrays
//! learner.attributes.best_iteration        -> optional early-stopping cut
//! ```
//!
//! An early-stopped model keeps every boosted round in the file, but only
//! the first `(best_iteration + 1) * num_parallel_tree` trees take part in
//! prediction.
//!
//! Node `i` is a leaf when `left_children[i] == -1`; its value is then
//! stored in `split_conditions[i]`. Internal nodes send `x < cond` left,
//! `x >= cond` right, and missing values to the `default_left` side.

use serde::Deserialize;

use super::classifier::Classifier;
use crate::error::{InferenceError, ModelLoadError};
use crate::features::{layout::matches_layout, FeatureRecord, FEATURE_COUNT};

const SUPPORTED_OBJECTIVE: &str = "binary:logistic";

// ============================================================================
// DOCUMENT SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    learner_model_param: LearnerModelParam,
    #[serde(default)]
    attributes: LearnerAttributes,
    objective: Objective,
    gradient_booster: GradientBooster,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LearnerAttributes {
    #[serde(default)]
    best_iteration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: GbTreeModel,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    #[serde(default)]
    gbtree_model_param: GbTreeModelParam,
    trees: Vec<RawTree>,
}

#[derive(Debug, Default, Deserialize)]
struct GbTreeModelParam {
    #[serde(default)]
    num_parallel_tree: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    #[serde(default)]
    default_left: Vec<Flag>,
}

/// `default_left` is written as 0/1 by some XGBoost versions, as booleans by others
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

// ============================================================================
// COMPILED TREES
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        condition: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(index: usize, raw: RawTree) -> Result<Self, ModelLoadError> {
        let n = raw.left_children.len();
        let malformed = |what: &str| ModelLoadError::Parse(format!("tree {}: {}", index, what));

        if n == 0 {
            return Err(malformed("no nodes"));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
        {
            return Err(malformed("node arrays differ in length"));
        }
        if !raw.default_left.is_empty() && raw.default_left.len() != n {
            return Err(malformed("default_left length differs from node count"));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = raw.left_children[i];
            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }

            let right = raw.right_children[i];
            // Children always come after their parent, which also rules out cycles
            let child = |c: i32| usize::try_from(c).ok().filter(|&c| c > i && c < n);
            let (left, right) = match (child(left), child(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(malformed(&format!("node {} has invalid children", i))),
            };

            let feature = usize::try_from(raw.split_indices[i])
                .ok()
                .filter(|&f| f < FEATURE_COUNT)
                .ok_or_else(|| {
                    malformed(&format!(
                        "node {} splits on feature {}",
                        i, raw.split_indices[i]
                    ))
                })?;

            nodes.push(Node::Split {
                feature,
                condition: raw.split_conditions[i],
                left,
                right,
                default_left: raw.default_left.get(i).map_or(false, |f| f.is_set()),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, x: &[f32; FEATURE_COUNT]) -> f32 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Leaf(value) => return value,
                Node::Split { feature, condition, left, right, default_left } => {
                    let v = x[feature];
                    i = if v.is_nan() {
                        if default_left { left } else { right }
                    } else if v < condition {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

// ============================================================================
// ENSEMBLE
// ============================================================================

/// Gradient-boosted binary classifier loaded from an XGBoost JSON model
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    /// Leading trees that take part in prediction
    active: usize,
    base_margin: f64,
    feature_names: Vec<String>,
}

impl TreeEnsemble {
    /// Build from a parsed model document (not a container).
    pub fn from_document(document: serde_json::Value) -> Result<Self, ModelLoadError> {
        let doc: XgbDocument = serde_json::from_value(document)?;
        let learner = doc.learner;

        if learner.objective.name != SUPPORTED_OBJECTIVE {
            return Err(ModelLoadError::UnsupportedObjective(learner.objective.name));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelLoadError::Parse(format!(
                "unsupported booster `{}`",
                learner.gradient_booster.name
            )));
        }

        check_schema(&learner.feature_names, learner.learner_model_param.num_feature.as_deref())?;

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let base_margin = (base_score / (1.0 - base_score)).ln();

        let model = learner.gradient_booster.model;
        let parallel = parse_count(
            "num_parallel_tree",
            model.gbtree_model_param.num_parallel_tree.as_deref(),
        )?
        .unwrap_or(1)
        .max(1);
        let best_iteration =
            parse_count("best_iteration", learner.attributes.best_iteration.as_deref())?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::compile(i, raw))
            .collect::<Result<Vec<_>, _>>()?;

        if trees.is_empty() {
            return Err(ModelLoadError::Parse("model has no trees".to_string()));
        }

        let active = match best_iteration {
            Some(best) => {
                let rounds = (best + 1) * parallel;
                if rounds > trees.len() {
                    return Err(ModelLoadError::Parse(format!(
                        "best_iteration {} needs {} trees, model has {}",
                        best,
                        rounds,
                        trees.len()
                    )));
                }
                rounds
            }
            None => trees.len(),
        };

        log::debug!(
            "Compiled tree ensemble: {} trees ({} active), base_score {}",
            trees.len(),
            active,
            base_score
        );

        Ok(Self {
            trees,
            active,
            base_margin,
            feature_names: learner.feature_names,
        })
    }

    /// Parse a bare model document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ModelLoadError> {
        Self::from_document(serde_json::from_str(json)?)
    }

    /// Trees stored in the document
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Trees summed at prediction time (fewer than stored when early-stopped)
    pub fn active_tree_count(&self) -> usize {
        self.active
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Raw log-odds for `record`
    pub fn margin(&self, record: &FeatureRecord) -> f64 {
        let x = record.to_f32();
        self.base_margin
            + self.trees[..self.active]
                .iter()
                .map(|tree| f64::from(tree.leaf_value(&x)))
                .sum::<f64>()
    }
}

impl Classifier for TreeEnsemble {
    fn predict_proba(&self, record: &FeatureRecord) -> Result<[f64; 2], InferenceError> {
        let margin = self.margin(record);
        if !margin.is_finite() {
            return Err(InferenceError(format!("non-finite margin {}", margin)));
        }
        let p = sigmoid(margin);
        Ok([1.0 - p, p])
    }

    fn name(&self) -> &str {
        "xgboost-json"
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn parse_base_score(raw: &str) -> Result<f64, ModelLoadError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ModelLoadError::Parse(format!("invalid base_score `{}`", raw)))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(ModelLoadError::Parse(format!(
            "base_score {} is not a probability",
            value
        )))
    }
}

/// Optional non-negative count stored as a string attribute
fn parse_count(key: &str, raw: Option<&str>) -> Result<Option<usize>, ModelLoadError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<usize>()
            .map_err(|_| ModelLoadError::Parse(format!("invalid {} `{}`", key, value)))
    })
    .transpose()
}

fn check_schema(names: &[String], num_feature: Option<&str>) -> Result<(), ModelLoadError> {
    if !names.is_empty() {
        if !matches_layout(names) {
            return Err(ModelLoadError::SchemaMismatch {
                found: names.to_vec(),
            });
        }
        return Ok(());
    }

    // Unnamed model: the best we can do is compare the column count
    log::warn!("Model carries no feature names; relying on column order");
    match num_feature.map(|n| n.trim().parse::<usize>()) {
        Some(Ok(n)) if n != FEATURE_COUNT => Err(ModelLoadError::SchemaMismatch {
            found: vec![format!("{} unnamed features", n)],
        }),
        _ => Ok(()),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::{FeatureRecordBuilder, FEATURE_LAYOUT};
    use serde_json::json;

    /// Two stumps: CHE < 3000 adds 0.8 else -0.4; Mg < 0.7 adds 0.5 else -0.2.
    /// Missing CHE goes left.
    pub(crate) fn stump_model() -> serde_json::Value {
        json!({
            "learner": {
                "feature_names": FEATURE_LAYOUT,
                "feature_types": [
                    "float", "float", "float", "float", "float", "float", "float", "int"
                ],
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "0",
                    "num_feature": "8"
                },
                "objective": { "name": "binary:logistic" },
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [
                            {
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [3, 0, 0],
                                "split_conditions": [3000.0, 0.8, -0.4],
                                "default_left": [1, 0, 0]
                            },
                            {
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [0.7, 0.5, -0.2],
                                "default_left": [false, false, false]
                            }
                        ]
                    }
                }
            },
            "version": [2, 0, 3]
        })
    }

    #[test]
    fn test_margin_and_probability() {
        let model = TreeEnsemble::from_document(stump_model()).unwrap();
        assert_eq!(model.tree_count(), 2);

        // CHE 2000 -> 0.8, Mg 0.5 -> 0.5, base margin logit(0.5) = 0
        let record = FeatureRecordBuilder::from_defaults()
            .che(2000.0)
            .mg(0.5)
            .build()
            .unwrap();
        let margin = model.margin(&record);
        assert!((margin - 1.3).abs() < 1e-6);

        let [neg, pos] = model.predict_proba(&record).unwrap();
        assert!((pos - sigmoid(1.3)).abs() < 1e-6);
        assert!((neg + pos - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_is_strictly_less_than() {
        let model = TreeEnsemble::from_document(stump_model()).unwrap();
        let at_cut = FeatureRecordBuilder::from_defaults()
            .che(3000.0)
            .mg(0.7)
            .build()
            .unwrap();
        assert!((model.margin(&at_cut) - (-0.6)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_follows_default_direction() {
        let model = TreeEnsemble::from_document(stump_model()).unwrap();
        let mut x = [0.0f32; FEATURE_COUNT];
        x[3] = f32::NAN;
        x[0] = f32::NAN;
        assert_eq!(model.trees[0].leaf_value(&x), 0.8);
        assert_eq!(model.trees[1].leaf_value(&x), -0.2);
    }

    #[test]
    fn test_bracketed_base_score() {
        assert_eq!(parse_base_score("[5E-1]").unwrap(), 0.5);
        assert_eq!(parse_base_score("2.5E-1").unwrap(), 0.25);
        assert!(parse_base_score("1.0").is_err());
        assert!(parse_base_score("abc").is_err());

        let mut doc = stump_model();
        doc["learner"]["learner_model_param"]["base_score"] = json!("[2.5E-1]");
        let model = TreeEnsemble::from_document(doc).unwrap();
        assert!((model.base_margin - (1.0f64 / 3.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_feature_order() {
        let mut doc = stump_model();
        doc["learner"]["feature_names"] =
            json!(["ALT", "Mg", "AG", "CHE", "HCT", "INR", "hs_CRP", "Age"]);
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_unnamed_model_checks_column_count() {
        let mut doc = stump_model();
        doc["learner"]["feature_names"] = json!([]);
        assert!(TreeEnsemble::from_document(doc.clone()).is_ok());

        doc["learner"]["learner_model_param"]["num_feature"] = json!("9");
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_other_objectives() {
        let mut doc = stump_model();
        doc["learner"]["objective"]["name"] = json!("reg:squarederror");
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::UnsupportedObjective(name)) if name == "reg:squarederror"
        ));
    }

    #[test]
    fn test_best_iteration_limits_active_trees() {
        let mut doc = stump_model();
        doc["learner"]["attributes"] = json!({ "best_iteration": "0", "best_score": "0.41" });
        let model = TreeEnsemble::from_document(doc).unwrap();
        assert_eq!(model.tree_count(), 2);
        assert_eq!(model.active_tree_count(), 1);

        // Only the CHE stump counts: 0.8 rather than 0.8 + 0.5
        let record = FeatureRecordBuilder::from_defaults()
            .che(2000.0)
            .mg(0.5)
            .build()
            .unwrap();
        assert!((model.margin(&record) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_best_iteration_counts_parallel_trees() {
        let mut doc = stump_model();
        doc["learner"]["attributes"] = json!({ "best_iteration": "0" });
        doc["learner"]["gradient_booster"]["model"]["gbtree_model_param"] =
            json!({ "num_parallel_tree": "2", "num_trees": "2" });
        let model = TreeEnsemble::from_document(doc).unwrap();
        assert_eq!(model.active_tree_count(), 2);
    }

    #[test]
    fn test_best_iteration_must_fit_the_model() {
        let mut doc = stump_model();
        doc["learner"]["attributes"] = json!({ "best_iteration": "5" });
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::Parse(_))
        ));

        let mut doc = stump_model();
        doc["learner"]["attributes"] = json!({ "best_iteration": "last" });
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_without_best_iteration_all_trees_are_active() {
        let model = TreeEnsemble::from_document(stump_model()).unwrap();
        assert_eq!(model.active_tree_count(), model.tree_count());
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut doc = stump_model();
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] =
            json!([0, -1, -1]);
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::Parse(_))
        ));

        let mut doc = stump_model();
        doc["learner"]["gradient_booster"]["model"]["trees"][1]["split_indices"] =
            json!([12, 0, 0]);
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::Parse(_))
        ));

        let mut doc = stump_model();
        doc["learner"]["gradient_booster"]["model"]["trees"] = json!([]);
        assert!(matches!(
            TreeEnsemble::from_document(doc),
            Err(ModelLoadError::Parse(_))
        ));
    }
}
