use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::classifier::{GroupClassifier, HardLabelClassifier, KnnClassifier, SoftmaxClassifier};
use super::encoder::OneHotEncoder;
use crate::matching::domain::{GroupKey, SchoolType};
use crate::matching::errors::{read_json, ArtifactError};

/// Columns the priority encoders read when a group does not name its own.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 7] = [
    "school_type",
    "province",
    "industry_group",
    "olympiad_subject",
    "armed_forces_hero",
    "ethnic_minority",
    "poor_district",
];

/// Everything needed to classify variants of one (school type, province, industry group).
#[derive(Debug)]
pub struct GroupModel {
    pub labels: Vec<String>,
    pub encoder: Option<OneHotEncoder>,
    pub classifier: Option<Box<dyn GroupClassifier>>,
}

/// Group-keyed lookup of priority classifiers.
#[derive(Debug, Default)]
pub struct ClassifierRegistry {
    groups: HashMap<GroupKey, GroupModel>,
}

impl ClassifierRegistry {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let file: RegistryFile = read_json(path)?;
        Self::from_file(file, path)
    }

    pub fn from_json(source: &str, origin: &Path) -> Result<Self, ArtifactError> {
        let file: RegistryFile =
            serde_json::from_str(source).map_err(|source| ArtifactError::Json {
                path: origin.to_path_buf(),
                source,
            })?;
        Self::from_file(file, origin)
    }

    fn from_file(file: RegistryFile, origin: &Path) -> Result<Self, ArtifactError> {
        let mut registry = Self::default();
        for entry in file.groups {
            let school_type = SchoolType::from_code(entry.school_type).ok_or_else(|| {
                ArtifactError::schema(
                    origin,
                    format!("school_type {} is not 0 or 1", entry.school_type),
                )
            })?;
            let key = GroupKey {
                school_type,
                province: entry.province.trim().to_string(),
                industry_group: entry.industry_group.trim().to_string(),
            };
            let model = build_group(
                entry.labels,
                entry.encoder,
                entry.classifier,
                &file.feature_columns,
            )
            .map_err(|reason| {
                ArtifactError::schema(
                    origin,
                    format!("group {}/{}: {reason}", key.province, key.industry_group),
                )
            })?;
            registry.insert(key, model);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, key: GroupKey, model: GroupModel) {
        self.groups.insert(key, model);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GroupModel> {
        self.groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn build_group(
    labels: Vec<String>,
    encoder: Option<EncoderSpec>,
    classifier: Option<ClassifierSpec>,
    feature_columns: &[String],
) -> Result<GroupModel, String> {
    let encoder = encoder
        .map(|spec| {
            let columns = spec.columns.unwrap_or_else(|| feature_columns.to_vec());
            OneHotEncoder::new(columns, spec.categories)
                .ok_or_else(|| "encoder columns and categories differ in length".to_string())
        })
        .transpose()?;

    let classes = labels.len();
    let classifier: Option<Box<dyn GroupClassifier>> = match classifier {
        None => None,
        Some(ClassifierSpec::Knn { k, points, targets }) => {
            Some(Box::new(KnnClassifier::new(k, classes, points, targets)?))
        }
        Some(ClassifierSpec::HardKnn { points, targets }) => {
            Some(Box::new(HardLabelClassifier::new(classes, points, targets)?))
        }
        Some(ClassifierSpec::Softmax { weights, bias }) => {
            Some(Box::new(SoftmaxClassifier::new(classes, weights, bias)?))
        }
    };

    if let Some(classifier) = &classifier {
        let encoder = encoder
            .as_ref()
            .ok_or_else(|| "a classifier requires an encoder".to_string())?;
        if encoder.width() != classifier.input_width() {
            return Err(format!(
                "encoder width {} does not match classifier width {}",
                encoder.width(),
                classifier.input_width()
            ));
        }
    }

    Ok(GroupModel {
        labels,
        encoder,
        classifier,
    })
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default = "default_feature_columns")]
    feature_columns: Vec<String>,
    #[serde(default)]
    groups: Vec<GroupEntry>,
}

fn default_feature_columns() -> Vec<String> {
    DEFAULT_FEATURE_COLUMNS.iter().map(|column| column.to_string()).collect()
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    school_type: u8,
    province: String,
    industry_group: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    encoder: Option<EncoderSpec>,
    #[serde(default)]
    classifier: Option<ClassifierSpec>,
}

#[derive(Debug, Deserialize)]
struct EncoderSpec {
    #[serde(default)]
    columns: Option<Vec<String>>,
    categories: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierSpec {
    Knn {
        #[serde(default = "default_k")]
        k: usize,
        points: Vec<Vec<f64>>,
        targets: Vec<usize>,
    },
    HardKnn {
        points: Vec<Vec<f64>>,
        targets: Vec<usize>,
    },
    Softmax {
        weights: Vec<Vec<f64>>,
        bias: Vec<f64>,
    },
}

fn default_k() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"{
        "groups": [
            {
                "school_type": 1,
                "province": "Cần Thơ",
                "industry_group": "714",
                "labels": ["CTU-7140201-HSG", "CTU-7140202-HSG"],
                "encoder": {
                    "columns": ["olympiad_subject"],
                    "categories": [["Toán", "Văn"]]
                },
                "classifier": {
                    "kind": "knn",
                    "points": [[1.0, 0.0], [0.0, 1.0]],
                    "targets": [0, 1]
                }
            },
            {
                "school_type": 0,
                "province": "Long An",
                "industry_group": "734",
                "labels": ["DLA-7340101-UT"]
            }
        ]
    }"#;

    #[test]
    fn loads_groups_keyed_by_segment() {
        let registry =
            ClassifierRegistry::from_json(REGISTRY, Path::new("registry.json")).expect("loads");
        assert_eq!(registry.len(), 2);

        let key = GroupKey {
            school_type: SchoolType::Public,
            province: "Cần Thơ".into(),
            industry_group: "714".into(),
        };
        let group = registry.get(&key).expect("group registered");
        assert!(group.classifier.is_some());
        assert_eq!(group.encoder.as_ref().map(OneHotEncoder::width), Some(2));
    }

    #[test]
    fn constant_group_has_no_classifier() {
        let registry =
            ClassifierRegistry::from_json(REGISTRY, Path::new("registry.json")).expect("loads");
        let key = GroupKey {
            school_type: SchoolType::Private,
            province: "Long An".into(),
            industry_group: "734".into(),
        };
        let group = registry.get(&key).expect("group registered");
        assert!(group.classifier.is_none());
        assert_eq!(group.labels, vec!["DLA-7340101-UT".to_string()]);
    }

    #[test]
    fn rejects_classifier_without_encoder() {
        let source = r#"{"groups": [{
            "school_type": 1, "province": "Cà Mau", "industry_group": "751",
            "labels": ["A"],
            "classifier": {"kind": "hard_knn", "points": [[1.0]], "targets": [0]}
        }]}"#;
        let err = ClassifierRegistry::from_json(source, Path::new("registry.json"))
            .expect_err("encoder required");
        assert!(matches!(err, ArtifactError::Schema { .. }));
    }

    #[test]
    fn rejects_width_disagreement() {
        let source = r#"{"groups": [{
            "school_type": 1, "province": "Cà Mau", "industry_group": "751",
            "labels": ["A", "B"],
            "encoder": {"columns": ["province"], "categories": [["Cà Mau"]]},
            "classifier": {"kind": "softmax", "weights": [[1.0, 0.0], [0.0, 1.0]], "bias": [0.0, 0.0]}
        }]}"#;
        let err = ClassifierRegistry::from_json(source, Path::new("registry.json"))
            .expect_err("width mismatch");
        assert!(err.to_string().contains("width"));
    }
}
