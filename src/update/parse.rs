use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

use crate::errors::UpdateError;

use super::types::{MAX_PATH_DEPTH, MAX_PATH_LEN, MAX_UPDATE_FIELDS, Operand, UpdateSpec};

// Serde-facing structure for safe JSON parsing of update specifications
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateSerde {
    #[serde(default, rename = "$set")]
    pub set: Option<BsonDocument>,
    #[serde(default, rename = "$unset")]
    pub unset: Option<BsonDocument>,
    #[serde(default, rename = "$inc")]
    pub inc: Option<BsonDocument>,
    #[serde(default, rename = "$push")]
    pub push: Option<BsonDocument>,
    #[serde(default, rename = "$pushAll")]
    pub push_all: Option<BsonDocument>,
    #[serde(default, rename = "$addToSet")]
    pub add_to_set: Option<BsonDocument>,
    #[serde(default, rename = "$pop")]
    pub pop: Option<BsonDocument>,
    #[serde(default, rename = "$pull")]
    pub pull: Option<BsonDocument>,
    #[serde(default, rename = "$pullAll")]
    pub pull_all: Option<BsonDocument>,
    #[serde(default, rename = "$rename")]
    pub rename: Option<BsonDocument>,
    #[serde(default, rename = "$setOnInsert")]
    pub set_on_insert: Option<BsonDocument>,
}

impl TryFrom<UpdateSerde> for UpdateSpec {
    type Error = UpdateError;

    fn try_from(us: UpdateSerde) -> Result<Self, Self::Error> {
        let mut out = Self::default();
        if let Some(d) = us.set {
            for (k, v) in capped(d, "$set") {
                check_path(&k)?;
                out.set.push((k, Operand::classify(v)));
            }
        }
        if let Some(d) = us.unset {
            for (k, _) in capped(d, "$unset") {
                check_path(&k)?;
                out.unset.push(k);
            }
        }
        if let Some(d) = us.inc {
            for (k, v) in capped(d, "$inc") {
                check_path(&k)?;
                let delta = match v {
                    Bson::Int32(i) => f64::from(i),
                    #[allow(clippy::cast_precision_loss)]
                    Bson::Int64(i) => i as f64,
                    Bson::Double(f) => f,
                    other => {
                        return Err(UpdateError::InvalidArgument(format!(
                            "$inc requires a numeric amount, got {other} for `{k}`"
                        )));
                    }
                };
                out.inc.push((k, delta));
            }
        }
        if let Some(d) = us.push {
            for (k, v) in capped(d, "$push") {
                check_path(&k)?;
                out.push.push((k, Operand::classify(v)));
            }
        }
        if let Some(d) = us.push_all {
            for (k, v) in capped(d, "$pushAll") {
                check_path(&k)?;
                match v {
                    Bson::Array(vs) => out.push_all.push((k, vs)),
                    other => {
                        return Err(UpdateError::InvalidArgument(format!(
                            "$pushAll requires an array, got {other} for `{k}`"
                        )));
                    }
                }
            }
        }
        if let Some(d) = us.add_to_set {
            for (k, v) in capped(d, "$addToSet") {
                check_path(&k)?;
                out.add_to_set.push((k, Operand::classify(v)));
            }
        }
        if let Some(d) = us.pop {
            for (k, v) in capped(d, "$pop") {
                check_path(&k)?;
                let direction = match v {
                    Bson::Int32(i) => i64::from(i),
                    Bson::Int64(i) => i,
                    #[allow(clippy::cast_possible_truncation)]
                    Bson::Double(f) if f.fract() == 0.0 => f as i64,
                    other => {
                        return Err(UpdateError::InvalidArgument(format!(
                            "$pop direction must be an integer, got {other} for `{k}`"
                        )));
                    }
                };
                out.pop.push((k, direction));
            }
        }
        if let Some(d) = us.pull {
            for (k, v) in capped(d, "$pull") {
                check_path(&k)?;
                out.pull.push((k, v));
            }
        }
        if let Some(d) = us.pull_all {
            for (k, v) in capped(d, "$pullAll") {
                check_path(&k)?;
                match v {
                    Bson::Array(vs) => out.pull_all.push((k, vs)),
                    other => {
                        return Err(UpdateError::InvalidArgument(format!(
                            "$pullAll requires an array, got {other} for `{k}`"
                        )));
                    }
                }
            }
        }
        if let Some(d) = us.rename {
            for (k, v) in capped(d, "$rename") {
                check_path(&k)?;
                match v {
                    Bson::String(s) => {
                        check_path(&s)?;
                        out.rename.push((k, s));
                    }
                    other => {
                        return Err(UpdateError::InvalidArgument(format!(
                            "$rename target must be a string path, got {other} for `{k}`"
                        )));
                    }
                }
            }
        }
        if let Some(d) = us.set_on_insert {
            for (k, v) in capped(d, "$setOnInsert") {
                check_path(&k)?;
                out.set_on_insert.push((k, Operand::classify(v)));
            }
        }
        Ok(out)
    }
}

fn capped(doc: BsonDocument, family: &str) -> impl Iterator<Item = (String, Bson)> {
    if doc.len() > MAX_UPDATE_FIELDS {
        log::warn!("update spec too long: {} fields in {family}", doc.len());
    }
    doc.into_iter().take(MAX_UPDATE_FIELDS)
}

fn check_path(path: &str) -> Result<(), UpdateError> {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return Err(UpdateError::InvalidArgument(format!("invalid field path `{path}`")));
    }
    if path.split('.').count() > MAX_PATH_DEPTH {
        return Err(UpdateError::InvalidArgument(format!("field path too deep: `{path}`")));
    }
    Ok(())
}

/// Reports whether `update` uses modifier operators at its top level, letting
/// the caller decide between whole-document replacement and modifier
/// application before invoking the engine.
#[must_use]
pub fn has_dynamic_operators(update: &BsonDocument) -> bool {
    update.keys().any(|k| k.starts_with('$'))
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into an update
/// structure, or if an operator payload is malformed.
pub fn parse_update_json(json: &str) -> Result<UpdateSpec, UpdateError> {
    let us: UpdateSerde = serde_json::from_str(json)?;
    UpdateSpec::try_from(us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_payloads() {
        let spec = parse_update_json(
            r#"{"$set": {"a": 1, "b": {"c": 2}},
                "$push": {"tags": {"$each": [1, 2]}},
                "$inc": {"n": 3},
                "$pop": {"arr": -1},
                "$rename": {"old": "new.path"}}"#,
        )
        .unwrap();
        assert_eq!(spec.set.len(), 2);
        assert!(matches!(spec.set[0].1, Operand::Scalar(_)));
        assert!(matches!(spec.set[1].1, Operand::Record(_)));
        assert!(matches!(&spec.push[0].1, Operand::Each(vs) if vs.len() == 2));
        assert_eq!(spec.inc, vec![("n".to_string(), 3.0)]);
        assert_eq!(spec.pop, vec![("arr".to_string(), -1)]);
        assert_eq!(spec.rename, vec![("old".to_string(), "new.path".to_string())]);
    }

    #[test]
    fn parse_rejects_non_numeric_inc() {
        let err = parse_update_json(r#"{"$inc": {"n": "five"}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidArgument(_)));
    }

    #[test]
    fn parse_rejects_non_array_push_all() {
        let err = parse_update_json(r#"{"$pushAll": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidArgument(_)));
    }

    #[test]
    fn parse_rejects_non_string_rename_target() {
        let err = parse_update_json(r#"{"$rename": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidArgument(_)));
    }

    #[test]
    fn parse_rejects_fractional_pop_direction() {
        let err = parse_update_json(r#"{"$pop": {"a": 1.5}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidArgument(_)));
    }

    #[test]
    fn parse_accepts_integral_double_pop_direction() {
        let spec = parse_update_json(r#"{"$pop": {"a": 1.0}}"#).unwrap();
        assert_eq!(spec.pop, vec![("a".to_string(), 1)]);
    }

    #[test]
    fn parse_rejects_empty_path() {
        let err = parse_update_json(r#"{"$set": {"": 1}}"#).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidArgument(_)));
    }

    #[test]
    fn detects_dynamic_operators() {
        let d: BsonDocument = bson::doc! {"$set": {"a": 1}};
        assert!(has_dynamic_operators(&d));
        let d: BsonDocument = bson::doc! {"name": "alice"};
        assert!(!has_dynamic_operators(&d));
    }
}
