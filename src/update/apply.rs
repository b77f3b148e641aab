use bson::{Bson, Document as BsonDocument};

use crate::errors::UpdateError;
use crate::matcher::{ElementMatcher, FilterMatcher};

use super::path::{ensure_record, is_truthy, locate_for_read, resolve_for_write};
use super::types::{Operand, UpdateSpec};

/// Applies every modifier family present in `spec` to `doc`, in place, using
/// the built-in [`FilterMatcher`] to evaluate `$pull` expressions.
///
/// # Errors
/// Fails fast on the first family whose target holds a value of the wrong
/// shape (`InvalidOperand`) or whose payload is outside its accepted domain
/// (`InvalidArgument`). Families applied before the failure are kept; there
/// is no rollback.
pub fn apply_update(
    doc: &mut BsonDocument,
    spec: &UpdateSpec,
    upsert: bool,
) -> Result<(), UpdateError> {
    apply_update_with(doc, spec, upsert, &FilterMatcher)
}

/// As [`apply_update`], with an injected predicate delegate for `$pull`.
///
/// Families run in a fixed order: `$set`, `$unset`, `$inc`, `$push`,
/// `$pushAll`, `$addToSet`, `$pop`, `$pull`, `$pullAll`, `$rename`, and
/// `$setOnInsert` only when `upsert` is set. On overlapping target paths the
/// later family wins.
///
/// # Errors
/// See [`apply_update`].
pub fn apply_update_with(
    doc: &mut BsonDocument,
    spec: &UpdateSpec,
    upsert: bool,
    matcher: &dyn ElementMatcher,
) -> Result<(), UpdateError> {
    apply_set(doc, &spec.set);
    apply_unset(doc, &spec.unset);
    apply_inc(doc, &spec.inc)?;
    apply_push(doc, &spec.push)?;
    apply_push_all(doc, &spec.push_all)?;
    apply_add_to_set(doc, &spec.add_to_set)?;
    apply_pop(doc, &spec.pop)?;
    apply_pull(doc, &spec.pull, matcher)?;
    apply_pull_all(doc, &spec.pull_all)?;
    apply_rename(doc, &spec.rename);
    if upsert {
        apply_set(doc, &spec.set_on_insert);
    }
    Ok(())
}

fn apply_set(doc: &mut BsonDocument, entries: &[(String, Operand)]) {
    for (path, value) in entries {
        set_path(doc, path, value);
    }
}

fn set_path(doc: &mut BsonDocument, path: &str, value: &Operand) {
    let (target, key) = resolve_for_write(doc, path);
    match value {
        // record onto record merges field by field; nested keys are
        // themselves dotted paths
        Operand::Record(fields) => {
            let dest = ensure_record(target, key);
            for (k, v) in fields {
                set_path(dest, k, &Operand::classify(v.clone()));
            }
        }
        other => {
            target.insert(key, other.to_bson());
        }
    }
}

fn apply_unset(doc: &mut BsonDocument, paths: &[String]) {
    for path in paths {
        if let Some((parent, key)) = locate_for_read(doc, path)
            && parent.get(key).is_some_and(is_truthy)
        {
            parent.remove(key);
        }
    }
}

fn apply_inc(doc: &mut BsonDocument, entries: &[(String, f64)]) -> Result<(), UpdateError> {
    for (path, delta) in entries {
        let (target, key) = resolve_for_write(doc, path);
        let base = match target.get(key) {
            Some(v) if is_truthy(v) => as_finite_number(v).ok_or_else(|| {
                UpdateError::InvalidOperand(format!(
                    "cannot apply $inc modifier to non-number at `{path}`"
                ))
            })?,
            _ => 0.0,
        };
        target.insert(key, Bson::Double(base + delta));
    }
    Ok(())
}

fn as_finite_number(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) if f.is_finite() => Some(*f),
        Bson::Decimal128(d) => d.to_string().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn apply_push(doc: &mut BsonDocument, entries: &[(String, Operand)]) -> Result<(), UpdateError> {
    for (path, value) in entries {
        let (target, key) = resolve_for_write(doc, path);
        match target.get_mut(key) {
            Some(Bson::Array(arr)) => match value {
                Operand::Each(vs) => arr.extend(vs.iter().cloned()),
                other => arr.push(other.to_bson()),
            },
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $push/$pushAll modifier to non-array at `{path}`"
                )));
            }
            _ => {
                let fresh = match value {
                    Operand::Each(vs) => vs.clone(),
                    other => vec![other.to_bson()],
                };
                target.insert(key, Bson::Array(fresh));
            }
        }
    }
    Ok(())
}

fn apply_push_all(
    doc: &mut BsonDocument,
    entries: &[(String, Vec<Bson>)],
) -> Result<(), UpdateError> {
    for (path, values) in entries {
        let (target, key) = resolve_for_write(doc, path);
        match target.get_mut(key) {
            Some(Bson::Array(arr)) => arr.extend(values.iter().cloned()),
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $push/$pushAll modifier to non-array at `{path}`"
                )));
            }
            _ => {
                target.insert(key, Bson::Array(values.clone()));
            }
        }
    }
    Ok(())
}

fn apply_add_to_set(
    doc: &mut BsonDocument,
    entries: &[(String, Operand)],
) -> Result<(), UpdateError> {
    for (path, value) in entries {
        let (target, key) = resolve_for_write(doc, path);
        match target.get_mut(key) {
            // candidates dedup against the destination as it grows, not
            // against each other
            Some(Bson::Array(arr)) => match value {
                Operand::Each(vs) => {
                    for v in vs {
                        if !arr.contains(v) {
                            arr.push(v.clone());
                        }
                    }
                }
                other => {
                    let v = other.to_bson();
                    if !arr.contains(&v) {
                        arr.push(v);
                    }
                }
            },
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $addToSet modifier to non-array at `{path}`"
                )));
            }
            _ => {
                let fresh = match value {
                    Operand::Each(vs) => vs.clone(),
                    other => vec![other.to_bson()],
                };
                target.insert(key, Bson::Array(fresh));
            }
        }
    }
    Ok(())
}

fn apply_pop(doc: &mut BsonDocument, entries: &[(String, i64)]) -> Result<(), UpdateError> {
    for (path, direction) in entries {
        let Some((parent, key)) = locate_for_read(doc, path) else { continue };
        match parent.get_mut(key) {
            Some(Bson::Array(arr)) => match *direction {
                1 => {
                    arr.pop();
                }
                -1 => {
                    if !arr.is_empty() {
                        arr.remove(0);
                    }
                }
                d => {
                    return Err(UpdateError::InvalidArgument(format!(
                        "invalid $pop argument `{d}` for field `{key}`"
                    )));
                }
            },
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $pop modifier to non-array at `{path}`"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_pull(
    doc: &mut BsonDocument,
    entries: &[(String, Bson)],
    matcher: &dyn ElementMatcher,
) -> Result<(), UpdateError> {
    for (path, expr) in entries {
        let Some((parent, key)) = locate_for_read(doc, path) else { continue };
        match parent.get_mut(key) {
            Some(Bson::Array(arr)) => {
                let matched = matcher.select_matching(expr, arr);
                if !matched.is_empty() {
                    arr.retain(|e| !matched.contains(e));
                }
            }
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $pull/$pullAll modifier to non-array at `{path}`"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_pull_all(
    doc: &mut BsonDocument,
    entries: &[(String, Vec<Bson>)],
) -> Result<(), UpdateError> {
    for (path, values) in entries {
        let Some((parent, key)) = locate_for_read(doc, path) else { continue };
        match parent.get_mut(key) {
            Some(Bson::Array(arr)) => arr.retain(|e| !values.contains(e)),
            Some(v) if is_truthy(v) => {
                return Err(UpdateError::InvalidOperand(format!(
                    "cannot apply $pull/$pullAll modifier to non-array at `{path}`"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_rename(doc: &mut BsonDocument, entries: &[(String, String)]) {
    for (old_path, new_path) in entries {
        let value = match locate_for_read(doc, old_path) {
            Some((parent, key)) => match parent.get(key) {
                Some(v) if is_truthy(v) => v.clone(),
                _ => continue,
            },
            None => continue,
        };
        let (target, key) = resolve_for_write(doc, new_path);
        target.insert(key, value);
        // assign first, then drop the source; renaming a path onto itself
        // therefore removes the field
        if let Some((parent, key)) = locate_for_read(doc, old_path)
            && parent.get(key).is_some_and(is_truthy)
        {
            parent.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn set_inc_unset_in_one_call() {
        let mut d = doc! {"age": 30, "info": {"visits": 1}, "unused": 1};
        let spec = UpdateSpec {
            set: vec![("name".into(), Operand::classify("alice".into()))],
            inc: vec![("age".into(), 1.0), ("info.visits".into(), 2.0)],
            unset: vec!["unused".into()],
            ..Default::default()
        };
        apply_update(&mut d, &spec, false).unwrap();
        assert_eq!(d.get_str("name").unwrap(), "alice");
        assert_eq!(d.get_f64("age").unwrap(), 31.0);
        assert_eq!(d.get_document("info").unwrap().get_f64("visits").unwrap(), 3.0);
        assert!(d.get("unused").is_none());
    }

    #[test]
    fn inc_int64_result_stored_as_double() {
        let mut d = doc! {"age": Bson::Int64(30)};
        let spec = UpdateSpec { inc: vec![("age".into(), 2.0)], ..Default::default() };
        apply_update(&mut d, &spec, false).unwrap();
        assert_eq!(d.get_f64("age").unwrap(), 32.0);
    }

    #[test]
    fn pop_on_dead_end_path_is_a_noop() {
        let mut d = doc! {"a": 5};
        let spec = UpdateSpec { pop: vec![("a.b.c".into(), 1)], ..Default::default() };
        apply_update(&mut d, &spec, false).unwrap();
        assert_eq!(d, doc! {"a": 5});
    }

    #[test]
    fn set_each_wrapper_is_assigned_verbatim() {
        let mut d = doc! {};
        let spec = UpdateSpec {
            set: vec![("a".into(), Operand::classify(Bson::Document(doc! {"$each": [1, 2]})))],
            ..Default::default()
        };
        apply_update(&mut d, &spec, false).unwrap();
        assert_eq!(d.get_document("a").unwrap(), &doc! {"$each": [1, 2]});
    }
}
