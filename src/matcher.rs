use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

pub(crate) const MAX_IN_SET: usize = 1000;

/// Predicate delegate for the expression form of array filter removal.
///
/// `$pull` hands each filter expression here together with the current array
/// contents; the returned subsequence is what gets removed. The engine never
/// interprets the expression itself, so callers embedding a full query
/// evaluator can route it through their own implementation.
pub trait ElementMatcher {
    /// Returns the members of `candidates` matching `expr`, in input order.
    fn select_matching(&self, expr: &Bson, candidates: &[Bson]) -> Vec<Bson>;
}

/// Built-in matcher covering literal equality, `$eq`/`$ne`/`$gt`/`$gte`/
/// `$lt`/`$lte`/`$in`/`$nin` condition documents, and field conditions
/// (dotted sub-paths) against document elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterMatcher;

impl ElementMatcher for FilterMatcher {
    fn select_matching(&self, expr: &Bson, candidates: &[Bson]) -> Vec<Bson> {
        candidates.iter().filter(|c| matches_element(c, expr)).cloned().collect()
    }
}

pub(crate) fn matches_element(elem: &Bson, expr: &Bson) -> bool {
    match expr {
        Bson::Document(cond) if is_condition_doc(cond) => {
            cond.iter().all(|(op, arg)| eval_condition(elem, op, arg))
        }
        Bson::Document(fields) => match elem {
            Bson::Document(e) => fields
                .iter()
                .all(|(path, cond)| get_path(e, path).is_some_and(|v| matches_element(v, cond))),
            _ => false,
        },
        literal => elem == literal,
    }
}

fn is_condition_doc(d: &BsonDocument) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn eval_condition(elem: &Bson, op: &str, arg: &Bson) -> bool {
    match op {
        "$eq" => elem == arg,
        "$ne" => elem != arg,
        "$gt" => compare_values(elem, arg) == Ordering::Greater,
        "$gte" => compare_values(elem, arg) != Ordering::Less,
        "$lt" => compare_values(elem, arg) == Ordering::Less,
        "$lte" => compare_values(elem, arg) != Ordering::Greater,
        "$in" => in_set(elem, arg),
        "$nin" => !in_set(elem, arg),
        _ => false,
    }
}

fn in_set(elem: &Bson, arg: &Bson) -> bool {
    match arg {
        Bson::Array(vs) => vs.iter().take(MAX_IN_SET).any(|v| v == elem),
        _ => false,
    }
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return cur.get(seg);
        }
        match cur.get(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}

/// Total order over mixed values: numbers compare across integer/double
/// representations, strings and booleans compare natively, everything else
/// falls back to a rank by type.
pub(crate) fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn as_number(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        Bson::Decimal128(d) => d.to_string().parse::<f64>().ok(),
        _ => None,
    }
}

fn type_rank(v: &Bson) -> u8 {
    use Bson as B;
    match v {
        B::MinKey => 0,
        B::Null | B::Undefined => 1,
        B::Int32(_) | B::Int64(_) | B::Double(_) | B::Decimal128(_) => 2,
        B::Symbol(_) | B::String(_) => 3,
        B::Document(_) | B::DbPointer(_) => 4,
        B::Array(_) => 5,
        B::Binary(_) => 6,
        B::ObjectId(_) => 7,
        B::Boolean(_) => 8,
        B::DateTime(_) => 9,
        B::Timestamp(_) => 10,
        B::RegularExpression(_) => 11,
        B::JavaScriptCode(_) => 12,
        B::JavaScriptCodeWithScope(_) => 13,
        B::MaxKey => 14,
    }
}
