use bson::{Bson, Document as BsonDocument};

/// Splits `path` on `.` and walks every segment but the last, installing an
/// empty subdocument wherever an intermediate is missing or holds a
/// non-document value, so the final segment can be written unconditionally.
pub(crate) fn resolve_for_write<'a>(
    doc: &'a mut BsonDocument,
    path: &'a str,
) -> (&'a mut BsonDocument, &'a str) {
    match path.rsplit_once('.') {
        None => (doc, path),
        Some((prefix, last)) => {
            let mut cur = doc;
            for seg in prefix.split('.') {
                cur = ensure_record(cur, seg);
            }
            (cur, last)
        }
    }
}

/// Returns the subdocument under `key`, installing an empty one first when
/// the slot is missing or holds a non-document value.
pub(crate) fn ensure_record<'a>(parent: &'a mut BsonDocument, key: &str) -> &'a mut BsonDocument {
    if !matches!(parent.get(key), Some(Bson::Document(_))) {
        parent.insert(key, BsonDocument::new());
    }
    match parent.get_mut(key) {
        Some(Bson::Document(d)) => d,
        _ => unreachable!(),
    }
}

/// Walks `path` without creating anything, stopping at the first segment
/// whose value is missing or falsy; lookups of the returned key then find
/// nothing, so read-then-mutate operators no-op. Returns `None` when a
/// truthy non-document value blocks the descent outright.
pub(crate) fn locate_for_read<'a>(
    doc: &'a mut BsonDocument,
    path: &'a str,
) -> Option<(&'a mut BsonDocument, &'a str)> {
    let mut cur = doc;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return Some((cur, seg));
        }
        match cur.get(seg) {
            Some(Bson::Document(_)) => {}
            Some(v) if is_truthy(v) => return None,
            _ => return Some((cur, seg)),
        }
        cur = match cur.get_mut(seg) {
            Some(Bson::Document(d)) => d,
            _ => unreachable!(),
        };
    }
    None
}

/// Absence test used by the read descent and the no-op rules: null,
/// undefined, `false`, numeric zero, NaN, and the empty string all count as
/// absent. Arrays and documents never do, even when empty.
pub(crate) fn is_truthy(v: &Bson) -> bool {
    match v {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0 && !f.is_nan(),
        Bson::String(s) => !s.is_empty(),
        _ => true,
    }
}
