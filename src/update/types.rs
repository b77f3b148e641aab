use bson::{Bson, Document as BsonDocument};

// Safety limits applied when parsing update specifications
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_PATH_LEN: usize = 1024;
pub(crate) const MAX_UPDATE_FIELDS: usize = 128;

/// An operator payload, classified once at the parse boundary so handlers
/// match on shape instead of re-inspecting BSON at every step.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Bson),
    Array(Vec<Bson>),
    Record(BsonDocument),
    /// An `{"$each": [..]}` wrapper. Recognized only when the `$each` key
    /// holds an array; any other document-shaped payload is a `Record`.
    Each(Vec<Bson>),
}

impl Operand {
    #[must_use]
    pub fn classify(value: Bson) -> Self {
        match value {
            Bson::Document(mut d) => {
                if matches!(d.get("$each"), Some(Bson::Array(_))) {
                    match d.remove("$each") {
                        Some(Bson::Array(vs)) => Self::Each(vs),
                        _ => unreachable!(),
                    }
                } else {
                    Self::Record(d)
                }
            }
            Bson::Array(vs) => Self::Array(vs),
            other => Self::Scalar(other),
        }
    }

    #[must_use]
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Array(vs) => Bson::Array(vs.clone()),
            Self::Record(d) => Bson::Document(d.clone()),
            Self::Each(vs) => {
                let mut wrapper = BsonDocument::new();
                wrapper.insert("$each", Bson::Array(vs.clone()));
                Bson::Document(wrapper)
            }
        }
    }
}

/// A parsed update specification: one `(path, payload)` list per operator
/// family. Families absent from the source update stay empty and their
/// handlers never run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateSpec {
    pub set: Vec<(String, Operand)>,
    pub unset: Vec<String>,
    pub inc: Vec<(String, f64)>,
    pub push: Vec<(String, Operand)>,
    pub push_all: Vec<(String, Vec<Bson>)>,
    pub add_to_set: Vec<(String, Operand)>,
    pub pop: Vec<(String, i64)>,
    pub pull: Vec<(String, Bson)>,
    pub pull_all: Vec<(String, Vec<Bson>)>,
    pub rename: Vec<(String, String)>,
    pub set_on_insert: Vec<(String, Operand)>,
}

impl UpdateSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.push.is_empty()
            && self.push_all.is_empty()
            && self.add_to_set.is_empty()
            && self.pop.is_empty()
            && self.pull.is_empty()
            && self.pull_all.is_empty()
            && self.rename.is_empty()
            && self.set_on_insert.is_empty()
    }
}
