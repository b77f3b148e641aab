use crate::errors::UpdateError;
use crate::update::UpdateSpec;
use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data, metadata: Metadata::new() }
    }

    /// Applies modifier operators to the document body in place and touches
    /// `updated_at`.
    ///
    /// # Errors
    /// Returns an error if a modifier hits an existing value of the wrong
    /// shape or carries a payload outside its accepted domain. Families
    /// applied before the failure are kept.
    pub fn apply(&mut self, spec: &UpdateSpec, upsert: bool) -> Result<(), UpdateError> {
        crate::update::apply_update(&mut self.data, spec, upsert)?;
        self.metadata.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the whole document body, as a non-modifier update does.
    pub fn replace(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.metadata.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn apply_touches_updated_at() {
        let mut d = Document::new(doc! {"n": 1});
        let before = d.metadata.updated_at;
        let spec = UpdateSpec { inc: vec![("n".into(), 1.0)], ..Default::default() };
        d.apply(&spec, false).unwrap();
        assert_eq!(d.data.get_f64("n").unwrap(), 2.0);
        assert!(d.metadata.updated_at >= before);
    }

    #[test]
    fn replace_swaps_body() {
        let mut d = Document::new(doc! {"a": 1});
        d.replace(doc! {"b": 2});
        assert!(d.data.get("a").is_none());
        assert_eq!(d.data.get_i32("b").unwrap(), 2);
    }
}
