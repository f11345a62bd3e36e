//! Database row models for the remote document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::RemoteDocument;

/// A row of the `remote_documents` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDocumentRow {
    /// Remote owner id partitioning the store.
    pub owner_id: String,
    /// Collection name (e.g. `"groups"`).
    pub collection: String,
    /// JSONB array of serialized records.
    pub items: serde_json::Value,
    /// Time of the last overwrite.
    pub last_synced: DateTime<Utc>,
}

impl RemoteDocumentRow {
    /// Converts the row into a gateway document.
    ///
    /// A non-array `items` column is treated as an empty collection.
    #[must_use]
    pub fn into_document(self) -> RemoteDocument {
        let items = match self.items {
            serde_json::Value::Array(items) => items,
            other => {
                tracing::warn!(
                    owner_id = %self.owner_id,
                    collection = %self.collection,
                    kind = %json_kind(&other),
                    "remote document items are not an array"
                );
                Vec::new()
            }
        };
        RemoteDocument {
            items,
            last_synced: self.last_synced,
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(items: serde_json::Value) -> RemoteDocumentRow {
        RemoteDocumentRow {
            owner_id: "r1".to_string(),
            collection: "groups".to_string(),
            items,
            last_synced: Utc::now(),
        }
    }

    #[test]
    fn array_items_are_kept() {
        let doc = row(serde_json::json!([{"id": "g1"}, {"id": "g2"}])).into_document();
        assert_eq!(doc.items.len(), 2);
    }

    #[test]
    fn non_array_items_read_as_empty() {
        let doc = row(serde_json::json!({"id": "g1"})).into_document();
        assert!(doc.items.is_empty());
    }
}
