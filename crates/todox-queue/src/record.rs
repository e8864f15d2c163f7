use serde::Serialize;
use serde::de::DeserializeOwned;
use todox_model::TodoDocument;

/// A value that can sit in the offline queue.
///
/// The queue keeps at most one record per id; saving a record with an id
/// already present replaces it.
pub trait QueueRecord: Serialize + DeserializeOwned {
    fn record_id(&self) -> &str;
}

impl QueueRecord for TodoDocument {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// JSON objects are keyed by their string `id` field; anything else has an
/// empty id and is rejected on save.
impl QueueRecord for serde_json::Value {
    fn record_id(&self) -> &str {
        self.get("id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_record_id() {
        assert_eq!(json!({"id": "abc", "x": 1}).record_id(), "abc");
        assert_eq!(json!({"id": 7}).record_id(), "");
        assert_eq!(json!([1, 2]).record_id(), "");
    }

    #[test]
    fn test_document_record_id() {
        assert_eq!(TodoDocument::new("doc-1", "A").record_id(), "doc-1");
    }
}
