use serde_json::{Map, Value};

use crate::error::{EncoderError, EncoderResult};

/// Checks that a payload is a JSON object before anything tries to read
/// typed fields out of it.
pub fn ensure_document(body: &[u8]) -> EncoderResult<()> {
    serde_json::from_slice::<Map<String, Value>>(body)
        .map(|_| ())
        .map_err(|e| EncoderError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_object() {
        assert!(ensure_document(br#"{"name": "John Doe"}"#).is_ok());
    }

    #[test]
    fn rejects_truncated_object() {
        let err = ensure_document(br#"{"name": "John Doe""#).unwrap_err();
        assert!(matches!(err, EncoderError::Parse(_)));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(ensure_document(b"not-json").is_err());
        assert!(ensure_document(b"[1, 2]").is_err());
        assert!(ensure_document(b"\"text\"").is_err());
    }
}
