//! Request DTOs for the operator API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

/// Largest gallery a single preload request may name.
pub const MAX_PRELOAD_REFERENCES: usize = 500;

/// Query for `GET /resolve`
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveQuery {
    /// Raw reference; absent means empty
    #[serde(default)]
    pub reference: Option<String>,
}

/// Request body for `POST /preload`
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    /// Gallery references in display order
    pub urls: Vec<String>,
    /// Only warm the above-the-fold head of the list
    #[serde(default)]
    pub priority: bool,
}

impl PreloadRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.urls.len() > MAX_PRELOAD_REFERENCES {
            return Some(format!(
                "At most {} references can be preloaded at once",
                MAX_PRELOAD_REFERENCES
            ));
        }
        None
    }
}

/// Request body for `POST /load`
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_request_deserialize() {
        let json = r#"{"urls": ["a.jpg", "b.mp4"]}"#;
        let req: PreloadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.urls, vec!["a.jpg", "b.mp4"]);
        assert!(!req.priority);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_preload_request_too_large() {
        let req = PreloadRequest {
            urls: vec!["a.jpg".to_string(); MAX_PRELOAD_REFERENCES + 1],
            priority: true,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_load_request_reference_optional() {
        let req: LoadRequest = serde_json::from_str("{}").unwrap();
        assert!(req.reference.is_none());

        let req: LoadRequest = serde_json::from_str(r#"{"reference": "x.jpg"}"#).unwrap();
        assert_eq!(req.reference.as_deref(), Some("x.jpg"));
    }
}
