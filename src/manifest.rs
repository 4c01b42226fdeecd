//! Manifest support for TextBundle packages
//!
//! # Manifest Scope
//!
//! The manifest (`info.json`) carries four format-level fields:
//! - `version`: format revision (2 is current, a missing key means 1)
//! - `type`: content-type identifier of the `text.*` payload
//! - `transient`: whether the package is a short-lived exchange container
//! - `creatorIdentifier`: bundle identifier of the producing application
//!
//! **Every other top-level key is application-specific metadata.** By
//! convention each application stores a nested object under its own
//! reverse-domain identifier and keeps a `version` inside it:
//!
//! ```text
//! {
//!   "version": 2,
//!   "type": "net.daringfireball.markdown",
//!   "transient": false,
//!   "creatorIdentifier": "com.example.writer",
//!   "com.example.writer": { "version": 9, "customKey": "aCustomValue" }
//! }
//! ```
//!
//! Application entries are opaque here: they are kept as
//! [`serde_json::Value`] and written back unchanged.
//!
//! # Usage
//!
//! ```
//! use textbundle_rs::Manifest;
//! # use textbundle_rs::Result;
//!
//! # fn main() -> Result<()> {
//! let mut manifest = Manifest::from_json(br#"{"version": 2, "transient": true}"#)?;
//! manifest.set_application_value("com.example.app", "note", "x".into());
//!
//! let json = manifest.to_json()?;
//! assert_eq!(Manifest::from_json(&json)?, manifest);
//! # Ok(())
//! # }
//! ```

use crate::content_type;
use crate::error::{Result, TextBundleError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Manifest file name within the package
pub const MANIFEST_FILE_NAME: &str = "info.json";

/// Format revision written by default
pub const CURRENT_VERSION: u32 = 2;

/// Format revision implied by a missing `version` key or a missing manifest
pub const LEGACY_VERSION: u32 = 1;

const KEY_VERSION: &str = "version";
const KEY_TYPE: &str = "type";
const KEY_TRANSIENT: &str = "transient";
const KEY_CREATOR: &str = "creatorIdentifier";

/// Keys owned by the format; they never land in application metadata
pub const RESERVED_KEYS: [&str; 4] = [KEY_VERSION, KEY_TYPE, KEY_TRANSIENT, KEY_CREATOR];

/// TextBundle manifest structure
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Format revision
    pub version: u32,

    /// Content-type identifier of the text payload
    pub content_type: String,

    /// Short-lived exchange container
    pub transient: bool,

    /// Reverse-domain identifier of the producing application
    pub creator_identifier: Option<String>,

    /// Application-specific entries, keyed by application identifier
    pub application_metadata: Map<String, Value>,
}

/// Wire form: recognized keys are optional, everything else is collected
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    version: Option<u32>,
    #[serde(rename = "type")]
    content_type: Option<String>,
    transient: Option<bool>,
    creator_identifier: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            content_type: content_type::PLAIN_TEXT.to_string(),
            transient: false,
            creator_identifier: None,
            application_metadata: Map::new(),
        }
    }
}

impl Manifest {
    /// Create a current-version manifest for the given payload type
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    /// Defaults for a package without `info.json`
    pub fn legacy(content_type: impl Into<String>) -> Self {
        Self {
            version: LEGACY_VERSION,
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    /// Parse from JSON
    ///
    /// A missing `type` falls back to plain text.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Self::from_json_with_default_type(data, content_type::PLAIN_TEXT)
    }

    /// Parse from JSON, using `default_type` when the `type` key is absent
    pub(crate) fn from_json_with_default_type(data: &[u8], default_type: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_slice(data).map_err(|e| {
            TextBundleError::InvalidFormat(format!("Invalid {}: {}", MANIFEST_FILE_NAME, e))
        })?;

        Ok(Self {
            version: raw.version.unwrap_or(LEGACY_VERSION),
            content_type: raw
                .content_type
                .unwrap_or_else(|| default_type.to_string()),
            transient: raw.transient.unwrap_or(false),
            creator_identifier: raw.creator_identifier,
            application_metadata: raw.extra,
        })
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(TextBundleError::from)
    }

    /// Whether writing no `info.json` at all would read back as this manifest
    ///
    /// `extension` is the extension the payload is written under.
    pub fn is_implied_by(&self, extension: &str) -> bool {
        self.version == LEGACY_VERSION
            && !self.transient
            && self.creator_identifier.is_none()
            && self.application_metadata.is_empty()
            && self.content_type == content_type::default_type_for(Some(extension))
    }

    /// Nested metadata object stored under an application identifier
    pub fn application_metadata_for(&self, identifier: &str) -> Option<&Map<String, Value>> {
        self.application_metadata
            .get(identifier)
            .and_then(Value::as_object)
    }

    /// Set `key` inside the object stored under `identifier`
    ///
    /// A missing or non-object entry is replaced with a fresh object.
    pub fn set_application_value(&mut self, identifier: &str, key: &str, value: Value) {
        let entry = self
            .application_metadata
            .entry(identifier.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// Remove `key` from the object stored under `identifier`
    pub fn remove_application_value(&mut self, identifier: &str, key: &str) -> Option<Value> {
        self.application_metadata
            .get_mut(identifier)
            .and_then(Value::as_object_mut)
            .and_then(|map| map.remove(key))
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let extra: Vec<_> = self
            .application_metadata
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        let fixed = 3 + usize::from(self.creator_identifier.is_some());

        let mut map = serializer.serialize_map(Some(fixed + extra.len()))?;
        map.serialize_entry(KEY_VERSION, &self.version)?;
        map.serialize_entry(KEY_TYPE, &self.content_type)?;
        map.serialize_entry(KEY_TRANSIENT, &self.transient)?;
        if let Some(creator) = &self.creator_identifier {
            map.serialize_entry(KEY_CREATOR, creator)?;
        }
        for (key, value) in extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_manifest_creation() {
        let manifest = Manifest::new(content_type::MARKDOWN);

        assert_eq!(manifest.version, CURRENT_VERSION);
        assert_eq!(manifest.content_type, content_type::MARKDOWN);
        assert!(!manifest.transient);
        assert!(manifest.creator_identifier.is_none());
        assert!(manifest.application_metadata.is_empty());
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let manifest = Manifest::from_json(br#"{"type": "public.html"}"#).unwrap();
        assert_eq!(manifest.version, LEGACY_VERSION);
        assert_eq!(manifest.content_type, content_type::HTML);
    }

    #[test]
    fn test_missing_type_uses_default() {
        let manifest = Manifest::from_json(b"{}").unwrap();
        assert_eq!(manifest.content_type, content_type::PLAIN_TEXT);

        let manifest =
            Manifest::from_json_with_default_type(b"{}", content_type::MARKDOWN).unwrap();
        assert_eq!(manifest.content_type, content_type::MARKDOWN);
    }

    #[test]
    fn test_unknown_keys_fold_into_metadata() {
        let manifest = Manifest::from_json(
            br#"{"version": 2, "sourceURL": "https://example.com", "com.example.app": [1, 2]}"#,
        )
        .unwrap();

        assert_eq!(manifest.application_metadata.len(), 2);
        assert_eq!(
            manifest.application_metadata["sourceURL"],
            json!("https://example.com")
        );

        let reparsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn test_example_document_roundtrip() {
        let data = br#"{"version":2,"type":"net.daringfireball.markdown","transient":true,"com.example.app":{"version":1,"note":"x"}}"#;
        let manifest = Manifest::from_json(data).unwrap();

        assert_eq!(manifest.version, 2);
        assert_eq!(manifest.content_type, content_type::MARKDOWN);
        assert!(manifest.transient);
        assert_eq!(
            manifest.application_metadata["com.example.app"]["note"],
            json!("x")
        );

        let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_invalid_documents() {
        let documents: [&[u8]; 4] = [b"not json", b"[1, 2]", b"\"text\"", br#"{"version": "2"}"#];
        for data in documents {
            match Manifest::from_json(data) {
                Err(TextBundleError::InvalidFormat(_)) => {}
                other => panic!("expected InvalidFormat for {:?}, got {:?}", data, other),
            }
        }

        assert!(Manifest::from_json(br#"{"transient": "yes"}"#).is_err());
        assert!(Manifest::from_json(br#"{"version": -1}"#).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let mut manifest = Manifest::new(content_type::MARKDOWN);
        manifest.creator_identifier = Some("com.example.writer".to_string());
        manifest.set_application_value("com.example.writer", "version", json!(9));

        let value: Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "version": 2,
                "type": "net.daringfireball.markdown",
                "transient": false,
                "creatorIdentifier": "com.example.writer",
                "com.example.writer": {"version": 9}
            })
        );
    }

    #[test]
    fn test_reserved_keys_win_over_metadata() {
        let mut manifest = Manifest::default();
        manifest
            .application_metadata
            .insert("version".to_string(), json!("bogus"));

        let value: Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], json!(CURRENT_VERSION));
    }

    #[test]
    fn test_application_value_helpers() {
        let mut manifest = Manifest::default();
        assert!(manifest.application_metadata_for("com.example.app").is_none());

        manifest.set_application_value("com.example.app", "version", json!(3));
        manifest.set_application_value("com.example.app", "theme", json!("dark"));
        let app = manifest.application_metadata_for("com.example.app").unwrap();
        assert_eq!(app.len(), 2);

        assert_eq!(
            manifest.remove_application_value("com.example.app", "theme"),
            Some(json!("dark"))
        );
        assert_eq!(manifest.remove_application_value("com.example.app", "theme"), None);

        // A scalar entry is replaced rather than merged into
        manifest
            .application_metadata
            .insert("org.other".to_string(), json!(7));
        manifest.set_application_value("org.other", "k", json!(true));
        assert_eq!(manifest.application_metadata["org.other"], json!({"k": true}));
    }

    #[test]
    fn test_is_implied_by() {
        let manifest = Manifest::legacy(content_type::MARKDOWN);
        assert!(manifest.is_implied_by("md"));
        assert!(!manifest.is_implied_by("txt"));

        let mut transient = manifest.clone();
        transient.transient = true;
        assert!(!transient.is_implied_by("md"));

        assert!(!Manifest::new(content_type::MARKDOWN).is_implied_by("md"));
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_manifest_roundtrip(
            version in 1u32..10,
            transient in any::<bool>(),
            creator in proptest::option::of("[a-z]{2,5}\\.[a-z]{2,8}"),
            metadata in prop::collection::btree_map("[a-z]{2,5}\\.[a-z]{2,8}", json_value(), 0..4),
        ) {
            let manifest = Manifest {
                version,
                content_type: content_type::MARKDOWN.to_string(),
                transient,
                creator_identifier: creator,
                application_metadata: metadata.into_iter().collect(),
            };

            let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
            prop_assert_eq!(parsed, manifest);
        }
    }
}
