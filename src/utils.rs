use crate::meta::ObjectMeta;
use crate::tracker::GVK;
use crate::{Error, Result};
use serde_json::Value;

/// Pluralize a Kind name to its lowercase resource plural form.
///
/// - Words ending in s, x, z, ch, sh get -es (eg. boxes)
/// - Words ending in consonant+y get -ies (eg. policies)
/// - All other words get -s
pub fn pluralize(kind: &str) -> String {
    let word = kind.to_ascii_lowercase();

    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }

    if word.ends_with('y') {
        if let Some(c) = word.chars().nth(word.len() - 2) {
            if !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') {
                let mut chars = word.chars();
                chars.next_back();
                return format!("{}ies", chars.as_str());
            }
        }
    }

    format!("{word}s")
}

pub fn extract_metadata(object: &Value) -> Result<ObjectMeta> {
    let meta_value = object
        .get("metadata")
        .ok_or_else(|| Error::Invalid("object missing metadata field".to_string()))?;

    serde_json::from_value(meta_value.clone())
        .map_err(|e| Error::Invalid(format!("failed to parse metadata: {}", e)))
}

pub fn extract_gvk(value: &Value) -> Result<GVK> {
    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Invalid("missing apiVersion".to_string()))?;

    let kind = value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Invalid("missing kind".to_string()))?;

    let (group, version) = if let Some((g, v)) = api_version.split_once('/') {
        (g.to_string(), v.to_string())
    } else {
        ("".to_string(), api_version.to_string())
    };

    Ok(GVK::new(group, version, kind))
}

/// Fill in the server-assigned metadata fields an incoming object may omit.
///
/// For cluster-scoped resources (empty namespace) the namespace is cleared;
/// for namespaced resources it is defaulted from the request.
pub fn ensure_metadata(meta: &mut ObjectMeta, namespace: &str) {
    if namespace.is_empty() {
        meta.namespace = None;
    } else if meta.namespace.is_none() {
        meta.namespace = Some(namespace.to_string());
    }
    if meta.creation_timestamp.is_none() {
        meta.creation_timestamp = Some(chrono::Utc::now());
    }
    if meta.uid.is_none() {
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
    }
}
