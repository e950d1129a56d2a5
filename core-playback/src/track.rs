//! Track descriptors built from host items.

use crate::error::{PlayerError, Result};
use bridge_traits::{AudioSource, MediaItem, PlaybackMetadata};
use serde_json::{Map, Value};
use std::time::Duration;

/// A queued track.
///
/// Only `id` and `url` are interpreted. The host's original object is kept
/// so queries return exactly what was added.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub source: AudioSource,
    pub metadata: PlaybackMetadata,
    raw: Map<String, Value>,
}

impl Track {
    /// Validate one host item.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(raw) = value else {
            return Err(PlayerError::InvalidTrack(
                "track must be an object".to_string(),
            ));
        };

        let id = match raw.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(PlayerError::InvalidTrack(
                    "track requires a non-empty string id".to_string(),
                ))
            }
        };

        let url = resource_uri(raw.get("url")).ok_or_else(|| {
            PlayerError::InvalidTrack(format!("track {} requires a url", id))
        })?;

        let metadata = PlaybackMetadata {
            title: string_field(&raw, "title"),
            artist: string_field(&raw, "artist"),
            album: string_field(&raw, "album"),
            artwork: resource_uri(raw.get("artwork")),
            duration: raw
                .get("duration")
                .and_then(Value::as_f64)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            rating: raw.get("rating").cloned(),
        };

        Ok(Self {
            id,
            source: AudioSource::from_uri(url),
            metadata,
            raw,
        })
    }

    /// Validate a batch. An empty batch is invalid.
    pub fn from_values(values: Vec<Value>) -> Result<Vec<Self>> {
        if values.is_empty() {
            return Err(PlayerError::InvalidTrack("no tracks given".to_string()));
        }
        values.into_iter().map(Self::from_value).collect()
    }

    pub fn url(&self) -> &str {
        self.source.uri()
    }

    pub fn is_remote(&self) -> bool {
        self.source.is_remote()
    }

    /// The host item this track was built from.
    pub fn to_value(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// Engine-facing copy.
    pub fn to_media_item(&self) -> MediaItem {
        MediaItem::new(self.id.clone(), self.source.clone()).with_metadata(self.metadata.clone())
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Resources arrive either as a plain string or as a bundled asset object
/// carrying a `uri`.
fn resource_uri(value: Option<&Value>) -> Option<String> {
    let uri = match value? {
        Value::String(uri) => uri.as_str(),
        Value::Object(asset) => asset.get("uri")?.as_str()?,
        _ => return None,
    };
    (!uri.is_empty()).then(|| uri.to_string())
}
