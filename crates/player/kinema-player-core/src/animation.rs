//! Decoded animation metadata and the library of animations a player may switch between.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};

/// Named sub-range of the timeline. `time` and `duration` are in frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub time: f32,
    #[serde(default)]
    pub duration: f32,
}

impl Marker {
    pub fn new(name: impl Into<String>, time: f32, duration: f32) -> Self {
        Self {
            name: name.into(),
            time,
            duration,
        }
    }

    /// Last frame covered by the marker.
    #[inline]
    pub fn end(&self) -> f32 {
        self.time + self.duration
    }
}

/// Metadata of a decoded animation. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub total_frames: f32,
    /// Seconds.
    pub duration: f32,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl Animation {
    pub fn new(total_frames: f32, duration: f32) -> Self {
        Self {
            total_frames,
            duration,
            markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    /// Highest addressable frame.
    #[inline]
    pub fn last_frame(&self) -> f32 {
        (self.total_frames - 1.0).max(0.0)
    }

    /// Frames per millisecond at speed 1.
    #[inline]
    pub fn frames_per_ms(&self) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.total_frames / (self.duration * 1000.0)
    }

    /// First marker with the given name; later duplicates are shadowed.
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    pub fn marker_names(&self) -> Vec<String> {
        self.markers.iter().map(|m| m.name.clone()).collect()
    }

    pub(crate) fn check(&self) -> Result<()> {
        if !(self.total_frames.is_finite() && self.total_frames >= 1.0) {
            return Err(PlayerError::Decode {
                reason: format!("total_frames must be >= 1, got {}", self.total_frames),
            });
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(PlayerError::Decode {
                reason: format!("duration must be > 0, got {}", self.duration),
            });
        }
        Ok(())
    }
}

/// Turns raw bytes into animation metadata. Implemented by the host's file/container parser.
pub trait AnimationDecoder {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<Animation, String>;
}

/// Decoder for the plain metadata document `{ "totalFrames", "duration", "markers" }`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataDecoder;

impl AnimationDecoder for MetadataDecoder {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<Animation, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

/// Animations registered with a player, keyed by id.
#[derive(Debug, Default)]
pub struct AnimationLibrary {
    items: HashMap<String, Animation>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous entry.
    pub fn insert(&mut self, id: impl Into<String>, animation: Animation) -> Option<Animation> {
        self.items.insert(id.into(), animation)
    }

    pub fn get(&self, id: &str) -> Option<&Animation> {
        self.items.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Animation> {
        self.items.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_marker_wins_on_duplicate_names() {
        let anim = Animation::new(100.0, 2.0).with_markers(vec![
            Marker::new("loop", 10.0, 5.0),
            Marker::new("loop", 50.0, 5.0),
        ]);
        assert_eq!(anim.marker("loop").map(|m| m.time), Some(10.0));
        assert!(anim.marker("missing").is_none());
    }

    #[test]
    fn frames_per_ms_uses_duration_seconds() {
        let anim = Animation::new(60.0, 1.0);
        assert!((anim.frames_per_ms() - 0.06).abs() < 1e-6);
        assert_eq!(anim.last_frame(), 59.0);
    }

    #[test]
    fn metadata_decoder_reads_camel_case() {
        let raw = br#"{"totalFrames": 30, "duration": 0.5, "markers": [{"name": "a", "time": 2}]}"#;
        let anim = MetadataDecoder.decode(raw).unwrap();
        assert_eq!(anim.total_frames, 30.0);
        assert_eq!(anim.markers[0].duration, 0.0);
    }

    #[test]
    fn check_rejects_empty_timelines() {
        assert!(Animation::new(0.0, 1.0).check().is_err());
        assert!(Animation::new(10.0, 0.0).check().is_err());
        assert!(Animation::new(10.0, 1.0).check().is_ok());
    }

    #[test]
    fn library_replaces_by_id() {
        let mut lib = AnimationLibrary::new();
        assert!(lib.insert("a", Animation::new(10.0, 1.0)).is_none());
        assert!(lib.insert("a", Animation::new(20.0, 1.0)).is_some());
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.get("a").map(|a| a.total_frames), Some(20.0));
    }
}
