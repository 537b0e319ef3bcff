//! Frames, detected objects and their visual attributes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::Timestamp;

/// A sampled video frame on a source's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub source_id: String,
    /// Position within the processed fragment, in seconds.
    pub timestamp_sec: f64,
    /// Absolute time of the frame on the source timeline.
    pub at: Timestamp,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Person,
    Transport,
}

/// Pixel-space bounding box of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A detected object belonging to exactly one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: Uuid,
    pub frame_id: Uuid,
    pub object_type: ObjectType,
    pub bbox: BBox,
    /// Detector-assigned identity linking detections of the same physical
    /// entity across consecutive frames.
    pub track_id: Option<i64>,
}

/// An HSV colour signature. Hue in degrees `[0, 360)`, saturation and value
/// in `[0, 1]`. Serialized to the store as `"h,s,v"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvColor {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl HsvColor {
    pub fn encode(&self) -> String {
        format!("{:.1},{:.3},{:.3}", self.h, self.s, self.v)
    }

    /// Parse the `"h,s,v"` store format. Returns `None` for anything that
    /// does not decode cleanly; a missing signature just means the colour
    /// signal is unavailable for scoring.
    pub fn decode(raw: &str) -> Option<HsvColor> {
        let mut parts = raw.split(',');
        let h = parts.next()?.trim().parse().ok()?;
        let s = parts.next()?.trim().parse().ok()?;
        let v = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(HsvColor { h, s, v })
    }
}

/// 1:1 attributes of a TRANSPORT object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportAttributes {
    pub id: Uuid,
    pub object_id: Uuid,
    pub color_hsv: String,
    pub license_plate: Option<String>,
}

/// 1:1 attributes of a PERSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAttributes {
    pub id: Uuid,
    pub object_id: Uuid,
    pub upper_color_hsv: Option<String>,
    pub lower_color_hsv: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_round_trips_through_store_strings() {
        assert_eq!(ObjectType::Person.to_string(), "PERSON");
        assert_eq!("TRANSPORT".parse::<ObjectType>(), Ok(ObjectType::Transport));
    }

    #[test]
    fn hsv_encode_decode() {
        let c = HsvColor {
            h: 212.5,
            s: 0.75,
            v: 0.5,
        };
        let decoded = HsvColor::decode(&c.encode()).unwrap();
        assert!((decoded.h - 212.5).abs() < 0.1);
        assert!((decoded.s - 0.75).abs() < 0.001);
    }

    #[test]
    fn hsv_decode_rejects_garbage() {
        assert!(HsvColor::decode("").is_none());
        assert!(HsvColor::decode("1,2").is_none());
        assert!(HsvColor::decode("a,b,c").is_none());
        assert!(HsvColor::decode("1,2,3,4").is_none());
    }
}
