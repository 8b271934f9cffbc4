//! Detection metadata carried on the auxiliary data channel
//!
//! The vision device publishes one JSON object per inference cycle:
//!
//! ```json
//! { "objects": [
//!     { "name": "face", "x": 0.1, "y": 0.2, "width": 0.3, "height": 0.3, "score": 0.9, "joy": 0.7 },
//!     { "name": "object", "class_name": "cat", "x": 0.4, "y": 0.1, "width": 0.8, "height": 0.6, "score": 0.6 },
//!     { "name": "class", "class_name": "tabby", "score": 0.4 }
//! ] }
//! ```
//!
//! Items are decoded one by one so that a single unknown or broken entry never
//! takes the rest of the batch down with it.

use crate::error::{AiyViewError, AiyViewResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Normalized bounding box, fractions of the frame size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge as a fraction of frame width
    pub x: f64,
    /// Top edge as a fraction of frame height
    pub y: f64,
    /// Width fraction
    pub width: f64,
    /// Height fraction
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box from normalized fractions
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A face found by the face detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Face location
    #[serde(flatten)]
    pub bounding_box: BoundingBox,
    /// Detection confidence in `[0, 1]`
    pub score: f64,
    /// Joy score in `[0, 1]`
    pub joy: f64,
}

/// An object found by the object detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    /// Label of the detected class
    pub class_name: String,
    /// Object location
    #[serde(flatten)]
    pub bounding_box: BoundingBox,
    /// Detection confidence in `[0, 1]`
    pub score: f64,
}

/// A scene-level classification without a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    /// Label of the class
    pub class_name: String,
    /// Classification probability in `[0, 1]`
    pub score: f64,
}

/// One entry of a detection batch, discriminated by its `name` field
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionItem {
    /// `name: "face"`
    Face(FaceDetection),
    /// `name: "object"`
    Object(ObjectDetection),
    /// `name: "class"`
    Class(ClassLabel),
    /// An item whose `name` is not one of the known kinds
    Unknown {
        /// The unrecognized discriminator, if one was present
        name: Option<String>,
    },
    /// A known kind whose fields could not be decoded
    Invalid {
        /// The item's discriminator
        name: String,
        /// Decoding failure
        reason: String,
    },
}

impl DetectionItem {
    /// Decode a single item, never failing: bad input becomes
    /// [`DetectionItem::Unknown`] or [`DetectionItem::Invalid`].
    pub fn from_value(value: Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        let decoded = match name.as_deref() {
            Some("face") => serde_json::from_value(value).map(DetectionItem::Face),
            Some("object") => serde_json::from_value(value).map(DetectionItem::Object),
            Some("class") => serde_json::from_value(value).map(DetectionItem::Class),
            _ => return DetectionItem::Unknown { name },
        };

        decoded.unwrap_or_else(|e| DetectionItem::Invalid {
            name: name.unwrap_or_default(),
            reason: e.to_string(),
        })
    }

    /// Wire discriminator of this item
    pub fn kind(&self) -> &str {
        match self {
            DetectionItem::Face(_) => "face",
            DetectionItem::Object(_) => "object",
            DetectionItem::Class(_) => "class",
            DetectionItem::Unknown { name } => name.as_deref().unwrap_or("<missing>"),
            DetectionItem::Invalid { name, .. } => name,
        }
    }

    /// Whether the item can be drawn
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            DetectionItem::Face(_) | DetectionItem::Object(_) | DetectionItem::Class(_)
        )
    }
}

#[derive(Serialize)]
#[serde(tag = "name", rename_all = "lowercase")]
enum WireItem<'a> {
    Face(&'a FaceDetection),
    Object(&'a ObjectDetection),
    Class(&'a ClassLabel),
}

#[derive(Serialize)]
struct UnrecognizedItem<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl Serialize for DetectionItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DetectionItem::Face(face) => WireItem::Face(face).serialize(serializer),
            DetectionItem::Object(object) => WireItem::Object(object).serialize(serializer),
            DetectionItem::Class(class) => WireItem::Class(class).serialize(serializer),
            DetectionItem::Unknown { name } => UnrecognizedItem {
                name: name.as_deref(),
            }
            .serialize(serializer),
            DetectionItem::Invalid { name, .. } => UnrecognizedItem {
                name: Some(name.as_str()),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DetectionItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(DetectionItem::from_value)
    }
}

/// One inference cycle worth of detections, plus the envelope the device adds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected items in the order the device reported them
    pub objects: Vec<DetectionItem>,
    /// API name reported by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// API version reported by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Item count reported by the device
    #[serde(
        default,
        rename = "numObjects",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_objects: Option<u32>,
    /// Score threshold applied by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Seconds since the Unix epoch when the cycle finished
    #[serde(default, rename = "timeStamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Seconds spent since the previous cycle
    #[serde(
        default,
        rename = "inferenceTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub inference_time: Option<f64>,
}

impl DetectionResult {
    /// Create a result holding only the given items
    pub fn new(objects: Vec<DetectionItem>) -> Self {
        Self {
            objects,
            ..Default::default()
        }
    }

    /// Parse a data channel payload
    pub fn from_json(payload: &str) -> AiyViewResult<Self> {
        serde_json::from_str(payload).map_err(|e| AiyViewError::MalformedMetadata {
            reason: e.to_string(),
        })
    }

    /// Parse a raw data channel payload
    pub fn from_slice(payload: &[u8]) -> AiyViewResult<Self> {
        serde_json::from_slice(payload).map_err(|e| AiyViewError::MalformedMetadata {
            reason: e.to_string(),
        })
    }

    /// Serialize back to the wire format
    pub fn to_json(&self) -> AiyViewResult<String> {
        serde_json::to_string(self).map_err(|e| AiyViewError::MalformedMetadata {
            reason: e.to_string(),
        })
    }

    /// Number of items in the batch
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the batch has no items
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Items that cannot be drawn
    pub fn unrecognized(&self) -> impl Iterator<Item = &DetectionItem> {
        self.objects.iter().filter(|item| !item.is_renderable())
    }
}

/// Receiver of parsed detection results.
///
/// This is the overlay's single entry point; the signaling side only ever
/// talks to it through this trait.
pub trait DetectionSink {
    /// Handle one detection result
    fn on_detection(&mut self, result: DetectionResult);
}

impl<F> DetectionSink for F
where
    F: FnMut(DetectionResult),
{
    fn on_detection(&mut self, result: DetectionResult) {
        self(result)
    }
}
