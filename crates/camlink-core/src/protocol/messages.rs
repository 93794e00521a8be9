//! The transform message carried inside every frame.
//!
//! The payload is a JSON object with six required keys:
//!
//! ```json
//! {"X": 1.0, "Y": 2.0, "Z": 3.0, "ROT_X": 0.5, "ROT_Y": 1.0, "ROT_Z": 1.5}
//! ```
//!
//! Position is in scene units, rotation is Euler angles in radians.  Neither is
//! range-checked or normalised; only finiteness is enforced.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::codec::{encode_frame, FrameError};

// ── Field names ───────────────────────────────────────────────────────────────

pub const FIELD_X: &str = "X";
pub const FIELD_Y: &str = "Y";
pub const FIELD_Z: &str = "Z";
pub const FIELD_ROT_X: &str = "ROT_X";
pub const FIELD_ROT_Y: &str = "ROT_Y";
pub const FIELD_ROT_Z: &str = "ROT_Z";

/// Required keys in validation order.  Errors always name the first
/// offending key in this order, which keeps log output deterministic.
pub const TRANSFORM_FIELDS: [&str; 6] = [
    FIELD_X,
    FIELD_Y,
    FIELD_Z,
    FIELD_ROT_X,
    FIELD_ROT_Y,
    FIELD_ROT_Z,
];

/// Reasons a payload is rejected.
///
/// A rejected payload never produces a partial [`TransformMessage`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not a JSON object (bad syntax, bad UTF-8, or a
    /// non-object value such as an array).
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// A required key is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A required key holds a value that is not a finite number.
    #[error("invalid numeric value in field: {0}")]
    InvalidNumeric(&'static str),
}

/// One 6-DoF camera pose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformMessage {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rot_x: f64,
    pub rot_y: f64,
    pub rot_z: f64,
}

impl TransformMessage {
    /// Builds a transform from a location and an Euler rotation.
    pub fn new(location: [f64; 3], rotation: [f64; 3]) -> Self {
        Self {
            x: location[0],
            y: location[1],
            z: location[2],
            rot_x: rotation[0],
            rot_y: rotation[1],
            rot_z: rotation[2],
        }
    }

    /// Decodes and validates a frame payload.
    ///
    /// # Errors
    ///
    /// See [`decode_transform`].
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        decode_transform(payload)
    }

    /// `(x, y, z)`.
    pub fn location(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// `(rot_x, rot_y, rot_z)` in radians.
    pub fn rotation(&self) -> [f64; 3] {
        [self.rot_x, self.rot_y, self.rot_z]
    }

    /// Serialises the transform as the JSON payload clients send.
    ///
    /// Key order is not significant on the wire.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            FIELD_X: self.x,
            FIELD_Y: self.y,
            FIELD_Z: self.z,
            FIELD_ROT_X: self.rot_x,
            FIELD_ROT_Y: self.rot_y,
            FIELD_ROT_Z: self.rot_z,
        })
        .to_string()
    }

    /// Serialises the transform and wraps it in a length-prefixed frame.
    ///
    /// # Errors
    ///
    /// Propagates [`FrameError`] from the frame encoder.
    pub fn encode_frame(&self) -> Result<Vec<u8>, FrameError> {
        encode_frame(self.to_json().as_bytes())
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes a payload into a [`TransformMessage`].
///
/// Validation runs in two ordered passes over [`TRANSFORM_FIELDS`]: first
/// every key must be present, then every value must convert to a finite
/// `f64`.  JSON numbers convert directly, and one too large for `f64` is
/// rejected for its field rather than failing the parse; strings holding a
/// decimal number are accepted as well.  `null`, booleans, arrays and objects are rejected.
///
/// This function is pure and never touches shared state.
///
/// # Errors
///
/// - [`DecodeError::MalformedJson`] if the payload is not a JSON object.
/// - [`DecodeError::MissingField`] naming the first absent key.
/// - [`DecodeError::InvalidNumeric`] naming the first non-numeric value.
///
/// # Examples
///
/// ```rust
/// use camlink_core::protocol::messages::{decode_transform, DecodeError};
///
/// let msg = decode_transform(br#"{"X":1,"Y":2,"Z":3,"ROT_X":0,"ROT_Y":0,"ROT_Z":"1.5"}"#).unwrap();
/// assert_eq!(msg.rot_z, 1.5);
///
/// let err = decode_transform(br#"{"X":1}"#).unwrap_err();
/// assert_eq!(err, DecodeError::MissingField("Y"));
/// ```
pub fn decode_transform(payload: &[u8]) -> Result<TransformMessage, DecodeError> {
    let object: Map<String, Value> =
        serde_json::from_slice(payload).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    for field in TRANSFORM_FIELDS {
        if !object.contains_key(field) {
            return Err(DecodeError::MissingField(field));
        }
    }

    let mut values = [0.0f64; 6];
    for (slot, field) in values.iter_mut().zip(TRANSFORM_FIELDS) {
        *slot = object
            .get(field)
            .and_then(coerce_finite_f64)
            .ok_or(DecodeError::InvalidNumeric(field))?;
    }

    let [x, y, z, rot_x, rot_y, rot_z] = values;
    Ok(TransformMessage {
        x,
        y,
        z,
        rot_x,
        rot_y,
        rot_z,
    })
}

fn coerce_finite_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
