//! Sensor payload model
//!
//! Wraps the decoded JSON telemetry object in a thin typed interface: the
//! payload stays a generic ordered key-value structure (sensors report
//! arbitrary fields), with accessors for the handful of fields the bridge
//! cares about. Enrichment mutates the object in place; everything else
//! passes through to the broker untouched.

use crate::directory::normalize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys carrying the reporting device's identifier, in lookup order.
const ID_FIELDS: [&str; 2] = ["mac_addr", "device"];

const LOCATION_FIELD: &str = "location";
const NEIGHBOR_LIST_FIELD: &str = "neighbor_rssi";
const NEIGHBOR_MAC_FIELD: &str = "MAC";
const NEIGHBOR_LOCATION_FIELD: &str = "neighbor_location";

/// Reasons a request body cannot be bridged. All of these are the
/// client's fault and map to a client-error response.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Body is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Body parsed, but the top-level value is not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// No identifier field and no string-valued field to fall back to.
    #[error("payload carries no usable device identifier")]
    MissingDeviceId,
}

/// A decoded sensor telemetry object.
#[derive(Debug, Clone)]
pub struct SensorPayload {
    object: Map<String, Value>,
}

impl SensorPayload {
    /// Decode a request body: UTF-8 text, then a JSON object.
    pub fn decode(body: &[u8]) -> Result<Self, PayloadError> {
        let text = std::str::from_utf8(body)?;
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(object) => Ok(Self { object }),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// The normalized identifier of the reporting device.
    ///
    /// Prefers the explicit `mac_addr` and `device` keys. Senders that
    /// rely on field order get a fallback to the first string-valued
    /// field.
    pub fn device_id(&self) -> Result<String, PayloadError> {
        for key in ID_FIELDS {
            if let Some(Value::String(id)) = self.object.get(key) {
                return Ok(normalize(id));
            }
        }
        self.object
            .values()
            .find_map(Value::as_str)
            .map(normalize)
            .ok_or(PayloadError::MissingDeviceId)
    }

    /// The location label attached during enrichment, if any.
    pub fn location(&self) -> Option<&str> {
        self.object.get(LOCATION_FIELD).and_then(Value::as_str)
    }

    /// Attach the reporting device's resolved location label.
    pub fn set_location(&mut self, label: &str) {
        self.object
            .insert(LOCATION_FIELD.to_string(), Value::String(label.to_string()));
    }

    /// Mutable view of the `neighbor_rssi` entries.
    ///
    /// Entries that are not JSON objects are skipped; a payload without a
    /// neighbor list yields an empty iterator.
    pub fn neighbors_mut(&mut self) -> impl Iterator<Item = Neighbor<'_>> {
        self.object
            .get_mut(NEIGHBOR_LIST_FIELD)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
            .map(|entry| Neighbor { entry })
    }

    /// Re-serialize the (possibly enriched) object.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.object)
    }
}

/// One entry of the payload's neighbor list.
pub struct Neighbor<'a> {
    entry: &'a mut Map<String, Value>,
}

impl Neighbor<'_> {
    /// The neighbor's normalized identifier, if the entry carries one.
    pub fn mac(&self) -> Option<String> {
        self.entry
            .get(NEIGHBOR_MAC_FIELD)
            .and_then(Value::as_str)
            .map(normalize)
    }

    /// Attach the neighbor's resolved location label, or an explicit null
    /// when the lookup came up empty.
    pub fn set_location(&mut self, label: Option<&str>) {
        let value = match label {
            Some(label) => Value::String(label.to_string()),
            None => Value::Null,
        };
        self.entry.insert(NEIGHBOR_LOCATION_FIELD.to_string(), value);
    }
}
