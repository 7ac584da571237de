//! go-e charger status payloads as published on the MQTT status topic.
//!
//! The charger reports every value as a JSON string (`"alw": "1"`), but
//! some firmware revisions emit bare numbers. Both are normalized to
//! their string form before interpretation.

use serde::{Deserialize, Deserializer, Serialize};

/// Decoded charger status message.
///
/// Only the fields the bridge acts on are typed; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargerStatus {
    /// "Charging allowed" flag. `"1"` means allowed. `null` decodes as
    /// an empty string.
    #[serde(deserialize_with = "scalar_or_null_as_string")]
    pub alw: String,
    /// Vehicle connection state (`"1"`..`"4"`), absent on some firmware.
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub car: Option<String>,
}

/// Vehicle connection state reported in the `car` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleState {
    /// Charger ready, no vehicle connected.
    NoVehicle,
    /// Vehicle connected and charging.
    Charging,
    /// Vehicle connected, waiting for it to draw current.
    WaitingForVehicle,
    /// Charge finished, vehicle still connected.
    Finished,
    /// Anything else, including a missing field.
    Unknown(String),
}

impl ChargerStatus {
    /// Decode a raw MQTT payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Whether the charger currently allows charging.
    pub fn charging_allowed(&self) -> bool {
        self.alw == "1"
    }

    pub fn vehicle_state(&self) -> VehicleState {
        match self.car.as_deref() {
            Some("1") => VehicleState::NoVehicle,
            Some("2") => VehicleState::Charging,
            Some("3") => VehicleState::WaitingForVehicle,
            Some("4") => VehicleState::Finished,
            Some(other) => VehicleState::Unknown(other.to_string()),
            None => VehicleState::Unknown(String::new()),
        }
    }

    /// A vehicle is plugged in and has not finished charging.
    pub fn vehicle_needs_charge(&self) -> bool {
        matches!(
            self.vehicle_state(),
            VehicleState::Charging | VehicleState::WaitingForVehicle
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

fn scalar_or_null_as_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    optional_scalar_as_string(deserializer).map(Option::unwrap_or_default)
}

fn optional_scalar_as_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}
