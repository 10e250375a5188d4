//! Moisture Routes
//!
//! The sensor posts readings to `/api`; the mobile client polls `/moisture`.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use plant_storage::PLANT_ID;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ApiError;
use crate::{telemetry, SharedState};

/// Reading pushed by the sensor
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoistureReading {
    pub moisture_level: Option<f64>,
}

impl MoistureReading {
    /// Read the body's fields by key
    ///
    /// Only a JSON object is accepted; serde would otherwise fill the fields
    /// of a sequence by position.
    pub fn from_object(body: Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(body))
            .map_err(|e| ApiError::MalformedBody(e.to_string()))
    }

    /// The reported level, if the sensor sent one
    pub fn level(&self) -> Result<f64, ApiError> {
        self.moisture_level
            .ok_or(ApiError::MissingField("moistureLevel"))
    }
}

/// Response for moisture endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoistureResponse {
    pub moisture_level: f64,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Store a reading for the registered plant
pub async fn post_reading(
    State(state): State<SharedState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = payload?;
    let level = MoistureReading::from_object(body)?.level()?;

    state.repository.update_moisture(PLANT_ID, level).await?;
    telemetry::record_moisture_update(level);
    info!("Updated moisture level: {}", level);

    Ok(Json(MessageResponse {
        message: "Moisture level updated".to_string(),
    }))
}

/// Get the current reading of the registered plant
pub async fn get_moisture(
    State(state): State<SharedState>,
) -> Result<Json<MoistureResponse>, ApiError> {
    let plant = state
        .repository
        .get_plant(PLANT_ID)
        .await?
        .ok_or(ApiError::PlantNotFound)?;

    Ok(Json(MoistureResponse {
        moisture_level: plant.moisture,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<f64, ApiError> {
        let body: Map<String, Value> = serde_json::from_value(value)
            .map_err(|e| ApiError::MalformedBody(e.to_string()))?;
        MoistureReading::from_object(body)?.level()
    }

    #[test]
    fn test_empty_object_is_missing_field() {
        assert!(matches!(
            parse(json!({})),
            Err(ApiError::MissingField("moistureLevel"))
        ));
    }

    #[test]
    fn test_key_casing_matters() {
        assert!(parse(json!({ "moisturelevel": 42 })).is_err());
        assert_eq!(parse(json!({ "moistureLevel": 42 })).unwrap(), 42.0);
    }

    #[test]
    fn test_null_and_non_numeric_rejected() {
        assert!(parse(json!({ "moistureLevel": null })).is_err());
        assert!(parse(json!({ "moistureLevel": "wet" })).is_err());
    }

    #[test]
    fn test_positional_array_rejected() {
        assert!(matches!(
            parse(json!([42])),
            Err(ApiError::MalformedBody(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_any_finite_level_accepted(level in -1.0e9f64..1.0e9f64) {
            let parsed = parse(json!({ "moistureLevel": level })).unwrap();
            prop_assert_eq!(parsed, level);
        }

        #[test]
        fn prop_objects_without_key_rejected(
            entries in prop::collection::hash_map("[a-z]{1,12}", any::<i32>(), 0..6)
        ) {
            let object: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, json!(v)))
                .collect();
            prop_assert!(parse(Value::Object(object)).is_err());
        }
    }
}
