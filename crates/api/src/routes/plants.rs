//! Plant Routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use plant_storage::{NewPlant, Plant, PLANT_ID};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::routes::moisture::MessageResponse;
use crate::{telemetry, SharedState};

/// Registration sent by the mobile client
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlantRequest {
    pub plant: Option<String>,
    pub min_moisture: Option<f64>,
    pub max_moisture: Option<f64>,
}

impl AddPlantRequest {
    /// Read the body's fields by key; sequences are never accepted
    pub fn from_object(body: Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::from_value(Value::Object(body))
            .map_err(|e| ApiError::MalformedBody(e.to_string()))
    }

    /// Check every field is present
    pub fn into_new_plant(self) -> Result<NewPlant, ApiError> {
        Ok(NewPlant {
            species: self.plant.ok_or(ApiError::MissingField("plant"))?,
            threshold: self
                .min_moisture
                .ok_or(ApiError::MissingField("minMoisture"))?,
            maximum: self
                .max_moisture
                .ok_or(ApiError::MissingField("maxMoisture"))?,
        })
    }
}

/// Full plant record as seen by the client
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantResponse {
    pub id: i64,
    pub species: String,
    pub min_moisture: f64,
    pub max_moisture: f64,
    pub moisture_level: f64,
}

impl From<Plant> for PlantResponse {
    fn from(plant: Plant) -> Self {
        Self {
            id: plant.id,
            species: plant.species,
            min_moisture: plant.threshold,
            max_moisture: plant.maximum,
            moisture_level: plant.moisture,
        }
    }
}

/// Register the plant, replacing any previous registration
pub async fn add_plant(
    State(state): State<SharedState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = payload?;
    let new_plant = AddPlantRequest::from_object(body)?.into_new_plant()?;

    state.repository.register_plant(PLANT_ID, new_plant).await?;
    telemetry::record_registration();

    Ok(Json(MessageResponse {
        message: "Plant added".to_string(),
    }))
}

/// Get the registered plant
pub async fn get_plant(
    State(state): State<SharedState>,
) -> Result<Json<PlantResponse>, ApiError> {
    let plant = state
        .repository
        .get_plant(PLANT_ID)
        .await?
        .ok_or(ApiError::PlantNotFound)?;

    Ok(Json(plant.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_request() {
        let request: AddPlantRequest = serde_json::from_value(json!({
            "plant": "basil",
            "minMoisture": 30,
            "maxMoisture": 70.5,
        }))
        .unwrap();

        let plant = request.into_new_plant().unwrap();
        assert_eq!(plant.species, "basil");
        assert_eq!(plant.threshold, 30.0);
        assert_eq!(plant.maximum, 70.5);
    }

    #[test]
    fn test_missing_fields_reported() {
        let request: AddPlantRequest =
            serde_json::from_value(json!({ "plant": "basil", "minMoisture": 30 })).unwrap();
        assert!(matches!(
            request.into_new_plant(),
            Err(ApiError::MissingField("maxMoisture"))
        ));

        let request = AddPlantRequest::default();
        assert!(matches!(
            request.into_new_plant(),
            Err(ApiError::MissingField("plant"))
        ));
    }

    #[test]
    fn test_fields_read_by_key_only() {
        let body = serde_json::from_value(json!({ "species": "cactus", "min": 1, "max": 2 }))
            .unwrap();
        let request = AddPlantRequest::from_object(body).unwrap();
        assert!(matches!(
            request.into_new_plant(),
            Err(ApiError::MissingField("plant"))
        ));
    }

    #[test]
    fn test_response_uses_client_names() {
        let response = PlantResponse::from(Plant {
            id: PLANT_ID,
            species: "fern".to_string(),
            threshold: 40.0,
            maximum: 90.0,
            moisture: 12.0,
        });

        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["minMoisture"], 40.0);
        assert_eq!(value["maxMoisture"], 90.0);
        assert_eq!(value["moistureLevel"], 12.0);
    }
}
