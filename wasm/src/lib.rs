//! WebAssembly module for the TeraLab field client
//!
//! Provides client-side computation while the user draws a parcel:
//! - Area, centroid, and point-in-polygon
//! - Full sampling plan preview
//! - Drag validation of a single point
//! - Soil texture classification

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use shared::geometry;
use shared::sampling::{self, SamplingConfig};
use shared::zoning::FixedArchetypeStrategy;
use shared::{build_sampling_plan, GpsCoordinates, GrowthStage, Parcel, TextureClass};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("TeraLab geometry module loaded"));
}

fn parse_boundary(boundary_json: &str) -> Result<Vec<GpsCoordinates>, JsValue> {
    serde_json::from_str(boundary_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid boundary JSON: {}", e)))
}

/// Area in hectares of a `[[lat, lon], ...]` ring
#[wasm_bindgen]
pub fn parcel_area_hectares(boundary_json: &str) -> Result<f64, JsValue> {
    let boundary = parse_boundary(boundary_json)?;
    Ok(geometry::polygon_area_hectares(&boundary))
}

/// Vertex centroid as `[lat, lon]`
#[wasm_bindgen]
pub fn parcel_centroid(boundary_json: &str) -> Result<js_sys::Float64Array, JsValue> {
    let boundary = parse_boundary(boundary_json)?;
    let c = geometry::centroid(&boundary);
    Ok(js_sys::Float64Array::from(&[c.latitude, c.longitude][..]))
}

/// Whether a point lies inside the ring
#[wasm_bindgen]
pub fn is_point_in_parcel(lat: f64, lon: f64, boundary_json: &str) -> Result<bool, JsValue> {
    let boundary = parse_boundary(boundary_json)?;
    Ok(geometry::point_in_polygon(
        &GpsCoordinates::new(lat, lon),
        &boundary,
    ))
}

/// Empty string when the parcel is acceptable, otherwise the reason
#[wasm_bindgen]
pub fn validate_parcel(name: &str, crop: &str, boundary_json: &str) -> Result<String, JsValue> {
    let boundary = parse_boundary(boundary_json)?;
    Ok(shared::validate_parcel_input(name, crop, &boundary)
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default())
}

/// Whether a dragged point satisfies the generator's placement rule
#[wasm_bindgen]
pub fn is_valid_sampling_position(
    lat: f64,
    lon: f64,
    boundary_json: &str,
    edge_buffer_meters: f64,
) -> Result<bool, JsValue> {
    let boundary = parse_boundary(boundary_json)?;
    Ok(sampling::is_valid_sampling_position(
        &GpsCoordinates::new(lat, lon),
        &boundary,
        edge_buffer_meters,
    ))
}

#[derive(Deserialize)]
struct PreviewRequest {
    name: String,
    crop: String,
    #[serde(default)]
    stage: GrowthStage,
    boundary: Vec<GpsCoordinates>,
    #[serde(default)]
    sampling: Option<SamplingConfig>,
}

/// Zones and points for a drawn parcel, as JSON
#[wasm_bindgen]
pub fn preview_sampling_plan(request_json: &str) -> Result<String, JsValue> {
    let request: PreviewRequest = serde_json::from_str(request_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid request JSON: {}", e)))?;

    shared::validate_parcel_input(&request.name, &request.crop, &request.boundary)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let parcel = Parcel::new(
        request.name.trim(),
        request.crop.trim(),
        request.stage,
        request.boundary,
    );
    let plan = build_sampling_plan(
        parcel,
        &FixedArchetypeStrategy,
        &request.sampling.unwrap_or_default(),
    );

    serde_json::to_string(&plan).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Texture class label from clay, sand, and silt percentages
#[wasm_bindgen]
pub fn classify_soil_texture(clay: f64, sand: f64, silt: f64) -> String {
    TextureClass::classify(Some(clay), Some(sand), Some(silt)).to_string()
}

/// Great-circle distance in meters
#[wasm_bindgen]
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    geometry::distance_meters(
        &GpsCoordinates::new(lat1, lon1),
        &GpsCoordinates::new(lat2, lon2),
    )
}
