//! Vision model client
//!
//! Client for the hosted vision-language model that interprets soil photos.
//! The model's output is treated as opaque JSON: this service builds the
//! request (images plus structured context) and stores what comes back.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{AnalysisInput, FieldCampaign, GeoDataContext, PointAnalysis, SampleImages};

use super::http_client;
use crate::error::{AppError, AppResult};
use crate::services::analysis::VisionAnalyzer;

/// Client for the vision model gateway
#[derive(Clone)]
pub struct VisionClient {
    endpoint: String,
    api_key: String,
    model: String,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct ImagePart<'a> {
    role: &'static str,
    mime_type: &'a str,
    data: &'a str,
}

/// Request to analyze one sampled point
#[derive(Debug, Serialize)]
struct PointAnalysisRequest<'a> {
    model: &'a str,
    task: &'static str,
    images: Vec<ImagePart<'a>>,
    context: &'a GeoDataContext,
    input: &'a AnalysisInput,
}

/// Request to aggregate all point results into a field report
#[derive(Debug, Serialize)]
struct FieldReportRequest<'a> {
    model: &'a str,
    task: &'static str,
    parcel_name: &'a str,
    crop: &'a str,
    stage: String,
    area_hectares: f64,
    zones: Vec<ZoneDigest<'a>>,
    analyses: Vec<PointDigest<'a>>,
}

#[derive(Debug, Serialize)]
struct ZoneDigest<'a> {
    id: uuid::Uuid,
    name: &'a str,
    characteristics: &'a str,
}

#[derive(Debug, Serialize)]
struct PointDigest<'a> {
    label: &'a str,
    zone: Option<&'a str>,
    result: &'a serde_json::Value,
    geodata_context: &'a GeoDataContext,
}

#[derive(Debug, Deserialize)]
struct PointAnalysisResponse {
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FieldReportResponse {
    report: serde_json::Map<String, serde_json::Value>,
}

impl VisionClient {
    /// Create a new vision model client
    pub fn new(endpoint: String, api_key: String, model: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            api_key,
            model,
            http_client: http_client(timeout_secs),
        }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> AppResult<Resp> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Configuration("vision.api_key is not set".to_string()));
        }

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), path);
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::VisionModel(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::VisionModel(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::VisionModel(format!("Failed to parse response: {}", e)))
    }
}

fn point_digests<'a>(
    campaign: &'a FieldCampaign,
    analyses: &'a [PointAnalysis],
) -> Vec<PointDigest<'a>> {
    analyses
        .iter()
        .filter_map(|analysis| {
            let point = campaign.point(analysis.sampling_point_id)?;
            Some(PointDigest {
                label: &point.label,
                zone: campaign.zone_of(point).map(|z| z.name.as_str()),
                result: &analysis.result,
                geodata_context: &analysis.geodata_context,
            })
        })
        .collect()
}

#[axum::async_trait]
impl VisionAnalyzer for VisionClient {
    async fn analyze_point(
        &self,
        images: &SampleImages,
        context: &GeoDataContext,
        input: &AnalysisInput,
    ) -> AppResult<serde_json::Value> {
        let request = PointAnalysisRequest {
            model: &self.model,
            task: "soil_point_analysis",
            images: vec![
                ImagePart {
                    role: "surface",
                    mime_type: &images.mime_type,
                    data: &images.surface_image,
                },
                ImagePart {
                    role: "profile",
                    mime_type: &images.mime_type,
                    data: &images.profile_image,
                },
            ],
            context,
            input,
        };

        let response: PointAnalysisResponse = self.post("analyze", &request).await?;
        Ok(response.result)
    }

    async fn field_report(
        &self,
        campaign: &FieldCampaign,
        analyses: &[PointAnalysis],
    ) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        let request = FieldReportRequest {
            model: &self.model,
            task: "field_report",
            parcel_name: &campaign.parcel.name,
            crop: &campaign.parcel.crop,
            stage: campaign.parcel.stage.to_string(),
            area_hectares: campaign.parcel.area_hectares,
            zones: campaign
                .zones
                .iter()
                .map(|z| ZoneDigest {
                    id: z.id,
                    name: &z.name,
                    characteristics: &z.characteristics,
                })
                .collect(),
            analyses: point_digests(campaign, analyses),
        };

        let response: FieldReportResponse = self.post("report", &request).await?;
        Ok(response.report)
    }
}
