//! Client HTTP du backend

use bytes::Bytes;
use foncier::{validate, FeatureCollection, LayerInfo, LayerRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{Analysis, ApiError, BackendError};
use crate::config::ClientConfig;
use crate::upload::Upload;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
}

/// Client du backend d'analyse foncière
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    api: Url,
    chat: Url,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            api: parse_base(&config.api_url)?,
            chat: parse_base(&config.chat_url)?,
        })
    }

    /// Envoie un levé et retourne le résultat d'analyse validé
    pub async fn analyze(&self, upload: &Upload) -> Result<Analysis, ApiError> {
        let url = endpoint(&self.api, &["workflow", "process-and-analyze"])?;
        let part = Part::bytes(upload.data.clone())
            .file_name(upload.file_name.clone())
            .mime_str(upload.mime)?;
        let form = Form::new().part("file", part);

        info!(file = %upload.file_name, size = upload.data.len(), "Uploading survey");
        let resp = self.http.post(url).multipart(form).send().await?;
        let body: Value = check(resp).await?.json().await?;

        Ok(Analysis::from_payload(body)?)
    }

    /// Génère le rapport PDF d'une analyse (payload d'origine renvoyé tel quel)
    pub async fn generate_report(&self, analysis: &Analysis) -> Result<Bytes, ApiError> {
        let url = endpoint(&self.api, &["workflow", "generate-report"])?;
        let resp = self.http.post(url).json(&analysis.payload).send().await?;
        let pdf = check(resp).await?.bytes().await?;
        debug!(image_id = %analysis.result.image_id, size = pdf.len(), "Report received");
        Ok(pdf)
    }

    /// Catalogue des couches disponibles
    pub async fn layers_info(&self) -> Result<Vec<LayerInfo>, ApiError> {
        let url = endpoint(&self.api, &["layers", "info"])?;
        let resp = self.http.get(url).send().await?;
        let catalog: Vec<LayerInfo> = check(resp).await?.json().await?;
        debug!(layers = catalog.len(), "Layer catalog loaded");
        Ok(catalog)
    }

    /// Géométrie d'une couche, éventuellement restreinte autour de la parcelle
    pub async fn layer_data(&self, request: LayerRequest) -> Result<FeatureCollection, ApiError> {
        let mut url = endpoint(&self.api, &["layers", "data", &request.key])?;
        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let resp = self.http.get(url).send().await?;
        let body: Value = check(resp).await?.json().await?;
        Ok(validate::feature_collection(&body)?)
    }

    /// Pose une question à l'assistant
    ///
    /// Retourne `None` si le backend répond sans texte.
    pub async fn chat(&self, message: &str) -> Result<Option<String>, ApiError> {
        let url = endpoint(&self.chat, &["chat", ""])?;
        let resp = self
            .http
            .post(url)
            .json(&ChatRequest { message })
            .send()
            .await?;
        let body: ChatResponse = check(resp).await?.json().await?;
        Ok(body.reply.filter(|r| !r.trim().is_empty()))
    }
}

fn parse_base(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::Url {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::Url {
            url: raw.to_string(),
            reason: "not a base URL".into(),
        });
    }
    Ok(url)
}

/// Ajoute des segments (encodés) au chemin de l'URL de base
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::Url {
            url: base.to_string(),
            reason: "not a base URL".into(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Convertit une réponse non-2xx en erreur lisible
async fn check(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<BackendError>(&text)
        .ok()
        .and_then(BackendError::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
