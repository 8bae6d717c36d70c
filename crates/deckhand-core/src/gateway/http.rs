//! REST persistence service client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Gateway, GatewayError, GatewayResult, MediaUpload};
use crate::config::Config;
use crate::model::{
    Element, ElementId, ElementPatch, NewElement, Presentation, PresentationId,
    PresentationSummary, Slide, SlideId, SlidePatch,
};

const USER_AGENT: &str = concat!("deckhand/", env!("CARGO_PKG_VERSION"));

/// Error body sent by the service: `{"message": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    slide_ids: &'a [SlideId],
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Gateway backed by the REST service
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        Self::new(
            config.api_url.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and map non-success statuses to `GatewayError`
    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        warn!("Request failed with {}: {}", status, message.as_deref().unwrap_or("-"));
        Err(GatewayError::from_status(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> GatewayResult<T> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> GatewayResult<()> {
        self.send(builder).await.map(|_| ())
    }
}

/// Pull the user-facing message out of an error body, if there is one
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_presentations(&self) -> GatewayResult<Vec<PresentationSummary>> {
        self.send_json(self.request(Method::GET, "presentations"))
            .await
    }

    async fn create_presentation(&self, title: &str) -> GatewayResult<PresentationSummary> {
        let req = self
            .request(Method::POST, "presentations")
            .json(&TitleBody { title });
        self.send_json(req).await
    }

    async fn load_presentation(&self, id: &PresentationId) -> GatewayResult<Presentation> {
        self.send_json(self.request(Method::GET, &format!("presentations/{}", id)))
            .await
    }

    async fn rename_presentation(&self, id: &PresentationId, title: &str) -> GatewayResult<()> {
        let req = self
            .request(Method::PUT, &format!("presentations/{}", id))
            .json(&TitleBody { title });
        self.send_empty(req).await
    }

    async fn delete_presentation(&self, id: &PresentationId) -> GatewayResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("presentations/{}", id)))
            .await
    }

    async fn export_presentation(&self, id: &PresentationId) -> GatewayResult<Vec<u8>> {
        let response = self
            .send(self.request(Method::GET, &format!("presentations/{}/download", id)))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn add_slide(&self, presentation_id: &PresentationId) -> GatewayResult<Slide> {
        let path = format!("presentations/{}/slides", presentation_id);
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn delete_slide(&self, slide_id: &SlideId) -> GatewayResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("slides/{}", slide_id)))
            .await
    }

    async fn reorder_slides(
        &self,
        presentation_id: &PresentationId,
        order: &[SlideId],
    ) -> GatewayResult<()> {
        let req = self
            .request(
                Method::PUT,
                &format!("presentations/{}/slides/order", presentation_id),
            )
            .json(&OrderBody { slide_ids: order });
        self.send_empty(req).await
    }

    async fn update_slide(&self, slide_id: &SlideId, patch: &SlidePatch) -> GatewayResult<()> {
        let req = self
            .request(Method::PUT, &format!("slides/{}", slide_id))
            .json(patch);
        self.send_empty(req).await
    }

    async fn add_element(
        &self,
        slide_id: &SlideId,
        element: &NewElement,
    ) -> GatewayResult<Element> {
        let req = self
            .request(Method::POST, &format!("slides/{}/elements", slide_id))
            .json(element);
        self.send_json(req).await
    }

    async fn update_element(
        &self,
        element_id: &ElementId,
        patch: &ElementPatch,
    ) -> GatewayResult<()> {
        let req = self
            .request(Method::PUT, &format!("elements/{}", element_id))
            .json(patch);
        self.send_empty(req).await
    }

    async fn delete_element(&self, element_id: &ElementId) -> GatewayResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("elements/{}", element_id)))
            .await
    }

    async fn upload_media(&self, upload: &MediaUpload) -> GatewayResult<String> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| GatewayError::Rejected {
                status: 400,
                message: Some(e.to_string()),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let uploaded: UploadResponse = self
            .send_json(self.request(Method::POST, "uploads").multipart(form))
            .await?;
        Ok(uploaded.url)
    }
}
