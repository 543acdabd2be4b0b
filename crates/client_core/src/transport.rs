//! JSON-over-HTTP adapter for the review backend.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use shared::{
    domain::ReviewId,
    error::ApiException,
    protocol::{
        CreateReviewRequest, CreateReviewResponse, ReviewRecord, UpdateReviewRequest,
        UploadImageResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{form::LocalFile, ImageUploader, ReviewStore};

const UPLOAD_FIELD: &str = "photo";

pub struct HttpReviewStore {
    http: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpReviewStore {
    pub fn new(api_base_url: &str) -> Result<Self> {
        let base_url = Url::parse(api_base_url.trim())
            .with_context(|| format!("invalid api base url '{api_base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("api base url '{api_base_url}' cannot carry a path"));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|token| !token.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "review api request");
        let builder = self.http.request(method, url);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiException::from_response(status.as_u16(), &body).into())
}

/// One unreadable row must not hide the rest of the list; it is skipped.
fn decode_review_rows(rows: Vec<serde_json::Value>) -> Vec<ReviewRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let review_id = row
                .get("reviewId")
                .map(|id| id.to_string())
                .unwrap_or_default();
            match serde_json::from_value::<ReviewRecord>(row) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(%review_id, error = %err, "skipping unreadable review row");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl ReviewStore for HttpReviewStore {
    async fn list_reviews(&self, owner: &str) -> Result<Vec<ReviewRecord>> {
        let response = self
            .request(Method::GET, self.endpoint(&["reviews", owner]))
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = ensure_success(response)
            .await?
            .json()
            .await
            .context("malformed review list")?;
        Ok(decode_review_rows(rows))
    }

    async fn create_review(&self, request: &CreateReviewRequest) -> Result<Option<ReviewId>> {
        let response = self
            .request(Method::POST, self.endpoint(&["reviews"]))
            .json(request)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        // The id is informational; any 2xx body counts as created.
        Ok(serde_json::from_str::<CreateReviewResponse>(&body)
            .ok()
            .and_then(|created| created.id))
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        request: &UpdateReviewRequest,
    ) -> Result<()> {
        let response = self
            .request(
                Method::PUT,
                self.endpoint(&["reviews", &review_id.to_string()]),
            )
            .json(request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                self.endpoint(&["reviews", &review_id.to_string()]),
            )
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageUploader for HttpReviewStore {
    async fn upload_image(&self, file: &LocalFile) -> Result<String> {
        let mut part = multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part
                .mime_str(mime_type)
                .with_context(|| format!("invalid mime type '{mime_type}'"))?;
        }
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .request(Method::POST, self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadImageResponse = ensure_success(response)
            .await?
            .json()
            .await
            .context("malformed upload response")?;
        Ok(uploaded.image_url)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
