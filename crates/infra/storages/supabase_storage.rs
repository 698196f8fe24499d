use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{
    repositories::storage::StorageLister, value_objects::storage::StoredObject,
};

#[derive(Debug, Clone)]
pub struct SupabaseStorageConfig {
    pub project_url: String,
    pub service_key: String,
    pub bucket: String,
}

/// Lists objects in a Supabase Storage bucket through the REST API.
/// https://supabase.com/docs/reference/storage
pub struct SupabaseStorageClient {
    http: reqwest::Client,
    list_url: Url,
    service_key: String,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: i64,
    offset: i64,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    // Depending on the storage API version, the size is reported on the
    // object itself, inside the metadata blob, or not at all (folders).
    size: Option<i64>,
    metadata: Option<ListedObjectMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListedObjectMetadata {
    size: Option<i64>,
}

impl SupabaseStorageClient {
    pub fn new(config: SupabaseStorageConfig) -> Result<Self> {
        let base = Url::parse(config.project_url.trim_end_matches('/'))
            .context("SUPABASE_PROJECT_URL is not a valid url")?;
        let list_url = base
            .join(&format!("/storage/v1/object/list/{}", config.bucket))
            .context("failed to build storage list url")?;

        Ok(Self {
            http: reqwest::Client::new(),
            list_url,
            service_key: config.service_key,
        })
    }
}

#[async_trait]
impl StorageLister for SupabaseStorageClient {
    async fn list_page(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredObject>> {
        let resp = self
            .http
            .post(self.list_url.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&ListRequest {
                prefix,
                limit,
                offset,
                sort_by: SortBy {
                    column: "name",
                    order: "asc",
                },
            })
            .send()
            .await
            .context("storage list request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "storage list failed (status {}): {}",
                status,
                body.chars().take(512).collect::<String>()
            );
        }

        let objects: Vec<ListedObject> = resp
            .json()
            .await
            .context("storage list response was not valid json")?;

        Ok(objects
            .into_iter()
            .map(|object| StoredObject {
                name: object.name,
                size: object.size,
                metadata_size: object.metadata.and_then(|meta| meta.size),
            })
            .collect())
    }
}
