//! Package service: the public catalogue.

use super::types::{PackageDraft, PackageUpdate, TravelPackage};
use super::ApiClient;
use crate::error::Result;

/// Calls against the package service.
#[derive(Debug, Clone)]
pub struct PackagesApi {
    client: ApiClient,
}

impl PackagesApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn path(&self, suffix: &str) -> String {
        let base = self.client.config().package_service_path.trim_end_matches('/');
        if suffix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, suffix)
        }
    }

    pub async fn fetch_all(&self) -> Result<Vec<TravelPackage>> {
        self.client.get(&self.path("")).await
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<TravelPackage> {
        self.client.get(&self.path(&id.to_string())).await
    }

    pub async fn create(&self, draft: &PackageDraft) -> Result<TravelPackage> {
        self.client.post(&self.path(""), draft).await
    }

    pub async fn update(&self, id: i64, update: &PackageUpdate) -> Result<TravelPackage> {
        self.client.put(&self.path(&id.to_string()), update).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&self.path(&id.to_string())).await
    }
}
