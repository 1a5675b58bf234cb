use kube::Client;
use tracing::info;

use crate::utilities::errors::AppError;

#[derive(Clone)]
pub struct Kubernetes {
    pub client: Client,
}

impl Kubernetes {
    /// In-cluster configuration when running inside the cluster, local
    /// kubeconfig otherwise.
    pub async fn new() -> Result<Self, AppError> {
        let client = Client::try_default().await?;

        info!("✅ Kubernetes client initialized.");

        Ok(Self { client })
    }
}
