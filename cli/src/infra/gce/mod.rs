//! Compute Engine v1 REST implementation of the `ComputeProvider` port.
//!
//! Every call is authenticated with a bearer token obtained once at
//! construction. Transient failures (429, 5xx, connection errors and
//! timeouts) are retried with exponential backoff; everything else is
//! mapped to a typed `ComputeError` on the first attempt. Mutations carry
//! a per-call `requestId` so the API deduplicates retried attempts.

pub mod wire;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::{
    AttachDiskRequest, ComputeProvider, CreateDiskRequest, SetMetadataRequest, SnapshotRequest,
};
use crate::domain::config::ApiConfig;
use crate::domain::error::ComputeError;
use crate::domain::instance::{Disk, Instance, Operation, ZoneRef};
use wire::{
    AttachDiskBody, CreateDiskBody, DiskResource, ErrorEnvelope, InstanceResource,
    OperationResource, SetMetadataBody, SnapshotBody,
};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Map a non-success HTTP response to a `ComputeError`.
#[must_use]
pub fn classify_status(status: StatusCode, resource: &str, body: &str) -> ComputeError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    match status {
        StatusCode::NOT_FOUND => ComputeError::not_found(resource),
        StatusCode::CONFLICT => ComputeError::Conflict {
            resource: resource.to_string(),
            message,
        },
        StatusCode::PRECONDITION_FAILED => ComputeError::StaleFingerprint {
            resource: resource.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ComputeError::Transient { message },
        s if s.is_server_error() => ComputeError::Transient {
            message: format!("HTTP {}: {message}", s.as_u16()),
        },
        s => ComputeError::Api {
            status: s.as_u16(),
            message,
        },
    }
}

fn classify_transport(err: &reqwest::Error) -> ComputeError {
    if err.is_decode() {
        ComputeError::Decode {
            message: err.to_string(),
        }
    } else {
        ComputeError::Transient {
            message: err.to_string(),
        }
    }
}

/// Delay before retry number `attempt` (1-based).
#[must_use]
pub fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .min(RETRY_MAX_DELAY)
}

/// `ComputeProvider` backed by `https://compute.googleapis.com/compute/v1`.
pub struct GceComputeProvider {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    max_retries: u32,
}

impl GceComputeProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("gce-rescue/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
            max_retries: config.max_retries,
        })
    }

    fn zone_url(&self, zone: &ZoneRef, path: &str) -> String {
        format!(
            "{}/projects/{}/zones/{}/{path}",
            self.endpoint, zone.project, zone.zone
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        resource: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, ComputeError> {
        let mut retries: u32 = 0;
        loop {
            match self.send::<T>(resource, build()).await {
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    let delay = retry_delay(retries);
                    warn!(resource, attempt = retries, delay_ms = delay.as_millis(), error = %err, "retrying provider call");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<T, ComputeError> {
        let response = request.send().await.map_err(|e| classify_transport(&e))?;
        let status = response.status();
        debug!(resource, status = status.as_u16(), "provider response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, resource, &body));
        }
        let body = response.bytes().await.map_err(|e| classify_transport(&e))?;
        serde_json::from_slice(&body).map_err(|e| ComputeError::Decode {
            message: format!("{resource}: {e}"),
        })
    }

    /// Issue a mutating call. Every attempt carries the same `requestId`,
    /// so a retried request that already landed is not applied twice.
    async fn mutate(&self, resource: &str, build: impl Fn() -> RequestBuilder) -> Result<Operation, ComputeError> {
        let request_id = Uuid::new_v4().to_string();
        debug!(resource, request_id = %request_id, "issuing mutation");
        self.execute::<OperationResource>(resource, || {
            build().query(&[("requestId", request_id.as_str())])
        })
        .await
        .map(Operation::from)
    }
}

impl ComputeProvider for GceComputeProvider {
    async fn get_instance(&self, zone: &ZoneRef, instance: &str) -> Result<Instance, ComputeError> {
        let url = self.zone_url(zone, &format!("instances/{instance}"));
        let resource = format!("instance {instance}");
        self.execute::<InstanceResource>(&resource, || self.request(Method::GET, &url))
            .await
            .map(Instance::from)
    }

    async fn start_instance(&self, zone: &ZoneRef, instance: &str) -> Result<Operation, ComputeError> {
        let url = self.zone_url(zone, &format!("instances/{instance}/start"));
        let resource = format!("instance {instance}");
        self.mutate(&resource, || self.request(Method::POST, &url)).await
    }

    async fn stop_instance(&self, zone: &ZoneRef, instance: &str) -> Result<Operation, ComputeError> {
        let url = self.zone_url(zone, &format!("instances/{instance}/stop"));
        let resource = format!("instance {instance}");
        self.mutate(&resource, || self.request(Method::POST, &url)).await
    }

    async fn create_snapshot(
        &self,
        zone: &ZoneRef,
        req: &SnapshotRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        req.validate()?;
        let url = self.zone_url(zone, &format!("disks/{}/createSnapshot", req.disk_name));
        let resource = format!("snapshot {}", req.snapshot_name);
        let body = SnapshotBody {
            name: req.snapshot_name,
        };
        self.mutate(&resource, || self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn get_disk(&self, zone: &ZoneRef, disk: &str) -> Result<Disk, ComputeError> {
        let url = self.zone_url(zone, &format!("disks/{disk}"));
        let resource = format!("disk {disk}");
        self.execute::<DiskResource>(&resource, || self.request(Method::GET, &url))
            .await
            .map(Disk::from)
    }

    async fn create_disk(
        &self,
        zone: &ZoneRef,
        req: &CreateDiskRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        req.validate()?;
        let url = self.zone_url(zone, "disks");
        let resource = format!("disk {}", req.disk_name);
        let body = CreateDiskBody {
            name: req.disk_name,
            source_image: req.source_image,
            disk_type: format!(
                "projects/{}/zones/{}/diskTypes/{}",
                zone.project, zone.zone, req.disk_type
            ),
        };
        self.mutate(&resource, || self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn delete_disk(&self, zone: &ZoneRef, disk: &str) -> Result<Operation, ComputeError> {
        let url = self.zone_url(zone, &format!("disks/{disk}"));
        let resource = format!("disk {disk}");
        self.mutate(&resource, || self.request(Method::DELETE, &url))
            .await
    }

    async fn attach_disk(
        &self,
        zone: &ZoneRef,
        instance: &str,
        req: &AttachDiskRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        req.validate()?;
        let url = self.zone_url(zone, &format!("instances/{instance}/attachDisk"));
        let resource = format!("disk {}", req.disk_name);
        let body = AttachDiskBody {
            boot: req.boot,
            device_name: req.device_name,
            source: format!(
                "projects/{}/zones/{}/disks/{}",
                zone.project, zone.zone, req.disk_name
            ),
            kind: "PERSISTENT",
            auto_delete: false,
        };
        self.mutate(&resource, || self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn detach_disk(
        &self,
        zone: &ZoneRef,
        instance: &str,
        device_name: &str,
    ) -> Result<Operation, ComputeError> {
        let url = self.zone_url(zone, &format!("instances/{instance}/detachDisk"));
        let resource = format!("device {device_name} of instance {instance}");
        self.mutate(&resource, || {
            self.request(Method::POST, &url)
                .query(&[("deviceName", device_name)])
        })
        .await
    }

    async fn set_metadata(
        &self,
        zone: &ZoneRef,
        instance: &str,
        req: &SetMetadataRequest<'_>,
    ) -> Result<Operation, ComputeError> {
        req.validate()?;
        let url = self.zone_url(zone, &format!("instances/{instance}/setMetadata"));
        let resource = format!("instance {instance}");
        let body = SetMetadataBody {
            fingerprint: req.fingerprint,
            items: req.items,
        };
        self.mutate(&resource, || self.request(Method::POST, &url).json(&body))
            .await
    }

    async fn get_operation(&self, zone: &ZoneRef, operation: &str) -> Result<Operation, ComputeError> {
        let url = self.zone_url(zone, &format!("operations/{operation}"));
        let resource = format!("operation {operation}");
        self.execute::<OperationResource>(&resource, || self.request(Method::GET, &url))
            .await
            .map(Operation::from)
    }
}
