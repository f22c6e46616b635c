//! Cloudflare API Client
//!
//! Typed wrapper over the Cloudflare v4 REST API for the DNS record
//! operations the relay tooling needs: paginated listing, create, delete,
//! and single-record fetch. Transport failures propagate to the caller.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const PAGE_SIZE: u32 = 100;

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[allow(dead_code)]
    code: i32,
    message: String,
}

impl<T> ApiResponse<T> {
    fn into_result(self, what: &str) -> Result<T> {
        if !self.success {
            let errors: Vec<String> = self.errors.iter().map(|e| e.message.clone()).collect();
            bail!("Cloudflare API error ({}): {}", what, errors.join(", "));
        }
        self.result.with_context(|| format!("no result in {} response", what))
    }
}

#[derive(Debug, Deserialize)]
struct RecordId {
    id: String,
}

// ============================================================
// DNS Record Types
// ============================================================

/// SRV record payload as Cloudflare returns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvData {
    pub service: String,
    pub proto: String,
    pub target: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
}

/// A record: name -> IPv4 address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// CNAME record: name -> canonical hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// SRV record: service name -> target/port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub data: SrvData,
}

/// A DNS record from the zone, tagged by record kind
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum DnsRecord {
    A(AddressRecord),
    #[serde(rename = "CNAME")]
    Cname(AliasRecord),
    #[serde(rename = "SRV")]
    Srv(ServiceRecord),
    /// Record kinds the relay tooling does not manage (TXT, MX, ...)
    #[serde(other)]
    Other,
}

/// Zone records partitioned by kind, preserving API-returned order
#[derive(Debug, Clone, Default)]
pub struct ZoneRecords {
    pub a: Vec<AddressRecord>,
    pub cname: Vec<AliasRecord>,
    pub srv: Vec<ServiceRecord>,
}

impl ZoneRecords {
    pub fn partition(records: Vec<DnsRecord>) -> Self {
        let mut zone = ZoneRecords::default();
        let mut skipped = 0usize;
        for record in records {
            match record {
                DnsRecord::A(a) => zone.a.push(a),
                DnsRecord::Cname(cname) => zone.cname.push(cname),
                DnsRecord::Srv(srv) => zone.srv.push(srv),
                DnsRecord::Other => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(skipped, "ignored records of unmanaged types");
        }
        zone
    }
}

// ============================================================
// Create Requests
// ============================================================

#[derive(Debug, Serialize)]
struct CreateHostRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

#[derive(Debug, Serialize)]
struct CreateSrvRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    data: &'a SrvData,
    ttl: u32,
}

// ============================================================
// Provider Trait
// ============================================================

/// DNS provider operations the relay tooling needs.
///
/// Kept behind a trait so node operations can be driven without a live
/// zone.
#[async_trait]
pub trait DnsApi {
    /// Fetch every DNS record in the zone
    async fn fetch_all_records(&self) -> Result<Vec<DnsRecord>>;
    /// Fetch a single record by id, returned raw for inspection
    async fn get_record(&self, record_id: &str) -> Result<serde_json::Value>;
    /// Create an A record pointing a hostname at an IPv4 address
    async fn create_address_record(&self, name: &str, ip: &str) -> Result<String>;
    /// Create a CNAME record aliasing a name to a target hostname
    async fn create_alias_record(&self, name: &str, target: &str) -> Result<String>;
    /// Create an SRV record advertising a service on a target host/port
    async fn create_service_record(&self, name: &str, data: &SrvData) -> Result<String>;
    /// Delete a DNS record by id
    async fn delete_record(&self, record_id: &str) -> Result<()>;
}

// ============================================================
// Client Implementation
// ============================================================

/// Cloudflare DNS client scoped to a single zone
pub struct CloudflareClient {
    http_client: Client,
    api_token: String,
    zone_id: String,
}

impl CloudflareClient {
    pub fn new(api_token: String, zone_id: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_token,
            zone_id,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, self.zone_id)
    }

    async fn create_record<B: Serialize>(&self, request: &B) -> Result<String> {
        let response: ApiResponse<RecordId> = self
            .http_client
            .post(self.records_url())
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .context("Failed to create DNS record")?
            .json()
            .await
            .context("Failed to parse create response")?;

        Ok(response.into_result("create dns_record")?.id)
    }
}

#[async_trait]
impl DnsApi for CloudflareClient {
    /// Pages through the zone until an empty page comes back
    async fn fetch_all_records(&self) -> Result<Vec<DnsRecord>> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!("{}?page={}&per_page={}", self.records_url(), page, PAGE_SIZE);
            debug!(page, "fetching DNS record page");

            let response: ApiResponse<Vec<DnsRecord>> = self
                .http_client
                .get(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .context("Failed to list DNS records")?
                .json()
                .await
                .context("Failed to parse DNS records response")?;

            let batch = response.into_result("list dns_records")?;
            if batch.is_empty() {
                break;
            }
            records.extend(batch);
            page += 1;
        }

        debug!(count = records.len(), "fetched zone records");
        Ok(records)
    }

    async fn get_record(&self, record_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.records_url(), record_id);

        let response: ApiResponse<serde_json::Value> = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("Failed to fetch DNS record")?
            .json()
            .await
            .context("Failed to parse DNS record response")?;

        response.into_result("get dns_record")
    }

    async fn create_address_record(&self, name: &str, ip: &str) -> Result<String> {
        let request = CreateHostRecord {
            record_type: "A",
            name,
            content: ip,
            ttl: 1,
            proxied: false,
        };
        self.create_record(&request).await
    }

    async fn create_alias_record(&self, name: &str, target: &str) -> Result<String> {
        let request = CreateHostRecord {
            record_type: "CNAME",
            name,
            content: target,
            ttl: 1,
            proxied: false,
        };
        self.create_record(&request).await
    }

    async fn create_service_record(&self, name: &str, data: &SrvData) -> Result<String> {
        let request = CreateSrvRecord {
            record_type: "SRV",
            name,
            data,
            ttl: 1,
        };
        self.create_record(&request).await
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.records_url(), record_id);

        let response: ApiResponse<serde_json::Value> = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("Failed to delete DNS record")?
            .json()
            .await
            .context("Failed to parse delete response")?;

        response.into_result("delete dns_record")?;
        Ok(())
    }
}
