//! Node Operations
//!
//! The list / add / delete / detail operations the prompt loop dispatches
//! to. Each works against the Cloudflare zone and the local node store.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::assembler::{assemble_nodes, region_iterations, BOOTSTRAP_SERVICE, METRICS_SERVICE};
use crate::cloudflare::{DnsApi, SrvData, ZoneRecords};
use crate::store::NodeStore;
use crate::types::{Region, RelayNode};

pub const BOOTSTRAP_PORT: u16 = 5011;
pub const METRICS_PORT: u16 = 9100;

/// Index outside the bounds of the stored node list
#[derive(Debug, thiserror::Error)]
#[error("node index {index} is out of range, store holds {len} nodes (run `list` to refresh)")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

fn check_index(index: usize, len: usize) -> Result<(), IndexOutOfRange> {
    if index < len {
        Ok(())
    } else {
        Err(IndexOutOfRange { index, len })
    }
}

/// Raw record views for one relay node, as fetched from the provider
#[derive(Debug)]
pub struct NodeDetail {
    pub name: String,
    pub srv: serde_json::Value,
    pub metrics_srv: serde_json::Value,
    pub a_record: serde_json::Value,
    pub cname: serde_json::Value,
}

fn relay_alias(domain: &str, region: Region, iteration: u32) -> String {
    format!("r-{}-{}.{}", region, iteration, domain)
}

fn service_name(service: &str, domain: &str) -> String {
    format!("{}._tcp.{}", service, domain)
}

/// Relay node operations against one zone and one store file
pub struct NodeOps<C> {
    client: C,
    store: NodeStore,
    domain: String,
}

impl<C: DnsApi> NodeOps<C> {
    pub fn new(client: C, store: NodeStore, domain: String) -> Self {
        Self {
            client,
            store,
            domain,
        }
    }

    async fn fetch_zone(&self) -> Result<ZoneRecords> {
        let records = self.client.fetch_all_records().await?;
        Ok(ZoneRecords::partition(records))
    }

    /// Fetch the zone, assemble relay nodes, and refresh the store.
    /// The returned order is the index addressing for delete/detail.
    pub async fn list(&self) -> Result<Vec<RelayNode>> {
        let zone = self.fetch_zone().await?;
        let nodes = assemble_nodes(&zone);
        self.store.save(&nodes)?;
        info!(count = nodes.len(), "assembled relay nodes");
        Ok(nodes)
    }

    /// Create the four records for a new relay node in the next free
    /// region slot. Counters are recomputed from a fresh fetch so a stale
    /// store can never hand out an occupied iteration.
    pub async fn add(&self, ip: &str, hostname: &str, region: Region) -> Result<String> {
        let zone = self.fetch_zone().await?;
        let iteration = region_iterations(&zone.cname).next(region);
        let alias = relay_alias(&self.domain, region, iteration);
        let a_name = format!("{}.{}", hostname, self.domain);

        info!(relay = %alias, ip = %ip, "creating relay node records");

        match self.create_relay_records(ip, &a_name, &alias).await {
            Ok(()) => Ok(alias),
            Err(e) => {
                // No rollback: records created before the failure stay in the zone.
                warn!(relay = %alias, "add failed partway, records already created remain in the zone");
                Err(e)
            }
        }
    }

    async fn create_relay_records(&self, ip: &str, a_name: &str, alias: &str) -> Result<()> {
        self.client
            .create_address_record(a_name, ip)
            .await
            .context("creating A record")?;
        self.client
            .create_alias_record(alias, a_name)
            .await
            .context("creating CNAME record")?;
        self.client
            .create_service_record(
                &service_name(BOOTSTRAP_SERVICE, &self.domain),
                &srv_data(BOOTSTRAP_SERVICE, alias, BOOTSTRAP_PORT),
            )
            .await
            .context("creating bootstrap SRV record")?;
        self.client
            .create_service_record(
                &service_name(METRICS_SERVICE, &self.domain),
                &srv_data(METRICS_SERVICE, alias, METRICS_PORT),
            )
            .await
            .context("creating metrics SRV record")?;
        Ok(())
    }

    /// Delete the node at `index` in the stored list: all four records go
    /// in parallel, and the store is only rewritten once every delete
    /// succeeded.
    pub async fn delete(&self, index: usize) -> Result<RelayNode> {
        let mut nodes = self.store.load()?;
        check_index(index, nodes.len())?;

        let (srv, metrics_srv, a_record, cname) = record_ids(&nodes[index])?;
        // Every issued delete runs to completion even when a sibling fails.
        let (srv_res, metrics_res, a_res, cname_res) = tokio::join!(
            self.client.delete_record(srv),
            self.client.delete_record(metrics_srv),
            self.client.delete_record(a_record),
            self.client.delete_record(cname),
        );
        srv_res.context("deleting SRV record")?;
        metrics_res.context("deleting metrics SRV record")?;
        a_res.context("deleting A record")?;
        cname_res.context("deleting CNAME record")?;

        let removed = nodes.remove(index);
        self.store.save(&nodes)?;
        info!(relay = %removed.name, "deleted relay node");
        Ok(removed)
    }

    /// Fetch the raw provider view of the node at `index` in the stored list
    pub async fn detail(&self, index: usize) -> Result<NodeDetail> {
        let nodes = self.store.load()?;
        check_index(index, nodes.len())?;

        let (srv, metrics_srv, a_record, cname) = record_ids(&nodes[index])?;
        let (srv, metrics_srv, a_record, cname) = tokio::try_join!(
            self.client.get_record(srv),
            self.client.get_record(metrics_srv),
            self.client.get_record(a_record),
            self.client.get_record(cname),
        )?;

        Ok(NodeDetail {
            name: nodes[index].name.clone(),
            srv,
            metrics_srv,
            a_record,
            cname,
        })
    }
}

fn srv_data(service: &str, target: &str, port: u16) -> SrvData {
    SrvData {
        service: service.to_string(),
        proto: "_tcp".to_string(),
        target: target.to_string(),
        priority: 1,
        weight: 1,
        port,
    }
}

// The store only ever holds complete nodes, so missing ids mean the file
// was edited by hand.
fn record_ids(node: &RelayNode) -> Result<(&str, &str, &str, &str)> {
    Ok((
        node.srv_id.as_deref().context("stored node has no SRV id")?,
        node.metrics_srv_id
            .as_deref()
            .context("stored node has no metrics SRV id")?,
        node.a_record_id
            .as_deref()
            .context("stored node has no A record id")?,
        node.cname_id
            .as_deref()
            .context("stored node has no CNAME id")?,
    ))
}
