//! Relay Node Assembler
//!
//! Joins SRV, CNAME, and A records back into logical relay nodes and
//! derives the per-region iteration counters from relay CNAME names.

use tracing::warn;

use crate::cloudflare::{AliasRecord, ZoneRecords};
use crate::types::{Region, RegionIterations, RelayNode};

/// SRV service advertised by relay bootstrap endpoints
pub const BOOTSTRAP_SERVICE: &str = "_algobootstrap";
/// SRV service advertised by relay metrics endpoints
pub const METRICS_SERVICE: &str = "_metrics";

/// Parse the leading DNS label of a relay CNAME name as `r-{region}-{iteration}`.
///
/// The label must split into exactly three hyphen-separated segments, the
/// first being the literal `r`, the region one of the known codes, and the
/// iteration numeric. Anything else is not a relay alias.
fn parse_relay_label(name: &str) -> Option<(Region, u32)> {
    let label = name.split('.').next()?;
    let mut segments = label.split('-');
    let (prefix, region, iteration) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || prefix != "r" {
        return None;
    }
    let region: Region = region.parse().ok()?;
    let iteration: u32 = iteration.parse().ok()?;
    Some((region, iteration))
}

/// Compute the highest iteration seen per region across the zone's CNAMEs
pub fn region_iterations(cnames: &[AliasRecord]) -> RegionIterations {
    let mut iterations = RegionIterations::default();
    for cname in cnames {
        if let Some((region, iteration)) = parse_relay_label(&cname.name) {
            iterations.observe(region, iteration);
        }
    }
    iterations
}

/// Join the zone's records into relay nodes.
///
/// For each `_algobootstrap` SRV: the matching `_metrics` SRV shares its
/// target, the CNAME is named after the target, and the A record is named
/// after the CNAME's content. First match wins in API-returned order; SRV
/// records sharing a target are not deduplicated. Only complete nodes are
/// returned; incomplete ones are logged and dropped.
pub fn assemble_nodes(zone: &ZoneRecords) -> Vec<RelayNode> {
    let mut nodes = Vec::new();

    for srv in zone.srv.iter().filter(|s| s.data.service == BOOTSTRAP_SERVICE) {
        let target = &srv.data.target;

        let metrics = zone
            .srv
            .iter()
            .find(|m| m.data.service == METRICS_SERVICE && m.data.target == *target);
        let cname = zone.cname.iter().find(|c| c.name == *target);
        let a_record = cname.and_then(|c| zone.a.iter().find(|a| a.name == c.content));

        let node = RelayNode {
            name: target.clone(),
            srv_id: Some(srv.id.clone()),
            metrics_srv_id: metrics.map(|m| m.id.clone()),
            a_record_id: a_record.map(|a| a.id.clone()),
            cname_id: cname.map(|c| c.id.clone()),
        };

        if node.is_complete() {
            nodes.push(node);
        } else {
            warn!(
                relay = %node.name,
                has_metrics = node.metrics_srv_id.is_some(),
                has_cname = node.cname_id.is_some(),
                has_a_record = node.a_record_id.is_some(),
                "skipping incomplete relay node"
            );
        }
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::{AddressRecord, ServiceRecord, SrvData};

    fn alias(id: &str, name: &str, content: &str) -> AliasRecord {
        AliasRecord {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    fn address(id: &str, name: &str, content: &str) -> AddressRecord {
        AddressRecord {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    fn srv(id: &str, service: &str, target: &str, port: u16) -> ServiceRecord {
        ServiceRecord {
            id: id.to_string(),
            name: format!("{}._tcp.testnet", service),
            data: SrvData {
                service: service.to_string(),
                proto: "_tcp".to_string(),
                target: target.to_string(),
                priority: 1,
                weight: 1,
                port,
            },
        }
    }

    #[test]
    fn counters_track_per_region_maximum() {
        let cnames = vec![
            alias("c1", "r-na-1", "relay1.testnet"),
            alias("c2", "r-na-3", "relay3.testnet"),
            alias("c3", "r-eu-1", "relay4.testnet"),
        ];
        let iters = region_iterations(&cnames);

        assert_eq!(iters.max(Region::Na), 3);
        assert_eq!(iters.max(Region::Eu), 1);
        assert_eq!(iters.max(Region::Apac), 0);
        assert_eq!(iters.max(Region::Sa), 0);
        assert_eq!(iters.max(Region::Af), 0);
    }

    #[test]
    fn counters_ignore_non_relay_names() {
        let cnames = vec![
            alias("c1", "www.testnet", "host.testnet"),
            alias("c2", "r-mars-1", "host.testnet"),
            alias("c3", "r-na-x", "host.testnet"),
            alias("c4", "r-na-1-extra", "host.testnet"),
            alias("c5", "relay-na-2", "host.testnet"),
        ];
        let iters = region_iterations(&cnames);

        for region in Region::ALL {
            assert_eq!(iters.max(region), 0);
        }
    }

    #[test]
    fn relay_label_parses_past_the_first_dot() {
        assert_eq!(parse_relay_label("r-na-4.testnet"), Some((Region::Na, 4)));
        assert_eq!(parse_relay_label("r-apac-12"), Some((Region::Apac, 12)));
        assert_eq!(parse_relay_label("r-na-4.testnet.example.com"), Some((Region::Na, 4)));
    }

    #[test]
    fn assembles_a_complete_node_from_four_records() {
        let zone = ZoneRecords {
            a: vec![address("a1", "relay9.testnet", "1.2.3.4")],
            cname: vec![alias("c1", "r-na-4.testnet", "relay9.testnet")],
            srv: vec![
                srv("s1", BOOTSTRAP_SERVICE, "r-na-4.testnet", 5011),
                srv("s2", METRICS_SERVICE, "r-na-4.testnet", 9100),
            ],
        };

        let nodes = assemble_nodes(&zone);
        assert_eq!(nodes.len(), 1);

        let node = &nodes[0];
        assert_eq!(node.name, "r-na-4.testnet");
        assert_eq!(node.srv_id.as_deref(), Some("s1"));
        assert_eq!(node.metrics_srv_id.as_deref(), Some("s2"));
        assert_eq!(node.a_record_id.as_deref(), Some("a1"));
        assert_eq!(node.cname_id.as_deref(), Some("c1"));
        assert!(node.is_complete());
    }

    #[test]
    fn incomplete_nodes_are_dropped() {
        // Bootstrap SRV without a metrics twin, and one whose CNAME is gone.
        let zone = ZoneRecords {
            a: vec![address("a1", "relay9.testnet", "1.2.3.4")],
            cname: vec![alias("c1", "r-na-4.testnet", "relay9.testnet")],
            srv: vec![
                srv("s1", BOOTSTRAP_SERVICE, "r-na-4.testnet", 5011),
                srv("s3", BOOTSTRAP_SERVICE, "r-eu-1.testnet", 5011),
                srv("s4", METRICS_SERVICE, "r-eu-1.testnet", 9100),
            ],
        };

        let nodes = assemble_nodes(&zone);
        assert!(nodes.is_empty());
    }

    #[test]
    fn non_bootstrap_srv_records_produce_no_node() {
        let zone = ZoneRecords {
            a: vec![],
            cname: vec![],
            srv: vec![srv("s1", METRICS_SERVICE, "r-na-1.testnet", 9100)],
        };
        assert!(assemble_nodes(&zone).is_empty());
    }

    #[test]
    fn first_matching_record_wins() {
        let zone = ZoneRecords {
            a: vec![
                address("a1", "relay9.testnet", "1.2.3.4"),
                address("a2", "relay9.testnet", "5.6.7.8"),
            ],
            cname: vec![alias("c1", "r-na-4.testnet", "relay9.testnet")],
            srv: vec![
                srv("s1", BOOTSTRAP_SERVICE, "r-na-4.testnet", 5011),
                srv("s2", METRICS_SERVICE, "r-na-4.testnet", 9100),
            ],
        };

        let nodes = assemble_nodes(&zone);
        assert_eq!(nodes[0].a_record_id.as_deref(), Some("a1"));
    }
}
