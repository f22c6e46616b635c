//! Relay DNS Library
//!
//! Manages the DNS records (A, CNAME, SRV) that represent test-network
//! relay nodes in a Cloudflare zone.

pub mod assembler;
pub mod cloudflare;
pub mod ops;
pub mod store;
pub mod types;

pub use cloudflare::{CloudflareClient, DnsApi};
pub use ops::NodeOps;
pub use store::NodeStore;
pub use types::{Region, RegionIterations, RelayNode};
