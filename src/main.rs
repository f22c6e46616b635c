//! Relay DNS CLI
//!
//! Interactive prompt for managing test-network relay nodes as Cloudflare
//! DNS records.
//!
//! # Usage
//! ```bash
//! export CLOUDFLARE_API_TOKEN=...
//! relay-dns --zone-id <zone> --domain testnet.example.com
//! > list
//! > add
//! > delete
//! > detail
//! > exit
//! ```

use std::env;
use std::io::Write as _;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_dns::ops::NodeDetail;
use relay_dns::types::RelayNode;
use relay_dns::{CloudflareClient, NodeOps, NodeStore, Region};

/// Manage test-network relay nodes as Cloudflare DNS records
#[derive(Parser, Debug)]
#[command(name = "relay-dns", version, about)]
struct Args {
    /// Cloudflare Zone ID
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    zone_id: String,

    /// Network domain relay records live under (e.g. testnet.example.com)
    #[arg(long, env = "RELAY_NETWORK_DOMAIN")]
    domain: String,

    /// Path of the local node store file
    #[arg(long, default_value = "relay-nodes.json")]
    store: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the --verbose default when set.
    let default_directive = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let api_token = env::var("CLOUDFLARE_API_TOKEN")
        .context("CLOUDFLARE_API_TOKEN environment variable not set")?;

    let client = CloudflareClient::new(api_token, args.zone_id.clone())?;
    let store = NodeStore::new(&args.store);
    let ops = NodeOps::new(client, store, args.domain.clone());

    info!(zone_id = %args.zone_id, domain = %args.domain, "relay-dns ready");

    run_prompt_loop(&ops).await
}

/// Dispatch operator commands until `exit` or end of input
async fn run_prompt_loop(ops: &NodeOps<CloudflareClient>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = read_line(&mut lines, "> ").await? else {
            break;
        };

        let result = match line.to_lowercase().as_str() {
            "" => continue,
            "exit" => break,
            "list" => run_list(ops).await,
            "add" => run_add(ops, &mut lines).await,
            "delete" => run_delete(ops, &mut lines).await,
            "detail" => run_detail(ops, &mut lines).await,
            other => {
                println!("unknown command '{}' (list, add, delete, detail, exit)", other);
                continue;
            }
        };

        if let Err(e) = result {
            eprintln!("error: {:#}", e);
        }
    }

    Ok(())
}

async fn run_list(ops: &NodeOps<CloudflareClient>) -> Result<()> {
    let nodes = ops.list().await?;
    print_nodes(&nodes);
    Ok(())
}

async fn run_add(ops: &NodeOps<CloudflareClient>, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    let ip = prompt(lines, "ip: ").await?;
    let hostname = prompt(lines, "hostname: ").await?;
    let region: Region = prompt(lines, "region (na/eu/apac/sa/af): ").await?.parse()?;

    let alias = ops.add(&ip, &hostname, region).await?;
    println!("created relay node {}", alias);
    Ok(())
}

async fn run_delete(ops: &NodeOps<CloudflareClient>, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    let index = prompt_index(lines).await?;
    let removed = ops.delete(index).await?;
    println!("deleted relay node {}", removed.name);
    Ok(())
}

async fn run_detail(ops: &NodeOps<CloudflareClient>, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    let index = prompt_index(lines).await?;
    let detail = ops.detail(index).await?;
    print_detail(&detail)
}

fn print_nodes(nodes: &[RelayNode]) {
    println!("{} relay nodes", nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        println!("{:>3}  {}", index, node.name);
    }
}

fn print_detail(detail: &NodeDetail) -> Result<()> {
    println!("relay node {}", detail.name);
    for (label, record) in [
        ("srv", &detail.srv),
        ("metrics srv", &detail.metrics_srv),
        ("a record", &detail.a_record),
        ("cname", &detail.cname),
    ] {
        println!("--- {}", label);
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    Ok(())
}

async fn prompt_index(lines: &mut Lines<BufReader<Stdin>>) -> Result<usize> {
    let input = prompt(lines, "index: ").await?;
    input
        .parse()
        .with_context(|| format!("'{}' is not a valid node index", input))
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String> {
    match read_line(lines, label).await? {
        Some(line) => Ok(line),
        None => bail!("input closed"),
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}
