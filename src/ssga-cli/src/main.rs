//! ssga: send a single server-side analytics hit from the command line.
//!
//! Configuration comes from `SSGA__*` environment variables; flags override it.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ssga_core::config::TrackerConfig;
use ssga_core::{ParameterSet, ProductField};
use ssga_tracker::transport::encode_form;
use ssga_tracker::{
    HitOutcome, HttpTransport, MemoryIdentityStore, RecordingTransport, RequestContext,
    SessionBuilder, Transaction, Transport,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ssga")]
#[command(about = "Send server-side analytics hits to the collector")]
#[command(version)]
struct Cli {
    /// Tracking id (overrides config)
    #[arg(long, env = "SSGA__TRACKING_ID")]
    tracking_id: Option<String>,

    /// Previously persisted `_ga` cookie value
    #[arg(long)]
    cookie: Option<String>,

    /// Request host used for pageview hits and the cookie domain depth
    #[arg(long)]
    host: Option<String>,

    /// Request path and query used for pageview hits
    #[arg(long)]
    path: Option<String>,

    /// Request timeout in seconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Extra hit parameter, `key=value` (repeatable)
    #[arg(long = "param", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    /// Assemble the hit and print it instead of sending it
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pageview for --host / --path
    Pageview,

    /// Event hit with category and action
    Event { category: String, action: String },

    /// Checkout step with products
    Checkout {
        /// Step number (1 = payment, 2 = delivery)
        #[arg(long)]
        step: i64,

        /// Checkout option, e.g. the payment method
        #[arg(long)]
        value: String,

        /// Product as `key=value,...` or a JSON object (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },

    /// Purchase transaction with products
    Purchase {
        /// Transaction id
        #[arg(long)]
        ti: String,

        #[arg(long)]
        affiliation: String,

        #[arg(long)]
        revenue: f64,

        #[arg(long)]
        shipping: Option<f64>,

        #[arg(long)]
        tax: Option<f64>,

        #[arg(long)]
        coupon: Option<String>,

        /// Product as `key=value,...` or a JSON object (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },

    /// Refund of a whole transaction
    Refund {
        /// Transaction id
        ti: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssga=info,ssga_tracker=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = TrackerConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        TrackerConfig::default()
    });
    if let Some(tid) = cli.tracking_id.clone() {
        config.tracking_id = Some(tid);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = Some(timeout);
    }

    let store = match &cli.cookie {
        Some(cookie) => {
            MemoryIdentityStore::new().with_value(config.identity.cookie_name.clone(), cookie.clone())
        }
        None => MemoryIdentityStore::new(),
    };
    let recorder = Arc::new(RecordingTransport::with_status(200));
    let transport: Arc<dyn Transport> = if cli.dry_run {
        recorder.clone()
    } else {
        Arc::new(HttpTransport::from_config(&config))
    };

    let session = SessionBuilder::from_config(&config)?
        .identity_store(Arc::new(store))
        .request_context(RequestContext {
            host: cli.host.clone(),
            path: cli.path.clone(),
        })
        .transport(transport)
        .build();

    info!(
        tid = %session.tracking_id(),
        cid = %session.client_id(),
        dry_run = cli.dry_run,
        "session ready"
    );

    let params: ParameterSet = cli.params.iter().cloned().collect();
    let outcome = match &cli.command {
        Commands::Pageview => session.send_pageview(params),
        Commands::Event { category, action } => session.send_event(category, action, params),
        Commands::Checkout { step, value, items } => {
            let items = parse_items(items)?;
            session.send_checkout(&items, *step, value.as_str(), params)
        }
        Commands::Purchase {
            ti,
            affiliation,
            revenue,
            shipping,
            tax,
            coupon,
            items,
        } => {
            let items = parse_items(items)?;
            let transaction = Transaction {
                shipping: *shipping,
                tax: *tax,
                coupon: coupon.clone(),
                ..Transaction::new(ti.as_str(), affiliation.as_str(), *revenue)
            };
            session.send_purchase(&items, &transaction, params)
        }
        Commands::Refund { ti } => session.send_refund(ti.as_str(), params),
    };

    if cli.dry_run {
        if let Some(hit) = recorder.last() {
            println!("{}", encode_form(&hit));
        }
    }
    println!("_ga={}", session.persisted_token());

    Ok(match outcome {
        HitOutcome::Delivered => {
            info!("hit delivered");
            ExitCode::SUCCESS
        }
        HitOutcome::Failed(reason) => {
            warn!(reason = %reason, "hit failed");
            ExitCode::from(1)
        }
        HitOutcome::Unknown => {
            warn!("hit outcome unknown, transport unavailable");
            ExitCode::from(2)
        }
    })
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Parse one `--item`: a JSON object, or `key=value` pairs separated by commas.
fn parse_item(raw: &str) -> anyhow::Result<ProductField> {
    let raw = raw.trim();
    if raw.starts_with('{') {
        return ProductField::from_json(raw).with_context(|| format!("invalid item '{raw}'"));
    }
    let pairs = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            parse_key_value(part.trim())
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .map_err(|e| anyhow!(e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(ProductField::from_attributes(pairs))
}

fn parse_items(raw: &[String]) -> anyhow::Result<Vec<ProductField>> {
    raw.iter().map(|item| parse_item(item)).collect()
}
