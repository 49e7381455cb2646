//! Thriftr client smoke tool.
//!
//! Exercises the client core against a live Appwrite project. Useful for
//! verifying credentials and collection wiring before pointing a UI at
//! them.
//!
//! # Usage
//!
//! ```bash
//! # Probe for an existing session
//! thriftr-client probe
//!
//! # First page of a category feed (tab 0 is the home feed)
//! thriftr-client products --category 2
//!
//! # Full-text product search
//! thriftr-client search "desk lamp"
//!
//! # The discounted-products section
//! thriftr-client deals
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
// CLI output goes to stdout by design.
#![allow(clippy::print_stdout)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use thriftr_client::auth::SessionStatus;
use thriftr_client::backend::AppwriteBackend;
use thriftr_client::catalog::PAGE_SIZE;
use thriftr_client::repository::ProductRepository;
use thriftr_client::{App, AppConfig};

#[derive(Parser)]
#[command(name = "thriftr-client")]
#[command(author, version, about = "Thriftr client smoke tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe for an existing session
    Probe,
    /// List one page of a category feed
    Products {
        /// Category tab index (0 = home feed)
        #[arg(short, long, default_value_t = 0)]
        category: usize,
        /// Zero-based page
        #[arg(short, long, default_value_t = 0)]
        page: u32,
    },
    /// Search products by name or category
    Search {
        /// Search term
        term: String,
    },
    /// List the discounted-products section
    Deals,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let backend = Arc::new(AppwriteBackend::new(&config));

    match cli.command {
        Commands::Probe => {
            let app = App::new(
                Arc::clone(&backend),
                config.collections.clone(),
                config.buckets.clone(),
            );
            match app.startup().await {
                SessionStatus::Active(user) => {
                    println!("active session: {} <{}>", user.id, user.email);
                }
                SessionStatus::Anonymous => println!("no session"),
            }
        }
        Commands::Products { category, page } => {
            let repo = products(&backend, &config);
            let filter = thriftr_client::catalog::CATEGORIES
                .get(category)
                .filter(|_| category != 0)
                .copied();
            let fetched = repo.page(filter, PAGE_SIZE, page * PAGE_SIZE).await?;
            print_products(&fetched);
        }
        Commands::Search { term } => {
            let repo = products(&backend, &config);
            let fetched = repo.search(&term).await?;
            print_products(&fetched);
        }
        Commands::Deals => {
            let repo = products(&backend, &config);
            let fetched = repo.best_deals(PAGE_SIZE * 2).await?;
            print_products(&fetched);
        }
    }
    Ok(())
}

fn products(backend: &Arc<AppwriteBackend>, config: &AppConfig) -> ProductRepository<AppwriteBackend> {
    ProductRepository::new(
        Arc::clone(backend),
        config.collections.products.clone(),
        config.buckets.product_images.clone(),
    )
}

fn print_products(products: &[thriftr_core::Product]) {
    if products.is_empty() {
        println!("no products");
        return;
    }
    for product in products {
        println!(
            "{}  {:<30}  {:<12}  {}",
            product.id, product.name, product.category, product.price
        );
    }
}
