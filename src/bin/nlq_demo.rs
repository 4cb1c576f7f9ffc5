// Interactive demo: reads utterances from stdin, prints the analysis as
// JSON. Run with `cargo run --bin nlq-demo`, one query per line.

use std::io::{self, BufRead, Write};

use warehouse_nlq::{CatalogRecord, Pipeline, QueryRequest, StaticCatalog};

fn demo_catalog() -> StaticCatalog {
    let records = [
        (1, "PROD001", "Laptop"),
        (2, "PROD002", "Laptop Stand"),
        (3, "PROD003", "Wireless Bluetooth Headphones"),
        (4, "PROD004", "Wireless Mouse"),
        (5, "PROD005", "USB-C Charger"),
        (6, "PROD006", "Office Chair"),
        (7, "PROD007", "Standing Desk"),
        (8, "PROD008", "Monitor"),
    ];
    StaticCatalog::new(
        records
            .into_iter()
            .map(|(id, sku, name)| CatalogRecord {
                id,
                sku: sku.to_string(),
                name: name.to_string(),
            })
            .collect(),
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let pipeline = Pipeline::shared();
    let catalog = demo_catalog();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("warehouse-nlq demo; type a query, Ctrl-D to exit");
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                eprintln!("stdin read failed: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let analysis = pipeline.analyze_with_catalog(&QueryRequest::new(line), &catalog);
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => {
                let _ = writeln!(stdout, "{json}");
            }
            Err(err) => eprintln!("serialization failed: {err}"),
        }
    }
}
