//! # Seed Data Generator
//!
//! Populates the database with a demo user, clients and invoices in every
//! lifecycle state, for development.
//!
//! ## Usage
//! ```bash
//! # Generate 24 invoices (default)
//! cargo run -p invoicer-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p invoicer-db --bin seed -- --count 100
//!
//! # Specify database path
//! cargo run -p invoicer-db --bin seed -- --db ./data/invoicer.db
//! ```
//!
//! ## Generated Invoices
//! Invoice `i` cycles through these outcomes:
//! - draft
//! - sent
//! - viewed, partially paid
//! - paid in full
//! - sent with a past due date (reads as overdue)
//! - canceled

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use invoicer_core::{LineItem, Money, NewInvoice, NewPayment, Percent};
use invoicer_db::{Database, DbConfig, InvoiceService, LedgerConfig};

const DEMO_USER: &str = "demo-user";

const CLIENTS: &[(&str, &str)] = &[
    ("client-acme", "Acme Corporation"),
    ("client-globex", "Globex Industries"),
    ("client-initech", "Initech LLC"),
    ("client-umbrella", "Umbrella Health"),
];

/// (description, unit price in cents)
const SERVICES: &[(&str, i64)] = &[
    ("Website design", 250_000),
    ("Backend development", 15_000),
    ("Code review", 9_500),
    ("Hosting (monthly)", 4_999),
    ("Consulting hour", 17_500),
    ("Logo design", 80_000),
    ("SEO audit", 120_000),
    ("Support retainer", 50_000),
];

/// Tax rates in whole percent
const TAX_RATES: &[u32] = &[0, 5, 8, 10];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,invoicer_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 24;
    let mut db_path = String::from("./invoicer_dev.db");
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(24);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--json" => json = true,
            "--help" | "-h" => {
                println!("Invoicer Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: 24)");
                println!("  -d, --db <PATH>    Database file path (default: ./invoicer_dev.db)");
                println!("      --json         Print the dashboard summary as JSON");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Invoicer Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Invoices: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sequences().current(DEMO_USER).await?;
    if existing > 0 {
        println!("⚠ Demo user already has {} invoices", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    db.accounts().upsert_user(DEMO_USER, Some("DEMO")).await?;
    for (client_id, name) in CLIENTS {
        db.accounts().upsert_client(client_id, DEMO_USER, name).await?;
    }
    println!("✓ Created demo user and {} clients", CLIENTS.len());

    let service = db.service(LedgerConfig::from_env()?);
    let start = std::time::Instant::now();
    let mut generated = 0;

    for index in 0..count {
        if let Err(e) = seed_invoice(&service, index).await {
            warn!(index, error = %e, "Failed to seed invoice");
            continue;
        }

        generated += 1;
        if generated % 10 == 0 {
            info!(generated, "Seeding invoices");
        }
    }

    println!();
    println!("✓ Generated {} invoices in {:?}", generated, start.elapsed());

    let summary = service.dashboard(DEMO_USER).await?;
    println!();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        db.close().await;
        return Ok(());
    }

    println!("Dashboard");
    println!("  Total revenue:      {}", summary.total_revenue);
    println!("  Revenue this month: {}", summary.revenue_this_month);
    println!("  Outstanding:        {}", summary.outstanding);
    println!("  Overdue:            {}", summary.overdue_amount);
    println!(
        "  Counts:             draft {} / sent {} / viewed {} / paid {} / overdue {} / canceled {}",
        summary.counts.draft,
        summary.counts.sent,
        summary.counts.viewed,
        summary.counts.paid,
        summary.counts.overdue,
        summary.counts.canceled
    );

    db.close().await;
    Ok(())
}

/// Creates invoice `index` and drives it to its target state.
async fn seed_invoice(
    service: &InvoiceService,
    index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let (client_id, _) = CLIENTS[index % CLIENTS.len()];

    let items = (0..=(index % 3))
        .map(|offset| {
            let (description, cents) = SERVICES[(index + offset * 3) % SERVICES.len()];
            let quantity = Decimal::from(1 + ((index + offset) % 4) as i64);
            LineItem::from_quantity(description, quantity, Money::from_minor(cents))
        })
        .collect();

    let overdue = index % 6 == 4;
    let issue_date = now - Duration::days(45 - (index % 30) as i64);
    let due_date = if overdue {
        now - Duration::days(3 + (index % 10) as i64)
    } else {
        now + Duration::days(30)
    };

    let view = service
        .create_invoice(NewInvoice {
            user_id: DEMO_USER.to_string(),
            client_id: client_id.to_string(),
            issue_date,
            due_date,
            items,
            tax_rate: Percent::from_whole(TAX_RATES[index % TAX_RATES.len()]),
            discount_rate: if index % 5 == 0 {
                Percent::from_whole(10)
            } else {
                Percent::zero()
            },
            currency: String::new(),
            notes: Some("Thank you for your business.".to_string()),
            terms: Some("Net 30".to_string()),
        })
        .await?;

    let id = view.invoice.id.clone();
    let total = view.invoice.total;

    match index % 6 {
        0 => {}
        1 | 4 => {
            service.send_invoice(DEMO_USER, &id).await?;
        }
        2 => {
            service.send_invoice(DEMO_USER, &id).await?;
            service.mark_viewed(&id).await?;
            let half = Money::from_decimal(total.amount() / Decimal::TWO).round_for_display();
            service
                .record_payment(DEMO_USER, &id, payment(half, "card"))
                .await?;
        }
        3 => {
            service.send_invoice(DEMO_USER, &id).await?;
            service
                .record_payment(DEMO_USER, &id, payment(total, "bank_transfer"))
                .await?;
        }
        _ => {
            service.cancel_invoice(DEMO_USER, &id).await?;
        }
    }

    Ok(())
}

fn payment(amount: Money, method: &str) -> NewPayment {
    NewPayment {
        amount,
        payment_method: method.to_string(),
        payment_date: Utc::now(),
        reference: None,
        notes: None,
    }
}
