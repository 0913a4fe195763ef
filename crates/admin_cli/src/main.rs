use std::{error::Error, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use engine::{ArchiveCheck, Engine, Receipt};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "hsa_admin")]
#[command(about = "Admin utilities for the HSA receipt archive")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./hsa.db?mode=rwc")]
    database_url: String,

    /// Root of the receipt image archive (also read from `HSA_STORAGE_ROOT`).
    #[arg(long, env = "HSA_STORAGE_ROOT", default_value = "/data/hsa")]
    storage_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the receipts of a household.
    List(ListArgs),
    /// Compare stored image paths with the archive on disk.
    Audit(AuditArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    household: Option<String>,
    /// Only unused, HSA eligible receipts.
    #[arg(long)]
    eligible: bool,
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Move misplaced images to their canonical location.
    #[arg(long)]
    repair: bool,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_receipt(receipt: &Receipt) {
    println!(
        "{:>6}  {}  {:<24} {:>10}  {:<9} {:<6} {}",
        receipt.id,
        receipt.date,
        receipt.vendor,
        receipt.total_amount.to_string(),
        receipt.hsa_status.as_str(),
        if receipt.used { "used" } else { "unused" },
        receipt.image_path.display()
    );
}

fn print_check(check: &ArchiveCheck) {
    let state = if !check.exists {
        "missing"
    } else if check.is_consistent() {
        "ok"
    } else {
        "misplaced"
    };
    match &check.expected {
        Some(expected) if expected != &check.current => println!(
            "{:>6}  {state:<9} {} -> {}",
            check.receipt_id,
            check.current.display(),
            expected.display()
        ),
        _ => println!(
            "{:>6}  {state:<9} {}",
            check.receipt_id,
            check.current.display()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder()
        .database(db)
        .storage_root(cli.storage_root)
        .build()
        .await?;

    match cli.command {
        Command::List(args) => {
            let household = args.household.as_deref();
            let receipts = if args.eligible {
                engine.eligible_receipts(household).await?
            } else {
                engine.receipts(household).await?
            };
            for receipt in &receipts {
                print_receipt(receipt);
            }
            let total: engine::MoneyCents = receipts.iter().map(|r| r.total_amount).sum();
            println!("{} receipts, total {total}", receipts.len());
        }
        Command::Audit(args) => {
            let checks = engine.audit_archive().await?;
            for check in checks.iter().filter(|c| !c.is_consistent()) {
                print_check(check);
            }
            let inconsistent = checks.iter().filter(|c| !c.is_consistent()).count();
            println!("{} receipts checked, {inconsistent} inconsistent", checks.len());

            if args.repair && inconsistent > 0 {
                let repaired = engine.repair_archive().await?;
                println!("repaired {} receipts", repaired.len());
                if repaired.len() < inconsistent {
                    eprintln!("some receipts could not be repaired (missing images)");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
