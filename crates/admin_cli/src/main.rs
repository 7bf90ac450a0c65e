use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    Account, Amount, Area, CombineMode, Concept, Dependency, Engine, EntryKey, RecomputeCmd,
    RecomputeOutcome, SignCode, WriteEntryCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "primanota_admin")]
#[command(about = "Admin utilities for Primanota (bootstrap catalog, write entries, recompute)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./primanota.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Concept(ConceptArgs),
    Account(AccountArgs),
    Entry(EntryArgs),
    Recompute(RecomputeArgs),
}

#[derive(Args, Debug)]
struct ConceptArgs {
    #[command(subcommand)]
    command: ConceptCommand,
}

#[derive(Subcommand, Debug)]
enum ConceptCommand {
    Create(ConceptCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct ConceptCreateArgs {
    #[arg(long)]
    id: i32,
    #[arg(long)]
    name: String,
    /// Sign code: I (credit), E (debit) or N (neutral).
    #[arg(long)]
    code: Option<String>,
    #[arg(long, default_value = "disbursement")]
    area: String,
    #[arg(long, default_value_t = 0)]
    display_order: i32,
    /// Formula descriptor, e.g. `SUMA(50-99)` or `RESTA(10,11)`.
    #[arg(long, conflicts_with_all = ["reference", "combine_mode"])]
    formula: Option<String>,
    /// Referenced concept id (reference-form descriptor).
    #[arg(long, requires = "combine_mode")]
    reference: Option<i32>,
    /// Combine mode for `--reference`: copy, sum or subtract.
    #[arg(long)]
    combine_mode: Option<String>,
}

#[derive(Args, Debug)]
struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    id: i32,
    #[arg(long)]
    name: String,
    #[arg(long)]
    company_id: i32,
    #[arg(long, default_value = "EUR")]
    currency: String,
}

#[derive(Args, Debug)]
struct EntryArgs {
    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    /// Write a base-concept value and cascade.
    Set(EntrySetArgs),
    /// Show the provenance history of one entry.
    History(EntryKeyArgs),
}

#[derive(Args, Debug)]
struct EntrySetArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    concept_id: i32,
    #[arg(long)]
    account_id: i32,
    #[arg(long)]
    area: String,
    /// Decimal amount, e.g. `1250.30` or `-80,50`.
    #[arg(long)]
    amount: String,
    #[arg(long)]
    actor: Option<String>,
}

#[derive(Args, Debug)]
struct EntryKeyArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    concept_id: i32,
    #[arg(long)]
    account_id: i32,
    #[arg(long)]
    area: String,
}

#[derive(Args, Debug)]
struct RecomputeArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    account_id: Option<i32>,
    #[arg(long)]
    company_id: Option<i32>,
    #[arg(long)]
    actor: Option<String>,
}

fn parse_area(raw: &str) -> Result<Area, String> {
    Area::try_from(raw).map_err(|err| err.to_string())
}

fn parse_code(raw: &str) -> Result<SignCode, String> {
    SignCode::try_from(raw).map_err(|err| err.to_string())
}

fn print_outcome(outcome: &RecomputeOutcome) {
    if outcome.entries_changed.is_empty() {
        println!("nothing changed");
        return;
    }
    for change in &outcome.entries_changed {
        let old = change
            .old_amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "concept {:>4} account {:>4} {:<12} {} -> {}",
            change.concept_id,
            change.account_id,
            change.area.as_str(),
            old,
            change.new_amount
        );
    }
    println!("{} entries changed", outcome.entries_changed.len());
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "primanota_admin={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_db(&cli.database_url).await?;

    let mut builder = Engine::builder()
        .database(db.clone())
        .calendar(settings.calendar()?);
    if let Some(chain) = settings.chain {
        builder = builder.chain(chain);
    }
    let mut engine = builder.build().await?;

    match cli.command {
        Command::Concept(ConceptArgs {
            command: ConceptCommand::Create(args),
        }) => {
            let dependency = match (&args.formula, args.reference, &args.combine_mode) {
                (Some(formula), _, _) => Some(Dependency::parse(formula)?),
                (None, Some(reference), Some(mode)) => {
                    let mode = CombineMode::try_from(mode.as_str())?;
                    Some(Dependency::from_reference(mode, reference))
                }
                _ => None,
            };
            let code = args.code.as_deref().map(parse_code).transpose()?;
            let area = parse_area(&args.area)?;

            let concept = Concept {
                id: args.id,
                name: args.name.clone(),
                code,
                area,
                active: true,
                display_order: args.display_order,
                dependency,
            };
            engine.new_concept(concept).await?;
            println!("created concept: {} ({})", args.name, args.id);
        }
        Command::Concept(ConceptArgs {
            command: ConceptCommand::List,
        }) => {
            for concept in engine.list_concepts().await? {
                let descriptor = concept
                    .dependency
                    .as_ref()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "base".to_string());
                println!(
                    "{:>4} {:<30} {:<12} {:<2} {}",
                    concept.id,
                    concept.name,
                    concept.area.as_str(),
                    concept.code.map(|c| c.as_str()).unwrap_or("-"),
                    descriptor
                );
            }
        }
        Command::Account(AccountArgs {
            command: AccountCommand::Create(args),
        }) => {
            let account = Account::new(args.id, args.name.clone(), args.company_id, args.currency);
            engine.new_account(account).await?;
            println!("created account: {} ({})", args.name, args.id);
        }
        Command::Account(AccountArgs {
            command: AccountCommand::List,
        }) => {
            for account in engine.list_accounts(true).await? {
                println!(
                    "{:>4} {:<30} company {:>4} {} {}",
                    account.id,
                    account.name,
                    account.company_id,
                    account.currency,
                    if account.active { "" } else { "(inactive)" }
                );
            }
        }
        Command::Entry(EntryArgs {
            command: EntryCommand::Set(args),
        }) => {
            let amount: Amount = args.amount.parse()?;
            let outcome = engine
                .write_entry(WriteEntryCmd {
                    date: args.date,
                    concept_id: args.concept_id,
                    account_id: args.account_id,
                    area: parse_area(&args.area)?,
                    amount,
                    actor: args.actor,
                })
                .await?;
            print_outcome(&outcome);
        }
        Command::Entry(EntryArgs {
            command: EntryCommand::History(args),
        }) => {
            let key = EntryKey::new(
                args.date,
                args.concept_id,
                args.account_id,
                parse_area(&args.area)?,
            );
            for record in engine.entry_history(key).await? {
                let previous = record
                    .previous_amount
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} {:<10} {} -> {} {}",
                    record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    record.trigger.as_str(),
                    previous,
                    record.new_amount,
                    record.formula.as_deref().unwrap_or("")
                );
            }
        }
        Command::Recompute(args) => {
            let area = args.area.as_deref().map(parse_area).transpose()?;
            let outcome = engine
                .recompute(RecomputeCmd {
                    date: args.date,
                    area,
                    concept_id: None,
                    account_id: args.account_id,
                    company_id: args.company_id,
                    actor: args.actor,
                })
                .await?;
            print_outcome(&outcome);
        }
    }

    Ok(())
}
