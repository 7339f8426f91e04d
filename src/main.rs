use anyhow::{bail, Context, Result};
use budget_review::{
    init_tracing, verify_links, Config, FilterSet, LinkIssue, Session, Transaction, POT_CATEGORY,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "budget-review", version, about = "Review and reconcile a bank transaction export")]
struct Cli {
    /// Config file (default: <config dir>/budget-review/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Output {
    /// Write the result here instead of back to FILE
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a ledger and report duplicate ids and broken links
    Check { file: PathBuf },

    /// List transactions passing the given filters (default: all)
    List {
        file: PathBuf,
        /// all, excluded, uncategorized, categorized, "unlinked pot" or a category
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Income, category totals and pot groups
    Summary {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Rank pot transfer counterparts for a transaction
    Candidates { file: PathBuf, id: String },

    /// Set a category (a quick key such as `g` is expanded)
    Categorise {
        file: PathBuf,
        id: String,
        category: String,
        /// Pot category, for category Pot
        #[arg(long)]
        pot: Option<String>,
        #[command(flatten)]
        out: Output,
    },

    /// Link a transaction with its pot transfer counterpart
    Link {
        file: PathBuf,
        id: String,
        counterpart: String,
        #[command(flatten)]
        out: Output,
    },

    /// Toggle the manual link on a Pot transaction
    ManualLink {
        file: PathBuf,
        id: String,
        #[command(flatten)]
        out: Output,
    },

    /// Reset a transaction's review state
    Clear {
        file: PathBuf,
        id: String,
        #[command(flatten)]
        out: Output,
    },

    /// Toggle the income flag
    Income {
        file: PathBuf,
        id: String,
        #[command(flatten)]
        out: Output,
    },

    /// Toggle the excluded flag
    Exclude {
        file: PathBuf,
        id: String,
        #[command(flatten)]
        out: Output,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load config")?;

    match cli.command {
        Command::Check { file } => run_check(&config, &file),
        Command::List { file, filters } => run_list(&config, &file, &filters),
        Command::Summary { file, json } => run_summary(&config, &file, json),
        Command::Candidates { file, id } => run_candidates(&config, &file, &id),
        Command::Categorise {
            file,
            id,
            category,
            pot,
            out,
        } => edit(&config, &file, &id, out, |session| {
            let category = config
                .quick_category(&category)
                .unwrap_or(category.as_str())
                .to_string();
            session.set_category(&category)?;
            if let Some(query) = &pot {
                if category != POT_CATEGORY {
                    bail!("--pot only applies to category {}", POT_CATEGORY);
                }
                session.set_pot_category(&resolve_pot(&config, query)?)?;
            }
            Ok(())
        }),
        Command::Link {
            file,
            id,
            counterpart,
            out,
        } => edit(&config, &file, &id, out, |session| {
            session.link_to(&counterpart)?;
            Ok(())
        }),
        Command::ManualLink { file, id, out } => edit(&config, &file, &id, out, |session| {
            let link = session.toggle_manual_link()?;
            println!("link: {}", if link.is_none() { "(none)" } else { link.as_str() });
            Ok(())
        }),
        Command::Clear { file, id, out } => edit(&config, &file, &id, out, |session| {
            session.clear_row()?;
            Ok(())
        }),
        Command::Income { file, id, out } => edit(&config, &file, &id, out, |session| {
            println!("income: {}", session.toggle_income()?);
            Ok(())
        }),
        Command::Exclude { file, id, out } => edit(&config, &file, &id, out, |session| {
            println!("excluded: {}", session.toggle_excluded()?);
            Ok(())
        }),
    }
}

/// A relative FILE that does not exist here is looked up in the data directory.
fn resolve_file(config: &Config, file: &Path) -> PathBuf {
    if file.is_relative() && !file.exists() {
        let candidate = config.data_dir.join(file);
        if candidate.exists() {
            return candidate;
        }
    }
    file.to_path_buf()
}

fn open(config: &Config, file: &Path) -> Result<Session> {
    let path = resolve_file(config, file);
    Session::open(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Exact (case-insensitive) match first, otherwise a unique substring match.
/// Unknown names are taken as given.
fn resolve_pot(config: &Config, query: &str) -> Result<String> {
    if let Some(exact) = config
        .pot_categories
        .iter()
        .find(|c| c.eq_ignore_ascii_case(query))
    {
        return Ok(exact.clone());
    }

    match config.matching_pot_categories(query).as_slice() {
        [] => Ok(query.to_string()),
        [one] => Ok(one.to_string()),
        many => bail!("Pot category '{}' is ambiguous: {}", query, many.join(", ")),
    }
}

fn edit<F>(config: &Config, file: &Path, id: &str, out: Output, action: F) -> Result<()>
where
    F: FnOnce(&mut Session) -> Result<()>,
{
    let mut session = open(config, file)?;
    session.select_id(id)?;

    action(&mut session)?;

    let target = match (out.output, session.source()) {
        (Some(path), _) => path,
        (None, Some(source)) => source.to_path_buf(),
        (None, None) => file.to_path_buf(),
    };
    session
        .save(&target)
        .with_context(|| format!("Failed to save {}", target.display()))?;

    let tx = session.selected()?;
    println!("{}", row(tx));
    println!("✓ Saved {} transactions to {}", session.ledger().len(), target.display());
    Ok(())
}

fn row(tx: &Transaction) -> String {
    let date = tx
        .date()
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default();
    let amount = tx.amount().unwrap_or_default();
    let mut flags = String::new();
    if tx.excluded() {
        flags.push('X');
    }
    if tx.income() {
        flags.push('I');
    }

    format!(
        "{:<24} {:<10} {:<30} {:>10.2} {:<16} {:<18} {:<24} {}",
        tx.id(),
        date,
        truncate(tx.name(), 30),
        amount,
        tx.category(),
        tx.pot_category(),
        tx.link().as_str(),
        flags
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn run_check(config: &Config, file: &Path) -> Result<()> {
    let session = open(config, file)?;
    let stats = session.stats();

    println!("📂 {} transactions", stats.total);
    println!("   uncategorized: {}", stats.uncategorized);
    println!("   excluded:      {}", stats.excluded);
    println!("   unlinked pots: {}", stats.unlinked_pots);

    let dups = session.ledger().duplicate_ids();
    if !dups.is_empty() {
        println!("⚠️  duplicate ids: {}", dups.join(", "));
    }

    let issues = verify_links(session.ledger());
    for issue in &issues {
        match issue {
            LinkIssue::Dangling { id, counterpart } => {
                println!("❌ {} links to missing transaction {}", id, counterpart)
            }
            LinkIssue::Asymmetric { id, counterpart, back } => println!(
                "❌ {} links to {}, which links to '{}'",
                id, counterpart, back
            ),
        }
    }

    if !issues.is_empty() {
        bail!("{} broken link(s)", issues.len());
    }
    println!("✓ Links consistent");
    Ok(())
}

fn run_list(config: &Config, file: &Path, filters: &[String]) -> Result<()> {
    let mut session = open(config, file)?;
    if !filters.is_empty() {
        session.set_filters(FilterSet::parse(filters));
    }

    let displayed = session.displayed();
    for tx in &displayed {
        println!("{}", row(tx));
    }
    println!("{} of {} transactions", displayed.len(), session.ledger().len());
    Ok(())
}

fn run_summary(config: &Config, file: &Path, json: bool) -> Result<()> {
    let session = open(config, file)?;
    let summary = session.summary().context("Failed to build summary")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

fn run_candidates(config: &Config, file: &Path, id: &str) -> Result<()> {
    let mut session = open(config, file)?;
    session.select_id(id)?;

    let candidates = session.pot_candidates()?;
    if candidates.is_empty() {
        println!("No pot transfer candidates for {}", id);
        return Ok(());
    }

    for (rank, c) in candidates.iter().enumerate() {
        println!("{:>3}. {}  (Δ {:.2})", rank + 1, row(c.transaction), c.distance);
    }
    Ok(())
}
