// 📊 Summary Aggregator - income, category totals, pot groups
// Derived on demand from the full ledger, never from the filtered view.
// Excluded transactions never count.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::transaction::{Link, Transaction};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";
pub const UNASSIGNED_POT_LABEL: &str = "Unassigned Pot";
pub const TOTAL_LABEL: &str = "Total";

// ============================================================================
// INCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeLine {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeSummary {
    pub lines: Vec<IncomeLine>,
    pub total: f64,
}

impl IncomeSummary {
    /// Lines as label/amount pairs with the trailing "Total" row appended.
    pub fn rows(&self) -> Vec<(String, f64)> {
        self.lines
            .iter()
            .map(|l| (l.name.clone(), l.amount))
            .chain(std::iter::once((TOTAL_LABEL.to_string(), self.total)))
            .collect()
    }
}

pub fn income_summary(ledger: &Ledger) -> Result<IncomeSummary> {
    let mut lines = Vec::new();
    let mut total = 0.0;

    for tx in ledger.iter().filter(|t| !t.excluded() && t.income()) {
        let amount = tx.amount()?;
        total += amount;
        lines.push(IncomeLine {
            id: tx.id().to_string(),
            date: tx.date()?,
            name: tx.name().to_string(),
            amount,
        });
    }

    Ok(IncomeSummary { lines, total })
}

// ============================================================================
// CATEGORY TOTALS
// ============================================================================

/// Spend per category, sorted by name. Income, excluded and Pot rows are left
/// out; grouping is case-sensitive.
pub fn category_totals(ledger: &Ledger) -> Result<BTreeMap<String, f64>> {
    let mut totals = BTreeMap::new();

    for tx in ledger
        .iter()
        .filter(|t| !t.excluded() && !t.income() && !t.is_pot())
    {
        let label = if tx.category().is_empty() {
            UNCATEGORIZED_LABEL
        } else {
            tx.category()
        };
        *totals.entry(label.to_string()).or_insert(0.0) += tx.amount()?;
    }

    Ok(totals)
}

// ============================================================================
// POT GROUPS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LinkStatus {
    Unlinked,
    Linked(String),
    Manual,
}

impl From<&Link> for LinkStatus {
    fn from(link: &Link) -> Self {
        match link {
            Link::None => LinkStatus::Unlinked,
            Link::Counterpart(id) => LinkStatus::Linked(id.clone()),
            Link::Manual => LinkStatus::Manual,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Unlinked => write!(f, "No"),
            LinkStatus::Linked(_) => write!(f, "Yes"),
            LinkStatus::Manual => write!(f, "Manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotLine {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub amount: f64,
    pub status: LinkStatus,
}

impl PotLine {
    fn from_transaction(tx: &Transaction) -> Result<Self> {
        Ok(PotLine {
            id: tx.id().to_string(),
            date: tx.date()?,
            name: tx.name().to_string(),
            amount: tx.amount()?,
            status: LinkStatus::from(tx.link()),
        })
    }
}

/// Pot spend grouped by pot category (sorted), ledger order within a group.
///
/// The "Pot transfer" leg is never a spend and is left out.
pub fn pot_groups(ledger: &Ledger) -> Result<BTreeMap<String, Vec<PotLine>>> {
    let mut groups: BTreeMap<String, Vec<PotLine>> = BTreeMap::new();

    for tx in ledger
        .iter()
        .filter(|t| !t.excluded() && t.is_pot() && !t.is_pot_transfer())
    {
        let label = if tx.pot_category().is_empty() {
            UNASSIGNED_POT_LABEL
        } else {
            tx.pot_category()
        };
        groups
            .entry(label.to_string())
            .or_default()
            .push(PotLine::from_transaction(tx)?);
    }

    Ok(groups)
}

// ============================================================================
// BUNDLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub income: IncomeSummary,
    pub categories: BTreeMap<String, f64>,
    pub pots: BTreeMap<String, Vec<PotLine>>,
}

impl Summary {
    pub fn build(ledger: &Ledger) -> Result<Self> {
        Ok(Summary {
            income: income_summary(ledger)?,
            categories: category_totals(ledger)?,
            pots: pot_groups(ledger)?,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Income")?;
        for (label, amount) in self.income.rows() {
            writeln!(f, "  {:<40} {:>10.2}", label, amount)?;
        }

        writeln!(f, "\nCategories")?;
        for (category, total) in &self.categories {
            writeln!(f, "  {:<40} {:>10.2}", category, total)?;
        }

        writeln!(f, "\nPots")?;
        for (pot, lines) in &self.pots {
            writeln!(f, "  {}", pot)?;
            for line in lines {
                writeln!(
                    f,
                    "    {} {:<34} {:>10.2}  linked: {}",
                    line.date.format("%d/%m/%Y"),
                    line.name,
                    line.amount,
                    line.status
                )?;
            }
        }
        Ok(())
    }
}
