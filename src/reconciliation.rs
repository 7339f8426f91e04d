// ⚖️ Pot Reconciliation - pair pot movements with their transfer leg
// A pot movement shows up twice: once on the main account and once as a
// "Pot transfer". Linking records the pair on both rows.
//
// Invariant: if A.link == B.id then B.link == A.id. Every function here
// that sets or clears a link updates both sides. The manual-link sentinel
// has no counterpart and is the only one-sided link.

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::transaction::{Link, Transaction, POT_CATEGORY};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// CANDIDATE RANKING
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub transaction: &'a Transaction,
    /// `| |candidate.amount| - |target.amount| |`
    pub distance: f64,
}

/// Rank possible counterparts for `target_id`.
///
/// Only "Pot transfer" rows other than the target are considered, closest
/// absolute amount first. Ties keep ledger order.
pub fn rank_candidates<'a>(ledger: &'a Ledger, target_id: &str) -> Result<Vec<Candidate<'a>>> {
    let target = ledger.require(target_id)?;
    let target_amount = target.amount()?.abs();

    let mut candidates = ledger
        .iter()
        .filter(|t| t.is_pot_transfer() && t.id() != target.id())
        .map(|t| -> Result<Candidate<'a>> {
            Ok(Candidate {
                transaction: t,
                distance: (t.amount()?.abs() - target_amount).abs(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // stable
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(candidates)
}

// ============================================================================
// LINK MAINTENANCE
// ============================================================================

/// Clear `id`'s link and every counterpart link pointing back at `id`.
///
/// Returns the link `id` held before.
pub fn clear_link(ledger: &mut Ledger, id: &str) -> Result<Link> {
    let tx = ledger.require_mut(id)?;
    let previous = tx.link().clone();
    tx.set_link(Link::None);

    let mut unlinked = Vec::new();
    for other in ledger.iter_mut() {
        if other.link().counterpart() == Some(id) && other.id() != id {
            other.set_link(Link::None);
            unlinked.push(other.id().to_string());
        }
    }

    if !previous.is_none() || !unlinked.is_empty() {
        debug!(id, previous = %previous, counterparts = ?unlinked, "cleared link");
    }

    Ok(previous)
}

/// Link `id` to `counterpart_id` on both sides.
///
/// `id` must be categorised Pot. Any earlier link held by either transaction
/// is cleared first (on both of its sides). The counterpart becomes a Pot row
/// with the same pot category.
pub fn set_link_pair(ledger: &mut Ledger, id: &str, counterpart_id: &str) -> Result<()> {
    if id == counterpart_id {
        return Err(LedgerError::SelfLink(id.to_string()));
    }
    ledger.require(counterpart_id)?;
    let target = ledger.require(id)?;
    if !target.is_pot() {
        return Err(LedgerError::NotAPot(id.to_string()));
    }
    let pot_category = target.pot_category().to_string();

    clear_link(ledger, id)?;
    clear_link(ledger, counterpart_id)?;

    ledger
        .require_mut(id)?
        .set_link(Link::Counterpart(counterpart_id.to_string()));

    let counterpart = ledger.require_mut(counterpart_id)?;
    counterpart.set_category(POT_CATEGORY);
    counterpart.set_pot_category(pot_category);
    counterpart.set_link(Link::Counterpart(id.to_string()));

    debug!(id, counterpart_id, "linked pot pair");
    Ok(())
}

/// Toggle the manual-link sentinel on a Pot transaction.
///
/// Turning it on first releases any real counterpart. Returns the new link.
pub fn toggle_manual_link(ledger: &mut Ledger, id: &str) -> Result<Link> {
    let tx = ledger.require(id)?;
    if !tx.is_pot() {
        return Err(LedgerError::NotAPot(id.to_string()));
    }

    if *tx.link() == Link::Manual {
        ledger.require_mut(id)?.set_link(Link::None);
        debug!(id, "manual link removed");
        return Ok(Link::None);
    }

    clear_link(ledger, id)?;
    ledger.require_mut(id)?.set_link(Link::Manual);
    debug!(id, "manual link set");
    Ok(Link::Manual)
}

/// Set a category. Moving away from Pot drops the pot category and the link.
pub fn set_category(ledger: &mut Ledger, id: &str, category: &str) -> Result<()> {
    let tx = ledger.require_mut(id)?;
    let was_pot = tx.is_pot();
    tx.set_category(category);

    if was_pot && !tx.is_pot() {
        tx.set_pot_category("");
        clear_link(ledger, id)?;
    }
    Ok(())
}

/// Reset a row's processed fields, releasing its counterpart first.
pub fn clear_row(ledger: &mut Ledger, id: &str) -> Result<()> {
    clear_link(ledger, id)?;
    ledger.require_mut(id)?.clear_processed();
    Ok(())
}

// ============================================================================
// LINK AUDIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LinkIssue {
    /// `id` links to a transaction that is not in the ledger
    Dangling { id: String, counterpart: String },
    /// `id` links to `counterpart`, which links elsewhere
    Asymmetric { id: String, counterpart: String, back: String },
}

/// Find links that break the pairing invariant, in ledger order.
pub fn verify_links(ledger: &Ledger) -> Vec<LinkIssue> {
    let mut issues = Vec::new();

    for tx in ledger {
        let Some(counterpart) = tx.link().counterpart() else {
            continue;
        };

        match ledger.get(counterpart) {
            None => issues.push(LinkIssue::Dangling {
                id: tx.id().to_string(),
                counterpart: counterpart.to_string(),
            }),
            Some(other) if other.link().counterpart() != Some(tx.id()) => {
                issues.push(LinkIssue::Asymmetric {
                    id: tx.id().to_string(),
                    counterpart: counterpart.to_string(),
                    back: other.link().to_string(),
                })
            }
            Some(_) => {}
        }
    }

    issues
}

// ============================================================================
// TESTS
// ============================================================================
