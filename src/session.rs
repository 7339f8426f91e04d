// 🗂️ Review Session - what the reviewer is looking at and working on
// Holds the full ledger, the active filters, the displayed subset and a
// cursor into it. Every mutation goes through here so the displayed rows,
// the cursor and the unsaved-changes flag stay in step with the ledger.

use crate::error::{LedgerError, Result};
use crate::filter::{FilterKey, FilterSet};
use crate::ledger::{load_csv, save_csv, Ledger};
use crate::reconciliation::{self, Candidate};
use crate::summary::Summary;
use crate::transaction::{Link, Transaction};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    pub displayed: usize,
    pub uncategorized: usize,
    pub excluded: usize,
    pub unlinked_pots: usize,
}

#[derive(Debug)]
pub struct Session {
    ledger: Ledger,
    filters: FilterSet,
    /// Ledger positions of the rows passing `filters`, in ledger order.
    /// Positions rather than ids, so rows sharing an id each show once.
    displayed: Vec<usize>,
    /// Index into `displayed`
    selected: Option<usize>,
    source: Option<PathBuf>,
    unsaved_changes: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Ledger::default())
    }
}

impl Session {
    /// Session over `ledger`, showing everything.
    pub fn new(ledger: Ledger) -> Self {
        let mut session = Session {
            ledger,
            filters: FilterSet::all(),
            displayed: Vec::new(),
            selected: None,
            source: None,
            unsaved_changes: false,
        };
        session.refresh();
        session
    }

    /// Fresh session over the ledger stored at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut session = Session::default();
        session.load(path)?;
        Ok(session)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn displayed(&self) -> Vec<&Transaction> {
        self.displayed
            .iter()
            .filter_map(|&pos| self.ledger.transactions().get(pos))
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    fn selected_position(&self) -> Option<usize> {
        self.selected.and_then(|i| self.displayed.get(i)).copied()
    }

    /// Id of the selected row. Actions address transactions by id, so with
    /// duplicate ids they reach the first row carrying it.
    pub fn selected_id(&self) -> Option<&str> {
        self.selected_position()
            .and_then(|pos| self.ledger.transactions().get(pos))
            .map(Transaction::id)
    }

    pub fn selected(&self) -> Result<&Transaction> {
        self.selected_position()
            .and_then(|pos| self.ledger.transactions().get(pos))
            .ok_or_else(|| LedgerError::Logic("no transaction selected".to_string()))
    }

    fn require_selected_id(&self) -> Result<String> {
        self.selected_id()
            .map(str::to_string)
            .ok_or_else(|| LedgerError::Logic("no transaction selected".to_string()))
    }

    // ========================================================================
    // FILTERS & CURSOR
    // ========================================================================

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.refresh();
    }

    pub fn toggle_filter(&mut self, key: FilterKey) -> bool {
        let active = self.filters.toggle(key);
        self.refresh();
        active
    }

    /// Recompute the displayed rows. The cursor stays on the same row when it
    /// is still shown, otherwise on the same position clamped to the end.
    fn refresh(&mut self) {
        let previous_row = self.selected_position();
        let previous_index = self.selected.unwrap_or(0);

        self.displayed = self
            .ledger
            .iter()
            .enumerate()
            .filter(|(_, t)| self.filters.matches(t))
            .map(|(pos, _)| pos)
            .collect();

        self.selected = if self.displayed.is_empty() {
            None
        } else if let Some(i) =
            previous_row.and_then(|row| self.displayed.iter().position(|&d| d == row))
        {
            Some(i)
        } else {
            Some(previous_index.min(self.displayed.len() - 1))
        };
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.displayed.len() {
            return Err(LedgerError::Logic(format!(
                "row {} out of range ({} displayed)",
                index,
                self.displayed.len()
            )));
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn select_id(&mut self, id: &str) -> Result<()> {
        let transactions = self.ledger.transactions();
        let index = self
            .displayed
            .iter()
            .position(|&pos| transactions[pos].id() == id)
            .ok_or_else(|| LedgerError::UnknownId(id.to_string()))?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn next(&mut self) {
        let len = self.displayed.len();
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn previous(&mut self) {
        let len = self.displayed.len();
        if len == 0 {
            return;
        }
        let i = match self.selected {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.selected = Some(i);
    }

    // ========================================================================
    // ACTIONS ON THE SELECTED TRANSACTION
    // ========================================================================

    fn mutate<T>(&mut self, action: impl FnOnce(&mut Ledger, &str) -> Result<T>) -> Result<T> {
        let id = self.require_selected_id()?;
        let out = action(&mut self.ledger, &id)?;
        self.unsaved_changes = true;
        self.refresh();
        Ok(out)
    }

    pub fn set_category(&mut self, category: &str) -> Result<()> {
        self.mutate(|ledger, id| reconciliation::set_category(ledger, id, category))
    }

    pub fn set_pot_category(&mut self, pot_category: &str) -> Result<()> {
        self.mutate(|ledger, id| {
            ledger.require_mut(id)?.set_pot_category(pot_category);
            Ok(())
        })
    }

    pub fn set_status(&mut self, status: &str) -> Result<()> {
        self.mutate(|ledger, id| {
            ledger.require_mut(id)?.set_status(status);
            Ok(())
        })
    }

    pub fn toggle_excluded(&mut self) -> Result<bool> {
        self.mutate(|ledger, id| {
            let tx = ledger.require_mut(id)?;
            tx.set_excluded(!tx.excluded());
            Ok(tx.excluded())
        })
    }

    pub fn toggle_income(&mut self) -> Result<bool> {
        self.mutate(|ledger, id| {
            let tx = ledger.require_mut(id)?;
            tx.set_income(!tx.income());
            Ok(tx.income())
        })
    }

    pub fn clear_row(&mut self) -> Result<()> {
        self.mutate(reconciliation::clear_row)
    }

    /// Ranked counterparts for the selected transaction.
    pub fn pot_candidates(&self) -> Result<Vec<Candidate<'_>>> {
        let id = self.require_selected_id()?;
        reconciliation::rank_candidates(&self.ledger, &id)
    }

    /// Link the selected Pot transaction with `counterpart_id`.
    pub fn link_to(&mut self, counterpart_id: &str) -> Result<()> {
        self.mutate(|ledger, id| reconciliation::set_link_pair(ledger, id, counterpart_id))
    }

    pub fn toggle_manual_link(&mut self) -> Result<Link> {
        self.mutate(reconciliation::toggle_manual_link)
    }

    // ========================================================================
    // FILE ACTIONS
    // ========================================================================

    /// Replace the ledger with `path`. On failure nothing changes.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let ledger = load_csv(path)?;

        self.ledger = ledger;
        self.source = Some(path.to_path_buf());
        self.unsaved_changes = false;
        self.selected = None;
        self.refresh();
        Ok(())
    }

    /// Write the full ledger, whatever the filters show.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        save_csv(path, &self.ledger)?;
        self.source = Some(path.to_path_buf());
        self.unsaved_changes = false;
        Ok(())
    }

    pub fn clear(&mut self) {
        debug!(transactions = self.ledger.len(), "clearing session");
        self.ledger = Ledger::default();
        self.source = None;
        self.unsaved_changes = false;
        self.selected = None;
        self.refresh();
    }

    pub fn categories(&self) -> Vec<String> {
        self.ledger.categories()
    }

    pub fn summary(&self) -> Result<Summary> {
        Summary::build(&self.ledger)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total: self.ledger.len(),
            displayed: self.displayed.len(),
            uncategorized: self.ledger.iter().filter(|t| t.category().is_empty()).count(),
            excluded: self.ledger.iter().filter(|t| t.excluded()).count(),
            unlinked_pots: self
                .ledger
                .iter()
                .filter(|t| FilterKey::UnlinkedPot.matches(t))
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::save_csv;
    use crate::schema::raw_headers;
    use crate::transaction::test_support::tx;
    use tempfile::tempdir;

    fn sample() -> Session {
        let mut a = tx("a", -10.0, "card");
        a.set_category("Groceries");
        let b = tx("b", -20.0, "card");
        let mut c = tx("c", -15.0, "card");
        c.set_category("Transport");
        let d = tx("d", 15.0, "Pot transfer");
        Session::new(Ledger::new(vec![a, b, c, d]))
    }

    #[test]
    fn test_new_session_shows_everything() {
        let session = sample();
        assert!(session.filters().contains(&FilterKey::All));
        assert_eq!(session.displayed().len(), 4);
        assert_eq!(session.selected_id(), Some("a"));
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn test_empty_session_has_no_selection() {
        let session = Session::new(Ledger::default());
        assert!(matches!(session.selected(), Err(LedgerError::Logic(_))));
    }

    #[test]
    fn test_next_previous_wrap() {
        let mut session = sample();
        session.previous();
        assert_eq!(session.selected_id(), Some("d"));
        session.next();
        assert_eq!(session.selected_id(), Some("a"));
        session.next();
        assert_eq!(session.selected_id(), Some("b"));
    }

    #[test]
    fn test_refilter_keeps_cursor_on_same_id() {
        let mut session = sample();
        session.select_id("c").unwrap();

        session.set_filters(FilterSet::parse(["Categorized"]));

        assert_eq!(session.selected_id(), Some("c"));
        assert_eq!(session.selected_index(), Some(1));
    }

    #[test]
    fn test_refilter_clamps_cursor() {
        let mut session = sample();
        session.select_id("d").unwrap();

        session.set_filters(FilterSet::parse(["Transport"]));

        assert_eq!(session.selected_id(), Some("c"));

        session.set_filters(FilterSet::new());
        assert_eq!(session.selected_index(), None);
        assert!(session.selected().is_err());
    }

    #[test]
    fn test_categorising_under_uncategorized_filter() {
        let mut session = sample();
        session.set_filters(FilterSet::parse(["Uncategorized"]));
        assert_eq!(session.selected_id(), Some("b"));

        session.set_category("Groceries").unwrap();

        // row leaves the view; cursor moves to the next remaining row
        assert_eq!(session.selected_id(), Some("d"));
        assert!(session.has_unsaved_changes());
        assert_eq!(session.ledger().get("b").unwrap().category(), "Groceries");
    }

    #[test]
    fn test_link_and_clear_from_session() {
        let mut session = sample();
        session.select_id("c").unwrap();
        session.set_category("Pot").unwrap();
        session.set_pot_category("Holidays").unwrap();

        let best = session.pot_candidates().unwrap()[0].transaction.id().to_string();
        assert_eq!(best, "d");
        session.link_to(&best).unwrap();

        let d = session.ledger().get("d").unwrap();
        assert_eq!(d.link(), &Link::Counterpart("c".to_string()));
        assert_eq!(d.pot_category(), "Holidays");

        session.clear_row().unwrap();
        assert!(session.ledger().get("d").unwrap().link().is_none());
        assert_eq!(session.selected().unwrap().category(), "");
    }

    #[test]
    fn test_manual_link_needs_pot() {
        let mut session = sample();
        assert!(matches!(
            session.toggle_manual_link(),
            Err(LedgerError::NotAPot(_))
        ));
        assert!(!session.has_unsaved_changes());

        session.set_category("Pot").unwrap();
        assert_eq!(session.toggle_manual_link().unwrap(), Link::Manual);
    }

    #[test]
    fn test_toggles() {
        let mut session = sample();
        assert!(session.toggle_excluded().unwrap());
        assert!(session.toggle_income().unwrap());
        assert!(!session.toggle_income().unwrap());
        assert_eq!(session.stats().excluded, 1);
    }

    #[test]
    fn test_save_writes_full_ledger_and_reload() {
        let mut session = sample();
        session.set_filters(FilterSet::parse(["Transport"]));
        session.set_status("checked").unwrap();
        assert_eq!(session.displayed().len(), 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        session.save(&path).unwrap();
        assert!(!session.has_unsaved_changes());

        let mut other = Session::new(Ledger::default());
        other.load(&path).unwrap();
        assert_eq!(other.ledger(), session.ledger());
        assert_eq!(other.ledger().get("c").unwrap().status(), "checked");
        assert_eq!(other.source(), Some(path.as_path()));
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let mut session = sample();
        session.set_status("pending").unwrap();
        let before = session.ledger().clone();

        let dir = tempdir().unwrap();
        assert!(session.load(&dir.path().join("missing.csv")).is_err());

        assert_eq!(session.ledger(), &before);
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_default_session_shows_everything() {
        let session = Session::default();
        assert!(session.filters().contains(&FilterKey::All));
    }

    #[test]
    fn test_open_then_select_and_edit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        save_csv(&path, sample().ledger()).unwrap();

        let mut session = Session::open(&path).unwrap();
        assert_eq!(session.displayed().len(), 4);

        session.select_id("b").unwrap();
        session.set_category("Transport").unwrap();
        session.save(&path).unwrap();

        let reopened = Session::open(&path).unwrap();
        assert_eq!(reopened.ledger().get("b").unwrap().category(), "Transport");
        assert_eq!(reopened.source(), Some(path.as_path()));
    }

    #[test]
    fn test_invalid_file_keeps_previous_session() {
        let mut session = sample();
        session.set_filters(FilterSet::parse(["Groceries"]));
        session.set_status("pending").unwrap();
        let ledger_before = session.ledger().clone();
        let filters_before = session.filters().clone();

        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        let mut wtr = csv::Writer::from_path(&path).unwrap();
        wtr.write_record(raw_headers().filter(|h| *h != "Transaction ID"))
            .unwrap();
        wtr.flush().unwrap();
        drop(wtr);

        let err = session.load(&path).unwrap_err();

        assert!(err.is_validation());
        assert_eq!(session.ledger(), &ledger_before);
        assert_eq!(session.filters(), &filters_before);
        assert!(session.has_unsaved_changes());
        assert_eq!(session.selected_id(), Some("a"));
    }

    #[test]
    fn test_duplicate_ids_each_displayed() {
        let mut first = tx("dup", -1.0, "card");
        first.set_category("Groceries");
        let mut second = tx("dup", -2.0, "card");
        second.set_category("Transport");
        let session = Session::new(Ledger::new(vec![first, second]));

        let categories: Vec<&str> = session.displayed().iter().map(|t| t.category()).collect();
        assert_eq!(categories, vec!["Groceries", "Transport"]);
    }

    #[test]
    fn test_link_to_needs_pot() {
        let mut session = sample();
        session.select_id("b").unwrap();

        assert!(matches!(session.link_to("d"), Err(LedgerError::NotAPot(_))));
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.ledger().get("d").unwrap().category(), "");
    }

    #[test]
    fn test_clear() {
        let mut session = sample();
        session.set_status("x").unwrap();
        session.clear();
        assert!(session.ledger().is_empty());
        assert!(!session.has_unsaved_changes());
        assert_eq!(session.selected_index(), None);
    }

    #[test]
    fn test_categories_and_stats() {
        let session = sample();
        assert_eq!(session.categories(), vec!["Groceries", "Transport"]);

        let stats = session.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.uncategorized, 2);
        assert_eq!(stats.unlinked_pots, 0);
    }
}
