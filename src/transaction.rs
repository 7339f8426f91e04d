// 💳 Transaction - raw record plus review state
// The raw record is owned and never changes; processed attributes are
// mutated through setters as the user reviews.

use crate::error::ValidationError;
use crate::raw::RawRecord;
use crate::schema::{save_headers, ProcessedField};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Category that marks a pot movement.
pub const POT_CATEGORY: &str = "Pot";

/// Raw `Type` of the transfer leg into or out of a pot.
pub const POT_TRANSFER_TYPE: &str = "Pot transfer";

/// Persisted value of [`Link::Manual`].
pub const MANUAL_LINK_ID: &str = "MANUAL_LINK";

// ============================================================================
// LINK
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Link {
    #[default]
    None,
    /// Id of the counterpart transaction
    Counterpart(String),
    /// Reconciled pot movement with no counterpart row in this ledger
    Manual,
}

impl Link {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" => Link::None,
            MANUAL_LINK_ID => Link::Manual,
            id => Link::Counterpart(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Link::None => "",
            Link::Counterpart(id) => id,
            Link::Manual => MANUAL_LINK_ID,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Link::None)
    }

    pub fn counterpart(&self) -> Option<&str> {
        match self {
            Link::Counterpart(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PROCESSED ATTRIBUTES
// ============================================================================

/// Accepts the usual truthy spellings; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1" | "on"
    )
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processed {
    pub category: String,
    /// Meaningful only when `category` is [`POT_CATEGORY`]
    pub pot_category: String,
    pub status: String,
    pub excluded: bool,
    pub link: Link,
    pub income: bool,
}

/// Partial set of processed attributes recovered from input.
///
/// `None` means "not present": the attribute keeps its default
/// (empty string, `false`, or [`Link::None`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedUpdate {
    pub category: Option<String>,
    pub pot_category: Option<String>,
    pub status: Option<String>,
    pub excluded: Option<bool>,
    pub link: Option<Link>,
    pub income: Option<bool>,
}

impl ProcessedUpdate {
    /// Read `bt_`-prefixed columns from a row. Absent columns stay `None`,
    /// unknown columns are ignored.
    pub fn from_prefixed<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let get = |field: ProcessedField| lookup(&field.column());

        ProcessedUpdate {
            category: get(ProcessedField::Category).map(str::to_string),
            pot_category: get(ProcessedField::PotCategory).map(str::to_string),
            status: get(ProcessedField::Status).map(str::to_string),
            excluded: get(ProcessedField::Excluded).map(parse_bool),
            link: get(ProcessedField::Link).map(Link::parse),
            income: get(ProcessedField::Income).map(parse_bool),
        }
    }

    pub fn from_prefixed_map(map: &HashMap<String, String>) -> Self {
        Self::from_prefixed(|name| map.get(name).map(String::as_str))
    }

    pub fn apply_to(self, processed: &mut Processed) {
        if let Some(v) = self.category {
            processed.category = v;
        }
        if let Some(v) = self.pot_category {
            processed.pot_category = v;
        }
        if let Some(v) = self.status {
            processed.status = v;
        }
        if let Some(v) = self.excluded {
            processed.excluded = v;
        }
        if let Some(v) = self.link {
            processed.link = v;
        }
        if let Some(v) = self.income {
            processed.income = v;
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    raw: RawRecord,
    processed: Processed,
}

impl Transaction {
    pub fn new(raw: RawRecord) -> Self {
        Self::from_raw(raw, ProcessedUpdate::default())
    }

    pub fn from_raw(raw: RawRecord, update: ProcessedUpdate) -> Self {
        let mut processed = Processed::default();
        update.apply_to(&mut processed);
        Transaction { raw, processed }
    }

    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    pub fn processed(&self) -> &Processed {
        &self.processed
    }

    // ------------------------------------------------------------------------
    // Delegated raw accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        self.raw.id()
    }

    pub fn date(&self) -> Result<NaiveDate, ValidationError> {
        self.raw.date()
    }

    pub fn amount(&self) -> Result<f64, ValidationError> {
        self.raw.amount()
    }

    pub fn kind(&self) -> &str {
        self.raw.kind()
    }

    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn notes(&self) -> &str {
        self.raw.notes()
    }

    pub fn is_pot_transfer(&self) -> bool {
        self.kind() == POT_TRANSFER_TYPE
    }

    // ------------------------------------------------------------------------
    // Processed attributes
    // ------------------------------------------------------------------------

    pub fn category(&self) -> &str {
        &self.processed.category
    }

    pub fn is_pot(&self) -> bool {
        self.processed.category == POT_CATEGORY
    }

    pub fn pot_category(&self) -> &str {
        &self.processed.pot_category
    }

    pub fn status(&self) -> &str {
        &self.processed.status
    }

    pub fn excluded(&self) -> bool {
        self.processed.excluded
    }

    pub fn link(&self) -> &Link {
        &self.processed.link
    }

    pub fn income(&self) -> bool {
        self.processed.income
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.processed.category = category.into();
    }

    pub fn set_pot_category(&mut self, pot_category: impl Into<String>) {
        self.processed.pot_category = pot_category.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.processed.status = status.into();
    }

    pub fn set_excluded(&mut self, excluded: bool) {
        self.processed.excluded = excluded;
    }

    /// Sets only this side. Use the reconciliation functions to keep
    /// counterpart links consistent.
    pub fn set_link(&mut self, link: Link) {
        self.processed.link = link;
    }

    pub fn set_income(&mut self, income: bool) {
        self.processed.income = income;
    }

    /// Reset category, pot category, status, exclusion and link.
    ///
    /// `income` is left alone, and the raw record is untouched.
    pub fn clear_processed(&mut self) {
        let income = self.processed.income;
        self.processed = Processed {
            income,
            ..Processed::default()
        };
    }

    /// Every raw field plus every processed attribute under its prefixed
    /// column name, ready for a flat file.
    pub fn to_persistable(&self) -> HashMap<String, String> {
        let mut row = self.raw.to_map();
        for field in ProcessedField::ALL {
            let value = match field {
                ProcessedField::Category => self.processed.category.clone(),
                ProcessedField::PotCategory => self.processed.pot_category.clone(),
                ProcessedField::Status => self.processed.status.clone(),
                ProcessedField::Excluded => format_bool(self.processed.excluded).to_string(),
                ProcessedField::Link => self.processed.link.as_str().to_string(),
                ProcessedField::Income => format_bool(self.processed.income).to_string(),
            };
            row.insert(field.column(), value);
        }
        row
    }

    /// Values in save-column order (raw fields, then processed).
    pub(crate) fn to_record(&self) -> Vec<String> {
        let mut row = self.to_persistable();
        save_headers()
            .iter()
            .map(|col| row.remove(col).unwrap_or_default())
            .collect()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} | Cat: {}", self.id(), self.name(), self.category())
    }
}
