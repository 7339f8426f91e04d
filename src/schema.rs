// 📐 Shape Layer - Column Schema
// Raw columns come verbatim from the bank export; processed columns carry
// review state under a prefix so the two never collide.

use crate::error::ValidationError;

// ============================================================================
// RAW FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawField {
    TransactionId,
    Date,
    Time,
    Type,
    Name,
    Emoji,
    Category,
    Amount,
    Currency,
    LocalAmount,
    LocalCurrency,
    Notes,
    Address,
    Receipt,
    Description,
    CategorySplit,
    MoneyOut,
    MoneyIn,
}

impl RawField {
    /// Every raw field, in the order they are written back out.
    pub const ALL: [RawField; 18] = [
        RawField::TransactionId,
        RawField::Date,
        RawField::Time,
        RawField::Type,
        RawField::Name,
        RawField::Emoji,
        RawField::Category,
        RawField::Amount,
        RawField::Currency,
        RawField::LocalAmount,
        RawField::LocalCurrency,
        RawField::Notes,
        RawField::Address,
        RawField::Receipt,
        RawField::Description,
        RawField::CategorySplit,
        RawField::MoneyOut,
        RawField::MoneyIn,
    ];

    /// Column header as it appears in the export
    pub fn header(&self) -> &'static str {
        match self {
            RawField::TransactionId => "Transaction ID",
            RawField::Date => "Date",
            RawField::Time => "Time",
            RawField::Type => "Type",
            RawField::Name => "Name",
            RawField::Emoji => "Emoji",
            RawField::Category => "Category",
            RawField::Amount => "Amount",
            RawField::Currency => "Currency",
            RawField::LocalAmount => "Local amount",
            RawField::LocalCurrency => "Local currency",
            RawField::Notes => "Notes and #tags",
            RawField::Address => "Address",
            RawField::Receipt => "Receipt",
            RawField::Description => "Description",
            RawField::CategorySplit => "Category split",
            RawField::MoneyOut => "Money Out",
            RawField::MoneyIn => "Money In",
        }
    }

    /// Position inside a record's value array.
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// Required raw column headers in save order.
pub fn raw_headers() -> impl Iterator<Item = &'static str> {
    RawField::ALL.iter().map(|f| f.header())
}

// ============================================================================
// PROCESSED FIELDS
// ============================================================================

/// Prefix that separates processed columns from raw ones.
pub const PROCESSED_PREFIX: &str = "bt_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedField {
    Category,
    PotCategory,
    Status,
    Excluded,
    Link,
    Income,
}

impl ProcessedField {
    pub const ALL: [ProcessedField; 6] = [
        ProcessedField::Category,
        ProcessedField::PotCategory,
        ProcessedField::Status,
        ProcessedField::Excluded,
        ProcessedField::Link,
        ProcessedField::Income,
    ];

    /// Unprefixed attribute name
    pub fn name(&self) -> &'static str {
        match self {
            ProcessedField::Category => "category",
            ProcessedField::PotCategory => "pot_category",
            ProcessedField::Status => "status",
            ProcessedField::Excluded => "excluded",
            ProcessedField::Link => "link",
            ProcessedField::Income => "income",
        }
    }

    /// Column header in a persisted ledger (`bt_category`, ...)
    pub fn column(&self) -> String {
        format!("{}{}", PROCESSED_PREFIX, self.name())
    }
}

/// Full header row written on save: raw columns, then processed columns.
pub fn save_headers() -> Vec<String> {
    raw_headers()
        .map(str::to_string)
        .chain(ProcessedField::ALL.iter().map(|f| f.column()))
        .collect()
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Check that every required raw column is present.
///
/// Extra columns are ignored. All missing names are reported together, in
/// schema order.
pub fn validate_columns<'a, I>(present: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = present.into_iter().collect();
    let missing: Vec<String> = raw_headers()
        .filter(|name| !present.contains(name))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}
