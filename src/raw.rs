// 🧾 Raw Record - one imported ledger line
// Immutable view of the bank export. Values are kept exactly as read;
// accessors trim, and amount/date parse lazily and cache.

use crate::error::ValidationError;
use crate::schema::RawField;
use chrono::NaiveDate;
use std::cell::OnceCell;
use std::collections::HashMap;

/// Parse a ledger date: day/month/year first, then ISO 8601.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Parse a signed decimal amount; negative means money out.
pub fn parse_amount(value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidAmount(value.to_string()))
}

#[derive(Debug, Clone)]
pub struct RawRecord {
    values: Vec<String>,
    date: OnceCell<NaiveDate>,
    amount: OnceCell<f64>,
}

impl RawRecord {
    /// Build from any header → value lookup.
    ///
    /// Fails with every missing field name, not just the first.
    pub fn from_lookup<'a, F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut values = Vec::with_capacity(RawField::ALL.len());
        let mut missing = Vec::new();

        for field in RawField::ALL {
            match lookup(field.header()) {
                Some(v) => values.push(v.to_string()),
                None => missing.push(field.header().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        Ok(RawRecord {
            values,
            date: OnceCell::new(),
            amount: OnceCell::new(),
        })
    }

    /// Build from a header → value map. Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ValidationError> {
        Self::from_lookup(|name| map.get(name).map(String::as_str))
    }

    /// Untrimmed value as imported
    pub fn raw_value(&self, field: RawField) -> &str {
        &self.values[field.index()]
    }

    /// Trimmed value
    pub fn get(&self, field: RawField) -> &str {
        self.raw_value(field).trim()
    }

    /// Header → untrimmed value for every raw field.
    pub fn to_map(&self) -> HashMap<String, String> {
        RawField::ALL
            .iter()
            .map(|f| (f.header().to_string(), self.raw_value(*f).to_string()))
            .collect()
    }

    pub fn id(&self) -> &str {
        self.get(RawField::TransactionId)
    }

    pub fn date(&self) -> Result<NaiveDate, ValidationError> {
        if let Some(d) = self.date.get() {
            return Ok(*d);
        }
        let parsed = parse_date(self.raw_value(RawField::Date))?;
        Ok(*self.date.get_or_init(|| parsed))
    }

    pub fn amount(&self) -> Result<f64, ValidationError> {
        if let Some(a) = self.amount.get() {
            return Ok(*a);
        }
        let parsed = parse_amount(self.raw_value(RawField::Amount))?;
        Ok(*self.amount.get_or_init(|| parsed))
    }

    pub fn time(&self) -> &str {
        self.get(RawField::Time)
    }

    /// Movement kind, e.g. "Payment" or "Pot transfer"
    pub fn kind(&self) -> &str {
        self.get(RawField::Type)
    }

    pub fn name(&self) -> &str {
        self.get(RawField::Name)
    }

    pub fn emoji(&self) -> &str {
        self.get(RawField::Emoji)
    }

    /// Bank-assigned category; informational only.
    pub fn category_hint(&self) -> &str {
        self.get(RawField::Category)
    }

    pub fn currency(&self) -> &str {
        self.get(RawField::Currency)
    }

    pub fn local_amount(&self) -> &str {
        self.get(RawField::LocalAmount)
    }

    pub fn local_currency(&self) -> &str {
        self.get(RawField::LocalCurrency)
    }

    pub fn notes(&self) -> &str {
        self.get(RawField::Notes)
    }

    pub fn address(&self) -> &str {
        self.get(RawField::Address)
    }

    pub fn receipt(&self) -> &str {
        self.get(RawField::Receipt)
    }

    pub fn description(&self) -> &str {
        self.get(RawField::Description)
    }

    pub fn category_split(&self) -> &str {
        self.get(RawField::CategorySplit)
    }

    pub fn money_out(&self) -> &str {
        self.get(RawField::MoneyOut)
    }

    pub fn money_in(&self) -> &str {
        self.get(RawField::MoneyIn)
    }
}

// Caches are derived state; identity is the raw values alone.
impl PartialEq for RawRecord {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for RawRecord {}
