use crate::core::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217-style currency code a group keeps its books in.
///
/// Only used for presentation: every amount in a group is in the same
/// currency, and no conversion between currencies is ever performed.
///
/// # Examples
///
/// ```
/// use splitter::core::currency::CurrencyCode;
/// use splitter::core::money::Money;
///
/// let eur = CurrencyCode::new("eur");
/// assert_eq!(eur.as_str(), "EUR");
/// assert_eq!(eur.format(Money::from_cents(1250)), "12.50€");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol shown after amounts. Unknown codes are shown as-is.
    pub fn symbol(&self) -> &str {
        match self.0.as_str() {
            "EUR" => "€",
            "USD" => "$",
            "GBP" => "£",
            "JPY" => "¥",
            other => other,
        }
    }

    /// Render an amount in this currency, e.g. `12.50€`.
    pub fn format(&self, amount: Money) -> String {
        match self.0.as_str() {
            "EUR" | "USD" | "GBP" | "JPY" => format!("{}{}", amount, self.symbol()),
            code => format!("{} {}", amount, code),
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("EUR")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
