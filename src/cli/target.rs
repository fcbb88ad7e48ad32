//! Parsing of `--from`/`--to` entries: `name[:amount[%]]`.

use crate::core::member::{is_valid_name, MemberName};
use crate::core::money::Money;
use crate::engine::allocation::ShareSpec;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("`{0}` does not match name[:amount[%]]")]
    Format(String),
    #[error("`{0}` is not a valid member name")]
    Name(String),
    #[error("`{0}` is not a valid amount")]
    Amount(String),
}

impl FromStr for ShareSpec {
    type Err = TargetError;

    /// `fred` (no amount), `fred:3.50`, `fred:3,50` or `fred:30%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (name, value) = match input.split_once(':') {
            None => (input, None),
            Some((name, value)) => (name.trim(), Some(value.trim())),
        };
        if name.is_empty() {
            return Err(TargetError::Format(s.to_string()));
        }
        if !is_valid_name(name) {
            return Err(TargetError::Name(name.to_string()));
        }
        let member = MemberName::new(name);

        let Some(value) = value else {
            return Ok(ShareSpec::rest(member));
        };
        if value.is_empty() || value.contains(':') {
            return Err(TargetError::Format(s.to_string()));
        }
        match value.strip_suffix('%') {
            Some(percent) => {
                let percent = Decimal::from_str(&percent.trim().replace(',', "."))
                    .map_err(|_| TargetError::Amount(value.to_string()))?;
                Ok(ShareSpec::percent(member, percent))
            }
            None => {
                let amount =
                    Money::from_str(value).map_err(|_| TargetError::Amount(value.to_string()))?;
                Ok(ShareSpec::amount(member, amount))
            }
        }
    }
}
