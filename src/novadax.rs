use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use unicode_normalization::UnicodeNormalization;

use crate::base::{Amount, Operation, OperationKind, ParseError};
use crate::time;

/// Parses a NovaDAX amount field into an exact decimal.
///
/// The export prefixes amounts with a sign and sometimes a currency
/// ("R$ -355,77"), groups digits with commas, and uses the comma as the
/// decimal separator as well. The last comma-delimited group is always the
/// fractional part; every group before it concatenates into the integer
/// part. "-121,162,430,769,2304 BABYDOGE2(≈R$0.45)" is 121162430769.2304.
/// Signs are dropped: amounts are stored as absolute values.
pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, ParseError> {
    static NUMERIC_RUN: OnceLock<Regex> = OnceLock::new();
    let re = NUMERIC_RUN.get_or_init(|| Regex::new(r"^\D*([0-9,]+)").unwrap());

    let caps = re
        .captures(raw)
        .ok_or_else(|| ParseError::NoNumericValues(raw.to_owned()))?;

    let mut groups: Vec<&str> = caps[1].split(',').collect();
    let fraction = groups.pop().unwrap_or_default();

    let text = if groups.is_empty() {
        fraction.to_owned()
    } else {
        format!("{}.{}", groups.concat(), fraction)
    };

    text.parse::<Decimal>()
        .map_err(|_| ParseError::NoNumericValues(raw.to_owned()))
}

/// Turns one raw NovaDAX CSV row into an [`Operation`].
///
/// Expected fields, in order: date (DD/MM/YYYY HH:MM:SS), summary,
/// symbol, signed amount, status.
pub(crate) fn operation_from_record(record: &csv::StringRecord) -> Result<Operation, ParseError> {
    let field = |index: usize| record.get(index).unwrap_or_default();

    let summary: String = field(1).nfc().collect();
    let date = time::parse_date_time(field(0))
        .map_err(|_| ParseError::InvalidDate(field(0).to_owned()))?;
    let kind = OperationKind::from_summary(&summary)?;
    let quantity = parse_amount(field(3))?;

    Ok(Operation {
        date,
        kind,
        summary,
        amount: Amount::new(quantity, field(2).to_owned()),
        status: field(4).to_owned(),
    })
}
