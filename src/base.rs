use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Status value NovaDAX assigns to settled operations. Anything else
/// (e.g. "Cancelado", "Pendente") is ignored by the conversion.
const SUCCESS_STATUS: &str = "Sucesso";

/// Errors raised while turning a raw CSV row into an [`Operation`].
/// All of these abort the conversion; no partial output is written.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum ParseError {
    #[error("No numeric values found in \"{0}\"")]
    NoNumericValues(String),

    #[error("No trading pair found in \"{0}\"")]
    NoTradingPair(String),

    #[error("Unknown operation type in \"{0}\"")]
    UnknownOperationType(String),

    #[error("Invalid date \"{0}\", expected DD/MM/YYYY HH:MM:SS")]
    InvalidDate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Amount {
    pub quantity: Decimal,
    pub currency: String,
}

impl Amount {
    pub(crate) fn new(quantity: Decimal, currency: String) -> Self {
        Self { quantity, currency }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.quantity.normalize(), self.currency)
    }
}

/// Closed set of operation kinds appearing in NovaDAX exports, identified
/// by the human-readable summary prefix (the part before any parenthesis).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    CryptoDeposit,
    FiatDeposit,
    CryptoWithdraw,
    FiatWithdraw,
    WithdrawFee,
    RedeemedBonus,
    Buy,
    Sell,
    TradingFee,
    Swap,
    Exchange,
    ExchangeFee,
}

impl OperationKind {
    /// Determines the kind from a summary string. The summary is
    /// NFC-normalized first, since exports have been observed carrying
    /// decomposed accented characters.
    pub(crate) fn from_summary(summary: &str) -> Result<Self, ParseError> {
        let prefix: String = summary
            .split('(')
            .next()
            .unwrap_or_default()
            .nfc()
            .collect();
        match prefix.as_str() {
            "Depósito de criptomoedas" => Ok(Self::CryptoDeposit),
            "Depósito em Reais" => Ok(Self::FiatDeposit),
            "Saque de criptomoedas" => Ok(Self::CryptoWithdraw),
            "Saque em Reais" => Ok(Self::FiatWithdraw),
            "Taxa de saque de criptomoedas" => Ok(Self::WithdrawFee),
            "Redeemed Bonus" => Ok(Self::RedeemedBonus),
            "Compra" => Ok(Self::Buy),
            "Venda" => Ok(Self::Sell),
            "Taxa de transação" => Ok(Self::TradingFee),
            "Troca" => Ok(Self::Swap),
            "Convert" => Ok(Self::Exchange),
            "Taxa de Convert" => Ok(Self::ExchangeFee),
            _ => Err(ParseError::UnknownOperationType(summary.to_owned())),
        }
    }
}

/// One NovaDAX ledger row: a single asset movement. Composite events
/// (trades, swaps, exchange-converts) span several of these.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Operation {
    pub date: NaiveDateTime,
    pub kind: OperationKind,
    pub summary: String,
    pub amount: Amount,
    pub status: String,
}

impl Operation {
    pub(crate) fn symbol(&self) -> &str {
        &self.amount.currency
    }

    pub(crate) fn is_successful(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    pub(crate) fn is_non_trade(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::CryptoDeposit
                | OperationKind::FiatDeposit
                | OperationKind::CryptoWithdraw
                | OperationKind::FiatWithdraw
                | OperationKind::WithdrawFee
                | OperationKind::RedeemedBonus
        )
    }

    pub(crate) fn belongs_to_trade(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Buy | OperationKind::Sell | OperationKind::TradingFee
        )
    }

    pub(crate) fn is_trading_fee(&self) -> bool {
        self.kind == OperationKind::TradingFee
    }

    pub(crate) fn is_swap_leg(&self) -> bool {
        self.kind == OperationKind::Swap
    }

    pub(crate) fn is_exchange_leg(&self) -> bool {
        matches!(self.kind, OperationKind::Exchange | OperationKind::ExchangeFee)
    }

    pub(crate) fn is_exchange_fee(&self) -> bool {
        self.kind == OperationKind::ExchangeFee
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.date, self.summary, self.amount, self.status
        )
    }
}

/// A trading pair like DOGE/BRL: base is the asset being bought or sold,
/// quote is the asset used to price it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    /// Extracts the pair from a trade summary like "Compra(DOGE/BRL)".
    pub(crate) fn from_summary(summary: &str) -> Result<Self, ParseError> {
        static PAIR: OnceLock<Regex> = OnceLock::new();
        let re = PAIR.get_or_init(|| Regex::new(r"\(([^/]+)/([^)]+)").unwrap());

        match re.captures(summary) {
            Some(caps) => Ok(Self {
                base: caps[1].to_owned(),
                quote: caps[2].to_owned(),
            }),
            None => Err(ParseError::NoTradingPair(summary.to_owned())),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fake_op(kind: OperationKind, summary: &str, symbol: &str) -> Operation {
        Operation {
            date: crate::time::parse_date_time("15/03/1970 23:45:56").unwrap(),
            kind,
            summary: summary.to_owned(),
            amount: Amount::new(dec!(1.234), symbol.to_owned()),
            status: "Sucesso".to_owned(),
        }
    }

    #[test]
    fn test_trading_pair_from_summary() {
        let pair = TradingPair::from_summary("Compra(DOGE/BRL)").unwrap();
        assert_eq!(pair.base, "DOGE");
        assert_eq!(pair.quote, "BRL");
    }

    #[test]
    fn test_trading_pair_missing() {
        let err = TradingPair::from_summary("AnythingElse").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No trading pair found in \"AnythingElse\""
        );
    }

    #[test]
    fn test_kind_from_summary() {
        assert_eq!(
            OperationKind::from_summary("Compra(ABC/BRL)").unwrap(),
            OperationKind::Buy
        );
        assert_eq!(
            OperationKind::from_summary("Taxa de transação").unwrap(),
            OperationKind::TradingFee
        );
        assert_eq!(
            OperationKind::from_summary("Depósito em Reais").unwrap(),
            OperationKind::FiatDeposit
        );
        assert!(OperationKind::from_summary("Mystery entry").is_err());
    }

    #[test]
    fn test_kind_from_decomposed_summary() {
        // "Depósito" with the acute accent as a combining character
        let decomposed = "Depo\u{0301}sito de criptomoedas";
        assert_eq!(
            OperationKind::from_summary(decomposed).unwrap(),
            OperationKind::CryptoDeposit
        );
    }

    #[test]
    fn test_is_successful() {
        let mut op = fake_op(OperationKind::Buy, "Compra(ABC/BRL)", "ABC");
        assert!(op.is_successful());
        op.status = "Cancelado".to_owned();
        assert!(!op.is_successful());
    }

    #[test]
    fn test_classifier_predicates() {
        let non_trades = [
            OperationKind::CryptoDeposit,
            OperationKind::FiatDeposit,
            OperationKind::CryptoWithdraw,
            OperationKind::FiatWithdraw,
            OperationKind::WithdrawFee,
            OperationKind::RedeemedBonus,
        ];
        for kind in non_trades {
            let op = fake_op(kind, "x", "TST");
            assert!(op.is_non_trade());
            assert!(!op.belongs_to_trade());
            assert!(!op.is_swap_leg());
            assert!(!op.is_exchange_leg());
        }

        for kind in [OperationKind::Buy, OperationKind::Sell, OperationKind::TradingFee] {
            let op = fake_op(kind, "x", "TST");
            assert!(op.belongs_to_trade());
            assert!(!op.is_non_trade());
        }

        assert!(fake_op(OperationKind::Swap, "Troca", "TST").is_swap_leg());
        assert!(fake_op(OperationKind::Exchange, "Convert", "TST").is_exchange_leg());
        assert!(fake_op(OperationKind::ExchangeFee, "Taxa de Convert", "TST").is_exchange_fee());
        assert!(fake_op(OperationKind::ExchangeFee, "Taxa de Convert", "TST").is_exchange_leg());
    }
}
