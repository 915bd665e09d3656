use chrono::NaiveDateTime;
use thiserror::Error;

use crate::base::{Operation, OperationKind, ParseError, TradingPair};

/// Raised when a trading fee is matched against a partial trade whose
/// state makes the purchase/sale direction undecidable. Either case means
/// the export was misread; the conversion aborts.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum TradeStateError {
    #[error("Trading fee matched against an empty trade \"{0}\"")]
    EmptyTrade(String),

    #[error("Trade \"{0}\" holds an operation that is neither a buy nor a sell")]
    MalformedTrade(String),
}

/// A completed trade: base asset, quote asset and trading fee, all three
/// sharing the trading pair declared in the summary.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Trade {
    pub summary: String,
    pub trading_pair: TradingPair,
    pub base_asset: Operation,
    pub quote_asset: Operation,
    pub trading_fee: Operation,
}

impl Trade {
    pub(crate) fn date(&self) -> NaiveDateTime {
        self.base_asset.date
    }

    pub(crate) fn is_purchase(&self) -> bool {
        self.base_asset.kind == OperationKind::Buy
    }
}

/// Two-leg, same-timestamp exchange of one asset for another ("Troca").
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Swap {
    pub asset_a: Operation,
    pub asset_b: Operation,
}

impl Swap {
    pub(crate) fn date(&self) -> NaiveDateTime {
        self.asset_a.date
    }

    pub(crate) fn summary(&self) -> String {
        format!(
            "{}{}/{}",
            self.asset_a.summary,
            self.asset_a.symbol(),
            self.asset_b.symbol()
        )
    }
}

/// Three-leg conversion from the NovaDAX "Convert" feature.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Exchange {
    pub base_asset: Operation,
    pub quote_asset: Operation,
    pub trading_fee: Operation,
}

impl Exchange {
    pub(crate) fn date(&self) -> NaiveDateTime {
        self.base_asset.date
    }
}

/// Single-operation transaction: deposits, withdraws, fees, bonuses.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NonTrade {
    pub operation: Operation,
}

impl NonTrade {
    pub(crate) fn date(&self) -> NaiveDateTime {
        self.operation.date
    }
}

/// Unified transaction type; one value becomes one Koinly output row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transaction {
    Trade(Trade),
    Swap(Swap),
    Exchange(Exchange),
    NonTrade(NonTrade),
}

impl Transaction {
    pub(crate) fn date(&self) -> NaiveDateTime {
        match self {
            Transaction::Trade(t) => t.date(),
            Transaction::Swap(s) => s.date(),
            Transaction::Exchange(e) => e.date(),
            Transaction::NonTrade(n) => n.date(),
        }
    }

    /// Identity used to merge transactions that represent one economic
    /// event split across several ledger rows. Keys never collide across
    /// variants: trade and swap summaries carry their own vocabulary.
    pub(crate) fn combine_key(&self) -> String {
        match self {
            Transaction::Trade(t) => format!("{}{}", t.date(), t.summary),
            Transaction::Swap(s) => format!("{}{}", s.date(), s.summary()),
            Transaction::Exchange(e) => format!(
                "{}{}/{}",
                e.date(),
                e.base_asset.symbol(),
                e.quote_asset.symbol()
            ),
            Transaction::NonTrade(n) => format!(
                "{}{}{}",
                n.date(),
                n.operation.summary,
                n.operation.symbol()
            ),
        }
    }
}

/// In-progress trade accumulator. Mutable while the builder scans the
/// operation stream; frozen into a [`Trade`] once all three legs are known.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PartialTrade {
    pub summary: String,
    pub trading_pair: TradingPair,
    pub base_asset: Option<Operation>,
    pub quote_asset: Option<Operation>,
    pub trading_fee: Option<Operation>,
}

impl PartialTrade {
    /// Opens a new partial trade seeded from an operation, placing it in
    /// whichever asset slot its symbol selects. A summary without a
    /// trading pair fails here.
    pub(crate) fn from_operation(op: &Operation) -> Result<Self, ParseError> {
        let mut partial = Self {
            summary: op.summary.clone(),
            trading_pair: TradingPair::from_summary(&op.summary)?,
            base_asset: None,
            quote_asset: None,
            trading_fee: None,
        };
        if partial.fits_as_base_asset(op) {
            partial.base_asset = Some(op.clone());
        } else if partial.fits_as_quote_asset(op) {
            partial.quote_asset = Some(op.clone());
        }
        Ok(partial)
    }

    pub(crate) fn fits_as_base_asset(&self, op: &Operation) -> bool {
        self.base_asset.is_none()
            && op.summary == self.summary
            && op.symbol() == self.trading_pair.base
    }

    pub(crate) fn fits_as_quote_asset(&self, op: &Operation) -> bool {
        self.quote_asset.is_none()
            && op.summary == self.summary
            && op.symbol() == self.trading_pair.quote
    }

    /// A fee belongs to a purchase when paid in the base currency, and to
    /// a sale when paid in the quote currency. The direction comes from
    /// whichever asset leg is already present.
    pub(crate) fn fits_as_trading_fee(&self, op: &Operation) -> Result<bool, TradeStateError> {
        if self.trading_fee.is_some() || !op.is_trading_fee() {
            return Ok(false);
        }

        let any_asset = self
            .base_asset
            .as_ref()
            .or(self.quote_asset.as_ref())
            .ok_or_else(|| TradeStateError::EmptyTrade(self.summary.clone()))?;

        match any_asset.kind {
            OperationKind::Buy => Ok(op.symbol() == self.trading_pair.base),
            OperationKind::Sell => Ok(op.symbol() == self.trading_pair.quote),
            _ => Err(TradeStateError::MalformedTrade(self.summary.clone())),
        }
    }

    /// Freezes this partial into an immutable [`Trade`] once all three
    /// legs are present.
    pub(crate) fn try_complete(&self) -> Option<Trade> {
        match (&self.base_asset, &self.quote_asset, &self.trading_fee) {
            (Some(base), Some(quote), Some(fee)) => Some(Trade {
                summary: self.summary.clone(),
                trading_pair: self.trading_pair.clone(),
                base_asset: base.clone(),
                quote_asset: quote.clone(),
                trading_fee: fee.clone(),
            }),
            _ => None,
        }
    }
}

/// Swap legs arrive strictly paired: the first opens the partial, the
/// very next swap operation completes it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PartialSwap {
    pub asset_a: Operation,
}

impl PartialSwap {
    pub(crate) fn new(asset_a: Operation) -> Self {
        Self { asset_a }
    }

    pub(crate) fn complete(self, asset_b: Operation) -> Swap {
        Swap {
            asset_a: self.asset_a,
            asset_b,
        }
    }
}

/// In-progress exchange-convert. The first leg opens it as the base
/// asset; later legs fill the fee slot (when classified as a Convert fee)
/// or the quote slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PartialExchange {
    pub base_asset: Operation,
    pub quote_asset: Option<Operation>,
    pub trading_fee: Option<Operation>,
}

impl PartialExchange {
    pub(crate) fn new(base_asset: Operation) -> Self {
        Self {
            base_asset,
            quote_asset: None,
            trading_fee: None,
        }
    }

    pub(crate) fn try_complete(&self) -> Option<Exchange> {
        match (&self.quote_asset, &self.trading_fee) {
            (Some(quote), Some(fee)) => Some(Exchange {
                base_asset: self.base_asset.clone(),
                quote_asset: quote.clone(),
                trading_fee: fee.clone(),
            }),
            _ => None,
        }
    }
}
