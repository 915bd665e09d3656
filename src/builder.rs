use std::fmt;

use thiserror::Error;

use crate::base::{Operation, ParseError};
use crate::transaction::{
    Exchange, NonTrade, PartialExchange, PartialSwap, PartialTrade, Swap, Trade,
    TradeStateError, Transaction,
};

#[derive(Debug, Error)]
pub(crate) enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    TradeState(#[from] TradeStateError),

    #[error("{0}")]
    Incomplete(IncompleteComposites),
}

/// Partial transactions still open after the whole export was scanned.
/// Always fatal: silently dropping them would lose ledger data.
#[derive(Debug, Default)]
pub(crate) struct IncompleteComposites {
    pub trades: Vec<PartialTrade>,
    pub swaps: Vec<PartialSwap>,
    pub exchanges: Vec<PartialExchange>,
}

impl IncompleteComposites {
    fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.swaps.is_empty() && self.exchanges.is_empty()
    }
}

fn describe(op: Option<&Operation>) -> String {
    match op {
        Some(op) => op.to_string(),
        None => "<empty>".to_owned(),
    }
}

impl fmt::Display for IncompleteComposites {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Went through all rows in the NovaDAX CSV and could not complete \
             the following transactions:\n"
        )?;

        for partial in &self.trades {
            writeln!(f, "base asset:  {}", describe(partial.base_asset.as_ref()))?;
            writeln!(f, "quote asset: {}", describe(partial.quote_asset.as_ref()))?;
            writeln!(f, "trading fee: {}\n", describe(partial.trading_fee.as_ref()))?;
        }
        for partial in &self.swaps {
            writeln!(f, "swap asset a: {}", describe(Some(&partial.asset_a)))?;
            writeln!(f, "swap asset b: <empty>\n")?;
        }
        for partial in &self.exchanges {
            writeln!(f, "convert base asset:  {}", describe(Some(&partial.base_asset)))?;
            writeln!(f, "convert quote asset: {}", describe(partial.quote_asset.as_ref()))?;
            writeln!(f, "convert fee:         {}\n", describe(partial.trading_fee.as_ref()))?;
        }

        write!(
            f,
            "The input file may be faulty, or its contents were misinterpreted."
        )
    }
}

/// Assembles an ordered stream of operations into transactions.
///
/// The caller must supply operations oldest-to-newest (the raw export is
/// newest-first), so that fee rows follow the trade legs they belong to.
/// Unsuccessful operations never contribute to any transaction.
pub(crate) fn assemble(operations: Vec<Operation>) -> Result<Vec<Transaction>, BuildError> {
    let successful: Vec<Operation> = operations
        .into_iter()
        .filter(|op| op.is_successful())
        .collect();

    let trade_ops: Vec<&Operation> = successful.iter().filter(|op| op.belongs_to_trade()).collect();
    let swap_ops: Vec<&Operation> = successful.iter().filter(|op| op.is_swap_leg()).collect();
    let exchange_ops: Vec<&Operation> = successful.iter().filter(|op| op.is_exchange_leg()).collect();
    let non_trade_ops: Vec<&Operation> = successful.iter().filter(|op| op.is_non_trade()).collect();

    let mut leftover = IncompleteComposites::default();

    let trades = build_trades(&trade_ops, &mut leftover.trades)?;
    let swaps = build_swaps(&swap_ops, &mut leftover.swaps);
    let exchanges = build_exchanges(&exchange_ops, &mut leftover.exchanges);

    if !leftover.is_empty() {
        return Err(BuildError::Incomplete(leftover));
    }

    let mut transactions: Vec<Transaction> = Vec::new();
    transactions.extend(trades.into_iter().map(Transaction::Trade));
    transactions.extend(swaps.into_iter().map(Transaction::Swap));
    transactions.extend(exchanges.into_iter().map(Transaction::Exchange));
    transactions.extend(non_trade_ops.into_iter().map(|op| {
        Transaction::NonTrade(NonTrade {
            operation: op.clone(),
        })
    }));

    Ok(transactions)
}

/// First-fit matching: each operation is tried against every open partial
/// trade in insertion order, slots in base → quote → fee priority; the
/// first match wins. Combine grouping depends on this exact order.
fn build_trades(
    ops: &[&Operation],
    partials: &mut Vec<PartialTrade>,
) -> Result<Vec<Trade>, BuildError> {
    let mut trades = Vec::new();

    for op in ops {
        let index = fit_operation(op, partials)?;
        if let Some(trade) = partials[index].try_complete() {
            trades.push(trade);
            partials.remove(index);
        }
    }

    Ok(trades)
}

/// Fits the operation into an existing partial trade, or opens a new one.
/// Returns the index of the partial that absorbed the operation.
fn fit_operation(op: &Operation, partials: &mut Vec<PartialTrade>) -> Result<usize, BuildError> {
    for (index, partial) in partials.iter_mut().enumerate() {
        if partial.fits_as_base_asset(op) {
            partial.base_asset = Some(op.clone());
            return Ok(index);
        }
        if partial.fits_as_quote_asset(op) {
            partial.quote_asset = Some(op.clone());
            return Ok(index);
        }
        if partial.fits_as_trading_fee(op)? {
            partial.trading_fee = Some(op.clone());
            return Ok(index);
        }
    }

    partials.push(PartialTrade::from_operation(op)?);
    Ok(partials.len() - 1)
}

/// Swap legs come in same-timestamp pairs; pairing is strictly
/// first-come-first-paired, with no cross-matching search.
fn build_swaps(ops: &[&Operation], leftover: &mut Vec<PartialSwap>) -> Vec<Swap> {
    let mut swaps = Vec::new();
    let mut open: Option<PartialSwap> = None;

    for op in ops {
        match open.take() {
            None => open = Some(PartialSwap::new((*op).clone())),
            Some(partial) => swaps.push(partial.complete((*op).clone())),
        }
    }

    leftover.extend(open);
    swaps
}

fn build_exchanges(ops: &[&Operation], leftover: &mut Vec<PartialExchange>) -> Vec<Exchange> {
    let mut exchanges = Vec::new();
    let mut open: Option<PartialExchange> = None;

    for op in ops {
        let Some(mut partial) = open.take() else {
            open = Some(PartialExchange::new((*op).clone()));
            continue;
        };

        if op.is_exchange_fee() {
            partial.trading_fee = Some((*op).clone());
        } else {
            partial.quote_asset = Some((*op).clone());
        }

        match partial.try_complete() {
            Some(exchange) => exchanges.push(exchange),
            None => open = Some(partial),
        }
    }

    leftover.extend(open);
    exchanges
}
