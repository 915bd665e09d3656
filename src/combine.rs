use rust_decimal::Decimal;
use thiserror::Error;

use crate::base::Operation;
use crate::transaction::{Exchange, NonTrade, Swap, Trade, Transaction};

/// Combine groups are single-variant by construction of the combine key;
/// hitting this means the key scheme was broken.
#[derive(Debug, Error, PartialEq)]
#[error("Cannot combine transactions of different kinds into one")]
pub(crate) struct CombineError;

/// Merges transactions sharing a combine key into one transaction per
/// key, summing the amounts of corresponding legs. Groups keep the order
/// in which their key first appeared. Produces new records; the inputs
/// are never mutated.
pub(crate) fn combine(transactions: Vec<Transaction>) -> Result<Vec<Transaction>, CombineError> {
    group_by_key(transactions)
        .iter()
        .map(|(_, group)| combine_group(group))
        .collect()
}

fn group_by_key(transactions: Vec<Transaction>) -> Vec<(String, Vec<Transaction>)> {
    let mut groups: Vec<(String, Vec<Transaction>)> = Vec::new();

    for transaction in transactions {
        let key = transaction.combine_key();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(transaction),
            None => groups.push((key, vec![transaction])),
        }
    }

    groups
}

fn combine_group(group: &[Transaction]) -> Result<Transaction, CombineError> {
    match group.first().ok_or(CombineError)? {
        Transaction::Trade(_) => {
            let trades = members(group, |t| match t {
                Transaction::Trade(trade) => Some(trade),
                _ => None,
            })?;
            Ok(Transaction::Trade(combine_trades(&trades)))
        }
        Transaction::Swap(_) => {
            let swaps = members(group, |t| match t {
                Transaction::Swap(swap) => Some(swap),
                _ => None,
            })?;
            Ok(Transaction::Swap(combine_swaps(&swaps)))
        }
        Transaction::Exchange(_) => {
            let exchanges = members(group, |t| match t {
                Transaction::Exchange(exchange) => Some(exchange),
                _ => None,
            })?;
            Ok(Transaction::Exchange(combine_exchanges(&exchanges)))
        }
        Transaction::NonTrade(_) => {
            let non_trades = members(group, |t| match t {
                Transaction::NonTrade(non_trade) => Some(non_trade),
                _ => None,
            })?;
            Ok(Transaction::NonTrade(combine_non_trades(&non_trades)))
        }
    }
}

/// Views every group member through the same variant, failing on a mix.
fn members<'a, T>(
    group: &'a [Transaction],
    as_variant: impl Fn(&'a Transaction) -> Option<&'a T>,
) -> Result<Vec<&'a T>, CombineError> {
    group
        .iter()
        .map(|transaction| as_variant(transaction).ok_or(CombineError))
        .collect()
}

/// New operation carrying the first member's identity and the group's
/// exact decimal sum.
fn summed(template: &Operation, quantities: impl Iterator<Item = Decimal>) -> Operation {
    let mut operation = template.clone();
    operation.amount.quantity = quantities.sum();
    operation
}

fn combine_trades(trades: &[&Trade]) -> Trade {
    let first = trades[0];
    Trade {
        summary: first.summary.clone(),
        trading_pair: first.trading_pair.clone(),
        base_asset: summed(
            &first.base_asset,
            trades.iter().map(|t| t.base_asset.amount.quantity),
        ),
        quote_asset: summed(
            &first.quote_asset,
            trades.iter().map(|t| t.quote_asset.amount.quantity),
        ),
        trading_fee: summed(
            &first.trading_fee,
            trades.iter().map(|t| t.trading_fee.amount.quantity),
        ),
    }
}

fn combine_swaps(swaps: &[&Swap]) -> Swap {
    let first = swaps[0];
    Swap {
        asset_a: summed(&first.asset_a, swaps.iter().map(|s| s.asset_a.amount.quantity)),
        asset_b: summed(&first.asset_b, swaps.iter().map(|s| s.asset_b.amount.quantity)),
    }
}

fn combine_exchanges(exchanges: &[&Exchange]) -> Exchange {
    let first = exchanges[0];
    Exchange {
        base_asset: summed(
            &first.base_asset,
            exchanges.iter().map(|e| e.base_asset.amount.quantity),
        ),
        quote_asset: summed(
            &first.quote_asset,
            exchanges.iter().map(|e| e.quote_asset.amount.quantity),
        ),
        trading_fee: summed(
            &first.trading_fee,
            exchanges.iter().map(|e| e.trading_fee.amount.quantity),
        ),
    }
}

fn combine_non_trades(non_trades: &[&NonTrade]) -> NonTrade {
    let first = non_trades[0];
    NonTrade {
        operation: summed(
            &first.operation,
            non_trades.iter().map(|n| n.operation.amount.quantity),
        ),
    }
}
