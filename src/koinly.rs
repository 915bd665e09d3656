use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::base::OperationKind;
use crate::time::serialize_date_time;
use crate::transaction::{NonTrade, Transaction};

/// One row of the Koinly universal CSV. Net worth columns and the
/// transaction hash stay empty: the export carries no valuation or chain
/// data.
#[derive(Debug, Serialize)]
pub(crate) struct KoinlyTx<'a> {
    #[serde(rename = "Date", serialize_with = "serialize_date_time")]
    date: NaiveDateTime,

    #[serde(rename = "Sent Amount")]
    sent_amount: Option<Decimal>,

    #[serde(rename = "Sent Currency")]
    sent_currency: Option<&'a str>,

    #[serde(rename = "Received Amount")]
    received_amount: Option<Decimal>,

    #[serde(rename = "Received Currency")]
    received_currency: Option<&'a str>,

    #[serde(rename = "Fee Amount")]
    fee_amount: Option<Decimal>,

    #[serde(rename = "Fee Currency")]
    fee_currency: Option<&'a str>,

    #[serde(rename = "Net Worth Amount")]
    net_worth_amount: Option<Decimal>,

    #[serde(rename = "Net Worth Currency")]
    net_worth_currency: Option<&'a str>,

    #[serde(rename = "Label")]
    label: &'static str,

    #[serde(rename = "Description")]
    description: String,

    #[serde(rename = "TxHash")]
    tx_hash: Option<&'a str>,
}

impl<'a> KoinlyTx<'a> {
    fn empty(date: NaiveDateTime, label: &'static str, description: String) -> Self {
        Self {
            date,
            sent_amount: None,
            sent_currency: None,
            received_amount: None,
            received_currency: None,
            fee_amount: None,
            fee_currency: None,
            net_worth_amount: None,
            net_worth_currency: None,
            label,
            description,
            tx_hash: None,
        }
    }
}

fn non_trade_row(non_trade: &NonTrade) -> KoinlyTx {
    let operation = &non_trade.operation;
    let amount = &operation.amount;

    let (label, incoming) = match operation.kind {
        OperationKind::CryptoDeposit | OperationKind::FiatDeposit => ("deposit", true),
        OperationKind::CryptoWithdraw | OperationKind::FiatWithdraw => ("withdraw", false),
        OperationKind::WithdrawFee => ("fee", false),
        OperationKind::RedeemedBonus => ("reward", true),
        OperationKind::Buy
        | OperationKind::Sell
        | OperationKind::TradingFee
        | OperationKind::Swap
        | OperationKind::Exchange
        | OperationKind::ExchangeFee => {
            unreachable!("non-trade transactions only hold non-trade operations")
        }
    };

    let mut row = KoinlyTx::empty(non_trade.date(), label, operation.summary.clone());
    if incoming {
        row.received_amount = Some(amount.quantity);
        row.received_currency = Some(&amount.currency);
    } else {
        row.sent_amount = Some(amount.quantity);
        row.sent_currency = Some(&amount.currency);
    }
    row
}

impl<'a> From<&'a Transaction> for KoinlyTx<'a> {
    fn from(item: &'a Transaction) -> Self {
        match item {
            Transaction::Trade(trade) => {
                // On a purchase the quote asset is what left the account;
                // on a sale it is what came in.
                let (sent, received) = if trade.is_purchase() {
                    (&trade.quote_asset, &trade.base_asset)
                } else {
                    (&trade.base_asset, &trade.quote_asset)
                };

                let mut row = KoinlyTx::empty(trade.date(), "trade", trade.summary.clone());
                row.sent_amount = Some(sent.amount.quantity);
                row.sent_currency = Some(&sent.amount.currency);
                row.received_amount = Some(received.amount.quantity);
                row.received_currency = Some(&received.amount.currency);
                row.fee_amount = Some(trade.trading_fee.amount.quantity);
                row.fee_currency = Some(&trade.trading_fee.amount.currency);
                row
            }
            Transaction::Swap(swap) => {
                let mut row = KoinlyTx::empty(swap.date(), "swap", swap.asset_a.summary.clone());
                row.sent_amount = Some(swap.asset_a.amount.quantity);
                row.sent_currency = Some(&swap.asset_a.amount.currency);
                row.received_amount = Some(swap.asset_b.amount.quantity);
                row.received_currency = Some(&swap.asset_b.amount.currency);
                row
            }
            Transaction::Exchange(exchange) => {
                let mut row = KoinlyTx::empty(
                    exchange.date(),
                    "exchange",
                    exchange.base_asset.summary.clone(),
                );
                row.sent_amount = Some(exchange.base_asset.amount.quantity);
                row.sent_currency = Some(&exchange.base_asset.amount.currency);
                row.received_amount = Some(exchange.quote_asset.amount.quantity);
                row.received_currency = Some(&exchange.quote_asset.amount.currency);
                row.fee_amount = Some(exchange.trading_fee.amount.quantity);
                row.fee_currency = Some(&exchange.trading_fee.amount.currency);
                row
            }
            Transaction::NonTrade(non_trade) => non_trade_row(non_trade),
        }
    }
}

pub(crate) fn write_koinly_csv<W: std::io::Write>(
    transactions: &[Transaction],
    writer: W,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for transaction in transactions {
        wtr.serialize(KoinlyTx::from(transaction))?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn save_koinly_csv(transactions: &[Transaction], output_path: &Path) -> Result<()> {
    println!("Saving {}", output_path.display());
    write_koinly_csv(transactions, std::fs::File::create(output_path)?)
}
