//! Send state derivation.
//!
//! [`derive_state`] is a pure function of the user's input and the latest
//! external data. It never fails on bad input: an invalid address, a zero
//! amount or an unaffordable amount produce warnings and a disabled send
//! button. The only error is a missing exchange rate while amounts are
//! entered in fiat, which makes the flow impossible to continue.

use coinflow_core::amount::{Rate, Rounding};
use coinflow_core::error::{AddressError, AmountError};
use coinflow_core::types::InputType;

use crate::error::SendError;
use crate::fee::AddressKind;
use crate::input::SendUserInput;
use crate::quote::Quote;
use crate::traits::SendAdapter;

/// External data a derivation depends on.
pub struct SendContext<'a> {
    pub adapter: &'a dyn SendAdapter,
    pub rate: Quote<Rate>,
    /// Fee rate for the input's priority, base units per virtual byte.
    pub fee_rate: Quote<u64>,
    /// Spendable balance in coin base units.
    pub balance: u64,
}

/// The amount cannot be covered by the spendable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountWarning {
    /// `available` is the max-send amount in the input unit.
    InsufficientBalance { available: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeWarning {
    /// The fee, in coin base units, does not fit in the balance next to
    /// the amount.
    ExceedsBalance { fee: u64 },
}

/// Fully derived view of a send in progress.
///
/// Amounts are fixed-point: coin in base units, currency at 8 decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendState {
    pub input_type: InputType,
    pub coin_amount: Quote<u64>,
    pub currency_amount: Quote<u64>,
    pub rate: Quote<Rate>,
    /// Trimmed address as entered, valid or not.
    pub address: Option<String>,
    pub address_kind: Option<AddressKind>,
    pub address_error: Option<AddressError>,
    pub fee: Quote<u64>,
    pub fee_currency: Quote<u64>,
    /// Largest sendable coin amount after fees.
    pub max_coin: Quote<u64>,
    pub balance: u64,
    pub amount_warning: Option<AmountWarning>,
    pub fee_warning: Option<FeeWarning>,
    pub round_down: bool,
    pub send_enabled: bool,
}

impl SendState {
    /// Whether a rate is present, which is what the unit switch needs.
    pub fn switch_enabled(&self) -> bool {
        self.rate.is_value()
    }

    /// Address and coin amount of a confirmable state.
    pub fn confirmable(&self) -> Option<(&str, u64)> {
        if !self.send_enabled {
            return None;
        }
        Some((self.address.as_deref()?, self.coin_amount.value()?))
    }
}

fn convert(rate: Quote<Rate>, f: impl FnOnce(Rate) -> Result<u64, AmountError>) -> Quote<u64> {
    // Overflow needs amounts beyond 1.8e11 whole units; saturate so the
    // result fails the max-send check instead of erroring.
    rate.map(|r| f(r).unwrap_or(u64::MAX))
}

/// Max-send in coin units together with the fee of spending everything.
fn max_send(address: Option<&str>, ctx: &SendContext<'_>) -> Quote<(u64, u64)> {
    ctx.fee_rate.map(|fee_rate| {
        let fee_all = ctx.adapter.fee(ctx.balance, address, fee_rate);
        (ctx.balance.saturating_sub(fee_all), fee_all)
    })
}

/// Validated address, if the entered one is valid.
fn valid_address<'i>(input: &'i SendUserInput, ctx: &SendContext<'_>) -> Option<&'i str> {
    input
        .trimmed_address()
        .filter(|a| ctx.adapter.validate_address(a).is_ok())
}

/// Largest amount the user can send, in the unit of `input_type`.
///
/// The fee is estimated for the entered address when it is valid, for a
/// generic destination otherwise. Currency values round down so converting
/// back never exceeds the coin maximum.
pub fn max_amount(
    input_type: InputType,
    input: &SendUserInput,
    ctx: &SendContext<'_>,
) -> Result<Quote<u64>, SendError> {
    let max_coin = max_send(valid_address(input, ctx), ctx).map(|(max, _)| max);
    match input_type {
        InputType::Coin => Ok(max_coin),
        InputType::Currency => match ctx.rate {
            Quote::Unavailable => Err(SendError::RateUnavailable),
            rate => Ok(max_coin
                .zip(rate)
                .map(|(max, r)| r.to_currency(max, Rounding::Down).unwrap_or(u64::MAX))),
        },
    }
}

/// Derive the send state. `round_down` is set after "max" so the coin
/// amount converted from fiat never exceeds what is affordable.
pub fn derive_state(
    input: &SendUserInput,
    ctx: &SendContext<'_>,
    round_down: bool,
) -> Result<SendState, SendError> {
    if input.input_type == InputType::Currency && ctx.rate.is_unavailable() {
        return Err(SendError::RateUnavailable);
    }
    let rounding = Rounding::from_round_down(round_down);

    let (coin_amount, currency_amount) = match input.input_type {
        InputType::Coin => (
            Quote::Value(input.amount),
            convert(ctx.rate, |r| r.to_currency(input.amount, rounding)),
        ),
        InputType::Currency => (
            convert(ctx.rate, |r| r.to_coin(input.amount, rounding)),
            Quote::Value(input.amount),
        ),
    };

    let address = input.trimmed_address().map(str::to_string);
    let (address_kind, address_error) = match address.as_deref() {
        None => (None, None),
        Some(a) => match ctx.adapter.validate_address(a) {
            Ok(kind) => (Some(kind), None),
            Err(e) => (None, Some(e)),
        },
    };
    let fee_address = address_kind.and(address.as_deref());

    let fee = coin_amount
        .zip(ctx.fee_rate)
        .map(|(coin, fee_rate)| ctx.adapter.fee(coin, fee_address, fee_rate));
    let fee_currency = fee
        .zip(ctx.rate)
        .map(|(f, r)| r.to_currency(f, Rounding::Nearest).unwrap_or(u64::MAX));

    let max = max_send(fee_address, ctx);
    let max_coin = max.map(|(m, _)| m);

    let amount_warning = match (coin_amount, max_coin) {
        (Quote::Value(coin), Quote::Value(max)) if coin > max => {
            let available = match (input.input_type, ctx.rate) {
                (InputType::Currency, Quote::Value(r)) => {
                    r.to_currency(max, Rounding::Down).unwrap_or(u64::MAX)
                }
                _ => max,
            };
            Some(AmountWarning::InsufficientBalance { available })
        }
        _ => None,
    };

    let fee_warning = match (max, coin_amount, fee) {
        (Quote::Value((0, fee_all)), _, _) if ctx.balance > 0 => {
            Some(FeeWarning::ExceedsBalance { fee: fee_all })
        }
        (_, Quote::Value(coin), Quote::Value(fee))
            if coin <= ctx.balance && coin.saturating_add(fee) > ctx.balance =>
        {
            Some(FeeWarning::ExceedsBalance { fee })
        }
        _ => None,
    };

    let send_enabled = address_kind.is_some()
        && fee.is_value()
        && (input.input_type == InputType::Coin || ctx.rate.is_value())
        && matches!(
            (coin_amount, max_coin),
            (Quote::Value(coin), Quote::Value(max)) if coin > 0 && coin <= max
        );

    Ok(SendState {
        input_type: input.input_type,
        coin_amount,
        currency_amount,
        rate: ctx.rate,
        address,
        address_kind,
        address_error,
        fee,
        fee_currency,
        max_coin,
        balance: ctx.balance,
        amount_warning,
        fee_warning,
        round_down,
        send_enabled,
    })
}
