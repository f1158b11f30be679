//! Display-ready view items for a derived [`SendState`].

use coinflow_core::amount::{format_amount, Rounding};
use coinflow_core::config::{CurrencyConfig, WalletConfig};
use coinflow_core::constants::DECIMALS;
use coinflow_core::types::InputType;

use crate::quote::Quote;
use crate::state::{AmountWarning, FeeWarning, SendState};

/// Recipient as entered, annotated with its validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressInfo {
    Valid(String),
    Invalid { address: String, error: String },
}

/// Line under the amount field: the converted amount, or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintInfo {
    Amount(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeeInfo {
    /// Fee in coin; `None` while the fee rate is pending.
    pub primary: Option<String>,
    /// Fee in currency, when a rate is known.
    pub secondary: Option<String>,
    pub error: Option<String>,
}

/// Everything the send screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendViewItem {
    pub input_type: InputType,
    /// Fractional digits accepted by the amount field.
    pub decimal: u32,
    /// Amount in the input unit.
    pub amount: Option<String>,
    pub hint: Option<HintInfo>,
    pub switch_enabled: bool,
    pub address_info: Option<AddressInfo>,
    pub fee_info: FeeInfo,
    pub send_enabled: bool,
}

/// Summary shown before the user confirms a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendConfirmationViewItem {
    pub coin_code: String,
    pub address: String,
    /// Coin base units.
    pub amount: u64,
    pub fee: u64,
    pub total: u64,
    pub amount_text: String,
    pub amount_currency_text: Option<String>,
    pub fee_text: String,
    pub fee_currency_text: Option<String>,
    pub total_text: String,
    pub total_currency_text: Option<String>,
}

/// Formats [`SendState`]s for a coin and a fiat currency.
#[derive(Debug, Clone)]
pub struct SendStateViewItemFactory {
    coin_code: String,
    currency: CurrencyConfig,
}

impl SendStateViewItemFactory {
    pub fn new(coin_code: impl Into<String>, currency: CurrencyConfig) -> Self {
        Self {
            coin_code: coin_code.into(),
            currency,
        }
    }

    pub fn from_config(config: &WalletConfig) -> Self {
        Self::new(config.coin_code.clone(), config.currency.clone())
    }

    pub fn coin_code(&self) -> &str {
        &self.coin_code
    }

    pub fn currency(&self) -> &CurrencyConfig {
        &self.currency
    }

    /// Fractional digits of `input_type`.
    pub fn decimals(&self, input_type: InputType) -> u32 {
        match input_type {
            InputType::Coin => DECIMALS,
            InputType::Currency => self.currency.decimals,
        }
    }

    /// `0.9999 BTC`
    pub fn coin_text(&self, value: u64) -> String {
        format!("{} {}", format_amount(value, DECIMALS, Rounding::Nearest), self.coin_code)
    }

    /// `$1999.8`
    pub fn currency_text(&self, value: u64, rounding: Rounding) -> String {
        format!(
            "{}{}",
            self.currency.symbol,
            format_amount(value, self.currency.decimals, rounding)
        )
    }

    fn text(&self, input_type: InputType, value: u64, rounding: Rounding) -> String {
        match input_type {
            InputType::Coin => self.coin_text(value),
            InputType::Currency => self.currency_text(value, rounding),
        }
    }

    pub fn view_item(&self, state: &SendState) -> SendViewItem {
        let rounding = Rounding::from_round_down(state.round_down);
        let (primary, secondary) = match state.input_type {
            InputType::Coin => (state.coin_amount, state.currency_amount),
            InputType::Currency => (state.currency_amount, state.coin_amount),
        };
        let other = state.input_type.toggled();

        let hint = match state.amount_warning {
            Some(AmountWarning::InsufficientBalance { available }) => Some(HintInfo::Error(format!(
                "Insufficient balance, available: {}",
                self.text(state.input_type, available, Rounding::Down)
            ))),
            None => secondary
                .value()
                .map(|v| HintInfo::Amount(self.text(other, v, rounding))),
        };

        let address_info = state.address.as_ref().map(|address| match &state.address_error {
            Some(e) => AddressInfo::Invalid {
                address: address.clone(),
                error: e.to_string(),
            },
            None => AddressInfo::Valid(address.clone()),
        });

        let fee_info = FeeInfo {
            primary: state.fee.value().map(|f| self.coin_text(f)),
            secondary: state
                .fee_currency
                .value()
                .map(|f| self.currency_text(f, Rounding::Nearest)),
            error: state.fee_warning.map(|FeeWarning::ExceedsBalance { fee }| {
                format!("Fee {} exceeds balance", self.coin_text(fee))
            }),
        };

        SendViewItem {
            input_type: state.input_type,
            decimal: self.decimals(state.input_type),
            amount: primary.value().map(|v| self.text(state.input_type, v, rounding)),
            hint,
            switch_enabled: state.switch_enabled(),
            address_info,
            fee_info,
            send_enabled: state.send_enabled,
        }
    }

    /// `None` unless the state is confirmable.
    pub fn confirmation_view_item(&self, state: &SendState) -> Option<SendConfirmationViewItem> {
        let (address, amount) = state.confirmable()?;
        let fee = state.fee.value()?;
        let total = amount.saturating_add(fee);
        let rounding = Rounding::from_round_down(state.round_down);

        let currency_total = match (state.currency_amount, state.fee_currency) {
            (Quote::Value(a), Quote::Value(f)) => Some(a.saturating_add(f)),
            _ => None,
        };

        Some(SendConfirmationViewItem {
            coin_code: self.coin_code.clone(),
            address: address.to_string(),
            amount,
            fee,
            total,
            amount_text: self.coin_text(amount),
            amount_currency_text: state
                .currency_amount
                .value()
                .map(|v| self.currency_text(v, rounding)),
            fee_text: self.coin_text(fee),
            fee_currency_text: state
                .fee_currency
                .value()
                .map(|v| self.currency_text(v, Rounding::Nearest)),
            total_text: self.coin_text(total),
            total_currency_text: currency_total.map(|v| self.currency_text(v, rounding)),
        })
    }
}
