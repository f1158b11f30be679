//! Interactive send flow.
//!
//! A [`SendSession`] owns the user's input and the latest external data,
//! re-derives the [`SendState`] after every change and publishes the result
//! as [`SendEvent`]s. Rates and fee rates arrive asynchronously; until they
//! do, the state shows pending values and a disabled send button.

use std::collections::HashMap;
use std::sync::Arc;

use coinflow_core::amount::{parse_amount, round_to_decimals, Rate, Rounding};
use coinflow_core::config::WalletConfig;
use coinflow_core::constants::EVENT_CHANNEL_CAPACITY;
use coinflow_core::types::InputType;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::SendError;
use crate::input::{FeeRatePriority, SendUserInput};
use crate::payment::{parse_payment_address, payment_address};
use crate::quote::Quote;
use crate::state::{derive_state, max_amount, SendContext, SendState};
use crate::traits::{FeeRateProvider, RateProvider, SendAdapter};
use crate::view_item::{SendConfirmationViewItem, SendStateViewItemFactory, SendViewItem};

/// Notifications published by a [`SendSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    StateChanged(SendViewItem),
    ShowConfirmation(SendConfirmationViewItem),
    Sent,
    /// Broadcast failed; carries the adapter's message.
    SendFailed(String),
    /// The flow ended without sending.
    Dismissed,
}

pub struct SendSession {
    adapter: Arc<dyn SendAdapter>,
    factory: SendStateViewItemFactory,
    input: SendUserInput,
    default_input_type: InputType,
    rate: Quote<Rate>,
    fee_rates: HashMap<FeeRatePriority, Quote<u64>>,
    balance: u64,
    round_down: bool,
    dismissed: bool,
    events: broadcast::Sender<SendEvent>,
}

impl SendSession {
    pub fn new(
        adapter: Arc<dyn SendAdapter>,
        factory: SendStateViewItemFactory,
        balance: u64,
        default_input_type: InputType,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            adapter,
            factory,
            input: SendUserInput::new(default_input_type),
            default_input_type,
            rate: Quote::Pending,
            fee_rates: HashMap::new(),
            balance,
            round_down: false,
            dismissed: false,
            events,
        }
    }

    pub fn from_config(adapter: Arc<dyn SendAdapter>, config: &WalletConfig, balance: u64) -> Self {
        Self::new(
            adapter,
            SendStateViewItemFactory::from_config(config),
            balance,
            config.default_input_type,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SendEvent> {
        self.events.subscribe()
    }

    pub fn input(&self) -> &SendUserInput {
        &self.input
    }

    /// Unit the next session should start in; follows the last switch.
    pub fn default_input_type(&self) -> InputType {
        self.default_input_type
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    fn fee_rate(&self) -> Quote<u64> {
        self.fee_rates
            .get(&self.input.fee_rate_priority)
            .copied()
            .unwrap_or_default()
    }

    fn context(&self) -> SendContext<'_> {
        SendContext {
            adapter: self.adapter.as_ref(),
            rate: self.rate,
            fee_rate: self.fee_rate(),
            balance: self.balance,
        }
    }

    pub fn state(&self) -> Result<SendState, SendError> {
        derive_state(&self.input, &self.context(), self.round_down)
    }

    pub fn view_item(&self) -> Result<SendViewItem, SendError> {
        self.state().map(|s| self.factory.view_item(&s))
    }

    fn publish(&self, event: SendEvent) {
        let _ = self.events.send(event);
    }

    fn dismiss(&mut self) {
        if !self.dismissed {
            self.dismissed = true;
            info!("send flow dismissed");
            self.publish(SendEvent::Dismissed);
        }
    }

    fn refresh(&mut self) {
        if self.dismissed {
            return;
        }
        match self.state() {
            Ok(state) => {
                let item = self.factory.view_item(&state);
                self.publish(SendEvent::StateChanged(item));
            }
            Err(e) => {
                warn!(error = %e, "send state unavailable");
                self.dismiss();
            }
        }
    }

    /// Begin the flow in the default unit.
    pub fn start(&mut self) {
        self.input.input_type = self.default_input_type;
        debug!(input_type = ?self.input.input_type, balance = self.balance, "send flow started");
        self.refresh();
    }

    /// Fetch the exchange rate and every priority's fee rate.
    pub async fn retrieve_quotes(&mut self, rates: &dyn RateProvider, fee_rates: &dyn FeeRateProvider) {
        let rate = rates.current_rate(self.factory.coin_code()).await;
        self.did_retrieve_rate(rate);
        for priority in FeeRatePriority::ALL {
            if self.dismissed {
                return;
            }
            let fee_rate = fee_rates.fee_rate(priority).await;
            self.did_retrieve_fee_rate(priority, fee_rate);
        }
    }

    pub fn did_retrieve_rate(&mut self, rate: Option<Rate>) {
        if self.dismissed {
            return;
        }
        debug!(rate = ?rate, "exchange rate retrieved");
        self.rate = Quote::from(rate);
        if self.input.input_type == InputType::Currency && rate.is_none() {
            self.dismiss();
            return;
        }
        if self.default_input_type == InputType::Currency && self.input.amount == 0 {
            self.input.input_type = InputType::Currency;
        }
        self.refresh();
    }

    pub fn did_retrieve_fee_rate(&mut self, priority: FeeRatePriority, fee_rate: Option<u64>) {
        self.fee_rates.insert(priority, Quote::from(fee_rate));
        if priority == self.input.fee_rate_priority {
            self.refresh();
        }
    }

    pub fn did_update_balance(&mut self, balance: u64) {
        self.balance = balance;
        self.refresh();
    }

    /// Take a typed, pasted or scanned address. Payment requests also set
    /// the amount. A malformed request keeps whatever address it carries,
    /// or the raw text, and leaves validation to the derived state.
    pub fn on_address_enter(&mut self, raw: &str) {
        match parse_payment_address(raw) {
            Ok(request) => {
                if let Some(coin) = request.amount {
                    self.set_requested_amount(coin);
                }
                self.input.address = Some(request.address);
            }
            Err(e) => {
                warn!(error = %e, "malformed payment request");
                let address = match payment_address(raw) {
                    "" => raw.trim(),
                    address => address,
                };
                self.input.address = Some(address.to_string());
            }
        }
        self.refresh();
    }

    /// Apply a requested coin amount in the current input unit, falling
    /// back to coin input when it cannot be converted.
    fn set_requested_amount(&mut self, coin: u64) {
        self.round_down = false;
        if let (InputType::Currency, Quote::Value(rate)) = (self.input.input_type, self.rate) {
            if let Ok(currency) = rate.to_currency(coin, Rounding::Nearest) {
                self.input.amount =
                    round_to_decimals(currency, self.factory.currency().decimals, Rounding::Nearest);
                return;
            }
        }
        self.input.input_type = InputType::Coin;
        self.input.amount = coin;
    }

    pub fn on_address_delete(&mut self) {
        self.input.address = None;
        self.refresh();
    }

    /// Amount typed by the user, in the current input unit.
    pub fn on_amount_changed(&mut self, amount: u64) {
        self.input.amount = amount;
        self.round_down = false;
        self.refresh();
    }

    /// Parse a pasted decimal string in the current input unit.
    pub fn on_paste_amount(&mut self, text: &str) -> Result<(), SendError> {
        let decimals = self.factory.decimals(self.input.input_type);
        let amount = parse_amount(text, decimals)?;
        self.on_amount_changed(amount);
        Ok(())
    }

    /// Swap between coin and currency input, converting the amount.
    /// Does nothing without a rate.
    ///
    /// Coin to currency always rounds down, so the coin value derived from
    /// the new amount never exceeds the one the user entered.
    pub fn on_switch_clicked(&mut self) {
        let Quote::Value(rate) = self.rate else {
            return;
        };
        let converted = match self.input.input_type {
            InputType::Coin => rate
                .to_currency(self.input.amount, Rounding::Down)
                .map(|c| round_to_decimals(c, self.factory.currency().decimals, Rounding::Down)),
            InputType::Currency => rate
                .to_coin(self.input.amount, Rounding::from_round_down(self.round_down)),
        };
        let amount = match converted {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, amount = self.input.amount, "amount conversion failed");
                return;
            }
        };
        self.input.amount = amount;
        self.input.input_type = self.input.input_type.toggled();
        self.default_input_type = self.input.input_type;
        self.refresh();
    }

    /// Fill in the largest affordable amount.
    pub fn on_max_clicked(&mut self) {
        let input_type = self.input.input_type;
        match max_amount(input_type, &self.input, &self.context()) {
            Ok(Quote::Value(max)) => {
                self.input.amount = match input_type {
                    InputType::Coin => max,
                    InputType::Currency => {
                        round_to_decimals(max, self.factory.currency().decimals, Rounding::Down)
                    }
                };
                self.round_down = true;
                self.refresh();
            }
            Ok(_) => debug!("max amount not available yet"),
            Err(_) => self.dismiss(),
        }
    }

    pub fn on_fee_priority_change(&mut self, index: i32) {
        self.input.fee_rate_priority = FeeRatePriority::from_index(index);
        self.refresh();
    }

    /// Ask for confirmation. Returns the confirmation item when the state
    /// is confirmable.
    pub fn on_send_clicked(&mut self) -> Option<SendConfirmationViewItem> {
        if self.dismissed {
            return None;
        }
        let state = self.state().ok()?;
        let item = self.factory.confirmation_view_item(&state)?;
        self.publish(SendEvent::ShowConfirmation(item.clone()));
        Some(item)
    }

    /// Broadcast the confirmed send.
    pub async fn on_confirm_clicked(&mut self) -> Result<(), SendError> {
        if self.dismissed {
            return Err(SendError::Dismissed);
        }
        let state = self.state()?;
        if state.address.is_none() {
            return Err(SendError::NoAddress);
        }
        let (address, amount) = state.confirmable().ok_or(SendError::NotConfirmable)?;
        let address = address.to_string();

        info!(%address, amount, "broadcasting transaction");
        match self.adapter.send(&address, amount).await {
            Ok(()) => {
                info!(%address, amount, "transaction sent");
                self.publish(SendEvent::Sent);
                Ok(())
            }
            Err(e) => {
                warn!(%address, amount, error = %e, "send failed");
                self.publish(SendEvent::SendFailed(e.0.clone()));
                Err(e.into())
            }
        }
    }

    pub fn on_close(&mut self) {
        self.dismiss();
    }
}

impl std::fmt::Debug for SendSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendSession")
            .field("input", &self.input)
            .field("rate", &self.rate)
            .field("balance", &self.balance)
            .field("round_down", &self.round_down)
            .field("dismissed", &self.dismissed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BroadcastError;
    use crate::fee::AddressKind;
    use crate::view_item::AddressInfo;
    use async_trait::async_trait;
    use coinflow_core::config::CurrencyConfig;
    use coinflow_core::constants::COIN;
    use coinflow_core::error::AddressError;
    use parking_lot::Mutex;

    /// Fee is `fee_rate * 100`; addresses starting with `1` are valid.
    #[derive(Default)]
    struct MockAdapter {
        sent: Mutex<Vec<(String, u64)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl SendAdapter for MockAdapter {
        fn validate_address(&self, address: &str) -> Result<AddressKind, AddressError> {
            if address.starts_with('1') {
                Ok(AddressKind::P2pkh)
            } else {
                Err(AddressError::Invalid(address.to_string()))
            }
        }

        fn fee(&self, _amount: u64, _address: Option<&str>, fee_rate: u64) -> u64 {
            fee_rate * 100
        }

        async fn send(&self, address: &str, amount: u64) -> Result<(), BroadcastError> {
            if let Some(msg) = &self.fail_with {
                return Err(BroadcastError(msg.clone()));
            }
            self.sent.lock().push((address.to_string(), amount));
            Ok(())
        }
    }

    struct FixedRate(Option<Rate>);

    #[async_trait]
    impl RateProvider for FixedRate {
        async fn current_rate(&self, _coin_code: &str) -> Option<Rate> {
            self.0
        }
    }

    struct PriorityFees;

    #[async_trait]
    impl FeeRateProvider for PriorityFees {
        async fn fee_rate(&self, priority: FeeRatePriority) -> Option<u64> {
            match priority {
                FeeRatePriority::Low => Some(10),
                FeeRatePriority::Medium => Some(100),
                FeeRatePriority::High => None,
            }
        }
    }

    const ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    fn session(adapter: Arc<MockAdapter>, default_input_type: InputType) -> SendSession {
        let factory = SendStateViewItemFactory::new("BTC", CurrencyConfig::default());
        SendSession::new(adapter, factory, COIN, default_input_type)
    }

    fn rate_2000() -> Option<Rate> {
        Some(Rate::from_whole(2000).unwrap())
    }

    fn ready(adapter: Arc<MockAdapter>) -> SendSession {
        let mut s = session(adapter, InputType::Coin);
        s.start();
        s.did_retrieve_rate(rate_2000());
        s.did_retrieve_fee_rate(FeeRatePriority::Medium, Some(100));
        s
    }

    fn drain(rx: &mut broadcast::Receiver<SendEvent>) -> Vec<SendEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn missing_rate_in_currency_mode_dismisses() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Currency);
        let mut rx = s.subscribe();
        s.start();
        s.did_retrieve_rate(None);

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(SendEvent::StateChanged(_))));
        assert_eq!(events.last(), Some(&SendEvent::Dismissed));
        assert!(s.is_dismissed());
    }

    #[test]
    fn missing_rate_in_coin_mode_continues() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Coin);
        s.start();
        s.did_retrieve_rate(None);
        assert!(!s.is_dismissed());
        assert!(!s.view_item().unwrap().switch_enabled);
    }

    #[test]
    fn max_then_switch_keeps_send_enabled() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_address_enter(ADDRESS);
        s.on_max_clicked();
        assert_eq!(s.input().amount, 99_990_000);
        let item = s.view_item().unwrap();
        assert!(item.send_enabled);
        assert_eq!(item.amount.as_deref(), Some("0.9999 BTC"));

        s.on_switch_clicked();
        assert_eq!(s.input().input_type, InputType::Currency);
        assert_eq!(s.input().amount, 199_980_000_000);
        assert_eq!(s.default_input_type(), InputType::Currency);
        let state = s.state().unwrap();
        assert_eq!(state.coin_amount, Quote::Value(99_990_000));
        assert!(state.send_enabled);
    }

    #[test]
    fn max_in_currency_mode() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_switch_clicked();
        s.on_max_clicked();
        assert_eq!(s.input().amount, 199_980_000_000);
    }

    #[test]
    fn switch_to_currency_never_exceeds_max() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Coin);
        s.start();
        s.did_retrieve_rate(Some(Rate::from_whole(3).unwrap()));
        s.did_retrieve_fee_rate(FeeRatePriority::Medium, Some(100));
        s.on_address_enter(ADDRESS);
        s.on_amount_changed(99_990_000);
        assert!(s.state().unwrap().send_enabled);

        // 2.9997 rounds down to 2.99, not up to 3.00.
        s.on_switch_clicked();
        assert_eq!(s.input().amount, 299_000_000);
        let state = s.state().unwrap();
        assert_eq!(state.coin_amount, Quote::Value(99_666_667));
        assert!(state.amount_warning.is_none());
        assert!(state.send_enabled);
    }

    #[test]
    fn switch_without_rate_is_ignored() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Coin);
        s.start();
        s.on_amount_changed(1_000);
        s.on_switch_clicked();
        assert_eq!(s.input().input_type, InputType::Coin);
        assert_eq!(s.input().amount, 1_000);
    }

    #[test]
    fn payment_request_sets_amount() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_address_enter(&format!("bitcoin:{ADDRESS}?amount=0.25"));
        assert_eq!(s.input().address.as_deref(), Some(ADDRESS));
        assert_eq!(s.input().amount, 25_000_000);

        s.on_switch_clicked();
        s.on_address_enter(&format!("bitcoin:{ADDRESS}?amount=0.5"));
        assert_eq!(s.input().input_type, InputType::Currency);
        assert_eq!(s.input().amount, 100_000_000_000);
    }

    #[test]
    fn malformed_payment_request_keeps_address() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        let mut rx = s.subscribe();
        s.on_amount_changed(1_000);

        s.on_address_enter(&format!("bitcoin:{ADDRESS}?amount=oops"));
        assert_eq!(s.input().address.as_deref(), Some(ADDRESS));
        assert_eq!(s.input().amount, 1_000);
        assert!(s.state().unwrap().send_enabled);

        s.on_address_enter("bitcoin:");
        assert_eq!(s.input().address.as_deref(), Some("bitcoin:"));
        let item = s.view_item().unwrap();
        assert!(matches!(item.address_info, Some(AddressInfo::Invalid { .. })));
        assert!(!item.send_enabled);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(e, SendEvent::StateChanged(_))));
    }

    #[test]
    fn paste_amount_uses_input_decimals() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_paste_amount("0.12345678").unwrap();
        assert_eq!(s.input().amount, 12_345_678);

        s.on_switch_clicked();
        assert!(s.on_paste_amount("1.234").is_err());
        s.on_paste_amount("12.5").unwrap();
        assert_eq!(s.input().amount, 1_250_000_000);
    }

    #[test]
    fn fee_priority_without_rate_disables_send() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_address_enter(ADDRESS);
        s.on_amount_changed(1_000_000);
        assert!(s.state().unwrap().send_enabled);

        s.on_fee_priority_change(2);
        assert_eq!(s.input().fee_rate_priority, FeeRatePriority::High);
        assert!(!s.state().unwrap().send_enabled);
    }

    #[test]
    fn send_clicked_shows_confirmation() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        let mut rx = s.subscribe();
        assert!(s.on_send_clicked().is_none());

        s.on_address_enter(ADDRESS);
        s.on_amount_changed(50_000_000);
        let item = s.on_send_clicked().unwrap();
        assert_eq!(item.total, 50_010_000);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&SendEvent::ShowConfirmation(item))
        );
    }

    #[test]
    fn send_after_dismissal_shows_nothing() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_address_enter(ADDRESS);
        s.on_amount_changed(50_000_000);
        s.on_close();

        let mut rx = s.subscribe();
        assert!(s.on_send_clicked().is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn confirm_broadcasts() {
        let adapter = Arc::new(MockAdapter::default());
        let mut s = ready(adapter.clone());
        let mut rx = s.subscribe();
        s.on_address_enter(ADDRESS);
        s.on_amount_changed(50_000_000);

        s.on_confirm_clicked().await.unwrap();
        assert_eq!(adapter.sent.lock().as_slice(), &[(ADDRESS.to_string(), 50_000_000)]);
        assert_eq!(drain(&mut rx).last(), Some(&SendEvent::Sent));
    }

    #[tokio::test]
    async fn confirm_failure_is_reported() {
        let adapter = Arc::new(MockAdapter {
            fail_with: Some("mempool full".into()),
            ..MockAdapter::default()
        });
        let mut s = ready(adapter);
        let mut rx = s.subscribe();
        s.on_address_enter(ADDRESS);
        s.on_amount_changed(50_000_000);

        let err = s.on_confirm_clicked().await.unwrap_err();
        assert_eq!(err, SendError::Broadcast("mempool full".into()));
        assert_eq!(
            drain(&mut rx).last(),
            Some(&SendEvent::SendFailed("mempool full".into()))
        );
    }

    #[tokio::test]
    async fn confirm_requires_address() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        s.on_amount_changed(1_000);
        assert_eq!(s.on_confirm_clicked().await, Err(SendError::NoAddress));
        s.on_address_enter("bogus");
        assert_eq!(s.on_confirm_clicked().await, Err(SendError::NotConfirmable));
    }

    #[tokio::test]
    async fn retrieve_quotes_fills_rates() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Coin);
        s.start();
        s.retrieve_quotes(&FixedRate(rate_2000()), &PriorityFees).await;
        s.on_address_enter(ADDRESS);
        s.on_max_clicked();
        assert_eq!(s.input().amount, COIN - 10_000);
        assert!(s.view_item().unwrap().switch_enabled);
    }

    #[tokio::test]
    async fn retrieve_quotes_without_rate_dismisses_currency_flow() {
        let mut s = session(Arc::new(MockAdapter::default()), InputType::Currency);
        let mut rx = s.subscribe();
        s.start();
        s.retrieve_quotes(&FixedRate(None), &PriorityFees).await;
        assert!(s.is_dismissed());
        assert_eq!(drain(&mut rx).last(), Some(&SendEvent::Dismissed));
    }

    #[test]
    fn close_dismisses_once() {
        let mut s = ready(Arc::new(MockAdapter::default()));
        let mut rx = s.subscribe();
        s.on_close();
        s.on_close();
        s.on_amount_changed(5);
        assert_eq!(drain(&mut rx), vec![SendEvent::Dismissed]);
    }
}
