use crate::domain::{CostBasisEvent, Decimal, Direction, NetChange, PriceHistory};

/// Running volume-weighted average purchase price.
///
/// Only inflows move the average; outflows leave both accumulators untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostBasisTracker {
    running_kas: Decimal,
    running_cost: Decimal,
    events: Vec<CostBasisEvent>,
}

impl CostBasisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current average price, `None` before the first priced inflow.
    pub fn running_avg(&self) -> Option<Decimal> {
        self.running_cost.checked_div(self.running_kas)
    }

    pub fn total_kas(&self) -> Decimal {
        self.running_kas
    }

    /// Fold one net change. Returns the emitted event for a priced inflow.
    ///
    /// Changes must be supplied in ascending time order.
    pub fn process(&mut self, change: &NetChange, prices: &PriceHistory) -> Option<&CostBasisEvent> {
        if change.direction != Direction::In || !change.net_change_kas.is_positive() {
            return None;
        }
        let price = prices.on_or_before(change.timestamp_ms.date())?.price_usd;
        self.record_purchase(change, price)
    }

    fn record_purchase(&mut self, change: &NetChange, price: Decimal) -> Option<&CostBasisEvent> {
        let amount = change.net_change_kas;
        self.running_kas += amount;
        self.running_cost += amount * price;
        let running_avg_price = self.running_avg()?;

        self.events.push(CostBasisEvent {
            timestamp_ms: change.timestamp_ms,
            kas_amount: amount,
            price_at_purchase: price,
            running_avg_price,
        });
        self.events.last()
    }

    pub fn events(&self) -> &[CostBasisEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CostBasisEvent> {
        self.events
    }
}

/// Cost-basis history for ascending `changes`.
pub fn cost_basis_history(changes: &[NetChange], prices: &PriceHistory) -> Vec<CostBasisEvent> {
    let mut tracker = CostBasisTracker::new();
    for change in changes {
        tracker.process(change, prices);
    }
    tracker.into_events()
}
