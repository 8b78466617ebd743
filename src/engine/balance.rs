//! Historical balance reconstruction anchored on the queried present balance,
//! and its resampling onto a daily calendar.

use crate::domain::{
    day_end_ms, days_inclusive, BalancePoint, BalanceRow, CostBasisEvent, Decimal, NetChange,
    PriceHistory, TimeMs,
};
use chrono::NaiveDate;

/// Walk `changes` (ascending) backwards from `current_balance`.
///
/// The latest change ends at `current_balance`; every earlier one ends at the
/// next balance minus the next change. Output is ascending.
pub fn reconstruct_balances(changes: &[NetChange], current_balance: Decimal) -> Vec<BalancePoint> {
    let mut running = current_balance;
    let mut points: Vec<BalancePoint> = changes
        .iter()
        .rev()
        .map(|change| {
            let point = BalancePoint {
                transaction_id: change.transaction_id.clone(),
                timestamp_ms: change.timestamp_ms,
                net_change_kas: change.net_change_kas,
                direction: change.direction,
                balance_after: running,
            };
            running -= change.net_change_kas;
            point
        })
        .collect();
    points.reverse();
    points
}

/// Balance immediately before the first reconstructed change.
pub fn opening_balance(points: &[BalancePoint]) -> Option<Decimal> {
    points.first().map(|p| p.balance_after - p.net_change_kas)
}

/// Resample per-transaction balances into one row per UTC day.
///
/// Rows span from the earlier of the first price day and the first
/// transaction day to the last transaction day. Days before the first
/// transaction carry zero. Prices are forward-filled, then the leading gap is
/// back-filled. With no transactions a single row for `as_of` carries the
/// current balance.
pub fn daily_balances(
    points: &[BalancePoint],
    current_balance: Decimal,
    prices: &PriceHistory,
    cost_events: &[CostBasisEvent],
    as_of: NaiveDate,
) -> Vec<BalanceRow> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        let price = prices.on_or_before(as_of).or(prices.first()).map(|p| p.price_usd);
        return vec![BalanceRow {
            date: as_of,
            balance_kas: current_balance,
            price_usd: price,
            value_usd: price.map(|p| p * current_balance),
            avg_cost_usd: cost_events.last().map(|e| e.running_avg_price),
        }];
    };

    let first_tx_day = first.timestamp_ms.date();
    let start = prices
        .first()
        .map(|p| p.date().min(first_tx_day))
        .unwrap_or(first_tx_day);
    let end = last.timestamp_ms.date();

    let days: Vec<NaiveDate> = days_inclusive(start, end).collect();

    let mut balances = Vec::with_capacity(days.len());
    let mut avg_costs = Vec::with_capacity(days.len());
    let mut prices_ffill: Vec<Option<Decimal>> = Vec::with_capacity(days.len());
    let mut balance_idx = 0;
    let mut cost_idx = 0;
    let mut balance = Decimal::zero();
    let mut avg_cost = None;
    let mut last_price = None;

    for day in &days {
        let cutoff = TimeMs::new(day_end_ms(*day));
        while balance_idx < points.len() && points[balance_idx].timestamp_ms <= cutoff {
            balance = points[balance_idx].balance_after;
            balance_idx += 1;
        }
        while cost_idx < cost_events.len() && cost_events[cost_idx].timestamp_ms <= cutoff {
            avg_cost = Some(cost_events[cost_idx].running_avg_price);
            cost_idx += 1;
        }
        if let Some(p) = prices.on(*day) {
            last_price = Some(p.price_usd);
        }
        balances.push(balance);
        avg_costs.push(avg_cost);
        prices_ffill.push(last_price);
    }

    if let Some(first_known) = prices_ffill.iter().flatten().next().copied() {
        for price in prices_ffill.iter_mut().take_while(|p| p.is_none()) {
            *price = Some(first_known);
        }
    }

    days.into_iter()
        .zip(balances)
        .zip(avg_costs)
        .zip(prices_ffill)
        .map(|(((date, balance_kas), avg_cost_usd), price_usd)| BalanceRow {
            date,
            balance_kas,
            price_usd,
            value_usd: price_usd.map(|p| p * balance_kas),
            avg_cost_usd,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{day_start_ms, Direction, PricePoint};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn change(id: &str, d: u32, amount: &str) -> NetChange {
        let net = dec(amount);
        NetChange {
            transaction_id: id.to_string(),
            timestamp_ms: TimeMs::new(day_start_ms(day(d)) + 43_200_000),
            net_change_kas: net,
            direction: if net.is_positive() {
                Direction::In
            } else {
                Direction::Out
            },
        }
    }

    fn balances(points: &[BalancePoint]) -> Vec<Decimal> {
        points.iter().map(|p| p.balance_after).collect()
    }

    #[test]
    fn test_two_inflows() {
        let points = reconstruct_balances(&[change("a", 1, "30"), change("b", 2, "70")], dec("100"));
        assert_eq!(balances(&points), vec![dec("30"), dec("100")]);
        assert_eq!(opening_balance(&points), Some(Decimal::zero()));
    }

    #[test]
    fn test_in_out_in() {
        let changes = vec![change("a", 1, "100"), change("b", 2, "-20"), change("c", 3, "20")];
        let points = reconstruct_balances(&changes, dec("100"));
        assert_eq!(balances(&points), vec![dec("100"), dec("80"), dec("100")]);
    }

    #[test]
    fn test_reconstruction_law_and_conservation() {
        let changes = vec![
            change("a", 1, "12.5"),
            change("b", 2, "-2.25"),
            change("c", 3, "0"),
            change("d", 4, "7"),
        ];
        let current = dec("40");
        let points = reconstruct_balances(&changes, current);
        assert_eq!(points.last().unwrap().balance_after, current);
        for w in points.windows(2) {
            assert_eq!(w[0].balance_after, w[1].balance_after - w[1].net_change_kas);
        }
        let total: Decimal = changes.iter().map(|c| c.net_change_kas).sum();
        assert_eq!(total, current - opening_balance(&points).unwrap());
    }

    #[test]
    fn test_daily_resample_with_fills() {
        let points = reconstruct_balances(&[change("a", 3, "30"), change("b", 5, "70")], dec("100"));
        let prices = PriceHistory::from_points(vec![
            PricePoint::new(day(2), dec("0.5")),
            PricePoint::new(day(4), dec("1")),
        ]);
        let rows = daily_balances(&points, dec("100"), &prices, &[], day(20));

        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(4), day(5)]);
        assert_eq!(rows[0].balance_kas, Decimal::zero());
        assert_eq!(rows[1].balance_kas, dec("30"));
        assert_eq!(rows[2].balance_kas, dec("30"));
        assert_eq!(rows[3].balance_kas, dec("100"));

        assert_eq!(rows[1].price_usd, Some(dec("0.5")));
        assert_eq!(rows[3].price_usd, Some(dec("1")));
        assert_eq!(rows[3].value_usd, Some(dec("100")));
    }

    #[test]
    fn test_daily_resample_back_fills_leading_gap() {
        let points = reconstruct_balances(&[change("a", 1, "10"), change("b", 3, "5")], dec("15"));
        let prices = PriceHistory::from_points(vec![PricePoint::new(day(2), dec("0.2"))]);
        let rows = daily_balances(&points, dec("15"), &prices, &[], day(20));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[0].price_usd, Some(dec("0.2")));
        assert_eq!(rows[2].price_usd, Some(dec("0.2")));
    }

    #[test]
    fn test_daily_resample_without_prices() {
        let points = reconstruct_balances(&[change("a", 1, "10"), change("b", 2, "-4")], dec("6"));
        let rows = daily_balances(&points, dec("6"), &PriceHistory::empty(), &[], day(20));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.price_usd.is_none() && r.value_usd.is_none()));
        assert_eq!(rows[1].balance_kas, dec("6"));
    }

    #[test]
    fn test_daily_resample_carries_avg_cost() {
        let points = reconstruct_balances(&[change("a", 1, "10"), change("b", 3, "10")], dec("20"));
        let events = vec![CostBasisEvent {
            timestamp_ms: points[0].timestamp_ms,
            kas_amount: dec("10"),
            price_at_purchase: dec("0.02"),
            running_avg_price: dec("0.02"),
        }];
        let rows = daily_balances(&points, dec("20"), &PriceHistory::empty(), &events, day(20));
        assert!(rows.iter().all(|r| r.avg_cost_usd == Some(dec("0.02"))));
    }

    #[test]
    fn test_empty_history_single_row() {
        let prices = PriceHistory::from_points(vec![PricePoint::new(day(1), dec("0.1"))]);
        let rows = daily_balances(&[], dec("42"), &prices, &[], day(9));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, day(9));
        assert_eq!(rows[0].balance_kas, dec("42"));
        assert_eq!(rows[0].value_usd, Some(dec("4.2")));
    }
}
