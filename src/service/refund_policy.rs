// service/refund_policy.rs
//
// Tiered refund policy calculator. Pure functions, no store or gateway
// access; callers feed in the clock so outcomes are reproducible.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::admodel::AdDuration;

/// Cut-off for a free service cancellation, in hours before the scheduled
/// service time.
const SERVICE_FULL_REFUND_HOURS: i64 = 12;

/// Share refunded when the seeker cancels inside the cut-off window; the
/// provider retains the remainder for the reserved slot.
const SERVICE_LATE_REFUND_PERCENTAGE: f64 = 70.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RefundTier {
    None,
    Full,
    Partial,
    Prorated,
}

impl RefundTier {
    pub fn to_str(&self) -> &str {
        match self {
            RefundTier::None => "none",
            RefundTier::Full => "full",
            RefundTier::Partial => "partial",
            RefundTier::Prorated => "prorated",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RefundDecision {
    pub percentage: f64,
    pub tier: RefundTier,
    pub refund_amount_minor: i64,
}

impl RefundDecision {
    fn from_percentage(percentage: f64, tier: RefundTier, amount_minor: i64) -> Self {
        RefundDecision {
            percentage,
            tier,
            refund_amount_minor: (amount_minor as f64 * percentage / 100.0).round() as i64,
        }
    }
}

/// Refund owed when a scheduled service engagement is cancelled.
///
/// No agreed schedule means the work never had a reserved slot, so the
/// seeker gets everything back. Otherwise the 12-hour cut-off applies.
pub fn service_cancellation_refund(
    scheduled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    amount_minor: i64,
) -> RefundDecision {
    let Some(scheduled_at) = scheduled_at else {
        return RefundDecision::from_percentage(100.0, RefundTier::Full, amount_minor);
    };

    let hours_until_service = (scheduled_at - now).num_hours();
    if hours_until_service >= SERVICE_FULL_REFUND_HOURS {
        RefundDecision::from_percentage(100.0, RefundTier::Full, amount_minor)
    } else {
        RefundDecision::from_percentage(
            SERVICE_LATE_REFUND_PERCENTAGE,
            RefundTier::Partial,
            amount_minor,
        )
    }
}

/// Refund owed when an ad campaign is cancelled mid-flight.
///
/// Daily campaigns start immediately and are never refundable. Weekly and
/// monthly campaigns decay in steps; monthly additionally prorates the
/// unused days between day 8 and day 15.
pub fn ad_cancellation_refund(
    duration: AdDuration,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    amount_minor: i64,
) -> RefundDecision {
    let days_since_start = (now - started_at).num_days().max(0);
    let total_days = duration.total_days();

    match duration {
        AdDuration::Daily => RefundDecision::from_percentage(0.0, RefundTier::None, amount_minor),
        AdDuration::Weekly => {
            if days_since_start <= 1 {
                RefundDecision::from_percentage(100.0, RefundTier::Full, amount_minor)
            } else if days_since_start <= 3 {
                RefundDecision::from_percentage(75.0, RefundTier::Partial, amount_minor)
            } else {
                RefundDecision::from_percentage(0.0, RefundTier::None, amount_minor)
            }
        }
        AdDuration::Monthly => {
            if days_since_start <= 3 {
                RefundDecision::from_percentage(100.0, RefundTier::Full, amount_minor)
            } else if days_since_start <= 7 {
                RefundDecision::from_percentage(75.0, RefundTier::Partial, amount_minor)
            } else if days_since_start <= 15 {
                let per_day = amount_minor as f64 / total_days as f64;
                let refund_amount =
                    ((total_days - days_since_start) as f64 * per_day).round() as i64;
                let refund_amount = refund_amount.clamp(0, amount_minor);
                let percentage = if amount_minor > 0 {
                    refund_amount as f64 * 100.0 / amount_minor as f64
                } else {
                    0.0
                };
                RefundDecision {
                    percentage,
                    tier: RefundTier::Prorated,
                    refund_amount_minor: refund_amount,
                }
            } else {
                RefundDecision::from_percentage(0.0, RefundTier::None, amount_minor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const AMOUNT: i64 = 100_000;

    fn at(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
        Some(now + Duration::hours(hours))
    }

    #[test]
    fn service_without_schedule_refunds_in_full() {
        let now = Utc::now();
        let decision = service_cancellation_refund(None, now, AMOUNT);
        assert_eq!(decision.percentage, 100.0);
        assert_eq!(decision.tier, RefundTier::Full);
        assert_eq!(decision.refund_amount_minor, AMOUNT);
    }

    #[test]
    fn service_thirteen_hours_out_refunds_in_full() {
        let now = Utc::now();
        let decision = service_cancellation_refund(at(now, 13), now, AMOUNT);
        assert_eq!(decision.percentage, 100.0);
        assert_eq!(decision.tier, RefundTier::Full);
    }

    #[test]
    fn service_eleven_hours_out_refunds_seventy_percent() {
        let now = Utc::now();
        let decision = service_cancellation_refund(at(now, 11), now, AMOUNT);
        assert_eq!(decision.percentage, 70.0);
        assert_eq!(decision.tier, RefundTier::Partial);
        assert_eq!(decision.refund_amount_minor, 70_000);
    }

    #[test]
    fn service_exactly_at_cutoff_refunds_in_full() {
        let now = Utc::now();
        let decision = service_cancellation_refund(at(now, 12), now, AMOUNT);
        assert_eq!(decision.percentage, 100.0);
    }

    #[test]
    fn service_refund_rounds_to_nearest_minor_unit() {
        let now = Utc::now();
        let decision = service_cancellation_refund(at(now, 2), now, 101);
        // 70% of 101 = 70.7, rounds to 71
        assert_eq!(decision.refund_amount_minor, 71);
        assert!(decision.refund_amount_minor <= 101);
    }

    #[test]
    fn daily_campaign_is_never_refundable() {
        let now = Utc::now();
        let decision = ad_cancellation_refund(AdDuration::Daily, now, now, AMOUNT);
        assert_eq!(decision.percentage, 0.0);
        assert_eq!(decision.tier, RefundTier::None);
        assert_eq!(decision.refund_amount_minor, 0);
    }

    #[test]
    fn weekly_campaign_tiers() {
        let now = Utc::now();
        let day = |d: i64| now - Duration::days(d);

        let d1 = ad_cancellation_refund(AdDuration::Weekly, day(1), now, AMOUNT);
        assert_eq!((d1.percentage, d1.tier), (100.0, RefundTier::Full));

        let d2 = ad_cancellation_refund(AdDuration::Weekly, day(2), now, AMOUNT);
        assert_eq!((d2.percentage, d2.tier), (75.0, RefundTier::Partial));
        assert_eq!(d2.refund_amount_minor, 75_000);

        let d4 = ad_cancellation_refund(AdDuration::Weekly, day(4), now, AMOUNT);
        assert_eq!((d4.percentage, d4.tier), (0.0, RefundTier::None));
    }

    #[test]
    fn monthly_campaign_tiers() {
        let now = Utc::now();
        let day = |d: i64| now - Duration::days(d);

        let d3 = ad_cancellation_refund(AdDuration::Monthly, day(3), now, AMOUNT);
        assert_eq!((d3.percentage, d3.tier), (100.0, RefundTier::Full));

        let d7 = ad_cancellation_refund(AdDuration::Monthly, day(7), now, AMOUNT);
        assert_eq!((d7.percentage, d7.tier), (75.0, RefundTier::Partial));

        let d20 = ad_cancellation_refund(AdDuration::Monthly, day(20), now, AMOUNT);
        assert_eq!((d20.percentage, d20.tier), (0.0, RefundTier::None));
        assert_eq!(d20.refund_amount_minor, 0);
    }

    #[test]
    fn monthly_campaign_prorates_unused_days() {
        let now = Utc::now();
        let started = now - Duration::days(10);
        let decision = ad_cancellation_refund(AdDuration::Monthly, started, now, AMOUNT);
        assert_eq!(decision.tier, RefundTier::Prorated);
        // 20 unused days of a 30-day campaign
        let expected = (20.0 * (AMOUNT as f64 / 30.0)).round() as i64;
        assert_eq!(decision.refund_amount_minor, expected);
        assert!(decision.refund_amount_minor <= AMOUNT);
        assert!((decision.percentage - 66.66).abs() < 1.0);
    }

    #[test]
    fn prorated_refund_never_exceeds_amount() {
        let now = Utc::now();
        // Day 8 boundary: 22/30 refunded
        let decision =
            ad_cancellation_refund(AdDuration::Monthly, now - Duration::days(8), now, 7);
        assert!(decision.refund_amount_minor <= 7);
    }
}
