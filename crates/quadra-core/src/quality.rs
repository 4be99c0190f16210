//! Schedule quality metrics.
//!
//! Read-only analytics over a day's blocks: how balanced the four domains
//! are against their quotas, and how much time context switching between
//! domains costs. Switch cost is a per-pair table in minutes; the overall
//! quality score blends balance and switching efficiency equally.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::block::TimeBlock;
use crate::domain::Domain;
use crate::quota::QuotaPolicy;

/// Worst-case assumed cost per switch when normalizing efficiency.
const MAX_SWITCH_COST_MINUTES: u32 = 20;

/// Cost in minutes of switching between two domains, from the unordered
/// pair. Adjacent domains in the daily rhythm switch cheaply.
pub fn switch_cost(a: Domain, b: Domain) -> u32 {
    if a == b {
        return 0;
    }
    let pair = if a < b { (a, b) } else { (b, a) };
    match pair {
        (Domain::Academic, Domain::Income) => 10,
        (Domain::Academic, Domain::Growth) => 15,
        (Domain::Academic, Domain::Life) => 20,
        (Domain::Income, Domain::Growth) => 10,
        (Domain::Income, Domain::Life) => 15,
        (Domain::Growth, Domain::Life) => 10,
        _ => unreachable!("pair is ordered and distinct"),
    }
}

/// Quality metrics for one day's arrangement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleQuality {
    pub day: NaiveDate,
    /// Blend of balance and efficiency, in [0, 1].
    pub quality_score: f64,
    /// Mean closeness of each domain's minutes to its quota, in [0, 1].
    pub balance_score: f64,
    /// 1 minus normalized switch cost, in [0, 1].
    pub efficiency_score: f64,
    /// Total switch cost in minutes across the chronological arrangement.
    pub switch_cost_total: u32,
    /// Minutes per domain.
    pub domain_distribution: BTreeMap<Domain, i64>,
}

/// Assess the quality of a day's schedule.
///
/// Considers blocks that count toward quota (planned, active, completed)
/// on the given day, in chronological order.
pub fn assess(day: NaiveDate, blocks: &[TimeBlock], policy: &QuotaPolicy) -> ScheduleQuality {
    let mut considered: Vec<&TimeBlock> = blocks
        .iter()
        .filter(|b| b.day() == day && b.status.counts_toward_quota())
        .collect();
    considered.sort_by_key(|b| b.start_time);

    let mut distribution: BTreeMap<Domain, i64> =
        Domain::ORDER.iter().map(|&d| (d, 0)).collect();
    for block in &considered {
        *distribution.entry(block.domain).or_insert(0) += block.duration_minutes();
    }

    if considered.is_empty() {
        return ScheduleQuality {
            day,
            quality_score: 0.0,
            balance_score: 0.0,
            efficiency_score: 0.0,
            switch_cost_total: 0,
            domain_distribution: distribution,
        };
    }

    let balance_score = {
        let mut scores = Vec::with_capacity(Domain::ORDER.len());
        for domain in Domain::ORDER {
            let target = policy.allocated(domain) as f64;
            if target > 0.0 {
                let minutes = distribution[&domain] as f64;
                let deviation = (minutes - target).abs() / target;
                scores.push((1.0 - deviation).max(0.0));
            }
        }
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    };

    let switch_cost_total: u32 = considered
        .windows(2)
        .map(|pair| switch_cost(pair[0].domain, pair[1].domain))
        .sum();

    let efficiency_score = {
        let max_switches = (considered.len() - 1) as u32;
        let max_cost = max_switches * MAX_SWITCH_COST_MINUTES;
        if max_cost == 0 {
            1.0
        } else {
            (1.0 - switch_cost_total as f64 / max_cost as f64).max(0.0)
        }
    };

    ScheduleQuality {
        day,
        quality_score: balance_score * 0.5 + efficiency_score * 0.5,
        balance_score,
        efficiency_score,
        switch_cost_total,
        domain_distribution: distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    fn block(start: DateTime<Utc>, minutes: i64, domain: Domain) -> TimeBlock {
        TimeBlock::new(start, start + Duration::minutes(minutes), domain).unwrap()
    }

    #[test]
    fn switch_cost_is_symmetric() {
        for a in Domain::ORDER {
            for b in Domain::ORDER {
                assert_eq!(switch_cost(a, b), switch_cost(b, a));
            }
        }
        assert_eq!(switch_cost(Domain::Income, Domain::Income), 0);
        assert_eq!(switch_cost(Domain::Academic, Domain::Life), 20);
    }

    #[test]
    fn empty_day_scores_zero() {
        let quality = assess(day(), &[], &QuotaPolicy::default());
        assert_eq!(quality.quality_score, 0.0);
        assert_eq!(quality.switch_cost_total, 0);
        assert_eq!(quality.domain_distribution[&Domain::Academic], 0);
    }

    #[test]
    fn perfectly_balanced_grouped_day_scores_one() {
        // Each domain exactly at its 240-minute quota, grouped so the only
        // switches are the three cheap-to-count boundaries.
        let blocks = vec![
            block(at(6), 240, Domain::Academic),
            block(at(10), 240, Domain::Income),
            block(at(14), 240, Domain::Growth),
            block(at(18), 240, Domain::Life),
        ];
        let quality = assess(day(), &blocks, &QuotaPolicy::default());

        assert_eq!(quality.balance_score, 1.0);
        assert_eq!(quality.switch_cost_total, 10 + 10 + 10);
        assert!(quality.efficiency_score > 0.0);
        assert_eq!(quality.domain_distribution[&Domain::Growth], 240);
    }

    #[test]
    fn alternating_domains_cost_more_than_grouped() {
        let grouped = vec![
            block(at(9), 60, Domain::Academic),
            block(at(10), 60, Domain::Academic),
            block(at(11), 60, Domain::Life),
            block(at(12), 60, Domain::Life),
        ];
        let alternating = vec![
            block(at(9), 60, Domain::Academic),
            block(at(10), 60, Domain::Life),
            block(at(11), 60, Domain::Academic),
            block(at(12), 60, Domain::Life),
        ];
        let policy = QuotaPolicy::default();
        let grouped_quality = assess(day(), &grouped, &policy);
        let alternating_quality = assess(day(), &alternating, &policy);

        assert!(grouped_quality.switch_cost_total < alternating_quality.switch_cost_total);
        assert!(grouped_quality.efficiency_score > alternating_quality.efficiency_score);
    }

    #[test]
    fn cancelled_blocks_are_ignored() {
        let mut cancelled = block(at(9), 240, Domain::Academic);
        cancelled.status = crate::block::BlockStatus::Cancelled;
        let quality = assess(day(), &[cancelled], &QuotaPolicy::default());
        assert_eq!(quality.domain_distribution[&Domain::Academic], 0);
    }
}
