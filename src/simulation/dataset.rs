//! Synthetic dataset generation.
//!
//! Produces a shuffled transaction batch mixing background P2P noise,
//! legitimate traps (payroll fan-out, merchant fan-in) and planted fraud
//! (high-value cycles, rapid fan-out smurfing), plus the ground truth
//! needed to grade detection output. Generation is deterministic under a
//! fixed seed.

use crate::core::account::AccountId;
use crate::core::ring::round2;
use crate::core::transaction::{Transaction, TransactionId, TransactionTable};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Configuration for generating a synthetic batch.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Target number of transactions in the final batch.
    pub transaction_count: usize,
    /// Size of the account pool to draw from.
    pub account_pool: usize,
    /// Accounts behaving like payroll senders (legitimate fan-out).
    pub payroll_accounts: usize,
    /// Accounts behaving like merchants (legitimate fan-in).
    pub merchant_accounts: usize,
    /// Planted high-value cycles of 3–5 hops.
    pub cycle_rings: usize,
    /// Planted rapid fan-out rings.
    pub fan_out_rings: usize,
    /// First day of the simulated period.
    pub start: DateTime<Utc>,
    /// RNG seed; the same seed reproduces the same batch.
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            transaction_count: 10_000,
            account_pool: 5_000,
            payroll_accounts: 20,
            merchant_accounts: 30,
            cycle_rings: 25,
            fan_out_rings: 15,
            start: NaiveDate::from_ymd_opt(2026, 2, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .unwrap_or_default(),
            seed: 42,
        }
    }
}

/// A ring that was deliberately planted in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct PlantedRing {
    pub pattern: String,
    pub members: Vec<AccountId>,
}

/// The answer key for a generated batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundTruth {
    pub rings: Vec<PlantedRing>,
    pub payroll_accounts: Vec<AccountId>,
    pub merchant_accounts: Vec<AccountId>,
}

/// Generate a shuffled batch plus its answer key.
pub fn generate_dataset(config: &DatasetConfig) -> (TransactionTable, GroundTruth) {
    let mut rng = StdRng::seed_from_u64(config.seed);

    // Anonymous-looking pool, shuffled so behavior groups are not
    // contiguous id ranges.
    let mut pool: Vec<AccountId> = (0..config.account_pool)
        .map(|i| AccountId::new(format!("ACC_{:05}", 10_000 + i)))
        .collect();
    pool.shuffle(&mut rng);

    let regular_count = config.account_pool * 4 / 5;
    let (regular, rest) = pool.split_at(regular_count.min(pool.len()));
    let (payroll, rest) = rest.split_at(config.payroll_accounts.min(rest.len()));
    let (merchants, mules) = rest.split_at(config.merchant_accounts.min(rest.len()));

    let mut truth = GroundTruth {
        rings: Vec::new(),
        payroll_accounts: payroll.to_vec(),
        merchant_accounts: merchants.to_vec(),
    };

    let mut txns: Vec<Transaction> = Vec::with_capacity(config.transaction_count);
    let mut counter = 0usize;
    let mut add_tx = |txns: &mut Vec<Transaction>,
                      sender: &AccountId,
                      receiver: &AccountId,
                      amount: f64,
                      at: DateTime<Utc>| {
        counter += 1;
        txns.push(Transaction::new(
            TransactionId::new(format!("TX_{:07}", counter)),
            sender.clone(),
            receiver.clone(),
            round2(amount),
            at,
        ));
    };

    let start = config.start;
    let mut random_date = |rng: &mut StdRng| {
        start + Duration::days(rng.gen_range(0..21)) + Duration::minutes(rng.gen_range(0..1441))
    };

    // Innocent noise: regular P2P transfers.
    let noise_target = config.transaction_count * 7 / 10;
    for _ in 0..noise_target {
        if regular.len() < 2 {
            break;
        }
        let s = rng.gen_range(0..regular.len());
        let mut r = rng.gen_range(0..regular.len());
        while r == s {
            r = rng.gen_range(0..regular.len());
        }
        let amount = rng.gen_range(10.0..5000.0);
        let at = random_date(&mut rng);
        add_tx(&mut txns, &regular[s], &regular[r], amount, at);
    }

    // Trap: payroll senders pay 20–50 employees on the 1st or the 15th.
    for sender in payroll {
        let pay_day = start + Duration::days(*[0, 14].choose(&mut rng).unwrap_or(&0));
        for _ in 0..rng.gen_range(20..=50) {
            if regular.is_empty() {
                break;
            }
            let employee = &regular[rng.gen_range(0..regular.len())];
            let amount = rng.gen_range(3000.0..8000.0);
            let at = pay_day + Duration::minutes(rng.gen_range(0..121));
            add_tx(&mut txns, sender, employee, amount, at);
        }
    }

    // Trap: merchants collect many small payments scattered over time.
    for merchant in merchants {
        for _ in 0..rng.gen_range(30..=80) {
            if regular.is_empty() {
                break;
            }
            let customer = &regular[rng.gen_range(0..regular.len())];
            let amount = rng.gen_range(15.0..300.0);
            let at = random_date(&mut rng);
            add_tx(&mut txns, customer, merchant, amount, at);
        }
    }

    // Planted fraud: high-value cycles closing in rapid succession,
    // with a small fee dropped at each hop.
    let mut mule_cursor = 0usize;
    for _ in 0..config.cycle_rings {
        let length = rng.gen_range(3..=5);
        if mule_cursor + length > mules.len() {
            break;
        }
        let ring: Vec<AccountId> = mules[mule_cursor..mule_cursor + length].to_vec();
        mule_cursor += length;

        let mut amount = rng.gen_range(25_000.0..150_000.0);
        let base = random_date(&mut rng);
        for j in 0..length {
            let sender = &ring[j];
            let receiver = &ring[(j + 1) % length];
            let at = base + Duration::minutes(30 * j as i64);
            add_tx(&mut txns, sender, receiver, amount, at);
            amount *= rng.gen_range(0.95..0.99);
        }

        truth.rings.push(PlantedRing {
            pattern: "cycle".to_string(),
            members: ring,
        });
    }

    // Planted fraud: rapid fan-out smurfing, minutes apart.
    for _ in 0..config.fan_out_rings {
        let receivers = rng.gen_range(15..=25);
        if mule_cursor + 1 + receivers > mules.len() {
            break;
        }
        let distributor = &mules[mule_cursor];
        mule_cursor += 1;
        let base = random_date(&mut rng);

        let mut members = vec![distributor.clone()];
        for j in 0..receivers {
            let receiver = &mules[mule_cursor];
            mule_cursor += 1;
            let amount = rng.gen_range(8000.0..9500.0);
            let at = base + Duration::minutes(5 * j as i64);
            add_tx(&mut txns, distributor, receiver, amount, at);
            members.push(receiver.clone());
        }

        truth.rings.push(PlantedRing {
            pattern: "fan_out".to_string(),
            members,
        });
    }

    // Fill the remainder with noise, then shuffle so planted patterns
    // are not sequential blocks.
    while txns.len() < config.transaction_count && regular.len() >= 2 {
        let s = rng.gen_range(0..regular.len());
        let mut r = rng.gen_range(0..regular.len());
        while r == s {
            r = rng.gen_range(0..regular.len());
        }
        let amount = rng.gen_range(10.0..5000.0);
        let at = random_date(&mut rng);
        add_tx(&mut txns, &regular[s], &regular[r], amount, at);
    }
    txns.shuffle(&mut rng);
    txns.truncate(config.transaction_count);

    (txns.into_iter().collect(), truth)
}
