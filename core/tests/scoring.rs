use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rfma_core::{
    config::ScoreWeights,
    record::{AggregatedRecord, ScoredRecord},
    scorer::{Metric, Scorer},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Reproducible synthetic population; integer-valued spend keeps ties common.
fn population(seed: u64, n: usize) -> Vec<AggregatedRecord> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    (0..n)
        .map(|i| AggregatedRecord {
            patient_id:      format!("P{i:04}"),
            recency_days:    rng.gen_range(0..365),
            order_count:     rng.gen_range(1..60),
            total_spent:     f64::from(rng.gen_range(10u32..5_000)),
            adherence_score: rng.gen_range(1.0..5.0),
        })
        .collect()
}

fn default_scorer() -> Scorer {
    Scorer::new(5, ScoreWeights::default())
}

fn assert_monotonic<F, S>(scored: &[ScoredRecord], raw: F, score: S, inverted: bool, metric: &str)
where
    F: Fn(&ScoredRecord) -> f64,
    S: Fn(&ScoredRecord) -> u32,
{
    for a in scored {
        for b in scored {
            let (ra, rb) = (raw(a), raw(b));
            let better = if inverted { ra < rb } else { ra > rb };
            if better {
                assert!(
                    score(a) >= score(b),
                    "{metric}: {} ({ra}) scored {} below {} ({rb}) scored {}",
                    a.patient_id, score(a), b.patient_id, score(b)
                );
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every ordinal score lies in [1, bins] for several seeds and bin counts.
#[test]
fn scores_stay_within_configured_bins() {
    for (seed, bins) in [(1u64, 5u32), (7, 3), (42, 10), (99, 2)] {
        let scorer = Scorer::new(bins, ScoreWeights::default());
        let scored = scorer.score(population(seed, 150)).unwrap();

        for s in &scored {
            for (axis, value) in [("R", s.r_score), ("F", s.f_score), ("M", s.m_score), ("A", s.a_score)] {
                assert!(
                    (1..=bins).contains(&value),
                    "seed {seed}: {axis}_score={value} outside [1, {bins}] for {}",
                    s.patient_id
                );
            }
        }
    }
}

/// Higher spend, orders and adherence never score lower; fewer recency days
/// never score lower.
#[test]
fn scores_are_monotonic_in_raw_metrics() {
    let scored = default_scorer().score(population(2024, 120)).unwrap();

    assert_monotonic(&scored, |r| r.total_spent, |r| r.m_score, false, "monetary");
    assert_monotonic(&scored, |r| r.order_count as f64, |r| r.f_score, false, "frequency");
    assert_monotonic(&scored, |r| r.adherence_score, |r| r.a_score, false, "adherence");
    assert_monotonic(&scored, |r| r.recency_days as f64, |r| r.r_score, true, "recency");
}

/// The composite is exactly the weighted sum of the ordinal scores.
#[test]
fn composite_is_weighted_sum_of_scores() {
    let weights = ScoreWeights { recency: 0.1, frequency: 0.3, monetary: 0.25, adherence: 0.35 };
    let scorer = Scorer::new(5, weights.clone());
    let scored = scorer.score(population(5, 60)).unwrap();

    for s in &scored {
        let expected = f64::from(s.r_score) * weights.recency
            + f64::from(s.f_score) * weights.frequency
            + f64::from(s.m_score) * weights.monetary
            + f64::from(s.a_score) * weights.adherence;
        assert_eq!(s.rfma_score.to_bits(), expected.to_bits(), "{}", s.patient_id);
    }
}

/// Weights need not sum to one; the scorer applies them as given.
#[test]
fn weights_are_not_normalised() {
    let scorer = Scorer::new(5, ScoreWeights { recency: 1.0, frequency: 1.0, monetary: 1.0, adherence: 1.0 });
    assert_eq!(scorer.composite(5, 5, 5, 5), 20.0);
    assert_eq!(scorer.composite(1, 2, 3, 4), 10.0);
}

/// The most recent patient gets the top recency score, the oldest the bottom.
#[test]
fn recency_is_inverted() {
    let records = population(11, 50);
    let newest = records.iter().min_by_key(|r| r.recency_days).unwrap().patient_id.clone();
    let oldest = records.iter().max_by_key(|r| r.recency_days).unwrap().patient_id.clone();

    let scored = default_scorer().score(records).unwrap();
    let find = |id: &str| scored.iter().find(|s| s.patient_id == id).unwrap();

    assert_eq!(find(newest.as_str()).r_score, 5);
    assert_eq!(find(oldest.as_str()).r_score, 1);
}

/// The boundary population from the model notes: tied minimum spend yields
/// fewer than five distinct M scores and does not fail.
#[test]
fn tied_spend_collapses_monetary_scores() {
    let spend = [100.0, 100.0, 100.0, 100.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0];
    let records: Vec<AggregatedRecord> = spend
        .iter()
        .enumerate()
        .map(|(i, s)| AggregatedRecord {
            patient_id:      format!("P{i:04}"),
            recency_days:    i as i64,
            order_count:     i as u64 + 1,
            total_spent:     *s,
            adherence_score: i as f64 * 0.5,
        })
        .collect();

    let m_scores = default_scorer().score_metric(Metric::Monetary, &records).unwrap();

    let mut distinct = m_scores.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert!(distinct.len() < 5, "Expected collapse, got {distinct:?}");
    assert!(m_scores[..5].iter().all(|m| *m == 1), "Tied minimum spenders: {m_scores:?}");
}

/// A metric with no variance fails the whole scoring pass.
#[test]
fn constant_metric_fails_scoring() {
    let mut records = population(3, 20);
    for r in &mut records {
        r.adherence_score = 4.0;
    }

    let err = default_scorer().score(records).unwrap_err();
    assert!(err.is_data_error());
    assert!(err.to_string().contains("adherence_score"));
}
