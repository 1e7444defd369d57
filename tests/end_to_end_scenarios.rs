//! End-to-end mining scenarios exercised through the library API and the
//! file sinks: known small databases with hand-checked expectations.

use sigpat::{
    Dataset, FileSink, MemorySink, Miner, MinerConfig, MiningMode, PvalueStrategy, UncondTest,
};

fn run_mode(
    transactions: Vec<Vec<u32>>,
    labels: Vec<bool>,
    config: MinerConfig,
) -> (MemorySink, sigpat::MiningSummary) {
    let dataset = Dataset::from_parts(transactions, labels).unwrap();
    let mut sink = MemorySink::default();
    let summary = Miner::new(config).run(&dataset, &mut sink).unwrap();
    (sink, summary)
}

fn emitted_sets(sink: &MemorySink) -> Vec<(Vec<u32>, u64)> {
    let mut out: Vec<(Vec<u32>, u64)> = sink
        .patterns
        .iter()
        .map(|p| (p.items.clone(), p.support))
        .collect();
    out.sort();
    out
}

#[test]
fn test_correlated_pair_is_significant() {
    // Three minority transactions {1 2} against two {3}: the pair is
    // emitted with support 3 and a p-value within the threshold.
    let (sink, summary) = run_mode(
        vec![vec![1, 2], vec![1, 2], vec![1, 2], vec![3], vec![3]],
        vec![true, true, true, false, false],
        MinerConfig::new(2, 0.1, 1.0),
    );
    let pair = sink
        .patterns
        .iter()
        .find(|p| p.items == vec![1, 2])
        .expect("{1,2} must be significant");
    assert_eq!(pair.support, 3);
    assert!(pair.p_lower <= 0.1);
    assert!(summary.significant_patterns as usize == sink.patterns.len());
}

#[test]
fn test_identical_transactions_single_path() {
    // Ten identical transactions: the master tree is a single path, every
    // non-empty subset of {1,2,3} is tested at x = N and comes back with
    // p-value 1, so nothing is significant.
    let mut config = MinerConfig::new(5, 0.5, 1.0);
    config.mode = MiningMode::Frequent;
    let (sink, summary) = run_mode(
        vec![vec![1, 2, 3]; 10],
        vec![true, true, true, true, true, false, false, false, false, false],
        config,
    );
    assert_eq!(summary.tested_patterns, 7);
    assert_eq!(summary.significant_patterns, 0);
    assert!(sink.patterns.is_empty());
}

#[test]
fn test_perfectly_correlated_item_and_cache_hits() {
    // Items 7 and 8 appear in exactly the minority class; the balanced
    // items 1..4 are screened out by the observed-table bound. The three
    // patterns over {7,8} share the contingency table (10, 10): one
    // enumeration, two cache hits, bit-identical p-values.
    let mut transactions: Vec<Vec<u32>> = vec![vec![7, 8]; 10];
    transactions.extend(vec![vec![1, 2]; 5]);
    transactions.extend(vec![vec![3, 4]; 5]);
    let labels: Vec<bool> = (0..20).map(|i| i < 10).collect();

    let mut config = MinerConfig::new(1, 1e-5, 1.0);
    config.mode = MiningMode::Frequent;
    let (sink, summary) = run_mode(transactions, labels, config);

    let sets = emitted_sets(&sink);
    assert_eq!(
        sets,
        vec![
            (vec![7], 10),
            (vec![7, 8], 10),
            (vec![8], 10),
        ]
    );
    assert_eq!(summary.explored_tables, 1, "two of three evaluations hit the cache");
    let bits: Vec<u64> = sink.patterns.iter().map(|p| p.p_lower.to_bits()).collect();
    assert!(bits.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_skewed_item_matches_naive_reference() {
    // One item present in all 40 minority transactions and 60 majority
    // ones out of N = 2000.
    let mut transactions: Vec<Vec<u32>> = Vec::with_capacity(2000);
    let mut labels = Vec::with_capacity(2000);
    for i in 0..2000u32 {
        let minority = i < 40;
        let has_item = i < 100;
        transactions.push(if has_item { vec![7] } else { vec![] });
        labels.push(minority);
    }

    let (sink, _) = run_mode(
        transactions,
        labels,
        MinerConfig::new(50, 1e-6, 1.0),
    );
    assert_eq!(emitted_sets(&sink), vec![(vec![7], 100)]);

    let test = UncondTest::new(2000, 40, 1e-6, 1.0, PvalueStrategy::FastTailed, true).unwrap();
    let fast = test.enumerate_exact(100, 40, PvalueStrategy::FastTailed);
    let naive = test.enumerate_exact(100, 40, PvalueStrategy::Naive);
    assert!(naive <= 1e-6);
    assert!(
        (fast - naive).abs() <= 1e-3 * naive,
        "fast {} vs naive {}",
        fast,
        naive
    );
}

#[test]
fn test_cache_disabled_run_is_identical() {
    let transactions: Vec<Vec<u32>> = (0..30u32)
        .map(|i| if i % 3 == 0 { vec![1, 2] } else { vec![2, 3, 4] })
        .collect();
    let labels: Vec<bool> = (0..30).map(|i| i % 4 == 0).collect();

    let config = MinerConfig::new(2, 0.2, 1.0);
    let (with_cache, _) = run_mode(transactions.clone(), labels.clone(), config.clone());

    let mut no_cache = config;
    no_cache.use_cache = false;
    let (without, _) = run_mode(transactions, labels, no_cache);

    assert_eq!(with_cache.patterns.len(), without.patterns.len());
    for (a, b) in with_cache.patterns.iter().zip(without.patterns.iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_closed_versus_frequent_on_shared_support() {
    // {1 2} x5, {1} x3, {2} x3 at theta = 3: both modes agree here
    // because every subset is itself closed except none.
    let mut transactions = vec![vec![1, 2]; 5];
    transactions.extend(vec![vec![1]; 3]);
    transactions.extend(vec![vec![2]; 3]);
    let labels: Vec<bool> = (0..11).map(|i| i % 2 == 0).collect();

    let mut closed = MinerConfig::new(3, 1.0, 1.0);
    closed.mode = MiningMode::Closed;
    let (closed_sink, _) = run_mode(transactions.clone(), labels.clone(), closed);
    assert_eq!(
        emitted_sets(&closed_sink),
        vec![(vec![1], 8), (vec![1, 2], 5), (vec![2], 8)]
    );

    let mut frequent = MinerConfig::new(3, 1.0, 1.0);
    frequent.mode = MiningMode::Frequent;
    let (frequent_sink, _) = run_mode(transactions, labels, frequent);
    assert_eq!(
        emitted_sets(&frequent_sink),
        vec![(vec![1], 8), (vec![1, 2], 5), (vec![2], 8)]
    );
}

#[test]
fn test_closed_mode_collapses_equal_support_subsets() {
    // Four identical triples: frequent mode emits all seven subsets as
    // duplicates of one support, closed mode only the full triple.
    let transactions = vec![vec![1, 2, 3]; 4];
    let labels = vec![true, false, true, false];

    let mut closed = MinerConfig::new(2, 1.0, 1.0);
    closed.mode = MiningMode::Closed;
    let (closed_sink, _) = run_mode(transactions.clone(), labels.clone(), closed);
    assert_eq!(emitted_sets(&closed_sink), vec![(vec![1, 2, 3], 4)]);

    let mut frequent = MinerConfig::new(2, 1.0, 1.0);
    frequent.mode = MiningMode::Frequent;
    let (frequent_sink, _) = run_mode(transactions, labels, frequent);
    let sets = emitted_sets(&frequent_sink);
    assert_eq!(sets.len(), 7);
    assert!(sets.iter().all(|&(_, support)| support == 4));
}

#[test]
fn test_maximal_mode() {
    let mut transactions = vec![vec![1, 2]; 3];
    transactions.extend(vec![vec![1, 3]; 3]);
    let labels = vec![true, false, true, false, true, false];

    let mut maximal = MinerConfig::new(3, 1.0, 1.0);
    maximal.mode = MiningMode::Maximal;
    let (sink, _) = run_mode(transactions, labels, maximal);
    assert_eq!(
        emitted_sets(&sink),
        vec![(vec![1, 2], 3), (vec![1, 3], 3)]
    );
}

#[test]
fn test_support_below_threshold_is_never_emitted() {
    let transactions = vec![vec![1, 2], vec![1], vec![1], vec![2]];
    let labels = vec![true, false, true, false];
    let mut config = MinerConfig::new(3, 1.0, 1.0);
    config.mode = MiningMode::Frequent;
    let (sink, _) = run_mode(transactions, labels, config);
    // Item 2 has support 2 < 3, so neither {2} nor {1,2} appears.
    assert_eq!(emitted_sets(&sink), vec![(vec![1], 3)]);
}

#[test]
fn test_file_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run").display().to_string();

    let dataset = Dataset::from_parts(
        vec![vec![1, 2], vec![1, 2], vec![1, 2], vec![3], vec![3]],
        vec![true, true, true, false, false],
    )
    .unwrap();
    let mut sink = FileSink::create(&prefix).unwrap();
    let summary = Miner::new(MinerConfig::new(2, 0.1, 1.0))
        .run(&dataset, &mut sink)
        .unwrap();
    sink.finish().unwrap();
    sigpat::write_summary(&prefix, &summary, true).unwrap();

    let significant = std::fs::read_to_string(format!("{}.significant", prefix)).unwrap();
    assert!(significant.lines().any(|l| l == "1 2"));

    let pvalues = std::fs::read_to_string(format!("{}.pvalues", prefix)).unwrap();
    assert_eq!(significant.lines().count(), pvalues.lines().count());
    for line in pvalues.lines() {
        assert_eq!(line.split(',').count(), 6);
    }

    let report = std::fs::read_to_string(format!("{}.summary", prefix)).unwrap();
    assert!(report.contains("Number of significant patterns found"));
    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(format!("{}.summary.json", prefix)).unwrap(),
    )
    .unwrap();
    assert_eq!(
        json["significant_patterns"].as_u64().unwrap(),
        summary.significant_patterns
    );
}
