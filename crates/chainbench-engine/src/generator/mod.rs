//! Sweep expansion.
//!
//! Expands a `SweepRequest` into concrete scenarios via a deterministic
//! 5-way cartesian product (data size x chunk size x chain count x allocator
//! x transmitter). For a chain count `n` the target set is always the first
//! `n` entries of the sorted selected-chain list, so different counts yield
//! nested prefixes rather than an n-choose-k explosion.

use crate::error::GenerateError;
use crate::types::{ChainId, ChainSelection, Scenario, ScenarioStatus, SweepRequest};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Expand a sweep request into scenarios, all starting at `Pending`.
///
/// `seq_start` is the session-monotonic sequence the first scenario's
/// uniqueId is minted from; the caller advances its counter by the number of
/// scenarios returned.
pub fn generate(request: &SweepRequest, seq_start: u64) -> Result<Vec<Scenario>, GenerateError> {
    if request.allocators.is_empty() {
        return Err(GenerateError::NoAllocators);
    }
    if request.transmitters.is_empty() {
        return Err(GenerateError::NoTransmitters);
    }
    if request.selected_chains.is_empty() {
        return Err(GenerateError::NoChainsSelected);
    }

    let data_sizes = request.data_size_mb.expand();
    let chunk_sizes = request.chunk_size_kb.expand();

    let mut chains = request.selected_chains.clone();
    chains.sort_by(|a, b| numeric_lex_cmp(&a.0, &b.0));

    let counts = chain_counts(request.chain_selection, chains.len());

    let project = sanitize_project_name(&request.project);
    let minted_at = chrono::Utc::now().timestamp_millis();

    let mut scenarios = Vec::new();
    for &data_size_mb in &data_sizes {
        for &chunk_size_kb in &chunk_sizes {
            for &count in &counts {
                if count == 0 {
                    continue;
                }
                for &allocator in &request.allocators {
                    for &transmitter in &request.transmitters {
                        let id = scenarios.len() as u64 + 1;
                        let seq = seq_start + scenarios.len() as u64;
                        scenarios.push(Scenario {
                            id,
                            unique_id: format!("{project}-{minted_at}-{seq}"),
                            user_id: request.user_id.clone(),
                            data_size_mb,
                            chunk_size_kb,
                            allocator,
                            transmitter,
                            target_chain_ids: chains[..count].to_vec(),
                            cost: Decimal::ZERO,
                            status: ScenarioStatus::Pending,
                            fail_reason: None,
                            logs: Vec::new(),
                        });
                    }
                }
            }
        }
    }

    Ok(scenarios)
}

/// Chain counts for the sweep.
///
/// `Fixed` uses the whole selected set. `Range` keeps every stepped value
/// that fits `0 < i <= selected`, falling back to `[1]` when the range
/// yields nothing usable.
pub fn chain_counts(selection: ChainSelection, selected: usize) -> Vec<usize> {
    match selection {
        ChainSelection::Fixed => vec![selected],
        ChainSelection::Range { start, end, step } => {
            if step == 0 {
                return vec![1];
            }
            let mut counts = Vec::new();
            let mut i = start;
            while i <= end {
                if i > 0 && i as usize <= selected {
                    counts.push(i as usize);
                }
                match i.checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
            if counts.is_empty() {
                counts.push(1);
            }
            counts
        }
    }
}

/// Numeric-aware lexicographic comparison, so `chain-2` sorts before
/// `chain-10`. Digit runs compare as integers, everything else byte-wise.
pub fn numeric_lex_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let ia = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let jb = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let na = &a[ia..i];
            let nb = &b[jb..j];
            // Strip leading zeros so lengths compare magnitudes.
            let na = &na[na.iter().take_while(|&&c| c == b'0').count()..];
            let nb = &nb[nb.iter().take_while(|&&c| c == b'0').count()..];
            match na.len().cmp(&nb.len()).then_with(|| na.cmp(nb)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        } else {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            }
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

/// Lowercases and keeps `[a-z0-9-]`, collapsing anything else to `-`.
/// The result feeds into uniqueIds, which double as external/UI keys.
pub fn sanitize_project_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("sweep");
    }
    out
}

pub fn sort_chains(mut chains: Vec<ChainId>) -> Vec<ChainId> {
    chains.sort_by(|a, b| numeric_lex_cmp(&a.0, &b.0));
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AllocatorStrategy, TransmitterStrategy, UserId, ValueRange};
    use proptest::prelude::*;

    fn chains(ids: &[&str]) -> Vec<ChainId> {
        ids.iter().map(|c| ChainId::new(*c)).collect()
    }

    fn request() -> SweepRequest {
        SweepRequest {
            project: "Load Test".to_string(),
            user_id: UserId::new("operator-1"),
            data_size_mb: ValueRange::Fixed(500),
            chunk_size_kb: ValueRange::Fixed(64),
            allocators: vec![AllocatorStrategy::Static],
            transmitters: vec![TransmitterStrategy::OneByOne],
            chain_selection: ChainSelection::Fixed,
            selected_chains: chains(&["chain-1", "chain-2", "chain-3"]),
        }
    }

    #[test]
    fn single_combination_targets_all_chains() {
        let scenarios = generate(&request(), 0).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].target_chain_ids.len(), 3);
        assert_eq!(scenarios[0].status, ScenarioStatus::Pending);
        assert_eq!(scenarios[0].cost, Decimal::ZERO);
        assert!(scenarios[0].logs.is_empty());
    }

    #[test]
    fn cardinality_is_full_product() {
        let mut req = request();
        req.data_size_mb = ValueRange::Range { start: 100, end: 500, step: 200 };
        req.chunk_size_kb = ValueRange::Range { start: 32, end: 64, step: 32 };
        req.allocators = AllocatorStrategy::ALL.to_vec();
        req.transmitters = TransmitterStrategy::ALL.to_vec();
        req.chain_selection = ChainSelection::Range { start: 1, end: 3, step: 1 };

        let scenarios = generate(&req, 0).unwrap();
        // |D|=3, |C|=2, |N|=3, |A|=5, |T|=2
        assert_eq!(scenarios.len(), 3 * 2 * 3 * 5 * 2);

        let mut ids: Vec<_> = scenarios.iter().map(|s| s.unique_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), scenarios.len(), "uniqueIds must be distinct");
    }

    #[test]
    fn chain_counts_produce_nested_prefixes() {
        let mut req = request();
        req.chain_selection = ChainSelection::Range { start: 1, end: 3, step: 1 };
        let scenarios = generate(&req, 0).unwrap();
        assert_eq!(scenarios.len(), 3);

        let mut by_len: Vec<_> = scenarios.iter().map(|s| &s.target_chain_ids).collect();
        by_len.sort_by_key(|c| c.len());
        for pair in by_len.windows(2) {
            assert!(pair[1].starts_with(pair[0]), "shorter set must be a prefix");
        }
    }

    #[test]
    fn chains_sort_numerically() {
        let sorted = sort_chains(chains(&["chain-10", "chain-2", "chain-1"]));
        assert_eq!(sorted, chains(&["chain-1", "chain-2", "chain-10"]));
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut req = request();
        req.allocators = vec![AllocatorStrategy::Static, AllocatorStrategy::Random];
        let scenarios = generate(&req, 0).unwrap();
        let ids: Vec<_> = scenarios.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn empty_selections_are_errors() {
        let mut req = request();
        req.allocators.clear();
        assert_eq!(generate(&req, 0), Err(GenerateError::NoAllocators));

        let mut req = request();
        req.transmitters.clear();
        assert_eq!(generate(&req, 0), Err(GenerateError::NoTransmitters));

        let mut req = request();
        req.selected_chains.clear();
        assert_eq!(generate(&req, 0), Err(GenerateError::NoChainsSelected));
    }

    #[test]
    fn range_count_filters_to_selected_size() {
        let counts = chain_counts(ChainSelection::Range { start: 2, end: 10, step: 2 }, 5);
        assert_eq!(counts, vec![2, 4]);
    }

    #[test]
    fn unusable_count_range_falls_back_to_one() {
        let counts = chain_counts(ChainSelection::Range { start: 7, end: 9, step: 1 }, 3);
        assert_eq!(counts, vec![1]);
        let counts = chain_counts(ChainSelection::Range { start: 1, end: 3, step: 0 }, 3);
        assert_eq!(counts, vec![1]);
    }

    #[test]
    fn count_range_at_integer_ceiling_stops_instead_of_overflowing() {
        let counts = chain_counts(
            ChainSelection::Range { start: u64::MAX, end: u64::MAX, step: 1 },
            3,
        );
        assert_eq!(counts, vec![1], "nothing usable at the ceiling, fallback applies");
    }

    #[test]
    fn project_name_sanitized_for_unique_ids() {
        assert_eq!(sanitize_project_name("Load Test #3"), "load-test-3");
        assert_eq!(sanitize_project_name("***"), "sweep");
        let scenarios = generate(&request(), 7).unwrap();
        assert!(scenarios[0].unique_id.starts_with("load-test-"));
        assert!(scenarios[0].unique_id.ends_with("-7"));
    }

    proptest! {
        #[test]
        fn cardinality_matches_axis_product(
            d_start in 1u64..50, d_n in 1u64..4,
            c_start in 1u64..50, c_n in 1u64..4,
            n_chains in 1usize..6,
        ) {
            let req = SweepRequest {
                project: "prop".to_string(),
                user_id: UserId::new("u"),
                data_size_mb: ValueRange::Range {
                    start: d_start, end: d_start + (d_n - 1) * 10, step: 10,
                },
                chunk_size_kb: ValueRange::Range {
                    start: c_start, end: c_start + (c_n - 1) * 8, step: 8,
                },
                allocators: AllocatorStrategy::ALL.to_vec(),
                transmitters: TransmitterStrategy::ALL.to_vec(),
                chain_selection: ChainSelection::Range {
                    start: 1, end: n_chains as u64, step: 1,
                },
                selected_chains: (0..n_chains)
                    .map(|i| ChainId::new(format!("chain-{i}")))
                    .collect(),
            };
            let scenarios = generate(&req, 0).unwrap();
            let expected = d_n as usize * c_n as usize * n_chains * 5 * 2;
            prop_assert_eq!(scenarios.len(), expected);
        }
    }
}
