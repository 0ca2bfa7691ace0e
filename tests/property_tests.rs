//! Property-based tests for hydro-sweep
//!
//! - Test naming invariants (artifact names, run directory patterns)
//! - Test data integrity of consolidation
//! - Run with ProptestConfig::with_cases(100)

use arrow::array::{Array, Float64Array};
use chrono::{Duration, NaiveDate};
use glob::Pattern;
use hydro_sweep::experiment::{ModelVariant, RunConfig};
use hydro_sweep::locate::run_dir_pattern;
use hydro_sweep::results::{consolidate, StationResults, StationSeries};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 10, 1).unwrap()
}

/// Discharge value, sometimes missing
fn arb_discharge() -> impl Strategy<Value = Option<f64>> {
    prop::option::weighted(0.9, 0.0f64..5000.0)
}

/// Series over `days` consecutive days starting `offset` days after the base date
fn arb_series(offset: i64, days: usize) -> impl Strategy<Value = StationSeries> {
    (
        prop::collection::vec(arb_discharge(), days),
        prop::collection::vec(arb_discharge(), days),
    )
        .prop_map(move |(qobs, qsim)| {
            let dates = (0..days)
                .map(|i| base_date() + Duration::days(offset + i as i64))
                .collect();
            StationSeries::new(dates, qobs, qsim).unwrap()
        })
}

/// Station ids drawn from a small pool so repeats happen
fn arb_station_id() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["01013500", "01022500", "01030500", "02011400", "14400000"])
        .prop_map(str::to_string)
}

/// Stations sharing one time index
fn arb_aligned_results() -> impl Strategy<Value = StationResults> {
    (1usize..40).prop_flat_map(|days| {
        prop::collection::vec((arb_station_id(), arb_series(0, days)), 1..8)
            .prop_map(|stations| stations.into_iter().collect::<StationResults>())
    })
}

/// Stations with their own windows
fn arb_ragged_results() -> impl Strategy<Value = StationResults> {
    prop::collection::vec(
        (arb_station_id(), (0i64..20, 1usize..20))
            .prop_flat_map(|(id, (offset, days))| (Just(id), arb_series(offset, days))),
        1..6,
    )
    .prop_map(|stations| stations.into_iter().collect::<StationResults>())
}

fn column_values(array: &Float64Array) -> Vec<Option<f64>> {
    array.iter().collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Artifact Naming Properties
    // ========================================================================

    /// Property: no_static wins over concat_static
    #[test]
    fn prop_no_static_selects_lstm_no_static(seed in any::<u64>(), concat_static in any::<bool>()) {
        let config = RunConfig::new(seed, true, concat_static);
        prop_assert_eq!(config.variant(), ModelVariant::LstmNoStatic);
        prop_assert_eq!(config.artifact_file_name(), format!("lstm_no_static_seed{seed}.p"));
    }

    /// Property: with static inputs, concat_static picks lstm over ealstm
    #[test]
    fn prop_static_variants(seed in any::<u64>(), concat_static in any::<bool>()) {
        let name = RunConfig::new(seed, false, concat_static).artifact_file_name();
        let expected = if concat_static {
            format!("lstm_seed{seed}.p")
        } else {
            format!("ealstm_seed{seed}.p")
        };
        prop_assert_eq!(name, expected);
    }

    /// Property: run directory pattern matches its own seed only
    #[test]
    fn prop_pattern_matches_own_seed(
        seed in 0u64..100_000,
        stamp in "[0-9]{4}_[0-9]{4}",
        ealstm in any::<bool>()
    ) {
        let model = if ealstm { "ealstm" } else { "lstm" };
        let pattern = Pattern::new(&run_dir_pattern(model, seed)).unwrap();

        let own = format!("run_{model}_{stamp}_seed{seed}");
        let longer_seed = format!("run_{model}_{stamp}_seed{seed}0");
        prop_assert!(pattern.matches(&own));
        prop_assert!(!pattern.matches(&longer_seed));
    }

    // ========================================================================
    // Consolidation Properties
    // ========================================================================

    /// Property: one column per station, in mapping order, after the date column
    #[test]
    fn prop_columns_follow_mapping(results in arb_aligned_results()) {
        let tables = consolidate(&results).unwrap();

        let expected: Vec<String> = results.station_ids().iter().map(ToString::to_string).collect();
        prop_assert_eq!(tables.station_ids(), expected);
        prop_assert_eq!(tables.qobs().num_columns(), results.len() + 1);
        prop_assert_eq!(tables.qobs().schema(), tables.qsim().schema());
    }

    /// Property: with a shared index, columns equal the station series verbatim
    #[test]
    fn prop_aligned_values_preserved(results in arb_aligned_results()) {
        let tables = consolidate(&results).unwrap();
        let (_, first) = results.iter().next().unwrap();
        prop_assert_eq!(tables.dates(), first.dates().to_vec());

        for (i, (_, series)) in results.iter().enumerate() {
            let qobs = tables.qobs().column(i + 1).as_any().downcast_ref::<Float64Array>().unwrap();
            let qsim = tables.qsim().column(i + 1).as_any().downcast_ref::<Float64Array>().unwrap();
            prop_assert_eq!(column_values(qobs), series.qobs().to_vec());
            prop_assert_eq!(column_values(qsim), series.qsim().to_vec());
        }
    }

    /// Property: ragged indices are outer-aligned on the sorted union of dates
    #[test]
    fn prop_ragged_outer_aligned(results in arb_ragged_results()) {
        let tables = consolidate(&results).unwrap();

        let union: Vec<NaiveDate> = results
            .iter()
            .flat_map(|(_, series)| series.dates().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let dates = tables.dates();
        prop_assert_eq!(&dates, &union);

        for (i, (_, series)) in results.iter().enumerate() {
            let qobs = tables.qobs().column(i + 1).as_any().downcast_ref::<Float64Array>().unwrap();
            prop_assert_eq!(qobs.len(), dates.len());
            for (row, date) in dates.iter().enumerate() {
                let expected = series
                    .dates()
                    .iter()
                    .position(|d| d == date)
                    .and_then(|j| series.qobs()[j]);
                prop_assert_eq!(qobs.is_valid(row).then(|| qobs.value(row)), expected);
            }
        }
    }
}
