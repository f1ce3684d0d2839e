//! Property-based tests for the label grammar, the assembler and the
//! calibration engine.

use proptest::prelude::*;

use plate_curves::domain::{AbsorbanceGrid, ModelKind, SecondaryKey, WellRole};
use plate_curves::error::PlateError;
use plate_curves::fit::fit_standards;
use plate_curves::io::{classify_label, parse_layout};
use plate_curves::models::FitModel;
use plate_curves::plate::{BlankSet, StandardSet, assemble};

/// Well labels, including empty (unused) wells anywhere in a row.
fn label_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("jnk".to_string()),
        Just("blk".to_string()),
        (1u32..500).prop_map(|c| format!("std-{c}")),
        ("[A-Z][a-z0-9]{0,5}", 0u32..48).prop_map(|(n, t)| format!("{n}-d{t}")),
        ("[A-Z][a-z0-9]{0,5}", "[a-z]{1,6}", 1u32..10).prop_map(|(n, s, x)| format!("{n}-n{s}_x{x}")),
        "[A-Z][a-z0-9]{0,5}",
    ]
}

proptest! {
    /// `std-<c>` always classifies as a standard at `c`.
    #[test]
    fn prop_standard_token_parses(c in 0.0f64..1e6) {
        let role = classify_label(&format!("std-{c}")).unwrap();
        prop_assert_eq!(role, WellRole::Standard { concentration: c });
    }

    /// A non-numeric standard suffix is always rejected.
    #[test]
    fn prop_bad_standard_suffix_rejected(suffix in "[a-z]{1,6}") {
        let label = format!("std-{suffix}");
        prop_assert!(classify_label(&label).is_err());
    }

    /// Timepoint and dilution survive the sample grammar.
    #[test]
    fn prop_sample_qualifiers(name in "[A-Z][a-zA-Z0-9]{0,8}", t in 0u32..1000, x in 1u32..100) {
        match classify_label(&format!("{name}-d{t}_x{x}")).unwrap() {
            WellRole::Sample(s) => {
                prop_assert_eq!(s.name, name);
                prop_assert_eq!(s.key, SecondaryKey::Timepoint(t as f64));
                prop_assert_eq!(s.dilution, x as f64);
            }
            other => prop_assert!(false, "unexpected role {:?}", other),
        }
    }

    /// The three well sets partition the occupied wells.
    #[test]
    fn prop_assembler_partitions_wells(
        labels in prop::collection::vec(prop::collection::vec(label_strategy(), 4), 1..8)
    ) {
        let text: String = labels.iter().map(|r| format!("{}\n", r.join("\t"))).collect();
        let layout = parse_layout(&text, '\t').unwrap();
        // Rows of only empty labels are blank lines; every other row keeps all four cells.
        let kept = labels.iter().filter(|r| r.iter().any(|l| !l.is_empty())).count();
        prop_assert_eq!(layout.row_count(), kept);
        prop_assert!(layout.rows.iter().all(|r| r.len() == 4));
        let commas = parse_layout(&text.replace('\t', ","), ',').unwrap();
        prop_assert_eq!(&commas, &layout);

        let grid = AbsorbanceGrid {
            rows: (0..kept)
                .map(|r| (0..4).map(|c| (r * 4 + c) as f64 / 100.0).collect())
                .collect(),
        };

        let sets = assemble(&grid, &layout).unwrap();
        let routed = sets.blanks.len() + sets.standards.well_count() + sets.samples.well_count();
        prop_assert_eq!(routed, layout.occupied_count());
        prop_assert_eq!(sets.records.len(), layout.occupied_count());

        // No well appears twice.
        let mut positions: Vec<(usize, usize)> = sets.records.iter().map(|w| (w.row, w.col)).collect();
        positions.sort_unstable();
        positions.dedup();
        prop_assert_eq!(positions.len(), sets.records.len());
    }

    /// Linear calibration is deterministic.
    #[test]
    fn prop_linear_fit_idempotent(
        abs in prop::collection::vec(0.01f64..3.0, 3..10),
        blank in 0.0f64..0.1
    ) {
        let standards: StandardSet = abs
            .iter()
            .enumerate()
            .map(|(i, &a)| ((i + 1) as f64, vec![a]))
            .collect();
        let blanks = BlankSet { replicates: vec![blank] };

        let first = fit_standards(&standards, &blanks, 0, 0, ModelKind::Linear);
        let second = fit_standards(&standards, &blanks, 0, 0, ModelKind::Linear);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a.model, b.model),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "fits disagree"),
        }
    }

    /// Omitting every point is always insufficient.
    #[test]
    fn prop_full_omission_is_insufficient(n in 1usize..10, split in 0usize..10) {
        let standards: StandardSet = (0..n).map(|i| (i as f64 + 1.0, vec![i as f64 / 10.0])).collect();
        let lower = split.min(n);
        let err = fit_standards(&standards, &BlankSet::default(), lower, n - lower, ModelKind::Linear)
            .unwrap_err();
        let is_insufficient = matches!(err, PlateError::InsufficientData { available: 0, .. });
        prop_assert!(is_insufficient);
    }

    /// Linear inverse undoes the forward map.
    #[test]
    fn prop_linear_round_trip(x in -1e3f64..1e3) {
        let m = FitModel::linear(2.0, 3.0);
        let back = m.inverse(3.0 * x + 2.0).unwrap();
        prop_assert!((back - x).abs() < 1e-9);
    }
}
