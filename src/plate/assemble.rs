//! Pair the absorbance grid with the layout and bucket wells by role.

use crate::domain::{AbsorbanceGrid, LayoutGrid, WellRecord, WellRole};
use crate::error::{PlateError, Result};
use crate::plate::{BlankSet, Replicate, SampleSet, StandardSet};

/// Wells of one plate, split by role.
#[derive(Debug, Clone, Default)]
pub struct PlateSets {
    /// Every occupied well, row-major.
    pub records: Vec<WellRecord>,
    pub blanks: BlankSet,
    pub standards: StandardSet,
    pub samples: SampleSet,
}

/// Zip `grid` with `layout` and route each occupied well to exactly one set.
///
/// Ignored wells are dropped. Replicates accumulate in row-major order.
pub fn assemble(grid: &AbsorbanceGrid, layout: &LayoutGrid) -> Result<PlateSets> {
    check_shape(grid, layout)?;

    let mut sets = PlateSets::default();

    for (row, (values, cells)) in grid.rows.iter().zip(&layout.rows).enumerate() {
        for (col, (&absorbance, cell)) in values.iter().zip(cells).enumerate() {
            match &cell.role {
                WellRole::Ignored => continue,
                WellRole::Blank => sets.blanks.replicates.push(absorbance),
                WellRole::Standard { concentration } => {
                    sets.standards.insert(*concentration, absorbance)
                }
                WellRole::Sample(label) => sets.samples.insert(
                    &label.name,
                    label.key.clone(),
                    Replicate {
                        absorbance,
                        dilution: label.dilution,
                    },
                ),
            }
            sets.records.push(WellRecord {
                row,
                col,
                absorbance,
                role: cell.role.clone(),
            });
        }
    }

    log::debug!(
        "assembled {} wells: {} blank, {} standard, {} sample",
        sets.records.len(),
        sets.blanks.len(),
        sets.standards.well_count(),
        sets.samples.well_count()
    );

    Ok(sets)
}

fn check_shape(grid: &AbsorbanceGrid, layout: &LayoutGrid) -> Result<()> {
    let export_rows = grid.row_count();
    let layout_rows = layout.row_count();
    if export_rows != layout_rows {
        return Err(PlateError::ShapeMismatch {
            export_rows,
            layout_rows,
            row: None,
            export_cols: grid.rows.first().map_or(0, Vec::len),
            layout_cols: layout.rows.first().map_or(0, Vec::len),
        });
    }

    for (idx, (values, cells)) in grid.rows.iter().zip(&layout.rows).enumerate() {
        if values.len() != cells.len() {
            return Err(PlateError::ShapeMismatch {
                export_rows,
                layout_rows,
                row: Some(idx + 1),
                export_cols: values.len(),
                layout_cols: cells.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SecondaryKey;
    use crate::io::ingest::parse_export;
    use crate::io::layout::parse_layout;

    fn grid(rows: &[&[f64]]) -> AbsorbanceGrid {
        AbsorbanceGrid {
            rows: rows.iter().map(|r| r.to_vec()).collect(),
        }
    }

    #[test]
    fn routes_each_well_to_one_set() {
        let layout = parse_layout(
            "blk\tstd-1\tstd-2\tAb1-d1\n\
             blk\tstd-1\tstd-2\tAb1-d1\n\
             jnk\t\tAb2-nwash_x2\tAb1-d2\n",
            '\t',
        )
        .unwrap();
        let values = grid(&[
            &[0.05, 0.15, 0.25, 0.40],
            &[0.07, 0.17, 0.27, 0.42],
            &[9.99, 9.99, 0.33, 0.50],
        ]);

        let sets = assemble(&values, &layout).unwrap();
        assert_eq!(sets.blanks.replicates, vec![0.05, 0.07]);
        assert_eq!(sets.standards.get(1.0), Some(&[0.15, 0.17][..]));
        assert_eq!(sets.standards.get(2.0), Some(&[0.25, 0.27][..]));

        let ab1 = sets.samples.get("Ab1", &SecondaryKey::Timepoint(1.0)).unwrap();
        assert_eq!(ab1.len(), 2);
        assert_eq!(ab1[0].absorbance, 0.40);

        let ab2 = sets
            .samples
            .get("Ab2", &SecondaryKey::Subname("wash".into()))
            .unwrap();
        assert_eq!(ab2[0].dilution, 2.0);

        // 12 wells, two ignored.
        assert_eq!(sets.records.len(), 10);
        assert_eq!(
            sets.blanks.len() + sets.standards.well_count() + sets.samples.well_count(),
            sets.records.len()
        );
    }

    #[test]
    fn unused_leading_well_keeps_labels_aligned() {
        let values = parse_export("\t22.0\t0.5\t0.2\t0.05\t\t\n", '\t').unwrap();
        let layout = parse_layout("\tAb1-d1\tblk\n", '\t').unwrap();

        let sets = assemble(&values, &layout).unwrap();
        assert_eq!(sets.blanks.replicates, vec![0.05]);
        let ab1 = sets.samples.get("Ab1", &SecondaryKey::Timepoint(1.0)).unwrap();
        assert_eq!(ab1[0].absorbance, 0.2);
        assert_eq!(sets.records.len(), 2);
        assert_eq!(sets.records[0].col, 1);
    }

    #[test]
    fn row_count_mismatch() {
        let layout = parse_layout("blk\tblk\n", '\t').unwrap();
        let err = assemble(&grid(&[&[0.1, 0.1], &[0.2, 0.2]]), &layout).unwrap_err();
        assert!(matches!(
            err,
            PlateError::ShapeMismatch { export_rows: 2, layout_rows: 1, row: None, .. }
        ));
    }

    #[test]
    fn column_count_mismatch_names_row() {
        let layout = parse_layout("blk\tblk\nblk\tblk\n", '\t').unwrap();
        let err = assemble(&grid(&[&[0.1, 0.1], &[0.2]]), &layout).unwrap_err();
        assert!(matches!(
            err,
            PlateError::ShapeMismatch { row: Some(2), export_cols: 1, layout_cols: 2, .. }
        ));
    }
}
