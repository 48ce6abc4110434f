use std::collections::BTreeMap;

use crate::error::DashError;

use super::model::{CellValue, Dataset, View};
use super::selection::Category;

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------
//
// The public functions return `None` for "Empty": a required column is
// missing (or the dataset is empty where that matters). Callers render
// nothing for `None`. The `try_*` forms carry the reason.

pub const ABBREV: &str = "abbrev";
pub const TOTAL: &str = "total";
pub const POPULATION: &str = "population";

fn require(dataset: &Dataset, column: &str) -> Result<usize, DashError> {
    dataset
        .column_index(column)
        .ok_or_else(|| DashError::missing(column))
}

fn recover(name: &str, result: Result<View, DashError>) -> Option<View> {
    match result {
        Ok(view) => Some(view),
        Err(e) => {
            log::debug!("{name}: empty view ({e})");
            None
        }
    }
}

/// One row per state with the summed `total`, sorted by abbreviation.
pub fn by_state_total(dataset: &Dataset) -> Option<View> {
    recover("by_state_total", try_by_state_total(dataset))
}

pub fn try_by_state_total(dataset: &Dataset) -> Result<View, DashError> {
    let abbrev = require(dataset, ABBREV)?;
    let total = require(dataset, TOTAL)?;

    // Nulls and non-numeric totals contribute nothing, as a dataframe sum skips NaN.
    let mut sums: BTreeMap<CellValue, f64> = BTreeMap::new();
    for row in dataset.rows() {
        let entry = sums.entry(row[abbrev].clone()).or_insert(0.0);
        if let Some(v) = row[total].as_f64() {
            *entry += v;
        }
    }

    let rows = sums
        .into_iter()
        .map(|(state, sum)| vec![state, CellValue::Float(sum)])
        .collect();
    Ok(View::new(vec![ABBREV.to_string(), TOTAL.to_string()], rows))
}

/// The two columns `{category, total}`.
pub fn by_category(dataset: &Dataset, category: Category) -> Option<View> {
    recover("by_category", try_by_category(dataset, category))
}

pub fn try_by_category(dataset: &Dataset, category: Category) -> Result<View, DashError> {
    if dataset.is_empty() {
        return Err(DashError::missing(category.column()));
    }
    dataset
        .select(&[category.column(), TOTAL])
        .ok_or_else(|| {
            let absent = if dataset.has_column(category.column()) {
                TOTAL
            } else {
                category.column()
            };
            DashError::missing(absent)
        })
}

/// Rows whose `population` is within the inclusive range, then restricted
/// to rows where each set flag's column equals true.
///
/// `population = None` is the full extent. With no flags and a full-extent
/// range the dataset comes back unfiltered, whatever its population cells
/// hold.
pub fn by_range_and_flags(
    dataset: &Dataset,
    population: Option<(f64, f64)>,
    speeding_only: bool,
    alcohol_only: bool,
) -> Option<View> {
    recover(
        "by_range_and_flags",
        try_by_range_and_flags(dataset, population, speeding_only, alcohol_only),
    )
}

pub fn try_by_range_and_flags(
    dataset: &Dataset,
    population: Option<(f64, f64)>,
    speeding_only: bool,
    alcohol_only: bool,
) -> Result<View, DashError> {
    let range = match population {
        Some((lo, hi)) => {
            let idx = require(dataset, POPULATION)?;
            let full = dataset
                .numeric_extent(POPULATION)
                .is_some_and(|(min, max)| lo <= min && hi >= max);
            (!full).then_some((idx, lo, hi))
        }
        None => None,
    };

    let mut flags = Vec::new();
    if speeding_only {
        flags.push(require(dataset, Category::Speeding.column())?);
    }
    if alcohol_only {
        flags.push(require(dataset, Category::Alcohol.column())?);
    }

    if range.is_none() && flags.is_empty() {
        return Ok(dataset.clone());
    }

    Ok(dataset.filter_rows(|row| {
        let in_range = match range {
            Some((idx, lo, hi)) => row[idx].as_f64().is_some_and(|p| p >= lo && p <= hi),
            None => true,
        };
        in_range && flags.iter().all(|&f| row[f].is_true())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn f(v: f64) -> CellValue {
        CellValue::Float(v)
    }

    fn crashes() -> Dataset {
        Table::new(
            vec!["abbrev".into(), "total".into()],
            vec![
                vec![s("AL"), f(10.0)],
                vec![s("AL"), f(5.0)],
                vec![s("GA"), f(3.0)],
            ],
        )
    }

    fn flagged() -> Dataset {
        Table::new(
            ["abbrev", "total", "speeding", "alcohol", "population"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec![s("AL"), f(18.8), CellValue::Bool(true), CellValue::Bool(false), f(5.0e6)],
                vec![s("AK"), f(18.1), CellValue::Bool(false), CellValue::Bool(true), f(0.7e6)],
                vec![s("AZ"), f(18.6), CellValue::Bool(true), CellValue::Bool(true), f(7.1e6)],
                vec![s("CA"), f(12.0), CellValue::Bool(false), CellValue::Bool(false), CellValue::Null],
            ],
        )
    }

    #[test]
    fn state_totals_sum_duplicates() {
        let view = by_state_total(&crashes()).unwrap();
        assert_eq!(
            view.rows(),
            &[vec![s("AL"), f(15.0)], vec![s("GA"), f(3.0)]]
        );
    }

    #[test]
    fn state_totals_need_abbrev_and_total() {
        let no_total = crashes().select(&["abbrev"]).unwrap();
        let no_abbrev = crashes().select(&["total"]).unwrap();
        assert!(by_state_total(&no_total).is_none());
        assert!(by_state_total(&no_abbrev).is_none());
        assert!(by_state_total(&Table::empty()).is_none());
        assert!(matches!(
            try_by_state_total(&no_total),
            Err(DashError::MissingColumn { column }) if column == "total"
        ));
    }

    #[test]
    fn category_view_selects_two_columns() {
        let view = by_category(&flagged(), Category::Alcohol).unwrap();
        assert_eq!(view.columns(), &["alcohol".to_string(), "total".to_string()]);
        assert_eq!(view.len(), 4);
        assert!(by_category(&flagged(), Category::Distracted).is_none());
        assert!(by_category(&Table::empty(), Category::Speeding).is_none());
    }

    #[test]
    fn full_extent_without_flags_is_unfiltered() {
        let ds = flagged();
        assert_eq!(by_range_and_flags(&ds, None, false, false).unwrap(), ds);
        let wide = Some((0.0, 1.0e9));
        assert_eq!(by_range_and_flags(&ds, wide, false, false).unwrap(), ds);
    }

    #[test]
    fn range_is_inclusive_and_skips_null_population() {
        let view = by_range_and_flags(&flagged(), Some((0.7e6, 5.0e6)), false, false).unwrap();
        let states: Vec<_> = (0..view.len())
            .map(|i| view.cell(i, "abbrev").unwrap().to_string())
            .collect();
        assert_eq!(states, vec!["AL", "AK"]);
    }

    #[test]
    fn flags_intersect() {
        let ds = flagged();
        assert_eq!(by_range_and_flags(&ds, None, true, false).unwrap().len(), 2);
        assert_eq!(by_range_and_flags(&ds, None, false, true).unwrap().len(), 2);
        let both = by_range_and_flags(&ds, None, true, true).unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both.cell(0, "abbrev"), Some(&s("AZ")));
    }

    #[test]
    fn zero_range_with_no_match_is_an_empty_view() {
        let view = by_range_and_flags(&flagged(), Some((0.0, 0.0)), false, false).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.columns(), flagged().columns());
    }

    #[test]
    fn missing_flag_column_is_empty() {
        assert!(by_range_and_flags(&crashes(), None, true, false).is_none());
        assert!(by_range_and_flags(&crashes(), Some((0.0, 1.0)), false, false).is_none());
    }
}
