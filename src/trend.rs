use serde::Serialize;

use crate::data::model::View;
use crate::error::DashError;

/// Samples in a fitted curve.
pub const TREND_SAMPLES: usize = 100;

// ---------------------------------------------------------------------------
// Linear trend fit
// ---------------------------------------------------------------------------

/// `y = slope * x + intercept`, sampled evenly over the observed x range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendCurve {
    pub slope: f64,
    pub intercept: f64,
    pub points: Vec<[f64; 2]>,
}

/// Degree-1 least-squares fit, or `None` when the fit is degenerate.
pub fn fit(xs: &[f64], ys: &[f64]) -> Option<TrendCurve> {
    match try_fit(xs, ys) {
        Ok(curve) => Some(curve),
        Err(e) => {
            log::debug!("no trend line: {e}");
            None
        }
    }
}

/// Pairs with a non-finite coordinate are dropped before fitting.
pub fn try_fit(xs: &[f64], ys: &[f64]) -> Result<TrendCurve, DashError> {
    if xs.len() != ys.len() {
        return Err(DashError::DegenerateFit {
            reason: "x and y differ in length",
        });
    }

    let mut pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pairs.len() < 2 {
        return Err(DashError::DegenerateFit {
            reason: "fewer than two points",
        });
    }

    // Summation order is fixed by sorting, so any permutation of the same
    // pairs produces the same bits.
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxx, sxy) = pairs.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    let min_x = pairs[0].0;
    let max_x = pairs[pairs.len() - 1].0;
    if min_x == max_x || sxx == 0.0 {
        return Err(DashError::DegenerateFit {
            reason: "all x values are equal",
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let step = (max_x - min_x) / (TREND_SAMPLES - 1) as f64;
    let points = (0..TREND_SAMPLES)
        .map(|i| {
            let x = if i == TREND_SAMPLES - 1 {
                max_x
            } else {
                min_x + step * i as f64
            };
            [x, slope * x + intercept]
        })
        .collect();

    Ok(TrendCurve {
        slope,
        intercept,
        points,
    })
}

/// Fit `y_field` against `x_field` over the numeric cells of a view.
/// Rows where either cell is non-numeric are skipped.
pub fn fit_view(view: &View, x_field: &str, y_field: &str) -> Option<TrendCurve> {
    let xs = view.numeric_column(x_field)?;
    let ys = view.numeric_column(y_field)?;
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .unzip();
    fit(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Table};

    #[test]
    fn two_points_give_exact_line() {
        let c = fit(&[0.0, 2.0], &[0.0, 4.0]).unwrap();
        assert_eq!(c.slope, 2.0);
        assert_eq!(c.intercept, 0.0);
        assert_eq!(c.points.len(), TREND_SAMPLES);
        assert_eq!(c.points[0], [0.0, 0.0]);
        assert_eq!(c.points[TREND_SAMPLES - 1], [2.0, 4.0]);
    }

    #[test]
    fn least_squares_on_noisy_points() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.5, 1.0, 2.5, 2.0];
        let c = fit(&xs, &ys).unwrap();
        assert!((c.slope - 0.3).abs() < 1e-12);
        assert!((c.intercept - 1.3).abs() < 1e-12);
    }

    #[test]
    fn permutation_invariant() {
        let xs = [7.3, 1.1, 4.4, 9.9, 2.2, 5.5];
        let ys = [18.8, 12.1, 15.0, 23.9, 13.3, 16.2];
        let a = fit(&xs, &ys).unwrap();
        let order = [3, 0, 5, 1, 4, 2];
        let px: Vec<f64> = order.iter().map(|&i| xs[i]).collect();
        let py: Vec<f64> = order.iter().map(|&i| ys[i]).collect();
        let b = fit(&px, &py).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn deterministic() {
        let xs = [0.1, 0.7, 0.3];
        let ys = [1.0, 3.0, 2.2];
        assert_eq!(fit(&xs, &ys), fit(&xs, &ys));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(fit(&[], &[]).is_none());
        assert!(fit(&[1.0], &[1.0]).is_none());
        assert!(fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(fit(&[1.0, 2.0], &[1.0]).is_none());
        assert!(fit(&[1.0, f64::NAN], &[1.0, 2.0]).is_none());
        assert!(matches!(
            try_fit(&[3.0, 3.0], &[0.0, 1.0]),
            Err(DashError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn samples_span_observed_range_evenly() {
        let c = fit(&[5.0, -1.0, 2.0], &[0.0, 1.0, 0.5]).unwrap();
        assert_eq!(c.points[0][0], -1.0);
        assert_eq!(c.points[TREND_SAMPLES - 1][0], 5.0);
        let step = c.points[1][0] - c.points[0][0];
        assert!((step - 6.0 / 99.0).abs() < 1e-12);
        for p in &c.points {
            assert_eq!(p[1], c.slope * p[0] + c.intercept);
        }
    }

    #[test]
    fn fit_view_skips_non_numeric_rows() {
        let view = Table::new(
            vec!["speeding".into(), "total".into()],
            vec![
                vec![CellValue::Float(0.0), CellValue::Float(0.0)],
                vec![CellValue::Null, CellValue::Float(100.0)],
                vec![CellValue::Integer(2), CellValue::Integer(4)],
            ],
        );
        let c = fit_view(&view, "speeding", "total").unwrap();
        assert_eq!(c.slope, 2.0);
        assert!(fit_view(&view, "alcohol", "total").is_none());
    }
}
