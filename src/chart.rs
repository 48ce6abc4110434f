use std::collections::BTreeSet;

use serde::Serialize;

use crate::color::{ColorMap, Rgb, viridis};
use crate::data::model::{CellValue, Table, View};
use crate::data::view::ABBREV;
use crate::trend::TrendCurve;

// ---------------------------------------------------------------------------
// Declarative chart descriptions
// ---------------------------------------------------------------------------
//
// Renderers (the egui panels, or anything that reads the JSON form) only
// draw what these say.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Scatter(ScatterSpec),
    Choropleth(ChoroplethSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// One entry per colour group; a single unnamed group without a colour field.
    pub series: Vec<PointSeries>,
    pub overlay: Option<LineOverlay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    pub name: String,
    pub color: Rgb,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOverlay {
    pub name: String,
    pub color: Rgb,
    pub width: f32,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethSpec {
    pub title: String,
    pub region_label: String,
    pub value_label: String,
    /// Observed (min, max) the colour scale is normalised over.
    pub value_range: (f64, f64),
    pub regions: Vec<RegionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValue {
    pub region: String,
    pub value: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, Default, PartialEq, Hash, Serialize)]
pub struct TableSpec {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Axis / legend label for a dataset field.
pub fn field_label(field: &str) -> String {
    match field {
        "speeding" => "Speeding Incidents",
        "alcohol" => "Alcohol-Related Crashes",
        "distracted" => "Distracted Driving",
        "no_previous" => "No Previous Accidents",
        "no_injuries" => "No Injuries",
        "total" => "Total Crashes",
        "abbrev" => "State",
        "population" => "Population",
        other => other,
    }
    .to_string()
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Scatter of `y_field` against `x_field`, optionally grouped by
/// `color_field` and overlaid with a trend curve.
///
/// `None` when the view lacks `x_field` or `y_field`. Rows where either
/// value is non-numeric are left out.
pub fn scatter(
    view: &View,
    x_field: &str,
    y_field: &str,
    color_field: Option<&str>,
    trend: Option<&TrendCurve>,
) -> Option<ChartSpec> {
    let xi = view.column_index(x_field)?;
    let yi = view.column_index(y_field)?;
    let ci = color_field.and_then(|c| view.column_index(c));
    let label_idx = view.column_index(ABBREV);

    let point = |row: &[CellValue]| -> Option<ScatterPoint> {
        Some(ScatterPoint {
            x: row[xi].as_f64()?,
            y: row[yi].as_f64()?,
            label: label_idx.map(|i| row[i].to_string()),
        })
    };

    let series = match (ci, color_field) {
        (Some(ci), Some(color_col)) => {
            let groups: BTreeSet<CellValue> = view.rows().iter().map(|r| r[ci].clone()).collect();
            let colors = ColorMap::new(&groups);
            groups
                .iter()
                .map(|group| PointSeries {
                    name: format!("{} = {group}", field_label(color_col)),
                    color: colors.color_for(group),
                    points: view
                        .rows()
                        .iter()
                        .filter(|r| r[ci] == *group)
                        .filter_map(|r| point(r))
                        .collect(),
                })
                .collect()
        }
        _ => vec![PointSeries {
            name: field_label(y_field),
            color: Rgb::STEEL_BLUE,
            points: view.rows().iter().filter_map(|r| point(r)).collect(),
        }],
    };

    let x_label = field_label(x_field);
    let y_label = field_label(y_field);
    Some(ChartSpec::Scatter(ScatterSpec {
        title: format!("{y_label} vs {x_label}"),
        x_label,
        y_label,
        series,
        overlay: trend.map(|t| LineOverlay {
            name: "Trend Line".to_string(),
            color: Rgb::RED,
            width: 2.0,
            points: t.points.clone(),
        }),
    }))
}

/// Regions coloured by `value_field` on the Viridis scale.
///
/// `None` when either field is missing or no row has a numeric value.
pub fn choropleth(view: &View, region_field: &str, value_field: &str) -> Option<ChartSpec> {
    let ri = view.column_index(region_field)?;
    let vi = view.column_index(value_field)?;

    let values: Vec<(String, f64)> = view
        .rows()
        .iter()
        .filter_map(|r| Some((r[ri].to_string(), r[vi].as_f64()?)))
        .collect();
    let (lo, hi) = values.iter().fold(None, |acc: Option<(f64, f64)>, (_, v)| {
        Some(acc.map_or((*v, *v), |(lo, hi)| (lo.min(*v), hi.max(*v))))
    })?;

    let span = hi - lo;
    let regions = values
        .into_iter()
        .map(|(region, value)| {
            let t = if span > 0.0 { (value - lo) / span } else { 0.5 };
            RegionValue {
                region,
                value,
                color: viridis(t),
            }
        })
        .collect();

    Some(ChartSpec::Choropleth(ChoroplethSpec {
        title: format!("{} by {}", field_label(value_field), field_label(region_field)),
        region_label: field_label(region_field),
        value_label: field_label(value_field),
        value_range: (lo, hi),
        regions,
    }))
}

/// Every cell rendered as text, columns in dataset order.
pub fn table(dataset: &Table) -> TableSpec {
    TableSpec {
        columns: dataset.columns().to_vec(),
        rows: dataset
            .rows()
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::fit;

    fn view() -> View {
        Table::new(
            ["abbrev", "speeding", "total", "flag"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec![
                    CellValue::String("AL".into()),
                    CellValue::Float(7.3),
                    CellValue::Float(18.8),
                    CellValue::Bool(true),
                ],
                vec![
                    CellValue::String("AK".into()),
                    CellValue::Float(7.4),
                    CellValue::Float(18.1),
                    CellValue::Bool(false),
                ],
                vec![
                    CellValue::String("AZ".into()),
                    CellValue::Null,
                    CellValue::Float(18.6),
                    CellValue::Bool(true),
                ],
            ],
        )
    }

    #[test]
    fn scatter_labels_and_overlay() {
        let trend = fit(&[7.3, 7.4], &[18.8, 18.1]);
        let Some(ChartSpec::Scatter(s)) =
            scatter(&view(), "speeding", "total", None, trend.as_ref())
        else {
            panic!("expected scatter");
        };
        assert_eq!(s.title, "Total Crashes vs Speeding Incidents");
        assert_eq!(s.series.len(), 1);
        assert_eq!(s.series[0].points.len(), 2);
        assert_eq!(s.series[0].points[0].label.as_deref(), Some("AL"));
        let overlay = s.overlay.unwrap();
        assert_eq!(overlay.name, "Trend Line");
        assert_eq!(overlay.color, Rgb::RED);
        assert_eq!(overlay.points.len(), 100);
    }

    #[test]
    fn scatter_groups_by_colour_field() {
        let Some(ChartSpec::Scatter(s)) = scatter(&view(), "speeding", "total", Some("flag"), None)
        else {
            panic!("expected scatter");
        };
        assert_eq!(s.series.len(), 2);
        assert_ne!(s.series[0].color, s.series[1].color);
        // false sorts before true; AZ has no speeding value
        assert_eq!(s.series[0].points.len(), 1);
        assert_eq!(s.series[1].points.len(), 1);
        assert!(s.overlay.is_none());
    }

    #[test]
    fn signed_zero_groups_emit_each_point_once() {
        let f = CellValue::Float;
        let t = Table::new(
            vec!["speeding".into(), "total".into(), "bucket".into()],
            vec![
                vec![f(1.0), f(10.0), f(0.0)],
                vec![f(2.0), f(12.0), f(-0.0)],
                vec![f(3.0), f(13.0), f(0.0)],
            ],
        );
        let Some(ChartSpec::Scatter(s)) = scatter(&t, "speeding", "total", Some("bucket"), None)
        else {
            panic!("expected scatter");
        };
        assert_eq!(s.series.len(), 2);
        let emitted: usize = s.series.iter().map(|g| g.points.len()).sum();
        assert_eq!(emitted, 3);
    }

    #[test]
    fn scatter_needs_both_fields() {
        assert!(scatter(&view(), "alcohol", "total", None, None).is_none());
        assert!(scatter(&Table::empty(), "speeding", "total", None, None).is_none());
    }

    #[test]
    fn choropleth_scales_over_observed_range() {
        let Some(ChartSpec::Choropleth(c)) = choropleth(&view(), "abbrev", "total") else {
            panic!("expected choropleth");
        };
        assert_eq!(c.title, "Total Crashes by State");
        assert_eq!(c.value_range, (18.1, 18.8));
        assert_eq!(c.regions.len(), 3);
        assert_eq!(c.regions[0].color, viridis(1.0));
        assert_eq!(c.regions[1].color, viridis(0.0));
        assert!(choropleth(&view(), "abbrev", "alcohol").is_none());
    }

    #[test]
    fn table_renders_every_cell() {
        let t = table(&view());
        assert_eq!(t.columns.len(), 4);
        assert_eq!(t.rows[2], vec!["AZ", "", "18.6", "true"]);
        assert!(table(&Table::empty()).is_empty());
    }

    #[test]
    fn specs_serialize_with_kind_tag() {
        let spec = choropleth(&view(), "abbrev", "total").unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "choropleth");
        assert_eq!(json["regions"][0]["region"], "AL");
    }
}
