use std::sync::Arc;

use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};

use crash_panda::chart::{ChartSpec, ScatterSpec};

use super::{color32, map};

// ---------------------------------------------------------------------------
// Scatter plots (central panel)
// ---------------------------------------------------------------------------

/// Render a chart spec, or the "nothing to show" placeholder for Empty.
pub fn chart(ui: &mut Ui, id: &str, spec: Option<Arc<ChartSpec>>) {
    match spec.as_deref() {
        Some(ChartSpec::Scatter(s)) => scatter(ui, id, s),
        Some(ChartSpec::Choropleth(_)) => map::choropleth(ui, spec.clone()),
        None => placeholder(ui, "No plot available"),
    }
}

pub fn placeholder(ui: &mut Ui, text: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(text);
    });
}

fn scatter(ui: &mut Ui, id: &str, spec: &ScatterSpec) {
    ui.heading(&spec.title);

    Plot::new(format!("scatter_{id}"))
        .legend(Legend::default())
        .x_axis_label(&spec.x_label)
        .y_axis_label(&spec.y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for series in &spec.series {
                let points: PlotPoints = series.points.iter().map(|p| [p.x, p.y]).collect();
                plot_ui.points(
                    Points::new(points)
                        .name(&series.name)
                        .color(color32(series.color))
                        .radius(4.0),
                );
            }

            if let Some(overlay) = &spec.overlay {
                let points: PlotPoints = overlay.points.iter().copied().collect();
                plot_ui.line(
                    Line::new(points)
                        .name(&overlay.name)
                        .color(color32(overlay.color))
                        .width(overlay.width),
                );
            }
        });
}
