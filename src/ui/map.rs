use std::sync::Arc;

use eframe::egui::{Align2, Color32, FontId, Rect, Sense, Ui, pos2, vec2};

use crash_panda::chart::{ChartSpec, ChoroplethSpec};
use crash_panda::color::{Rgb, viridis};

use super::color32;
use super::plot::placeholder;

/// Tile-grid layout of the states: (abbreviation, column, row).
const STATE_TILES: [(&str, u8, u8); 51] = [
    ("AK", 0, 0), ("ME", 11, 0),
    ("VT", 10, 1), ("NH", 11, 1),
    ("WA", 1, 2), ("ID", 2, 2), ("MT", 3, 2), ("ND", 4, 2), ("MN", 5, 2), ("IL", 6, 2),
    ("WI", 7, 2), ("MI", 8, 2), ("NY", 9, 2), ("RI", 10, 2), ("MA", 11, 2),
    ("OR", 1, 3), ("NV", 2, 3), ("WY", 3, 3), ("SD", 4, 3), ("IA", 5, 3), ("IN", 6, 3),
    ("OH", 7, 3), ("PA", 8, 3), ("NJ", 9, 3), ("CT", 10, 3),
    ("CA", 1, 4), ("UT", 2, 4), ("CO", 3, 4), ("NE", 4, 4), ("MO", 5, 4), ("KY", 6, 4),
    ("WV", 7, 4), ("VA", 8, 4), ("MD", 9, 4), ("DE", 10, 4),
    ("AZ", 2, 5), ("NM", 3, 5), ("KS", 4, 5), ("AR", 5, 5), ("TN", 6, 5), ("NC", 7, 5),
    ("SC", 8, 5), ("DC", 9, 5),
    ("OK", 4, 6), ("LA", 5, 6), ("MS", 6, 6), ("AL", 7, 6), ("GA", 8, 6),
    ("HI", 0, 7), ("TX", 4, 7), ("FL", 9, 7),
];

const GRID_COLS: f32 = 12.0;
const GRID_ROWS: f32 = 8.0;

// ---------------------------------------------------------------------------
// Choropleth (tile-grid map)
// ---------------------------------------------------------------------------

pub fn choropleth(ui: &mut Ui, spec: Option<Arc<ChartSpec>>) {
    match spec.as_deref() {
        Some(ChartSpec::Choropleth(c)) => tile_map(ui, c),
        _ => placeholder(ui, "No map available"),
    }
}

fn tile_map(ui: &mut Ui, spec: &ChoroplethSpec) {
    ui.heading(&spec.title);

    let available = ui.available_size() - vec2(0.0, 40.0);
    let tile = (available.x / GRID_COLS).min(available.y / GRID_ROWS).max(16.0);
    let (response, painter) =
        ui.allocate_painter(vec2(tile * GRID_COLS, tile * GRID_ROWS), Sense::hover());
    let origin = response.rect.min;
    let hover = response.hover_pos();

    let mut hovered = None;
    for (abbrev, col, row) in STATE_TILES {
        let min = origin + vec2(col as f32 * tile, row as f32 * tile);
        let rect = Rect::from_min_size(min, vec2(tile, tile)).shrink(1.5);
        let region = spec.regions.iter().find(|r| r.region == abbrev);

        let fill = region.map_or(Color32::from_gray(60), |r| color32(r.color));
        painter.rect_filled(rect, 2.0, fill);

        let text_color = if region.is_some_and(|r| luminance(r.color) > 140.0) {
            Color32::BLACK
        } else {
            Color32::WHITE
        };
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            abbrev,
            FontId::proportional((tile * 0.3).clamp(9.0, 16.0)),
            text_color,
        );

        if hover.is_some_and(|p| rect.contains(p)) {
            hovered = Some((abbrev, region.map(|r| r.value)));
        }
    }

    legend(ui, spec);

    if let Some((abbrev, value)) = hovered {
        let text = match value {
            Some(v) => format!("{abbrev}: {} = {v:.1}", spec.value_label),
            None => format!("{abbrev}: no data"),
        };
        response.on_hover_text(text);
    }
}

fn legend(ui: &mut Ui, spec: &ChoroplethSpec) {
    let (lo, hi) = spec.value_range;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{} {lo:.1}", spec.value_label));
        let (rect, _) = ui.allocate_exact_size(vec2(200.0, 12.0), Sense::hover());
        let steps = 40;
        let w = rect.width() / steps as f32;
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            let min = pos2(rect.min.x + i as f32 * w, rect.min.y);
            let r = Rect::from_min_size(min, vec2(w, rect.height()));
            ui.painter().rect_filled(r, 0.0, color32(viridis(t)));
        }
        ui.label(format!("{hi:.1}"));
    });
}

fn luminance(c: Rgb) -> f32 {
    0.299 * c.0 as f32 + 0.587 * c.1 as f32 + 0.114 * c.2 as f32
}
