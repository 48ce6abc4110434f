use std::sync::Arc;

use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crash_panda::chart::TableSpec;

use super::plot::placeholder;

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Tabular panels
// ---------------------------------------------------------------------------

/// Resizable, striped grid with a sticky header.
pub fn data_frame(ui: &mut Ui, spec: Option<Arc<TableSpec>>) {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        placeholder(ui, "No data available");
        return;
    };

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(Column::auto().at_least(60.0), spec.columns.len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for name in &spec.columns {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, spec.rows.len(), |mut row| {
                    let cells = &spec.rows[row.index()];
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });
}

/// Plain grid of every cell.
pub fn plain_table(ui: &mut Ui, spec: Option<Arc<TableSpec>>) {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        placeholder(ui, "No data available");
        return;
    };

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("plain_table")
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    for name in &spec.columns {
                        ui.strong(name);
                    }
                    ui.end_row();
                    for row in &spec.rows {
                        for cell in row {
                            ui.label(cell);
                        }
                        ui.end_row();
                    }
                });
        });
}
