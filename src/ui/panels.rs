use eframe::egui::{self, Color32, RichText, Ui};

use crash_panda::data::selection::Category;
use crash_panda::{AppState, DataOrigin};

use crate::app::Panel;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel. Edits a copy of the selection and hands it
/// back to the state only when something changed.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters and Options");
    ui.separator();

    let mut sel = state.selection();

    ui.strong("Category");
    egui::ComboBox::from_id_salt("category")
        .selected_text(sel.category.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for category in Category::ALL {
                ui.selectable_value(&mut sel.category, category, category.to_string());
            }
        });
    ui.separator();

    ui.strong("Population");
    match state.population_extent() {
        Some((min, max)) => {
            let (mut lo, mut hi) = sel.population.unwrap_or((min, max));
            let speed = ((max - min) / 200.0).max(1.0);
            ui.horizontal(|ui: &mut Ui| {
                ui.label("min");
                ui.add(egui::DragValue::new(&mut lo).range(min..=hi).speed(speed));
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("max");
                ui.add(egui::DragValue::new(&mut hi).range(lo..=max).speed(speed));
            });
            if ui.small_button("Full range").clicked() {
                (lo, hi) = (min, max);
            }
            sel.population = if lo <= min && hi >= max {
                None
            } else {
                Some((lo, hi))
            };
        }
        None => {
            ui.label(RichText::new("no population column").weak());
        }
    }
    ui.separator();

    ui.checkbox(&mut sel.speeding_only, "Speeding only");
    ui.checkbox(&mut sel.alcohol_only, "Alcohol only");

    state.set_selection(sel);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = state.dataset() {
            let filtered = state
                .view(state.nodes.filtered_view)
                .map_or(0, |v| v.len());
            ui.label(format!(
                "{} rows loaded, {} after filters  ·  {}",
                ds.len(),
                filtered,
                state.origin
            ));
        }

        if state.is_recomputing() {
            ui.separator();
            ui.spinner();
            ui.label("recomputing…");
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Tab strip for the central panel.
pub fn tab_bar(ui: &mut Ui, current: &mut Panel) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for panel in Panel::ALL {
            ui.selectable_value(current, panel, panel.title());
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open crash data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(DataOrigin::File(path));
    }
}
