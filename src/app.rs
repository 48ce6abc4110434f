use eframe::egui;

use crash_panda::reactive::worker::Waker;
use crash_panda::{AppConfig, AppState};

use crate::ui::{map, panels, plot, table};

/// Tabs of the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    DataFrame,
    Table,
    Speeding,
    Alcohol,
    Selected,
    Filtered,
    Map,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::DataFrame,
        Panel::Table,
        Panel::Speeding,
        Panel::Alcohol,
        Panel::Selected,
        Panel::Filtered,
        Panel::Map,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Panel::DataFrame => "Data frame",
            Panel::Table => "Table",
            Panel::Speeding => "Total Crashes vs Speeding",
            Panel::Alcohol => "Alcohol vs Total Crashes",
            Panel::Selected => "Selected Category",
            Panel::Filtered => "Filtered Rows",
            Panel::Map => "Total Crashes by State (Map)",
        }
    }
}

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CrashPandaApp {
    pub state: AppState,
    pub panel: Panel,
}

impl CrashPandaApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &AppConfig) -> Self {
        let ctx = cc.egui_ctx.clone();
        let waker: Waker = Box::new(move || ctx.request_repaint());
        Self {
            state: AppState::new(config, Some(waker)),
            panel: Panel::DataFrame,
        }
    }
}

impl eframe::App for CrashPandaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: tabs ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::tab_bar(ui, &mut self.panel);
            ui.separator();

            let nodes = self.state.nodes;
            match self.panel {
                Panel::DataFrame => table::data_frame(ui, self.state.table(nodes.data_table)),
                Panel::Table => table::plain_table(ui, self.state.table(nodes.data_table)),
                Panel::Speeding => plot::chart(ui, "speeding", self.state.chart(nodes.speeding_chart)),
                Panel::Alcohol => plot::chart(ui, "alcohol", self.state.chart(nodes.alcohol_chart)),
                Panel::Selected => plot::chart(ui, "selected", self.state.chart(nodes.selected_chart)),
                Panel::Filtered => table::data_frame(ui, self.state.table(nodes.filtered_table)),
                Panel::Map => map::choropleth(ui, self.state.chart(nodes.map_chart)),
            }
        });

        if self.state.is_recomputing() {
            ctx.request_repaint();
        }
    }
}
