use std::sync::Arc;

use crate::chart::{self, ChartSpec, TableSpec};
use crate::config::{AppConfig, DataOrigin};
use crate::data::loader;
use crate::data::model::{CellValue, Dataset, View};
use crate::data::selection::{Category, FilterSelection};
use crate::data::view::{self, ABBREV, TOTAL};
use crate::reactive::worker::Waker;
use crate::reactive::{Graph, NodeId, NodeState, Worker, fingerprint};
use crate::trend::{self, TrendCurve};

// ---------------------------------------------------------------------------
// Values flowing through the dashboard graph
// ---------------------------------------------------------------------------

/// Everything a node of the dashboard graph can hold. `None` inside a
/// variant is the Empty result ("nothing to render").
#[derive(Debug, Clone)]
pub enum Value {
    Dataset(Arc<Dataset>),
    Selection(FilterSelection),
    View(Option<Arc<View>>),
    Trend(Option<Arc<TrendCurve>>),
    Chart(Option<Arc<ChartSpec>>),
    Table(Arc<TableSpec>),
}

impl Value {
    fn dataset(&self) -> Option<&Dataset> {
        match self {
            Value::Dataset(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    fn selection(&self) -> Option<FilterSelection> {
        match self {
            Value::Selection(s) => Some(*s),
            _ => None,
        }
    }

    fn view(&self) -> Option<&View> {
        match self {
            Value::View(v) => v.as_deref(),
            _ => None,
        }
    }

    fn trend(&self) -> Option<&TrendCurve> {
        match self {
            Value::Trend(t) => t.as_deref(),
            _ => None,
        }
    }

    fn chart(&self) -> Option<&Arc<ChartSpec>> {
        match self {
            Value::Chart(c) => c.as_ref(),
            _ => None,
        }
    }

    fn table(&self) -> Option<&Arc<TableSpec>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

fn view_value(v: Option<View>) -> Value {
    Value::View(v.map(Arc::new))
}

fn trend_value(t: Option<TrendCurve>) -> Value {
    Value::Trend(t.map(Arc::new))
}

fn chart_value(c: Option<ChartSpec>) -> Value {
    Value::Chart(c.map(Arc::new))
}

// ---------------------------------------------------------------------------
// Dashboard nodes
// ---------------------------------------------------------------------------

/// Handles to the nodes of the dashboard graph.
#[derive(Debug, Clone, Copy)]
pub struct Nodes {
    pub dataset: NodeId,
    pub selection: NodeId,
    pub state_totals: NodeId,
    pub speeding_view: NodeId,
    pub alcohol_view: NodeId,
    pub speeding_trend: NodeId,
    pub alcohol_trend: NodeId,
    pub speeding_chart: NodeId,
    pub alcohol_chart: NodeId,
    pub map_chart: NodeId,
    pub data_table: NodeId,
    pub filtered_view: NodeId,
    pub selected_view: NodeId,
    pub selected_trend: NodeId,
    pub selected_chart: NodeId,
    pub filtered_table: NodeId,
}

fn category_trend(category: Category) -> impl Fn(&[Value]) -> Value + Send + Sync + 'static {
    move |deps: &[Value]| {
        trend_value(
            deps[0]
                .view()
                .and_then(|v| trend::fit_view(v, category.column(), TOTAL)),
        )
    }
}

fn category_chart(category: Category) -> impl Fn(&[Value]) -> Value + Send + Sync + 'static {
    move |deps: &[Value]| {
        chart_value(deps[0].view().and_then(|v| {
            chart::scatter(v, category.column(), TOTAL, None, deps[1].trend())
        }))
    }
}

/// Declare the dashboard's sources and derived values.
pub fn build_graph(memo_capacity: usize) -> (Graph<Value>, Nodes) {
    let mut g: Graph<Value> = Graph::new(memo_capacity);

    let dataset = g.source("dataset");
    let selection = g.source("selection");

    let state_totals = g.derived("state_totals", &[dataset], |d| {
        view_value(d[0].dataset().and_then(view::by_state_total))
    });
    let speeding_view = g.derived("speeding_view", &[dataset], |d| {
        view_value(d[0].dataset().and_then(|ds| view::by_category(ds, Category::Speeding)))
    });
    let alcohol_view = g.derived("alcohol_view", &[dataset], |d| {
        view_value(d[0].dataset().and_then(|ds| view::by_category(ds, Category::Alcohol)))
    });
    let speeding_trend =
        g.derived("speeding_trend", &[speeding_view], category_trend(Category::Speeding));
    let alcohol_trend =
        g.derived("alcohol_trend", &[alcohol_view], category_trend(Category::Alcohol));
    let speeding_chart = g.derived(
        "speeding_chart",
        &[speeding_view, speeding_trend],
        category_chart(Category::Speeding),
    );
    let alcohol_chart = g.derived(
        "alcohol_chart",
        &[alcohol_view, alcohol_trend],
        category_chart(Category::Alcohol),
    );
    let map_chart = g.derived("map_chart", &[state_totals], |d| {
        chart_value(d[0].view().and_then(|v| chart::choropleth(v, ABBREV, TOTAL)))
    });
    let data_table = g.derived("data_table", &[dataset], |d| {
        Value::Table(Arc::new(d[0].dataset().map(chart::table).unwrap_or_default()))
    });

    let filtered_view = g.derived("filtered_view", &[dataset, selection], |d| {
        let (Some(ds), Some(sel)) = (d[0].dataset(), d[1].selection()) else {
            return Value::View(None);
        };
        view_value(view::by_range_and_flags(
            ds,
            sel.population,
            sel.speeding_only,
            sel.alcohol_only,
        ))
    });
    let selected_view = g.derived("selected_view", &[filtered_view, selection], |d| {
        let (Some(v), Some(sel)) = (d[0].view(), d[1].selection()) else {
            return Value::View(None);
        };
        view_value(view::by_category(v, sel.category))
    });
    let selected_trend = g.derived("selected_trend", &[selected_view, selection], |d| {
        let (Some(v), Some(sel)) = (d[0].view(), d[1].selection()) else {
            return Value::Trend(None);
        };
        trend_value(trend::fit_view(v, sel.category.column(), TOTAL))
    });
    let selected_chart = g.derived(
        "selected_chart",
        &[filtered_view, selected_trend, selection],
        |d| {
            let (Some(v), Some(sel)) = (d[0].view(), d[2].selection()) else {
                return Value::Chart(None);
            };
            if !v.has_column(sel.category.column()) {
                return Value::Chart(None);
            }
            // Boolean speeding flags split the other categories into two groups.
            let speeding = Category::Speeding.column();
            let color = (sel.category != Category::Speeding && is_flag_column(v, speeding))
                .then_some(speeding);
            chart_value(chart::scatter(
                v,
                sel.category.column(),
                TOTAL,
                color,
                d[1].trend(),
            ))
        },
    );
    let filtered_table = g.derived("filtered_table", &[filtered_view], |d| {
        Value::Table(Arc::new(d[0].view().map(chart::table).unwrap_or_default()))
    });

    let nodes = Nodes {
        dataset,
        selection,
        state_totals,
        speeding_view,
        alcohol_view,
        speeding_trend,
        alcohol_trend,
        speeding_chart,
        alcohol_chart,
        map_chart,
        data_table,
        filtered_view,
        selected_view,
        selected_trend,
        selected_chart,
        filtered_table,
    };
    (g, nodes)
}

/// A column whose non-null cells are all booleans.
fn is_flag_column(view: &View, column: &str) -> bool {
    let Some(idx) = view.column_index(column) else {
        return false;
    };
    let mut cells = view.rows().iter().map(|r| &r[idx]).filter(|c| !c.is_null()).peekable();
    cells.peek().is_some()
        && cells.all(|c| matches!(c, CellValue::Bool(_)))
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// One user session, independent of rendering: the loaded dataset, the
/// current selection and everything derived from them.
pub struct AppState {
    pub origin: DataOrigin,
    pub nodes: Nodes,
    graph: Graph<Value>,
    worker: Option<Worker<Value>>,
    selection: FilterSelection,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Build the graph and load the dataset once (blocking).
    pub fn new(config: &AppConfig, waker: Option<Waker>) -> Self {
        let (graph, nodes) = build_graph(config.memo_capacity);
        let worker = if config.background_recompute {
            match Worker::spawn(waker) {
                Ok(w) => Some(w),
                Err(e) => {
                    log::warn!("Could not start recompute worker, computing inline: {e}");
                    None
                }
            }
        } else {
            None
        };

        let mut state = AppState {
            origin: config.source.clone(),
            nodes,
            graph,
            worker,
            selection: FilterSelection::default(),
            status_message: None,
        };
        let sel = state.selection;
        state
            .graph
            .set(state.nodes.selection, Value::Selection(sel), fingerprint(&sel));
        state.reload();
        state
    }

    /// Load again from the current origin.
    pub fn reload(&mut self) {
        let dataset = loader::load(&self.origin);
        self.set_dataset(dataset);
    }

    /// Switch to a new origin and load it.
    pub fn open(&mut self, origin: DataOrigin) {
        log::info!("Switching data source to {origin}");
        self.origin = origin;
        self.reload();
    }

    /// Ingest a newly loaded dataset.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.status_message = dataset.diagnostic_message().map(|m| format!("Error: {m}"));
        if dataset.columns().is_empty() && self.status_message.is_none() {
            self.status_message = Some(format!("No data found at {}", self.origin));
        }

        // A population range from the previous dataset does not carry over.
        if self.selection.population.is_some() {
            self.selection.population = None;
            let sel = self.selection;
            self.graph
                .set(self.nodes.selection, Value::Selection(sel), fingerprint(&sel));
        }

        let fp = fingerprint(&dataset);
        self.graph
            .set(self.nodes.dataset, Value::Dataset(Arc::new(dataset)), fp);
        self.schedule();
    }

    pub fn selection(&self) -> FilterSelection {
        self.selection
    }

    /// Replace the selection; no-op when nothing changed.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        self.graph.set(
            self.nodes.selection,
            Value::Selection(selection),
            fingerprint(&selection),
        );
        self.schedule();
    }

    /// Hand stale nodes to the worker, or compute them inline.
    fn schedule(&mut self) {
        let Some(plan) = self.graph.plan() else {
            return;
        };
        log::debug!("recomputing {} values", plan.len());
        let plan = match &self.worker {
            Some(worker) => match worker.submit(plan) {
                Ok(()) => return,
                Err(plan) => {
                    log::warn!("Recompute worker is gone, computing inline");
                    self.worker = None;
                    plan
                }
            },
            None => plan,
        };
        self.graph.apply(plan.run());
    }

    /// Apply whatever the worker has finished. Returns true if anything
    /// changed.
    pub fn poll(&mut self) -> bool {
        let Some(worker) = &self.worker else {
            return false;
        };
        let mut changed = false;
        while let Some(outcome) = worker.try_recv() {
            changed |= self.graph.apply(outcome);
        }
        changed
    }

    /// Block until every value is fresh.
    pub fn wait_until_fresh(&mut self) {
        while self.graph.is_busy() {
            let Some(worker) = &self.worker else {
                self.graph.recompute();
                if self.graph.is_busy() {
                    // Nothing left that can be computed.
                    break;
                }
                continue;
            };
            match worker.recv() {
                Some(outcome) => {
                    self.graph.apply(outcome);
                }
                None => self.worker = None,
            }
        }
    }

    pub fn is_recomputing(&self) -> bool {
        self.graph.is_busy()
    }

    pub fn state_of(&self, id: NodeId) -> NodeState {
        self.graph.state(id)
    }

    pub fn memo_hits(&self) -> u64 {
        self.graph.memo_hits()
    }

    // -- Last fresh values --

    pub fn dataset(&self) -> Option<&Dataset> {
        self.graph.get(self.nodes.dataset).and_then(Value::dataset)
    }

    pub fn view(&self, id: NodeId) -> Option<&View> {
        self.graph.get(id).and_then(Value::view)
    }

    pub fn trend(&self, id: NodeId) -> Option<&TrendCurve> {
        self.graph.get(id).and_then(Value::trend)
    }

    pub fn chart(&self, id: NodeId) -> Option<Arc<ChartSpec>> {
        self.graph.get(id).and_then(Value::chart).cloned()
    }

    pub fn table(&self, id: NodeId) -> Option<Arc<TableSpec>> {
        self.graph.get(id).and_then(Value::table).cloned()
    }

    /// Observed (min, max) population, for the range widget.
    pub fn population_extent(&self) -> Option<(f64, f64)> {
        self.dataset()?.numeric_extent(view::POPULATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;

    fn inline_config() -> AppConfig {
        AppConfig {
            source: DataOrigin::File("no/such/file.csv".into()),
            background_recompute: false,
            memo_capacity: 4,
        }
    }

    fn dataset() -> Dataset {
        let s = |v: &str| CellValue::String(v.into());
        let f = CellValue::Float;
        Table::new(
            ["abbrev", "total", "speeding", "alcohol", "population"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec![s("AL"), f(18.8), f(7.3), f(5.6), f(5.0e6)],
                vec![s("AK"), f(18.1), f(7.4), f(4.5), f(0.7e6)],
                vec![s("AZ"), f(18.6), f(6.5), f(5.2), f(7.1e6)],
                vec![s("AL"), f(1.0), f(0.2), f(0.1), f(5.0e6)],
            ],
        )
    }

    #[test]
    fn missing_origin_gives_empty_views() {
        let mut st = AppState::new(&inline_config(), None);
        st.wait_until_fresh();
        assert!(st.dataset().unwrap().is_empty());
        assert!(st.status_message.as_deref().unwrap().starts_with("No data found"));
        assert!(st.chart(st.nodes.map_chart).is_none());
        assert!(st.chart(st.nodes.speeding_chart).is_none());
        assert!(st.table(st.nodes.data_table).unwrap().is_empty());
    }

    #[test]
    fn every_panel_is_derived_from_the_dataset() {
        let mut st = AppState::new(&inline_config(), None);
        st.set_dataset(dataset());
        st.wait_until_fresh();
        assert!(st.status_message.is_none());

        let totals = st.view(st.nodes.state_totals).unwrap();
        assert_eq!(totals.len(), 3);
        assert!(st.trend(st.nodes.speeding_trend).is_some());
        assert!(st.chart(st.nodes.alcohol_chart).is_some());
        let Some(ChartSpec::Choropleth(map)) = st.chart(st.nodes.map_chart).as_deref().cloned()
        else {
            panic!("expected map");
        };
        assert_eq!(map.regions.len(), 3);
        assert_eq!(st.table(st.nodes.data_table).unwrap().rows.len(), 4);
        assert_eq!(st.table(st.nodes.filtered_table).unwrap().rows.len(), 4);
    }

    #[test]
    fn selection_changes_leave_dataset_nodes_alone() {
        let mut st = AppState::new(&inline_config(), None);
        st.set_dataset(dataset());
        st.wait_until_fresh();
        let before = st.chart(st.nodes.speeding_chart).unwrap();

        let sel = FilterSelection {
            category: Category::Alcohol,
            population: Some((1.0e6, 6.0e6)),
            ..st.selection()
        };
        st.set_selection(sel);
        assert_eq!(st.state_of(st.nodes.speeding_chart), NodeState::Fresh);
        st.wait_until_fresh();

        assert!(Arc::ptr_eq(&before, &st.chart(st.nodes.speeding_chart).unwrap()));
        let selected = st.view(st.nodes.selected_view).unwrap();
        assert_eq!(selected.columns(), &["alcohol".to_string(), "total".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn toggling_back_hits_the_memo() {
        let mut st = AppState::new(&inline_config(), None);
        st.set_dataset(dataset());
        st.wait_until_fresh();
        let original = st.selection();

        st.set_selection(FilterSelection {
            category: Category::Alcohol,
            ..original
        });
        st.wait_until_fresh();
        let hits = st.memo_hits();
        st.set_selection(original);
        st.wait_until_fresh();
        assert!(st.memo_hits() > hits);
        let Some(ChartSpec::Scatter(s)) = st.chart(st.nodes.selected_chart).as_deref().cloned()
        else {
            panic!("expected scatter");
        };
        assert_eq!(s.x_label, "Speeding Incidents");
    }

    #[test]
    fn background_worker_converges() {
        let config = AppConfig {
            background_recompute: true,
            ..inline_config()
        };
        let mut st = AppState::new(&config, None);
        st.set_dataset(dataset());
        for category in Category::ALL {
            st.set_selection(FilterSelection {
                category,
                ..st.selection()
            });
        }
        st.wait_until_fresh();
        assert!(!st.is_recomputing());
        assert_eq!(st.selection().category, Category::Distracted);
        assert!(st.chart(st.nodes.selected_chart).is_none());
        assert!(st.chart(st.nodes.speeding_chart).is_some());
    }
}
