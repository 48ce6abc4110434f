use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Node bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Lifecycle of a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Stale,
    Computing,
    Fresh,
}

/// Pure function from the dependencies' values (in declaration order) to
/// this node's value.
pub type ComputeFn<V> = Arc<dyn Fn(&[V]) -> V + Send + Sync>;

enum NodeKind<V> {
    Source,
    Derived { deps: Vec<NodeId>, compute: ComputeFn<V> },
}

struct Node<V> {
    name: &'static str,
    kind: NodeKind<V>,
    state: NodeState,
    /// Last fresh value; kept while the node is stale or computing.
    value: Option<V>,
    fingerprint: Option<u64>,
}

/// Content hash used to key sources in the memo.
pub fn fingerprint<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut h = DefaultHasher::new();
    value.hash(&mut h);
    h.finish()
}

fn derived_fingerprint(node: NodeId, deps: &[u64]) -> u64 {
    fingerprint(&(node.0, deps))
}

// ---------------------------------------------------------------------------
// Memo: (node, input fingerprint) → value
// ---------------------------------------------------------------------------

/// Per-node memo of recent results, shared with the worker thread.
pub struct Memo<V> {
    capacity: usize,
    entries: HashMap<NodeId, VecDeque<(u64, V)>>,
    hits: u64,
}

impl<V: Clone> Memo<V> {
    fn new(capacity: usize) -> Self {
        Memo {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            hits: 0,
        }
    }

    pub fn get(&mut self, node: NodeId, fp: u64) -> Option<V> {
        let found = self
            .entries
            .get(&node)?
            .iter()
            .find(|(f, _)| *f == fp)
            .map(|(_, v)| v.clone());
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, node: NodeId, fp: u64, value: V) {
        let slot = self.entries.entry(node).or_default();
        if slot.iter().any(|(f, _)| *f == fp) {
            return;
        }
        if slot.len() == self.capacity {
            slot.pop_front();
        }
        slot.push_back((fp, value));
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

pub type SharedMemo<V> = Arc<Mutex<Memo<V>>>;

pub(crate) fn lock<V>(memo: &SharedMemo<V>) -> MutexGuard<'_, Memo<V>> {
    memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Plan / Outcome – a recomputation detached from the graph
// ---------------------------------------------------------------------------

struct Step<V> {
    node: NodeId,
    name: &'static str,
    fingerprint: u64,
    deps: Vec<NodeId>,
    compute: ComputeFn<V>,
}

/// Everything needed to bring the non-fresh nodes of one generation up to
/// date, runnable on any thread.
pub struct Plan<V> {
    pub generation: u64,
    inputs: HashMap<NodeId, V>,
    steps: Vec<Step<V>>,
    memo: SharedMemo<V>,
}

impl<V> fmt::Debug for Plan<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("generation", &self.generation)
            .field("steps", &self.steps.iter().map(|s| s.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Results of a [`Plan`], applied back with [`Graph::apply`].
#[derive(Debug)]
pub struct Outcome<V> {
    pub generation: u64,
    pub values: Vec<(NodeId, u64, V)>,
}

impl<V: Clone> Plan<V> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Compute each step in dependency order. A result another plan already
    /// produced for the same inputs is reused instead of recomputed.
    pub fn run(self) -> Outcome<V> {
        let Plan {
            generation,
            mut inputs,
            steps,
            memo,
        } = self;

        let mut values = Vec::with_capacity(steps.len());
        for step in steps {
            let cached = lock(&memo).get(step.node, step.fingerprint);
            let value = match cached {
                Some(v) => {
                    log::debug!("{}: memo hit", step.name);
                    v
                }
                None => {
                    let args: Vec<V> = step
                        .deps
                        .iter()
                        .filter_map(|d| inputs.get(d).cloned())
                        .collect();
                    let v = (step.compute)(&args);
                    lock(&memo).insert(step.node, step.fingerprint, v.clone());
                    v
                }
            };
            inputs.insert(step.node, value.clone());
            values.push((step.node, step.fingerprint, value));
        }

        Outcome { generation, values }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// An explicit dependency graph of sources and derived values.
///
/// A node may only depend on nodes declared before it, so declaration order
/// is a topological order. Setting a source marks every transitive
/// dependent stale and starts a new generation; [`Graph::plan`] hands the
/// stale nodes out for recomputation, and [`Graph::apply`] accepts results
/// only from the current generation. Reads always return the last fresh
/// value.
pub struct Graph<V> {
    nodes: Vec<Node<V>>,
    dependents: Vec<Vec<NodeId>>,
    generation: u64,
    planned: Option<u64>,
    memo: SharedMemo<V>,
}

impl<V: Clone> Graph<V> {
    pub fn new(memo_capacity: usize) -> Self {
        Graph {
            nodes: Vec::new(),
            dependents: Vec::new(),
            generation: 0,
            planned: None,
            memo: Arc::new(Mutex::new(Memo::new(memo_capacity))),
        }
    }

    fn push(&mut self, name: &'static str, kind: NodeKind<V>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            kind,
            state: NodeState::Stale,
            value: None,
            fingerprint: None,
        });
        self.dependents.push(Vec::new());
        id
    }

    /// Declare an input. It stays stale until first [`Graph::set`].
    pub fn source(&mut self, name: &'static str) -> NodeId {
        self.push(name, NodeKind::Source)
    }

    /// Declare a value computed from `deps`.
    ///
    /// # Panics
    /// If a dependency is not an already-declared node.
    pub fn derived<F>(&mut self, name: &'static str, deps: &[NodeId], compute: F) -> NodeId
    where
        F: Fn(&[V]) -> V + Send + Sync + 'static,
    {
        let next = self.nodes.len();
        assert!(
            deps.iter().all(|d| d.0 < next),
            "{name}: dependencies must be declared first"
        );
        let id = self.push(
            name,
            NodeKind::Derived {
                deps: deps.to_vec(),
                compute: Arc::new(compute),
            },
        );
        for d in deps {
            self.dependents[d.0].push(id);
        }
        id
    }

    /// Replace a source's value. `fingerprint` identifies its content for the
    /// memo; equal fingerprints mean equal values.
    pub fn set(&mut self, id: NodeId, value: V, fingerprint: u64) {
        let node = &mut self.nodes[id.0];
        debug_assert!(matches!(node.kind, NodeKind::Source), "{} is not a source", node.name);
        node.value = Some(value);
        node.fingerprint = Some(fingerprint);
        node.state = NodeState::Fresh;

        self.generation += 1;
        let mut queue: VecDeque<NodeId> = self.dependents[id.0].iter().copied().collect();
        while let Some(n) = queue.pop_front() {
            if self.nodes[n.0].state != NodeState::Stale {
                self.nodes[n.0].state = NodeState::Stale;
            }
            queue.extend(self.dependents[n.0].iter().copied());
        }
    }

    /// Last fresh value of a node, whatever its current state.
    pub fn get(&self, id: NodeId) -> Option<&V> {
        self.nodes[id.0].value.as_ref()
    }

    pub fn state(&self, id: NodeId) -> NodeState {
        self.nodes[id.0].state
    }

    /// Whether any node is waiting for a result.
    pub fn is_busy(&self) -> bool {
        self.nodes.iter().any(|n| n.state != NodeState::Fresh)
    }

    pub fn memo_hits(&self) -> u64 {
        lock(&self.memo).hits()
    }

    /// Collect every non-fresh derived node whose sources are all set, in
    /// topological order, and mark them computing.
    ///
    /// Nodes whose inputs hit the memo are resolved on the spot. Returns
    /// `None` when this generation was already planned or nothing is left to
    /// compute.
    pub fn plan(&mut self) -> Option<Plan<V>> {
        if self.planned == Some(self.generation) {
            return None;
        }
        self.planned = Some(self.generation);

        let mut inputs: HashMap<NodeId, V> = HashMap::new();
        let mut fps: HashMap<NodeId, u64> = HashMap::new();
        let mut steps = Vec::new();
        let mut memo = lock(&self.memo);

        for idx in 0..self.nodes.len() {
            let id = NodeId(idx);
            let node = &self.nodes[idx];
            let NodeKind::Derived { deps, compute } = &node.kind else {
                continue;
            };

            if node.state == NodeState::Fresh {
                if let (Some(v), Some(fp)) = (&node.value, node.fingerprint) {
                    inputs.insert(id, v.clone());
                    fps.insert(id, fp);
                }
                continue;
            }

            // Dependencies' fingerprints: fresh nodes carry one, nodes planned
            // earlier in this pass got one in `fps`.
            let dep_fps: Option<Vec<u64>> = deps
                .iter()
                .map(|d| {
                    fps.get(d).copied().or_else(|| {
                        let dn = &self.nodes[d.0];
                        (dn.state == NodeState::Fresh).then_some(dn.fingerprint).flatten()
                    })
                })
                .collect();
            let Some(dep_fps) = dep_fps else {
                // An upstream source has never been set.
                continue;
            };
            for d in deps {
                if !inputs.contains_key(d) {
                    if let Some(v) = &self.nodes[d.0].value {
                        inputs.insert(*d, v.clone());
                    }
                }
            }

            let fp = derived_fingerprint(id, &dep_fps);
            fps.insert(id, fp);

            if let Some(v) = memo.get(id, fp) {
                log::debug!("{}: memo hit while planning", node.name);
                inputs.insert(id, v.clone());
                let node = &mut self.nodes[idx];
                node.value = Some(v);
                node.fingerprint = Some(fp);
                node.state = NodeState::Fresh;
                continue;
            }

            steps.push(Step {
                node: id,
                name: node.name,
                fingerprint: fp,
                deps: deps.clone(),
                compute: Arc::clone(compute),
            });
            self.nodes[idx].state = NodeState::Computing;
        }
        drop(memo);

        if steps.is_empty() {
            return None;
        }
        let plan = Plan {
            generation: self.generation,
            inputs,
            steps,
            memo: Arc::clone(&self.memo),
        };
        log::debug!("planned {plan:?}");
        Some(plan)
    }

    /// Apply a finished plan. Results from an older generation are dropped
    /// (a newer input superseded them) and `false` is returned.
    pub fn apply(&mut self, outcome: Outcome<V>) -> bool {
        if outcome.generation != self.generation {
            log::debug!(
                "discarding results of generation {} (current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }
        for (id, fp, value) in outcome.values {
            let node = &mut self.nodes[id.0];
            node.value = Some(value);
            node.fingerprint = Some(fp);
            node.state = NodeState::Fresh;
        }
        true
    }

    /// Plan and run on the calling thread, including nodes already handed
    /// out to a plan that has not come back.
    pub fn recompute(&mut self) {
        self.planned = None;
        if let Some(plan) = self.plan() {
            let outcome = plan.run();
            self.apply(outcome);
        }
    }
}
