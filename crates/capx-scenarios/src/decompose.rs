//! Temporal decomposition: expands a scenario into its cell DAG.
//!
//! Each cell is one (subproblem, stage, iteration) coordinate. Linking rules
//! add edges between stages of the same subproblem and iteration, so a
//! downstream cell never builds before the decisions it consumes exist.

use crate::spec::{LinkingRule, ScenarioConfig};
use capx_core::{CapxError, CapxResult, CellId};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One decision a cell exports for downstream stages.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkProduction {
    pub decision: String,
    pub symbol: String,
}

#[derive(Debug, Clone)]
pub struct PlannedCell {
    pub id: CellId,
    /// Cells whose named decisions this cell consumes.
    pub upstream: Vec<(CellId, String)>,
    pub produces: Vec<LinkProduction>,
}

/// Cells in topological order: every producer precedes its consumers.
#[derive(Debug, Clone)]
pub struct CellPlan {
    cells: Vec<PlannedCell>,
}

impl CellPlan {
    pub fn cells(&self) -> &[PlannedCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Groups cell indices into dependency levels. Cells in one level share
    /// no ancestry and can solve concurrently.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let position: HashMap<CellId, usize> = self
            .cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (cell.id, idx))
            .collect();
        let mut depth = vec![0usize; self.cells.len()];
        for (idx, cell) in self.cells.iter().enumerate() {
            for (upstream, _) in &cell.upstream {
                let upstream_idx = position[upstream];
                depth[idx] = depth[idx].max(depth[upstream_idx] + 1);
            }
        }
        let max_depth = depth.iter().copied().max().unwrap_or(0);
        let mut levels = vec![Vec::new(); max_depth + 1];
        for (idx, d) in depth.iter().enumerate() {
            levels[*d].push(idx);
        }
        levels
    }
}

pub fn decompose(config: &ScenarioConfig) -> CapxResult<CellPlan> {
    check_stage_cycles(&config.linking)?;

    let mut graph: DiGraph<CellId, String> = DiGraph::new();
    // Ordered so node and edge insertion (and with them the topological
    // order) are stable across runs.
    let mut nodes: BTreeMap<CellId, NodeIndex> = BTreeMap::new();
    for sub in &config.subproblems {
        for stage in &sub.stages {
            for weather in 1..=config.weather_iterations {
                for hydro in 1..=config.hydro_iterations {
                    for avail in 1..=config.availability_iterations {
                        let id = CellId::new(sub.subproblem, *stage)
                            .with_iterations(weather, hydro, avail);
                        nodes.insert(id, graph.add_node(id));
                    }
                }
            }
        }
    }

    // Linking edges stay within one subproblem and iteration coordinate;
    // rules whose stages a subproblem does not declare are skipped there.
    for rule in &config.linking {
        for (id, node) in &nodes {
            if id.stage != rule.from_stage {
                continue;
            }
            let target = CellId {
                stage: rule.to_stage,
                ..*id
            };
            if let Some(target_node) = nodes.get(&target) {
                graph.add_edge(*node, *target_node, rule.decision.clone());
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| CapxError::CyclicLinking {
        detail: format!("cell {} participates in a linking cycle", graph[cycle.node_id()]),
    })?;

    let cells = order
        .into_iter()
        .map(|node| {
            let id = graph[node];
            let mut upstream: Vec<(CellId, String)> = graph
                .edges_directed(node, petgraph::Direction::Incoming)
                .map(|edge| (graph[edge.source()], edge.weight().clone()))
                .collect();
            upstream.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
            // A decision linked into several later stages appears in several
            // rules; the producing cell still publishes it once. Collected
            // through an ordered set so duplicates collapse regardless of the
            // order rules are declared in.
            let produces: Vec<LinkProduction> = config
                .linking
                .iter()
                .filter(|rule| {
                    rule.from_stage == id.stage
                        && nodes.contains_key(&CellId {
                            stage: rule.to_stage,
                            ..id
                        })
                })
                .map(|rule| (rule.decision.clone(), rule.symbol.clone()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|(decision, symbol)| LinkProduction { decision, symbol })
                .collect();
            PlannedCell { id, upstream, produces }
        })
        .collect();

    Ok(CellPlan { cells })
}

/// Rejects linking cycles at the stage level before any cells exist, so the
/// report names stages rather than an arbitrary cell coordinate.
fn check_stage_cycles(linking: &[LinkingRule]) -> CapxResult<()> {
    let mut graph: DiGraph<u32, ()> = DiGraph::new();
    let mut nodes: HashMap<u32, NodeIndex> = HashMap::new();
    for rule in linking {
        for stage in [rule.from_stage, rule.to_stage] {
            nodes.entry(stage).or_insert_with(|| graph.add_node(stage));
        }
        graph.add_edge(nodes[&rule.from_stage], nodes[&rule.to_stage], ());
    }
    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| CapxError::CyclicLinking {
            detail: format!(
                "stage {} participates in a linking cycle",
                graph[cycle.node_id()]
            ),
        })
}
