use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use superagent_core::error::{Result, SuperAgentError};
use superagent_core::workflow::WorkflowGraph;

/// Linear run order over a workflow's agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Indices into `WorkflowGraph::agents`, in run order.
    pub order: Vec<usize>,
}

impl ExecutionPlan {
    /// Agent ids in run order.
    pub fn agent_ids<'a>(&self, graph: &'a WorkflowGraph) -> Vec<&'a str> {
        self.order
            .iter()
            .map(|&i| graph.agents[i].id.as_str())
            .collect()
    }
}

/// Turns a workflow graph into a linear run order.
pub trait ExecutionPlanner: Send + Sync + 'static {
    fn plan(&self, graph: &WorkflowGraph) -> Result<ExecutionPlan>;
}

/// Topological order (Kahn), ties broken by authoring position.
///
/// Branches and joins are flattened into one sequence; nothing runs in
/// parallel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPlanner;

impl ExecutionPlanner for SequentialPlanner {
    fn plan(&self, graph: &WorkflowGraph) -> Result<ExecutionPlan> {
        graph.validate_shape()?;

        let index: HashMap<&str, usize> = graph
            .agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();

        let n = graph.agents.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &graph.edges {
            // validate_shape guarantees both ends exist
            let (Some(&s), Some(&t)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            successors[s].push(t);
            in_degree[t] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &t in &successors[i] {
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    ready.push(Reverse(t));
                }
            }
        }

        if order.len() < n {
            let stuck = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(i, _)| graph.agents[i].id.clone())
                .collect();
            return Err(SuperAgentError::CyclicGraph(stuck));
        }

        Ok(ExecutionPlan { order })
    }
}

/// Distinct direct predecessors of every agent, by index, in edge order.
pub(crate) fn predecessors(graph: &WorkflowGraph) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = graph
        .agents
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id.as_str(), i))
        .collect();
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); graph.agents.len()];
    for edge in &graph.edges {
        if let (Some(&s), Some(&t)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            if !preds[t].contains(&s) {
                preds[t].push(s);
            }
        }
    }
    preds
}
