//! Dependency ordering and deployment plan construction.
//!
//! Computes topological order with Kahn's algorithm. Ties are broken by
//! declaration order so the same graph always yields the same plan.

use super::error::SynthError;
use super::fingerprint;
use super::outputs;
use super::types::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Build a topological execution order over the graph's dependency edges.
pub fn build_execution_order(graph: &ResourceGraph) -> Result<Vec<String>, SynthError> {
    let count = graph.nodes.len();
    let mut in_degree = vec![0usize; count];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

    for (index, node) in graph.nodes.values().enumerate() {
        for dep in &node.depends_on {
            let dep_index = graph.nodes.get_index_of(dep).ok_or_else(|| {
                SynthError::UnknownDependency {
                    id: node.id.clone(),
                    dependency: dep.clone(),
                }
            })?;
            dependents[dep_index].push(index);
            in_degree[index] += 1;
        }
    }

    // Min-heap on declaration index
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(current)) = ready.pop() {
        order.push(current);
        for &next in &dependents[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    let ids: Vec<&String> = graph.nodes.keys().collect();
    if order.len() != count {
        let cycle_members = (0..count)
            .filter(|i| in_degree[*i] > 0)
            .map(|i| ids[i].clone())
            .collect();
        return Err(SynthError::Cycle(cycle_members));
    }

    Ok(order.into_iter().map(|i| ids[i].clone()).collect())
}

/// Turn a wired graph into a deployment plan.
///
/// Rejects graphs with pending slots; the plan handed to the engine is
/// always fully resolved.
pub fn plan(
    graph: &ResourceGraph,
    environment: &Environment,
    mode: BuildMode,
    name: &str,
) -> Result<DeploymentPlan, SynthError> {
    if let Some((node, attribute)) = graph.pending_slots().into_iter().next() {
        return Err(SynthError::UnresolvedReference { node, attribute });
    }

    let order = build_execution_order(graph)?;
    let mut steps = Vec::with_capacity(order.len());
    for id in &order {
        let node = &graph.nodes[id];
        steps.push(PlanStep {
            id: node.id.clone(),
            kind: node.kind,
            config: node
                .config
                .iter()
                .filter_map(|(k, v)| v.as_value().map(|v| (k.clone(), v.clone())))
                .collect(),
            depends_on: node.depends_on.iter().cloned().collect(),
        });
    }

    Ok(DeploymentPlan {
        name: name.to_string(),
        environment: environment.clone(),
        mode,
        fingerprint: fingerprint::fingerprint_steps(&steps),
        outputs: outputs::emit(graph)?,
        steps,
    })
}

/// Human-readable line for a plan step.
pub fn describe_step(step: &PlanStep) -> String {
    if step.depends_on.is_empty() {
        format!("{} [{}]", step.id, step.kind)
    } else {
        format!(
            "{} [{}] after {}",
            step.id,
            step.kind,
            step.depends_on.join(", ")
        )
    }
}
