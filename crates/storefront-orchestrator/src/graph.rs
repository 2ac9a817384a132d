use std::collections::{BTreeSet, HashMap};

use crate::error::DefinitionError;
use crate::step::StepDefinition;

/// A resolved `depends_on` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dependency {
    /// Key the dependent declared; its data is exposed under this name.
    pub(crate) key: String,
    /// Index of the producing step.
    pub(crate) producer: usize,
}

/// Dependency graph of a compiled workflow.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionPlan {
    /// Topological order; ties are broken by declaration order.
    order: Vec<usize>,
    /// step -> resolved dependencies.
    upstream: Vec<Vec<Dependency>>,
    /// step -> steps that depend on it.
    downstream: Vec<Vec<usize>>,
}

impl ExecutionPlan {
    pub(crate) fn build<C, X>(
        workflow: &str,
        steps: &[StepDefinition<C, X>],
    ) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::EmptyWorkflow {
                workflow: workflow.to_string(),
            });
        }

        let producers = index_producers(workflow, steps)?;

        let mut upstream: Vec<Vec<Dependency>> = vec![Vec::new(); steps.len()];
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

        for (index, step) in steps.iter().enumerate() {
            for key in step.dependencies() {
                let producer =
                    *producers
                        .get(key.as_str())
                        .ok_or_else(|| DefinitionError::UnknownDependency {
                            step: step.name().to_string(),
                            dependency: key.clone(),
                        })?;

                if producer == index {
                    return Err(DefinitionError::Cycle {
                        steps: vec![step.name().to_string()],
                    });
                }

                upstream[index].push(Dependency {
                    key: key.clone(),
                    producer,
                });
                if !downstream[producer].contains(&index) {
                    downstream[producer].push(index);
                }
            }
        }

        let order = topological_order(steps, &upstream, &downstream)?;

        Ok(Self {
            order,
            upstream,
            downstream,
        })
    }

    pub(crate) fn order(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn upstream(&self, index: usize) -> &[Dependency] {
        self.upstream.get(index).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn downstream(&self, index: usize) -> &[usize] {
        self.downstream.get(index).map_or(&[], Vec::as_slice)
    }

    /// The last step of the execution order.
    pub(crate) fn terminal(&self) -> usize {
        self.order.last().copied().unwrap_or_default()
    }
}

/// Map every step name and alias to the index of the step producing it.
fn index_producers<'a, C, X>(
    workflow: &str,
    steps: &'a [StepDefinition<C, X>],
) -> Result<HashMap<&'a str, usize>, DefinitionError> {
    let mut producers: HashMap<&str, usize> = HashMap::new();

    for (index, step) in steps.iter().enumerate() {
        if producers.insert(step.name(), index).is_some() {
            return Err(DefinitionError::DuplicateStep {
                workflow: workflow.to_string(),
                step: step.name().to_string(),
            });
        }
    }

    for (index, step) in steps.iter().enumerate() {
        for alias in step.aliases() {
            if let Some(&existing) = producers.get(alias.as_str()) {
                if existing == index && alias == step.name() {
                    continue;
                }
                return Err(DefinitionError::AliasConflict {
                    alias: alias.clone(),
                    step: step.name().to_string(),
                    existing: steps[existing].name().to_string(),
                });
            }
            producers.insert(alias.as_str(), index);
        }
    }

    Ok(producers)
}

/// Kahn's algorithm, always taking the earliest-declared ready step.
fn topological_order<C, X>(
    steps: &[StepDefinition<C, X>],
    upstream: &[Vec<Dependency>],
    downstream: &[Vec<usize>],
) -> Result<Vec<usize>, DefinitionError> {
    let mut in_degree: Vec<usize> = upstream
        .iter()
        .map(|deps| {
            let mut producers: Vec<usize> = deps.iter().map(|dep| dep.producer).collect();
            producers.sort_unstable();
            producers.dedup();
            producers.len()
        })
        .collect();

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &next in &downstream[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() < steps.len() {
        let remaining = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(index, _)| steps[index].name().to_string())
            .collect();
        return Err(DefinitionError::Cycle { steps: remaining });
    }

    Ok(order)
}
