use std::collections::{HashMap, HashSet};

use crate::error::CrewError;
use crate::executor::types::TaskLike;
use crate::role::Role;

/// Role dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct TaskGraph<T: TaskLike> {
    /// Task nodes: role -> task
    pub nodes: HashMap<Role, T>,

    /// Dependency edges: role -> roles it depends on
    pub edges: HashMap<Role, Vec<Role>>,

    /// Reverse edges: role -> roles that depend on it
    pub reverse_edges: HashMap<Role, Vec<Role>>,

    /// Registration order (for stable sorting)
    insertion_order: Vec<Role>,
}

impl<T: TaskLike> TaskGraph<T> {
    /// Construct the graph from registered tasks
    pub fn from_tasks(tasks: &[T]) -> Result<Self, CrewError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<Role, Vec<Role>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for task in tasks {
            let role = task.role();
            if !role.is_schedulable() {
                return Err(CrewError::InvalidRole(role));
            }
            if nodes.contains_key(&role) {
                return Err(CrewError::DuplicateRole(role));
            }

            let dependencies = task.dependencies().to_vec();

            nodes.insert(role, task.clone());
            edges.insert(role, dependencies.clone());
            insertion_order.push(role);

            for dep in dependencies {
                reverse_edges.entry(dep).or_default().push(role);
            }
        }

        Ok(Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
        })
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), CrewError> {
        for role in &self.insertion_order {
            for dep in self.dependencies_of(*role) {
                if !self.nodes.contains_key(dep) {
                    return Err(CrewError::DependencyNotFound {
                        role: *role,
                        missing_dep: *dep,
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(CrewError::CircularDependency(cycle));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, role: Role) -> Option<&T> {
        self.nodes.get(&role)
    }

    /// Roles in registration order.
    pub fn roles(&self) -> &[Role] {
        &self.insertion_order
    }

    pub fn dependencies_of(&self, role: Role) -> &[Role] {
        self.edges.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Roles with no declared dependencies, in registration order.
    pub fn independent_roles(&self) -> Vec<Role> {
        self.insertion_order
            .iter()
            .copied()
            .filter(|r| self.dependencies_of(*r).is_empty())
            .collect()
    }

    /// Topological sort using Kahn's algorithm
    ///
    /// Returns stages where roles in the same stage have no dependency on
    /// each other. Ties within a stage keep registration order.
    ///
    /// O(V + E) where V = number of roles, E = number of dependencies
    pub fn topological_sort(&self) -> Result<Vec<Vec<Role>>, CrewError> {
        // edges[A] = [B, C] means A depends on B and C, so A's in-degree = 2
        let mut in_degree: HashMap<Role, usize> = self
            .insertion_order
            .iter()
            .map(|r| (*r, self.dependencies_of(*r).len()))
            .collect();

        let mut stages: Vec<Vec<Role>> = Vec::new();
        let mut current_stage: Vec<Role> = self.independent_roles();
        let mut processed = 0;

        while !current_stage.is_empty() {
            processed += current_stage.len();

            let mut next_stage = Vec::new();
            for role in &current_stage {
                let Some(dependents) = self.reverse_edges.get(role) else {
                    continue;
                };
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next_stage.push(*dependent);
                        }
                    }
                }
            }

            self.sort_by_insertion(&mut next_stage);
            next_stage.dedup();
            stages.push(std::mem::replace(&mut current_stage, next_stage));
        }

        if processed != self.nodes.len() {
            return Err(CrewError::CircularDependency(
                "Unable to complete topological sort (cycle detected)".to_string(),
            ));
        }

        Ok(stages)
    }

    fn sort_by_insertion(&self, roles: &mut [Role]) {
        roles.sort_by_key(|role| {
            self.insertion_order
                .iter()
                .position(|r| r == role)
                .unwrap_or(usize::MAX)
        });
    }

    /// Detect circular dependencies using DFS
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for role in &self.insertion_order {
            if !visited.contains(role) && self.dfs_cycle(*role, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(&self, node: Role, visited: &mut HashSet<Role>, stack: &mut Vec<Role>) -> bool {
        visited.insert(node);
        stack.push(node);

        for dep in self.dependencies_of(node) {
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(*dep);
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep) && self.dfs_cycle(*dep, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[Role]) -> String {
    stack
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}
