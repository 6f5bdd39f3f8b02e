use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;

use crate::error::CrewError;
use crate::role::{Role, RoleProfile};

use super::controller::{ControllerDeps, RevisionController};
use super::graph::TaskGraph;
use super::traits::RenderEvent;
use super::types::{RoleOutcome, Task, TaskLike};

/// Aborts spawned controllers that are still running when the stage is
/// abandoned (first failure, or the caller dropping the run).
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Execute a set of mutually independent roles concurrently
///
/// Each role runs on its own spawned task; the returned map is the barrier.
/// The pool never holds more permits than there are roles. The first error
/// aborts the remaining tasks and is returned.
pub async fn execute_stage_parallel<F, Fut>(
    roles: &[Role],
    max_concurrency: usize,
    executor_fn: F,
) -> Result<BTreeMap<Role, RoleOutcome>, CrewError>
where
    F: Fn(Role) -> Fut,
    Fut: Future<Output = Result<RoleOutcome, CrewError>> + Send + 'static,
{
    let permits = max_concurrency.clamp(1, roles.len().max(1));
    let sem = Arc::new(Semaphore::new(permits));
    let mut handles = FuturesUnordered::new();
    let mut guard = AbortOnDrop(Vec::with_capacity(roles.len()));

    for &role in roles {
        let sem = sem.clone();
        let fut = executor_fn(role);
        let handle = tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|_| CrewError::TaskAborted {
                    role,
                    message: "semaphore closed unexpectedly".to_string(),
                })?;
            fut.await
        });
        guard.0.push(handle.abort_handle());
        handles.push(async move { (role, handle.await) });
    }

    let mut results = BTreeMap::new();
    while let Some((role, joined)) = handles.next().await {
        let outcome = joined.map_err(|e| CrewError::TaskAborted {
            role,
            message: e.to_string(),
        })??;
        results.insert(role, outcome);
    }

    Ok(results)
}

/// Stage layout a run follows: the independent fan-out, then each dependent
/// on its own, then synthesis.
pub fn execution_plan<T: TaskLike>(
    graph: &TaskGraph<T>,
    synthesis: Option<Role>,
) -> Result<Vec<Vec<Role>>, CrewError> {
    let independent: Vec<Role> = graph
        .independent_roles()
        .into_iter()
        .filter(|r| Some(*r) != synthesis)
        .collect();

    let mut plan = Vec::new();
    if !independent.is_empty() {
        plan.push(independent.clone());
    }
    for stage in graph.topological_sort()? {
        for role in stage {
            if !independent.contains(&role) && Some(role) != synthesis {
                plan.push(vec![role]);
            }
        }
    }
    if let Some(role) = synthesis.filter(|r| graph.get(*r).is_some()) {
        plan.push(vec![role]);
    }
    Ok(plan)
}

/// Runs a validated role graph: concurrent independent stage, barrier,
/// sequential dependents, synthesis last.
pub struct Scheduler<'a> {
    graph: &'a TaskGraph<Arc<RoleProfile>>,
    deps: ControllerDeps,
    synthesis: Option<Role>,
    max_parallel: Option<usize>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        graph: &'a TaskGraph<Arc<RoleProfile>>,
        deps: ControllerDeps,
        synthesis: Option<Role>,
    ) -> Self {
        Self {
            graph,
            deps,
            synthesis,
            max_parallel: None,
        }
    }

    pub fn max_parallel(mut self, cap: Option<usize>) -> Self {
        self.max_parallel = cap;
        self
    }

    /// Run every stage of `plan` and return each role's terminal outcome.
    pub async fn run(
        &self,
        ticker: &str,
        plan: &[Vec<Role>],
        seeds: &HashMap<Role, String>,
    ) -> Result<BTreeMap<Role, RoleOutcome>, CrewError> {
        let total_stages = plan.len();
        let mut outcomes: BTreeMap<Role, RoleOutcome> = BTreeMap::new();

        for (stage_id, roles) in plan.iter().enumerate() {
            if self.deps.cancel.is_cancelled() {
                return Err(CrewError::Cancelled);
            }

            self.emit(RenderEvent::StageStart {
                run_id: self.deps.run_id.clone(),
                stage_id,
                roles: roles.clone(),
            });
            if let Ok(monitor) = self.deps.progress.lock() {
                monitor.update_stage(stage_id, total_stages);
            }

            tracing::info!(
                target: "crew.scheduler",
                run_id = %self.deps.run_id,
                stage_id,
                roles = ?roles,
                "stage started"
            );

            let stage_results = if roles.len() > 1 {
                self.run_fan_out(ticker, stage_id, roles, seeds, &outcomes)
                    .await?
            } else {
                let mut results = BTreeMap::new();
                for &role in roles {
                    let task = self.build_task(ticker, role, seeds, &outcomes)?;
                    let outcome = self.runner(role)?.run_task(task, stage_id).await?;
                    results.insert(role, outcome);
                }
                results
            };

            outcomes.extend(stage_results);

            self.emit(RenderEvent::StageEnd {
                run_id: self.deps.run_id.clone(),
                stage_id,
            });
        }

        Ok(outcomes)
    }

    async fn run_fan_out(
        &self,
        ticker: &str,
        stage_id: usize,
        roles: &[Role],
        seeds: &HashMap<Role, String>,
        outcomes: &BTreeMap<Role, RoleOutcome>,
    ) -> Result<BTreeMap<Role, RoleOutcome>, CrewError> {
        let mut prepared: HashMap<Role, (StageRunner, Task)> = HashMap::new();
        for &role in roles {
            let task = self.build_task(ticker, role, seeds, outcomes)?;
            prepared.insert(role, (self.runner(role)?, task));
        }

        let max_parallel = self.max_parallel.unwrap_or(roles.len());
        let prepared = std::sync::Mutex::new(prepared);

        execute_stage_parallel(roles, max_parallel, |role| {
            let entry = prepared.lock().ok().and_then(|mut m| m.remove(&role));
            async move {
                let (runner, task) = entry.ok_or_else(|| CrewError::TaskAborted {
                    role,
                    message: "role was not prepared for this stage".to_string(),
                })?;
                runner.run_task(task, stage_id).await
            }
        })
        .await
    }

    fn runner(&self, role: Role) -> Result<StageRunner, CrewError> {
        let profile = self
            .graph
            .get(role)
            .cloned()
            .ok_or(CrewError::InvalidRole(role))?;
        Ok(StageRunner {
            controller: RevisionController::new(profile, self.deps.clone()),
            deps: self.deps.clone(),
        })
    }

    /// Fresh task for `role`. Dependents get the final outputs of their
    /// declared dependencies; synthesis gets every other role's output.
    fn build_task(
        &self,
        ticker: &str,
        role: Role,
        seeds: &HashMap<Role, String>,
        outcomes: &BTreeMap<Role, RoleOutcome>,
    ) -> Result<Task, CrewError> {
        let mut task = Task::new(role, ticker, self.deps.policy.max_attempts())
            .with_seed(seeds.get(&role).cloned());

        if Some(role) == self.synthesis {
            for dep in self.graph.dependencies_of(role) {
                if !outcomes.contains_key(dep) {
                    return Err(CrewError::DependencyUnsatisfied {
                        role,
                        dependency: *dep,
                    });
                }
            }
            for (upstream, outcome) in outcomes {
                task = task.with_upstream(*upstream, outcome.as_upstream());
            }
            return Ok(task);
        }

        for dep in self.graph.dependencies_of(role) {
            match outcomes.get(dep) {
                Some(outcome) if outcome.status.is_terminal() => {
                    task = task.with_upstream(*dep, outcome.as_upstream());
                }
                _ => {
                    return Err(CrewError::DependencyUnsatisfied {
                        role,
                        dependency: *dep,
                    })
                }
            }
        }
        Ok(task)
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(renderer) = &self.deps.renderer {
            renderer.render(&event);
        }
    }
}

/// A controller plus the run plumbing around it (events, progress).
struct StageRunner {
    controller: RevisionController,
    deps: ControllerDeps,
}

impl StageRunner {
    async fn run_task(self, task: Task, stage_id: usize) -> Result<RoleOutcome, CrewError> {
        let role = self.controller.role();
        if let Some(renderer) = &self.deps.renderer {
            renderer.render(&RenderEvent::TaskStart {
                run_id: self.deps.run_id.clone(),
                role,
                stage_id,
            });
        }
        if let Ok(mut monitor) = self.deps.progress.lock() {
            monitor.add_role(role);
        }

        let outcome = self.controller.run(task).await?;

        tracing::info!(
            target: "crew.scheduler",
            run_id = %self.deps.run_id,
            role = %role,
            status = outcome.status.as_str(),
            attempts = outcome.attempts,
            duration_ms = outcome.duration_ms(),
            "role finished"
        );

        if let Some(renderer) = &self.deps.renderer {
            renderer.render(&RenderEvent::TaskComplete {
                run_id: self.deps.run_id.clone(),
                role,
                status: outcome.status,
                attempts: outcome.attempts,
                duration_ms: outcome.duration_ms(),
            });
        }
        if let Ok(mut monitor) = self.deps.progress.lock() {
            monitor.complete_role(role, outcome.approved(), outcome.attempts, outcome.duration_ms());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::TaskStatus;
    use crate::role::RoleRegistry;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn outcome(role: Role) -> RoleOutcome {
        let now = Utc::now();
        RoleOutcome {
            role,
            output: format!("{role} final"),
            status: TaskStatus::Approved,
            attempts: 1,
            started_at: now,
            finished_at: now,
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_standard_plan() {
        let registry = RoleRegistry::standard();
        let graph = TaskGraph::from_tasks(registry.profiles()).unwrap();
        let plan = execution_plan(&graph, registry.synthesis_role()).unwrap();
        assert_eq!(
            plan,
            vec![
                vec![Role::Macro, Role::Quant, Role::Technical],
                vec![Role::Fundamental],
                vec![Role::Synthesis],
            ]
        );
    }

    #[tokio::test]
    async fn test_stage_parallel_runs_concurrently() {
        let roles = [Role::Macro, Role::Quant, Role::Technical];
        let started = std::time::Instant::now();
        let results = execute_stage_parallel(&roles, 3, |role| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(outcome(role))
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(140));
    }

    #[tokio::test]
    async fn test_stage_parallel_surfaces_first_error() {
        let roles = [Role::Macro, Role::Quant];
        let err = execute_stage_parallel(&roles, 2, |role| async move {
            if role == Role::Macro {
                return Err(CrewError::role_failed(
                    role,
                    crate::error::ServiceError::fatal("quota"),
                ));
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(outcome(role))
        })
        .await
        .unwrap_err();

        assert_eq!(err.failing_role(), Some(Role::Macro));
    }
}
