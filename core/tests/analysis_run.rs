mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{engine, engine_with, output_text, MapSource, RecordingGenerator, ScriptedCritic};
use crew_core::api::{
    cancel_pair, AnalysisEngine, CrewError, ExecutionOpts, PromptTemplate, RevisionPolicy, Role,
    RoleProfile, RoleRegistry, Rubric, ServiceError, TaskStatus, Verdict, GENERIC_FEEDBACK,
};
use pretty_assertions::assert_eq;

fn profile(role: Role) -> RoleProfile {
    RoleProfile::new(
        role,
        PromptTemplate::new(format!("{role} goal"), "analyze", "report"),
        Rubric::new(["covers the basics"]),
    )
}

#[tokio::test]
async fn full_crew_approved_first_time() {
    let generator = Arc::new(RecordingGenerator::new());
    let report = engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis(" tsla ", &RoleRegistry::standard())
        .await
        .unwrap();

    assert_eq!(report.ticker, "TSLA");
    assert_eq!(report.run_id, "test-run");
    assert_eq!(report.per_role.len(), 5);
    assert!(report.all_approved());
    assert_eq!(report.trace.len(), 5);
    assert_eq!(report.final_report, output_text(Role::Synthesis, 1));
    assert_eq!(report.details.len(), 5);
    assert_eq!(
        report.details.get(Role::Synthesis.display_name()),
        Some(&report.final_report)
    );
    assert_eq!(generator.calls().len(), 5);

    for role in [Role::Macro, Role::Quant, Role::Technical, Role::Fundamental] {
        assert_eq!(
            report.output_by_name(role.display_name()),
            Some(output_text(role, 1).as_str())
        );
    }
}

#[tokio::test]
async fn quant_rejected_once_then_approved() {
    let generator = Arc::new(RecordingGenerator::new());
    let critic = ScriptedCritic::approving().script(
        Role::Quant,
        vec![
            Ok(Verdict::reject(["missing three-year margin trend"])),
            Ok(Verdict::approve()),
        ],
    );
    let report = engine(generator.clone(), Arc::new(critic))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    let quant = &report.per_role[&Role::Quant];
    assert_eq!(quant.attempts, 2);
    assert_eq!(quant.status, TaskStatus::Approved);
    assert_eq!(quant.output, output_text(Role::Quant, 2));

    let fundamental_calls = generator.calls_for(Role::Fundamental);
    assert_eq!(fundamental_calls.len(), 1);
    let prompt = &fundamental_calls[0].prompt;
    assert!(prompt.contains(&output_text(Role::Quant, 2)));
    assert!(!prompt.contains(&output_text(Role::Quant, 1)));
    // Only the declared dependency is visible to the fundamental strategist.
    assert!(!prompt.contains(&output_text(Role::Macro, 1)));
    assert!(!prompt.contains(&output_text(Role::Technical, 1)));

    let quant_calls = generator.calls_for(Role::Quant);
    assert!(quant_calls[1].prompt.contains("REVISION 2 REQUIRED"));
    assert!(quant_calls[1]
        .prompt
        .contains("missing three-year margin trend"));
}

#[tokio::test]
async fn transient_generator_failure_is_retried_by_default() {
    let generator = Arc::new(RecordingGenerator::new().flaky_for(Role::Macro, 1));
    let report = engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    let macro_outcome = &report.per_role[&Role::Macro];
    assert_eq!(macro_outcome.status, TaskStatus::Approved);
    assert_eq!(macro_outcome.attempts, 1);
    assert_eq!(macro_outcome.output, output_text(Role::Macro, 1));
    // The failed call and its retry both belong to the first attempt.
    let calls = generator.calls_for(Role::Macro);
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.attempt == 1));
    assert!(report.all_approved());
}

#[tokio::test]
async fn always_rejecting_critic_exhausts_after_three_attempts() {
    let registry = RoleRegistry::new().register(profile(Role::Macro)).unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let report = engine(generator.clone(), Arc::new(ScriptedCritic::rejecting()))
        .run_analysis("TSLA", &registry)
        .await
        .unwrap();

    let outcome = &report.per_role[&Role::Macro];
    assert_eq!(outcome.status, TaskStatus::Exhausted);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.output, output_text(Role::Macro, 3));
    assert_eq!(report.trace.len(), 3);
    assert!(report.trace.records().iter().all(|r| !r.approved));
    assert_eq!(
        report
            .trace
            .records()
            .iter()
            .map(|r| r.attempt)
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(report.final_report, "");
    assert_eq!(report.exhausted_roles(), vec![Role::Macro]);
}

#[tokio::test]
async fn attempts_never_exceed_ceiling_for_any_role() {
    let generator = Arc::new(RecordingGenerator::new());
    let report = engine(generator.clone(), Arc::new(ScriptedCritic::rejecting()))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    for outcome in report.per_role.values() {
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.status, TaskStatus::Exhausted);
    }
    assert_eq!(report.trace.len(), 15);
    assert_eq!(generator.calls().len(), 15);

    let synthesis_prompt = &generator.calls_for(Role::Synthesis)[0].prompt;
    assert!(synthesis_prompt.contains("[NOT APPROVED after 3 attempts]"));
    assert!(synthesis_prompt.contains(&output_text(Role::Fundamental, 3)));
}

#[tokio::test]
async fn fatal_error_in_macro_aborts_run() {
    let generator = Arc::new(RecordingGenerator::new().failing_for(Role::Macro));
    let err = engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap_err();

    assert_eq!(err.failing_role(), Some(Role::Macro));
    assert!(matches!(
        err,
        CrewError::RoleFailed {
            role: Role::Macro,
            source: ServiceError::Fatal(_)
        }
    ));
    assert!(err.to_string().contains("macro"));
    assert!(generator.calls_for(Role::Fundamental).is_empty());
    assert!(generator.calls_for(Role::Synthesis).is_empty());
}

#[tokio::test]
async fn malformed_verdict_counts_as_one_rejection() {
    let generator = Arc::new(RecordingGenerator::new());
    let critic = ScriptedCritic::approving().script(
        Role::Technical,
        vec![Err(ServiceError::malformed("expected JSON object"))],
    );
    let report = engine(generator.clone(), Arc::new(critic))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    let technical = &report.per_role[&Role::Technical];
    assert_eq!(technical.attempts, 2);
    assert_eq!(technical.status, TaskStatus::Approved);

    let first = report.trace.for_role(Role::Technical).next().unwrap();
    assert!(first.malformed);
    assert!(!first.approved);
    assert_eq!(first.feedback, vec![GENERIC_FEEDBACK.to_string()]);
}

#[tokio::test]
async fn dependents_start_after_every_independent_finishes() {
    let generator =
        Arc::new(RecordingGenerator::new().with_delay(Duration::from_millis(20)));
    let critic = ScriptedCritic::approving().script(
        Role::Technical,
        vec![Ok(Verdict::reject(["add RSI"])), Ok(Verdict::approve())],
    );
    let report = engine(generator, Arc::new(critic))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    let barrier = [Role::Macro, Role::Quant, Role::Technical]
        .iter()
        .map(|r| report.per_role[r].finished_at)
        .max()
        .unwrap();
    let fundamental = &report.per_role[&Role::Fundamental];
    let synthesis = &report.per_role[&Role::Synthesis];

    assert!(fundamental.started_at >= barrier);
    assert!(synthesis.started_at >= fundamental.finished_at);
}

#[tokio::test]
async fn synthesis_sees_every_section_in_role_order() {
    let generator = Arc::new(RecordingGenerator::new());
    engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    let prompt = &generator.calls_for(Role::Synthesis)[0].prompt;
    let positions: Vec<usize> = [Role::Macro, Role::Quant, Role::Technical, Role::Fundamental]
        .iter()
        .map(|r| prompt.find(&output_text(*r, 1)).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
    assert!(prompt.contains("[approved after 1 attempt]"));
}

#[tokio::test]
async fn identical_runs_build_identical_prompts() {
    let mut prompts = Vec::new();
    for _ in 0..2 {
        let generator = Arc::new(RecordingGenerator::new());
        engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
            .run_analysis("TSLA", &RoleRegistry::standard())
            .await
            .unwrap();
        let mut calls: Vec<(Role, u32, String)> = generator
            .calls()
            .into_iter()
            .map(|c| (c.role, c.attempt, c.prompt))
            .collect();
        calls.sort();
        prompts.push(calls);
    }
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn seeds_from_context_source_reach_the_prompt() {
    let generator = Arc::new(RecordingGenerator::new());
    let mut seeds = HashMap::new();
    seeds.insert(Role::Fundamental, "Item 1A. Risk Factors: supply chain".to_string());

    AnalysisEngine::builder()
        .generator(generator.clone())
        .critic(Arc::new(ScriptedCritic::approving()))
        .context_source(Arc::new(MapSource(seeds)))
        .policy(RevisionPolicy::new(2))
        .opts(ExecutionOpts::default())
        .build()
        .unwrap()
        .run_analysis("TSLA", &RoleRegistry::standard())
        .await
        .unwrap();

    assert!(generator.calls_for(Role::Fundamental)[0]
        .prompt
        .contains("Item 1A. Risk Factors: supply chain"));
    assert!(!generator.calls_for(Role::Quant)[0]
        .prompt
        .contains("Source Material"));
}

#[tokio::test]
async fn cancellation_stops_the_run() {
    let generator =
        Arc::new(RecordingGenerator::new().with_delay(Duration::from_secs(30)));
    let (handle, token) = cancel_pair();
    let engine = engine_with(generator, Arc::new(ScriptedCritic::approving()), token);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run_analysis("TSLA", &RoleRegistry::standard()),
    )
    .await
    .expect("run should stop promptly")
    .unwrap_err();

    assert!(matches!(err, CrewError::Cancelled));
    canceller.await.unwrap();
}

#[tokio::test]
async fn dependency_on_synthesis_is_unsatisfied() {
    let registry = RoleRegistry::new()
        .register(profile(Role::Macro))
        .unwrap()
        .register(profile(Role::Synthesis).depends_on([Role::Macro]).as_synthesis())
        .unwrap()
        .register(profile(Role::Fundamental).depends_on([Role::Synthesis]))
        .unwrap();

    let err = engine(
        Arc::new(RecordingGenerator::new()),
        Arc::new(ScriptedCritic::approving()),
    )
    .run_analysis("TSLA", &registry)
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CrewError::DependencyUnsatisfied {
            role: Role::Fundamental,
            dependency: Role::Synthesis
        }
    ));
}

#[tokio::test]
async fn invalid_graphs_are_rejected_before_any_call() {
    let generator = Arc::new(RecordingGenerator::new());
    let registry = RoleRegistry::new()
        .register(profile(Role::Fundamental).depends_on([Role::Quant]))
        .unwrap();

    let err = engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis("TSLA", &registry)
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::DependencyNotFound { .. }));

    let err = engine(generator.clone(), Arc::new(ScriptedCritic::approving()))
        .run_analysis("   ", &RoleRegistry::standard())
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::InvalidTicker(_)));

    assert!(generator.calls().is_empty());
}
