use std::path::Path;
use std::time::Duration;

use crew_core::api::{
    AnalysisEngine, AnalysisReport, AppConfig, CancelToken, CliError, ExecutionOpts,
    RevisionPolicy, RoleRegistry,
};
use crew_plugins::factory;

use super::cli::AnalyzeArgs;

const MOCK_LATENCY: Duration = Duration::from_millis(250);

/// Fold command line flags into the loaded config. Flags win.
pub fn apply_overrides(cfg: &mut AppConfig, args: &AnalyzeArgs) {
    if let Some(format) = args.format {
        cfg.output.format = format.as_str().to_string();
    }
    if let Some(n) = args.max_revisions {
        cfg.revision.max_revisions = n;
    }
    if let Some(n) = args.max_parallel {
        cfg.concurrency.max_parallel = Some(n);
    }
    if let Some(dir) = &args.context_dir {
        cfg.context.directory = Some(dir.to_string_lossy().to_string());
    }
    if let Some(out) = &args.out {
        cfg.output.report_path = Some(out.to_string_lossy().to_string());
    }
    if args.no_progress || !atty::is(atty::Stream::Stderr) {
        cfg.output.progress_bar = false;
    }
}

pub async fn run(
    args: AnalyzeArgs,
    mut cfg: AppConfig,
    cancel: CancelToken,
) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, &args);

    let mut opts = ExecutionOpts::from_config(&cfg);
    opts.run_id = args.run_id.clone();

    let (generator, critic) = if args.mock {
        let latency = opts.progress_bar.then_some(MOCK_LATENCY);
        factory::build_mock_services(latency)
    } else {
        (
            factory::build_generation(&cfg).map_err(|e| CliError::Config(e.to_string()))?,
            factory::build_critique(&cfg).map_err(|e| CliError::Config(e.to_string()))?,
        )
    };

    let mut builder = AnalysisEngine::builder()
        .generator(generator)
        .critic(critic)
        .retry_strategy(factory::build_retry_strategy(&cfg.retry))
        .policy(RevisionPolicy::from_config(&cfg.revision))
        .opts(opts.clone())
        .cancel(cancel);

    // Progress bars already show per-role state in text mode.
    if !opts.progress_bar {
        builder = builder.renderer(factory::build_renderer(&cfg));
    }
    if let Some(source) = factory::build_context_source(&cfg) {
        builder = builder.context_source(source);
    }

    let engine = builder.build()?;
    let report = engine
        .run_analysis(&args.ticker, &RoleRegistry::standard())
        .await?;

    let exhausted = report.exhausted_roles();
    if !exhausted.is_empty() {
        tracing::warn!(
            run_id = %report.run_id,
            roles = ?exhausted,
            "some sections were never approved"
        );
    }

    emit_report(&cfg, &report).await?;
    Ok(0)
}

async fn emit_report(cfg: &AppConfig, report: &AnalysisReport) -> Result<(), CliError> {
    if let Some(path) = cfg
        .output
        .report_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        write_report(Path::new(path), report).await?;
        eprintln!("report written to {path}");
    }

    match cfg.output.format.as_str() {
        "jsonl" => {
            let line = serde_json::json!({
                "v": 1,
                "event_type": "report",
                "run_id": report.run_id,
                "report": report,
            });
            println!("{line}");
        }
        _ => {
            println!("{}", render_text(report));
        }
    }
    Ok(())
}

pub async fn write_report(path: &Path, report: &AnalysisReport) -> Result<(), CliError> {
    let json = report
        .to_json_pretty()
        .map_err(|e| CliError::Command(format!("serialize report failed: {e}")))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Memo first, then the revision summary per role.
pub fn render_text(report: &AnalysisReport) -> String {
    let rule = "=".repeat(60);
    let mut out = format!("{rule}\nINVESTMENT MEMO: {}\n{rule}\n\n", report.ticker);
    if report.final_report.trim().is_empty() {
        out.push_str("(no approved memo was produced)\n");
    } else {
        out.push_str(report.final_report.trim_end());
        out.push('\n');
    }
    out.push_str(&format!("\n{rule}\nREVISION SUMMARY\n{rule}\n"));
    out.push_str(&report.revision_summary());

    let exhausted = report.exhausted_roles();
    if !exhausted.is_empty() {
        let names: Vec<&str> = exhausted.iter().map(|r| r.display_name()).collect();
        out.push_str(&format!("\n\nNot approved: {}", names.join(", ")));
    }
    out
}
