use crate::args::{AuditArgs, Cli, Command, ProviderKind, RubricArgs, RubricCmd};
use crate::exit_codes;
use std::sync::Arc;
use tribunal_core::config::{api_key_from_env, AuditConfig, Rubric};
use tribunal_core::errors::ConfigurationError;
use tribunal_core::providers::llm::{openai::OpenAiClient, DisabledClient, LlmClient};
use tribunal_core::report::FsReportSink;
use tribunal_core::{build_audit_graph, AgentState, AuditDeps};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Audit(args) => audit(args).await,
        Command::Rubric(args) => rubric(args),
        Command::Version => {
            println!("tribunal {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

async fn audit(args: AuditArgs) -> anyhow::Result<i32> {
    let mut config = match args.config.as_deref() {
        Some(path) => match AuditConfig::from_path(path) {
            Ok(config) => config,
            Err(err) => return config_failure(err),
        },
        None => AuditConfig::default(),
    };
    if let Some(out) = args.out {
        config.reports_dir = out;
    }

    let rubric = match Rubric::from_path(&args.rubric) {
        Ok(rubric) => rubric,
        Err(err) => return config_failure(err),
    };
    if rubric.dimensions.is_empty() {
        tracing::warn!("rubric has no dimensions; the judge panel will be skipped");
    }

    let client: Arc<dyn LlmClient> = match args.provider {
        ProviderKind::Openai => {
            let api_key = match api_key_from_env() {
                Ok(key) => key,
                Err(err) => return config_failure(err),
            };
            Arc::new(OpenAiClient::new(
                config.llm.model.clone(),
                api_key,
                config.llm.temperature,
                config.llm.max_tokens,
            ))
        }
        ProviderKind::Offline => Arc::new(DisabledClient),
    };

    let sink = Arc::new(FsReportSink::new(config.reports_dir.clone()));
    let graph = build_audit_graph(&config, AuditDeps { client, sink })?;

    tracing::info!(repo = %args.repo, "starting audit");
    let initial = AgentState::new(Some(args.repo), args.doc, rubric.dimensions);
    let state = graph.invoke(initial).await;

    match &state.final_report {
        Some(report) => {
            print_summary(report);
            Ok(exit_codes::OK)
        }
        None => {
            // The chief justice always writes a report; reaching this means
            // the terminal node itself failed.
            anyhow::bail!("audit finished without a report")
        }
    }
}

fn rubric(args: RubricArgs) -> anyhow::Result<i32> {
    match args.cmd {
        RubricCmd::Check { rubric } => match Rubric::from_path(&rubric) {
            Ok(rubric) => {
                println!("rubric ok: {} dimensions", rubric.dimensions.len());
                for dim in &rubric.dimensions {
                    println!("  {}  {}", dim.id, dim.name);
                }
                Ok(exit_codes::OK)
            }
            Err(err) => config_failure(err),
        },
    }
}

fn config_failure(err: ConfigurationError) -> anyhow::Result<i32> {
    eprintln!("configuration error: {err}");
    Ok(exit_codes::CONFIG_ERROR)
}

fn print_summary(report: &tribunal_core::AuditReport) {
    println!("Audit of {}", report.repo_url);
    println!("  {}", report.executive_summary);
    for cr in &report.criteria {
        println!(
            "  {:>3}/100  {} ({})",
            cr.final_score, cr.dimension_name, cr.dimension_id
        );
        if let Some(dissent) = &cr.dissent_summary {
            println!("           {dissent}");
        }
    }
    println!("  Overall: {:.2}/100", report.overall_score);
}
