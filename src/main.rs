use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use funnel_ai::config::{AppConfig, GenerationConfig};
use funnel_ai::error::AppError;
use funnel_ai::telemetry;
use funnel_ai::workflows::funnel::generation::backend::{
    GenerationBackendConfig, GenerationRequest, HttpComplianceReviewer, HttpGenerationBackend,
};
use funnel_ai::workflows::funnel::generation::compliance::{ApproveAllReviewer, ComplianceReviewer};
use funnel_ai::workflows::funnel::generation::retry::TokioClock;
use funnel_ai::workflows::funnel::generation::{GenerationOptions, GenerationOrchestrator};
use funnel_ai::workflows::funnel::repository::InMemoryFunnelRepository;
use funnel_ai::workflows::funnel::{FunnelService, FunnelStructure};
use funnel_ai::workflows::leads::import::LeadCsvImporter;
use funnel_ai::workflows::leads::{LeadScoreReport, LeadScoringService, OutreachMatrix};
use funnel_ai::workflows::scoring::domain::{
    ConditionOperator, LeadAttributes, RuleId, RuleKind, ScoringRule,
};
use funnel_ai::workflows::scoring::store::InMemoryRuleStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    leads: Arc<LeadScoringService<InMemoryRuleStore>>,
    funnels: Arc<FunnelService<InMemoryFunnelRepository>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Funnel AI Orchestrator",
    about = "Run the funnel generation and lead scoring service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a CSV lead export against the rule set and print the routing
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Lead export to score (CSV with Lead ID/Source/Response Time Minutes/Message columns)
    #[arg(long)]
    leads_csv: PathBuf,
    /// JSON file holding the scoring rules (defaults to the built-in demo set)
    #[arg(long)]
    rules_json: Option<PathBuf>,
    /// Print the per-rule breakdown for every lead
    #[arg(long)]
    breakdown: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Score(args) => run_score_report(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        leads: Arc::new(LeadScoringService::new(
            Arc::new(demo_rule_store()?),
            OutreachMatrix::default(),
        )),
        funnels: Arc::new(funnel_service(&config.generation)?),
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/leads/score", post(score_lead_endpoint))
        .route("/api/v1/funnels/generate", post(generate_funnel_endpoint))
        .layer(prometheus_layer)
        .with_state(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "funnel orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn funnel_service(
    config: &GenerationConfig,
) -> Result<FunnelService<InMemoryFunnelRepository>, AppError> {
    let primary = HttpGenerationBackend::new(
        "primary",
        GenerationBackendConfig {
            endpoint: config.primary_endpoint.clone(),
            api_key: config.api_key.clone(),
            request_timeout: config.attempt_timeout,
        },
    )
    .map_err(AppError::Backend)?;

    let fallback = HttpGenerationBackend::new(
        "fallback",
        GenerationBackendConfig {
            endpoint: config.fallback_endpoint.clone(),
            api_key: config.api_key.clone(),
            request_timeout: config.attempt_timeout,
        },
    )
    .map_err(AppError::Backend)?;

    let reviewer: Arc<dyn ComplianceReviewer> = match &config.compliance_endpoint {
        Some(endpoint) => Arc::new(
            HttpComplianceReviewer::new(GenerationBackendConfig {
                endpoint: endpoint.clone(),
                api_key: config.api_key.clone(),
                request_timeout: config.attempt_timeout,
            })
            .map_err(AppError::Backend)?,
        ),
        None => Arc::new(ApproveAllReviewer),
    };

    let orchestrator = GenerationOrchestrator::new(
        Arc::new(primary),
        Arc::new(fallback),
        reviewer,
        Arc::new(TokioClock::new()),
    );

    Ok(FunnelService::new(
        orchestrator,
        Arc::new(InMemoryFunnelRepository::new()),
        config.access,
    ))
}

/// Built-in rule set for demos and the CLI; the settings surface replaces
/// these in a real deployment.
fn demo_rules() -> Vec<ScoringRule> {
    vec![
        ScoringRule {
            id: RuleId("demo-fast-reply".to_string()),
            name: "FastReply".to_string(),
            kind: RuleKind::ResponseTime,
            operator: ConditionOperator::LessThan,
            operand: "10".to_string(),
            points: 15,
            is_active: true,
        },
        ScoringRule {
            id: RuleId("demo-detailed".to_string()),
            name: "DetailedInquiry".to_string(),
            kind: RuleKind::MessageLength,
            operator: ConditionOperator::GreaterThan,
            operand: "200".to_string(),
            points: 10,
            is_active: true,
        },
        ScoringRule {
            id: RuleId("demo-referral".to_string()),
            name: "ReferralSource".to_string(),
            kind: RuleKind::Source,
            operator: ConditionOperator::Equals,
            operand: "referral".to_string(),
            points: 20,
            is_active: true,
        },
        ScoringRule {
            id: RuleId("demo-urgent".to_string()),
            name: "UrgentTone".to_string(),
            kind: RuleKind::Tone,
            operator: ConditionOperator::Equals,
            operand: "urgent".to_string(),
            points: 25,
            is_active: true,
        },
    ]
}

fn demo_rule_store() -> Result<InMemoryRuleStore, AppError> {
    InMemoryRuleStore::seeded(demo_rules())
        .map_err(|err| AppError::Scoring(funnel_ai::workflows::leads::LeadScoringError::Store(err)))
}

fn run_score_report(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        leads_csv,
        rules_json,
        breakdown,
    } = args;

    let rules = match rules_json {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<Vec<ScoringRule>>(&raw)
                .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?
        }
        None => demo_rules(),
    };

    let store = InMemoryRuleStore::seeded(rules).map_err(|err| {
        AppError::Scoring(funnel_ai::workflows::leads::LeadScoringError::Store(err))
    })?;
    let service = LeadScoringService::new(Arc::new(store), OutreachMatrix::default());

    let records = LeadCsvImporter::from_path(leads_csv)?;
    println!("Lead scoring report ({} lead(s))", records.len());

    for record in &records {
        let report = service.score_lead(&record.attributes)?;
        render_lead_report(&record.lead_id, &report, breakdown);
    }

    Ok(())
}

fn render_lead_report(lead_id: &str, report: &LeadScoreReport, breakdown: bool) {
    println!(
        "- {} | score {} | template {}",
        lead_id,
        report.total_score,
        report.template.label()
    );

    if breakdown {
        for (name, outcome) in &report.breakdown.entries {
            let marker = if outcome.applies { "+" } else { " " };
            println!(
                "    {marker} {name} ({}) -> {} point(s)",
                outcome.kind.label(),
                outcome.points
            );
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreLeadRequest {
    lead: LeadAttributes,
}

#[derive(Debug, Serialize)]
struct ScoreLeadResponse {
    #[serde(flatten)]
    report: LeadScoreReport,
}

#[derive(Debug, Deserialize)]
struct GenerateFunnelRequest {
    prompt: String,
    #[serde(default)]
    context: serde_json::Value,
    #[serde(default)]
    retries: Option<u32>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    deadline_ms: Option<u64>,
    #[serde(default)]
    save_to_library: bool,
}

#[derive(Debug, Serialize)]
struct GenerateFunnelResponse {
    funnel: FunnelStructure,
    warnings: Vec<String>,
    repaired: bool,
    attempts: u32,
    used_fallback: bool,
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn score_lead_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<ScoreLeadRequest>,
) -> Result<Json<ScoreLeadResponse>, AppError> {
    let report = state.leads.score_lead(&payload.lead)?;
    Ok(Json(ScoreLeadResponse { report }))
}

async fn generate_funnel_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<GenerateFunnelRequest>,
) -> Result<Json<GenerateFunnelResponse>, AppError> {
    let defaults = GenerationOptions::default();
    let options = GenerationOptions {
        retries: payload.retries.unwrap_or(defaults.retries),
        attempt_timeout: payload
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.attempt_timeout),
        deadline: payload.deadline_ms.map(Duration::from_millis),
        save_to_library: payload.save_to_library,
    };

    let request = GenerationRequest {
        prompt: payload.prompt,
        context: payload.context,
    };

    let outcome = state.funnels.generate(&request, &options).await?;
    Ok(Json(GenerateFunnelResponse {
        funnel: outcome.funnel,
        warnings: outcome.warnings,
        repaired: outcome.repaired,
        attempts: outcome.attempts,
        used_fallback: outcome.used_fallback,
    }))
}
