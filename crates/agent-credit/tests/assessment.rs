//! End-to-end assessments with a scripted model and a mocked scoring service

use agent_credit::reload::Snapshot;
use agent_credit::store::TableCache;
use agent_credit::{
    AgentSettings, ChannelObserver, CreditAssessment, Recommendation, RunResult, Stage,
    StaticSettings, prompts, tools,
};
use agent_llm::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ModelCapabilities, ModelHandle,
    Role, StopReason, TokenUsage, ToolCall,
};
use agent_prompt::JinjaTemplate;
use agent_runtime::{ModelTiers, ToolEventHandler};
use agent_utils::EnvSnapshot;
use async_trait::async_trait;
use mockall::mock;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Provider {}

    #[async_trait]
    impl LLMProvider for Provider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse>;
        fn name(&self) -> &str;
    }
}

const HEADER: &str = "id_empresa,sector,ingresos,ebitda,activos_totales,pasivos_totales,patrimonio,caja,\
gastos_intereses,cuentas_cobrar,inventario,cuentas_pagar,sector_risk_score,years_operating,ratio_mora,\
ratio_utilizacion,revenue_growth,margen_beneficio,score_buro,ebitda_margin,debt_to_equity,current_ratio";

const STRONG: &str = "1,Retail,5000000,1000000,8000000,3168000,4800000,900000,120000,600000,400000,350000,\
0.3,12,0.01,0.35,0.08,0.12,720,0.2,0.66,2.0";

const WEAK: &str = "2,Construction,2000000,80000,3000000,2600000,400000,20000,310000,900000,150000,800000,\
0.8,3,0.22,0.95,-0.15,0.01,410,0.04,6.5,0.6";

const QUALITATIVE_SCORE: u32 = 55;

struct Fixture {
    _dir: TempDir,
    settings: AgentSettings,
}

fn fixture(ml_api_url: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("companies.csv");
    std::fs::write(&csv, format!("{HEADER}\n{STRONG}\n{WEAK}\n")).unwrap();

    let settings = AgentSettings::from_env(&EnvSnapshot::from_pairs([
        ("COMPANY_DATA_PATH", csv.display().to_string()),
        ("ML_API_URL", ml_api_url.to_string()),
        ("ML_API_TIMEOUT_SECS", "2".to_string()),
    ]))
    .unwrap();
    settings.validate().unwrap();

    Fixture {
        _dir: dir,
        settings,
    }
}

async fn scorer(risk_level: &str, probability: f64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "risk_level": risk_level,
            "probability": probability,
        })))
        .mount(&server)
        .await;
    server
}

fn reply(message: Message, stop_reason: StopReason) -> CompletionResponse {
    CompletionResponse {
        message,
        stop_reason,
        usage: TokenUsage::default(),
    }
}

fn text(body: String) -> CompletionResponse {
    reply(Message::assistant(body), StopReason::EndTurn)
}

fn calls(calls: Vec<ToolCall>) -> CompletionResponse {
    reply(Message::assistant_with_tool_calls("", calls), StopReason::ToolUse)
}

fn tool_outputs(request: &CompletionRequest) -> Vec<String> {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(Message::text_content)
        .collect()
}

/// Score the CRO derives from the last scoring result, or a qualitative one
fn cro_score(request: &CompletionRequest) -> u32 {
    tool_outputs(request)
        .iter()
        .rev()
        .find_map(|output| {
            let (_, tail) = output.split_once("Probability of Default: ")?;
            tail.trim().parse::<f64>().ok()
        })
        .map_or(QUALITATIVE_SCORE, |probability| (probability * 100.0).round() as u32)
}

/// Plays every role the way a well-behaved model would
fn respond(request: &CompletionRequest, company_id: i64) -> CompletionResponse {
    let instructions = request.messages[0].text_content();
    let after_tools = request.messages.last().is_some_and(|m| m.role == Role::Tool);

    if instructions.contains("Senior Financial Analyst") {
        if after_tools {
            return text(format!(
                "### 4. Summary Opinion\nReviewed: {}",
                tool_outputs(request).join(" | ")
            ));
        }
        return calls(vec![
            ToolCall::new("fa-1", "fetch_company_data", json!({ "company_id": company_id })),
            ToolCall::new(
                "fa-2",
                "calculate_debt_to_equity",
                json!({ "total_liabilities": 3_168_000.0, "shareholders_equity": 4_800_000.0 }),
            ),
        ]);
    }

    if instructions.contains("Lead Data Scientist") {
        if after_tools {
            let output = tool_outputs(request).pop().unwrap_or_default();
            return text(format!("### Quantitative Risk Analysis (ML Engine)\n{output}"));
        }
        return calls(vec![ToolCall::new(
            "ds-1",
            "get_credit_risk_score",
            json!({ "company_id": company_id }),
        )]);
    }

    text(format!(
        "# Executive Credit Risk Assessment\n## 6. Final Directive & Conclusion\n**Official Recommendation:** REVIEW\n\nRisk Score: {}",
        cro_score(request)
    ))
}

fn scripted_tiers(company_id: i64) -> ModelTiers {
    let mut provider = MockProvider::new();
    provider
        .expect_complete()
        .returning(move |request| Ok(respond(&request, company_id)));

    let handle = ModelHandle::new("scripted-model", Arc::new(provider), ModelCapabilities::NATIVE);
    ModelTiers::new(Some(handle), None, None)
}

async fn assessment(fixture: &Fixture, company_id: i64) -> CreditAssessment {
    let settings = fixture.settings.clone();
    let registry = tools::build_registry(&settings, &TableCache::default()).unwrap();
    let snapshot = Snapshot::new(
        1,
        settings,
        prompts::builtin().unwrap(),
        scripted_tiers(company_id),
        registry,
    );

    CreditAssessment::builder(Arc::new(StaticSettings::new(snapshot)))
        .build()
        .await
        .unwrap()
}

fn tool_result<'a>(result: &'a RunResult, call_id: &str) -> &'a Message {
    result
        .messages
        .iter()
        .find(|m| m.tool_result_id() == Some(call_id))
        .unwrap()
}

/// Every tool-calling message is followed by one result per call, in order
fn assert_tool_results_follow_calls(messages: &[Message]) {
    for (index, message) in messages.iter().enumerate() {
        let calls = message.tool_calls();
        for (offset, call) in calls.iter().enumerate() {
            let answer = &messages[index + 1 + offset];
            assert_eq!(answer.role, Role::Tool);
            assert_eq!(answer.tool_result_id(), Some(call.id.as_str()));
        }
    }
}

#[derive(Default)]
struct RecordingEvents {
    started: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolEventHandler for RecordingEvents {
    async fn on_tool_start(&self, _id: &str, name: &str, _input: &Value) {
        self.started.lock().unwrap().push(name.to_string());
    }
}

#[tokio::test]
async fn test_strong_company_is_approved() {
    let server = scorer("Low", 0.2).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let result = assessment(&fixture, 1).await.assess("1").await.unwrap();

    assert!(result.completed);
    assert_eq!(result.company_id, "1");
    assert!(result.risk_score.unwrap() < 30.0);
    assert_eq!(result.recommendation, Some(Recommendation::Approve));
    assert_eq!(result.fallback_events, 0);
    assert!(result.report.starts_with("# Executive Credit Risk Assessment"));

    let record = tool_result(&result, "fa-1").text_content();
    assert!(record.starts_with(r#"{"id_empresa": 1, "sector": "Retail""#));
    assert_eq!(tool_result(&result, "fa-2").text_content(), "0.66");
    assert_eq!(
        tool_result(&result, "ds-1").text_content(),
        "Risk Level: Low, Probability of Default: 0.2"
    );
    assert_tool_results_follow_calls(&result.messages);
}

#[tokio::test]
async fn test_weak_company_is_rejected() {
    let server = scorer("High", 0.9).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let result = assessment(&fixture, 2).await.assess("2").await.unwrap();

    assert!(result.completed);
    assert!(result.risk_score.unwrap() > 70.0);
    assert_eq!(result.recommendation, Some(Recommendation::Reject));
    assert_tool_results_follow_calls(&result.messages);
}

#[tokio::test]
async fn test_scoring_payload_carries_record_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_partial_json(json!({
            "ingresos": 5_000_000.0,
            "years_operating": 12,
            "score_buro": 720,
            "current_ratio": 2.0,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "risk_level": "Low",
            "probability": 0.2,
        })))
        .expect(1)
        .mount(&server)
        .await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let result = assessment(&fixture, 1).await.assess("1").await.unwrap();
    assert_eq!(result.risk_score, Some(20.0));
}

#[tokio::test]
async fn test_unknown_company_does_not_stop_the_run() {
    let server = scorer("Low", 0.2).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let result = assessment(&fixture, 99).await.assess("99").await.unwrap();

    let lookup = tool_result(&result, "fa-1").text_content();
    assert!(lookup.starts_with("Error: Company ID"));
    assert_eq!(lookup, "Error: Company ID 99 not found.");

    // the analyst still closes its turn with a plain answer
    let analyst_answer = result
        .messages
        .iter()
        .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
        .unwrap();
    assert!(analyst_answer.text_content().starts_with("### 4. Summary Opinion"));
    assert_eq!(result.fallback_events, 0);
    assert!(result.completed);
    assert!(result.risk_score.is_some());
}

#[tokio::test]
async fn test_unreachable_scorer_degrades_to_qualitative_report() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let fixture = fixture(&format!("http://127.0.0.1:{port}/predict"));

    let result = assessment(&fixture, 1).await.assess("1").await.unwrap();

    let scoring = tool_result(&result, "ds-1").text_content();
    assert!(scoring.contains("Proceed with qualitative analysis only"));
    assert!(result.completed);
    assert!(result.report.contains("Risk Score: "));
    assert_eq!(result.risk_score, Some(f64::from(QUALITATIVE_SCORE)));
}

#[tokio::test]
async fn test_scoring_service_error_is_reported_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let result = assessment(&fixture, 1).await.assess("1").await.unwrap();

    assert_eq!(
        tool_result(&result, "ds-1").text_content(),
        "Error: The ML Model API returned an error: 500 Internal Server Error model not loaded"
    );
    assert!(result.completed);
}

#[tokio::test]
async fn test_observer_sees_every_stage_in_order() {
    let server = scorer("Low", 0.2).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));
    let events = Arc::new(RecordingEvents::default());

    let settings = fixture.settings.clone();
    let registry = tools::build_registry(&settings, &TableCache::default()).unwrap();
    let snapshot = Snapshot::new(1, settings, prompts::builtin().unwrap(), scripted_tiers(1), registry);
    let assessment = CreditAssessment::builder(Arc::new(StaticSettings::new(snapshot)))
        .tool_events(events.clone())
        .build()
        .await
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = assessment
        .assess_with_observer("1", &ChannelObserver::new(tx))
        .await
        .unwrap();

    let stages: Vec<Stage> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::FinancialAnalyst,
            Stage::FinancialTools,
            Stage::FinancialAnalyst,
            Stage::DataScientist,
            Stage::MlTools,
            Stage::DataScientist,
            Stage::Orchestrator,
        ]
    );
    assert_eq!(result.steps, 7);
    assert_eq!(
        *events.started.lock().unwrap(),
        vec!["fetch_company_data", "calculate_debt_to_equity", "get_credit_risk_score"]
    );
}

#[tokio::test]
async fn test_role_prompt_that_cannot_render_still_ends_in_report() {
    let server = scorer("Low", 0.2).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));

    let settings = fixture.settings.clone();
    let registry = tools::build_registry(&settings, &TableCache::default()).unwrap();
    let prompts = prompts::builtin().unwrap().with_template(
        JinjaTemplate::new(prompts::DATA_SCIENTIST, "Scientist for {{ company_id.x.y }}").unwrap(),
    );
    let snapshot = Snapshot::new(1, settings, prompts, scripted_tiers(1), registry);
    let assessment = CreditAssessment::builder(Arc::new(StaticSettings::new(snapshot)))
        .build()
        .await
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = assessment
        .assess_with_observer("1", &ChannelObserver::new(tx))
        .await
        .unwrap();

    assert!(result.completed);
    assert!(result.report.starts_with("# Executive Credit Risk Assessment"));
    assert_eq!(result.risk_score, Some(f64::from(QUALITATIVE_SCORE)));

    let scientist = result
        .messages
        .iter()
        .find(|m| m.text_content().starts_with("Error: Template 'data_scientist'"))
        .unwrap();
    assert_eq!(scientist.role, Role::Assistant);

    let stages: Vec<Stage> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::FinancialAnalyst,
            Stage::FinancialTools,
            Stage::FinancialAnalyst,
            Stage::DataScientist,
            Stage::Orchestrator,
        ]
    );
}

#[tokio::test]
async fn test_concurrent_runs_keep_separate_conversations() {
    let server = scorer("Low", 0.2).await;
    let fixture = fixture(&format!("{}/predict", server.uri()));
    let assessment = assessment(&fixture, 1).await;

    let (first, second) = tokio::join!(assessment.assess("1"), assessment.assess("1"));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.messages.len(), second.messages.len());
    assert_eq!(first.report, second.report);
    assert_eq!(first.messages[0], Message::user("Please assess credit risk for Company ID 1."));
}
