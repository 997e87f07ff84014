use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tse_llm::{HttpLlmProvider, LlmProvider};
use tse_providers::{DocumentStore, HttpMarketDataProvider, HttpSearchProvider, HttpSocialDataProvider};
use tse_providers::{MarketDataProvider, SearchProvider, SocialDataProvider};
use tse_workflow::{GraphBuilder, InMemoryCheckpointer, Node, RunOutcome, StateFragment, END};

mod config;
mod renderer;

use config::Settings;

/// Registers every node from `data_prep_node` through `reporter_node`
/// plus the technical/fundamental/social fan-out and fan-in edges. The
/// interactive and direct entrypoints both build on top of this.
fn register_analysis_subgraph(mut builder: GraphBuilder, pipeline: Arc<tse_orchestrator::StockAnalysisPipeline>, llm: Arc<dyn LlmProvider>) -> GraphBuilder {
    const TECHNICAL_WORKERS: &[&str] = &[
        "trend_worker",
        "oscillator_worker",
        "volatility_worker",
        "volume_worker",
        "support_resistance_worker",
        "smart_money_worker",
    ];
    const FUNDAMENTAL_WORKERS: &[&str] = &[
        "balance_sheet_worker",
        "earnings_quality_worker",
        "valuation_worker",
        "codal_worker",
    ];
    const SOCIAL_WORKERS: &[&str] = &["twitter_worker", "sahamyab_worker", "news_worker"];

    builder = builder.add_node("data_prep_node", tse_nodes::DataPrepNode::new(pipeline));

    let workers: Vec<(&str, Arc<dyn Node>)> = vec![
        ("trend_worker", tse_nodes::trend_worker(llm.clone())),
        ("oscillator_worker", tse_nodes::oscillator_worker(llm.clone())),
        ("volatility_worker", tse_nodes::volatility_worker(llm.clone())),
        ("volume_worker", tse_nodes::volume_worker(llm.clone())),
        ("support_resistance_worker", tse_nodes::support_resistance_worker(llm.clone())),
        ("smart_money_worker", tse_nodes::smart_money_worker(llm.clone())),
        ("balance_sheet_worker", tse_nodes::balance_sheet_worker(llm.clone())),
        ("earnings_quality_worker", tse_nodes::earnings_quality_worker(llm.clone())),
        ("valuation_worker", tse_nodes::valuation_worker(llm.clone())),
        ("codal_worker", tse_nodes::codal_worker(llm.clone())),
        ("twitter_worker", tse_nodes::twitter_worker(llm.clone())),
        ("sahamyab_worker", tse_nodes::sahamyab_worker(llm.clone())),
        ("news_worker", tse_nodes::news_worker(llm.clone())),
    ];
    for (name, node) in workers {
        builder = builder.add_node(name, node);
    }

    builder = builder
        .add_node("technical_consensus", tse_nodes::technical_consensus(llm.clone()))
        .add_node("fundamental_consensus", tse_nodes::fundamental_consensus(llm.clone()))
        .add_node("social_news_consensus", tse_nodes::social_news_consensus(llm.clone()))
        .add_node("reporter_node", tse_nodes::ReporterNode::new(llm.clone()));

    let mut fan_out = Vec::new();
    fan_out.extend(TECHNICAL_WORKERS.iter().map(|s| s.to_string()));
    fan_out.extend(FUNDAMENTAL_WORKERS.iter().map(|s| s.to_string()));
    fan_out.extend(SOCIAL_WORKERS.iter().map(|s| s.to_string()));
    builder = builder.add_conditional_edge(
        "data_prep_node",
        Arc::new(move |_state: &tse_workflow::GraphState| fan_out.clone()),
    );

    for worker in TECHNICAL_WORKERS {
        builder = builder.add_edge(worker, "technical_consensus");
    }
    for worker in FUNDAMENTAL_WORKERS {
        builder = builder.add_edge(worker, "fundamental_consensus");
    }
    for worker in SOCIAL_WORKERS {
        builder = builder.add_edge(worker, "social_news_consensus");
    }

    builder
        .add_edge("technical_consensus", "reporter_node")
        .add_edge("fundamental_consensus", "reporter_node")
        .add_edge("social_news_consensus", "reporter_node")
        .add_edge("reporter_node", END)
}

fn register_introduction_subgraph(builder: GraphBuilder, llm: Arc<dyn LlmProvider>) -> GraphBuilder {
    builder
        .add_node("intro_agent_node", tse_nodes::IntroAgentNode::new(llm))
        .add_node("tool_node", tse_nodes::ToolNode::new())
        .add_node("input_node", tse_nodes::InputNode::new())
        .add_conditional_edge("intro_agent_node", tse_nodes::should_continue())
        .add_edge("tool_node", "data_prep_node")
        .add_conditional_edge("input_node", tse_nodes::after_input())
}

fn init_tracing(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_level.clone()));
    if settings.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_providers(settings: &Settings) -> (Arc<dyn MarketDataProvider>, Arc<dyn SocialDataProvider>, Arc<dyn SearchProvider>) {
    let market = Arc::new(HttpMarketDataProvider::new(settings.market_base_url.clone()));
    let social = Arc::new(HttpSocialDataProvider::new(settings.social_base_url.clone()));
    let search = Arc::new(HttpSearchProvider::new(
        settings.tweet_search_base_url.clone(),
        settings.tweet_search_api_key.clone(),
        settings.tweet_search_host.clone(),
        settings.search_base_url.clone(),
        settings.search_api_key.clone(),
    ));
    (market, social, search)
}

fn print_report(state: &serde_json::Map<String, serde_json::Value>, fallback_symbol: &str) {
    let symbol = state
        .get("symbol")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(fallback_symbol);
    let value = serde_json::Value::Object(state.clone());
    println!("{}", renderer::render_report(symbol, &value));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    init_tracing(&settings);

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));

    tracing::info!("starting Tehran Stock Exchange report generator");

    let (market, social, search) = build_providers(&settings);
    let store = DocumentStore::connect(&settings.store_url).await?;
    let pipeline = Arc::new(tse_orchestrator::StockAnalysisPipeline::new(market, social, search, store));
    let llm: Arc<dyn LlmProvider> = Arc::new(HttpLlmProvider::new(settings.llm.clone())?);
    let checkpointer = Arc::new(InMemoryCheckpointer::new());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let thread_id = "tse-cli-session";

    if let Some(symbol) = args.first() {
        let graph = register_analysis_subgraph(GraphBuilder::new().set_entry("data_prep_node"), pipeline, llm)
            .compile(checkpointer)?;
        let mut initial = StateFragment::new();
        initial.insert("symbol".to_string(), serde_json::json!(symbol));
        match graph.ainvoke(thread_id, initial).await? {
            RunOutcome::Completed(state) => print_report(&state, symbol),
            RunOutcome::Interrupted { .. } => unreachable!("direct entry graph never interrupts"),
        }
        return Ok(());
    }

    let graph = register_introduction_subgraph(
        register_analysis_subgraph(GraphBuilder::new(), pipeline, llm.clone()),
        llm,
    )
    .set_entry("intro_agent_node")
    .compile(checkpointer)?;

    let mut outcome = graph.ainvoke(thread_id, StateFragment::new()).await?;
    let mut last_symbol = String::new();
    loop {
        match outcome {
            RunOutcome::Completed(state) => {
                print_report(&state, &last_symbol);
                break;
            }
            RunOutcome::Interrupted { value, .. } => {
                print!("{}: ", value.as_str().unwrap_or("input"));
                std::io::stdout().flush().ok();
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
                let line = line.trim().to_string();
                last_symbol = line.clone();
                outcome = graph.resume(thread_id, serde_json::json!(line)).await?;
            }
        }
    }

    Ok(())
}
