//! Log Analysis Agent Example
//!
//! Runs the agent once against a log directory and prints the transcript
//! followed by the structured report.
//!
//! Run with:
//!   OPENAI_API_KEY=your_key cargo run -p logan-log-agent --example analyze
//!
//! Or with a custom query:
//!   OPENAI_API_KEY=your_key cargo run -p logan-log-agent --example analyze -- "Your question here"
//!
//! Environment:
//!   LLM_PROVIDER   provider name (default: openai)
//!   MODEL_NAME     model id (default: the provider's default model)
//!   LOG_DIRECTORY  directory of *.log files (default: ./logs)

use logan_core::{truncate, HttpGateway, LlmConfig, Provider, Role};
use logan_log_agent::{LogAgent, LogAgentConfig, ReportSection};
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let provider: Provider = env::var("LLM_PROVIDER")
        .unwrap_or_else(|_| "openai".into())
        .parse()?;
    let model = env::var("MODEL_NAME").ok();
    let log_dir = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "./logs".into());

    // Get query from args or use default
    let query = env::args()
        .nth(1)
        .unwrap_or_else(|| "What errors are in server.log?".into());

    let llm_config = LlmConfig::default()
        .with_timeout(Duration::from_secs(60))
        .with_max_retries(2);
    let gateway = Arc::new(HttpGateway::from_env(provider, model, llm_config)?);

    let provider_config = gateway.provider_config();
    println!("Provider: {} ({})", provider_config.provider, provider_config.model);
    println!("Logs:     {}", log_dir);
    println!("Query:    {}", query);
    println!();

    let agent = LogAgent::for_log_dir(LogAgentConfig::default(), gateway, &log_dir)?;

    let start = Instant::now();
    let run = agent.run(&query).await?;

    println!("── Transcript ──");
    for message in &run.transcript {
        match message.role {
            Role::System => continue,
            Role::User => println!("[user] {}", message.content),
            Role::Assistant => {
                if !message.content.trim().is_empty() {
                    println!("[assistant] {}", truncate(&message.content, 300));
                }
                for call in &message.tool_calls {
                    println!("[tool call] {}({})", call.name, call.arguments);
                }
            }
            Role::Tool => println!("[tool result] {}", truncate(&message.content, 300)),
        }
    }
    println!();

    println!("── Report ──");
    for section in ReportSection::ALL {
        println!("{}: {}", section.title(), run.report.section(section));
    }
    println!();

    println!(
        "{} turns, {} model calls, {:.1}s{}",
        run.turns,
        run.model_calls(),
        start.elapsed().as_secs_f64(),
        if run.truncated { " (turn budget reached)" } else { "" }
    );

    Ok(())
}
