use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use deskpilot::agent::engine::Orchestrator;
use deskpilot::agent::events::{AgentEvent, EventSink};
use deskpilot::agent::signals::LoopSignals;
use deskpilot::config::load_config;
use deskpilot::errors::{DeskPilotError, DeskPilotResult};
use deskpilot::executor::executor::ActionExecutor;
use deskpilot::executor::input::EnigoDriver;
use deskpilot::llm::client::HttpModelClient;
use deskpilot::perception::capture::{PrimaryMonitorCapture, ScreenSource};

#[tokio::main]
async fn main() -> DeskPilotResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;

    let client = Arc::new(HttpModelClient::new(&config.model)?);
    tracing::info!(server = %config.model.base_url, "waiting for model server");
    if !client.wait_for_server(Duration::from_secs(30)).await {
        return Err(DeskPilotError::Inference(format!(
            "model server at {} did not become healthy",
            config.model.base_url
        )));
    }

    let screen = Arc::new(PrimaryMonitorCapture::new()?);
    let (width, height) = screen.screen_size();
    tracing::info!(width, height, "primary monitor");

    let driver = Box::new(EnigoDriver::new()?);
    let executor = ActionExecutor::new(driver, width, height, &config.executor);

    let (signals, handle) = LoopSignals::new();
    let events = EventSink::new();
    spawn_event_logger(&events);

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.abort();
            }
        });
    }

    let mut orchestrator = Orchestrator::new(client, screen, executor, &config, signals, events);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let result = orchestrator.run_task(&args.join(" ")).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        std::process::exit(if result.success { 0 } else { 1 });
    }

    println!("deskpilot ready. Type a task and press enter; an empty line quits.");
    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let task = line.trim();
        if task.is_empty() {
            break;
        }
        let result = orchestrator.run_task(task).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

/// Mirrors the event stream into the log so a headless run is observable.
fn spawn_event_logger(events: &EventSink) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AgentEvent::Status { state, detail }) => {
                    tracing::info!(?state, detail = detail.as_deref().unwrap_or(""), "agent status");
                }
                Ok(AgentEvent::Thought { text }) => tracing::info!(%text, "agent thought"),
                Ok(AgentEvent::Action { kind, target }) => {
                    tracing::info!(%kind, %target, "agent action");
                }
                Ok(AgentEvent::Frame { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
