use std::path::PathBuf;
use std::sync::Arc;

use code_stats_pulse::{
    AgentConfig, ConfigHandle, HttpTransport, KeyEvent, KeyEventKind, Language, LogStatusObserver,
    PulseAgent,
};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of host input, e.g.
/// `{"kind":"keyup","keystrokes":"^a","grammar":"Rust"}`.
#[derive(Debug, Deserialize)]
struct HostEvent {
    kind: KeyEventKind,
    keystrokes: String,
    #[serde(default)]
    grammar: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("pulse agent failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let _ = dotenvy::dotenv();
    code_stats_pulse::init_tracing();

    let mut config_path: Option<PathBuf> = None;
    let mut flush_on_exit = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            print_help();
            return Ok(());
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            config_path = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--config" {
            let value = args
                .next()
                .ok_or_else(|| "--config requires a value".to_string())?;
            config_path = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--flush-on-exit" {
            flush_on_exit = true;
            continue;
        }
        return Err(format!("unknown argument '{arg}'. Use --help for usage"));
    }

    let mut config = match &config_path {
        Some(path) => AgentConfig::load(path).map_err(|e| e.to_string())?,
        None => AgentConfig::default(),
    };
    config.apply_env_overrides();
    let delivery_enabled = config.delivery_target().is_some();

    let transport = HttpTransport::new(&config).map_err(|e| e.to_string())?;
    let config = ConfigHandle::new(config).map_err(|e| e.to_string())?;
    if !delivery_enabled {
        tracing::warn!("api key or api url not configured, pulses will be kept in memory only");
    }
    tracing::info!(user_agent = transport.user_agent(), "starting pulse agent");

    let (handle, task) =
        PulseAgent::spawn(config, Arc::new(transport), Arc::new(LogStatusObserver));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("failed to read stdin: {e}"))?
    {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: HostEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("skipping malformed event: {e}");
                continue;
            }
        };
        let language = event.grammar.as_deref().map(Language::from_grammar_name);
        handle
            .observe(KeyEvent::new(event.kind, event.keystrokes), language)
            .await
            .map_err(|e| e.to_string())?;
    }

    if flush_on_exit {
        handle.flush().await.map_err(|e| e.to_string())?;
    }
    handle.shutdown().await.map_err(|e| e.to_string())?;
    task.await.map_err(|e| format!("agent task failed: {e}"))?;
    Ok(())
}

fn print_help() {
    println!("Keystroke experience agent");
    println!();
    println!("Reads JSON-lines key events from stdin and delivers experience pulses.");
    println!();
    println!("Usage:");
    println!("  pulse_agent [options] < events.jsonl");
    println!();
    println!("Options:");
    println!("  --config <path>    JSON config file (apiKey, apiUrl, debounceMs, ...)");
    println!("  --flush-on-exit    Send the open pulse before exiting");
    println!();
    println!("Environment:");
    println!("  CODE_STATS_API_KEY, CODE_STATS_API_URL, CODE_STATS_DEBOUNCE_MS,");
    println!("  CODE_STATS_REPEAT_INTERVAL_MS, CODE_STATS_FAILURE_POLICY, RUST_LOG");
}
