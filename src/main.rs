//! nyaya CLI
//!
//! Thin adapter over the analysis engine: analyze a query, rate the result,
//! browse history, read stats. The engine does the work; this just parses
//! arguments and prints.
//!
//! Run with: nyaya analyze "my phone was hacked"

use anyhow::{Context, Result};
use nyaya::{Engine, EngineConfig, FeedbackSignal};
use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let engine = Engine::open(&db_path()?, EngineConfig::default())?;

    match args[1].as_str() {
        "analyze" => {
            let json_output = args.iter().any(|a| a == "--json");
            let session = flag_value(&args, "--session=").unwrap_or_else(|| "cli".to_string());
            let query: String = args[2..]
                .iter()
                .filter(|a| !a.starts_with("--"))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            run_analyze(&engine, &session, &query, json_output)
        }
        "feedback" => {
            let signal_raw = args.get(2).context("Usage: feedback <positive|negative>")?;
            let signal = FeedbackSignal::parse(signal_raw)?;
            let session = flag_value(&args, "--session=").unwrap_or_else(|| "cli".to_string());
            let outcome = match flag_value(&args, "--event=") {
                Some(event_id) => engine.submit_feedback(&session, &event_id, signal)?,
                None => engine.submit_feedback_last(&session, signal)?,
            };
            println!(
                "Recorded {} feedback for {}. New confidence: {:.0}%",
                signal.name(),
                outcome.event_id,
                outcome.new_effective_confidence * 100.0
            );
            Ok(())
        }
        "history" => {
            let session = flag_value(&args, "--session=");
            let limit = flag_value(&args, "--limit=").and_then(|v| v.parse().ok());
            let events = engine.history(session.as_deref(), limit.or(Some(20)), None)?;
            for event in events {
                println!(
                    "{}  [{}] {} -> {}/{} ({:.0}%)",
                    event.timestamp.format("%Y-%m-%d %H:%M"),
                    event.kind.name(),
                    event.raw_query,
                    event.domain_id,
                    event.subdomain_id,
                    event.effective_confidence * 100.0
                );
            }
            Ok(())
        }
        "search" => {
            let needle = args[2..]
                .iter()
                .filter(|a| !a.starts_with("--"))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            if needle.is_empty() {
                anyhow::bail!("Usage: search <substring>");
            }
            let events = engine.search_history(&needle)?;
            println!("{} matching event(s)", events.len());
            for event in events {
                println!("  {} -> {}", event.raw_query, event.domain_id);
            }
            Ok(())
        }
        "stats" => {
            let stats = engine.stats()?;
            println!("BNS sections:  {}", stats.bns_section_count);
            println!("IPC sections:  {}", stats.ipc_section_count);
            println!("CrPC sections: {}", stats.crpc_section_count);
            println!("Articles:      {}", stats.article_count);
            println!("Events logged: {}", stats.total_events);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn run_analyze(engine: &Engine, session: &str, query: &str, json_output: bool) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Usage: analyze <query> [--session=ID] [--json]");
    }

    let result = engine.analyze(session, query)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Query:      {}", result.raw_query);
    println!(
        "Domain:     {} / {} ({:.0}%)",
        result.domain_display,
        result.subdomain_display,
        result.effective_confidence * 100.0
    );
    if !result.alternatives.is_empty() {
        let alts: Vec<String> = result
            .alternatives
            .iter()
            .map(|a| format!("{} ({:.0}%)", a.domain_id, a.confidence * 100.0))
            .collect();
        println!("Also close: {}", alts.join(", "));
    }

    for (label, list) in [
        ("BNS", &result.sections.bns),
        ("IPC", &result.sections.ipc),
        ("CrPC", &result.sections.crpc),
    ] {
        if list.is_empty() {
            continue;
        }
        println!("\n{} sections:", label);
        for section in list {
            println!("  {} - {}", section.number, section.title);
        }
    }

    if !result.constitutional.is_empty() {
        println!("\nConstitutional articles:");
        for article in &result.constitutional {
            println!("  Article {} ({}%) - {}", article.number, article.percent, article.title);
        }
    }

    println!("\nEvent: {}  (rate with: feedback positive|negative)", result.event_id);
    if !result.persisted {
        eprintln!("warning: event was not persisted");
    }
    Ok(())
}

fn flag_value(args: &[String], prefix: &str) -> Option<String> {
    args.iter()
        .find(|a| a.starts_with(prefix))
        .map(|a| a[prefix.len()..].to_string())
}

fn db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nyaya");
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("nyaya.db"))
}

fn print_usage(bin: &str) {
    eprintln!("Usage: {} <command>", bin);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  analyze <query> [--session=ID] [--json]   Analyze a legal query");
    eprintln!("  feedback <positive|negative> [--event=ID] [--session=ID]");
    eprintln!("                                            Rate the last (or given) result");
    eprintln!("  history [--session=ID] [--limit=N]        List past queries, newest first");
    eprintln!("  search <substring>                        Search past queries");
    eprintln!("  stats                                     Corpus and log counters");
}
