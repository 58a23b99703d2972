//! Demo binary: ingest a handful of documents, run a query, print the
//! fused results. This plays the role of the CLI/HTTP surface as a
//! thin, explicitly-labeled demo rather than a production wire API (§1
//! Non-goals — the authentication/rate-limiting REST surface is out of
//! scope).

use std::error::Error;

use rag_engine::{AddDocumentRequest, Engine, EngineConfig, SearchRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = Engine::new(EngineConfig::default());

    let documents = [
        ("/notes/postgres.md", "Postgres replication streams the write-ahead log to standby \
            servers for durability. Btree indexes speed up point lookups and range scans."),
        ("/notes/redis.md", "Redis keeps the working set in memory and persists it with RDB \
            snapshots or an append-only file. It is commonly used as a cache in front of Postgres."),
        ("/notes/kubernetes.md", "Kubernetes schedules containers onto nodes and restarts them \
            on failure. Deployments and ReplicaSets describe the desired number of running pods."),
    ];

    for (location, content) in documents {
        let (id, report) = engine
            .add_document(AddDocumentRequest::new(location, content))
            .await?;
        println!(
            "ingested {location} -> {id} ({} chunks, {} errors)",
            report.embeddings_count,
            report.errors.len()
        );
    }

    let query = "how does postgres handle durability";
    let response = engine
        .search(SearchRequest { query: query.to_string(), ..Default::default() })
        .await?;

    println!("\nquery: {query}");
    for hit in &response.results {
        println!("  [{:.4}] {} — {}", hit.rrf_score, hit.id, truncate(&hit.content, 80));
    }

    let enhanced = engine.enhance_prompt(query, Some(2)).await?;
    println!("\nenhanced prompt:\n{}", enhanced.enhanced_prompt);

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
