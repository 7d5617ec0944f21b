mod helpers;

use std::sync::Arc;

use docent::embedding::EmbeddingProvider;
use docent::error::RagError;
use docent::ingest::{content_hash, Ingestor};
use helpers::{test_config, test_store, FlakyEmbedder, OfflineEmbedder, TopicEmbedder};

const GUIDE: &str = "Embabel is a JVM agent framework for building agents.\n\n\
    Install it with the setup script, then run the installation check.\n\n\
    Agents are deployed with Docker or Kubernetes; each deployment gets its own config.\n\n\
    State lives in a SQLite database so storage survives restarts.";

fn ingestor(store: &Arc<docent::store::VectorStore>) -> Ingestor {
    Ingestor::new(Arc::clone(store), Arc::new(TopicEmbedder), &test_config().chunking)
}

#[test]
fn reingesting_identical_text_adds_nothing() {
    let store = test_store();
    let ingestor = ingestor(&store);

    let first = ingestor.ingest("guide.md", GUIDE).unwrap();
    assert!(!first.skipped);
    assert!(first.chunks_total > 1, "expected several chunks, got {}", first.chunks_total);
    assert_eq!(first.chunks_stored, first.chunks_total);
    let count = store.chunk_count().unwrap();

    let second = ingestor.ingest("guide.md", GUIDE).unwrap();
    assert!(second.skipped);
    assert_eq!(second.chunks_stored, 0);
    assert_eq!(store.chunk_count().unwrap(), count);
}

#[test]
fn changed_text_is_a_new_generation() {
    let store = test_store();
    let ingestor = ingestor(&store);

    ingestor.ingest("guide.md", GUIDE).unwrap();
    let before = store.chunk_count().unwrap();

    let edited = format!("{GUIDE}\n\nA new closing paragraph.");
    let report = ingestor.ingest("guide.md", &edited).unwrap();
    assert!(!report.skipped);
    assert_eq!(report.content_hash, content_hash(&edited));
    assert!(store.chunk_count().unwrap() > before);
    assert!(store.is_ingested("guide.md", &content_hash(GUIDE)).unwrap());
}

#[test]
fn chunks_are_sequenced_and_annotated() {
    let store = test_store();
    let report = ingestor(&store).ingest("guide.md", GUIDE).unwrap();

    let query = TopicEmbedder.embed("embabel agent framework").unwrap();
    let hits = store.search(&query, 10, 0.0).unwrap();
    let first = hits
        .iter()
        .find(|r| r.chunk.sequence_index == 0)
        .expect("first chunk is retrievable");

    assert!(first.chunk.content.starts_with("Embabel is a JVM agent framework"));
    let metadata = first.chunk.metadata.as_ref().unwrap();
    assert_eq!(metadata["total_chunks"], report.chunks_total);

    let all = store.neighbors(&first.chunk, 3).unwrap();
    let indexes: Vec<usize> = all.iter().map(|c| c.sequence_index).collect();
    let expected: Vec<usize> = (0..report.chunks_total.min(4)).collect();
    assert_eq!(indexes, expected);
}

#[test]
fn blank_source_stores_nothing() {
    let store = test_store();
    let report = ingestor(&store).ingest("empty.md", "   \n\n  ").unwrap();
    assert_eq!(report.chunks_total, 0);
    assert_eq!(store.chunk_count().unwrap(), 0);
}

#[test]
fn embedding_outage_surfaces_as_connectivity_error() {
    let store = test_store();
    let ingestor = Ingestor::new(
        Arc::clone(&store),
        Arc::new(OfflineEmbedder),
        &test_config().chunking,
    );

    let err = ingestor.ingest("guide.md", GUIDE).unwrap_err();
    assert!(matches!(err, RagError::Connectivity { .. }));
    assert_eq!(store.chunk_count().unwrap(), 0);
}

#[test]
fn interrupted_ingestion_is_completed_by_a_retry() {
    let text: String = (0..200)
        .map(|i| format!("Paragraph {i} explains how embabel agents are deployed with docker."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let store = test_store();
    let chunking = test_config().chunking;

    let flaky = Ingestor::new(Arc::clone(&store), Arc::new(FlakyEmbedder::new(32)), &chunking);
    let err = flaky.ingest("long.md", &text).unwrap_err();
    assert!(matches!(err, RagError::Connectivity { .. }));
    let partial = store.chunk_count().unwrap();
    assert_eq!(partial, 32);
    assert!(!store.is_ingested("long.md", &content_hash(&text)).unwrap());

    let retry = ingestor(&store).ingest("long.md", &text).unwrap();
    assert!(!retry.skipped);
    assert!(retry.chunks_total > partial);
    assert_eq!(retry.chunks_stored, retry.chunks_total - partial);
    assert_eq!(store.chunk_count().unwrap(), retry.chunks_total);
    assert!(store.is_ingested("long.md", &content_hash(&text)).unwrap());

    let again = ingestor(&store).ingest("long.md", &text).unwrap();
    assert!(again.skipped);
}
