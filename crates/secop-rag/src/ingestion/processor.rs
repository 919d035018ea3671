//! Ingestion pipeline orchestration

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::providers::Vectorizer;
use crate::storage::VectorStore;
use crate::types::{CanonicalEntry, IngestReport, Passage};

use super::canonical::{Canonicalizer, Record};
use super::chunker::{collapse_whitespace, TextChunker};

/// Composes canonicalization, chunking, vectorization and storage
#[derive(Clone)]
pub struct Ingestor {
    canonicalizer: Canonicalizer,
    record_chunker: TextChunker,
    document_chunker: TextChunker,
    vectorizer: Vectorizer,
    store: VectorStore,
}

impl Ingestor {
    /// Create a new ingestion pipeline
    pub fn new(chunking: &ChunkingConfig, vectorizer: Vectorizer, store: VectorStore) -> Result<Self> {
        if vectorizer.dimensions() != store.dimensions() {
            return Err(Error::config(format!(
                "vectorizer produces {}-dimensional vectors but the store holds {}",
                vectorizer.dimensions(),
                store.dimensions()
            )));
        }

        Ok(Self {
            canonicalizer: Canonicalizer::default(),
            record_chunker: TextChunker::new(chunking.record)?,
            document_chunker: TextChunker::new(chunking.document)?,
            vectorizer,
            store,
        })
    }

    /// Use a different field schema for records
    pub fn with_canonicalizer(mut self, canonicalizer: Canonicalizer) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    /// Canonicalize, store and index every record
    ///
    /// Records are numbered from 1 for synthesized ids. A provider or
    /// configuration error aborts the run; other failures are counted.
    pub async fn ingest_records<R: Record + Sync>(&self, records: &[R]) -> Result<IngestReport> {
        self.run_records(records, true).await
    }

    /// Canonicalize and store records without computing passages
    pub async fn store_records<R: Record + Sync>(&self, records: &[R]) -> Result<IngestReport> {
        self.run_records(records, false).await
    }

    async fn run_records<R: Record + Sync>(&self, records: &[R], index: bool) -> Result<IngestReport> {
        let mut report = IngestReport {
            received: records.len(),
            ..Default::default()
        };

        for (i, record) in records.iter().enumerate() {
            let entry = self.canonicalizer.derive(record, i + 1);
            let unique_id = entry.unique_id.clone();

            match self.write_record(entry, index).await {
                Ok(Some(passages)) => {
                    report.entries_written += 1;
                    report.passages_written += passages;
                }
                Ok(None) => {
                    report.entries_written += 1;
                    if index {
                        report.skipped_empty += 1;
                    }
                }
                Err(e) if e.is_fatal() => {
                    warn!(unique_id = %unique_id, error = %e, "Aborting ingestion run");
                    return Err(e);
                }
                Err(e) => {
                    warn!(unique_id = %unique_id, error = %e, "Failed to ingest record");
                    report.failed += 1;
                }
            }

            if (i + 1) % 100 == 0 {
                info!(processed = i + 1, total = records.len(), "Ingestion progress");
            }
        }

        info!(
            received = report.received,
            entries = report.entries_written,
            passages = report.passages_written,
            skipped = report.skipped_empty,
            failed = report.failed,
            "Record ingestion complete"
        );
        Ok(report)
    }

    /// `Some(passages)` when indexed, `None` when there was nothing to index
    ///
    /// Vectors are computed before anything is written, so a provider
    /// failure leaves the previous entry and passages untouched.
    async fn write_record(&self, entry: CanonicalEntry, index: bool) -> Result<Option<usize>> {
        if !index {
            self.store.run(move |store| store.put_entry(&entry)).await?;
            return Ok(None);
        }

        let indexed = entry.has_index_text();
        let passages = self.embed_chunks(&entry.unique_id, self.record_chunks(&entry)).await?;
        let written = self.write_entry(entry, passages).await?;
        Ok(indexed.then_some(written))
    }

    /// Chunk, embed and store the passages of an already stored entry
    pub async fn index_entry(&self, entry: &CanonicalEntry) -> Result<usize> {
        let passages = self.embed_chunks(&entry.unique_id, self.record_chunks(entry)).await?;
        let group_id = entry.unique_id.clone();
        self.store
            .run(move |store| store.put_passages(&group_id, &passages))
            .await
    }

    /// Store a free-text document as an entry and index its passages
    pub async fn ingest_document(&self, document_id: &str, text: &str) -> Result<usize> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(Error::config("document id must not be empty"));
        }

        let entry = CanonicalEntry::new(document_id, text, collapse_whitespace(text));
        let chunks = self.document_chunker.split(text);
        let passages = self.embed_chunks(document_id, chunks).await?;
        let written = self.write_entry(entry, passages).await?;
        info!(document_id, passages = written, "Document ingested");
        Ok(written)
    }

    /// Index every stored entry that has no passages yet
    pub async fn backfill_passages(&self) -> Result<usize> {
        self.backfill_passages_with(|_, _| {}).await
    }

    /// As `backfill_passages`, reporting `(done, total)` after each entry
    pub async fn backfill_passages_with<F>(&self, mut progress: F) -> Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let pending = self.store.run(|store| store.entries_without_passages()).await?;
        if pending.is_empty() {
            info!("Every entry already has passages");
            return Ok(0);
        }

        let total = pending.len();
        info!(entries = total, "Backfilling passages");

        let mut written = 0usize;
        for (i, entry) in pending.iter().enumerate() {
            if entry.has_index_text() {
                match self.index_entry(entry).await {
                    Ok(n) => written += n,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!(unique_id = %entry.unique_id, error = %e, "Failed to index entry"),
                }
            }
            progress(i + 1, total);
        }

        info!(passages = written, "Backfill complete");
        Ok(written)
    }

    fn record_chunks(&self, entry: &CanonicalEntry) -> Vec<String> {
        let mut chunks = self.record_chunker.split(&entry.index_text);
        if chunks.is_empty() && entry.has_index_text() {
            chunks.push(entry.index_text.clone());
        }
        chunks
    }

    async fn embed_chunks(&self, group_id: &str, chunks: Vec<String>) -> Result<Vec<Passage>> {
        let vectors = self.vectorizer.embed(&chunks).await?;
        debug!(group_id, chunks = chunks.len(), "Embedded chunks");
        Ok(Passage::zip(chunks, vectors))
    }

    async fn write_entry(&self, entry: CanonicalEntry, passages: Vec<Passage>) -> Result<usize> {
        self.store
            .run(move |store| store.put_entry_with_passages(&entry, &passages))
            .await
    }
}

/// Read records from a JSON file holding one object or an array of objects
pub fn load_records_file<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&raw)?;

    let records = match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(Error::config(format!(
                "{} must hold a JSON object or an array of objects",
                path.display()
            )))
        }
    };

    info!(path = %path.display(), records = records.len(), "Loaded records file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkWindow;
    use crate::providers::{EmbeddingProvider, FallbackConfig, VectorizerMode};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const DIMS: usize = 32;

    fn ingestor() -> Ingestor {
        let vectorizer =
            Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: DIMS })).unwrap();
        Ingestor::new(
            &ChunkingConfig::default(),
            vectorizer,
            VectorStore::in_memory(DIMS).unwrap(),
        )
        .unwrap()
    }

    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::provider("connection refused"))
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    /// Answers the first `healthy_calls` batches, then fails
    struct FlakyProvider {
        healthy_calls: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_calls {
                return Err(Error::provider("down"));
            }
            Ok(texts.iter().map(|_| vec![1.0; DIMS]).collect())
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.calls.load(Ordering::SeqCst) < self.healthy_calls)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn flaky_ingestor(healthy_calls: usize) -> Ingestor {
        let provider = FlakyProvider {
            healthy_calls,
            calls: AtomicUsize::new(0),
        };
        Ingestor::new(
            &ChunkingConfig::default(),
            Vectorizer::from_provider(Arc::new(provider)),
            VectorStore::in_memory(DIMS).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_entry_and_passages() {
        let ingestor = flaky_ingestor(1);
        ingestor
            .ingest_records(&[json!({"id_contrato": "C-1", "nombre_entidad": "OLD"})])
            .await
            .unwrap();

        let err = ingestor
            .ingest_records(&[json!({"id_contrato": "C-1", "nombre_entidad": "NEW"})])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        let entry = ingestor.store.get_entry("C-1").unwrap().unwrap();
        assert_eq!(entry.index_text, "Entidad: OLD");
        assert!(entry.full_text.contains("OLD"));
        let passages = ingestor.store.fetch_all_vectors().unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "Entidad: OLD");
    }

    #[tokio::test]
    async fn test_failed_document_reingest_keeps_previous_text() {
        let ingestor = flaky_ingestor(1);
        ingestor.ingest_document("doc-1", "Versión uno.").await.unwrap();

        assert!(ingestor.ingest_document("doc-1", "Versión dos.").await.is_err());
        let entry = ingestor.store.get_entry("doc-1").unwrap().unwrap();
        assert_eq!(entry.full_text, "Versión uno.");
        assert_eq!(ingestor.store.fetch_all_vectors().unwrap()[0].text, "Versión uno.");
    }

    #[tokio::test]
    async fn test_store_only_reload_with_new_text_awaits_backfill() {
        let ingestor = ingestor();
        ingestor
            .ingest_records(&[json!({"id_contrato": "C-1", "nombre_entidad": "OLD"})])
            .await
            .unwrap();

        ingestor
            .store_records(&[json!({"id_contrato": "C-1", "nombre_entidad": "NEW"})])
            .await
            .unwrap();
        assert_eq!(ingestor.store.passage_count("C-1").unwrap(), 0);

        assert_eq!(ingestor.backfill_passages().await.unwrap(), 1);
        assert_eq!(ingestor.store.fetch_all_vectors().unwrap()[0].text, "Entidad: NEW");
    }

    #[tokio::test]
    async fn test_custom_schema() {
        use crate::ingestion::{CanonicalSchema, Canonicalizer, FieldGroup};

        const GROUPS: &[FieldGroup] = &[FieldGroup {
            label: "Proveedor",
            fields: &["proveedor_adjudicado"],
        }];
        let schema = CanonicalSchema {
            id_fields: &["nit"],
            id_prefix: "PRV",
            groups: GROUPS,
        };
        let ingestor = ingestor().with_canonicalizer(Canonicalizer::new(schema));

        ingestor
            .ingest_records(&[json!({"proveedor_adjudicado": "Acme S.A.S."})])
            .await
            .unwrap();
        let entry = ingestor.store.get_entry("PRV-000001").unwrap().unwrap();
        assert_eq!(entry.index_text, "Proveedor: Acme S.A.S.");
    }

    #[tokio::test]
    async fn test_ingest_records_report() {
        let ingestor = ingestor();
        let records = vec![
            json!({"numero_del_proceso": "P-1", "nombre_entidad": "SENA"}),
            json!({"valor": 10}),
            json!({"objeto_del_contrato": "Mantenimiento de vías"}),
        ];

        let report = ingestor.ingest_records(&records).await.unwrap();
        assert_eq!(
            report,
            IngestReport {
                received: 3,
                entries_written: 3,
                passages_written: 2,
                skipped_empty: 1,
                failed: 0,
            }
        );

        let store = &ingestor.store;
        assert!(store.get_entry("P-1").unwrap().is_some());
        assert!(store.get_entry("SEC-000002").unwrap().is_some());
        assert_eq!(store.passage_count("SEC-000003").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reingest_replaces_passages() {
        let ingestor = ingestor();
        let long = "palabra ".repeat(200);
        ingestor
            .ingest_records(&[json!({"id_contrato": "C-1", "descripcion_del_proceso": long})])
            .await
            .unwrap();
        assert!(ingestor.store.passage_count("C-1").unwrap() > 1);

        ingestor
            .ingest_records(&[json!({"id_contrato": "C-1", "nombre_entidad": "SENA"})])
            .await
            .unwrap();
        assert_eq!(ingestor.store.passage_count("C-1").unwrap(), 1);
        assert_eq!(ingestor.store.count_entries().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_aborts_run() {
        let ingestor = Ingestor::new(
            &ChunkingConfig::default(),
            Vectorizer::from_provider(Arc::new(DownProvider)),
            VectorStore::in_memory(DIMS).unwrap(),
        )
        .unwrap();

        let err = ingestor
            .ingest_records(&[json!({"nombre_entidad": "SENA"})])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_store_then_backfill() {
        let ingestor = ingestor();
        let records = vec![
            json!({"codigo_de_secop": "A", "nombre_entidad": "Alcaldía"}),
            json!({"codigo_de_secop": "B"}),
        ];
        let report = ingestor.store_records(&records).await.unwrap();
        assert_eq!(report.entries_written, 2);
        assert_eq!(report.passages_written, 0);
        assert_eq!(ingestor.store.stats().unwrap().passages, 0);

        let mut seen = Vec::new();
        let written = ingestor
            .backfill_passages_with(|done, total| seen.push((done, total)))
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(seen, vec![(1, 2), (2, 2)]);

        // B has no index text and stays pending; A is done
        assert_eq!(ingestor.backfill_passages().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_document() {
        let ingestor = ingestor();
        let text = "Cláusula primera.\n\n".repeat(120);
        let written = ingestor.ingest_document("doc-1", &text).await.unwrap();
        assert!(written > 1);

        let entry = ingestor.store.get_entry("doc-1").unwrap().unwrap();
        assert_eq!(entry.full_text, text);
        assert!(!entry.index_text.contains('\n'));

        assert!(matches!(
            ingestor.ingest_document("  ", "x").await,
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let vectorizer =
            Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: 16 })).unwrap();
        let result = Ingestor::new(
            &ChunkingConfig::default(),
            vectorizer,
            VectorStore::in_memory(32).unwrap(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_window_rejected() {
        let mut chunking = ChunkingConfig::default();
        chunking.record = ChunkWindow::new(50, 60);
        let vectorizer =
            Vectorizer::new(VectorizerMode::Fallback(FallbackConfig { dimensions: DIMS })).unwrap();
        let result = Ingestor::new(&chunking, vectorizer, VectorStore::in_memory(DIMS).unwrap());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_records_file() {
        let dir = tempfile::tempdir().unwrap();

        let array = dir.path().join("array.json");
        std::fs::write(&array, r#"[{"id_contrato": "1"}, {"id_contrato": "2"}]"#).unwrap();
        assert_eq!(load_records_file(&array).unwrap().len(), 2);

        let single = dir.path().join("single.json");
        let mut f = std::fs::File::create(&single).unwrap();
        write!(f, r#"{{"id_contrato": "1"}}"#).unwrap();
        assert_eq!(load_records_file(&single).unwrap().len(), 1);

        let scalar = dir.path().join("scalar.json");
        std::fs::write(&scalar, "42").unwrap();
        assert!(matches!(load_records_file(&scalar), Err(Error::Config(_))));
    }
}
