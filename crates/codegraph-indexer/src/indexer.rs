//! Batch and incremental indexing: walks a repository, parses each file
//! with the appropriate language analyzer, and writes the results into a
//! [`GraphStore`], skipping files whose content hash hasn't changed since
//! the last pass.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use codegraph_config::IndexerConfig;
use codegraph_core::{
    analyzers, CodeParser, GraphStore, ParserError, SupportedLanguage,
};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::discovery::discover_files;
use crate::error::{IndexError, IndexResult};

/// Emitted on the `new_entities` channel whenever a file produces fresh
/// entities the semantic layer hasn't embedded yet.
#[derive(Debug, Clone)]
pub struct NewEntitiesEvent {
    pub file_path: String,
    pub entity_ids: Vec<String>,
}

/// Summary of one indexing pass, mirroring the shape of the progress
/// counters a caller reports to the user or to `get_metrics`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexStats {
    pub total_discovered: usize,
    pub total_processed: usize,
    pub total_indexed: usize,
    pub total_skipped: usize,
    pub total_failed: usize,
    pub entities_written: usize,
    pub relationships_written: usize,
    pub elapsed_ms: u64,
}

/// Parses and stores source files into a [`GraphStore`], publishing a
/// `new_entities` event per successfully indexed file so the semantic
/// embedding layer can pick up work incrementally.
pub struct Indexer {
    store: GraphStore,
    parser: Arc<CodeParser>,
    config: IndexerConfig,
    new_entities_tx: broadcast::Sender<NewEntitiesEvent>,
}

impl Indexer {
    pub fn new(store: GraphStore, config: IndexerConfig) -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self {
            store,
            parser: Arc::new(CodeParser::new(256)),
            config,
            new_entities_tx: tx,
        }
    }

    /// Subscribe to fresh-entity notifications emitted as files are indexed.
    pub fn subscribe_new_entities(&self) -> broadcast::Receiver<NewEntitiesEvent> {
        self.new_entities_tx.subscribe()
    }

    /// The configured default exclude patterns, for callers composing their
    /// own pattern set on top of them (e.g. a tool-call's extra excludes).
    pub fn exclude_patterns(&self) -> &[String] {
        &self.config.exclude_patterns
    }

    /// Walk `root`, indexing every discoverable file whose content hash has
    /// changed since the last recorded pass. Equivalent to
    /// `index_directory_with(root, &self.config.exclude_patterns, false)`.
    pub fn index_directory(&self, root: &Path) -> IndexResult<IndexStats> {
        self.index_directory_with(root, &self.config.exclude_patterns, false)
    }

    /// Walk `root` with an explicit exclude-pattern set, optionally
    /// `force`-reprocessing every file regardless of its recorded hash
    /// (a full reindex rather than the default incremental one).
    pub fn index_directory_with(
        &self,
        root: &Path,
        exclude_patterns: &[String],
        force: bool,
    ) -> IndexResult<IndexStats> {
        let start = Instant::now();
        let files = discover_files(root, exclude_patterns);
        let large_codebase = files.len() >= self.config.large_codebase_file_threshold;
        if large_codebase {
            info!(
                file_count = files.len(),
                threshold = self.config.large_codebase_file_threshold,
                "large codebase detected, widening batch size"
            );
        }

        let mut stats = IndexStats {
            total_discovered: files.len(),
            ..Default::default()
        };

        let results: Vec<IndexResult<Option<FileOutcome>>> = files
            .par_iter()
            .map(|path| if force { self.index_one_forced(path) } else { self.index_one(path) })
            .collect();

        for (path, outcome) in files.iter().zip(results) {
            stats.total_processed += 1;
            match outcome {
                Ok(Some(file)) => {
                    self.store
                        .replace_file_entities(&file.file_path, &file.entities, &file.relationships)?;
                    self.store.upsert_file_record(&codegraph_core::model::FileRecord {
                        path: file.file_path.clone(),
                        hash: file.content_hash.clone(),
                        last_indexed: now(),
                        entity_count: file.entities.len() as u64,
                        reindex_count: 0,
                    })?;
                    stats.total_indexed += 1;
                    stats.entities_written += file.entities.len();
                    stats.relationships_written += file.relationships.len();

                    let entity_ids = file.entities.iter().map(|e| e.id.clone()).collect();
                    let _ = self.new_entities_tx.send(NewEntitiesEvent {
                        file_path: file.file_path.clone(),
                        entity_ids,
                    });
                }
                Ok(None) => stats.total_skipped += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to index file");
                    stats.total_failed += 1;
                }
            }
        }

        debug!(
            indexed = stats.total_indexed,
            skipped = stats.total_skipped,
            "index pass complete"
        );
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Re-index a single file regardless of its recorded hash. Used by
    /// filesystem-watch callers that already know the file changed.
    pub fn index_file(&self, path: &Path) -> IndexResult<()> {
        if let Some(file) = self.index_one_forced(path)? {
            self.store
                .replace_file_entities(&file.file_path, &file.entities, &file.relationships)?;
            self.store.upsert_file_record(&codegraph_core::model::FileRecord {
                path: file.file_path.clone(),
                hash: file.content_hash.clone(),
                last_indexed: now(),
                entity_count: file.entities.len() as u64,
                reindex_count: 0,
            })?;
            let entity_ids = file.entities.iter().map(|e| e.id.clone()).collect();
            let _ = self.new_entities_tx.send(NewEntitiesEvent {
                file_path: file.file_path,
                entity_ids,
            });
        }
        Ok(())
    }

    /// Remove a deleted file's entities/relationships and file record.
    pub fn remove_file(&self, path: &str) -> IndexResult<()> {
        self.store.delete_file(path)?;
        Ok(())
    }

    fn index_one(&self, path: &Path) -> IndexResult<Option<FileOutcome>> {
        let source = read_file(path)?;
        let digest = codegraph_core::file_digest(&source);
        let path_str = path.to_string_lossy().to_string();

        if self.store.is_up_to_date(&path_str, &digest).unwrap_or(false) {
            return Ok(None);
        }

        self.parse_file(path, &source, digest).map(Some)
    }

    fn index_one_forced(&self, path: &Path) -> IndexResult<Option<FileOutcome>> {
        let source = read_file(path)?;
        let digest = codegraph_core::file_digest(&source);
        self.parse_file(path, &source, digest).map(Some)
    }

    fn parse_file(&self, path: &Path, source: &[u8], digest: String) -> IndexResult<FileOutcome> {
        let language = SupportedLanguage::from_path(path).ok_or_else(|| IndexError::Parser {
            path: path.to_path_buf(),
            source: ParserError::UnsupportedLanguage(path.to_path_buf()),
        })?;

        let result = analyzers::analyze_file(&self.parser, path, source, language).map_err(|e| {
            IndexError::Parser {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        Ok(FileOutcome {
            file_path: result.file_path,
            entities: result.entities,
            relationships: result.relationships,
            content_hash: digest,
        })
    }
}

struct FileOutcome {
    file_path: String,
    entities: Vec<codegraph_core::model::Entity>,
    relationships: Vec<codegraph_core::model::Relationship>,
    content_hash: String,
}

fn read_file(path: &Path) -> IndexResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{RelationshipType, Storage};
    use std::fs;

    fn indexer() -> (Indexer, tempfile::TempDir) {
        let storage = Storage::open_in_memory().unwrap();
        let store = GraphStore::new(storage);
        let dir = tempfile::tempdir().unwrap();
        (Indexer::new(store, IndexerConfig::default()), dir)
    }

    #[test]
    fn indexes_new_file_and_skips_unchanged() {
        let (indexer, dir) = indexer();
        fs::write(dir.path().join("a.rs"), "fn foo() {}").unwrap();

        let stats = indexer.index_directory(dir.path()).unwrap();
        assert_eq!(stats.total_indexed, 1);
        assert_eq!(stats.total_failed, 0);

        let stats_again = indexer.index_directory(dir.path()).unwrap();
        assert_eq!(stats_again.total_skipped, 1);
        assert_eq!(stats_again.total_indexed, 0);
    }

    #[test]
    fn reindexes_after_content_change() {
        let (indexer, dir) = indexer();
        let path = dir.path().join("a.rs");
        fs::write(&path, "fn foo() {}").unwrap();
        indexer.index_directory(dir.path()).unwrap();

        fs::write(&path, "fn foo() {}\nfn bar() {}").unwrap();
        let stats = indexer.index_directory(dir.path()).unwrap();
        assert_eq!(stats.total_indexed, 1);
    }

    #[test]
    fn publishes_new_entities_event() {
        let (indexer, dir) = indexer();
        fs::write(dir.path().join("a.rs"), "fn foo() {}").unwrap();
        let mut rx = indexer.subscribe_new_entities();

        indexer.index_directory(dir.path()).unwrap();
        let event = rx.try_recv().unwrap();
        assert!(!event.entity_ids.is_empty());
    }

    #[test]
    fn indexing_materializes_placeholder_for_unresolved_include() {
        let storage = Storage::open_in_memory().unwrap();
        let store = GraphStore::new(storage);
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::new(store.clone(), IndexerConfig::default());

        fs::write(
            dir.path().join("test.c"),
            "#include <stdio.h>\nint add(int a, int b) { return a + b; }\n",
        )
        .unwrap();

        let stats = indexer.index_directory(dir.path()).unwrap();
        assert_eq!(stats.total_indexed, 1);
        assert_eq!(stats.total_failed, 0);

        let placeholders = store.list_file_entities("<external>").unwrap();
        let stdio = placeholders
            .iter()
            .find(|e| e.name == "<stdio.h>")
            .unwrap_or_else(|| panic!("expected an external placeholder entity for the unresolved include, got: {placeholders:?}"));

        let rels = store.list_entity_relationships(&stdio.id).unwrap();
        assert!(rels.iter().any(|r| r.to_id == stdio.id && matches!(r.relationship_type, RelationshipType::Imports)));
    }
}
