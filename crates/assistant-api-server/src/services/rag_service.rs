use crate::config::RagConfig;
use crate::document::TextChunker;
use crate::services::conversation::{RetrievalChunk, RetrievalProvider};
use crate::services::embedding_service::EmbeddingProvider;
use crate::utils::similarity::cosine_similarity;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct IndexedChunk {
    index: usize,
    content: String,
    embedding: Vec<f32>,
}

/// In-memory vector index over the knowledge document.
pub struct RagService {
    embedding_service: Arc<dyn EmbeddingProvider>,
    chunks: Vec<IndexedChunk>,
    top_k: usize,
}

impl RagService {
    /// Chunk and embed `text`. Fails if the text yields no chunks or any embedding call fails.
    pub async fn build(
        embedding_service: Arc<dyn EmbeddingProvider>,
        text: &str,
        config: &RagConfig,
    ) -> Result<Self> {
        let chunks = TextChunker::new(config.chunk_size, config.chunk_overlap).chunk(text)?;
        if chunks.is_empty() {
            anyhow::bail!("Knowledge document produced no chunks");
        }

        info!("Embedding {} knowledge chunks", chunks.len());

        let mut indexed = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = embedding_service
                .embed(&chunk.content)
                .await
                .with_context(|| format!("Failed to embed chunk {}", chunk.index))?;
            indexed.push(IndexedChunk {
                index: chunk.index,
                content: chunk.content,
                embedding,
            });
        }

        Ok(Self {
            embedding_service,
            chunks: indexed,
            top_k: config.retrieval_top_k,
        })
    }

    /// Load the knowledge base from the first existing candidate path.
    /// Returns `None` (RAG disabled) on any failure.
    pub async fn initialize(
        config: &RagConfig,
        embedding_service: Arc<dyn EmbeddingProvider>,
    ) -> Option<Arc<Self>> {
        if !config.enabled {
            info!("RAG disabled by configuration");
            return None;
        }

        let Some(path) = locate_knowledge_file(&config.knowledge_paths) else {
            warn!(
                "Knowledge file not found in {:?}, RAG disabled",
                config.knowledge_paths
            );
            return None;
        };

        let result = async {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::build(embedding_service, &text, config).await
        }
        .await;

        match result {
            Ok(service) => {
                info!(
                    "✅ Knowledge base ready: {} chunks from {}",
                    service.len(),
                    path.display()
                );
                Some(Arc::new(service))
            }
            Err(e) => {
                warn!("RAG initialization failed, RAG disabled: {:#}", e);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank all chunks against a query embedding, best first.
    fn rank(&self, query_embedding: &[f32]) -> Vec<RetrievalChunk> {
        let mut scored: Vec<RetrievalChunk> = self
            .chunks
            .iter()
            .filter_map(|chunk| match cosine_similarity(query_embedding, &chunk.embedding) {
                Ok(similarity) => Some(RetrievalChunk {
                    content: chunk.content.clone(),
                    similarity,
                    chunk_index: chunk.index,
                }),
                Err(e) => {
                    debug!("Skipping chunk {}: {}", chunk.index, e);
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(self.top_k);
        scored
    }
}

#[async_trait::async_trait]
impl RetrievalProvider for RagService {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalChunk>> {
        let query_embedding = self.embedding_service.embed(query).await?;
        let chunks = self.rank(&query_embedding);
        debug!("Retrieved {} chunks", chunks.len());
        Ok(chunks)
    }
}

pub fn locate_knowledge_file(candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding_service::MockEmbeddingProvider;
    use std::io::Write;

    // Maps text onto a 2-d "topic" vector: x = diabetes, y = hypertension.
    fn topic_embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|text| {
            let x = if text.contains("糖尿病") { 1.0 } else { 0.0 };
            let y = if text.contains("高血压") { 1.0 } else { 0.0 };
            Ok(vec![x, y, 0.1])
        });
        embedder
    }

    fn small_config(top_k: usize) -> RagConfig {
        RagConfig {
            chunk_size: 20,
            chunk_overlap: 0,
            retrieval_top_k: top_k,
            ..RagConfig::default()
        }
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let text = "糖尿病患者需要控制血糖和饮食。\n\n高血压患者需要减少盐的摄入量。";
        let service = RagService::build(Arc::new(topic_embedder()), text, &small_config(1))
            .await
            .unwrap();
        assert_eq!(service.len(), 2);

        let results = service.retrieve("高血压吃什么").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("高血压"));
    }

    #[tokio::test]
    async fn test_build_fails_when_embedding_fails() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed()
            .returning(|_| Err(anyhow::anyhow!("401 unauthorized")));

        let result = RagService::build(Arc::new(embedder), "一些内容", &small_config(3)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_initialize_without_file_disables_rag() {
        let config = RagConfig {
            knowledge_paths: vec!["/nonexistent/knowledge.md".to_string()],
            ..RagConfig::default()
        };
        let service = RagService::initialize(&config, Arc::new(MockEmbeddingProvider::new())).await;
        assert!(service.is_none());
    }

    #[tokio::test]
    async fn test_initialize_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "糖尿病患者需要控制血糖。").unwrap();

        let config = RagConfig {
            knowledge_paths: vec![
                "/nonexistent/knowledge.md".to_string(),
                file.path().display().to_string(),
            ],
            ..small_config(3)
        };
        let service = RagService::initialize(&config, Arc::new(topic_embedder()))
            .await
            .unwrap();
        assert_eq!(service.len(), 1);
    }
}
