//! The analyze pipeline: retrieve, prompt, complete, repair, persist.
//!
//! Retrieval degrades to an empty reference list and never aborts the
//! request. The engine call is attempted once; engine, parse, and format
//! failures abort the request before any case is written. A case row is
//! written exactly once, with the match decision already computed.

use crate::cases::{CaseStore, NewCase};
use crate::types::{AnalyzeRequest, AnalyzeResponse, ReferenceCase};
use opsdiag_core::{AppError, AppResult, EngineSettings};
use opsdiag_knowledge::{RankedMatch, RetrievalService};
use opsdiag_llm::{LlmClient, LlmRequest};
use opsdiag_prompt::{
    build_diagnosis_prompt, extract_json, validate_answer, PromptContext, PromptReference,
};
use std::sync::Arc;

/// Minimum similarity score (percentage scale) for a knowledge entry to
/// count as a match or be surfaced as a reference case.
pub const MATCH_THRESHOLD: f32 = 5.0;

/// Number of nearest knowledge entries retrieved per request.
pub const TOP_K: usize = 3;

/// Retrieval-augmented diagnosis service.
pub struct DiagnosisService {
    retrieval: Arc<RetrievalService>,
    engine: Arc<dyn LlmClient>,
    cases: CaseStore,
    settings: EngineSettings,
}

impl DiagnosisService {
    pub fn new(
        retrieval: Arc<RetrievalService>,
        engine: Arc<dyn LlmClient>,
        cases: CaseStore,
        settings: EngineSettings,
    ) -> Self {
        Self {
            retrieval,
            engine,
            cases,
            settings,
        }
    }

    /// Run a full diagnosis for one fault report.
    ///
    /// Only the alert text drives retrieval; metrics and logs go to the
    /// prompt but would add noise to the similarity search.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> AppResult<AnalyzeResponse> {
        if request.alert_info.trim().is_empty() {
            return Err(AppError::Validation("alert_info must not be empty".to_string()));
        }

        let matches = self.retrieval.search(&request.alert_info, TOP_K).await;
        tracing::info!("Found {} matching knowledge entries", matches.len());

        let references: Vec<PromptReference> = matches
            .iter()
            .map(|m| PromptReference {
                title: m.title.clone(),
                category: m.category.clone(),
                symptoms: m.symptoms.clone(),
                solution: m.solution.clone(),
                score: format!("{:.2}", m.score),
            })
            .collect();

        let context = PromptContext::new(
            request.alert_info.clone(),
            request.metrics_info.clone(),
            request.log_info.clone(),
            references,
        );
        let prompt = build_diagnosis_prompt(&context)?;
        tracing::debug!("Final prompt for engine:\n{}", prompt);

        let llm_request = LlmRequest::new(prompt, self.settings.model.clone())
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);

        let response = self.engine.complete(&llm_request).await?;
        tracing::debug!("Engine response content: {}", response.content);

        let value = extract_json(&response.content)?;
        let answer = validate_answer(&value)?;

        let matched_knowledge_id = best_match(&matches);
        match (matched_knowledge_id, matches.first()) {
            (Some(id), Some(best)) => {
                tracing::info!("Matched knowledge {} with score: {:.2}%", id, best.score);
            }
            (None, Some(best)) => {
                tracing::info!("No knowledge matched, best score: {:.2}%", best.score);
            }
            _ => {}
        }

        // Persist the full parsed object, not just the validated fields, so
        // extra fields the model emits survive in the case record
        let analysis_result = serde_json::to_string(&value)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize answer: {}", e)))?;

        let case_id = self.cases.insert(&NewCase {
            alert_info: &request.alert_info,
            metrics_info: &request.metrics_info,
            log_info: &request.log_info,
            category: &answer.category,
            matched_knowledge_id,
            analysis_result: &analysis_result,
            solution: &answer.solution,
        })?;

        let reference_cases = matches
            .iter()
            .filter(|m| m.score > MATCH_THRESHOLD)
            .map(|m| ReferenceCase {
                id: m.id,
                title: m.title.clone(),
                category: m.category.clone(),
                symptoms: m.symptoms.clone(),
                solution: m.solution.clone(),
                similarity: format!("{:.2}%", m.score),
            })
            .collect();

        Ok(AnalyzeResponse {
            id: case_id,
            category: answer.category,
            analysis: answer.analysis,
            solution: answer.solution,
            matched_knowledge_id,
            reference_cases,
        })
    }

    /// The underlying case store.
    pub fn cases(&self) -> &CaseStore {
        &self.cases
    }

    /// The retrieval service in use.
    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }
}

/// Id of the nearest match when it clears the similarity threshold.
fn best_match(matches: &[RankedMatch]) -> Option<i64> {
    matches
        .first()
        .filter(|best| best.score > MATCH_THRESHOLD)
        .map(|best| best.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use opsdiag_core::AppResult;
    use opsdiag_knowledge::{create_embedder, KnowledgeEntry, LanceDbIndex};
    use opsdiag_llm::{LlmResponse, LlmUsage};
    use tempfile::TempDir;

    const DIM: usize = 384;

    /// Engine double that replays a scripted response.
    struct ScriptedEngine {
        response: AppResult<String>,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedEngine {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            match &self.response {
                Ok(content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: "scripted-v1".to_string(),
                    usage: LlmUsage::default(),
                }),
                Err(e) => Err(AppError::Engine(e.to_string())),
            }
        }
    }

    fn entry(id: i64, title: &str, symptoms: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            id,
            category: "network".to_string(),
            title: title.to_string(),
            symptoms: symptoms.to_string(),
            solution: "restart the service".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn service(dir: &TempDir, response: AppResult<String>) -> DiagnosisService {
        let embedder = create_embedder("trigram", "trigram-v1", None, DIM).unwrap();
        let index = LanceDbIndex::open(&dir.path().join("index"), "fault_knowledge", DIM)
            .await
            .unwrap();
        let retrieval = Arc::new(RetrievalService::new(embedder, Box::new(index)));
        let cases = CaseStore::open(&dir.path().join("cases.db")).unwrap();
        DiagnosisService::new(
            retrieval,
            Arc::new(ScriptedEngine { response }),
            cases,
            EngineSettings::default(),
        )
    }

    const GOOD_ANSWER: &str =
        r#"{"category": "network", "analysis": "switch port flapping", "solution": "replace cable"}"#;

    fn request(alert: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            alert_info: alert.to_string(),
            metrics_info: String::new(),
            log_info: String::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_alert_is_rejected_without_persisting() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Ok(GOOD_ANSWER.to_string())).await;

        let err = service.analyze(&request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.cases().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_analyze_with_empty_index_persists_unmatched_case() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Ok(GOOD_ANSWER.to_string())).await;

        let response = service.analyze(&request("CPU above 95%")).await.unwrap();
        assert_eq!(response.category, "network");
        assert_eq!(response.matched_knowledge_id, None);
        assert!(response.reference_cases.is_empty());

        let case = service.cases().get(response.id).unwrap().unwrap();
        assert_eq!(case.alert_info, "CPU above 95%");
        assert_eq!(case.matched_knowledge_id, None);
    }

    #[tokio::test]
    async fn test_analyze_links_best_match_above_threshold() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Ok(GOOD_ANSWER.to_string())).await;

        service
            .retrieval()
            .upsert_entry(&entry(11, "Port flapping", "packet loss on the uplink"))
            .await
            .unwrap();

        let response = service
            .analyze(&request("packet loss on the uplink"))
            .await
            .unwrap();

        // Identical text scores ~100, well above the threshold
        assert_eq!(response.matched_knowledge_id, Some(11));
        assert_eq!(response.reference_cases.len(), 1);
        assert_eq!(response.reference_cases[0].id, 11);
        assert!(response.reference_cases[0].similarity.ends_with('%'));

        let case = service.cases().get(response.id).unwrap().unwrap();
        assert_eq!(case.matched_knowledge_id, Some(11));
    }

    #[tokio::test]
    async fn test_low_similarity_match_is_not_linked() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Ok(GOOD_ANSWER.to_string())).await;

        // Disjoint vocabulary: the trigram embeddings share no terms, so the
        // similarity score lands near zero, below the threshold
        service
            .retrieval()
            .upsert_entry(&entry(21, "Kafka stall", "broker partition reassignment stalled"))
            .await
            .unwrap();

        let response = service
            .analyze(&request("printer toner cartridge empty upstairs"))
            .await
            .unwrap();

        assert_eq!(response.matched_knowledge_id, None);
        assert!(response.reference_cases.is_empty());

        // The diagnosis itself still persists, just without a link
        let case = service.cases().get(response.id).unwrap().unwrap();
        assert_eq!(case.matched_knowledge_id, None);
    }

    #[tokio::test]
    async fn test_extra_answer_fields_survive_in_case_record() {
        let dir = TempDir::new().unwrap();
        let with_extra = r#"{"category": "network", "analysis": "a", "solution": "s", "confidence": 0.9}"#;
        let service = service(&dir, Ok(with_extra.to_string())).await;

        let response = service.analyze(&request("CPU above 95%")).await.unwrap();

        let case = service.cases().get(response.id).unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&case.analysis_result).unwrap();
        assert_eq!(stored["confidence"], 0.9);
        assert_eq!(stored["category"], "network");
    }

    #[tokio::test]
    async fn test_engine_failure_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Err(AppError::Engine("upstream 502".to_string()))).await;

        let err = service.analyze(&request("disk alerts firing")).await.unwrap_err();
        assert!(matches!(err, AppError::Engine(_)));
        assert_eq!(service.cases().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_response_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, Ok("I cannot help with that.".to_string())).await;

        let err = service.analyze(&request("disk alerts firing")).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(service.cases().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fenced_response_is_repaired() {
        let dir = TempDir::new().unwrap();
        let fenced = format!("```json\n{}\n```", GOOD_ANSWER);
        let service = service(&dir, Ok(fenced)).await;

        let response = service.analyze(&request("CPU above 95%")).await.unwrap();
        assert_eq!(response.solution, "replace cable");
        assert_eq!(service.cases().count().unwrap(), 1);
    }
}
