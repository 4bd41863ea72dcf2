use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::transport::ReplyPayload;

/// Bibliographic metadata of the analyzed paper. Replaced wholesale when a
/// later payload supplies a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(default)]
    pub approach: String,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub citation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Findings {
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub citation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Limitations {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub citation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyClaim {
    pub claim: String,
    #[serde(default)]
    pub citation: String,
    #[serde(default)]
    pub confidence: f64,
}

/// The structured understanding of the paper. Arrives and is stored as one
/// atomic value; sub-fields are never merged across payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnderstandingResult {
    #[serde(default)]
    pub problem_statement: String,
    #[serde(default)]
    pub methodology: Methodology,
    #[serde(default)]
    pub results: Findings,
    #[serde(default)]
    pub limitations: Limitations,
    #[serde(default)]
    pub key_claims: Vec<KeyClaim>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyTakeaway {
    pub point: String,
    #[serde(default)]
    pub section_reference: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub key_points: Vec<KeyTakeaway>,
}

/// A related-paper recommendation from the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based, unique within a payload; defines display order
    pub rank: u32,
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "doi_or_arxiv_id")]
    pub paper_id: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub relevance_explanation: String,
    #[serde(default)]
    pub abstract_snippet: String,
}

impl Recommendation {
    /// Resolve the identifier prefix contract (`arXiv:` / `doi:`) to an
    /// external link. Identifiers without a known prefix get no link.
    pub fn external_url(&self) -> Option<String> {
        let id = self.paper_id.trim();
        if let Some(rest) = id.strip_prefix("arXiv:") {
            Some(format!("https://arxiv.org/abs/{}", rest.trim()))
        } else {
            id.strip_prefix("doi:")
                .map(|rest| format!("https://doi.org/{}", rest.trim()))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityValidation {
    #[serde(default)]
    pub quality_score: Option<f64>,
}

/// The bundled sub-results the coordinator delivers once remote processing
/// completes. Every sub-field is optional; an absent field means "no update".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResults {
    #[serde(default)]
    pub document_info: Option<DocumentInfo>,
    #[serde(default)]
    pub paper_analysis: Option<UnderstandingResult>,
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(default)]
    pub quality_validation: Option<QualityValidation>,
}

/// Boundary classification of a coordinator payload.
#[derive(Debug)]
pub enum PayloadOutcome {
    /// The payload carries a usable aggregated-results object
    Results(AggregatedResults),
    /// Conversational message only, no results
    MessageOnly,
    /// An aggregated-results object is present but does not deserialize
    Malformed,
}

impl PayloadOutcome {
    /// Parse the untrusted payload exactly once, here. The aggregator never
    /// reaches into raw JSON.
    pub fn classify(payload: &ReplyPayload) -> Self {
        let Some(value) = &payload.aggregated_results else {
            return PayloadOutcome::MessageOnly;
        };
        match serde_json::from_value::<AggregatedResults>(value.clone()) {
            Ok(mut aggregated) => {
                if let Some(recommendations) = aggregated.recommendations.take() {
                    match validate_ranks(recommendations) {
                        Some(sorted) => aggregated.recommendations = Some(sorted),
                        None => {
                            warn!("dropping recommendation list with non-dense ranks");
                        }
                    }
                }
                PayloadOutcome::Results(aggregated)
            }
            Err(e) => {
                warn!(error = %e, "aggregated results did not match the expected shape");
                PayloadOutcome::Malformed
            }
        }
    }
}

/// Ranks must be a dense unique 1..N; anything else rejects the whole list.
fn validate_ranks(mut recommendations: Vec<Recommendation>) -> Option<Vec<Recommendation>> {
    recommendations.sort_by_key(|r| r.rank);
    let dense = recommendations
        .iter()
        .enumerate()
        .all(|(i, r)| r.rank as usize == i + 1);
    dense.then_some(recommendations)
}

/// The session's presentation model: everything the UI renders below the
/// conversation. Sub-values are replaced wholesale as payloads arrive; a
/// partial payload never regresses what is already displayed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub document_info: Option<DocumentInfo>,
    pub understanding: Option<UnderstandingResult>,
    pub key_takeaways: Vec<KeyTakeaway>,
    pub recommendations: Vec<Recommendation>,
    pub quality_score: Option<f64>,
}

impl ResultSet {
    pub fn apply(&mut self, aggregated: AggregatedResults) {
        if let Some(info) = aggregated.document_info {
            self.document_info = Some(info);
        }
        if let Some(understanding) = aggregated.paper_analysis {
            self.understanding = Some(understanding);
        }
        if let Some(summary) = aggregated.summary {
            self.key_takeaways = summary.key_points;
        }
        if let Some(recommendations) = aggregated.recommendations {
            self.recommendations = recommendations;
        }
        if let Some(score) = aggregated.quality_validation.and_then(|q| q.quality_score) {
            self.quality_score = Some(score.clamp(0.0, 1.0));
        }
    }

    /// Non-null score means validation has completed.
    pub fn validation_complete(&self) -> bool {
        self.quality_score.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with(results: serde_json::Value) -> ReplyPayload {
        ReplyPayload {
            user_message: Some("done".to_string()),
            next_action: None,
            aggregated_results: Some(results),
        }
    }

    #[test]
    fn missing_results_classifies_as_message_only() {
        let payload = ReplyPayload {
            user_message: Some("What would you like to focus on?".to_string()),
            next_action: None,
            aggregated_results: None,
        };
        assert!(matches!(
            PayloadOutcome::classify(&payload),
            PayloadOutcome::MessageOnly
        ));
    }

    #[test]
    fn unparseable_results_classify_as_malformed() {
        let payload = payload_with(json!({ "recommendations": "not a list" }));
        assert!(matches!(
            PayloadOutcome::classify(&payload),
            PayloadOutcome::Malformed
        ));
    }

    #[test]
    fn recommendations_are_sorted_by_rank() {
        let payload = payload_with(json!({
            "recommendations": [
                { "rank": 3, "title": "C" },
                { "rank": 1, "title": "A" },
                { "rank": 2, "title": "B" }
            ]
        }));
        let PayloadOutcome::Results(aggregated) = PayloadOutcome::classify(&payload) else {
            panic!("expected results");
        };
        let recommendations = aggregated.recommendations.unwrap();
        let titles: Vec<&str> = recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn non_dense_ranks_drop_the_list_but_keep_the_rest() {
        let payload = payload_with(json!({
            "document_info": { "title": "Attention Is All You Need" },
            "recommendations": [
                { "rank": 1, "title": "A" },
                { "rank": 1, "title": "B" }
            ]
        }));
        let PayloadOutcome::Results(aggregated) = PayloadOutcome::classify(&payload) else {
            panic!("expected results");
        };
        assert!(aggregated.recommendations.is_none());
        assert_eq!(
            aggregated.document_info.unwrap().title,
            "Attention Is All You Need"
        );
    }

    #[test]
    fn partial_payload_does_not_regress_held_values() {
        let mut results = ResultSet::default();
        results.apply(AggregatedResults {
            document_info: Some(DocumentInfo {
                title: "Attention Is All You Need".to_string(),
                authors: vec!["Vaswani et al.".to_string()],
                abstract_text: String::new(),
                year: Some(2017),
            }),
            ..Default::default()
        });

        results.apply(AggregatedResults {
            recommendations: Some(vec![Recommendation {
                rank: 1,
                title: "BERT".to_string(),
                authors: String::new(),
                year: Some(2018),
                source: "arXiv".to_string(),
                paper_id: "arXiv:1810.04805".to_string(),
                relevance_score: 0.9,
                relevance_explanation: String::new(),
                abstract_snippet: String::new(),
            }]),
            ..Default::default()
        });

        assert_eq!(
            results.document_info.as_ref().unwrap().title,
            "Attention Is All You Need"
        );
        assert_eq!(results.recommendations.len(), 1);
    }

    #[test]
    fn identifier_prefix_selects_link_template() {
        let mut rec = Recommendation {
            rank: 1,
            title: "BERT".to_string(),
            authors: String::new(),
            year: None,
            source: String::new(),
            paper_id: "arXiv:1810.04805".to_string(),
            relevance_score: 0.0,
            relevance_explanation: String::new(),
            abstract_snippet: String::new(),
        };
        assert_eq!(
            rec.external_url().unwrap(),
            "https://arxiv.org/abs/1810.04805"
        );

        rec.paper_id = "doi:10.18653/v1/N19-1423".to_string();
        assert_eq!(
            rec.external_url().unwrap(),
            "https://doi.org/10.18653/v1/N19-1423"
        );

        rec.paper_id = "N19-1423".to_string();
        assert!(rec.external_url().is_none());
    }

    #[test]
    fn quality_score_is_clamped_to_unit_interval() {
        let mut results = ResultSet::default();
        results.apply(AggregatedResults {
            quality_validation: Some(QualityValidation {
                quality_score: Some(1.7),
            }),
            ..Default::default()
        });
        assert_eq!(results.quality_score, Some(1.0));
        assert!(results.validation_complete());
    }
}
