use crate::domain::topics::TopicId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of a conversation on the remote voice platform. The record is
/// created as `processing` and moves exactly once to `done` or `error`.
/// Doubles as the column type for stored analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "conversation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Processing,
    Done,
    Error,
}

impl ConversationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversationStatus::Processing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time_in_call_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMetadata {
    #[serde(default)]
    pub start_time_unix_secs: Option<i64>,
    #[serde(default)]
    pub call_duration_secs: Option<i64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub termination_reason: Option<String>,
}

/// A single topic's collected result: a 0-100 score plus the agent's
/// rationale. Either side may be missing for a topic the conversation never
/// reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCollectionResult {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationAnalysis {
    #[serde(default)]
    pub transcript_summary: Option<String>,
    #[serde(default)]
    pub data_collection_results: BTreeMap<String, Option<DataCollectionResult>>,
}

/// The remote conversation record. Fetched, never written: the platform owns
/// it and mutates `status` asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub status: ConversationStatus,
    #[serde(default)]
    pub transcript: Vec<ConversationTurn>,
    #[serde(default)]
    pub metadata: Option<ConversationMetadata>,
    #[serde(default)]
    pub analysis: Option<ConversationAnalysis>,
}

/// Per-topic results validated against the catalog. The remote payload keys
/// results by free-form topic strings; this is the only place those strings
/// are interpreted. Unknown keys are dropped here, loudly.
#[derive(Debug, Clone, Default)]
pub struct TopicScores {
    scores: BTreeMap<TopicId, DataCollectionResult>,
}

impl TopicScores {
    pub fn from_analysis(analysis: &ConversationAnalysis) -> Self {
        let mut scores = BTreeMap::new();
        for (key, result) in &analysis.data_collection_results {
            let Some(topic) = TopicId::parse(key) else {
                tracing::warn!(key = %key, "dropping unknown topic in data collection results");
                continue;
            };
            if let Some(result) = result {
                scores.insert(topic, result.clone());
            }
        }
        Self { scores }
    }

    pub fn get(&self, topic: TopicId) -> Option<&DataCollectionResult> {
        self.scores.get(&topic)
    }

    /// The numeric score for a topic, when one was collected. A present entry
    /// with a null value counts as not collected.
    pub fn value(&self, topic: TopicId) -> Option<f64> {
        self.scores.get(&topic).and_then(|r| r.value)
    }

    pub fn rationale(&self, topic: TopicId) -> Option<&str> {
        self.get(topic).and_then(|r| r.rationale.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "conversation_id": "conv_123",
        "status": "done",
        "transcript": [
            {"role": "agent", "message": "How has your week been?", "time_in_call_secs": 1.2},
            {"role": "user", "message": "Busy, but good.", "time_in_call_secs": 4.8}
        ],
        "metadata": {
            "start_time_unix_secs": 1739200000,
            "call_duration_secs": 312,
            "cost": 120.0,
            "termination_reason": "user ended the call"
        },
        "analysis": {
            "transcript_summary": "A generally positive check-in.",
            "data_collection_results": {
                "leadership": {"value": 80, "rationale": "Speaks warmly about their manager."},
                "teamwork": {"value": null, "rationale": null},
                "astrology": {"value": 99, "rationale": "not a real topic"}
            }
        }
    }"#;

    #[test]
    fn deserializes_remote_payload() {
        let record: ConversationRecord = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(record.conversation_id, "conv_123");
        assert_eq!(record.status, ConversationStatus::Done);
        assert_eq!(record.transcript.len(), 2);
        assert_eq!(record.transcript[0].role, TurnRole::Agent);
        let meta = record.metadata.unwrap();
        assert_eq!(meta.call_duration_secs, Some(312));
        assert_eq!(meta.termination_reason.as_deref(), Some("user ended the call"));
    }

    #[test]
    fn tolerates_processing_record_without_analysis() {
        let record: ConversationRecord =
            serde_json::from_str(r#"{"conversation_id": "conv_9", "status": "processing"}"#)
                .unwrap();
        assert!(!record.status.is_terminal());
        assert!(record.analysis.is_none());
        assert!(record.transcript.is_empty());
    }

    #[test]
    fn boundary_drops_unknown_topics() {
        let record: ConversationRecord = serde_json::from_str(SAMPLE).unwrap();
        let scores = TopicScores::from_analysis(record.analysis.as_ref().unwrap());
        assert_eq!(scores.value(TopicId::Leadership), Some(80.0));
        assert!(scores.get(TopicId::Motivation).is_none());
        // unknown key never leaks past the boundary
        assert_eq!(scores.scores.len(), 2);
    }

    #[test]
    fn null_value_is_not_a_score() {
        let record: ConversationRecord = serde_json::from_str(SAMPLE).unwrap();
        let scores = TopicScores::from_analysis(record.analysis.as_ref().unwrap());
        assert!(scores.get(TopicId::Teamwork).is_some());
        assert_eq!(scores.value(TopicId::Teamwork), None);
    }
}
