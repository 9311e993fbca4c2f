use crate::domain::aggregate::{StoredAnalysis, TeamAggregate};
use crate::domain::conversation::{ConversationAnalysis, TopicScores};
use crate::domain::topics::{topic, TopicId, WELLBEING_TOPICS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const NOT_CALCULATED: &str = "Not calculated";

/// One topic's score as both flows render it. `score` is rounded here and
/// nowhere earlier; `None` means the topic was never scored and the client
/// shows the neutral label instead of a progress value.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreCard {
    pub topic: TopicId,
    pub title: &'static str,
    pub score: Option<i64>,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

fn card(id: TopicId, value: Option<f64>, rationale: Option<String>) -> ScoreCard {
    let entry = topic(id);
    let score = value.map(|v| v.round() as i64);
    let label = match score {
        Some(score) => format!("{score}%"),
        None => NOT_CALCULATED.to_string(),
    };
    // the rationale doubles as the card text; the static description is the
    // fallback when the agent offered none
    let description = rationale
        .clone()
        .unwrap_or_else(|| entry.description.to_string());
    ScoreCard {
        topic: id,
        title: entry.title,
        score,
        label,
        description,
        rationale,
    }
}

/// Cards for a single conversation's analysis, one per catalog topic in
/// display order. A missing analysis yields a full set of unscored cards.
pub fn cards_for_analysis(analysis: Option<&ConversationAnalysis>) -> Vec<ScoreCard> {
    let scores = analysis.map(TopicScores::from_analysis).unwrap_or_default();
    WELLBEING_TOPICS
        .iter()
        .map(|t| {
            card(
                t.id,
                scores.value(t.id),
                scores.rationale(t.id).map(str::to_string),
            )
        })
        .collect()
}

/// Cards for a team aggregate. Aggregates carry no rationale, so every card
/// falls back to the topic's static description.
pub fn cards_for_aggregate(aggregate: &TeamAggregate) -> Vec<ScoreCard> {
    WELLBEING_TOPICS
        .iter()
        .map(|t| {
            let average = aggregate.topics.get(&t.id).and_then(|a| a.average);
            card(t.id, average, None)
        })
        .collect()
}

/// One stored record rendered for the per-record breakdown, shared by the
/// individual history view and the HR report.
#[derive(Debug, Clone, Serialize)]
pub struct IndividualReport {
    pub id: Uuid,
    pub conversation_id: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scores: Vec<ScoreCard>,
}

impl IndividualReport {
    pub fn from_stored(record: &StoredAnalysis) -> Self {
        Self {
            id: record.id,
            conversation_id: record.conversation_id.clone(),
            username: record.username.clone(),
            created_at: record.created_at,
            scores: cards_for_analysis(record.analysis.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::aggregate;
    use crate::domain::conversation::DataCollectionResult;

    #[test]
    fn unscored_topic_renders_not_calculated() {
        let cards = cards_for_analysis(None);
        assert_eq!(cards.len(), 7);
        for card in &cards {
            assert_eq!(card.score, None);
            assert_eq!(card.label, NOT_CALCULATED);
        }
    }

    #[test]
    fn rationale_wins_over_static_description() {
        let mut analysis = ConversationAnalysis::default();
        analysis.data_collection_results.insert(
            "leadership".to_string(),
            Some(DataCollectionResult {
                value: Some(74.4),
                rationale: Some("Feels heard by their manager.".to_string()),
            }),
        );
        let cards = cards_for_analysis(Some(&analysis));
        let leadership = cards.iter().find(|c| c.topic == TopicId::Leadership).unwrap();
        assert_eq!(leadership.score, Some(74));
        assert_eq!(leadership.label, "74%");
        assert_eq!(leadership.description, "Feels heard by their manager.");

        let teamwork = cards.iter().find(|c| c.topic == TopicId::Teamwork).unwrap();
        assert!(teamwork.rationale.is_none());
        assert_eq!(
            teamwork.description,
            topic(TopicId::Teamwork).description
        );
    }

    #[test]
    fn rounding_happens_only_at_presentation() {
        let agg = aggregate(&[], None);
        let cards = cards_for_aggregate(&agg);
        assert!(cards.iter().all(|c| c.score.is_none()));
        assert!(cards.iter().all(|c| c.label == NOT_CALCULATED));
    }
}
