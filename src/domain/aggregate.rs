use crate::domain::conversation::{ConversationAnalysis, ConversationStatus, TopicScores};
use crate::domain::topics::TopicId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Inclusive creation-date window. A record stamped exactly at `start` or
/// `end` qualifies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// A submitted assessment as this service stores it: the durable copy of a
/// conversation's analysis, created once when the user sends it to their
/// employer.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub conversation_id: String,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub analysis: Option<ConversationAnalysis>,
    pub created_at: DateTime<Utc>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TopicAverage {
    /// Arithmetic mean of the non-null values, unrounded. `None` when no
    /// record in the window carries a value for the topic — never 0.
    pub average: Option<f64>,
    /// Records contributing a value to this topic's average.
    pub contributors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAggregate {
    pub topics: BTreeMap<TopicId, TopicAverage>,
    /// Filtered records feeding the report. Counts records, not distinct
    /// users: an employee who submitted twice in the window counts twice.
    pub report_count: usize,
}

/// Per-topic mean scores across a set of stored records, optionally
/// restricted to a date window. Pure: same input, same output.
pub fn aggregate(records: &[StoredAnalysis], range: Option<&DateRange>) -> TeamAggregate {
    let filtered: Vec<&StoredAnalysis> = records
        .iter()
        .filter(|r| range.map_or(true, |range| range.contains(r.created_at)))
        .collect();

    let mut totals: BTreeMap<TopicId, (f64, usize)> = BTreeMap::new();
    for record in &filtered {
        let Some(analysis) = &record.analysis else {
            continue;
        };
        let scores = TopicScores::from_analysis(analysis);
        for topic in TopicId::ALL {
            if let Some(value) = scores.value(topic) {
                let entry = totals.entry(topic).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    let mut topics = BTreeMap::new();
    for topic in TopicId::ALL {
        let average = match totals.get(&topic) {
            Some((sum, count)) if *count > 0 => TopicAverage {
                average: Some(sum / *count as f64),
                contributors: *count,
            },
            _ => TopicAverage {
                average: None,
                contributors: 0,
            },
        };
        topics.insert(topic, average);
    }

    TeamAggregate {
        topics,
        report_count: filtered.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::DataCollectionResult;
    use chrono::TimeZone;

    fn record(created_at: DateTime<Utc>, scores: &[(&str, Option<f64>)]) -> StoredAnalysis {
        let mut analysis = ConversationAnalysis::default();
        for (key, value) in scores {
            analysis.data_collection_results.insert(
                key.to_string(),
                Some(DataCollectionResult {
                    value: *value,
                    rationale: None,
                }),
            );
        }
        StoredAnalysis {
            id: Uuid::new_v4(),
            conversation_id: "conv".to_string(),
            user_id: Uuid::new_v4(),
            company_id: None,
            status: ConversationStatus::Done,
            analysis: Some(analysis),
            created_at,
            username: None,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn topic_without_values_averages_to_none_not_zero() {
        let records = vec![record(at(1), &[("leadership", Some(80.0))])];
        let result = aggregate(&records, None);
        let teamwork = &result.topics[&TopicId::Teamwork];
        assert_eq!(teamwork.average, None);
        assert_eq!(teamwork.contributors, 0);
        // and nothing is NaN
        for avg in result.topics.values() {
            if let Some(v) = avg.average {
                assert!(!v.is_nan());
            }
        }
    }

    #[test]
    fn mean_ignores_null_values() {
        let records = vec![
            record(at(1), &[("leadership", Some(80.0))]),
            record(at(2), &[("leadership", Some(60.0))]),
            record(at(3), &[("leadership", None)]),
        ];
        let result = aggregate(&records, None);
        let leadership = &result.topics[&TopicId::Leadership];
        assert_eq!(leadership.average, Some(70.0));
        assert_eq!(leadership.contributors, 2);
        assert_eq!(result.report_count, 3);
    }

    #[test]
    fn date_range_is_inclusive_at_both_ends() {
        let records = vec![
            record(at(1), &[("motivation", Some(10.0))]),
            record(at(5), &[("motivation", Some(20.0))]),
            record(at(9), &[("motivation", Some(90.0))]),
        ];
        let range = DateRange {
            start: at(1),
            end: at(5),
        };
        let result = aggregate(&records, Some(&range));
        assert_eq!(result.report_count, 2);
        assert_eq!(result.topics[&TopicId::Motivation].average, Some(15.0));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            record(at(2), &[("teamwork", Some(40.0)), ("feedback", Some(55.0))]),
            record(at(4), &[("teamwork", Some(70.0))]),
        ];
        let first = aggregate(&records, None);
        let second = aggregate(&records, None);
        assert_eq!(first.report_count, second.report_count);
        for topic in TopicId::ALL {
            assert_eq!(first.topics[&topic], second.topics[&topic]);
        }
    }

    #[test]
    fn report_count_counts_records_not_users() {
        let user = Uuid::new_v4();
        let mut a = record(at(1), &[("leadership", Some(50.0))]);
        let mut b = record(at(2), &[("leadership", Some(70.0))]);
        a.user_id = user;
        b.user_id = user;
        let result = aggregate(&[a, b], None);
        assert_eq!(result.report_count, 2);
    }

    #[test]
    fn records_without_analysis_still_count_toward_report_total() {
        let mut bare = record(at(1), &[]);
        bare.analysis = None;
        let scored = record(at(2), &[("feedback", Some(30.0))]);
        let result = aggregate(&[bare, scored], None);
        assert_eq!(result.report_count, 2);
        assert_eq!(result.topics[&TopicId::Feedback].contributors, 1);
    }
}
