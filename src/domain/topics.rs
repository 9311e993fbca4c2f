use serde::{Deserialize, Serialize};

/// The seven wellbeing categories every assessment is scored against.
/// Catalog order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicId {
    Leadership,
    PersonalGrowth,
    Feedback,
    Teamwork,
    Motivation,
    PsychologicalSafety,
    CompanyCulture,
}

impl TopicId {
    pub const ALL: [TopicId; 7] = [
        TopicId::Leadership,
        TopicId::PersonalGrowth,
        TopicId::Feedback,
        TopicId::Teamwork,
        TopicId::Motivation,
        TopicId::PsychologicalSafety,
        TopicId::CompanyCulture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicId::Leadership => "leadership",
            TopicId::PersonalGrowth => "personal_growth",
            TopicId::Feedback => "feedback",
            TopicId::Teamwork => "teamwork",
            TopicId::Motivation => "motivation",
            TopicId::PsychologicalSafety => "psychological_safety",
            TopicId::CompanyCulture => "company_culture",
        }
    }

    pub fn parse(raw: &str) -> Option<TopicId> {
        match raw {
            "leadership" => Some(TopicId::Leadership),
            "personal_growth" => Some(TopicId::PersonalGrowth),
            "feedback" => Some(TopicId::Feedback),
            "teamwork" => Some(TopicId::Teamwork),
            "motivation" => Some(TopicId::Motivation),
            "psychological_safety" => Some(TopicId::PsychologicalSafety),
            "company_culture" => Some(TopicId::CompanyCulture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WellbeingTopic {
    pub id: TopicId,
    pub title: &'static str,
    pub description: &'static str,
}

pub const WELLBEING_TOPICS: [WellbeingTopic; 7] = [
    WellbeingTopic {
        id: TopicId::Leadership,
        title: "Leadership",
        description: "Evaluation of leadership skills, communication effectiveness, and ability to guide and inspire others.",
    },
    WellbeingTopic {
        id: TopicId::PersonalGrowth,
        title: "Personal Growth",
        description: "Assessment of self-development, learning opportunities, and career progression aspirations.",
    },
    WellbeingTopic {
        id: TopicId::Feedback,
        title: "Feedback",
        description: "Analysis of feedback reception and delivery, openness to criticism, and improvement suggestions.",
    },
    WellbeingTopic {
        id: TopicId::Teamwork,
        title: "Teamwork",
        description: "Evaluation of collaboration skills, team dynamics, and contribution to group objectives.",
    },
    WellbeingTopic {
        id: TopicId::Motivation,
        title: "Motivation",
        description: "Assessment of drive, engagement levels, and factors affecting work enthusiasm.",
    },
    WellbeingTopic {
        id: TopicId::PsychologicalSafety,
        title: "Psychological Safety",
        description: "Analysis of workplace comfort, ability to express opinions, and feeling of security.",
    },
    WellbeingTopic {
        id: TopicId::CompanyCulture,
        title: "Company Culture & Practices",
        description: "Evaluation of organizational values alignment, workplace practices, and cultural fit.",
    },
];

pub fn topic(id: TopicId) -> &'static WellbeingTopic {
    WELLBEING_TOPICS
        .iter()
        .find(|t| t.id == id)
        .expect("catalog covers every TopicId")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_seven_topics_in_display_order() {
        assert_eq!(WELLBEING_TOPICS.len(), 7);
        let ids: Vec<TopicId> = WELLBEING_TOPICS.iter().map(|t| t.id).collect();
        assert_eq!(ids, TopicId::ALL.to_vec());
        assert_eq!(WELLBEING_TOPICS[0].title, "Leadership");
        assert_eq!(WELLBEING_TOPICS[6].title, "Company Culture & Practices");
    }

    #[test]
    fn ids_round_trip() {
        for id in TopicId::ALL {
            assert_eq!(TopicId::parse(id.as_str()), Some(id));
        }
        assert_eq!(TopicId::parse("work_life_balance"), None);
    }

    #[test]
    fn serde_uses_stable_keys() {
        let json = serde_json::to_string(&TopicId::PsychologicalSafety).unwrap();
        assert_eq!(json, "\"psychological_safety\"");
        let back: TopicId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TopicId::PsychologicalSafety);
    }
}
