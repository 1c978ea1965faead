use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuestionError;

pub type UserId = i32;
pub type ChoiceId = i32;

/**
 * Generate a new identifier for a question
 */
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    /**
     * Questions without an end accept votes for as long as they are published
     */
    pub end_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        now >= self.publish_at
    }

    /**
     * Published within the last day, both bounds inclusive
     */
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.publish_at && self.publish_at <= now
    }

    /**
     * A published question accepts votes up to and including `end_at`
     */
    pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
        match self.end_at {
            None => self.is_published(now),
            Some(end_at) => self.is_published(now) && now <= end_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Choice {
    pub id: ChoiceId,
    pub question_id: Uuid,
    pub text: String,
}

/**
 * A choice along with the number of votes currently pointing at it
 */
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct ChoiceTally {
    pub id: ChoiceId,
    pub question_id: Uuid,
    pub text: String,
    pub votes: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i32,
    pub user_id: UserId,
    pub choice_id: ChoiceId,
    pub question_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/**
 * What recording a ballot did to the user's vote row
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    Created,
    Updated,
}

/**
 * A validated question, ready to be stored along with its choices
 */
#[derive(Clone, Debug, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    pub publish_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub choices: Vec<String>,
}

impl NewQuestion {
    pub fn new(
        text: &str,
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        choices: &[String],
    ) -> Result<Self, QuestionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if choices.len() < 2 {
            return Err(QuestionError::TooFewChoices);
        }
        if choices.iter().any(|c| c.trim().is_empty()) {
            return Err(QuestionError::EmptyChoice);
        }
        if let Some(end_at) = end_at {
            if end_at < publish_at {
                return Err(QuestionError::EndsBeforePublish);
            }
        }

        Ok(Self {
            text: text.to_string(),
            publish_at,
            end_at,
            choices: choices.iter().map(|c| c.trim().to_string()).collect(),
        })
    }
}
