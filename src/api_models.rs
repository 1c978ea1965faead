use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Choice, ChoiceTally, Question};

/**
 * Information about a question
 */
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub choices: Vec<Choice>,
}

/**
 * Administrator-provided details to create a Question
 */
#[derive(Debug, Deserialize)]
pub struct InsertableQuestion {
    pub text: String,
    /**
     * Defaults to the moment the request is handled
     */
    pub publish_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /**
     * Just the text of each choice
     */
    pub choices: Vec<String>,
}

/**
 * One entry of the question listing
 */
#[derive(Debug, Serialize)]
pub struct Listing {
    pub question: Question,
    pub published_recently: bool,
    pub can_vote: bool,
}

/**
 * Results from a given question
 */
#[derive(Debug, Serialize)]
pub struct Tally {
    pub question: Question,
    pub choices: Vec<ChoiceTally>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
