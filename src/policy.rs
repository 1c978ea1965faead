/*!
 * The policy module decides who gets to see what, based purely on the state of a question and
 * the current time. Nothing in here touches storage.
 */
use chrono::{DateTime, Utc};

use crate::models::Question;

/**
 * How many questions the index shows
 */
pub const INDEX_LIMIT: usize = 5;

/**
 * Outcome of asking to view (or vote on) a question's detail page
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailAccess {
    NotFound,
    /// Redirect to the index
    NotYetPublished,
    /// Redirect to the results
    VotingClosed,
    Allowed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultsAccess {
    /// Unpublished questions are reported as missing, not redirected
    NotFound,
    Allowed,
}

pub fn detail_access(question: Option<&Question>, now: DateTime<Utc>) -> DetailAccess {
    match question {
        None => DetailAccess::NotFound,
        Some(q) if !q.is_published(now) => DetailAccess::NotYetPublished,
        Some(q) if !q.can_vote(now) => DetailAccess::VotingClosed,
        Some(_) => DetailAccess::Allowed,
    }
}

pub fn results_access(question: Option<&Question>, now: DateTime<Utc>) -> ResultsAccess {
    match question {
        Some(q) if q.is_published(now) => ResultsAccess::Allowed,
        _ => ResultsAccess::NotFound,
    }
}

/**
 * Narrow a set of questions down to what the index shows: published ones, newest first, at most
 * `INDEX_LIMIT` of them
 */
pub fn latest_published(questions: Vec<Question>, now: DateTime<Utc>) -> Vec<Question> {
    let mut published: Vec<Question> = questions
        .into_iter()
        .filter(|q| q.is_published(now))
        .collect();
    published.sort_by(|a, b| b.publish_at.cmp(&a.publish_at));
    published.truncate(INDEX_LIMIT);
    published
}
