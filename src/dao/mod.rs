/*!
 * The dao module holds everything that talks to storage.
 *
 * Request handlers and the voting logic only ever see the `Store` trait, the PostgreSQL
 * implementation lives in `postgres` and a test double in `memory`.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::*;

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /**
     * Questions published as of `now`, newest first, at most `limit` of them
     */
    async fn latest_published(&self, now: DateTime<Utc>, limit: usize)
        -> StoreResult<Vec<Question>>;

    async fn question(&self, id: &Uuid) -> StoreResult<Option<Question>>;

    /**
     * Choices of a question in creation order
     */
    async fn choices(&self, question: &Uuid) -> StoreResult<Vec<Choice>>;

    /**
     * Look up a choice, but only if it belongs to `question`
     */
    async fn choice_in_question(
        &self,
        question: &Uuid,
        choice: ChoiceId,
    ) -> StoreResult<Option<Choice>>;

    /**
     * The single vote `user` holds in `question`, if any
     */
    async fn vote_for(&self, user: UserId, question: &Uuid) -> StoreResult<Option<Vote>>;

    /**
     * Point `user`'s vote in the choice's question at `choice`, creating it if needed.
     *
     * Implementations must leave exactly one vote row per user and question behind, even when
     * called concurrently for the same pair.
     */
    async fn record_vote(&self, user: UserId, choice: &Choice) -> StoreResult<VoteOutcome>;

    /**
     * Every choice of the question with its live vote count
     */
    async fn tally(&self, question: &Uuid) -> StoreResult<Vec<ChoiceTally>>;

    async fn create_question(&self, question: NewQuestion) -> StoreResult<(Question, Vec<Choice>)>;

    async fn find_or_create_user(&self, username: &str) -> StoreResult<User>;
}
