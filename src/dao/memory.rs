use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use std::sync::Mutex;

use super::{Store, StoreResult};
use crate::models::*;

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    choices: Vec<Choice>,
    votes: Vec<Vote>,
    users: Vec<User>,
    sequence: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }
}

/**
 * Store kept entirely in memory, behaving like the PostgreSQL schema does
 */
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Every vote row, for asserting on the one-vote-per-question invariant
     */
    pub fn votes(&self) -> Vec<Vote> {
        self.tables.lock().unwrap().votes.clone()
    }

    /**
     * Insert a question without validation, e.g. one that has already closed
     */
    pub fn insert_question(
        &self,
        text: &str,
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        choices: &[&str],
    ) -> (Question, Vec<Choice>) {
        let mut tables = self.tables.lock().unwrap();
        let question = Question {
            id: generate_uuid(),
            text: text.into(),
            publish_at,
            end_at,
        };
        let choices: Vec<Choice> = choices
            .iter()
            .map(|text| Choice {
                id: tables.next_id(),
                question_id: question.id,
                text: text.to_string(),
            })
            .collect();
        tables.questions.push(question.clone());
        tables.choices.extend(choices.iter().cloned());
        (question, choices)
    }

    pub fn delete_question(&self, id: &Uuid) {
        let mut tables = self.tables.lock().unwrap();
        tables.questions.retain(|q| &q.id != id);
        tables.choices.retain(|c| &c.question_id != id);
        tables.votes.retain(|v| &v.question_id != id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn latest_published(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Question>> {
        let mut listed: Vec<Question> = self
            .tables
            .lock()
            .unwrap()
            .questions
            .iter()
            .filter(|q| q.publish_at <= now)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.publish_at.cmp(&a.publish_at));
        listed.truncate(limit);
        Ok(listed)
    }

    async fn question(&self, id: &Uuid) -> StoreResult<Option<Question>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.questions.iter().find(|q| &q.id == id).cloned())
    }

    async fn choices(&self, question: &Uuid) -> StoreResult<Vec<Choice>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .choices
            .iter()
            .filter(|c| &c.question_id == question)
            .cloned()
            .collect())
    }

    async fn choice_in_question(
        &self,
        question: &Uuid,
        choice: ChoiceId,
    ) -> StoreResult<Option<Choice>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .choices
            .iter()
            .find(|c| c.id == choice && &c.question_id == question)
            .cloned())
    }

    async fn vote_for(&self, user: UserId, question: &Uuid) -> StoreResult<Option<Vote>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .votes
            .iter()
            .find(|v| v.user_id == user && &v.question_id == question)
            .cloned())
    }

    async fn record_vote(&self, user: UserId, choice: &Choice) -> StoreResult<VoteOutcome> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(vote) = tables
            .votes
            .iter_mut()
            .find(|v| v.user_id == user && v.question_id == choice.question_id)
        {
            vote.choice_id = choice.id;
            return Ok(VoteOutcome::Updated);
        }

        let id = tables.next_id();
        tables.votes.push(Vote {
            id,
            user_id: user,
            choice_id: choice.id,
            question_id: choice.question_id,
        });
        Ok(VoteOutcome::Created)
    }

    async fn tally(&self, question: &Uuid) -> StoreResult<Vec<ChoiceTally>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .choices
            .iter()
            .filter(|c| &c.question_id == question)
            .map(|c| ChoiceTally {
                id: c.id,
                question_id: c.question_id,
                text: c.text.clone(),
                votes: tables.votes.iter().filter(|v| v.choice_id == c.id).count() as i64,
            })
            .collect())
    }

    async fn create_question(&self, new: NewQuestion) -> StoreResult<(Question, Vec<Choice>)> {
        let texts: Vec<&str> = new.choices.iter().map(String::as_str).collect();
        Ok(self.insert_question(&new.text, new.publish_at, new.end_at, &texts))
    }

    async fn find_or_create_user(&self, username: &str) -> StoreResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter().find(|u| u.username == username) {
            return Ok(user.clone());
        }
        let user = User {
            id: tables.next_id(),
            username: username.into(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}
