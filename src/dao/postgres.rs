use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::models::*;

/**
 * PostgreSQL backed store
 */
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /**
     * Create the sqlx connection pool for postgresql
     */
    pub async fn connect(database_url: &str, pool_size: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn latest_published(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, text, publish_at, end_at FROM questions
                WHERE publish_at <= $1
                ORDER BY publish_at DESC
                LIMIT $2",
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn question(&self, id: &Uuid) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, text, publish_at, end_at FROM questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn choices(&self, question: &Uuid) -> StoreResult<Vec<Choice>> {
        let choices = sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, text FROM choices WHERE question_id = $1 ORDER BY id ASC",
        )
        .bind(question)
        .fetch_all(&self.pool)
        .await?;
        Ok(choices)
    }

    async fn choice_in_question(
        &self,
        question: &Uuid,
        choice: ChoiceId,
    ) -> StoreResult<Option<Choice>> {
        let choice = sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, text FROM choices WHERE id = $1 AND question_id = $2",
        )
        .bind(choice)
        .bind(question)
        .fetch_optional(&self.pool)
        .await?;
        Ok(choice)
    }

    async fn vote_for(&self, user: UserId, question: &Uuid) -> StoreResult<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(
            "SELECT id, user_id, choice_id, question_id FROM votes
                WHERE user_id = $1 AND question_id = $2",
        )
        .bind(user)
        .bind(question)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn record_vote(&self, user: UserId, choice: &Choice) -> StoreResult<VoteOutcome> {
        /*
         * A single upsert against the (user_id, question_id) unique constraint, so two racing
         * ballots from the same user both land on the one row and the later one wins.
         *
         * xmax is only zero for a freshly inserted tuple
         */
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO votes (user_id, choice_id, question_id) VALUES ($1, $2, $3)
                ON CONFLICT (user_id, question_id)
                DO UPDATE SET choice_id = EXCLUDED.choice_id, updated_at = NOW()
                RETURNING (xmax = 0) AS inserted",
        )
        .bind(user)
        .bind(choice.id)
        .bind(choice.question_id)
        .fetch_one(&self.pool)
        .await?;

        debug!("Vote upserted for user {} on choice {}", user, choice.id);

        if inserted {
            Ok(VoteOutcome::Created)
        } else {
            Ok(VoteOutcome::Updated)
        }
    }

    async fn tally(&self, question: &Uuid) -> StoreResult<Vec<ChoiceTally>> {
        let tally = sqlx::query_as::<_, ChoiceTally>(
            "SELECT c.id, c.question_id, c.text, COUNT(v.id) AS votes
                FROM choices c
                LEFT JOIN votes v ON v.choice_id = c.id
                WHERE c.question_id = $1
                GROUP BY c.id
                ORDER BY c.id ASC",
        )
        .bind(question)
        .fetch_all(&self.pool)
        .await?;
        Ok(tally)
    }

    async fn create_question(&self, new: NewQuestion) -> StoreResult<(Question, Vec<Choice>)> {
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, Question>(
            "INSERT INTO questions (id, text, publish_at, end_at) VALUES ($1, $2, $3, $4)
                RETURNING id, text, publish_at, end_at",
        )
        .bind(generate_uuid())
        .bind(&new.text)
        .bind(new.publish_at)
        .bind(new.end_at)
        .fetch_one(&mut tx)
        .await?;

        /*
         * There doesn't seem to be a cleaner way to do a multiple insert with sqlx
         * that doesn't involve some string manipulation
         */
        let mut choices = Vec::with_capacity(new.choices.len());
        for text in new.choices.iter() {
            let choice = sqlx::query_as::<_, Choice>(
                "INSERT INTO choices (question_id, text) VALUES ($1, $2)
                    RETURNING id, question_id, text",
            )
            .bind(question.id)
            .bind(text)
            .fetch_one(&mut tx)
            .await?;
            choices.push(choice);
        }

        tx.commit().await?;
        info!("Created question {} with {} choices", question.id, choices.len());
        Ok((question, choices))
    }

    async fn find_or_create_user(&self, username: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username) VALUES ($1)
                ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
                RETURNING id, username",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

/*
 * These run against the database named by DATABASE_URL and are skipped when it is unset
 */
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> Option<PgStore> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("DATABASE_URL is not set, skipping PostgreSQL tests");
                return None;
            }
        };
        let store = PgStore::connect(&url, 5).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    async fn user(store: &PgStore) -> User {
        let username = format!("voter-{}", generate_uuid());
        store.find_or_create_user(&username).await.unwrap()
    }

    async fn question(store: &PgStore, days: i64) -> (Question, Vec<Choice>) {
        let new = NewQuestion::new(
            "Tabs or spaces?",
            Utc::now() + Duration::days(days),
            None,
            &["Tabs".to_string(), "Spaces".to_string()],
        )
        .unwrap();
        store.create_question(new).await.unwrap()
    }

    async fn count(store: &PgStore, sql: &str, id: &Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .bind(id)
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[async_std::test]
    async fn record_vote_creates_then_updates() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        let voter = user(&store).await;
        let (q, choices) = question(&store, -1).await;

        let outcomes = vec![
            store.record_vote(voter.id, &choices[1]).await.unwrap(),
            store.record_vote(voter.id, &choices[1]).await.unwrap(),
            store.record_vote(voter.id, &choices[1]).await.unwrap(),
        ];
        assert_eq!(
            outcomes,
            vec![VoteOutcome::Created, VoteOutcome::Updated, VoteOutcome::Updated]
        );

        let vote = store.vote_for(voter.id, &q.id).await.unwrap().unwrap();
        assert_eq!(vote.choice_id, choices[1].id);

        let tally = store.tally(&q.id).await.unwrap();
        let votes: Vec<i64> = tally.iter().map(|c| c.votes).collect();
        assert_eq!(votes, vec![0, 1]);
    }

    #[async_std::test]
    async fn concurrent_ballots_leave_one_vote() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        let voter = user(&store).await;
        let (q, choices) = question(&store, -1).await;

        let voter = voter.id;
        let handles: Vec<_> = (0..20)
            .map(|n| {
                let store = store.clone();
                let choice = choices[n % choices.len()].clone();
                async_std::task::spawn(async move { store.record_vote(voter, &choice).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == VoteOutcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM votes WHERE question_id = $1", &q.id).await,
            1
        );
    }

    #[async_std::test]
    async fn latest_published_excludes_future_questions() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        let (past, _) = question(&store, -1).await;
        let (future, _) = question(&store, 1).await;

        let listed = store.latest_published(Utc::now(), 10_000).await.unwrap();
        assert!(listed.iter().any(|q| q.id == past.id));
        assert!(listed.iter().all(|q| q.id != future.id));
        assert!(listed
            .windows(2)
            .all(|pair| pair[0].publish_at >= pair[1].publish_at));
    }

    #[async_std::test]
    async fn deleting_a_user_removes_their_votes() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        let voter = user(&store).await;
        let (q, choices) = question(&store, -1).await;
        store.record_vote(voter.id, &choices[0]).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(voter.id)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(store.vote_for(voter.id, &q.id).await.unwrap().is_none());
        let tally = store.tally(&q.id).await.unwrap();
        assert!(tally.iter().all(|c| c.votes == 0));
    }

    #[async_std::test]
    async fn deleting_a_question_removes_choices_and_votes() {
        let store = match store().await {
            Some(store) => store,
            None => return,
        };
        let voter = user(&store).await;
        let (q, choices) = question(&store, -1).await;
        store.record_vote(voter.id, &choices[0]).await.unwrap();

        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(q.id)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(store.question(&q.id).await.unwrap().is_none());
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM choices WHERE question_id = $1", &q.id).await,
            0
        );
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM votes WHERE question_id = $1", &q.id).await,
            0
        );
    }
}
