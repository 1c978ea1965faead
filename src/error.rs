use thiserror::Error;

/**
 * Failures coming out of the persistence layer
 */
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to migrate the database: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/**
 * Reasons a ballot is turned away
 */
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("no such question")]
    NotFound,
    #[error("the selected choice does not belong to this question")]
    InvalidChoice,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/**
 * Validation failures when an administrator creates a question
 */
#[derive(Debug, Error, PartialEq)]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyText,
    #[error("a question needs at least two choices")]
    TooFewChoices,
    #[error("choice text must not be empty")]
    EmptyChoice,
    #[error("a question cannot end before it is published")]
    EndsBeforePublish,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}
