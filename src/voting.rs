use log::*;
use uuid::Uuid;

use crate::dao::Store;
use crate::error::VoteError;
use crate::models::{ChoiceId, UserId, VoteOutcome};

/**
 * Record `user`'s ballot for `choice` in `question`.
 *
 * A user holds at most one vote per question: the first ballot creates it and every later one
 * re-points it, even when the same choice is selected again. Whether the question is currently
 * accepting votes is the caller's concern, see `policy::detail_access`.
 */
pub async fn cast_vote(
    store: &dyn Store,
    question: &Uuid,
    choice: Option<ChoiceId>,
    user: UserId,
) -> Result<VoteOutcome, VoteError> {
    if store.question(question).await?.is_none() {
        return Err(VoteError::NotFound);
    }

    let choice_id = choice.ok_or(VoteError::InvalidChoice)?;
    let choice = store
        .choice_in_question(question, choice_id)
        .await?
        .ok_or_else(|| {
            debug!("Choice {} is not part of question {}", choice_id, question);
            VoteError::InvalidChoice
        })?;

    let outcome = store.record_vote(user, &choice).await?;
    info!("Vote {:?} for user {} on question {}", outcome, user, question);
    Ok(outcome)
}
