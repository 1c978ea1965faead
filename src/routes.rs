/*!
 * The routes module contains all the tide routes and the logic to fulfill the responses for each
 * route.
 *
 * Modules are nested for cleaner organization here
 */
use log::*;
use tide::{Redirect, Request};
use uuid::Uuid;

use crate::models::Question;
use crate::AppState;

/**
 * Look up the question based on the `id` parameter in the request
 *
 * Missing and malformed ids are treated the same as unknown ones
 */
async fn requested_question(req: &Request<AppState>) -> tide::Result<Option<Question>> {
    let id = match req.param("id").ok().and_then(|id| Uuid::parse_str(id).ok()) {
        Some(id) => id,
        None => {
            debug!("Malformed question id: {:?}", req.param("id").ok());
            return Ok(None);
        }
    };
    Ok(req.state().store.question(&id).await?)
}

fn redirect_with_notice(req: &mut Request<AppState>, to: &str, notice: &str) -> tide::Result {
    crate::views::flash(req, notice)?;
    Ok(Redirect::new(to).into())
}

pub mod polls {
    use log::*;
    use serde::Deserialize;
    use tide::{Redirect, Request, Response, StatusCode};

    use super::{redirect_with_notice, requested_question};
    use crate::error::VoteError;
    use crate::identity;
    use crate::models::{Question, VoteOutcome};
    use crate::policy::{self, DetailAccess, ResultsAccess};
    use crate::views::{self, DetailPage, IndexPage, QuestionView, ResultsPage};
    use crate::AppState;

    pub const NO_SUCH_QUESTION: &str = "No such question.";
    pub const NOT_PUBLISHED: &str = "That given question is not published yet.";
    pub const CLOSED: &str = "This question is closed.";
    pub const NO_CHOICE: &str = "You didn't select a choice.";
    pub const VOTE_RECORDED: &str = "Your vote was recorded.";
    pub const VOTE_CHANGED: &str = "Your vote was changed.";

    #[derive(Debug, Default, Deserialize)]
    struct VoteForm {
        choice: Option<String>,
    }

    /**
     * Turn a denied detail access into the redirect the caller should follow
     *
     * Returns `None` when the detail page may be shown
     */
    fn deny_detail(
        req: &mut Request<AppState>,
        question: Option<&Question>,
    ) -> Option<tide::Result> {
        let now = req.state().clock.now();
        let denial = match policy::detail_access(question, now) {
            DetailAccess::Allowed => return None,
            DetailAccess::NotFound => redirect_with_notice(req, "/polls", NO_SUCH_QUESTION),
            DetailAccess::NotYetPublished => redirect_with_notice(req, "/polls", NOT_PUBLISHED),
            DetailAccess::VotingClosed => {
                let results = question
                    .map(|q| format!("/polls/{}/results", q.id))
                    .unwrap_or_else(|| "/polls".into());
                redirect_with_notice(req, &results, CLOSED)
            }
        };
        debug!("Detail access denied for {:?}", question.map(|q| q.id));
        Some(denial)
    }

    async fn render_detail(
        mut req: Request<AppState>,
        question: &Question,
        error_message: Option<&str>,
    ) -> tide::Result {
        let state = req.state().clone();
        let user = identity::current_user(&req);
        let choices = state.store.choices(&question.id).await?;
        let selected = match user {
            Some(user) => state
                .store
                .vote_for(user, &question.id)
                .await?
                .map(|v| v.choice_id),
            None => None,
        };

        let mut page = DetailPage::new(question, &choices, selected, state.clock.now());
        page.notice = views::take_notice(&mut req);
        page.signed_in = user.is_some();
        page.error_message = error_message.map(String::from);
        views::render(&req, "detail", &page)
    }

    /**
     *  GET /polls
     */
    pub async fn index(mut req: Request<AppState>) -> tide::Result {
        let now = req.state().clock.now();
        let stored = req
            .state()
            .store
            .latest_published(now, policy::INDEX_LIMIT)
            .await?;
        let questions = policy::latest_published(stored, now);

        let page = IndexPage {
            notice: views::take_notice(&mut req),
            signed_in: identity::current_user(&req).is_some(),
            questions: questions.iter().map(|q| QuestionView::new(q, now)).collect(),
        };
        views::render(&req, "index", &page)
    }

    /**
     * GET /polls/:id
     */
    pub async fn detail(mut req: Request<AppState>) -> tide::Result {
        let question = requested_question(&req).await?;
        if let Some(denied) = deny_detail(&mut req, question.as_ref()) {
            return denied;
        }

        match question {
            Some(question) => render_detail(req, &question, None).await,
            None => Ok(Redirect::new("/polls").into()),
        }
    }

    /**
     *  GET /polls/:id/results
     */
    pub async fn results(mut req: Request<AppState>) -> tide::Result {
        let question = requested_question(&req).await?;
        let now = req.state().clock.now();

        let question = match (policy::results_access(question.as_ref(), now), question) {
            (ResultsAccess::Allowed, Some(question)) => question,
            _ => return Ok(Response::new(StatusCode::NotFound)),
        };

        let choices = req.state().store.tally(&question.id).await?;
        let page = ResultsPage {
            notice: views::take_notice(&mut req),
            question: QuestionView::new(&question, now),
            total: choices.iter().map(|c| c.votes).sum(),
            choices,
            can_vote: question.can_vote(now),
        };
        views::render(&req, "results", &page)
    }

    /**
     *  POST /polls/:id/vote
     */
    pub async fn vote(mut req: Request<AppState>) -> tide::Result {
        let user = match identity::current_user(&req) {
            Some(user) => user,
            None => {
                let next = format!("/polls/{}", req.param("id").unwrap_or_default());
                debug!("Anonymous vote attempt on {}", next);
                return Ok(Redirect::new(format!("/accounts/login?next={}", next)).into());
            }
        };

        let body = req.body_string().await?;
        let form: VoteForm = match serde_qs::from_str(&body) {
            Ok(form) => form,
            Err(err) => {
                debug!("Malformed vote form {:?}: {:?}", body, err);
                VoteForm::default()
            }
        };

        let question = requested_question(&req).await?;
        if let Some(denied) = deny_detail(&mut req, question.as_ref()) {
            return denied;
        }
        let question = match question {
            Some(question) => question,
            None => return Ok(Redirect::new("/polls").into()),
        };

        let choice = form.choice.and_then(|c| c.trim().parse().ok());
        let store = req.state().store.clone();
        match crate::voting::cast_vote(&*store, &question.id, choice, user).await {
            Ok(outcome) => {
                let notice = match outcome {
                    VoteOutcome::Created => VOTE_RECORDED,
                    VoteOutcome::Updated => VOTE_CHANGED,
                };
                let results = format!("/polls/{}/results", question.id);
                redirect_with_notice(&mut req, &results, notice)
            }
            Err(VoteError::InvalidChoice) => render_detail(req, &question, Some(NO_CHOICE)).await,
            Err(VoteError::NotFound) => Ok(Response::new(StatusCode::NotFound)),
            Err(VoteError::Store(err)) => {
                error!("Failed to vote! {:?}", err);
                Err(err.into())
            }
        }
    }
}

pub mod accounts {
    use log::*;
    use serde::Deserialize;
    use tide::{Redirect, Request};

    use crate::identity;
    use crate::views::{self, LoginPage};
    use crate::AppState;

    #[derive(Debug, Default, Deserialize)]
    struct LoginQuery {
        next: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    struct LoginForm {
        username: Option<String>,
        next: Option<String>,
    }

    /**
     *  GET /accounts/login
     */
    pub async fn login_form(req: Request<AppState>) -> tide::Result {
        let query: LoginQuery = req.query().unwrap_or_default();
        let page = LoginPage {
            next: identity::safe_next(query.next.as_deref()).to_string(),
            error_message: None,
        };
        views::render(&req, "login", &page)
    }

    /**
     *  POST /accounts/login
     */
    pub async fn login(mut req: Request<AppState>) -> tide::Result {
        let body = req.body_string().await?;
        let form: LoginForm = serde_qs::from_str(&body).unwrap_or_default();
        let next = identity::safe_next(form.next.as_deref()).to_string();

        let username = match form.username.as_deref().and_then(identity::clean_username) {
            Some(username) => username,
            None => {
                let page = LoginPage {
                    next,
                    error_message: Some("Please enter a username.".into()),
                };
                return views::render(&req, "login", &page);
            }
        };

        let user = req.state().store.find_or_create_user(username).await?;
        info!("User {} signed in", user.username);
        identity::sign_in(&mut req, &user)?;
        Ok(Redirect::new(next).into())
    }

    /**
     *  GET /accounts/logout
     */
    pub async fn logout(mut req: Request<AppState>) -> tide::Result {
        identity::sign_out(&mut req);
        Ok(Redirect::new("/polls").into())
    }
}

/**
 * JSON flavored access to the questions, creation is reserved for administrators
 */
pub mod api {
    use log::*;
    use tide::{Body, Request, Response, StatusCode};

    use super::requested_question;
    use crate::api_models::*;
    use crate::models::NewQuestion;
    use crate::policy::{self, ResultsAccess};
    use crate::AppState;

    fn json_error(status: StatusCode, error: &str) -> tide::Result {
        Ok(Response::builder(status)
            .body(Body::from_json(&ErrorBody {
                error: error.to_string(),
            })?)
            .build())
    }

    fn is_admin(req: &Request<AppState>) -> bool {
        match (&req.state().admin_token, req.header("Authorization")) {
            (Some(token), Some(header)) => bearer_matches(header.last().as_str(), token),
            _ => false,
        }
    }

    /**
     * Compare a presented `Authorization` value against the admin token in constant time
     */
    fn bearer_matches(presented: &str, token: &str) -> bool {
        let expected = format!("Bearer {}", token);
        ring::constant_time::verify_slices_are_equal(presented.as_bytes(), expected.as_bytes())
            .is_ok()
    }

    /**
     *  GET /api/v1/questions
     */
    pub async fn list(req: Request<AppState>) -> tide::Result<Body> {
        let now = req.state().clock.now();
        let stored = req
            .state()
            .store
            .latest_published(now, policy::INDEX_LIMIT)
            .await?;
        let listing: Vec<Listing> = policy::latest_published(stored, now)
            .into_iter()
            .map(|question| Listing {
                published_recently: question.was_published_recently(now),
                can_vote: question.can_vote(now),
                question,
            })
            .collect();
        Body::from_json(&listing)
    }

    /**
     *  PUT /api/v1/questions
     */
    pub async fn create(mut req: Request<AppState>) -> tide::Result {
        if !is_admin(&req) {
            warn!("Rejected question creation without a valid admin token");
            return json_error(StatusCode::Forbidden, "admin token required");
        }

        let insertable: InsertableQuestion = req.body_json().await?;
        debug!("Question received: {:?}", insertable);

        let publish_at = insertable
            .publish_at
            .unwrap_or_else(|| req.state().clock.now());
        let new = match NewQuestion::new(
            &insertable.text,
            publish_at,
            insertable.end_at,
            &insertable.choices,
        ) {
            Ok(new) => new,
            Err(err) => return json_error(StatusCode::UnprocessableEntity, &err.to_string()),
        };

        let (question, choices) = req.state().store.create_question(new).await?;
        Ok(Response::builder(StatusCode::Created)
            .body(Body::from_json(&QuestionDetail { question, choices })?)
            .build())
    }

    /**
     *  GET /api/v1/questions/:id/results
     */
    pub async fn results(req: Request<AppState>) -> tide::Result {
        let question = requested_question(&req).await?;
        let now = req.state().clock.now();

        let question = match (policy::results_access(question.as_ref(), now), question) {
            (ResultsAccess::Allowed, Some(question)) => question,
            _ => return json_error(StatusCode::NotFound, "no such question"),
        };

        let choices = req.state().store.tally(&question.id).await?;
        let tally = Tally {
            question,
            total: choices.iter().map(|c| c.votes).sum(),
            choices,
        };
        Ok(Response::builder(StatusCode::Ok)
            .body(Body::from_json(&tally)?)
            .build())
    }
}
