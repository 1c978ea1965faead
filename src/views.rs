/*!
 * The views module renders entity state into HTML through the handlebars templates found in
 * the templates directory (`views/` by default).
 */
use chrono::{DateTime, Local, Utc};
use handlebars::Handlebars;
use log::*;
use serde::Serialize;
use tide::{Body, Request, Response, StatusCode};

use crate::models::{Choice, ChoiceTally, Question};
use crate::AppState;

const NOTICE_KEY: &str = "notice";

/**
 * Register every `.hbs` file in `dir`, named by its file stem
 */
pub fn load(dir: &str) -> Result<Handlebars<'static>, handlebars::TemplateFileError> {
    let mut hb = Handlebars::new();
    hb.register_templates_directory(".hbs", dir)?;
    Ok(hb)
}

pub fn render<T: Serialize>(req: &Request<AppState>, template: &str, context: &T) -> tide::Result {
    let html = req.state().views.render(template, context).map_err(|err| {
        error!("Failed to render {}: {:?}", template, err);
        tide::Error::from_str(StatusCode::InternalServerError, "Failed to render page")
    })?;

    Ok(Response::builder(StatusCode::Ok)
        .body(Body::from_string(html))
        .content_type(tide::http::mime::HTML)
        .build())
}

/**
 * Stash a one-shot message to show on the next rendered page
 */
pub fn flash(req: &mut Request<AppState>, notice: &str) -> tide::Result<()> {
    req.session_mut().insert(NOTICE_KEY, notice)?;
    Ok(())
}

pub fn take_notice(req: &mut Request<AppState>) -> Option<String> {
    let notice = req.session().get::<String>(NOTICE_KEY);
    if notice.is_some() {
        req.session_mut().remove(NOTICE_KEY);
    }
    notice
}

fn localized(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%B %-d, %Y, %-I:%M %p").to_string()
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub published: String,
    pub ends: Option<String>,
    pub recent: bool,
}

impl QuestionView {
    pub fn new(question: &Question, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id.to_string(),
            text: question.text.clone(),
            published: localized(question.publish_at),
            ends: question.end_at.map(localized),
            recent: question.was_published_recently(now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub notice: Option<String>,
    pub signed_in: bool,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceView {
    pub id: i32,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub notice: Option<String>,
    pub signed_in: bool,
    pub error_message: Option<String>,
    pub question: QuestionView,
    pub choices: Vec<ChoiceView>,
}

impl DetailPage {
    /**
     * `selected` is the choice the caller currently holds a vote for, if any
     */
    pub fn new(
        question: &Question,
        choices: &[Choice],
        selected: Option<i32>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            notice: None,
            signed_in: false,
            error_message: None,
            question: QuestionView::new(question, now),
            choices: choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id,
                    text: c.text.clone(),
                    selected: Some(c.id) == selected,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsPage {
    pub notice: Option<String>,
    pub question: QuestionView,
    pub choices: Vec<ChoiceTally>,
    pub total: i64,
    pub can_vote: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct LoginPage {
    pub next: String,
    pub error_message: Option<String>,
}
