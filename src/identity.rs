/*!
 * Who is making the request, as far as the polls are concerned.
 *
 * Identity is carried in the session cookie; a request without a user id in its session is
 * anonymous. Anonymous callers may browse everything but cannot vote.
 */
use tide::Request;

use crate::models::{User, UserId};
use crate::AppState;

const USER_KEY: &str = "user_id";

pub fn current_user(req: &Request<AppState>) -> Option<UserId> {
    req.session().get::<UserId>(USER_KEY)
}

/**
 * Attach `user` to the session under a fresh session id, so an id handed out before signing in
 * never carries an identity
 */
pub fn sign_in(req: &mut Request<AppState>, user: &User) -> tide::Result<()> {
    let session = req.session_mut();
    session.regenerate();
    session.insert(USER_KEY, user.id)?;
    Ok(())
}

pub fn sign_out(req: &mut Request<AppState>) {
    req.session_mut().destroy();
}

/**
 * Only allow redirects back into this site after signing in
 */
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/polls",
    }
}

/**
 * Usernames are trimmed and must be 1 to 150 characters
 */
pub fn clean_username(raw: &str) -> Option<&str> {
    let username = raw.trim();
    if username.is_empty() || username.chars().count() > 150 {
        None
    } else {
        Some(username)
    }
}
