//! Contact form routes: page rendering and submission handling.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tower_sessions::Session;

use crate::error::AppResult;
use crate::form::{AntiSpamConfig, FormRenderer, SubmissionOutcome, SubmissionResults, SuccessResponse};
use crate::session::{flash_success, take_success};
use crate::state::AppState;

use super::helpers::html_escape;

/// Path the form posts back to.
const SUBMIT_PATH: &str = "/contact";

/// Create the contact form router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show_form))
        .route(SUBMIT_PATH, post(submit_form))
}

/// Render the form page.
///
/// A success flash left by the post-redirect cycle is consumed here, so
/// refreshing the page afterwards shows a clean form.
async fn show_form(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    let flash = take_success(&session).await;
    let results = SubmissionResults::new();

    let html = render_page(&state, &results, &[], flash.as_deref())?;

    Ok(Html(html))
}

/// Handle a form submission.
///
/// Standard submissions answer with a full page (invalid) or a redirect
/// (accepted); asynchronous submissions get a JSON envelope with the
/// re-rendered form fragment either way.
async fn submit_form(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(input): Form<BTreeMap<String, String>>,
) -> AppResult<Response> {
    let asynchronous = state.settings().form_allow_ajax && is_ajax(&headers);
    let now = chrono::Utc::now().timestamp();

    let outcome = state.processor().process(&input, asynchronous, now).await;

    match outcome {
        SubmissionOutcome::Invalid { errors, results } => {
            if asynchronous {
                Ok(Json(serde_json::json!({
                    "status": "invalid",
                    "errors": errors,
                    "form": form_html(&state, &results),
                }))
                .into_response())
            } else {
                let html = render_page(&state, &results, &errors, None)?;
                Ok(Html(html).into_response())
            }
        }
        SubmissionOutcome::Accepted {
            message, response, ..
        } => match response {
            SuccessResponse::Redirect => {
                flash_success(&session, &message).await?;
                Ok(Redirect::to("/").into_response())
            }
            SuccessResponse::ClearForm => {
                // Submitted values are dropped so the fragment re-renders
                // an empty form in place.
                let results = SubmissionResults::new();
                Ok(Json(serde_json::json!({
                    "status": "ok",
                    "message": message,
                    "form": form_html(&state, &results),
                }))
                .into_response())
            }
        },
    }
}

/// Whether this request came from the asynchronous form client.
fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Render the complete form element for the given results.
fn form_html(state: &AppState, results: &SubmissionResults) -> String {
    let settings = state.settings();
    let antispam = AntiSpamConfig::from_settings(settings);
    let now = chrono::Utc::now().timestamp();

    let mut renderer = FormRenderer::new(settings, results);
    let fields = renderer.render_fields();
    let antispam_html = renderer.render_antispam(&antispam, now);
    let submit = renderer.render_submit_button();
    let attrs = renderer.form_attributes(SUBMIT_PATH).render();

    format!("<form id=\"scf-form\" {attrs}>{fields}{antispam_html}{submit}</form>")
}

/// Render the banner area: a success message or the ordered error lines.
fn banner_html(errors: &[String], success: Option<&str>) -> String {
    if let Some(success) = success {
        return format!(
            "<div class=\"scf-banner scf-success\">{}</div>",
            html_escape(success)
        );
    }

    if errors.is_empty() {
        return String::new();
    }

    let lines: String = errors
        .iter()
        .map(|line| format!("<p>{}</p>", html_escape(line)))
        .collect();

    format!("<div class=\"scf-banner scf-error\">{lines}</div>")
}

/// Render the full page, preferring a `contact/page.html` template and
/// falling back to the built-in layout.
fn render_page(
    state: &AppState,
    results: &SubmissionResults,
    errors: &[String],
    success: Option<&str>,
) -> AppResult<String> {
    let banner = banner_html(errors, success);
    let form = form_html(state, results);

    if state.tera().get_template("contact/page.html").is_ok() {
        let mut context = tera::Context::new();
        context.insert("banner", &banner);
        context.insert("form", &form);
        context.insert("css_assets", &css_assets(state));
        context.insert("js_assets", &js_assets(state));

        let html = state
            .tera()
            .render("contact/page.html", &context)
            .map_err(|e| anyhow::anyhow!("failed to render contact page: {e}"))?;

        return Ok(html);
    }

    Ok(inline_page(state, &banner, &form))
}

/// CSS asset URLs to inject, when enabled.
fn css_assets(state: &AppState) -> Vec<String> {
    let settings = state.settings();
    if settings.add_assets && settings.add_css_assets {
        settings.css_assets.clone()
    } else {
        Vec::new()
    }
}

/// JS asset URLs to inject, when enabled.
fn js_assets(state: &AppState) -> Vec<String> {
    let settings = state.settings();
    if settings.add_assets && settings.add_js_assets {
        settings.js_assets.clone()
    } else {
        Vec::new()
    }
}

/// Built-in page layout used when no template directory is configured.
fn inline_page(state: &AppState, banner: &str, form: &str) -> String {
    let css: String = css_assets(state)
        .iter()
        .map(|url| format!("<link rel=\"stylesheet\" href=\"{}\">\n", html_escape(url)))
        .collect();

    let js: String = js_assets(state)
        .iter()
        .map(|url| format!("<script src=\"{}\"></script>\n", html_escape(url)))
        .collect();

    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>Contact</title>\n{css}</head>\n<body>\n\
<div id=\"scf-message\">{banner}</div>\n{form}\n{js}</body>\n</html>"
    )
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_prefers_success() {
        let html = banner_html(&["oops".to_string()], Some("sent"));
        assert!(html.contains("scf-success"));
        assert!(!html.contains("oops"));
    }

    #[test]
    fn test_banner_orders_error_lines() {
        let errors = vec!["first".to_string(), "second".to_string()];
        let html = banner_html(&errors, None);
        assert!(html.contains("<p>first</p><p>second</p>"));
    }

    #[test]
    fn test_banner_empty_without_messages() {
        assert!(banner_html(&[], None).is_empty());
    }

    #[test]
    fn test_is_ajax_header() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));

        headers.insert("x-requested-with", "XMLHttpRequest".parse().unwrap());
        assert!(is_ajax(&headers));
    }
}
