//! "Page not found" handling
//!
//! Reached when routing finds nothing or a named handler fails validation.
//! A configured 404 override runs like a normal handler (status untouched,
//! no page caching); otherwise a fixed page is rendered for the transport.

use http::StatusCode;

use super::dispatcher::Dispatcher;
use crate::{
    core::{error::DispatchResult, status::ExitStatus, traits::RouteResolver},
    http::response::content_type,
    router::HandlerRef,
};

const HEADING: &str = "Page Not Found";

impl Dispatcher {
    /// A named override goes through the regular handler path on purpose: it
    /// fires `post_controller_constructor` and its return value becomes the
    /// page, exactly like a routed handler.
    pub(super) fn display_404(
        &mut self,
        routes: &dyn RouteResolver,
        reason: &str,
    ) -> DispatchResult<ExitStatus> {
        let returned = match routes.not_found_override() {
            Some(HandlerRef::Closure(handler)) => Some(handler(&[], &mut self.ctx)?),
            Some(HandlerRef::Named { controller, method }) => {
                match self.run_named(&controller, &method, &[])? {
                    Ok(output) => Some(output),
                    Err(not_found) => {
                        log::warn!("404 override {controller}::{method} unusable: {not_found}");
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(returned) = returned {
            self.gather_output(returned, false);
            self.send_response()?;
            return Ok(ExitStatus::Success);
        }

        self.render_404(reason)
    }

    fn render_404(&mut self, reason: &str) -> DispatchResult<ExitStatus> {
        self.ctx.output.clear();

        let (body, ct) = if self.request.is_cli() {
            (render_cli(reason), content_type::TEXT_PLAIN)
        } else {
            (render_html(reason), content_type::TEXT_HTML)
        };

        self.response.set_status(StatusCode::NOT_FOUND);
        self.response.set_header("Content-Type", ct);
        self.response.set_body(body);
        self.send_response()?;

        Ok(ExitStatus::UnknownFile)
    }
}

fn render_cli(reason: &str) -> String {
    format!("\nERROR: {HEADING}\n\n{reason}\n\n")
}

fn render_html(reason: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\t<meta charset=\"utf-8\">\n\t<title>404 {HEADING}</title>\n</head>\n<body>\n\t<div class=\"wrap\">\n\t\t<h1>404 - {HEADING}</h1>\n\t\t<p>{}</p>\n\t</div>\n</body>\n</html>\n",
        escape_html(reason)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
