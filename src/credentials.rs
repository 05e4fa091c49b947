//! Bearer token and page URL resolution.
//!
//! Resolution order per value: `--manual` forces a prompt; otherwise the
//! environment variable, then a prompt when the variable is unset or blank.

use std::io::{BufRead as _, IsTerminal as _, Write as _};

use crate::config::EnvSnapshot;
use crate::error::Error;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: String,
    pub page_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .field("page_url", &self.page_url)
            .finish()
    }
}

/// Source of interactively entered values.
pub trait Prompt {
    /// Ask for a single line. `secret` marks values that should not be echoed
    /// back in logs.
    fn ask(&mut self, question: &str, secret: bool) -> std::io::Result<String>;
}

/// Prompts on stderr and reads answers from stdin. Secret answers typed on
/// a terminal are read without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str, secret: bool) -> std::io::Result<String> {
        {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{question}: ")?;
            stderr.flush()?;
        }

        let stdin = std::io::stdin();
        if hides_input(secret, stdin.is_terminal()) {
            return rpassword::read_password();
        }

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Piped input cannot be hidden, and hiding it would block on the tty.
fn hides_input(secret: bool, interactive: bool) -> bool {
    secret && interactive
}

pub fn resolve(
    manual: bool,
    env: &EnvSnapshot,
    prompt: &mut impl Prompt,
) -> Result<Credentials, Error> {
    let from_env = |value: &Option<String>| {
        if manual {
            return None;
        }
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    let page_url = match from_env(&env.page_url) {
        Some(page_url) => page_url,
        None => ask(prompt, "page URL", "Enter the wiki page URL", false)?,
    };
    let bearer_token = match from_env(&env.bearer_token) {
        Some(token) => token,
        None => ask(prompt, "bearer token", "Enter your API bearer token", true)?,
    };

    tracing::debug!(manual, page_url = %page_url, "resolved credentials");
    Ok(Credentials {
        bearer_token,
        page_url,
    })
}

fn ask(
    prompt: &mut impl Prompt,
    field: &'static str,
    question: &str,
    secret: bool,
) -> Result<String, Error> {
    let answer = prompt
        .ask(question, secret)
        .map_err(|source| Error::Prompt { field, source })?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(Error::MissingCredential { field });
    }
    Ok(answer.to_owned())
}
