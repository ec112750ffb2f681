//! GitHub token acquisition.
use log::*;
use secrecy::SecretString;
use std::{
    env,
    io::{self, BufRead, Write},
};

use crate::{
    config::GITHUB_TOKEN_ENV,
    error::{ReleaseToolsError, Result},
};

const TOKEN_PROMPT: &str = "Provide the GitHub token: ";

/// Return the token from `GITHUB_TOKEN`, or ask for it on the terminal.
pub fn provide_token() -> Result<SecretString> {
    let from_env = env::var(GITHUB_TOKEN_ENV).ok();
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    read_token(from_env, &mut stdin.lock(), &mut stderr)
}

fn read_token(
    from_env: Option<String>,
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> Result<SecretString> {
    if let Some(token) = from_env.filter(|t| !t.trim().is_empty()) {
        debug!("using token from {GITHUB_TOKEN_ENV}");
        return Ok(SecretString::from(token.trim().to_string()));
    }

    write!(prompt, "{TOKEN_PROMPT}")?;
    prompt.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let token = line.trim();

    if token.is_empty() {
        return Err(ReleaseToolsError::missing_token(format!(
            "set {GITHUB_TOKEN_ENV} or enter a token when prompted"
        )));
    }

    Ok(SecretString::from(token.to_string()))
}
