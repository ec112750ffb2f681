//! Command line arguments for the release scripts.
use clap::{ArgAction, CommandFactory, Parser};
use log::*;
use std::iter;

const DEPLOY_ONLY_FLAG: &str = "--deploy-only";

/// Publish the release recorded at the top of the changelog.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "release", version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Args {
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    /// Skip the repository mutating steps.
    pub deploy_only: bool,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

/// Generate the changelog entry for the next release.
#[derive(Parser, Debug)]
#[command(name = "changelog", version, about, long_about = None)]
pub struct ChangelogArgs {
    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

/// Options that steer the release pipeline. Immutable once parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseOptions {
    pub deploy_only: bool,
}

impl Args {
    pub fn options(&self) -> ReleaseOptions {
        ReleaseOptions {
            deploy_only: self.deploy_only,
        }
    }
}

/// Parse release arguments, excluding the program name.
///
/// Tokens that do not name a known flag are dropped before parsing so
/// unrelated flags passed through by wrappers never fail the run.
pub fn parse_options<I, T>(argv: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut command = Args::command();
    command.build();

    let mut known = vec![];
    for arg in command.get_arguments() {
        if let Some(long) = arg.get_long() {
            known.push(format!("--{long}"));
        }
        if let Some(short) = arg.get_short() {
            known.push(format!("-{short}"));
        }
    }

    let kept = argv
        .into_iter()
        .map(Into::into)
        .filter_map(|token: String| {
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token.as_str(), None),
            };

            if !known.iter().any(|k| k == name) {
                debug!("ignoring unrecognized argument: {token}");
                return None;
            }

            normalize(name, value)
        })
        .collect::<Vec<String>>();

    Args::try_parse_from(iter::once("release".to_string()).chain(kept))
}

/// Any value other than `false` switches a flag on.
fn normalize(name: &str, value: Option<&str>) -> Option<String> {
    let enabled = value.is_none_or(|v| v != "false");

    if name == DEPLOY_ONLY_FLAG {
        return Some(format!("{name}={enabled}"));
    }

    enabled.then(|| name.to_string())
}
