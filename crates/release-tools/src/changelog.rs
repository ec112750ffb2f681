//! Changelog reading and generation.
//!
//! The changelog is a markdown file starting with a `Changelog` header
//! followed by one `## <version>` section per release, newest first:
//!
//! ```text
//! Changelog
//! =========
//!
//! ## [3.4.0](https://github.com/acme/widgets/compare/v3.3.0...v3.4.0) (2026-10-19)
//!
//! ### Bug fixes
//!
//! * Fixed a bug.
//! ```
//!
//! Generation collects the conventional commits made since the last released
//! version, computes the next version from them and prepends a new section.
use chrono::{Local, NaiveDate};
use derive_builder::Builder;
use git_conventional::Commit as ConventionalCommit;
use log::*;
use next_version::VersionUpdater;
use regex::Regex;
use semver::Version;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    config::{
        DEFAULT_CHANGELOG_FILE, DEFAULT_REMOTE, DEFAULT_TAG_PREFIX,
        DEFAULT_VERSION_FILE, tag_name,
    },
    error::Result,
    git::{CommitInfo, GitRepository},
    github::RemoteRepo,
    manifest,
};

/// Header written at the top of a new changelog.
pub const CHANGELOG_HEADER: &str = "Changelog\n=========";

const BREAKING_GROUP: &str = "MAJOR BREAKING CHANGES";
const FEATURES_GROUP: &str = "Features";
const FIXES_GROUP: &str = "Bug fixes";
const OTHER_GROUP: &str = "Other changes";
const RELEASE_COMMIT_PREFIX: &str = "Release: ";

/// Tera template for one release section.
pub const SECTION_TEMPLATE: &str = r#"{% if compare_link -%}
## [{{ version }}]({{ compare_link }}) ({{ date }})
{%- else -%}
## {{ version }} ({{ date }})
{%- endif %}
{% for group in groups %}
### {{ group.title }}
{% for entry in group.entries %}
* {% if entry.scope %}**{{ entry.scope }}**: {% endif %}{{ entry.description }}{% if entry.link %} ([commit]({{ entry.link }})){% endif %}
{%- endfor %}
{% endfor %}"#;

static VERSION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^## \[?v?(?<version>\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)",
    )
    .unwrap()
});

static ANY_RELEASE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## ").unwrap());

static EXTRA_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Options for [`generate_changelog_for_single_package`].
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct GenerateChangelogOptions {
    /// Package root; git discovery starts here.
    #[builder(default = "PathBuf::from(\".\")")]
    pub cwd: PathBuf,
    #[builder(default = "DEFAULT_CHANGELOG_FILE.into()")]
    pub changelog_file: String,
    #[builder(default = "DEFAULT_VERSION_FILE.into()")]
    pub version_file: String,
    #[builder(default = "DEFAULT_TAG_PREFIX.into()")]
    pub tag_prefix: String,
    #[builder(default = "DEFAULT_REMOTE.into()")]
    pub remote: String,
    /// Leave out compare and commit hyperlinks.
    #[builder(default)]
    pub skip_links: bool,
    /// Date printed in the section heading, today when unset.
    #[builder(default, setter(strip_option))]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
struct Entry {
    scope: Option<String>,
    description: String,
    link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Group {
    title: &'static str,
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
struct Section {
    version: String,
    date: String,
    compare_link: Option<String>,
    groups: Vec<Group>,
}

/// A commit sorted into a changelog group.
#[derive(Debug, Clone)]
struct ParsedCommit {
    group: &'static str,
    scope: Option<String>,
    description: String,
    breaking_description: Option<String>,
    id: String,
    raw_message: String,
}

impl ParsedCommit {
    fn parse(commit: &CommitInfo) -> Self {
        let raw_message = commit.message.trim_end().to_string();

        match ConventionalCommit::parse(&raw_message) {
            Ok(cc) => {
                let group = match cc.type_().as_str().to_ascii_lowercase().as_str() {
                    "feat" => FEATURES_GROUP,
                    "fix" => FIXES_GROUP,
                    _ => OTHER_GROUP,
                };

                let breaking_description = if cc.breaking() {
                    Some(
                        cc.breaking_description()
                            .unwrap_or(cc.description())
                            .to_string(),
                    )
                } else {
                    None
                };

                Self {
                    group,
                    scope: cc.scope().map(|s| s.to_string()),
                    description: upper_first(cc.description()),
                    breaking_description,
                    id: commit.id.clone(),
                    raw_message,
                }
            }
            Err(_) => {
                let first_line =
                    raw_message.lines().next().unwrap_or_default().to_string();
                Self {
                    group: OTHER_GROUP,
                    scope: None,
                    description: upper_first(&first_line),
                    breaking_description: None,
                    id: commit.id.clone(),
                    raw_message,
                }
            }
        }
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_extra_lines(content: &str) -> String {
    EXTRA_LINES.replace_all(content, "\n\n").to_string()
}

/// Most recent version heading in changelog `content`.
pub fn last_version_in(content: &str) -> Option<Version> {
    VERSION_HEADING
        .captures_iter(content)
        .find_map(|caps| Version::parse(&caps["version"]).ok())
}

/// Body of the section for `version` in changelog `content`, trimmed.
pub fn changes_for_version_in(content: &str, version: &Version) -> Option<String> {
    let wanted = version.to_string();
    let headings = VERSION_HEADING.captures_iter(content).collect::<Vec<_>>();

    for (idx, caps) in headings.iter().enumerate() {
        if caps["version"] != wanted {
            continue;
        }

        let heading = caps.get(0)?;
        let body_start = content[heading.end()..]
            .find('\n')
            .map(|offset| heading.end() + offset)
            .unwrap_or(content.len());

        let body_end = headings
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());

        let body = content[body_start..body_end].trim();

        if body.is_empty() {
            return None;
        }

        return Some(body.to_string());
    }

    None
}

fn read_changelog(cwd: &Path, file: &str) -> Result<Option<String>> {
    let path = cwd.join(file);
    if !path.exists() {
        debug!("no changelog found at {}", path.display());
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}

/// Latest released version recorded in the changelog.
pub fn get_last_from_changelog(cwd: &Path, file: &str) -> Result<Option<Version>> {
    Ok(read_changelog(cwd, file)?.and_then(|c| last_version_in(&c)))
}

/// Changelog entries recorded for `version`.
pub fn get_changes_for_version(
    cwd: &Path,
    file: &str,
    version: &Version,
) -> Result<Option<String>> {
    Ok(read_changelog(cwd, file)?.and_then(|c| changes_for_version_in(&c, version)))
}

/// Insert `section` above the newest release in `existing`.
pub fn insert_section(existing: Option<&str>, section: &str) -> String {
    let existing = existing.unwrap_or_default();
    let section = section.trim();

    let first_heading = ANY_RELEASE_HEADING.find(existing).map(|m| m.start());

    let (head, tail) = match first_heading {
        Some(pos) => (existing[..pos].trim_end(), existing[pos..].trim_end()),
        None => (existing.trim_end(), ""),
    };

    let head = if head.is_empty() { CHANGELOG_HEADER } else { head };

    let mut content = format!("{head}\n\n{section}\n");

    if !tail.is_empty() {
        content = format!("{content}\n{tail}\n");
    }

    content
}

fn render_section(section: &Section) -> Result<String> {
    let context = tera::Context::from_serialize(section)?;
    let rendered = tera::Tera::one_off(SECTION_TEMPLATE, &context, false)?;
    Ok(strip_extra_lines(rendered.trim()))
}

fn build_groups(commits: &[ParsedCommit], web_url: Option<&str>) -> Vec<Group> {
    let link = |c: &ParsedCommit| web_url.map(|url| format!("{url}/commit/{}", c.id));

    let breaking = Group {
        title: BREAKING_GROUP,
        entries: commits
            .iter()
            .filter_map(|c| {
                c.breaking_description.as_ref().map(|d| Entry {
                    scope: c.scope.clone(),
                    description: upper_first(d),
                    link: link(c),
                })
            })
            .collect(),
    };

    let mut groups = vec![breaking];

    for title in [FEATURES_GROUP, FIXES_GROUP, OTHER_GROUP] {
        groups.push(Group {
            title,
            entries: commits
                .iter()
                .filter(|c| c.group == title)
                .map(|c| Entry {
                    scope: c.scope.clone(),
                    description: c.description.clone(),
                    link: link(c),
                })
                .collect(),
        });
    }

    groups.into_iter().filter(|g| !g.entries.is_empty()).collect()
}

fn resolve_web_url(repo: &GitRepository, remote: &str) -> Option<String> {
    let url = match repo.remote_url(remote) {
        Ok(url) => url,
        Err(err) => {
            warn!("links disabled: {err}");
            return None;
        }
    };

    match RemoteRepo::parse(&url) {
        Ok(parsed) => Some(parsed.web_url()),
        Err(err) => {
            warn!("links disabled: {err}");
            None
        }
    }
}

/// Prepend a section for the next version to the changelog.
///
/// Returns the version the section was written for, or `None` when no
/// commits were made since the last release.
pub fn generate_changelog_for_single_package(
    options: &GenerateChangelogOptions,
) -> Result<Option<Version>> {
    let repo = GitRepository::open(&options.cwd)?;
    let existing = read_changelog(&options.cwd, &options.changelog_file)?;

    let current = match existing.as_deref().and_then(last_version_in) {
        Some(version) => Some(version),
        None => manifest::read_version(&options.cwd, &options.version_file)?,
    };

    let previous_tag = repo.latest_tag(&options.tag_prefix)?;

    match &previous_tag {
        Some(tag) => info!("collecting commits since {tag}"),
        None => info!("no previous release tag found: using history up to the last release commit"),
    }

    // an untagged release commit still closes the previous release
    let commits = repo
        .commits_since(previous_tag.as_deref())?
        .iter()
        .take_while(|c| !c.message.starts_with(RELEASE_COMMIT_PREFIX))
        .map(ParsedCommit::parse)
        .collect::<Vec<ParsedCommit>>();

    if commits.is_empty() {
        warn!("no changes found since last release: changelog left untouched");
        return Ok(None);
    }

    let current = current.unwrap_or(Version::new(0, 0, 0));

    let version_updater = VersionUpdater::new()
        .with_breaking_always_increment_major(true)
        .with_features_always_increment_minor(true);

    let messages = commits
        .iter()
        .map(|c| c.raw_message.clone())
        .collect::<Vec<String>>();

    let next = version_updater.increment(&current, messages);

    info!("next version: {next} (current: {current})");

    let web_url = if options.skip_links {
        None
    } else {
        resolve_web_url(&repo, &options.remote)
    };

    let next_tag = tag_name(&options.tag_prefix, &next);

    let compare_link = web_url.as_ref().map(|url| match &previous_tag {
        Some(tag) => format!("{url}/compare/{tag}...{next_tag}"),
        None => format!("{url}/releases/tag/{next_tag}"),
    });

    let date = options.date.unwrap_or_else(|| Local::now().date_naive());

    let section = Section {
        version: next.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        compare_link,
        groups: build_groups(&commits, web_url.as_deref()),
    };

    let rendered = render_section(&section)?;
    let content = insert_section(existing.as_deref(), &rendered);

    fs::write(options.cwd.join(&options.changelog_file), content)?;

    info!("wrote changelog entry for {next} to {}", options.changelog_file);

    Ok(Some(next))
}

#[cfg(test)]
#[path = "./changelog_tests.rs"]
mod tests;
