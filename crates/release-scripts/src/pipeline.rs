//! Ordered release steps and their runner.
//!
//! Each [`Step`] declares whether `--deploy-only` skips it. The runner checks
//! that declaration right before the step would start, runs the steps one
//! after another and stops at the first failure.
use color_eyre::eyre::{Result, eyre};
use derive_builder::Builder;
use log::*;
use secrecy::SecretString;
use semver::Version;
use strum::Display;
use thiserror::Error;

use crate::{args::ReleaseOptions, config::ReleaseConfig, tools::ReleaseTools};

/// The release steps, displayed by their title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StepKind {
    #[strum(to_string = "Verifying the repository.")]
    Verify,
    #[strum(to_string = "Updating the `#version` field.")]
    BumpVersion,
    #[strum(to_string = "Commit & tag.")]
    CommitAndTag,
    #[strum(to_string = "Pushing changes.")]
    Push,
    #[strum(to_string = "Creating the release page.")]
    PublishReleasePage,
}

/// One named unit of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    /// Skipped when the run is deploy-only.
    pub skip_when_deploy_only: bool,
    /// Output is kept and shown after the step completes.
    pub persistent_output: bool,
}

impl Step {
    pub fn title(&self) -> String {
        self.kind.to_string()
    }

    pub fn should_skip(&self, options: &ReleaseOptions) -> bool {
        self.skip_when_deploy_only && options.deploy_only
    }
}

/// The fixed step list in execution order.
pub fn release_steps() -> Vec<Step> {
    vec![
        Step {
            kind: StepKind::Verify,
            skip_when_deploy_only: true,
            persistent_output: false,
        },
        Step {
            kind: StepKind::BumpVersion,
            skip_when_deploy_only: true,
            persistent_output: false,
        },
        Step {
            kind: StepKind::CommitAndTag,
            skip_when_deploy_only: true,
            persistent_output: false,
        },
        Step {
            kind: StepKind::Push,
            skip_when_deploy_only: true,
            persistent_output: false,
        },
        // TODO: confirm whether deploy-only runs should still publish the
        // release page.
        Step {
            kind: StepKind::PublishReleasePage,
            skip_when_deploy_only: true,
            persistent_output: true,
        },
    ]
}

/// Failures raised by the steps themselves rather than by the tooling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Aborted due to errors.\n{}", bullet_list(.0))]
    Aborted(Vec<String>),
}

fn bullet_list(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("* {m}"))
        .collect::<Vec<String>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub title: String,
    pub status: StepStatus,
    /// Persistent output, present only for steps that keep it.
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    /// All persistent output, in step order.
    pub fn outputs(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| s.output.as_deref())
            .collect()
    }
}

/// Everything a release run works on, fixed before the first step starts.
#[derive(Builder, Debug, Clone)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct ReleasePlan {
    pub version: Version,
    #[builder(default)]
    pub changes: Option<String>,
    #[builder(default)]
    pub token: Option<SecretString>,
    #[builder(default)]
    pub options: ReleaseOptions,
    #[builder(default)]
    pub config: ReleaseConfig,
}

impl ReleasePlanBuilder {
    pub fn build(&self) -> Result<ReleasePlan> {
        self._build()
            .map_err(|e| eyre!("failed to build release plan: {e}"))
    }
}

impl ReleasePlan {
    pub fn builder() -> ReleasePlanBuilder {
        ReleasePlanBuilder::default()
    }
}

/// Runs [`release_steps`] against one [`ReleasePlan`].
pub struct ReleasePipeline<'t> {
    tools: &'t dyn ReleaseTools,
    plan: ReleasePlan,
    steps: Vec<Step>,
}

impl<'t> ReleasePipeline<'t> {
    pub fn new(tools: &'t dyn ReleaseTools, plan: ReleasePlan) -> Self {
        Self {
            tools,
            plan,
            steps: release_steps(),
        }
    }

    /// Run every step in order. The first failing step ends the run.
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        for step in self.steps.iter() {
            let title = step.title();

            if step.should_skip(&self.plan.options) {
                info!("{title} [skipped]");
                report.steps.push(StepReport {
                    title,
                    status: StepStatus::Skipped,
                    output: None,
                });
                continue;
            }

            info!("{title}");

            let output = self.execute(step.kind).await.inspect_err(|err| {
                error!("{title} [failed]: {err}");
            })?;

            let output = output.filter(|_| step.persistent_output);

            if let Some(output) = &output {
                info!("{title} {output}");
            }

            report.steps.push(StepReport {
                title,
                status: StepStatus::Completed,
                output,
            });
        }

        Ok(report)
    }

    async fn execute(&self, kind: StepKind) -> Result<Option<String>> {
        let plan = &self.plan;
        let version = &plan.version;

        match kind {
            StepKind::Verify => {
                let errors = self
                    .tools
                    .validate_repository_to_release(
                        version,
                        plan.changes.clone(),
                        &plan.config.release_branch,
                    )
                    .await?;

                if errors.is_empty() {
                    return Ok(None);
                }

                Err(StepError::Aborted(errors).into())
            }
            StepKind::BumpVersion => {
                self.tools.update_versions(version).await?;
                Ok(None)
            }
            StepKind::CommitAndTag => {
                self.tools
                    .commit_and_tag(version, vec![plan.config.version_file.clone()])
                    .await?;
                Ok(None)
            }
            StepKind::Push => {
                self.tools
                    .push(&plan.config.release_branch, version)
                    .await?;
                Ok(None)
            }
            StepKind::PublishReleasePage => {
                let url = self
                    .tools
                    .create_github_release(
                        plan.token.clone(),
                        version,
                        plan.changes.as_deref().unwrap_or_default(),
                    )
                    .await?;
                Ok(Some(format!("Release page: {url}")))
            }
        }
    }
}

#[cfg(test)]
#[path = "./pipeline_tests.rs"]
mod tests;
