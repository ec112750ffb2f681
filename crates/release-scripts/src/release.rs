//! Release orchestration: gathers what the pipeline needs and runs it.
use color_eyre::eyre::Result;
use log::*;
use secrecy::SecretString;

use crate::{
    args::ReleaseOptions,
    config::ReleaseConfig,
    pipeline::{PipelineReport, ReleasePipeline, ReleasePlan},
    tools::ReleaseTools,
};

/// Token for the release page. Deploy-only runs never ask for one.
pub async fn get_github_token(
    tools: &dyn ReleaseTools,
    options: &ReleaseOptions,
) -> Result<Option<SecretString>> {
    if options.deploy_only {
        debug!("deploy-only run: not requesting a token");
        return Ok(None);
    }

    Ok(Some(tools.provide_token().await?))
}

/// Read the release version and its changelog, then acquire the token.
pub async fn prepare(
    tools: &dyn ReleaseTools,
    options: ReleaseOptions,
    config: ReleaseConfig,
) -> Result<ReleasePlan> {
    let version = tools.get_last_from_changelog()?;
    let changes = tools.get_changes_for_version(&version)?;

    info!("releasing version {version}");

    let token = get_github_token(tools, &options).await?;

    ReleasePlan::builder()
        .version(version)
        .changes(changes)
        .token(token)
        .options(options)
        .config(config)
        .build()
}

/// Run the pipeline, reporting a failure instead of returning it.
pub async fn execute(pipeline: &ReleasePipeline<'_>) -> Option<PipelineReport> {
    match pipeline.run().await {
        Ok(report) => Some(report),
        Err(err) => {
            error!("release failed");
            eprintln!("{err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::StepStatus,
        tools::MockReleaseTools,
    };
    use color_eyre::eyre::eyre;
    use mockall::{Sequence, predicate::eq};
    use secrecy::ExposeSecret;
    use semver::Version;

    #[tokio::test]
    async fn deploy_only_never_requests_token() {
        let mut tools = MockReleaseTools::new();
        tools.expect_provide_token().times(0);

        let token =
            get_github_token(&tools, &ReleaseOptions { deploy_only: true })
                .await
                .unwrap();

        assert!(token.is_none());
    }

    #[tokio::test]
    async fn full_release_requests_token_once() {
        let mut tools = MockReleaseTools::new();
        tools
            .expect_provide_token()
            .times(1)
            .returning(|| Ok(SecretString::from("secret")));

        let token =
            get_github_token(&tools, &ReleaseOptions { deploy_only: false })
                .await
                .unwrap();

        assert_eq!(token.unwrap().expose_secret(), "secret");
    }

    #[tokio::test]
    async fn token_failure_propagates() {
        let mut tools = MockReleaseTools::new();
        tools
            .expect_provide_token()
            .times(1)
            .returning(|| Err(eyre!("no token")));

        let result = get_github_token(&tools, &ReleaseOptions::default()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn releases_latest_changelog_version_end_to_end() {
        let version = Version::new(3, 4, 0);
        let mut tools = MockReleaseTools::new();
        let mut seq = Sequence::new();

        tools
            .expect_get_last_from_changelog()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Version::new(3, 4, 0)));

        tools
            .expect_get_changes_for_version()
            .with(eq(version.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some("- Fixed a bug.".to_string())));

        tools
            .expect_provide_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(SecretString::from("secret")));

        tools
            .expect_validate_repository_to_release()
            .withf(|v, changes, branch| {
                *v == Version::new(3, 4, 0)
                    && changes.as_deref() == Some("- Fixed a bug.")
                    && branch == "master"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(vec![]));

        tools
            .expect_update_versions()
            .with(eq(version.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        tools
            .expect_commit_and_tag()
            .withf(|v, files| {
                *v == Version::new(3, 4, 0) && files == &vec!["package.json".to_string()]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        tools
            .expect_push()
            .withf(|branch, v| branch == "master" && *v == Version::new(3, 4, 0))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        tools
            .expect_create_github_release()
            .withf(|token, v, description| {
                token.as_ref().map(|t| t.expose_secret().to_string())
                    == Some("secret".to_string())
                    && *v == Version::new(3, 4, 0)
                    && description == "- Fixed a bug."
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| {
                Ok("https://github.com/acme/widgets/releases/tag/v3.4.0".into())
            });

        let plan = prepare(
            &tools,
            ReleaseOptions { deploy_only: false },
            ReleaseConfig::default(),
        )
        .await
        .unwrap();

        let pipeline = ReleasePipeline::new(&tools, plan);
        let report = execute(&pipeline).await.unwrap();

        assert_eq!(report.steps.len(), 5);
        assert!(
            report
                .steps
                .iter()
                .all(|s| s.status == StepStatus::Completed)
        );
        assert_eq!(
            report.outputs(),
            vec!["Release page: https://github.com/acme/widgets/releases/tag/v3.4.0"]
        );
    }

    #[tokio::test]
    async fn failed_step_is_reported_not_returned() {
        let mut tools = MockReleaseTools::new();
        tools
            .expect_validate_repository_to_release()
            .times(1)
            .returning(|_, _, _| Ok(vec!["Not on the \"#master\" branch.".into()]));
        tools.expect_update_versions().times(0);

        let plan = ReleasePlan::builder()
            .version(Version::new(3, 4, 0))
            .build()
            .unwrap();
        let pipeline = ReleasePipeline::new(&tools, plan);

        assert!(execute(&pipeline).await.is_none());
    }

    #[tokio::test]
    async fn missing_changelog_version_stops_before_pipeline() {
        let mut tools = MockReleaseTools::new();
        tools
            .expect_get_last_from_changelog()
            .times(1)
            .returning(|| Err(eyre!("no released version found in CHANGELOG.md")));
        tools.expect_provide_token().times(0);

        let result =
            prepare(&tools, ReleaseOptions::default(), ReleaseConfig::default())
                .await;

        assert!(result.is_err());
    }
}
