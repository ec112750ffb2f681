use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use log::*;
use release_scripts::{
    args::ChangelogArgs, config::load_config, logging::initialize_logger,
};
use release_tools::{
    GenerateChangelogOptionsBuilder, generate_changelog_for_single_package,
};
use std::env;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = ChangelogArgs::parse();

    initialize_logger(args.debug)?;

    let cwd = env::current_dir()?;
    let config = load_config(&cwd)?;

    let options = GenerateChangelogOptionsBuilder::default()
        .cwd(cwd)
        .changelog_file(config.changelog_file.clone())
        .version_file(config.version_file)
        .tag_prefix(config.tag_prefix)
        .remote(config.remote)
        .skip_links(true)
        .build()
        .map_err(|e| eyre!("invalid changelog options: {e}"))?;

    match generate_changelog_for_single_package(&options)? {
        Some(version) => {
            info!("added {version} to {}", config.changelog_file)
        }
        None => info!("no changes to record"),
    }

    Ok(())
}
