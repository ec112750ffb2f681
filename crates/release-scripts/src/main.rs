use color_eyre::eyre::Result;
use log::*;
use release_scripts::{
    args::parse_options,
    config::load_config,
    logging::initialize_logger,
    pipeline::ReleasePipeline,
    release::{execute, prepare},
    tools::Toolkit,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = parse_options(env::args().skip(1)).unwrap_or_else(|err| err.exit());

    initialize_logger(args.debug)?;

    let cwd = env::current_dir()?;
    let config = load_config(&cwd)?;
    let tools = Toolkit::new(cwd, config.clone());

    let plan = prepare(&tools, args.options(), config).await?;
    let pipeline = ReleasePipeline::new(&tools, plan);

    if let Some(report) = execute(&pipeline).await {
        for output in report.outputs() {
            println!("{output}");
        }
        info!("release complete");
    }

    Ok(())
}
