//! Paper lookup command

use crate::app::{OutputFormat, PaperArgs};
use crate::output;
use paperscout_core::{Config, PaperScoutError, SearchPipeline};

pub async fn run(
    args: PaperArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), PaperScoutError> {
    let pipeline = SearchPipeline::from_config(config)?;
    let paper = pipeline.get_paper(&args.paper_id).await?;
    print!("{}", output::format_paper(&paper, format)?);
    Ok(())
}
