//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use paperscout_core::{PaperMetadata, PaperScoutError, SearchResponse, StreamMetadata};

/// Format a complete search response
pub fn format_response(response: &SearchResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_response(response),
        OutputFormat::Cli => terminal::format_response(response),
    }
}

/// Format the metadata event preceding a streamed answer
pub fn format_stream_metadata(metadata: &StreamMetadata) -> String {
    terminal::format_stream_metadata(metadata)
}

/// Format a single paper
pub fn format_paper(
    paper: &PaperMetadata,
    format: OutputFormat,
) -> Result<String, PaperScoutError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(paper)? + "\n"),
        OutputFormat::Cli => Ok(terminal::format_paper(paper)),
    }
}
