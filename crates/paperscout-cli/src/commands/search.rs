//! Search command

use crate::app::{OutputFormat, SearchArgs};
use crate::output;
use futures::StreamExt;
use paperscout_core::{
    Config, PaperScoutError, SearchFilters, SearchPipeline, SearchRequest, StreamEvent,
    YearFilter,
};
use std::io::Write;

pub async fn run(
    args: SearchArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), PaperScoutError> {
    let request = build_request(&args)?;
    let pipeline = SearchPipeline::from_config(config)?;

    if args.stream {
        run_streaming(&pipeline, request, format).await
    } else {
        let response = pipeline.search(request).await?;
        print!("{}", output::format_response(&response, format));
        Ok(())
    }
}

async fn run_streaming(
    pipeline: &SearchPipeline,
    request: SearchRequest,
    format: OutputFormat,
) -> Result<(), PaperScoutError> {
    let mut events = pipeline.search_stream(request).await?;
    let mut stdout = std::io::stdout();

    while let Some(event) = events.next().await {
        match format {
            // One JSON object per line, exactly as emitted.
            OutputFormat::Json => {
                let line = serde_json::to_string(&event)?;
                writeln!(stdout, "{}", line)?;
            }
            OutputFormat::Cli => match event {
                StreamEvent::Metadata(metadata) => {
                    print!("{}", output::format_stream_metadata(&metadata));
                }
                StreamEvent::Chunk(text) => {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                }
                StreamEvent::Error(message) => {
                    eprintln!("\nstream error: {}", message);
                }
                StreamEvent::Done => {
                    writeln!(stdout)?;
                }
            },
        }
    }
    Ok(())
}

fn build_request(args: &SearchArgs) -> Result<SearchRequest, PaperScoutError> {
    let query = args.query.join(" ");
    let filters = build_filters(args)?;

    let request = SearchRequest {
        query: if query.trim().is_empty() {
            None
        } else {
            Some(query)
        },
        top_k: args.top_k,
        filters,
        mode: args.mode.into(),
        parse_filters_from_query: !args.no_parse_filters,
    };
    request.validate()?;
    Ok(request)
}

fn build_filters(args: &SearchArgs) -> Result<Option<SearchFilters>, PaperScoutError> {
    let year = match (args.year, args.from_year, args.to_year) {
        (Some(exact), _, _) => Some(YearFilter::exact(exact)),
        (None, None, None) => None,
        (None, min, max) => Some(YearFilter::range(min, max)?),
    };

    let filters = SearchFilters {
        year,
        bibkey: args.bibkey.clone(),
        title_keywords: non_empty(&args.title_keywords),
        language: args.language.clone(),
        authors: non_empty(&args.authors),
        has_awards: args.awarded.then_some(true),
        awards: non_empty(&args.awards),
    };

    Ok(if filters.is_empty() {
        None
    } else {
        Some(filters)
    })
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}
