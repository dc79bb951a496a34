//! Terminal output formatter

use paperscout_core::{PaperMetadata, SearchResponse, SearchResult, StreamMetadata};

pub fn format_response(response: &SearchResponse) -> String {
    let mut output = String::new();

    output.push_str(&format_results(&response.results));
    if !response.results.is_empty() {
        output.push('\n');
    }
    output.push_str(&response.response);
    output.push('\n');
    output
}

pub fn format_stream_metadata(metadata: &StreamMetadata) -> String {
    let mut output = format_results(&metadata.results);
    if !metadata.results.is_empty() {
        output.push('\n');
    }
    output
}

pub fn format_paper(paper: &PaperMetadata) -> String {
    let mut output = format!("{} ({})\n", paper.title, paper.paper_id);
    if let Some(ref year) = paper.year {
        output.push_str(&format!("  year:    {}\n", year));
    }
    if let Some(ref authors) = paper.authors {
        output.push_str(&format!("  authors: {}\n", authors.join(", ")));
    }
    if let Some(ref url) = paper.pdf_url {
        output.push_str(&format!("  pdf:     {}\n", url));
    }
    if let Some(ref abstract_text) = paper.abstract_text {
        output.push('\n');
        output.push_str(abstract_text);
        output.push('\n');
    }
    output
}

fn format_results(results: &[SearchResult]) -> String {
    let mut output = String::new();
    for (i, result) in results.iter().enumerate() {
        let score_pct = (result.score * 100.0) as u32;
        output.push_str(&format!(
            "{:>2}. {:>3}% {} ({}, {})\n",
            i + 1,
            score_pct,
            result.paper.title,
            result.paper.paper_id,
            result.paper.year.as_deref().unwrap_or("n.d."),
        ));
    }
    output
}
