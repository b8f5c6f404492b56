//! One-shot `search` and `suggest` commands.

use anyhow::Result;
use std::path::Path;

use targeting_finder_core::controller::SearchController;
use targeting_finder_core::export::ExportFormat;
use targeting_finder_core::models::{normalize_country, Category, EducationKind};
use targeting_finder_core::request::SearchOptions;

use crate::client::make_fetcher;
use crate::config::Config;
use crate::export::write_export;
use crate::shell;

/// Filters shared by `search`, `suggest`, and `shell`.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub country: Option<String>,
    pub education: Option<EducationKind>,
    pub limit: Option<i64>,
    pub server: Option<String>,
}

impl SearchArgs {
    /// A controller seeded from config defaults with these overrides applied.
    pub fn controller(&self, config: &Config, category: Category) -> Result<SearchController> {
        let country = self
            .country
            .as_deref()
            .unwrap_or(&config.search.default_country);
        let mut controller = SearchController::new(SearchOptions {
            country: normalize_country(country)?,
            education: self.education.unwrap_or_default(),
        });
        controller.switch_category(category);
        controller.set_limit(self.limit.unwrap_or(config.search.default_limit as i64));
        Ok(controller)
    }
}

/// Where `search --export` writes.
#[derive(Debug, Clone)]
pub struct ExportArgs<'a> {
    pub format: ExportFormat,
    pub output: Option<&'a Path>,
}

/// Run a committed search and print the results table.
///
/// With `add_all` every result is added to the selection and the selection
/// is printed. With `export` the selection (all results) is exported
/// instead; exporting to stdout suppresses the table.
pub async fn run_search(
    config: &Config,
    category: Category,
    query: &str,
    args: &SearchArgs,
    add_all: bool,
    export: Option<ExportArgs<'_>>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let fetcher = make_fetcher(config, args.server.as_deref())?;
    let mut controller = args.controller(config, category)?;
    controller.search_for(query, fetcher.as_ref()).await;

    if add_all || export.is_some() {
        controller.add_all_results();
    }

    match export {
        Some(ExportArgs { format, output }) => {
            if output.is_some() {
                shell::render_results(controller.results(), controller.selection());
            } else {
                eprintln!("{} results", controller.results().len());
            }
            write_export(controller.selection().items(), format, output)?;
        }
        None => {
            shell::render_results(controller.results(), controller.selection());
            if add_all {
                println!();
                shell::render_selection(controller.selection());
            }
        }
    }

    Ok(())
}

/// Fetch the suggestion dropdown for `query` and print it.
pub async fn run_suggest(
    config: &Config,
    category: Category,
    query: &str,
    args: &SearchArgs,
) -> Result<()> {
    let fetcher = make_fetcher(config, args.server.as_deref())?;
    let controller = args.controller(config, category)?;
    let request = controller.build_suggest_request(query.trim());
    tracing::debug!(request = %request, "suggest");

    let items = if query.trim().is_empty() {
        Vec::new()
    } else {
        match fetcher.fetch(&request).await {
            Ok(response) => response.into_items(),
            Err(e) => {
                tracing::warn!(error = %e, "suggestion fetch failed");
                Vec::new()
            }
        }
    };

    if items.is_empty() {
        println!("No suggestions.");
        return Ok(());
    }
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:>2}. {}  {}  [{}]",
            i + 1,
            item.name,
            targeting_finder_core::selection::display_audience(item),
            item.id
        );
    }
    Ok(())
}
