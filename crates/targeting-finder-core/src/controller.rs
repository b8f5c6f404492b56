//! Search controller: the state behind one search screen.
//!
//! [`SearchController`] owns the active category, the query text, the
//! per-category sub-options, the results table, the selection set, and the
//! suggestion dropdown. All mutation goes through named transitions
//! (`switch_category`, `type_text`, `pick_suggestion`, `begin_search`, …).
//!
//! Network access goes through [`TaxonomyFetcher`]. Hosts that interleave
//! events (timers, keystrokes, fetch completions) use the split
//! `begin_search` / `apply_search` pair; one-shot callers use
//! [`SearchController::commit_search`].

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Category, EducationKind, ProxyResponse, TaxonomyItem};
use crate::request::{
    build_request, build_suggest_request, clamp_limit, ProxyRequest, SearchOptions, DEFAULT_LIMIT,
};
use crate::selection::SelectionSet;
use crate::suggest::{BlurTicket, DebounceTicket, SuggestionBox};

/// Executes proxy requests.
///
/// Implementations may call the proxy over HTTP or run it in-process.
/// A returned `Err` is a transport failure; callers collapse it into an
/// empty result.
#[async_trait]
pub trait TaxonomyFetcher: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse>;
}

/// A search the host must execute and report back via
/// [`SearchController::apply_search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub seq: u64,
    pub request: ProxyRequest,
}

/// A suggestion fetch the host must execute and report back via
/// [`SearchController::apply_suggestions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggest {
    pub seq: u64,
    pub request: ProxyRequest,
}

#[derive(Debug, Clone)]
pub struct SearchController {
    category: Category,
    query: String,
    options: SearchOptions,
    /// Limit as the user entered it; clamped when a search is committed.
    limit: i64,
    results: Vec<TaxonomyItem>,
    selection: SelectionSet,
    suggest: SuggestionBox,
    search_seq: u64,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl SearchController {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            category: Category::Interests,
            query: String::new(),
            options,
            limit: DEFAULT_LIMIT as i64,
            results: Vec::new(),
            selection: SelectionSet::new(),
            suggest: SuggestionBox::new(),
            search_seq: 0,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn limit(&self) -> u32 {
        clamp_limit(self.limit)
    }

    pub fn results(&self) -> &[TaxonomyItem] {
        &self.results
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn suggestions(&self) -> &SuggestionBox {
        &self.suggest
    }

    // ── Sub-options ──────────────────────────────────────────────────

    /// Switch to another category tab.
    ///
    /// Resets the query, force-closes suggestions, and clears the results.
    /// Any search still in flight for the previous tab is disowned.
    pub fn switch_category(&mut self, category: Category) {
        self.category = category;
        self.query.clear();
        self.suggest.force_close();
        self.suggest.set_value("");
        self.results.clear();
        self.search_seq += 1;
    }

    /// Set the country filter (interests). Expects a normalised code.
    pub fn set_country(&mut self, country: impl Into<String>) {
        self.options.country = country.into();
    }

    pub fn set_education(&mut self, kind: EducationKind) {
        self.options.education = kind;
    }

    /// Store the user's limit as entered; it is clamped at commit time.
    pub fn set_limit(&mut self, limit: i64) {
        self.limit = limit;
    }

    // ── Suggestions ──────────────────────────────────────────────────

    /// A keystroke changed the query text.
    pub fn type_text(&mut self, text: &str) -> Option<DebounceTicket> {
        self.query = text.to_string();
        self.suggest.input(text)
    }

    /// The request used for the suggestion dropdown.
    pub fn build_suggest_request(&self, query: &str) -> ProxyRequest {
        build_suggest_request(self.category, query, &self.options)
    }

    /// The debounce timer for `ticket` fired.
    pub fn debounce_elapsed(&mut self, ticket: DebounceTicket) -> Option<PendingSuggest> {
        let fetch = self.suggest.debounce_elapsed(ticket)?;
        Some(PendingSuggest {
            seq: fetch.seq,
            request: self.build_suggest_request(&fetch.query),
        })
    }

    pub fn apply_suggestions(&mut self, seq: u64, result: Result<ProxyResponse>) -> bool {
        self.suggest.suggestions(seq, result)
    }

    /// Pick the suggestion at `index`: fill the query, add the item to the
    /// selection, and commit a search for it in one gesture.
    pub fn pick_suggestion(&mut self, index: usize) -> Option<PendingSearch> {
        let item = self.suggest.pick(index)?;
        self.query = item.name.clone();
        self.selection.add(item);
        self.begin_search()
    }

    /// Enter pressed in the search input.
    pub fn press_enter(&mut self) -> Option<PendingSearch> {
        self.suggest.enter();
        self.begin_search()
    }

    /// Parent-issued close of the suggestion dropdown.
    pub fn close_suggestions(&mut self) {
        self.suggest.force_close();
    }

    pub fn blur(&mut self) -> BlurTicket {
        self.suggest.blur()
    }

    pub fn blur_elapsed(&mut self, ticket: BlurTicket) {
        self.suggest.blur_elapsed(ticket);
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Start a committed search for the current query.
    ///
    /// Returns `None` for an empty query. Closes the suggestion dropdown.
    pub fn begin_search(&mut self) -> Option<PendingSearch> {
        if self.query.is_empty() {
            return None;
        }
        self.suggest.force_close();
        self.search_seq += 1;
        let request = build_request(self.category, &self.query, &self.options, self.limit());
        Some(PendingSearch {
            seq: self.search_seq,
            request,
        })
    }

    /// Apply the response for search `seq`.
    ///
    /// The results table is replaced wholesale; any failure empties it.
    /// Returns `false` if `seq` was superseded and the response dropped.
    pub fn apply_search(&mut self, seq: u64, result: Result<ProxyResponse>) -> bool {
        if seq != self.search_seq {
            return false;
        }
        self.results = match result {
            Ok(resp) => resp.into_items(),
            Err(_) => Vec::new(),
        };
        true
    }

    /// Begin, execute, and apply a search in one call.
    ///
    /// Returns `false` if there was nothing to search for.
    pub async fn commit_search(&mut self, fetcher: &dyn TaxonomyFetcher) -> bool {
        let Some(pending) = self.begin_search() else {
            return false;
        };
        let result = fetcher.fetch(&pending.request).await;
        self.apply_search(pending.seq, result)
    }

    /// Set the query text without arming a suggestion fetch.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.suggest.set_value(query);
    }

    /// Set the query text directly (without debounce) and commit.
    pub async fn search_for(&mut self, query: &str, fetcher: &dyn TaxonomyFetcher) -> bool {
        self.set_query(query);
        self.commit_search(fetcher).await
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Add the result row at `index` to the selection.
    pub fn add_result(&mut self, index: usize) -> Option<bool> {
        let item = self.results.get(index)?.clone();
        Some(self.selection.add(item))
    }

    /// Add every result row; returns how many were new.
    pub fn add_all_results(&mut self) -> usize {
        self.selection.add_many(self.results.clone())
    }

    pub fn add_item(&mut self, item: TaxonomyItem) -> bool {
        self.selection.add(item)
    }

    pub fn remove_selected(&mut self, id: &str) -> bool {
        self.selection.remove(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// True when there are results and every one is already selected.
    pub fn all_results_added(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| self.selection.contains(&r.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Endpoint;
    use std::sync::Mutex;

    /// Records every request and answers from a fixed script.
    struct ScriptedFetcher {
        seen: Mutex<Vec<ProxyRequest>>,
        reply: fn(&ProxyRequest) -> Result<ProxyResponse>,
    }

    impl ScriptedFetcher {
        fn new(reply: fn(&ProxyRequest) -> Result<ProxyResponse>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply,
            }
        }
    }

    #[async_trait]
    impl TaxonomyFetcher for ScriptedFetcher {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
            self.seen.lock().unwrap().push(request.clone());
            (self.reply)(request)
        }
    }

    fn echo(request: &ProxyRequest) -> Result<ProxyResponse> {
        let q = request.param("q").unwrap_or_default();
        Ok(ProxyResponse::success(vec![
            TaxonomyItem::new(format!("{}-1", q), format!("{} one", q), Some(1000)),
            TaxonomyItem::new(format!("{}-2", q), format!("{} two", q), None),
        ]))
    }

    #[tokio::test]
    async fn test_commit_replaces_results() {
        let fetcher = ScriptedFetcher::new(echo);
        let mut ctl = SearchController::default();
        assert!(ctl.search_for("coffee", &fetcher).await);
        assert_eq!(ctl.results().len(), 2);
        assert!(ctl.search_for("tea", &fetcher).await);
        let ids: Vec<&str> = ctl.results().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["tea-1", "tea-2"]);
    }

    #[tokio::test]
    async fn test_empty_query_does_not_fetch() {
        let fetcher = ScriptedFetcher::new(echo);
        let mut ctl = SearchController::default();
        assert!(!ctl.commit_search(&fetcher).await);
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_empties_results() {
        let fetcher = ScriptedFetcher::new(echo);
        let mut ctl = SearchController::default();
        ctl.search_for("coffee", &fetcher).await;

        let failing = ScriptedFetcher::new(|_| Err(anyhow::anyhow!("offline")));
        ctl.search_for("coffee", &failing).await;
        assert!(ctl.results().is_empty());

        ctl.search_for("coffee", &fetcher).await;
        let soft = ScriptedFetcher::new(|_| Ok(ProxyResponse::not_available("upstream")));
        ctl.search_for("coffee", &soft).await;
        assert!(ctl.results().is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let fetcher = ScriptedFetcher::new(echo);
        let mut ctl = SearchController::default();
        ctl.set_limit(9000);
        ctl.search_for("x", &fetcher).await;
        ctl.set_limit(0);
        ctl.search_for("x", &fetcher).await;
        ctl.set_limit(-5);
        ctl.search_for("x", &fetcher).await;
        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen[0].param("limit"), Some("500"));
        assert_eq!(seen[1].param("limit"), Some("25"));
        assert_eq!(seen[2].param("limit"), Some("1"));
    }

    #[test]
    fn test_suggest_uses_fixed_limit() {
        let mut ctl = SearchController::default();
        ctl.set_limit(300);
        ctl.switch_category(Category::Behaviors);
        let req = ctl.build_suggest_request("travel");
        assert_eq!(req.endpoint, Endpoint::Behaviors);
        assert_eq!(req.param("limit"), Some("8"));
    }

    #[test]
    fn test_switch_category_resets_view() {
        let mut ctl = SearchController::default();
        let ticket = ctl.type_text("coff").unwrap();
        let pending = ctl.press_enter().unwrap();
        assert!(ctl.apply_search(pending.seq, echo(&pending.request)));
        assert!(!ctl.results().is_empty());

        ctl.switch_category(Category::Employers);
        assert_eq!(ctl.query(), "");
        assert!(ctl.results().is_empty());
        assert!(ctl.debounce_elapsed(ticket).is_none());
        assert_eq!(ctl.category(), Category::Employers);
    }

    #[test]
    fn test_late_search_after_switch_is_dropped() {
        let mut ctl = SearchController::default();
        ctl.type_text("coffee");
        let pending = ctl.press_enter().unwrap();
        ctl.switch_category(Category::Industry);
        assert!(!ctl.apply_search(pending.seq, echo(&pending.request)));
        assert!(ctl.results().is_empty());
    }

    #[test]
    fn test_superseded_search_is_dropped() {
        let mut ctl = SearchController::default();
        ctl.type_text("co");
        let first = ctl.press_enter().unwrap();
        ctl.type_text("coffee");
        let second = ctl.press_enter().unwrap();
        assert!(ctl.apply_search(second.seq, echo(&second.request)));
        assert!(!ctl.apply_search(first.seq, echo(&first.request)));
        assert_eq!(ctl.results()[0].id, "coffee-1");
    }

    #[test]
    fn test_pick_adds_and_commits() {
        let mut ctl = SearchController::default();
        let ticket = ctl.type_text("cof").unwrap();
        let suggest = ctl.debounce_elapsed(ticket).unwrap();
        assert_eq!(suggest.request.param("limit"), Some("8"));
        ctl.apply_suggestions(suggest.seq, echo(&suggest.request));
        assert!(ctl.suggestions().is_open());

        let pending = ctl.pick_suggestion(0).unwrap();
        assert_eq!(ctl.query(), "cof one");
        assert!(ctl.selection().contains("cof-1"));
        assert!(!ctl.suggestions().is_open());
        assert_eq!(pending.request.param("q"), Some("cof one"));
        assert_eq!(pending.request.param("limit"), Some("25"));
    }

    #[test]
    fn test_add_results() {
        let mut ctl = SearchController::default();
        ctl.type_text("tea");
        let pending = ctl.press_enter().unwrap();
        ctl.apply_search(pending.seq, echo(&pending.request));

        assert!(!ctl.all_results_added());
        assert_eq!(ctl.add_result(1), Some(true));
        assert_eq!(ctl.add_result(1), Some(false));
        assert_eq!(ctl.add_result(9), None);
        assert_eq!(ctl.add_all_results(), 1);
        assert!(ctl.all_results_added());
        assert_eq!(ctl.selection().len(), 2);

        assert!(ctl.remove_selected("tea-1"));
        assert!(!ctl.all_results_added());
        ctl.clear_selection();
        assert!(ctl.selection().is_empty());
    }

    #[test]
    fn test_education_subtype_routes() {
        let mut ctl = SearchController::default();
        ctl.switch_category(Category::Education);
        ctl.set_education(EducationKind::School);
        ctl.type_text("MIT");
        let pending = ctl.press_enter().unwrap();
        assert_eq!(pending.request.param("type"), Some("adeducationschool"));
    }
}
