//! Interactive search session: a single-task event loop.
//!
//! Every input reaches the [`Session`] as a [`SessionEvent`] on one
//! unbounded channel: shell commands from stdin, debounce and blur timers,
//! and fetch completions. Timers and fetches run as spawned tasks that post
//! back into the channel, so controller state is only ever touched by the
//! loop. Stale timers and responses are filtered by the controller's
//! tickets and sequence numbers; fetches are never aborted.
//!
//! `/quit` exits at once. End of input only marks the session as closed:
//! the loop keeps running until every spawned timer and fetch has reported
//! back, so `printf '/search coffee\n' | tfind shell` still prints results.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use targeting_finder_core::controller::{
    PendingSearch, PendingSuggest, SearchController, TaxonomyFetcher,
};
use targeting_finder_core::models::{normalize_country, Category, ProxyResponse};
use targeting_finder_core::suggest::{BlurTicket, DebounceTicket};

use crate::client::make_fetcher;
use crate::config::{Config, SearchConfig};
use crate::export::{copy_selection, write_export};
use crate::search::SearchArgs;
use crate::shell::{self, ShellCommand};

#[derive(Debug)]
pub enum SessionEvent {
    Command(ShellCommand),
    /// Stdin reached end of file.
    InputClosed,
    /// A line that failed to parse; the message is shown to the user.
    Invalid(String),
    DebounceElapsed(DebounceTicket),
    BlurElapsed(BlurTicket),
    SuggestDone {
        seq: u64,
        result: Result<ProxyResponse>,
    },
    SearchDone {
        seq: u64,
        result: Result<ProxyResponse>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Timer durations for the suggestion dropdown.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub debounce: Duration,
    pub blur_close: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce: targeting_finder_core::suggest::DEFAULT_DEBOUNCE,
            blur_close: targeting_finder_core::suggest::DEFAULT_BLUR_CLOSE,
        }
    }
}

impl From<&SearchConfig> for Timings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            debounce: config.debounce(),
            blur_close: config.blur_close(),
        }
    }
}

pub struct Session {
    controller: SearchController,
    fetcher: Arc<dyn TaxonomyFetcher>,
    timings: Timings,
    tx: UnboundedSender<SessionEvent>,
    /// Spawned timers and fetches that have not posted back yet.
    in_flight: usize,
    input_closed: bool,
}

impl Session {
    pub fn new(
        controller: SearchController,
        fetcher: Arc<dyn TaxonomyFetcher>,
        timings: Timings,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            controller,
            fetcher,
            timings,
            tx,
            in_flight: 0,
            input_closed: false,
        };
        (session, rx)
    }

    pub fn controller(&self) -> &SearchController {
        &self.controller
    }

    /// Timers and fetches still expected to post back into the loop.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// A sender for feeding events (e.g. stdin commands) into the loop.
    pub fn sender(&self) -> UnboundedSender<SessionEvent> {
        self.tx.clone()
    }

    /// Process events until `/quit`, until input is closed and nothing is in
    /// flight, or until every sender is gone.
    pub async fn run(mut self, mut rx: UnboundedReceiver<SessionEvent>) -> Result<()> {
        while let Some(event) = rx.recv().await {
            if self.handle(event)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Apply one event.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Flow> {
        if matches!(
            event,
            SessionEvent::DebounceElapsed(_)
                | SessionEvent::BlurElapsed(_)
                | SessionEvent::SuggestDone { .. }
                | SessionEvent::SearchDone { .. }
        ) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match event {
            SessionEvent::Command(command) => {
                if self.command(command)? == Flow::Quit {
                    return Ok(Flow::Quit);
                }
            }
            SessionEvent::InputClosed => self.input_closed = true,
            SessionEvent::Invalid(message) => eprintln!("{}", message),
            SessionEvent::DebounceElapsed(ticket) => {
                if let Some(pending) = self.controller.debounce_elapsed(ticket) {
                    self.spawn_suggest(pending);
                }
            }
            SessionEvent::BlurElapsed(ticket) => self.controller.blur_elapsed(ticket),
            SessionEvent::SuggestDone { seq, result } => {
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "suggestion fetch failed");
                }
                if self.controller.apply_suggestions(seq, result) {
                    shell::render_suggestions(self.controller.suggestions());
                }
            }
            SessionEvent::SearchDone { seq, result } => {
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "search failed");
                }
                if self.controller.apply_search(seq, result) {
                    shell::render_results(self.controller.results(), self.controller.selection());
                } else {
                    tracing::debug!(seq, "dropped stale search response");
                }
            }
        }

        if self.input_closed && self.in_flight == 0 {
            return Ok(Flow::Quit);
        }
        Ok(Flow::Continue)
    }

    fn command(&mut self, command: ShellCommand) -> Result<Flow> {
        match command {
            ShellCommand::Type(text) => {
                if let Some(ticket) = self.controller.type_text(&text) {
                    self.after(self.timings.debounce, SessionEvent::DebounceElapsed(ticket));
                }
            }
            ShellCommand::Enter => {
                if let Some(pending) = self.controller.press_enter() {
                    self.spawn_search(pending);
                }
            }
            ShellCommand::Search(text) => {
                self.controller.set_query(&text);
                if let Some(pending) = self.controller.begin_search() {
                    self.spawn_search(pending);
                }
            }
            ShellCommand::Pick(index) => match self.controller.pick_suggestion(index) {
                Some(pending) => {
                    println!("Added: {}", self.controller.query());
                    self.spawn_search(pending);
                }
                None => eprintln!("No suggestion {}", index + 1),
            },
            ShellCommand::Tab(category) => {
                self.controller.switch_category(category);
                println!("Category: {}", category);
            }
            ShellCommand::Country(code) => match normalize_country(&code) {
                Ok(code) => {
                    println!("Country: {}", shell::describe_country(&code));
                    self.controller.set_country(code);
                }
                Err(e) => eprintln!("{}", e),
            },
            ShellCommand::Education(kind) => self.controller.set_education(kind),
            ShellCommand::Limit(limit) => {
                self.controller.set_limit(limit);
                println!("Limit: {}", self.controller.limit());
            }
            ShellCommand::Add(index) => match self.controller.add_result(index) {
                Some(true) => println!("Added ({} selected)", self.controller.selection().len()),
                Some(false) => println!("Already selected"),
                None => eprintln!("No result {}", index + 1),
            },
            ShellCommand::AddAll => {
                let added = self.controller.add_all_results();
                println!(
                    "Added {} ({} selected)",
                    added,
                    self.controller.selection().len()
                );
            }
            ShellCommand::Remove(id) => {
                if !self.controller.remove_selected(&id) {
                    eprintln!("{} is not selected", id);
                }
            }
            ShellCommand::Clear => self.controller.clear_selection(),
            ShellCommand::Results => {
                shell::render_results(self.controller.results(), self.controller.selection())
            }
            ShellCommand::Selection => shell::render_selection(self.controller.selection()),
            ShellCommand::Export(format, path) => {
                let path = path.unwrap_or_else(|| format.default_file_name().into());
                let items = self.controller.selection().items();
                if let Err(e) = write_export(items, format, Some(&path)) {
                    eprintln!("Export failed: {:#}", e);
                }
            }
            ShellCommand::Copy => match copy_selection(self.controller.selection().items()) {
                Ok(outcome) => tracing::debug!(?outcome, "copied selection"),
                Err(e) => eprintln!("Copy failed: {:#}", e),
            },
            ShellCommand::Blur => {
                let ticket = self.controller.blur();
                self.after(self.timings.blur_close, SessionEvent::BlurElapsed(ticket));
            }
            ShellCommand::Close => self.controller.close_suggestions(),
            ShellCommand::Help => println!("{}", shell::HELP),
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Post `event` back into the loop after `delay`.
    fn after(&mut self, delay: Duration, event: SessionEvent) {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
    }

    fn spawn_suggest(&mut self, pending: PendingSuggest) {
        self.in_flight += 1;
        let tx = self.tx.clone();
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&pending.request).await;
            let _ = tx.send(SessionEvent::SuggestDone {
                seq: pending.seq,
                result,
            });
        });
    }

    fn spawn_search(&mut self, pending: PendingSearch) {
        tracing::debug!(request = %pending.request, "search");
        self.in_flight += 1;
        let tx = self.tx.clone();
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&pending.request).await;
            let _ = tx.send(SessionEvent::SearchDone {
                seq: pending.seq,
                result,
            });
        });
    }
}

/// Run the interactive shell until `/quit`, or until end of input once
/// pending work has finished.
pub async fn run_shell(config: &Config, category: Category, args: &SearchArgs) -> Result<()> {
    let fetcher = make_fetcher(config, args.server.as_deref())?;
    let controller = args.controller(config, category)?;
    println!(
        "Category: {}  Country: {}  (/help for commands)",
        controller.category(),
        shell::describe_country(&controller.options().country)
    );

    let (session, rx) = Session::new(controller, fetcher, Timings::from(&config.search));
    let reader = tokio::spawn(shell::read_commands(session.sender()));
    session.run(rx).await?;
    reader.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use targeting_finder_core::models::TaxonomyItem;
    use targeting_finder_core::request::ProxyRequest;

    #[derive(Default)]
    struct CountingFetcher {
        seen: Mutex<Vec<ProxyRequest>>,
        completed: AtomicUsize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn queries(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.param("q").unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl TaxonomyFetcher for CountingFetcher {
        async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
            self.seen.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            let q = request.param("q").unwrap_or_default();
            Ok(ProxyResponse::success(vec![
                TaxonomyItem::new(format!("{}-1", q), format!("{} one", q), Some(10)),
                TaxonomyItem::new(format!("{}-2", q), format!("{} two", q), None),
            ]))
        }
    }

    fn session(fetcher: Arc<CountingFetcher>) -> (Session, UnboundedReceiver<SessionEvent>) {
        Session::new(SearchController::default(), fetcher, Timings::default())
    }

    fn cmd(session: &mut Session, command: ShellCommand) {
        assert_eq!(session.handle(SessionEvent::Command(command)).unwrap(), Flow::Continue);
    }

    async fn next(session: &mut Session, rx: &mut UnboundedReceiver<SessionEvent>) {
        let event = rx.recv().await.unwrap();
        session.handle(event).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_inside_debounce_fetch_once() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, mut rx) = session(fetcher.clone());

        for text in ["a", "ab", "abc"] {
            cmd(&mut session, ShellCommand::Type(text.to_string()));
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // three timers fire, only the last one is still armed
        for _ in 0..3 {
            next(&mut session, &mut rx).await;
        }
        let done = rx.recv().await.unwrap();
        assert!(matches!(done, SessionEvent::SuggestDone { .. }));
        session.handle(done).unwrap();

        assert_eq!(fetcher.queries(), vec!["abc"]);
        let suggestions = session.controller().suggestions();
        assert!(suggestions.is_open());
        assert_eq!(suggestions.items().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pick_adds_and_searches() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, mut rx) = session(fetcher.clone());

        cmd(&mut session, ShellCommand::Type("tea".to_string()));
        next(&mut session, &mut rx).await; // debounce
        next(&mut session, &mut rx).await; // suggestions
        cmd(&mut session, ShellCommand::Pick(1));
        next(&mut session, &mut rx).await; // search

        let ctl = session.controller();
        assert!(ctl.selection().contains("tea-2"));
        assert_eq!(ctl.query(), "tea two");
        assert_eq!(ctl.results()[0].id, "tea two-1");
        assert_eq!(fetcher.queries(), vec!["tea", "tea two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_after_tab_switch_is_dropped() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, mut rx) = session(fetcher.clone());

        cmd(&mut session, ShellCommand::Search("nurse".to_string()));
        cmd(&mut session, ShellCommand::Tab(Category::JobTitles));
        next(&mut session, &mut rx).await;
        assert!(session.controller().results().is_empty());
        assert_eq!(session.controller().category(), Category::JobTitles);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_closes_after_delay() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, mut rx) = session(fetcher);

        cmd(&mut session, ShellCommand::Type("gym".to_string()));
        next(&mut session, &mut rx).await;
        next(&mut session, &mut rx).await;
        assert!(session.controller().suggestions().is_open());

        cmd(&mut session, ShellCommand::Blur);
        assert!(session.controller().suggestions().is_open());
        next(&mut session, &mut rx).await;
        assert!(!session.controller().suggestions().is_open());
    }

    #[tokio::test]
    async fn test_add_all_and_quit() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, mut rx) = session(fetcher);

        cmd(&mut session, ShellCommand::Search("yoga".to_string()));
        next(&mut session, &mut rx).await;
        cmd(&mut session, ShellCommand::AddAll);
        assert_eq!(session.controller().selection().len(), 2);
        cmd(&mut session, ShellCommand::Remove("yoga-1".to_string()));
        assert_eq!(session.controller().selection().len(), 1);

        let flow = session
            .handle(SessionEvent::Command(ShellCommand::Quit))
            .unwrap();
        assert_eq!(flow, Flow::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_waits_for_pending_search() {
        let fetcher = Arc::new(CountingFetcher::slow(Duration::from_millis(50)));
        let (mut session, mut rx) = session(fetcher.clone());

        cmd(&mut session, ShellCommand::Search("coffee".to_string()));
        assert_eq!(session.in_flight(), 1);
        let flow = session.handle(SessionEvent::InputClosed).unwrap();
        assert_eq!(flow, Flow::Continue);

        let done = rx.recv().await.unwrap();
        assert!(matches!(done, SessionEvent::SearchDone { .. }));
        assert_eq!(session.handle(done).unwrap(), Flow::Quit);
        assert_eq!(session.controller().results().len(), 2);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_with_nothing_pending_quits() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (mut session, _rx) = session(fetcher);
        let flow = session.handle(SessionEvent::InputClosed).unwrap();
        assert_eq!(flow, Flow::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_piped_typing_and_enter_run_to_completion() {
        let fetcher = Arc::new(CountingFetcher::slow(Duration::from_millis(50)));
        let (session, rx) = session(fetcher.clone());

        let tx = session.sender();
        tx.send(SessionEvent::Command(ShellCommand::Type("coffee".to_string())))
            .unwrap();
        tx.send(SessionEvent::Command(ShellCommand::Enter)).unwrap();
        tx.send(SessionEvent::InputClosed).unwrap();
        drop(tx);

        session.run(rx).await.unwrap();

        assert!(fetcher.queries().contains(&"coffee".to_string()));
        assert_eq!(
            fetcher.completed.load(Ordering::SeqCst),
            fetcher.queries().len()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_does_not_wait() {
        let fetcher = Arc::new(CountingFetcher::slow(Duration::from_secs(5)));
        let (mut session, _rx) = session(fetcher);

        cmd(&mut session, ShellCommand::Search("coffee".to_string()));
        let flow = session
            .handle(SessionEvent::Command(ShellCommand::Quit))
            .unwrap();
        assert_eq!(flow, Flow::Quit);
        assert_eq!(session.in_flight(), 1);
    }
}
