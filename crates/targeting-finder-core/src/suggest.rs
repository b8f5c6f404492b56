//! Suggestion dropdown state machine.
//!
//! The widget is driven by discrete events and never performs I/O or
//! sleeps itself. The host owns the clock: when [`SuggestionBox::input`]
//! returns a [`DebounceTicket`], the host arms a timer and reports it back
//! through [`SuggestionBox::debounce_elapsed`]. A ticket superseded by a
//! later keystroke yields nothing, so at most one suggestion fetch is armed
//! per debounce window.
//!
//! ```text
//!            input("")                 input(text)
//!   ┌──────────────────── Idle ─────────────────────┐
//!   │                      ▲                        ▼
//!   │        close/failure │                     Typing ──input(text)──┐
//!   │                      │                        │   ◀──────────────┘
//!   │                      │       debounce_elapsed │
//!   │                      │                        ▼
//!   │                    Open ◀── suggestions ── Loading
//!   └──────────────────────────────────────────────────────
//! ```
//!
//! Each fetch carries a sequence number. Only the most recent fetch's
//! response is applied; a late response for an older query is dropped.

use std::time::Duration;

use crate::models::{ProxyResponse, TaxonomyItem};

/// Delay between the last keystroke and the suggestion fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);
/// Delay between losing focus and closing, so a pending pick can land.
pub const DEFAULT_BLUR_CLOSE: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestState {
    /// Nothing pending and the dropdown is closed.
    Idle,
    /// A debounce timer is armed.
    Typing,
    /// A suggestion fetch is in flight.
    Loading,
    /// The dropdown is showing items.
    Open,
}

/// Handle for an armed debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceTicket(pub u64);

/// Handle for an armed blur-close timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlurTicket(pub u64);

/// A suggestion fetch the host must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestFetch {
    pub seq: u64,
    pub query: String,
}

/// Dropdown state for one search input.
#[derive(Debug, Clone)]
pub struct SuggestionBox {
    value: String,
    items: Vec<TaxonomyItem>,
    open: bool,
    /// Ticket of the armed debounce timer, with the text it will fetch.
    pending: Option<(u64, String)>,
    next_ticket: u64,
    /// Sequence number of the newest fetch handed to the host.
    latest_seq: u64,
    /// True while `latest_seq` has not been answered.
    loading: bool,
    blur_ticket: Option<u64>,
}

impl Default for SuggestionBox {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionBox {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            items: Vec::new(),
            open: false,
            pending: None,
            next_ticket: 0,
            latest_seq: 0,
            loading: false,
            blur_ticket: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn items(&self) -> &[TaxonomyItem] {
        &self.items
    }

    /// Whether the dropdown is visible (open with at least one item).
    pub fn is_open(&self) -> bool {
        self.open && !self.items.is_empty()
    }

    pub fn state(&self) -> SuggestState {
        if self.pending.is_some() {
            SuggestState::Typing
        } else if self.loading {
            SuggestState::Loading
        } else if self.is_open() {
            SuggestState::Open
        } else {
            SuggestState::Idle
        }
    }

    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// A keystroke changed the text to `text`.
    ///
    /// The value updates immediately. Any armed debounce is cancelled.
    /// Empty text clears and closes the dropdown; otherwise a fresh ticket
    /// is returned for the host to arm.
    pub fn input(&mut self, text: &str) -> Option<DebounceTicket> {
        self.value = text.to_string();
        self.pending = None;
        if text.is_empty() {
            self.items.clear();
            self.open = false;
            return None;
        }
        let ticket = self.ticket();
        self.pending = Some((ticket, text.to_string()));
        Some(DebounceTicket(ticket))
    }

    /// The timer for `ticket` fired.
    ///
    /// Returns the fetch to issue, or `None` if the ticket was superseded
    /// or cancelled.
    pub fn debounce_elapsed(&mut self, ticket: DebounceTicket) -> Option<SuggestFetch> {
        match &self.pending {
            Some((armed, _)) if *armed == ticket.0 => {}
            _ => return None,
        }
        let (_, query) = self.pending.take()?;
        self.latest_seq += 1;
        self.loading = true;
        Some(SuggestFetch {
            seq: self.latest_seq,
            query,
        })
    }

    /// A suggestion fetch completed.
    ///
    /// Returns `false` when the response was stale and ignored. Any
    /// transport error or `ok:false` response clears and closes silently.
    pub fn suggestions(&mut self, seq: u64, result: anyhow::Result<ProxyResponse>) -> bool {
        if seq != self.latest_seq || !self.loading {
            return false;
        }
        self.loading = false;
        match result {
            Ok(resp) if resp.ok => {
                self.items = resp.data.unwrap_or_default();
                self.open = true;
            }
            _ => {
                self.items.clear();
                self.open = false;
            }
        }
        true
    }

    /// Choose the suggestion at `index`.
    ///
    /// The text becomes the item's name and the dropdown closes. The picked
    /// item is returned so the parent can add it and commit a search.
    pub fn pick(&mut self, index: usize) -> Option<TaxonomyItem> {
        if !self.is_open() {
            return None;
        }
        let item = self.items.get(index)?.clone();
        self.value = item.name.clone();
        self.pending = None;
        self.open = false;
        self.blur_ticket = None;
        Some(item)
    }

    /// Enter pressed: close the dropdown; the parent commits the search.
    pub fn enter(&mut self) {
        self.open = false;
    }

    /// The input lost focus. The host arms the returned timer and reports
    /// it through [`blur_elapsed`](Self::blur_elapsed).
    pub fn blur(&mut self) -> BlurTicket {
        let ticket = self.ticket();
        self.blur_ticket = Some(ticket);
        BlurTicket(ticket)
    }

    /// The blur timer fired: close unless a pick already happened.
    pub fn blur_elapsed(&mut self, ticket: BlurTicket) {
        if self.blur_ticket == Some(ticket.0) {
            self.blur_ticket = None;
            self.open = false;
        }
    }

    /// Parent-issued close: hide and clear the dropdown, cancel the armed
    /// debounce, and disown any in-flight fetch.
    pub fn force_close(&mut self) {
        self.open = false;
        self.items.clear();
        self.pending = None;
        self.blur_ticket = None;
        if self.loading {
            self.latest_seq += 1;
            self.loading = false;
        }
    }

    /// Replace the text without touching suggestions (e.g. category reset).
    pub fn set_value(&mut self, text: &str) {
        self.value = text.to_string();
    }
}
