//! Debounced search with instant local feedback.
//!
//! Every keystroke immediately publishes a placeholder: the cached latest
//! page filtered by the typed term. Once input has been quiet for the
//! debounce delay, and the trimmed term is at least two characters long, the
//! server is asked and its answer replaces the placeholder. A newer
//! keystroke always supersedes a pending or in-flight search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gl_core::listing::filter_by_name;
use gl_core::ImageList;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ImageApi;
use crate::gallery::CachedGallery;

/// Quiet period before a search reaches the server.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shortest trimmed term sent to the server.
pub const MIN_SERVER_SEARCH_CHARS: usize = 2;

/// Where the list in a [`SearchView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSource {
    /// Blank term: the latest page as cached.
    Latest,
    /// Local filter over cached data, shown while the server is pending.
    Placeholder,
    /// Server search results.
    Server,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub term: String,
    pub list: ImageList,
    pub source: ViewSource,
}

/// Search box state. Must be driven from within a Tokio runtime.
pub struct DebouncedSearch<A: ImageApi + 'static> {
    gallery: CachedGallery<A>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    view: Arc<watch::Sender<SearchView>>,
}

impl<A: ImageApi + 'static> DebouncedSearch<A> {
    pub fn new(gallery: CachedGallery<A>) -> Self {
        Self::with_delay(gallery, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(gallery: CachedGallery<A>, delay: Duration) -> Self {
        let initial = SearchView {
            term: String::new(),
            list: gallery.cached_latest().unwrap_or_else(ImageList::empty),
            source: ViewSource::Latest,
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            gallery,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            view: Arc::new(tx),
        }
    }

    /// Receiver that sees every published view.
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.subscribe()
    }

    /// The most recently published view.
    pub fn current(&self) -> SearchView {
        self.view.borrow().clone()
    }

    /// Handle one change of the search box and return the instant view.
    pub fn input(&mut self, term: &str) -> SearchView {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let view = self.local_view(term);
        self.view.send_replace(view.clone());

        let query = term.trim();
        if query.chars().count() >= MIN_SERVER_SEARCH_CHARS {
            self.pending = Some(self.spawn_search(generation, term.to_string(), query.to_string()));
        }

        view
    }

    fn local_view(&self, term: &str) -> SearchView {
        let base = self
            .gallery
            .cached_latest()
            .unwrap_or_else(|| self.view.borrow().list.clone());

        if term.trim().is_empty() {
            return SearchView {
                term: term.to_string(),
                list: base,
                source: ViewSource::Latest,
            };
        }

        let images = filter_by_name(base.images, term);
        SearchView {
            term: term.to_string(),
            list: ImageList {
                total: images.len(),
                images,
                search: base.search,
            },
            source: ViewSource::Placeholder,
        }
    }

    fn spawn_search(&self, generation: u64, term: String, query: String) -> JoinHandle<()> {
        let gallery = self.gallery.clone();
        let current = self.generation.clone();
        let view = self.view.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            let limit = gallery.page_limit();
            match gallery.images(Some(&query), limit).await {
                Ok(list) if current.load(Ordering::SeqCst) == generation => {
                    view.send_replace(SearchView {
                        term,
                        list,
                        source: ViewSource::Server,
                    });
                }
                Ok(_) => tracing::debug!(%query, "Discarding superseded search result"),
                Err(e) => tracing::warn!(%query, "Search failed: {e}"),
            }
        })
    }
}

impl<A: ImageApi + 'static> Drop for DebouncedSearch<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
