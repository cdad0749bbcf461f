//! Render cache for served pages
//!
//! Every path moves through three states:
//!
//! * `Prebuilt`: rendered output is served as is.
//! * `GeneratingOnDemand`: the path was never rendered; every request gets
//!   the loading placeholder until the first generation finishes.
//! * `StaleAwaitingRevalidation`: the output outlived its window; it is still
//!   served while a single background regeneration runs.
//!
//! The transition functions are pure and take `now` explicitly. `RenderCache`
//! applies them under a write lock so that at most one generation per path is
//! ever in flight.
//!
//! Redirects (unknown posts) are handed out once and then forgotten, and at
//! most `MAX_REDIRECTS` of them wait for their visitor at any time, so
//! requests for made-up paths cannot grow the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Redirects kept until their first request; older ones are dropped first
pub const MAX_REDIRECTS: usize = 256;

/// Finished output of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Html(String),
    /// Send the client elsewhere, e.g. an unknown post goes to `/`
    Redirect(String),
}

/// Cache state of a single path
#[derive(Debug, Clone)]
pub enum PageState {
    Prebuilt {
        output: Arc<Rendered>,
        generated_at: Instant,
    },
    GeneratingOnDemand,
    StaleAwaitingRevalidation {
        output: Arc<Rendered>,
        generated_at: Instant,
        /// Whether a regeneration task is currently running
        in_flight: bool,
    },
}

/// State names, used in logs and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Prebuilt,
    GeneratingOnDemand,
    StaleAwaitingRevalidation,
}

impl PageState {
    pub fn kind(&self) -> StateKind {
        match self {
            PageState::Prebuilt { .. } => StateKind::Prebuilt,
            PageState::GeneratingOnDemand => StateKind::GeneratingOnDemand,
            PageState::StaleAwaitingRevalidation { .. } => StateKind::StaleAwaitingRevalidation,
        }
    }

    /// Generated at, for a finished redirect
    fn redirect_generated_at(&self) -> Option<Instant> {
        match self {
            PageState::Prebuilt {
                output,
                generated_at,
            } if matches!(output.as_ref(), Rendered::Redirect(_)) => Some(*generated_at),
            _ => None,
        }
    }
}

/// What a request gets back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    Output(Arc<Rendered>),
    Placeholder,
}

/// Result of looking up a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub served: Served,
    /// The caller must start a generation and report it with
    /// `complete` or `fail`
    pub generate: bool,
}

/// Apply a request to the current state of a path
///
/// `window` is the revalidation period; `None` means the output never goes
/// stale.
pub fn on_request(
    state: Option<PageState>,
    now: Instant,
    window: Option<Duration>,
) -> (PageState, Lookup) {
    match state {
        None => (
            PageState::GeneratingOnDemand,
            Lookup {
                served: Served::Placeholder,
                generate: true,
            },
        ),
        Some(PageState::GeneratingOnDemand) => (
            PageState::GeneratingOnDemand,
            Lookup {
                served: Served::Placeholder,
                generate: false,
            },
        ),
        Some(PageState::Prebuilt {
            output,
            generated_at,
        }) => {
            let expired = window
                .map(|window| now.saturating_duration_since(generated_at) >= window)
                .unwrap_or(false);
            let lookup = Lookup {
                served: Served::Output(output.clone()),
                generate: expired,
            };
            let state = if expired {
                PageState::StaleAwaitingRevalidation {
                    output,
                    generated_at,
                    in_flight: true,
                }
            } else {
                PageState::Prebuilt {
                    output,
                    generated_at,
                }
            };
            (state, lookup)
        }
        Some(PageState::StaleAwaitingRevalidation {
            output,
            generated_at,
            in_flight,
        }) => (
            PageState::StaleAwaitingRevalidation {
                output: output.clone(),
                generated_at,
                in_flight: true,
            },
            Lookup {
                served: Served::Output(output),
                generate: !in_flight,
            },
        ),
    }
}

/// A generation finished successfully
pub fn on_success(output: Rendered, now: Instant) -> PageState {
    PageState::Prebuilt {
        output: Arc::new(output),
        generated_at: now,
    }
}

/// A generation failed
///
/// A first-time generation leaves no entry behind so the next request
/// retries. A stale page keeps its old output until a later request
/// retries the regeneration.
pub fn on_failure(state: Option<PageState>) -> Option<PageState> {
    match state {
        None | Some(PageState::GeneratingOnDemand) => None,
        Some(PageState::StaleAwaitingRevalidation {
            output,
            generated_at,
            ..
        }) => Some(PageState::StaleAwaitingRevalidation {
            output,
            generated_at,
            in_flight: false,
        }),
        Some(prebuilt @ PageState::Prebuilt { .. }) => Some(prebuilt),
    }
}

/// Shared per-path page states
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: RwLock<HashMap<String, PageState>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record output produced ahead of time
    pub async fn insert_prebuilt(&self, path: &str, output: Rendered) {
        self.insert_prebuilt_at(path, output, Instant::now()).await
    }

    pub async fn insert_prebuilt_at(&self, path: &str, output: Rendered, now: Instant) {
        self.entries
            .write()
            .await
            .insert(path.to_string(), on_success(output, now));
    }

    /// Look up a path, moving it to its next state
    pub async fn lookup(&self, path: &str, window: Option<Duration>) -> Lookup {
        self.lookup_at(path, window, Instant::now()).await
    }

    pub async fn lookup_at(&self, path: &str, window: Option<Duration>, now: Instant) -> Lookup {
        let mut entries = self.entries.write().await;
        let (state, lookup) = on_request(entries.remove(path), now, window);
        if lookup.generate {
            tracing::debug!("Generating {} ({:?})", path, state.kind());
        }
        if state.redirect_generated_at().is_some() {
            tracing::debug!("Redirect for {} handed out", path);
        } else {
            entries.insert(path.to_string(), state);
        }
        lookup
    }

    /// Store the output of a finished generation
    pub async fn complete(&self, path: &str, output: Rendered) {
        self.complete_at(path, output, Instant::now()).await
    }

    pub async fn complete_at(&self, path: &str, output: Rendered, now: Instant) {
        let redirect = matches!(output, Rendered::Redirect(_));
        let mut entries = self.entries.write().await;
        entries.insert(path.to_string(), on_success(output, now));
        if redirect {
            evict_redirects(&mut entries, MAX_REDIRECTS);
        }
        tracing::debug!("Generated {}", path);
    }

    /// Record a failed generation
    pub async fn fail(&self, path: &str) {
        let mut entries = self.entries.write().await;
        if let Some(state) = on_failure(entries.remove(path)) {
            entries.insert(path.to_string(), state);
        }
    }

    pub async fn state(&self, path: &str) -> Option<StateKind> {
        self.entries.read().await.get(path).map(PageState::kind)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Drop the oldest redirects beyond `max`
fn evict_redirects(entries: &mut HashMap<String, PageState>, max: usize) {
    let mut redirects: Vec<(Instant, String)> = entries
        .iter()
        .filter_map(|(path, state)| Some((state.redirect_generated_at()?, path.clone())))
        .collect();
    if redirects.len() <= max {
        return;
    }
    redirects.sort();
    let excess = redirects.len() - max;
    for (_, path) in redirects.into_iter().take(excess) {
        entries.remove(&path);
    }
    tracing::debug!("Dropped {} unclaimed redirects", excess);
}
