use anyhow::Result;
use tracing::debug;

use crate::browsers::{BrowserCatalog, BrowserState};
use crate::detectors::TitleClassifier;
use crate::system::{ProcessInfo, ProcessSource};

/// Every browser window detected at one instant
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Classified windows, in catalog order then process order
    pub states: Vec<BrowserState>,
    /// Candidate windows that matched a rule but could not be classified
    pub skipped: usize,
}

impl Snapshot {
    /// Pick the representative active browser
    ///
    /// The most recently stamped state wins; on equal timestamps the first
    /// one encountered is kept. There is no way to know which window holds
    /// input focus, so detection recency stands in for it.
    pub fn select_active(&self) -> Option<&BrowserState> {
        self.active_index().map(|i| &self.states[i])
    }

    /// Consume the snapshot and return the active browser
    pub fn into_active(mut self) -> Option<BrowserState> {
        let index = self.active_index()?;
        Some(self.states.swap_remove(index))
    }

    fn active_index(&self) -> Option<usize> {
        self.states
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &BrowserState)>, (i, state)| match best {
                Some((_, current)) if state.captured_at <= current.captured_at => best,
                _ => Some((i, state)),
            })
            .map(|(i, _)| i)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Stateless sweep over live processes
///
/// Reads only the process source and the catalog, so it can be called from
/// the poll loop and from a foreground diagnostic command alike.
pub struct Snapshotter<'a> {
    catalog: &'a BrowserCatalog,
    source: &'a dyn ProcessSource,
    classifier: TitleClassifier,
}

impl<'a> Snapshotter<'a> {
    pub fn new(catalog: &'a BrowserCatalog, source: &'a dyn ProcessSource) -> Self {
        Self {
            catalog,
            source,
            classifier: TitleClassifier::new(),
        }
    }

    /// Enumerate processes once and classify every browser window
    ///
    /// Fails only if the process listing itself fails. A window that cannot
    /// be classified is counted in [`Snapshot::skipped`] and the sweep moves
    /// on.
    pub fn take(&self) -> Result<Snapshot> {
        let processes = self.source.processes()?;
        Ok(self.classify_all(&processes))
    }

    /// Classify an already-enumerated process list
    pub fn classify_all(&self, processes: &[ProcessInfo]) -> Snapshot {
        let mut snapshot = Snapshot::default();

        for (key, rule) in self.catalog.iter() {
            let candidates = processes
                .iter()
                .filter(|p| rule.matches_process(&p.name))
                .filter(|p| p.has_meaningful_title());

            for process in candidates {
                match self.classifier.classify(rule, &process.window_title) {
                    Some(state) => snapshot.states.push(state),
                    None => {
                        debug!(
                            "Could not classify {} window of pid {} ({})",
                            key, process.pid, process.name
                        );
                        snapshot.skipped += 1;
                    }
                }
            }
        }

        snapshot
    }

    /// Sweep and select the active browser in one step
    pub fn active_browser(&self) -> Result<Option<BrowserState>> {
        Ok(self.take()?.into_active())
    }
}
