use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use web_time::Instant;

use twig_core::{Presentation, RenderStats, Root};

mod tree;

pub use tree::{TreeSnapshot, dump_tree, snapshot};

pub struct Hud {
    commit_count: u64,
    last_commit: Option<Instant>,
    rate_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            commit_count: 0,
            last_commit: None,
            rate_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Exponentially smoothed commits per second.
    pub fn commit_rate(&self) -> f32 {
        self.rate_smooth
    }

    pub fn record(&mut self, stats: &RenderStats) {
        self.commit_count += 1;
        let now = Instant::now();
        if let Some(prev) = self.last_commit.replace(now) {
            let dt = (now - prev).as_secs_f32();
            if dt > 0.0 {
                let rate = 1.0 / dt;
                // simple EMA
                let a = 0.2;
                self.rate_smooth = if self.rate_smooth == 0.0 {
                    rate
                } else {
                    (1.0 - a) * self.rate_smooth + a * rate
                };
            }
        }
        self.metrics
            .get_or_insert_with(Metrics::default)
            .accumulate(stats);
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("commit: {}", self.commit_count),
            format!("rate: {:.1}/s", self.rate_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("commit: {:.2} ms", m.last_commit_ms));
            lines.push(format!("mutations: {}", m.last_mutations));
            lines.push(format!("components: {}", m.evaluated));
        }
        lines.join("  |  ")
    }
}

/// Totals across every recorded commit, plus the shape of the last one.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Metrics {
    pub last_commit_ms: f32,
    pub last_mutations: usize,
    pub created: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
    pub text_updates: usize,
    pub attribute_writes: usize,
    pub property_writes: usize,
    pub listener_changes: usize,
    pub evaluated: usize,
    pub unmounted: usize,
    pub recovered: usize,
}

impl Metrics {
    fn accumulate(&mut self, stats: &RenderStats) {
        self.last_commit_ms = stats.duration.as_secs_f32() * 1000.0;
        self.last_mutations = stats.mutations();
        self.created += stats.created;
        self.inserted += stats.inserted;
        self.replaced += stats.replaced;
        self.removed += stats.removed;
        self.text_updates += stats.text_updates;
        self.attribute_writes += stats.attribute_writes;
        self.property_writes += stats.property_writes;
        self.listener_changes += stats.listener_changes;
        self.evaluated += stats.evaluated;
        self.unmounted += stats.unmounted;
        if stats.recovered > 0 {
            log::warn!("commit recovered {} subtree(s)", stats.recovered);
        }
        self.recovered += stats.recovered;
    }
}

/// Watches the commits of a [`Root`].
#[derive(Clone)]
pub struct Inspector {
    hud: Rc<RefCell<Hud>>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Rc::new(RefCell::new(Hud::new())),
        }
    }

    pub fn attach<D: Presentation + 'static>(root: &Root<D>) -> Self {
        let inspector = Self::new();
        let hud = inspector.hud.clone();
        root.on_commit(move |stats| hud.borrow_mut().record(stats));
        inspector
    }

    pub fn commit_count(&self) -> u64 {
        self.hud.borrow().commit_count()
    }

    pub fn metrics(&self) -> Metrics {
        self.hud.borrow().metrics.clone().unwrap_or_default()
    }

    pub fn metrics_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.metrics())
    }

    pub fn summary(&self) -> String {
        self.hud.borrow().summary()
    }

    /// Snapshot of the tree `root` currently mirrors.
    pub fn tree<D: Presentation + 'static>(&self, root: &Root<D>) -> TreeSnapshot {
        root.with_tree(snapshot)
    }
}
