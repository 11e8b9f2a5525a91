//! Crawl frontier
//!
//! A FIFO queue plus a seen-set, with an explicit persistence boundary:
//!
//! - `{root}/seen_pages.txt`: append-only log of visited pages, one URL per
//!   line. A URL in this log is never fetched again.
//! - `{root}/frontier_queue.txt`: snapshot of the pending queue, replaced
//!   whole after every visited page so an interrupted crawl resumes where it
//!   stopped. Pages whose fetch failed are kept at its tail for the next run.
//!
//! Enqueueing records a URL as seen immediately, so a page linked from many
//! places is queued once, and cyclic link graphs terminate.

use std::collections::{HashSet, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Seen-log file name under the library root
pub const SEEN_LOG_FILE: &str = "seen_pages.txt";

/// Queue snapshot file name under the library root
pub const QUEUE_FILE: &str = "frontier_queue.txt";

/// Pending queue and seen-set driving the breadth-first traversal
#[derive(Debug, Default)]
pub struct FrontierState {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    visited: HashSet<String>,
    deferred: Vec<String>,
    seen_log: Option<PathBuf>,
    queue_file: Option<PathBuf>,
}

impl FrontierState {
    /// Frontier without persistence (dry runs and single-page mode)
    pub fn in_memory(seeds: &[String]) -> Self {
        let mut frontier = Self::default();
        for seed in seeds {
            frontier.enqueue(seed);
        }
        frontier
    }

    /// Loads the frontier persisted under `root`
    ///
    /// Visited pages come from the seen-log; the pending queue from the last
    /// snapshot, followed by the seeds. With `fresh` both files are ignored,
    /// and removed when `persist` is set. Without `persist` nothing is ever
    /// written.
    pub fn load(root: &Path, seeds: &[String], fresh: bool, persist: bool) -> io::Result<Self> {
        let seen_log = root.join(SEEN_LOG_FILE);
        let queue_file = root.join(QUEUE_FILE);

        if fresh && persist {
            remove_if_exists(&seen_log)?;
            remove_if_exists(&queue_file)?;
        }

        let mut frontier = Self::default();

        if !fresh {
            for url in read_lines(&seen_log)? {
                frontier.seen.insert(url.clone());
                frontier.visited.insert(url);
            }
            for url in read_lines(&queue_file)? {
                frontier.enqueue(&url);
            }
        }

        for seed in seeds {
            frontier.enqueue(seed);
        }

        if persist {
            frontier.seen_log = Some(seen_log);
            frontier.queue_file = Some(queue_file);
        }

        info!(
            "Frontier loaded: {} visited, {} queued",
            frontier.visited.len(),
            frontier.queue.len()
        );

        Ok(frontier)
    }

    /// Removes and returns the head of the queue
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Puts a URL back at the head of the queue
    ///
    /// Used when a page was popped but not finished, so the snapshot keeps it.
    pub fn requeue_front(&mut self, url: &str) {
        if !self.visited.contains(url) {
            self.queue.push_front(url.to_string());
        }
    }

    /// Keeps a page whose fetch failed for the next run
    ///
    /// The page is not retried in this run, but the snapshot lists it after
    /// the pending queue, so a resumed crawl fetches it again.
    pub fn defer(&mut self, url: &str) {
        if !self.visited.contains(url) && !self.deferred.iter().any(|u| u == url) {
            self.deferred.push(url.to_string());
        }
    }

    /// Appends a URL to the queue unless it has been seen
    ///
    /// Returns true if the URL was queued.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string());
        self.queue.push_back(url.to_string());
        true
    }

    /// Records a processed page: appended to the seen-log, then the queue
    /// snapshot is rewritten
    pub fn mark_visited(&mut self, url: &str) -> io::Result<()> {
        self.seen.insert(url.to_string());
        if !self.visited.insert(url.to_string()) {
            return Ok(());
        }

        if let Some(path) = &self.seen_log {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", url)?;
        }

        self.snapshot()
    }

    /// Rewrites the queue snapshot
    pub fn snapshot(&self) -> io::Result<()> {
        let Some(path) = &self.queue_file else {
            return Ok(());
        };

        let mut content = String::new();
        for url in self.queue.iter().chain(&self.deferred) {
            content.push_str(url);
            content.push('\n');
        }

        let temp = path.with_extension("txt.tmp");
        fs::write(&temp, content)?;
        fs::rename(&temp, path)?;
        debug!(
            "Queue snapshot: {} pending, {} deferred",
            self.queue.len(),
            self.deferred.len()
        );
        Ok(())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
