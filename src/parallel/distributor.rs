use std::collections::{HashMap, VecDeque};

use crate::model::{FileSettings, Job, SourceFile};

/// Hands jobs out in submission order to whichever worker asks next and
/// remembers which job each worker holds
#[derive(Debug, Default)]
pub struct WorkDistributor {
    pending: VecDeque<Job>,
    in_flight: HashMap<usize, Job>,
    total: usize,
    total_size: u64,
    done: usize,
    done_size: u64,
}

impl WorkDistributor {
    /// Plain files first, then the settings entries
    pub fn new(files: &[SourceFile], file_settings: &[FileSettings]) -> Self {
        let mut jobs = Vec::with_capacity(files.len() + file_settings.len());
        for file in files {
            jobs.push(Job::from_source(jobs.len(), file.clone()));
        }
        for settings in file_settings {
            jobs.push(Job::from_settings(jobs.len(), settings.clone()));
        }
        Self::from_jobs(jobs)
    }

    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let total_size = jobs.iter().map(|job| job.size).sum();
        Self {
            total: jobs.len(),
            total_size,
            pending: jobs.into(),
            ..Self::default()
        }
    }

    /// Next job for `worker`, recorded as in flight until completed
    pub fn assign(&mut self, worker: usize) -> Option<Job> {
        debug_assert!(!self.in_flight.contains_key(&worker));
        let job = self.pending.pop_front()?;
        self.in_flight.insert(worker, job.clone());
        Some(job)
    }

    /// Take the job `worker` holds; counts it as done
    pub fn complete(&mut self, worker: usize) -> Option<Job> {
        let job = self.in_flight.remove(&worker)?;
        self.done += 1;
        self.done_size += job.size;
        Some(job)
    }

    pub fn in_flight(&self, worker: usize) -> Option<&Job> {
        self.in_flight.get(&worker)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done
    }

    /// Percent complete, weighted by file size when sizes are known
    pub fn percent_done(&self) -> u64 {
        if self.total_size > 0 {
            self.done_size * 100 / self.total_size
        } else if self.total > 0 {
            (self.done * 100 / self.total) as u64
        } else {
            100
        }
    }
}
