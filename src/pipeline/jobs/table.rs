use std::collections::{HashMap, VecDeque};

use crate::models::job::{JobId, ProcessingJob};

/// Job id → job, bounded.
///
/// When full, the oldest finished job is evicted to make room. Queued and
/// running jobs are never evicted, so the table can grow past its bound
/// while more than `capacity` jobs are active at once.
#[derive(Debug)]
pub struct JobTable {
    jobs: HashMap<JobId, ProcessingJob>,
    /// Insertion order, oldest first.
    order: VecDeque<JobId>,
    capacity: usize,
}

impl JobTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&mut self, job: ProcessingJob) {
        while self.jobs.len() >= self.capacity {
            if !self.evict_oldest_finished() {
                break;
            }
        }
        self.order.push_back(job.id);
        self.jobs.insert(job.id, job);
    }

    pub fn get(&self, id: &JobId) -> Option<&ProcessingJob> {
        self.jobs.get(id)
    }

    /// Apply `f` to the job in place. Returns false for unknown ids.
    pub fn update(&mut self, id: &JobId, f: impl FnOnce(&mut ProcessingJob)) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) => {
                f(job);
                job.updated_at = chrono::Local::now().naive_local();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn evict_oldest_finished(&mut self) -> bool {
        let position = self
            .order
            .iter()
            .position(|id| self.jobs.get(id).is_some_and(|job| job.state.is_terminal()));

        match position.and_then(|pos| self.order.remove(pos)) {
            Some(id) => {
                self.jobs.remove(&id);
                tracing::debug!(job_id = %id, "Evicted finished job");
                true
            }
            None => false,
        }
    }
}
