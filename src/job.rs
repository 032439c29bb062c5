use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

/// One queued trim: cut `[start, end)` seconds out of `uploads/{source}`
/// into `processed/{output}`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TrimJob {
    pub id: String,
    pub source: String,
    pub output: String,
    pub start: f64,
    pub end: f64,
}

impl TrimJob {
    pub fn new(source: String, output: String, start: f64, end: f64) -> Self {
        // The output stem is unique per source and second, which makes it a
        // serviceable job id. Same-second collisions overwrite, output file
        // and job record alike.
        let id = output
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| output.clone());

        Self {
            id,
            source,
            output,
            start,
            end,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq)]
enum JobState {
    Queued,
    Running,
    Done,
    Failed { message: String },
}

#[derive(Debug)]
struct JobEntry {
    source: String,
    output: String,
    state: JobState,
}

/// What `GET /jobs/{id}` returns.
#[derive(Serialize, Deserialize, Debug)]
pub struct JobSnapshot {
    pub id: String,
    pub source: String,
    pub output: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory job states, keyed by job id. Records live for the lifetime of
/// the process; the durable artifacts are the files themselves.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<TokioMutex<HashMap<String, JobEntry>>>,
}

impl JobRegistry {
    pub async fn insert(&self, job: &TrimJob) {
        self.inner.lock().await.insert(
            job.id.clone(),
            JobEntry {
                source: job.source.clone(),
                output: job.output.clone(),
                state: JobState::Queued,
            },
        );
    }

    pub async fn mark_running(&self, id: &str) {
        self.set_state(id, JobState::Running).await;
    }

    pub async fn mark_done(&self, id: &str) {
        self.set_state(id, JobState::Done).await;
    }

    pub async fn mark_failed(&self, id: &str, message: String) {
        self.set_state(id, JobState::Failed { message }).await;
    }

    pub async fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.inner.lock().await.get(id).map(|entry| {
            let (state, error) = match &entry.state {
                JobState::Queued => ("queued", None),
                JobState::Running => ("running", None),
                JobState::Done => ("done", None),
                JobState::Failed { message } => ("failed", Some(message.clone())),
            };
            JobSnapshot {
                id: id.to_string(),
                source: entry.source.clone(),
                output: entry.output.clone(),
                state: state.to_string(),
                error,
            }
        })
    }

    /// Jobs that have not reached a terminal state yet.
    pub async fn pending(&self) -> usize {
        self.inner
            .lock()
            .await
            .values()
            .filter(|entry| matches!(entry.state, JobState::Queued | JobState::Running))
            .count()
    }

    async fn set_state(&self, id: &str, state: JobState) {
        if let Some(entry) = self.inner.lock().await.get_mut(id) {
            entry.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> TrimJob {
        TrimJob::new(
            "clip.mp4".into(),
            "clip_CUT_20260807123005.mp4".into(),
            2.0,
            8.0,
        )
    }

    #[test]
    fn job_id_is_the_output_stem() {
        assert_eq!(job().id(), "clip_CUT_20260807123005");
    }

    #[tokio::test]
    async fn registry_tracks_the_job_lifecycle() {
        let registry = JobRegistry::default();
        let job = job();

        registry.insert(&job).await;
        assert_eq!(registry.get(job.id()).await.unwrap().state, "queued");
        assert_eq!(registry.pending().await, 1);

        registry.mark_running(job.id()).await;
        assert_eq!(registry.get(job.id()).await.unwrap().state, "running");

        registry.mark_failed(job.id(), "no video stream".into()).await;
        let snapshot = registry.get(job.id()).await.unwrap();
        assert_eq!(snapshot.state, "failed");
        assert_eq!(snapshot.error.as_deref(), Some("no video stream"));
        assert_eq!(registry.pending().await, 0);
    }

    #[tokio::test]
    async fn unknown_jobs_are_absent() {
        assert!(JobRegistry::default().get("nope").await.is_none());
    }
}
