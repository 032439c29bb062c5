use crate::job::{JobRegistry, TrimJob};
use crate::trim;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

const UPLOADS_DIR: &str = "uploads";
const PROCESSED_DIR: &str = "processed";

async fn init_workspace(workspace: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(workspace.join(UPLOADS_DIR)).await?;
    tokio::fs::create_dir_all(workspace.join(PROCESSED_DIR)).await?;
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub job_tx: UnboundedSender<TrimJob>,
    pub jobs: JobRegistry,

    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub token_rate: f64,
}

impl AppState {
    pub async fn new(token_rate: f64, permits: usize, workspace: &Path) -> anyhow::Result<Self> {
        init_workspace(workspace).await?;
        let (tx, rx) = unbounded();

        let this = Self {
            job_tx: tx,
            jobs: JobRegistry::default(),

            uploads_dir: workspace.join(UPLOADS_DIR),
            processed_dir: workspace.join(PROCESSED_DIR),
            token_rate,
        };

        this.handle_jobs(rx, permits);
        Ok(this)
    }

    pub fn uploads_dir(&self) -> &Path {
        self.uploads_dir.as_path()
    }

    pub fn processed_dir(&self) -> &Path {
        self.processed_dir.as_path()
    }

    /// Dispatcher: one task per queued trim, at most `permits` encodes at a
    /// time. The encode itself is blocking FFmpeg work and runs on the
    /// blocking pool, so request handlers never wait on it.
    fn handle_jobs(&self, mut rx: UnboundedReceiver<TrimJob>, permits: usize) {
        info!(permits, "Trim job handler started");
        let this = self.clone();
        let semaphore = Arc::new(Semaphore::new(permits));

        tokio::spawn(async move {
            while let Some(job) = rx.next().await {
                let job_id = job.id().to_string();
                debug!(%job_id, "Job received");

                let this_c = this.clone();
                let semaphore_c = semaphore.clone();
                tokio::spawn(async move {
                    let _permit = semaphore_c
                        .acquire_owned()
                        .await
                        .expect("Job semaphore closed");

                    this_c.jobs.mark_running(&job_id).await;
                    info!(%job_id, source = %job.source, "Trim started");

                    let input = this_c.uploads_dir.join(&job.source);
                    let output = this_c.processed_dir.join(&job.output);
                    let output_c = output.clone();
                    let id_c = job_id.clone();
                    let (start, end) = (job.start, job.end);

                    let result = tokio::task::spawn_blocking(move || {
                        trim::trim_clip(&id_c, &input, &output_c, start, end)
                    })
                    .await;

                    match result {
                        Ok(Ok(())) => {
                            info!(%job_id, output = %job.output, "Trim finished");
                            this_c.jobs.mark_done(&job_id).await;
                        }
                        Ok(Err(error)) => {
                            error!(%job_id, %error, "Trim failed");
                            // Partial output is useless; the source upload stays.
                            let _ = tokio::fs::remove_file(&output).await;
                            this_c.jobs.mark_failed(&job_id, error.to_string()).await;
                        }
                        Err(error) => {
                            error!(%job_id, %error, "Trim task panicked");
                            let _ = tokio::fs::remove_file(&output).await;
                            this_c
                                .jobs
                                .mark_failed(&job_id, "trim task aborted".to_string())
                                .await;
                        }
                    }
                });
            }

            warn!("Trim job handler finished");
        });
    }
}
