//! Ingestion pipeline: collect files, fan summarization out under a bounded
//! concurrency cap, then write summaries and embeddings into the store in a
//! sequential post-fan-in phase.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::collect;
use crate::llm::embeddings;
use crate::models::{IngestStatus, SourceFile, SummaryOutcome};
use crate::state::AppState;
use crate::summarize;

/// Completed work is reported after every chunk of this many files.
const PROGRESS_CHUNK_SIZE: usize = 50;

/// Drive `work` over `files` with at most `semaphore.available_permits()`
/// concurrent invocations. Every unit catches its own failure and reports it
/// as a per-file outcome; one file failing never cancels its siblings.
/// Results are keyed by relative path, not completion order.
pub async fn summarize_batch<F, Fut>(
    files: Vec<SourceFile>,
    semaphore: Arc<Semaphore>,
    work: F,
    mut on_progress: impl FnMut(usize, usize),
) -> HashMap<String, SummaryOutcome>
where
    F: Fn(SourceFile) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    let total = files.len();
    let work = Arc::new(work);
    let start = Instant::now();

    tracing::info!(
        "Starting parallel summarization of {total} files (max {} concurrent)",
        semaphore.available_permits()
    );

    let mut handles = Vec::with_capacity(total);
    for file in files {
        let path = file.relative_path.clone();
        let sem = semaphore.clone();
        let work = work.clone();

        let handle = tokio::spawn(async move {
            // Permit held for the duration of the call, released on every exit path
            let _permit = sem.acquire().await;
            let outcome = match work(file).await {
                Ok(summary) => SummaryOutcome::Summary(summary),
                Err(e) => SummaryOutcome::Failed(format!("Error: {e:#}")),
            };
            (path, outcome)
        });
        handles.push(handle);
    }

    let mut results = HashMap::with_capacity(total);
    let mut completed = 0usize;

    for chunk in handles.chunks_mut(PROGRESS_CHUNK_SIZE) {
        for handle in chunk {
            match handle.await {
                Ok((path, outcome)) => {
                    results.insert(path, outcome);
                }
                Err(e) => {
                    tracing::error!("Summarization task panicked: {e}");
                }
            }
            completed += 1;
        }

        let elapsed = start.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            completed as f64 / elapsed
        } else {
            0.0
        };
        let remaining = total.saturating_sub(completed);
        let eta_mins = if rate > 0.0 {
            remaining as f64 / rate / 60.0
        } else {
            0.0
        };
        tracing::info!(
            "Progress: {completed}/{total} files ({:.1}%) - rate: {rate:.1}/sec - ETA: {eta_mins:.1} minutes",
            completed as f64 / total.max(1) as f64 * 100.0
        );
        on_progress(completed, total);
    }

    let total_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Completed {} summaries in {:.1} minutes ({:.2}s per file)",
        results.len(),
        total_secs / 60.0,
        total_secs / results.len().max(1) as f64
    );

    results
}

/// Full ingestion run: collect, summarize, store. Spawned as a background
/// task by the API layer; errors bubble to the caller, which records them in
/// the ingest status.
pub async fn run_ingest(state: AppState, root: PathBuf) -> Result<()> {
    state.set_ingest_status(IngestStatus::Collecting);

    let max_size = state.config.max_file_size_bytes;
    let root_for_walk = root.clone();
    let files = tokio::task::spawn_blocking(move || {
        collect::collect_source_files(&root_for_walk, max_size)
    })
    .await
    .context("Collection task failed")??;

    tracing::info!("Found {} indexable files under {}", files.len(), root.display());

    if files.is_empty() {
        anyhow::bail!("No indexable files found under {}", root.display());
    }

    // Clear stale entries from a previous version of the project before
    // re-indexing; upsert-by-path handles same-path overwrites, this handles
    // deleted files.
    state.store.clear()?;

    let llm = state.llm_config.read().clone();
    let total = files.len();

    let outcomes = if llm.summaries_enabled() {
        state.set_ingest_status(IngestStatus::Summarizing {
            completed: 0,
            total,
        });

        let client = state.http_client.clone();
        let timeout = Duration::from_secs(state.config.summary_timeout_secs);
        let llm_for_work = llm.clone();
        let status_state = state.clone();

        summarize_batch(
            files.clone(),
            state.summary_semaphore.clone(),
            move |file| {
                let client = client.clone();
                let llm = llm_for_work.clone();
                async move { summarize::summarize_file(&client, &llm, timeout, &file).await }
            },
            move |completed, total| {
                status_state.set_ingest_status(IngestStatus::Summarizing { completed, total });
            },
        )
        .await
    } else {
        tracing::warn!("No summarization service configured - using heuristic summaries");
        HashMap::new()
    };

    // Assemble records: AI text where the call succeeded, deterministic
    // fallback where it failed or no service was available.
    let mut failed = 0usize;
    let records: Vec<_> = files
        .iter()
        .map(|file| match outcomes.get(&file.relative_path) {
            Some(SummaryOutcome::Summary(text)) => {
                summarize::build_record(file, text.clone(), true)
            }
            Some(SummaryOutcome::Failed(marker)) => {
                failed += 1;
                tracing::warn!("Summary failed for {}: {marker}", file.relative_path);
                summarize::build_record(file, summarize::fallback_summary(file), false)
            }
            None => summarize::build_record(file, summarize::fallback_summary(file), false),
        })
        .collect();

    if failed > 0 {
        tracing::warn!("{failed}/{total} summaries fell back to heuristic analysis");
    }

    // Sequential write phase: embed summary texts (best effort), then upsert.
    let texts: Vec<String> = records.iter().map(|r| r.summary.clone()).collect();
    let record_embeddings = if llm.summaries_enabled() {
        match embeddings::embed_batch(&state.http_client, &llm, &texts).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    "Embedding summaries failed (LLM may not be running), keyword search only: {e:#}"
                );
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    state.store.upsert_batch(records, record_embeddings)?;

    // Refresh the file catalog for the tool surface
    {
        let mut catalog = state.catalog.write();
        catalog.replace(
            files
                .into_iter()
                .map(|f| (f.relative_path, f.content)),
        );
    }
    state.persist_catalog();

    state.set_ingest_status(IngestStatus::Ready {
        files: total,
        finished_at: Utc::now(),
    });
    tracing::info!("Ingestion complete: {total} files indexed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_files(n: usize) -> Vec<SourceFile> {
        (0..n)
            .map(|i| SourceFile {
                relative_path: format!("src/file_{i}.py"),
                content: "pass\n".to_string(),
                language: "python".to_string(),
                line_count: 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_partial_failures_do_not_abort_the_batch() {
        let files = sample_files(10);
        let sem = Arc::new(Semaphore::new(4));

        let results = summarize_batch(
            files,
            sem,
            |file| async move {
                // Every third file fails
                let idx: usize = file
                    .relative_path
                    .trim_start_matches("src/file_")
                    .trim_end_matches(".py")
                    .parse()
                    .unwrap();
                if idx % 3 == 0 {
                    anyhow::bail!("simulated service error")
                }
                Ok(format!("summary of {}", file.relative_path))
            },
            |_, _| {},
        )
        .await;

        assert_eq!(results.len(), 10);
        let failed = results.values().filter(|o| o.is_failed()).count();
        assert_eq!(failed, 4); // indices 0, 3, 6, 9
        assert!(matches!(
            results.get("src/file_1.py"),
            Some(SummaryOutcome::Summary(_))
        ));
        match results.get("src/file_3.py") {
            Some(SummaryOutcome::Failed(marker)) => {
                assert!(marker.starts_with("Error:"));
                assert!(marker.contains("simulated service error"));
            }
            other => panic!("expected failure marker, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let limit = 3;
        let files = sample_files(20);
        let sem = Arc::new(Semaphore::new(limit));

        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));
        let in_flight_c = in_flight.clone();
        let high_water_c = high_water.clone();

        let results = summarize_batch(
            files,
            sem,
            move |file| {
                let in_flight = in_flight_c.clone();
                let high_water = high_water_c.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(file.relative_path)
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(results.len(), 20);
        assert!(
            high_water.load(Ordering::SeqCst) <= limit,
            "in-flight high water {} exceeded limit {limit}",
            high_water.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_results_keyed_by_path() {
        let files = sample_files(5);
        let sem = Arc::new(Semaphore::new(2));

        let results = summarize_batch(
            files,
            sem,
            |file| async move { Ok(file.relative_path.to_uppercase()) },
            |_, _| {},
        )
        .await;

        assert_eq!(
            results.get("src/file_2.py"),
            Some(&SummaryOutcome::Summary("SRC/FILE_2.PY".to_string()))
        );
    }

    #[tokio::test]
    async fn test_progress_callback_reaches_total() {
        let files = sample_files(7);
        let sem = Arc::new(Semaphore::new(2));
        let mut last = (0usize, 0usize);

        summarize_batch(
            files,
            sem,
            |_| async move { Ok("ok".to_string()) },
            |completed, total| last = (completed, total),
        )
        .await;

        assert_eq!(last, (7, 7));
    }

}
