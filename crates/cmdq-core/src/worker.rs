use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{CommandEnvelope, CommandOutcome, DispatchError};
use crate::ports::Clock;
use crate::queue::EnvelopeQueue;

/// Run one envelope's command and account for it.
///
/// Completion is recorded before anything is published, so a submitter
/// woken by the sink always finds the envelope's completion timestamp set.
/// The outcome goes to the sink only when the submitter wants it; a
/// failure nobody listens for is logged instead.
///
/// An envelope that already completed is refused before its command runs.
pub async fn execute_one(
    envelope: &CommandEnvelope,
    clock: &dyn Clock,
) -> Result<CommandOutcome, DispatchError> {
    // 完了済みなら副作用を起こす前に弾く
    if envelope.is_processed() {
        return Err(DispatchError::invalid_state(format!(
            "command {} already completed",
            envelope.command_id()
        )));
    }

    let ctx = envelope.context();
    let result = envelope.command().execute(&ctx).await;

    // publish より先に完了時刻を確定させる
    let completed_at = clock.now();
    envelope.record_completion(completed_at)?;

    let outcome = match result {
        Ok(value) => CommandOutcome::success(envelope.command_id(), value, completed_at),
        Err(err) => CommandOutcome::failure(envelope.command_id(), err.message(), completed_at),
    };

    if envelope.wants_result() {
        if let Some(sink) = envelope.result_sink() {
            sink.publish(outcome.clone())?;
        }
    } else if !outcome.is_success() {
        tracing::warn!(
            command_id = %envelope.command_id(),
            requester = %envelope.requester(),
            reason = outcome.reason.as_deref().unwrap_or_default(),
            "unobserved command failed"
        );
    }

    Ok(outcome)
}

/// Worker group handle.
/// - group を drop するか `request_shutdown` で、新しい envelope を取らなくなる
/// - `drain_and_join` closes the queue and lets workers finish what is queued
pub struct WorkerGroup {
    queue: Arc<dyn EnvelopeQueue>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, queue: Arc<dyn EnvelopeQueue>, clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let c = Arc::clone(&clock);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, c, &mut rx).await;
            });
            joins.push(join);
        }
        tracing::info!(workers = n, "worker group started");

        Self {
            queue,
            shutdown_tx,
            joins,
        }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// An in-flight command still runs to completion; queued ones stay queued.
    pub fn request_shutdown(&self) {
        // receiver が既に drop 済みでも無視してよい
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        join_all(self.joins).await;
    }

    /// Close the queue, let workers run everything still queued, then wait for them.
    pub async fn drain_and_join(self) {
        self.queue.close().await;
        join_all(self.joins).await;
    }
}

async fn join_all(joins: Vec<JoinHandle<()>>) {
    for j in joins {
        if let Err(e) = j.await {
            tracing::error!(error = %e, "worker task ended abnormally");
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn EnvelopeQueue>,
    clock: Arc<dyn Clock>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は「待つ」ので shutdown と select で競合させる
        let envelope = tokio::select! {
            changed = shutdown_rx.changed() => {
                // a dropped group stops its workers too
                if changed.is_err() {
                    break;
                }
                continue;
            }
            envelope = queue.pop() => envelope,
        };

        let Some(envelope) = envelope else {
            // close 済みかつ空
            break;
        };

        tracing::debug!(worker_id, envelope = %envelope, "dispatching command");
        match execute_one(&envelope, clock.as_ref()).await {
            Ok(outcome) => tracing::debug!(
                worker_id,
                command_id = %outcome.command_id,
                kind = ?outcome.kind,
                "command concluded"
            ),
            Err(e) => tracing::warn!(
                worker_id,
                command_id = %envelope.command_id(),
                error = %e,
                "could not account for command"
            ),
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::domain::{CommandPriority, Locale, OutcomeKind, RequesterId, UNPROCESSED};
    use crate::impls::ResultHandle;
    use crate::ports::command::testing::{EchoCommand, FailingCommand, LocaleProbe};
    use crate::ports::{FixedClock, ResultSink, SystemClock};
    use crate::queue::{CommandQueue, Submission};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::Ordering;
    use std::time::Duration as StdDuration;

    fn config() -> DispatchConfig {
        DispatchConfig::new(Locale::new("en").unwrap())
    }

    fn envelope_with(
        command: Box<dyn crate::ports::DbCommand>,
        sink: Option<Arc<dyn ResultSink>>,
        wants_result: bool,
        clock: &FixedClock,
    ) -> CommandEnvelope {
        CommandEnvelope::new(
            command,
            sink,
            RequesterId::new("tester"),
            wants_result,
            Locale::new("en").unwrap(),
            CommandPriority::NORMAL,
            clock,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn execute_one_records_completion_then_publishes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let handle = Arc::new(ResultHandle::new());
        let env = envelope_with(
            Box::new(EchoCommand::new("q")),
            Some(handle.clone() as Arc<dyn ResultSink>),
            true,
            &clock,
        );
        clock.advance(Duration::milliseconds(40));

        let outcome = execute_one(&env, &clock).await.unwrap();
        let done = start + Duration::milliseconds(40);

        assert_eq!(env.processed_at(), Some(done));
        assert_eq!(outcome.completed_at, done);
        let published = handle.try_get().unwrap();
        assert_eq!(published, outcome);
        assert_eq!(published.value, Some(serde_json::json!("q")));
    }

    #[tokio::test]
    async fn failed_command_still_gets_a_completion_timestamp() {
        let clock = FixedClock::new(Utc::now());
        let handle = Arc::new(ResultHandle::new());
        let env = envelope_with(
            Box::new(FailingCommand {
                reason: "unique constraint violated",
                ..Default::default()
            }),
            Some(handle.clone() as Arc<dyn ResultSink>),
            true,
            &clock,
        );

        let outcome = execute_one(&env, &clock).await.unwrap();
        assert_eq!(outcome.kind, OutcomeKind::Failure);
        assert!(env.is_processed());
        assert_eq!(
            handle.try_get().unwrap().reason.as_deref(),
            Some("unique constraint violated")
        );
    }

    #[tokio::test]
    async fn unwanted_result_is_not_published() {
        let clock = FixedClock::new(Utc::now());
        let handle = Arc::new(ResultHandle::new());
        let cmd = EchoCommand::new("q");
        let runs = Arc::clone(&cmd.runs);
        let env = envelope_with(
            Box::new(cmd),
            Some(handle.clone() as Arc<dyn ResultSink>),
            false,
            &clock,
        );

        execute_one(&env, &clock).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(env.is_processed());
        assert!(handle.try_get().is_none());
    }

    #[tokio::test]
    async fn executing_twice_is_rejected() {
        let clock = FixedClock::new(Utc::now());
        let cmd = EchoCommand::new("q");
        let runs = Arc::clone(&cmd.runs);
        let env = envelope_with(Box::new(cmd), None, false, &clock);

        execute_one(&env, &clock).await.unwrap();
        let first = env.processed_timestamp();
        clock.advance(Duration::milliseconds(5));
        let err = execute_one(&env, &clock).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidState(_)));
        assert_eq!(env.processed_timestamp(), first);
        assert_ne!(first, UNPROCESSED);
        // the second attempt never reached the database
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completed_envelope_does_not_publish_again() {
        let clock = FixedClock::new(Utc::now());
        let handle = Arc::new(ResultHandle::new());
        let env = envelope_with(
            Box::new(EchoCommand::new("once")),
            Some(handle.clone() as Arc<dyn ResultSink>),
            true,
            &clock,
        );

        let first = execute_one(&env, &clock).await.unwrap();
        let err = execute_one(&env, &clock).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidState(_)));
        assert_eq!(handle.try_get().unwrap(), first);
    }

    #[tokio::test]
    async fn workers_deliver_results_to_waiting_submitters() {
        let queue = Arc::new(CommandQueue::with_system_clock(&config().with_workers(2)));
        let workers = WorkerGroup::spawn(2, queue.clone(), Arc::new(SystemClock));
        assert_eq!(workers.len(), 2);

        let handle = queue
            .enqueue_and_await_result(EchoCommand::new("answer"), CommandPriority::HIGH)
            .await
            .unwrap();
        let outcome = handle
            .wait_timeout(StdDuration::from_secs(2))
            .await
            .expect("outcome published");
        assert_eq!(outcome.into_result().unwrap(), serde_json::json!("answer"));

        workers.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn command_runs_under_submitted_locale() {
        let queue = Arc::new(CommandQueue::with_system_clock(&config()));
        let workers = WorkerGroup::spawn(1, queue.clone(), Arc::new(SystemClock));

        let submitted = queue
            .submit(
                LocaleProbe::default(),
                Submission::new()
                    .locale(Locale::new("fr-FR").unwrap())
                    .requester(RequesterId::new("probe"))
                    .await_result(),
            )
            .await
            .unwrap();
        let outcome = submitted
            .handle
            .unwrap()
            .wait_timeout(StdDuration::from_secs(2))
            .await
            .unwrap();
        let value = outcome.into_result().unwrap();
        assert_eq!(value["locale"], "fr-FR");
        assert_eq!(value["requester"], "probe");

        workers.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn drain_runs_everything_queued() {
        let queue = Arc::new(CommandQueue::with_system_clock(&config()));
        let cmd = EchoCommand::new("fire-and-forget");
        let runs = Arc::clone(&cmd.runs);
        queue.enqueue(cmd, CommandPriority::BACKGROUND).await.unwrap();

        let handles = {
            let mut hs = Vec::new();
            for _ in 0..3 {
                hs.push(
                    queue
                        .enqueue_and_await_result(EchoCommand::new("x"), CommandPriority::LOW)
                        .await
                        .unwrap(),
                );
            }
            hs
        };

        let workers = WorkerGroup::spawn(2, queue.clone(), Arc::new(SystemClock));
        tokio::time::timeout(StdDuration::from_secs(2), workers.drain_and_join())
            .await
            .expect("workers drained");

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| h.is_ready()));
        let counts = queue.counts().await;
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.dispatched, 4);
    }

    #[tokio::test]
    async fn shutdown_leaves_queue_untouched() {
        let queue = Arc::new(CommandQueue::with_system_clock(&config()));
        let workers = WorkerGroup::spawn(1, queue.clone(), Arc::new(SystemClock));
        workers.shutdown_and_join().await;

        queue.enqueue(EchoCommand::new("later"), CommandPriority::NORMAL).await.unwrap();
        assert_eq!(queue.counts().await.pending, 1);
    }
}
