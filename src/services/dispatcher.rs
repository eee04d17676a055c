//! Bulk lookup dispatcher.
//!
//! Fans a batch of numbers out over a fixed number of worker tasks that share
//! one work queue and one result list:
//!
//! 1. Normalize every input, dropping the ones without digits
//! 2. Load the survivors into a shared queue
//! 3. Spawn `min(concurrency, queue length)` workers
//! 4. Each worker pops one number, classifies it, pushes the result, repeats
//! 5. Return once every worker has found the queue empty
//!
//! Popping under the queue lock gives each number to exactly one worker, and
//! every claimed number yields a result even if its lookup panics, so the
//! result list always has one entry per normalized input. Result order is not
//! related to input order.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::connection::WhatsAppConnection;
use crate::models::lookup::{LookupResult, NormalizedNumber};
use crate::services::{classifier, normalizer};

/// Shared state of one batch.
struct Batch {
    queue: Mutex<VecDeque<NormalizedNumber>>,
    results: Mutex<Vec<LookupResult>>,
}

/// Runs bulk lookups against one shared connection.
#[derive(Clone)]
pub struct BulkDispatcher {
    connection: Arc<dyn WhatsAppConnection>,
    country_code: String,
    default_concurrency: usize,
    max_concurrency: usize,
}

impl BulkDispatcher {
    pub fn new(
        connection: Arc<dyn WhatsAppConnection>,
        country_code: impl Into<String>,
        default_concurrency: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            connection,
            country_code: country_code.into(),
            default_concurrency: default_concurrency.max(1),
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn connection(&self) -> &Arc<dyn WhatsAppConnection> {
        &self.connection
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Turn a caller-supplied concurrency into a worker count.
    ///
    /// Numbers and numeric strings are floored; anything non-positive,
    /// non-numeric or missing falls back to the default. The result is
    /// capped at the configured maximum.
    pub fn coerce_concurrency(&self, requested: Option<&Value>) -> usize {
        let parsed = match requested {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        let workers = match parsed {
            Some(n) if n.is_finite() && n >= 1.0 => n.floor() as usize,
            _ => self.default_concurrency,
        };

        workers.min(self.max_concurrency)
    }

    /// Normalize and classify every raw number.
    pub async fn run(&self, raw_numbers: &[Value], concurrency: usize) -> Vec<LookupResult> {
        let numbers: VecDeque<NormalizedNumber> = raw_numbers
            .iter()
            .filter_map(|raw| normalizer::normalize_value(raw, &self.country_code))
            .collect();

        self.run_normalized(numbers, concurrency).await
    }

    /// Classify already-normalized numbers with up to `concurrency` workers.
    pub async fn run_normalized(
        &self,
        numbers: VecDeque<NormalizedNumber>,
        concurrency: usize,
    ) -> Vec<LookupResult> {
        let total = numbers.len();
        let workers = concurrency.max(1).min(total);

        if workers == 0 {
            return Vec::new();
        }

        tracing::info!(total, workers, "bulk lookup started");

        let batch = Arc::new(Batch {
            queue: Mutex::new(numbers),
            results: Mutex::new(Vec::with_capacity(total)),
        });

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let batch = Arc::clone(&batch);
            let connection = Arc::clone(&self.connection);
            tasks.spawn(async move {
                let mut processed = 0usize;
                loop {
                    // Lock guard is dropped before the lookup awaits.
                    let Some(number) = batch.queue.lock().await.pop_front() else {
                        break;
                    };
                    let result = classify_isolated(&connection, number).await;
                    batch.results.lock().await.push(result);
                    processed += 1;
                }
                tracing::debug!(worker, processed, "bulk worker drained queue");
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "bulk worker task failed");
            }
        }

        let results = std::mem::take(&mut *batch.results.lock().await);
        tracing::info!(total, returned = results.len(), "bulk lookup finished");
        results
    }
}

/// Error reported for a number whose lookup panicked.
pub const LOOKUP_PANICKED: &str = "lookup_panicked";

/// Classify `number` on its own task. A panic there becomes an error result
/// for this number; the calling worker keeps draining the queue.
async fn classify_isolated(
    connection: &Arc<dyn WhatsAppConnection>,
    number: NormalizedNumber,
) -> LookupResult {
    let connection = Arc::clone(connection);
    let claimed = number.clone();

    match tokio::spawn(async move { classifier::classify(connection.as_ref(), &claimed).await })
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(number = %number, error = %e, "lookup task failed");
            LookupResult::failed(number.as_str(), LOOKUP_PANICKED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionError;
    use crate::models::lookup::{BusinessProfile, ClassificationType, ContactMetadata};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Numbers ending in an odd digit exist; numbers ending in `9` fail.
    #[derive(Default)]
    struct ParityConnection {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WhatsAppConnection for ParityConnection {
        fn is_ready(&self) -> bool {
            true
        }

        async fn number_exists(&self, jid: &str) -> Result<bool, ConnectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let last = jid.split('@').next().and_then(|d| d.chars().last()).unwrap_or('0');
            match last {
                '9' => Err(ConnectionError::Status(503)),
                d => Ok(d.to_digit(10).unwrap_or(0) % 2 == 1),
            }
        }

        async fn contact_metadata(&self, _jid: &str) -> ContactMetadata {
            ContactMetadata::default()
        }

        async fn business_profile(
            &self,
            _jid: &str,
        ) -> Result<Option<BusinessProfile>, ConnectionError> {
            Ok(None)
        }
    }

    fn dispatcher(conn: Arc<ParityConnection>) -> BulkDispatcher {
        BulkDispatcher::new(conn, "62", 5, 50)
    }

    fn raw(numbers: &[&str]) -> Vec<Value> {
        numbers.iter().map(|n| json!(n)).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_input_yields_exactly_one_result() {
        let inputs: Vec<String> = (0..40).map(|i| format!("0812000{i:03}")).collect();
        let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();

        for concurrency in [1, 3, 8, 100] {
            let conn = Arc::new(ParityConnection::default());
            let results = dispatcher(conn.clone()).run(&raw(&refs), concurrency).await;

            assert_eq!(results.len(), inputs.len());
            assert_eq!(conn.calls.load(Ordering::SeqCst), inputs.len());

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for r in &results {
                *counts.entry(r.number.as_str()).or_default() += 1;
            }
            assert!(counts.values().all(|&c| c == 1));
        }
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch() {
        let conn = Arc::new(ParityConnection::default());
        let results = dispatcher(conn)
            .run(&raw(&["08121", "08122", "08129"]), 2)
            .await;

        assert_eq!(results.len(), 3);
        let by_number: HashMap<_, _> = results.iter().map(|r| (r.number.as_str(), r)).collect();
        assert_eq!(by_number["628121"].kind, Some(ClassificationType::Personal));
        assert_eq!(by_number["628122"].kind, Some(ClassificationType::NotOnWhatsapp));
        assert!(by_number["628129"].is_error());
    }

    #[tokio::test]
    async fn unnormalizable_inputs_are_dropped() {
        let conn = Arc::new(ParityConnection::default());
        let inputs = vec![json!("abc"), json!(""), json!(null), json!(6281), json!("08123")];
        let results = dispatcher(conn).run(&inputs, 5).await;

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_inputs_are_each_checked() {
        let conn = Arc::new(ParityConnection::default());
        let results = dispatcher(conn).run(&raw(&["08121", "+628121"]), 2).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.number == "628121"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_count_bounds_in_flight_queries() {
        let conn = Arc::new(ParityConnection::default());
        let inputs: Vec<String> = (0..20).map(|i| format!("08130{i:02}")).collect();
        let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();

        dispatcher(conn.clone()).run(&raw(&refs), 3).await;
        assert!(conn.peak.load(Ordering::SeqCst) <= 3);
    }

    /// Every existence query waits until the barrier has enough queries in flight.
    struct RendezvousConnection {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl WhatsAppConnection for RendezvousConnection {
        fn is_ready(&self) -> bool {
            true
        }

        async fn number_exists(&self, _jid: &str) -> Result<bool, ConnectionError> {
            self.barrier.wait().await;
            Ok(false)
        }

        async fn contact_metadata(&self, _jid: &str) -> ContactMetadata {
            ContactMetadata::default()
        }

        async fn business_profile(
            &self,
            _jid: &str,
        ) -> Result<Option<BusinessProfile>, ConnectionError> {
            Ok(None)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn requested_workers_all_run_at_once() {
        let conn = Arc::new(RendezvousConnection { barrier: tokio::sync::Barrier::new(3) });
        let d = BulkDispatcher::new(conn, "62", 5, 50);
        let inputs = raw(&["0811", "0812", "0813", "0814", "0815", "0816"]);

        // Each round of three queries only completes when three workers are active
        let results = tokio::time::timeout(Duration::from_secs(5), d.run(&inputs, 3))
            .await
            .expect("fewer than three workers were running");
        assert_eq!(results.len(), 6);
    }

    /// Panics on numbers ending in `7`; every other number is missing.
    struct PanickingConnection;

    #[async_trait]
    impl WhatsAppConnection for PanickingConnection {
        fn is_ready(&self) -> bool {
            true
        }

        async fn number_exists(&self, jid: &str) -> Result<bool, ConnectionError> {
            if jid.split('@').next().is_some_and(|d| d.ends_with('7')) {
                panic!("collaborator bug");
            }
            Ok(false)
        }

        async fn contact_metadata(&self, _jid: &str) -> ContactMetadata {
            ContactMetadata::default()
        }

        async fn business_profile(
            &self,
            _jid: &str,
        ) -> Result<Option<BusinessProfile>, ConnectionError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn panicking_lookup_still_yields_a_result() {
        let d = BulkDispatcher::new(Arc::new(PanickingConnection), "62", 5, 50);
        let results = d.run(&raw(&["08121", "08127", "08123", "08137"]), 2).await;

        assert_eq!(results.len(), 4);
        let panicked: Vec<_> = results
            .iter()
            .filter(|r| r.error.as_deref() == Some(LOOKUP_PANICKED))
            .map(|r| r.number.as_str())
            .collect();
        assert_eq!(panicked.len(), 2);
        assert!(panicked.contains(&"628127") && panicked.contains(&"628137"));
        assert_eq!(
            results.iter().filter(|r| r.kind == Some(ClassificationType::NotOnWhatsapp)).count(),
            2
        );
    }

    #[tokio::test]
    async fn empty_batch_spawns_nothing() {
        let conn = Arc::new(ParityConnection::default());
        let results = dispatcher(conn.clone()).run(&[], 5).await;
        assert!(results.is_empty());
        assert_eq!(conn.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn concurrency_coercion() {
        let d = dispatcher(Arc::new(ParityConnection::default()));
        assert_eq!(d.coerce_concurrency(None), 5);
        assert_eq!(d.coerce_concurrency(Some(&json!(2))), 2);
        assert_eq!(d.coerce_concurrency(Some(&json!("3"))), 3);
        assert_eq!(d.coerce_concurrency(Some(&json!(2.7))), 2);
        assert_eq!(d.coerce_concurrency(Some(&json!(0))), 5);
        assert_eq!(d.coerce_concurrency(Some(&json!(-4))), 5);
        assert_eq!(d.coerce_concurrency(Some(&json!("lots"))), 5);
        assert_eq!(d.coerce_concurrency(Some(&json!(1000))), 50);
    }
}
