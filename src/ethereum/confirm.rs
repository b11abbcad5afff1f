//! Waits for submitted transactions to be mined.
//!
//! The wait probes `eth_getTransactionReceipt` right away and then once per
//! poll interval until a receipt shows up or the [`Deadline`] passes. Only a
//! missing receipt is retried; a failing probe ends the wait with that error.
//! Dropping the returned future cancels the wait.

use alloy::primitives::{Address, B256};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::BindingConfig;
use crate::error::{BindingError, Result};
use crate::ethereum::{
    events::{decode_logs, EventTable},
    provider::Transport,
    Confirmation, EnrichedConfirmation, Receipt,
};

pub const DEFAULT_SYNCHRONIZATION_TIMEOUT: Duration = Duration::from_millis(240_000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// How long and how often to wait for a receipt, and what to resolve with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub next_gen: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SYNCHRONIZATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            next_gen: false,
        }
    }
}

impl SyncOptions {
    /// A zero timeout or interval falls back to its default.
    pub fn from_config(config: &BindingConfig) -> Self {
        let timeout = match config.synchronization_timeout {
            0 => DEFAULT_SYNCHRONIZATION_TIMEOUT,
            ms => Duration::from_millis(ms),
        };
        let poll_interval = match config.poll_interval {
            0 => DEFAULT_POLL_INTERVAL,
            ms => Duration::from_millis(ms),
        };
        Self {
            timeout,
            poll_interval,
            next_gen: config.next_gen,
        }
    }
}

/// Point in time after which a pending transaction counts as timed out
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() > self.timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Polls until `tx` has a receipt or `options.timeout` elapses.
pub async fn wait_for_receipt(
    transport: &dyn Transport,
    tx: B256,
    options: &SyncOptions,
) -> Result<Receipt> {
    let deadline = Deadline::after(options.timeout);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        if let Some(receipt) = transport.transaction_receipt(tx).await? {
            info!(
                "Transaction {} mined in block {:?} after {} probe(s)",
                tx, receipt.block_number, attempt
            );
            return Ok(receipt);
        }

        if deadline.expired() {
            return Err(BindingError::Timeout {
                tx,
                seconds: deadline.timeout().as_secs_f64(),
            });
        }

        debug!(
            "No receipt for {} yet (probe {}, {:?} elapsed)",
            tx,
            attempt,
            deadline.elapsed()
        );
        sleep(options.poll_interval).await;
    }
}

/// Waits for `tx` and resolves with the bare hash, or with the receipt and
/// its decoded events when `next_gen` is set.
pub async fn synchronize(
    transport: &dyn Transport,
    tx: B256,
    options: &SyncOptions,
    events: &EventTable,
    address: Option<Address>,
) -> Result<Confirmation> {
    let receipt = wait_for_receipt(transport, tx, options).await?;

    if !options.next_gen {
        return Ok(Confirmation::Hash(tx));
    }

    let logs = decode_logs(events, &receipt.logs);
    debug!(
        "Decoded {} of {} log(s) for {} (contract {:?})",
        logs.len(),
        receipt.logs.len(),
        tx,
        address
    );

    Ok(Confirmation::Enriched(EnrichedConfirmation { tx, receipt, logs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::events::tests::{bid_win_log, new_bid_log, offer_events};
    use crate::ethereum::mock::MockTransport;
    use alloy::primitives::Log;
    use alloy::primitives::Bytes;

    fn fast(next_gen: bool) -> SyncOptions {
        SyncOptions {
            timeout: Duration::from_millis(1_000),
            poll_interval: Duration::from_millis(1_000),
            next_gen,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_receipt_probes_once() {
        let transport = MockTransport::mining_after(0);
        let tx = B256::repeat_byte(1);

        let confirmation = synchronize(&transport, tx, &fast(false), &offer_events(), None)
            .await
            .unwrap();

        assert_eq!(confirmation, Confirmation::Hash(tx));
        assert_eq!(transport.probe_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_mined() {
        let transport = MockTransport::mining_after(3);
        let options = SyncOptions {
            timeout: Duration::from_secs(240),
            ..SyncOptions::default()
        };
        let start = Instant::now();

        let receipt = wait_for_receipt(&transport, B256::repeat_byte(2), &options)
            .await
            .unwrap();

        assert_eq!(receipt.block_number, Some(7));
        assert_eq!(transport.probe_count(), 4);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_shortly_after_deadline() {
        let transport = MockTransport::never_mining();
        let tx = B256::repeat_byte(3);
        let start = Instant::now();

        let err = wait_for_receipt(&transport, tx, &fast(false)).await.unwrap_err();

        let elapsed = start.elapsed();
        assert!(elapsed > Duration::from_millis(1_000));
        assert!(elapsed <= Duration::from_millis(3_000));
        match err {
            BindingError::Timeout { tx: failed, seconds } => {
                assert_eq!(failed, tx);
                assert_eq!(seconds, 1.0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_message() {
        let transport = MockTransport::never_mining();
        let options = SyncOptions {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            next_gen: false,
        };

        let err = wait_for_receipt(&transport, B256::repeat_byte(1), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, BindingError::Timeout { seconds, .. } if seconds == 0.5));
        assert!(err.to_string().ends_with("wasn't processed in 0.5 seconds!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_is_not_retried() {
        let transport = MockTransport::never_mining();
        *transport.fail_probe.lock().unwrap() = Some("connection refused".to_string());

        let err = wait_for_receipt(&transport, B256::repeat_byte(4), &fast(false))
            .await
            .unwrap_err();

        assert!(matches!(err, BindingError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(transport.probe_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_gen_decodes_receipt_logs() {
        let transport = MockTransport::mining_after(1);
        let contract = Address::repeat_byte(0x11);
        *transport.receipt_logs.lock().unwrap() = vec![
            Log::new_unchecked(contract, vec![B256::repeat_byte(0x55)], Bytes::new()),
            new_bid_log(contract, 10, Address::repeat_byte(0x22)),
            bid_win_log(contract, 3),
        ];
        let tx = B256::repeat_byte(5);

        let confirmation = synchronize(&transport, tx, &fast(true), &offer_events(), Some(contract))
            .await
            .unwrap();

        assert_eq!(confirmation.tx_hash(), tx);
        assert_eq!(confirmation.receipt().unwrap().logs.len(), 3);
        let names: Vec<_> = confirmation.logs().iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, vec!["newBid", "bidWin"]);
    }

    #[test]
    fn test_sync_options_from_config() {
        let mut config = BindingConfig::default();
        assert_eq!(SyncOptions::from_config(&config), SyncOptions::default());

        config.synchronization_timeout = 0;
        config.poll_interval = 250;
        config.next_gen = true;
        let options = SyncOptions::from_config(&config);
        assert_eq!(options.timeout, DEFAULT_SYNCHRONIZATION_TIMEOUT);
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert!(options.next_gen);
    }
}
