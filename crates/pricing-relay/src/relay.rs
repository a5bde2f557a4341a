//! # Event Relay
//!
//! Moves pricing events from the synchronous engine onto an async consumer.
//!
//! ## Relay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Event Relay Flow                                │
//! │                                                                         │
//! │  PriceCalculationService / Governance (sync, any thread)               │
//! │         │ publish(event)                                               │
//! │         ▼                                                               │
//! │  ChannelPublisher ── try_send ──► mpsc (bounded) ──► EventRelay::run   │
//! │         │                                                  │            │
//! │         └─ full / closed: warn! and drop                   ▼            │
//! │                                                     EventSink::deliver  │
//! │                                                                         │
//! │  STOPS WHEN:                                                           │
//! │  • every publisher is dropped (channel drained first)                  │
//! │  • EventRelayHandle::shutdown (queued events drained first)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use pricing_core::{EventPublisher, PricingEvent};

use crate::config::PricingConfig;
use crate::error::{RelayError, RelayResult};

// =============================================================================
// Sinks
// =============================================================================

/// Final destination of relayed events.
pub trait EventSink: Send {
    fn deliver(&mut self, event: &PricingEvent) -> RelayResult<()>;
}

/// Writes each event as a JSON line through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&mut self, event: &PricingEvent) -> RelayResult<()> {
        let payload = serde_json::to_string(event)?;
        info!(target: "pricing_events", event = event.name(), %payload, "Pricing event");
        Ok(())
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct RelayCounters {
    published: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Accepted onto the channel.
    pub published: u64,
    /// Rejected because the channel was full or closed.
    pub dropped: u64,
    pub delivered: u64,
    /// Sink returned an error.
    pub failed: u64,
}

impl RelayCounters {
    fn snapshot(&self) -> RelayStats {
        RelayStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Publisher
// =============================================================================

/// [`EventPublisher`] that never blocks the pricing thread.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<PricingEvent>,
    counters: Arc<RelayCounters>,
}

impl ChannelPublisher {
    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: PricingEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(event = event.name(), "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(event = event.name(), "Event relay stopped, dropping event");
            }
        }
    }
}

// =============================================================================
// Relay
// =============================================================================

/// Receiving end of the event channel.
pub struct EventRelay {
    rx: mpsc::Receiver<PricingEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    counters: Arc<RelayCounters>,
}

/// Handle for controlling a running relay.
#[derive(Clone)]
pub struct EventRelayHandle {
    shutdown_tx: mpsc::Sender<()>,
    counters: Arc<RelayCounters>,
}

impl EventRelayHandle {
    /// Asks the relay to drain what is queued and stop.
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }

    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }
}

impl EventRelay {
    /// Creates a relay with room for `capacity` queued events.
    pub fn new(capacity: usize) -> RelayResult<(Self, ChannelPublisher, EventRelayHandle)> {
        if capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "channel_capacity must be greater than 0".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let counters = Arc::new(RelayCounters::default());

        let relay = EventRelay {
            rx,
            shutdown_rx,
            counters: counters.clone(),
        };
        let publisher = ChannelPublisher {
            tx,
            counters: counters.clone(),
        };
        let handle = EventRelayHandle {
            shutdown_tx,
            counters,
        };

        Ok((relay, publisher, handle))
    }

    pub fn from_config(
        config: &PricingConfig,
    ) -> RelayResult<(Self, ChannelPublisher, EventRelayHandle)> {
        Self::new(config.relay.channel_capacity)
    }

    /// Runs the relay loop until shutdown or until every publisher is gone.
    ///
    /// This should be spawned as a background task.
    pub async fn run<S: EventSink>(mut self, mut sink: S) -> RelayStats {
        info!("Event relay starting");

        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(event) => self.deliver(&mut sink, &event),
                    None => {
                        debug!("All publishers dropped");
                        break;
                    }
                },

                Some(()) = self.shutdown_rx.recv() => {
                    info!("Event relay shutting down");
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.deliver(&mut sink, &event);
                    }
                    break;
                }
            }
        }

        let stats = self.counters.snapshot();
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            "Event relay stopped"
        );
        stats
    }

    fn deliver<S: EventSink>(&self, sink: &mut S, event: &PricingEvent) {
        match sink.deliver(event) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(event = event.name(), error = %e, "Failed to deliver pricing event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pricing_core::events::PriceChanged;
    use pricing_core::strategies::FIXED_PRICING;
    use pricing_core::{
        Currency, MarginGuardRailService, Money, PriceCalculationService, PricingContext,
        PricingTier, StrategyRegistry,
    };
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CollectingSink {
        events: Arc<Mutex<Vec<PricingEvent>>>,
        fail_first: bool,
    }

    impl EventSink for CollectingSink {
        fn deliver(&mut self, event: &PricingEvent) -> RelayResult<()> {
            if self.fail_first {
                self.fail_first = false;
                return Err(RelayError::DeliveryFailed {
                    event: event.name().to_string(),
                    reason: "downstream unavailable".to_string(),
                });
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn price_changed(new_price: i64) -> PricingEvent {
        PricingEvent::PriceChanged(PriceChanged {
            product_id: "SKU-1".to_string(),
            old_price: 1000,
            new_price,
            currency: "BBD".to_string(),
            reason: "test".to_string(),
            triggering_calculation_id: "calc-1".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            EventRelay::new(0),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (_relay, publisher, _handle) = EventRelay::new(1).unwrap();
        publisher.publish(price_changed(1100));
        publisher.publish(price_changed(1200));
        publisher.publish(price_changed(1300));
        assert_eq!(
            publisher.stats(),
            RelayStats {
                published: 1,
                dropped: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_closed_channel_drops() {
        let (relay, publisher, _handle) = EventRelay::new(4).unwrap();
        drop(relay);
        publisher.publish(price_changed(1100));
        assert_eq!(publisher.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_relay_delivers_engine_events_in_order() {
        let (relay, publisher, _handle) = EventRelay::new(16).unwrap();
        let sink = CollectingSink::default();
        let received = sink.events.clone();
        let task = tokio::spawn(relay.run(sink));

        let service = PriceCalculationService::new(Arc::new(MarginGuardRailService::new()))
            .with_registry(StrategyRegistry::with_default_strategies())
            .with_publisher(Arc::new(publisher));
        let bbd = Currency::new("BBD").unwrap();
        let cost = Money::new(1000, bbd).unwrap();
        let ctx = PricingContext::new(cost, 1, PricingTier::Retail).unwrap();
        let old = Money::new(2000, bbd).unwrap();
        service
            .calculate_price(FIXED_PRICING, &ctx, Some("SKU-9"), Some(&old))
            .unwrap();
        drop(service);

        let stats = task.await.unwrap();
        assert_eq!(stats.delivered, 1);
        let events = received.lock().unwrap();
        match events.as_slice() {
            [PricingEvent::PriceChanged(changed)] => {
                assert_eq!(changed.product_id, "SKU-9");
                assert_eq!(changed.new_price, 2500);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (relay, publisher, handle) = EventRelay::new(8).unwrap();
        publisher.publish(price_changed(1100));
        publisher.publish(price_changed(1200));
        handle.shutdown().await.unwrap();

        let sink = CollectingSink::default();
        let received = sink.events.clone();
        let stats = relay.run(sink).await;

        assert_eq!(stats.delivered, 2);
        assert_eq!(received.lock().unwrap().len(), 2);

        // Relay is gone: later events are dropped, not queued.
        publisher.publish(price_changed(1300));
        assert_eq!(publisher.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_sink_failure_is_counted_and_skipped() {
        let (relay, publisher, _handle) = EventRelay::new(8).unwrap();
        publisher.publish(price_changed(1100));
        publisher.publish(price_changed(1200));
        drop(publisher);

        let sink = CollectingSink {
            fail_first: true,
            ..Default::default()
        };
        let received = sink.events.clone();
        let stats = relay.run(sink).await;

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_log_sink_accepts_every_event() {
        assert!(LogSink.deliver(&price_changed(1100)).is_ok());
    }
}
