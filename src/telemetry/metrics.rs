//! Prometheus metrics

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Messages received on a watched channel
    TicksReceived,
    /// Ticks dropped because a newer one replaced them
    TicksCoalesced,
    /// Orders accepted by the venue
    OrdersSubmitted,
    /// Orders rejected or failed in transit
    OrdersFailed,
    /// Reconnect attempts
    Reconnects,
    /// Disconnects forced by the idle watchdog
    IdleDisconnects,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Free balance in the bot's currency
    FreeBalance,
    /// Watchers currently registered
    ActiveWatchers,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::TicksReceived => "upwingo_ticks_received_total",
            CounterMetric::TicksCoalesced => "upwingo_ticks_coalesced_total",
            CounterMetric::OrdersSubmitted => "upwingo_orders_submitted_total",
            CounterMetric::OrdersFailed => "upwingo_orders_failed_total",
            CounterMetric::Reconnects => "upwingo_reconnects_total",
            CounterMetric::IdleDisconnects => "upwingo_idle_disconnects_total",
        }
    }
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::FreeBalance => "upwingo_free_balance",
            GaugeMetric::ActiveWatchers => "upwingo_active_watchers",
        }
    }
}

/// Bump a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Bump a counter by one under a `channel` label
pub fn increment_labeled(metric: CounterMetric, channel: &str) {
    metrics::counter!(metric.name(), "channel" => channel.to_string()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
    tracing::trace!(metric = metric.name(), value, "Gauge updated");
}
