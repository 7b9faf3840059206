//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

use crate::ErrorKind;

/// [`Pool`]のメトリクス.
///
/// [`Pool`]: ../pool/struct.Pool.html
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub(crate) capacity_addresses: Gauge,
    pub(crate) free_list_len: Gauge,
    pub(crate) allocated_ranges_at_starting: Counter,
    pub(crate) allocated_ranges_at_running: Counter,
    pub(crate) allocated_addresses_at_starting: Counter,
    pub(crate) allocated_addresses_at_running: Counter,
    pub(crate) released_ranges: Counter,
    pub(crate) released_addresses: Counter,
    pub(crate) rejected_out_of_pool_range: Counter,
    pub(crate) rejected_already_allocated: Counter,
    pub(crate) rejected_not_yet_allocated: Counter,
    pub(crate) nospace_failures: Counter,
}
impl PoolMetrics {
    /// プールが管理するアドレスの総数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_capacity_addresses <GAUGE>
    /// ```
    pub fn capacity_addresses(&self) -> u64 {
        self.capacity_addresses.value() as u64
    }

    /// フリーリストの長さ.
    ///
    /// 空き領域の結合は(デフォルトでは)行われないので、
    /// 割当・解放を繰り返すとこの値は増加していく.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_free_list_len <GAUGE>
    /// ```
    pub fn free_list_len(&self) -> usize {
        self.free_list_len.value() as usize
    }

    /// 範囲の割当回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_allocated_ranges_total { phase="starting|running" } <COUNTER>
    /// ```
    pub fn allocated_ranges(&self) -> u64 {
        self.allocated_ranges_at_starting.value() as u64
            + self.allocated_ranges_at_running.value() as u64
    }

    /// これまでに割り当てたアドレスの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_allocated_addresses_total { phase="starting|running" } <COUNTER>
    /// ```
    pub fn allocated_addresses(&self) -> u64 {
        self.allocated_addresses_at_starting.value() as u64
            + self.allocated_addresses_at_running.value() as u64
    }

    /// 範囲の解放回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_released_ranges_total <COUNTER>
    /// ```
    pub fn released_ranges(&self) -> u64 {
        self.released_ranges.value() as u64
    }

    /// これまでに解放されたアドレスの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_released_addresses_total <COUNTER>
    /// ```
    pub fn released_addresses(&self) -> u64 {
        self.released_addresses.value() as u64
    }

    /// 拒否された割当・解放要求の数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_rejected_requests_total { reason="out_of_pool_range|already_allocated|not_yet_allocated" } <COUNTER>
    /// ```
    pub fn rejected_requests(&self) -> u64 {
        self.rejected_out_of_pool_range.value() as u64
            + self.rejected_already_allocated.value() as u64
            + self.rejected_not_yet_allocated.value() as u64
    }

    /// 空き領域不足による探索失敗回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// ippool_pool_nospace_failures_total <COUNTER>
    /// ```
    pub fn nospace_failures(&self) -> u64 {
        self.nospace_failures.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder) -> Self {
        let mut builder = builder.clone();
        builder.namespace("ippool").subsystem("pool");
        PoolMetrics {
            capacity_addresses: builder
                .gauge("capacity_addresses")
                .help("Number of addresses managed by the pool")
                .finish()
                .expect("Never fails"),
            free_list_len: builder
                .gauge("free_list_len")
                .help("Number of ranges in the free list")
                .finish()
                .expect("Never fails"),
            allocated_ranges_at_starting: builder
                .counter("allocated_ranges_total")
                .help("Number of allocated ranges")
                .label("phase", "starting")
                .finish()
                .expect("Never fails"),
            allocated_ranges_at_running: builder
                .counter("allocated_ranges_total")
                .help("Number of allocated ranges")
                .label("phase", "running")
                .finish()
                .expect("Never fails"),
            allocated_addresses_at_starting: builder
                .counter("allocated_addresses_total")
                .help("Number of allocated addresses")
                .label("phase", "starting")
                .finish()
                .expect("Never fails"),
            allocated_addresses_at_running: builder
                .counter("allocated_addresses_total")
                .help("Number of allocated addresses")
                .label("phase", "running")
                .finish()
                .expect("Never fails"),
            released_ranges: builder
                .counter("released_ranges_total")
                .help("Number of released ranges")
                .finish()
                .expect("Never fails"),
            released_addresses: builder
                .counter("released_addresses_total")
                .help("Number of released addresses")
                .finish()
                .expect("Never fails"),
            rejected_out_of_pool_range: builder
                .counter("rejected_requests_total")
                .help("Number of rejected allocation/release requests")
                .label("reason", "out_of_pool_range")
                .finish()
                .expect("Never fails"),
            rejected_already_allocated: builder
                .counter("rejected_requests_total")
                .help("Number of rejected allocation/release requests")
                .label("reason", "already_allocated")
                .finish()
                .expect("Never fails"),
            rejected_not_yet_allocated: builder
                .counter("rejected_requests_total")
                .help("Number of rejected allocation/release requests")
                .label("reason", "not_yet_allocated")
                .finish()
                .expect("Never fails"),
            nospace_failures: builder
                .counter("nospace_failures_total")
                .help("Number of searches failed because of no available range")
                .finish()
                .expect("Never fails"),
        }
    }

    pub(crate) fn count_allocation(&self, count: u128, starting: bool) {
        let (ranges, addresses) = if starting {
            (
                &self.allocated_ranges_at_starting,
                &self.allocated_addresses_at_starting,
            )
        } else {
            (
                &self.allocated_ranges_at_running,
                &self.allocated_addresses_at_running,
            )
        };
        ranges.increment();
        addresses.add_u64(saturating_u64(count));
    }

    pub(crate) fn count_releasion(&self, count: u128) {
        self.released_ranges.increment();
        self.released_addresses.add_u64(saturating_u64(count));
    }

    pub(crate) fn count_rejection(&self, kind: ErrorKind) {
        match kind {
            ErrorKind::OutOfPoolRange => self.rejected_out_of_pool_range.increment(),
            ErrorKind::AlreadyAllocated => self.rejected_already_allocated.increment(),
            ErrorKind::NotYetAllocated => self.rejected_not_yet_allocated.increment(),
            _ => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn usage_addresses(&self) -> u64 {
        self.allocated_addresses() - self.released_addresses()
    }
}

// IPv6のプールでは、アドレス数が`u64`に収まらないことがある
fn saturating_u64(n: u128) -> u64 {
    if n > u128::from(u64::max_value()) {
        u64::max_value()
    } else {
        n as u64
    }
}
