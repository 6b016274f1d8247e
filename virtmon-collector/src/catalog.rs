//! Metric catalog.
//!
//! Every metric the collector can emit, with its fixed label schema.

use crate::measurement::Metric;

const DOMAIN: [&str; 1] = ["domain"];
const DOMAIN_VCPU: [&str; 2] = ["domain", "vcpu"];
const DOMAIN_DEVICE: [&str; 2] = ["domain", "target_device"];
const POOL: [&str; 1] = ["pool"];

// =============================================================================
// SCRAPE HEALTH AND VERSIONS
// =============================================================================

pub static UP: Metric<0> = Metric::gauge(
    "libvirt_up",
    "Whether scraping libvirt's metrics was successful.",
    [],
);

pub static VERSIONS_INFO: Metric<3> = Metric::gauge(
    "libvirt_versions_info",
    "Versions of virtualization components",
    ["hypervisor_running", "libvirtd_running", "libvirt_library"],
);

// =============================================================================
// STORAGE POOLS
// =============================================================================

pub static POOL_CAPACITY: Metric<1> =
    Metric::gauge("libvirt_pool_info_capacity_bytes", "Pool capacity, in bytes", POOL);

pub static POOL_ALLOCATION: Metric<1> =
    Metric::gauge("libvirt_pool_info_allocation_bytes", "Pool allocation, in bytes", POOL);

pub static POOL_AVAILABLE: Metric<1> =
    Metric::gauge("libvirt_pool_info_available_bytes", "Pool available, in bytes", POOL);

// =============================================================================
// DOMAIN INFO
// =============================================================================

pub static DOMAIN_META: Metric<10> = Metric::gauge(
    "libvirt_domain_info_meta",
    "Domain metadata",
    [
        "domain",
        "uuid",
        "instance_name",
        "flavor",
        "user_name",
        "user_uuid",
        "project_name",
        "project_uuid",
        "root_type",
        "root_uuid",
    ],
);

pub static DOMAIN_MAX_MEMORY: Metric<1> = Metric::gauge(
    "libvirt_domain_info_maximum_memory_bytes",
    "Maximum allowed memory of the domain, in bytes.",
    DOMAIN,
);

pub static DOMAIN_MEMORY_USAGE: Metric<1> = Metric::gauge(
    "libvirt_domain_info_memory_usage_bytes",
    "Memory usage of the domain, in bytes.",
    DOMAIN,
);

pub static DOMAIN_VIRTUAL_CPUS: Metric<1> = Metric::gauge(
    "libvirt_domain_info_virtual_cpus",
    "Number of virtual CPUs for the domain.",
    DOMAIN,
);

pub static DOMAIN_CPU_TIME: Metric<1> = Metric::counter(
    "libvirt_domain_info_cpu_time_seconds_total",
    "Amount of CPU time used by the domain, in seconds.",
    DOMAIN,
);

pub static DOMAIN_STATE: Metric<1> = Metric::gauge(
    "libvirt_domain_info_vstate",
    "Virtual domain state. 0: no state, 1: the domain is running, 2: the domain is blocked on resource, \
     3: the domain is paused by user, 4: the domain is being shut down, 5: the domain is shut off, \
     6: the domain is crashed, 7: the domain is suspended by guest power management",
    DOMAIN,
);

// =============================================================================
// VCPU
// =============================================================================

pub static VCPU_STATE: Metric<2> = Metric::gauge(
    "libvirt_domain_vcpu_state",
    "VCPU state. 0: offline, 1: running, 2: blocked",
    DOMAIN_VCPU,
);

pub static VCPU_TIME: Metric<2> = Metric::counter(
    "libvirt_domain_vcpu_time_seconds_total",
    "Amount of CPU time used by the domain's VCPU, in seconds.",
    DOMAIN_VCPU,
);

pub static VCPU_CPU: Metric<2> = Metric::gauge(
    "libvirt_domain_vcpu_cpu",
    "Real CPU number, or one of the values from virVcpuHostCpuState",
    DOMAIN_VCPU,
);

pub static VCPU_WAIT: Metric<2> = Metric::counter(
    "libvirt_domain_vcpu_wait_seconds_total",
    "Vcpu's wait_sum metric. CONFIG_SCHEDSTATS has to be enabled",
    DOMAIN_VCPU,
);

pub static VCPU_DELAY: Metric<2> = Metric::counter(
    "libvirt_domain_vcpu_delay_seconds_total",
    "Time the vcpu thread was enqueued by the host scheduler but was waiting in the queue \
     instead of running, in seconds. Exposed to the VM as steal time.",
    DOMAIN_VCPU,
);

// =============================================================================
// BLOCK DEVICES
// =============================================================================

pub static BLOCK_META: Metric<9> = Metric::gauge(
    "libvirt_domain_block_meta",
    "Block device metadata info. Device name, source file, serial.",
    [
        "domain",
        "target_device",
        "source_file",
        "serial",
        "bus",
        "disk_type",
        "driver_type",
        "cache",
        "discard",
    ],
);

pub static BLOCK_READ_BYTES: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_read_bytes_total",
    "Number of bytes read from a block device, in bytes.",
    DOMAIN_DEVICE,
);

pub static BLOCK_READ_REQUESTS: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_read_requests_total",
    "Number of read requests from a block device.",
    DOMAIN_DEVICE,
);

pub static BLOCK_READ_TIME: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_read_time_seconds_total",
    "Total time spent on reads from a block device, in seconds.",
    DOMAIN_DEVICE,
);

pub static BLOCK_WRITE_BYTES: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_write_bytes_total",
    "Number of bytes written to a block device, in bytes.",
    DOMAIN_DEVICE,
);

pub static BLOCK_WRITE_REQUESTS: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_write_requests_total",
    "Number of write requests to a block device.",
    DOMAIN_DEVICE,
);

pub static BLOCK_WRITE_TIME: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_write_time_seconds_total",
    "Total time spent on writes on a block device, in seconds",
    DOMAIN_DEVICE,
);

pub static BLOCK_FLUSH_REQUESTS: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_flush_requests_total",
    "Total flush requests from a block device.",
    DOMAIN_DEVICE,
);

pub static BLOCK_FLUSH_TIME: Metric<2> = Metric::counter(
    "libvirt_domain_block_stats_flush_time_seconds_total",
    "Total time in seconds spent on cache flushing to a block device",
    DOMAIN_DEVICE,
);

pub static BLOCK_ALLOCATION: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_allocation",
    "Offset of the highest written sector on a block device.",
    DOMAIN_DEVICE,
);

pub static BLOCK_CAPACITY: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_capacity_bytes",
    "Logical size in bytes of the block device backing image.",
    DOMAIN_DEVICE,
);

pub static BLOCK_PHYSICAL_SIZE: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_physicalsize_bytes",
    "Physical size in bytes of the container of the backing image.",
    DOMAIN_DEVICE,
);

// =============================================================================
// BLOCK THROTTLING
// =============================================================================

pub static LIMIT_TOTAL_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_total_bytes",
    "Total throughput limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_READ_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_read_bytes",
    "Read throughput limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_WRITE_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_write_bytes",
    "Write throughput limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_TOTAL_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_total_requests",
    "Total requests per second limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_READ_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_read_requests",
    "Read requests per second limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_WRITE_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_write_requests",
    "Write requests per second limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_TOTAL_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_total_bytes",
    "Total throughput burst limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_READ_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_read_bytes",
    "Read throughput burst limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_WRITE_BYTES: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_write_bytes",
    "Write throughput burst limit in bytes per second",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_TOTAL_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_total_requests",
    "Total requests per second burst limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_READ_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_read_requests",
    "Read requests per second burst limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_WRITE_REQUESTS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_write_requests",
    "Write requests per second burst limit",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_TOTAL_BYTES_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_total_bytes_length_seconds",
    "Total throughput burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_READ_BYTES_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_read_bytes_length_seconds",
    "Read throughput burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_WRITE_BYTES_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_write_bytes_length_seconds",
    "Write throughput burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_TOTAL_REQUESTS_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_length_total_requests_seconds",
    "Total requests per second burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_READ_REQUESTS_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_length_read_requests_seconds",
    "Read requests per second burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_BURST_WRITE_REQUESTS_LENGTH: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_limit_burst_length_write_requests_seconds",
    "Write requests per second burst time in seconds",
    DOMAIN_DEVICE,
);

pub static LIMIT_SIZE_IOPS: Metric<2> = Metric::gauge(
    "libvirt_domain_block_stats_size_iops_bytes",
    "The size of IO operations per second permitted through a block device",
    DOMAIN_DEVICE,
);

// =============================================================================
// NETWORK INTERFACES
// =============================================================================

pub static INTERFACE_META: Metric<4> = Metric::gauge(
    "libvirt_domain_interface_meta",
    "Interfaces metadata. Source bridge, target device, interface uuid",
    ["domain", "source_bridge", "target_device", "virtual_interface"],
);

pub static INTERFACE_RX_BYTES: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_receive_bytes_total",
    "Number of bytes received on a network interface, in bytes.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_RX_PACKETS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_receive_packets_total",
    "Number of packets received on a network interface.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_RX_ERRORS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_receive_errors_total",
    "Number of packet receive errors on a network interface.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_RX_DROPS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_receive_drops_total",
    "Number of packet receive drops on a network interface.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_TX_BYTES: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_transmit_bytes_total",
    "Number of bytes transmitted on a network interface, in bytes.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_TX_PACKETS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_transmit_packets_total",
    "Number of packets transmitted on a network interface.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_TX_ERRORS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_transmit_errors_total",
    "Number of packet transmit errors on a network interface.",
    DOMAIN_DEVICE,
);

pub static INTERFACE_TX_DROPS: Metric<2> = Metric::counter(
    "libvirt_domain_interface_stats_transmit_drops_total",
    "Number of packet transmit drops on a network interface.",
    DOMAIN_DEVICE,
);

// =============================================================================
// MEMORY
// =============================================================================

pub static MEMORY_MAJOR_FAULT: Metric<1> = Metric::counter(
    "libvirt_domain_memory_stats_major_fault_total",
    "Page faults that required disk IO to service.",
    DOMAIN,
);

pub static MEMORY_MINOR_FAULT: Metric<1> = Metric::counter(
    "libvirt_domain_memory_stats_minor_fault_total",
    "Page faults serviced without disk IO.",
    DOMAIN,
);

pub static MEMORY_UNUSED: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_unused_bytes",
    "The amount of memory left completely unused by the system, in bytes. \
     Memory used for reclaimable caches is not counted as free.",
    DOMAIN,
);

pub static MEMORY_AVAILABLE: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_available_bytes",
    "The total amount of usable memory as seen by the domain, in bytes. This value may be less \
     than the assigned memory if a balloon driver is in use or if the guest OS does not \
     initialize all assigned pages.",
    DOMAIN,
);

pub static MEMORY_ACTUAL_BALLOON: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_actual_balloon_bytes",
    "Current balloon value (in bytes).",
    DOMAIN,
);

pub static MEMORY_RSS: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_rss_bytes",
    "Resident Set Size of the process running the domain. This value is in bytes",
    DOMAIN,
);

pub static MEMORY_USABLE: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_usable_bytes",
    "How much the balloon can be inflated without pushing the guest system to swap, \
     corresponds to 'Available' in /proc/meminfo",
    DOMAIN,
);

pub static MEMORY_DISK_CACHE: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_disk_cache_bytes",
    "The amount of memory that can be quickly reclaimed without additional I/O (in bytes). \
     Typically these pages are used for caching files from disk.",
    DOMAIN,
);

pub static MEMORY_USED_PERCENT: Metric<1> = Metric::gauge(
    "libvirt_domain_memory_stats_used_percent",
    "The amount of memory in percent, that used by domain.",
    DOMAIN,
);

// =============================================================================
// HOST
// =============================================================================

pub static NODE_INFO: Metric<2> = Metric::gauge(
    "node_info",
    "Meta information about the node",
    ["hostname", "kernel_version"],
);

pub static NODE_UPTIME: Metric<0> =
    Metric::gauge("node_uptime_seconds", "Uptime of the node in seconds", []);

pub static NODE_CPU_USAGE: Metric<1> = Metric::counter(
    "node_resources_cpu_usage_seconds_total",
    "The amount of CPU time spent in each mode",
    ["mode"],
);

pub static NODE_CPU_LOGICAL_CORES: Metric<0> = Metric::gauge(
    "node_resources_cpu_logical_cores",
    "The number of logical CPU cores",
    [],
);

pub static NODE_MEMORY_TOTAL: Metric<0> = Metric::gauge(
    "node_resources_memory_total_bytes",
    "The total amount of physical memory",
    [],
);

pub static NODE_MEMORY_FREE: Metric<0> = Metric::gauge(
    "node_resources_memory_free_bytes",
    "The amount of unassigned memory",
    [],
);

pub static NODE_MEMORY_AVAILABLE: Metric<0> = Metric::gauge(
    "node_resources_memory_available_bytes",
    "The total amount of available memory",
    [],
);

pub static NODE_MEMORY_CACHED: Metric<0> = Metric::gauge(
    "node_resources_memory_cached_bytes",
    "The amount of memory used as page cache",
    [],
);

pub static NODE_DISK_READS: Metric<1> = Metric::counter(
    "node_resources_disk_reads_total",
    "The total number of reads completed successfully",
    ["device"],
);

pub static NODE_DISK_WRITES: Metric<1> = Metric::counter(
    "node_resources_disk_writes_total",
    "The total number of writes completed successfully",
    ["device"],
);

pub static NODE_DISK_READ_BYTES: Metric<1> = Metric::counter(
    "node_resources_disk_read_bytes_total",
    "The total number of bytes read from the disk",
    ["device"],
);

pub static NODE_DISK_WRITTEN_BYTES: Metric<1> = Metric::counter(
    "node_resources_disk_written_bytes_total",
    "The total number of bytes written to the disk",
    ["device"],
);

pub static NODE_DISK_READ_TIME: Metric<1> = Metric::counter(
    "node_resources_disk_read_time_seconds_total",
    "The total number of seconds spent reading",
    ["device"],
);

pub static NODE_DISK_WRITE_TIME: Metric<1> = Metric::counter(
    "node_resources_disk_write_time_seconds_total",
    "The total number of seconds spent writing",
    ["device"],
);

pub static NODE_DISK_IO_TIME: Metric<1> = Metric::counter(
    "node_resources_disk_io_time_seconds_total",
    "The total number of seconds the disk spent doing I/O",
    ["device"],
);

pub static NODE_NET_RX_BYTES: Metric<1> = Metric::counter(
    "node_net_received_bytes_total",
    "The total number of bytes received",
    ["interface"],
);

pub static NODE_NET_TX_BYTES: Metric<1> = Metric::counter(
    "node_net_transmitted_bytes_total",
    "The total number of bytes transmitted",
    ["interface"],
);

pub static NODE_NET_RX_PACKETS: Metric<1> = Metric::counter(
    "node_net_received_packets_total",
    "The total number of packets received",
    ["interface"],
);

pub static NODE_NET_TX_PACKETS: Metric<1> = Metric::counter(
    "node_net_transmitted_packets_total",
    "The total number of packets transmitted",
    ["interface"],
);

pub static NODE_NET_INTERFACE_UP: Metric<1> = Metric::gauge(
    "node_net_interface_up",
    "Status of the interface (0:down, 1:up)",
    ["interface"],
);

pub static NODE_NET_INTERFACE_IP: Metric<2> = Metric::gauge(
    "node_net_interface_ip",
    "IP address assigned to the interface",
    ["interface", "ip"],
);
