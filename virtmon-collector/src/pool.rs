//! Storage pool capacity.

use virtmon_hypervisor::{HypervisorError, StoragePoolHandle};

use crate::catalog::{POOL_ALLOCATION, POOL_AVAILABLE, POOL_CAPACITY};
use crate::measurement::Measurement;

/// Refresh one pool and emit its capacity figures.
///
/// Returns the pool name on success so the caller can log it.
pub fn collect_pool(
    pool: &dyn StoragePoolHandle,
    out: &mut Vec<Measurement>,
) -> Result<String, HypervisorError> {
    pool.refresh()?;
    let name = pool.name()?;
    let info = pool.info()?;

    out.push(POOL_CAPACITY.measure([&name], info.capacity as f64));
    out.push(POOL_ALLOCATION.measure([&name], info.allocation as f64));
    out.push(POOL_AVAILABLE.measure([&name], info.available as f64));
    Ok(name)
}
