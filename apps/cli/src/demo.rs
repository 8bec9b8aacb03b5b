//! Allocator demonstration
//!
//! Builds the same factorial table and the same sequence twice, once over the
//! default heap allocator and once over a pool, then prints all four.

use std::io::Write;

use anyhow::{Context, Result, anyhow};
use poolkit_memory::prelude::*;
use tracing::{debug, info};

/// Block capacity of the pools used by the demo
pub const BLOCK: usize = 10;

/// `n!`, or `None` once it no longer fits in `u64`
pub fn factorial(n: u32) -> Option<u64> {
    (1..=u64::from(n)).try_fold(1_u64, u64::checked_mul)
}

fn fill_map<A>(mut map: OrderedMap<u32, u64, A>, count: u32) -> Result<OrderedMap<u32, u64, A>>
where
    A: ElementAllocator<Value = (u32, u64)>,
{
    for key in 0..count {
        let value = factorial(key).ok_or_else(|| anyhow!("{key}! does not fit in u64"))?;
        *map.get_or_insert_default(key)? = value;
    }
    Ok(map)
}

fn fill_sequence<A>(mut values: BoxedVec<u32, A>, count: u32) -> Result<BoxedVec<u32, A>>
where
    A: ElementAllocator<Value = u32>,
{
    for value in 0..count {
        values.push_back(&value)?;
    }
    Ok(values)
}

/// Runs the demo for `count` keys and writes the report to `out`
pub fn run<W: Write>(count: usize, mut out: W) -> Result<()> {
    let count = u32::try_from(count).context("count does not fit in u32")?;
    info!(count, block = BLOCK, "running allocator demo");

    let map1: OrderedMap<u32, u64> = fill_map(OrderedMap::new(), count).context("map1")?;
    let map2: OrderedMap<u32, u64, PoolAllocator<(u32, u64), BLOCK>> =
        fill_map(OrderedMap::new(), count).context("map2")?;
    let container1: BoxedVec<u32> = fill_sequence(BoxedVec::new(), count).context("container1")?;
    let container2: BoxedVec<u32, PoolAllocator<u32, BLOCK>> =
        fill_sequence(BoxedVec::new(), count).context("container2")?;

    debug!(
        map2_entries = map2.len(),
        container2_refills = container2.allocator().refill_count(),
        container2_free_blocks = container2.allocator().free_blocks(),
        "containers filled"
    );

    writeln!(out, "map1:")?;
    map1.write_to(&mut out)?;
    writeln!(out, "map2:")?;
    map2.write_to(&mut out)?;
    write!(out, "container1: ")?;
    container1.write_to(&mut out)?;
    write!(out, "container2: ")?;
    container2.write_to(&mut out)?;
    out.flush()?;
    Ok(())
}
