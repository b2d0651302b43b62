//! 多副本并行仿真：每个种子一个独立网络，互不共享可变状态。
use rayon::prelude::*;

use crate::net::{Net, NetDescriptor, NetError, RunLimit, RunSummary};

#[derive(Debug, Clone)]
pub struct Replica {
    pub seed: u64,
    pub summary: RunSummary,
}

/// 按种子顺序返回结果；任一副本失败即返回该错误。
pub fn run_replicas(
    descriptor: &NetDescriptor,
    seeds: &[u64],
    limit: RunLimit,
) -> Result<Vec<Replica>, NetError> {
    // 先构造一次，把结构性错误在并行之前暴露出来
    Net::with_seed(descriptor, seeds.first().copied().unwrap_or_default())?;

    seeds
        .par_iter()
        .map(|&seed| -> Result<Replica, NetError> {
            let mut net = Net::with_seed(descriptor, seed)?;
            let summary = net.run(limit)?;
            log::debug!(
                "replica seed {seed}: {} steps, time {}, ended {}",
                summary.steps,
                summary.time,
                summary.ended
            );
            Ok(Replica { seed, summary })
        })
        .collect()
}

/// `count` 个连续种子，从 `base` 开始。
pub fn seeds_from(base: u64, count: usize) -> Vec<u64> {
    (0..count as u64).map(|i| base.wrapping_add(i)).collect()
}
