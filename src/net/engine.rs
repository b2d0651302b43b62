//! 单步推进：求值 → 冲突消解 → 发生或推进时钟 → 终止判定。
//!
//! 每个冲突组在一步内至多选出一个迁移，不同组之间相互独立。
//! 定时迁移分两阶段：第一阶段选中并采样延迟（不移动托肯），组进入等待；
//! 当一步内没有任何发生且存在等待组时，时钟前进到最小等待时间，
//! 到期组执行第二阶段，真正移动托肯。
use indexmap::IndexMap;
use rand::distr::Distribution;
use rand::distr::weighted::{Error as WeightError, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::net::conflict::{ConflictGroup, GroupPolicy};
use crate::net::core::{FireError, Net};
use crate::net::ids::TransitionId;
use crate::net::index_vec::IndexVec;

/// 一步的结果。`fired` 含普通发生与定时迁移的第一阶段选中。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    pub fired: Vec<String>,
    pub fired_phase2: Vec<String>,
    pub ended: bool,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimit {
    pub max_steps: u64,
    pub max_time: Option<f64>,
}

impl RunLimit {
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps,
            max_time: None,
        }
    }

    pub fn until(mut self, max_time: f64) -> Self {
        self.max_time = Some(max_time);
        self
    }
}

/// `fire_counts` 统计完成托肯转移的次数：普通发生各计一次，定时迁移在第二阶段计一次。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub time: f64,
    pub ended: bool,
    pub fire_counts: IndexMap<String, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Immediate(TransitionId),
    Commit(TransitionId),
}

fn resolve(
    group: &ConflictGroup,
    enabled: &IndexVec<TransitionId, bool>,
    rng: &mut StdRng,
) -> Result<Option<Selection>, WeightError> {
    let candidates = group
        .members()
        .iter()
        .enumerate()
        .filter(|(_, tid)| enabled[**tid])
        .map(|(pos, _)| pos)
        .collect::<Vec<_>>();
    if candidates.is_empty() {
        return Ok(None);
    }
    let members = group.members();

    let selection = match group.policy() {
        GroupPolicy::Normal => candidates
            .choose(rng)
            .map(|&pos| Selection::Immediate(members[pos])),
        GroupPolicy::Priority(priorities) => {
            let top = candidates.iter().map(|&pos| priorities[pos]).max();
            let best = candidates
                .into_iter()
                .filter(|&pos| Some(priorities[pos]) == top)
                .collect::<Vec<_>>();
            best.choose(rng)
                .map(|&pos| Selection::Immediate(members[pos]))
        }
        GroupPolicy::Stochastic(weights) => {
            // 仅在可发生子集上归一化
            let dist = WeightedIndex::<f64>::new(candidates.iter().map(|&pos| weights[pos]))?;
            Some(Selection::Immediate(members[candidates[dist.sample(rng)]]))
        }
        GroupPolicy::Timed(_) if group.waiting > 0.0 => None,
        GroupPolicy::Timed(is_timed) => {
            let (timed, normal): (Vec<usize>, Vec<usize>) =
                candidates.into_iter().partition(|&pos| is_timed[pos]);
            match normal.choose(rng) {
                Some(&pos) => Some(Selection::Immediate(members[pos])),
                None => timed.choose(rng).map(|&pos| Selection::Commit(members[pos])),
            }
        }
    };
    Ok(selection)
}

impl Net {
    /// 推进一步。已终止的网络上调用不产生任何效果，直到 `reset`。
    pub fn step(&mut self) -> Result<StepResult, FireError> {
        if self.ended {
            return Ok(StepResult {
                ended: true,
                time: self.time,
                ..StepResult::default()
            });
        }

        self.fired.clear();
        self.fired_phase2.clear();

        for (tid, transition) in self.transitions.iter_enumerated() {
            self.enabled[tid] = transition.enabled(&self.places);
        }

        let mut num_fired = 0usize;
        if self.enabled.iter().any(|&e| e) {
            for gid in self.groups.indices() {
                let selection = match resolve(&self.groups[gid], &self.enabled, &mut self.rng) {
                    Ok(Some(selection)) => selection,
                    Ok(None) => continue,
                    Err(err) => {
                        return Err(FireError::InvalidWeights {
                            members: self.groups[gid]
                                .members()
                                .iter()
                                .map(|&t| self.transitions[t].name.clone())
                                .collect(),
                            reason: err.to_string(),
                        });
                    }
                };
                let tid = match selection {
                    Selection::Immediate(tid) | Selection::Commit(tid) => tid,
                };
                if !self.transitions[tid].output_possible(&self.places) {
                    log::warn!(
                        "transition \"{}\" was enabled, but output not possible",
                        self.transitions[tid].name
                    );
                    continue;
                }

                match selection {
                    Selection::Immediate(tid) => {
                        self.fire_selected(tid)?;
                        log::debug!("step {}: fired {}", self.step_num, self.transitions[tid].name);
                    }
                    Selection::Commit(tid) => {
                        let delay = match self.transitions[tid].choose_time(&mut self.rng) {
                            Ok(delay) => delay,
                            Err(reason) => {
                                return Err(FireError::InvalidDelay {
                                    transition: self.transitions[tid].name.clone(),
                                    reason,
                                });
                            }
                        };
                        log::debug!(
                            "step {}: committed {} for {delay}",
                            self.step_num,
                            self.transitions[tid].name
                        );
                        if delay > 0.0 {
                            let group = &mut self.groups[gid];
                            group.waiting = delay;
                            group.committed = Some(tid);
                        } else {
                            self.fire_phase2(tid)?;
                        }
                    }
                }
                self.fired.push(tid);
                num_fired += 1;
            }
        }

        if num_fired == 0 {
            self.advance_clock()?;
        }

        let any_enabled = self.transitions.iter().any(|t| t.enabled(&self.places));
        let any_waiting = self.groups.iter().any(|g| g.waiting > 0.0);
        if !any_enabled && !any_waiting {
            self.ended = true;
            log::info!("net ended at step {} (time {})", self.step_num, self.time);
        }
        self.step_num += 1;

        Ok(StepResult {
            fired: self.fired().into_iter().map(str::to_string).collect(),
            fired_phase2: self.fired_phase2().into_iter().map(str::to_string).collect(),
            ended: self.ended,
            time: self.time,
        })
    }

    /// 到期组按组序执行第二阶段；其余组的等待时间扣减后不低于零。
    fn advance_clock(&mut self) -> Result<(), FireError> {
        let Some(min_wait) = self
            .groups
            .iter()
            .map(|g| g.waiting)
            .filter(|&w| w > 0.0)
            .min_by(f64::total_cmp)
        else {
            return Ok(());
        };

        self.time += min_wait;
        log::debug!("advancing clock by {min_wait} to {}", self.time);

        for gid in self.groups.indices() {
            let group = &mut self.groups[gid];
            if group.waiting <= 0.0 {
                continue;
            }
            if group.waiting <= min_wait {
                group.waiting = 0.0;
                if let Some(tid) = group.committed.take() {
                    self.fire_phase2(tid)?;
                }
            } else {
                group.waiting = (group.waiting - min_wait).max(0.0);
            }
        }
        Ok(())
    }

    fn fire_selected(&mut self, tid: TransitionId) -> Result<(), FireError> {
        let transition = &self.transitions[tid];
        if !transition.inputs_satisfied(&self.places) {
            return Err(FireError::NotEnabled {
                transition: transition.name.clone(),
            });
        }
        transition.transfer(&mut self.places);
        Ok(())
    }

    /// 第二阶段：移动已选中定时迁移的托肯并退出等待状态。
    pub fn fire_phase2(&mut self, tid: TransitionId) -> Result<(), FireError> {
        let transition = self
            .transitions
            .get(tid)
            .ok_or(FireError::OutOfBounds(tid))?;
        if !transition.is_waiting()
            || !transition.inputs_satisfied(&self.places)
            || !transition.output_possible(&self.places)
        {
            return Err(FireError::PhaseTwoViolation {
                transition: transition.name.clone(),
            });
        }
        transition.transfer(&mut self.places);
        self.transitions[tid].finish_waiting();
        self.fired_phase2.push(tid);
        log::debug!("phase 2 fired {} at {}", self.transitions[tid].name, self.time);
        Ok(())
    }

    pub fn run(&mut self, limit: RunLimit) -> Result<RunSummary, FireError> {
        self.run_with(limit, |_, _| {})
    }

    /// 连续推进直到终止或触及限制；每步之后调用 `observe`。
    pub fn run_with<F>(&mut self, limit: RunLimit, mut observe: F) -> Result<RunSummary, FireError>
    where
        F: FnMut(&Net, &StepResult),
    {
        let mut fire_counts: IndexMap<String, u64> = self
            .transitions
            .iter()
            .map(|t| (t.name.clone(), 0))
            .collect();
        let mut steps = 0;

        while steps < limit.max_steps && !self.ended {
            if limit.max_time.is_some_and(|max| self.time >= max) {
                break;
            }
            let result = self.step()?;
            steps += 1;

            let completed = self
                .fired
                .iter()
                .filter(|&&t| !self.transitions[t].kind.is_timed())
                .chain(self.fired_phase2.iter());
            for &tid in completed {
                if let Some(count) = fire_counts.get_mut(&self.transitions[tid].name) {
                    *count += 1;
                }
            }
            observe(self, &result);
        }

        Ok(RunSummary {
            steps,
            time: self.time,
            ended: self.ended,
            fire_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::ConstructionError;
    use crate::net::descriptor::{ArcDesc, NetDescriptor, PlaceDesc, TransitionDesc};
    use crate::net::structure::Delay;

    fn single_firing() -> NetDescriptor {
        NetDescriptor::new(
            vec![PlaceDesc::new("A").tokens(1), PlaceDesc::new("B")],
            vec![TransitionDesc::normal("T1")],
            vec![ArcDesc::new("A", "T1"), ArcDesc::new("T1", "B")],
        )
    }

    fn timed(delay: f64) -> NetDescriptor {
        NetDescriptor::new(
            vec![PlaceDesc::new("A").tokens(1), PlaceDesc::new("B")],
            vec![TransitionDesc::timed("T2", Delay::Constant(delay))],
            vec![ArcDesc::new("A", "T2"), ArcDesc::new("T2", "B")],
        )
    }

    /// 一个输入库所，三个竞争迁移，各自输出到自己的库所。
    fn fan_out(transitions: Vec<TransitionDesc>, tokens: u64) -> NetDescriptor {
        let mut places = vec![PlaceDesc::new("src").tokens(tokens)];
        let mut arcs = Vec::new();
        for t in &transitions {
            let sink = format!("out_{}", t.name);
            places.push(PlaceDesc::new(sink.clone()));
            arcs.push(ArcDesc::new("src", t.name.clone()));
            arcs.push(ArcDesc::new(t.name.clone(), sink));
        }
        NetDescriptor::new(places, transitions, arcs)
    }

    #[test]
    fn single_firing_moves_token_and_ends() {
        let mut net = Net::with_seed(&single_firing(), 3).unwrap();
        let result = net.step().unwrap();
        assert_eq!(net.tokens("A"), Some(0));
        assert_eq!(net.tokens("B"), Some(1));
        assert_eq!(result.fired, vec!["T1".to_string()]);
        assert!(result.ended);
        assert!(net.ended());
        assert_eq!(net.step_num(), 1);
    }

    #[test]
    fn ended_net_step_is_noop_until_reset() {
        let mut net = Net::with_seed(&single_firing(), 3).unwrap();
        net.step().unwrap();
        let again = net.step().unwrap();
        assert!(again.ended);
        assert!(again.fired.is_empty());
        assert_eq!(net.step_num(), 1);
        assert_eq!(net.tokens("B"), Some(1));

        net.reset();
        assert!(!net.ended());
        assert_eq!(net.tokens("A"), Some(1));
        assert_eq!(net.step_num(), 0);
        assert!(net.fired().is_empty());
    }

    #[test]
    fn timed_transition_fires_in_two_phases() {
        let mut net = Net::with_seed(&timed(5.0), 0).unwrap();
        let g = net.group_of(net.transition_id("T2").unwrap());

        let first = net.step().unwrap();
        assert!(first.fired_phase2.is_empty());
        assert_eq!(net.time(), 0.0);
        assert_eq!(net.conflict_groups()[g].waiting(), 5.0);
        assert_eq!(net.tokens("A"), Some(1));
        assert!(!first.ended);

        let second = net.step().unwrap();
        assert_eq!(net.time(), 5.0);
        assert_eq!(second.fired_phase2, vec!["T2".to_string()]);
        assert_eq!(net.tokens("A"), Some(0));
        assert_eq!(net.tokens("B"), Some(1));
        assert_eq!(net.conflict_groups()[g].waiting(), 0.0);
        assert!(second.ended);
    }

    #[test]
    fn zero_delay_completes_in_same_step() {
        let mut net = Net::with_seed(&timed(0.0), 0).unwrap();
        let result = net.step().unwrap();
        assert_eq!(result.fired_phase2, vec!["T2".to_string()]);
        assert_eq!(net.tokens("B"), Some(1));
        assert_eq!(net.time(), 0.0);
        assert!(result.ended);
    }

    #[test]
    fn normal_member_preempts_timed_member() {
        let desc = fan_out(
            vec![
                TransitionDesc::timed("slow", Delay::Constant(2.0)),
                TransitionDesc::normal("fast"),
            ],
            3,
        );
        let mut net = Net::with_seed(&desc, 11).unwrap();
        for _ in 0..3 {
            assert_eq!(net.step().unwrap().fired, vec!["fast".to_string()]);
        }
        assert_eq!(net.tokens("out_fast"), Some(3));
        assert_eq!(net.tokens("out_slow"), Some(0));
        assert!(net.ended());
    }

    #[test]
    fn simultaneous_deadlines_fire_in_group_order() {
        let desc = NetDescriptor::new(
            vec![
                PlaceDesc::new("a").tokens(1),
                PlaceDesc::new("b").tokens(1),
                PlaceDesc::new("done"),
            ],
            vec![
                TransitionDesc::timed("ta", Delay::Constant(1.5)),
                TransitionDesc::timed("tb", Delay::Constant(1.5)),
            ],
            vec![
                ArcDesc::new("a", "ta"),
                ArcDesc::new("b", "tb"),
                ArcDesc::new("ta", "done"),
                ArcDesc::new("tb", "done"),
            ],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        assert_eq!(net.step().unwrap().fired.len(), 2);
        let second = net.step().unwrap();
        assert_eq!(second.fired_phase2, vec!["ta".to_string(), "tb".to_string()]);
        assert_eq!(net.time(), 1.5);
        assert_eq!(net.tokens("done"), Some(2));
    }

    #[test]
    fn clock_advances_by_minimum_and_keeps_remainder() {
        let desc = NetDescriptor::new(
            vec![PlaceDesc::new("a").tokens(1), PlaceDesc::new("b").tokens(1)],
            vec![
                TransitionDesc::timed("short", Delay::Constant(1.0)),
                TransitionDesc::timed("long", Delay::Constant(4.0)),
            ],
            vec![ArcDesc::new("a", "short"), ArcDesc::new("b", "long")],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        net.step().unwrap();
        let second = net.step().unwrap();
        assert_eq!(second.fired_phase2, vec!["short".to_string()]);
        assert_eq!(net.time(), 1.0);
        let long = net.group_of(net.transition_id("long").unwrap());
        assert_eq!(net.conflict_groups()[long].waiting(), 3.0);

        let third = net.step().unwrap();
        assert_eq!(third.fired_phase2, vec!["long".to_string()]);
        assert_eq!(net.time(), 4.0);
        assert!(third.ended);
    }

    #[test]
    fn one_firing_per_group_per_step() {
        let desc = fan_out(
            vec![
                TransitionDesc::normal("x"),
                TransitionDesc::normal("y"),
                TransitionDesc::normal("z"),
            ],
            10,
        );
        let mut net = Net::with_seed(&desc, 5).unwrap();
        for _ in 0..10 {
            assert_eq!(net.step().unwrap().fired.len(), 1);
        }
        let total: u64 = ["x", "y", "z"]
            .iter()
            .map(|t| net.tokens(&format!("out_{t}")).unwrap())
            .sum();
        assert_eq!(total, 10);
        assert!(net.ended());
    }

    #[test]
    fn independent_groups_fire_in_same_step() {
        let desc = NetDescriptor::new(
            vec![PlaceDesc::new("a").tokens(1), PlaceDesc::new("b").tokens(1)],
            vec![TransitionDesc::normal("ta"), TransitionDesc::normal("tb")],
            vec![ArcDesc::new("a", "ta"), ArcDesc::new("b", "tb")],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        let result = net.step().unwrap();
        assert_eq!(result.fired, vec!["ta".to_string(), "tb".to_string()]);
    }

    #[test]
    fn priority_picks_only_highest_enabled() {
        let desc = fan_out(
            vec![
                TransitionDesc::priority("low", 1),
                TransitionDesc::priority("high_a", 5),
                TransitionDesc::priority("high_b", 5),
                TransitionDesc::normal("plain"),
            ],
            200,
        );
        let mut net = Net::with_seed(&desc, 9).unwrap();
        net.run(RunLimit::steps(200)).unwrap();
        assert_eq!(net.tokens("out_low"), Some(0));
        assert_eq!(net.tokens("out_plain"), Some(0));
        let a = net.tokens("out_high_a").unwrap();
        let b = net.tokens("out_high_b").unwrap();
        assert_eq!(a + b, 200);
        assert!(a > 0 && b > 0);
    }

    #[test]
    fn priority_falls_back_when_top_is_disabled() {
        let mut desc = fan_out(
            vec![TransitionDesc::priority("high", 5), TransitionDesc::normal("plain")],
            1,
        );
        desc.places.push(PlaceDesc::new("gate").tokens(1));
        desc.arcs.push(ArcDesc::inhibitor("gate", "high"));
        let mut net = Net::with_seed(&desc, 0).unwrap();
        assert_eq!(net.step().unwrap().fired, vec!["plain".to_string()]);
    }

    #[test]
    fn stochastic_frequencies_follow_weights() {
        let desc = fan_out(
            vec![
                TransitionDesc::stochastic("a", 2.0),
                TransitionDesc::stochastic("b", 2.0),
                TransitionDesc::stochastic("c", 4.0),
            ],
            20_000,
        );
        let mut net = Net::with_seed(&desc, 2024).unwrap();
        let summary = net.run(RunLimit::steps(20_000)).unwrap();
        let freq = |name: &str| summary.fire_counts[name] as f64 / 20_000.0;
        assert!((freq("a") - 0.25).abs() < 0.02);
        assert!((freq("b") - 0.25).abs() < 0.02);
        assert!((freq("c") - 0.5).abs() < 0.02);
    }

    #[test]
    fn stochastic_normalizes_over_enabled_subset() {
        let mut desc = fan_out(
            vec![
                TransitionDesc::stochastic("a", 1.0),
                TransitionDesc::stochastic("b", 9.0),
            ],
            50,
        );
        desc.places.push(PlaceDesc::new("block").tokens(1));
        desc.arcs.push(ArcDesc::inhibitor("block", "b"));
        let mut net = Net::with_seed(&desc, 1).unwrap();
        let summary = net.run(RunLimit::steps(50)).unwrap();
        assert_eq!(summary.fire_counts["a"], 50);
        assert_eq!(summary.fire_counts["b"], 0);
    }

    #[test]
    fn stochastic_weights_overflowing_sum_fail_construction() {
        let desc = fan_out(
            vec![
                TransitionDesc::stochastic("a", 1e308),
                TransitionDesc::stochastic("b", 1e308),
            ],
            3,
        );
        assert!(matches!(
            Net::with_seed(&desc, 0),
            Err(ConstructionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn large_finite_stochastic_weights_still_sample() {
        let desc = fan_out(
            vec![
                TransitionDesc::stochastic("a", 8e307),
                TransitionDesc::stochastic("b", 8e307),
            ],
            3,
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        let summary = net.run(RunLimit::steps(10)).unwrap();
        assert!(summary.ended);
        assert_eq!(summary.fire_counts["a"] + summary.fire_counts["b"], 3);
    }

    #[test]
    fn blocked_output_warns_and_keeps_candidate() {
        let desc = NetDescriptor::new(
            vec![PlaceDesc::new("A").tokens(1), PlaceDesc::new("B").tokens(1).capacity(1)],
            vec![TransitionDesc::normal("T1")],
            vec![ArcDesc::new("A", "T1"), ArcDesc::new("T1", "B")],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        for _ in 0..5 {
            let result = net.step().unwrap();
            assert!(result.fired.is_empty());
            assert!(!result.ended);
        }
        assert_eq!(net.tokens("A"), Some(1));
        assert_eq!(net.tokens("B"), Some(1));
        assert_eq!(net.step_num(), 5);
    }

    #[test]
    fn phase_two_with_blocked_output_is_fatal() {
        let desc = NetDescriptor::new(
            vec![
                PlaceDesc::new("a").tokens(1),
                PlaceDesc::new("b").tokens(1),
                PlaceDesc::new("out").capacity(1),
            ],
            vec![
                TransitionDesc::timed("slow", Delay::Constant(3.0)),
                TransitionDesc::timed("quick", Delay::Constant(1.0)),
            ],
            vec![
                ArcDesc::new("a", "slow"),
                ArcDesc::new("slow", "out"),
                ArcDesc::new("b", "quick"),
                ArcDesc::new("quick", "out"),
            ],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        net.step().unwrap();
        net.step().unwrap();
        assert_eq!(net.tokens("out"), Some(1));
        assert!(matches!(
            net.step(),
            Err(FireError::PhaseTwoViolation { .. })
        ));
    }

    #[test]
    fn tokens_stay_within_bounds() {
        let desc = NetDescriptor::new(
            vec![
                PlaceDesc::new("queue").tokens(5).capacity(5),
                PlaceDesc::new("servers").tokens(2),
                PlaceDesc::new("busy").capacity(2),
            ],
            vec![
                TransitionDesc::normal("arrive"),
                TransitionDesc::normal("start"),
                TransitionDesc::timed("finish", Delay::Exponential { rate: 1.5 }),
            ],
            vec![
                ArcDesc::new("arrive", "queue"),
                ArcDesc::new("queue", "start"),
                ArcDesc::new("servers", "start"),
                ArcDesc::new("start", "busy"),
                ArcDesc::new("busy", "finish"),
                ArcDesc::new("finish", "servers"),
            ],
        );
        let mut net = Net::with_seed(&desc, 77).unwrap();
        for _ in 0..500 {
            net.step().unwrap();
            for place in net.places().iter() {
                if let Some(capacity) = place.capacity {
                    assert!(place.tokens <= capacity);
                }
            }
            let servers = net.tokens("servers").unwrap();
            let busy = net.tokens("busy").unwrap();
            assert!(servers + busy <= 2);
        }
        assert!(!net.ended());
    }

    #[test]
    fn same_seed_replays_identically() {
        let desc = fan_out(
            vec![
                TransitionDesc::normal("x"),
                TransitionDesc::normal("y"),
                TransitionDesc::normal("z"),
            ],
            100,
        );
        let trace = |net: &mut Net| {
            (0..60)
                .map(|_| net.step().unwrap().fired)
                .collect::<Vec<_>>()
        };
        let mut first = Net::with_seed(&desc, 42).unwrap();
        let mut second = Net::with_seed(&desc, 42).unwrap();
        let a = trace(&mut first);
        assert_eq!(a, trace(&mut second));
        assert_eq!(first.place_states(), second.place_states());

        first.reset();
        assert_eq!(a, trace(&mut first));
    }

    #[test]
    fn reset_clears_pending_timed_commitment() {
        let mut net = Net::with_seed(&timed(5.0), 9).unwrap();
        let t2 = net.transition_id("T2").unwrap();
        let g = net.group_of(t2);

        let first = net.step().unwrap();
        assert_eq!(first.fired, vec!["T2".to_string()]);
        assert!(net.transitions()[t2].is_waiting());
        assert_eq!(net.conflict_groups()[g].waiting(), 5.0);
        assert_eq!(net.conflict_groups()[g].committed(), Some(t2));

        net.reset();
        assert!(!net.transitions()[t2].is_waiting());
        assert_eq!(net.conflict_groups()[g].waiting(), 0.0);
        assert_eq!(net.conflict_groups()[g].committed(), None);
        assert!(net.is_enabled(t2));
        assert_eq!(net.time(), 0.0);
        assert_eq!(net.tokens("A"), Some(1));

        // 复位后完整重走两阶段
        assert_eq!(net.step().unwrap(), first);
        let second = net.step().unwrap();
        assert_eq!(second.fired_phase2, vec!["T2".to_string()]);
        assert_eq!(net.time(), 5.0);
        assert_eq!(net.tokens("B"), Some(1));
        assert!(second.ended);
    }

    #[test]
    fn run_respects_time_limit() {
        let desc = NetDescriptor::new(
            vec![PlaceDesc::new("tick").tokens(1)],
            vec![TransitionDesc::timed("clock", Delay::Constant(1.0))],
            vec![ArcDesc::new("tick", "clock"), ArcDesc::new("clock", "tick")],
        );
        let mut net = Net::with_seed(&desc, 0).unwrap();
        let mut observed = 0;
        let summary = net
            .run_with(RunLimit::steps(1_000).until(3.0), |_, _| observed += 1)
            .unwrap();
        assert_eq!(summary.time, 3.0);
        assert_eq!(summary.fire_counts["clock"], 3);
        assert_eq!(summary.steps, observed);
        assert!(!summary.ended);
    }

    #[test]
    fn transition_states_report_just_fired() {
        let mut net = Net::with_seed(&single_firing(), 0).unwrap();
        assert!(net.transition_states()[0].enabled);
        net.step().unwrap();
        let states = net.transition_states();
        assert!(states[0].just_fired);
        assert!(!states[0].enabled);
    }
}
