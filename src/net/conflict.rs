//! 冲突组划分与消解策略分类。
//!
//! 两个迁移的普通输入库所集合相交即直接冲突；冲突组是该关系的传递闭包。
//! 按迁移顺序逐个处理：与若干已有组相交时并入第一个相交的组，并把其余相交组
//! 一并合入，保证结果是闭包而不依赖处理顺序。
//!
//! | 成员变体            | 组类型       |
//! |---------------------|--------------|
//! | 全部 Normal         | Normal       |
//! | Normal + Priority   | Priority     |
//! | Normal + Timed      | Timed        |
//! | 全部 Stochastic     | Stochastic（要求输入库所集合完全一致） |
use std::collections::BTreeSet;
use std::fmt;

use smallvec::SmallVec;

use crate::net::core::ConstructionError;
use crate::net::ids::{GroupId, PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::{Priority, Transition, TransitionKind};

pub type Members = SmallVec<[TransitionId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupType {
    Normal,
    Priority,
    Stochastic,
    Timed,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GroupType::Normal => "normal",
            GroupType::Priority => "priority",
            GroupType::Stochastic => "stochastic",
            GroupType::Timed => "timed",
        };
        f.write_str(label)
    }
}

/// 每种策略附带的逐成员数据，与 `ConflictGroup::members` 一一对应。
#[derive(Debug, Clone, PartialEq)]
pub enum GroupPolicy {
    Normal,
    Priority(SmallVec<[Priority; 4]>),
    Stochastic(SmallVec<[f64; 4]>),
    /// `true` 表示该成员为定时迁移，`false` 为普通迁移。
    Timed(SmallVec<[bool; 4]>),
}

impl GroupPolicy {
    pub fn group_type(&self) -> GroupType {
        match self {
            GroupPolicy::Normal => GroupType::Normal,
            GroupPolicy::Priority(_) => GroupType::Priority,
            GroupPolicy::Stochastic(_) => GroupType::Stochastic,
            GroupPolicy::Timed(_) => GroupType::Timed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConflictGroup {
    members: Members,
    policy: GroupPolicy,
    pub(crate) waiting: f64,
    pub(crate) committed: Option<TransitionId>,
}

impl ConflictGroup {
    pub fn members(&self) -> &[TransitionId] {
        &self.members
    }

    pub fn policy(&self) -> &GroupPolicy {
        &self.policy
    }

    pub fn group_type(&self) -> GroupType {
        self.policy.group_type()
    }

    /// 剩余等待时间；仅定时组可能为正。
    pub fn waiting(&self) -> f64 {
        self.waiting
    }

    pub fn committed(&self) -> Option<TransitionId> {
        self.committed
    }

    pub(crate) fn reset(&mut self) {
        self.waiting = 0.0;
        self.committed = None;
    }
}

fn ordinary_inputs(transition: &Transition) -> BTreeSet<PlaceId> {
    transition.inputs().iter().map(|arc| arc.place).collect()
}

/// 划分冲突组并确定每组的消解策略。组按首个成员的顺序排列，组内成员按迁移顺序排列。
pub fn build_conflict_groups(
    transitions: &IndexVec<TransitionId, Transition>,
) -> Result<IndexVec<GroupId, ConflictGroup>, ConstructionError> {
    let mut partition: Vec<(Members, BTreeSet<PlaceId>)> = Vec::new();

    for (tid, transition) in transitions.iter_enumerated() {
        let inputs = ordinary_inputs(transition);
        let overlapping = partition
            .iter()
            .enumerate()
            .filter(|(_, (_, group_inputs))| !group_inputs.is_disjoint(&inputs))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();

        match overlapping.split_first() {
            None => partition.push((Members::from_elem(tid, 1), inputs)),
            Some((&first, rest)) => {
                // 从后往前移除，保持前面的下标有效
                for &idx in rest.iter().rev() {
                    let (members, group_inputs) = partition.remove(idx);
                    partition[first].0.extend(members);
                    partition[first].1.extend(group_inputs);
                }
                let (members, group_inputs) = &mut partition[first];
                members.push(tid);
                members.sort_unstable();
                group_inputs.extend(inputs);
            }
        }
    }

    let mut groups = IndexVec::with_capacity(partition.len());
    for (members, _) in partition {
        let policy = classify(transitions, &members)?;
        groups.push(ConflictGroup {
            members,
            policy,
            waiting: 0.0,
            committed: None,
        });
    }
    log::debug!("derived {} conflict groups", groups.len());
    Ok(groups)
}

fn member_names(transitions: &IndexVec<TransitionId, Transition>, members: &[TransitionId]) -> Vec<String> {
    members
        .iter()
        .map(|&tid| transitions[tid].name.clone())
        .collect()
}

fn classify(
    transitions: &IndexVec<TransitionId, Transition>,
    members: &[TransitionId],
) -> Result<GroupPolicy, ConstructionError> {
    let kinds = members
        .iter()
        .map(|&tid| transitions[tid].kind)
        .collect::<Vec<_>>();

    let all = |pred: fn(&TransitionKind) -> bool| kinds.iter().all(pred);

    if all(|k| matches!(k, TransitionKind::Normal)) {
        return Ok(GroupPolicy::Normal);
    }
    if all(|k| matches!(k, TransitionKind::Normal | TransitionKind::Priority(_))) {
        let priorities = members
            .iter()
            .map(|&tid| transitions[tid].priority())
            .collect();
        return Ok(GroupPolicy::Priority(priorities));
    }
    if all(|k| matches!(k, TransitionKind::Normal | TransitionKind::Timed(_))) {
        return Ok(GroupPolicy::Timed(kinds.iter().map(|k| k.is_timed()).collect()));
    }
    if all(|k| matches!(k, TransitionKind::Stochastic(_))) {
        let reference = ordinary_inputs(&transitions[members[0]]);
        if members[1..]
            .iter()
            .any(|&tid| ordinary_inputs(&transitions[tid]) != reference)
        {
            return Err(ConstructionError::InvalidConflictGroup {
                members: member_names(transitions, members),
            });
        }
        let weights: SmallVec<[f64; 4]> = kinds
            .iter()
            .map(|k| match k {
                TransitionKind::Stochastic(weight) => *weight,
                _ => 0.0,
            })
            .collect();
        // 任意可发生子集的权重和都不超过总和，总和有限即可保证抽样不会溢出
        let total = weights.iter().sum::<f64>();
        if !total.is_finite() {
            return Err(ConstructionError::InvalidParameter {
                transition: member_names(transitions, members).join(", "),
                reason: format!("stochastic weights of one group must have a finite sum, got {total}"),
            });
        }
        return Ok(GroupPolicy::Stochastic(weights));
    }

    Err(ConstructionError::UnsupportedConflictGroup {
        members: members
            .iter()
            .map(|&tid| format!("{} ({})", transitions[tid].name, transitions[tid].kind.label()))
            .collect(),
    })
}

/// Maps every transition to the index of its conflict group.
pub fn group_index(
    transitions: usize,
    groups: &IndexVec<GroupId, ConflictGroup>,
) -> IndexVec<TransitionId, GroupId> {
    let mut index = IndexVec::from_elem_n(GroupId::new(0), transitions);
    for (gid, group) in groups.iter_enumerated() {
        for &tid in group.members() {
            index[tid] = gid;
        }
    }
    debug_assert!(groups.iter().map(|g| g.members().len()).sum::<usize>() == transitions);
    index
}
