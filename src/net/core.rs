//! 网络聚合：由构造描述建立库所/迁移/弧，解析名字，冻结迁移并划分冲突组。
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::net::conflict::{ConflictGroup, build_conflict_groups, group_index};
use crate::net::descriptor::{ArcDesc, NetDescriptor, PlaceDesc, TransitionDesc};
use crate::net::ids::{ArcId, GroupId, NodeRef, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{
    Arc, ArcDirection, ArcKind, Connection, Connections, Place, Transition, TransitionKind, Weight,
};

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("name reused: {name} (already a {existing})")]
    DuplicateName { name: String, existing: &'static str },
    #[error("arc {arc} refers to unknown node {name}")]
    UnresolvedReference { arc: String, name: String },
    #[error("arc {arc} is invalid: {reason}")]
    InvalidArc { arc: String, reason: String },
    #[error("place {place} starts with {tokens} tokens, above its capacity {capacity}")]
    InvalidPlace {
        place: String,
        tokens: Weight,
        capacity: Weight,
    },
    #[error("transition {transition} has invalid parameters: {reason}")]
    InvalidParameter { transition: String, reason: String },
    #[error("unsupported combination of transitions in one conflict group: {}", .members.join(", "))]
    UnsupportedConflictGroup { members: Vec<String> },
    #[error("all members of stochastic group must share the same inputs: {}", .members.join(", "))]
    InvalidConflictGroup { members: Vec<String> },
}

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {transition} is not enabled")]
    NotEnabled { transition: String },
    #[error("transition {transition} cannot place its output tokens")]
    OutputBlocked { transition: String },
    #[error("timed transition {transition} was committed, but phase 2 is no longer possible")]
    PhaseTwoViolation { transition: String },
    #[error("timed transition {transition} cannot sample its delay: {reason}")]
    InvalidDelay { transition: String, reason: String },
    #[error("stochastic group {} cannot be sampled: {reason}", .members.join(", "))]
    InvalidWeights { members: Vec<String>, reason: String },
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Fire(#[from] FireError),
}

/// 库所的只读快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceState {
    pub name: String,
    pub tokens: Weight,
    pub capacity: Option<Weight>,
}

/// 迁移的只读快照。`enabled` 针对当前标识计算。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionState {
    pub name: String,
    pub enabled: bool,
    pub just_fired: bool,
}

#[derive(Clone)]
pub struct Net {
    pub(crate) places: IndexVec<PlaceId, Place>,
    pub(crate) transitions: IndexVec<TransitionId, Transition>,
    pub(crate) arcs: IndexVec<ArcId, Arc>,
    pub(crate) names: IndexMap<String, NodeRef>,
    pub(crate) groups: IndexVec<GroupId, ConflictGroup>,
    pub(crate) group_of: IndexVec<TransitionId, GroupId>,
    pub(crate) enabled: IndexVec<TransitionId, bool>,
    pub(crate) fired: Vec<TransitionId>,
    pub(crate) fired_phase2: Vec<TransitionId>,
    pub(crate) time: f64,
    pub(crate) step_num: u64,
    pub(crate) ended: bool,
    pub(crate) seed: u64,
    pub(crate) rng: StdRng,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .field("groups", &self.groups)
            .field("time", &self.time)
            .field("step_num", &self.step_num)
            .field("ended", &self.ended)
            .finish()
    }
}

fn register(
    names: &mut IndexMap<String, NodeRef>,
    name: &str,
    node: NodeRef,
) -> Result<(), ConstructionError> {
    match names.entry(name.to_string()) {
        Entry::Occupied(existing) => Err(ConstructionError::DuplicateName {
            name: name.to_string(),
            existing: existing.get().kind(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(node);
            Ok(())
        }
    }
}

fn validate_kind(desc: &TransitionDesc) -> Result<(), ConstructionError> {
    let invalid = |reason: String| ConstructionError::InvalidParameter {
        transition: desc.name.clone(),
        reason,
    };
    match desc.kind {
        TransitionKind::Timed(delay) => delay.validate().map_err(invalid),
        TransitionKind::Stochastic(weight) if !weight.is_finite() || weight <= 0.0 => Err(invalid(
            format!("stochastic weight must be finite and > 0, got {weight}"),
        )),
        _ => Ok(()),
    }
}

/// 未显式命名的弧取 `source->target`，重名时追加序号。
fn arc_name(names: &IndexMap<String, NodeRef>, desc: &ArcDesc) -> String {
    if let Some(name) = &desc.name {
        return name.clone();
    }
    let base = format!("{}->{}", desc.source, desc.target);
    if !names.contains_key(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}#{n}");
        if !names.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl Net {
    /// 以随机种子构造；种子可通过 [`Net::seed`] 取回以便重放。
    pub fn new(descriptor: &NetDescriptor) -> Result<Self, ConstructionError> {
        Self::with_seed(descriptor, rand::rng().random())
    }

    pub fn with_seed(descriptor: &NetDescriptor, seed: u64) -> Result<Self, ConstructionError> {
        let mut names = IndexMap::new();

        let mut places = IndexVec::with_capacity(descriptor.places.len());
        for desc in &descriptor.places {
            if let Some(capacity) = desc.capacity {
                if desc.init_tokens > capacity {
                    return Err(ConstructionError::InvalidPlace {
                        place: desc.name.clone(),
                        tokens: desc.init_tokens,
                        capacity,
                    });
                }
            }
            let id = places.push(Place::new(desc.name.clone(), desc.init_tokens, desc.capacity));
            register(&mut names, &desc.name, NodeRef::Place(id))?;
        }

        for (idx, desc) in descriptor.transitions.iter().enumerate() {
            validate_kind(desc)?;
            register(
                &mut names,
                &desc.name,
                NodeRef::Transition(TransitionId::from_usize(idx)),
            )?;
        }

        let count = descriptor.transitions.len();
        let mut inputs: IndexVec<TransitionId, Connections> = IndexVec::from_elem_n(Connections::new(), count);
        let mut inhibitors: IndexVec<TransitionId, Connections> = IndexVec::from_elem_n(Connections::new(), count);
        let mut outputs: IndexVec<TransitionId, Connections> = IndexVec::from_elem_n(Connections::new(), count);

        let mut arcs = IndexVec::with_capacity(descriptor.arcs.len());
        for desc in &descriptor.arcs {
            let name = arc_name(&names, desc);
            let arc = resolve_arc(&names, &name, desc)?;
            let connection = Connection {
                place: arc.place,
                weight: arc.weight,
            };
            match (arc.direction, arc.kind) {
                (ArcDirection::PlaceToTransition, ArcKind::Ordinary) => {
                    merge_connection(&mut inputs[arc.transition], connection, &name)?
                }
                (ArcDirection::PlaceToTransition, ArcKind::Inhibitor) => {
                    inhibitors[arc.transition].push(connection)
                }
                (ArcDirection::TransitionToPlace, _) => {
                    merge_connection(&mut outputs[arc.transition], connection, &name)?
                }
            }
            let id = arcs.push(arc);
            register(&mut names, &name, NodeRef::Arc(id))?;
        }

        let transitions: IndexVec<TransitionId, Transition> = descriptor
            .transitions
            .iter()
            .zip(inputs.iter().zip(inhibitors.iter().zip(outputs.iter())))
            .map(|(desc, (ins, (inh, outs)))| {
                Transition::frozen(desc.name.clone(), desc.kind, ins.clone(), inh.clone(), outs.clone())
            })
            .collect();

        let groups = build_conflict_groups(&transitions)?;
        let group_of = group_index(transitions.len(), &groups);

        log::info!(
            "constructed net: {} places, {} transitions, {} arcs, {} conflict groups",
            places.len(),
            transitions.len(),
            arcs.len(),
            groups.len()
        );

        Ok(Self {
            enabled: IndexVec::from_elem_n(false, transitions.len()),
            places,
            transitions,
            arcs,
            names,
            groups,
            group_of,
            fired: Vec::new(),
            fired_phase2: Vec::new(),
            time: 0.0,
            step_num: 0,
            ended: false,
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// 恢复初始标识、时钟与日志，并以构造种子重置随机源；冲突组保持不变。
    pub fn reset(&mut self) {
        self.ended = false;
        self.step_num = 0;
        self.time = 0.0;
        self.fired.clear();
        self.fired_phase2.clear();
        self.enabled.fill(false);
        for group in self.groups.iter_mut() {
            group.reset();
        }
        for transition in self.transitions.iter_mut() {
            transition.reset();
        }
        for place in self.places.iter_mut() {
            place.reset();
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        log::info!("net reset (seed {})", self.seed);
    }

    /// 切换随机流；下一次 `reset` 也使用新种子。
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn places(&self) -> &IndexVec<PlaceId, Place> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition> {
        &self.transitions
    }

    pub fn arcs(&self) -> &IndexVec<ArcId, Arc> {
        &self.arcs
    }

    pub fn conflict_groups(&self) -> &IndexVec<GroupId, ConflictGroup> {
        &self.groups
    }

    pub fn group_of(&self, transition: TransitionId) -> GroupId {
        self.group_of[transition]
    }

    pub fn lookup(&self, name: &str) -> Option<NodeRef> {
        self.names.get(name).copied()
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        match self.lookup(name)? {
            NodeRef::Place(id) => Some(id),
            _ => None,
        }
    }

    pub fn transition_id(&self, name: &str) -> Option<TransitionId> {
        match self.lookup(name)? {
            NodeRef::Transition(id) => Some(id),
            _ => None,
        }
    }

    pub fn place(&self, name: &str) -> Option<&Place> {
        self.place_id(name).map(|id| &self.places[id])
    }

    pub fn tokens(&self, name: &str) -> Option<Weight> {
        self.place(name).map(|place| place.tokens)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_num(&self) -> u64 {
        self.step_num
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn is_enabled(&self, transition: TransitionId) -> bool {
        self.transitions
            .get(transition)
            .is_some_and(|t| t.enabled(&self.places))
    }

    /// 最近一步中求值时刻的可发生标志。
    pub fn evaluated_enabled(&self) -> &IndexVec<TransitionId, bool> {
        &self.enabled
    }

    pub fn fired(&self) -> Vec<&str> {
        self.fired
            .iter()
            .map(|&t| self.transitions[t].name.as_str())
            .collect()
    }

    pub fn fired_phase2(&self) -> Vec<&str> {
        self.fired_phase2
            .iter()
            .map(|&t| self.transitions[t].name.as_str())
            .collect()
    }

    pub fn place_states(&self) -> Vec<PlaceState> {
        self.places
            .iter()
            .map(|place| PlaceState {
                name: place.name.clone(),
                tokens: place.tokens,
                capacity: place.capacity,
            })
            .collect()
    }

    pub fn transition_states(&self) -> Vec<TransitionState> {
        self.transitions
            .iter_enumerated()
            .map(|(id, transition)| TransitionState {
                name: transition.name.clone(),
                enabled: transition.enabled(&self.places),
                just_fired: self.fired.contains(&id) || self.fired_phase2.contains(&id),
            })
            .collect()
    }

    /// 冲突组成员名（组内按名字排序），仅用于诊断显示。
    pub fn conflict_groups_description(&self) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|group| {
                let mut names = group
                    .members()
                    .iter()
                    .map(|&t| self.transitions[t].name.clone())
                    .collect::<Vec<_>>();
                names.sort();
                names
            })
            .collect()
    }

    pub fn conflict_groups_str(&self) -> String {
        self.conflict_groups_description()
            .iter()
            .map(|names| format!("{{{}}}", names.join(", ")))
            .join(", ")
    }

    /// 按发生契约移动托肯：迁移必须可发生且输出容量充足。
    pub fn fire(&mut self, transition: TransitionId) -> Result<(), FireError> {
        let t = self
            .transitions
            .get(transition)
            .ok_or(FireError::OutOfBounds(transition))?;
        if !t.enabled(&self.places) {
            return Err(FireError::NotEnabled {
                transition: t.name.clone(),
            });
        }
        if !t.output_possible(&self.places) {
            return Err(FireError::OutputBlocked {
                transition: t.name.clone(),
            });
        }
        t.transfer(&mut self.places);
        Ok(())
    }

    /// 还原构造描述；弧名为解析后的实际名字。
    pub fn descriptor(&self) -> NetDescriptor {
        let places = self
            .places
            .iter()
            .map(|place| PlaceDesc {
                name: place.name.clone(),
                init_tokens: place.init_tokens,
                capacity: place.capacity,
            })
            .collect();
        let transitions = self
            .transitions
            .iter()
            .map(|t| TransitionDesc::new(t.name.clone(), t.kind))
            .collect();
        let arcs = self
            .arcs
            .iter()
            .map(|arc| {
                let place = self.places[arc.place].name.clone();
                let transition = self.transitions[arc.transition].name.clone();
                let (source, target) = match arc.direction {
                    ArcDirection::PlaceToTransition => (place, transition),
                    ArcDirection::TransitionToPlace => (transition, place),
                };
                ArcDesc {
                    name: Some(arc.name.clone()),
                    source,
                    target,
                    n_tokens: arc.weight,
                    kind: arc.kind,
                }
            })
            .collect();
        NetDescriptor::new(places, transitions, arcs)
    }

    /// 生成加前缀的结构副本，用于把同一子网的多个实例组合进更大的网络。
    pub fn clone_prefixed(&self, prefix: &str) -> NetDescriptor {
        self.descriptor().prefixed(prefix)
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let capacity = place
                .capacity
                .map_or_else(|| "inf".to_string(), |c| c.to_string());
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\\n{}/{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place_id.index(),
                escape_label(&place.name),
                place.tokens,
                capacity
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\\n{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                transition_id.index(),
                escape_label(&transition.name),
                transition.kind.label()
            );
        }

        for arc in self.arcs.iter() {
            let place_node = format!("place_{}", arc.place.index());
            let transition_node = format!("trans_{}", arc.transition.index());
            let (from, to) = match arc.direction {
                ArcDirection::PlaceToTransition => (place_node, transition_node),
                ArcDirection::TransitionToPlace => (transition_node, place_node),
            };
            let mut attrs = Vec::new();
            if arc.weight != 1 {
                attrs.push(format!("label=\"{}\"", arc.weight));
            }
            if arc.is_inhibitor() {
                attrs.push("arrowhead=odot".to_string());
            }
            if attrs.is_empty() {
                let _ = writeln!(&mut dot, "    {} -> {};", from, to);
            } else {
                let _ = writeln!(&mut dot, "    {} -> {} [{}];", from, to, attrs.join(", "));
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

/// 同一库所上的平行弧合并为一条，权重相加。
fn merge_connection(
    connections: &mut Connections,
    connection: Connection,
    arc: &str,
) -> Result<(), ConstructionError> {
    match connections.iter_mut().find(|c| c.place == connection.place) {
        Some(existing) => {
            existing.weight = existing.weight.checked_add(connection.weight).ok_or_else(|| {
                ConstructionError::InvalidArc {
                    arc: arc.to_string(),
                    reason: "combined weight of parallel arcs overflows".to_string(),
                }
            })?;
        }
        None => connections.push(connection),
    }
    Ok(())
}

fn resolve_arc(
    names: &IndexMap<String, NodeRef>,
    name: &str,
    desc: &ArcDesc,
) -> Result<Arc, ConstructionError> {
    let endpoint = |node: &str| {
        names
            .get(node)
            .copied()
            .ok_or_else(|| ConstructionError::UnresolvedReference {
                arc: name.to_string(),
                name: node.to_string(),
            })
    };
    let invalid = |reason: &str| ConstructionError::InvalidArc {
        arc: name.to_string(),
        reason: reason.to_string(),
    };

    let source = endpoint(&desc.source)?;
    let target = endpoint(&desc.target)?;
    if desc.n_tokens == 0 {
        return Err(invalid("weight must be at least 1"));
    }

    let (place, transition, direction) = match (source, target) {
        (NodeRef::Place(p), NodeRef::Transition(t)) => (p, t, ArcDirection::PlaceToTransition),
        (NodeRef::Transition(t), NodeRef::Place(p)) => (p, t, ArcDirection::TransitionToPlace),
        _ => return Err(invalid("must connect a place and a transition")),
    };
    if desc.kind == ArcKind::Inhibitor && direction == ArcDirection::TransitionToPlace {
        return Err(invalid("inhibitor arcs must lead from a place to a transition"));
    }

    Ok(Arc {
        name: name.to_string(),
        place,
        transition,
        weight: desc.n_tokens,
        direction,
        kind: desc.kind,
    })
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for place in self.places.iter() {
            writeln!(f, "{}: {}", place.name, place.tokens)?;
        }
        Ok(())
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
