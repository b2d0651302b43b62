//! 网络静态结构元素：库所、弧（含抑制弧）、迁移及其能力变体。
//!
//! 记库所 `p` 的当前标识为 `M[p]`，容量为 `K[p]`（缺省为 `∞`）。
//! * 普通输入弧 `(p, t, w)` 可满足 ⇔ `M[p] ≥ w`；
//! * 抑制弧 `(p, t, w)` 触发（从而禁止 `t`）⇔ `M[p] ≥ w`；
//! * 输出弧 `(t, p, w)` 可接收 ⇔ `M[p] + w ≤ K[p]`。
use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;

pub type Weight = u64;
pub type Priority = i32;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    pub tokens: Weight,
    pub init_tokens: Weight,
    pub capacity: Option<Weight>,
}

impl Place {
    pub fn new(name: impl Into<String>, init_tokens: Weight, capacity: Option<Weight>) -> Self {
        Self {
            name: name.into(),
            tokens: init_tokens,
            init_tokens,
            capacity,
        }
    }

    pub fn reset(&mut self) {
        self.tokens = self.init_tokens;
    }

    pub fn has_tokens(&self, n: Weight) -> bool {
        self.tokens >= n
    }

    /// 放入 `n` 个托肯后是否仍不超过容量。
    pub fn can_receive(&self, n: Weight) -> bool {
        match self.capacity {
            Some(capacity) => self
                .tokens
                .checked_add(n)
                .is_some_and(|after| after <= capacity),
            None => self.tokens.checked_add(n).is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    #[default]
    Ordinary,
    Inhibitor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

/// 已解析端点的弧。只用于命名与查询；发生语义由 [`Transition`] 中冻结的连接完成。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Arc {
    pub name: String,
    pub place: PlaceId,
    pub transition: TransitionId,
    pub weight: Weight,
    pub direction: ArcDirection,
    pub kind: ArcKind,
}

impl Arc {
    pub fn is_inhibitor(&self) -> bool {
        self.kind == ArcKind::Inhibitor
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("name", &self.name)
            .field("place", &self.place)
            .field("transition", &self.transition)
            .field("weight", &self.weight)
            .field("direction", &self.direction)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Timed transition delay distributions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Delay {
    Constant(f64),
    Uniform { min: f64, max: f64 },
    Exponential { rate: f64 },
}

impl Delay {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Delay::Constant(t) if !t.is_finite() || t < 0.0 => {
                Err(format!("constant delay must be finite and >= 0, got {t}"))
            }
            Delay::Uniform { min, max }
                if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max =>
            {
                Err(format!("uniform delay needs 0 <= min <= max, got [{min}, {max}]"))
            }
            Delay::Exponential { rate } if !rate.is_finite() || rate <= 0.0 => {
                Err(format!("exponential delay rate must be > 0, got {rate}"))
            }
            _ => Ok(()),
        }
    }

    /// 采样一次延迟；结果非负。参数须已通过 [`Delay::validate`]，否则返回错误而不是退化为零延迟。
    pub fn sample(&self, rng: &mut StdRng) -> Result<f64, String> {
        self.validate()?;
        let value = match *self {
            Delay::Constant(t) => t,
            Delay::Uniform { min, max } if min == max => min,
            Delay::Uniform { min, max } => rng.random_range(min..=max),
            Delay::Exponential { rate } => Exp::new(rate)
                .map_err(|err| format!("exponential delay rate {rate}: {err}"))?
                .sample(rng),
        };
        Ok(value.max(0.0))
    }
}

/// 迁移的能力变体，决定其所在冲突组的消解策略。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    Normal,
    Priority(Priority),
    Stochastic(f64),
    Timed(Delay),
}

impl TransitionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransitionKind::Normal => "normal",
            TransitionKind::Priority(_) => "priority",
            TransitionKind::Stochastic(_) => "stochastic",
            TransitionKind::Timed(_) => "timed",
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, TransitionKind::Timed(_))
    }
}

/// 冻结在迁移内部的一条连接：库所与权重。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub place: PlaceId,
    pub weight: Weight,
}

pub type Connections = SmallVec<[Connection; 4]>;

/// 迁移。弧集合在构造网络时一次性写入，之后只读。
#[derive(Clone)]
pub struct Transition {
    pub name: String,
    pub kind: TransitionKind,
    inputs: Connections,
    inhibitors: Connections,
    outputs: Connections,
    waiting: bool,
}

impl Transition {
    pub(crate) fn frozen(
        name: impl Into<String>,
        kind: TransitionKind,
        inputs: Connections,
        inhibitors: Connections,
        outputs: Connections,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            inhibitors,
            outputs,
            waiting: false,
        }
    }

    pub fn inputs(&self) -> &[Connection] {
        &self.inputs
    }

    pub fn inhibitors(&self) -> &[Connection] {
        &self.inhibitors
    }

    pub fn outputs(&self) -> &[Connection] {
        &self.outputs
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn priority(&self) -> Priority {
        match self.kind {
            TransitionKind::Priority(priority) => priority,
            _ => 0,
        }
    }

    pub fn reset(&mut self) {
        self.waiting = false;
    }

    pub(crate) fn inputs_satisfied(&self, places: &IndexVec<PlaceId, Place>) -> bool {
        self.inputs
            .iter()
            .all(|arc| places[arc.place].has_tokens(arc.weight))
    }

    fn inhibited(&self, places: &IndexVec<PlaceId, Place>) -> bool {
        self.inhibitors
            .iter()
            .any(|arc| places[arc.place].has_tokens(arc.weight))
    }

    pub fn enabled(&self, places: &IndexVec<PlaceId, Place>) -> bool {
        !self.waiting && self.inputs_satisfied(places) && !self.inhibited(places)
    }

    /// 同一库所上的多条输出弧按总量判断容量。
    pub fn output_possible(&self, places: &IndexVec<PlaceId, Place>) -> bool {
        self.outputs.iter().enumerate().all(|(idx, arc)| {
            let already = self.outputs[..idx]
                .iter()
                .filter(|prev| prev.place == arc.place)
                .map(|prev| prev.weight)
                .sum::<Weight>();
            places[arc.place].can_receive(already + arc.weight)
        })
    }

    /// 移动托肯。调用方必须先确认 `inputs_satisfied` 与 `output_possible`。
    pub(crate) fn transfer(&self, places: &mut IndexVec<PlaceId, Place>) {
        for arc in &self.inputs {
            let place = &mut places[arc.place];
            place.tokens -= arc.weight;
        }
        for arc in &self.outputs {
            let place = &mut places[arc.place];
            place.tokens += arc.weight;
        }
    }

    /// 第一阶段：采样延迟并进入等待状态，不移动托肯。采样失败时保持不等待。
    pub fn choose_time(&mut self, rng: &mut StdRng) -> Result<f64, String> {
        let delay = match self.kind {
            TransitionKind::Timed(delay) => delay.sample(rng)?,
            _ => 0.0,
        };
        self.waiting = true;
        Ok(delay)
    }

    pub(crate) fn finish_waiting(&mut self) {
        self.waiting = false;
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.name)
            .field(&self.kind.label())
            .finish()
    }
}
