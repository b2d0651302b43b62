//! 网络构造描述：库所、迁移与弧的最小参数集合，可由编辑器或配置文件产出。
use serde::{Deserialize, Deserializer, Serialize};

use crate::net::structure::{ArcKind, Delay, Priority, TransitionKind, Weight};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceDesc {
    pub name: String,
    #[serde(default)]
    pub init_tokens: Weight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Weight>,
}

impl PlaceDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            init_tokens: 0,
            capacity: None,
        }
    }

    pub fn tokens(mut self, init_tokens: Weight) -> Self {
        self.init_tokens = init_tokens;
        self
    }

    pub fn capacity(mut self, capacity: Weight) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionDesc {
    pub name: String,
    #[serde(default)]
    pub kind: TransitionKind,
}

impl TransitionDesc {
    pub fn new(name: impl Into<String>, kind: TransitionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn normal(name: impl Into<String>) -> Self {
        Self::new(name, TransitionKind::Normal)
    }

    pub fn priority(name: impl Into<String>, priority: Priority) -> Self {
        Self::new(name, TransitionKind::Priority(priority))
    }

    pub fn stochastic(name: impl Into<String>, weight: f64) -> Self {
        Self::new(name, TransitionKind::Stochastic(weight))
    }

    pub fn timed(name: impl Into<String>, delay: Delay) -> Self {
        Self::new(name, TransitionKind::Timed(delay))
    }
}

fn default_weight() -> Weight {
    1
}

/// 弧描述。方向由端点决定：源为库所即输入弧，目标为库所即输出弧。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArcDesc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default = "default_weight")]
    pub n_tokens: Weight,
    #[serde(default, alias = "is_inhibitor", deserialize_with = "arc_kind_or_flag")]
    pub kind: ArcKind,
}

/// `kind` 也接受布尔写法：`"is_inhibitor": true` 等价于 `"kind": "inhibitor"`。
#[derive(Deserialize)]
#[serde(untagged)]
enum KindOrFlag {
    Kind(ArcKind),
    Flag(bool),
}

fn arc_kind_or_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ArcKind, D::Error> {
    Ok(match KindOrFlag::deserialize(deserializer)? {
        KindOrFlag::Kind(kind) => kind,
        KindOrFlag::Flag(true) => ArcKind::Inhibitor,
        KindOrFlag::Flag(false) => ArcKind::Ordinary,
    })
}

impl ArcDesc {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: None,
            source: source.into(),
            target: target.into(),
            n_tokens: 1,
            kind: ArcKind::Ordinary,
        }
    }

    pub fn inhibitor(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: ArcKind::Inhibitor,
            ..Self::new(source, target)
        }
    }

    pub fn weight(mut self, n_tokens: Weight) -> Self {
        self.n_tokens = n_tokens;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 完整的网络描述。序列化时弧的抑制标志写作 `kind: "inhibitor"`，
/// 读取时同时接受 `is_inhibitor: true`。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetDescriptor {
    #[serde(default)]
    pub places: Vec<PlaceDesc>,
    #[serde(default)]
    pub transitions: Vec<TransitionDesc>,
    #[serde(default)]
    pub arcs: Vec<ArcDesc>,
}

impl NetDescriptor {
    pub fn new(places: Vec<PlaceDesc>, transitions: Vec<TransitionDesc>, arcs: Vec<ArcDesc>) -> Self {
        Self {
            places,
            transitions,
            arcs,
        }
    }

    /// 为全部名字加前缀，弧端点随之改写；未命名的弧保持未命名。
    pub fn prefixed(&self, prefix: &str) -> Self {
        let rename = |name: &str| format!("{prefix}{name}");
        Self {
            places: self
                .places
                .iter()
                .map(|p| PlaceDesc {
                    name: rename(&p.name),
                    ..p.clone()
                })
                .collect(),
            transitions: self
                .transitions
                .iter()
                .map(|t| TransitionDesc {
                    name: rename(&t.name),
                    kind: t.kind,
                })
                .collect(),
            arcs: self
                .arcs
                .iter()
                .map(|a| ArcDesc {
                    name: a.name.as_deref().map(rename),
                    source: rename(&a.source),
                    target: rename(&a.target),
                    n_tokens: a.n_tokens,
                    kind: a.kind,
                })
                .collect(),
        }
    }

    pub fn extend(&mut self, other: NetDescriptor) {
        self.places.extend(other.places);
        self.transitions.extend(other.transitions);
        self.arcs.extend(other.arcs);
    }
}
