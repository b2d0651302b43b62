//! # 托肯流网络（库所/迁移网）仿真内核
//!
//! 设库所集合 `P`、迁移集合 `T`，标识 `M ∈ ℕ^{|P|}`，容量 `K ∈ (ℕ ∪ {∞})^{|P|}`。
//!
//! * 迁移 `t` **可发生** 当且仅当：所有普通输入弧 `(p, t, w)` 满足 `M[p] ≥ w`，
//!   所有抑制弧 `(p, t, w)` 满足 `M[p] < w`，且 `t` 不处于定时等待状态；
//! * 迁移 **发生** 后：输入库所减去弧权重，输出库所加上弧权重，始终保持
//!   `0 ≤ M[p] ≤ K[p]`。
//!
//! 共享普通输入库所的迁移组成冲突组（传递闭包），每组在一步内至多发生一个迁移，
//! 消解策略由成员变体决定：均匀随机、优先级、加权随机、定时两阶段。
//! 随机性全部来自网络自身持有的可设种子随机源，同一种子下运行可完全重放。
//!
//! ## 示例
//!
//! ```rust
//! use pnsim::net::*;
//!
//! let desc = NetDescriptor::new(
//!     vec![PlaceDesc::new("A").tokens(1), PlaceDesc::new("B")],
//!     vec![TransitionDesc::normal("T1")],
//!     vec![ArcDesc::new("A", "T1"), ArcDesc::new("T1", "B")],
//! );
//! let mut net = Net::with_seed(&desc, 7).unwrap();
//!
//! let result = net.step().unwrap();
//! assert_eq!(result.fired, vec!["T1".to_string()]);
//! assert_eq!(net.tokens("A"), Some(0));
//! assert_eq!(net.tokens("B"), Some(1));
//! assert!(net.ended());
//! ```

pub mod conflict;
pub mod core;
pub mod descriptor;
pub mod engine;
pub mod ids;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use conflict::{ConflictGroup, GroupPolicy, GroupType};
pub use self::core::{ConstructionError, FireError, Net, NetError, PlaceState, TransitionState};
pub use descriptor::{ArcDesc, NetDescriptor, PlaceDesc, TransitionDesc};
pub use engine::{RunLimit, RunSummary, StepResult};
pub use ids::{ArcId, GroupId, NodeRef, PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use structure::{Arc, ArcDirection, ArcKind, Delay, Place, Transition, TransitionKind, Weight};
