//! 库所、迁移、弧与冲突组的强类型标识符。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::index_vec::Idx;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl Idx for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_usize(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(PlaceId, "p");
define_id!(TransitionId, "t");
define_id!(ArcId, "a");
define_id!(GroupId, "cg");

/// 名字表中的条目：库所、迁移和弧共享同一命名空间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Place(PlaceId),
    Transition(TransitionId),
    Arc(ArcId),
}

impl NodeRef {
    pub fn kind(self) -> &'static str {
        match self {
            NodeRef::Place(_) => "place",
            NodeRef::Transition(_) => "transition",
            NodeRef::Arc(_) => "arc",
        }
    }
}
