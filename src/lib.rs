//! 托肯流网络仿真：构造、冲突组分析与离散步进内核，以及配置与并行副本运行。
#![warn(non_snake_case)]

pub mod config;
pub mod net;
pub mod options;
pub mod scenario;
