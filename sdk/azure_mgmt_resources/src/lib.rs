#![doc = include_str!("../README.md")]

pub mod lro;
pub mod models;
pub mod paging;
pub mod resource;
pub mod resource_id;

pub use lro::ArmPoller;
pub use paging::ArmPager;
pub use resource_id::ResourceId;
