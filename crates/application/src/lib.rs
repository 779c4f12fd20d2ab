//! 应用层实现。
//!
//! 这里提供围绕领域模型的长驻服务：事件投影、扇出中心，
//! 以及对外部适配器（事件发布、时钟）的抽象。

pub mod clock;
pub mod hub;
pub mod projection;
pub mod publisher;

pub use clock::{Clock, SystemClock};
pub use hub::{ConnectionState, DeliveryFilter, FanOutHub, DELIVERABLE_EVENTS};
pub use projection::ChatProjection;
pub use publisher::{EventPublisher, PublishError};
