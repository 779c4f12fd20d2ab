//! Web API 层
//!
//! 命令入口把请求体校验、序列化后交给事件发布端口；查询入口只读
//! 投影；websocket 入口把连接挂到扇出中心上。

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;
pub mod ws_connection;

pub use routes::router;
pub use state::AppState;
