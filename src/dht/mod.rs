pub mod client;
pub mod control;
pub mod node;
pub mod routing;
pub mod service;
pub mod store;

mod data;
mod lookup;
mod membership;
mod stabilize;


pub use control::DhtControl;
pub use node::Node;
