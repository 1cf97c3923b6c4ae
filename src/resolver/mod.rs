//! Desired and actual state resolution.
//!
//! * [`ContainerTargetResolver`] turns running labeled containers into the
//!   targets each upstream *should* have.
//! * [`GatewayStateResolver`] reads the targets each upstream *has* in
//!   Kong, creating the upstream on first use.

pub mod containers;
pub mod gateway;

pub use containers::{leading_port, ContainerTargetResolver};
pub use gateway::GatewayStateResolver;
