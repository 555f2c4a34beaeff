mod client;
mod gateway;

pub use client::{Ctx, Resource};
pub use gateway::HttpGateway;
