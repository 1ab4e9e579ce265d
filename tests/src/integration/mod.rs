//! # Integration Flows
//!
//! End-to-end behavior of the signaling core, driven through
//! [`rt_signaling::SignalingApi`] and the gateway's frame handler.

pub mod call_flows;
pub mod presence_flows;
pub mod support;
