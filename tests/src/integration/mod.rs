//! Cross-component flows against a running gateway.

#[cfg(test)]
pub mod harness;

#[cfg(test)]
mod audit_flow;
#[cfg(test)]
mod gateway_flows;
