//! Multi-agent orchestration
//!
//! A coordinator agent delegates weather questions to a query agent, which
//! hands control back or completes the task.

mod handoff;

pub use handoff::{
    split_words, transition, AgentRole, Directive, HandoffEdge, HandoffEngine, RoutingState,
    HANDOFF_EDGES, HANDOFF_PLUGIN,
};
