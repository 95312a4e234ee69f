//! Cross-module scenarios over a full graph

mod picking_integration;
