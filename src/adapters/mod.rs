// Adapters layer: concrete implementations for external systems (http backend, handoff storage).

pub mod http;
pub mod storage;
