//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Cache-Control: no-store (tower-http, set in the router)
//! 2. Request logger (method, path, status and latency)

pub mod audit;
