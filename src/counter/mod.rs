//! Visit counter service layer.
//!
//! Exposes the three operations the HTTP layer needs: `add`, `count` and
//! `render`. Store and queue failures are absorbed here and logged; callers
//! only ever see validation and render errors.

mod service;

pub use service::{CounterConfig, VisitCounter, DEFAULT_REQUEST_TIMEOUT};
