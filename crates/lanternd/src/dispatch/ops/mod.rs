//! Operation handlers, grouped by concern. Each file extends
//! [`Engine`](super::Engine) with the handlers for its ops.

mod caught;
mod diagnostics;
mod eval;
mod lookup;
mod middleware;
mod session;
mod state;
mod testing;
