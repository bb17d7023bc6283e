//! Lumen - controllers over Axum with streaming server-side rendering.
//!
//! This facade re-exports `lumen-core` and, behind the `test` feature, the
//! in-process test client from `lumen-test`:
//!
//! ```ignore
//! use lumen::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature | Default | Crate        |
//! |---------|---------|--------------|
//! | `test`  | no      | `lumen-test` |

pub extern crate lumen_core;

pub use lumen_core::*;

#[cfg(feature = "test")]
pub use lumen_test;

/// Unified prelude - import everything with `use lumen::prelude::*`.
pub mod prelude {
    pub use lumen_core::prelude::*;

    #[cfg(feature = "test")]
    pub use lumen_test::{TestApp, TestResponse};
}
