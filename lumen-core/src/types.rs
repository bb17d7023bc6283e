//! Convenience type aliases for handler return types.
//!
//! ```ignore
//! use lumen_core::prelude::*;
//!
//! async fn show(self, args: Args) -> ReplyResult {
//!     let id: u64 = args.parse(0)?;
//!     Reply::json(&self.users.find(id).await?)
//! }
//! ```

use crate::error::HttpError;
use crate::reply::Reply;

/// Result of a handler returning any `Into<Reply>` value.
pub type ApiResult<T> = Result<T, HttpError>;

/// Result of a handler that builds its [`Reply`] itself.
pub type ReplyResult = Result<Reply, HttpError>;
