//! # Chorus Limit
//!
//! Keyed request throttling for the Chorus platform: cheap per-process
//! guards for write-heavy endpoints and outbound provider calls, without
//! external infrastructure.
//!
//! ## Overview
//!
//! The chorus-limit crate handles:
//! - **Quotas**: `limit` operations per fixed window, with presets
//! - **Decisions**: allowed/remaining/reset, retry-after when blocked
//! - **Memory Limiter**: lazy window reset, background memory reclamation
//!
//! The [`RateLimiter`] trait is the substitution seam: callers depend on
//! it, so a deployment that outgrows a single process can move to a
//! shared-counter implementation without touching call sites.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chorus_limit::{MemoryRateLimiter, RateLimiter, RateQuota};
//!
//! async fn example() {
//!     let limiter = MemoryRateLimiter::new();
//!
//!     let decision = limiter
//!         .check("user:42:messages", RateQuota::per_minute(30))
//!         .await;
//!
//!     if !decision.allowed {
//!         // Typically a 429 with Retry-After
//!         println!("slow down, retry in {:?}s", decision.retry_after_secs);
//!     }
//! }
//! ```

pub mod error;
pub mod limiter;

// Re-export main types
pub use error::RateLimitError;
pub use limiter::{MemoryRateLimiter, RateLimitDecision, RateLimiter, RateQuota};
