//! Kiln Action Framework
//!
//! This crate provides the building blocks of an unattended imaging build:
//! the [`Action`] contract every build step implements, the shared
//! [`BuildContext`] the steps read and write, the three-way [`ActionError`]
//! classification that drives failure handling, and the [`ActionRegistry`]
//! that turns declarative action names into runnable instances.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ActionRegistry                │
//! │  disk.SetSize | files.Get | config.Set  │
//! └─────────────────────────────────────────┘
//!                   │ resolve(name, args)
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │        Box<dyn Action>                   │
//! │  validate(&BuildContext)                 │
//! │  run(&mut BuildContext) -> Outcome       │
//! └─────────────────────────────────────────┘
//!                   │ via captured providers
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │  DiskProvider | FileProvider | Network   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Sequencing, retries and checkpoints live in `kiln-workflow`.
//!
//! # Example
//!
//! ```ignore
//! use kiln_actions::{create_registry_with_actions, ActionArgs, BuildContext};
//!
//! let registry = create_registry_with_actions(&providers)?;
//! let mut ctx = BuildContext::new();
//! let action = registry.resolve("disk.SetSize", ActionArgs::from(vec![100.into()]), &ctx)?;
//! action.validate(&ctx)?;
//! action.run(&mut ctx).await?;
//! ```

pub mod actions;
pub mod args;
pub mod context;
pub mod error;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod traits;

pub use actions::{create_registry_with_actions, register_builtin};
pub use args::*;
pub use context::*;
pub use error::*;
pub use providers::*;
pub use registry::*;
pub use retry::*;
pub use traits::*;
