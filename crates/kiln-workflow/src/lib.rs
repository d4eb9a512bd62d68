//! Kiln Workflow Engine
//!
//! This crate runs build definitions: ordered lists of action records that
//! are resolved through an [`kiln_actions::ActionRegistry`] and executed one
//! at a time against a shared [`kiln_actions::BuildContext`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              ActionSequencer                         │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │          ActionList (YAML | JSON)           │    │
//! │  └─────────────────────────────────────────────┘    │
//! │                      │                               │
//! │                      ▼                               │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │   resolve -> validate -> run (with retry)   │    │
//! │  └─────────────────────────────────────────────┘    │
//! │                      │                               │
//! │                      ▼                               │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │   CheckpointStore     SequenceEvent stream  │    │
//! │  │   Memory | File       Started | Completed   │    │
//! │  └─────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kiln_actions::{create_registry_with_actions, BuildContext};
//! use kiln_workflow::{ActionList, ActionSequencer, SequencerConfig};
//!
//! let registry = create_registry_with_actions(&providers)?;
//! let sequencer = ActionSequencer::new(registry, SequencerConfig::default());
//!
//! let list = ActionList::from_yaml_str("- disk.SetSize: [100]")?;
//! let mut ctx = BuildContext::new();
//! sequencer.run(&list, &mut ctx).await?;
//! ```

pub mod checkpoint;
pub mod definition;
pub mod error;
pub mod sequencer;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use definition::*;
pub use error::*;
pub use sequencer::*;
