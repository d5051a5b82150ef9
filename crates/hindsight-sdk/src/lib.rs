//! Agent-facing memory: learn from finished runs, recall relevant experience
//! mid-run, and notice when the agent is going in circles.
//!
//! # Example
//! ```no_run
//! use hindsight_sdk::{AgentMemory, MemoryConfig, Phase, RawTrajectory, State};
//!
//! # async fn run() -> Result<(), hindsight_sdk::MemoryError> {
//! let mut memory = AgentMemory::new(MemoryConfig::default());
//! let run = RawTrajectory::new("astropy__astropy-12907", "astropy/astropy", true)
//!     .problem("separability_matrix is wrong for nested compound models")
//!     .step("open", "opened separable.py")
//!     .step("python", "TypeError: unsupported operand type(s)")
//!     .step("edit", "edited _cstack")
//!     .step("submit", "submitted");
//! memory.learn(&run).await?;
//!
//! let mut state = State::with_phase("fix nested compound models", Phase::Fixing)
//!     .error("TypeError: unsupported operand type(s)");
//! println!("{}", memory.query(&mut state).await.render());
//!
//! let check = memory.check_loop(&[state.clone(), state.clone(), state]).await;
//! println!("{}", check.render());
//! memory.save(std::path::Path::new(".hindsight/memory.json")).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod schedule;

pub use error::MemoryError;
pub use memory::{AgentMemory, ConsolidationStatus, LearnReport, LoopCheck, MemoryStats};
pub use schedule::ConsolidationSchedule;

// Re-export types that callers need to drive the facade
pub use hindsight_capture::import::import_path;
pub use hindsight_capture::{RawStep, RawTrajectory, WriteReport};
pub use hindsight_consolidate::{ConsolidationReport, Pass};
pub use hindsight_core::loops::LoopInfo;
pub use hindsight_core::model::{Methodology, NodeId, Phase, State};
pub use hindsight_core::providers::StrategyGenerator;
pub use hindsight_core::MemoryConfig;
pub use hindsight_query::{Dimension, Recall};
