use std::path::PathBuf;
use std::sync::Arc;

use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;

use hindsight_sdk::{AgentMemory, ConsolidationStatus, Phase, RawTrajectory, State};

/// MCP server giving a running agent access to its long-term memory.
///
/// The facade needs `&mut` to learn, and rmcp requires
/// `ServerHandler: Clone + Send + Sync + 'static`, so the memory lives behind
/// a shared async mutex.
#[derive(Clone)]
pub struct HindsightMcpServer {
    memory: Arc<Mutex<AgentMemory>>,
    snapshot: Option<PathBuf>,
    tool_router: ToolRouter<Self>,
}

impl HindsightMcpServer {
    /// Serve `memory`. When `snapshot` is set, every learned trajectory is
    /// written back to that file.
    pub fn new(memory: AgentMemory, snapshot: Option<PathBuf>) -> Self {
        Self {
            memory: Arc::new(Mutex::new(memory)),
            snapshot,
            tool_router: Self::tool_router(),
        }
    }
}

// -- Tool parameter structs --

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StateParams {
    /// What the agent is trying to do
    pub task: String,
    /// Error text from the last step, if any
    pub error: Option<String>,
    /// One of understanding, locating, fixing, testing (default: understanding)
    pub phase: Option<String>,
    /// Label of the last action taken
    pub last_action: Option<String>,
    /// Short description of the repository
    pub repo_summary: Option<String>,
    /// Tools available to the agent
    pub tools: Option<Vec<String>>,
}

impl StateParams {
    fn into_state(self) -> Result<State, String> {
        let phase: Phase = self
            .phase
            .as_deref()
            .unwrap_or("understanding")
            .parse()
            .map_err(|e| format!("Invalid state: {e}"))?;
        let mut state = State::with_phase(self.task, phase);
        if let Some(error) = self.error {
            state = state.error(error);
        }
        if let Some(action) = self.last_action {
            state = state.action(action);
        }
        if let Some(summary) = self.repo_summary {
            state = state.repo_summary(summary);
        }
        if let Some(tools) = self.tools {
            state = state.tools(tools);
        }
        Ok(state)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckLoopParams {
    /// Recent agent states, oldest first
    pub states: Vec<StateParams>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LearnParams {
    /// Finished trajectory as JSON: {instance_id, repo, success, problem_statement, steps: [{action, observation}]}
    pub trajectory: String,
}

// -- Tool implementations --

#[tool_router]
impl HindsightMcpServer {
    #[tool(
        description = "Recall strategies, warnings and past experience relevant to the agent's current state."
    )]
    async fn memory_query(
        &self,
        Parameters(params): Parameters<StateParams>,
    ) -> Result<String, String> {
        let mut state = params.into_state()?;
        let memory = self.memory.lock().await;
        let recall = memory.query(&mut state).await;
        let mut out = recall.render();
        if !recall.degraded.is_empty() {
            let names: Vec<&str> = recall.degraded.iter().map(|d| d.as_str()).collect();
            out.push_str(&format!("\n(partial results: {} unavailable)", names.join(", ")));
        }
        Ok(out)
    }

    #[tool(
        description = "Check whether the recent states show the agent repeating itself. Returns the loop and strategies that worked for the same error."
    )]
    async fn memory_check_loop(
        &self,
        Parameters(params): Parameters<CheckLoopParams>,
    ) -> Result<String, String> {
        let history = params
            .states
            .into_iter()
            .map(StateParams::into_state)
            .collect::<Result<Vec<_>, _>>()?;
        let memory = self.memory.lock().await;
        Ok(memory.check_loop(&history).await.render())
    }

    #[tool(
        description = "Store a finished trajectory so later runs can learn from it. Consolidates periodically."
    )]
    async fn memory_learn(
        &self,
        Parameters(params): Parameters<LearnParams>,
    ) -> Result<String, String> {
        let raw: RawTrajectory = serde_json::from_str(&params.trajectory)
            .map_err(|e| format!("Invalid trajectory JSON: {e}"))?;
        let mut memory = self.memory.lock().await;
        let report = memory
            .learn(&raw)
            .await
            .map_err(|e| format!("Learn failed: {e}"))?;

        if let Some(path) = &self.snapshot {
            if let Err(e) = memory.save(path).await {
                warn!("Failed to save memory to {}: {e}", path.display());
            }
        }

        let w = &report.write;
        if w.duplicate {
            return Ok(format!("Skipped {}: already learned", raw.instance_id));
        }
        let mut out = format!(
            "Learned {}: {} fragment(s), {} error pattern(s), {} similarity link(s)",
            raw.instance_id, w.fragments, w.error_patterns, w.similarity_links
        );
        match &report.consolidation {
            ConsolidationStatus::NotDue => {}
            ConsolidationStatus::Completed(c) => out.push_str(&format!(
                "\nConsolidated: {} methodologies created, {} fragments merged, {} nodes cleaned",
                c.methodologies_created, c.fragments_merged, c.nodes_cleaned
            )),
            ConsolidationStatus::Skipped { reason } => {
                out.push_str(&format!("\nConsolidation skipped: {reason}"))
            }
        }
        Ok(out)
    }

    #[tool(description = "Counts of stored trajectories, fragments, methodologies and error patterns.")]
    async fn memory_stats(&self) -> Result<String, String> {
        let memory = self.memory.lock().await;
        let stats = memory
            .stats()
            .await
            .map_err(|e| format!("Failed to read stats: {e}"))?;
        let mut out = format!(
            "Trajectories: {}\nFragments: {}\nMethodologies: {}\nError patterns: {}",
            stats.total_trajectories,
            stats.total_fragments,
            stats.total_methodologies,
            stats.total_error_patterns
        );
        for (category, frequency) in &stats.error_frequency {
            out.push_str(&format!("\n  {category}: {frequency}"));
        }
        Ok(out)
    }
}

#[tool_handler]
impl ServerHandler for HindsightMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Hindsight MCP Server - long-term memory for coding agents. \
                 Query before acting, check for loops when progress stalls, \
                 and learn from every finished run."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server on stdio transport.
pub async fn run_stdio(
    memory: AgentMemory,
    snapshot: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    use rmcp::transport::stdio;
    use rmcp::ServiceExt;

    let server = HindsightMcpServer::new(memory, snapshot);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
