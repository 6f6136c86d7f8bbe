//! Tool registry and dispatch.

use dataset::QueryEngine;
use sandbox::ScriptSandbox;
use tracing::debug;

/// Name of the tabular query tool.
pub const QUERY_TOOL: &str = "sql_exec_csv";

/// Name of the script execution tool.
pub const SCRIPT_TOOL: &str = "code_exec_rhai";

/// A tool descriptor exposed to the inference service.
///
/// These are freeform tools: a name and a natural-language description
/// the model uses to decide when to invoke them, no input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Outcome of a tool execution.
///
/// Errors here are soft: the dispatcher renders them as `Error: ...`
/// text for the model, and the conversation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success { output: String },
    Error { message: String },
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The text form fed back to the model. Downstream behavior depends
    /// on the exact `Error: ` prefix for failures, so it is produced
    /// here and nowhere else.
    pub fn render(&self) -> String {
        match self {
            Self::Success { output } => output.clone(),
            Self::Error { message } => format!("Error: {message}"),
        }
    }
}

/// The tabular query side of the dispatcher.
///
/// Failures are returned as plain messages; the dispatcher turns them
/// into soft error outcomes.
pub trait TableQuery: Send + Sync {
    fn query(&self, sql: &str) -> std::result::Result<String, String>;
}

impl TableQuery for QueryEngine {
    fn query(&self, sql: &str) -> std::result::Result<String, String> {
        QueryEngine::query(self, sql).map_err(|e| e.to_string())
    }
}

/// The script execution side of the dispatcher.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &str, table: &str) -> std::result::Result<String, String>;
}

impl ScriptRunner for ScriptSandbox {
    fn run(&self, script: &str, table: &str) -> std::result::Result<String, String> {
        ScriptSandbox::run(self, script, table).map_err(|e| e.to_string())
    }
}

/// Routes tool calls to the query engine or the script sandbox.
///
/// The dispatcher keeps the most recent successful query output and
/// passes it explicitly into the sandbox on script dispatch. The sandbox
/// never runs before a query has succeeded; that ordering precondition
/// is enforced here, not in the sandbox.
pub struct Dispatcher<Q = QueryEngine, S = ScriptSandbox> {
    engine: Q,
    sandbox: S,
    last_table: Option<String>,
    manifest: Vec<ToolSpec>,
}

impl<Q: TableQuery, S: ScriptRunner> Dispatcher<Q, S> {
    pub fn new(engine: Q, sandbox: S) -> Self {
        Self {
            engine,
            sandbox,
            last_table: None,
            manifest: vec![
                ToolSpec {
                    name: QUERY_TOOL,
                    description: "Executes read-only SQL SELECT queries against the iris \
                                  dataset and returns tidy CSV results. Use to aggregate \
                                  data before visualization.",
                },
                ToolSpec {
                    name: SCRIPT_TOOL,
                    description: "Executes Rhai scripts. Use parse_csv(csv_text) to read the \
                                  previous SQL output, print_table for inspection, and \
                                  create_chart(rows, title) to save an SVG bar chart.",
                },
            ],
        }
    }

    /// The two tool descriptors sent with every inference request.
    pub fn manifest(&self) -> &[ToolSpec] {
        &self.manifest
    }

    /// The most recent successful query output, if any.
    pub fn last_table(&self) -> Option<&str> {
        self.last_table.as_deref()
    }

    /// Route one `{tool, input}` pair to the matching engine.
    pub fn dispatch(&mut self, name: &str, input: &str) -> ToolOutcome {
        debug!(tool = name, "dispatching tool call");
        match name {
            QUERY_TOOL => match self.engine.query(input.trim()) {
                Ok(output) => {
                    // Only successful queries refresh the shared table; a
                    // failed query must not clobber earlier good output.
                    self.last_table = Some(output.clone());
                    ToolOutcome::success(output)
                }
                Err(message) => ToolOutcome::error(message),
            },
            SCRIPT_TOOL => match &self.last_table {
                None => ToolOutcome::error("No CSV data available. Call sql_exec_csv first."),
                Some(table) => match self.sandbox.run(input.trim(), table) {
                    Ok(output) => ToolOutcome::success(output),
                    Err(message) => ToolOutcome::error(message),
                },
            },
            unknown => ToolOutcome::error(format!("Unknown tool '{unknown}'.")),
        }
    }
}
