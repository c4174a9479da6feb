//! Shell command action
//!
//! Runs a command through `sh -c` on the host.
//!
//! Example:
//! ```yaml
//! - id: build
//!   kind: action
//!   name: shellCommand
//!   parameters:
//!     command: "npm install"
//!     workingDir: "./frontend"
//! ```
//!
//! Output: `{ stdout, stderr, exitCode }`. A non-zero exit fails the node.

use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

use super::{required_str, str_param};
use crate::engine::contracts::{NodeArgs, NodeHandler};
use crate::engine::error::HandlerError;
use crate::engine::result::NodeOutcome;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandNode;

#[async_trait]
impl NodeHandler for ShellCommandNode {
    fn description(&self) -> &str {
        "Runs a shell command and captures its output"
    }

    async fn execute(&self, args: NodeArgs) -> Result<NodeOutcome, HandlerError> {
        let command = required_str(&args.parameters, "command")?;
        let working_dir = str_param(&args.parameters, "workingDir")?;

        info!("Executing shell command: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if output.status.success() {
            info!("Command completed successfully");
            Ok(NodeOutcome::ok(json!({
                "stdout": stdout,
                "stderr": stderr,
                "exitCode": exit_code,
            })))
        } else if stderr.is_empty() {
            Ok(NodeOutcome::failure(format!(
                "Command exited with code {}",
                exit_code
            )))
        } else {
            Ok(NodeOutcome::failure(stderr))
        }
    }
}
