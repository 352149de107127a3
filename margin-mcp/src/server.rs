//! MCP tool surface over the comment workspace.

use std::sync::Arc;

use margin_core::tools::{invocation, Facade};
use margin_core::workspace::Workspace;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentParams {
    /// Path of the file, absolute or relative to the workspace root.
    pub file_path: String,
    /// 1-based line number.
    pub line: u32,
    /// Comment text (markdown).
    pub body: String,
    /// Author name; defaults to the configured author.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetCommentsParams {
    /// Path of the file, absolute or relative to the workspace root.
    pub file_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentParams {
    /// Path of the file, absolute or relative to the workspace root.
    pub file_path: String,
    /// 1-based line number of the thread.
    pub line: u32,
}

#[derive(Clone)]
pub struct MarginMcp {
    workspace: Arc<Mutex<Workspace>>,
    facade: Arc<Facade>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MarginMcp {
    pub fn new(workspace: Workspace, facade: Facade) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(workspace)),
            facade: Arc::new(facade),
            tool_router: Self::tool_router(),
        }
    }

    /// Locks the workspace after pulling in anything the terminal UI wrote.
    async fn lock_synced(&self) -> Result<tokio::sync::MutexGuard<'_, Workspace>, ErrorData> {
        let mut ws = self.workspace.lock().await;
        ws.sync().await.map_err(|err| {
            ErrorData::internal_error(format!("failed to load comment threads: {err}"), None)
        })?;
        Ok(ws)
    }

    /// Add a comment on a line of a file, starting a new comment thread there.
    #[tool(name = "addComment")]
    pub async fn add_comment(
        &self,
        Parameters(p): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("{}", invocation::add_comment(&p.file_path, p.line));
        let mut ws = self.lock_synced().await?;
        let text = self
            .facade
            .add_comment(&mut ws, &p.file_path, p.line, &p.body, p.username.as_deref())
            .await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Reply to the existing comment thread on a line of a file.
    #[tool(name = "addReply")]
    pub async fn add_reply(
        &self,
        Parameters(p): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("{}", invocation::add_reply(&p.file_path, p.line));
        let mut ws = self.lock_synced().await?;
        let text = self
            .facade
            .add_reply(&mut ws, &p.file_path, p.line, &p.body, p.username.as_deref())
            .await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// List the comment threads of a file, one `Line N:` block per thread.
    #[tool(name = "getComments")]
    pub async fn get_comments(
        &self,
        Parameters(p): Parameters<GetCommentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("{}", invocation::get_comments(&p.file_path));
        let ws = self.lock_synced().await?;
        let text = self.facade.get_comments(&ws, &p.file_path);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Delete the comment thread on a line of a file, with all of its replies.
    #[tool(name = "deleteComment")]
    pub async fn delete_comment(
        &self,
        Parameters(p): Parameters<DeleteCommentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::info!("{}", invocation::delete_comment(&p.file_path, p.line));
        let mut ws = self.lock_synced().await?;
        let text = self.facade.delete_comment(&mut ws, &p.file_path, p.line).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for MarginMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Line-anchored code comments (tools: addComment, addReply, getComments, deleteComment). Lines are 1-based; paths may be relative to the workspace root."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
