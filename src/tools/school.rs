//! School analytics tools
//!
//! Both tools are placeholders: they declare no parameters and answer with a
//! fixed string until the dashboard exposes real statistics.

use super::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

const PLACEHOLDER_RESULT: &str = "test";

/// Current school statistics
pub struct GetSchoolStatsTool;

#[async_trait]
impl Tool for GetSchoolStatsTool {
    fn name(&self) -> &str {
        "getSchoolStats"
    }

    fn description(&self) -> &str {
        "Get current school statistics including student count, attendance, grades, and recent events in structured table format."
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        Ok(ToolResult::success(PLACEHOLDER_RESULT))
    }
}

/// Teacher performance data
pub struct GetTeacherPerformanceTool;

#[async_trait]
impl Tool for GetTeacherPerformanceTool {
    fn name(&self) -> &str {
        "getTeacherPerformance"
    }

    fn description(&self) -> &str {
        "Get teacher performance data in structured table format."
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult> {
        Ok(ToolResult::success(PLACEHOLDER_RESULT))
    }
}
