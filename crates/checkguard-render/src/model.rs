#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderableStatus {
    Pass,
    Fail,
    Error,
}

impl RenderableStatus {
    pub fn label(self) -> &'static str {
        match self {
            RenderableStatus::Pass => "PASS",
            RenderableStatus::Fail => "FAIL",
            RenderableStatus::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableError {
    pub code: String,
    pub message: String,
    pub path: Option<String>,
    pub line: Option<u32>,
}

impl RenderableError {
    /// `path:line`, `path`, or nothing.
    pub fn location(&self) -> Option<String> {
        self.path.as_ref().map(|p| match self.line {
            Some(line) => format!("{p}:{line}"),
            None => p.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableCheck {
    pub id: String,
    pub domain: String,
    pub status: RenderableStatus,
    pub duration_ms: u64,
    pub errors: Vec<RenderableError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableReport {
    pub tool: String,
    pub run_id: String,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub checks: Vec<RenderableCheck>,
}
