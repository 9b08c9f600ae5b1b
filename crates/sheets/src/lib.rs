use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

mod google;

pub use google::{
    mint_assertion, GoogleSheets, GoogleSheetsConfig, SheetError, DEFAULT_API_BASE_URL,
    DEFAULT_TOKEN_URL, SPREADSHEETS_SCOPE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub rows: u32,
    pub columns: u32,
}

/// The first worksheet of the destination spreadsheet.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    async fn grid_size(&self) -> Result<GridSize>;
    async fn resize(&self, size: GridSize) -> Result<()>;
    /// Values of row 1; empty when the sheet has no header yet.
    async fn header_row(&self) -> Result<Vec<String>>;
    async fn set_header_row(&self, headers: &[String]) -> Result<()>;
    async fn append_row(&self, values: &[String]) -> Result<()>;
}

#[derive(Debug)]
struct InMemoryState {
    grid: GridSize,
    rows: Vec<Vec<String>>,
    fail_appends: bool,
}

/// Sheet kept in process memory; used for local runs without Google
/// credentials. Enforces the column count like the real grid does.
#[derive(Debug)]
pub struct InMemorySheet {
    state: Mutex<InMemoryState>,
}

impl Default for InMemorySheet {
    fn default() -> Self {
        Self::with_grid(GridSize {
            rows: 1000,
            columns: 26,
        })
    }
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(grid: GridSize) -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                grid,
                rows: Vec::new(),
                fail_appends: false,
            }),
        }
    }

    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().await.rows.clone()
    }

    /// Makes every later append fail, as an unreachable sheet would.
    #[cfg(any(test, feature = "testing"))]
    pub async fn set_fail_appends(&self, fail: bool) {
        self.state.lock().await.fail_appends = fail;
    }
}

fn check_width(grid: GridSize, values: &[String]) -> Result<()> {
    if values.len() > grid.columns as usize {
        return Err(anyhow!(
            "range exceeds grid limits: {} values for {} columns",
            values.len(),
            grid.columns
        ));
    }
    Ok(())
}

#[async_trait]
impl SheetBackend for InMemorySheet {
    async fn grid_size(&self) -> Result<GridSize> {
        Ok(self.state.lock().await.grid)
    }

    async fn resize(&self, size: GridSize) -> Result<()> {
        let mut state = self.state.lock().await;
        for row in &mut state.rows {
            row.truncate(size.columns as usize);
        }
        let keep = size.rows as usize;
        state.rows.truncate(keep);
        state.grid = size;
        Ok(())
    }

    async fn header_row(&self) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .first()
            .cloned()
            .unwrap_or_default())
    }

    async fn set_header_row(&self, headers: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        check_width(state.grid, headers)?;
        match state.rows.first_mut() {
            Some(first) => *first = headers.to_vec(),
            None => state.rows.push(headers.to_vec()),
        }
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_appends {
            return Err(anyhow!("append rejected by sheet"));
        }
        check_width(state.grid, values)?;
        state.rows.push(values.to_vec());
        let used = state.rows.len() as u32;
        if used > state.grid.rows {
            state.grid.rows = used;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
