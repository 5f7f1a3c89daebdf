use std::error::Error;

use serde::Serialize;

use super::TablesCmd;
use crate::commands::Execute;
use db::{Engine, EngineConfig, TableInfo};

/// Result of the tables command execution
#[derive(Debug, Default, Serialize)]
pub struct TablesResult {
    pub path: String,
    pub tables: Vec<TableInfo>,
}

impl Execute for TablesCmd {
    type Output = TablesResult;

    fn execute(self, config: &EngineConfig) -> Result<Self::Output, Box<dyn Error>> {
        let engine = Engine::new(config.clone());
        let tables = engine.list_tables(&self.path)?;
        Ok(TablesResult {
            path: self.path,
            tables,
        })
    }
}
