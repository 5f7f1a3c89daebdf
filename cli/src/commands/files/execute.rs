use std::error::Error;

use serde::Serialize;

use super::FilesCmd;
use crate::commands::Execute;
use db::{Engine, EngineConfig, FileEntry};

/// Result of the files command execution
#[derive(Debug, Default, Serialize)]
pub struct FilesResult {
    pub dir: String,
    pub entries: Vec<FileEntry>,
}

impl Execute for FilesCmd {
    type Output = FilesResult;

    fn execute(self, config: &EngineConfig) -> Result<Self::Output, Box<dyn Error>> {
        let engine = Engine::new(config.clone());
        let entries = engine.list_files(&self.dir)?;
        Ok(FilesResult {
            dir: self.dir,
            entries,
        })
    }
}
