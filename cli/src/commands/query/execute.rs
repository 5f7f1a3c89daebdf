use std::error::Error;

use super::QueryCmd;
use crate::commands::Execute;
use db::{Engine, EngineConfig, QueryResult};

impl Execute for QueryCmd {
    type Output = QueryResult;

    fn execute(self, config: &EngineConfig) -> Result<Self::Output, Box<dyn Error>> {
        let engine = Engine::new(config.clone());
        Ok(engine.query(&self.query.to_options())?)
    }
}
