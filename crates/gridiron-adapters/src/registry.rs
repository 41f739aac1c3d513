use std::sync::Arc;

use gridiron_core::{
    Defense, Games, GridironError, InjuryReport, Kicking, Passing, Punting, Receiving, Returns,
    Rushing, Scoring, Standings, StatId, TeamDefense, TeamKicking, TeamOffense, TeamPunting,
    TeamReturns,
};

use crate::handler::{StatHandler, TableHandler};
use crate::specs;
use crate::weather::WeatherHandler;
use crate::weekly::WeeklyTableHandler;

/// Closed mapping from stat identifier to handler, in registration order.
#[derive(Default, Clone)]
pub struct StatRegistry {
    handlers: Vec<Arc<dyn StatHandler>>,
}

impl StatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stat identifier, in batch default order: the season tables,
    /// the schedule, weekly injuries (browser-rendered) and game weather.
    pub fn baseline() -> Result<Self, GridironError> {
        let mut registry = Self::new();
        registry.register(Arc::new(TableHandler::<TeamOffense>::new(
            StatId::TeamOffense,
            specs::TEAM_OFFENSE,
        )))?;
        registry.register(Arc::new(TableHandler::<TeamDefense>::new(
            StatId::TeamDefense,
            specs::TEAM_DEFENSE,
        )))?;
        registry.register(Arc::new(TableHandler::<Standings>::new(
            StatId::Standings,
            specs::STANDINGS,
        )))?;
        registry.register(Arc::new(TableHandler::<TeamKicking>::new(
            StatId::TeamKicking,
            specs::TEAM_KICKING,
        )))?;
        registry.register(Arc::new(TableHandler::<TeamPunting>::new(
            StatId::TeamPunting,
            specs::TEAM_PUNTING,
        )))?;
        registry.register(Arc::new(TableHandler::<TeamReturns>::new(
            StatId::TeamReturns,
            specs::TEAM_RETURNS,
        )))?;
        registry.register(Arc::new(TableHandler::<Passing>::new(
            StatId::Passing,
            specs::PASSING,
        )))?;
        registry.register(Arc::new(TableHandler::<Rushing>::new(
            StatId::Rushing,
            specs::RUSHING,
        )))?;
        registry.register(Arc::new(TableHandler::<Receiving>::new(
            StatId::Receiving,
            specs::RECEIVING,
        )))?;
        registry.register(Arc::new(TableHandler::<Defense>::new(
            StatId::Defense,
            specs::DEFENSE,
        )))?;
        registry.register(Arc::new(TableHandler::<Kicking>::new(
            StatId::Kicking,
            specs::KICKING,
        )))?;
        registry.register(Arc::new(TableHandler::<Punting>::new(
            StatId::Punting,
            specs::PUNTING,
        )))?;
        registry.register(Arc::new(TableHandler::<Returns>::new(
            StatId::Returns,
            specs::RETURNS,
        )))?;
        registry.register(Arc::new(TableHandler::<Scoring>::new(
            StatId::Scoring,
            specs::SCORING,
        )))?;
        registry.register(Arc::new(TableHandler::<Games>::new(
            StatId::Games,
            specs::GAMES,
        )))?;
        registry.register(Arc::new(
            WeeklyTableHandler::<InjuryReport>::new(StatId::Injuries, specs::INJURIES).rendered(),
        ))?;
        registry.register(Arc::new(WeatherHandler))?;
        Ok(registry)
    }

    /// Adds a handler. A second handler for the same identifier is rejected.
    pub fn register(&mut self, handler: Arc<dyn StatHandler>) -> Result<(), GridironError> {
        let stat = handler.stat();
        if self.get(stat).is_some() {
            return Err(GridironError::Validation(format!(
                "stat {stat} is already registered"
            )));
        }
        self.handlers.push(handler);
        Ok(())
    }

    pub fn get(&self, stat: StatId) -> Option<Arc<dyn StatHandler>> {
        self.handlers.iter().find(|h| h.stat() == stat).cloned()
    }

    /// Handler for a raw identifier; `None` for names that are unknown or
    /// known but not registered here.
    pub fn resolve(&self, stat: &str) -> Option<Arc<dyn StatHandler>> {
        stat.parse::<StatId>().ok().and_then(|id| self.get(id))
    }

    pub fn ids(&self) -> Vec<StatId> {
        self.handlers.iter().map(|h| h.stat()).collect()
    }

    pub fn tables(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.table()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
