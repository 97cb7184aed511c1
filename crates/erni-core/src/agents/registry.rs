//! Agent registry and handoff graph validation

use super::{Agent, AgentSummary};
use crate::error::{Error, Result};
use erni_tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Collects agents before the graph is validated
pub struct AgentRegistryBuilder {
    routing: String,
    agents: Vec<Agent>,
}

impl AgentRegistryBuilder {
    /// Start a registry whose routing agent is `routing`
    #[must_use]
    pub fn new(routing: impl Into<String>) -> Self {
        Self {
            routing: routing.into(),
            agents: Vec::new(),
        }
    }

    /// Register an agent
    ///
    /// # Errors
    /// Returns a configuration error if the name is already taken
    pub fn register(&mut self, agent: Agent) -> Result<&mut Self> {
        if self.agents.iter().any(|a| a.name == agent.name) {
            return Err(Error::Configuration(format!(
                "agent '{}' registered twice",
                agent.name
            )));
        }
        self.agents.push(agent);
        Ok(self)
    }

    /// Validate the graph against the tool registry and freeze it
    ///
    /// # Errors
    /// Returns a configuration error when the routing agent is missing, a
    /// handoff target or tool is unknown, or the graph is not closed: every
    /// specialist must hand back to the routing agent and be reachable from it.
    pub fn build(self, tools: &ToolRegistry) -> Result<AgentRegistry> {
        let names: Vec<&str> = self.agents.iter().map(|a| a.name.as_str()).collect();
        let routing = self
            .agents
            .iter()
            .find(|a| a.name == self.routing)
            .ok_or_else(|| {
                Error::Configuration(format!("routing agent '{}' is not registered", self.routing))
            })?;

        for agent in &self.agents {
            for edge in &agent.handoffs {
                if !names.contains(&edge.target.as_str()) {
                    return Err(Error::Configuration(format!(
                        "agent '{}' hands off to unregistered agent '{}'",
                        agent.name, edge.target
                    )));
                }
                if edge.target == agent.name {
                    return Err(Error::Configuration(format!(
                        "agent '{}' hands off to itself",
                        agent.name
                    )));
                }
            }
            for tool in &agent.tools {
                if !tools.has(tool) {
                    return Err(Error::Configuration(format!(
                        "agent '{}' declares unknown tool '{}'",
                        agent.name, tool
                    )));
                }
            }
            if agent.name == self.routing {
                continue;
            }
            if agent.handoff_to(&self.routing).is_none() {
                return Err(Error::Configuration(format!(
                    "agent '{}' has no handoff back to '{}'",
                    agent.name, self.routing
                )));
            }
            if routing.handoff_to(&agent.name).is_none() {
                return Err(Error::Configuration(format!(
                    "routing agent '{}' cannot reach '{}'",
                    self.routing, agent.name
                )));
            }
        }

        let order: Vec<String> = self.agents.iter().map(|a| a.name.clone()).collect();
        let agents: HashMap<String, Arc<Agent>> = self
            .agents
            .into_iter()
            .map(|a| (a.name.clone(), Arc::new(a)))
            .collect();

        let routing = agents
            .get(&self.routing)
            .cloned()
            .ok_or_else(|| Error::Configuration("routing agent vanished".into()))?;

        info!(agents = agents.len(), routing = %routing.name, "Agent graph validated");
        Ok(AgentRegistry {
            agents,
            order,
            routing,
        })
    }
}

/// Validated, immutable agent graph
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<Agent>>,
    order: Vec<String>,
    routing: Arc<Agent>,
}

impl AgentRegistry {
    /// Look up an agent by name
    ///
    /// # Errors
    /// Returns `NotFound` for unknown names
    pub fn resolve(&self, name: &str) -> Result<Arc<Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("agent '{name}'")))
    }

    /// The routing agent
    #[must_use]
    pub fn routing_agent(&self) -> Arc<Agent> {
        Arc::clone(&self.routing)
    }

    /// Name of the routing agent
    #[must_use]
    pub fn routing_name(&self) -> &str {
        &self.routing.name
    }

    /// Agent names in registration order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Summaries in registration order
    #[must_use]
    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name))
            .map(|agent| agent.summary())
            .collect()
    }

    /// Number of agents
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
