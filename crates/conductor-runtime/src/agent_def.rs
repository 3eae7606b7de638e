//! `AgentRegistry` — the collaborator an `AgentActor` resolves the active
//! agent definition from at the start of every turn (spec §4.D step 2).

use std::collections::HashMap;

/// What kind of agent a definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// A normal build/execute agent.
    Build,
    /// A planning agent — `AgentActor` treats its turns as plan-mode turns
    /// (spec §4.D "Plan mode").
    Plan,
}

/// A named, reusable agent configuration: which tools it may call, its
/// default model, and whether it's surfaced to users directly (vs. only
/// reachable as a subagent target).
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// Unique name, referenced by `SwitchAgent` and subagent `agent` fields.
    pub name: String,
    /// `Build` or `Plan`.
    pub kind: AgentKind,
    /// System prompt prefix for this agent.
    pub system_prompt: String,
    /// Tool names visible to this agent. `None` means "all registered tools".
    pub tools: Option<Vec<String>>,
    /// Default model, used unless the branch or a `SwitchModel` override it.
    pub default_model: String,
    /// Whether this agent is hidden from direct selection (subagent-only).
    pub hidden: bool,
}

impl AgentDefinition {
    /// Construct a visible build agent with no tool restriction.
    #[must_use]
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AgentKind::Build,
            system_prompt: system_prompt.into(),
            tools: None,
            default_model: default_model.into(),
            hidden: false,
        }
    }

    /// Restrict this definition's visible tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Mark this definition as a planning agent.
    #[must_use]
    pub fn as_plan(mut self) -> Self {
        self.kind = AgentKind::Plan;
        self
    }

    /// Hide this definition from direct selection.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Whether `tool_name` is visible to this agent.
    #[must_use]
    pub fn allows_tool(&self, tool_name: &str) -> bool {
        self.tools.as_ref().is_none_or(|allowed| allowed.iter().any(|t| t == tool_name))
    }
}

/// In-memory registry of agent definitions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentDefinition>,
}

impl AgentRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a single default `"default"` build agent, the minimum
    /// an embedding application needs to run a turn.
    #[must_use]
    pub fn with_default_agent(default_model: impl Into<String>) -> Self {
        let mut registry = Self::new();
        registry.register(AgentDefinition::new(
            "default",
            "You are a helpful coding assistant.",
            default_model,
        ));
        registry
    }

    /// Register (or replace) a definition.
    pub fn register(&mut self, agent: AgentDefinition) {
        self.agents.insert(agent.name.clone(), agent);
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.get(name)
    }

    /// All definitions, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.agents.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_allows_every_tool() {
        let registry = AgentRegistry::with_default_agent("claude-sonnet");
        let agent = registry.get("default").unwrap();
        assert!(agent.allows_tool("bash"));
    }

    #[test]
    fn restricted_agent_denies_unlisted_tool() {
        let agent = AgentDefinition::new("reader", "", "m").with_tools(vec!["read_file".into()]);
        assert!(agent.allows_tool("read_file"));
        assert!(!agent.allows_tool("bash"));
    }

    #[test]
    fn unknown_agent_is_none() {
        let registry = AgentRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn plan_kind_is_distinguishable() {
        let agent = AgentDefinition::new("planner", "", "m").as_plan();
        assert_eq!(agent.kind, AgentKind::Plan);
    }
}
