use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed set of agent task archetypes. Every routing plan assigns a model to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// Primary decision-making role that plans and delegates
    Orchestrator,
    /// Deep reasoning and architecture review
    Oracle,
    /// Documentation and external research
    Librarian,
    /// Fast codebase exploration
    Explorer,
    /// UI and frontend work
    Designer,
    /// Focused code fixing
    Fixer,
}

/// How strongly a role weights each capability relative to cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    pub reasoning: f64,
    pub tool_calling: f64,
    pub attachments: f64,
    pub context: f64,
    /// Share of the base score given to capability fit (rest goes to cost), 0.0-1.0
    pub capability_emphasis: f64,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Orchestrator,
        AgentRole::Oracle,
        AgentRole::Librarian,
        AgentRole::Explorer,
        AgentRole::Designer,
        AgentRole::Fixer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "orchestrator",
            AgentRole::Oracle => "oracle",
            AgentRole::Librarian => "librarian",
            AgentRole::Explorer => "explorer",
            AgentRole::Designer => "designer",
            AgentRole::Fixer => "fixer",
        }
    }

    /// Whether this is the primary decision-making role.
    pub fn is_primary(&self) -> bool {
        matches!(self, AgentRole::Orchestrator)
    }

    pub fn profile(&self) -> RoleProfile {
        match self {
            AgentRole::Orchestrator => RoleProfile {
                reasoning: 0.4,
                tool_calling: 0.4,
                attachments: 0.05,
                context: 0.15,
                capability_emphasis: 0.7,
            },
            AgentRole::Oracle => RoleProfile {
                reasoning: 0.65,
                tool_calling: 0.1,
                attachments: 0.05,
                context: 0.2,
                capability_emphasis: 0.8,
            },
            AgentRole::Librarian => RoleProfile {
                reasoning: 0.15,
                tool_calling: 0.45,
                attachments: 0.1,
                context: 0.3,
                capability_emphasis: 0.4,
            },
            AgentRole::Explorer => RoleProfile {
                reasoning: 0.1,
                tool_calling: 0.6,
                attachments: 0.0,
                context: 0.3,
                capability_emphasis: 0.35,
            },
            AgentRole::Designer => RoleProfile {
                reasoning: 0.2,
                tool_calling: 0.3,
                attachments: 0.4,
                context: 0.1,
                capability_emphasis: 0.55,
            },
            AgentRole::Fixer => RoleProfile {
                reasoning: 0.35,
                tool_calling: 0.5,
                attachments: 0.0,
                context: 0.15,
                capability_emphasis: 0.6,
            },
        }
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orchestrator" => Ok(AgentRole::Orchestrator),
            "oracle" => Ok(AgentRole::Oracle),
            "librarian" => Ok(AgentRole::Librarian),
            "explorer" => Ok(AgentRole::Explorer),
            "designer" => Ok(AgentRole::Designer),
            "fixer" => Ok(AgentRole::Fixer),
            _ => Err(format!("Unknown agent role: {}", s)),
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
