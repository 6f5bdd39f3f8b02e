//! Analyst roles and their registration table.
//!
//! Roles form a closed set. Everything a role needs at run time (prompt
//! template, rubric, declared dependencies) is looked up through
//! [`RoleRegistry`] rather than by string key.

mod registry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrewError;

pub use registry::{PromptTemplate, RoleProfile, RoleRegistry, Rubric};

/// A fixed analytical persona.
///
/// Declaration order is the canonical role order: synthesis context and
/// reports list roles in this order so comparative runs are reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Macro,
    Quant,
    Technical,
    /// Cross-references quantitative output against filing text.
    Fundamental,
    /// Chief Investment Officer; writes the final memo.
    Synthesis,
    /// The critic. Reviews other roles, never scheduled as a task itself.
    Manager,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Macro,
        Role::Quant,
        Role::Technical,
        Role::Fundamental,
        Role::Synthesis,
        Role::Manager,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Macro => "macro",
            Role::Quant => "quant",
            Role::Technical => "technical",
            Role::Fundamental => "fundamental",
            Role::Synthesis => "synthesis",
            Role::Manager => "manager",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Macro => "Macro & Sentiment Analyst",
            Role::Quant => "Quantitative Analyst",
            Role::Technical => "Technical Analyst",
            Role::Fundamental => "Fundamental Strategist",
            Role::Synthesis => "Chief Investment Officer",
            Role::Manager => "Research Manager",
        }
    }

    /// Whether the role can own a task in a run.
    pub fn is_schedulable(self) -> bool {
        !matches!(self, Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| {
                role.as_str().eq_ignore_ascii_case(needle)
                    || role.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| CrewError::Config(format!("unknown role: {needle}")))
    }
}
