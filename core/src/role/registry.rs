use std::sync::Arc;

use serde::Serialize;

use crate::error::CrewError;
use crate::executor::types::TaskLike;

use super::Role;

/// Immutable prompt configuration handed to the generation service.
///
/// Templates are plain records; nothing mutates them after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTemplate {
    pub goal: String,
    pub instructions: String,
    pub expected_output: String,
}

impl PromptTemplate {
    pub fn new(
        goal: impl Into<String>,
        instructions: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            instructions: instructions.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Criteria the critic checks for one role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Rubric {
    pub criteria: Vec<String>,
}

impl Rubric {
    pub fn new<I, S>(criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            criteria: criteria.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Numbered checklist form used inside critique prompts.
    pub fn as_checklist(&self) -> String {
        self.criteria
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the orchestrator knows about a role.
#[derive(Debug, Clone, Serialize)]
pub struct RoleProfile {
    pub role: Role,
    pub template: PromptTemplate,
    pub rubric: Rubric,
    pub dependencies: Vec<Role>,
    /// The synthesis stage runs last and sees every other role's output.
    pub synthesis: bool,
}

impl RoleProfile {
    pub fn new(role: Role, template: PromptTemplate, rubric: Rubric) -> Self {
        Self {
            role,
            template,
            rubric,
            dependencies: Vec::new(),
            synthesis: false,
        }
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = Role>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn as_synthesis(mut self) -> Self {
        self.synthesis = true;
        self
    }
}

impl TaskLike for Arc<RoleProfile> {
    fn role(&self) -> Role {
        self.role
    }

    fn dependencies(&self) -> &[Role] {
        &self.dependencies
    }
}

/// Registration table mapping each role to its profile.
///
/// Registration order is kept and used as the stable tie-break for
/// scheduling order.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    profiles: Vec<Arc<RoleProfile>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, profile: RoleProfile) -> Result<Self, CrewError> {
        if !profile.role.is_schedulable() {
            return Err(CrewError::InvalidRole(profile.role));
        }
        if self.get(profile.role).is_some() {
            return Err(CrewError::DuplicateRole(profile.role));
        }
        if profile.synthesis {
            if let Some(existing) = self.synthesis_role() {
                return Err(CrewError::Config(format!(
                    "synthesis role already registered: {existing}"
                )));
            }
        }
        self.profiles.push(Arc::new(profile));
        Ok(self)
    }

    pub fn get(&self, role: Role) -> Option<&Arc<RoleProfile>> {
        self.profiles.iter().find(|p| p.role == role)
    }

    pub fn profiles(&self) -> &[Arc<RoleProfile>] {
        &self.profiles
    }

    pub fn roles(&self) -> Vec<Role> {
        self.profiles.iter().map(|p| p.role).collect()
    }

    pub fn synthesis_role(&self) -> Option<Role> {
        self.profiles.iter().find(|p| p.synthesis).map(|p| p.role)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// The five-role equity research crew: three independent analysts, a
    /// fundamental strategist fed by the quant, and the CIO synthesis.
    pub fn standard() -> Self {
        let profiles = [
            RoleProfile::new(
                Role::Macro,
                PromptTemplate::new(
                    "Analyze the macro-economic cycle and news sentiment as it affects the company.",
                    "Cover each PESTLE category with company-specific evidence, then give a Macro Headwind Score from 0 to 10.",
                    "Structured PESTLE analysis and a numerical headwind score.",
                ),
                Rubric::new([
                    "Macro risks are specific to the company, not generic industry commentary",
                    "Every PESTLE category is covered with a concrete example",
                    "The Macro Headwind Score is justified with evidence",
                    "Trade, interest-rate and regulatory exposure are addressed",
                ]),
            ),
            RoleProfile::new(
                Role::Quant,
                PromptTemplate::new(
                    "Retrieve accurate, up-to-date financial metrics.",
                    "Report current ratios, revenue CAGR, the three-year margin trend and free cash flow. State 'Data Unavailable' instead of guessing.",
                    "JSON summary of current metrics and historical trends.",
                ),
                Rubric::new([
                    "P/E, margins, free cash flow and revenue growth are all present",
                    "At least three years of history are included",
                    "CAGR and margin calculations are shown",
                    "Missing data is flagged as 'Data Unavailable'",
                ]),
            ),
            RoleProfile::new(
                Role::Technical,
                PromptTemplate::new(
                    "Analyze price trends.",
                    "Combine current indicators (RSI, moving averages) with one year of price history, the largest monthly drop and the distance to the 52-week range.",
                    "Technical report with support/resistance, RSI and one-year trend.",
                ),
                Rubric::new([
                    "Support and resistance levels are given",
                    "RSI is interpreted",
                    "One-year trend context is provided",
                    "52-week high and low are referenced",
                ]),
            ),
            RoleProfile::new(
                Role::Fundamental,
                PromptTemplate::new(
                    "Analyze the company's competitive moat and risks.",
                    "Link the quantitative analyst's margins and growth figures to risk factors and competition described in the annual filing. Never invent risk factors.",
                    "Strategic analysis linking financial ratios to text-based risks.",
                ),
                Rubric::new([
                    "Filing risk factors are cited specifically",
                    "Financial metrics are linked to qualitative risks",
                    "Competitive positioning and moat are discussed",
                ]),
            )
            .depends_on([Role::Quant]),
            RoleProfile::new(
                Role::Synthesis,
                PromptTemplate::new(
                    "Synthesize a final Buy/Sell/Hold recommendation.",
                    "Write the investment memo from the analyst sections only. Give position, conviction score out of 10, kill switch price and rationale, then the executive summary, per-analyst sections, scenario analysis, actionable takeaways and data caveats.",
                    "Final investment memo.",
                ),
                Rubric::new([
                    "A clear Buy/Sell/Hold recommendation is stated",
                    "Conviction score (0-10) is provided with justification",
                    "Kill switch price and its methodology are specified",
                    "All four analyst inputs are synthesized",
                    "Data gaps and caveats are acknowledged, including sections that were never approved",
                ]),
            )
            .depends_on([Role::Macro, Role::Quant, Role::Technical, Role::Fundamental])
            .as_synthesis(),
        ];

        Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
        }
    }
}
