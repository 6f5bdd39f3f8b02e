//! Offline services for demos and troubleshooting without network access.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use crew_core::api::{
    CritiqueRequest, CritiqueService, GenerationRequest, GenerationService, Role, ServiceError,
    Verdict,
};

/// Produces a canned section per role, and a canned memo for synthesis.
#[derive(Debug, Clone, Default)]
pub struct MockGenerationService {
    latency: Option<Duration>,
}

impl MockGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated per-call latency, so progress output has something to show.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

fn canned_section(role: Role, ticker: &str) -> String {
    match role {
        Role::Macro => format!(
            "Macro & Sentiment\n- Macro Headwind Score: 3/10\n- Inflation is cooling, which is good for the sector.\n- Consumer sentiment around {ticker} is rising."
        ),
        Role::Quant => format!(
            "Quantitative Snapshot ({ticker})\n- Revenue: $10B (Up 15% YoY)\n- Gross Margin: 45% (Expanding)\n- P/E Ratio: 25x\n- FCF: Positive and growing."
        ),
        Role::Technical => format!(
            "Technical Analysis ({ticker})\n- Current Price: 120.00\n- Trend: Bullish\n- Key Levels: Support at 110, Resistance at 130.\n- RSI: 60 (Neutral)"
        ),
        Role::Fundamental => format!(
            "Fundamental Analysis ({ticker})\n- Strong competitive moat due to network effects.\n- Risks include regulatory changes and new entrants.\n- Margin expansion supports the strategic focus on AI integration."
        ),
        Role::Synthesis | Role::Manager => format!(
            "Recommendation
- Position: Buy
- Conviction Score: 8/10
- Kill Switch Price: 100.00
- Rationale: Strong growth potential and solid fundamentals.

Executive Summary
{ticker} is showing strong signs of growth. The company has a solid balance sheet and is well-positioned in the market.

Scenario Analysis
- Base Case: $140 (60% prob)
- Bull Case: $160 (20% prob)
- Bear Case: $90 (20% prob)
- Expected Return: +15%

Actionable Takeaways
- Enter at current levels.
- Size position at 2% of portfolio.
- Watch for next earnings report.

Data Caveats
- Mock data: no live market data was used."
        ),
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    fn name(&self) -> &str {
        "mock-generation"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, ServiceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut out = canned_section(request.role, request.ticker);
        if request.attempt > 1 {
            out.push_str(&format!(
                "\n\n(Revision {} incorporating manager feedback.)",
                request.attempt
            ));
        }
        Ok(out)
    }
}

/// Approves everything except the first attempt of selected roles.
#[derive(Debug, Clone, Default)]
pub struct MockCritiqueService {
    reject_first: HashSet<Role>,
}

impl MockCritiqueService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_first_attempt(mut self, role: Role) -> Self {
        self.reject_first.insert(role);
        self
    }
}

#[async_trait]
impl CritiqueService for MockCritiqueService {
    fn name(&self) -> &str {
        "mock-critique"
    }

    async fn critique(&self, request: CritiqueRequest<'_>) -> Result<Verdict, ServiceError> {
        if request.attempt == 1 && self.reject_first.contains(&request.role) {
            let first = request
                .rubric
                .criteria
                .first()
                .cloned()
                .unwrap_or_else(|| "Cover every rubric criterion".to_string());
            return Ok(Verdict::reject([format!("Missing: {first}")]));
        }
        Ok(Verdict::approve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_core::api::{PromptTemplate, Rubric};

    #[tokio::test]
    async fn test_mock_generation_marks_revisions() {
        let service = MockGenerationService::new();
        let template = PromptTemplate::new("g", "i", "o");
        let request = |attempt| GenerationRequest {
            role: Role::Synthesis,
            ticker: "TSLA",
            template: &template,
            context: "",
            attempt,
        };

        let first = service.generate(request(1)).await.unwrap();
        assert!(first.contains("Conviction Score: 8/10"));
        assert!(first.contains("TSLA is showing strong signs of growth"));
        assert!(!first.contains("Revision"));

        let second = service.generate(request(2)).await.unwrap();
        assert!(second.contains("(Revision 2 incorporating manager feedback.)"));
    }

    #[tokio::test]
    async fn test_mock_critique_rejects_first_attempt_only() {
        let service = MockCritiqueService::new().reject_first_attempt(Role::Quant);
        let rubric = Rubric::new(["P/E present"]);
        let request = |role, attempt| CritiqueRequest {
            role,
            ticker: "TSLA",
            output: "x",
            rubric: &rubric,
            attempt,
        };

        let verdict = service.critique(request(Role::Quant, 1)).await.unwrap();
        assert!(!verdict.approved());
        assert_eq!(verdict.feedback(), &["Missing: P/E present".to_string()]);

        assert!(service.critique(request(Role::Quant, 2)).await.unwrap().approved());
        assert!(service.critique(request(Role::Macro, 1)).await.unwrap().approved());
    }
}
