//! Prompt text sent to the explanation provider

use crate::models::{Metric, PeriodToken};

/// System prompt for the semantic route
pub const EXPLANATION_SYSTEM_PROMPT: &str = r#"You are a financial analyst assistant for an FP&A team.

Guidelines:
- Explain the verified figure you are given in two to four sentences
- Use only the figures stated in the prompt; never introduce, estimate or compute other numbers
- If the figure is not available, say so plainly
- Answer in the same language as the user's question"#;

/// System prompt for the documental route
pub const CHAT_SYSTEM_PROMPT: &str = r#"You are a helpful corporate assistant.

Guidelines:
- Answer concisely and professionally
- If the question needs internal documents you do not have, say so instead of guessing
- Answer in the same language as the user's question"#;

/// User prompt for a looked-up metric. Built only from the query and the
/// verified value; `formatted` is "not available" when the store has none.
pub fn build_explanation_prompt(
    query: &str,
    metric: Metric,
    period: PeriodToken,
    formatted: &str,
) -> String {
    format!(
        "Question: {}\nMetric: {}\nPeriod: {}\nVerified value: {}\n\n\
         Explain this result to the user. Do not mention any figure other than the verified value above.",
        query.trim(),
        metric.label(),
        period.label(),
        formatted
    )
}

pub fn welcome_message() -> &'static str {
    r#"# 🎯 SDRAG - Hybrid RAG Assistant

**Financial analytics with deterministic execution**

- ✅ **No arithmetic hallucinations**: every figure comes from the semantic layer
- ✅ **Full traceability**: visible SQL and auditable steps
- ✅ **Reproducibility**: same input, same output

**Example queries**:
- "¿Cuál fue el revenue del Q4 2024?"
- "¿Cuál es el margen bruto del Q3 2024?"
- "Show me EBITDA for 2023""#
}
