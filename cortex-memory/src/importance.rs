//! Scoring how worth remembering a piece of content is.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::MemoryError;

/// Context passed alongside content being scored. Reserved for future
/// signals (thread history, agent profile); currently carries nothing an
/// evaluator can't derive from the content itself, but keeping it in the
/// signature avoids a breaking change the day that's no longer true.
#[derive(Debug, Clone, Default)]
pub struct ImportanceContext {
    /// Free-form hint from the caller, e.g. the kind of turn this content
    /// came from ("user_message", "tool_result", ...).
    pub hint: Option<String>,
}

/// Scores content on `[0, 1]`: how important is this to remember.
#[async_trait]
pub trait ImportanceEvaluator: Send + Sync {
    /// Compute an importance score, clamped to `[0, 1]` by the caller.
    async fn evaluate(&self, content: &str, ctx: &ImportanceContext) -> Result<f32, MemoryError>;
}

struct Signal {
    pattern: &'static Regex,
    weight: f32,
}

static PERSONAL_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(my name is|i live in|i work at|my email|my phone|born on)\b").unwrap()
});
static INSTRUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(please|remember to|always|never|make sure|don't forget)\b").unwrap()
});
static FACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(is|are|was|were|means|refers to)\b").unwrap());
static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").unwrap());
static EMOTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(love|hate|happy|sad|angry|excited|worried|afraid)\b").unwrap()
});
static QUESTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Default evaluator: a base of 0.5 adjusted by regex-detected signals.
///
/// Signals, applied independently (any subset may fire): personal info
/// `+0.25`, instructions `+0.20`, facts `+0.10`, proper names `+0.10`,
/// emotions/questions/numbers `+0.05` each, content under 20 characters
/// `-0.10`, content over 200 characters `+0.05`. Result is clamped to
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEvaluator;

impl RuleBasedEvaluator {
    fn signals() -> [Signal; 7] {
        [
            Signal {
                pattern: &PERSONAL_INFO,
                weight: 0.25,
            },
            Signal {
                pattern: &INSTRUCTION,
                weight: 0.20,
            },
            Signal {
                pattern: &FACT,
                weight: 0.10,
            },
            Signal {
                pattern: &NAME,
                weight: 0.10,
            },
            Signal {
                pattern: &EMOTION,
                weight: 0.05,
            },
            Signal {
                pattern: &QUESTION,
                weight: 0.05,
            },
            Signal {
                pattern: &NUMBER,
                weight: 0.05,
            },
        ]
    }

    /// Synchronous scoring, usable outside an async context (tests, the
    /// hybrid evaluator's fallback path).
    pub fn score(content: &str) -> f32 {
        let mut score = 0.5;
        for signal in Self::signals() {
            if signal.pattern.is_match(content) {
                score += signal.weight;
            }
        }
        if content.len() < 20 {
            score -= 0.10;
        } else if content.len() > 200 {
            score += 0.05;
        }
        score.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl ImportanceEvaluator for RuleBasedEvaluator {
    async fn evaluate(&self, content: &str, _ctx: &ImportanceContext) -> Result<f32, MemoryError> {
        Ok(Self::score(content))
    }
}

/// Blends a pluggable LLM-based evaluator with the rule-based one.
///
/// `llm_weight` is the LLM evaluator's share of the final score (default
/// 0.7); the remainder goes to [`RuleBasedEvaluator`]. If the LLM
/// evaluator errors, the blend falls back to the rule score alone rather
/// than failing `remember`.
pub struct HybridEvaluator {
    llm: Box<dyn ImportanceEvaluator>,
    llm_weight: f32,
}

impl HybridEvaluator {
    /// Build a hybrid evaluator, clamping `llm_weight` to `[0, 1]`.
    pub fn new(llm: Box<dyn ImportanceEvaluator>, llm_weight: f32) -> Self {
        HybridEvaluator {
            llm,
            llm_weight: llm_weight.clamp(0.0, 1.0),
        }
    }

    /// Convenience constructor matching the default weight named in the
    /// memory manager's contract.
    pub fn with_default_weight(llm: Box<dyn ImportanceEvaluator>) -> Self {
        Self::new(llm, 0.7)
    }
}

#[async_trait]
impl ImportanceEvaluator for HybridEvaluator {
    async fn evaluate(&self, content: &str, ctx: &ImportanceContext) -> Result<f32, MemoryError> {
        let rule_score = RuleBasedEvaluator::score(content);
        match self.llm.evaluate(content, ctx).await {
            Ok(llm_score) => {
                Ok(self.llm_weight * llm_score + (1.0 - self.llm_weight) * rule_score)
            }
            Err(err) => {
                tracing::warn!(error = %err, "llm importance evaluator failed, falling back to rule-based score");
                Ok(rule_score)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn baseline_is_half() {
        let ctx = ImportanceContext::default();
        let score = RuleBasedEvaluator.evaluate("xyz abc qqq", &ctx).await.unwrap();
        assert!((score - 0.5).abs() < 0.01);
    }

    #[tokio::test]
    async fn personal_info_raises_score() {
        let ctx = ImportanceContext::default();
        let score = RuleBasedEvaluator
            .evaluate("My name is Alex Rivera and I live in Austin", &ctx)
            .await
            .unwrap();
        assert!(score > 0.8, "score was {score}");
    }

    #[tokio::test]
    async fn short_content_is_penalized() {
        let ctx = ImportanceContext::default();
        let score = RuleBasedEvaluator.evaluate("ok", &ctx).await.unwrap();
        assert!(score < 0.5);
    }

    #[test]
    fn score_never_exceeds_bounds() {
        let s = RuleBasedEvaluator::score(
            "My name is Jordan Lee, please always remember my email is important. Is it 123? I love this!",
        );
        assert!((0.0..=1.0).contains(&s));
    }

    struct FailingLlm;

    #[async_trait]
    impl ImportanceEvaluator for FailingLlm {
        async fn evaluate(&self, _content: &str, _ctx: &ImportanceContext) -> Result<f32, MemoryError> {
            let err: Box<dyn std::error::Error + Send + Sync> =
                std::io::Error::other("llm down").into();
            Err(MemoryError::Other(err))
        }
    }

    #[tokio::test]
    async fn hybrid_falls_back_to_rule_score_on_llm_failure() {
        let hybrid = HybridEvaluator::with_default_weight(Box::new(FailingLlm));
        let ctx = ImportanceContext::default();
        let fallback = hybrid.evaluate("some plain content here", &ctx).await.unwrap();
        let rule = RuleBasedEvaluator::score("some plain content here");
        assert!((fallback - rule).abs() < 0.001);
    }

    struct FixedLlm(f32);

    #[async_trait]
    impl ImportanceEvaluator for FixedLlm {
        async fn evaluate(&self, _content: &str, _ctx: &ImportanceContext) -> Result<f32, MemoryError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn hybrid_blends_llm_and_rule_scores() {
        let hybrid = HybridEvaluator::new(Box::new(FixedLlm(1.0)), 0.5);
        let ctx = ImportanceContext::default();
        let blended = hybrid.evaluate("xyz abc qqq", &ctx).await.unwrap();
        // rule score for this content is 0.5, llm says 1.0, 0.5 weight each
        assert!((blended - 0.75).abs() < 0.01);
    }
}
