//! Token-budget selection (§4.6 "Tier selection"). A pure function of
//! (completion-token-budget vs legacy, requested) so it is trivially unit
//! testable without an HTTP round trip.

/// The wire-level token-budget field to send, resolved from whether the
/// target model uses the legacy `max_tokens` field or the newer
/// "completion token" budget that reasoning models require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBudget {
    /// Legacy models: pass `requested` through verbatim as `max_tokens`.
    MaxTokens(u32),
    /// Completion-token-budget models (including reasoning models):
    /// `max(4000, requested * k)` where `k = 30` if `requested <= 50`,
    /// else `15` (§4.6).
    MaxCompletionTokens(u32),
}

impl TokenBudget {
    pub fn value(self) -> u32 {
        match self {
            TokenBudget::MaxTokens(v) | TokenBudget::MaxCompletionTokens(v) => v,
        }
    }
}

/// Compute the token budget to send for a request, per §4.6.
pub fn token_budget(completion_token_budget: bool, requested: u32) -> TokenBudget {
    if !completion_token_budget {
        return TokenBudget::MaxTokens(requested);
    }
    let k = if requested <= 50 { 30 } else { 15 };
    TokenBudget::MaxCompletionTokens((4000).max(requested.saturating_mul(k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_models_pass_requested_verbatim() {
        assert_eq!(token_budget(false, 800), TokenBudget::MaxTokens(800));
    }

    #[test]
    fn small_requests_use_k_30_and_floor_at_4000() {
        assert_eq!(token_budget(true, 10), TokenBudget::MaxCompletionTokens(4000));
        assert_eq!(token_budget(true, 50), TokenBudget::MaxCompletionTokens(4000));
    }

    #[test]
    fn larger_requests_use_k_15() {
        assert_eq!(token_budget(true, 1000), TokenBudget::MaxCompletionTokens(15_000));
    }

    #[test]
    fn the_4000_floor_always_wins_for_tiny_requests() {
        assert_eq!(token_budget(true, 1), TokenBudget::MaxCompletionTokens(4000));
    }
}
