use crate::{
    chat::ChatProvider,
    resilient_llm::{ResilienceConfig, ResilientLLM},
};

use super::super::state::BuilderState;

pub(super) fn wrap_with_resilience(
    state: &mut BuilderState,
    provider: Box<dyn ChatProvider>,
) -> Box<dyn ChatProvider> {
    if !state.resilient_enable.unwrap_or(false) {
        return provider;
    }

    let mut cfg = ResilienceConfig::defaults();
    if let Some(attempts) = state.resilient_attempts {
        cfg.max_attempts = attempts;
    }
    if let Some(base) = state.resilient_base_delay_ms {
        cfg.base_delay_ms = base;
    }
    if let Some(maxd) = state.resilient_max_delay_ms {
        cfg.max_delay_ms = maxd;
    }
    if let Some(jitter) = state.resilient_jitter {
        cfg.jitter = jitter;
    }
    Box::new(ResilientLLM::new(provider, cfg))
}
