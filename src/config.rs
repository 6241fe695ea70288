//! Run configuration consumed by the hypothesis core.

use crate::arena::AllocPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on derivation depth (and so on recursion depth).
pub const DEFAULT_MAX_DERIVATION_DEPTH: usize = 256;

/// Errors from building or loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max_derivation_depth must be at least 1")]
    ZeroDepth,
}

/// Configuration for one decoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Number of alternatives kept per recombined hypothesis.
    pub n_best_size: usize,
    /// Distinct n-best output requested (unique strings).
    pub distinct_n_best: bool,
    /// A minimum-Bayes-risk step consumes the alternatives.
    pub use_mbr: bool,
    /// The full search graph is written out.
    pub output_search_graph: bool,
    /// Deepest derivation accepted before construction fails.
    pub max_derivation_depth: usize,
    /// Recycle freed hypothesis slots.
    pub hypothesis_pool: AllocPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            n_best_size: 0,
            distinct_n_best: false,
            use_mbr: false,
            output_search_graph: false,
            max_derivation_depth: DEFAULT_MAX_DERIVATION_DEPTH,
            hypothesis_pool: AllocPolicy::Fresh,
        }
    }
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: DecoderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_derivation_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }

    /// True when arc lists must be kept whole: pruning to `n_best_size`
    /// could drop candidates needed by distinct n-best, MBR, or the
    /// search graph.
    pub fn needs_all_arcs(&self) -> bool {
        self.distinct_n_best || self.use_mbr || self.output_search_graph
    }
}

/// Builder for [`DecoderConfig`].
#[derive(Debug, Clone, Default)]
pub struct DecoderConfigBuilder {
    config: DecoderConfig,
}

impl DecoderConfigBuilder {
    pub fn n_best_size(mut self, n: usize) -> Self {
        self.config.n_best_size = n;
        self
    }

    pub fn distinct_n_best(mut self, distinct: bool) -> Self {
        self.config.distinct_n_best = distinct;
        self
    }

    pub fn use_mbr(mut self, mbr: bool) -> Self {
        self.config.use_mbr = mbr;
        self
    }

    pub fn output_search_graph(mut self, output: bool) -> Self {
        self.config.output_search_graph = output;
        self
    }

    pub fn max_derivation_depth(mut self, depth: usize) -> Self {
        self.config.max_derivation_depth = depth;
        self
    }

    pub fn hypothesis_pool(mut self, policy: AllocPolicy) -> Self {
        self.config.hypothesis_pool = policy;
        self
    }

    pub fn build(self) -> Result<DecoderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.n_best_size, 0);
        assert!(!config.needs_all_arcs());
        assert_eq!(config.max_derivation_depth, DEFAULT_MAX_DERIVATION_DEPTH);
    }

    #[test]
    fn test_builder() {
        let config = DecoderConfig::builder()
            .n_best_size(100)
            .use_mbr(true)
            .hypothesis_pool(AllocPolicy::Pooled)
            .build()
            .unwrap();

        assert_eq!(config.n_best_size, 100);
        assert!(config.needs_all_arcs());
        assert_eq!(config.hypothesis_pool, AllocPolicy::Pooled);
    }

    #[test]
    fn test_builder_rejects_zero_depth() {
        let result = DecoderConfig::builder().max_derivation_depth(0).build();
        assert!(matches!(result, Err(ConfigError::ZeroDepth)));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            DecoderConfig::from_json_str(r#"{"n_best_size": 5, "hypothesis_pool": "pooled"}"#).unwrap();

        assert_eq!(config.n_best_size, 5);
        assert_eq!(config.hypothesis_pool, AllocPolicy::Pooled);
        assert!(!config.distinct_n_best);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            DecoderConfig::from_json_str("{not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            DecoderConfig::from_json_str(r#"{"max_derivation_depth": 0}"#),
            Err(ConfigError::ZeroDepth)
        ));
    }

    #[test]
    fn test_search_graph_keeps_arcs() {
        let config = DecoderConfig::builder().output_search_graph(true).build().unwrap();
        assert!(config.needs_all_arcs());
    }
}
