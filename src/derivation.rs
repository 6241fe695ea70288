//! Derivation nodes (hypotheses) and their construction.
//!
//! A node is one rule application over a source span whose non-terminal
//! slots are filled by previously built nodes. Children are shared between
//! many parents and are referenced by arena handle, never owned. A node
//! owns only the list of alternatives recombined into it.

use crate::arena::Key;
use crate::context::DecodeContext;
use crate::features::FeatureScoreVector;
use crate::phrase::BoundaryPhrase;
use crate::rule::{RuleApplication, SourceSpan, TargetSymbol};
use crate::vocab::WordId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Handle to a node in a sentence's arena.
pub type NodeRef = Key<DerivationNode>;

/// Creation-order identifier, unique within one sentence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from building a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("derivation depth {depth} exceeds the limit of {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// One hypothesis in the derivation forest.
#[derive(Debug)]
pub struct DerivationNode {
    pub(crate) id: NodeId,
    pub(crate) rule: Arc<RuleApplication>,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) terminal_count: usize,
    pub(crate) depth: usize,
    pub(crate) prefix: BoundaryPhrase,
    pub(crate) suffix: BoundaryPhrase,
    pub(crate) scores: FeatureScoreVector,
    /// Provisional score of the words without full left context.
    pub(crate) lm_estimate: FeatureScoreVector,
    /// Score of every fully contexted n-gram inside the yield.
    pub(crate) lm_ngram: FeatureScoreVector,
    pub(crate) total_score: f64,
    pub(crate) scored: bool,
    pub(crate) arcs: Option<Vec<NodeRef>>,
    /// `None` while the node is its own winner.
    pub(crate) winner: Option<NodeRef>,
}

impl DerivationNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn rule(&self) -> &RuleApplication {
        &self.rule
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn span(&self) -> SourceSpan {
        self.rule.span()
    }

    /// Number of target words in the whole subtree.
    pub fn terminal_count(&self) -> usize {
        self.terminal_count
    }

    /// 1 for a node without children.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn boundary_prefix(&self) -> &BoundaryPhrase {
        &self.prefix
    }

    pub fn boundary_suffix(&self) -> &BoundaryPhrase {
        &self.suffix
    }

    pub fn score_vector(&self) -> &FeatureScoreVector {
        &self.scores
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn is_scored(&self) -> bool {
        self.scored
    }

    /// Alternatives recombined into this node.
    pub fn arcs(&self) -> &[NodeRef] {
        self.arcs.as_deref().unwrap_or(&[])
    }
}

impl<'a> DecodeContext<'a> {
    /// Build a node from a rule application and one child per
    /// non-terminal slot (in slot order).
    ///
    /// Children must already be built. The node is not scored; call
    /// [`DecodeContext::compute_score`] once its children are scored.
    pub fn create_node(
        &mut self,
        rule: Arc<RuleApplication>,
        children: Vec<NodeRef>,
    ) -> Result<NodeRef, DerivationError> {
        assert_eq!(
            rule.target().len(),
            rule.alignment().len(),
            "target phrase length must equal alignment length"
        );
        assert_eq!(
            children.len(),
            rule.arity(),
            "rule with {} non-terminals given {} children",
            rule.arity(),
            children.len()
        );

        let mut terminal_count = rule.target().num_terminals();
        let mut depth = 1;
        for &child in &children {
            let child = &self.nodes[child];
            debug_assert!(rule.span().contains(&child.span()));
            terminal_count += child.terminal_count;
            depth = depth.max(child.depth + 1);
        }

        let limit = self.config.max_derivation_depth;
        if depth > limit {
            return Err(DerivationError::TooDeep { depth, limit });
        }

        let size = self.system.boundary_size();
        let mut prefix = BoundaryPhrase::with_capacity(size);
        self.walk_prefix(&rule, &children, &mut prefix, size);
        let mut suffix = BoundaryPhrase::with_capacity(size);
        self.walk_suffix(&rule, &children, terminal_count, &prefix, &mut suffix, size);

        let bound = size.min(terminal_count);
        assert!(
            prefix.len() <= bound && suffix.len() <= bound,
            "boundary phrases ({}, {}) exceed min(order - 1, terminals) = {}",
            prefix.len(),
            suffix.len(),
            bound
        );

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.stats.created += 1;

        tracing::trace!(
            id = id.0,
            span = %rule.span(),
            terminals = terminal_count,
            depth,
            "created hypothesis"
        );

        Ok(self.nodes.alloc(DerivationNode {
            id,
            rule,
            children,
            terminal_count,
            depth,
            prefix,
            suffix,
            scores: FeatureScoreVector::new(),
            lm_estimate: FeatureScoreVector::new(),
            lm_ngram: FeatureScoreVector::new(),
            total_score: 0.0,
            scored: false,
            arcs: None,
            winner: None,
        }))
    }

    /// Append up to `budget` leading words of the yield to `out`.
    ///
    /// Returns the unused budget.
    fn walk_prefix(
        &self,
        rule: &RuleApplication,
        children: &[NodeRef],
        out: &mut BoundaryPhrase,
        mut budget: usize,
    ) -> usize {
        for (pos, symbol) in rule.target().symbols().iter().enumerate() {
            if budget == 0 {
                break;
            }
            match *symbol {
                TargetSymbol::Word(word) => {
                    out.push_back(word);
                    budget -= 1;
                }
                TargetSymbol::NonTerminal(_) => {
                    let child = &self.nodes[children[rule.child_slot(pos)]];
                    budget = self.walk_prefix(&child.rule, &child.children, out, budget);
                }
            }
        }
        budget
    }

    /// Prepend up to `budget` trailing words of the yield to `out`.
    ///
    /// `prefix` must already be computed: when it holds the whole yield
    /// the suffix is copied from it instead of walking the rule.
    fn walk_suffix(
        &self,
        rule: &RuleApplication,
        children: &[NodeRef],
        terminal_count: usize,
        prefix: &BoundaryPhrase,
        out: &mut BoundaryPhrase,
        mut budget: usize,
    ) -> usize {
        assert!(prefix.len() <= terminal_count);

        if prefix.len() == terminal_count {
            let take = prefix.len().min(budget);
            for &word in prefix.words()[prefix.len() - take..].iter().rev() {
                out.push_front(word);
            }
            return budget - take;
        }

        for (pos, symbol) in rule.target().symbols().iter().enumerate().rev() {
            if budget == 0 {
                break;
            }
            match *symbol {
                TargetSymbol::Word(word) => {
                    out.push_front(word);
                    budget -= 1;
                }
                TargetSymbol::NonTerminal(_) => {
                    let child = &self.nodes[children[rule.child_slot(pos)]];
                    budget = self.walk_suffix(
                        &child.rule,
                        &child.children,
                        child.terminal_count,
                        &child.prefix,
                        out,
                        budget,
                    );
                }
            }
        }
        budget
    }

    /// The full target string of `node`'s subtree.
    pub fn materialize_output(&self, node: NodeRef) -> Vec<WordId> {
        let mut out = Vec::with_capacity(self.nodes[node].terminal_count);
        self.append_output(node, &mut out);
        out
    }

    fn append_output(&self, node: NodeRef, out: &mut Vec<WordId>) {
        let node = &self.nodes[node];
        for (pos, symbol) in node.rule.target().symbols().iter().enumerate() {
            match *symbol {
                TargetSymbol::Word(word) => out.push(word),
                TargetSymbol::NonTerminal(_) => {
                    self.append_output(node.children[node.rule.child_slot(pos)], out)
                }
            }
        }
    }

    /// The full target string as text.
    pub fn output_string(&self, node: NodeRef) -> String {
        self.system.vocab.render(&self.materialize_output(node))
    }

    pub fn total_score(&self, node: NodeRef) -> f64 {
        self.nodes[node].total_score
    }

    pub fn score_vector(&self, node: NodeRef) -> &FeatureScoreVector {
        &self.nodes[node].scores
    }

    pub fn boundary_prefix(&self, node: NodeRef) -> &BoundaryPhrase {
        &self.nodes[node].prefix
    }

    pub fn boundary_suffix(&self, node: NodeRef) -> &BoundaryPhrase {
        &self.nodes[node].suffix
    }

    /// Single-line rendering: id, rule target, span, child ids, total
    /// score, and the feature breakdown.
    pub fn display(&self, node: NodeRef) -> NodeDisplay<'_, 'a> {
        NodeDisplay { ctx: self, node }
    }
}

/// Display adapter returned by [`DecodeContext::display`].
pub struct NodeDisplay<'c, 'a> {
    ctx: &'c DecodeContext<'a>,
    node: NodeRef,
}

impl fmt::Display for NodeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let system = self.ctx.system;
        let node = self.ctx.node(self.node);

        write!(
            f,
            " {} {} {}",
            node.id,
            node.rule.target().display(&system.vocab),
            node.span()
        )?;
        for &child in &node.children {
            write!(f, " {}", self.ctx.node(child).id)?;
        }
        write!(
            f,
            " [total={}] {}",
            node.total_score,
            node.scores.display(&system.features)
        )
    }
}
