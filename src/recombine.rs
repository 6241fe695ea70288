//! Hypothesis recombination and arc pruning.
//!
//! Two hypotheses over the same span that agree on every word a later
//! n-gram could see are interchangeable for the rest of the search. The
//! better one wins; the loser is kept on the winner's arc list for n-best
//! extraction.

use crate::context::DecodeContext;
use crate::derivation::NodeRef;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

impl DecodeContext<'_> {
    /// Order two hypotheses by the context they expose to enclosing
    /// n-grams. `Equal` means they can be recombined.
    ///
    /// The prefix is ignored when the span starts the sentence, and the
    /// suffix when it ends it.
    pub fn context_compare(&self, a: NodeRef, b: NodeRef) -> Ordering {
        let (a, b) = (&self.nodes[a], &self.nodes[b]);
        let span = a.span();

        if !span.touches_sentence_start() {
            match a.prefix.compare(&b.prefix) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        if !span.touches_sentence_end(self.source_len) {
            return a.suffix.compare(&b.suffix);
        }
        Ordering::Equal
    }

    pub fn context_equivalent(&self, a: NodeRef, b: NodeRef) -> bool {
        self.context_compare(a, b) == Ordering::Equal
    }

    /// Record `loser` as an alternative of `winner`.
    ///
    /// Alternatives the loser had already absorbed move to the winner, so
    /// the winner gains `1 + loser.arcs().len()` arcs.
    pub fn add_arc(&mut self, winner: NodeRef, loser: NodeRef) {
        assert_ne!(winner, loser, "hypothesis recombined with itself");
        let inherited = self.nodes[loser].arcs.take();
        let transferred = inherited.as_ref().map_or(0, Vec::len);

        let node = &mut self.nodes[winner];
        if let Some(arcs) = node.arcs.as_mut() {
            if let Some(inherited) = inherited {
                arcs.extend(inherited);
            }
            arcs.push(loser);
        } else {
            let mut arcs = inherited.unwrap_or_default();
            arcs.push(loser);
            node.arcs = Some(arcs);
        }
        self.stats.recombined += 1;

        let (w, l) = (&self.nodes[winner], &self.nodes[loser]);
        tracing::debug!(
            winner = w.id.as_u32(),
            loser = l.id.as_u32(),
            winner_score = w.total_score,
            loser_score = l.total_score,
            transferred,
            "recombined hypotheses"
        );
    }

    /// Close `node` for recombination: keep at most `n_best_size`
    /// alternatives (all of them when the configuration needs every
    /// one) and point each survivor at `node`.
    ///
    /// Pruned alternatives are released together with their own arcs.
    pub fn finalize_arcs(&mut self, node: NodeRef) {
        self.nodes[node].winner = None;
        let Some(mut arcs) = self.nodes[node].arcs.take() else {
            return;
        };

        let n = self.config.n_best_size;
        if !self.config.needs_all_arcs() && arcs.len() > n {
            let pruned = if n == 0 {
                std::mem::take(&mut arcs)
            } else {
                let nodes = &self.nodes;
                arcs.select_nth_unstable_by_key(n - 1, |&arc| {
                    std::cmp::Reverse(OrderedFloat(nodes[arc].total_score))
                });
                arcs.split_off(n)
            };

            self.stats.arcs_pruned += pruned.len();
            tracing::debug!(
                id = self.nodes[node].id.as_u32(),
                kept = arcs.len(),
                pruned = pruned.len(),
                "pruned arcs"
            );
            for arc in pruned {
                self.release(arc);
            }
        }

        for &arc in &arcs {
            let alt = &mut self.nodes[arc];
            alt.winner = Some(node);
            alt.prefix.clear();
            alt.suffix.clear();
        }
        self.nodes[node].arcs = Some(arcs);
    }

    /// The hypothesis `node` was recombined into, or `node` itself.
    pub fn winning_node(&self, node: NodeRef) -> NodeRef {
        self.nodes[node].winner.unwrap_or(node)
    }

    pub fn arcs(&self, node: NodeRef) -> &[NodeRef] {
        self.nodes[node].arcs()
    }

    /// Destroy `node` and every alternative it owns, transitively.
    ///
    /// Children are not touched: they belong to the cells of their own
    /// spans and may be shared with other hypotheses.
    pub fn release(&mut self, node: NodeRef) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(removed) = self.nodes.remove(next) {
                self.stats.released += 1;
                if let Some(arcs) = removed.arcs {
                    stack.extend(arcs);
                }
            }
        }
    }
}
