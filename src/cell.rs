//! Chart cells: the recombined hypotheses of each source span.
//!
//! A cell keeps its hypotheses sorted by [`DecodeContext::context_compare`],
//! so an incoming hypothesis finds the one it recombines with by binary
//! search. Each cell owns its hypotheses; releasing a cell releases them
//! together with their arcs.

use crate::context::DecodeContext;
use crate::derivation::NodeRef;
use crate::rule::SourceSpan;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Outcome of [`ChartCell::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellInsert {
    /// No equivalent hypothesis was present.
    Added(NodeRef),
    /// The pair was recombined; `loser` is now an arc of `winner`.
    Recombined { winner: NodeRef, loser: NodeRef },
}

/// Hypotheses over one span.
#[derive(Debug)]
pub struct ChartCell {
    span: SourceSpan,
    hypotheses: Vec<NodeRef>,
    finalized: bool,
}

impl ChartCell {
    pub fn new(span: SourceSpan) -> Self {
        ChartCell {
            span,
            hypotheses: Vec::new(),
            finalized: false,
        }
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    /// Add a scored hypothesis, recombining it with an equivalent one if
    /// present. On a score tie the hypothesis already in the cell wins.
    pub fn add(&mut self, ctx: &mut DecodeContext<'_>, node: NodeRef) -> CellInsert {
        assert!(!self.finalized, "hypothesis added to finalized cell {}", self.span);
        let n = ctx.node(node);
        assert!(n.is_scored(), "hypothesis {} added before scoring", n.id());
        assert_eq!(n.span(), self.span, "hypothesis span does not match its cell");

        match self
            .hypotheses
            .binary_search_by(|&h| ctx.context_compare(h, node))
        {
            Ok(i) => {
                let incumbent = self.hypotheses[i];
                if ctx.total_score(node) > ctx.total_score(incumbent) {
                    self.hypotheses[i] = node;
                    ctx.add_arc(node, incumbent);
                    CellInsert::Recombined {
                        winner: node,
                        loser: incumbent,
                    }
                } else {
                    ctx.add_arc(incumbent, node);
                    CellInsert::Recombined {
                        winner: incumbent,
                        loser: node,
                    }
                }
            }
            Err(i) => {
                self.hypotheses.insert(i, node);
                CellInsert::Added(node)
            }
        }
    }

    /// Prune every hypothesis' arcs and order the hypotheses best first.
    ///
    /// Must be called before any hypothesis of this cell becomes a child.
    pub fn finalize(&mut self, ctx: &mut DecodeContext<'_>) {
        if self.finalized {
            return;
        }
        for &h in &self.hypotheses {
            ctx.finalize_arcs(h);
        }
        self.hypotheses
            .sort_by_key(|&h| std::cmp::Reverse(OrderedFloat(ctx.total_score(h))));
        self.finalized = true;

        tracing::debug!(
            span = %self.span,
            hypotheses = self.hypotheses.len(),
            "finalized cell"
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Highest scoring hypothesis.
    pub fn best(&self, ctx: &DecodeContext<'_>) -> Option<NodeRef> {
        self.hypotheses
            .iter()
            .copied()
            .max_by_key(|&h| OrderedFloat(ctx.total_score(h)))
    }

    /// Sorted by context until finalized, by score afterwards.
    pub fn hypotheses(&self) -> &[NodeRef] {
        &self.hypotheses
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Release every hypothesis of the cell and its arcs.
    pub fn release(&mut self, ctx: &mut DecodeContext<'_>) {
        for h in self.hypotheses.drain(..) {
            ctx.release(h);
        }
    }
}

/// Cells indexed by span.
#[derive(Debug, Default)]
pub struct Chart {
    cells: FxHashMap<SourceSpan, ChartCell>,
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `span`, created empty on first use.
    pub fn cell_mut(&mut self, span: SourceSpan) -> &mut ChartCell {
        self.cells
            .entry(span)
            .or_insert_with(|| ChartCell::new(span))
    }

    pub fn cell(&self, span: SourceSpan) -> Option<&ChartCell> {
        self.cells.get(&span)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total hypotheses across all cells.
    pub fn num_hypotheses(&self) -> usize {
        self.cells.values().map(ChartCell::len).sum()
    }

    /// Release every cell.
    pub fn release(&mut self, ctx: &mut DecodeContext<'_>) {
        for (_, mut cell) in self.cells.drain() {
            cell.release(ctx);
        }
    }
}
