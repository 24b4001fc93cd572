
//! Gate nodes and the edge records connecting them.
//!
//! A circuit is a DAG of gates. Every directed edge from a parent gate to a
//! child gate is a first-class record, linked simultaneously into the
//! parent's ordered child chain and the child's (unordered) parent chain;
//! the circuit's link/unlink primitives keep both chains consistent while
//! the simplifier rewires the graph.

use {
    std::{u32, rc::Rc},
    smallvec::SmallVec,
};

/// The unique identifier of a gate within its circuit.
///
/// Identifiers are dense, assigned in installation order and never reused;
/// a deleted gate keeps its id as a tombstone.
#[derive(Copy,Clone,Eq,PartialEq,Hash,Ord,PartialOrd,Debug)]
pub struct GateId(pub(crate) u32);

impl GateId {
    /// A value of type GateId. Only ever used to fill slots, do not access.
    pub const SENTINEL : GateId = GateId(u32::MAX);

    #[inline(always)]
    pub(crate) fn idx(self) -> usize { self.0 as usize }

    #[inline(always)]
    pub(crate) fn is_nil(self) -> bool { self.0 == u32::MAX }

    /// The raw index of this gate in installation order.
    #[inline(always)]
    pub fn index(self) -> u32 { self.0 }
}

/// The identifier of an edge record.
#[derive(Copy,Clone,Eq,PartialEq,Hash,Debug)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    pub(crate) const SENTINEL : EdgeId = EdgeId(u32::MAX);

    #[inline(always)]
    pub(crate) fn idx(self) -> usize { self.0 as usize }

    #[inline(always)]
    pub(crate) fn is_nil(self) -> bool { self.0 == u32::MAX }
}

/// The operator tag of a gate. A closed set; dispatch is a plain `match`.
#[repr(u8)]
#[derive(Copy,Clone,Debug,Eq,PartialEq,Hash)]
pub enum Kind {
    Equiv,
    Or,
    And,
    Even,
    Odd,
    Ite,
    Not,
    True,
    False,
    Var,
    Threshold,
    Atleast,
    Ref,
    Undef,
    Deleted,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Equiv => "EQUIV",
            Kind::Or => "OR",
            Kind::And => "AND",
            Kind::Even => "EVEN",
            Kind::Odd => "ODD",
            Kind::Ite => "ITE",
            Kind::Not => "NOT",
            Kind::True => "TRUE",
            Kind::False => "FALSE",
            Kind::Var => "VAR",
            Kind::Threshold => "THRESHOLD",
            Kind::Atleast => "ATLEAST",
            Kind::Ref => "REF",
            Kind::Undef => "UNDEF",
            Kind::Deleted => "DELETED",
        }
    }

    /// Whether the operand order of the gate is semantically irrelevant.
    #[inline]
    pub fn is_commutative(self) -> bool {
        match self {
            Kind::Equiv | Kind::Or | Kind::And | Kind::Even | Kind::Odd
                | Kind::Threshold | Kind::Atleast => true,
            _ => false,
        }
    }
}

// One edge record. `next_child`/`prev_child` are the siblings within the
// parent's child chain, `next_parent`/`prev_parent` within the child's
// parent chain, mirroring the chain each field walks along.
#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub parent: GateId,
    pub child: GateId,
    pub prev_child: EdgeId,
    pub next_child: EdgeId,
    pub prev_parent: EdgeId,
    pub next_parent: EdgeId,
}

impl Edge {
    pub(crate) const UNLINKED : Edge = Edge {
        parent: GateId::SENTINEL,
        child: GateId::SENTINEL,
        prev_child: EdgeId::SENTINEL,
        next_child: EdgeId::SENTINEL,
        prev_parent: EdgeId::SENTINEL,
        next_parent: EdgeId::SENTINEL,
    };
}

/// One gate of a circuit.
///
/// Structure (edges, kind changes) is only ever mutated through the owning
/// [`Circuit`](crate::circuit::Circuit); the scratch fields `temp`,
/// `mir_pos` and `mir_neg` are public so that passes outside this crate can
/// colour gates, under the contract that they restore them before returning
/// (0, or -1 for cone-of-influence marking).
#[derive(Debug)]
pub struct Gate {
    pub(crate) kind: Kind,
    pub(crate) children: EdgeId, // head of the child chain
    pub(crate) parents: EdgeId,  // head of the parent chain
    pub(crate) determined: bool,
    pub(crate) value: bool,
    pub(crate) tmin: u32,
    pub(crate) tmax: u32,
    pub(crate) names: SmallVec<[Rc<str>; 1]>,
    /// Scratch: numbering, colouring, duplicate detection, height memoization.
    pub temp: i32,
    pub(crate) in_pstack: bool,
    /// Scratch: reached in positive polarity (monotone input rule).
    pub mir_pos: bool,
    /// Scratch: reached in negative polarity.
    pub mir_neg: bool,
}

impl Gate {
    pub(crate) fn new(kind: Kind) -> Self {
        Gate {
            kind,
            children: EdgeId::SENTINEL,
            parents: EdgeId::SENTINEL,
            determined: false,
            value: false,
            tmin: 0,
            tmax: 0,
            names: SmallVec::new(),
            temp: 0,
            in_pstack: false,
            mir_pos: false,
            mir_neg: false,
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> Kind { self.kind }

    #[inline(always)]
    pub fn is_deleted(&self) -> bool { self.kind == Kind::Deleted }

    #[inline(always)]
    pub fn is_determined(&self) -> bool { self.determined }

    /// The asserted value. Only meaningful when `is_determined()`.
    #[inline(always)]
    pub fn value(&self) -> bool { self.value }

    /// The inclusive cardinality window `[tmin, tmax]`. `tmax` is only
    /// meaningful for `Threshold` gates.
    #[inline(always)]
    pub fn bounds(&self) -> (u32, u32) { (self.tmin, self.tmax) }

    #[inline(always)]
    pub fn has_parents(&self) -> bool { !self.parents.is_nil() }

    #[inline(always)]
    pub fn has_names(&self) -> bool { !self.names.is_empty() }

    /// The first symbolic name attached to this gate, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.names.first().map(|n| &**n)
    }

    /// All symbolic names attached to this gate.
    pub fn names<'a>(&'a self) -> impl Iterator<Item=&'a str> + 'a {
        self.names.iter().map(|n| &**n)
    }
}
