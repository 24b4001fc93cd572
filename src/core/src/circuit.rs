
//! The circuit container.
//!
//! The circuit owns every gate and every edge record. Gates live in a slot
//! vector indexed by [`GateId`]; edge records live in a second vector with a
//! recycle list, since edges are created and destroyed constantly while the
//! simplifier runs. All rewiring goes through the link/unlink primitives
//! below so that the two chains of every edge stay consistent.

use {
    std::{error, fmt, u32, rc::Rc, collections::VecDeque},
    bit_set::BitSet,
    crate::gate::{Gate, GateId, Edge, EdgeId, Kind},
};

/// Error raised when constraint propagation or rewriting derives an
/// unsatisfiable constraint. This is a solved outcome, not a failure: the
/// drivers catch it and emit a trivially unsatisfiable formula.
#[derive(Debug,Clone,Copy,Eq,PartialEq)]
pub struct Inconsistent;

impl fmt::Display for Inconsistent {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        write!(out, "circuit constraints are inconsistent")
    }
}

impl error::Error for Inconsistent {}

/// The result of a rewriting operation.
pub type Result<T> = std::result::Result<T, Inconsistent>;

/// A shared Boolean circuit: a DAG of gates with parent/child cross-links,
/// a propagation work-list and the two initial constraint queues filled by
/// the parser.
#[derive(Debug)]
pub struct Circuit {
    pub(crate) gates: Vec<Gate>,
    pub(crate) edges: Vec<Edge>,
    recycle: Vec<EdgeId>, // edge slots available for reuse
    pstack: Vec<GateId>,
    /// Gates asserted true by the input file, drained by the driver.
    pub assigned_to_true: VecDeque<GateId>,
    /// Gates asserted false by the input file, drained by the driver.
    pub assigned_to_false: VecDeque<GateId>,
    /// Set by any rewrite that changes the graph; drives fixpoint loops.
    pub changed: bool,
    /// When false, rewrites that equate a free input with another gate are
    /// forbidden. Cleared while preserving all solutions or reconstructing
    /// one.
    pub may_transform_input_gates: bool,
    /// Keep the projected solution set intact instead of merely preserving
    /// satisfiability.
    pub preserve_all_solutions: bool,
    /// A solution will be read back from the translated form, so inputs
    /// must survive.
    pub solution_reconstruction: bool,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit {
            gates: Vec::with_capacity(512),
            edges: Vec::with_capacity(1_024),
            recycle: Vec::new(),
            pstack: Vec::new(),
            assigned_to_true: VecDeque::new(),
            assigned_to_false: VecDeque::new(),
            changed: false,
            may_transform_input_gates: true,
            preserve_all_solutions: false,
            solution_reconstruction: false,
        }
    }

    /// Access a gate.
    #[inline]
    pub fn gate(&self, g: GateId) -> &Gate {
        &self.gates[g.idx()]
    }

    /// Mutable access to a gate. Only the public scratch fields can be
    /// written from outside this crate; structure changes go through the
    /// circuit's own operations.
    #[inline]
    pub fn gate_mut(&mut self, g: GateId) -> &mut Gate {
        &mut self.gates[g.idx()]
    }

    /// Number of live (non-deleted) gates.
    pub fn count_gates(&self) -> usize {
        self.gates.iter().filter(|g| !g.is_deleted()).count()
    }

    /// Total number of gate slots ever allocated, deleted ones included.
    #[inline]
    pub fn n_slots(&self) -> usize { self.gates.len() }

    /// Iterate over the ids of all live gates, in installation order.
    pub fn gate_ids<'a>(&'a self) -> impl Iterator<Item=GateId> + 'a {
        self.gates.iter().enumerate()
            .filter_map(|(i, g)| {
                if g.is_deleted() { None } else { Some(GateId(i as u32)) }
            })
    }

    /// Iterate over all live gates with their ids, in installation order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item=(GateId, &'a Gate)> + 'a {
        self.gates.iter().enumerate()
            .filter_map(|(i, g)| {
                if g.is_deleted() { None } else { Some((GateId(i as u32), g)) }
            })
    }

    // ## Edge chains

    // Allocate an edge record linking `parent` to `child`, prepending to
    // both chains. The new edge becomes the head of the parent's child
    // chain, so multi-child constructors install operands in reverse.
    pub(crate) fn new_edge(&mut self, parent: GateId, child: GateId) -> EdgeId {
        let e = match self.recycle.pop() {
            Some(e) => e,
            None => {
                let n = self.edges.len();
                if n > u32::MAX as usize - 1 {
                    panic!("cannot allocate more edge records");
                }
                self.edges.push(Edge::UNLINKED);
                EdgeId(n as u32)
            }
        };
        self.link_parent(e, parent);
        self.link_child(e, child);
        e
    }

    fn link_parent(&mut self, e: EdgeId, f: GateId) {
        debug_assert!(self.edges[e.idx()].parent.is_nil());
        let head = self.gates[f.idx()].children;
        {
            let edge = &mut self.edges[e.idx()];
            edge.parent = f;
            edge.next_child = head;
            edge.prev_child = EdgeId::SENTINEL;
        }
        if !head.is_nil() {
            debug_assert!(self.edges[head.idx()].prev_child.is_nil());
            self.edges[head.idx()].prev_child = e;
        }
        self.gates[f.idx()].children = e;
    }

    fn link_child(&mut self, e: EdgeId, c: GateId) {
        debug_assert!(self.edges[e.idx()].child.is_nil());
        let head = self.gates[c.idx()].parents;
        {
            let edge = &mut self.edges[e.idx()];
            edge.child = c;
            edge.next_parent = head;
            edge.prev_parent = EdgeId::SENTINEL;
        }
        if !head.is_nil() {
            debug_assert!(self.edges[head.idx()].prev_parent.is_nil());
            self.edges[head.idx()].prev_parent = e;
        }
        self.gates[c.idx()].parents = e;
    }

    fn unlink_parent(&mut self, e: EdgeId) {
        let (parent, prev, next) = {
            let edge = &self.edges[e.idx()];
            (edge.parent, edge.prev_child, edge.next_child)
        };
        debug_assert!(!parent.is_nil());
        if !next.is_nil() {
            self.edges[next.idx()].prev_child = prev;
        }
        if !prev.is_nil() {
            self.edges[prev.idx()].next_child = next;
        } else {
            debug_assert!(self.gates[parent.idx()].children == e);
            self.gates[parent.idx()].children = next;
        }
        let edge = &mut self.edges[e.idx()];
        edge.parent = GateId::SENTINEL;
        edge.prev_child = EdgeId::SENTINEL;
        edge.next_child = EdgeId::SENTINEL;
    }

    fn unlink_child(&mut self, e: EdgeId) {
        let (child, prev, next) = {
            let edge = &self.edges[e.idx()];
            (edge.child, edge.prev_parent, edge.next_parent)
        };
        debug_assert!(!child.is_nil());
        if !next.is_nil() {
            self.edges[next.idx()].prev_parent = prev;
        }
        if !prev.is_nil() {
            self.edges[prev.idx()].next_parent = next;
        } else {
            debug_assert!(self.gates[child.idx()].parents == e);
            self.gates[child.idx()].parents = next;
        }
        let edge = &mut self.edges[e.idx()];
        edge.child = GateId::SENTINEL;
        edge.prev_parent = EdgeId::SENTINEL;
        edge.next_parent = EdgeId::SENTINEL;
    }

    // Remove an edge entirely and recycle its slot.
    pub(crate) fn delete_edge(&mut self, e: EdgeId) {
        self.unlink_parent(e);
        self.unlink_child(e);
        self.recycle.push(e);
    }

    // Redirect the child endpoint of `e`. The edge keeps its position in
    // the parent's child chain, so operand order is preserved.
    pub(crate) fn change_child(&mut self, e: EdgeId, new_child: GateId) {
        self.unlink_child(e);
        self.link_child(e, new_child);
    }

    // Redirect the parent endpoint of `e`. The edge is prepended to the new
    // parent's child chain, which loses its position; only safe when both
    // parents are commutative.
    pub(crate) fn change_parent(&mut self, e: EdgeId, new_parent: GateId) {
        debug_assert!(self.gate(self.edges[e.idx()].parent).kind().is_commutative());
        debug_assert!(self.gate(new_parent).kind().is_commutative());
        self.unlink_parent(e);
        self.link_parent(e, new_parent);
    }

    /// Prepend `child` to `parent`'s child chain.
    pub fn add_child(&mut self, parent: GateId, child: GateId) {
        self.new_edge(parent, child);
    }

    pub(crate) fn remove_all_children(&mut self, g: GateId) {
        loop {
            let head = self.gates[g.idx()].children;
            if head.is_nil() { break }
            self.delete_edge(head);
        }
    }

    /// The children of `g`, in operand order.
    pub fn children<'a>(&'a self, g: GateId) -> ChildIter<'a> {
        ChildIter { circ: self, cur: self.gates[g.idx()].children }
    }

    pub fn count_children(&self, g: GateId) -> usize {
        self.children(g).count()
    }

    pub fn count_parents(&self, g: GateId) -> usize {
        let mut n = 0;
        let mut fa = self.gates[g.idx()].parents;
        while !fa.is_nil() {
            n += 1;
            fa = self.edges[fa.idx()].next_parent;
        }
        n
    }

    pub fn first_child(&self, g: GateId) -> GateId {
        let e = self.gates[g.idx()].children;
        debug_assert!(!e.is_nil());
        self.edges[e.idx()].child
    }

    /// The three children of an ITE gate, in (if, then, else) order.
    pub fn ite_children(&self, g: GateId) -> (GateId, GateId, GateId) {
        let mut it = self.children(g);
        let i = it.next().expect("ITE gate with no if-child");
        let t = it.next().expect("ITE gate with no then-child");
        let e = it.next().expect("ITE gate with no else-child");
        debug_assert!(it.next().is_none());
        (i, t, e)
    }

    /// The two children of a binary gate.
    pub fn two_children(&self, g: GateId) -> (GateId, GateId) {
        let mut it = self.children(g);
        let c1 = it.next().expect("binary gate with no children");
        let c2 = it.next().expect("binary gate with a single child");
        debug_assert!(it.next().is_none());
        (c1, c2)
    }

    // ## Factories

    pub(crate) fn install(&mut self, kind: Kind) -> GateId {
        let n = self.gates.len();
        if n > u32::MAX as usize - 1 {
            panic!("cannot allocate more gates");
        }
        self.gates.push(Gate::new(kind));
        GateId(n as u32)
    }

    /// A fresh undefined placeholder gate.
    pub fn new_undef(&mut self) -> GateId {
        self.install(Kind::Undef)
    }

    /// A fresh constant-true gate.
    pub fn new_true(&mut self) -> GateId {
        self.install(Kind::True)
    }

    /// A fresh constant-false gate.
    pub fn new_false(&mut self) -> GateId {
        self.install(Kind::False)
    }

    /// A fresh free input gate carrying `name`.
    pub fn new_var(&mut self, name: &str) -> GateId {
        let g = self.install(Kind::Var);
        self.gates[g.idx()].names.push(Rc::from(name));
        g
    }

    pub fn new_not(&mut self, child: GateId) -> GateId {
        let g = self.install(Kind::Not);
        self.add_child(g, child);
        g
    }

    pub fn new_ref(&mut self, child: GateId) -> GateId {
        let g = self.install(Kind::Ref);
        self.add_child(g, child);
        g
    }

    /// A fresh n-ary gate over `children` (in operand order).
    pub fn new_nary(&mut self, kind: Kind, children: &[GateId]) -> GateId {
        debug_assert!(match kind {
            Kind::Or | Kind::And | Kind::Odd | Kind::Even | Kind::Equiv
                | Kind::Threshold | Kind::Atleast => true,
            _ => false,
        });
        debug_assert!(!children.is_empty());
        let g = self.install(kind);
        // add_child prepends, so install in reverse to keep operand order
        for &c in children.iter().rev() {
            self.add_child(g, c);
        }
        g
    }

    pub fn new_and(&mut self, children: &[GateId]) -> GateId {
        self.new_nary(Kind::And, children)
    }

    pub fn new_or(&mut self, children: &[GateId]) -> GateId {
        self.new_nary(Kind::Or, children)
    }

    pub fn new_ite(&mut self, i: GateId, t: GateId, e: GateId) -> GateId {
        let g = self.install(Kind::Ite);
        self.add_child(g, e);
        self.add_child(g, t);
        self.add_child(g, i);
        g
    }

    /// A cardinality gate asserting that between `tmin` and `tmax` of the
    /// children are true.
    pub fn new_threshold(&mut self, tmin: u32, tmax: u32, children: &[GateId]) -> GateId {
        let g = self.new_nary(Kind::Threshold, children);
        self.gates[g.idx()].tmin = tmin;
        self.gates[g.idx()].tmax = tmax;
        g
    }

    /// A cardinality gate asserting that at least `tmin` children are true.
    pub fn new_atleast(&mut self, tmin: u32, children: &[GateId]) -> GateId {
        let g = self.new_nary(Kind::Atleast, children);
        self.gates[g.idx()].tmin = tmin;
        g
    }

    /// Attach a symbolic name to `g`. Names follow the gate through merges.
    pub fn add_name(&mut self, g: GateId, name: Rc<str>) {
        self.gates[g.idx()].names.push(name);
    }

    /// Give a placeholder gate its definition. Used by the parsers, which
    /// install placeholders for forward references.
    pub fn define_undef(
        &mut self,
        g: GateId,
        kind: Kind,
        children: &[GateId],
        tmin: u32,
        tmax: u32,
    ) {
        debug_assert_eq!(self.gates[g.idx()].kind(), Kind::Undef);
        debug_assert!(self.gates[g.idx()].children.is_nil());
        {
            let gate = &mut self.gates[g.idx()];
            gate.kind = kind;
            gate.tmin = tmin;
            gate.tmax = tmax;
        }
        for &c in children.iter().rev() {
            self.add_child(g, c);
        }
    }

    /// Drop every name beginning with an underscore; such names are
    /// internal temporaries of the input file.
    pub fn remove_underscore_names(&mut self) {
        for g in self.gates.iter_mut() {
            g.names.retain(|n| !n.starts_with('_'));
        }
    }

    // ## The propagation work-list

    /// Schedule `g` for (re-)examination. A gate is never on the work-list
    /// twice.
    pub fn enqueue(&mut self, g: GateId) {
        let gate = &mut self.gates[g.idx()];
        if !gate.in_pstack {
            gate.in_pstack = true;
            self.pstack.push(g);
        }
    }

    pub(crate) fn enqueue_parents(&mut self, g: GateId) {
        let mut fa = self.gates[g.idx()].parents;
        while !fa.is_nil() {
            let (p, next) = {
                let e = &self.edges[fa.idx()];
                (e.parent, e.next_parent)
            };
            self.enqueue(p);
            fa = next;
        }
    }

    pub(crate) fn enqueue_children(&mut self, g: GateId) {
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (c, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            self.enqueue(c);
            ca = next;
        }
    }

    pub(crate) fn pop_pstack(&mut self) -> Option<GateId> {
        let g = self.pstack.pop()?;
        self.gates[g.idx()].in_pstack = false;
        Some(g)
    }

    // ## Constraints

    /// Record that `g` must evaluate to `v`. Fails if `g` is already
    /// determined to the opposite value; otherwise idempotent.
    pub fn assign(&mut self, g: GateId, v: bool) -> Result<()> {
        let gate = &mut self.gates[g.idx()];
        if gate.determined {
            if gate.value != v {
                return Err(Inconsistent);
            }
        } else {
            gate.determined = true;
            gate.value = v;
        }
        Ok(())
    }

    /// Assert `g` true and schedule it and its parents for simplification.
    pub fn force_true(&mut self, g: GateId) -> Result<()> {
        self.assign(g, true)?;
        self.enqueue(g);
        self.enqueue_parents(g);
        Ok(())
    }

    /// Assert `g` false and schedule it and its parents for simplification.
    pub fn force_false(&mut self, g: GateId) -> Result<()> {
        self.assign(g, false)?;
        self.enqueue(g);
        self.enqueue_parents(g);
        Ok(())
    }

    // ## Queries

    /// Whether `target` is reachable from `g` through child edges.
    pub fn depends_on(&self, g: GateId, target: GateId) -> bool {
        if g == target {
            return true;
        }
        let mut seen = BitSet::new();
        let mut stack = vec![g];
        while let Some(h) = stack.pop() {
            if seen.contains(h.idx()) {
                continue;
            }
            seen.insert(h.idx());
            let mut ca = self.gates[h.idx()].children;
            while !ca.is_nil() {
                let e = &self.edges[ca.idx()];
                if e.child == target {
                    return true;
                }
                stack.push(e.child);
                ca = e.next_child;
            }
        }
        false
    }

    /// Check that the live graph is a DAG. On failure, return the names of
    /// the gates on one offending cycle as a diagnostic witness.
    ///
    /// Uses `temp` as DFS colouring; restored to 0 before returning.
    pub fn test_acyclicity(&mut self) -> Option<Vec<String>> {
        const UNVISITED : i32 = 0;
        const ON_PATH : i32 = 1;
        const DONE : i32 = 3;

        let n = self.gates.len();
        let mut result = None;
        'roots: for i in 0..n {
            if self.gates[i].is_deleted() || self.gates[i].temp != UNVISITED {
                continue;
            }
            let root = GateId(i as u32);
            let mut stack: Vec<(GateId, EdgeId)> = Vec::new();
            self.gates[root.idx()].temp = ON_PATH;
            stack.push((root, self.gates[root.idx()].children));
            while let Some(&mut (g, ref mut cur)) = stack.last_mut() {
                if cur.is_nil() {
                    self.gates[g.idx()].temp = DONE;
                    stack.pop();
                    continue;
                }
                let (child, next) = {
                    let e = &self.edges[cur.idx()];
                    (e.child, e.next_child)
                };
                *cur = next;
                match self.gates[child.idx()].temp {
                    DONE => (),
                    UNVISITED => {
                        self.gates[child.idx()].temp = ON_PATH;
                        stack.push((child, self.gates[child.idx()].children));
                    }
                    ON_PATH => {
                        // found a cycle; collect the names on it
                        let mut names = Vec::new();
                        for &(h, _) in stack.iter().rev() {
                            if let Some(name) = self.gates[h.idx()].first_name() {
                                names.push(name.to_string());
                            }
                            if h == child {
                                break;
                            }
                        }
                        result = Some(names);
                        break 'roots;
                    }
                    _ => panic!("test_acyclicity: corrupt temp field"),
                }
            }
        }
        for g in self.gates.iter_mut() {
            g.temp = 0;
        }
        result
    }

    /// Reset every gate's `temp` scratch field to `v`.
    pub fn reset_temps(&mut self, v: i32) {
        for g in self.gates.iter_mut() {
            g.temp = v;
        }
    }

    /// Count the determined-true, determined-false and undetermined
    /// children of `g`.
    pub fn count_child_info(&self, g: GateId) -> (usize, usize, usize) {
        let mut nof_true = 0;
        let mut nof_false = 0;
        let mut nof_undet = 0;
        for c in self.children(g) {
            let child = self.gate(c);
            if child.determined {
                if child.value { nof_true += 1 } else { nof_false += 1 }
            } else {
                nof_undet += 1;
            }
        }
        (nof_true, nof_false, nof_undet)
    }

    /// Whether the asserted value of `g` already follows from the values of
    /// its children, so no encoding of `g` is needed to support it.
    pub fn is_justified(&self, g: GateId) -> bool {
        let gate = self.gate(g);
        if !gate.determined {
            return false;
        }
        let (nof_true, nof_false, nof_undet) = self.count_child_info(g);
        let nof_children = nof_true + nof_false + nof_undet;
        let value = gate.value;
        match gate.kind() {
            Kind::False | Kind::True | Kind::Var => true,
            Kind::Not => {
                debug_assert!(!(nof_true > 0 && value));
                debug_assert!(!(nof_false > 0 && !value));
                (value && nof_false > 0) || (!value && nof_true > 0)
            }
            Kind::Ref => {
                (value && nof_true > 0) || (!value && nof_false > 0)
            }
            Kind::Equiv => {
                if value {
                    nof_children == 1
                        || nof_true == nof_children
                        || nof_false == nof_children
                } else {
                    nof_true > 0 && nof_false > 0
                }
            }
            Kind::Or => {
                if value { nof_true > 0 } else { nof_false == nof_children }
            }
            Kind::And => {
                if value { nof_true == nof_children } else { nof_false > 0 }
            }
            Kind::Odd => {
                nof_undet == 0 && value == (nof_true % 2 == 1)
            }
            Kind::Even => {
                nof_undet == 0 && value == (nof_true % 2 == 0)
            }
            Kind::Ite => {
                let (i, t, e) = self.ite_children(g);
                let val = |c: GateId, v: bool| {
                    let ch = self.gate(c);
                    ch.determined && ch.value == v
                };
                if value {
                    (val(i, true) && val(t, true))
                        || (val(i, false) && val(e, true))
                        || (val(t, true) && val(e, true))
                } else {
                    (val(i, true) && val(t, false))
                        || (val(i, false) && val(e, false))
                        || (val(t, false) && val(e, false))
                }
            }
            Kind::Threshold => {
                let (tmin, tmax) = (gate.tmin as usize, gate.tmax as usize);
                if value {
                    tmin <= nof_true && nof_children - nof_false <= tmax
                } else {
                    nof_true > tmax || nof_children - nof_false < tmin
                }
            }
            Kind::Atleast => {
                let tmin = gate.tmin as usize;
                if value {
                    nof_true >= tmin
                } else {
                    nof_children - nof_false < tmin
                }
            }
            k => panic!("is_justified: not implemented for {}", k.name()),
        }
    }

    /// Evaluate `g` bottom-up from the values of determined descendants,
    /// marking every visited gate determined. Returns false if the value
    /// depends on an unassigned input.
    pub fn evaluate(&mut self, g: GateId) -> bool {
        let mut stack: Vec<(GateId, bool)> = vec![(g, false)];
        while let Some((h, expanded)) = stack.pop() {
            if self.gates[h.idx()].determined {
                continue;
            }
            if !expanded {
                if self.gates[h.idx()].kind() == Kind::Var {
                    // free input: the value cannot be computed
                    return false;
                }
                stack.push((h, true));
                let mut ca = self.gates[h.idx()].children;
                while !ca.is_nil() {
                    let e = &self.edges[ca.idx()];
                    if !self.gates[e.child.idx()].determined {
                        stack.push((e.child, false));
                    }
                    ca = e.next_child;
                }
            } else {
                let (nof_true, nof_false, nof_undet) = self.count_child_info(h);
                debug_assert_eq!(nof_undet, 0);
                let value = match self.gates[h.idx()].kind() {
                    Kind::False => false,
                    Kind::True => true,
                    Kind::Ref => nof_true == 1,
                    Kind::Not => nof_true == 0,
                    Kind::Equiv => !(nof_true > 0 && nof_false > 0),
                    Kind::Or => nof_true > 0,
                    Kind::And => nof_false == 0,
                    Kind::Odd => nof_true % 2 == 1,
                    Kind::Even => nof_true % 2 == 0,
                    Kind::Ite => {
                        let (i, t, e) = self.ite_children(h);
                        if self.gate(i).value {
                            self.gate(t).value
                        } else {
                            self.gate(e).value
                        }
                    }
                    Kind::Threshold => {
                        let gate = self.gate(h);
                        gate.tmin as usize <= nof_true && nof_true <= gate.tmax as usize
                    }
                    Kind::Atleast => self.gate(h).tmin as usize <= nof_true,
                    k => panic!("evaluate: not implemented for {}", k.name()),
                };
                let gate = &mut self.gates[h.idx()];
                gate.determined = true;
                gate.value = value;
            }
        }
        true
    }

    // Local consistency of a single determined gate.
    fn gate_consistent(&self, g: GateId) -> bool {
        let gate = self.gate(g);
        if !gate.determined {
            return true;
        }
        let (nof_true, nof_false, nof_undet) = self.count_child_info(g);
        let nof_children = nof_true + nof_false + nof_undet;
        let value = gate.value;
        match gate.kind() {
            Kind::False => !value,
            Kind::True => value,
            Kind::Var => true,
            Kind::Not => {
                if nof_true == 1 { !value }
                else if nof_false == 1 { value }
                else { true }
            }
            Kind::Ref => {
                if nof_true == 1 { value }
                else if nof_false == 1 { !value }
                else { true }
            }
            Kind::Equiv => {
                if value {
                    !(nof_true > 0 && nof_false > 0)
                } else {
                    !(nof_true == nof_children || nof_false == nof_children)
                }
            }
            Kind::Or => {
                if value { nof_false != nof_children } else { nof_true == 0 }
            }
            Kind::And => {
                if value { nof_false == 0 } else { nof_true != nof_children }
            }
            Kind::Odd => {
                nof_undet != 0 || value == (nof_true % 2 == 1)
            }
            Kind::Even => {
                nof_undet != 0 || value == (nof_true % 2 == 0)
            }
            Kind::Ite => {
                let (i, t, e) = self.ite_children(g);
                let val = |c: GateId, v: bool| {
                    let ch = self.gate(c);
                    ch.determined && ch.value == v
                };
                if value {
                    !((val(i, true) && val(t, false))
                        || (val(i, false) && val(e, false))
                        || (val(t, false) && val(e, false)))
                } else {
                    !((val(i, true) && val(t, true))
                        || (val(i, false) && val(e, true))
                        || (val(t, true) && val(e, true)))
                }
            }
            Kind::Threshold => {
                let (tmin, tmax) = (gate.tmin as usize, gate.tmax as usize);
                if value {
                    !(nof_true > tmax || nof_children - nof_false < tmin)
                } else {
                    !(nof_true >= tmin && nof_children - nof_false <= tmax)
                }
            }
            Kind::Atleast => {
                let tmin = gate.tmin as usize;
                if value {
                    !(nof_children - nof_false < tmin)
                } else {
                    !(nof_true >= tmin)
                }
            }
            k => panic!("gate_consistent: not implemented for {}", k.name()),
        }
    }

    /// Check that the current truth assignment violates no gate.
    pub fn check_consistency(&self) -> bool {
        self.gate_ids().all(|g| self.gate_consistent(g))
    }

    /// Check the bidirectional consistency of the edge chains: every edge
    /// reachable from a parent's child chain names that parent and is
    /// linked into its child's parent chain, and vice versa. A deleted
    /// gate must have no edges left. For tests and debugging.
    pub fn check_edges(&self) -> bool {
        for (g, gate) in self.gates.iter().enumerate() {
            let g = GateId(g as u32);
            if gate.is_deleted() && (!gate.children.is_nil() || !gate.parents.is_nil()) {
                return false;
            }
            let mut ca = gate.children;
            let mut prev = EdgeId::SENTINEL;
            while !ca.is_nil() {
                let e = &self.edges[ca.idx()];
                if e.parent != g || e.prev_child != prev {
                    return false;
                }
                // the same edge must occur in the child's parent chain
                let mut fa = self.gates[e.child.idx()].parents;
                let mut found = false;
                while !fa.is_nil() {
                    if fa == ca {
                        found = true;
                        break;
                    }
                    fa = self.edges[fa.idx()].next_parent;
                }
                if !found {
                    return false;
                }
                prev = ca;
                ca = e.next_child;
            }
            let mut fa = gate.parents;
            let mut prev = EdgeId::SENTINEL;
            while !fa.is_nil() {
                let e = &self.edges[fa.idx()];
                if e.child != g || e.prev_parent != prev {
                    return false;
                }
                let mut ca = self.gates[e.parent.idx()].children;
                let mut found = false;
                while !ca.is_nil() {
                    if ca == fa {
                        found = true;
                        break;
                    }
                    ca = self.edges[ca.idx()].next_child;
                }
                if !found {
                    return false;
                }
                prev = fa;
                fa = e.next_parent;
            }
        }
        true
    }

    /// Maximum over relevant gates of the min/max height of the gate's
    /// cone, for statistics. Uses `temp`, restored to 0.
    pub fn compute_stats(&mut self) -> (u32, u32) {
        let roots: Vec<GateId> = self.gate_ids()
            .filter(|&g| self.gate(g).is_determined())
            .collect();
        let mut max_min = 0;
        self.reset_temps(-1);
        for &g in roots.iter() {
            let h = self.compute_height(g, true);
            if h > max_min { max_min = h }
        }
        let mut max_max = 0;
        self.reset_temps(-1);
        for &g in roots.iter() {
            let h = self.compute_height(g, false);
            if h > max_max { max_max = h }
        }
        self.reset_temps(0);
        (max_min, max_max)
    }

    // Height of `g`, taking the min or max over children. Memoized in
    // `temp` (caller initializes temps to -1).
    fn compute_height(&mut self, g: GateId, min: bool) -> u32 {
        if self.gates[g.idx()].temp >= 0 {
            return self.gates[g.idx()].temp as u32;
        }
        let mut stack: Vec<(GateId, bool)> = vec![(g, false)];
        while let Some((h, expanded)) = stack.pop() {
            if self.gates[h.idx()].temp >= 0 {
                continue;
            }
            if !expanded {
                stack.push((h, true));
                let mut ca = self.gates[h.idx()].children;
                while !ca.is_nil() {
                    let e = &self.edges[ca.idx()];
                    stack.push((e.child, false));
                    ca = e.next_child;
                }
            } else {
                let mut height: Option<u32> = None;
                let mut ca = self.gates[h.idx()].children;
                while !ca.is_nil() {
                    let e = &self.edges[ca.idx()];
                    let ch = self.gates[e.child.idx()].temp as u32;
                    height = Some(match height {
                        None => ch,
                        Some(x) => if min { x.min(ch) } else { x.max(ch) },
                    });
                    ca = e.next_child;
                }
                self.gates[h.idx()].temp = match height {
                    None => 0,
                    Some(x) => (x + 1) as i32,
                };
            }
        }
        self.gates[g.idx()].temp as u32
    }
}

/// Iterator over the children of one gate, in operand order.
pub struct ChildIter<'a> {
    circ: &'a Circuit,
    cur: EdgeId,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = GateId;

    fn next(&mut self) -> Option<GateId> {
        if self.cur.is_nil() {
            None
        } else {
            let e = &self.circ.edges[self.cur.idx()];
            self.cur = e.next_child;
            Some(e.child)
        }
    }
}
