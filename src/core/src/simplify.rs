
//! The fixpoint simplifier.
//!
//! Gates are rewritten locally, one pstack pop at a time: constant
//! propagation, unit-forcing, local algebraic identities per gate kind,
//! duplicate and complementary-child detection, factoring through shared
//! subterms, and input-variable substitution where the current mode allows
//! it. Every rule that changes the graph sets `changed` and re-enqueues the
//! affected neighbours, so the driver only terminates once nothing is left
//! to do.

use {
    crate::gate::{GateId, Kind},
    crate::circuit::{Circuit, Result, Inconsistent},
};

impl Circuit {
    /// Run the simplifier to fixpoint, interleaved with structural sharing.
    ///
    /// With `preserve_cnf_normalized_form` set, rewrites that would break
    /// the post-normalization invariants are suppressed, so the pass can
    /// run again after `cnf_normalize` without undoing it.
    pub fn simplify(&mut self, preserve_cnf_normalized_form: bool) -> Result<()> {
        // substituting an input introduces fresh REF/NOT gates over
        // arbitrary children, which would undo the normal form
        self.may_transform_input_gates = !self.preserve_all_solutions
            && !self.solution_reconstruction
            && !preserve_cnf_normalized_form;
        let mut round = 0;
        loop {
            self.changed = false;
            let n = self.gates.len();
            for i in 0..n {
                if !self.gates[i].is_deleted() {
                    self.enqueue(GateId(i as u32));
                }
            }
            while let Some(g) = self.pop_pstack() {
                self.simplify_gate(g, preserve_cnf_normalized_form)?;
            }
            self.share()?;
            round += 1;
            if !self.changed {
                debug!("simplify: fixpoint after {} round(s), {} live gates",
                       round, self.count_gates());
                return Ok(());
            }
        }
    }

    /// Turn `g` into a constant gate of value `v`, detaching all children
    /// and scheduling the orphaned ones for removal.
    pub(crate) fn transform_into_constant(&mut self, g: GateId, v: bool) {
        {
            let gate = self.gate_mut(g);
            if gate.determined {
                debug_assert_eq!(gate.value, v);
            } else {
                gate.determined = true;
                gate.value = v;
            }
            gate.kind = if v { Kind::True } else { Kind::False };
            gate.tmin = 0;
            gate.tmax = 0;
        }
        loop {
            let head = self.gates[g.idx()].children;
            if head.is_nil() { break }
            let child = self.edges[head.idx()].child;
            self.delete_edge(head);
            if !self.gates[child.idx()].has_parents() {
                self.enqueue(child);
            }
        }
        self.changed = true;
    }

    // Clear the temp marks placed by the duplicate scans below: every
    // child, and the child of every NOT child.
    fn clear_child_and_grandchild_temps(&mut self, g: GateId) {
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            self.gates[child.idx()].temp = 0;
            if self.gates[child.idx()].kind() == Kind::Not {
                let gc = self.first_child(child);
                self.gates[gc.idx()].temp = 0;
            }
            ca = next;
        }
    }

    // Remove duplicate children of an OR/AND/EQUIV gate, and detect an
    // `x, ~x` pair among the children, which collapses the gate to a
    // constant (OR to true, AND and EQUIV to false).
    fn remove_g_not_g_and_duplicate_children(&mut self, g: GateId) -> Result<()> {
        let kind = self.gates[g.idx()].kind();
        if !(kind == Kind::Or || kind == Kind::And || kind == Kind::Equiv) {
            return Ok(());
        }

        self.clear_child_and_grandchild_temps(g);

        let mut g_not_g_found = false;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].is_determined() {
                ca = next;
                continue;
            }
            if self.gates[child.idx()].temp == 2 {
                // already seen in negative phase
                g_not_g_found = true;
                break;
            }
            if self.gates[child.idx()].temp == 1 {
                // duplicate occurrence, drop it
                self.delete_edge(ca);
                ca = next;
                continue;
            }
            self.gates[child.idx()].temp = 1;
            if self.gates[child.idx()].kind() == Kind::Not {
                let gc = self.first_child(child);
                if self.gates[gc.idx()].temp == 1 {
                    // grandchild already seen in positive phase
                    g_not_g_found = true;
                    break;
                }
                self.gates[gc.idx()].temp = 2;
            }
            ca = next;
        }

        self.clear_child_and_grandchild_temps(g);

        if g_not_g_found {
            let constant = match kind {
                Kind::Or => true,     // OR(x,~x,...) = T
                Kind::And => false,   // AND(x,~x,...) = F
                Kind::Equiv => false, // EQUIV(x,~x,...) = F
                _ => unreachable!(),
            };
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() != constant {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, constant);
            self.enqueue_parents(g);
            return Ok(());
        }

        if self.count_children(g) == 1 {
            // AND(x) = x, OR(x) = x, EQUIV(x) = T
            self.enqueue(g);
        }
        Ok(())
    }

    // Remove duplicate children of an ODD/EVEN gate pairwise, since parity
    // cancels pairs: ODD(x,x,y) = ODD(y), EVEN(x,x,y) = EVEN(y).
    fn remove_parity_duplicate_children(&mut self, g: GateId) -> Result<()> {
        let kind = self.gates[g.idx()].kind();
        if !(kind == Kind::Odd || kind == Kind::Even) {
            return Ok(());
        }

        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let child = self.edges[ca.idx()].child;
            self.gates[child.idx()].temp = 0;
            ca = self.edges[ca.idx()].next_child;
        }

        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].is_determined() {
                // determined children are removed by the main rule
                ca = next;
                continue;
            }
            if self.gates[child.idx()].temp == 1 {
                self.gates[child.idx()].temp = 0;
                // remove the previous occurrence
                let mut ca2 = self.gates[g.idx()].children;
                loop {
                    debug_assert!(ca2 != ca);
                    if self.edges[ca2.idx()].child == child {
                        self.delete_edge(ca2);
                        break;
                    }
                    ca2 = self.edges[ca2.idx()].next_child;
                }
                self.delete_edge(ca);
                ca = next;
                if !self.gates[child.idx()].has_parents() {
                    self.enqueue(child);
                }
                self.changed = true;
                continue;
            }
            self.gates[child.idx()].temp = 1;
            ca = next;
        }

        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let child = self.edges[ca.idx()].child;
            self.gates[child.idx()].temp = 0;
            ca = self.edges[ca.idx()].next_child;
        }

        if self.gates[g.idx()].children.is_nil() {
            let constant = match kind {
                Kind::Odd => false, // ODD() = F
                Kind::Even => true, // EVEN() = T
                _ => unreachable!(),
            };
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() != constant {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, constant);
            self.enqueue_parents(g);
            return Ok(());
        }

        if self.count_children(g) == 1 {
            // ODD(x) = x, EVEN(x) = ~x
            self.enqueue(g);
        }
        Ok(())
    }

    // [L,U](x,~x,y) = [L-1,U-1](y): a complementary pair contributes
    // exactly one to the count.
    fn remove_cardinality_g_not_g(&mut self, g: GateId) -> Result<()> {
        if self.gates[g.idx()].kind() != Kind::Threshold {
            return Ok(());
        }

        self.clear_child_and_grandchild_temps(g);

        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].temp == 2 {
                // seen earlier under a NOT: remove that NOT occurrence
                self.gates[child.idx()].temp = 0;
                let mut ca2 = self.gates[g.idx()].children;
                loop {
                    debug_assert!(ca2 != ca);
                    let child2 = self.edges[ca2.idx()].child;
                    if self.gates[child2.idx()].kind() == Kind::Not
                        && self.first_child(child2) == child
                    {
                        self.gates[child2.idx()].temp = 0;
                        self.delete_edge(ca2);
                        if !self.gates[child2.idx()].has_parents() {
                            self.enqueue(child2);
                        }
                        break;
                    }
                    ca2 = self.edges[ca2.idx()].next_child;
                }
                self.delete_edge(ca);
                ca = next;
                self.changed = true;
                if self.gates[g.idx()].tmax == 0 {
                    let gate = self.gate(g);
                    if gate.is_determined() && gate.value() {
                        self.clear_child_and_grandchild_temps(g);
                        return Err(Inconsistent);
                    }
                    self.clear_child_and_grandchild_temps(g);
                    self.transform_into_constant(g, false);
                    self.enqueue_parents(g);
                    return Ok(());
                }
                {
                    let gate = self.gate_mut(g);
                    gate.tmin = gate.tmin.saturating_sub(1);
                    gate.tmax -= 1;
                }
                continue;
            }
            // duplicate children of cardinality gates are not reduced here
            self.gates[child.idx()].temp = 1;
            if self.gates[child.idx()].kind() == Kind::Not {
                let gc = self.first_child(child);
                if self.gates[gc.idx()].temp == 1 {
                    // earlier positive occurrence of the grandchild
                    self.gates[child.idx()].temp = 0;
                    self.gates[gc.idx()].temp = 0;
                    let mut ca2 = self.gates[g.idx()].children;
                    loop {
                        debug_assert!(ca2 != ca);
                        if self.edges[ca2.idx()].child == gc {
                            self.delete_edge(ca2);
                            break;
                        }
                        ca2 = self.edges[ca2.idx()].next_child;
                    }
                    self.delete_edge(ca);
                    ca = next;
                    if !self.gates[child.idx()].has_parents() {
                        self.enqueue(child);
                    }
                    self.changed = true;
                    if self.gates[g.idx()].tmax == 0 {
                        let gate = self.gate(g);
                        if gate.is_determined() && gate.value() {
                            self.clear_child_and_grandchild_temps(g);
                            return Err(Inconsistent);
                        }
                        self.clear_child_and_grandchild_temps(g);
                        self.transform_into_constant(g, false);
                        self.enqueue_parents(g);
                        return Ok(());
                    }
                    {
                        let gate = self.gate_mut(g);
                        gate.tmin = gate.tmin.saturating_sub(1);
                        gate.tmax -= 1;
                    }
                    continue;
                }
                self.gates[gc.idx()].temp = 2;
            }
            ca = next;
        }

        self.clear_child_and_grandchild_temps(g);
        Ok(())
    }

    // OR(x,y,z,v) with an existing t = OR(y,z) over a subset of the same
    // children becomes OR(x,t,v); dually for AND. Only subterm gates that
    // are themselves constrained or used elsewhere are considered.
    fn factor_through_shared_subterm(&mut self, g: GateId, kind: Kind) {
        if self.count_children(g) < 3 {
            return;
        }
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let child = self.edges[ca.idx()].child;
            self.gates[child.idx()].temp = 1;
            ca = self.edges[ca.idx()].next_child;
        }

        let mut rewritten = false;
        let mut ca = self.gates[g.idx()].children;
        'scan: while !ca.is_nil() {
            let child = self.edges[ca.idx()].child;
            let mut fa = self.gates[child.idx()].parents;
            while !fa.is_nil() {
                let parent = self.edges[fa.idx()].parent;
                // skip further edges from the same parent
                let mut next_fa = self.edges[fa.idx()].next_parent;
                while !next_fa.is_nil() && self.edges[next_fa.idx()].parent == parent {
                    next_fa = self.edges[next_fa.idx()].next_parent;
                }
                if parent != g
                    && self.gates[parent.idx()].kind() == kind
                    && (self.gates[parent.idx()].is_determined()
                        || self.gates[parent.idx()].has_parents())
                {
                    let mut all_same = true;
                    let mut nof_children = 0;
                    let mut fca = self.gates[parent.idx()].children;
                    while !fca.is_nil() {
                        let pc = self.edges[fca.idx()].child;
                        if self.gates[pc.idx()].temp != 1 {
                            all_same = false;
                            break;
                        }
                        nof_children += 1;
                        fca = self.edges[fca.idx()].next_child;
                    }
                    if all_same && nof_children > 1
                        && nof_children < self.count_children(g)
                    {
                        // unmark the subset, then drop it from g
                        let mut fca = self.gates[parent.idx()].children;
                        while !fca.is_nil() {
                            let pc = self.edges[fca.idx()].child;
                            self.gates[pc.idx()].temp = 0;
                            fca = self.edges[fca.idx()].next_child;
                        }
                        let mut ca2 = self.gates[g.idx()].children;
                        while !ca2.is_nil() {
                            let (c2, next2) = {
                                let e = &self.edges[ca2.idx()];
                                (e.child, e.next_child)
                            };
                            if self.gates[c2.idx()].temp == 0 {
                                self.delete_edge(ca2);
                            }
                            ca2 = next2;
                        }
                        self.add_child(g, parent);
                        rewritten = true;
                        break 'scan;
                    }
                }
                fa = next_fa;
            }
            ca = self.edges[ca.idx()].next_child;
        }

        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let child = self.edges[ca.idx()].child;
            self.gates[child.idx()].temp = 0;
            ca = self.edges[ca.idx()].next_child;
        }
        if rewritten {
            self.changed = true;
            self.enqueue(g);
        }
    }

    // OR(x,OR(t,u,v),y) = OR(x,t,u,v,y) for an unshared, unconstrained
    // nested gate of the same kind; dually for AND.
    fn flatten_nested(&mut self, g: GateId, kind: Kind) {
        let mut collapsed = false;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].kind() == kind
                && !self.gates[child.idx()].is_determined()
                && self.count_parents(child) == 1
            {
                collapsed = true;
                let mut gca = self.gates[child.idx()].children;
                while !gca.is_nil() {
                    let gc = self.edges[gca.idx()].child;
                    self.add_child(g, gc);
                    gca = self.edges[gca.idx()].next_child;
                }
                self.delete_edge(ca);
                self.enqueue(child);
            }
            ca = next;
        }
        if collapsed {
            self.changed = true;
            self.enqueue(g);
        }
    }

    fn simplify_gate(&mut self, g: GateId, preserve_cnf_normalized_form: bool) -> Result<()> {
        let kind = self.gates[g.idx()].kind();
        if kind == Kind::Deleted {
            return Ok(());
        }

        // local cone-of-influence: a gate that is unconstrained, unnamed
        // and unused contributes nothing
        if !self.gates[g.idx()].has_parents()
            && !self.gates[g.idx()].has_names()
            && !self.gates[g.idx()].is_determined()
        {
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Deleted;
            self.changed = true;
            return Ok(());
        }

        match kind {
            Kind::False | Kind::True => {
                debug_assert!(self.gates[g.idx()].children.is_nil());
                let constant = kind == Kind::True;
                if self.gates[g.idx()].is_determined() {
                    if self.gates[g.idx()].value() != constant {
                        return Err(Inconsistent);
                    }
                } else {
                    {
                        let gate = self.gate_mut(g);
                        gate.determined = true;
                        gate.value = constant;
                    }
                    self.enqueue_parents(g);
                }
                if !self.gates[g.idx()].has_names() && !self.gates[g.idx()].has_parents() {
                    self.gates[g.idx()].kind = Kind::Deleted;
                }
                Ok(())
            }

            Kind::Var => {
                debug_assert!(self.gates[g.idx()].children.is_nil());
                if self.gates[g.idx()].is_determined() && self.may_transform_input_gates {
                    let v = self.gates[g.idx()].value();
                    self.transform_into_constant(g, v);
                }
                Ok(())
            }

            Kind::Ref => self.simplify_ref(g),
            Kind::Not => self.simplify_not(g),
            Kind::Ite => self.simplify_ite(g),
            Kind::Or | Kind::And => self.simplify_or_and(g, kind),
            Kind::Odd | Kind::Even => self.simplify_parity(g, preserve_cnf_normalized_form),
            Kind::Equiv => self.simplify_equiv(g),
            Kind::Threshold => self.simplify_threshold(g),
            Kind::Atleast => self.simplify_atleast(g),

            Kind::Undef | Kind::Deleted => {
                panic!("simplify: {} gate on the work-list", kind.name())
            }
        }
    }

    fn simplify_ref(&mut self, g: GateId) -> Result<()> {
        debug_assert_eq!(self.count_children(g), 1);
        let child = self.first_child(g);
        if self.gates[g.idx()].is_determined() {
            let v = self.gates[g.idx()].value();
            if self.gates[child.idx()].is_determined() {
                if self.gates[child.idx()].value() != v {
                    return Err(Inconsistent);
                }
            } else {
                {
                    let c = self.gate_mut(child);
                    c.determined = true;
                    c.value = v;
                }
                self.enqueue(child);
            }
            self.transform_into_constant(g, v);
            self.enqueue_parents(g);
            return Ok(());
        }
        if self.gates[child.idx()].is_determined() {
            let v = self.gates[child.idx()].value();
            self.transform_into_constant(g, v);
            self.enqueue_parents(g);
            return Ok(());
        }
        // unify this gate with its child
        self.enqueue_parents(g);
        loop {
            let fa = self.gates[g.idx()].parents;
            if fa.is_nil() { break }
            self.change_child(fa, child);
        }
        let names = std::mem::replace(&mut self.gates[g.idx()].names, Default::default());
        self.gates[child.idx()].names.extend(names);
        self.remove_all_children(g);
        self.gates[g.idx()].kind = Kind::Deleted;
        self.changed = true;
        Ok(())
    }

    fn simplify_not(&mut self, g: GateId) -> Result<()> {
        debug_assert_eq!(self.count_children(g), 1);
        let child = self.first_child(g);
        if self.gates[g.idx()].is_determined() {
            let v = self.gates[g.idx()].value();
            if self.gates[child.idx()].is_determined() {
                if self.gates[child.idx()].value() == v {
                    return Err(Inconsistent);
                }
            } else {
                {
                    let c = self.gate_mut(child);
                    c.determined = true;
                    c.value = !v;
                }
                self.enqueue(child);
            }
            self.transform_into_constant(g, v);
            self.enqueue_parents(g);
            return Ok(());
        }
        if self.gates[child.idx()].is_determined() {
            let v = !self.gates[child.idx()].value();
            self.transform_into_constant(g, v);
            self.enqueue_parents(g);
            return Ok(());
        }
        if self.gates[child.idx()].kind() == Kind::Not {
            // g := ~~h  -->  g := h
            let grandchild = self.first_child(child);
            self.gates[g.idx()].kind = Kind::Ref;
            self.remove_all_children(g);
            if !self.gates[child.idx()].has_parents() {
                self.enqueue(child);
            }
            self.add_child(g, grandchild);
            self.enqueue(g);
            self.changed = true;
        }
        Ok(())
    }

    fn simplify_ite(&mut self, g: GateId) -> Result<()> {
        let (if_child, then_child, else_child) = self.ite_children(g);

        let det = |c: &Circuit, h: GateId, v: bool| {
            c.gate(h).is_determined() && c.gate(h).value() == v
        };

        if det(self, if_child, true) {
            // ITE(T,t,e) --> t
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Ref;
            self.add_child(g, then_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if det(self, if_child, false) {
            // ITE(F,t,e) --> e
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Ref;
            self.add_child(g, else_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if det(self, then_child, true) {
            // ITE(i,T,e) --> OR(i,e)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Or;
            self.add_child(g, if_child);
            self.add_child(g, else_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        if det(self, then_child, false) {
            // ITE(i,F,e) --> AND(~i,e)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::And;
            let new_not = self.new_not(if_child);
            self.add_child(g, new_not);
            self.add_child(g, else_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        if det(self, else_child, true) {
            // ITE(i,t,T) --> OR(~i,t)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Or;
            let new_not = self.new_not(if_child);
            self.add_child(g, new_not);
            self.add_child(g, then_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        if det(self, else_child, false) {
            // ITE(i,t,F) --> AND(i,t)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::And;
            self.add_child(g, if_child);
            self.add_child(g, then_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        debug_assert!(!self.gate(if_child).is_determined());
        debug_assert!(!self.gate(then_child).is_determined());
        debug_assert!(!self.gate(else_child).is_determined());
        if then_child == else_child {
            // ITE(i,x,x) --> x
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Ref;
            self.add_child(g, then_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if if_child == then_child {
            // ITE(x,x,e) --> OR(x,e)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::Or;
            self.add_child(g, if_child);
            self.add_child(g, else_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        if if_child == else_child {
            // ITE(x,t,x) --> AND(x,t)
            self.enqueue_children(g);
            self.remove_all_children(g);
            self.gates[g.idx()].kind = Kind::And;
            self.add_child(g, if_child);
            self.add_child(g, then_child);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }
        if self.gate(else_child).kind() == Kind::Not
            && self.first_child(else_child) == then_child
        {
            // ITE(x,y,~y) --> EQUIV(x,y)
            self.remove_all_children(g);
            if !self.gates[else_child.idx()].has_parents() {
                self.enqueue(else_child);
            }
            self.gates[g.idx()].kind = Kind::Equiv;
            self.add_child(g, if_child);
            self.add_child(g, then_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if self.gate(then_child).kind() == Kind::Not
            && self.first_child(then_child) == else_child
        {
            // ITE(x,~y,y) --> ODD(x,y)
            self.remove_all_children(g);
            if !self.gates[then_child.idx()].has_parents() {
                self.enqueue(then_child);
            }
            self.gates[g.idx()].kind = Kind::Odd;
            self.add_child(g, if_child);
            self.add_child(g, else_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        Ok(())
    }

    fn simplify_or_and(&mut self, g: GateId, kind: Kind) -> Result<()> {
        debug_assert!(self.count_children(g) >= 1);
        // a true child absorbs an OR; a false child absorbs an AND
        let absorbing = kind == Kind::Or;

        if self.gates[g.idx()].is_determined()
            && self.gates[g.idx()].value() != absorbing
        {
            // OR = F forces every child false; AND = T forces every child true
            loop {
                let head = self.gates[g.idx()].children;
                if head.is_nil() { break }
                let child = self.edges[head.idx()].child;
                if self.gates[child.idx()].is_determined() {
                    if self.gates[child.idx()].value() != !absorbing {
                        return Err(Inconsistent);
                    }
                } else {
                    {
                        let c = self.gate_mut(child);
                        c.determined = true;
                        c.value = !absorbing;
                    }
                    self.enqueue(child);
                }
                self.delete_edge(head);
            }
            self.transform_into_constant(g, !absorbing);
            self.enqueue_parents(g);
            return Ok(());
        }

        let mut absorbing_found = false;
        let mut nof_undet = 0usize;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].is_determined() {
                if self.gates[child.idx()].value() == absorbing {
                    absorbing_found = true;
                    break;
                }
                self.delete_edge(ca);
                if !self.gates[child.idx()].has_parents() {
                    self.enqueue(child);
                }
            } else {
                nof_undet += 1;
            }
            ca = next;
        }
        if absorbing_found {
            self.transform_into_constant(g, absorbing);
            self.enqueue_parents(g);
            return Ok(());
        }
        debug_assert_eq!(self.count_children(g), nof_undet);
        if nof_undet == 0 {
            // every child was the neutral constant
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() != !absorbing {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, !absorbing);
            self.enqueue_parents(g);
            return Ok(());
        }
        if nof_undet == 1 {
            self.gates[g.idx()].kind = Kind::Ref;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        debug_assert!(self.count_children(g) >= 2);
        self.remove_g_not_g_and_duplicate_children(g)?;
        if self.gates[g.idx()].kind() != kind {
            return Ok(());
        }

        self.factor_through_shared_subterm(g, kind);
        if self.gates[g.idx()].kind() != kind {
            return Ok(());
        }
        self.flatten_nested(g, kind);
        Ok(())
    }

    fn simplify_parity(&mut self, g: GateId, _preserve_cnf_normalized_form: bool) -> Result<()> {
        // remove determined children: a true child flips between ODD and
        // EVEN, a false child just disappears
        let mut nof_undet = 0usize;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if !self.gates[child.idx()].is_determined() {
                nof_undet += 1;
                ca = next;
                continue;
            }
            if self.gates[child.idx()].value() {
                let gate = self.gate_mut(g);
                gate.kind = match gate.kind {
                    Kind::Odd => Kind::Even,
                    Kind::Even => Kind::Odd,
                    _ => unreachable!(),
                };
            }
            self.delete_edge(ca);
            if !self.gates[child.idx()].has_parents() {
                self.enqueue(child);
            }
            self.changed = true;
            ca = next;
        }
        if nof_undet == 0 {
            let constant = match self.gates[g.idx()].kind() {
                Kind::Odd => false, // ODD() = F
                Kind::Even => true, // EVEN() = T
                _ => unreachable!(),
            };
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() != constant {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, constant);
            self.enqueue_parents(g);
            return Ok(());
        }
        if nof_undet == 1 {
            match self.gates[g.idx()].kind() {
                Kind::Odd => {
                    // ODD(x) = x
                    self.gates[g.idx()].kind = Kind::Ref;
                }
                Kind::Even => {
                    // EVEN(x) = ~x
                    self.gates[g.idx()].kind = Kind::Not;
                    self.enqueue_parents(g);
                }
                _ => unreachable!(),
            }
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }

        debug_assert_eq!(nof_undet, self.count_children(g));
        debug_assert!(nof_undet >= 2);

        // absorb negations: ODD(~x,...) = EVEN(x,...) and vice versa
        let mut has_determined_children = false;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].kind() == Kind::Not {
                let grandchild = self.first_child(child);
                self.change_child(ca, grandchild);
                if self.gates[grandchild.idx()].is_determined() {
                    has_determined_children = true;
                }
                if !self.gates[child.idx()].has_parents() {
                    self.enqueue(child);
                }
                let gate = self.gate_mut(g);
                gate.kind = match gate.kind {
                    Kind::Odd => Kind::Even,
                    Kind::Even => Kind::Odd,
                    _ => unreachable!(),
                };
                self.changed = true;
            }
            ca = next;
        }
        if has_determined_children {
            // restart: the rules below assume undetermined children
            self.enqueue(g);
            return Ok(());
        }

        self.remove_parity_duplicate_children(g)?;
        if self.gates[g.idx()].in_pstack {
            return Ok(());
        }
        let kind = self.gates[g.idx()].kind();
        if !(kind == Kind::Odd || kind == Kind::Even) {
            return Ok(());
        }

        let nof_undet = self.count_children(g);
        debug_assert!(nof_undet >= 2);
        let gate_determined = self.gates[g.idx()].is_determined();
        let gate_value = self.gates[g.idx()].value();

        if nof_undet == 2 && gate_determined
            && ((kind == Kind::Even && gate_value) || (kind == Kind::Odd && !gate_value))
        {
            // EVEN(x,y) = T and ODD(x,y) = F make the children equivalent
            let (child1, child2) = self.two_children(g);
            if child1 == child2 {
                self.transform_into_constant(g, gate_value);
                self.enqueue_parents(g);
                return Ok(());
            }
            if self.may_transform_input_gates {
                for &(a, b) in [(child1, child2), (child2, child1)].iter() {
                    if self.gates[a.idx()].kind() == Kind::Var && !self.depends_on(b, a) {
                        // a is a free input b does not depend on: a := b
                        self.transform_into_constant(g, gate_value);
                        self.enqueue_parents(g);
                        debug_assert!(!self.gate(a).is_determined());
                        debug_assert!(!self.gate(b).is_determined());
                        self.gates[a.idx()].kind = Kind::Ref;
                        self.add_child(a, b);
                        self.enqueue(a);
                        return Ok(());
                    }
                }
            }
            if self.count_parents(child1) > 1 && self.count_parents(child2) > 1 {
                // both children are used elsewhere; merge those uses
                let (from, to) = if !self.depends_on(child1, child2) {
                    (child2, child1)
                } else {
                    debug_assert!(!self.depends_on(child2, child1));
                    (child1, child2)
                };
                let mut fa = self.gates[from.idx()].parents;
                while !fa.is_nil() {
                    let (parent, next) = {
                        let e = &self.edges[fa.idx()];
                        (e.parent, e.next_parent)
                    };
                    if parent != g {
                        self.change_child(fa, to);
                    }
                    fa = next;
                }
                self.enqueue_parents(to);
                self.changed = true;
            }
        } else if nof_undet == 2 && gate_determined
            && ((kind == Kind::Even && !gate_value) || (kind == Kind::Odd && gate_value))
        {
            // EVEN(x,y) = F and ODD(x,y) = T make the children inequivalent
            let (child1, child2) = self.two_children(g);
            if child1 == child2 {
                return Err(Inconsistent);
            }
            if self.may_transform_input_gates {
                for &(a, b) in [(child1, child2), (child2, child1)].iter() {
                    if self.gates[a.idx()].kind() == Kind::Var && !self.depends_on(b, a) {
                        // a is a free input b does not depend on: a := ~b
                        self.transform_into_constant(g, gate_value);
                        self.enqueue_parents(g);
                        debug_assert!(!self.gate(a).is_determined());
                        debug_assert!(!self.gate(b).is_determined());
                        self.gates[a.idx()].kind = Kind::Not;
                        self.add_child(a, b);
                        self.enqueue_parents(a);
                        self.enqueue(a);
                        return Ok(());
                    }
                }
            }
            if self.count_parents(child1) > 1 && self.count_parents(child2) > 1 {
                let (keep, from) = if self.gates[child1.idx()].kind() == Kind::Var
                    || !self.depends_on(child1, child2)
                {
                    (child1, child2)
                } else {
                    debug_assert!(!self.depends_on(child2, child1));
                    (child2, child1)
                };
                // uses of `from` outside this gate become NOT(keep)
                let new_not = self.new_not(keep);
                let mut fa = self.gates[from.idx()].parents;
                while !fa.is_nil() {
                    let (parent, next) = {
                        let e = &self.edges[fa.idx()];
                        (e.parent, e.next_parent)
                    };
                    if parent != g {
                        self.change_child(fa, new_not);
                    }
                    fa = next;
                }
                self.enqueue_parents(new_not);
                self.enqueue(new_not);
                self.changed = true;
            }
        }

        let kind = self.gates[g.idx()].kind();
        if kind == Kind::Odd && self.count_children(g) == 2 {
            // ODD(x, OR(x,y,z)) = AND(~x, OR(y,z)) when the OR is unshared
            let (child1, child2) = self.two_children(g);
            debug_assert!(!self.gate(child1).is_determined());
            debug_assert!(!self.gate(child2).is_determined());
            for &(x, or) in [(child1, child2), (child2, child1)].iter() {
                if self.gates[or.idx()].kind() == Kind::Or && self.count_parents(or) == 1 {
                    let found = self.children(or).any(|c| c == x);
                    if !found {
                        continue;
                    }
                    let others: Vec<GateId> =
                        self.children(or).filter(|&c| c != x).collect();
                    if others.is_empty() {
                        continue;
                    }
                    let new_or = self.new_or(&others);
                    self.remove_all_children(g);
                    if !self.gates[or.idx()].has_parents() {
                        self.enqueue(or);
                    }
                    let new_not = self.new_not(x);
                    self.gates[g.idx()].kind = Kind::And;
                    self.add_child(g, new_not);
                    self.add_child(g, new_or);
                    self.enqueue(g);
                    self.enqueue(new_not);
                    self.enqueue(new_or);
                    self.changed = true;
                    return Ok(());
                }
            }
        }

        // nested ODD/EVEN collapse is never applied: it would break the
        // binary normal form the CNF translation relies on
        Ok(())
    }

    fn simplify_equiv(&mut self, g: GateId) -> Result<()> {
        debug_assert!(!self.gates[g.idx()].children.is_nil());

        if self.count_children(g) == 1 {
            // EQUIV(x) = T
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            self.enqueue_parents(g);
            return Ok(());
        }

        // a determined child turns the gate into AND (true child) or
        // NOT(OR(...)) (false child)
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if self.gates[child.idx()].is_determined() {
                if self.gates[child.idx()].value() {
                    // EQUIV(T,x,y) --> AND(T,x,y)
                    self.gates[g.idx()].kind = Kind::And;
                    self.enqueue_parents(g);
                    self.enqueue(g);
                    self.changed = true;
                    return Ok(());
                }
                // EQUIV(F,x,y) --> NOT(OR(F,x,y))
                let new_or = self.install(Kind::Or);
                loop {
                    let head = self.gates[g.idx()].children;
                    if head.is_nil() { break }
                    self.change_parent(head, new_or);
                }
                self.gates[g.idx()].kind = Kind::Not;
                self.add_child(g, new_or);
                self.enqueue_parents(g);
                self.enqueue(g);
                self.enqueue(new_or);
                self.changed = true;
                return Ok(());
            }
            ca = next;
        }

        self.remove_g_not_g_and_duplicate_children(g)?;
        if self.gates[g.idx()].in_pstack {
            return Ok(());
        }
        if self.gates[g.idx()].kind() != Kind::Equiv {
            return Ok(());
        }

        if self.gates[g.idx()].is_determined() && self.gates[g.idx()].value() {
            // all children are equivalent
            if self.may_transform_input_gates {
                // unify the free inputs among the children
                let mut first_input: Option<GateId> = None;
                let mut unified = false;
                let mut ca = self.gates[g.idx()].children;
                while !ca.is_nil() {
                    let (child, next, prev) = {
                        let e = &self.edges[ca.idx()];
                        (e.child, e.next_child, e.prev_child)
                    };
                    if self.gates[child.idx()].kind() != Kind::Var {
                        ca = next;
                        continue;
                    }
                    debug_assert!(!self.gate(child).is_determined());
                    if self.count_parents(child) == 1 {
                        // unshared input x in EQUIV(x,y,...) = T: x := y
                        let other = if !next.is_nil() {
                            self.edges[next.idx()].child
                        } else {
                            debug_assert!(!prev.is_nil());
                            self.edges[prev.idx()].child
                        };
                        debug_assert!(other != child);
                        self.gates[child.idx()].kind = Kind::Ref;
                        self.add_child(child, other);
                        self.enqueue(g);
                        self.enqueue(child);
                        self.changed = true;
                        return Ok(());
                    }
                    match first_input {
                        None => first_input = Some(child),
                        Some(fi) => {
                            unified = true;
                            self.gates[child.idx()].kind = Kind::Ref;
                            self.add_child(child, fi);
                            self.enqueue(child);
                            self.changed = true;
                        }
                    }
                    ca = next;
                }
                if unified {
                    self.enqueue_parents(first_input.unwrap());
                    return Ok(());
                }
            }
            // pick a child that depends on no other child (ties broken by
            // smallest index) and move the other children's external uses
            // onto it
            let children: Vec<GateId> = self.children(g).collect();
            let mut least = children[0];
            let mut found = false;
            for &c in children.iter() {
                let independent = children.iter()
                    .all(|&d| d == c || !self.depends_on(c, d));
                if independent {
                    least = c;
                    found = true;
                    break;
                }
            }
            debug_assert!(found);
            let mut moved = false;
            for &child in children.iter() {
                if child == least {
                    continue;
                }
                let mut fa = self.gates[child.idx()].parents;
                while !fa.is_nil() {
                    let (parent, next) = {
                        let e = &self.edges[fa.idx()];
                        (e.parent, e.next_parent)
                    };
                    if parent != g {
                        self.change_child(fa, least);
                        moved = true;
                    }
                    fa = next;
                }
                debug_assert_eq!(self.count_parents(child), 1);
            }
            if moved {
                self.enqueue_parents(least);
                self.changed = true;
            }
            return Ok(());
        }

        if self.gates[g.idx()].is_determined()
            && !self.gates[g.idx()].value()
            && self.count_children(g) == 2
        {
            // EQUIV(x,y) = F  <=>  EVEN(x,y) = F
            self.gates[g.idx()].kind = Kind::Even;
            self.enqueue_parents(g);
            self.enqueue(g);
            self.changed = true;
        }
        Ok(())
    }

    fn simplify_threshold(&mut self, g: GateId) -> Result<()> {
        if self.gates[g.idx()].tmin > self.gates[g.idx()].tmax {
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, false);
            self.enqueue_parents(g);
            return Ok(());
        }

        // absorb determined children, updating the window
        let mut nof_undet = 0usize;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            debug_assert!(self.gates[g.idx()].tmin <= self.gates[g.idx()].tmax);
            if self.gates[g.idx()].tmax == 0 {
                // [0,0](x,y,z) = NOT(OR(x,y,z))
                return self.threshold_to_not_or(g, false);
            }
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if !self.gates[child.idx()].is_determined() {
                nof_undet += 1;
                ca = next;
                continue;
            }
            if !self.gates[child.idx()].value() {
                // [L,U](F,x,y) = [L,U](x,y)
                self.delete_edge(ca);
                self.changed = true;
                ca = next;
                continue;
            }
            // [L,U](T,x,y) = [L-1,U-1](x,y)
            debug_assert!(self.gates[g.idx()].tmax > 0);
            {
                let gate = self.gate_mut(g);
                gate.tmin = gate.tmin.saturating_sub(1);
                gate.tmax -= 1;
            }
            self.delete_edge(ca);
            self.changed = true;
            ca = next;
        }

        let (tmin, tmax) = self.gates[g.idx()].bounds();
        debug_assert!(tmin <= tmax);
        if tmin as usize > nof_undet {
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, false);
            self.enqueue_parents(g);
            return Ok(());
        }
        if tmax as usize > nof_undet {
            self.gates[g.idx()].tmax = nof_undet as u32;
        }
        let (tmin, tmax) = self.gates[g.idx()].bounds();

        if self.gates[g.idx()].children.is_nil() {
            debug_assert!(tmin == 0 && tmax == 0);
            // [0,0]() = T
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            self.enqueue_parents(g);
            return Ok(());
        }
        if tmax == 0 {
            // [0,0](x,y,z) = NOT(OR(x,y,z))
            return self.threshold_to_not_or(g, true);
        }
        if tmin as usize == nof_undet {
            // [n,n](x_1..x_n) = AND(x_1..x_n)
            let gate = self.gate_mut(g);
            gate.kind = Kind::And;
            gate.tmin = 0;
            gate.tmax = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if tmin == 0 && tmax as usize == nof_undet {
            // [0,n](x_1..x_n) = T
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            self.enqueue_parents(g);
            return Ok(());
        }
        if tmin == 0 && tmax as usize + 1 == nof_undet {
            // [0,n-1](x_1..x_n) = NOT(AND(x_1..x_n))
            let new_and = self.install(Kind::And);
            self.enqueue(new_and);
            loop {
                let head = self.gates[g.idx()].children;
                if head.is_nil() { break }
                self.change_parent(head, new_and);
            }
            {
                let gate = self.gate_mut(g);
                gate.kind = Kind::Not;
                gate.tmin = 0;
                gate.tmax = 0;
            }
            self.add_child(g, new_and);
            self.enqueue(g);
            self.enqueue_parents(g);
            self.changed = true;
            return Ok(());
        }

        if self.gates[g.idx()].is_determined() && self.gates[g.idx()].value() {
            // [l,u](S) = T bounds every AND over a superset-marked subset:
            // an AND whose children all lie in S and number more than u
            // must be false
            let tmax = self.gates[g.idx()].tmax as usize;
            let mut ca = self.gates[g.idx()].children;
            while !ca.is_nil() {
                let child = self.edges[ca.idx()].child;
                self.gates[child.idx()].temp = 1;
                ca = self.edges[ca.idx()].next_child;
            }
            let mut err = false;
            let mut ca = self.gates[g.idx()].children;
            'outer: while !ca.is_nil() {
                let child = self.edges[ca.idx()].child;
                let mut fa = self.gates[child.idx()].parents;
                while !fa.is_nil() {
                    let parent = self.edges[fa.idx()].parent;
                    let mut next_fa = self.edges[fa.idx()].next_parent;
                    while !next_fa.is_nil() && self.edges[next_fa.idx()].parent == parent {
                        next_fa = self.edges[next_fa.idx()].next_parent;
                    }
                    if self.gates[parent.idx()].kind() == Kind::And {
                        let mut all_same = true;
                        let mut nof_children = 0usize;
                        let mut fca = self.gates[parent.idx()].children;
                        while !fca.is_nil() {
                            let pc = self.edges[fca.idx()].child;
                            if self.gates[pc.idx()].temp != 1 {
                                all_same = false;
                                break;
                            }
                            nof_children += 1;
                            fca = self.edges[fca.idx()].next_child;
                        }
                        if all_same && nof_children > tmax {
                            if self.gates[parent.idx()].is_determined()
                                && self.gates[parent.idx()].value()
                            {
                                err = true;
                                break 'outer;
                            }
                            self.transform_into_constant(parent, false);
                            self.enqueue_parents(parent);
                        }
                    }
                    fa = next_fa;
                }
                ca = self.edges[ca.idx()].next_child;
            }
            let mut ca = self.gates[g.idx()].children;
            while !ca.is_nil() {
                let child = self.edges[ca.idx()].child;
                self.gates[child.idx()].temp = 0;
                ca = self.edges[ca.idx()].next_child;
            }
            if err {
                return Err(Inconsistent);
            }
        }

        if self.gates[g.idx()].kind() != Kind::Threshold {
            return Ok(());
        }
        self.remove_cardinality_g_not_g(g)
    }

    // [_,0](x,y,z) = NOT(OR(x,y,z))
    fn threshold_to_not_or(&mut self, g: GateId, enqueue_parents: bool) -> Result<()> {
        let new_or = self.install(Kind::Or);
        self.enqueue(new_or);
        loop {
            let head = self.gates[g.idx()].children;
            if head.is_nil() { break }
            self.change_parent(head, new_or);
        }
        {
            let gate = self.gate_mut(g);
            gate.kind = Kind::Not;
            gate.tmin = 0;
            gate.tmax = 0;
        }
        self.add_child(g, new_or);
        self.enqueue(g);
        if enqueue_parents {
            self.enqueue_parents(g);
        }
        self.changed = true;
        Ok(())
    }

    fn simplify_atleast(&mut self, g: GateId) -> Result<()> {
        // absorb determined children, updating the bound
        let mut nof_undet = 0usize;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let (child, next) = {
                let e = &self.edges[ca.idx()];
                (e.child, e.next_child)
            };
            if !self.gates[child.idx()].is_determined() {
                nof_undet += 1;
                ca = next;
                continue;
            }
            if self.gates[child.idx()].value() {
                // (>= l)(T,x,y) = (>= l-1)(x,y)
                let gate = self.gate_mut(g);
                gate.tmin = gate.tmin.saturating_sub(1);
            }
            // (>= l)(F,x,y) = (>= l)(x,y)
            self.delete_edge(ca);
            self.changed = true;
            ca = next;
        }

        let tmin = self.gates[g.idx()].tmin;
        if tmin == 0 {
            // trivially true
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            self.enqueue_parents(g);
            return Ok(());
        }
        if tmin as usize > nof_undet {
            // trivially false
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, false);
            self.enqueue_parents(g);
            return Ok(());
        }
        debug_assert!(!self.gates[g.idx()].children.is_nil());
        if tmin as usize == nof_undet {
            // (>= n)(x_1..x_n) = AND(x_1..x_n)
            let gate = self.gate_mut(g);
            gate.kind = Kind::And;
            gate.tmin = 0;
            gate.tmax = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if tmin == 1 {
            // (>= 1)(x_1..x_n) = OR(x_1..x_n)
            let gate = self.gate_mut(g);
            gate.kind = Kind::Or;
            gate.tmin = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        // complementary-pair reduction for ATLEAST is intentionally not
        // performed; determined children are the only absorption
        Ok(())
    }

}
