
//! Rewriting into clausally translatable form.
//!
//! After `cnf_normalize` has run to fixpoint, no REF survives, no NOT has a
//! NOT child or a determined value, AND/OR are at least binary,
//! EQUIV/EVEN/ODD are exactly binary, ITE is ternary, and every cardinality
//! gate has been eliminated, either by splitting into shared ATLEAST
//! decompositions or by counting the true children with an adder network.
//!
//! `edimacs_normalize` is the weaker sibling used by the extended-DIMACS
//! writer: n-ary connectives and ATLEAST gates survive, since the format
//! can express them directly.

use {
    crate::gate::{GateId, Kind},
    crate::circuit::{Circuit, Result, Inconsistent},
};

impl Circuit {
    /// Rewrite every live gate into CNF-translatable normal form.
    pub fn cnf_normalize(&mut self) -> Result<()> {
        loop {
            self.changed = false;
            let n = self.gates.len();
            for i in 0..n {
                if !self.gates[i].is_deleted() {
                    self.enqueue(GateId(i as u32));
                }
            }
            while let Some(g) = self.pop_pstack() {
                self.cnf_normalize_gate(g)?;
            }
            if !self.changed {
                debug!("cnf_normalize: fixpoint, {} live gates", self.count_gates());
                return Ok(());
            }
        }
    }

    /// Rewrite every live gate into extended-DIMACS-translatable form.
    pub fn edimacs_normalize(&mut self) -> Result<()> {
        loop {
            self.changed = false;
            let n = self.gates.len();
            for i in 0..n {
                if !self.gates[i].is_deleted() {
                    self.enqueue(GateId(i as u32));
                }
            }
            while let Some(g) = self.pop_pstack() {
                self.edimacs_normalize_gate(g)?;
            }
            if !self.changed {
                return Ok(());
            }
        }
    }

    // Propagate a determined value into a constant gate slot.
    fn normalize_constant(&mut self, g: GateId, constant: bool) -> Result<()> {
        debug_assert!(self.gates[g.idx()].children.is_nil());
        let gate = self.gate_mut(g);
        if gate.determined && gate.value != constant {
            return Err(Inconsistent);
        }
        gate.determined = true;
        gate.value = constant;
        Ok(())
    }

    // Remove a REF gate, redirecting its parents and names to the child.
    fn normalize_ref(&mut self, g: GateId) -> Result<()> {
        debug_assert_eq!(self.count_children(g), 1);
        let child = self.first_child(g);
        debug_assert!(child != g);
        if self.gates[g.idx()].is_determined() {
            let v = self.gates[g.idx()].value();
            if self.gates[child.idx()].is_determined()
                && self.gates[child.idx()].value() != v
            {
                return Err(Inconsistent);
            }
            {
                let c = self.gate_mut(child);
                c.determined = true;
                c.value = v;
            }
            self.enqueue(child);
        }
        loop {
            let fa = self.gates[g.idx()].parents;
            if fa.is_nil() { break }
            let parent = self.edges[fa.idx()].parent;
            self.change_child(fa, child);
            self.enqueue(parent);
        }
        let names = std::mem::replace(&mut self.gates[g.idx()].names, Default::default());
        self.gates[child.idx()].names.extend(names);
        self.remove_all_children(g);
        self.gates[g.idx()].kind = Kind::Deleted;
        self.changed = true;
        Ok(())
    }

    // Determined NOTs are pushed down onto the child and double negations
    // are short-circuited; the NOT-less translation relies on both.
    fn normalize_not(&mut self, g: GateId) -> Result<()> {
        debug_assert_eq!(self.count_children(g), 1);
        let child = self.first_child(g);
        if self.gates[g.idx()].is_determined() {
            let v = self.gates[g.idx()].value();
            if self.gates[child.idx()].is_determined()
                && self.gates[child.idx()].value() == v
            {
                return Err(Inconsistent);
            }
            {
                let c = self.gate_mut(child);
                c.determined = true;
                c.value = !v;
            }
            self.enqueue(child);
            self.transform_into_constant(g, v);
            return Ok(());
        }
        if self.gates[child.idx()].kind() == Kind::Not {
            // g := ~~h  -->  g := h
            debug_assert_eq!(self.count_children(child), 1);
            let grandchild = self.first_child(child);
            debug_assert!(grandchild != g);
            loop {
                let fa = self.gates[g.idx()].parents;
                if fa.is_nil() { break }
                let parent = self.edges[fa.idx()].parent;
                self.change_child(fa, grandchild);
                self.enqueue(parent);
            }
            let names = std::mem::replace(&mut self.gates[g.idx()].names, Default::default());
            self.gates[grandchild.idx()].names.extend(names);
            self.remove_all_children(g);
            if !self.gates[child.idx()].has_parents() {
                self.enqueue(child);
            }
            self.gates[g.idx()].kind = Kind::Deleted;
            self.changed = true;
        }
        Ok(())
    }

    fn cnf_normalize_gate(&mut self, g: GateId) -> Result<()> {
        match self.gates[g.idx()].kind() {
            Kind::Deleted => Ok(()),
            Kind::False => self.normalize_constant(g, false),
            Kind::True => self.normalize_constant(g, true),
            Kind::Var => {
                debug_assert_eq!(self.count_children(g), 0);
                Ok(())
            }
            Kind::Ref => self.normalize_ref(g),
            Kind::Not => self.normalize_not(g),

            Kind::Or | Kind::And => {
                debug_assert!(self.count_children(g) >= 1);
                if self.count_children(g) == 1 {
                    // unary ANDs and ORs are removed
                    self.gates[g.idx()].kind = Kind::Ref;
                    self.enqueue(g);
                    self.changed = true;
                }
                Ok(())
            }

            Kind::Equiv => {
                let nof_children = self.count_children(g);
                debug_assert!(nof_children >= 1);
                if nof_children == 1 {
                    // EQUIV(x) = T
                    let gate = self.gate(g);
                    if gate.is_determined() && !gate.value() {
                        return Err(Inconsistent);
                    }
                    self.transform_into_constant(g, true);
                    return Ok(());
                }
                if nof_children == 2 {
                    return Ok(());
                }
                // g := EQUIV(c1,..,cn) -->
                // g := OR(AND(c1,..,cn), AND(~c1,..,~cn))
                let children: Vec<GateId> = self.children(g).collect();
                let new_child1 = self.install(Kind::And);
                for &c in children.iter() {
                    self.add_child(new_child1, c);
                }
                self.enqueue(new_child1);
                let new_child2 = self.install(Kind::And);
                self.enqueue(new_child2);
                for &c in children.iter() {
                    let not_child = self.new_not(c);
                    self.enqueue(not_child);
                    self.add_child(new_child2, not_child);
                }
                self.gates[g.idx()].kind = Kind::Or;
                self.remove_all_children(g);
                self.add_child(g, new_child1);
                self.add_child(g, new_child2);
                self.changed = true;
                Ok(())
            }

            Kind::Ite => {
                // translated directly to clauses, no expansion needed
                debug_assert_eq!(self.count_children(g), 3);
                Ok(())
            }

            Kind::Threshold => self.cnf_normalize_threshold(g),
            Kind::Atleast => self.cnf_normalize_atleast(g),

            Kind::Even => {
                let nof_children = self.count_children(g);
                debug_assert!(nof_children >= 1);
                if nof_children == 1 {
                    // EVEN(x) = ~x
                    self.gates[g.idx()].kind = Kind::Not;
                    self.enqueue(g);
                    self.changed = true;
                    return Ok(());
                }
                if nof_children == 2 {
                    return Ok(());
                }
                // EVEN(c1,..,cn) = NOT(ODD(c1,..,cn))
                let new_odd = self.install(Kind::Odd);
                self.enqueue(new_odd);
                loop {
                    let head = self.gates[g.idx()].children;
                    if head.is_nil() { break }
                    let child = self.edges[head.idx()].child;
                    self.add_child(new_odd, child);
                    self.delete_edge(head);
                }
                self.gates[g.idx()].kind = Kind::Not;
                self.add_child(g, new_odd);
                self.enqueue(g);
                self.changed = true;
                Ok(())
            }

            Kind::Odd => {
                let nof_children = self.count_children(g);
                debug_assert!(nof_children >= 1);
                if nof_children == 1 {
                    // ODD(x) = x
                    self.gates[g.idx()].kind = Kind::Ref;
                    self.enqueue(g);
                    self.changed = true;
                    return Ok(());
                }
                if nof_children == 2 {
                    return Ok(());
                }
                // ODD(c1,..,cn) = ODD(c1, ODD(c2,..,cn))
                let new_odd = self.install(Kind::Odd);
                self.enqueue(new_odd);
                let child1 = self.first_child(g);
                let head = self.gates[g.idx()].children;
                self.delete_edge(head);
                loop {
                    let head = self.gates[g.idx()].children;
                    if head.is_nil() { break }
                    let child = self.edges[head.idx()].child;
                    self.add_child(new_odd, child);
                    self.delete_edge(head);
                }
                self.add_child(g, new_odd);
                self.add_child(g, child1);
                self.changed = true;
                Ok(())
            }

            k => panic!("cnf_normalize: not implemented for {}", k.name()),
        }
    }

    fn cnf_normalize_threshold(&mut self, g: GateId) -> Result<()> {
        let nof_children = self.count_children(g);
        debug_assert!(nof_children >= 1);
        if self.gates[g.idx()].bounds().0 as usize > nof_children {
            return self.threshold_trivially_false(g);
        }
        if self.gates[g.idx()].bounds().1 as usize > nof_children {
            self.gates[g.idx()].tmax = nof_children as u32;
        }
        let (tmin, tmax) = self.gates[g.idx()].bounds();
        if tmin > tmax {
            return self.threshold_trivially_false(g);
        }

        if nof_children == 1 {
            if tmin == 0 && tmax == 1 {
                // [0,1](x) = T
                let gate = self.gate(g);
                if gate.is_determined() && !gate.value() {
                    return Err(Inconsistent);
                }
                self.transform_into_constant(g, true);
                return Ok(());
            } else if tmin == 0 && tmax == 0 {
                // [0,0](x) = ~x
                let gate = self.gate_mut(g);
                gate.kind = Kind::Not;
                gate.tmin = 0;
                gate.tmax = 0;
                self.enqueue(g);
                self.changed = true;
                return Ok(());
            } else {
                debug_assert!(tmin == 1 && tmax == 1);
                // [1,1](x) = x
                let gate = self.gate_mut(g);
                gate.kind = Kind::Ref;
                gate.tmin = 0;
                gate.tmax = 0;
                self.enqueue(g);
                self.changed = true;
                return Ok(());
            }
        }

        debug_assert!(nof_children >= 2);

        if tmin == 0 && tmax as usize == nof_children {
            // [0,n](c1..cn) = T
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            return Ok(());
        }
        if tmin == 1 && tmax as usize == nof_children {
            // [1,n](c1..cn) = OR(c1..cn)
            let gate = self.gate_mut(g);
            gate.kind = Kind::Or;
            gate.tmin = 0;
            gate.tmax = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }

        // a heuristic choice between the adder and the decomposition
        // construction (untuned)
        let narrow = tmax <= 2
            || tmin as usize + 2 >= nof_children
            || (tmin <= 2 && tmax as usize + 2 >= nof_children);
        if !narrow {
            // count the true children with an adder network and compare
            // the count against the two bounds
            let children: Vec<GateId> = self.children(g).collect();
            let sum = self.add_true_gate_counter(&children);
            let tmin_bits = self.add_unsigned_constant(tmin);
            let tmax_bits = self.add_unsigned_constant(tmax);
            let ge = self.add_unsigned_ge(&sum, &tmin_bits);
            let le = self.add_unsigned_le(&sum, &tmax_bits);
            self.remove_all_children(g);
            {
                let gate = self.gate_mut(g);
                gate.kind = Kind::And;
                gate.tmin = 0;
                gate.tmax = 0;
            }
            self.add_child(g, ge);
            self.add_child(g, le);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }

        // the sharing decomposition construction
        if tmin == 0 {
            // [0,u](c1..cn) = ~(>= u+1)(c1..cn)
            let new_child = self.install(Kind::Atleast);
            self.enqueue(new_child);
            self.gates[new_child.idx()].tmin = tmax + 1;
            loop {
                let head = self.gates[g.idx()].children;
                if head.is_nil() { break }
                self.change_parent(head, new_child);
            }
            {
                let gate = self.gate_mut(g);
                gate.kind = Kind::Not;
                gate.tmin = 0;
                gate.tmax = 0;
            }
            self.add_child(g, new_child);
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if tmax as usize == nof_children {
            debug_assert!(tmin > 0);
            // [l,n](c1..cn) = (>= l)(c1..cn)
            let gate = self.gate_mut(g);
            gate.kind = Kind::Atleast;
            gate.tmax = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }

        debug_assert!(tmin > 0);
        debug_assert!((tmax as usize) < nof_children);
        debug_assert!(tmin <= tmax);

        // [l,u](c1..cn) = (>= l)(c1..cn) & ~(>= u+1)(c1..cn)
        let children: Vec<GateId> = self.children(g).collect();
        let new_child1 = self.install(Kind::Atleast);
        self.enqueue(new_child1);
        self.gates[new_child1.idx()].tmin = tmin;
        for &c in children.iter() {
            self.add_child(new_child1, c);
        }
        let new_child2 = self.install(Kind::Atleast);
        self.enqueue(new_child2);
        self.gates[new_child2.idx()].tmin = tmax + 1;
        loop {
            let head = self.gates[g.idx()].children;
            if head.is_nil() { break }
            self.change_parent(head, new_child2);
        }
        let new_child3 = self.new_not(new_child2);
        self.enqueue(new_child3);
        self.add_child(g, new_child1);
        self.add_child(g, new_child3);
        {
            let gate = self.gate_mut(g);
            gate.kind = Kind::And;
            gate.tmin = 0;
            gate.tmax = 0;
        }
        self.changed = true;
        Ok(())
    }

    fn threshold_trivially_false(&mut self, g: GateId) -> Result<()> {
        let gate = self.gate(g);
        if gate.is_determined() && gate.value() {
            return Err(Inconsistent);
        }
        self.transform_into_constant(g, false);
        Ok(())
    }

    // The shared recursive decomposition
    //   (>= k)(c1..cn) = (c1 & (>= k-1)(c2..cn)) | (>= k)(c2..cn)
    // materialized as a (k+1) x (n+1) grid of gates with common subresults
    // shared, so the eventual clause count is O(k * n).
    fn cnf_normalize_atleast(&mut self, g: GateId) -> Result<()> {
        let nof_children = self.count_children(g);
        debug_assert!(nof_children >= 1);
        let tmin = self.gates[g.idx()].tmin;
        if tmin == 0 {
            // trivially true
            let gate = self.gate(g);
            if gate.is_determined() && !gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, true);
            return Ok(());
        }
        if tmin as usize > nof_children {
            // trivially false
            let gate = self.gate(g);
            if gate.is_determined() && gate.value() {
                return Err(Inconsistent);
            }
            self.transform_into_constant(g, false);
            return Ok(());
        }
        if tmin == 1 {
            // (>= 1)(c1..cn) = OR(c1..cn)
            let gate = self.gate_mut(g);
            gate.kind = Kind::Or;
            gate.tmin = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        if tmin as usize == nof_children {
            // (>= n)(c1..cn) = AND(c1..cn)
            let gate = self.gate_mut(g);
            gate.kind = Kind::And;
            gate.tmin = 0;
            self.enqueue(g);
            self.changed = true;
            return Ok(());
        }
        debug_assert!(nof_children >= 2);
        debug_assert!((tmin as usize) < nof_children);

        let childs: Vec<GateId> = self.children(g).collect();
        let k = tmin as usize;
        let n = childs.len();

        // grid[i][j] will hold the gate for (>= i)(c1..cj); cells are
        // allocated lazily, so only the reachable part is built
        let mut grid: Vec<Vec<Option<GateId>>> = vec![vec![None; n + 1]; k + 1];
        let mut defined: Vec<Vec<bool>> = vec![vec![false; n + 1]; k + 1];
        grid[k][n] = Some(g);
        self.remove_all_children(g);
        self.gates[g.idx()].tmin = 0;

        let mut todo: Vec<(usize, usize)> = vec![(k, n)];
        while let Some((i, j)) = todo.pop() {
            debug_assert!(i > 0 && i <= k);
            debug_assert!(j >= i && j <= n);
            if defined[i][j] {
                continue;
            }
            defined[i][j] = true;
            let cell = grid[i][j].expect("atleast grid cell referenced but never allocated");
            self.enqueue(cell);
            if i == j {
                if i == 1 {
                    self.gates[cell.idx()].kind = Kind::Ref;
                    self.add_child(cell, childs[j - 1]);
                    continue;
                }
                let sub = self.grid_cell(&mut grid, i - 1, j - 1);
                self.gates[cell.idx()].kind = Kind::And;
                self.add_child(cell, childs[j - 1]);
                self.add_child(cell, sub);
                todo.push((i - 1, j - 1));
                continue;
            }
            if i == 1 {
                let sub = self.grid_cell(&mut grid, i, j - 1);
                self.gates[cell.idx()].kind = Kind::Or;
                self.add_child(cell, childs[j - 1]);
                self.add_child(cell, sub);
                todo.push((i, j - 1));
                continue;
            }
            let sub1 = self.grid_cell(&mut grid, i - 1, j - 1);
            let new_gate = self.install(Kind::And);
            self.add_child(new_gate, childs[j - 1]);
            self.add_child(new_gate, sub1);
            self.enqueue(new_gate);
            todo.push((i - 1, j - 1));
            let sub2 = self.grid_cell(&mut grid, i, j - 1);
            self.gates[cell.idx()].kind = Kind::Or;
            self.add_child(cell, new_gate);
            self.add_child(cell, sub2);
            todo.push((i, j - 1));
        }
        self.changed = true;
        Ok(())
    }

    fn grid_cell(
        &mut self,
        grid: &mut Vec<Vec<Option<GateId>>>,
        i: usize,
        j: usize,
    ) -> GateId {
        match grid[i][j] {
            Some(c) => c,
            None => {
                let c = self.new_undef();
                grid[i][j] = Some(c);
                c
            }
        }
    }

    fn edimacs_normalize_gate(&mut self, g: GateId) -> Result<()> {
        if self.gates[g.idx()].kind() == Kind::Deleted {
            return Ok(());
        }
        if self.gates[g.idx()].kind().is_commutative() {
            self.sort_children(g);
        }
        match self.gates[g.idx()].kind() {
            Kind::False => self.normalize_constant(g, false),
            Kind::True => self.normalize_constant(g, true),
            Kind::Var => Ok(()),
            Kind::Ref => self.normalize_ref(g),
            Kind::Not => self.normalize_not(g),

            Kind::Or | Kind::And => {
                debug_assert!(self.count_children(g) >= 1);
                if self.count_children(g) == 1 {
                    self.gates[g.idx()].kind = Kind::Ref;
                    self.enqueue(g);
                    self.changed = true;
                }
                Ok(())
            }

            Kind::Equiv => {
                debug_assert!(self.count_children(g) >= 1);
                if self.count_children(g) == 1 {
                    let gate = self.gate(g);
                    if gate.is_determined() && !gate.value() {
                        return Err(Inconsistent);
                    }
                    self.transform_into_constant(g, true);
                }
                Ok(())
            }

            Kind::Ite => {
                debug_assert_eq!(self.count_children(g), 3);
                Ok(())
            }

            Kind::Threshold => {
                // the format only carries equal-bound windows, so follow
                // the same decomposition as the CNF path minus the adder
                let nof_children = self.count_children(g);
                debug_assert!(nof_children >= 1);
                let (tmin, _) = self.gates[g.idx()].bounds();
                if tmin as usize > nof_children {
                    return self.threshold_trivially_false(g);
                }
                if self.gates[g.idx()].tmax as usize > nof_children {
                    self.gates[g.idx()].tmax = nof_children as u32;
                }
                let (tmin, tmax) = self.gates[g.idx()].bounds();
                if tmin > tmax {
                    return self.threshold_trivially_false(g);
                }
                if nof_children == 1 {
                    if tmin == 0 && tmax == 1 {
                        let gate = self.gate(g);
                        if gate.is_determined() && !gate.value() {
                            return Err(Inconsistent);
                        }
                        self.transform_into_constant(g, true);
                        return Ok(());
                    } else if tmin == 0 && tmax == 0 {
                        let gate = self.gate_mut(g);
                        gate.kind = Kind::Not;
                        gate.tmin = 0;
                        gate.tmax = 0;
                        self.enqueue(g);
                        self.changed = true;
                        return Ok(());
                    } else {
                        debug_assert!(tmin == 1 && tmax == 1);
                        let gate = self.gate_mut(g);
                        gate.kind = Kind::Ref;
                        gate.tmin = 0;
                        gate.tmax = 0;
                        self.enqueue(g);
                        self.changed = true;
                        return Ok(());
                    }
                }
                if tmin == 0 && tmax as usize == nof_children {
                    let gate = self.gate(g);
                    if gate.is_determined() && !gate.value() {
                        return Err(Inconsistent);
                    }
                    self.transform_into_constant(g, true);
                    return Ok(());
                }
                if tmin == 0 {
                    // [0,u] = ~(>= u+1)
                    let new_child = self.install(Kind::Atleast);
                    self.enqueue(new_child);
                    self.gates[new_child.idx()].tmin = tmax + 1;
                    loop {
                        let head = self.gates[g.idx()].children;
                        if head.is_nil() { break }
                        self.change_parent(head, new_child);
                    }
                    {
                        let gate = self.gate_mut(g);
                        gate.kind = Kind::Not;
                        gate.tmin = 0;
                        gate.tmax = 0;
                    }
                    self.add_child(g, new_child);
                    self.enqueue(g);
                    self.changed = true;
                    return Ok(());
                }
                if tmax as usize == nof_children {
                    // [l,n] = (>= l)
                    let gate = self.gate_mut(g);
                    gate.kind = Kind::Atleast;
                    gate.tmax = 0;
                    self.enqueue(g);
                    self.changed = true;
                    return Ok(());
                }
                // [l,u] = (>= l) & ~(>= u+1)
                let children: Vec<GateId> = self.children(g).collect();
                let new_child1 = self.install(Kind::Atleast);
                self.enqueue(new_child1);
                self.gates[new_child1.idx()].tmin = tmin;
                for &c in children.iter() {
                    self.add_child(new_child1, c);
                }
                let new_child2 = self.install(Kind::Atleast);
                self.enqueue(new_child2);
                self.gates[new_child2.idx()].tmin = tmax + 1;
                loop {
                    let head = self.gates[g.idx()].children;
                    if head.is_nil() { break }
                    self.change_parent(head, new_child2);
                }
                let new_child3 = self.new_not(new_child2);
                self.enqueue(new_child3);
                self.add_child(g, new_child1);
                self.add_child(g, new_child3);
                {
                    let gate = self.gate_mut(g);
                    gate.kind = Kind::And;
                    gate.tmin = 0;
                    gate.tmax = 0;
                }
                self.changed = true;
                Ok(())
            }

            Kind::Atleast => {
                let nof_children = self.count_children(g);
                debug_assert!(nof_children >= 1);
                let tmin = self.gates[g.idx()].tmin;
                if tmin == 0 {
                    let gate = self.gate(g);
                    if gate.is_determined() && !gate.value() {
                        return Err(Inconsistent);
                    }
                    self.transform_into_constant(g, true);
                    return Ok(());
                }
                if tmin as usize > nof_children {
                    let gate = self.gate(g);
                    if gate.is_determined() && gate.value() {
                        return Err(Inconsistent);
                    }
                    self.transform_into_constant(g, false);
                    return Ok(());
                }
                if tmin as usize == nof_children {
                    let gate = self.gate_mut(g);
                    gate.kind = Kind::And;
                    gate.tmin = 0;
                    self.enqueue(g);
                    self.changed = true;
                }
                Ok(())
            }

            Kind::Even => {
                debug_assert!(self.count_children(g) >= 1);
                if self.count_children(g) == 1 {
                    self.gates[g.idx()].kind = Kind::Not;
                    self.enqueue(g);
                    self.changed = true;
                }
                Ok(())
            }

            Kind::Odd => {
                debug_assert!(self.count_children(g) >= 1);
                if self.count_children(g) == 1 {
                    self.gates[g.idx()].kind = Kind::Ref;
                    self.enqueue(g);
                    self.changed = true;
                }
                Ok(())
            }

            k => panic!("edimacs_normalize: not implemented for {}", k.name()),
        }
    }
}
