
//! Structural sharing (common subexpression elimination).
//!
//! Commutative gates get their children sorted by child index first, then
//! every gate is hashed bottom-up over its kind, cardinality bounds and
//! child index sequence and probed against a table of already seen gates.
//! Structurally equal gates are merged: parents, names and determined
//! values migrate onto the survivor. Sorting plus index hashing makes the
//! pass, and therefore the emitted CNF, deterministic across runs.

use {
    fxhash::FxHashMap,
    bit_set::BitSet,
    smallvec::SmallVec,
    crate::gate::{GateId, Kind},
    crate::circuit::{Circuit, Result, Inconsistent},
};

// The structural identity of a gate: kind, bounds and the child indices in
// chain order.
#[derive(Clone,Eq,PartialEq,Hash)]
struct GateKey {
    kind: Kind,
    tmin: u32,
    tmax: u32,
    children: SmallVec<[GateId; 3]>,
}

impl Circuit {
    /// Merge all structurally identical gates. Runs without any other
    /// rewriting, so it is also usable when simplification is disabled.
    pub fn share(&mut self) -> Result<()> {
        let mut tbl: FxHashMap<GateKey, GateId> = FxHashMap::default();
        let mut done = BitSet::with_capacity(self.gates.len());
        let n = self.gates.len();
        for i in 0..n {
            if self.gates[i].is_deleted() {
                continue;
            }
            self.share_from(GateId(i as u32), &mut tbl, &mut done)?;
        }
        Ok(())
    }

    // Depth-first postorder from `root`: children are merged before the
    // parent is keyed, so the key always mentions survivors.
    fn share_from(
        &mut self,
        root: GateId,
        tbl: &mut FxHashMap<GateKey, GateId>,
        done: &mut BitSet,
    ) -> Result<()> {
        let mut stack: Vec<(GateId, bool)> = vec![(root, false)];
        while let Some((g, expanded)) = stack.pop() {
            if done.contains(g.idx()) {
                continue;
            }
            if !expanded {
                stack.push((g, true));
                let mut ca = self.gates[g.idx()].children;
                while !ca.is_nil() {
                    let e = &self.edges[ca.idx()];
                    if !done.contains(e.child.idx()) {
                        stack.push((e.child, false));
                    }
                    ca = e.next_child;
                }
            } else {
                done.insert(g.idx());
                self.share_gate(g, tbl)?;
            }
        }
        Ok(())
    }

    fn share_gate(&mut self, g: GateId, tbl: &mut FxHashMap<GateKey, GateId>) -> Result<()> {
        let kind = self.gates[g.idx()].kind();
        match kind {
            // free inputs are distinct by name and never merged;
            // placeholders have no structure yet
            Kind::Deleted | Kind::Var | Kind::Undef => return Ok(()),
            _ => (),
        }
        if kind.is_commutative() {
            self.sort_children(g);
        }
        let key = GateKey {
            kind,
            tmin: self.gates[g.idx()].tmin,
            tmax: self.gates[g.idx()].tmax,
            children: self.children(g).collect(),
        };
        let existing = match tbl.get(&key) {
            Some(&e) => e,
            None => {
                tbl.insert(key, g);
                return Ok(());
            }
        };
        debug_assert!(existing != g);

        // merge g into the existing structurally equal gate
        if self.gates[g.idx()].is_determined() {
            let v = self.gates[g.idx()].value();
            if self.gates[existing.idx()].is_determined() {
                if self.gates[existing.idx()].value() != v {
                    return Err(Inconsistent);
                }
            } else {
                let e = self.gate_mut(existing);
                e.determined = true;
                e.value = v;
            }
        }
        self.remove_all_children(g);
        loop {
            let fa = self.gates[g.idx()].parents;
            if fa.is_nil() { break }
            self.change_child(fa, existing);
        }
        let names = std::mem::replace(&mut self.gates[g.idx()].names, Default::default());
        self.gates[existing.idx()].names.extend(names);
        self.gates[g.idx()].kind = Kind::Deleted;
        self.changed = true;
        Ok(())
    }

    /// Sort the children of a commutative gate by child index, using a
    /// radix sort with 4-bit passes. No-op when already sorted.
    pub(crate) fn sort_children(&mut self, g: GateId) {
        const SHIFT : usize = 4;
        const N : usize = 1 << SHIFT;
        const MASK : u32 = (N - 1) as u32;

        if !self.gates[g.idx()].kind().is_commutative() {
            return;
        }
        if self.gates[g.idx()].children.is_nil() {
            return;
        }

        let mut c1: Vec<(u32, GateId)> = Vec::new();
        let mut largest = 0u32;
        let mut already_sorted = true;
        for c in self.children(g) {
            let idx = c.index();
            c1.push((idx, c));
            if idx >= largest {
                largest = idx;
            } else {
                already_sorted = false;
            }
        }
        if already_sorted {
            return;
        }

        let nof_children = c1.len();
        let mut c2: Vec<(u32, GateId)> = vec![(0, GateId::SENTINEL); nof_children];
        let mut shift = 0;
        while largest > 0 {
            let mut count = [0usize; N];
            for &(k, _) in c1.iter() {
                count[((k >> shift) & MASK) as usize] += 1;
            }
            let mut start = [0usize; N];
            let mut start_index = 0;
            for i in 0..N {
                start[i] = start_index;
                start_index += count[i];
            }
            for &item in c1.iter() {
                let d = ((item.0 >> shift) & MASK) as usize;
                c2[start[d]] = item;
                start[d] += 1;
            }
            largest >>= SHIFT;
            shift += SHIFT;
            std::mem::swap(&mut c1, &mut c2);
        }

        let mut i = 0;
        let mut ca = self.gates[g.idx()].children;
        while !ca.is_nil() {
            let next = self.edges[ca.idx()].next_child;
            self.change_child(ca, c1[i].1);
            i += 1;
            ca = next;
        }
        debug_assert_eq!(i, nof_children);
    }
}
