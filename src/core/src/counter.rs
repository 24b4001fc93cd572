
//! Adder networks for wide cardinality windows.
//!
//! A THRESHOLD gate whose window is far from both ends is eliminated by
//! counting its true children with a tree of ripple adders and comparing
//! the count against constant bit vectors. All bit vectors are
//! little-endian. Every gate created here enters the pstack so the running
//! normalization pass picks it up.

use {
    smallvec::SmallVec,
    crate::gate::{GateId, Kind},
    crate::circuit::Circuit,
};

impl Circuit {
    /// The binary count of true gates among `children`, built by recursive
    /// halving; linear in the number of children.
    pub fn add_true_gate_counter(&mut self, children: &[GateId]) -> Vec<GateId> {
        debug_assert!(!children.is_empty());
        if children.len() == 1 {
            return vec![children[0]];
        }
        let mid = children.len() / 2;
        let a = self.add_true_gate_counter(&children[..mid]);
        let b = self.add_true_gate_counter(&children[mid..]);
        self.add_unsigned_adder(&a, &b)
    }

    // A ripple adder over two bit vectors, one full adder per position:
    // sum = ODD over the operands, carry = majority.
    fn add_unsigned_adder(&mut self, a: &[GateId], b: &[GateId]) -> Vec<GateId> {
        let n = a.len().max(b.len());
        let mut out = Vec::with_capacity(n + 1);
        let mut carry: Option<GateId> = None;
        for i in 0..n {
            let mut ops: SmallVec<[GateId; 3]> = SmallVec::new();
            if let Some(&x) = a.get(i) { ops.push(x) }
            if let Some(&x) = b.get(i) { ops.push(x) }
            if let Some(c) = carry.take() { ops.push(c) }
            match ops.len() {
                1 => out.push(ops[0]),
                2 => {
                    let sum = self.new_nary(Kind::Odd, &ops);
                    self.enqueue(sum);
                    let c = self.new_and(&ops);
                    self.enqueue(c);
                    out.push(sum);
                    carry = Some(c);
                }
                3 => {
                    let sum = self.new_nary(Kind::Odd, &ops);
                    self.enqueue(sum);
                    let ab = self.new_and(&[ops[0], ops[1]]);
                    self.enqueue(ab);
                    let ac = self.new_and(&[ops[0], ops[2]]);
                    self.enqueue(ac);
                    let bc = self.new_and(&[ops[1], ops[2]]);
                    self.enqueue(bc);
                    let c = self.new_or(&[ab, ac, bc]);
                    self.enqueue(c);
                    out.push(sum);
                    carry = Some(c);
                }
                _ => unreachable!(),
            }
        }
        if let Some(c) = carry {
            out.push(c);
        }
        out
    }

    /// The bits of the constant `k` as TRUE/FALSE gates.
    pub fn add_unsigned_constant(&mut self, mut k: u32) -> Vec<GateId> {
        let mut bits = Vec::new();
        loop {
            let g = if k & 1 == 1 { self.new_true() } else { self.new_false() };
            self.enqueue(g);
            bits.push(g);
            k >>= 1;
            if k == 0 {
                return bits;
            }
        }
    }

    /// A gate that is true iff the number `a` is at least `b`:
    /// from the low bit upwards, ge = (a_i > b_i) | ((a_i = b_i) & ge).
    pub fn add_unsigned_ge(&mut self, a: &[GateId], b: &[GateId]) -> GateId {
        let n = a.len().max(b.len());
        let mut ge = self.new_true();
        self.enqueue(ge);
        for i in 0..n {
            let ai = match a.get(i) {
                Some(&x) => x,
                None => {
                    let f = self.new_false();
                    self.enqueue(f);
                    f
                }
            };
            let bi = match b.get(i) {
                Some(&x) => x,
                None => {
                    let f = self.new_false();
                    self.enqueue(f);
                    f
                }
            };
            let not_bi = self.new_not(bi);
            self.enqueue(not_bi);
            let gt = self.new_and(&[ai, not_bi]);
            self.enqueue(gt);
            let eq = self.new_nary(Kind::Even, &[ai, bi]);
            self.enqueue(eq);
            let keep = self.new_and(&[eq, ge]);
            self.enqueue(keep);
            ge = self.new_or(&[gt, keep]);
            self.enqueue(ge);
        }
        ge
    }

    /// A gate that is true iff the number `a` is at most `b`.
    pub fn add_unsigned_le(&mut self, a: &[GateId], b: &[GateId]) -> GateId {
        self.add_unsigned_ge(b, a)
    }
}
