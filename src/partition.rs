//! Partition of the Boolean space into guard regions.
//!
//! The state-space builder produces, for each state, a family of overlapping
//! guards (one per distinct successor obligation). [`Bdd::partition`] refines them
//! into pairwise disjoint regions whose union is the constant true, so that every
//! input letter falls into exactly one region and the set of successors enabled
//! by a letter depends only on its region.

use std::collections::BTreeMap;

use log::debug;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Refine the given functions into disjoint regions covering the whole space.
    ///
    /// Every returned region is non-empty and lies entirely inside or entirely
    /// outside each input function; the accompanying list names the inputs that
    /// contain it. Regions contained in the same set of inputs are merged, and the
    /// result is ordered by first appearance during refinement.
    pub fn partition(&self, functions: &[Ref]) -> Vec<(Ref, Vec<usize>)> {
        debug!("partition({} functions)", functions.len());
        let mut regions: Vec<(Ref, Vec<usize>)> = vec![(Ref::ONE, Vec::new())];
        for (i, &g) in functions.iter().enumerate() {
            if self.is_zero(g) {
                continue;
            }
            let mut refined = Vec::with_capacity(regions.len() + 1);
            for (r, members) in regions {
                let inside = self.apply_and(r, g);
                let outside = self.apply_and(r, -g);
                if !self.is_zero(inside) {
                    let mut m = members.clone();
                    m.push(i);
                    refined.push((inside, m));
                }
                if !self.is_zero(outside) {
                    refined.push((outside, members));
                }
            }
            regions = refined;
        }

        // Merge regions with equal membership, keeping first-appearance order.
        let mut merged: Vec<(Ref, Vec<usize>)> = Vec::new();
        let mut by_members: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
        for (r, members) in regions {
            match by_members.get(&members) {
                Some(&k) => merged[k].0 = self.apply_or(merged[k].0, r),
                None => {
                    by_members.insert(members.clone(), merged.len());
                    merged.push((r, members));
                }
            }
        }
        merged
    }

}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Var;

    fn var(bdd: &Bdd, v: u32) -> Ref {
        bdd.mk_var(Var::new(v))
    }

    #[test]
    fn test_partition_is_disjoint_and_total() {
        let bdd = Bdd::default();
        let x = var(&bdd, 1);
        let y = var(&bdd, 2);
        let regions = bdd.partition(&[x, y, bdd.apply_and(x, y)]);

        let mut union = bdd.zero();
        for (i, (r, _)) in regions.iter().enumerate() {
            assert!(!bdd.is_zero(*r));
            for (s, _) in &regions[i + 1..] {
                assert!(bdd.is_zero(bdd.apply_and(*r, *s)));
            }
            union = bdd.apply_or(union, *r);
        }
        assert_eq!(union, bdd.one());

        // x∧y lies in all three inputs, ¬x∧¬y in none.
        let both = regions.iter().find(|(r, _)| *r == bdd.apply_and(x, y));
        assert_eq!(both.map(|(_, m)| m.clone()), Some(vec![0, 1, 2]));
        let none = regions.iter().find(|(_, m)| m.is_empty());
        assert_eq!(none.map(|(r, _)| *r), Some(bdd.apply_and(-x, -y)));
    }

    #[test]
    fn test_partition_merges_equal_membership() {
        let bdd = Bdd::default();
        let x = var(&bdd, 1);
        let regions = bdd.partition(&[x, x]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], (x, vec![0, 1]));
        assert_eq!(regions[1], (-x, vec![]));
    }
}
