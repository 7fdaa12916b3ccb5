use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 3)]
    Erase(#[proptest(strategy = "0u16..512")] u16),
    Find(#[proptest(strategy = "0u16..512")] u16),
    LowerBound(#[proptest(strategy = "0u16..600")] u16),
}

fn assert_matches_model(t: &TwoThreeSet<u16>, m: &BTreeSet<u16>) {
    if let Err(err) = t.validate() {
        panic!("invariant broken: {err}");
    }
    assert_eq!(t.len(), m.len());
    assert!(t.iter().eq(m.iter()), "forward order differs");
    assert!(t.iter().rev().eq(m.iter().rev()), "reverse order differs");
}

fn distinct_values() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(any::<u32>(), 0..=300)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=2000)) {
        let mut t: TwoThreeSet<u16> = TwoThreeSet::new();
        let mut m: BTreeSet<u16> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    prop_assert_eq!(t.insert(v), m.insert(v));
                }
                Op::Erase(v) => {
                    prop_assert_eq!(t.erase(&v), m.remove(&v));
                }
                Op::Find(v) => {
                    let c = t.find(&v);
                    prop_assert_eq!(c.get(), m.get(&v));
                    prop_assert_eq!(c.is_end(), !m.contains(&v));
                }
                Op::LowerBound(v) => {
                    prop_assert_eq!(t.lower_bound(&v).get(), m.range(v..).next());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        assert_matches_model(&t, &m);
    }

    #[test]
    fn prop_erase_all_in_any_order(
        (values, order) in distinct_values()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let mut t: TwoThreeSet<u32> = values.iter().copied().collect();
        prop_assert_eq!(t.len(), values.len());

        for v in &order {
            prop_assert!(t.erase(v));
            prop_assert!(!t.contains(v));
            prop_assert_eq!(t.validate(), Ok(()));
        }
        prop_assert!(t.is_empty());
        prop_assert!(t.begin() == t.end());
    }

    #[test]
    fn prop_step_back_is_identity(values in distinct_values()) {
        let t: TwoThreeSet<u32> = values.into_iter().collect();
        let mut it = t.begin();
        while !it.is_end() {
            if it != t.begin() {
                prop_assert!(it.next_position().prev_position() == it);
            }
            it.move_next();
        }
    }

    #[test]
    fn prop_clone_matches_source(values in distinct_values()) {
        let t: TwoThreeSet<u32> = values.iter().rev().copied().collect();
        let copy = t.clone();
        prop_assert_eq!(copy.validate(), Ok(()));
        prop_assert!(copy == t);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let values: Vec<u8> = (1..=7).collect();

    for_each_permutation(&values, |perm| {
        let mut t: TwoThreeSet<u8> = TwoThreeSet::new();
        for v in perm {
            assert!(t.insert(v));
            t.validate().unwrap();
        }
        assert_eq!(t.iter().copied().collect::<Vec<_>>(), values);
    });
}

#[test]
fn exhaustive_erase_order_small_set() {
    let values: Vec<u8> = (1..=7).collect();

    // Insert in two fixed orders, then erase in all permutations.
    let ascending: TwoThreeSet<u8> = values.iter().copied().collect();
    let interleaved: TwoThreeSet<u8> = [4, 1, 7, 2, 6, 3, 5].into_iter().collect();

    for base in [&ascending, &interleaved] {
        for_each_permutation(&values, |perm| {
            let mut t = base.clone();
            let mut m: BTreeSet<u8> = values.iter().copied().collect();

            for v in perm {
                assert_eq!(t.erase(&v), m.remove(&v));
                t.validate().unwrap();
                assert!(t.iter().eq(m.iter()));
            }
            assert_eq!(t.len(), 0);
            assert!(t.root.is_none());
        });
    }
}

#[test]
fn large_random_workload_stays_balanced() {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    let mut rng = StdRng::seed_from_u64(3);
    let mut values: Vec<u32> = (0..20_000).collect();
    values.shuffle(&mut rng);

    let mut t: TwoThreeSet<u32> = TwoThreeSet::with_capacity(values.len());
    t.extend(values.iter().copied());
    t.validate().unwrap();
    // 3^9 < 20_000 < 2^15
    assert!((10..=15).contains(&t.height()), "height {}", t.height());

    values.shuffle(&mut rng);
    for v in &values[..15_000] {
        assert!(t.erase(v));
    }
    t.validate().unwrap();
    assert_eq!(t.len(), 5_000);

    let mut rest: Vec<u32> = values[15_000..].to_vec();
    rest.sort_unstable();
    assert!(t.iter().eq(rest.iter()));
}
