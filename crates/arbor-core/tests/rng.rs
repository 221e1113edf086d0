use arbor_core::{DeterministicRng, SplitMix64};

#[test]
fn shuffle_is_a_deterministic_permutation() {
    let mut a: Vec<usize> = (0..16).collect();
    let mut b = a.clone();

    SplitMix64::for_stream(7, 1).shuffle(&mut a);
    SplitMix64::for_stream(7, 1).shuffle(&mut b);
    assert_eq!(a, b);

    let mut sorted = a.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..16).collect::<Vec<_>>());
}

#[test]
fn next_below_stays_in_range() {
    let mut rng = SplitMix64::new(99);
    for bound in 1..50u64 {
        assert!(rng.next_below(bound) < bound);
    }
    assert_eq!(rng.next_below(0), 0);
}
