use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn validate_trie(t: &Trie) {
    let leaves = t.da.assert_invariants();
    assert_eq!(leaves.len(), t.len(), "every tail entry must have one leaf");
    let distinct: HashSet<_> = leaves.iter().collect();
    assert_eq!(distinct.len(), leaves.len(), "tail entries must not be shared");
}

fn build(pairs: &[(Vec<u8>, i32)]) -> (Trie, BTreeMap<Vec<u8>, i32>) {
    let mut trie = Trie::new();
    let mut model = BTreeMap::new();
    for (k, v) in pairs {
        trie.store(k, *v).unwrap();
        model.insert(k.clone(), *v);
    }
    (trie, model)
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet makes shared prefixes, tail splits and relocations common.
    prop::collection::vec(b'a'..=b'f', 0..=10)
}

fn wide_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(1u8..=255, 0..=24)
}

fn pairs_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, i32)>> {
    prop::collection::vec((key_strategy(), any::<i32>()), 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn store_retrieve_matches_model(
        pairs in pairs_strategy(),
        probes in prop::collection::vec(key_strategy(), 0..=50),
    ) {
        let (trie, model) = build(&pairs);
        validate_trie(&trie);
        prop_assert_eq!(trie.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(trie.retrieve(k), Some(*v), "key {:?}", k);
        }
        for k in &probes {
            prop_assert_eq!(trie.retrieve(k), model.get(k).copied());
        }
    }

    #[test]
    fn wide_alphabet_matches_model(
        pairs in prop::collection::vec((wide_key_strategy(), any::<i32>()), 0..=200),
    ) {
        let (trie, model) = build(&pairs);
        validate_trie(&trie);
        for (k, v) in &model {
            prop_assert_eq!(trie.retrieve(k), Some(*v));
        }
    }

    #[test]
    fn dump_parse_round_trip(pairs in pairs_strategy()) {
        let (trie, model) = build(&pairs);
        let bytes = trie.dump();
        prop_assert_eq!(bytes.len(), trie.serialized_size());
        prop_assert_eq!(&trie.dump(), &bytes);

        let copy = Trie::parse(&bytes).unwrap();
        validate_trie(&copy);
        for (k, v) in &model {
            prop_assert_eq!(copy.retrieve(k), Some(*v));
        }
        prop_assert_eq!(copy.dump(), bytes);
    }

    #[test]
    fn parsed_trie_accepts_more_keys(
        first in pairs_strategy(),
        second in pairs_strategy(),
    ) {
        let (trie, mut model) = build(&first);
        let mut copy = Trie::parse(&trie.dump()).unwrap();
        for (k, v) in &second {
            copy.store(k, *v).unwrap();
            model.insert(k.clone(), *v);
        }
        validate_trie(&copy);
        for (k, v) in &model {
            prop_assert_eq!(copy.retrieve(k), Some(*v));
        }
    }

    #[test]
    fn iteration_matches_model(pairs in pairs_strategy()) {
        let (trie, model) = build(&pairs);
        let got: Vec<(Vec<u8>, i32)> = trie.iter::<u8>().map(|e| (e.key, e.value)).collect();
        let want: Vec<(Vec<u8>, i32)> = model.into_iter().collect();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn predictive_search_matches_model(pairs in pairs_strategy(), prefix in key_strategy()) {
        let (trie, model) = build(&pairs);
        let got: Vec<(Vec<u8>, i32)> = trie
            .predictive_search(&prefix)
            .map(|e| (e.key, e.value))
            .collect();
        let want: Vec<(Vec<u8>, i32)> = model
            .into_iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .collect();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn common_prefix_search_matches_model(pairs in pairs_strategy(), query in key_strategy()) {
        let (trie, model) = build(&pairs);
        let got: Vec<PrefixMatch> = trie.common_prefix_search(&query).collect();
        let want: Vec<PrefixMatch> = (0..=query.len())
            .filter_map(|len| {
                model
                    .get(&query[..len])
                    .map(|&value| PrefixMatch { len, value })
            })
            .collect();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn walk_agrees_with_retrieve(pairs in pairs_strategy(), key in key_strategy()) {
        let (trie, _) = build(&pairs);
        let state = trie.root().walk_key(&key);
        prop_assert_eq!(state.and_then(|s| s.value()), trie.retrieve(&key));
    }

    #[test]
    fn parse_never_panics_on_corruption(
        pairs in pairs_strategy(),
        flips in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..=8),
    ) {
        let (trie, _) = build(&pairs);
        let mut bytes = trie.dump();
        for (at, byte) in flips {
            let i = at.index(bytes.len());
            bytes[i] = byte;
        }
        if let Ok(copy) = Trie::parse(&bytes) {
            // Whatever was accepted must be a well-formed trie.
            validate_trie(&copy);
            prop_assert_eq!(copy.iter::<u32>().count(), copy.len());
            let _ = copy.retrieve(b"abc");
        }
    }
}
