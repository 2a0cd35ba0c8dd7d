use std::cmp::Ordering;

use haploh_depths::events::compare_events;
use haploh_depths::{
    compare_chromosomes, Classification, DepthPolicy, DepthRecorder, Event, EventCatalog,
    MergeJoinEngine, SinkError, VariantCall,
};
use proptest::prelude::*;

type Record = (Event, Classification, u64);

#[derive(Default)]
struct Collect(Vec<Record>);

impl DepthRecorder for Collect {
    fn record(
        &mut self,
        _slot: usize,
        event: &Event,
        class: Classification,
        depth: u64,
    ) -> Result<(), SinkError> {
        self.0.push((event.clone(), class, depth));
        Ok(())
    }
}

fn chrom() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("chr1"), Just("chr2"), Just("chr10"), Just("chrX"), Just("chrM")]
}

fn event() -> impl Strategy<Value = Event> {
    (chrom(), 1u64..300, 0u64..80, prop_oneof![Just("S1"), Just("S2")])
        .prop_map(|(chrom, begin, len, sample)| Event::new(chrom, begin, begin + len, sample))
}

fn sorted_calls() -> impl Strategy<Value = Vec<(&'static str, u64)>> {
    proptest::collection::vec((chrom(), 1u64..400), 0..60).prop_map(|mut calls| {
        calls.sort_by(|a, b| compare_chromosomes(a.0, b.0).then(a.1.cmp(&b.1)));
        calls
    })
}

proptest! {
    #[test]
    fn merge_join_matches_brute_force(
        events in proptest::collection::vec(event(), 0..40),
        calls in sorted_calls(),
        sample in prop_oneof![Just("S1"), Just("S2")],
    ) {
        let catalog = EventCatalog::from_events(events);

        let mut expected = Vec::new();
        for (depth, (chrom, pos)) in calls.iter().enumerate() {
            for event in catalog.iter().filter(|e| e.contains(chrom, *pos)) {
                let class = Classification::of(sample, &event.sample_id);
                expected.push((event.clone(), class, depth as u64));
            }
        }

        let mut source = calls
            .iter()
            .enumerate()
            .map(|(depth, (chrom, pos))| VariantCall::new(*chrom, *pos, format!("0/1:{}", depth)))
            .collect::<Vec<_>>()
            .into_iter();
        let mut engine = MergeJoinEngine::new(&catalog, DepthPolicy::Widen);
        let mut actual = Collect::default();
        let stats = engine.process_source(sample, &mut source, &mut actual).unwrap();

        prop_assert_eq!(stats.calls, calls.len() as u64);
        prop_assert_eq!(stats.values, expected.len() as u64);
        prop_assert_eq!(actual.0, expected);
    }

    #[test]
    fn catalog_is_totally_sorted(events in proptest::collection::vec(event(), 0..50)) {
        let catalog = EventCatalog::from_events(events);
        for pair in catalog.events().windows(2) {
            prop_assert_ne!(compare_events(&pair[0], &pair[1]), Ordering::Greater);
            if pair[0].chrom == pair[1].chrom {
                prop_assert!(
                    (pair[0].begin, pair[0].end) <= (pair[1].begin, pair[1].end),
                    "same chromosome must order by begin then end"
                );
            }
        }
    }

    #[test]
    fn chromosome_order_is_a_total_order(
        a in "(chr)?([0-9]{1,2}|X|Y|M|MT|Un_[a-z]{1,3})",
        b in "(chr)?([0-9]{1,2}|X|Y|M|MT|Un_[a-z]{1,3})",
        c in "(chr)?([0-9]{1,2}|X|Y|M|MT|Un_[a-z]{1,3})",
    ) {
        prop_assert_eq!(compare_chromosomes(&a, &b), compare_chromosomes(&b, &a).reverse());
        prop_assert_eq!(compare_chromosomes(&a, &b) == Ordering::Equal, a == b);
        if compare_chromosomes(&a, &b) != Ordering::Greater
            && compare_chromosomes(&b, &c) != Ordering::Greater
        {
            prop_assert_ne!(compare_chromosomes(&a, &c), Ordering::Greater);
        }
    }
}
