use ahash::AHashMap;
use chrono::NaiveDate;
use proptest::prelude::*;

use exhibit_core::stream::intersect;
use exhibit_core::IndexStream;
use exhibit_data::{
    AttributeCatalog, AttributeDefinition, AttributeRange, AttributeType, CategoryBinner,
    EngineConfig, NumberValue, Record, RecordStore, TemplateDef, Value,
};
use exhibit_filters::{run_stage, EvalContext, Filter, FilterStack, FilterState, RecordFilter};

fn ctx() -> EvalContext {
    EvalContext::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
}

fn size_attribute() -> AttributeDefinition {
    AttributeDefinition {
        id: "size".to_string(),
        label: "Size".to_string(),
        kind: AttributeType::Number,
        legend: Vec::new(),
        range: Some(AttributeRange::Number { min: Some(0.0), max: Some(99.0), granularity: 1 }),
        undefined: None,
        delimiter: None,
    }
}

/// One template per inner list, one record per size
fn build_store(templates: &[Vec<u8>]) -> (RecordStore, AttributeCatalog) {
    let defs = templates
        .iter()
        .enumerate()
        .map(|(t, sizes)| TemplateDef {
            id: format!("t{}", t),
            label: String::new(),
            attributes: vec!["size".to_string()],
            count: sizes.len(),
        })
        .collect();
    let mut store = RecordStore::new(defs);
    for (t, sizes) in templates.iter().enumerate() {
        if sizes.is_empty() {
            continue;
        }
        let records = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let mut attributes = AHashMap::new();
                attributes.insert("size".to_string(), Value::Number(NumberValue::Defined(size as f64)));
                Record { id: format!("r{:04}", i), label: String::new(), attributes }
            })
            .collect();
        store.append_chunk(t, records).unwrap();
    }
    let catalog = AttributeCatalog::new(vec![size_attribute()]).unwrap();
    (store, catalog)
}

fn size_filter(store: &RecordStore, catalog: &AttributeCatalog, lo: u8, hi: u8) -> Filter {
    let binner = CategoryBinner::new(store, catalog, &EngineConfig::default());
    let mut filter = Filter::for_attribute(&size_attribute(), &binner).unwrap();
    filter
        .set_state(FilterState::Number { min: lo as f64, max: hi as f64, allow_undefined: false })
        .unwrap();
    filter
}

fn size_of(store: &RecordStore, index: usize) -> f64 {
    match store.value_at(index, "size") {
        Some(Value::Number(NumberValue::Defined(v))) => *v,
        other => panic!("unexpected value {:?}", other),
    }
}

fn in_range(store: &RecordStore, index: usize, lo: u8, hi: u8) -> bool {
    let v = size_of(store, index);
    lo as f64 <= v && v <= hi as f64
}

/// Passes everything and records what it was told
#[derive(Default)]
struct PassAll {
    seen: usize,
    total: Option<usize>,
}

impl RecordFilter for PassAll {
    fn eval_prep(&mut self, _ctx: &EvalContext) {
        self.seen = 0;
        self.total = None;
    }

    fn eval(&mut self, _record: &Record) -> bool {
        self.seen += 1;
        true
    }

    fn eval_done(&mut self, total: usize) {
        self.total = Some(total);
    }
}

fn templates() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..100, 0..24), 1..5)
}

fn bounds() -> impl Strategy<Value = (u8, u8)> {
    (0u8..100, 0u8..100).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

proptest! {
    #[test]
    fn identity_filter_preserves_stream(
        sizes in templates(),
        (lo, hi) in bounds(),
        apply in prop::collection::vec(any::<bool>(), 0..5),
    ) {
        let (store, catalog) = build_store(&sizes);
        let full = store.full_stream().unwrap();
        let mut narrowed = size_filter(&store, &catalog, lo, hi);
        let filtered = run_stage(&mut narrowed, &apply, &full, &store, &ctx()).unwrap();

        for input in [&full, &filtered] {
            let mut pass = PassAll::default();
            let output = run_stage(&mut pass, &[], input, &store, &ctx()).unwrap();
            prop_assert_eq!(&output, input);
            prop_assert_eq!(pass.total, Some(input.len()));
        }
    }

    #[test]
    fn filter_output_is_sound_and_complete(
        sizes in templates(),
        (lo, hi) in bounds(),
        apply in prop::collection::vec(any::<bool>(), 0..5),
    ) {
        let (store, catalog) = build_store(&sizes);
        let full = store.full_stream().unwrap();
        let mut filter = size_filter(&store, &catalog, lo, hi);
        let output = run_stage(&mut filter, &apply, &full, &store, &ctx()).unwrap();

        prop_assert_eq!(output.template_count(), full.template_count());
        for (t, indices) in full.iter_templates() {
            let scoped = apply.get(t).copied().unwrap_or(true);
            let kept = output.template_slice(t);
            if !scoped {
                prop_assert_eq!(kept, indices);
                continue;
            }
            for &index in indices {
                prop_assert_eq!(kept.contains(&index), in_range(&store, index, lo, hi));
            }
        }
    }

    #[test]
    fn clean_recompute_is_idempotent(
        sizes in templates(),
        (lo, hi) in bounds(),
        (lo2, hi2) in bounds(),
    ) {
        let (store, catalog) = build_store(&sizes);
        let mut stack = FilterStack::new();
        let first = stack.create_filter(size_filter(&store, &catalog, lo, hi), Vec::new());
        stack.create_filter(size_filter(&store, &catalog, lo2, hi2), Vec::new());

        let initial = stack.recompute(&store, &ctx()).unwrap().stream;
        let clean = stack.recompute(&store, &ctx()).unwrap();
        prop_assert_eq!(clean.stages_evaluated, 0);
        prop_assert_eq!(&clean.stream, &initial);

        stack.set_dirty(first).unwrap();
        let rerun = stack.recompute(&store, &ctx()).unwrap();
        prop_assert_eq!(rerun.stages_evaluated, 2);
        prop_assert_eq!(&rerun.stream, &initial);
    }

    #[test]
    fn scoped_invalidation_leaves_other_templates_alone(
        sizes in prop::collection::vec(prop::collection::vec(0u8..100, 0..24), 2..5),
        (lo1, hi1) in bounds(),
        (edit_lo, edit_hi) in bounds(),
        (lo2, hi2) in bounds(),
    ) {
        let (store, catalog) = build_store(&sizes);
        let mut scope = vec![false; sizes.len()];
        scope[0] = true;

        let mut stack = FilterStack::new();
        let f1 = stack.create_filter(size_filter(&store, &catalog, lo1, hi1), scope);
        stack.create_filter(size_filter(&store, &catalog, lo2, hi2), Vec::new());
        let before = stack.recompute(&store, &ctx()).unwrap().stream;

        stack
            .edit(f1, FilterState::Number { min: edit_lo as f64, max: edit_hi as f64, allow_undefined: false })
            .unwrap();
        let after = stack.recompute(&store, &ctx()).unwrap().stream;

        let full = store.full_stream().unwrap();
        let expected: Vec<usize> = full
            .template_slice(0)
            .iter()
            .copied()
            .filter(|&i| in_range(&store, i, edit_lo, edit_hi) && in_range(&store, i, lo2, hi2))
            .collect();
        prop_assert_eq!(after.template_slice(0), expected.as_slice());

        for t in 1..sizes.len() {
            let by_f2: Vec<usize> = full
                .template_slice(t)
                .iter()
                .copied()
                .filter(|&i| in_range(&store, i, lo2, hi2))
                .collect();
            prop_assert_eq!(after.template_slice(t), by_f2.as_slice());
            prop_assert_eq!(after.template_slice(t), before.template_slice(t));
        }
    }

    #[test]
    fn stacked_filters_intersect(
        sizes in templates(),
        (lo, hi) in bounds(),
        (lo2, hi2) in bounds(),
    ) {
        let (store, catalog) = build_store(&sizes);
        let full = store.full_stream().unwrap();
        let alone = |lo, hi| {
            let mut filter = size_filter(&store, &catalog, lo, hi);
            run_stage(&mut filter, &[], &full, &store, &ctx()).unwrap()
        };
        let expected = intersect(alone(lo, hi).indices(), alone(lo2, hi2).indices());

        let mut stack = FilterStack::new();
        stack.create_filter(size_filter(&store, &catalog, lo, hi), Vec::new());
        stack.create_filter(size_filter(&store, &catalog, lo2, hi2), Vec::new());
        let stream = stack.recompute(&store, &ctx()).unwrap().stream;
        prop_assert_eq!(stream.indices(), expected.as_slice());
    }

    #[test]
    fn record_at_is_stable(sizes in templates()) {
        let (store, _) = build_store(&sizes);
        for index in 0..store.total_records() {
            let first = store.record_at(index).unwrap().clone();
            let second = store.record_at(index).unwrap();
            prop_assert_eq!(&first, second);
        }
        prop_assert!(store.record_at(store.total_records()).is_err());
    }
}

#[test]
fn size_above_five_scoped_to_first_template() {
    let (store, catalog) = build_store(&[vec![3, 10], vec![7]]);
    let mut stack = FilterStack::new();
    stack.create_filter(size_filter(&store, &catalog, 6, 99), vec![true, false]);

    let stream = stack.recompute(&store, &ctx()).unwrap().stream;
    let labels: Vec<f64> = stream.indices().iter().map(|&i| size_of(&store, i)).collect();
    assert_eq!(labels, vec![10.0, 7.0]);
    assert_eq!(stream.indices(), &[1, 2]);
    let runs: Vec<_> = stream.runs().iter().map(|r| (r.start, r.len)).collect();
    assert_eq!(runs, vec![(0, 1), (1, 1)]);
    assert_eq!(stream.first_run_start(1), Some(1));
}

#[test]
fn empty_stack_yields_base_stream() {
    let (store, _) = build_store(&[vec![1, 2], vec![], vec![3]]);
    let mut stack = FilterStack::new();
    let stream = stack.recompute(&store, &ctx()).unwrap().stream;
    assert_eq!(*stream, store.full_stream().unwrap());
    assert_eq!(stream.first_run_start(1), None);
    assert_eq!(IndexStream::empty().len(), 0);
}
