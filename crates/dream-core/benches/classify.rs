use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use dream_core::{ClassifiedDream, Classifier, SymbolMapper, UserAggregate};

const SHORT: &str = "flying joyfully over a bright city";

const LONG: &str = "\
I was running through a dark forest and the trees kept closing in. \
Somewhere behind me something was chasing me, and I was not afraid at first, \
but then the path disappeared and I was falling, falling into cold water. \
When I woke up inside the dream I was sitting in a quiet empty room, \
frozen, listening to a clock that never moved.";

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::default();
    c.bench_function("classify_short", |b| {
        b.iter(|| classifier.classify_dream(black_box(SHORT)))
    });
    c.bench_function("classify_long", |b| {
        b.iter(|| classifier.classify_dream(black_box(LONG)))
    });
}

fn bench_update(c: &mut Criterion) {
    let classifier = Classifier::default();
    let mapper = SymbolMapper::default();
    let dreams: Vec<ClassifiedDream> = [SHORT, LONG]
        .iter()
        .map(|t| classifier.classify_dream(t).expect("sample text is non-empty"))
        .collect();
    c.bench_function("aggregate_update_1000", |b| {
        b.iter_batched(
            UserAggregate::default,
            |mut agg| {
                for i in 0..1000 {
                    agg = agg.update(&dreams[i % dreams.len()], &mapper);
                }
                agg
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_classify, bench_update);
criterion_main!(benches);
