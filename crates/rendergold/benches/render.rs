use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;

use http::StatusCode;
use serde_json::json;

use rendergold::{Mode, Options, Render, RenderState, RequestHead};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/templates")
}

fn state(mode: Mode) -> RenderState {
    RenderState::new(
        Some(Options {
            directory: fixture_dir().to_string_lossy().into_owned(),
            ..Default::default()
        }),
        mode,
    )
}

fn bench_html(c: &mut Criterion) {
    let binding = json!({ "title": "Benchmark", "body": "content" });

    let mut group = c.benchmark_group("html");
    for (label, mode) in [
        ("development", Mode::Development),
        ("production", Mode::Production),
    ] {
        let state = state(mode);
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut r = state.renderer(RequestHead::get("/"));
                r.html(StatusCode::OK, black_box("page"), &binding, None);
                black_box(r.into_writer())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_html);
criterion_main!(benches);
