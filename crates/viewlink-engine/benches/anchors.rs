use criterion::{Criterion, criterion_group, criterion_main};
use viewlink_engine::anchors::{deserialize, serialize};
use viewlink_engine::dom::parse_document;
use viewlink_engine::{AnchorDescriptor, AnchorResolver, VisibilityPlanner};

fn generate_page(sections: usize) -> String {
    let mut html = String::from("<html><body>");
    for section in 0..sections {
        html.push_str(&format!(
            "<div id=\"s{section}\"><h2>Section {section}</h2><p>Intro for {section}</p>\
             <p>Details about section {section} and its options</p><ul><li>one</li><li>two</li></ul></div>"
        ));
    }
    html.push_str("</body></html>");
    html
}

fn bench_anchor_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("anchors");
    group.sample_size(10);

    let doc = parse_document(&generate_page(500)).unwrap();
    let body = doc.body();
    let target = doc.elements_by_tag(doc.elements_by_id("s250")[0], "p")[1];
    let token = serialize(&[AnchorDescriptor::create(&doc, target, body).unwrap()]);
    let resolver = AnchorResolver::default();

    group.bench_function("resolve_structural", |b| {
        b.iter(|| {
            let descriptors = deserialize(std::hint::black_box(&token));
            std::hint::black_box(resolver.resolve_all(&doc, body, &descriptors));
        });
    });

    let mut drifted = doc.clone();
    let first = drifted.elements_by_tag(drifted.elements_by_id("s250")[0], "p")[0];
    let inserted = drifted.insert_element_before(first, "p", &[]);
    drifted.append_text(inserted, "Inserted after sharing");

    group.bench_function("resolve_scored_scan", |b| {
        b.iter(|| {
            let descriptors = deserialize(std::hint::black_box(&token));
            std::hint::black_box(resolver.resolve_all(&drifted, body, &descriptors));
        });
    });

    let planner = VisibilityPlanner::default();
    group.bench_function("plan_visibility", |b| {
        b.iter(|| std::hint::black_box(planner.plan(&doc, body, &[target])));
    });

    group.finish();
}

criterion_group!(benches, bench_anchor_resolution);
criterion_main!(benches);
