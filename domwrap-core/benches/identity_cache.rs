use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domwrap_core::DomHelper;

fn build_list(items: usize) -> DomHelper {
    let mut markup = String::from("<ul id=\"list\">");
    for i in 0..items {
        markup.push_str(&format!("<li class=\"item\">{i}</li>"));
    }
    markup.push_str("</ul>");
    DomHelper::from_html(&markup)
}

fn bench_rewrap(c: &mut Criterion) {
    let helper = build_list(500);
    // First pass allocates; the benchmark measures cache hits.
    let _ = helper.get_elements_by_class_name("item");

    c.bench_function("rewrap_500_cached", |b| {
        b.iter(|| black_box(helper.get_elements_by_class_name(black_box("item"))).len())
    });
}

fn bench_children(c: &mut Criterion) {
    let helper = build_list(500);
    let list = helper.get_element_by_id("list");

    c.bench_function("children_snapshot_500", |b| {
        b.iter(|| list.as_ref().map(|l| black_box(l.children()).len()))
    });
}

criterion_group!(benches, bench_rewrap, bench_children);
criterion_main!(benches);
