use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domwrap_core::{DomHelper, LayoutConfig};

fn bench_layout(c: &mut Criterion) {
    let mut markup = String::from("<div style=\"display:flex;flex-direction:row;width:100%\">");
    for i in 0..100 {
        markup.push_str(&format!(
            "<div style=\"width:{}px;padding-left:2px;font-size:1.2em\">cell {i} with some wrapped text</div>",
            20 + i % 7
        ));
    }
    markup.push_str("</div>");
    let helper = DomHelper::from_html(&markup);
    let config = LayoutConfig::default();

    c.bench_function("layout_100_text_cells", |b| {
        b.iter(|| helper.layout(black_box(&config)))
    });
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
