use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use quickform::element::Text;
use quickform::form::{Form, Submission};
use quickform::param::FormMethod;
use quickform::value::Value;

fn build_form(fields: usize) -> Form {
    let post = Value::map((0..fields).map(|i| (format!("field{}", i), Value::from(format!("user{}@example.com", i)))));
    let mut form = Form::new(
        "bench",
        FormMethod::Post,
        Submission {
            post,
            ..Submission::default()
        },
    );
    for i in 0..fields {
        let name = format!("field{}", i);
        form.add_element(Box::new(Text::new(&name, "Field", ""))).unwrap();
        form.add_rule(&name, "Required", "required", "").unwrap();
        form.add_rule(&name, "Invalid email", "email", "").unwrap();
        form.add_rule(&name, "Too long", "maxlength", 64u64).unwrap();
    }
    form
}

fn validate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("form_validate");

    for size in [10, 100, 500].iter() {
        let mut form = build_form(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(form.validate().unwrap()));
        });
    }

    group.finish();
}

fn render_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("form_render");

    for size in [10, 100].iter() {
        let mut form = build_form(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(form.to_html().unwrap().len()));
        });
    }

    group.finish();
}

criterion_group!(benches, validate_benchmark, render_benchmark);
criterion_main!(benches);
