//! This bench test rebuilds the element tree of a large snapshot whose
//! elements arrive children-first, so every insertion walks its ownership
//! chain.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sysmodel::{Attribute, CommitId, Element, ElementId, ElementTree, Snapshot, domain::Payload};

/// A root with 50 assemblies, each holding 20 parts with one attribute each.
fn generate_elements() -> Vec<Element> {
    let mut elements = vec![Payload::part("Root Part", None).into_element(ElementId::new("root"))];
    for a in 0..50 {
        let assembly = ElementId::new(format!("a{a}"));
        elements.push(
            Payload::part(format!("Assembly {a}"), Some(ElementId::new("root")))
                .into_element(assembly.clone()),
        );
        for p in 0..20 {
            let part = ElementId::new(format!("a{a}p{p}"));
            let mass = Attribute::new(format!("mass {a}.{p}"), "1").unwrap();
            elements.push(
                Payload::attribute(&mass, part.clone())
                    .into_element(ElementId::new(format!("a{a}p{p}m"))),
            );
            elements.push(
                Payload::part(format!("Part {a}.{p}"), Some(assembly.clone())).into_element(part),
            );
        }
    }
    elements.reverse();
    elements
}

fn build_tree(c: &mut Criterion) {
    let snapshot = Snapshot::new(CommitId::new("bench"), generate_elements()).unwrap();

    c.bench_function("build tree", |b| {
        b.iter(|| ElementTree::build(&snapshot).unwrap());
    });

    c.bench_function("diff trees", |b| {
        b.iter_batched(
            || {
                let before = ElementTree::build(&snapshot).unwrap();
                let mut after = before.clone();
                after.remove_subtree("Assembly 7");
                (before, after)
            },
            |(before, after)| before.diff(&after),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, build_tree);
criterion_main!(benches);
