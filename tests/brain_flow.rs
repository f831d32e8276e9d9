//! Activation flow through small topologies: fan-in, fan-out, branching,
//! End neuron handling and re-triggering.

use axon::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

/// A processor that appends `name` to the journal
fn record(journal: &Journal, name: &str) -> impl Fn(&BrainContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static {
    let journal = Arc::clone(journal);
    let name = name.to_string();
    move |_ctx: &BrainContext<'_>| {
        journal.lock().push(name.clone());
        Ok(())
    }
}

fn drain_sorted(journal: &Journal) -> Vec<String> {
    let mut entries = std::mem::take(&mut *journal.lock());
    entries.sort();
    entries
}

fn memory_string(value: Option<MemoryValue>) -> String {
    value.and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
}

#[test]
fn test_end_to_end_name_concatenation() {
    let mut bp = Blueprint::new();
    let first = bp.add_neuron(|ctx: &BrainContext<'_>| {
        ctx.set_memory("first", "Clay")?;
        Ok(())
    });
    let last = bp.add_neuron(|ctx: &BrainContext<'_>| {
        ctx.set_memory("last", " Zhang")?;
        Ok(())
    });
    let join = bp.add_neuron(|ctx: &BrainContext<'_>| {
        let first = memory_string(ctx.get_memory("first"));
        let last = memory_string(ctx.get_memory("last"));
        ctx.set_memory("full", format!("{}{}", first, last))?;
        Ok(())
    });

    bp.add_entry_link_to(&first).unwrap();
    bp.add_entry_link_to(&last).unwrap();
    let from_first = bp.add_link(&first, &join).unwrap();
    let from_last = bp.add_link(&last, &join).unwrap();
    bp.add_trigger_group(&join, &[&from_first, &from_last]).unwrap();
    bp.add_end_link_from(&join).unwrap();

    let brain = bp.build().unwrap();
    brain.entry().unwrap();
    brain.wait();

    assert_eq!(brain.state(), BrainState::Sleeping);
    assert_eq!(memory_string(brain.get_memory("full")), "Clay Zhang");
    assert_eq!(brain.neuron_status(&join).unwrap().counters.succeeded, 1);
    brain.shutdown();
}

#[test]
fn test_branching_by_category() {
    let journal: Journal = Arc::default();
    let mut bp = Blueprint::new();
    let condition = bp.add_neuron(|_ctx: &BrainContext<'_>| Ok(()));
    let cell_phone = bp.add_neuron(record(&journal, "cell-phone"));
    let laptop = bp.add_neuron(record(&journal, "laptop"));
    let ps5 = bp.add_neuron(record(&journal, "ps5"));
    let tv = bp.add_neuron(record(&journal, "tv"));
    let printer = bp.add_neuron(record(&journal, "printer"));

    let cell_phone_link = bp.add_link(&condition, &cell_phone).unwrap();
    let laptop_link = bp.add_link(&condition, &laptop).unwrap();
    let ps5_link = bp.add_link(&condition, &ps5).unwrap();
    let tv_link = bp.add_link(&condition, &tv).unwrap();
    let printer_link = bp.add_link(&condition, &printer).unwrap();
    bp.add_entry_link_to(&condition).unwrap();

    bp.add_cast_group(&condition, "electronics", &[&cell_phone_link, &laptop_link, &ps5_link])
        .unwrap();
    bp.add_cast_group(&condition, "entertainment-devices", &[&cell_phone_link, &ps5_link, &tv_link])
        .unwrap();
    bp.add_cast_group(&condition, "office-devices", &[&laptop_link, &printer_link, &cell_phone_link])
        .unwrap();
    bp.bind_select_fn(&condition, |reader: &dyn BrainContextReader| {
        memory_string(reader.get_memory("category"))
    })
    .unwrap();

    let brain = bp.build().unwrap();
    let cases: [(&str, &[&str]); 4] = [
        ("electronics", &["cell-phone", "laptop", "ps5"]),
        ("entertainment-devices", &["cell-phone", "ps5", "tv"]),
        ("office-devices", &["cell-phone", "laptop", "printer"]),
        ("NOT-Defined", &[]),
    ];
    for (category, expected) in cases {
        brain.entry_with_memory([("category", category)]).unwrap();
        brain.wait();
        assert_eq!(drain_sorted(&journal), expected, "category {}", category);
    }
    assert_eq!(brain.neuron_status(&condition).unwrap().counters.succeeded, 4);
}

#[test]
fn test_fan_in_trigger_groups() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut bp = Blueprint::new();
    let counted = Arc::clone(&runs);
    let target = bp.add_neuron(move |_ctx: &BrainContext<'_>| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let l1 = bp.add_entry_link_to(&target).unwrap();
    let l2 = bp.add_entry_link_to(&target).unwrap();
    let l3 = bp.add_entry_link_to(&target).unwrap();
    bp.add_trigger_group(&target, &[&l1, &l2]).unwrap();
    assert_eq!(bp.neuron(&target).unwrap().trigger_groups().len(), 2);

    let brain = bp.build().unwrap();

    // Half of {L1, L2} is not enough
    brain.trig_links(&[&l1]).unwrap();
    assert!(!brain.wait_timeout(Duration::from_millis(100)));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(brain.link_status(&l1).unwrap().state, LinkState::Ready);

    brain.trig_links(&[&l2]).unwrap();
    brain.wait();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // {L3} alone qualifies
    brain.trig_links(&[&l3]).unwrap();
    brain.wait();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_parallel_templates_share_input() {
    let results: Journal = Arc::default();
    let mut bp = Blueprint::new();
    let input = bp.add_neuron(|ctx: &BrainContext<'_>| {
        ctx.set_memory("input", "orange")?;
        Ok(())
    });
    let poetry = bp.add_neuron(|ctx: &BrainContext<'_>| {
        ctx.set_memory("template", "poetry")?;
        Ok(())
    });
    let joke = bp.add_neuron(|ctx: &BrainContext<'_>| {
        ctx.set_memory("template", "joke")?;
        Ok(())
    });
    let sink = Arc::clone(&results);
    let generate = bp.add_neuron(move |ctx: &BrainContext<'_>| {
        let template = memory_string(ctx.get_memory("template"));
        let input = memory_string(ctx.get_memory("input"));
        sink.lock().push(format!("{} for {}", template, input));
        Ok(())
    });

    let input_in = bp.add_link(&input, &generate).unwrap();
    let poetry_in = bp.add_link(&poetry, &generate).unwrap();
    let joke_in = bp.add_link(&joke, &generate).unwrap();
    let entry_input = bp.add_entry_link_to(&input).unwrap();
    let entry_poetry = bp.add_entry_link_to(&poetry).unwrap();
    let entry_joke = bp.add_entry_link_to(&joke).unwrap();
    bp.add_trigger_group(&generate, &[&input_in, &poetry_in]).unwrap();
    bp.add_trigger_group(&generate, &[&input_in, &joke_in]).unwrap();

    let brain = bp.build().unwrap();

    brain.trig_links(&[&entry_poetry]).unwrap();
    brain.trig_links(&[&entry_input]).unwrap();
    brain.wait();
    assert_eq!(drain_sorted(&results), vec!["poetry for orange"]);

    brain.trig_links(&[&entry_joke]).unwrap();
    brain.trig_links(&[&entry_input]).unwrap();
    brain.wait();
    assert_eq!(drain_sorted(&results), vec!["joke for orange"]);
}

#[test]
fn test_fan_out_casts_only_selected_group() {
    let journal: Journal = Arc::default();
    let mut bp = Blueprint::new();
    let source = bp.add_neuron(|_ctx: &BrainContext<'_>| Ok(()));
    let left = bp.add_neuron(record(&journal, "left"));
    let right = bp.add_neuron(record(&journal, "right"));
    let to_left = bp.add_link(&source, &left).unwrap();
    let to_right = bp.add_link(&source, &right).unwrap();
    bp.add_entry_link_to(&source).unwrap();
    bp.add_cast_group(&source, "left", &[&to_left]).unwrap();
    bp.add_cast_group(&source, "right", &[&to_right]).unwrap();
    bp.bind_select_fn(&source, |_reader: &dyn BrainContextReader| "left".to_string())
        .unwrap();

    let brain = bp.build().unwrap();
    brain.entry().unwrap();
    brain.wait();

    assert_eq!(drain_sorted(&journal), vec!["left"]);
    assert_eq!(brain.link_status(&to_left).unwrap().counters.succeeded, 1);
    assert_eq!(brain.link_status(&to_right).unwrap().counters.succeeded, 0);
    assert_eq!(brain.neuron_status(&right).unwrap().counters.attempted, 0);
}

#[test]
fn test_end_neuron_puts_brain_to_sleep() {
    let slow_finished = Arc::new(AtomicBool::new(false));
    let mut bp = Blueprint::new();
    let start = bp.add_neuron(|_ctx: &BrainContext<'_>| Ok(()));
    let flag = Arc::clone(&slow_finished);
    let slow = bp.add_neuron(move |_ctx: &BrainContext<'_>| {
        std::thread::sleep(Duration::from_secs(1));
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    bp.add_entry_link_to(&start).unwrap();
    bp.add_link(&start, &slow).unwrap();
    bp.add_end_link_from(&start).unwrap();

    let brain = bp.build().unwrap();
    brain.entry().unwrap();
    assert!(brain.wait_timeout(Duration::from_millis(800)));

    // End reached while `slow` is still running
    assert_eq!(brain.state(), BrainState::Sleeping);
    assert!(!slow_finished.load(Ordering::SeqCst));
    assert!(brain.counts().is_idle());

    brain.shutdown();
    assert!(slow_finished.load(Ordering::SeqCst));
    assert_eq!(brain.state(), BrainState::Shutdown);
}

#[test]
fn test_retrigger_of_ready_link_is_idempotent() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut bp = Blueprint::new();
    let counted = Arc::clone(&runs);
    let target = bp.add_neuron(move |_ctx: &BrainContext<'_>| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let l1 = bp.add_entry_link_to(&target).unwrap();
    let l2 = bp.add_entry_link_to(&target).unwrap();
    bp.add_trigger_group(&target, &[&l1, &l2]).unwrap();

    let brain = bp.build().unwrap();
    brain.trig_links(&[&l1]).unwrap();
    brain.trig_links(&[&l1]).unwrap();
    assert_eq!(brain.link_status(&l1).unwrap().state, LinkState::Ready);
    assert_eq!(brain.counts().ready, 1);

    brain.trig_links(&[&l2]).unwrap();
    brain.wait();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(brain.neuron_status(&target).unwrap().counters.attempted, 1);
}

#[test]
fn test_unknown_link_is_rejected() {
    let mut bp = Blueprint::new();
    let n = bp.add_neuron(|_ctx: &BrainContext<'_>| Ok(()));
    bp.add_entry_link_to(&n).unwrap();

    let brain = bp.build().unwrap();
    let err = brain.trig_links(&["no-such-link"]).unwrap_err();
    assert!(matches!(err, BrainError::NotFound { kind: "link", .. }));
    assert_eq!(brain.state(), BrainState::Shutdown);
}
