use std::cell::Cell;
use std::rc::Rc;

use fanchart::{
    BatchStatus, Chart, Configuration, NodeState, PersonId, PersonNode, StaticDataSource,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn node(id: u64, depth: u32, xref: &str, name: &str) -> PersonNode {
    PersonNode {
        id: PersonId(id),
        xref: xref.to_string(),
        depth,
        url: format!("/individual/{id}"),
        update_url: format!("/update/{id}"),
        name: name.to_string(),
        timespan: String::new(),
    }
}

fn generation_one() -> Vec<PersonNode> {
    vec![
        node(1, 0, "I1", "Child"),
        node(2, 1, "I2", "Father"),
        node(3, 1, "I3", "Mother"),
    ]
}

fn generation_two() -> Vec<PersonNode> {
    vec![
        node(2, 0, "I2", "Father"),
        node(4, 1, "I4", "Grandfather"),
        node(5, 1, "", ""),
    ]
}

fn settle(chart: &mut Chart<StaticDataSource>) -> u32 {
    let mut ticks = 0;
    while chart.advance(16.0).unwrap() == BatchStatus::Running {
        ticks += 1;
        assert!(ticks < 1000, "batch never settled");
    }
    ticks
}

#[test]
fn full_cycle_reconciles_animates_and_fires_once() {
    init_logging();
    let mut source = StaticDataSource::new();
    source.insert("/update/2", generation_two());
    let mut chart = Chart::new(Configuration::default(), source).unwrap();
    chart.draw(generation_one()).unwrap();

    let calls = Rc::new(Cell::new(0u32));
    let calls2 = Rc::clone(&calls);
    chart
        .update("/update/2", move || calls2.set(calls2.get() + 1))
        .unwrap();

    // Classification is fully applied before the first tick.
    assert_eq!(
        chart.scene().segment(PersonId(2)).unwrap().state,
        Some(NodeState::Update)
    );
    assert_eq!(
        chart.scene().segment(PersonId(4)).unwrap().state,
        Some(NodeState::New)
    );
    assert_eq!(
        chart.scene().segment(PersonId(5)).unwrap().state,
        Some(NodeState::Remove)
    );
    assert_eq!(calls.get(), 0);

    let ticks = settle(&mut chart);
    assert!(ticks > 0);
    assert_eq!(calls.get(), 1);

    // Departed nodes 1 and 3 left the scene at finalization.
    assert!(chart.scene().segment(PersonId(1)).is_none());
    assert!(chart.scene().segment(PersonId(3)).is_none());

    // The scene is back at rest: no classifications, placeholders unavailable.
    for segment in &chart.scene().segments {
        assert_eq!(segment.state, None);
        assert_eq!(segment.opacity, 1.0);
    }
    assert!(!chart.scene().segment(PersonId(5)).unwrap().available);
    assert!(chart.scene().segment(PersonId(2)).unwrap().available);

    // Later ticks are no-ops and the callback never re-fires.
    settle(&mut chart);
    assert_eq!(calls.get(), 1);
}

#[test]
fn chained_navigation_clicks_run_one_cycle_each() {
    init_logging();
    let mut source = StaticDataSource::new();
    source.insert("/update/2", generation_two());
    source.insert("/update/4", vec![node(4, 0, "I4", "Grandfather")]);
    let mut chart = Chart::new(Configuration::default(), source).unwrap();
    chart.draw(generation_one()).unwrap();

    let calls = Rc::new(Cell::new(0u32));

    let c = Rc::clone(&calls);
    chart.click(PersonId(2), move || c.set(c.get() + 1)).unwrap();
    settle(&mut chart);
    assert_eq!(calls.get(), 1);

    let c = Rc::clone(&calls);
    chart.click(PersonId(4), move || c.set(c.get() + 1)).unwrap();
    settle(&mut chart);
    assert_eq!(calls.get(), 2);

    // Grandfather is now the root; clicking him navigates out of the chart.
    assert_eq!(
        chart.click(PersonId(4), || {}).unwrap(),
        fanchart::ClickOutcome::Navigate("/individual/4".to_string())
    );
}

#[test]
fn update_to_identical_dataset_still_finalizes() {
    init_logging();
    let mut source = StaticDataSource::new();
    source.insert("/same", generation_one());
    let mut chart = Chart::new(Configuration::default(), source).unwrap();
    chart.draw(generation_one()).unwrap();

    let calls = Rc::new(Cell::new(0u32));
    let calls2 = Rc::clone(&calls);
    chart
        .update("/same", move || calls2.set(calls2.get() + 1))
        .unwrap();
    settle(&mut chart);

    assert_eq!(calls.get(), 1);
    assert_eq!(chart.scene().segments.len(), 3);
}
