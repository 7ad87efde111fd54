use scrollfx::{Document, Engine, NodeId, PageSpec, Services, Simulation};

fn setup() -> (Engine, Simulation) {
    let page: PageSpec = serde_json::from_str(include_str!("data/page.json")).unwrap();
    let doc = Document::from_page(&page);
    let (services, sim) = Services::simulated(doc, page.viewport_height, 11);
    (Engine::new(services), sim)
}

/// Node ids, text and classes of every connected node.
fn structure(sim: &Simulation) -> Vec<(NodeId, String, Vec<String>)> {
    sim.doc
        .borrow()
        .snapshot()
        .into_iter()
        .map(|n| (n.node, n.text, n.classes))
        .collect()
}

#[test]
fn destroy_removes_everything_instances_created() {
    let (mut engine, sim) = setup();
    let before = structure(&sim);
    engine.init_document();
    assert_ne!(structure(&sim), before);

    for y in [1000.0, 2200.0, 3600.0, 4300.0] {
        sim.scroll.scroll_to(y);
    }
    assert!(sim.timers.pending() > 0);
    assert!(engine.live_handles() > 0);

    engine.destroy();
    assert_eq!(structure(&sim), before);
    assert_eq!(sim.scroll.live_observers(), 0);
    assert_eq!(sim.timers.pending(), 0);
}

#[test]
fn nothing_moves_after_destroy() {
    let (mut engine, sim) = setup();
    engine.init_document();
    sim.scroll.scroll_to(3600.0);
    engine.destroy();

    let frozen = sim.doc.borrow().snapshot();
    let calls = sim.tween.call_count();
    for y in [0.0, 1500.0, 4300.0, 2000.0] {
        sim.scroll.scroll_to(y);
        sim.timers.advance(1.0);
    }
    let after = sim.doc.borrow().snapshot();
    assert_eq!(frozen.len(), after.len());
    for (a, b) in frozen.iter().zip(&after) {
        assert_eq!(a.node, b.node);
        assert_eq!(a.style, b.style);
    }
    assert_eq!(sim.tween.call_count(), calls);
}

#[test]
fn destroyed_elements_stay_reserved() {
    let (mut engine, _sim) = setup();
    assert_eq!(engine.init_document(), 7);
    engine.destroy();
    assert_eq!(engine.init_document(), 0);
}
