use eframe::egui::{Pos2, Vec2, pos2, vec2};

use relgraph::render::DrawPrimitive;
use relgraph::viewport::RESET_DURATION_SECS;
use relgraph::{Entity, GraphEvent, GraphOptions, GraphView, Relation};

const SURFACE: Vec2 = vec2(800.0, 600.0);

fn three_characters() -> GraphView {
    let mut view = GraphView::new(GraphOptions::default(), SURFACE);
    view.set_data(
        vec![
            Entity::new("A", "Alice"),
            Entity::new("B", "Bob"),
            Entity::new("C", "Carol"),
        ],
        vec![
            Relation::new("ab", "A", "B", "ally", 80),
            Relation::new("bc", "B", "C", "enemy", 30),
        ],
    );
    view
}

fn screen_of(view: &GraphView, id: &str) -> Pos2 {
    let world = view.graph().node(id).unwrap().world_pos;
    view.transform().world_to_screen(world)
}

fn click(view: &mut GraphView, at: Pos2) {
    view.pointer_down(at);
    view.pointer_up(at);
}

#[test]
fn test_three_characters_build_styled_links_and_settle_without_overlap() {
    let mut view = three_characters();
    let graph = view.graph();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.links.len(), 2);

    let ally = &graph.links[0];
    assert!(!ally.dashed);
    assert!((ally.width - 5.2).abs() < 1e-5);
    let enemy = &graph.links[1];
    assert!(enemy.dashed);
    assert!((enemy.width - 3.2).abs() < 1e-5);

    view.settle(5_000);
    assert!(view.alpha() < relgraph::physics::ALPHA_MIN);
    assert!(!view.frame(1.0 / 60.0));

    let nodes = &view.graph().nodes;
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            let distance = (a.world_pos - b.world_pos).length();
            assert!(
                distance >= a.radius + b.radius,
                "{} and {} overlap at distance {distance}",
                a.id,
                b.id
            );
        }
    }
}

#[test]
fn test_empty_input_is_inert() {
    let mut view = GraphView::new(GraphOptions::default(), SURFACE);
    view.set_data(Vec::new(), vec![Relation::new("x", "p", "q", "ally", 50)]);

    assert!(view.is_empty());
    assert!(view.graph().links.is_empty());
    assert!(!view.is_active());
    assert!(!view.frame(1.0 / 60.0));
    assert_eq!(view.snapshot().tick, 0);
    assert!(view.scene().is_empty());
}

#[test]
fn test_drag_and_release_leaves_node_at_drop_point() {
    let mut view = three_characters();
    view.settle(5_000);

    let start = screen_of(&view, "A");
    view.pointer_down(start);
    view.pointer_move(start + vec2(10.0, 0.0));
    assert!(view.is_active());
    view.pointer_move(pos2(100.0, 200.0));

    let during = view.snapshot();
    assert!(during.nodes.iter().any(|node| node.id == "A" && node.pinned));

    view.pointer_up(pos2(100.0, 200.0));
    let after = view.snapshot();
    assert_eq!(after.position_of("A"), Some(vec2(100.0, 200.0)));
    assert!(after.nodes.iter().all(|node| !node.pinned));

    // a drag is not a click
    assert_eq!(view.selected(), None);
}

#[test]
fn test_click_toggles_selection_and_background_clears_it() {
    let mut view = three_characters();
    view.settle(5_000);
    view.take_events();

    let at = screen_of(&view, "A");

    click(&mut view, at);
    assert_eq!(view.selected(), Some("A"));
    let at = screen_of(&view, "A");
    click(&mut view, at);
    assert_eq!(view.selected(), None);

    let at = screen_of(&view, "B");

    click(&mut view, at);
    let at = screen_of(&view, "C");
    click(&mut view, at);
    assert_eq!(view.selected(), Some("C"));
    click(&mut view, pos2(2.0, 2.0));
    assert_eq!(view.selected(), None);

    let selections = view
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            GraphEvent::SelectionChanged(selected) => Some(selected),
            GraphEvent::TransformChanged(_) => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        selections,
        vec![
            Some("A".to_owned()),
            None,
            Some("B".to_owned()),
            Some("C".to_owned()),
            None,
        ]
    );
}

#[test]
fn test_reset_is_idempotent() {
    let mut view = three_characters();
    view.settle(5_000);
    view.zoom_by(2.5);
    view.pan_by(40.0, -20.0);
    let at = screen_of(&view, "B");
    click(&mut view, at);
    assert_eq!(view.selected(), Some("B"));

    view.reset();
    let once = (view.settled_transform(), view.selected().map(str::to_owned));
    view.reset();
    let twice = (view.settled_transform(), view.selected().map(str::to_owned));
    assert_eq!(once, twice);
    assert!(twice.0.is_identity());
    assert_eq!(twice.1, None);
    assert_eq!(view.alpha(), 1.0);

    let frames = (RESET_DURATION_SECS / (1.0 / 60.0)).ceil() as usize + 2;
    for _ in 0..frames {
        view.frame(1.0 / 60.0);
    }
    assert!(view.transform().is_identity());
}

#[test]
fn test_wheel_zoom_keeps_point_under_cursor() {
    let mut view = three_characters();
    let cursor = pos2(320.0, 180.0);
    let before = view.transform().screen_to_world(cursor);
    view.wheel(cursor, 120.0);
    view.wheel(cursor, -40.0);
    let after = view.transform().screen_to_world(cursor);
    assert!((before - after).length() < 1e-3);
    assert!(
        view.take_events()
            .iter()
            .all(|event| matches!(event, GraphEvent::TransformChanged(_)))
    );
}

#[test]
fn test_rebuild_keeps_layout_and_drops_dangling_relations() {
    let mut view = three_characters();
    view.settle(5_000);
    let before = view.snapshot();

    view.set_data(
        vec![
            Entity::new("A", "Alice"),
            Entity::new("B", "Bob"),
            Entity::new("C", "Carol"),
            Entity::new("D", "Dmitri"),
        ],
        vec![
            Relation::new("ab", "A", "B", "ally", 80),
            Relation::new("bc", "B", "C", "enemy", 30),
            Relation::new("dz", "D", "Z", "friend", 60),
        ],
    );

    let graph = view.graph();
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(graph.links.len(), 2);
    assert_eq!(graph.dropped_relations, 1);
    for id in ["A", "B", "C"] {
        assert_eq!(view.snapshot().position_of(id), before.position_of(id));
    }
}

#[test]
fn test_same_name_same_color_across_views() {
    let first = three_characters();
    let second = three_characters();
    for (a, b) in first.graph().nodes.iter().zip(&second.graph().nodes) {
        assert_eq!(a.color, b.color);
    }
}

#[test]
fn test_hover_shows_tooltip_and_export_writes_png() {
    let mut view = three_characters();
    view.settle(5_000);
    view.pointer_move(screen_of(&view, "C"));
    assert_eq!(view.hovered(), Some("C"));

    let scene = view.scene();
    assert!(scene.primitives.iter().any(|primitive| matches!(
        primitive,
        DrawPrimitive::Tooltip { node_id, .. } if node_id == "C"
    )));

    let bytes = view.export_image().unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
