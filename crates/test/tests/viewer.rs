use std::time::{Duration, Instant};

use flipbook_application::{GotoOutcome, OverlayContent, PLACEHOLDER_SUBTITLE, Viewer};
use flipbook_core::{AnimationState, FlipDirection, GotoError, SurfaceId, VideoConfig};
use flipbook_test::{FakeDocument, RecordingStage, make_settings, video, videos};

const FLIP: Duration = Duration::from_millis(1200);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn viewer_with(pages: u32, config: VideoConfig) -> (Viewer<FakeDocument, RecordingStage>, Instant) {
    let mut viewer = Viewer::new(
        FakeDocument::new(pages),
        config,
        make_settings(1200),
        RecordingStage::default(),
    );
    let now = Instant::now();
    viewer.start(now);
    (viewer, now)
}

fn viewer(pages: u32) -> (Viewer<FakeDocument, RecordingStage>, Instant) {
    viewer_with(pages, VideoConfig::default())
}

#[test]
fn start_renders_first_spread() {
    let (viewer, _) = viewer(10);
    let stage = viewer.stage();
    assert_eq!(stage.spread_painted(), (Some(1), Some(2)));
    assert_eq!(stage.surface(SurfaceId::StaticLeft).label, Some(1));
    assert_eq!(stage.surface(SurfaceId::StaticRight).label, Some(2));
    assert_eq!(stage.label(), Some("Pages 1-2 of 10"));
    assert!(stage.loading);
    assert!(!stage.sidebar_open);
}

#[test]
fn show_spread_normalizes_and_renders_pair() {
    let (mut viewer, _) = viewer(10);
    assert!(viewer.show_spread(4));
    assert_eq!(viewer.spread().left(), 3);
    assert_eq!(viewer.stage().spread_painted(), (Some(3), Some(4)));
    assert_eq!(viewer.stage().label(), Some("Pages 3-4 of 10"));
}

#[test]
fn odd_total_clears_missing_right_page() {
    let (mut viewer, _) = viewer(9);
    viewer.show_spread(9);
    let stage = viewer.stage();
    assert_eq!(stage.spread_painted(), (Some(9), None));
    assert_eq!(stage.surface(SurfaceId::StaticRight).label, None);
    assert!(!stage.layer(SurfaceId::StaticRight).visible);
    assert_eq!(stage.label(), Some("Pages 9-9 of 9"));
    let controls = stage.controls.as_ref().unwrap();
    assert!(!controls.next_enabled);
    assert!(controls.prev_enabled);
}

#[test]
fn flips_are_rejected_at_the_edges() {
    let (mut viewer, now) = viewer(10);
    assert!(!viewer.flip_prev(now));

    viewer.show_spread(9);
    assert!(!viewer.flip_next(now));
    assert_eq!(viewer.stage().flips_started, 0);
    assert!(viewer.animation_state().is_idle());
}

#[test]
fn flip_next_prepares_then_commits_after_duration() {
    let (mut viewer, now) = viewer(10);
    viewer.document().clear_renders();

    assert!(viewer.flip_next(now));
    assert_eq!(
        viewer.animation_state(),
        AnimationState::Animating(FlipDirection::Next)
    );
    assert_eq!(viewer.stage().flip, Some((FlipDirection::Next, FLIP)));
    assert_eq!(viewer.spread().left(), 1);

    let stage = viewer.stage();
    assert_eq!(stage.surface(SurfaceId::FlipFront).painted, Some(2));
    assert_eq!(stage.surface(SurfaceId::FlipBack).painted, Some(3));
    // The right side already holds the page revealed under the sheet.
    assert_eq!(stage.spread_painted(), (Some(1), Some(4)));
    assert_eq!(viewer.document().renders(), vec![2, 3, 4]);

    viewer.tick(now + ms(1199));
    assert_eq!(viewer.spread().left(), 1);
    assert_eq!(viewer.stage().flips_finished, 0);

    viewer.tick(now + FLIP);
    assert_eq!(viewer.spread().left(), 3);
    assert!(viewer.animation_state().is_idle());
    assert_eq!(viewer.stage().flip, None);
    assert_eq!(viewer.stage().flips_finished, 1);
    assert_eq!(viewer.stage().spread_painted(), (Some(3), Some(4)));
    assert_eq!(viewer.stage().label(), Some("Pages 3-4 of 10"));
    assert_eq!(viewer.document().renders(), vec![2, 3, 4, 3]);
}

#[test]
fn flip_prev_mirrors_next() {
    let (mut viewer, now) = viewer(10);
    viewer.show_spread(5);

    assert!(viewer.flip_prev(now));
    let stage = viewer.stage();
    assert_eq!(stage.surface(SurfaceId::FlipFront).painted, Some(4));
    assert_eq!(stage.surface(SurfaceId::FlipBack).painted, Some(5));
    assert_eq!(stage.spread_painted(), (Some(3), Some(6)));

    viewer.tick(now + FLIP);
    assert_eq!(viewer.spread().left(), 3);
    assert_eq!(viewer.stage().spread_painted(), (Some(3), Some(4)));
}

#[test]
fn input_during_a_flip_has_no_effect() {
    let (mut viewer, now) = viewer(10);
    assert!(viewer.flip_next(now));
    viewer.document().clear_renders();

    assert!(!viewer.flip_next(now + ms(10)));
    assert!(!viewer.flip_prev(now + ms(20)));
    assert_eq!(viewer.go_to_page("7"), Ok(GotoOutcome::Busy));
    assert!(!viewer.show_spread(5));
    viewer.toggle_sidebar();
    assert_eq!(viewer.select_toc_entry(3), Some(GotoOutcome::Busy));
    assert!(viewer.sidebar_open());

    assert_eq!(viewer.spread().left(), 1);
    assert_eq!(viewer.stage().flips_started, 1);
    assert!(viewer.document().renders().is_empty());
    assert!(viewer.stage().errors.is_empty());

    viewer.tick(now + FLIP);
    assert_eq!(viewer.spread().left(), 3);
}

#[test]
fn ten_pages_walk_to_the_last_spread() {
    let (mut viewer, mut clock) = viewer(10);
    let mut lefts = vec![viewer.spread().left()];
    while viewer.flip_next(clock) {
        clock += FLIP;
        viewer.tick(clock);
        lefts.push(viewer.spread().left());
    }
    assert_eq!(lefts, vec![1, 3, 5, 7, 9]);
    assert!(!viewer.flip_next(clock));
    assert_eq!(viewer.stage().label(), Some("Pages 9-10 of 10"));
    assert_eq!(viewer.stage().spread_painted(), (Some(9), Some(10)));
}

#[test]
fn go_to_even_page_lands_on_its_spread() {
    let (mut viewer, _) = viewer(10);
    let outcome = viewer.go_to_page("6");
    assert!(matches!(outcome, Ok(GotoOutcome::Jumped(spread)) if spread.left() == 5));
    assert_eq!(viewer.stage().spread_painted(), (Some(5), Some(6)));
    assert!(!viewer.stage().loading);
}

#[test]
fn invalid_page_input_is_reported_and_ignored() {
    let (mut viewer, _) = viewer(10);
    viewer.show_spread(3);
    viewer.document().clear_renders();

    assert_eq!(
        viewer.go_to_page("0"),
        Err(GotoError::OutOfRange { page: 0, total: 10 })
    );
    assert_eq!(
        viewer.go_to_page("11"),
        Err(GotoError::OutOfRange {
            page: 11,
            total: 10
        })
    );
    assert!(matches!(
        viewer.go_to_page("seven"),
        Err(GotoError::NotANumber(_))
    ));
    assert_eq!(viewer.go_to_page("  "), Err(GotoError::Empty));

    assert_eq!(viewer.spread().left(), 3);
    assert_eq!(viewer.stage().errors.len(), 4);
    assert_eq!(viewer.stage().errors[0], "page out of range (1..=10)");
    assert!(viewer.document().renders().is_empty());
}

#[test]
fn replace_mode_hides_document_content() {
    let config = videos(vec![
        video(3, "https://cdn.example.com/tour.mp4", "Tour", true),
        video(4, "", "Interview", false),
    ]);
    let (mut viewer, _) = viewer_with(10, config);
    viewer.document().clear_renders();
    viewer.show_spread(3);

    let stage = viewer.stage();
    let left = stage.surface(SurfaceId::StaticLeft);
    let left_layer = stage.layer(SurfaceId::StaticLeft);
    assert!(!left.visible);
    assert_eq!(left.label, Some(3));
    assert!(left_layer.visible);
    assert!(left_layer.replacing);
    assert_eq!(
        left_layer.contents,
        vec![
            OverlayContent::Badge("VIDEO".to_string()),
            OverlayContent::Player {
                title: "Tour".to_string(),
                src: "https://cdn.example.com/tour.mp4".to_string(),
            },
        ]
    );

    let right = stage.surface(SurfaceId::StaticRight);
    let right_layer = stage.layer(SurfaceId::StaticRight);
    assert!(right.visible);
    assert_eq!(right.painted, Some(4));
    assert!(right_layer.visible);
    assert!(!right_layer.replacing);
    assert_eq!(
        right_layer.contents,
        vec![
            OverlayContent::Badge("EXTRA".to_string()),
            OverlayContent::Placeholder {
                title: "Interview".to_string(),
                subtitle: PLACEHOLDER_SUBTITLE.to_string(),
            },
        ]
    );

    // The replaced page is never rasterised.
    assert_eq!(viewer.document().renders(), vec![4]);
}

#[test]
fn leaving_a_video_page_restores_the_surface() {
    let config = videos(vec![video(3, "clip.mp4", "Clip", true)]);
    let (mut viewer, _) = viewer_with(10, config);
    viewer.show_spread(3);
    viewer.show_spread(1);
    let stage = viewer.stage();
    assert!(stage.surface(SurfaceId::StaticLeft).visible);
    assert!(!stage.layer(SurfaceId::StaticLeft).visible);
    assert!(stage.layer(SurfaceId::StaticLeft).contents.is_empty());
    assert_eq!(stage.spread_painted(), (Some(1), Some(2)));
}

#[test]
fn replaced_page_on_a_flip_face_stays_hidden() {
    let config = videos(vec![video(5, "clip.mp4", "Clip", true)]);
    let (mut viewer, now) = viewer_with(10, config);

    // 1 -> 3 paints page 3 on the back face.
    assert!(viewer.flip_next(now));
    viewer.tick(now + FLIP);
    assert_eq!(viewer.stage().surface(SurfaceId::FlipBack).painted, Some(3));

    // 3 -> 5 lands the replaced page on that face.
    let later = now + FLIP;
    assert!(viewer.flip_next(later));
    assert_eq!(
        viewer.animation_state(),
        AnimationState::Animating(FlipDirection::Next)
    );
    let back = viewer.stage().surface(SurfaceId::FlipBack);
    assert_eq!(back.label, Some(5));
    assert!(!back.visible);
    assert_eq!(back.painted, None);
    assert!(viewer.stage().layer(SurfaceId::FlipBack).replacing);

    // 5 -> 3 lifts it again from the left.
    viewer.tick(later + FLIP);
    assert_eq!(viewer.spread().left(), 5);
    assert!(viewer.flip_prev(later + FLIP));
    assert_eq!(viewer.stage().flip.map(|(d, _)| d), Some(FlipDirection::Prev));
    let back = viewer.stage().surface(SurfaceId::FlipBack);
    assert_eq!(back.label, Some(5));
    assert!(!back.visible);
    assert_eq!(back.painted, None);
    assert!(viewer.stage().layer(SurfaceId::FlipBack).replacing);
}

#[test]
fn render_failure_keeps_previous_content() {
    let (mut viewer, now) = viewer(10);
    viewer.document().fail_page(3);
    viewer.show_spread(3);

    let stage = viewer.stage();
    assert_eq!(stage.surface(SurfaceId::StaticLeft).painted, Some(1));
    assert_eq!(stage.surface(SurfaceId::StaticLeft).label, Some(3));
    assert_eq!(stage.surface(SurfaceId::StaticRight).painted, Some(4));
    assert!(stage.errors.is_empty());

    assert!(viewer.flip_next(now));
    viewer.tick(now + FLIP);
    assert_eq!(viewer.spread().left(), 5);
}

#[test]
fn resize_while_idle_rerenders_same_spread() {
    let (mut viewer, now) = viewer(10);
    viewer.show_spread(5);
    viewer.document().clear_renders();

    viewer.notify_resize(now);
    viewer.notify_resize(now + ms(100));
    assert!(!viewer.tick(now + ms(399)));
    assert!(viewer.document().renders().is_empty());

    viewer.tick(now + ms(400));
    assert_eq!(viewer.document().renders(), vec![5, 6]);
    assert_eq!(viewer.spread().left(), 5);
}

#[test]
fn resize_during_a_flip_is_dropped() {
    let (mut viewer, now) = viewer(10);
    assert!(viewer.flip_next(now));
    viewer.document().clear_renders();

    viewer.notify_resize(now);
    viewer.tick(now + ms(300));
    assert!(viewer.document().renders().is_empty());

    viewer.tick(now + FLIP);
    assert_eq!(viewer.document().renders(), vec![3]);
    assert_eq!(viewer.spread().left(), 3);

    viewer.tick(now + FLIP + ms(300));
    assert_eq!(viewer.document().renders(), vec![3]);
}

#[test]
fn loader_hides_after_delay() {
    let (mut viewer, now) = viewer(4);
    assert_eq!(viewer.next_deadline(), Some(now + ms(500)));
    viewer.tick(now + ms(499));
    assert!(viewer.stage().loading);
    assert!(viewer.tick(now + ms(500)));
    assert!(!viewer.stage().loading);
    assert_eq!(viewer.next_deadline(), None);
}

#[test]
fn next_deadline_tracks_the_flip_commit() {
    let (mut viewer, now) = viewer(10);
    viewer.tick(now + ms(500));
    let flip_at = now + ms(500);
    assert!(viewer.flip_next(flip_at));
    assert_eq!(viewer.next_deadline(), Some(flip_at + FLIP));
    let (direction, progress) = viewer.flip_progress(flip_at + ms(600)).unwrap();
    assert_eq!(direction, FlipDirection::Next);
    assert!((progress - 0.5).abs() < 1e-3);
}

#[test]
fn table_of_contents_lists_spreads() {
    let (viewer, _) = viewer(9);
    let titles: Vec<&str> = viewer
        .stage()
        .toc
        .iter()
        .map(|item| item.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec!["Pages 1-2", "Pages 3-4", "Pages 5-6", "Pages 7-8", "Pages 9-9"]
    );
}

#[test]
fn selecting_contents_entry_jumps_and_closes_sidebar() {
    let (mut viewer, _) = viewer(10);
    viewer.toggle_sidebar();
    assert!(viewer.stage().sidebar_open);

    let outcome = viewer.select_toc_entry(2);
    assert!(matches!(outcome, Some(GotoOutcome::Jumped(spread)) if spread.left() == 5));
    assert!(!viewer.sidebar_open());
    assert!(!viewer.stage().sidebar_open);
    assert_eq!(viewer.stage().spread_painted(), (Some(5), Some(6)));

    assert_eq!(viewer.select_toc_entry(99), None);
}

#[test]
fn video_config_from_json_is_validated() -> anyhow::Result<()> {
    let raw = r#"{
        "videos": [
            {"page": 2, "src": "clip.mp4", "title": " Tour ", "replace_content": true},
            {"page": 40, "title": "Past the end"}
        ]
    }"#;
    let config: VideoConfig = serde_json::from_str(raw)?;
    let config = config.validated(10)?;
    assert_eq!(config.videos.len(), 1);

    let (viewer, _) = viewer_with(10, config);
    let layer = viewer.stage().layer(SurfaceId::StaticRight);
    assert!(layer.replacing);
    assert_eq!(
        layer.contents[1],
        OverlayContent::Player {
            title: "Tour".to_string(),
            src: "clip.mp4".to_string(),
        }
    );
    Ok(())
}
