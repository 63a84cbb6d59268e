mod common;

use std::sync::Arc;

use common::{FakeLibrary, FakePlayer, ROOT, dir, soundtouch_library, track};
use stcontrol::{
    BootstrapPath, BrowserEngine, ContainerRef, ControlPointError, ListResult, Listing,
    NavigationStack,
};

fn engine(library: &Arc<FakeLibrary>, player: &Arc<FakePlayer>) -> BrowserEngine {
    BrowserEngine::new(library.clone(), player.clone())
}

fn names(engine: &BrowserEngine) -> Vec<String> {
    engine
        .current_items()
        .iter()
        .map(|i| i.name().to_string())
        .collect()
}

fn container_of(name: &str, id: &str) -> ContainerRef {
    dir(name, id).container().cloned().unwrap()
}

#[test]
fn test_bootstrap_reaches_mount_point() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(browser.stack().peek().map(|c| c.id.as_str()), Some("2"));
    assert_eq!(names(&browser), vec!["Artists", "loose.mp3"]);
    assert_eq!(browser.breadcrumb(), "Folder ⏵ /mnt/usb1_1");
    assert!(!browser.is_busy());
    assert!(browser.status().is_none());
    assert_eq!(library.calls(), vec![ROOT, "1", "2"]);
}

#[test]
fn test_bootstrap_without_folder_shows_root() {
    let library = Arc::new(FakeLibrary::new().with(ROOT, vec![dir("Genre", "5"), track("x", "9")]));
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert!(browser.stack().is_empty());
    assert_eq!(names(&browser), vec!["Genre", "x"]);
    assert_eq!(browser.breadcrumb(), "Root");
    assert!(browser.status().unwrap().contains("Bootstrap stopped at Root"));
}

#[test]
fn test_bootstrap_without_mount_shows_folder() {
    let library = Arc::new(
        FakeLibrary::new()
            .with(ROOT, vec![dir("Folder", "1")])
            .with("1", vec![dir("/mnt/sd", "7")]),
    );
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert_eq!(browser.stack().len(), 1);
    assert_eq!(names(&browser), vec!["/mnt/sd"]);
    assert!(browser.status().unwrap().contains("/mnt/usb1_1"));
}

#[test]
fn test_bootstrap_with_failing_mount_falls_back_to_folder() {
    let library = Arc::new(soundtouch_library());
    library.fail("2");
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert_eq!(browser.stack().len(), 1);
    assert_eq!(names(&browser), vec!["/mnt/usb1_1"]);
    assert!(browser.status().is_some());
}

#[test]
fn test_bootstrap_with_failing_root_is_displayable() {
    let library = Arc::new(FakeLibrary::new());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert!(browser.stack().is_empty());
    assert!(matches!(browser.listing(), Listing::Failed(_)));
    assert!(browser.current_items().is_empty());
    assert!(!browser.is_busy());
}

#[test]
fn test_custom_bootstrap_path() {
    let library = Arc::new(
        FakeLibrary::new()
            .with(ROOT, vec![dir("Library", "1")])
            .with("1", vec![dir("/mnt/usb2_1", "2")])
            .with("2", vec![track("a", "2$1")]),
    );
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player).with_bootstrap(BootstrapPath {
        folder: "Library".to_string(),
        mount: "/mnt/usb2_1".to_string(),
    });

    browser.initialize(NavigationStack::new());

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(names(&browser), vec!["a"]);
}

#[test]
fn test_restore_saved_path_refetches_top() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    let saved = NavigationStack::from(vec![
        container_of("Folder", "1"),
        container_of("/mnt/usb1_1", "2"),
        container_of("Artists", "3"),
    ]);
    browser.initialize(saved.clone());

    assert_eq!(browser.stack(), &saved);
    assert_eq!(names(&browser), vec!["So What", "Blue in Green"]);
    assert_eq!(library.calls(), vec!["3"]);
}

#[test]
fn test_restore_with_failing_top_falls_back_to_parent() {
    let library = Arc::new(soundtouch_library());
    library.fail("3");
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::from(vec![
        container_of("Folder", "1"),
        container_of("/mnt/usb1_1", "2"),
        container_of("Artists", "3"),
    ]));

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(browser.breadcrumb(), "Folder ⏵ /mnt/usb1_1");
    assert!(!browser.is_busy());
    match browser.listing() {
        Listing::Failed(message) => assert!(message.starts_with("Failed to list Artists")),
        other => panic!("expected a failed listing, got {:?}", other),
    }
    assert_eq!(
        browser.status(),
        Some("Failed to list Artists: HTTP error on navigate: timed out")
    );

    // The unreachable level is dropped from the path handed back.
    let path = browser.close();
    assert_eq!(path.len(), 2);
    assert_eq!(path.peek().map(|c| c.id.as_str()), Some("2"));
}

#[test]
fn test_bootstrap_with_failing_folder_shows_root() {
    let library = Arc::new(soundtouch_library());
    library.fail("1");
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.initialize(NavigationStack::new());

    assert!(browser.stack().is_empty());
    assert_eq!(browser.breadcrumb(), "Root");
    assert_eq!(names(&browser), vec!["Folder", "Genre"]);
    assert!(browser.status().unwrap().contains("Bootstrap stopped at Root"));
    assert!(!browser.is_busy());
    assert_eq!(library.calls(), vec![ROOT, "1"]);
}

#[test]
fn test_select_dir_descends_and_select_track_plays() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    let artists = browser.current_items()[0].clone();
    browser.select(&artists);
    assert_eq!(browser.stack().len(), 3);
    assert_eq!(names(&browser), vec!["So What", "Blue in Green"]);

    let song = browser.current_items()[1].clone();
    browser.select(&song);
    assert_eq!(browser.stack().len(), 3);
    assert_eq!(player.played(), vec![song.play_ref().clone()]);
    assert_eq!(browser.status(), Some("Playing Blue in Green"));
}

#[test]
fn test_force_play_dir_does_not_navigate() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());
    let calls_before = library.calls().len();

    let artists = browser.current_items()[0].clone();
    browser.force_play(&artists);

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(library.calls().len(), calls_before);
    assert_eq!(player.played(), vec![artists.play_ref().clone()]);
}

#[test]
fn test_playback_failure_is_reported() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    player.fail();
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    let song = browser.current_items()[1].clone();
    browser.select(&song);

    assert!(browser.status().unwrap().starts_with("Failed to play loose.mp3"));
    assert_eq!(names(&browser), vec!["Artists", "loose.mp3"]);
}

#[test]
fn test_enter_rejects_tracks() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    let err = browser.enter(&track("So What", "3$1")).unwrap_err();
    assert_eq!(err, ControlPointError::NotAContainer("So What".to_string()));
    assert!(browser.stack().is_empty());
    assert!(player.played().is_empty());
}

#[test]
fn test_back_pops_and_refetches_parent() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    browser.back();
    assert_eq!(browser.stack().len(), 1);
    assert_eq!(names(&browser), vec!["/mnt/usb1_1"]);

    browser.back();
    assert!(browser.stack().is_empty());
    assert_eq!(names(&browser), vec!["Folder", "Genre"]);
    assert_eq!(library.calls(), vec![ROOT, "1", "2", "1", ROOT]);
}

#[test]
fn test_back_on_root_relists_root() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.back();

    assert!(browser.stack().is_empty());
    assert_eq!(names(&browser), vec!["Folder", "Genre"]);
    assert_eq!(library.calls(), vec![ROOT]);
}

#[test]
fn test_depth_tracks_enters_minus_backs() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    let folder = dir("Folder", "1");
    let mount = dir("/mnt/usb1_1", "2");
    let artists = dir("Artists", "3");

    // None stands for a back.
    let steps: Vec<Option<&stcontrol::Item>> = vec![
        None,
        Some(&folder),
        Some(&mount),
        None,
        None,
        None,
        Some(&folder),
        Some(&mount),
        Some(&artists),
        None,
    ];

    let mut expected: usize = 0;
    for step in steps {
        match step {
            Some(item) => {
                browser.enter(item).unwrap();
                expected += 1;
            }
            None => {
                browser.back();
                expected = expected.saturating_sub(1);
            }
        }
        assert_eq!(browser.stack().len(), expected);
        assert!(!browser.is_busy());
    }
}

#[test]
fn test_back_then_enter_restores_items() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    let artists = browser.current_items()[0].clone();
    browser.select(&artists);
    let before = browser.current_items().to_vec();

    browser.back();
    browser.enter(&artists).unwrap();

    assert_eq!(browser.current_items(), before.as_slice());
}

#[test]
fn test_failed_enter_pops_and_shows_error() {
    let library = Arc::new(soundtouch_library());
    library.fail("3");
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    browser.enter(&dir("Artists", "3")).unwrap();

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(browser.breadcrumb(), "Folder ⏵ /mnt/usb1_1");
    assert!(!browser.is_busy());
    assert!(browser.current_items().is_empty());
    match browser.listing() {
        Listing::Failed(message) => assert!(message.starts_with("Failed to list Artists")),
        other => panic!("expected a failed listing, got {:?}", other),
    }

    // Retry by issuing the same action once the service recovers.
    library.heal("3");
    browser.enter(&dir("Artists", "3")).unwrap();
    assert_eq!(browser.stack().len(), 3);
    assert_eq!(names(&browser), vec!["So What", "Blue in Green"]);
}

#[test]
fn test_empty_folder_is_not_an_error() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.enter(&dir("Genre", "5")).unwrap();

    assert_eq!(browser.listing(), &Listing::Empty);
    assert!(browser.status().is_none());
}

#[test]
fn test_refresh_keeps_stack() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    browser.refresh();

    assert_eq!(browser.stack().len(), 2);
    assert_eq!(library.calls(), vec![ROOT, "1", "2", "2"]);
}

#[test]
fn test_truncated_listing_is_flagged() {
    let items = (0..3).map(|i| track(&format!("t{}", i), &format!("4${}", i))).collect();
    let library = Arc::new(
        FakeLibrary::new()
            .with(ROOT, vec![])
            .with_result("4", ListResult { items, total: Some(1500) }),
    );
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);

    browser.enter(&dir("Big", "4")).unwrap();

    assert_eq!(browser.current_items().len(), 3);
    assert_eq!(browser.status(), Some("Showing 3 of 1500 entries"));
}

#[test]
fn test_snapshot_and_close() {
    let library = Arc::new(soundtouch_library());
    let player = Arc::new(FakePlayer::new());
    let mut browser = engine(&library, &player);
    browser.initialize(NavigationStack::new());

    let snapshot = browser.snapshot();
    assert_eq!(snapshot.depth, 2);
    assert!(snapshot.can_go_back());
    assert!(!snapshot.busy);
    assert_eq!(snapshot.items().len(), 2);

    let path = browser.close();
    assert_eq!(path.breadcrumb(), "Folder ⏵ /mnt/usb1_1");
}
