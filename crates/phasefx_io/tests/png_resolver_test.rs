//! Integration test: task list on disk → work-stealing pool → PNGs on disk.

use phasefx_core::{apply_effects_sequential, parse_effects, schedule_tasks, FxError, Image, Pixel};
use phasefx_io::{build_tasks, load_png, save_png, DataLayout, PngResolver};
use std::fs;

fn checker(width: usize, height: usize) -> Image {
    let pixels = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                if (x + y) % 2 == 0 {
                    Pixel::opaque(60000, 20000, 5000)
                } else {
                    Pixel::new(1000, 30000, 64000, 32768)
                }
            })
        })
        .collect();
    Image::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn test_pipeline_writes_every_output() {
    let root = tempfile::tempdir().unwrap();
    let layout = DataLayout::under(root.path());

    for dir in ["small", "big"] {
        save_png(&checker(9, 7), layout.input_root.join(dir).join("a.png")).unwrap();
        save_png(&checker(5, 12), layout.input_root.join(dir).join("b.png")).unwrap();
    }
    fs::write(
        &layout.effects_file,
        concat!(
            r#"{"inPath": "a.png", "outPath": "a_Out.png", "effects": ["S", "E", "G"]}"#,
            "\n",
            r#"{"inPath": "b.png", "outPath": "b_Out.png", "effects": []}"#,
        ),
    )
    .unwrap();

    let tasks = build_tasks(&layout, &["small", "big"]).unwrap();
    assert_eq!(tasks.len(), 4);

    let report = schedule_tasks(tasks.clone(), 3, &PngResolver).unwrap();
    assert_eq!(report.processed(), 4);

    for task in &tasks {
        let mut expected = load_png(&task.source).unwrap();
        apply_effects_sequential(&mut expected, &parse_effects(&task.effects).unwrap());
        let written = load_png(&task.destination).unwrap();
        assert_eq!(written.output(), expected.output(), "{}", task.destination);
    }

    for name in ["small_a_Out.png", "small_b_Out.png", "big_a_Out.png", "big_b_Out.png"] {
        assert!(layout.output_root.join(name).is_file(), "missing {name}");
    }
}

#[test]
fn test_missing_input_aborts_with_path() {
    let root = tempfile::tempdir().unwrap();
    let layout = DataLayout::under(root.path());
    fs::create_dir_all(&layout.input_root).unwrap();
    fs::write(
        &layout.effects_file,
        r#"{"inPath": "ghost.png", "outPath": "ghost_Out.png", "effects": ["B"]}"#,
    )
    .unwrap();

    let tasks = build_tasks(&layout, &["small"]).unwrap();
    let err = schedule_tasks(tasks, 2, &PngResolver).unwrap_err();
    match err {
        FxError::TaskAborted { task, cause } => {
            assert!(task.ends_with("ghost.png"));
            assert!(matches!(*cause, FxError::Resolve { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!layout.output_root.join("small_ghost_Out.png").exists());
}
