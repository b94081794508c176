//! Expiry list ingestion from files on disk.

use std::fs;
use std::path::PathBuf;

use osmtile_core::{Error, ExpiryLineError, TileCoordinate, TileExpiryList};
use rayon::prelude::*;
use tempfile::TempDir;

fn write_list(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write expiry list");
    path
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_list(&temp, "dirty.list", "12/5/7\n12/5/7\n12/3/2\n");

    let mut list = TileExpiryList::new(12, true);
    list.read_list_from_file(&path).unwrap();

    assert_eq!(list.len(), 2);
    assert!(list.contains(TileCoordinate::new(5, 7)));
    assert!(list.contains(TileCoordinate::new(3, 2)));
    assert!(!list.contains(TileCoordinate::new(4, 4)));
}

#[test]
fn test_two_files_accumulate() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let first = write_list(&temp, "a.list", "10/1/1\n10/2/2\n");
    let second = write_list(&temp, "b.list", "10/2/2\n10/0/3\n");

    let mut list = TileExpiryList::new(10, true);
    list.read_list_from_file(&first).unwrap();
    list.read_list_from_file(&second).unwrap();

    assert_eq!(
        list.tiles(),
        &[TileCoordinate::new(0, 3), TileCoordinate::new(1, 1), TileCoordinate::new(2, 2)]
    );
}

#[test]
fn test_zoom_mismatch_names_file_and_line() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_list(&temp, "mixed.list", "12/5/7\n13/5/7\n");

    let mut list = TileExpiryList::new(12, true);
    let err = list.read_list_from_file(&path).unwrap_err();
    match &err {
        Error::ExpiryList { path: p, line, reason } => {
            assert_eq!(p, &path);
            assert_eq!(*line, 2);
            assert_eq!(
                reason,
                &ExpiryLineError::ZoomMismatch {
                    found: 13,
                    expected: 12
                }
            );
        }
        other => panic!("Expected ExpiryList error, got {:?}", other),
    }
    assert!(err.to_string().contains("mixed.list"));
    assert!(list.is_empty());
}

#[test]
fn test_missing_file() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let mut list = TileExpiryList::new(12, true);
    let err = list
        .read_list_from_file(temp.path().join("absent.list"))
        .unwrap_err();
    assert!(matches!(err, Error::ExpiryRead { .. }));
}

#[test]
fn test_disabled_list_ignores_bad_file() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_list(&temp, "junk.list", "not a tile\n");

    let mut list = TileExpiryList::new(12, false);
    list.read_list_from_file(&path).unwrap();
    list.read_list_from_file(temp.path().join("absent.list")).unwrap();
    assert!(list.contains(TileCoordinate::new(5, 7)));
    assert!(list.clone_at_zoom(8).is_empty());
}

#[test]
fn test_coarsen_loaded_list() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_list(&temp, "z12.list", "12/5/7\n12/4/5\n12/9/1\n");

    let mut list = TileExpiryList::new(12, true);
    list.read_list_from_file(&path).unwrap();

    assert_eq!(
        list.clone_at_zoom(10),
        vec![TileCoordinate::new(1, 1), TileCoordinate::new(2, 0)]
    );
    assert_eq!(list.clone_at_zoom(12).len(), 3);
    assert_eq!(list.clone_at_zoom(0), vec![TileCoordinate::new(0, 0)]);
}

#[test]
fn test_concurrent_queries() {
    let tiles: Vec<_> = (0..1024u32).map(|i| TileCoordinate::new(i, i / 2)).collect();
    let list = TileExpiryList::with_tiles(12, true, tiles);

    let hits = (0..4096u32)
        .into_par_iter()
        .filter(|&i| list.contains(TileCoordinate::new(i % 2048, (i % 2048) / 2)))
        .count();
    // i % 2048 < 1024 for half of the inputs
    assert_eq!(hits, 2048);
}
