//! Integration tests for the filesystem dispatch layer.
//!
//! These drive `OrthoFs` directly against temporary backing directories,
//! so no kernel mount is needed. They cover:
//! - Generated textures: attributes, open/read/release and reference counts
//! - Partial reads reassembling to the same bytes as a whole read
//! - Passthrough files: create, write, read, rename, removal
//! - Directory listings mixing real entries with generated names

mod common;

use common::{pattern_byte, Harness, PatternFactory};
use ortholayer::cache::{TileCacheConfig, TileKey};
use ortholayer::fuse::{FsError, VIRTUAL_FILE_SIZE, VIRTUAL_HANDLE};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

const TEXTURE: &str = "/terrain/textures/24832_12416_BI16.dds";

fn texture_key() -> TileKey {
    TileKey::new(24832, 12416, "BI", 16)
}

// =============================================================================
// Generated textures
// =============================================================================

#[test]
fn test_getattr_reports_fixed_size() {
    let h = Harness::new();
    let attr = h.fs.getattr(Path::new(TEXTURE)).unwrap();

    assert_eq!(attr.size, 22_369_744);
    assert_eq!(attr.blksize, 32_768);
    assert_eq!(attr.nlink, 1);
    assert_eq!(h.factory.created(), 0);
}

#[test]
fn test_open_read_release_lifecycle() {
    let h = Harness::new();
    let path = Path::new(TEXTURE);

    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
    assert_eq!(fh, VIRTUAL_HANDLE);
    assert_eq!(h.cache().ref_count(&texture_key()), Some(1));

    let data = h.fs.read(path, fh, 0, 16).unwrap();
    let expected: Vec<u8> = (0..16).map(|i| pattern_byte(24832, i)).collect();
    assert_eq!(data, expected);

    h.fs.release(path, fh).unwrap();
    assert_eq!(h.cache().ref_count(&texture_key()), Some(0));
    assert_eq!(h.factory.created(), 1);
}

#[test]
fn test_disjoint_reads_reassemble() {
    let h = Harness::new();
    let path = Path::new(TEXTURE);
    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();

    // The simulator reads the header first, then seeks into a mip level
    let mut pieced = h.fs.read(path, fh, 0, 128).unwrap();
    pieced.extend(h.fs.read(path, fh, 128, 100_000 - 128).unwrap());
    pieced.extend(h.fs.read(path, fh, 100_000, 4096).unwrap());

    let whole = h.fs.read(path, fh, 0, 100_000 + 4096).unwrap();
    assert_eq!(pieced, whole);

    h.fs.release(path, fh).unwrap();
}

#[test]
fn test_reads_at_end_of_file() {
    let h = Harness::new();
    let path = Path::new(TEXTURE);
    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();

    assert_eq!(h.fs.read(path, fh, VIRTUAL_FILE_SIZE - 10, 64).unwrap().len(), 10);
    assert!(h.fs.read(path, fh, VIRTUAL_FILE_SIZE, 64).unwrap().is_empty());
    assert!(h.fs.read(path, fh, VIRTUAL_FILE_SIZE + 1, 64).unwrap().is_empty());

    h.fs.release(path, fh).unwrap();
}

#[test]
fn test_multiple_opens_share_one_tile() {
    let h = Harness::new();
    let path = Path::new(TEXTURE);

    let handles: Vec<u64> = (0..3)
        .map(|_| h.fs.open(path, libc::O_RDONLY).unwrap())
        .collect();
    assert_eq!(h.cache().ref_count(&texture_key()), Some(3));
    assert_eq!(h.factory.created(), 1);

    for fh in handles {
        h.fs.release(path, fh).unwrap();
    }
    assert_eq!(h.cache().ref_count(&texture_key()), Some(0));
}

#[test]
fn test_same_tile_in_different_directories() {
    let h = Harness::new();
    let a = Path::new("/a/24832_12416_BI16.dds");
    let b = Path::new("/b/24832-12416-BI16.dds");

    h.fs.open(a, libc::O_RDONLY).unwrap();
    h.fs.open(b, libc::O_RDONLY).unwrap();

    assert_eq!(h.cache().len(), 1);
    assert_eq!(h.cache().ref_count(&texture_key()), Some(2));
}

#[test]
fn test_map_type_override_merges_tiles() {
    let h = Harness::with_factory(
        PatternFactory::default(),
        TileCacheConfig {
            maptype_override: Some("GO2".to_string()),
            ..TileCacheConfig::default()
        },
    );

    h.fs.open(Path::new("/1_2_BI16.dds"), libc::O_RDONLY).unwrap();
    h.fs.open(Path::new("/1_2_EOX16.dds"), libc::O_RDONLY).unwrap();

    assert_eq!(h.cache().len(), 1);
    assert_eq!(
        h.cache().ref_count(&TileKey::new(1, 2, "GO2", 16)),
        Some(2)
    );
}

#[test]
fn test_failed_generation_is_eio_and_retried() {
    let h = Harness::with_factory(
        PatternFactory {
            failing_row: Some(7),
            ..PatternFactory::default()
        },
        TileCacheConfig::default(),
    );
    let path = Path::new("/7_8_BI16.dds");

    let err = h.fs.open(path, libc::O_RDONLY).unwrap_err();
    assert!(matches!(err, FsError::Tile(_)));
    assert_eq!(err.errno(), libc::EIO);
    assert!(h.cache().is_empty());

    // Nothing was cached, so the next open tries again
    h.fs.open(path, libc::O_RDONLY).unwrap_err();
    assert_eq!(h.factory.created(), 2);
}

#[test]
fn test_failed_read_drops_tile() {
    let h = Harness::with_factory(
        PatternFactory {
            broken_row: Some(1),
            ..PatternFactory::default()
        },
        TileCacheConfig::default(),
    );
    let path = Path::new("/1_2_BI16.dds");
    let key = TileKey::new(1, 2, "BI", 16);

    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
    let err = h.fs.read(path, fh, 0, 16).unwrap_err();
    assert_eq!(err.errno(), libc::EIO);
    assert!(!h.cache().contains(&key));
    assert_eq!(h.factory.closed(), 1);

    h.fs.release(path, fh).unwrap();
    assert!(!h.cache().contains(&key));

    // Reopening builds a new provider instead of reusing the broken one
    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
    assert_eq!(h.factory.created(), 2);
    assert_eq!(h.cache().ref_count(&key), Some(1));
    assert_eq!(h.fs.read(path, fh, 0, 16).unwrap_err().errno(), libc::EIO);
    h.fs.release(path, fh).unwrap();
    assert!(h.cache().is_empty());
}

#[test]
fn test_failed_read_leaves_other_holders_balanced() {
    let h = Harness::with_factory(
        PatternFactory {
            broken_row: Some(1),
            ..PatternFactory::default()
        },
        TileCacheConfig::default(),
    );
    let path = Path::new("/1_2_BI16.dds");
    let key = TileKey::new(1, 2, "BI", 16);

    let a = h.fs.open(path, libc::O_RDONLY).unwrap();
    let b = h.fs.open(path, libc::O_RDONLY).unwrap();
    h.fs.read(path, a, 0, 16).unwrap_err();

    let c = h.fs.open(path, libc::O_RDONLY).unwrap();
    assert_eq!(h.cache().ref_count(&key), Some(1));

    h.fs.release(path, a).unwrap();
    h.fs.release(path, b).unwrap();
    assert_eq!(h.cache().ref_count(&key), Some(1));
    h.fs.release(path, c).unwrap();
    assert_eq!(h.cache().ref_count(&key), Some(0));
}

#[test]
fn test_read_without_open_creates_tile() {
    let h = Harness::new();
    let data = h.fs.read(Path::new(TEXTURE), VIRTUAL_HANDLE, 0, 4).unwrap();
    assert_eq!(data.len(), 4);
    assert_eq!(h.cache().ref_count(&texture_key()), Some(0));
}

#[test]
fn test_real_file_with_texture_name_is_shadowed() {
    let h = Harness::new();
    fs::write(h.backing.path().join("1_2_BI16.dds"), b"on disk").unwrap();

    let attr = h.fs.getattr(Path::new("/1_2_BI16.dds")).unwrap();
    assert_eq!(attr.size, VIRTUAL_FILE_SIZE);
}

#[test]
fn test_concurrent_readers_through_dispatch() {
    let h = Arc::new(Harness::new());
    let path = Path::new(TEXTURE);

    let workers: Vec<_> = (0..8u64)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
                let offset = 1_000_000 * i;
                let data = h.fs.read(path, fh, offset, 512).unwrap();
                assert_eq!(data[0], pattern_byte(24832, offset));
                h.fs.release(path, fh).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.cache().ref_count(&texture_key()), Some(0));
}

// =============================================================================
// Passthrough files
// =============================================================================

#[test]
fn test_passthrough_create_write_read() {
    let h = Harness::new();
    h.fs.mkdir(Path::new("/Earth nav data"), 0o755).unwrap();
    let path = Path::new("/Earth nav data/+37-123.dsf");

    let fh = h.fs.create(path, 0o644, libc::O_WRONLY).unwrap();
    assert_ne!(fh, VIRTUAL_HANDLE);
    assert_eq!(h.fs.write(path, fh, 0, b"XPLNEDSF").unwrap(), 8);
    h.fs.flush(path, fh).unwrap();
    h.fs.fsync(path, fh, true).unwrap();
    h.fs.release(path, fh).unwrap();

    let on_disk = fs::read(h.backing.path().join("Earth nav data/+37-123.dsf")).unwrap();
    assert_eq!(on_disk, b"XPLNEDSF");

    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
    assert_eq!(h.fs.read(path, fh, 4, 100).unwrap(), b"EDSF");
    h.fs.release(path, fh).unwrap();

    assert_eq!(h.fs.getattr(path).unwrap().size, 8);
}

#[test]
fn test_passthrough_multiple_handles() {
    let h = Harness::new();
    fs::write(h.backing.path().join("a.ter"), b"0123456789").unwrap();
    let path = Path::new("/a.ter");

    let first = h.fs.open(path, libc::O_RDONLY).unwrap();
    let second = h.fs.open(path, libc::O_RDONLY).unwrap();
    assert_ne!(first, second);

    assert_eq!(h.fs.read(path, first, 0, 3).unwrap(), b"012");
    assert_eq!(h.fs.read(path, second, 7, 3).unwrap(), b"789");

    h.fs.release(path, first).unwrap();
    assert_eq!(h.fs.read(path, second, 0, 1).unwrap(), b"0");
    h.fs.release(path, second).unwrap();
    assert_eq!(h.fs.open_handles(), 0);
}

#[test]
fn test_passthrough_read_on_released_handle() {
    let h = Harness::new();
    fs::write(h.backing.path().join("a"), b"x").unwrap();
    let path = Path::new("/a");
    let fh = h.fs.open(path, libc::O_RDONLY).unwrap();
    h.fs.release(path, fh).unwrap();

    assert_eq!(h.fs.read(path, fh, 0, 1).unwrap_err().errno(), libc::EBADF);
}

#[test]
fn test_open_missing_passthrough() {
    let h = Harness::new();
    let err = h.fs.open(Path::new("/nope.png"), libc::O_RDONLY).unwrap_err();
    assert_eq!(err.errno(), libc::ENOENT);
}

#[test]
fn test_rename_and_unlink() {
    let h = Harness::new();
    fs::write(h.backing.path().join("old.txt"), b"x").unwrap();

    h.fs.rename(Path::new("/old.txt"), Path::new("/new.txt")).unwrap();
    assert!(h.backing.path().join("new.txt").exists());
    assert!(!h.backing.path().join("old.txt").exists());

    h.fs.unlink(Path::new("/new.txt")).unwrap();
    assert_eq!(
        h.fs.getattr(Path::new("/new.txt")).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_open_file_renamed_onto_texture_name() {
    let h = Harness::new();
    fs::write(h.backing.path().join("notes.txt"), b"real bytes").unwrap();

    let fh = h.fs.open(Path::new("/notes.txt"), libc::O_RDWR).unwrap();
    h.fs.rename(Path::new("/notes.txt"), Path::new("/1_2_BI16.dds"))
        .unwrap();

    // The handle still refers to the host file
    let renamed = Path::new("/1_2_BI16.dds");
    assert_eq!(h.fs.read(renamed, fh, 0, 64).unwrap(), b"real bytes");
    assert_eq!(h.fs.write(renamed, fh, 0, b"REAL").unwrap(), 4);
    h.fs.flush(renamed, fh).unwrap();
    h.fs.fsync(renamed, fh, false).unwrap();
    h.fs.release(renamed, fh).unwrap();

    assert_eq!(h.fs.open_handles(), 0);
    assert!(h.cache().is_empty());
    assert_eq!(
        fs::read(h.backing.path().join("1_2_BI16.dds")).unwrap(),
        b"REAL bytes"
    );
}

#[test]
fn test_readdir_mixes_real_entries() {
    let h = Harness::new();
    fs::create_dir(h.backing.path().join("textures")).unwrap();
    fs::write(h.backing.path().join("textures/water.png"), b"").unwrap();

    let entries = h.fs.readdir(Path::new("/textures")).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|e| e.name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![".", "..", "water.png"]);
}

#[test]
fn test_symlink_round_trip() {
    let h = Harness::new();
    fs::write(h.backing.path().join("target.ter"), b"x").unwrap();
    let absolute = h.backing.path().join("target.ter");

    h.fs.symlink(Path::new("/abs.ter"), &absolute).unwrap();
    assert_eq!(
        h.fs.readlink(Path::new("/abs.ter")).unwrap(),
        Path::new("target.ter")
    );
}
