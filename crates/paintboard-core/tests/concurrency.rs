//! Concurrent block saves against an on-disk store.

use paintboard_core::{BlockId, BoardConfig, CanvasService, FileStore};
use std::sync::Arc;
use std::thread;

fn board(dir: &std::path::Path) -> (CanvasService, Arc<FileStore>) {
    let store = Arc::new(FileStore::new(dir));
    let config = BoardConfig {
        width: 8,
        height: 8,
        block_size: 4,
        colors: (0..4).map(|i| format!("#{i:06x}")).collect(),
        background: 0,
    };
    (CanvasService::open(config, store.clone()).unwrap(), store)
}

#[test]
fn test_disjoint_blocks_save_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let (board, store) = board(dir.path());
    let left = BlockId::new(0, 0);
    let right = BlockId::new(1, 1);
    let untouched = std::fs::read(store.block_path(BlockId::new(1, 0))).unwrap();

    board.set_pixel(1, 1, 2);
    board.set_pixel(6, 5, 3);

    thread::scope(|s| {
        let a = s.spawn(|| board.save_block(left, false));
        let b = s.spawn(|| board.save_block(right, false));
        assert!(a.join().unwrap().unwrap());
        assert!(b.join().unwrap().unwrap());
    });

    let left_bytes = std::fs::read(store.block_path(left)).unwrap();
    let right_bytes = std::fs::read(store.block_path(right)).unwrap();
    assert_eq!(left_bytes[1 + 4], 2);
    assert_eq!(left_bytes.iter().filter(|&&b| b != 0).count(), 1);
    assert_eq!(right_bytes[2 + 4], 3);
    assert_eq!(right_bytes.iter().filter(|&&b| b != 0).count(), 1);
    assert_eq!(std::fs::read(store.block_path(BlockId::new(1, 0))).unwrap(), untouched);
}

#[test]
fn test_same_block_saves_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let (board, store) = board(dir.path());
    let id = BlockId::new(0, 0);

    // Each writer paints the whole block in its own color, then force-saves.
    // The save that takes the lock last snapshots after both writers have
    // finished painting, so the file must equal the final grid exactly.
    for _ in 0..20 {
        thread::scope(|s| {
            for color in [1_u8, 2] {
                let board = &board;
                s.spawn(move || {
                    for y in 0..4 {
                        for x in 0..4 {
                            board.set_pixel(x, y, color);
                        }
                    }
                    board.save_block(id, true).unwrap();
                });
            }
        });

        let bytes = std::fs::read(store.block_path(id)).unwrap();
        assert_eq!(bytes.len(), 16);
        assert!(bytes.iter().all(|&b| b == 1 || b == 2));
        assert_eq!(bytes, board.get_board_area(0, 0, 4, 4));
    }
}
