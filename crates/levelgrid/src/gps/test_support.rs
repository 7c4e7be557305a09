use crate::level::{Direction, Level, LevelId, LevelTable};

use super::LevelGraph;

pub(crate) const TEST_MAX_LEVELS: usize = 8;

pub(crate) fn level(id: u32, width: u32, height: u32) -> Level {
    Level::filled(LevelId(id), width, height, 0).expect("level")
}

pub(crate) fn table_of(levels: Vec<Level>) -> LevelTable {
    let mut table = LevelTable::with_capacity(TEST_MAX_LEVELS);
    for level in levels {
        table.insert(level).expect("insert level");
    }
    table
}

pub(crate) fn built(table: &LevelTable) -> LevelGraph {
    let mut graph = LevelGraph::new(TEST_MAX_LEVELS);
    graph.build(table);
    graph
}

/// A (0, 20x20) with B (1, 15x15) across its north edge.
pub(crate) fn north_pair_table() -> LevelTable {
    table_of(vec![
        level(0, 20, 20).with_jump_target(Direction::North, LevelId(1)),
        level(1, 15, 15).with_jump_target(Direction::South, LevelId(0)),
    ])
}

/// Four levels meeting at one corner:
///
/// ```text
///  0 (10x8)  | 1 (12x8)
///  ----------+---------
///  2 (10x6)  | 3 (12x6)
/// ```
pub(crate) fn four_corner_table() -> LevelTable {
    table_of(vec![
        level(0, 10, 8)
            .with_jump_target(Direction::East, LevelId(1))
            .with_jump_target(Direction::South, LevelId(2)),
        level(1, 12, 8)
            .with_jump_target(Direction::West, LevelId(0))
            .with_jump_target(Direction::South, LevelId(3)),
        level(2, 10, 6)
            .with_jump_target(Direction::North, LevelId(0))
            .with_jump_target(Direction::East, LevelId(3)),
        level(3, 12, 6)
            .with_jump_target(Direction::North, LevelId(1))
            .with_jump_target(Direction::West, LevelId(2)),
    ])
}

/// Four 10x10 levels in a west-to-east row: 0 - 1 - 2 - 3.
pub(crate) fn east_chain_table() -> LevelTable {
    table_of(vec![
        level(0, 10, 10).with_jump_target(Direction::East, LevelId(1)),
        level(1, 10, 10)
            .with_jump_target(Direction::West, LevelId(0))
            .with_jump_target(Direction::East, LevelId(2)),
        level(2, 10, 10)
            .with_jump_target(Direction::West, LevelId(1))
            .with_jump_target(Direction::East, LevelId(3)),
        level(3, 10, 10).with_jump_target(Direction::West, LevelId(2)),
    ])
}
