use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatedObstacleKind {
    Door,
    Teleporter,
    Refresh,
    Autogun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatedObstacle {
    /// Index into the owning level's obstacle storage.
    pub index: usize,
    pub kind: AnimatedObstacleKind,
}

/// Per-level list of obstacles the animation tick has to visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimatedObstacleCache {
    obstacles: Vec<AnimatedObstacle>,
}

impl AnimatedObstacleCache {
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }

    /// Replaces the contents with every obstacle that classifies as animated.
    /// Obstacles keep their scan order within a kind.
    pub fn fill<I>(&mut self, obstacles: I)
    where
        I: IntoIterator<Item = (usize, Option<AnimatedObstacleKind>)>,
    {
        self.obstacles.clear();
        self.obstacles.extend(
            obstacles
                .into_iter()
                .filter_map(|(index, kind)| kind.map(|kind| AnimatedObstacle { index, kind })),
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimatedObstacle> {
        self.obstacles.iter()
    }

    pub fn indices_of(&self, kind: AnimatedObstacleKind) -> impl Iterator<Item = usize> + '_ {
        self.obstacles
            .iter()
            .filter(move |obstacle| obstacle.kind == kind)
            .map(|obstacle| obstacle.index)
    }

    pub fn count_of(&self, kind: AnimatedObstacleKind) -> usize {
        self.indices_of(kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_keeps_only_animated_obstacles_grouped_by_kind() {
        let mut cache = AnimatedObstacleCache::default();
        cache.fill([
            (0, Some(AnimatedObstacleKind::Door)),
            (1, None),
            (2, Some(AnimatedObstacleKind::Autogun)),
            (3, Some(AnimatedObstacleKind::Door)),
            (7, None),
        ]);
        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.indices_of(AnimatedObstacleKind::Door).collect::<Vec<_>>(),
            vec![0, 3]
        );
        assert_eq!(cache.count_of(AnimatedObstacleKind::Teleporter), 0);
        assert_eq!(cache.count_of(AnimatedObstacleKind::Autogun), 1);
    }

    #[test]
    fn refill_replaces_previous_contents() {
        let mut cache = AnimatedObstacleCache::default();
        cache.fill([(4, Some(AnimatedObstacleKind::Refresh))]);
        cache.fill([(9, Some(AnimatedObstacleKind::Teleporter))]);
        assert_eq!(
            cache.iter().copied().collect::<Vec<_>>(),
            vec![AnimatedObstacle {
                index: 9,
                kind: AnimatedObstacleKind::Teleporter,
            }]
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
