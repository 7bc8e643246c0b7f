use std::collections::VecDeque;

use rand::seq::SliceRandom;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    Track,
    Queue,
}

/// How the previous track stopped playing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrackEnd {
    Finished,
    Skipped,
    /// Already put back in the queue by [`TrackQueue::back`] or a jump.
    Rewound,
}

pub struct TrackQueue<T> {
    upcoming: VecDeque<T>,
    history: VecDeque<T>,
    history_length: usize,
    pub repeat_mode: RepeatMode,
}

impl<T: Clone> TrackQueue<T> {
    pub fn new(history_length: usize) -> Self {
        TrackQueue {
            upcoming: VecDeque::new(),
            history: VecDeque::new(),
            history_length,
            repeat_mode: RepeatMode::Off,
        }
    }

    pub fn len(&self) -> usize {
        self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.upcoming.push_back(item);
    }

    pub fn push_next(&mut self, item: T) {
        self.upcoming.push_front(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.upcoming.extend(items);
    }

    pub fn pop_next(&mut self) -> Option<T> {
        self.upcoming.pop_front()
    }

    fn remember(&mut self, item: T) {
        if self.history_length == 0 {
            return;
        }

        if self.history.len() == self.history_length {
            self.history.pop_front();
        }
        self.history.push_back(item);
    }

    /// Files the track that just stopped according to the repeat mode.
    pub fn finish(&mut self, item: T, end: TrackEnd) {
        match (end, self.repeat_mode) {
            (TrackEnd::Rewound, _) => {}
            (TrackEnd::Finished, RepeatMode::Track) => self.upcoming.push_front(item),
            (_, RepeatMode::Queue) => {
                self.upcoming.push_back(item.clone());
                self.remember(item);
            }
            _ => self.remember(item),
        }
    }

    /// Queues the previous track, followed by `current`.
    pub fn back(&mut self, current: Option<T>) -> Result<(), String> {
        let previous = match self.history.pop_back() {
            Some(previous) => previous,
            None => return Err("There is no previous track!".to_string()),
        };

        if let Some(current) = current {
            self.upcoming.push_front(current);
        }
        self.upcoming.push_front(previous);

        Ok(())
    }

    pub fn shuffle(&mut self) {
        self.upcoming
            .make_contiguous()
            .shuffle(&mut rand::thread_rng());
    }

    pub fn clear(&mut self) {
        self.upcoming.clear();
    }

    /// Removes the track at a 0-based position of the upcoming queue.
    pub fn remove(&mut self, position: usize) -> Option<T> {
        self.upcoming.remove(position)
    }

    /// Moves the track at `position` to the front of the queue.
    pub fn jump(&mut self, position: usize) -> Option<&T> {
        let item = self.upcoming.remove(position)?;
        self.upcoming.push_front(item);

        self.upcoming.front()
    }

    pub fn page(&self, start: usize, length: usize) -> Vec<T> {
        self.upcoming
            .iter()
            .skip(start)
            .take(length)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(items: &[&'static str]) -> TrackQueue<&'static str> {
        let mut queue = TrackQueue::new(3);
        queue.extend(items.iter().copied());
        queue
    }

    fn drain(queue: &mut TrackQueue<&'static str>) -> Vec<&'static str> {
        let mut items = Vec::new();
        while let Some(item) = queue.pop_next() {
            items.push(item);
        }
        items
    }

    mod order {
        use super::*;

        #[test]
        fn fifo() {
            let mut queue = queue_of(&["a", "b"]);
            queue.push("c");

            assert_eq!(drain(&mut queue), vec!["a", "b", "c"]);
        }

        #[test]
        fn push_next_goes_first() {
            let mut queue = queue_of(&["a", "b"]);
            queue.push_next("z");

            assert_eq!(drain(&mut queue), vec!["z", "a", "b"]);
        }

        #[test]
        fn page() {
            let queue = queue_of(&["a", "b", "c", "d", "e"]);

            assert_eq!(queue.page(0, 2), vec!["a", "b"]);
            assert_eq!(queue.page(4, 2), vec!["e"]);
            assert!(queue.page(10, 2).is_empty());
        }
    }

    mod repeat {
        use super::*;

        #[test]
        fn off_forgets_track() {
            let mut queue = queue_of(&["b"]);
            queue.finish("a", TrackEnd::Finished);

            assert_eq!(drain(&mut queue), vec!["b"]);
        }

        #[test]
        fn track_replays() {
            let mut queue = queue_of(&["b"]);
            queue.repeat_mode = RepeatMode::Track;
            queue.finish("a", TrackEnd::Finished);

            assert_eq!(drain(&mut queue), vec!["a", "b"]);
        }

        #[test]
        fn track_skip_moves_on() {
            let mut queue = queue_of(&["b"]);
            queue.repeat_mode = RepeatMode::Track;
            queue.finish("a", TrackEnd::Skipped);

            assert_eq!(drain(&mut queue), vec!["b"]);
        }

        #[test]
        fn queue_appends() {
            let mut queue = queue_of(&["b"]);
            queue.repeat_mode = RepeatMode::Queue;
            queue.finish("a", TrackEnd::Finished);

            assert_eq!(drain(&mut queue), vec!["b", "a"]);
        }

        #[test]
        fn rewound_is_untouched() {
            let mut queue = queue_of(&["b"]);
            queue.repeat_mode = RepeatMode::Queue;
            queue.finish("a", TrackEnd::Rewound);

            assert_eq!(drain(&mut queue), vec!["b"]);
            assert!(queue.back(None).is_err());
        }
    }

    mod back {
        use super::*;

        #[test]
        fn replays_previous_then_current() {
            let mut queue = queue_of(&["c"]);
            queue.finish("a", TrackEnd::Finished);

            queue.back(Some("b")).unwrap();

            assert_eq!(drain(&mut queue), vec!["a", "b", "c"]);
        }

        #[test]
        fn fails_without_history() {
            let mut queue = queue_of(&["c"]);

            assert!(queue.back(Some("b")).is_err());
            assert_eq!(drain(&mut queue), vec!["c"]);
        }

        #[test]
        fn history_is_bounded() {
            let mut queue = queue_of(&[]);
            for item in ["a", "b", "c", "d"] {
                queue.finish(item, TrackEnd::Finished);
            }

            queue.back(None).unwrap();
            queue.back(None).unwrap();
            queue.back(None).unwrap();

            assert!(queue.back(None).is_err());
            assert_eq!(drain(&mut queue), vec!["b", "c", "d"]);
        }
    }

    mod editing {
        use super::*;

        #[test]
        fn remove() {
            let mut queue = queue_of(&["a", "b", "c"]);

            assert_eq!(queue.remove(1), Some("b"));
            assert_eq!(queue.remove(5), None);
            assert_eq!(drain(&mut queue), vec!["a", "c"]);
        }

        #[test]
        fn jump() {
            let mut queue = queue_of(&["a", "b", "c"]);

            assert_eq!(queue.jump(2), Some(&"c"));
            assert_eq!(drain(&mut queue), vec!["c", "a", "b"]);
        }

        #[test]
        fn jump_out_of_range() {
            let mut queue = queue_of(&["a"]);

            assert_eq!(queue.jump(1), None);
            assert_eq!(queue.len(), 1);
        }

        #[test]
        fn clear() {
            let mut queue = queue_of(&["a", "b"]);
            queue.clear();

            assert!(queue.is_empty());
        }

        #[test]
        fn shuffle_keeps_tracks() {
            let mut queue = queue_of(&["a", "b", "c", "d", "e", "f"]);
            queue.shuffle();

            let mut items = drain(&mut queue);
            items.sort();

            assert_eq!(items, vec!["a", "b", "c", "d", "e", "f"]);
        }
    }
}
