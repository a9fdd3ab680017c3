use parking_lot::Mutex;
use std::iter::StepBy;
use std::ops::Range;

/// Identifies one worker's share of a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Wave {
    index: usize,
    count: usize,
}

impl Wave {
    pub(crate) const fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// This worker's index in `[0, count)`.
    #[inline]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Number of workers taking part.
    #[inline]
    pub const fn count(self) -> usize {
        self.count
    }

    #[inline]
    pub const fn last_index(self) -> usize {
        self.count - 1
    }

    /// Indices `index, index + count, ...` below `len`.
    pub fn stride(self, len: usize) -> StepBy<Range<usize>> {
        (self.index.min(len)..len).step_by(self.count)
    }

    /// Contiguous range of `len` items owned by this worker. Ranges of all
    /// workers are disjoint and cover `0..len`.
    pub fn chunk(self, len: usize) -> Range<usize> {
        let per = len.div_ceil(self.count);
        let start = (self.index * per).min(len);
        start..(start + per).min(len)
    }
}

/// Work executed once by every worker per wave.
pub trait ParallelJob: Sync {
    fn execute(&self, wave: Wave);
}

impl<F> ParallelJob for F
where
    F: Fn(Wave) + Sync,
{
    #[inline]
    fn execute(&self, wave: Wave) {
        self(wave)
    }
}

/// A mutable slice split into one chunk per worker so a job can write in
/// place. Chunk `i` matches `Wave::chunk` for worker `i`, and each chunk has
/// its own lock, which is never contended when workers stay on their index.
pub struct Partitioned<'a, T> {
    chunks: Vec<Mutex<&'a mut [T]>>,
    offsets: Vec<usize>,
}

impl<'a, T: Send> Partitioned<'a, T> {
    pub fn new(slice: &'a mut [T], count: usize) -> Self {
        let count = count.max(1);
        let per = slice.len().div_ceil(count).max(1);

        let mut chunks = Vec::with_capacity(count);
        let mut offsets = Vec::with_capacity(count);
        let mut offset = 0;
        for chunk in slice.chunks_mut(per) {
            offsets.push(offset);
            offset += chunk.len();
            chunks.push(Mutex::new(chunk));
        }
        while chunks.len() < count {
            offsets.push(offset);
            chunks.push(Mutex::new(<&mut [T]>::default()));
        }
        Self { chunks, offsets }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Runs `f` on the wave's chunk with the chunk's starting offset in the
    /// original slice. `None` when the wave index has no chunk.
    pub fn with<R>(&self, wave: Wave, f: impl FnOnce(usize, &mut [T]) -> R) -> Option<R> {
        let chunk = self.chunks.get(wave.index())?;
        let mut guard = chunk.lock();
        Some(f(self.offsets[wave.index()], &mut **guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_range_disjointly() {
        let count = 3;
        let ranges: Vec<_> = (0..count).map(|i| Wave::new(i, count).chunk(10)).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);

        let sparse: Vec<_> = (0..4).map(|i| Wave::new(i, 4).chunk(2)).collect();
        assert_eq!(sparse, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn stride_interleaves() {
        let wave = Wave::new(1, 3);
        assert_eq!(wave.stride(8).collect::<Vec<_>>(), vec![1, 4, 7]);
        assert_eq!(Wave::new(2, 3).stride(1).count(), 0);
        assert_eq!(wave.last_index(), 2);
    }

    #[test]
    fn partition_matches_wave_chunks() {
        let mut values: Vec<u32> = (0..10).collect();
        let parts = Partitioned::new(&mut values, 4);
        assert_eq!(parts.len(), 4);

        for i in 0..4 {
            let wave = Wave::new(i, 4);
            let expected = wave.chunk(10);
            parts
                .with(wave, |offset, chunk| {
                    assert_eq!(offset..offset + chunk.len(), expected);
                    chunk.iter_mut().for_each(|v| *v += 100);
                })
                .unwrap();
        }
        assert!(parts.with(Wave::new(4, 5), |_, _| ()).is_none());
        drop(parts);
        assert!(values.iter().all(|&v| v >= 100));
    }
}
