//! Sliding-window row buffer.
//!
//! `n` chained queues turn a raster pixel stream into `n` parallel row taps. Queue `k + 1` lags queue `k` by exactly
//! one row, so the heads of all queues form one column of an `n`-row window.
//!
//! A frame of at most `(n - 1) * row_length` pixels never fills a window. It produces no column and is dropped
//! when its `last` pixel arrives.

use tracing::debug;

use crate::*;

/// Queue slack beyond one full row.
pub const ROW_FIFO_SLACK: usize = 4;

/// Sliding-window row buffer.
///
/// Ingress is a pixel stream; egress is a stream of `n` x 1 columns, oldest row first (newest row first when
/// `invert`).
#[derive(Debug, Clone)]
pub struct RowFifos {
    width: u32,
    row_length: usize,
    invert: bool,
    queues: Vec<Fifo<(i64, bool)>>,
    frame_pixels: usize,
}

impl RowFifos {
    /// Creates a row buffer for `n` rows of `row_length` pixels of `width` bits.
    pub fn new(width: u32, row_length: usize, n: usize, invert: bool) -> Result<Self, ConfigError> {
        let width = check_width(width)?;
        if n == 0 {
            return Err(ConfigError::InvalidKernel);
        }
        if row_length < n {
            return Err(ConfigError::RowTooShort { row_length, n });
        }

        debug!(width, row_length, n, invert, "row fifos");
        let queues = (0..n).map(|_| Fifo::new(row_length + ROW_FIFO_SLACK)).collect();
        Ok(Self { width, row_length, invert, queues, frame_pixels: 0 })
    }

    /// Number of rows.
    pub fn n(&self) -> usize { self.queues.len() }

    /// Pixels held by each queue, newest row first.
    pub fn levels(&self) -> Vec<usize> { self.queues.iter().map(Fifo::len).collect() }

    /// Whether queue `k` can contribute to an output column.
    fn deliverable(&self, k: usize) -> bool {
        let queue = &self.queues[k];
        match self.queues.get(k + 1) {
            Some(older) => !queue.is_empty() && older.len() == self.row_length,
            None => !queue.is_empty(),
        }
    }

    /// Largest frame that yields no column.
    fn short_frame_limit(&self) -> usize { (self.n() - 1) * self.row_length }

    /// Drops the newest `count` pixels, walking from queue 0 towards the oldest row.
    fn drop_newest(&mut self, count: usize) {
        let mut remaining = count;
        for queue in self.queues.iter_mut() {
            remaining -= queue.drop_newest(remaining);
        }
        debug_assert_eq!(remaining, 0, "short frame pixels already left the queues");
    }

    fn column_valid(&self) -> bool { (0..self.n()).all(|k| self.deliverable(k)) }

    fn head(&self, k: usize) -> (i64, bool) { self.queues[k].head().copied().unwrap_or_default() }
}

impl Module for RowFifos {
    type I = AxisChannel<i64>;
    type O = AxisChannel<Matrix<i64>>;

    fn fwd(&self, _ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<Matrix<i64>>> {
        if !self.column_valid() {
            return Valid::invalid();
        }

        let n = self.n();
        let column = Matrix::from_fn(n, 1, |row, _| {
            let k = if self.invert { row } else { n - 1 - row };
            self.head(k).0
        });
        Valid::beat(column, self.head(0).1)
    }

    fn bwd(&self, _ingress: &Valid<AxisValue<i64>>, _egress: &Ready) -> Ready { Ready::new(!self.queues[0].is_full()) }

    fn tick(&mut self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) {
        let egress_fwd = self.fwd(ingress);
        let out_accepted = egress_fwd.accepted(*egress);
        let in_accepted = ingress.accepted(self.bwd(ingress, egress));

        // Entries leaving each queue this cycle, decided from the current state.
        let n = self.n();
        let moves = (0..n)
            .map(|k| {
                let pop = if k + 1 < n { !self.queues[k].is_empty() && (out_accepted || !self.deliverable(k)) } else { out_accepted };
                if pop {
                    self.queues[k].head().copied()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        let input = if in_accepted {
            Some((wrap_signed(i128::from(ingress.inner.payload), self.width) as i64, ingress.inner.tlast))
        } else {
            None
        };

        for (k, queue) in self.queues.iter_mut().enumerate() {
            let enq = if k == 0 { input } else { moves[k - 1] };
            queue.tick(enq, moves[k].is_some());
        }

        // The frame is over: rows of this frame must not be mixed into the next one.
        if out_accepted && egress_fwd.inner.tlast {
            for queue in self.queues.iter_mut().skip(1) {
                queue.clear();
            }
        }

        // Pixels of a frame never move ahead of the previous frame's last column, so a frame that just ended is the
        // newest `frame_pixels` entries of the chain.
        if in_accepted {
            self.frame_pixels = self.frame_pixels.saturating_add(1);
            if ingress.inner.tlast {
                if self.frame_pixels <= self.short_frame_limit() {
                    debug!(pixels = self.frame_pixels, "dropping a frame shorter than one window");
                    self.drop_newest(self.frame_pixels);
                }
                self.frame_pixels = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use convflow::sim::*;

    use super::*;

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(RowFifos::new(8, 4, 0, false).unwrap_err(), ConfigError::InvalidKernel);
        assert_eq!(RowFifos::new(8, 2, 3, false).unwrap_err(), ConfigError::RowTooShort { row_length: 2, n: 3 });
        assert!(matches!(RowFifos::new(0, 4, 3, false), Err(ConfigError::InvalidWidth { .. })));
    }

    #[test]
    fn columns_in_raster_order() {
        let (height, width) = (4usize, 5usize);
        let mut source = Source::new(Burps::Never);
        source.push_frame((0..(height * width) as i64).map(|x| x % 100));
        let row_fifos = RowFifos::new(8, width, 3, false).unwrap();
        let mut bench = Testbench::new(source, row_fifos, Sink::new(Burps::Never));

        let n_columns = (height - 2) * width;
        bench.run_until(|_, _, sink| sink.len() == n_columns, 200).unwrap();

        let beats = bench.receiver().received();
        for (i, beat) in beats.iter().enumerate() {
            let (y, x) = (i / width, i % width);
            let expected = (0..3).map(|r| ((y + r) * width + x) as i64).collect::<Vec<_>>();
            assert_eq!(beat.payload.as_slice(), &expected[..], "column {}", i);
            assert_eq!(beat.tlast, i + 1 == n_columns);
        }
    }

    #[test]
    fn invert_puts_newest_row_first() {
        let mut source = Source::new(Burps::Never);
        source.push_frame(0..6i64);
        let mut bench = Testbench::new(source, RowFifos::new(8, 3, 2, true).unwrap(), Sink::new(Burps::Never));
        bench.run_until(|_, _, sink| sink.len() == 3, 100).unwrap();
        assert_eq!(bench.receiver().payloads()[0].as_slice(), &[3, 0]);
    }

    #[test]
    fn pixels_wrap_to_width() {
        let mut source = Source::new(Burps::Never);
        source.push_frame(vec![200i64, -1, 127]);
        let mut bench = Testbench::new(source, RowFifos::new(8, 3, 1, false).unwrap(), Sink::new(Burps::Never));
        bench.run_until(|_, _, sink| sink.len() == 3, 100).unwrap();
        let values = bench.receiver().payloads().iter().map(|column| column[(0, 0)]).collect::<Vec<_>>();
        assert_eq!(values, vec![-56, -1, 127]);
    }

    #[test]
    fn history_is_flushed_between_frames() {
        let mut source = Source::new(Burps::Never);
        source.push_frame(0..9i64);
        source.push_frame(100..109i64);
        let mut bench = Testbench::new(source, RowFifos::new(8, 3, 2, false).unwrap(), Sink::new(Burps::Never));
        bench.run_until(|_, _, sink| sink.len() == 12, 200).unwrap();

        let frames = bench.receiver().frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1][0].as_slice(), &[100, 103]);
        assert!(bench.dut().levels().iter().all(|level| *level == 0));
    }

    #[test]
    fn short_frames_are_dropped() {
        let mut source = Source::new(Burps::Never);
        source.push_frame(0..6i64);
        source.push_frame(100..109i64);
        let mut bench = Testbench::new(source, RowFifos::new(8, 3, 3, false).unwrap(), Sink::new(Burps::Never));
        bench.run_until(|_, _, sink| sink.len() == 3, 200).unwrap();
        bench.run(20);

        let columns = bench.receiver().frames();
        assert_eq!(columns.len(), 1);
        let columns = columns[0].iter().map(|column| column.as_slice().to_vec()).collect::<Vec<_>>();
        assert_eq!(columns, vec![vec![100, 103, 106], vec![101, 104, 107], vec![102, 105, 108]]);
        assert!(bench.dut().levels().iter().all(|level| *level == 0));
    }

    #[test]
    fn short_frame_behind_a_full_frame() {
        let mut source = Source::new(Burps::random(0.3, 5));
        source.push_frame(0..9i64);
        source.push_frame(50..53i64);
        source.push_frame(100..109i64);
        let mut bench = Testbench::new(source, RowFifos::new(8, 3, 2, false).unwrap(), Sink::new(Burps::random(0.6, 6)));
        bench.run_until(|_, _, sink| sink.len() == 12, 500).unwrap();
        bench.run(20);

        let frames = bench.receiver().frames();
        assert_eq!(bench.receiver().len(), 12);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][0].as_slice(), &[0, 3]);
        assert_eq!(frames[1][0].as_slice(), &[100, 103]);
        assert_eq!(frames[1][5].as_slice(), &[105, 108]);
    }
}
