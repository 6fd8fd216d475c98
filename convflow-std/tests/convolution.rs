use convflow::sim::*;
use convflow::*;
use convflow_std::golden::{convolve_valid, correlate_valid, relu};
use convflow_std::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn stalls(probability: f64, seed: u64) -> Burps {
    if probability == 0.0 {
        Burps::Never
    } else {
        Burps::random(probability, seed)
    }
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, width: u32) -> Matrix<i64> {
    let (min, max) = (min_signed(width) as i64, max_signed(width) as i64);
    Matrix::from_fn(rows, cols, |_, _| rng.gen_range(min..=max))
}

/// Streams `frames` through a convolution engine and returns the results grouped by frame.
fn convolve(config: ConvolutionConfig, kernel: &Matrix<i64>, frames: &[Matrix<i64>], stall: (f64, f64)) -> Vec<Vec<i64>> {
    let n_results =
        frames.iter().map(|frame| (frame.rows() + 1).saturating_sub(config.n) * (frame.cols() - config.n + 1)).sum::<usize>();

    let mut source = Source::new(stalls(stall.0, 17));
    for frame in frames {
        source.push_frame(frame.iter().copied());
    }
    let conv = Convolution::new(config).unwrap();
    let mut bench = Testbench::new((source, Constant::new(kernel.clone())), conv, Sink::new(stalls(stall.1, 29)));

    bench.run_until(|_, _, sink| sink.len() == n_results, 200_000).unwrap();
    bench.run(50);
    assert_eq!(bench.receiver().len(), n_results, "spurious results after the last frame");
    bench.receiver().frames()
}

#[test]
fn center_tap_returns_the_inner_pixels() {
    let image = Matrix::from_fn(5, 5, |y, x| ((y * 5 + x) % 255) as i64);
    let kernel = Matrix::from_rows(&[[0i64, 0, 0], [0, 1, 0], [0, 0, 0]]);

    let frames = convolve(ConvolutionConfig::new(8, 5, 3, 1), &kernel, &[image], (0.0, 0.0));
    assert_eq!(frames, vec![vec![6, 7, 8, 11, 12, 13, 16, 17, 18]]);
}

#[test]
fn matches_correlation() {
    let mut rng = StdRng::seed_from_u64(1);
    for (height, width, n) in [(5, 5, 3), (6, 9, 4), (4, 7, 1), (7, 3, 3), (8, 8, 5)] {
        let image = random_matrix(&mut rng, height, width, 8);
        let kernel = random_matrix(&mut rng, n, n, 8);
        let frames = convolve(ConvolutionConfig::new(8, width, n, 1), &kernel, &[image.clone()], (0.0, 0.0));

        let expected = correlate_valid(&image, &kernel);
        assert_eq!(frames, vec![expected.into_vec()], "{}x{} image, {}x{} kernel", height, width, n, n);
        assert_eq!(frames[0].len(), (height - n + 1) * (width - n + 1));
    }
}

#[test]
fn worst_case_fits_auto_width() {
    let image = Matrix::filled(4, 4, -128i64);
    let kernel = Matrix::filled(3, 3, -128i64);
    let frames = convolve(ConvolutionConfig::new(8, 4, 3, 2), &kernel, &[image], (0.0, 0.0));
    assert_eq!(frames, vec![vec![147_456; 4]]);
}

#[test]
fn invert_convolves() {
    let mut rng = StdRng::seed_from_u64(2);
    let image = random_matrix(&mut rng, 6, 6, 6);
    let kernel = random_matrix(&mut rng, 3, 3, 6);
    let config = ConvolutionConfig { invert: true, ..ConvolutionConfig::new(6, 6, 3, 2) };

    let frames = convolve(config, &kernel, &[image.clone()], (0.0, 0.0));
    assert_eq!(frames, vec![convolve_valid(&image, &kernel).into_vec()]);
}

#[test]
fn core_count_does_not_change_results() {
    let mut rng = StdRng::seed_from_u64(3);
    let image = random_matrix(&mut rng, 7, 8, 8);
    let kernel = random_matrix(&mut rng, 3, 3, 8);

    let single = convolve(ConvolutionConfig::new(8, 8, 3, 1), &kernel, &[image.clone()], (0.0, 0.0));
    for n_cores in [2, 3, 5, 16] {
        assert_eq!(convolve(ConvolutionConfig::new(8, 8, 3, n_cores), &kernel, &[image.clone()], (0.0, 0.0)), single);
    }
}

#[test]
fn stalls_never_drop_or_reorder() {
    let mut rng = StdRng::seed_from_u64(4);
    let image = random_matrix(&mut rng, 6, 7, 8);
    let kernel = random_matrix(&mut rng, 3, 3, 8);
    let expected = vec![correlate_valid(&image, &kernel).into_vec()];

    for (n_cores, stall) in [(1, (0.5, 0.0)), (1, (0.0, 0.7)), (3, (0.3, 0.3)), (4, (0.6, 0.6))] {
        let frames = convolve(ConvolutionConfig::new(8, 7, 3, n_cores), &kernel, &[image.clone()], stall);
        assert_eq!(frames, expected, "{} cores, stalls {:?}", n_cores, stall);
    }
}

#[test]
fn frames_are_independent() {
    let mut rng = StdRng::seed_from_u64(5);
    let frames = (0..3).map(|_| random_matrix(&mut rng, 5, 6, 8)).collect::<Vec<_>>();
    let kernel = random_matrix(&mut rng, 3, 3, 8);

    let results = convolve(ConvolutionConfig::new(8, 6, 3, 2), &kernel, &frames, (0.3, 0.3));
    let expected = frames.iter().map(|frame| correlate_valid(frame, &kernel).into_vec()).collect::<Vec<_>>();
    assert_eq!(results, expected);
}

#[test]
fn frames_shorter_than_the_kernel_are_skipped() {
    let kernel = Matrix::from_rows(&[[0i64, 0, 0], [0, 1, 0], [0, 0, 0]]);
    let short = Matrix::from_fn(2, 5, |y, x| (y * 5 + x) as i64);
    let full = Matrix::from_fn(5, 5, |y, x| (50 + y * 5 + x) as i64);

    let frames = convolve(ConvolutionConfig::new(8, 5, 3, 1), &kernel, &[short.clone(), full.clone()], (0.0, 0.0));
    assert_eq!(frames, vec![vec![56, 57, 58, 61, 62, 63, 66, 67, 68]]);

    let mut rng = StdRng::seed_from_u64(7);
    let kernel = random_matrix(&mut rng, 3, 3, 8);
    let first = random_matrix(&mut rng, 4, 5, 8);
    let frames = convolve(ConvolutionConfig::new(8, 5, 3, 2), &kernel, &[first.clone(), short, full.clone()], (0.4, 0.4));
    assert_eq!(frames, vec![correlate_valid(&first, &kernel).into_vec(), correlate_valid(&full, &kernel).into_vec()]);
}

#[test]
fn narrow_output_wraps() {
    let image = Matrix::filled(3, 3, 100i64);
    let kernel = Matrix::filled(3, 3, 100i64);
    let config = ConvolutionConfig {
        output_width: OutputWidth::Explicit { width: 16, allow_overflow: true },
        ..ConvolutionConfig::new(8, 3, 3, 1)
    };

    let conv = Convolution::new(config).unwrap();
    assert_eq!(conv.warnings(), &[ConfigWarning::NarrowOutput { requested: 16, required: 19 }]);

    let frames = convolve(config, &kernel, &[image], (0.0, 0.0));
    assert_eq!(frames, vec![vec![wrap_signed(90_000, 16) as i64]]);
}

#[test]
fn chained_with_relu() {
    let mut rng = StdRng::seed_from_u64(6);
    let image = random_matrix(&mut rng, 5, 5, 8);
    let kernel = random_matrix(&mut rng, 3, 3, 8);

    let conv = Convolution::new(ConvolutionConfig::new(8, 5, 3, 2)).unwrap();
    let width = conv.output_width();
    let stage = conv.chain(Relu::new(ReluConfig { width, leak: 4 }).unwrap());

    let mut source = Source::new(Burps::random(0.2, 7));
    source.push_frame(image.iter().copied());
    let mut bench = Testbench::new((source, Constant::new(kernel.clone())), stage, Sink::new(Burps::random(0.2, 8)));
    bench.run_until(|_, _, sink| sink.len() == 9, 10_000).unwrap();
    assert_eq!(bench.dut().first().output_width(), width);
    assert_eq!(bench.dut().second().activate(-(1 << 16)), -2);

    let expected = correlate_valid(&image, &kernel).iter().map(|value| relu(*value, width, 4)).collect::<Vec<_>>();
    assert_eq!(bench.receiver().frames(), vec![expected]);
}
